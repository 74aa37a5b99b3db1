//! Update message marshalling.

use crate::error::{Result, UpdateError};
use crate::record::{Name, Section, UpdateRecord};
use domain::base::iana::Opcode;
use domain::base::{MessageBuilder, Question, Record, Ttl, UnknownRecordData};

/// Standard maximum size of a UDP DNS message.
pub const PACKET_SIZE: usize = 512;

/// Largest outgoing update message, before signing.
///
/// Updates may carry more records than a normal query, so they get twice
/// the standard size.
pub const MAX_UPDATE_SIZE: usize = 2 * PACKET_SIZE;

/// Encodes an update message.
///
/// Zone records go to the question section, prerequisites to the answer
/// section and updates to the authority section. Within a section the
/// input order is kept. Names are not compressed.
///
/// # Errors
///
/// Returns [`UpdateError::Encode`] if a record cannot be encoded or the
/// message exceeds [`MAX_UPDATE_SIZE`] octets.
pub fn marshal<'a>(
    id: u16,
    records: impl IntoIterator<Item = &'a UpdateRecord>,
) -> Result<Vec<u8>> {
    let records: Vec<&UpdateRecord> = records.into_iter().collect();

    let mut msg = MessageBuilder::new_vec();
    let header = msg.header_mut();
    header.set_id(id);
    header.set_opcode(Opcode::UPDATE);
    header.set_qr(false);

    let mut zone = msg.question();
    for r in in_section(&records, Section::Zone) {
        zone.push(Question::new(&r.owner, r.rtype, r.class))
            .map_err(|e| encode_error(r, e))?;
    }
    let mut prerequisites = zone.answer();
    for r in in_section(&records, Section::Prerequisite) {
        prerequisites.push(resource_record(r)?).map_err(|e| encode_error(r, e))?;
    }
    let mut updates = prerequisites.authority();
    for r in in_section(&records, Section::Update) {
        updates.push(resource_record(r)?).map_err(|e| encode_error(r, e))?;
    }
    let mut additional = updates.additional();
    for r in in_section(&records, Section::Additional) {
        additional.push(resource_record(r)?).map_err(|e| encode_error(r, e))?;
    }

    let octets = additional.finish();
    if octets.len() > MAX_UPDATE_SIZE {
        return Err(UpdateError::Encode(format!(
            "message of {} octets exceeds {MAX_UPDATE_SIZE}",
            octets.len()
        )));
    }
    Ok(octets)
}

fn in_section<'r>(
    records: &'r [&'r UpdateRecord],
    section: Section,
) -> impl Iterator<Item = &'r UpdateRecord> {
    records.iter().copied().filter(move |r| r.section == section)
}

fn resource_record(r: &UpdateRecord) -> Result<Record<&Name, UnknownRecordData<&[u8]>>> {
    let (class, ttl, rdata) = r.wire_fields();
    let data = UnknownRecordData::from_octets(r.rtype, rdata).map_err(|e| encode_error(r, e))?;
    Ok(Record::new(&r.owner, class, Ttl::from_secs(ttl), data))
}

fn encode_error(r: &UpdateRecord, err: impl std::fmt::Display) -> UpdateError {
    UpdateError::Encode(format!("{} {}: {err}", r.owner, r.rtype))
}
