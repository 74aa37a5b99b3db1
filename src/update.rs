//! Running one update transaction.

use crate::error::{Result, UpdateError};
use crate::record::UpdateRecord;
use crate::state::ResolverState;
use crate::transport::Transport;
use crate::tsig::TsigKey;
use crate::zone::{ZoneCutFinder, ZoneGroup};
use domain::base::Message;
use domain::base::iana::Rcode;

/// Sends dynamic updates for a single zone.
///
/// # Lifecycle
///
/// 1. Every record is resolved to its zone; all must share one zone and
///    class.
/// 2. The zone section is prepended and the message is marshalled.
/// 3. The state's nameservers are replaced with the zone's servers and the
///    message is sent, signed if a key is given.
/// 4. The previous nameservers are restored, whether or not the send
///    succeeded.
///
/// Records are only borrowed. Updates spanning several zones must be split
/// by the caller; a failure in a later zone does not undo an earlier one.
///
/// # Example
///
/// ```rust,no_run
/// use dns_update::{
///     Class, Rcode, ResolverState, StaticZoneCuts, UdpTransport, UpdateRecord, Updater,
///     ZoneConfig,
/// };
///
/// let zones = StaticZoneCuts::new()
///     .with_zone(ZoneConfig::new("example.com", "192.0.2.53".parse().unwrap())?);
/// let mut updater = Updater::new(zones, UdpTransport::new());
/// let mut state = ResolverState::load("/etc/resolv.conf")?;
///
/// let records = [UpdateRecord::add_a(
///     "host.example.com".parse()?,
///     Class::IN,
///     300,
///     "192.0.2.10".parse().unwrap(),
/// )];
/// let rcode = updater.update(&mut state, &records, None)?;
/// assert_eq!(rcode, Rcode::NOERROR);
/// # Ok::<(), dns_update::UpdateError>(())
/// ```
#[derive(Debug)]
pub struct Updater<Z, T> {
    zone_cuts: Z,
    transport: T,
}

impl<Z: ZoneCutFinder, T: Transport> Updater<Z, T> {
    /// Creates an updater that finds zones with `zone_cuts` and sends
    /// through `transport`.
    pub const fn new(zone_cuts: Z, transport: T) -> Self {
        Self {
            zone_cuts,
            transport,
        }
    }

    /// The zone-cut finder.
    pub const fn zone_cuts(&self) -> &Z {
        &self.zone_cuts
    }

    /// The transport updates are sent through.
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Consumes the updater, returning its collaborators.
    pub fn into_parts(self) -> (Z, T) {
        (self.zone_cuts, self.transport)
    }

    /// Sends `records` as one update to the zone containing them.
    ///
    /// Returns the response code from the server. Rejections such as
    /// `REFUSED` or `NXRRSET` are returned as `Ok`, unchanged.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::NotZone`] if `records` is empty, spans several
    ///   zones or classes, or its zone has no nameservers. Nothing is sent.
    /// - [`UpdateError::Encode`] if the message does not fit. Nothing is
    ///   sent and `state` is untouched.
    /// - [`UpdateError::Allocation`] if the zone group cannot be created.
    /// - [`UpdateError::Send`] if no response was received, or a signed
    ///   update got a response that fails verification.
    ///
    /// In all cases the nameservers of `state` are the same on return as
    /// they were on entry.
    pub fn update(
        &mut self,
        state: &mut ResolverState,
        records: &[UpdateRecord],
        key: Option<&TsigKey>,
    ) -> Result<Rcode> {
        let mut group = ZoneGroup::resolve(&self.zone_cuts, state, records)?;
        let query = match group.build(state.next_id()) {
            Ok(query) => query,
            Err(e) => {
                tracing::warn!(zone = %group.origin(), error = %e, "Failed to build update");
                return Err(e);
            }
        };

        let sent = {
            let promoted = state.promote(group.servers());
            match key {
                Some(key) => self.transport.send_signed(&promoted, &query, key),
                None => self.transport.send(&promoted, &query),
            }
        };

        let answer = sent.inspect_err(|e| {
            tracing::warn!(zone = %group.origin(), error = %e, "Update not sent");
        })?;
        let rcode = Message::from_octets(answer)
            .map_err(|e| {
                UpdateError::Send(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("malformed response: {e}"),
                ))
            })?
            .header()
            .rcode();

        tracing::info!(
            zone = %group.origin(),
            records = group.len(),
            signed = key.is_some(),
            %rcode,
            "Update completed"
        );
        Ok(rcode)
    }
}
