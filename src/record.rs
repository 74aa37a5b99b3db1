//! Update records.
//!
//! An [`UpdateRecord`] is one prerequisite or one change against a
//! resource record. Records always carry the class of the zone they belong
//! to; the class and TTL that appear on the wire are derived from the
//! [`Operation`] when the message is marshalled.

use domain::base::iana::{Class, Rtype};
use std::net::{Ipv4Addr, Ipv6Addr};

/// Absolute domain name with owned octets.
pub type Name = domain::base::Name<Vec<u8>>;

/// Message section of an update record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    Zone,
    Prerequisite,
    Update,
    Additional,
}

/// What an update record asks of the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Prerequisite: the name owns at least one RR.
    YxDomain,
    /// Prerequisite: the name owns no RRs.
    NxDomain,
    /// Prerequisite: the RRset exists (with the given data, if any).
    YxRrset,
    /// Prerequisite: the RRset does not exist.
    NxRrset,
    /// Add the RR to its RRset.
    Add,
    /// Delete the RR, the RRset (empty data) or every RRset (type ANY).
    Delete,
}

impl Operation {
    /// The section a record with this operation belongs in.
    #[must_use]
    pub const fn section(self) -> Section {
        match self {
            Self::YxDomain | Self::NxDomain | Self::YxRrset | Self::NxRrset => {
                Section::Prerequisite
            }
            Self::Add | Self::Delete => Section::Update,
        }
    }
}

/// One pending change (or prerequisite) against a resource record.
///
/// # Example
///
/// ```
/// use dns_update::{Class, Rtype, UpdateRecord};
///
/// let host = "host.example.com".parse().unwrap();
/// let add = UpdateRecord::add_a(host, Class::IN, 300, "192.0.2.10".parse().unwrap());
/// assert_eq!(add.rtype, Rtype::A);
/// assert_eq!(add.rdata, vec![192, 0, 2, 10]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateRecord {
    pub section: Section,
    /// Absent only for the zone-section record.
    pub operation: Option<Operation>,
    pub owner: Name,
    /// Class of the zone the record lives in.
    pub class: Class,
    pub rtype: Rtype,
    pub ttl: u32,
    /// Record data in uncompressed wire form.
    pub rdata: Vec<u8>,
}

impl UpdateRecord {
    fn new(operation: Operation, owner: Name, class: Class, rtype: Rtype, ttl: u32) -> Self {
        Self {
            section: operation.section(),
            operation: Some(operation),
            owner,
            class,
            rtype,
            ttl,
            rdata: Vec::new(),
        }
    }

    #[must_use]
    fn with_rdata(mut self, rdata: Vec<u8>) -> Self {
        self.rdata = rdata;
        self
    }

    /// Creates the zone-section record naming the zone being updated.
    #[must_use]
    pub fn zone(origin: Name, class: Class) -> Self {
        Self {
            section: Section::Zone,
            operation: None,
            owner: origin,
            class,
            rtype: Rtype::SOA,
            ttl: 0,
            rdata: Vec::new(),
        }
    }

    /// Adds an RR with raw wire-form data.
    #[must_use]
    pub fn add(owner: Name, class: Class, rtype: Rtype, ttl: u32, rdata: Vec<u8>) -> Self {
        Self::new(Operation::Add, owner, class, rtype, ttl).with_rdata(rdata)
    }

    /// Adds an `A` record.
    #[must_use]
    pub fn add_a(owner: Name, class: Class, ttl: u32, addr: Ipv4Addr) -> Self {
        Self::add(owner, class, Rtype::A, ttl, addr.octets().to_vec())
    }

    /// Adds an `AAAA` record.
    #[must_use]
    pub fn add_aaaa(owner: Name, class: Class, ttl: u32, addr: Ipv6Addr) -> Self {
        Self::add(owner, class, Rtype::AAAA, ttl, addr.octets().to_vec())
    }

    /// Adds a `PTR` record.
    #[must_use]
    pub fn add_ptr(owner: Name, class: Class, ttl: u32, target: &Name) -> Self {
        Self::add(owner, class, Rtype::PTR, ttl, target.as_slice().to_vec())
    }

    /// Adds a `CNAME` record.
    #[must_use]
    pub fn add_cname(owner: Name, class: Class, ttl: u32, target: &Name) -> Self {
        Self::add(owner, class, Rtype::CNAME, ttl, target.as_slice().to_vec())
    }

    /// Adds a `TXT` record, splitting `text` into 255-octet strings.
    #[must_use]
    pub fn add_txt(owner: Name, class: Class, ttl: u32, text: &str) -> Self {
        let mut rdata = Vec::with_capacity(text.len() + text.len() / 255 + 1);
        if text.is_empty() {
            rdata.push(0);
        }
        for chunk in text.as_bytes().chunks(255) {
            #[allow(clippy::cast_possible_truncation)]
            rdata.push(chunk.len() as u8);
            rdata.extend_from_slice(chunk);
        }
        Self::add(owner, class, Rtype::TXT, ttl, rdata)
    }

    /// Deletes the whole RRset of `rtype` at `owner`.
    #[must_use]
    pub fn delete_rrset(owner: Name, class: Class, rtype: Rtype) -> Self {
        Self::new(Operation::Delete, owner, class, rtype, 0)
    }

    /// Deletes every RRset at `owner`.
    #[must_use]
    pub fn delete_name(owner: Name, class: Class) -> Self {
        Self::new(Operation::Delete, owner, class, Rtype::ANY, 0)
    }

    /// Deletes one RR from an RRset.
    #[must_use]
    pub fn delete_rr(owner: Name, class: Class, rtype: Rtype, rdata: Vec<u8>) -> Self {
        Self::new(Operation::Delete, owner, class, rtype, 0).with_rdata(rdata)
    }

    /// Requires the RRset to exist, regardless of its data.
    #[must_use]
    pub fn rrset_exists(owner: Name, class: Class, rtype: Rtype) -> Self {
        Self::new(Operation::YxRrset, owner, class, rtype, 0)
    }

    /// Requires the RRset to exist and contain `rdata`.
    #[must_use]
    pub fn rrset_exists_value(owner: Name, class: Class, rtype: Rtype, rdata: Vec<u8>) -> Self {
        Self::new(Operation::YxRrset, owner, class, rtype, 0).with_rdata(rdata)
    }

    /// Requires the RRset to be absent.
    #[must_use]
    pub fn rrset_absent(owner: Name, class: Class, rtype: Rtype) -> Self {
        Self::new(Operation::NxRrset, owner, class, rtype, 0)
    }

    /// Requires `owner` to own at least one RR.
    #[must_use]
    pub fn name_in_use(owner: Name, class: Class) -> Self {
        Self::new(Operation::YxDomain, owner, class, Rtype::ANY, 0)
    }

    /// Requires `owner` to own no RRs.
    #[must_use]
    pub fn name_not_in_use(owner: Name, class: Class) -> Self {
        Self::new(Operation::NxDomain, owner, class, Rtype::ANY, 0)
    }

    /// Class, TTL and data as they appear on the wire.
    ///
    /// RFC 2136 signals deletions and value-independent prerequisites
    /// through the class field: `ANY` and `NONE` replace the zone class,
    /// the TTL is zero and the data may be dropped.
    #[must_use]
    pub fn wire_fields(&self) -> (Class, u32, &[u8]) {
        const EMPTY: &[u8] = &[];
        let Some(op) = self.operation else {
            return (self.class, 0, EMPTY);
        };
        let data = self.rdata.as_slice();
        match op {
            Operation::Add => (self.class, self.ttl, data),
            Operation::Delete | Operation::YxRrset if data.is_empty() => (Class::ANY, 0, EMPTY),
            Operation::Delete => (Class::NONE, 0, data),
            Operation::YxRrset => (self.class, 0, data),
            Operation::NxRrset | Operation::NxDomain => (Class::NONE, 0, EMPTY),
            Operation::YxDomain => (Class::ANY, 0, EMPTY),
        }
    }
}
