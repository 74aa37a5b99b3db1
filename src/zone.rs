//! Grouping update records into a single zone.

use crate::error::{Result, UpdateError};
use crate::message::marshal;
use crate::record::{Name, UpdateRecord};
use crate::state::{MAX_NAMESERVERS, ResolverState};
use domain::base::iana::Class;
use std::net::IpAddr;

/// The zone containing a name and the servers authoritative for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneCut {
    pub origin: Name,
    pub servers: Vec<IpAddr>,
}

/// Finds the zone cut above a name.
///
/// An error or an empty server list means the name cannot be updated.
pub trait ZoneCutFinder {
    fn find_zone_cut(&self, state: &ResolverState, name: &Name, class: Class) -> Result<ZoneCut>;
}

impl<Z: ZoneCutFinder + ?Sized> ZoneCutFinder for &Z {
    fn find_zone_cut(&self, state: &ResolverState, name: &Name, class: Class) -> Result<ZoneCut> {
        (**self).find_zone_cut(state, name, class)
    }
}

/// The records of one update transaction and the zone they target.
///
/// Caller records are borrowed; the zone-section record, once added by
/// [`add_zone_section`](Self::add_zone_section), is owned by the group and
/// released with it.
#[derive(Debug)]
pub struct ZoneGroup<'a> {
    origin: Name,
    class: Class,
    servers: Vec<IpAddr>,
    records: Vec<&'a UpdateRecord>,
    zone_section: Option<UpdateRecord>,
}

impl<'a> ZoneGroup<'a> {
    /// Resolves every record to its zone and checks they all share one.
    ///
    /// The first record fixes the origin, class and servers. Every later
    /// record must resolve to the same origin (ignoring case) and carry
    /// the same class.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::NotZone`] if `records` is empty, a zone cut
    /// cannot be found or has no servers, or two records disagree on origin
    /// or class. Returns [`UpdateError::Allocation`] if the record list
    /// cannot be reserved.
    pub fn resolve<Z: ZoneCutFinder + ?Sized>(
        finder: &Z,
        state: &ResolverState,
        records: &'a [UpdateRecord],
    ) -> Result<Self> {
        let mut group: Option<Self> = None;

        for record in records {
            let cut = finder
                .find_zone_cut(state, &record.owner, record.class)
                .map_err(|e| {
                    tracing::warn!(name = %record.owner, error = %e, "Zone cut lookup failed");
                    UpdateError::not_zone(&record.owner, format!("zone cut lookup failed: {e}"))
                })?;
            if cut.servers.is_empty() {
                tracing::warn!(name = %record.owner, zone = %cut.origin, "Zone has no nameservers");
                return Err(UpdateError::not_zone(
                    &record.owner,
                    format!("no authoritative servers for {}", cut.origin),
                ));
            }

            let Some(g) = group.as_mut() else {
                let mut list = Vec::new();
                list.try_reserve_exact(records.len())
                    .map_err(|e| UpdateError::Allocation(format!("zone group records: {e}")))?;
                list.push(record);
                let mut servers = cut.servers;
                servers.truncate(MAX_NAMESERVERS);
                group = Some(Self {
                    origin: cut.origin,
                    class: record.class,
                    servers,
                    records: list,
                    zone_section: None,
                });
                continue;
            };

            if g.origin != cut.origin || g.class != record.class {
                tracing::warn!(
                    name = %record.owner,
                    zone = %cut.origin,
                    class = %record.class,
                    expected_zone = %g.origin,
                    expected_class = %g.class,
                    "Records span more than one zone"
                );
                return Err(UpdateError::not_zone(
                    &record.owner,
                    format!(
                        "in {} {}, expected {} {}",
                        cut.origin, record.class, g.origin, g.class
                    ),
                ));
            }
            g.records.push(record);
        }

        group.ok_or_else(|| UpdateError::not_zone(".", "no records to update"))
    }

    #[must_use]
    pub const fn origin(&self) -> &Name {
        &self.origin
    }

    #[must_use]
    pub const fn class(&self) -> Class {
        self.class
    }

    /// Authoritative servers of the zone.
    #[must_use]
    pub fn servers(&self) -> &[IpAddr] {
        &self.servers
    }

    /// Returns `true` once the zone-section record has been added.
    #[must_use]
    pub const fn has_zone_section(&self) -> bool {
        self.zone_section.is_some()
    }

    /// Prepends the zone-section record (`origin SOA class`) if missing.
    pub fn add_zone_section(&mut self) {
        if self.zone_section.is_none() {
            self.zone_section = Some(UpdateRecord::zone(self.origin.clone(), self.class));
        }
    }

    /// All records in message order: the zone section first, if present,
    /// then the caller's records as given.
    pub fn records(&self) -> impl Iterator<Item = &UpdateRecord> {
        self.zone_section
            .iter()
            .chain(self.records.iter().copied())
    }

    /// Number of caller records in the group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Adds the zone section and marshals the update message.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Encode`] if the message does not fit in
    /// [`MAX_UPDATE_SIZE`](crate::MAX_UPDATE_SIZE) octets.
    pub fn build(&mut self, id: u16) -> Result<Vec<u8>> {
        self.add_zone_section();
        let octets = marshal(id, self.records())?;
        tracing::debug!(
            zone = %self.origin,
            records = self.records.len(),
            len = octets.len(),
            "Built update message"
        );
        Ok(octets)
    }
}
