//! Static zone configuration.

use crate::error::{Result, UpdateError};
use crate::record::Name;
use crate::state::{MAX_NAMESERVERS, ResolverState};
use crate::zone::{ZoneCut, ZoneCutFinder};
use domain::base::iana::Class;
use std::net::IpAddr;

/// Configuration for one zone and its authoritative nameservers.
///
/// # Example
///
/// ```
/// use dns_update::{Class, ZoneConfig};
///
/// let config = ZoneConfig::new("example.com", "192.0.2.1".parse().unwrap())
///     .unwrap()
///     .with_nameserver("192.0.2.2".parse().unwrap())
///     .with_class(Class::IN);
///
/// assert_eq!(config.origin.to_string(), "example.com");
/// assert_eq!(config.nameservers.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneConfig {
    /// Zone origin (e.g., `"example.com"`).
    pub origin: Name,

    /// Authoritative nameservers, in the order they are tried.
    pub nameservers: Vec<IpAddr>,

    /// Class of the zone; `IN` unless overridden.
    pub class: Class,
}

impl ZoneConfig {
    /// Creates a zone config with one nameserver and class `IN`.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::InvalidName`] if `origin` is not a valid name.
    pub fn new(origin: &str, nameserver: IpAddr) -> Result<Self> {
        Ok(Self {
            origin: origin.parse()?,
            nameservers: vec![nameserver],
            class: Class::IN,
        })
    }

    /// Adds another nameserver.
    #[must_use]
    pub fn with_nameserver(mut self, nameserver: IpAddr) -> Self {
        self.nameservers.push(nameserver);
        self
    }

    /// Overrides the class.
    #[must_use]
    pub const fn with_class(mut self, class: Class) -> Self {
        self.class = class;
        self
    }
}

/// An in-memory zone table.
///
/// Finds the zone cut for a name by picking the configured zone with the
/// longest origin that contains it, among zones of the requested class.
#[derive(Debug, Clone, Default)]
pub struct StaticZoneCuts {
    zones: Vec<ZoneConfig>,
}

impl StaticZoneCuts {
    #[must_use]
    pub const fn new() -> Self {
        Self { zones: Vec::new() }
    }

    /// Adds a zone, replacing any earlier one with the same origin and class.
    #[must_use]
    pub fn with_zone(mut self, zone: ZoneConfig) -> Self {
        self.insert(zone);
        self
    }

    /// Adds a zone, replacing any earlier one with the same origin and class.
    pub fn insert(&mut self, zone: ZoneConfig) {
        self.zones
            .retain(|z| z.origin != zone.origin || z.class != zone.class);
        self.zones.push(zone);
    }

    /// The configured zones.
    #[must_use]
    pub fn zones(&self) -> &[ZoneConfig] {
        &self.zones
    }

    /// Returns the zone containing `name` with the longest origin.
    #[must_use]
    pub fn lookup(&self, name: &Name, class: Class) -> Option<&ZoneConfig> {
        self.zones
            .iter()
            .filter(|z| z.class == class && name.ends_with(&z.origin))
            .max_by_key(|z| z.origin.label_count())
    }
}

impl ZoneCutFinder for StaticZoneCuts {
    fn find_zone_cut(&self, _state: &ResolverState, name: &Name, class: Class) -> Result<ZoneCut> {
        let zone = self.lookup(name, class).ok_or_else(|| {
            UpdateError::not_zone(name, format!("no {class} zone configured"))
        })?;
        Ok(ZoneCut {
            origin: zone.origin.clone(),
            servers: zone.nameservers.iter().take(MAX_NAMESERVERS).copied().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn new_sets_defaults() {
        let c = ZoneConfig::new("example.com", ip("192.0.2.1")).unwrap();
        assert_eq!(c.origin, "example.com.".parse::<Name>().unwrap());
        assert_eq!(c.nameservers, vec![ip("192.0.2.1")]);
        assert_eq!(c.class, Class::IN);
        assert!(ZoneConfig::new("bad..name", ip("192.0.2.1")).is_err());
    }

    #[test]
    fn longest_origin_wins() {
        let zones = StaticZoneCuts::new()
            .with_zone(ZoneConfig::new("example.com", ip("192.0.2.1")).unwrap())
            .with_zone(ZoneConfig::new("sub.example.com", ip("192.0.2.2")).unwrap());

        let cut = zones
            .find_zone_cut(&ResolverState::new(), &"a.sub.example.com".parse().unwrap(), Class::IN)
            .unwrap();
        assert_eq!(cut.origin.to_string(), "sub.example.com");
        assert_eq!(cut.servers, vec![ip("192.0.2.2")]);

        let cut = zones
            .find_zone_cut(&ResolverState::new(), &"a.example.com".parse().unwrap(), Class::IN)
            .unwrap();
        assert_eq!(cut.origin.to_string(), "example.com");
    }

    #[test]
    fn class_must_match() {
        let zones = StaticZoneCuts::new()
            .with_zone(ZoneConfig::new("example.com", ip("192.0.2.1")).unwrap().with_class(Class::CH));
        assert!(zones.lookup(&"a.example.com".parse().unwrap(), Class::IN).is_none());
        assert!(zones.lookup(&"a.example.com".parse().unwrap(), Class::CH).is_some());
    }

    #[test]
    fn insert_replaces_same_origin() {
        let zones = StaticZoneCuts::new()
            .with_zone(ZoneConfig::new("example.com", ip("192.0.2.1")).unwrap())
            .with_zone(ZoneConfig::new("EXAMPLE.com.", ip("192.0.2.9")).unwrap());
        assert_eq!(zones.zones().len(), 1);
        assert_eq!(zones.zones()[0].nameservers, vec![ip("192.0.2.9")]);
    }

    #[test]
    fn unknown_name_is_not_zone() {
        let zones = StaticZoneCuts::new();
        let err = zones
            .find_zone_cut(&ResolverState::new(), &"a.example.org".parse().unwrap(), Class::IN)
            .unwrap_err();
        assert!(err.is_not_zone());
    }
}
