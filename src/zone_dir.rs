//! Directory-backed zone tables.
//!
//! Each zone is one file named after its origin, in the style of macOS
//! `/etc/resolver/<domain>` files:
//!
//! ```text
//! # managed by dns-update
//! class IN
//! nameserver 192.0.2.1
//! nameserver 192.0.2.2
//! ```
//!
//! Files written by this module carry a marker comment. Files without it
//! are read by [`ZoneDir::load`] but never replaced or removed.

use crate::config::{StaticZoneCuts, ZoneConfig};
use crate::error::{Result, UpdateError};
use crate::record::Name;
use domain::base::iana::Class;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

/// Marker comment embedded in every managed zone file.
const MANAGED_BY_MARKER: &str = "# managed by dns-update";

/// A directory of per-zone nameserver files.
///
/// # Example
///
/// ```rust,no_run
/// use dns_update::{ZoneConfig, ZoneDir};
///
/// let dir = ZoneDir::new("/etc/dns-update/zones");
/// dir.register(&ZoneConfig::new("example.com", "192.0.2.1".parse().unwrap())?)?;
/// let zones = dir.load()?;
/// # Ok::<(), dns_update::UpdateError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ZoneDir {
    dir: PathBuf,
}

impl ZoneDir {
    /// Creates a handle on `dir`; nothing is read until it is used.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Writes the file for `zone`.
    ///
    /// The content is checked by parsing it back before anything is
    /// written. An existing file is only replaced if it carries the marker.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::InvalidConfig`] for the root zone, an origin
    /// that cannot be a file name, a zone without nameservers, or an
    /// existing unmanaged file; [`UpdateError::Io`] if the directory cannot
    /// be created or the file cannot be written.
    pub fn register(&self, zone: &ZoneConfig) -> Result<()> {
        let path = self.zone_path(&zone.origin)?;
        let content = generate_file_content(zone);
        parse_file_content(zone.origin.clone(), &content)?;

        if path.exists() && !is_managed(&path) {
            tracing::warn!(
                zone = %zone.origin,
                path = %path.display(),
                "Zone file not managed by dns-update, refusing to replace"
            );
            return Err(UpdateError::InvalidConfig(format!(
                "zone file not managed by dns-update: {}",
                zone.origin
            )));
        }
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(&path, content)?;

        tracing::info!(
            zone = %zone.origin,
            class = %zone.class,
            nameservers = zone.nameservers.len(),
            "Registered zone"
        );
        Ok(())
    }

    /// Removes the managed file for `origin`.
    ///
    /// Returns `false` if there was no file.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::InvalidConfig`] if `origin` cannot be a file
    /// name or its file is unmanaged, [`UpdateError::Io`] on I/O failure.
    pub fn unregister(&self, origin: &Name) -> Result<bool> {
        let path = self.zone_path(origin)?;
        if !path.exists() {
            return Ok(false);
        }
        if !is_managed(&path) {
            return Err(UpdateError::InvalidConfig(format!(
                "zone file not managed by dns-update: {origin}"
            )));
        }
        std::fs::remove_file(&path)?;
        tracing::info!(zone = %origin, "Unregistered zone");
        Ok(true)
    }

    /// Reads the zone stored for `origin`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::InvalidConfig`] if `origin` cannot be a file
    /// name or the file does not parse, [`UpdateError::Io`] if it cannot be
    /// read.
    pub fn read(&self, origin: &Name) -> Result<Option<ZoneConfig>> {
        let path = self.zone_path(origin)?;
        if !path.is_file() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        parse_file_content(origin.clone(), &content).map(Some)
    }

    /// Reads every zone file into a [`StaticZoneCuts`] table.
    ///
    /// Unmanaged files are read too. Files that cannot be parsed are
    /// skipped with a warning. A missing directory yields an empty table.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Io`] if the directory cannot be read.
    pub fn load(&self) -> Result<StaticZoneCuts> {
        let mut zones = StaticZoneCuts::new();
        if !self.dir.exists() {
            return Ok(zones);
        }

        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let Some(origin) = file_origin(&path) else {
                tracing::debug!(path = %path.display(), "Ignoring file not named after a zone");
                continue;
            };
            match std::fs::read_to_string(&path)
                .map_err(UpdateError::from)
                .and_then(|content| parse_file_content(origin, &content))
            {
                Ok(zone) => zones.insert(zone),
                Err(e) => tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Skipping unreadable zone file"
                ),
            }
        }
        tracing::debug!(zones = zones.zones().len(), dir = %self.dir.display(), "Loaded zones");
        Ok(zones)
    }

    /// Path of the file for `origin`, which must stay inside the directory.
    fn zone_path(&self, origin: &Name) -> Result<PathBuf> {
        let file_name = origin.to_string();
        if origin.is_root()
            || file_name.starts_with('.')
            || file_name.contains(['/', '\\', '\0'])
        {
            return Err(UpdateError::InvalidConfig(format!(
                "{file_name}: not usable as a zone file name"
            )));
        }
        let path = self.dir.join(&file_name);
        if path.parent() != Some(self.dir.as_path()) {
            return Err(UpdateError::InvalidConfig(format!(
                "{file_name}: escapes {}",
                self.dir.display()
            )));
        }
        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// File content helpers
// ---------------------------------------------------------------------------

fn generate_file_content(zone: &ZoneConfig) -> String {
    let mut lines = vec![MANAGED_BY_MARKER.to_string(), format!("class {}", zone.class)];
    lines.extend(zone.nameservers.iter().map(|ns| format!("nameserver {ns}")));
    lines.push(String::new());
    lines.join("\n")
}

fn parse_file_content(origin: Name, content: &str) -> Result<ZoneConfig> {
    let mut class = Class::IN;
    let mut nameservers = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut words = line.split_whitespace();
        match (words.next(), words.next()) {
            (Some("nameserver"), Some(addr)) => {
                let ip: IpAddr = addr.parse().map_err(|_| {
                    UpdateError::InvalidConfig(format!("{origin}: bad nameserver {addr}"))
                })?;
                nameservers.push(ip);
            }
            (Some("class"), Some(c)) => {
                class = c.parse().map_err(|_| {
                    UpdateError::InvalidConfig(format!("{origin}: unknown class {c}"))
                })?;
                if class == Class::NONE || class == Class::ANY {
                    return Err(UpdateError::InvalidConfig(format!(
                        "{origin}: {class} is not a zone class"
                    )));
                }
            }
            _ => {}
        }
    }
    if nameservers.is_empty() {
        return Err(UpdateError::InvalidConfig(format!("{origin}: no nameservers")));
    }
    Ok(ZoneConfig {
        origin,
        nameservers,
        class,
    })
}

fn is_managed(path: &Path) -> bool {
    std::fs::read_to_string(path).is_ok_and(|c| c.contains(MANAGED_BY_MARKER))
}

fn file_origin(path: &Path) -> Option<Name> {
    path.file_name()?.to_str()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone() -> ZoneConfig {
        ZoneConfig::new("example.com", "192.0.2.1".parse().unwrap())
            .unwrap()
            .with_nameserver("2001:db8::53".parse().unwrap())
    }

    fn origin(s: &str) -> Name {
        s.parse().unwrap()
    }

    #[test]
    fn generated_content_parses_back() {
        let content = generate_file_content(&zone().with_class(Class::CH));
        assert!(content.starts_with(MANAGED_BY_MARKER));
        assert!(content.contains("class CH\n"));
        assert!(content.contains("nameserver 2001:db8::53\n"));
        assert_eq!(
            parse_file_content(origin("example.com"), &content).unwrap(),
            zone().with_class(Class::CH)
        );
    }

    #[test]
    fn register_read_and_unregister() {
        let dir = tempfile::tempdir().unwrap();
        let zones = ZoneDir::new(dir.path().join("zones"));

        zones.register(&zone()).unwrap();
        assert!(dir.path().join("zones/example.com").is_file());
        assert_eq!(zones.read(&origin("EXAMPLE.com")).unwrap(), Some(zone()));

        assert!(zones.unregister(&origin("example.com")).unwrap());
        assert!(zones.read(&origin("example.com")).unwrap().is_none());
        assert!(!zones.unregister(&origin("example.com")).unwrap());
    }

    #[test]
    fn register_replaces_managed_file() {
        let dir = tempfile::tempdir().unwrap();
        let zones = ZoneDir::new(dir.path());
        zones.register(&zone()).unwrap();

        let moved = ZoneConfig::new("example.com", "192.0.2.99".parse().unwrap()).unwrap();
        zones.register(&moved).unwrap();
        assert_eq!(zones.read(&origin("example.com")).unwrap(), Some(moved));
    }

    #[test]
    fn unmanaged_files_are_never_replaced_or_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("example.com");
        std::fs::write(&path, "nameserver 192.0.2.1\n").unwrap();
        let zones = ZoneDir::new(dir.path());

        assert!(zones.register(&zone()).is_err());
        assert!(zones.unregister(&origin("example.com")).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "nameserver 192.0.2.1\n");
    }

    #[test]
    fn origins_cannot_escape_the_directory() {
        let outside = tempfile::tempdir().unwrap();
        let victim = outside.path().join("victim");
        std::fs::write(&victim, "unmanaged content\n").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let zones = ZoneDir::new(dir.path().join("zones"));
        let escaping = ZoneConfig::new(victim.to_str().unwrap(), "192.0.2.1".parse().unwrap())
            .unwrap();

        let err = zones.register(&escaping).unwrap_err();
        assert!(matches!(err, UpdateError::InvalidConfig(_)));
        assert_eq!(std::fs::read_to_string(&victim).unwrap(), "unmanaged content\n");
        assert!(zones.unregister(&escaping.origin).is_err());
        assert!(zones.read(&escaping.origin).is_err());
        assert!(!dir.path().join("zones").exists());

        let backslash = ZoneConfig::new("a\\\\b.example", "192.0.2.1".parse().unwrap()).unwrap();
        assert!(zones.register(&backslash).is_err());
    }

    #[test]
    fn register_rejects_root_and_empty_servers() {
        let dir = tempfile::tempdir().unwrap();
        let zones = ZoneDir::new(dir.path());

        let mut root = zone();
        root.origin = Name::root_vec();
        assert!(zones.register(&root).is_err());

        let mut empty = zone();
        empty.nameservers.clear();
        assert!(zones.register(&empty).is_err());
        assert!(!dir.path().join("example.com").exists());
    }

    #[test]
    fn rejects_meta_classes() {
        let err = parse_file_content(origin("example.com"), "class ANY\nnameserver 192.0.2.1\n")
            .unwrap_err();
        assert!(matches!(err, UpdateError::InvalidConfig(_)));
    }

    #[test]
    fn load_reads_managed_and_unmanaged_files() {
        let dir = tempfile::tempdir().unwrap();
        let zones = ZoneDir::new(dir.path());
        zones.register(&zone().with_class(Class::CH)).unwrap();
        std::fs::write(
            dir.path().join("2.0.192.in-addr.arpa"),
            "nameserver 192.0.2.3\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("broken.example"), "nameserver nope\n").unwrap();

        let table = zones.load().unwrap();
        assert_eq!(table.zones().len(), 2);

        let forward = table.lookup(&origin("a.example.com"), Class::CH).unwrap();
        assert_eq!(forward.nameservers, zone().nameservers);
        assert!(table.lookup(&origin("a.example.com"), Class::IN).is_none());

        let reverse = table
            .lookup(&origin("7.2.0.192.in-addr.arpa"), Class::IN)
            .unwrap();
        assert_eq!(reverse.nameservers, vec!["192.0.2.3".parse::<IpAddr>().unwrap()]);
    }

    #[test]
    fn load_missing_directory_is_empty() {
        let zones = ZoneDir::new("/nonexistent/dns-update");
        assert!(zones.load().unwrap().zones().is_empty());
    }
}
