//! # dns-update
//!
//! Send RFC 2136 dynamic DNS updates to the authoritative nameservers of a
//! zone.
//!
//! An update is a list of [`UpdateRecord`]s that all live in one zone. The
//! [`Updater`] finds that zone through a [`ZoneCutFinder`], builds the
//! update message, temporarily points a [`ResolverState`] at the zone's
//! nameservers, sends the message (TSIG-signed if a [`TsigKey`] is given)
//! and restores the resolver's previous nameservers before returning the
//! server's response code.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use dns_update::{Class, ResolverState, UdpTransport, UpdateRecord, Updater, ZoneDir};
//!
//! let zones = ZoneDir::new("/etc/dns-update/zones").load()?;
//! let mut state = ResolverState::load("/etc/resolv.conf")?;
//! let mut updater = Updater::new(zones, UdpTransport::new());
//!
//! let host = "host.example.com".parse()?;
//! let records = [
//!     UpdateRecord::delete_rrset(host.clone(), Class::IN, dns_update::Rtype::A),
//!     UpdateRecord::add_a(host, Class::IN, 300, "192.0.2.10".parse()?),
//! ];
//! let key = "ddns-key:c2VjcmV0".parse()?;
//! let rcode = updater.update(&mut state, &records, Some(&key))?;
//! ```
//!
//! ## Zones
//!
//! Records for different zones (for example an `A` record and its reverse
//! `PTR`) must be sent in separate calls. A failure in the second call does
//! not undo the first.
//!
//! ## Concurrency
//!
//! A [`ResolverState`] is borrowed mutably for the whole transaction, so one
//! state serves one update at a time. Use one state per thread, or wrap it
//! in a mutex.
//!
//! ## Logging
//!
//! Diagnostics are emitted through `tracing`. Install a subscriber to see
//! them; nothing is printed otherwise.

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod message;
pub mod record;
pub mod state;
pub mod transport;
pub mod tsig;
pub mod update;
pub mod zone;
pub mod zone_dir;

pub use config::{StaticZoneCuts, ZoneConfig};
pub use error::{Result, UpdateError};
pub use domain::base::iana::{Class, Rcode, Rtype};
pub use message::{MAX_UPDATE_SIZE, PACKET_SIZE};
pub use record::{Name, Operation, Section, UpdateRecord};
pub use state::{NameserverOverride, ResolverState};
pub use transport::{Transport, UdpTransport};
pub use domain::tsig::{Algorithm as TsigAlgorithm, KeyName};
pub use tsig::TsigKey;
pub use update::Updater;
pub use zone::{ZoneCut, ZoneCutFinder, ZoneGroup};
pub use zone_dir::ZoneDir;
