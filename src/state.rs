//! Resolver state shared across update transactions.

use crate::error::{Result, UpdateError};
use std::net::{IpAddr, SocketAddr};
use std::ops::Deref;
use std::path::Path;
use std::time::Duration;

/// Most nameservers a resolver state (or a zone) may hold.
pub const MAX_NAMESERVERS: usize = 16;

/// Port nameservers listen on.
pub const NAMESERVER_PORT: u16 = 53;

/// Default time to wait for a response from one server.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Nameserver list and transport parameters of one resolver handle.
///
/// An update transaction temporarily replaces the nameserver list with the
/// target zone's authoritative servers. Only one transaction may run
/// against a given state at a time; the `&mut` borrow taken by
/// [`Updater::update`](crate::Updater::update) enforces this.
///
/// # Example
///
/// ```
/// use dns_update::ResolverState;
/// use std::time::Duration;
///
/// let state = ResolverState::new()
///     .with_nameserver("192.0.2.53:53".parse().unwrap())
///     .unwrap()
///     .with_timeout(Duration::from_secs(2));
///
/// assert_eq!(state.nameservers().len(), 1);
/// assert_eq!(state.timeout(), Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverState {
    nameservers: Vec<SocketAddr>,
    timeout: Duration,
}

impl ResolverState {
    /// Creates a state with no nameservers and the default timeout.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            nameservers: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Appends a nameserver.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::InvalidConfig`] if the list is already full.
    pub fn with_nameserver(mut self, addr: SocketAddr) -> Result<Self> {
        if self.nameservers.len() >= MAX_NAMESERVERS {
            return Err(UpdateError::InvalidConfig(format!(
                "more than {MAX_NAMESERVERS} nameservers"
            )));
        }
        self.nameservers.push(addr);
        Ok(self)
    }

    /// Overrides the per-server response timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The active nameservers, in the order they are tried.
    #[must_use]
    pub fn nameservers(&self) -> &[SocketAddr] {
        &self.nameservers
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns a fresh random message ID.
    #[must_use]
    pub fn next_id(&self) -> u16 {
        rand::random()
    }

    /// Parses `resolv.conf` text.
    ///
    /// Understands `nameserver <ip>` and `options timeout:<secs>`; other
    /// directives and `#`/`;` comments are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::InvalidConfig`] for an unparseable address or
    /// timeout, or more than [`MAX_NAMESERVERS`] nameservers.
    pub fn from_resolv_conf(text: &str) -> Result<Self> {
        let mut state = Self::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            let mut words = line.split_whitespace();
            match words.next() {
                Some("nameserver") => {
                    let Some(addr) = words.next() else {
                        return Err(UpdateError::InvalidConfig(
                            "nameserver without address".to_string(),
                        ));
                    };
                    let ip: IpAddr = addr.parse().map_err(|_| {
                        UpdateError::InvalidConfig(format!("bad nameserver address: {addr}"))
                    })?;
                    state = state.with_nameserver(SocketAddr::new(ip, NAMESERVER_PORT))?;
                }
                Some("options") => {
                    for opt in words {
                        if let Some(secs) = opt.strip_prefix("timeout:") {
                            let secs: u64 = secs.parse().map_err(|_| {
                                UpdateError::InvalidConfig(format!("bad timeout: {opt}"))
                            })?;
                            state.timeout = Duration::from_secs(secs.max(1));
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(state)
    }

    /// Reads and parses a `resolv.conf` file.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Io`] if the file cannot be read, otherwise as
    /// [`from_resolv_conf`](Self::from_resolv_conf).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let state = Self::from_resolv_conf(&std::fs::read_to_string(path)?)?;
        tracing::debug!(
            path = %path.display(),
            nameservers = state.nameservers.len(),
            "Loaded resolver state"
        );
        Ok(state)
    }

    /// Replaces the nameserver list with `servers` until the guard drops.
    ///
    /// Each address is installed on [`NAMESERVER_PORT`]. At most
    /// [`MAX_NAMESERVERS`] are used. The previous list, in its original
    /// order, is put back when the returned guard goes out of scope, on
    /// every exit path.
    pub fn promote(&mut self, servers: &[IpAddr]) -> NameserverOverride<'_> {
        let promoted: Vec<SocketAddr> = servers
            .iter()
            .take(MAX_NAMESERVERS)
            .map(|ip| SocketAddr::new(*ip, NAMESERVER_PORT))
            .collect();
        tracing::debug!(count = promoted.len(), "Promoting zone nameservers");
        let saved = std::mem::replace(&mut self.nameservers, promoted);
        NameserverOverride { state: self, saved }
    }
}

impl Default for ResolverState {
    fn default() -> Self {
        Self::new()
    }
}

/// Scope guard holding a temporarily replaced nameserver list.
///
/// Dereferences to the [`ResolverState`] so the promoted list can be used
/// for sending. Dropping the guard restores the saved list.
#[derive(Debug)]
pub struct NameserverOverride<'a> {
    state: &'a mut ResolverState,
    saved: Vec<SocketAddr>,
}

impl Deref for NameserverOverride<'_> {
    type Target = ResolverState;

    fn deref(&self) -> &ResolverState {
        self.state
    }
}

impl Drop for NameserverOverride<'_> {
    fn drop(&mut self) {
        self.state.nameservers = std::mem::take(&mut self.saved);
        tracing::debug!(
            count = self.state.nameservers.len(),
            "Restored resolver nameservers"
        );
    }
}
