//! Sending update messages to the active nameservers.

use crate::error::{Result, UpdateError};
use crate::state::ResolverState;
use crate::tsig::TsigKey;
use domain::base::Message;
use domain::net::client::protocol::UdpConnect;
use domain::net::client::request::{self, RequestMessage, SendRequest};
use domain::net::client::{dgram, tsig};
use std::io;
use std::net::SocketAddr;

/// Sends a message to the nameservers of a resolver state and waits for
/// one response.
///
/// Both methods return the raw response message.
pub trait Transport {
    /// Sends `query` as is.
    fn send(&mut self, state: &ResolverState, query: &[u8]) -> Result<Vec<u8>>;

    /// Signs `query` with `key` and sends it.
    ///
    /// Implementations must reject a response that is not signed with
    /// the same key.
    fn send_signed(&mut self, state: &ResolverState, query: &[u8], key: &TsigKey)
    -> Result<Vec<u8>>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, state: &ResolverState, query: &[u8]) -> Result<Vec<u8>> {
        (**self).send(state, query)
    }

    fn send_signed(
        &mut self,
        state: &ResolverState,
        query: &[u8],
        key: &TsigKey,
    ) -> Result<Vec<u8>> {
        (**self).send_signed(state, query, key)
    }
}

/// Datagram transport built on `domain`'s client connections.
///
/// Each active nameserver is tried once, in order, and the wait for each
/// is bounded by the state's timeout. Datagrams that do not answer the
/// query are ignored, and a truncated answer fails that server. The
/// connection picks its own message ID and may add an EDNS record.
#[derive(Debug, Clone, Copy, Default)]
pub struct UdpTransport;

impl UdpTransport {
    /// Creates a datagram transport.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn send_all(state: &ResolverState, query: &[u8], key: Option<&TsigKey>) -> Result<Vec<u8>> {
        let msg = Message::from_octets(query.to_vec())
            .map_err(|e| UpdateError::Encode(format!("query: {e}")))?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(UpdateError::Send)?;

        let mut last = io::Error::new(io::ErrorKind::NotConnected, "no nameservers configured");
        for &server in state.nameservers() {
            let request = RequestMessage::new(msg.clone())
                .map_err(|e| UpdateError::Encode(format!("query: {e}")))?;
            match runtime.block_on(Self::exchange(server, state, request, key)) {
                Ok(answer) => {
                    tracing::debug!(%server, len = answer.len(), "Received response");
                    return Ok(answer);
                }
                Err(e) => {
                    tracing::warn!(%server, error = %e, "Nameserver did not answer");
                    last = e;
                }
            }
        }
        Err(UpdateError::Send(last))
    }

    async fn exchange(
        server: SocketAddr,
        state: &ResolverState,
        request: RequestMessage<Vec<u8>>,
        key: Option<&TsigKey>,
    ) -> io::Result<Vec<u8>> {
        let mut config = dgram::Config::new();
        config.set_read_timeout(state.timeout());
        config.set_max_retries(1);
        let connection = dgram::Connection::with_config(UdpConnect::new(server), config);
        let connection: Box<dyn SendRequest<_>> = match key {
            Some(key) => Box::new(tsig::Connection::new(key.shared(), connection)),
            None => Box::new(connection),
        };

        let mut pending = connection.send_request(request);
        let response = tokio::time::timeout(state.timeout(), pending.get_response())
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "no response in time"))?
            .map_err(request_error)?;

        if response.header().tc() {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "truncated response"));
        }
        Ok(response.as_slice().to_vec())
    }
}

fn request_error(err: request::Error) -> io::Error {
    let kind = match err {
        request::Error::Dgram(ref e) if matches!(e.kind(), dgram::QueryErrorKind::Timeout) => {
            io::ErrorKind::TimedOut
        }
        _ => io::ErrorKind::Other,
    };
    io::Error::new(kind, err.to_string())
}

impl Transport for UdpTransport {
    fn send(&mut self, state: &ResolverState, query: &[u8]) -> Result<Vec<u8>> {
        Self::send_all(state, query, None)
    }

    fn send_signed(
        &mut self,
        state: &ResolverState,
        query: &[u8],
        key: &TsigKey,
    ) -> Result<Vec<u8>> {
        Self::send_all(state, query, Some(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::marshal;
    use crate::record::UpdateRecord;
    use domain::base::iana::{Class, Rcode, Rtype};
    use std::net::UdpSocket;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::{Duration, Instant};

    fn query() -> Vec<u8> {
        let zone = UpdateRecord::zone("example.com".parse().unwrap(), Class::IN);
        marshal(0xbeef, [&zone]).unwrap()
    }

    /// Answers one datagram by echoing it with QR set and `rcode`.
    ///
    /// Returns the address and a handle yielding the received datagram.
    fn fake_server(rcode: u8, flags: u8) -> (SocketAddr, std::thread::JoinHandle<Vec<u8>>) {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = socket.local_addr().unwrap();
        let handle = std::thread::spawn(move || {
            let mut buf = [0u8; 2048];
            let (len, peer) = socket.recv_from(&mut buf).unwrap();
            let received = buf[..len].to_vec();
            buf[2] |= 0x80 | flags;
            buf[3] = rcode;
            socket.send_to(&buf[..len], peer).unwrap();
            received
        });
        (addr, handle)
    }

    fn state(servers: &[SocketAddr]) -> ResolverState {
        servers
            .iter()
            .fold(ResolverState::new(), |s, a| s.with_nameserver(*a).unwrap())
            .with_timeout(Duration::from_millis(500))
    }

    #[test]
    fn receives_matching_response() {
        let (addr, handle) = fake_server(5, 0);
        let answer = UdpTransport::new().send(&state(&[addr]), &query()).unwrap();
        handle.join().unwrap();

        let msg = Message::from_octets(answer).unwrap();
        assert!(msg.header().qr());
        assert_eq!(msg.header().rcode(), Rcode::REFUSED);
    }

    #[test]
    fn truncated_response_is_send_error() {
        let (addr, handle) = fake_server(0, 0x02);
        let err = UdpTransport::new().send(&state(&[addr]), &query()).unwrap_err();
        handle.join().unwrap();
        assert!(err.is_send());
    }

    #[test]
    fn silent_server_times_out_then_next_is_tried() {
        let silent = UdpSocket::bind("127.0.0.1:0").unwrap();
        let (addr, handle) = fake_server(0, 0);
        let answer = UdpTransport::new()
            .send(&state(&[silent.local_addr().unwrap(), addr]), &query())
            .unwrap();
        handle.join().unwrap();
        assert_eq!(
            Message::from_octets(answer).unwrap().header().rcode(),
            Rcode::NOERROR
        );
    }

    #[test]
    fn all_servers_silent_is_timeout() {
        let silent = UdpSocket::bind("127.0.0.1:0").unwrap();
        let err = UdpTransport::new()
            .send(&state(&[silent.local_addr().unwrap()]), &query())
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn stream_of_unrelated_datagrams_does_not_extend_the_wait() {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = socket.local_addr().unwrap();
        let stop = Arc::new(AtomicBool::new(false));
        let flood = {
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || {
                let mut buf = [0u8; 2048];
                let (len, peer) = socket.recv_from(&mut buf).unwrap();
                buf[0] ^= 0xff;
                buf[2] |= 0x80;
                while !stop.load(Ordering::Relaxed) {
                    let _ = socket.send_to(&buf[..len], peer);
                    std::thread::sleep(Duration::from_millis(20));
                }
            })
        };

        let started = Instant::now();
        let err = UdpTransport::new()
            .send(&state(&[addr]), &query())
            .unwrap_err();
        let elapsed = started.elapsed();
        stop.store(true, Ordering::Relaxed);
        flood.join().unwrap();

        assert!(err.is_timeout(), "{err}");
        assert!(elapsed < Duration::from_secs(2), "waited {elapsed:?}");
    }

    #[test]
    fn no_nameservers_is_send_error() {
        let err = UdpTransport::new()
            .send(&ResolverState::new(), &query())
            .unwrap_err();
        assert!(err.is_send());
    }

    #[test]
    fn malformed_query_is_encode_error() {
        let err = UdpTransport::new()
            .send(&ResolverState::new(), &[0, 1, 2])
            .unwrap_err();
        assert!(matches!(err, UpdateError::Encode(_)));
    }

    #[test]
    fn signed_send_appends_tsig_and_rejects_unsigned_answer() {
        let (addr, handle) = fake_server(0, 0);
        let key: TsigKey = "k.example:c2VjcmV0".parse().unwrap();
        let err = UdpTransport::new()
            .send_signed(&state(&[addr]), &query(), &key)
            .unwrap_err();
        let received = Message::from_octets(handle.join().unwrap()).unwrap();

        assert!(err.is_send());
        let last = received.additional().unwrap().last().unwrap().unwrap();
        assert_eq!(last.rtype(), Rtype::TSIG);
    }
}
