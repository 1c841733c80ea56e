//! The two traits an embedder implements to wire this crate to an actual
//! socket and actual request handling. Neither trait assumes a runtime:
//! `send` returns once the bytes are handed off (or rejected), and
//! `handle` returns its response synchronously. An embedder bridging an
//! async transport or handler awaits on its own side and reports the
//! outcome through these synchronous signatures.

use std::net::SocketAddr;

use crate::error::Error;
use crate::packet::Packet;

/// The outbound half of a transport: hand a pre-encoded frame to the
/// peer at `remote`. Framing (UDP datagram vs TCP length-prefixed
/// stream) is the implementor's concern; this crate only ever calls
/// `send` with bytes already produced by `encode_udp`/`encode_tcp`.
pub trait Transport {
    fn send(&self, bytes: &[u8], remote: SocketAddr) -> Result<(), Error>;
}

/// A resource handler: turns a request packet into a response packet.
/// Per spec, the response's token MUST equal the request's, and (UDP
/// only) its message id MUST equal the request's for piggy-backed ACK
/// semantics. The dispatcher does not enforce this — it is the
/// handler's contract with its caller, the same as any function
/// postcondition.
pub trait Handler {
    fn handle(&self, request: &Packet) -> Packet;
}
