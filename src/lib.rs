//! Packet codec and transaction dispatch core for CoAP (RFC 7252)
//! endpoints, covering both the UDP framing and the TCP framing defined
//! by the CoAP-over-reliable-transports draft.
//!
//! This crate owns no socket and spawns no thread: it decodes/encodes
//! packets, tracks in-flight requests, and drives the signaling
//! sub-protocol, consuming a [`transport::Transport`] to write bytes and
//! a [`transport::Handler`] to answer requests. Wiring either trait to a
//! real `TcpStream`/`UdpSocket` and an executor is left to the embedder.
//!
//! # Examples
//! ```no_run
//! use coap_core::constant::Method;
//! use coap_core::dispatch::Dispatcher;
//! use coap_core::option::HeaderOptions;
//! use coap_core::packet::{Code, DetailCode, Packet, Token};
//! use coap_core::error::Error;
//! use coap_core::transport::{Handler, Transport};
//! use std::net::SocketAddr;
//!
//! struct NullTransport;
//! impl Transport for NullTransport {
//!     fn send(&self, _bytes: &[u8], _remote: SocketAddr) -> Result<(), Error> {
//!         Ok(())
//!     }
//! }
//!
//! struct Echo;
//! impl Handler for Echo {
//!     fn handle(&self, request: &Packet) -> Packet {
//!         Packet::new_tcp(request.remote, request.token, Code::Detail(DetailCode::new(2, 5)), HeaderOptions::new(), Vec::new())
//!     }
//! }
//!
//! let _dispatcher = Dispatcher::new(NullTransport, Echo);
//! let _ = Method::Get;
//! ```

pub mod constant;
pub mod dispatch;
pub mod error;
pub mod io;
pub mod option;
pub mod packet;
pub mod tcp;
pub mod transaction;
pub mod transport;
