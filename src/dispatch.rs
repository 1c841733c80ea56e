//! Server-side dispatch for the reliable (TCP) transport: classifies an
//! inbound packet, answers the signaling sub-protocol, routes requests
//! to a `Handler`, and matches responses against the transaction map.
//!
//! The dispatcher holds no socket of its own — it calls back into a
//! `Transport` to actually write bytes, and is driven by whatever reads
//! the stream and calls `on_receive`/`on_disconnected`.

use std::net::SocketAddr;
use std::panic::{self, AssertUnwindSafe};

use log::{debug, warn};

use crate::constant::{self, Signal};
use crate::error::Error;
use crate::packet::{Code, DetailCode, Packet};
use crate::tcp::encode_tcp;
use crate::transaction::{DelayedTransactionId, ResponseCallback, TransactionMap};
use crate::transport::{Handler, Transport};

/// Drives the receive pipeline and owns the transaction map. Generic
/// over the transport and handler so callers pay no dynamic-dispatch
/// cost for either.
pub struct Dispatcher<T: Transport, H: Handler> {
    transport: T,
    handler: H,
    transactions: TransactionMap,
}

impl<T: Transport, H: Handler> Dispatcher<T, H> {
    pub fn new(transport: T, handler: H) -> Dispatcher<T, H> {
        Dispatcher { transport, handler, transactions: TransactionMap::new() }
    }

    pub fn transactions(&self) -> &TransactionMap {
        &self.transactions
    }

    /// Classifies and handles one inbound packet already decoded from
    /// `remote`'s stream.
    pub fn on_receive(&self, packet: Packet) {
        match packet.code {
            Code::Empty => {
                debug!("received empty/ping message from {}", packet.remote);
            }
            Code::Detail(detail) if detail.is_signal() => self.on_signal(detail, packet),
            Code::Method(_) => self.on_request(packet),
            Code::Detail(_) => self.on_response(packet),
        }
    }

    fn on_signal(&self, detail: DetailCode, packet: Packet) {
        match Signal::from_detail(detail.detail) {
            Some(Signal::Ping) => {
                let pong = Packet::new_tcp(
                    packet.remote,
                    packet.token,
                    Code::Detail(DetailCode::new(constant::CLASS_SIGNAL, Signal::Pong.detail())),
                    crate::option::HeaderOptions::new(),
                    Vec::new(),
                );
                if let Err(e) = self.transport.send(&encode_tcp(&pong), packet.remote) {
                    warn!("failed to send PONG to {}: {}", packet.remote, e);
                }
            }
            Some(Signal::Pong) => self.on_response(packet),
            Some(Signal::Abort) => {
                debug!("received ABORT from {}, disconnecting", packet.remote);
                self.disconnect(packet.remote);
            }
            Some(Signal::Csm) | Some(Signal::Release) | None => {
                debug!("ignoring signal code {:?} from {}", detail, packet.remote);
            }
        }
    }

    fn on_request(&self, packet: Packet) {
        let remote = packet.remote;
        let response = panic::catch_unwind(AssertUnwindSafe(|| self.handler.handle(&packet)));
        let response = match response {
            Ok(r) => r,
            Err(payload) => {
                let reason = panic_message(&payload);
                let err = Error::HandlerFailed(reason);
                warn!("handler failed for request from {}: {}, synthesizing 5.00", remote, err);
                internal_server_error(&packet)
            }
        };
        if let Err(e) = self.transport.send(&encode_tcp(&response), remote) {
            warn!("failed to send response to {}: {}", remote, e);
        }
    }

    fn on_response(&self, packet: Packet) {
        let id = DelayedTransactionId::new(packet.token, packet.remote);
        match self.transactions.take(&id) {
            Some(callback) => (callback.on_response)(Ok(packet)),
            None => debug!("dropping unmatched response from {} (no pending transaction)", packet.remote),
        }
    }

    /// Sends a request and registers its transaction before sending, so
    /// a fast-arriving response can never race ahead of the insert.
    pub fn make_request(&self, packet: &Packet, callback: ResponseCallback) {
        let id = DelayedTransactionId::new(packet.token, packet.remote);
        self.transactions.insert(id, callback);

        match self.transport.send(&encode_tcp(packet), packet.remote) {
            Ok(()) => self.transactions.fire_on_sent(&id),
            Err(e) => {
                if let Some(callback) = self.transactions.take(&id) {
                    (callback.on_response)(Err(e));
                }
            }
        }
    }

    /// Fails and removes every transaction pending against `remote`.
    pub fn disconnect(&self, remote: SocketAddr) {
        for (_, callback) in self.transactions.drain_by_remote(remote) {
            (callback.on_response)(Err(Error::TransportClosed));
        }
    }
}

/// Extracts a printable message from a caught panic payload, for
/// reporting through `Error::HandlerFailed`.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked with a non-string payload".to_string()
    }
}

fn internal_server_error(request: &Packet) -> Packet {
    Packet::new_tcp(
        request.remote,
        request.token,
        Code::Detail(DetailCode::new(constant::CLASS_SERVER_ERROR, constant::DETAIL_INTERNAL_SERVER_ERROR)),
        crate::option::HeaderOptions::new(),
        Vec::new(),
    )
}
