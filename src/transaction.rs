//! Correlates outgoing requests with the responses or errors that later
//! arrive for them. A transaction is keyed by `(token, remote)` rather
//! than token alone, since the same token value may be in flight to two
//! different peers at once.

use std::net::SocketAddr;

use dashmap::DashMap;
use log::trace;

use crate::error::Error;
use crate::packet::{Packet, Token};

/// The correlation key for a pending request: its token plus the peer it
/// was sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DelayedTransactionId {
    pub token: Token,
    pub remote: SocketAddr,
}

impl DelayedTransactionId {
    pub fn new(token: Token, remote: SocketAddr) -> DelayedTransactionId {
        DelayedTransactionId { token, remote }
    }
}

/// The two callbacks a caller supplies when it hands a request to the
/// dispatcher: one fired once the request has actually been written to
/// the transport, one fired once a matching response (or a terminal
/// error) is available. `on_sent` is taken out of the record in place
/// (the record stays registered for the response that follows);
/// `on_response` is only ever consumed together with the record itself,
/// by `take`/`drain_by_remote`.
pub struct ResponseCallback {
    on_sent: Option<Box<dyn FnOnce() + Send>>,
    pub on_response: Box<dyn FnOnce(Result<Packet, Error>) + Send>,
}

impl ResponseCallback {
    pub fn new(
        on_sent: impl FnOnce() + Send + 'static,
        on_response: impl FnOnce(Result<Packet, Error>) + Send + 'static,
    ) -> ResponseCallback {
        ResponseCallback { on_sent: Some(Box::new(on_sent)), on_response: Box::new(on_response) }
    }
}

/// The set of requests awaiting a response, indexed by
/// `DelayedTransactionId`. Backed by a `DashMap` so the dispatcher can be
/// driven from several transport-reader threads at once without an
/// outer lock.
#[derive(Default)]
pub struct TransactionMap {
    pending: DashMap<DelayedTransactionId, ResponseCallback>,
}

impl TransactionMap {
    pub fn new() -> TransactionMap {
        TransactionMap { pending: DashMap::new() }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Registers a pending transaction. Returns the previous callback
    /// under this id, if the caller reused a token that was still in
    /// flight — the caller decides whether that is an error.
    pub fn insert(&self, id: DelayedTransactionId, callback: ResponseCallback) -> Option<ResponseCallback> {
        trace!("registering transaction for token {:?} remote {}", id.token, id.remote);
        self.pending.insert(id, callback)
    }

    /// Removes and returns the callback for `id`, if one is pending.
    pub fn take(&self, id: &DelayedTransactionId) -> Option<ResponseCallback> {
        self.pending.remove(id).map(|(_, cb)| cb)
    }

    /// Fires the `on_sent` hook for a still-pending transaction without
    /// removing it, so the registered `on_response` remains reachable
    /// for the reply that follows. A no-op if the transaction is gone
    /// (e.g. already failed and removed) or its hook already fired.
    pub fn fire_on_sent(&self, id: &DelayedTransactionId) {
        if let Some(mut entry) = self.pending.get_mut(id) {
            if let Some(hook) = entry.on_sent.take() {
                hook();
            }
        }
    }

    /// Removes and returns every transaction still pending against
    /// `remote`, in no particular order. Used when a connection is torn
    /// down and its in-flight requests must be failed.
    pub fn drain_by_remote(&self, remote: SocketAddr) -> Vec<(DelayedTransactionId, ResponseCallback)> {
        let ids: Vec<DelayedTransactionId> =
            self.pending.iter().filter(|e| e.key().remote == remote).map(|e| *e.key()).collect();
        ids.into_iter().filter_map(|id| self.pending.remove(&id)).collect()
    }
}
