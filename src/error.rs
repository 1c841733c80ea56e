// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

use std::error;
use std::fmt;
use std::io::Error as IOError;

/// Every failure kind the core can produce.
///
/// Codec errors (`Format`, `InsufficientData`, `EndOfStream`) stay local to
/// whichever decode call produced them; the caller decides whether that
/// means dropping a datagram or waiting for more bytes. `TransportClosed`
/// and `HandlerFailed` are transaction-scoped and are delivered through a
/// response callback rather than returned from the function that detected
/// them.
#[derive(Debug)]
pub enum Error {
    /// Malformed bytes on the wire: bad version, reserved option nibble,
    /// TKL out of range, missing payload marker before a non-empty payload.
    Format(String),
    /// The peek decoder needs more bytes than are currently buffered.
    /// Distinct from `EndOfStream`: the stream may still produce them.
    InsufficientData,
    /// The byte stream ended before a complete packet could be read.
    EndOfStream,
    /// A send failed, or the remote disconnected while a transaction was
    /// still pending on it.
    TransportClosed,
    /// A resource handler did not produce a response.
    HandlerFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Format(reason) => write!(f, "malformed CoAP message: {}", reason),
            Error::InsufficientData => write!(f, "not enough data buffered yet"),
            Error::EndOfStream => write!(f, "stream ended before a complete message"),
            Error::TransportClosed => write!(f, "transport closed or send failed"),
            Error::HandlerFailed(reason) => write!(f, "handler failed: {}", reason),
        }
    }
}

impl From<IOError> for Error {
    fn from(e: IOError) -> Self {
        Error::Format(e.to_string())
    }
}

// This is important for other errors to wrap this one.
impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        None
    }
}
