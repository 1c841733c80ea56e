//! Message codes, option numbers and default sizes defined by RFC 7252,
//! RFC 7959 and the reliable-transport signaling draft.

/// CoAP default UDP/TCP port. Port 5684 is reserved for the D/TLS-secured
/// variants; neither is opened by this crate (transport bindings are an
/// external collaborator).
pub const PORT: u16 = 5683;
#[allow(dead_code)]
pub const PORT_SECURE: u16 = 5684;

/// Maximum token length in bytes. TKL values 9..=15 are reserved.
pub const MAX_TOKEN_LEN: usize = 8;

/// Marks the end of the option list when a non-empty payload follows.
pub const PAYLOAD_MARKER: u8 = 0xFF;

/// Request methods (code class 0, detail 1..=7, plus the iPATCH variant).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Method {
    Get = 1,
    Post = 2,
    Put = 3,
    Delete = 4,
    Fetch = 5,
    Patch = 6,
    IPatch = 7,
}

impl Method {
    pub fn from_detail(detail: u8) -> Option<Method> {
        match detail {
            1 => Some(Method::Get),
            2 => Some(Method::Post),
            3 => Some(Method::Put),
            4 => Some(Method::Delete),
            5 => Some(Method::Fetch),
            6 => Some(Method::Patch),
            7 => Some(Method::IPatch),
            _ => None,
        }
    }

    pub fn detail(self) -> u8 {
        self as u8
    }
}

/// Signaling codes (code class 7) used on reliable transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Signal {
    Csm = 1,
    Ping = 2,
    Pong = 3,
    Release = 4,
    Abort = 5,
}

impl Signal {
    pub fn from_detail(detail: u8) -> Option<Signal> {
        match detail {
            1 => Some(Signal::Csm),
            2 => Some(Signal::Ping),
            3 => Some(Signal::Pong),
            4 => Some(Signal::Release),
            5 => Some(Signal::Abort),
            _ => None,
        }
    }

    pub fn detail(self) -> u8 {
        self as u8
    }
}

/// Code class for a synthesized 5.00 Internal Server Error, used by the
/// dispatcher when a handler fails to produce a response.
pub const CLASS_CLIENT_ERROR: u8 = 4;
pub const CLASS_SERVER_ERROR: u8 = 5;
pub const CLASS_SIGNAL: u8 = 7;
pub const DETAIL_INTERNAL_SERVER_ERROR: u8 = 0;

/// Static properties of a well-known option number: whether it is
/// critical (odd numbers), whether repeated occurrences are permitted,
/// and the registered value-length range.
#[derive(Debug, Clone, Copy)]
pub struct OptionNumber {
    pub number: u16,
    pub repeatable: bool,
    pub min_len: usize,
    pub max_len: usize,
}

impl OptionNumber {
    /// Criticality is derived from parity, not stored: odd option numbers
    /// are critical, even numbers are elective (RFC 7252 §5.4.1).
    pub fn critical(&self) -> bool {
        self.number % 2 == 1
    }
}

pub const IF_MATCH: OptionNumber = OptionNumber { number: 1, repeatable: true, min_len: 0, max_len: 8 };
pub const URI_HOST: OptionNumber = OptionNumber { number: 3, repeatable: false, min_len: 1, max_len: 255 };
pub const ETAG: OptionNumber = OptionNumber { number: 4, repeatable: true, min_len: 1, max_len: 8 };
pub const IF_NONE_MATCH: OptionNumber = OptionNumber { number: 5, repeatable: false, min_len: 0, max_len: 0 };
pub const URI_PORT: OptionNumber = OptionNumber { number: 7, repeatable: false, min_len: 0, max_len: 2 };
pub const LOCATION_PATH: OptionNumber = OptionNumber { number: 8, repeatable: true, min_len: 0, max_len: 255 };
pub const URI_PATH: OptionNumber = OptionNumber { number: 11, repeatable: true, min_len: 0, max_len: 255 };
pub const CONTENT_FORMAT: OptionNumber = OptionNumber { number: 12, repeatable: false, min_len: 0, max_len: 2 };
pub const MAX_AGE: OptionNumber = OptionNumber { number: 14, repeatable: false, min_len: 0, max_len: 4 };
pub const URI_QUERY: OptionNumber = OptionNumber { number: 15, repeatable: true, min_len: 0, max_len: 255 };
pub const ACCEPT: OptionNumber = OptionNumber { number: 17, repeatable: false, min_len: 0, max_len: 2 };
pub const LOCATION_QUERY: OptionNumber = OptionNumber { number: 20, repeatable: true, min_len: 0, max_len: 255 };
pub const BLOCK2: OptionNumber = OptionNumber { number: 23, repeatable: false, min_len: 0, max_len: 3 };
pub const BLOCK1: OptionNumber = OptionNumber { number: 27, repeatable: false, min_len: 0, max_len: 3 };
pub const SIZE2: OptionNumber = OptionNumber { number: 28, repeatable: false, min_len: 0, max_len: 4 };
pub const PROXY_URI: OptionNumber = OptionNumber { number: 35, repeatable: false, min_len: 1, max_len: 1034 };
pub const PROXY_SCHEME: OptionNumber = OptionNumber { number: 39, repeatable: false, min_len: 1, max_len: 255 };
pub const SIZE1: OptionNumber = OptionNumber { number: 60, repeatable: false, min_len: 0, max_len: 4 };
pub const OBSERVE: OptionNumber = OptionNumber { number: 6, repeatable: false, min_len: 0, max_len: 3 };

/// Looks up the registered descriptor for an option number, if known.
/// Unknown numbers are not an error at the codec layer:
/// criticality-based rejection of unrecognized critical options is a
/// dispatch-level concern.
pub fn lookup(number: u16) -> Option<OptionNumber> {
    const KNOWN: &[OptionNumber] = &[
        IF_MATCH, URI_HOST, ETAG, IF_NONE_MATCH, OBSERVE, URI_PORT, LOCATION_PATH, URI_PATH,
        CONTENT_FORMAT, MAX_AGE, URI_QUERY, ACCEPT, LOCATION_QUERY, BLOCK2, BLOCK1, SIZE2,
        PROXY_URI, PROXY_SCHEME, SIZE1,
    ];
    KNOWN.iter().copied().find(|o| o.number == number)
}
