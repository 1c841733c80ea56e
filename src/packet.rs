//! The `Packet` value type and the UDP (RFC 7252) wire framing.
//!
//! Layout: `[ Ver(2) | T(2) | TKL(4) | Code(8) | MessageID(16) ]`, then
//! `TKL` token bytes, then options, then an optional `0xFF` payload marker
//! and payload.

use std::net::SocketAddr;

use crate::constant::{self, Method, PAYLOAD_MARKER};
use crate::error::Error;
use crate::io::{ByteReader, ByteWriter};
use crate::option::{decode_options, encode_options, HeaderOptions};

const VERSION: u8 = 1;

/// A CoAP token: 0..=8 opaque bytes correlating a request with its
/// response. Stored inline rather than as a `Vec` since it never exceeds
/// 8 bytes on the wire (TKL is a 4-bit field).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token {
    buf: [u8; constant::MAX_TOKEN_LEN],
    len: u8,
}

impl Token {
    pub fn new(bytes: &[u8]) -> Result<Token, Error> {
        if bytes.len() > constant::MAX_TOKEN_LEN {
            return Err(Error::Format(format!(
                "token length {} exceeds max {}",
                bytes.len(),
                constant::MAX_TOKEN_LEN
            )));
        }
        let mut buf = [0u8; constant::MAX_TOKEN_LEN];
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(Token { buf, len: bytes.len() as u8 })
    }

    pub fn empty() -> Token {
        Token { buf: [0u8; constant::MAX_TOKEN_LEN], len: 0 }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Token({:?})", self.as_slice())
    }
}

/// UDP message type. Absent entirely in TCP framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Confirmable = 0,
    NonConfirmable = 1,
    Acknowledgement = 2,
    Reset = 3,
}

impl MessageType {
    fn from_bits(bits: u8) -> MessageType {
        match bits {
            0 => MessageType::Confirmable,
            1 => MessageType::NonConfirmable,
            2 => MessageType::Acknowledgement,
            _ => MessageType::Reset,
        }
    }

    fn bits(self) -> u8 {
        self as u8
    }
}

/// `class.detail` pair for response codes (class 2..=5) and signaling
/// codes (class 7). Never constructed for class 0 — that range is either
/// `Code::Empty` or `Code::Method`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetailCode {
    pub class: u8,
    pub detail: u8,
}

impl DetailCode {
    pub fn new(class: u8, detail: u8) -> DetailCode {
        DetailCode { class, detail }
    }

    pub(crate) fn from_byte(b: u8) -> DetailCode {
        DetailCode { class: b >> 5, detail: b & 0x1f }
    }

    pub(crate) fn to_byte(self) -> u8 {
        (self.class << 5) | (self.detail & 0x1f)
    }

    pub fn is_response(self) -> bool {
        (2..=5).contains(&self.class)
    }

    pub fn is_signal(self) -> bool {
        self.class == constant::CLASS_SIGNAL
    }
}

/// The code-or-method tagged union: exactly
/// one of "no code" (a ping/empty ack), a request method, or a
/// response/signal `class.detail` pair. A sum type rather than the
/// source's two nullable fields, eliminating the mutual-exclusivity
/// invariant by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
    Empty,
    Method(Method),
    Detail(DetailCode),
}

impl Code {
    pub(crate) fn from_byte(b: u8) -> Result<Code, Error> {
        if b == 0 {
            return Ok(Code::Empty);
        }
        let class = b >> 5;
        let detail = b & 0x1f;
        if class == 0 {
            return Method::from_detail(detail)
                .map(Code::Method)
                .ok_or_else(|| Error::Format(format!("unknown method detail {}", detail)));
        }
        Ok(Code::Detail(DetailCode { class, detail }))
    }

    pub(crate) fn to_byte(self) -> u8 {
        match self {
            Code::Empty => 0,
            Code::Method(m) => m.detail(),
            Code::Detail(d) => d.to_byte(),
        }
    }
}

/// An immutable-after-construction CoAP message.
#[derive(Debug, Clone)]
pub struct Packet {
    pub remote: SocketAddr,
    pub kind: Option<MessageType>,
    pub message_id: Option<u16>,
    pub token: Token,
    pub code: Code,
    pub options: HeaderOptions,
    pub payload: Vec<u8>,
}

impl Packet {
    /// Builds a UDP-framed packet. `kind` and `message_id` are mandatory
    /// for this framing.
    pub fn new_udp(
        remote: SocketAddr,
        kind: MessageType,
        message_id: u16,
        token: Token,
        code: Code,
        options: HeaderOptions,
        payload: Vec<u8>,
    ) -> Packet {
        Packet { remote, kind: Some(kind), message_id: Some(message_id), token, code, options, payload }
    }

    /// Builds a TCP-framed packet. `kind` and `message_id` are always
    /// absent on the reliable transport.
    pub fn new_tcp(remote: SocketAddr, token: Token, code: Code, options: HeaderOptions, payload: Vec<u8>) -> Packet {
        Packet { remote, kind: None, message_id: None, token, code, options, payload }
    }
}

/// Serializes a packet using the UDP framing.
pub fn encode_udp(packet: &Packet) -> Vec<u8> {
    let kind = packet.kind.unwrap_or(MessageType::Confirmable);
    let message_id = packet.message_id.unwrap_or(0);

    let mut w = ByteWriter::with_capacity(4 + packet.token.len() + packet.payload.len() + 16);
    let header = (VERSION << 6) | (kind.bits() << 4) | (packet.token.len() as u8 & 0x0f);
    w.write_u8(header);
    w.write_u8(packet.code.to_byte());
    w.write_u16(message_id);
    w.write_bytes(packet.token.as_slice());

    encode_options(&packet.options, &mut w);

    if !packet.payload.is_empty() {
        w.write_u8(PAYLOAD_MARKER);
        w.write_bytes(&packet.payload);
    }
    w.into_vec()
}

/// Parses a UDP-framed datagram. `remote` is supplied by the transport,
/// not carried on the wire.
pub fn decode_udp(bytes: &[u8], remote: SocketAddr) -> Result<Packet, Error> {
    let mut r = ByteReader::new(bytes);
    let first = r.read_u8()?;
    let version = first >> 6;
    if version != VERSION {
        return Err(Error::Format(format!("unsupported version {}", version)));
    }
    let kind = MessageType::from_bits((first >> 4) & 0b11);
    let tkl = first & 0x0f;
    if tkl as usize > constant::MAX_TOKEN_LEN {
        return Err(Error::Format(format!("reserved TKL value {}", tkl)));
    }

    let code = Code::from_byte(r.read_u8()?)?;
    let message_id = r.read_u16()?;
    let token = Token::new(r.read_exact(tkl as usize)?)?;

    let (options, end) = decode_options(&mut r, None)?;

    let payload = if end.payload_marker_consumed {
        r.read_exact(r.remaining())?.to_vec()
    } else if r.remaining() == 0 {
        Vec::new()
    } else {
        return Err(Error::Format("trailing bytes without a payload marker".into()));
    };

    Ok(Packet {
        remote,
        kind: Some(kind),
        message_id: Some(message_id),
        token,
        code,
        options,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option::HeaderOptions;
    use std::net::{IpAddr, Ipv4Addr};

    fn remote() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 5683)
    }

    #[test]
    fn round_trip_con_get_with_uri_path() {
        let mut options = HeaderOptions::new();
        options.add(constant::URI_PATH.number, b"sensors".to_vec());
        options.add(constant::URI_PATH.number, b"temp".to_vec());

        let packet = Packet::new_udp(
            remote(),
            MessageType::Confirmable,
            0x1234,
            Token::new(&[0xAA, 0xBB]).unwrap(),
            Code::Method(Method::Get),
            options,
            Vec::new(),
        );

        let bytes = encode_udp(&packet);
        assert_eq!(
            bytes,
            [
                0x42, 0x01, 0x12, 0x34, 0xAA, 0xBB, 0xB7, b's', b'e', b'n', b's', b'o', b'r', b's',
                0x04, b't', b'e', b'm', b'p',
            ]
        );

        let decoded = decode_udp(&bytes, remote()).unwrap();
        assert_eq!(decoded.kind, Some(MessageType::Confirmable));
        assert_eq!(decoded.message_id, Some(0x1234));
        assert_eq!(decoded.token.as_slice(), &[0xAA, 0xBB]);
        assert_eq!(decoded.code, Code::Method(Method::Get));
        assert_eq!(decoded.options.uri_path(), vec!["sensors", "temp"]);
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn rejects_unsupported_version() {
        let bytes = [0x02, 0x01, 0, 0];
        assert!(decode_udp(&bytes, remote()).is_err());
    }

    #[test]
    fn rejects_missing_payload_marker() {
        // TKL=0, no options, one trailing byte that is not 0xFF.
        let bytes = [0x40, 0x01, 0, 0, 0x05];
        assert!(decode_udp(&bytes, remote()).is_err());
    }

    #[test]
    fn empty_message_round_trips() {
        let packet = Packet::new_udp(
            remote(),
            MessageType::Acknowledgement,
            7,
            Token::empty(),
            Code::Empty,
            HeaderOptions::new(),
            Vec::new(),
        );
        let bytes = encode_udp(&packet);
        let decoded = decode_udp(&bytes, remote()).unwrap();
        assert_eq!(decoded.code, Code::Empty);
    }
}
