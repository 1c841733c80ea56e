//! The TCP framing defined by the CoAP-over-reliable-transports draft
//! (draft-ietf-core-coap-tcp-tls): a variable-length `Len|TKL` header
//! nibble pair instead of UDP's fixed 4-byte header, and no `Ver`/`T`/
//! `MessageID` fields at all — ordering and delivery are the stream's job.
//!
//! Layout: `[ Len(4) | TKL(4) ]`, optionally extended by 1, 2 or 4 bytes
//! depending on the `Len` nibble, then `Code(8)`, then `TKL` token bytes,
//! then options, then an optional payload marker and payload. `Len` counts
//! only token + options + optional marker + payload — the code byte and
//! the Len/TKL nibble pair are never included in it.

use std::net::SocketAddr;

use crate::constant::{self, PAYLOAD_MARKER};
use crate::error::Error;
use crate::io::{ByteWriter, PeekReader};
use crate::option::decode_options;
use crate::packet::{Code, Packet, Token};

const LEN_EXT8_NIBBLE: u8 = 13;
const LEN_EXT16_NIBBLE: u8 = 14;
const LEN_EXT32_NIBBLE: u8 = 15;
const LEN_EXT8_OFFSET: u32 = 13;
const LEN_EXT16_OFFSET: u32 = 269;
const LEN_EXT32_OFFSET: u32 = 65805;

/// Outcome of attempting to decode one message from a possibly-partial
/// TCP receive buffer.
#[derive(Debug)]
pub enum Decoded {
    /// A full message was present. `consumed` is the number of leading
    /// bytes of the input slice it occupied; the caller drains that many
    /// bytes and retries decoding on what remains, since a stream buffer
    /// may hold more than one pipelined message.
    Complete { packet: Packet, consumed: usize },
    /// Not enough bytes were buffered yet. The caller must wait for more
    /// data to arrive and retry from the start of the same slice.
    Incomplete,
}

/// Serializes a packet using the TCP framing. `packet.kind` and
/// `packet.message_id` are ignored; this framing carries neither.
pub fn encode_tcp(packet: &Packet) -> Vec<u8> {
    // `length` counts token + options + optional marker + payload only —
    // the code byte and the Len/TKL nibble pair are never part of it.
    let mut body = ByteWriter::new();
    body.write_bytes(packet.token.as_slice());
    crate::option::encode_options(&packet.options, &mut body);
    if !packet.payload.is_empty() {
        body.write_u8(PAYLOAD_MARKER);
        body.write_bytes(&packet.payload);
    }
    let body = body.into_vec();
    let length = body.len() as u32;

    let mut w = ByteWriter::with_capacity(body.len() + 7);
    let tkl = packet.token.len() as u8 & 0x0f;
    if length < LEN_EXT8_OFFSET {
        w.write_u8(((length as u8) << 4) | tkl);
    } else if length < LEN_EXT16_OFFSET {
        w.write_u8((LEN_EXT8_NIBBLE << 4) | tkl);
        w.write_u8((length - LEN_EXT8_OFFSET) as u8);
    } else if length < LEN_EXT32_OFFSET {
        w.write_u8((LEN_EXT16_NIBBLE << 4) | tkl);
        w.write_u16((length - LEN_EXT16_OFFSET) as u16);
    } else {
        w.write_u8((LEN_EXT32_NIBBLE << 4) | tkl);
        w.write_u32(length - LEN_EXT32_OFFSET);
    }
    w.write_u8(packet.code.to_byte());
    w.write_bytes(&body);
    w.into_vec()
}

/// Parses one TCP-framed message from the front of `bytes`, if a complete
/// one is present. Uses a `PeekReader` throughout: any short read bails
/// out to `Decoded::Incomplete` without disturbing the caller's buffer.
pub fn decode_tcp_buffered(bytes: &[u8], remote: SocketAddr) -> Result<Decoded, Error> {
    let mut r = PeekReader::new(bytes);

    let first = match r.read_u8() {
        Ok(b) => b,
        Err(Error::InsufficientData) => return Ok(Decoded::Incomplete),
        Err(e) => return Err(e),
    };
    let len_nibble = first >> 4;
    let tkl = first & 0x0f;
    if tkl as usize > constant::MAX_TOKEN_LEN {
        return Err(Error::Format(format!("reserved TKL value {}", tkl)));
    }

    let length = match read_extended_length(&mut r, len_nibble) {
        Ok(n) => n,
        Err(Error::InsufficientData) => return Ok(Decoded::Incomplete),
        Err(e) => return Err(e),
    };

    let header_end = r.position();
    // `length` counts token + options + marker + payload; the code byte
    // rides along separately, ahead of it.
    if r.remaining() < 1 + length as usize {
        return Ok(Decoded::Incomplete);
    }

    let code = match r.read_u8() {
        Ok(b) => Code::from_byte(b)?,
        Err(Error::InsufficientData) => return Ok(Decoded::Incomplete),
        Err(e) => return Err(e),
    };
    let token_bytes = match r.read_exact(tkl as usize) {
        Ok(b) => b,
        Err(Error::InsufficientData) => return Ok(Decoded::Incomplete),
        Err(e) => return Err(e),
    };
    let token = Token::new(token_bytes)?;

    let remaining_for_body = length as usize - tkl as usize;
    let before = r.remaining();
    let (options, end) = match decode_options(&mut r, Some(remaining_for_body)) {
        Ok(v) => v,
        Err(Error::InsufficientData) => return Ok(Decoded::Incomplete),
        Err(e) => return Err(e),
    };
    let after = r.remaining();
    let consumed_by_options = before - after;
    let remaining_for_payload = remaining_for_body - consumed_by_options;

    let payload = if end.payload_marker_consumed {
        match r.read_exact(remaining_for_payload) {
            Ok(b) => b.to_vec(),
            Err(Error::InsufficientData) => return Ok(Decoded::Incomplete),
            Err(e) => return Err(e),
        }
    } else {
        Vec::new()
    };

    let consumed = header_end + 1 + length as usize;
    Ok(Decoded::Complete { packet: Packet::new_tcp(remote, token, code, options, payload), consumed })
}

fn read_extended_length(r: &mut PeekReader, nibble: u8) -> Result<u32, Error> {
    match nibble {
        0..=12 => Ok(nibble as u32),
        LEN_EXT8_NIBBLE => Ok(r.read_u8()? as u32 + LEN_EXT8_OFFSET),
        LEN_EXT16_NIBBLE => Ok(r.read_u16()? as u32 + LEN_EXT16_OFFSET),
        LEN_EXT32_NIBBLE => Ok(r.read_u32()? + LEN_EXT32_OFFSET),
        _ => unreachable!("nibble is masked to 4 bits"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::Method;
    use crate::option::HeaderOptions;
    use crate::packet::Code;
    use std::net::{IpAddr, Ipv4Addr};

    fn remote() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 5683)
    }

    fn make_packet(payload: Vec<u8>) -> Packet {
        let mut options = HeaderOptions::new();
        options.add(constant::URI_PATH.number, b"large".to_vec());
        Packet::new_tcp(remote(), Token::new(&[0x01]).unwrap(), Code::Method(Method::Get), options, payload)
    }

    #[test]
    fn round_trips_small_message() {
        let packet = make_packet(Vec::new());
        let bytes = encode_tcp(&packet);
        match decode_tcp_buffered(&bytes, remote()).unwrap() {
            Decoded::Complete { packet: decoded, consumed } => {
                assert_eq!(consumed, bytes.len());
                assert_eq!(decoded.code, Code::Method(Method::Get));
                assert_eq!(decoded.options.uri_path(), vec!["large"]);
                assert!(decoded.payload.is_empty());
            }
            Decoded::Incomplete => panic!("expected a complete message"),
        }
    }

    #[test]
    fn round_trips_message_requiring_extended_length() {
        // 300-byte payload forces the Len nibble into the EXT16 range.
        let packet = make_packet(vec![0x7Au8; 300]);
        let bytes = encode_tcp(&packet);
        assert_eq!(bytes[0] >> 4, LEN_EXT16_NIBBLE);

        match decode_tcp_buffered(&bytes, remote()).unwrap() {
            Decoded::Complete { packet: decoded, consumed } => {
                assert_eq!(consumed, bytes.len());
                assert_eq!(decoded.payload.len(), 300);
            }
            Decoded::Incomplete => panic!("expected a complete message"),
        }
    }

    #[test]
    fn length_prefix_excludes_the_code_byte() {
        // Empty token, a single 5-byte option (header + 4-byte value),
        // and a 300-byte payload: length = 0 + 5 + 1(marker) + 300 = 306,
        // which needs the EXT16 nibble with extended bytes 306-269=37.
        let mut options = HeaderOptions::new();
        options.add(constant::URI_PATH.number, b"temp".to_vec());
        let packet = Packet::new_tcp(remote(), Token::empty(), Code::Method(Method::Get), options, vec![0u8; 300]);

        let bytes = encode_tcp(&packet);
        assert_eq!(bytes[0], (LEN_EXT16_NIBBLE << 4) | 0x00);
        assert_eq!(&bytes[1..3], &[0x00, 0x25]);
    }

    #[test]
    fn reports_incomplete_on_truncated_buffer() {
        let packet = make_packet(vec![0xAAu8; 50]);
        let bytes = encode_tcp(&packet);
        let truncated = &bytes[..bytes.len() - 10];
        assert!(matches!(decode_tcp_buffered(truncated, remote()).unwrap(), Decoded::Incomplete));
    }

    #[test]
    fn decodes_second_pipelined_message_after_consuming_first() {
        let first = make_packet(Vec::new());
        let second = make_packet(vec![0x01, 0x02, 0x03]);
        let mut buf = encode_tcp(&first);
        buf.extend_from_slice(&encode_tcp(&second));

        let (packet1, consumed1) = match decode_tcp_buffered(&buf, remote()).unwrap() {
            Decoded::Complete { packet, consumed } => (packet, consumed),
            Decoded::Incomplete => panic!("expected a complete message"),
        };
        assert!(packet1.payload.is_empty());

        match decode_tcp_buffered(&buf[consumed1..], remote()).unwrap() {
            Decoded::Complete { packet, .. } => assert_eq!(packet.payload, vec![0x01, 0x02, 0x03]),
            Decoded::Incomplete => panic!("expected the second message to be complete"),
        }
    }
}
