//! Ordered, delta-encoded CoAP options (RFC 7252 §3.1) plus the typed
//! accessors for the well-known option numbers.
//!
//! Wire format: each option is `(delta_nibble << 4) | length_nibble`
//! followed by optional extended delta bytes, optional extended length
//! bytes, and the value bytes. Nibble value 13 means "one extra byte,
//! value is byte + 13"; 14 means "two extra bytes, big-endian, value is
//! value + 269"; 15 is reserved, and a header byte of exactly `0xFF`
//! (both nibbles 15) is the payload marker rather than an option header.

mod block;

pub use block::{BlockOption, BlockSize};

use std::collections::BTreeMap;

use crate::constant::{self, OptionNumber, PAYLOAD_MARKER};
use crate::error::Error;
use crate::io::{ByteSource, ByteWriter};

const RESERVED_NIBBLE: u8 = 15;
const EXT8_NIBBLE: u8 = 13;
const EXT16_NIBBLE: u8 = 14;
const EXT8_OFFSET: u32 = 13;
const EXT16_OFFSET: u32 = 269;

/// Ordered map from option number to one or more raw value occurrences,
/// preserving the order options were added within a number. A
/// `BTreeMap` keeps numbers in ascending order for free, which both the
/// encoder (must emit ascending) and the ordering invariant require.
#[derive(Debug, Clone, Default)]
pub struct HeaderOptions {
    entries: BTreeMap<u16, Vec<Vec<u8>>>,
}

impl HeaderOptions {
    pub fn new() -> HeaderOptions {
        HeaderOptions { entries: BTreeMap::new() }
    }

    /// Appends an occurrence of `number`. Does not check repeatability —
    /// that is the caller's responsibility, mirroring the codec's
    /// separation of wire format from option semantics.
    pub fn add(&mut self, number: u16, value: Vec<u8>) {
        self.entries.entry(number).or_insert_with(Vec::new).push(value);
    }

    pub fn get(&self, number: u16) -> &[Vec<u8>] {
        self.entries.get(&number).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get_one(&self, number: u16) -> Option<&[u8]> {
        self.get(number).first().map(Vec::as_slice)
    }

    /// Iterates `(number, value)` pairs in the order the wire encoder
    /// must emit them: ascending by number, and in encounter order
    /// within a number.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &[u8])> {
        self.entries.iter().flat_map(|(&number, values)| values.iter().map(move |v| (number, v.as_slice())))
    }

    fn strings(&self, number: u16) -> Vec<&str> {
        self.get(number).iter().filter_map(|v| std::str::from_utf8(v).ok()).collect()
    }

    fn uint(&self, number: u16) -> Option<u32> {
        let bytes = self.get_one(number)?;
        if bytes.len() > 4 {
            return None;
        }
        let mut buf = [0u8; 4];
        buf[4 - bytes.len()..].copy_from_slice(bytes);
        Some(u32::from_be_bytes(buf))
    }

    pub fn uri_path(&self) -> Vec<&str> {
        self.strings(constant::URI_PATH.number)
    }

    pub fn uri_query(&self) -> Vec<&str> {
        self.strings(constant::URI_QUERY.number)
    }

    pub fn content_format(&self) -> Option<u16> {
        self.uint(constant::CONTENT_FORMAT.number).map(|v| v as u16)
    }

    pub fn etag(&self) -> Vec<&[u8]> {
        self.get(constant::ETAG.number).iter().map(Vec::as_slice).collect()
    }

    pub fn max_age(&self) -> Option<u32> {
        self.uint(constant::MAX_AGE.number)
    }

    pub fn accept(&self) -> Option<u16> {
        self.uint(constant::ACCEPT.number).map(|v| v as u16)
    }

    pub fn block1(&self) -> Option<BlockOption> {
        self.get_one(constant::BLOCK1.number).and_then(|b| BlockOption::from_bytes(b).ok())
    }

    pub fn block2(&self) -> Option<BlockOption> {
        self.get_one(constant::BLOCK2.number).and_then(|b| BlockOption::from_bytes(b).ok())
    }

    pub fn set_block1(&mut self, block: BlockOption) {
        self.entries.insert(constant::BLOCK1.number, vec![block.to_bytes()]);
    }

    pub fn set_block2(&mut self, block: BlockOption) {
        self.entries.insert(constant::BLOCK2.number, vec![block.to_bytes()]);
    }

    pub fn size1(&self) -> Option<u32> {
        self.uint(constant::SIZE1.number)
    }

    pub fn size2(&self) -> Option<u32> {
        self.uint(constant::SIZE2.number)
    }

    pub fn observe(&self) -> Option<u32> {
        self.uint(constant::OBSERVE.number)
    }

    pub fn if_match(&self) -> Vec<&[u8]> {
        self.get(constant::IF_MATCH.number).iter().map(Vec::as_slice).collect()
    }

    pub fn if_none_match(&self) -> bool {
        !self.get(constant::IF_NONE_MATCH.number).is_empty()
    }

    pub fn proxy_uri(&self) -> Option<&str> {
        self.get_one(constant::PROXY_URI.number).and_then(|v| std::str::from_utf8(v).ok())
    }

    pub fn proxy_scheme(&self) -> Option<&str> {
        self.get_one(constant::PROXY_SCHEME.number).and_then(|v| std::str::from_utf8(v).ok())
    }
}

impl PartialEq for HeaderOptions {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

/// Reports whether the decoder consumed a `0xFF` payload marker, so the
/// UDP framing (which requires one before any payload) and the TCP
/// framing (which does not) can each apply their own rule afterward.
pub struct OptionsEnd {
    pub payload_marker_consumed: bool,
}

/// Chooses the minimal-width nibble/extended-byte encoding for a delta or
/// length quantity.
fn encode_quantity(w: &mut ByteWriter, nibble_pos_is_high: bool, header: &mut u8, value: u32) {
    let nibble = if value < EXT8_OFFSET {
        value as u8
    } else if value < EXT16_OFFSET {
        EXT8_NIBBLE
    } else {
        EXT16_NIBBLE
    };
    if nibble_pos_is_high {
        *header |= nibble << 4;
    } else {
        *header |= nibble;
    }
    if nibble == EXT8_NIBBLE {
        w.write_u8((value - EXT8_OFFSET) as u8);
    } else if nibble == EXT16_NIBBLE {
        w.write_u16((value - EXT16_OFFSET) as u16);
    }
}

/// Encodes options in ascending number order, writing a payload marker
/// and payload afterward if `payload` is non-empty. The options must
/// already be sorted — `HeaderOptions::iter` guarantees this.
pub fn encode_options(options: &HeaderOptions, w: &mut ByteWriter) {
    let mut previous = 0u16;
    for (number, value) in options.iter() {
        let delta = (number - previous) as u32;
        previous = number;

        // The header byte must land on the wire before either extension,
        // so reserve its slot first and patch it once both nibbles are
        // known; extensions are then appended after it in wire order:
        // extended delta, extended length, value.
        let mut header = 0u8;
        let header_pos = w.len();
        w.write_u8(0); // placeholder, patched below
        encode_quantity(w, true, &mut header, delta);
        encode_quantity(w, false, &mut header, value.len() as u32);
        w.write_bytes(value);

        w.patch_u8(header_pos, header);
    }
}

/// Parses the ordered option list starting at the reader's current
/// position. `remaining_len` bounds TCP framing (stop once the declared
/// length is exhausted even without a payload marker); pass `None` for
/// UDP framing, where the marker or end-of-message is authoritative.
pub fn decode_options<'a, R: ByteSource<'a>>(
    r: &mut R,
    remaining_len: Option<usize>,
) -> Result<(HeaderOptions, OptionsEnd), Error> {
    let mut options = HeaderOptions::new();
    let mut previous: u32 = 0;
    let start = r.remaining();

    loop {
        if let Some(limit) = remaining_len {
            if start - r.remaining() >= limit {
                return Ok((options, OptionsEnd { payload_marker_consumed: false }));
            }
        }
        if r.remaining() == 0 {
            return Ok((options, OptionsEnd { payload_marker_consumed: false }));
        }

        let first = r.peek_u8()?;
        if first == PAYLOAD_MARKER {
            r.read_u8()?;
            return Ok((options, OptionsEnd { payload_marker_consumed: true }));
        }

        let header = r.read_u8()?;
        let delta_nibble = header >> 4;
        let length_nibble = header & 0x0f;

        if delta_nibble == RESERVED_NIBBLE || length_nibble == RESERVED_NIBBLE {
            return Err(Error::Format("reserved option nibble outside the payload marker".into()));
        }

        let delta = decode_quantity(r, delta_nibble)?;
        let length = decode_quantity(r, length_nibble)?;

        let number = previous
            .checked_add(delta)
            .ok_or_else(|| Error::Format("option number overflow".into()))?;
        previous = number;
        let number =
            u16::try_from(number).map_err(|_| Error::Format("option number exceeds 16 bits".into()))?;

        if let Some(descriptor) = constant::lookup(number) {
            if (length as usize) < descriptor.min_len || (length as usize) > descriptor.max_len {
                return Err(Error::Format(format!(
                    "option {} value length {} out of range [{}, {}]",
                    number, length, descriptor.min_len, descriptor.max_len
                )));
            }
        }

        let value = r.read_exact(length as usize)?.to_vec();
        options.add(number, value);
    }
}

fn decode_quantity<'a, R: ByteSource<'a>>(r: &mut R, nibble: u8) -> Result<u32, Error> {
    match nibble {
        n if n < EXT8_NIBBLE => Ok(n as u32),
        EXT8_NIBBLE => Ok(r.read_u8()? as u32 + EXT8_OFFSET),
        EXT16_NIBBLE => {
            let hi = r.read_u8()? as u32;
            let lo = r.read_u8()? as u32;
            Ok((hi << 8 | lo) + EXT16_OFFSET)
        }
        _ => unreachable!("reserved nibble filtered by caller"),
    }
}

impl OptionNumber {
    #[allow(dead_code)]
    fn in_range(&self, len: usize) -> bool {
        len >= self.min_len && len <= self.max_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(options: &HeaderOptions) -> HeaderOptions {
        let mut w = ByteWriter::new();
        encode_options(options, &mut w);
        let bytes = w.into_vec();
        let mut r = crate::io::ByteReader::new(&bytes);
        let (decoded, end) = decode_options(&mut r, None).unwrap();
        assert!(!end.payload_marker_consumed);
        assert_eq!(r.remaining(), 0);
        decoded
    }

    #[test]
    fn round_trips_repeated_and_ordered_options() {
        let mut options = HeaderOptions::new();
        options.add(constant::URI_PATH.number, b"a".to_vec());
        options.add(constant::URI_PATH.number, b"bb".to_vec());
        options.add(constant::CONTENT_FORMAT.number, vec![0x00]);
        let decoded = roundtrip(&options);
        assert_eq!(decoded.uri_path(), vec!["a", "bb"]);
        assert_eq!(decoded.content_format(), Some(0));
    }

    #[test]
    fn extended_delta_and_length_round_trip() {
        let mut options = HeaderOptions::new();
        // Proxy-Uri (35) forces an extended delta; a long value forces
        // an extended length.
        let long_value = vec![b'x'; 300];
        options.add(constant::PROXY_URI.number, long_value.clone());
        let decoded = roundtrip(&options);
        assert_eq!(decoded.get_one(constant::PROXY_URI.number), Some(long_value.as_slice()));
    }

    #[test]
    fn rejects_reserved_nibble() {
        // Header byte 0xF0 with TKL-less framing: delta nibble reserved.
        let bytes = [0xF0u8];
        let mut r = crate::io::ByteReader::new(&bytes);
        assert!(decode_options(&mut r, None).is_err());
    }

    #[test]
    fn unknown_critical_option_is_not_a_codec_error() {
        let mut options = HeaderOptions::new();
        options.add(9, vec![1, 2, 3]); // 9 is odd (critical) and unregistered
        let decoded = roundtrip(&options);
        assert_eq!(decoded.get_one(9), Some([1u8, 2, 3].as_slice()));
    }

    #[test]
    fn unknown_critical_detection_helper() {
        let descriptor = OptionNumber { number: 9, repeatable: false, min_len: 0, max_len: 8 };
        assert!(descriptor.critical());
        assert!(descriptor.in_range(3));
    }
}
