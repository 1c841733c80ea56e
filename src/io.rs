// Primitive byte I/O for the packet codecs.
//
// Two reader types share the same layout (a byte slice plus a cursor) but
// differ in what they do on a short read: `ByteReader` treats it as the
// stream having definitively ended, `PeekReader` treats it as "try again
// once more bytes are buffered" and leaves the cursor untouched so the
// caller can retry from the same position.

use byteorder::{BigEndian, ByteOrder};

use crate::error::Error;

/// Shared cursor surface the option codec decodes against, so the same
/// delta-encoding walk serves both the UDP decoder (backed by
/// `ByteReader`) and the TCP streaming decoder (backed by `PeekReader`).
pub trait ByteSource<'a> {
    fn peek_u8(&self) -> Result<u8, Error>;
    fn read_u8(&mut self) -> Result<u8, Error>;
    fn read_exact(&mut self, n: usize) -> Result<&'a [u8], Error>;
    fn remaining(&self) -> usize;
}

/// Strict reader over a fully-buffered slice. A short read is
/// `Error::EndOfStream` — there is nothing left to wait for.
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        ByteReader { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn read_u8(&mut self) -> Result<u8, Error> {
        let b = *self.buf.get(self.pos).ok_or(Error::EndOfStream)?;
        self.pos += 1;
        Ok(b)
    }

    pub fn read_u16(&mut self) -> Result<u16, Error> {
        let bytes = self.read_exact(2)?;
        Ok(BigEndian::read_u16(bytes))
    }

    pub fn read_u24(&mut self) -> Result<u32, Error> {
        let bytes = self.read_exact(3)?;
        Ok(BigEndian::read_u24(bytes))
    }

    pub fn read_u32(&mut self) -> Result<u32, Error> {
        let bytes = self.read_exact(4)?;
        Ok(BigEndian::read_u32(bytes))
    }

    pub fn read_exact(&mut self, n: usize) -> Result<&'a [u8], Error> {
        if self.remaining() < n {
            return Err(Error::EndOfStream);
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn peek_u8(&self) -> Result<u8, Error> {
        self.buf.get(self.pos).copied().ok_or(Error::EndOfStream)
    }
}

impl<'a> ByteSource<'a> for ByteReader<'a> {
    fn peek_u8(&self) -> Result<u8, Error> {
        ByteReader::peek_u8(self)
    }
    fn read_u8(&mut self) -> Result<u8, Error> {
        ByteReader::read_u8(self)
    }
    fn read_exact(&mut self, n: usize) -> Result<&'a [u8], Error> {
        ByteReader::read_exact(self, n)
    }
    fn remaining(&self) -> usize {
        ByteReader::remaining(self)
    }
}

/// Non-blocking reader over a slice that may not yet hold a full message.
/// A short read restores the cursor and returns `Error::InsufficientData`
/// instead of consuming the partial bytes, so a caller can stash the whole
/// buffer and retry once the transport delivers more.
pub struct PeekReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PeekReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        PeekReader { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn read_u8(&mut self) -> Result<u8, Error> {
        let bytes = self.read_exact(1)?;
        Ok(bytes[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, Error> {
        let bytes = self.read_exact(2)?;
        Ok(BigEndian::read_u16(bytes))
    }

    pub fn read_u24(&mut self) -> Result<u32, Error> {
        let bytes = self.read_exact(3)?;
        Ok(BigEndian::read_u24(bytes))
    }

    pub fn read_u32(&mut self) -> Result<u32, Error> {
        let bytes = self.read_exact(4)?;
        Ok(BigEndian::read_u32(bytes))
    }

    pub fn read_exact(&mut self, n: usize) -> Result<&'a [u8], Error> {
        if self.remaining() < n {
            return Err(Error::InsufficientData);
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn peek_u8(&self) -> Result<u8, Error> {
        self.buf.get(self.pos).copied().ok_or(Error::InsufficientData)
    }
}

impl<'a> ByteSource<'a> for PeekReader<'a> {
    fn peek_u8(&self) -> Result<u8, Error> {
        PeekReader::peek_u8(self)
    }
    fn read_u8(&mut self) -> Result<u8, Error> {
        PeekReader::read_u8(self)
    }
    fn read_exact(&mut self, n: usize) -> Result<&'a [u8], Error> {
        PeekReader::read_exact(self, n)
    }
    fn remaining(&self) -> usize {
        PeekReader::remaining(self)
    }
}

/// Growable big-endian byte writer backing the encoders.
#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        ByteWriter { buf: Vec::new() }
    }

    pub fn with_capacity(cap: usize) -> Self {
        ByteWriter { buf: Vec::with_capacity(cap) }
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_u16(&mut self, v: u16) {
        let mut tmp = [0u8; 2];
        BigEndian::write_u16(&mut tmp, v);
        self.buf.extend_from_slice(&tmp);
    }

    pub fn write_u24(&mut self, v: u32) {
        let mut tmp = [0u8; 4];
        BigEndian::write_u32(&mut tmp, v);
        self.buf.extend_from_slice(&tmp[1..]);
    }

    pub fn write_u32(&mut self, v: u32) {
        let mut tmp = [0u8; 4];
        BigEndian::write_u32(&mut tmp, v);
        self.buf.extend_from_slice(&tmp);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Overwrites a single already-written byte. Used by the option
    /// encoder, which writes a placeholder header byte before it knows
    /// the final length nibble.
    pub fn patch_u8(&mut self, pos: usize, v: u8) {
        self.buf[pos] = v;
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_reader_round_trip() {
        let mut w = ByteWriter::new();
        w.write_u8(0x12);
        w.write_u16(0x3456);
        w.write_u24(0x789abc);
        w.write_u32(0xdeadbeef);
        w.write_bytes(&[1, 2, 3]);
        let bytes = w.into_vec();

        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.read_u8().unwrap(), 0x12);
        assert_eq!(r.read_u16().unwrap(), 0x3456);
        assert_eq!(r.read_u24().unwrap(), 0x789abc);
        assert_eq!(r.read_u32().unwrap(), 0xdeadbeef);
        assert_eq!(r.read_exact(3).unwrap(), &[1, 2, 3]);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn strict_reader_reports_end_of_stream() {
        let bytes = [0u8; 1];
        let mut r = ByteReader::new(&bytes);
        assert!(matches!(r.read_u16(), Err(Error::EndOfStream)));
    }

    #[test]
    fn peek_reader_does_not_consume_on_shortfall() {
        let bytes = [0xAAu8, 0xBB];
        let mut r = PeekReader::new(&bytes);
        assert!(matches!(r.read_u32(), Err(Error::InsufficientData)));
        assert_eq!(r.position(), 0);
        assert_eq!(r.read_u16().unwrap(), 0xAABB);
    }
}
