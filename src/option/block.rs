//! The Block1/Block2 option value (RFC 7959) and the BERT extension
//! (RFC 7959 §4): a NUM/M/SZX triple packed into a 1..=3 byte
//! variable-length unsigned integer, plus the slicing helpers used to
//! walk a full payload block by block.

use crate::error::Error;

/// Block size. `Bert` reuses SZX=7 to mean "1024-byte blocks, but this
/// option occurrence may carry several of them concatenated" (RFC 7959
/// §4) rather than a distinct size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSize {
    S16,
    S32,
    S64,
    S128,
    S256,
    S512,
    S1024,
    Bert,
}

impl BlockSize {
    pub fn szx(self) -> u8 {
        match self {
            BlockSize::S16 => 0,
            BlockSize::S32 => 1,
            BlockSize::S64 => 2,
            BlockSize::S128 => 3,
            BlockSize::S256 => 4,
            BlockSize::S512 => 5,
            BlockSize::S1024 => 6,
            BlockSize::Bert => 7,
        }
    }

    pub fn from_szx(szx: u8) -> BlockSize {
        match szx & 0x07 {
            0 => BlockSize::S16,
            1 => BlockSize::S32,
            2 => BlockSize::S64,
            3 => BlockSize::S128,
            4 => BlockSize::S256,
            5 => BlockSize::S512,
            6 => BlockSize::S1024,
            _ => BlockSize::Bert,
        }
    }

    /// Byte length of one block at this size. BERT blocks are 1024 bytes
    /// each; an occurrence may concatenate several of them.
    pub fn block_len(self) -> u32 {
        match self {
            BlockSize::Bert => 1024,
            other => 16u32 << other.szx(),
        }
    }

    pub fn is_bert(self) -> bool {
        matches!(self, BlockSize::Bert)
    }
}

/// `{ num, size, more }` — block number, block size, and whether further
/// blocks follow this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockOption {
    pub num: u32,
    pub size: BlockSize,
    pub more: bool,
}

impl BlockOption {
    pub fn new(num: u32, size: BlockSize, more: bool) -> BlockOption {
        BlockOption { num, size, more }
    }

    /// Decodes the packed NUM/M/SZX integer from its 0..=3 byte
    /// encoding. Shorter encodings than strictly necessary are accepted,
    /// accepted here too.
    pub fn from_bytes(bytes: &[u8]) -> Result<BlockOption, Error> {
        if bytes.len() > 3 {
            return Err(Error::Format(format!("block option value too long: {} bytes", bytes.len())));
        }
        let mut raw: u32 = 0;
        for &b in bytes {
            raw = (raw << 8) | b as u32;
        }
        let szx = (raw & 0x07) as u8;
        let more = raw & 0x08 != 0;
        let num = raw >> 4;
        Ok(BlockOption { num, size: BlockSize::from_szx(szx), more })
    }

    /// Encodes to the minimal-width 1..=3 byte representation.
    pub fn to_bytes(&self) -> Vec<u8> {
        let raw = (self.num << 4) | ((self.more as u32) << 3) | self.size.szx() as u32;
        if raw <= 0xff {
            vec![raw as u8]
        } else if raw <= 0xffff {
            vec![(raw >> 8) as u8, raw as u8]
        } else {
            vec![(raw >> 16) as u8, (raw >> 8) as u8, raw as u8]
        }
    }

    fn next_with_step(&self, full_len: usize, step: u32) -> BlockOption {
        let next_num = self.num + step;
        let block_bytes = self.size.block_len() as usize;
        let more = (next_num as usize + 1) * block_bytes < full_len;
        BlockOption { num: next_num, size: self.size, more }
    }

    /// The block option describing the next block after this one.
    pub fn next_block(&self, full_payload: &[u8]) -> BlockOption {
        self.next_with_step(full_payload.len(), 1)
    }

    /// Like `next_block`, but advances by `bert_blocks_per_message`
    /// blocks at once, since a single BERT option occurrence carries
    /// that many concatenated 1024-byte blocks.
    pub fn next_bert_block(&self, full_payload: &[u8], bert_blocks_per_message: u32) -> BlockOption {
        self.next_with_step(full_payload.len(), bert_blocks_per_message)
    }

    /// Slices out this block's share of `full_payload`, or `None` if
    /// this block's start offset is beyond the payload.
    pub fn create_block_part<'a>(&self, full_payload: &'a [u8]) -> Option<&'a [u8]> {
        let block_bytes = self.size.block_len() as usize;
        let start = self.num as usize * block_bytes;
        if start >= full_payload.len() {
            return None;
        }
        let end = std::cmp::min(full_payload.len(), start + block_bytes);
        Some(&full_payload[start..end])
    }

    /// Appends a received block's bytes to a reassembly buffer and
    /// reports how many block-sized units were added (1 outside BERT;
    /// possibly more than 1 for a BERT occurrence carrying several
    /// concatenated 1024-byte blocks).
    pub fn append_payload(&self, buffer: &mut Vec<u8>, data: &[u8]) -> usize {
        buffer.extend_from_slice(data);
        data.len() / self.size.block_len() as usize
    }
}
