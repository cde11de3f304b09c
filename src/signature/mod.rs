//! Signature types: per-block checksums of the target file

pub mod generate;
pub mod index;
pub mod wire;

pub use generate::{sign_bytes, sign_file, sign_reader};
pub use index::SignatureIndex;
pub use wire::{
    decode_signature, encode_signature, read_signature_file, write_signature_file,
};

use crate::strong::Digest;

/// Default block size used for chunking
pub const DEFAULT_BLOCK_SIZE: u16 = 1024;

/// Smallest block size the config/CLI layer accepts
pub const MIN_BLOCK_SIZE: u16 = 64;

/// Checksums of a single target block.
///
/// Created by the signer, owned by the [`Signature`], read-only after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSignature {
    /// Ordinal of the block in the target file (0-based)
    pub index: u32,

    /// Byte offset of the block in the target file
    pub offset: u64,

    /// Actual length of this block (block_size except possibly the last)
    pub length: u32,

    /// Low half of the weak checksum (additive sum)
    pub w_lo: u16,

    /// High half of the weak checksum (positional sum)
    pub w_hi: u16,

    /// Strong digest of the block bytes
    pub strong: Digest,
}

impl BlockSignature {
    /// Recompose the full 32-bit weak checksum.
    pub fn weak(&self) -> u32 {
        ((self.w_hi as u32) << 16) | self.w_lo as u32
    }

    /// Whether two blocks hold the same bytes, judged by both checksums.
    pub fn same_content(&self, other: &BlockSignature) -> bool {
        self.w_lo == other.w_lo && self.w_hi == other.w_hi && self.strong == other.strong
    }
}

/// A file signature: ordered block checksums plus the whole-file digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Block size used for chunking
    pub block_size: u16,

    /// Strong digest of the whole target file
    pub whole_digest: Digest,

    /// Individual block checksums, ordered by position
    pub blocks: Vec<BlockSignature>,
}

impl Signature {
    /// Signature of a missing or zero-length target.
    ///
    /// The whole-file digest of an empty file is still well defined, so
    /// it is carried rather than left blank.
    pub fn empty(block_size: u16) -> Self {
        Self {
            block_size,
            whole_digest: Digest::of(b""),
            blocks: Vec::new(),
        }
    }

    /// Number of blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the target was missing or empty.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Whether the matcher must fall through to emit-all-data.
    ///
    /// Empty, or a single block shorter than the block size: the match
    /// window is always exactly block_size bytes, so such a block can
    /// never be matched anyway.
    pub fn is_degenerate(&self) -> bool {
        match self.blocks.as_slice() {
            [] => true,
            [only] => only.length < self.block_size as u32,
            _ => false,
        }
    }

    /// Resolve a block by its `index` field.
    ///
    /// The fast path assumes the canonical ordering where position and
    /// index coincide, but a permuted block list still resolves.
    pub fn block(&self, index: u32) -> Option<&BlockSignature> {
        if let Some(block) = self.blocks.get(index as usize) {
            if block.index == index {
                return Some(block);
            }
        }
        self.blocks.iter().find(|b| b.index == index)
    }

    /// Total length of the target the signature describes.
    pub fn target_len(&self) -> u64 {
        self.blocks.iter().map(|b| b.length as u64).sum()
    }
}
