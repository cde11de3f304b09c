//! Instruction wire encoding
//!
//! One tag byte, then sections for each tag bit that is set, in OPEN,
//! DATA, INDEX, CLOSE order (all integers little-endian):
//!
//! ```text
//! if OPEN:   off  u64   (source length)
//! if DATA:   dlen u32, dlen bytes, off u64  (start of the literal run)
//! if INDEX:  idx  u32, off u64              (start of the matched run)
//! if CLOSE:  hash 16 bytes
//! ```
//!
//! A combined DATA|INDEX instruction therefore carries two offsets: the
//! literal run's and the matched run's, the latter always literal start
//! plus literal length. Decoding takes the DATA offset as the
//! instruction offset when both are present.

use super::{Instruction, InstructionKind};
use crate::error::{Error, Result};
use crate::strong::{Digest, DIGEST_LEN};
use bytes::{Buf, BufMut};

/// Append the wire form of `instruction` to `buf`.
pub fn encode_instruction(instruction: &Instruction, buf: &mut Vec<u8>) {
    let kind = instruction.kind;
    buf.put_u8(kind.bits());
    if kind.is_open() {
        buf.put_u64_le(instruction.offset);
    }
    if kind.is_data() {
        let data = instruction.data.as_deref().unwrap_or_default();
        buf.put_u32_le(data.len() as u32);
        buf.put_slice(data);
        buf.put_u64_le(instruction.offset);
    }
    if kind.is_index() {
        buf.put_u32_le(instruction.block_index.unwrap_or_default());
        let match_offset = instruction.offset + instruction.data_len() as u64;
        buf.put_u64_le(match_offset);
    }
    if kind.is_close() {
        let hash = instruction
            .whole_hash
            .map(|digest| digest.0)
            .unwrap_or_default();
        buf.put_slice(&hash);
    }
}

/// Decode one instruction from the front of `buf`, advancing it.
///
/// Returns `Ok(None)` on a cleanly empty buffer; a buffer that ends
/// mid-instruction is an integrity error.
pub fn decode_instruction(buf: &mut &[u8]) -> Result<Option<Instruction>> {
    if buf.is_empty() {
        return Ok(None);
    }
    let bits = buf.get_u8();
    let kind = InstructionKind::from_bits(bits)
        .ok_or_else(|| Error::bad_argument(format!("unknown instruction tag {:#04x}", bits)))?;

    let mut instruction = Instruction {
        kind,
        offset: 0,
        data: None,
        block_index: None,
        whole_hash: None,
    };

    if kind.is_open() {
        need(buf, 8)?;
        instruction.offset = buf.get_u64_le();
    }
    if kind.is_data() {
        need(buf, 4)?;
        let dlen = buf.get_u32_le() as usize;
        need(buf, dlen + 8)?;
        let mut data = vec![0u8; dlen];
        buf.copy_to_slice(&mut data);
        instruction.data = Some(data);
        instruction.offset = buf.get_u64_le();
    }
    if kind.is_index() {
        need(buf, 4 + 8)?;
        instruction.block_index = Some(buf.get_u32_le());
        let match_offset = buf.get_u64_le();
        if !kind.is_data() {
            instruction.offset = match_offset;
        }
    }
    if kind.is_close() {
        need(buf, DIGEST_LEN)?;
        let mut hash = [0u8; DIGEST_LEN];
        buf.copy_to_slice(&mut hash);
        instruction.whole_hash = Some(Digest(hash));
    }

    Ok(Some(instruction))
}

fn need(buf: &&[u8], len: usize) -> Result<()> {
    if buf.remaining() < len {
        Err(Error::integrity("instruction stream truncated"))
    } else {
        Ok(())
    }
}
