//! Match phase: slide a window over the source, emit instructions
//!
//! The matcher walks the source one byte at a time. Bytes it has read
//! but not yet committed live in a single `pending` buffer: an
//! unmatched literal run followed by the current match window (at most
//! one block of trailing bytes). A window that grows past the block
//! size spills its oldest byte into the literal run; a window that
//! matches a signature block commits the whole pending buffer as one
//! instruction. Offsets emitted are true byte positions in the source.

use super::window::WindowBuffer;
use super::{Instruction, InstructionKind, InstructionSink};
use crate::error::{Error, Result};
use crate::signature::{Signature, SignatureIndex};
use crate::weak::WeakHash;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

/// Stream the delta of `source` against `signature` into `sink`.
///
/// Emits exactly one OPEN first and one CLOSE last; between them, every
/// source byte is committed exactly once, either inside a matched block
/// (INDEX) or as literal data (DATA).
pub fn emit_delta<R, S>(
    source: R,
    source_len: u64,
    signature: &Signature,
    sink: &mut S,
) -> Result<()>
where
    R: Read + Seek,
    S: InstructionSink + ?Sized,
{
    if signature.block_size == 0 {
        return Err(Error::bad_argument("signature block size is zero"));
    }

    sink.consume(Instruction::open(source_len))?;

    let mut window = WindowBuffer::new(source, signature.block_size);
    if signature.is_degenerate() {
        return emit_all_data(window, sink);
    }

    let block_size = signature.block_size as usize;
    let index = SignatureIndex::new(signature);

    // pending = literal run ++ match window; win_len counts the trailing
    // window bytes, everything before them is uncommitted literal.
    let mut pending: Vec<u8> = Vec::with_capacity(block_size * 2);
    let mut win_len = 0usize;
    let mut weak = WeakHash::new();
    let mut cursor = 0u64;
    let mut matches = 0u64;
    let mut literal_bytes = 0u64;

    while let Some(byte) = window.read(cursor)? {
        cursor += 1;
        pending.push(byte);
        win_len += 1;
        weak.roll_in(byte);

        if win_len > block_size {
            // Oldest window byte has waited a full block without a
            // match; it becomes literal.
            let oldest = pending[pending.len() - win_len];
            weak.roll_out(oldest, win_len);
            win_len -= 1;
        }

        if win_len == block_size {
            let window_bytes = &pending[pending.len() - win_len..];
            if let Some(block_index) = index.find(weak.sum32(), window_bytes) {
                let literal_len = pending.len() - win_len;
                let offset = cursor - pending.len() as u64;
                let mut instruction = Instruction::index(block_index, offset);
                if literal_len > 0 {
                    pending.truncate(literal_len);
                    instruction.kind = instruction.kind | InstructionKind::DATA;
                    instruction.data = Some(std::mem::take(&mut pending));
                    literal_bytes += literal_len as u64;
                }
                sink.consume(instruction)?;
                window.consume(literal_len + win_len);
                pending.clear();
                win_len = 0;
                weak.reset();
                matches += 1;
                continue;
            }
        }

        let literal_len = pending.len() - win_len;
        if literal_len >= block_size {
            let offset = cursor - pending.len() as u64;
            let literal: Vec<u8> = pending.drain(..literal_len).collect();
            sink.consume(Instruction::data(literal, offset))?;
            window.consume(literal_len);
            literal_bytes += literal_len as u64;
        }
    }

    // Whatever is left in the window could not complete a match.
    let tail_len = pending.len();
    let whole_hash = window.finalize_whole();
    let mut close = Instruction::close(whole_hash);
    if tail_len > 0 {
        close.kind = close.kind | InstructionKind::DATA;
        close.offset = source_len - tail_len as u64;
        close.data = Some(pending);
        literal_bytes += tail_len as u64;
    }
    sink.consume(close)?;

    tracing::debug!(
        source_len,
        matches,
        literal_bytes,
        "delta emission complete"
    );
    Ok(())
}

/// Degenerate-signature path: nothing can match, stream the source
/// verbatim in block-sized DATA chunks, folding the final one into
/// CLOSE.
fn emit_all_data<R, S>(mut window: WindowBuffer<R>, sink: &mut S) -> Result<()>
where
    R: Read + Seek,
    S: InstructionSink + ?Sized,
{
    let mut offset = 0u64;
    let mut held: Option<Vec<u8>> = None;
    while let Some(chunk) = window.read_chunk()? {
        if let Some(prev) = held.replace(chunk) {
            let len = prev.len() as u64;
            sink.consume(Instruction::data(prev, offset))?;
            offset += len;
        }
    }

    let whole_hash = window.finalize_whole();
    let mut close = Instruction::close(whole_hash);
    if let Some(tail) = held {
        close.kind = close.kind | InstructionKind::DATA;
        close.offset = offset;
        close.data = Some(tail);
    }
    sink.consume(close)?;
    tracing::debug!(literal_bytes = offset, "degenerate delta emitted verbatim");
    Ok(())
}

/// Delta of a source file on disk.
pub fn delta_file<S>(path: &Path, signature: &Signature, sink: &mut S) -> Result<()>
where
    S: InstructionSink + ?Sized,
{
    let file =
        File::open(path).map_err(|e| Error::io(format!("opening {}", path.display()), e))?;
    let source_len = file
        .metadata()
        .map_err(|e| Error::io(format!("reading metadata of {}", path.display()), e))?
        .len();
    emit_delta(file, source_len, signature, sink)
}

/// Delta of an in-memory source, collected into a vector (mostly for
/// tests).
pub fn delta_bytes(data: &[u8], signature: &Signature) -> Result<Vec<Instruction>> {
    let mut instructions = Vec::new();
    emit_delta(
        std::io::Cursor::new(data),
        data.len() as u64,
        signature,
        &mut instructions,
    )?;
    Ok(instructions)
}
