//! Signature generation: scan the target in block-sized chunks

use super::{BlockSignature, Signature};
use crate::error::{Error, Result};
use crate::strong::{Digest, StrongHash};
use crate::weak::WeakHash;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Generate a signature for a file on disk.
///
/// A missing file yields an empty signature, the same as a zero-length
/// one: the receiver simply has nothing to offer the matcher.
pub fn sign_file(path: &Path, block_size: u16) -> Result<Signature> {
    check_block_size(block_size)?;
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Ok(Signature::empty(block_size));
        }
        Err(e) => return Err(Error::io(format!("opening {}", path.display()), e)),
    };
    sign_reader(file, block_size)
}

/// Generate a signature from any reader.
pub fn sign_reader<R: Read>(mut reader: R, block_size: u16) -> Result<Signature> {
    check_block_size(block_size)?;

    let mut blocks = Vec::new();
    let mut whole = StrongHash::new();
    let mut buf = vec![0u8; block_size as usize];
    let mut offset = 0u64;
    let mut index = 0u32;

    loop {
        let filled = read_block(&mut reader, &mut buf, offset)?;
        if filled == 0 {
            break;
        }
        let chunk = &buf[..filled];
        whole.update(chunk);

        let weak = WeakHash::sum_of(chunk);
        blocks.push(BlockSignature {
            index,
            offset,
            length: filled as u32,
            w_lo: WeakHash::lo(weak),
            w_hi: WeakHash::hi(weak),
            strong: Digest::of(chunk),
        });

        offset += filled as u64;
        index += 1;

        // A partial chunk is the final short block.
        if filled < block_size as usize {
            break;
        }
    }

    let signature = Signature {
        block_size,
        whole_digest: whole.finalize(),
        blocks,
    };
    tracing::debug!(
        blocks = signature.block_count(),
        block_size = block_size,
        target_len = signature.target_len(),
        "signature generated"
    );
    Ok(signature)
}

/// Generate a signature from a byte slice (mostly for tests).
pub fn sign_bytes(data: &[u8], block_size: u16) -> Result<Signature> {
    sign_reader(data, block_size)
}

fn check_block_size(block_size: u16) -> Result<()> {
    if block_size == 0 {
        return Err(Error::bad_argument("block size must be non-zero"));
    }
    Ok(())
}

/// Fill `buf` as far as the reader allows; a plain `read` may return
/// fewer bytes than a full block mid-file.
fn read_block<R: Read>(reader: &mut R, buf: &mut [u8], offset: u64) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(Error::io(
                    format!("reading target block at offset {}", offset + filled as u64),
                    e,
                ));
            }
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_sign_bytes_block_layout() {
        let sig = sign_bytes(b"hello world, this is a test", 10).unwrap();
        assert_eq!(sig.block_count(), 3);
        assert_eq!(sig.blocks[0].length, 10);
        assert_eq!(sig.blocks[1].length, 10);
        assert_eq!(sig.blocks[2].length, 7);
        assert_eq!(sig.blocks[1].offset, 10);
        assert_eq!(sig.blocks[2].index, 2);
        assert_eq!(sig.target_len(), 27);
    }

    #[test]
    fn test_short_final_block_kept() {
        let sig = sign_bytes(b"ABCDE", 4).unwrap();
        assert_eq!(sig.block_count(), 2);
        assert_eq!(sig.blocks[0].length, 4);
        assert_eq!(sig.blocks[1].length, 1);
        assert!(!sig.is_degenerate());
    }

    #[test]
    fn test_exact_multiple_has_no_short_block() {
        let sig = sign_bytes(b"ABCDEFGH", 4).unwrap();
        assert_eq!(sig.block_count(), 2);
        assert_eq!(sig.blocks[1].length, 4);
    }

    #[test]
    fn test_whole_digest_covers_all_bytes() {
        let data = b"some target content that spans several blocks";
        let sig = sign_bytes(data, 8).unwrap();
        assert_eq!(sig.whole_digest, Digest::of(data));
    }

    #[test]
    fn test_empty_input() {
        let sig = sign_bytes(b"", 1024).unwrap();
        assert!(sig.is_empty());
    }

    #[test]
    fn test_missing_file_is_empty_signature() {
        let sig = sign_file(Path::new("/nonexistent/rollsync-target"), 1024).unwrap();
        assert!(sig.is_empty());
        assert_eq!(sig.block_size, 1024);
    }

    #[test]
    fn test_sign_file_matches_sign_bytes() {
        let data = b"file contents for signing";
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(data).unwrap();
        file.flush().unwrap();

        let from_file = sign_file(file.path(), 8).unwrap();
        let from_bytes = sign_bytes(data, 8).unwrap();
        assert_eq!(from_file, from_bytes);
    }

    #[test]
    fn test_zero_block_size_rejected() {
        assert!(matches!(
            sign_bytes(b"x", 0),
            Err(Error::BadArgument { .. })
        ));
    }

    #[test]
    fn test_weak_halves_stored_decomposed() {
        let sig = sign_bytes(b"ABCD", 4).unwrap();
        let weak = WeakHash::sum_of(b"ABCD");
        assert_eq!(sig.blocks[0].w_lo, WeakHash::lo(weak));
        assert_eq!(sig.blocks[0].w_hi, WeakHash::hi(weak));
        assert_eq!(sig.blocks[0].weak(), weak);
    }
}
