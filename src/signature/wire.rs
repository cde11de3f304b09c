//! Signature wire encoding and the `.sig` container file
//!
//! The payload layout (all little-endian) is fixed for interop:
//!
//! ```text
//! whole_digest : 16 bytes
//! block_size   : u16
//! N records of:
//!   w_lo       : u16
//!   w_hi       : u16
//!   block_off  : u32   (in multiples of block_size)
//!   strong     : 16 bytes
//! ```
//!
//! Block count and lengths are implicit: N from the stream length, each
//! block block_size long except the last, whose length the decoder
//! recovers from the target length supplied out of band. The `.sig`
//! container wraps the payload with a magic, a version and that target
//! length so the payload can travel through a file on its own.

use super::{BlockSignature, Signature};
use crate::error::{Error, Result};
use crate::strong::{Digest, DIGEST_LEN};
use bytes::{Buf, BufMut};
use std::fs;
use std::path::Path;

/// Magic bytes opening a `.sig` container file
pub const SIGNATURE_MAGIC: &[u8; 4] = b"RSIG";

/// Current container format version
pub const SIGNATURE_VERSION: u8 = 1;

const HEADER_LEN: usize = DIGEST_LEN + 2;
const BLOCK_RECORD_LEN: usize = 2 + 2 + 4 + DIGEST_LEN;

/// Encode a signature into the normative payload bytes.
pub fn encode_signature(signature: &Signature) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + signature.block_count() * BLOCK_RECORD_LEN);
    buf.put_slice(signature.whole_digest.as_bytes());
    buf.put_u16_le(signature.block_size);
    for block in &signature.blocks {
        buf.put_u16_le(block.w_lo);
        buf.put_u16_le(block.w_hi);
        buf.put_u32_le((block.offset / signature.block_size as u64) as u32);
        buf.put_slice(block.strong.as_bytes());
    }
    buf
}

/// Decode a signature payload.
///
/// `target_len` is the length of the file the signature describes; the
/// wire does not carry the final block's length, so the decoder derives
/// it here.
pub fn decode_signature(mut buf: &[u8], target_len: u64) -> Result<Signature> {
    if buf.len() < HEADER_LEN {
        return Err(Error::integrity("signature payload truncated"));
    }
    if (buf.len() - HEADER_LEN) % BLOCK_RECORD_LEN != 0 {
        return Err(Error::integrity("signature payload truncated mid-block"));
    }

    let mut digest = [0u8; DIGEST_LEN];
    buf.copy_to_slice(&mut digest);
    let block_size = buf.get_u16_le();
    if block_size == 0 {
        return Err(Error::bad_argument("signature block size is zero"));
    }

    let count = buf.len() / BLOCK_RECORD_LEN;
    check_target_len(target_len, count, block_size)?;

    let mut blocks = Vec::with_capacity(count);
    for i in 0..count {
        let w_lo = buf.get_u16_le();
        let w_hi = buf.get_u16_le();
        let block_off = buf.get_u32_le();
        let mut strong = [0u8; DIGEST_LEN];
        buf.copy_to_slice(&mut strong);

        let length = if i + 1 < count {
            block_size as u32
        } else {
            (target_len - (count as u64 - 1) * block_size as u64) as u32
        };
        blocks.push(BlockSignature {
            index: i as u32,
            offset: block_off as u64 * block_size as u64,
            length,
            w_lo,
            w_hi,
            strong: Digest(strong),
        });
    }

    Ok(Signature {
        block_size,
        whole_digest: Digest(digest),
        blocks,
    })
}

fn check_target_len(target_len: u64, count: usize, block_size: u16) -> Result<()> {
    let b = block_size as u64;
    let ok = if count == 0 {
        target_len == 0
    } else {
        let full = (count as u64 - 1) * b;
        target_len > full && target_len <= full + b
    };
    if ok {
        Ok(())
    } else {
        Err(Error::integrity(format!(
            "target length {} does not fit {} blocks of {}",
            target_len, count, block_size
        )))
    }
}

/// Write a signature to a `.sig` container file.
pub fn write_signature_file(signature: &Signature, path: &Path) -> Result<()> {
    let payload = encode_signature(signature);
    let mut data = Vec::with_capacity(4 + 1 + 8 + payload.len());
    data.put_slice(SIGNATURE_MAGIC);
    data.put_u8(SIGNATURE_VERSION);
    data.put_u64_le(signature.target_len());
    data.put_slice(&payload);
    fs::write(path, data)
        .map_err(|e| Error::io(format!("writing signature file {}", path.display()), e))
}

/// Read a signature from a `.sig` container file.
pub fn read_signature_file(path: &Path) -> Result<Signature> {
    let data = fs::read(path)
        .map_err(|e| Error::io(format!("reading signature file {}", path.display()), e))?;
    let mut buf = data.as_slice();
    if buf.len() < 4 + 1 + 8 {
        return Err(Error::integrity("signature file truncated"));
    }
    if &buf[..4] != SIGNATURE_MAGIC {
        return Err(Error::bad_argument("invalid signature file (bad magic)"));
    }
    buf.advance(4);
    let version = buf.get_u8();
    if version != SIGNATURE_VERSION {
        return Err(Error::bad_argument(format!(
            "unsupported signature version {} (expected {})",
            version, SIGNATURE_VERSION
        )));
    }
    let target_len = buf.get_u64_le();
    decode_signature(buf, target_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::sign_bytes;
    use tempfile::TempDir;

    #[test]
    fn test_payload_roundtrip() {
        let sig = sign_bytes(b"hello world test data, long enough for blocks", 8).unwrap();
        let encoded = encode_signature(&sig);
        let decoded = decode_signature(&encoded, sig.target_len()).unwrap();
        assert_eq!(decoded, sig);
    }

    #[test]
    fn test_payload_roundtrip_short_tail() {
        let sig = sign_bytes(b"ABCDE", 4).unwrap();
        let decoded = decode_signature(&encode_signature(&sig), 5).unwrap();
        assert_eq!(decoded, sig);
        assert_eq!(decoded.blocks[1].length, 1);
    }

    #[test]
    fn test_empty_signature_roundtrip() {
        let sig = Signature::empty(1024);
        let encoded = encode_signature(&sig);
        assert_eq!(encoded.len(), HEADER_LEN);
        let decoded = decode_signature(&encoded, 0).unwrap();
        assert_eq!(decoded, sig);
    }

    #[test]
    fn test_block_record_is_24_bytes() {
        let sig = sign_bytes(b"ABCDEFGH", 4).unwrap();
        let encoded = encode_signature(&sig);
        assert_eq!(encoded.len(), HEADER_LEN + 2 * 24);
    }

    #[test]
    fn test_block_off_in_units_of_block_size() {
        let sig = sign_bytes(&[7u8; 24], 8).unwrap();
        let encoded = encode_signature(&sig);
        // Third record starts after the header and two 24-byte records;
        // its block_off field sits 4 bytes in.
        let off_pos = HEADER_LEN + 2 * BLOCK_RECORD_LEN + 4;
        let block_off =
            u32::from_le_bytes(encoded[off_pos..off_pos + 4].try_into().unwrap());
        assert_eq!(block_off, 2);
    }

    #[test]
    fn test_truncated_payload() {
        let sig = sign_bytes(b"ABCDEFGH", 4).unwrap();
        let encoded = encode_signature(&sig);
        let err = decode_signature(&encoded[..encoded.len() - 3], 8).unwrap_err();
        assert!(matches!(err, Error::Integrity { .. }));
    }

    #[test]
    fn test_mismatched_target_len() {
        let sig = sign_bytes(b"ABCDEFGH", 4).unwrap();
        let encoded = encode_signature(&sig);
        assert!(decode_signature(&encoded, 100).is_err());
        assert!(decode_signature(&encoded, 4).is_err());
    }

    #[test]
    fn test_container_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("target.sig");
        let sig = sign_bytes(b"container payload bytes", 6).unwrap();
        write_signature_file(&sig, &path).unwrap();
        let loaded = read_signature_file(&path).unwrap();
        assert_eq!(loaded, sig);
    }

    #[test]
    fn test_container_bad_magic() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.sig");
        std::fs::write(&path, b"XXXX\x01\0\0\0\0\0\0\0\0rest").unwrap();
        assert!(matches!(
            read_signature_file(&path),
            Err(Error::BadArgument { .. })
        ));
    }

    #[test]
    fn test_container_bad_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ver.sig");
        let sig = Signature::empty(64);
        write_signature_file(&sig, &path).unwrap();
        let mut data = std::fs::read(&path).unwrap();
        data[4] = 9;
        std::fs::write(&path, data).unwrap();
        assert!(matches!(
            read_signature_file(&path),
            Err(Error::BadArgument { .. })
        ));
    }
}
