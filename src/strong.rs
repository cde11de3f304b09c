//! Strong 128-bit digest (MD5)
//!
//! One algorithm covers all three uses: per-block signatures, the
//! signature's whole-file digest, and reconstruction verification.
//! Collisions on random data are treated as impossible; this is an
//! error-detection hash, not a security boundary.

use digest::Digest as _;
use md5::Md5;
use std::fmt;

/// Digest length in bytes
pub const DIGEST_LEN: usize = 16;

/// A finalized 128-bit strong digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest(pub [u8; DIGEST_LEN]);

impl Digest {
    /// One-shot digest of a byte slice.
    pub fn of(data: &[u8]) -> Self {
        let mut hasher = StrongHash::new();
        hasher.update(data);
        hasher.finalize()
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }
}

impl From<[u8; DIGEST_LEN]> for Digest {
    fn from(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", hex::encode(self.0))
    }
}

/// Streaming strong hasher.
#[derive(Clone)]
pub struct StrongHash {
    inner: Md5,
}

impl StrongHash {
    /// Create a hasher with an empty state.
    pub fn new() -> Self {
        Self { inner: Md5::new() }
    }

    /// Feed more bytes into the digest state.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finalize and return the digest.
    pub fn finalize(self) -> Digest {
        Digest(self.inner.finalize().into())
    }
}

impl Default for StrongHash {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_digest() {
        assert_eq!(
            Digest::of(b"").to_string(),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
    }

    #[test]
    fn test_known_vector() {
        assert_eq!(
            Digest::of(b"abc").to_string(),
            "900150983cd24fb0d6963f7d28e17f72"
        );
    }

    #[test]
    fn test_streaming_matches_one_shot() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let mut hasher = StrongHash::new();
        hasher.update(&data[..10]);
        hasher.update(&data[10..]);
        assert_eq!(hasher.finalize(), Digest::of(data));
    }

    #[test]
    fn test_different_data_differs() {
        assert_ne!(Digest::of(b"block one"), Digest::of(b"block two"));
    }
}
