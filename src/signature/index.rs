//! Weak-checksum lookup table over a signature's blocks

use super::{BlockSignature, Signature};
use crate::strong::Digest;
use crate::weak::WeakHash;
use std::collections::HashMap;

/// Candidate lookup from the low weak half to the blocks sharing it.
///
/// Built once per matching run; borrows the signature's blocks. Lookup
/// runs three gates so the per-byte hot path stays cheap: bucket
/// presence on `w_lo`, then `w_hi`, and only then the strong digest of
/// the window, computed at most once per lookup.
pub struct SignatureIndex<'a> {
    buckets: HashMap<u16, Vec<&'a BlockSignature>>,
}

impl<'a> SignatureIndex<'a> {
    /// Group the signature's blocks by their low weak half.
    pub fn new(signature: &'a Signature) -> Self {
        let mut buckets: HashMap<u16, Vec<&'a BlockSignature>> = HashMap::new();
        for block in &signature.blocks {
            buckets.entry(block.w_lo).or_default().push(block);
        }
        // Lowest index wins when several blocks hold the same bytes.
        for bucket in buckets.values_mut() {
            bucket.sort_by_key(|b| b.index);
        }
        Self { buckets }
    }

    /// Gate 1 alone: is any block listed under this low half?
    pub fn contains_w_lo(&self, w_lo: u16) -> bool {
        self.buckets.contains_key(&w_lo)
    }

    /// Full 3-gate lookup.
    ///
    /// Returns the matched block's `index` field, which is what the
    /// reconstructor resolves blocks by; array positions are never
    /// exposed.
    pub fn find(&self, weak: u32, window: &[u8]) -> Option<u32> {
        let w_lo = WeakHash::lo(weak);
        let w_hi = WeakHash::hi(weak);
        let bucket = self.buckets.get(&w_lo)?;

        let mut window_strong: Option<Digest> = None;
        for block in bucket {
            if block.w_hi != w_hi {
                continue;
            }
            let strong = *window_strong.get_or_insert_with(|| Digest::of(window));
            if block.strong == strong {
                return Some(block.index);
            }
        }
        None
    }

    /// Total bucketed blocks (diagnostics).
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::sign_bytes;

    #[test]
    fn test_find_existing_block() {
        let sig = sign_bytes(b"ABCDEFGH", 4).unwrap();
        let index = SignatureIndex::new(&sig);
        let weak = WeakHash::sum_of(b"EFGH");
        assert_eq!(index.find(weak, b"EFGH"), Some(1));
    }

    #[test]
    fn test_gate1_rejects_unknown_lo() {
        let sig = sign_bytes(b"ABCDEFGH", 4).unwrap();
        let index = SignatureIndex::new(&sig);
        let weak = WeakHash::sum_of(b"ZZZZ");
        assert_eq!(index.find(weak, b"ZZZZ"), None);
    }

    #[test]
    fn test_gate2_rejects_mismatched_hi() {
        let sig = sign_bytes(b"ABCD", 4).unwrap();
        let index = SignatureIndex::new(&sig);
        // Same low half, fabricated high half.
        let weak = ((sig.blocks[0].w_hi as u32 ^ 0x1) << 16) | sig.blocks[0].w_lo as u32;
        assert_eq!(index.find(weak, b"ABCD"), None);
        assert!(index.contains_w_lo(sig.blocks[0].w_lo));
    }

    #[test]
    fn test_gate3_rejects_different_bytes() {
        // "BCDA" and "ABCD" share the additive sum (same multiset), so
        // gates 1 and 2 can both pass only if positional sums collide;
        // craft the weak from the stored halves to force gate 3 to run.
        let sig = sign_bytes(b"ABCD", 4).unwrap();
        let index = SignatureIndex::new(&sig);
        let weak = sig.blocks[0].weak();
        assert_eq!(index.find(weak, b"ABCE"), None);
    }

    #[test]
    fn test_duplicate_blocks_lowest_index_wins() {
        let sig = sign_bytes(b"AAAAAAAAAAAA", 4).unwrap();
        let index = SignatureIndex::new(&sig);
        let weak = WeakHash::sum_of(b"AAAA");
        assert_eq!(index.find(weak, b"AAAA"), Some(0));
    }

    #[test]
    fn test_permuted_blocks_return_index_field() {
        let mut sig = sign_bytes(b"ABCDEFGHIJKL", 4).unwrap();
        sig.blocks.reverse();
        let index = SignatureIndex::new(&sig);
        let weak = WeakHash::sum_of(b"IJKL");
        assert_eq!(index.find(weak, b"IJKL"), Some(2));
        let weak = WeakHash::sum_of(b"ABCD");
        assert_eq!(index.find(weak, b"ABCD"), Some(0));
    }

    #[test]
    fn test_empty_signature_index() {
        let sig = crate::signature::Signature::empty(16);
        let index = SignatureIndex::new(&sig);
        assert!(index.is_empty());
        assert_eq!(index.len(), 0);
    }
}
