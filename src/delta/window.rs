//! Read-ahead buffer over the source file
//!
//! Sits between the matcher and the source handle. Fetches happen in
//! block-sized gulps and are the only place source bytes get hashed, so
//! the whole-file digest sees every byte exactly once no matter how
//! often the sliding window revisits it.

use crate::error::{Error, Result};
use crate::strong::{Digest, StrongHash};
use std::io::{ErrorKind, Read, Seek, SeekFrom};

/// Single-seat cache of recently fetched source bytes.
///
/// Invariant: the buffer holds `S[base .. base + buf.len())` and every
/// byte of the source below `base + buf.len()` has been fed to the
/// whole-file digest exactly once.
pub struct WindowBuffer<R> {
    source: R,
    buf: Vec<u8>,
    base: u64,
    prefetch: usize,
    whole: StrongHash,
}

impl<R: Read + Seek> WindowBuffer<R> {
    /// Wrap a source handle; `block_size` sets the fetch granularity.
    pub fn new(source: R, block_size: u16) -> Self {
        Self {
            source,
            buf: Vec::with_capacity(block_size as usize * 2),
            base: 0,
            prefetch: block_size as usize,
            whole: StrongHash::new(),
        }
    }

    /// Byte at `offset`, or `None` at end of file.
    ///
    /// The matcher reads strictly sequentially, so a miss always means
    /// the next unread stretch of the file.
    pub fn read(&mut self, offset: u64) -> Result<Option<u8>> {
        loop {
            if let Some(byte) = self.cached(offset) {
                return Ok(Some(byte));
            }
            if self.fetch()? == 0 {
                return Ok(None);
            }
        }
    }

    /// Up to one prefetch worth of bytes from the current position,
    /// consumed on return; `None` at end of file.
    pub fn read_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        if self.buf.is_empty() && self.fetch()? == 0 {
            return Ok(None);
        }
        let take = self.buf.len().min(self.prefetch);
        let chunk = self.buf[..take].to_vec();
        self.consume(take);
        Ok(Some(chunk))
    }

    /// Drop the oldest `n` cached bytes once the matcher has committed
    /// them to an instruction.
    pub fn consume(&mut self, n: usize) {
        let n = n.min(self.buf.len());
        self.buf.drain(..n);
        self.base += n as u64;
    }

    /// Position of the next byte a fetch would pull from the source.
    pub fn fetched_to(&self) -> u64 {
        self.base + self.buf.len() as u64
    }

    /// Finish streaming and take the whole-source digest.
    pub fn finalize_whole(self) -> Digest {
        self.whole.finalize()
    }

    fn cached(&self, offset: u64) -> Option<u8> {
        if offset < self.base {
            return None;
        }
        self.buf.get((offset - self.base) as usize).copied()
    }

    /// Pull the next stretch of the source into the cache, hashing it.
    fn fetch(&mut self) -> Result<usize> {
        let at = self.fetched_to();
        self.source
            .seek(SeekFrom::Start(at))
            .map_err(|e| Error::io(format!("seeking source to offset {}", at), e))?;

        let mut chunk = vec![0u8; self.prefetch];
        let mut filled = 0;
        while filled < chunk.len() {
            match self.source.read(&mut chunk[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(Error::io(
                        format!("reading source at offset {}", at + filled as u64),
                        e,
                    ));
                }
            }
        }
        self.whole.update(&chunk[..filled]);
        self.buf.extend_from_slice(&chunk[..filled]);
        Ok(filled)
    }
}
