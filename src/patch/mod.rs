//! Reconstruction: apply an instruction stream to the target file
//!
//! Instructions append to a temp file colocated with the target; only a
//! CLOSE whose digest matches what was written publishes the result, by
//! renaming the temp over the target in one step. Everything before
//! that leaves the target untouched.

use crate::delta::{Instruction, InstructionSink};
use crate::error::{Error, Result};
use crate::signature::Signature;
use crate::strong::StrongHash;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Suffix of the staging file next to the final path
const TMP_SUFFIX: &str = ".tmp";

/// Applies an instruction stream to rebuild the file at `path`.
///
/// Processes each instruction's tag bits in OPEN, DATA, INDEX, CLOSE
/// order. Implements [`InstructionSink`], so a matcher can pipe into it
/// directly for an in-process sync.
pub struct Reconstructor<'a> {
    signature: &'a Signature,
    path: PathBuf,
    tmp_path: PathBuf,
    target: Option<File>,
    staging: Option<File>,
    whole: StrongHash,
    expected_len: u64,
    finished: bool,
}

impl<'a> Reconstructor<'a> {
    /// Prepare a reconstruction of `path` interpreted via `signature`.
    ///
    /// Nothing touches the filesystem until OPEN arrives.
    pub fn new(path: impl Into<PathBuf>, signature: &'a Signature) -> Self {
        let path = path.into();
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(TMP_SUFFIX);
        Self {
            signature,
            path,
            tmp_path: PathBuf::from(tmp),
            target: None,
            staging: None,
            whole: StrongHash::new(),
            expected_len: 0,
            finished: false,
        }
    }

    /// Process one instruction.
    pub fn write(&mut self, instruction: &Instruction) -> Result<()> {
        if self.finished {
            return Err(Error::bad_argument("instruction after CLOSE"));
        }
        if instruction.kind.is_open() {
            self.do_open(instruction)?;
        }
        if instruction.kind.is_data() {
            self.do_data(instruction)?;
        }
        if instruction.kind.is_index() {
            self.do_index(instruction)?;
        }
        if instruction.kind.is_close() {
            self.do_close(instruction)?;
        }
        Ok(())
    }

    /// Expected size of the finished file, as announced by OPEN.
    pub fn expected_len(&self) -> u64 {
        self.expected_len
    }

    fn do_open(&mut self, instruction: &Instruction) -> Result<()> {
        if self.staging.is_some() {
            return Err(Error::bad_argument("duplicate OPEN"));
        }
        self.expected_len = instruction.offset;
        self.whole = StrongHash::new();

        let staging = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.tmp_path)
            .map_err(|e| {
                Error::io(format!("creating temp file {}", self.tmp_path.display()), e)
            })?;
        self.staging = Some(staging);

        // The target may be absent; that only becomes an error if an
        // INDEX later needs its blocks.
        self.target = match File::open(&self.path) {
            Ok(file) => Some(file),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                return Err(Error::io(
                    format!("opening target {}", self.path.display()),
                    e,
                ));
            }
        };
        tracing::debug!(
            path = %self.path.display(),
            expected_len = self.expected_len,
            has_target = self.target.is_some(),
            "reconstruction opened"
        );
        Ok(())
    }

    fn do_data(&mut self, instruction: &Instruction) -> Result<()> {
        let staging = self
            .staging
            .as_mut()
            .ok_or_else(|| Error::bad_argument("DATA before OPEN"))?;
        let data = instruction
            .data
            .as_deref()
            .ok_or_else(|| Error::bad_argument("DATA instruction without payload"))?;
        self.whole.update(data);
        staging
            .write_all(data)
            .map_err(|e| Error::io("appending literal data", e))?;
        Ok(())
    }

    fn do_index(&mut self, instruction: &Instruction) -> Result<()> {
        let staging = self
            .staging
            .as_mut()
            .ok_or_else(|| Error::bad_argument("INDEX before OPEN"))?;
        let block_index = instruction
            .block_index
            .ok_or_else(|| Error::bad_argument("INDEX instruction without block index"))?;
        let block = self.signature.block(block_index).ok_or_else(|| {
            Error::bad_argument(format!("block index {} not in signature", block_index))
        })?;
        let target = self.target.as_mut().ok_or_else(|| {
            Error::integrity(format!(
                "block {} requested but target {} is absent",
                block_index,
                self.path.display()
            ))
        })?;

        target
            .seek(SeekFrom::Start(block.offset))
            .map_err(|e| Error::io(format!("seeking target to offset {}", block.offset), e))?;
        let mut data = vec![0u8; block.length as usize];
        read_exact_at(target, &mut data, block.offset)?;

        self.whole.update(&data);
        staging
            .write_all(&data)
            .map_err(|e| Error::io(format!("appending block {}", block_index), e))?;
        Ok(())
    }

    fn do_close(&mut self, instruction: &Instruction) -> Result<()> {
        let expected = instruction
            .whole_hash
            .ok_or_else(|| Error::bad_argument("CLOSE instruction without digest"))?;
        if self.staging.is_none() {
            return Err(Error::bad_argument("CLOSE before OPEN"));
        }

        let actual = std::mem::take(&mut self.whole).finalize();
        if actual != expected {
            // Discard the staging file; the target stays as it was.
            self.staging = None;
            self.target = None;
            let _ = fs::remove_file(&self.tmp_path);
            self.finished = true;
            return Err(Error::integrity(format!(
                "digest mismatch: built {} but stream says {}",
                actual, expected
            )));
        }

        // Both handles must be closed before the rename.
        if let Some(staging) = self.staging.take() {
            staging
                .sync_all()
                .map_err(|e| Error::io("flushing temp file", e))?;
        }
        self.target = None;

        fs::rename(&self.tmp_path, &self.path).map_err(|e| {
            Error::io(
                format!(
                    "publishing {} over {}",
                    self.tmp_path.display(),
                    self.path.display()
                ),
                e,
            )
        })?;
        self.finished = true;
        tracing::debug!(path = %self.path.display(), "reconstruction published");
        Ok(())
    }
}

impl InstructionSink for Reconstructor<'_> {
    fn consume(&mut self, instruction: Instruction) -> Result<()> {
        self.write(&instruction)
    }
}

fn read_exact_at(file: &mut File, buf: &mut [u8], offset: u64) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(Error::short_io(
                    format!("reading target block at offset {}", offset),
                    buf.len(),
                    filled,
                ));
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(Error::io(
                    format!("reading target at offset {}", offset + filled as u64),
                    e,
                ));
            }
        }
    }
    Ok(())
}

/// Apply an encoded delta stream to the file at `path`.
pub fn apply_delta(path: &Path, signature: &Signature, mut stream: &[u8]) -> Result<()> {
    let mut reconstructor = Reconstructor::new(path, signature);
    let mut closed = false;
    while let Some(instruction) = crate::delta::decode_instruction(&mut stream)? {
        closed = instruction.kind.is_close();
        reconstructor.write(&instruction)?;
    }
    if !closed {
        return Err(Error::integrity("instruction stream ended without CLOSE"));
    }
    Ok(())
}
