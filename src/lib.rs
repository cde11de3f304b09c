//! rollsync - rolling-checksum file delta engine
//!
//! Turns a receiver's copy of a file into an exact copy of the sender's
//! while moving only the bytes that do not already exist as aligned
//! blocks of the old file. Three phases: sign the target into per-block
//! weak+strong checksums, match the source against the signature with a
//! byte-sliding window, and reconstruct the target from the resulting
//! instruction stream, verifying the whole-file digest before the
//! atomic publish.

pub mod cli;
pub mod config;
pub mod delta;
pub mod error;
pub mod patch;
pub mod signature;
pub mod strong;
pub mod weak;

pub use config::Config;
pub use delta::{emit_delta, Instruction, InstructionKind, InstructionSink};
pub use error::{Error, Result};
pub use patch::Reconstructor;
pub use signature::{sign_file, BlockSignature, Signature, SignatureIndex};
pub use strong::{Digest, StrongHash};
pub use weak::WeakHash;
