//! Error types for rollsync

use thiserror::Error;

/// Result type alias for rollsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for rollsync
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors (file system operations)
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Fewer bytes moved than requested
    #[error("short I/O {context}: expected {expected} bytes, got {actual}")]
    ShortIo {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// Caller bug: zero block size, out-of-range index, malformed header
    #[error("bad argument: {message}")]
    BadArgument { message: String },

    /// Digest mismatch or truncated wire data
    #[error("integrity error: {message}")]
    Integrity { message: String },

    /// Downstream instruction sink refused an instruction
    #[error("sink error: {message}")]
    Sink { message: String },

    /// Configuration errors
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl Error {
    /// Create an I/O error with context
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a short-I/O error
    pub fn short_io(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::ShortIo {
            context: context.into(),
            expected,
            actual,
        }
    }

    /// Create a bad-argument error
    pub fn bad_argument(message: impl Into<String>) -> Self {
        Self::BadArgument {
            message: message.into(),
        }
    }

    /// Create an integrity error
    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity {
            message: message.into(),
        }
    }

    /// Create a sink error
    pub fn sink(message: impl Into<String>) -> Self {
        Self::Sink {
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Config {
            message: format!("TOML parse error: {}", err),
        }
    }
}
