//! Error types for loopwatch.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using loopwatch's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for loopwatch.
#[derive(Error, Debug)]
pub enum Error {
    // Source errors
    #[error("Audio decode error: {0}")]
    AudioDecode(String),

    #[error("Cannot stat {}: {source}", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Output errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns true if the error is handled locally and retried on the next tick.
    ///
    /// Decode and stat failures only ever mean "keep playing what we have";
    /// everything else belongs to setup and is fatal there.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::AudioDecode(_) | Self::Stat { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_recoverable() {
        assert!(Error::AudioDecode("truncated".into()).is_recoverable());
        assert!(Error::Stat {
            path: PathBuf::from("/missing.wav"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        }
        .is_recoverable());
        assert!(!Error::AudioOutput("no device".into()).is_recoverable());
        assert!(!Error::Config("bad".into()).is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let err = Error::AudioDecode("no audio tracks".into());
        assert_eq!(err.to_string(), "Audio decode error: no audio tracks");

        let err = Error::Stat {
            path: PathBuf::from("/tmp/loop.wav"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.to_string().starts_with("Cannot stat /tmp/loop.wav:"));
    }
}
