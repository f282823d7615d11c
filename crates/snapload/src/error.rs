//! Bootstrap error types.
//!
//! Every error here is `Clone`: a failed bootstrap is cached and handed
//! back, unchanged, to every later caller.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by the dynamic-link step itself
#[derive(Debug, Clone, Error)]
pub enum LinkError {
    /// Library file not found or rejected by the dynamic linker
    #[error("Library could not be linked: {path}: {reason}")]
    NotFound {
        /// Path that was attempted
        path: String,
        /// Message reported by the platform linker
        reason: String,
    },

    /// Required entry point missing from the library
    #[error("Symbol not found: {symbol} in {library}")]
    SymbolNotFound {
        /// Symbol name that was not found
        symbol: String,
        /// Library path
        library: String,
    },

    /// Path could not be handed to the platform linker
    #[error("Invalid library path: {0}")]
    InvalidPath(String),

    /// Platform-specific error
    #[error("Platform error: {0}")]
    Platform(String),
}

/// Coarse classification of a [`LoadError`], for callers that only need to
/// branch on the kind of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnsupportedPlatform,
    ResourceNotFound,
    ExtractionIo,
    Link,
    Interrupted,
}

/// Errors surfaced by the bootstrap entry point
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    /// No native binary exists for this OS/architecture
    #[error("Unsupported platform: os={os}, arch={arch}")]
    UnsupportedPlatform { os: String, arch: String },

    /// No candidate binary was found for the resolved platform
    #[error("Native library {resource} not found (searched: {})", searched.join(", "))]
    ResourceNotFound {
        resource: String,
        searched: Vec<String>,
    },

    /// Copying the bundled binary to disk failed
    #[error("Failed to extract native library to {}: {source}", path.display())]
    ExtractionIo {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    /// The binary was found but the dynamic linker rejected it
    #[error(transparent)]
    Link(#[from] LinkError),

    /// The bootstrap thread unwound before publishing an outcome
    #[error("Native library bootstrap was interrupted")]
    Interrupted,
}

impl LoadError {
    pub(crate) fn extraction(path: impl Into<PathBuf>, source: io::Error) -> Self {
        LoadError::ExtractionIo {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LoadError::UnsupportedPlatform { .. } => ErrorKind::UnsupportedPlatform,
            LoadError::ResourceNotFound { .. } => ErrorKind::ResourceNotFound,
            LoadError::ExtractionIo { .. } => ErrorKind::ExtractionIo,
            LoadError::Link(_) => ErrorKind::Link,
            LoadError::Interrupted => ErrorKind::Interrupted,
        }
    }

    /// Whether a fresh bootstrap attempt may succeed where this one failed.
    ///
    /// Only extraction I/O failures are transient; the others describe the
    /// environment or the binary and will fail the same way again. A guard
    /// keeps its failure, so a fresh attempt is a new
    /// [`LoadGuard`](crate::guard::LoadGuard).
    pub fn is_retryable(&self) -> bool {
        matches!(self, LoadError::ExtractionIo { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_retryable() {
        let err = LoadError::extraction("/tmp/x", io::Error::other("disk full"));
        assert_eq!(err.kind(), ErrorKind::ExtractionIo);
        assert!(err.is_retryable());

        let err = LoadError::from(LinkError::InvalidPath("bad".to_string()));
        assert_eq!(err.kind(), ErrorKind::Link);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_clone_keeps_message() {
        let err = LoadError::ResourceNotFound {
            resource: "libsnappynative-linux-x86_64-64.so".to_string(),
            searched: vec!["bundled".to_string(), "/opt/lib".to_string()],
        };
        let copy = err.clone();
        assert_eq!(err.to_string(), copy.to_string());
        assert!(copy.to_string().contains("bundled, /opt/lib"));
    }
}
