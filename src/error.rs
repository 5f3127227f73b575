//! Error types for stream-mux.
//!
//! Errors are split into two categories:
//! - **Control errors** ([`StreamMuxError`]): rejected selections, inconsistent
//!   channel layouts and saved-selection storage failures
//! - **Recoverable events**: real-time conditions (discontinuity, trimmed
//!   splices) surfaced via [`EventCallback`](crate::EventCallback); block
//!   processing itself never fails

use std::path::PathBuf;

/// Errors returned from control-context operations.
#[derive(Debug, thiserror::Error)]
pub enum StreamMuxError {
    /// The requested group index does not exist.
    #[error("group {index} out of range ({available} groups available)")]
    GroupOutOfRange {
        /// The requested index.
        index: usize,
        /// Number of discovered groups.
        available: usize,
    },

    /// The requested stream index does not exist in the active group.
    #[error("stream {index} out of range ({available} streams in the active group)")]
    StreamOutOfRange {
        /// The requested index.
        index: usize,
        /// Number of streams in the active group.
        available: usize,
    },

    /// No group has been discovered, so nothing can be selected.
    #[error("no stream groups discovered")]
    NoGroups,

    /// Stream start offsets claim a channel twice or run past the channel list.
    ///
    /// This happens when the channels of one stream are not contiguous in the
    /// host's channel list.
    #[error("stream starting at channel {offset} overlaps another stream or the end of the channel list")]
    OverlappingStreams {
        /// Start offset of the offending stream.
        offset: usize,
    },

    /// Reading or writing a saved selection file failed.
    #[error("saved selection {path}: {source}")]
    Persist {
        /// Path to the file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A saved selection could not be encoded or decoded.
    #[error("saved selection format: {0}")]
    Format(#[from] serde_json::Error),
}

impl StreamMuxError {
    /// Creates a persistence error for the given path.
    pub fn persist(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persist {
            path: path.into(),
            source,
        }
    }
}
