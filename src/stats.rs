//! Multiplexer statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of multiplexer statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MuxStats {
    /// Blocks processed since construction.
    pub blocks_processed: u64,
    /// Blocks in which the active stream changed.
    pub stream_switches: u64,
    /// Switches that found the previous stream discontinuous.
    pub discontinuities: u64,
    /// Switches spliced with a previous-stream prefix.
    pub splices: u64,
    /// Samples lost at switches that could not be spliced.
    pub trimmed_samples: u64,
    /// Markers accepted by the marker sink.
    pub markers_emitted: u64,
    /// Markers rejected by the marker sink.
    pub markers_dropped: u64,
}

/// Counters shared between the real-time path and whoever reads stats.
///
/// Only the real-time path writes; readers may observe counters from
/// slightly different blocks, which is fine for monitoring.
#[derive(Debug, Default)]
pub(crate) struct MuxCounters {
    pub blocks_processed: AtomicU64,
    pub stream_switches: AtomicU64,
    pub discontinuities: AtomicU64,
    pub splices: AtomicU64,
    pub trimmed_samples: AtomicU64,
    pub markers_emitted: AtomicU64,
    pub markers_dropped: AtomicU64,
}

impl MuxCounters {
    pub fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MuxStats {
        MuxStats {
            blocks_processed: self.blocks_processed.load(Ordering::Relaxed),
            stream_switches: self.stream_switches.load(Ordering::Relaxed),
            discontinuities: self.discontinuities.load(Ordering::Relaxed),
            splices: self.splices.load(Ordering::Relaxed),
            trimmed_samples: self.trimmed_samples.load(Ordering::Relaxed),
            markers_emitted: self.markers_emitted.load(Ordering::Relaxed),
            markers_dropped: self.markers_dropped.load(Ordering::Relaxed),
        }
    }
}
