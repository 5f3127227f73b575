//! Upstream stream abstractions.
//!
//! This module describes what the host pipeline hands to the multiplexer:
//! the flat channel list, the identity of each stream, and the per-block
//! timing of every stream.

mod channel;
mod mock;
mod stream_id;

pub use channel::InputChannel;
pub use mock::MockHost;
pub use stream_id::StreamId;

/// Per-block timing queries answered by the host.
///
/// Both queries are only valid for streams that belong to the active group.
/// Implementations are called from the real-time path and must not block.
pub trait StreamClock {
    /// Number of valid samples the stream delivered in the current block.
    fn sample_count(&self, stream: StreamId) -> usize;

    /// Absolute sample index, in the stream's own clock, of the first sample
    /// of the current block.
    fn start_timestamp(&self, stream: StreamId) -> u64;
}

impl<T: StreamClock + ?Sized> StreamClock for &T {
    fn sample_count(&self, stream: StreamId) -> usize {
        (**self).sample_count(stream)
    }

    fn start_timestamp(&self, stream: StreamId) -> u64 {
        (**self).start_timestamp(stream)
    }
}
