//! Mock host for testing without a real acquisition pipeline.

use super::{InputChannel, StreamClock, StreamId};
use crate::buffer::SampleBuffer;

/// One stream served by a [`MockHost`].
#[derive(Debug, Clone)]
struct MockStream {
    id: StreamId,
    num_channels: usize,
    sample_rate: f32,
    start: u64,
    count: usize,
}

/// A mock host that fabricates channel lists, per-stream timing and block
/// contents.
///
/// Every stream's rows are filled with [`MockHost::sample_value`], so a test
/// can tell from any output sample which stream, channel and timestamp it
/// came from.
///
/// # Example
///
/// ```
/// use stream_mux::source::{MockHost, StreamClock, StreamId};
///
/// let probe_a = StreamId::new(100, 0);
/// let mut host = MockHost::new()
///     .with_stream(probe_a, 4, 30000.0)
///     .with_stream(StreamId::new(101, 0), 4, 30000.0);
///
/// host.advance(256);
/// assert_eq!(host.channels().len(), 8);
/// assert_eq!(host.sample_count(probe_a), 256);
///
/// let block = host.block(256);
/// assert_eq!(block.channel(0).unwrap()[3], MockHost::sample_value(0, 0, 3));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockHost {
    streams: Vec<MockStream>,
}

impl MockHost {
    /// Creates a host with no streams.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stream; its channels follow those of earlier streams.
    #[must_use]
    pub fn with_stream(mut self, id: StreamId, num_channels: usize, sample_rate: f32) -> Self {
        self.streams.push(MockStream {
            id,
            num_channels,
            sample_rate,
            start: 0,
            count: 0,
        });
        self
    }

    /// Returns the flat channel list the host would hand to discovery.
    pub fn channels(&self) -> Vec<InputChannel> {
        self.streams
            .iter()
            .flat_map(|stream| {
                (0..stream.num_channels).map(move |ch| {
                    InputChannel::new(stream.id, stream.sample_rate)
                        .with_scale(0.195)
                        .with_units("uV")
                        .with_name(format!("{} CH{}", stream.id, ch + 1))
                })
            })
            .collect()
    }

    /// Returns the total number of channel rows.
    pub fn num_channels(&self) -> usize {
        self.streams.iter().map(|s| s.num_channels).sum()
    }

    /// Overrides the timing of one stream for the current block.
    pub fn set_timing(&mut self, id: StreamId, start: u64, count: usize) {
        if let Some(stream) = self.streams.iter_mut().find(|s| s.id == id) {
            stream.start = start;
            stream.count = count;
        }
    }

    /// Moves every stream to its next block of `count` samples.
    pub fn advance(&mut self, count: usize) {
        for stream in &mut self.streams {
            stream.start += stream.count as u64;
            stream.count = count;
        }
    }

    /// Value stored at `timestamp` of channel `channel` of the stream at
    /// position `stream` in the host's list.
    pub fn sample_value(stream: usize, channel: usize, timestamp: u64) -> f32 {
        ((stream + 1) * 100_000 + channel * 10_000) as f32 + (timestamp % 10_000) as f32
    }

    /// Fills every stream's rows with its current block.
    ///
    /// Samples past a stream's count are zeroed.
    pub fn fill(&self, buffer: &mut SampleBuffer) {
        let mut row = 0;
        for (position, stream) in self.streams.iter().enumerate() {
            for ch in 0..stream.num_channels {
                if let Some(samples) = buffer.channel_mut(row) {
                    for (i, sample) in samples.iter_mut().enumerate() {
                        *sample = if i < stream.count {
                            Self::sample_value(position, ch, stream.start + i as u64)
                        } else {
                            0.0
                        };
                    }
                }
                row += 1;
            }
        }
    }

    /// Allocates a block of `capacity` samples and fills it.
    pub fn block(&self, capacity: usize) -> SampleBuffer {
        let mut buffer = SampleBuffer::new(self.num_channels(), capacity);
        self.fill(&mut buffer);
        buffer
    }

    fn stream(&self, id: StreamId) -> Option<&MockStream> {
        self.streams.iter().find(|s| s.id == id)
    }
}

impl StreamClock for MockHost {
    fn sample_count(&self, stream: StreamId) -> usize {
        self.stream(stream).map_or(0, |s| s.count)
    }

    fn start_timestamp(&self, stream: StreamId) -> u64 {
        self.stream(stream).map_or(0, |s| s.start)
    }
}
