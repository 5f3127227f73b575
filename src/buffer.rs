//! Multi-channel block buffer and the stream-row copy primitive.

/// A block of samples laid out as channel rows, as delivered by the host.
///
/// The multiplexer only needs to move sample ranges between rows of the
/// same block, so this is the whole contract. Hosts with their own buffer
/// type implement it directly; [`SampleBuffer`] is the crate's own.
pub trait ChannelBuffer {
    /// Number of channel rows.
    fn num_channels(&self) -> usize;

    /// Capacity of every row, in samples.
    fn num_samples(&self) -> usize;

    /// Copies `len` samples from `src_channel[src_start..]` to
    /// `dest_channel[dest_start..]`.
    ///
    /// Callers keep both ranges inside the buffer. Ranges on the same row
    /// may overlap and must be moved as if through a temporary.
    fn copy_channel_range(
        &mut self,
        dest_channel: usize,
        dest_start: usize,
        src_channel: usize,
        src_start: usize,
        len: usize,
    );
}

/// Channel-major sample storage for one processing block.
///
/// All rows share one allocation; the buffer is sized once and reused for
/// every block.
///
/// # Example
///
/// ```
/// use stream_mux::{ChannelBuffer, SampleBuffer};
///
/// let mut buffer = SampleBuffer::from_channels(vec![
///     vec![0.0, 0.0, 0.0],
///     vec![1.0, 2.0, 3.0],
/// ]);
/// buffer.copy_channel_range(0, 1, 1, 0, 2);
/// assert_eq!(buffer.channel(0), Some(&[0.0, 1.0, 2.0][..]));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    data: Vec<f32>,
    num_channels: usize,
    num_samples: usize,
}

impl SampleBuffer {
    /// Creates a zeroed buffer.
    pub fn new(num_channels: usize, num_samples: usize) -> Self {
        Self {
            data: vec![0.0; num_channels * num_samples],
            num_channels,
            num_samples,
        }
    }

    /// Creates a buffer from per-channel rows.
    ///
    /// The capacity is the longest row; shorter rows are zero padded.
    pub fn from_channels(rows: Vec<Vec<f32>>) -> Self {
        let num_samples = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut buffer = Self::new(rows.len(), num_samples);
        for (index, row) in rows.into_iter().enumerate() {
            let start = index * num_samples;
            buffer.data[start..start + row.len()].copy_from_slice(&row);
        }
        buffer
    }

    /// Returns one channel row.
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.row_range(index).map(|range| &self.data[range])
    }

    /// Returns one channel row for writing.
    pub fn channel_mut(&mut self, index: usize) -> Option<&mut [f32]> {
        self.row_range(index).map(move |range| &mut self.data[range])
    }

    /// Zeroes every sample.
    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }

    fn row_range(&self, index: usize) -> Option<std::ops::Range<usize>> {
        (index < self.num_channels)
            .then(|| index * self.num_samples..(index + 1) * self.num_samples)
    }
}

impl ChannelBuffer for SampleBuffer {
    fn num_channels(&self) -> usize {
        self.num_channels
    }

    fn num_samples(&self) -> usize {
        self.num_samples
    }

    fn copy_channel_range(
        &mut self,
        dest_channel: usize,
        dest_start: usize,
        src_channel: usize,
        src_start: usize,
        len: usize,
    ) {
        let len = clamp_len(self.num_samples, dest_start, src_start, len);
        if len == 0 || dest_channel >= self.num_channels || src_channel >= self.num_channels {
            return;
        }
        let src = src_channel * self.num_samples + src_start;
        let dest = dest_channel * self.num_samples + dest_start;
        self.data.copy_within(src..src + len, dest);
    }
}

/// Largest length that keeps both ranges inside a row of `capacity` samples.
fn clamp_len(capacity: usize, dest_start: usize, src_start: usize, len: usize) -> usize {
    len.min(capacity.saturating_sub(dest_start))
        .min(capacity.saturating_sub(src_start))
}

/// Copies the `num_channels` rows of one stream into the output rows.
///
/// Row `channel_offset + i` is copied to row `i` for every `i`, moving
/// samples `[src_start, src_start + len)` to `[dest_start, dest_start + len)`.
/// Rows are visited in ascending order, so a source row is always read before
/// it can be overwritten as a destination. The copy is skipped when source
/// and destination coincide.
pub(crate) fn copy_stream_rows<B: ChannelBuffer + ?Sized>(
    buffer: &mut B,
    channel_offset: usize,
    num_channels: usize,
    dest_start: usize,
    src_start: usize,
    len: usize,
) {
    if channel_offset == 0 && dest_start == src_start {
        return;
    }
    let len = clamp_len(buffer.num_samples(), dest_start, src_start, len);
    if len == 0 {
        return;
    }
    let rows = num_channels.min(buffer.num_channels().saturating_sub(channel_offset));
    for row in 0..rows {
        buffer.copy_channel_range(row, dest_start, channel_offset + row, src_start, len);
    }
}
