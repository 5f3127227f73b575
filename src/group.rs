//! Stream groups: sets of interchangeable streams.

use serde::{Deserialize, Serialize};

/// Structural signature shared by every stream of a group.
///
/// Two signatures are equal when the channel counts match and both sample
/// rates are defined and equal. A NaN sample rate never equals anything,
/// itself included; [`GroupSignature::undefined`] uses that as the
/// "nothing selected" sentinel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GroupSignature {
    /// Channels per stream.
    pub num_channels: usize,
    /// Sample rate in Hz.
    pub sample_rate: f32,
}

impl GroupSignature {
    /// Creates a signature.
    pub const fn new(num_channels: usize, sample_rate: f32) -> Self {
        Self {
            num_channels,
            sample_rate,
        }
    }

    /// A signature that matches no group.
    pub const fn undefined() -> Self {
        Self::new(0, f32::NAN)
    }

    /// Returns `true` if the sample rate is defined.
    pub fn is_defined(&self) -> bool {
        !self.sample_rate.is_nan()
    }
}

impl PartialEq for GroupSignature {
    fn eq(&self, other: &Self) -> bool {
        self.num_channels == other.num_channels
            && self.is_defined()
            && self.sample_rate == other.sample_rate
    }
}

/// A discovered group of streams with the same signature.
///
/// `start_offsets[k]` is the index into the flat input channel list where
/// the k-th stream of the group begins; its length is the stream count.
/// Groups are built fresh by every discovery pass and never mutated after.
///
/// Equality compares signatures only, so a working group can be matched
/// against the groups discovered so far.
#[derive(Debug, Clone)]
pub struct StreamGroup {
    signature: GroupSignature,
    start_offsets: Vec<usize>,
}

impl StreamGroup {
    pub(crate) fn new(signature: GroupSignature, start_offsets: Vec<usize>) -> Self {
        Self {
            signature,
            start_offsets,
        }
    }

    /// Returns the group signature.
    pub fn signature(&self) -> GroupSignature {
        self.signature
    }

    /// Channels per stream.
    pub fn num_channels(&self) -> usize {
        self.signature.num_channels
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.signature.sample_rate
    }

    /// Start offset of every stream, in discovery order.
    pub fn start_offsets(&self) -> &[usize] {
        &self.start_offsets
    }

    /// Number of streams in the group.
    pub fn stream_count(&self) -> usize {
        self.start_offsets.len()
    }

    pub(crate) fn push_offset(&mut self, offset: usize) {
        self.start_offsets.push(offset);
    }

    /// Returns the presentation summary of this group.
    pub fn summary(&self) -> GroupSummary {
        GroupSummary {
            num_channels: self.num_channels(),
            sample_rate: self.sample_rate(),
            stream_count: self.stream_count(),
        }
    }
}

impl PartialEq for StreamGroup {
    fn eq(&self, other: &Self) -> bool {
        self.signature == other.signature
    }
}

/// What a control surface shows for one group.
///
/// Renders as `"{channels}ch@{rate}Hz"`:
///
/// ```
/// use stream_mux::GroupSummary;
///
/// let summary = GroupSummary { num_channels: 4, sample_rate: 30000.0, stream_count: 2 };
/// assert_eq!(summary.to_string(), "4ch@30000.00Hz");
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupSummary {
    /// Channels per stream.
    pub num_channels: usize,
    /// Sample rate in Hz.
    pub sample_rate: f32,
    /// Number of streams in the group.
    pub stream_count: usize,
}

impl std::fmt::Display for GroupSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ch@{:.2}Hz", self.num_channels, self.sample_rate)
    }
}
