//! Host channel record consumed by group discovery.

use super::StreamId;

/// One element of the host's flat, ordered input channel list.
///
/// Channels belonging to the same stream must be contiguous in that list.
/// Discovery relies on this and never re-sorts.
#[derive(Debug, Clone, PartialEq)]
pub struct InputChannel {
    /// Stream that produced this channel.
    pub stream_id: StreamId,

    /// Sample rate in Hz.
    pub sample_rate: f32,

    /// Scale factor from raw sample units to physical units (bit-volts).
    pub scale: f32,

    /// Physical units label (e.g. "uV").
    pub units: String,

    /// Display name assigned by the host.
    pub name: String,
}

impl InputChannel {
    /// Creates a channel with unit scale and empty metadata.
    pub fn new(stream_id: StreamId, sample_rate: f32) -> Self {
        Self {
            stream_id,
            sample_rate,
            scale: 1.0,
            units: String::new(),
            name: String::new(),
        }
    }

    /// Sets the scale factor.
    #[must_use]
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Sets the units label.
    #[must_use]
    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}
