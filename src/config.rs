//! Configuration types for the multiplexer.

/// Configuration for a [`StreamMuxer`](crate::StreamMuxer).
///
/// Use [`MuxConfig::default()`] for the standard identifiers, or customize as
/// needed.
///
/// # Example
///
/// ```
/// use stream_mux::MuxConfig;
///
/// let config = MuxConfig {
///     marker_queue_capacity: 256,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuxConfig {
    /// Display name of the marker channel.
    ///
    /// Default: "Stream Selected"
    pub marker_name: String,

    /// Description of the marker channel.
    pub marker_description: String,

    /// Machine-readable identifier of the marker channel.
    ///
    /// Default: "stream.mux.index.selected"
    pub marker_identifier: String,

    /// Identifier tagging the stream count on every output channel.
    ///
    /// Default: "stream.mux.count"
    pub count_identifier: String,

    /// Identifier tagging the candidate source streams on every output channel.
    ///
    /// Default: "source.identifier.full.array"
    pub sources_identifier: String,

    /// Capacity of the lock-free marker queue from
    /// [`marker_queue()`](crate::marker_queue).
    ///
    /// At most two markers are produced per block, so a few blocks' worth is
    /// plenty. Default: 64
    pub marker_queue_capacity: usize,
}

impl Default for MuxConfig {
    fn default() -> Self {
        Self {
            marker_name: "Stream Selected".to_string(),
            marker_description: "Value of the selected stream each time it changes".to_string(),
            marker_identifier: "stream.mux.index.selected".to_string(),
            count_identifier: "stream.mux.count".to_string(),
            sources_identifier: "source.identifier.full.array".to_string(),
            marker_queue_capacity: 64,
        }
    }
}
