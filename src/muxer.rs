//! The multiplexer facade driven by the host.

use std::sync::Arc;

use crate::buffer::ChannelBuffer;
use crate::config::MuxConfig;
use crate::descriptor::{output_channels, MarkerChannel, OutputChannel};
use crate::event::{EventCallback, MuxEvent};
use crate::group::{GroupSummary, StreamGroup};
use crate::pipeline::{
    discover, marker_queue, partition_streams, BlockMultiplexer, BlockOutput, Discovery,
    MarkerConsumer, MarkerProducer, MarkerSink, MuxLayout,
};
use crate::selection::{SavedSelection, SelectionHandle, SelectionState};
use crate::source::{InputChannel, StreamClock};
use crate::stats::{MuxCounters, MuxStats};
use crate::StreamMuxError;

/// Selects one stream out of a group of interchangeable streams and splices
/// stream switches seamlessly.
///
/// The host drives it from two contexts:
///
/// - **Control**: [`update_settings()`](Self::update_settings) on every
///   topology change, plus the group and stream setters.
/// - **Real-time**: [`process()`](Self::process) once per block, after
///   [`on_enable()`](Self::on_enable) at the start of each run.
///
/// Stream changes from other threads go through a [`SelectionHandle`].
///
/// # Example
///
/// ```
/// use stream_mux::source::{MockHost, StreamId};
/// use stream_mux::{MuxConfig, StreamMuxer};
///
/// let mut host = MockHost::new()
///     .with_stream(StreamId::new(100, 0), 2, 30000.0)
///     .with_stream(StreamId::new(101, 0), 2, 30000.0);
///
/// let mut muxer = StreamMuxer::new(MuxConfig::default());
/// muxer.update_settings(host.channels())?;
/// assert_eq!(muxer.list_groups()[0].to_string(), "2ch@30000.00Hz");
///
/// muxer.select_stream(1)?;
/// muxer.on_enable();
///
/// host.advance(64);
/// let mut block = host.block(128);
/// let mut markers = Vec::new();
/// let output = muxer.process(&mut block, &host, &mut markers);
///
/// assert_eq!(output.num_samples, 64);
/// assert_eq!(markers[0].stream, 1);
/// # Ok::<(), stream_mux::StreamMuxError>(())
/// ```
pub struct StreamMuxer {
    config: MuxConfig,
    groups: Vec<StreamGroup>,
    selection: SelectionState,
    restored: Option<SavedSelection>,
    channel_sets: Vec<Vec<InputChannel>>,
    /// Group the channel sets and descriptors were built for.
    built_for: Option<usize>,
    output_channels: Vec<OutputChannel>,
    marker_channel: MarkerChannel,
    multiplexer: BlockMultiplexer,
    counters: Arc<MuxCounters>,
    event_callback: Option<EventCallback>,
}

impl StreamMuxer {
    /// Creates a multiplexer with no groups.
    pub fn new(config: MuxConfig) -> Self {
        let counters = Arc::new(MuxCounters::default());
        Self {
            marker_channel: MarkerChannel::new(&config, 1.0),
            config,
            groups: Vec::new(),
            selection: SelectionState::default(),
            restored: None,
            channel_sets: Vec::new(),
            built_for: None,
            output_channels: Vec::new(),
            multiplexer: BlockMultiplexer::new(Arc::clone(&counters)),
            counters,
            event_callback: None,
        }
    }

    /// Registers a callback for runtime events.
    ///
    /// Block events are raised from [`process()`](Self::process), on the
    /// real-time path.
    #[must_use]
    pub fn with_event_callback(mut self, callback: EventCallback) -> Self {
        self.multiplexer
            .set_event_callback(Some(Arc::clone(&callback)));
        self.event_callback = Some(callback);
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &MuxConfig {
        &self.config
    }

    /// Refreshes the topology from the host's flat channel list.
    ///
    /// After a user group pick the picked group is kept verbatim and
    /// discovery is skipped. Otherwise groups are rediscovered and the
    /// previous selection is re-resolved against them. Must complete before
    /// the next block is processed.
    ///
    /// # Errors
    ///
    /// Returns [`StreamMuxError::OverlappingStreams`] if the channel list
    /// cannot be partitioned into the active group's streams; the output is
    /// then empty until the next successful refresh.
    pub fn update_settings(&mut self, channels: Vec<InputChannel>) -> Result<(), StreamMuxError> {
        if self.selection.take_group_changed() {
            return self.apply_group_pick(channels);
        }

        let previous = self.restored.take().or_else(|| self.saved_selection());
        let Discovery { groups, selection } = discover(&channels, previous.as_ref());
        self.groups = groups;

        match selection {
            Some(remap) => {
                let stream_count = self.groups[remap.group].stream_count();
                self.selection.apply(Some(remap), stream_count);
                tracing::info!(
                    groups = self.groups.len(),
                    group = remap.group,
                    stream = remap.stream,
                    streams = stream_count,
                    "topology refreshed"
                );
                self.rebuild(channels, remap.group)?;
            }
            None => {
                self.selection.apply(None, 0);
                self.clear_active();
                tracing::warn!(channels = channels.len(), "no stream groups discovered");
            }
        }

        self.emit_event(MuxEvent::TopologyChanged {
            groups: self.groups.len(),
            selected_group: self.selection.selected_group(),
            selected_stream: self.selection.selected_stream(),
        });
        Ok(())
    }

    fn apply_group_pick(&mut self, channels: Vec<InputChannel>) -> Result<(), StreamMuxError> {
        let Some(group) = self.selection.selected_group() else {
            return Ok(());
        };
        let stream_count = self
            .groups
            .get(group)
            .map(StreamGroup::stream_count)
            .ok_or(StreamMuxError::GroupOutOfRange {
                index: group,
                available: self.groups.len(),
            })?;
        self.selection.validate_stream(stream_count);

        if self.built_for != Some(group) {
            self.rebuild(channels, group)?;
        }
        tracing::debug!(
            group,
            stream = self.selection.selected_stream(),
            "kept user group pick"
        );
        Ok(())
    }

    /// Rebuilds channel sets, descriptors and the real-time layout for the
    /// active group.
    fn rebuild(&mut self, channels: Vec<InputChannel>, group: usize) -> Result<(), StreamMuxError> {
        let active = self.groups[group].clone();
        let channel_sets = match partition_streams(channels, &active) {
            Ok(sets) => sets,
            Err(e) => {
                tracing::warn!(error = %e, group, "failed to partition streams");
                self.clear_active();
                return Err(e);
            }
        };

        let stream_ids = channel_sets
            .iter()
            .filter_map(|set| set.first().map(|channel| channel.stream_id));
        self.multiplexer
            .set_layout(Some(MuxLayout::for_group(&active, stream_ids)));

        self.output_channels = output_channels(&active, &channel_sets, &self.config);
        self.marker_channel = MarkerChannel::new(&self.config, active.sample_rate());
        self.channel_sets = channel_sets;
        self.built_for = Some(group);
        Ok(())
    }

    fn clear_active(&mut self) {
        self.multiplexer.set_layout(None);
        self.channel_sets.clear();
        self.output_channels.clear();
        self.marker_channel = MarkerChannel::new(&self.config, 1.0);
        self.built_for = None;
    }

    /// Returns a presentation summary of every discovered group.
    pub fn list_groups(&self) -> Vec<GroupSummary> {
        self.groups.iter().map(StreamGroup::summary).collect()
    }

    /// Returns the discovered groups.
    pub fn groups(&self) -> &[StreamGroup] {
        &self.groups
    }

    /// Picks a group. Takes effect on the next
    /// [`update_settings()`](Self::update_settings), which keeps the pick
    /// instead of re-resolving the previous selection.
    ///
    /// # Errors
    ///
    /// Returns [`StreamMuxError::NoGroups`] before any group exists, or
    /// [`StreamMuxError::GroupOutOfRange`] for an unknown index.
    pub fn select_group(&mut self, index: usize) -> Result<(), StreamMuxError> {
        if self.groups.is_empty() {
            return Err(StreamMuxError::NoGroups);
        }
        if index >= self.groups.len() {
            return Err(StreamMuxError::GroupOutOfRange {
                index,
                available: self.groups.len(),
            });
        }
        self.selection.pick_group(index);
        tracing::info!(group = index, "group selected");
        Ok(())
    }

    /// Selects a stream of the active group, effective from the next block.
    ///
    /// # Errors
    ///
    /// Same as [`SelectionHandle::select_stream()`].
    pub fn select_stream(&self, index: usize) -> Result<(), StreamMuxError> {
        self.selection.handle().select_stream(index)
    }

    /// Returns a handle for selecting streams from another thread.
    pub fn selection_handle(&self) -> SelectionHandle {
        self.selection.handle()
    }

    /// Returns the active group index, if any.
    pub fn selected_group(&self) -> Option<usize> {
        self.selection.selected_group()
    }

    /// Returns the selected stream index.
    pub fn selected_stream(&self) -> usize {
        self.selection.selected_stream()
    }

    /// Returns the active group, if any.
    pub fn active_group(&self) -> Option<&StreamGroup> {
        self.selection
            .selected_group()
            .and_then(|index| self.groups.get(index))
    }

    /// Sample rate of the active group, or 1.0 without one.
    pub fn default_sample_rate(&self) -> f32 {
        self.active_group().map_or(1.0, StreamGroup::sample_rate)
    }

    /// Scale factor of the active group's channels, or 1.0 without one.
    pub fn default_scale(&self) -> f32 {
        self.channel_sets
            .first()
            .and_then(|set| set.first())
            .map_or(1.0, |channel| channel.scale)
    }

    /// Returns the output channel descriptors.
    pub fn output_channels(&self) -> &[OutputChannel] {
        &self.output_channels
    }

    /// Returns the marker channel descriptor.
    pub fn marker_channel(&self) -> &MarkerChannel {
        &self.marker_channel
    }

    /// Returns the active group's channels, one list per stream.
    pub fn channel_sets(&self) -> &[Vec<InputChannel>] {
        &self.channel_sets
    }

    /// Returns the current selection in a form that survives refreshes.
    pub fn saved_selection(&self) -> Option<SavedSelection> {
        self.active_group()
            .map(|group| SavedSelection::new(group.signature(), self.selection.selected_stream()))
    }

    /// Seeds the next topology refresh with a previously saved selection.
    pub fn restore_selection(&mut self, saved: SavedSelection) {
        tracing::debug!(
            channels = saved.signature.num_channels,
            rate = saved.signature.sample_rate,
            stream = saved.stream,
            "selection restored"
        );
        self.restored = Some(saved);
    }

    /// Creates a marker queue sized by the configuration.
    pub fn marker_queue(&self) -> (MarkerProducer, MarkerConsumer) {
        marker_queue(self.config.marker_queue_capacity)
    }

    /// Resets the real-time state at the start of an acquisition run.
    ///
    /// The first block afterwards announces the active stream with a marker.
    pub fn on_enable(&mut self) {
        self.multiplexer.reset(self.selection.selected_stream());
    }

    /// Multiplexes one block in place.
    ///
    /// Reads the selected stream once, writes it into rows
    /// `0..num_channels` of `buffer` and pushes switch markers into
    /// `markers`. Returns the timing the host must report for the output
    /// block; without an active group the output is empty.
    pub fn process<B, C, M>(&mut self, buffer: &mut B, clock: &C, markers: &mut M) -> BlockOutput
    where
        B: ChannelBuffer + ?Sized,
        C: StreamClock + ?Sized,
        M: MarkerSink + ?Sized,
    {
        let selected = self.selection.selector().load();
        self.multiplexer.process(selected, buffer, clock, markers)
    }

    /// Returns a snapshot of the statistics.
    pub fn stats(&self) -> MuxStats {
        self.counters.snapshot()
    }

    fn emit_event(&self, event: MuxEvent) {
        if let Some(ref callback) = self.event_callback {
            callback(event);
        }
    }
}

impl std::fmt::Debug for StreamMuxer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamMuxer")
            .field("groups", &self.groups)
            .field("selected_group", &self.selection.selected_group())
            .field("selected_stream", &self.selection.selected_stream())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::GroupSignature;
    use crate::source::{MockHost, StreamId};

    fn host() -> MockHost {
        MockHost::new()
            .with_stream(StreamId::new(100, 0), 4, 30000.0)
            .with_stream(StreamId::new(100, 1), 2, 2500.0)
            .with_stream(StreamId::new(101, 0), 4, 30000.0)
            .with_stream(StreamId::new(101, 1), 2, 2500.0)
    }

    fn muxer() -> StreamMuxer {
        let mut muxer = StreamMuxer::new(MuxConfig::default());
        muxer.update_settings(host().channels()).unwrap();
        muxer
    }

    #[test]
    fn test_defaults_without_groups() {
        let muxer = StreamMuxer::new(MuxConfig::default());
        assert_eq!(muxer.default_sample_rate(), 1.0);
        assert_eq!(muxer.default_scale(), 1.0);
        assert!(muxer.output_channels().is_empty());
        assert_eq!(muxer.marker_channel().sample_rate, 1.0);
        assert!(matches!(muxer.select_stream(0), Err(StreamMuxError::NoGroups)));
    }

    #[test]
    fn test_refresh_selects_first_group() {
        let muxer = muxer();

        let labels: Vec<_> = muxer.list_groups().iter().map(ToString::to_string).collect();
        assert_eq!(labels, vec!["4ch@30000.00Hz", "2ch@2500.00Hz"]);
        assert_eq!(muxer.selected_group(), Some(0));
        assert_eq!(muxer.selected_stream(), 0);

        assert_eq!(muxer.channel_sets().len(), 2);
        assert_eq!(muxer.output_channels().len(), 4);
        assert_eq!(muxer.default_sample_rate(), 30000.0);
        assert_eq!(muxer.default_scale(), 0.195);
        assert_eq!(muxer.marker_channel().sample_rate, 30000.0);
    }

    #[test]
    fn test_refresh_keeps_selection_by_signature() {
        let mut muxer = muxer();
        muxer.select_group(1).unwrap();
        muxer.update_settings(host().channels()).unwrap();
        muxer.select_stream(1).unwrap();

        // The 2-channel streams now come first.
        let reordered = MockHost::new()
            .with_stream(StreamId::new(100, 1), 2, 2500.0)
            .with_stream(StreamId::new(101, 1), 2, 2500.0)
            .with_stream(StreamId::new(100, 0), 4, 30000.0);
        muxer.update_settings(reordered.channels()).unwrap();

        assert_eq!(muxer.selected_group(), Some(0));
        assert_eq!(muxer.selected_stream(), 1);
        assert_eq!(muxer.output_channels().len(), 2);
    }

    #[test]
    fn test_group_pick_rebuilds_only_on_change() {
        let mut muxer = muxer();
        muxer.select_stream(1).unwrap();

        muxer.select_group(1).unwrap();
        muxer.update_settings(host().channels()).unwrap();
        assert_eq!(muxer.selected_group(), Some(1));
        assert_eq!(muxer.output_channels().len(), 2);
        assert_eq!(muxer.default_sample_rate(), 2500.0);
        assert_eq!(muxer.selected_stream(), 1);

        // Picking the already active group leaves everything as built.
        muxer.select_group(1).unwrap();
        muxer.update_settings(host().channels()).unwrap();
        assert_eq!(muxer.output_channels().len(), 2);
    }

    #[test]
    fn test_group_pick_refresh_skips_discovery() {
        let mut muxer = muxer();
        muxer.select_group(1).unwrap();
        muxer.update_settings(host().channels()).unwrap();
        muxer.select_stream(1).unwrap();
        let groups = muxer.list_groups();

        // The refresh after a pick keeps the group list even though the
        // channel list it is handed has a different topology.
        let other = MockHost::new().with_stream(StreamId::new(7, 0), 3, 1000.0);
        muxer.select_group(1).unwrap();
        muxer.update_settings(other.channels()).unwrap();

        assert_eq!(muxer.list_groups(), groups);
        assert_eq!(muxer.selected_group(), Some(1));
        assert_eq!(muxer.selected_stream(), 1);
        assert_eq!(muxer.output_channels().len(), 2);
        assert_eq!(muxer.default_sample_rate(), 2500.0);

        // The next refresh with the same list is a topology change.
        muxer.update_settings(other.channels()).unwrap();
        let labels: Vec<_> = muxer.list_groups().iter().map(ToString::to_string).collect();
        assert_eq!(labels, vec!["3ch@1000.00Hz"]);
        assert_eq!(muxer.selected_group(), Some(0));
        assert_eq!(muxer.selected_stream(), 0);
        assert_eq!(muxer.output_channels().len(), 3);
    }

    #[test]
    fn test_group_pick_flag_cleared_after_refresh() {
        let mut muxer = muxer();
        muxer.select_group(1).unwrap();
        muxer.update_settings(host().channels()).unwrap();

        // A plain topology refresh now runs discovery again.
        let single = MockHost::new().with_stream(StreamId::new(7, 0), 3, 1000.0);
        muxer.update_settings(single.channels()).unwrap();
        assert_eq!(muxer.list_groups().len(), 1);
        assert_eq!(muxer.selected_group(), Some(0));
    }

    #[test]
    fn test_select_group_validates_index() {
        let mut muxer = muxer();
        let err = muxer.select_group(2).unwrap_err();
        assert!(matches!(
            err,
            StreamMuxError::GroupOutOfRange {
                index: 2,
                available: 2
            }
        ));
    }

    #[test]
    fn test_empty_topology_invalidates_selection() {
        let mut muxer = muxer();
        muxer.update_settings(Vec::new()).unwrap();

        assert_eq!(muxer.selected_group(), None);
        assert!(muxer.output_channels().is_empty());
        assert_eq!(muxer.default_sample_rate(), 1.0);

        let mut block = host().block(16);
        let mut markers = Vec::new();
        muxer.on_enable();
        let output = muxer.process(&mut block, &host(), &mut markers);
        assert!(output.is_empty());
        assert!(markers.is_empty());
    }

    #[test]
    fn test_restored_selection_seeds_remap() {
        let mut muxer = StreamMuxer::new(MuxConfig::default());
        muxer.restore_selection(SavedSelection::new(GroupSignature::new(2, 2500.0), 1));
        muxer.update_settings(host().channels()).unwrap();

        assert_eq!(muxer.selected_group(), Some(1));
        assert_eq!(muxer.selected_stream(), 1);
        assert_eq!(
            muxer.saved_selection(),
            Some(SavedSelection::new(GroupSignature::new(2, 2500.0), 1))
        );
    }

    #[test]
    fn test_topology_event_emitted() {
        use std::sync::Mutex;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut muxer = StreamMuxer::new(MuxConfig::default()).with_event_callback(
            crate::event_callback(move |event| sink.lock().unwrap().push(event)),
        );
        muxer.update_settings(host().channels()).unwrap();

        assert_eq!(
            seen.lock().unwrap().as_slice(),
            &[MuxEvent::TopologyChanged {
                groups: 2,
                selected_group: Some(0),
                selected_stream: 0
            }]
        );
    }

    #[test]
    fn test_marker_queue_uses_configured_capacity() {
        let muxer = StreamMuxer::new(MuxConfig {
            marker_queue_capacity: 1,
            ..Default::default()
        });
        let (mut producer, _consumer) = muxer.marker_queue();
        let marker = crate::StreamMarker {
            timestamp: 0,
            offset: 0,
            stream: 0,
        };
        assert!(producer.push_marker(marker).is_ok());
        assert!(producer.push_marker(marker).is_err());
    }
}
