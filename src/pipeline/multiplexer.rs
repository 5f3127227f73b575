//! Real-time block multiplexer.
//!
//! Each block already holds every candidate stream of the active group, one
//! channel row per stream channel. The multiplexer copies the selected
//! stream into the leading output rows. When the selection changed since the
//! previous block it splices the two streams using their source timestamps,
//! so the output timeline has neither gaps nor repeated samples:
//!
//! ```text
//!  previous stream   |..... T ....|
//!  new stream                |--lead--|...... count ......|
//!  output block      |prev prefix|......... new .........|
//!                    0          lead
//! ```
//!
//! The block path never allocates or blocks. Discontinuities and blocks too
//! small to splice fall back to fixed rules and are reported through events
//! and counters.

use std::sync::Arc;

use crate::buffer::{copy_stream_rows, ChannelBuffer};
use crate::event::{EventCallback, MuxEvent, TrimCause};
use crate::group::StreamGroup;
use crate::pipeline::{MarkerSink, StreamMarker};
use crate::source::{StreamClock, StreamId};
use crate::stats::MuxCounters;

/// Timing of the block the host must report downstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockOutput {
    /// Timestamp of the first output sample.
    pub timestamp: u64,
    /// Number of valid samples in every output channel.
    pub num_samples: usize,
}

impl BlockOutput {
    /// Returns `true` if the block carries no samples.
    pub fn is_empty(&self) -> bool {
        self.num_samples == 0
    }
}

/// Where one stream of the active group lives in the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StreamSlot {
    pub id: StreamId,
    pub channel_offset: usize,
}

/// Channel layout of the active group, rebuilt on topology refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct MuxLayout {
    num_channels: usize,
    slots: Vec<StreamSlot>,
}

impl MuxLayout {
    pub(crate) fn from_slots(num_channels: usize, slots: Vec<StreamSlot>) -> Self {
        Self {
            num_channels,
            slots,
        }
    }

    /// Pairs every start offset of `group` with the id of the stream found
    /// there.
    pub(crate) fn for_group(group: &StreamGroup, stream_ids: impl IntoIterator<Item = StreamId>) -> Self {
        let slots = group
            .start_offsets()
            .iter()
            .zip(stream_ids)
            .map(|(&channel_offset, id)| StreamSlot { id, channel_offset })
            .collect();
        Self::from_slots(group.num_channels(), slots)
    }

    fn slot(&self, stream: usize) -> Option<StreamSlot> {
        self.slots.get(stream).copied()
    }
}

/// Real-time state carried from one block to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Continuity {
    /// Stream copied by the previous block.
    previous_stream: usize,
    /// Timestamp at which the previous output would seamlessly continue.
    reference: Option<u64>,
    /// Set on enable; the next block announces the active stream.
    first_block: bool,
}

/// The per-block multiplexing algorithm.
pub(crate) struct BlockMultiplexer {
    layout: Option<MuxLayout>,
    continuity: Continuity,
    counters: Arc<MuxCounters>,
    event_callback: Option<EventCallback>,
}

impl BlockMultiplexer {
    pub(crate) fn new(counters: Arc<MuxCounters>) -> Self {
        Self {
            layout: None,
            continuity: Continuity {
                previous_stream: 0,
                reference: None,
                first_block: false,
            },
            counters,
            event_callback: None,
        }
    }

    pub(crate) fn set_event_callback(&mut self, callback: Option<EventCallback>) {
        self.event_callback = callback;
    }

    /// Installs the layout of a newly active group; `None` makes every block
    /// an empty pass-through.
    ///
    /// Stream indices may now name different streams, so the continuity
    /// reference is dropped.
    pub(crate) fn set_layout(&mut self, layout: Option<MuxLayout>) {
        self.layout = layout;
        self.continuity.reference = None;
    }

    /// Resets the real-time state for a new acquisition run.
    pub(crate) fn reset(&mut self, selected_stream: usize) {
        self.continuity = Continuity {
            previous_stream: selected_stream,
            reference: None,
            first_block: true,
        };
    }

    /// Multiplexes one block in place.
    ///
    /// `selected` is the stream index read once at block entry. The selected
    /// stream ends up in rows `0..num_channels` of `buffer`, and switch
    /// markers go to `markers`.
    pub(crate) fn process<B, C, M>(
        &mut self,
        selected: usize,
        buffer: &mut B,
        clock: &C,
        markers: &mut M,
    ) -> BlockOutput
    where
        B: ChannelBuffer + ?Sized,
        C: StreamClock + ?Sized,
        M: MarkerSink + ?Sized,
    {
        let Some(layout) = self.layout.as_ref() else {
            return BlockOutput::default();
        };
        let Some(current) = layout.slot(selected) else {
            return BlockOutput::default();
        };
        let num_channels = layout.num_channels;
        let prior = layout.slot(self.continuity.previous_stream);

        MuxCounters::bump(&self.counters.blocks_processed, 1);

        let count = block_count(clock, current.id, buffer.num_samples());
        let start = clock.start_timestamp(current.id);

        let output = if selected == self.continuity.previous_stream {
            copy_stream_rows(buffer, current.channel_offset, num_channels, 0, 0, count);
            BlockOutput {
                timestamp: start,
                num_samples: count,
            }
        } else {
            let (output, marker) = self.switch(
                num_channels,
                current,
                prior,
                selected,
                buffer,
                clock,
            );
            self.emit_marker(markers, marker);
            output
        };

        if self.continuity.first_block {
            self.emit_marker(
                markers,
                StreamMarker {
                    timestamp: start,
                    offset: 0,
                    stream: selected,
                },
            );
            self.continuity.first_block = false;
        }

        self.continuity.reference = Some(start.saturating_add(count as u64));
        self.continuity.previous_stream = selected;
        output
    }

    /// Copies a block in which the selection changed and returns the marker
    /// announcing the new stream.
    fn switch<B, C>(
        &self,
        num_channels: usize,
        current: StreamSlot,
        prior: Option<StreamSlot>,
        selected: usize,
        buffer: &mut B,
        clock: &C,
    ) -> (BlockOutput, StreamMarker)
    where
        B: ChannelBuffer + ?Sized,
        C: StreamClock + ?Sized,
    {
        MuxCounters::bump(&self.counters.stream_switches, 1);

        let count = block_count(clock, current.id, buffer.num_samples());
        let start = clock.start_timestamp(current.id);
        let expected = self.continuity.reference;

        let spliceable = prior.and_then(|prior| {
            let actual = clock.start_timestamp(prior.id);
            if expected == Some(actual) {
                Some((prior, actual))
            } else {
                MuxCounters::bump(&self.counters.discontinuities, 1);
                self.emit_event(MuxEvent::Discontinuity {
                    stream: prior.id,
                    expected,
                    actual,
                });
                None
            }
        });

        let (output, marker) = match spliceable {
            None => {
                copy_stream_rows(buffer, current.channel_offset, num_channels, 0, 0, count);
                (
                    BlockOutput {
                        timestamp: start,
                        num_samples: count,
                    },
                    StreamMarker {
                        timestamp: start,
                        offset: 0,
                        stream: selected,
                    },
                )
            }
            Some((prior, reference)) => {
                let capacity = buffer.num_samples();
                let lead = start
                    .checked_sub(reference)
                    .filter(|&lead| lead > 0)
                    .map(|lead| usize::try_from(lead).unwrap_or(usize::MAX));

                match lead {
                    Some(lead) if lead.saturating_add(count) <= capacity => {
                        // New samples first: the prefix source rows may be
                        // output rows, but only their leading `lead` samples
                        // are read and those are never overwritten here.
                        copy_stream_rows(buffer, current.channel_offset, num_channels, lead, 0, count);
                        copy_stream_rows(buffer, prior.channel_offset, num_channels, 0, 0, lead);
                        MuxCounters::bump(&self.counters.splices, 1);
                        (
                            BlockOutput {
                                timestamp: reference,
                                num_samples: lead + count,
                            },
                            StreamMarker {
                                timestamp: reference,
                                offset: lead,
                                stream: selected,
                            },
                        )
                    }
                    Some(lead) => {
                        self.report_loss(current.id, lead, TrimCause::NoRoom);
                        self.trimmed_copy(buffer, current, num_channels, start, count, 0, selected)
                    }
                    None => {
                        let trim = usize::try_from(reference - start)
                            .unwrap_or(usize::MAX)
                            .min(count);
                        if trim > 0 {
                            self.report_loss(current.id, trim, TrimCause::EarlyStart);
                        }
                        self.trimmed_copy(buffer, current, num_channels, start, count, trim, selected)
                    }
                }
            }
        };

        self.emit_event(MuxEvent::StreamSwitched {
            from: self.continuity.previous_stream,
            to: selected,
            offset: marker.offset,
            timestamp: marker.timestamp,
        });

        (output, marker)
    }

    /// Copies the new stream without its first `trim` samples.
    #[allow(clippy::too_many_arguments)]
    fn trimmed_copy<B: ChannelBuffer + ?Sized>(
        &self,
        buffer: &mut B,
        current: StreamSlot,
        num_channels: usize,
        start: u64,
        count: usize,
        trim: usize,
        selected: usize,
    ) -> (BlockOutput, StreamMarker) {
        let kept = count - trim;
        copy_stream_rows(buffer, current.channel_offset, num_channels, 0, trim, kept);
        let timestamp = start.saturating_add(trim as u64);
        (
            BlockOutput {
                timestamp,
                num_samples: kept,
            },
            StreamMarker {
                timestamp,
                offset: 0,
                stream: selected,
            },
        )
    }

    fn report_loss(&self, stream: StreamId, lost: usize, cause: TrimCause) {
        MuxCounters::bump(&self.counters.trimmed_samples, lost as u64);
        self.emit_event(MuxEvent::SpliceTrimmed {
            stream,
            trimmed: lost,
            cause,
        });
    }

    fn emit_marker<M: MarkerSink + ?Sized>(&self, markers: &mut M, marker: StreamMarker) {
        match markers.push_marker(marker) {
            Ok(()) => MuxCounters::bump(&self.counters.markers_emitted, 1),
            Err(rejected) => {
                MuxCounters::bump(&self.counters.markers_dropped, 1);
                self.emit_event(MuxEvent::MarkerDropped {
                    stream: rejected.stream,
                });
            }
        }
    }

    fn emit_event(&self, event: MuxEvent) {
        if let Some(ref callback) = self.event_callback {
            callback(event);
        }
    }
}

/// Samples the stream delivered this block, bounded by the block capacity.
fn block_count<C: StreamClock + ?Sized>(clock: &C, stream: StreamId, capacity: usize) -> usize {
    clock.sample_count(stream).min(capacity)
}
