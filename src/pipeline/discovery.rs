//! Group discovery: partitioning the flat input channel list into groups of
//! interchangeable streams.
//!
//! Discovery runs on the control context whenever the input topology
//! changes. It scans the channel list once, cutting it into streams wherever
//! the stream id changes, and files every stream under the group with its
//! signature (channel count and sample rate). Groups are ordered by first
//! appearance; each holds every matching stream wherever it sits in the list.

use crate::group::{GroupSignature, StreamGroup};
use crate::selection::SavedSelection;
use crate::source::{InputChannel, StreamId};
use crate::StreamMuxError;

/// Group and stream selected after re-resolving a saved selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Remap {
    /// Index into the new group list.
    pub group: usize,
    /// Stream index within that group.
    pub stream: usize,
}

/// Result of one discovery pass.
#[derive(Debug, Clone)]
pub struct Discovery {
    /// Discovered groups, ordered by first appearance.
    pub groups: Vec<StreamGroup>,
    /// Selection after remapping; `None` when no group exists.
    pub selection: Option<Remap>,
}

/// The stream currently being accumulated during the scan.
struct WorkingGroup {
    stream_id: StreamId,
    sample_rate: f32,
    num_channels: usize,
    start_offset: usize,
}

impl WorkingGroup {
    fn open(channel: &InputChannel, start_offset: usize) -> Self {
        Self {
            stream_id: channel.stream_id,
            sample_rate: channel.sample_rate,
            num_channels: 1,
            start_offset,
        }
    }
}

/// Discovers groups and re-resolves the previous selection against them.
///
/// Pure function of its inputs: running it twice on the same channel list
/// and previous selection gives identical results.
pub fn discover(channels: &[InputChannel], previous: Option<&SavedSelection>) -> Discovery {
    let groups = discover_groups(channels);
    let selection = remap(&groups, previous);
    Discovery { groups, selection }
}

/// Scans the channel list once and builds the group list.
///
/// Channels of one stream must be contiguous; a stream split across the
/// list is seen as several streams.
pub fn discover_groups(channels: &[InputChannel]) -> Vec<StreamGroup> {
    let mut groups = Vec::new();
    let mut working: Option<WorkingGroup> = None;

    for (index, channel) in channels.iter().enumerate() {
        if let Some(group) = working
            .as_mut()
            .filter(|group| group.stream_id == channel.stream_id)
        {
            group.num_channels += 1;
            continue;
        }
        if let Some(closed) = working.replace(WorkingGroup::open(channel, index)) {
            insert_group(&mut groups, &closed);
        }
    }
    if let Some(closed) = working {
        insert_group(&mut groups, &closed);
    }

    groups
}

/// Files a closed stream under the group with its signature, creating the
/// group if none matches.
fn insert_group(groups: &mut Vec<StreamGroup>, working: &WorkingGroup) {
    let signature = GroupSignature::new(working.num_channels, working.sample_rate);
    match groups.iter_mut().find(|group| group.signature() == signature) {
        Some(group) => group.push_offset(working.start_offset),
        None => groups.push(StreamGroup::new(signature, vec![working.start_offset])),
    }
}

/// Re-resolves a saved selection against a freshly built group list.
///
/// The group with the saved signature stays selected, keeping the saved
/// stream if it still exists and falling back to stream 0 otherwise. Without
/// a match the first group and stream are selected. Returns `None` only when
/// there are no groups at all.
pub fn remap(groups: &[StreamGroup], previous: Option<&SavedSelection>) -> Option<Remap> {
    if groups.is_empty() {
        return None;
    }

    let resolved = previous.and_then(|saved| {
        let group = groups
            .iter()
            .position(|group| group.signature() == saved.signature)?;
        let stream = if saved.stream < groups[group].stream_count() {
            saved.stream
        } else {
            0
        };
        Some(Remap { group, stream })
    });

    Some(resolved.unwrap_or(Remap {
        group: 0,
        stream: 0,
    }))
}

/// Splits the flat channel list into one owned channel list per stream of
/// `group`, consuming the flat list.
///
/// Channels that belong to other groups are dropped.
///
/// # Errors
///
/// Returns [`StreamMuxError::OverlappingStreams`] if two streams claim the same
/// channel or a stream runs past the end of the list.
pub fn partition_streams(
    channels: Vec<InputChannel>,
    group: &StreamGroup,
) -> Result<Vec<Vec<InputChannel>>, StreamMuxError> {
    let width = group.num_channels();
    let mut slots: Vec<Option<InputChannel>> = channels.into_iter().map(Some).collect();

    group
        .start_offsets()
        .iter()
        .map(|&offset| {
            slots
                .get_mut(offset..offset + width)
                .and_then(|run| run.iter_mut().map(Option::take).collect::<Option<Vec<_>>>())
                .ok_or(StreamMuxError::OverlappingStreams { offset })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a flat channel list from `(node, sub, channels, rate)` streams.
    fn layout(streams: &[(u16, u16, usize, f32)]) -> Vec<InputChannel> {
        streams
            .iter()
            .flat_map(|&(node, sub, count, rate)| {
                (0..count).map(move |_| InputChannel::new(StreamId::new(node, sub), rate))
            })
            .collect()
    }

    fn offsets(groups: &[StreamGroup]) -> Vec<Vec<usize>> {
        groups.iter().map(|g| g.start_offsets().to_vec()).collect()
    }

    #[test]
    fn test_single_stream() {
        let groups = discover_groups(&layout(&[(100, 0, 4, 30000.0)]));
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].num_channels(), 4);
        assert_eq!(groups[0].sample_rate(), 30000.0);
        assert_eq!(groups[0].start_offsets(), &[0]);
    }

    #[test]
    fn test_empty_channel_list() {
        let discovery = discover(&[], None);
        assert!(discovery.groups.is_empty());
        assert_eq!(discovery.selection, None);
    }

    #[test]
    fn test_first_stream_with_zero_id_is_kept() {
        let groups = discover_groups(&layout(&[(0, 0, 2, 1000.0), (0, 1, 2, 1000.0)]));
        assert_eq!(offsets(&groups), vec![vec![0, 2]]);
    }

    #[test]
    fn test_groups_ordered_by_first_appearance() {
        let channels = layout(&[
            (100, 0, 4, 30000.0),
            (101, 0, 2, 1000.0),
            (102, 0, 4, 30000.0),
            (102, 1, 2, 1000.0),
            (103, 0, 4, 2500.0),
        ]);
        let groups = discover_groups(&channels);

        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].signature(), GroupSignature::new(4, 30000.0));
        assert_eq!(groups[1].signature(), GroupSignature::new(2, 1000.0));
        assert_eq!(groups[2].signature(), GroupSignature::new(4, 2500.0));
        assert_eq!(offsets(&groups), vec![vec![0, 6], vec![4, 10], vec![12]]);
    }

    #[test]
    fn test_same_rate_different_width_are_separate_groups() {
        let groups = discover_groups(&layout(&[(1, 0, 4, 30000.0), (2, 0, 8, 30000.0)]));
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_undefined_rate_streams_never_merge() {
        let groups = discover_groups(&layout(&[(1, 0, 2, f32::NAN), (2, 0, 2, f32::NAN)]));
        assert_eq!(offsets(&groups), vec![vec![0], vec![2]]);
    }

    #[test]
    fn test_offsets_are_contiguous_and_disjoint() {
        let channels = layout(&[
            (1, 0, 3, 500.0),
            (2, 0, 5, 500.0),
            (3, 0, 3, 500.0),
            (3, 1, 3, 500.0),
            (4, 0, 5, 500.0),
        ]);
        let groups = discover_groups(&channels);

        let mut claimed = vec![false; channels.len()];
        for group in &groups {
            for &offset in group.start_offsets() {
                let run = &channels[offset..offset + group.num_channels()];
                assert!(run.iter().all(|c| c.stream_id == run[0].stream_id));
                for slot in &mut claimed[offset..offset + group.num_channels()] {
                    assert!(!*slot, "channel claimed twice");
                    *slot = true;
                }
            }
        }
        assert!(claimed.iter().all(|&c| c));
    }

    #[test]
    fn test_discovery_is_idempotent() {
        let channels = layout(&[(1, 0, 4, 30000.0), (2, 0, 4, 30000.0), (3, 0, 1, 10.0)]);
        let saved = SavedSelection::new(GroupSignature::new(4, 30000.0), 1);

        let first = discover(&channels, Some(&saved));
        let second = discover(&channels, Some(&saved));

        assert_eq!(offsets(&first.groups), offsets(&second.groups));
        for (a, b) in first.groups.iter().zip(&second.groups) {
            assert_eq!(a.num_channels(), b.num_channels());
            assert_eq!(a.sample_rate().to_bits(), b.sample_rate().to_bits());
        }
        assert_eq!(first.selection, second.selection);
    }

    #[test]
    fn test_remap_preserves_valid_stream() {
        let channels = layout(&[(1, 0, 4, 30000.0), (2, 0, 4, 30000.0), (3, 0, 4, 30000.0)]);
        let saved = SavedSelection::new(GroupSignature::new(4, 30000.0), 2);

        let discovery = discover(&channels, Some(&saved));
        assert_eq!(discovery.selection, Some(Remap { group: 0, stream: 2 }));
    }

    #[test]
    fn test_remap_clamps_stream_when_group_shrinks() {
        let channels = layout(&[(1, 0, 4, 30000.0)]);
        let saved = SavedSelection::new(GroupSignature::new(4, 30000.0), 2);

        let discovery = discover(&channels, Some(&saved));
        assert_eq!(discovery.selection, Some(Remap { group: 0, stream: 0 }));
    }

    #[test]
    fn test_remap_follows_group_to_new_index() {
        let channels = layout(&[(9, 0, 1, 10.0), (1, 0, 4, 30000.0), (2, 0, 4, 30000.0)]);
        let saved = SavedSelection::new(GroupSignature::new(4, 30000.0), 1);

        let discovery = discover(&channels, Some(&saved));
        assert_eq!(discovery.selection, Some(Remap { group: 1, stream: 1 }));
    }

    #[test]
    fn test_remap_without_match_selects_first() {
        let channels = layout(&[(1, 0, 2, 1000.0), (2, 0, 4, 30000.0)]);
        let saved = SavedSelection::new(GroupSignature::new(8, 30000.0), 3);

        let discovery = discover(&channels, Some(&saved));
        assert_eq!(discovery.selection, Some(Remap { group: 0, stream: 0 }));
    }

    #[test]
    fn test_remap_undefined_previous_selects_first() {
        let channels = layout(&[(1, 0, 2, 1000.0)]);
        let saved = SavedSelection::new(GroupSignature::undefined(), 0);

        assert_eq!(
            remap(&discover_groups(&channels), Some(&saved)),
            Some(Remap { group: 0, stream: 0 })
        );
        assert_eq!(
            remap(&discover_groups(&channels), None),
            Some(Remap { group: 0, stream: 0 })
        );
    }

    #[test]
    fn test_partition_streams_takes_ownership_per_stream() {
        let channels = layout(&[(1, 0, 2, 1000.0), (7, 0, 3, 50.0), (2, 0, 2, 1000.0)]);
        let groups = discover_groups(&channels);

        let streams = partition_streams(channels, &groups[0]).unwrap();
        assert_eq!(streams.len(), 2);
        assert!(streams[0].iter().all(|c| c.stream_id == StreamId::new(1, 0)));
        assert!(streams[1].iter().all(|c| c.stream_id == StreamId::new(2, 0)));
        assert_eq!(streams[1].len(), 2);
    }

    #[test]
    fn test_partition_streams_rejects_overlap() {
        let channels = layout(&[(1, 0, 4, 1000.0)]);
        let group = StreamGroup::new(GroupSignature::new(2, 1000.0), vec![0, 1]);

        let err = partition_streams(channels, &group).unwrap_err();
        assert!(matches!(err, StreamMuxError::OverlappingStreams { offset: 1 }));
    }

    #[test]
    fn test_partition_streams_rejects_short_list() {
        let channels = layout(&[(1, 0, 3, 1000.0)]);
        let group = StreamGroup::new(GroupSignature::new(2, 1000.0), vec![0, 2]);

        let err = partition_streams(channels, &group).unwrap_err();
        assert!(matches!(err, StreamMuxError::OverlappingStreams { offset: 2 }));
    }
}
