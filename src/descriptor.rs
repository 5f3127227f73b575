//! Output channel descriptors regenerated on every topology refresh.

use serde::Serialize;

use crate::config::MuxConfig;
use crate::group::StreamGroup;
use crate::source::{InputChannel, StreamId};

/// Provenance shared by every output channel of the active group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provenance {
    /// Identifier under which `sources` is published.
    pub sources_identifier: String,
    /// Candidate streams, in stream-index order.
    pub sources: Vec<StreamId>,
    /// Identifier under which `stream_count` is published.
    pub count_identifier: String,
    /// Number of candidate streams.
    pub stream_count: usize,
}

/// One output channel of the multiplexer.
///
/// Metadata is taken from the channel at the same position in the group's
/// first stream; every stream of a group is interchangeable, so any of them
/// would do.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputChannel {
    /// Position within the output rows.
    pub index: usize,
    /// Display name.
    pub name: String,
    /// Physical units label.
    pub units: String,
    /// Scale factor from raw sample units to physical units.
    pub scale: f32,
    /// Sample rate of the active group.
    pub sample_rate: f32,
    /// Streams this channel may carry.
    pub provenance: Provenance,
}

/// Descriptor of the discrete event channel carrying stream markers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerChannel {
    /// Display name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Machine-readable identifier.
    pub identifier: String,
    /// Sample rate the marker timestamps are expressed in.
    pub sample_rate: f32,
}

impl MarkerChannel {
    pub(crate) fn new(config: &MuxConfig, sample_rate: f32) -> Self {
        Self {
            name: config.marker_name.clone(),
            description: config.marker_description.clone(),
            identifier: config.marker_identifier.clone(),
            sample_rate,
        }
    }
}

/// Builds the output descriptors for `group` from its per-stream channel
/// sets.
pub(crate) fn output_channels(
    group: &StreamGroup,
    channel_sets: &[Vec<InputChannel>],
    config: &MuxConfig,
) -> Vec<OutputChannel> {
    let Some(template) = channel_sets.first() else {
        return Vec::new();
    };

    let provenance = Provenance {
        sources_identifier: config.sources_identifier.clone(),
        sources: channel_sets
            .iter()
            .filter_map(|set| set.first())
            .map(|channel| channel.stream_id)
            .collect(),
        count_identifier: config.count_identifier.clone(),
        stream_count: channel_sets.len(),
    };

    template
        .iter()
        .enumerate()
        .map(|(index, channel)| OutputChannel {
            index,
            name: channel.name.clone(),
            units: channel.units.clone(),
            scale: channel.scale,
            sample_rate: group.sample_rate(),
            provenance: provenance.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::GroupSignature;

    fn stream(node: u16, scale: f32) -> Vec<InputChannel> {
        (0..2)
            .map(|ch| {
                InputChannel::new(StreamId::new(node, 0), 30000.0)
                    .with_scale(scale)
                    .with_units("uV")
                    .with_name(format!("CH{}", ch + 1))
            })
            .collect()
    }

    #[test]
    fn test_descriptors_follow_first_stream() {
        let group = StreamGroup::new(GroupSignature::new(2, 30000.0), vec![0, 2]);
        let sets = vec![stream(100, 0.195), stream(101, 0.5)];

        let channels = output_channels(&group, &sets, &MuxConfig::default());

        assert_eq!(channels.len(), 2);
        assert_eq!(channels[1].index, 1);
        assert_eq!(channels[1].name, "CH2");
        assert_eq!(channels[0].scale, 0.195);
        assert_eq!(channels[0].sample_rate, 30000.0);
        assert_eq!(
            channels[0].provenance.sources,
            vec![StreamId::new(100, 0), StreamId::new(101, 0)]
        );
        assert_eq!(channels[0].provenance.stream_count, 2);
        assert_eq!(
            channels[0].provenance.sources_identifier,
            "source.identifier.full.array"
        );
    }

    #[test]
    fn test_no_streams_no_descriptors() {
        let group = StreamGroup::new(GroupSignature::new(2, 30000.0), vec![]);
        assert!(output_channels(&group, &[], &MuxConfig::default()).is_empty());
    }

    #[test]
    fn test_marker_channel_uses_config() {
        let config = MuxConfig {
            marker_name: "Active Probe".to_string(),
            ..Default::default()
        };
        let marker = MarkerChannel::new(&config, 2500.0);
        assert_eq!(marker.name, "Active Probe");
        assert_eq!(marker.identifier, "stream.mux.index.selected");
        assert_eq!(marker.sample_rate, 2500.0);
    }

    #[test]
    fn test_descriptors_serialize() {
        let group = StreamGroup::new(GroupSignature::new(2, 30000.0), vec![0]);
        let channels = output_channels(&group, &[stream(7, 1.0)], &MuxConfig::default());
        let json = serde_json::to_string(&channels[0]).unwrap();
        assert!(json.contains("\"sources\":[{\"node_id\":7,\"sub_index\":0}]"));
    }
}
