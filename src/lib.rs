//! # stream-mux
//!
//! **Note:** This crate is under active development. The API may change before 1.0.
//!
//! Real-time selection of one stream out of a group of interchangeable
//! streams, with sample-accurate splicing at every switch.
//!
//! An acquisition pipeline often carries several streams with the same shape
//! (same channel count and sample rate), for example one per probe. `stream-mux`
//! groups them, lets a control surface pick one, and copies the picked stream
//! into the leading output channels of every block. When the pick changes,
//! the two streams are spliced on their source timestamps and a marker
//! records the exact sample where content changed.
//!
//! ## Quick Start
//!
//! ```rust
//! use stream_mux::source::{MockHost, StreamId};
//! use stream_mux::{event_callback, MuxConfig, StreamMuxer};
//!
//! let mut host = MockHost::new()
//!     .with_stream(StreamId::new(100, 0), 4, 30000.0)
//!     .with_stream(StreamId::new(101, 0), 4, 30000.0);
//!
//! let mut muxer = StreamMuxer::new(MuxConfig::default())
//!     .with_event_callback(event_callback(|e| tracing::debug!(?e, "mux event")));
//!
//! // Control context: topology refresh, then pick a stream.
//! muxer.update_settings(host.channels())?;
//! let handle = muxer.selection_handle();
//!
//! // Real-time context: one call per block.
//! let (mut markers, mut consumer) = muxer.marker_queue();
//! muxer.on_enable();
//! for block in 0..4 {
//!     if block == 2 {
//!         handle.select_stream(1)?;
//!     }
//!     host.advance(256);
//!     let mut buffer = host.block(512);
//!     let output = muxer.process(&mut buffer, &host, &mut markers);
//!     assert_eq!(output.num_samples, 256);
//! }
//!
//! // One marker for the first block, one for the switch.
//! assert_eq!(consumer.drain().len(), 2);
//! # Ok::<(), stream_mux::StreamMuxError>(())
//! ```
//!
//! ## Architecture
//!
//! The crate keeps a strict boundary between two contexts:
//!
//! - **Control**: topology refresh, group discovery and selection edits. May
//!   allocate and log.
//! - **Real-time**: [`StreamMuxer::process()`] on every block. Never blocks or
//!   allocates, and never fails.
//!
//! The selected stream index is the only value shared between them, held in
//! an atomic so neither side waits on the other.

// unsafe_code lint is configured in Cargo.toml as "deny"
#![warn(missing_docs)]
// Sample counts, timestamps and rates cross integer and float types on purpose
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_lossless
)]
// Exact sample rate comparisons are the group equality rule
#![allow(clippy::float_cmp)]
// unwrap/expect allowed in tests only
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]
// These doc lints are too strict for internal implementation details
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

mod buffer;
mod config;
mod descriptor;
mod error;
mod event;
mod group;
mod muxer;
pub mod pipeline;
mod selection;
pub mod source;
mod stats;

pub use buffer::{ChannelBuffer, SampleBuffer};
pub use config::MuxConfig;
pub use descriptor::{MarkerChannel, OutputChannel, Provenance};
pub use error::StreamMuxError;
pub use event::{event_callback, EventCallback, MuxEvent, TrimCause};
pub use group::{GroupSignature, GroupSummary, StreamGroup};
pub use muxer::StreamMuxer;
pub use pipeline::{
    marker_queue, BlockOutput, MarkerConsumer, MarkerProducer, MarkerSink, StreamMarker,
};
pub use selection::{SavedSelection, SelectionHandle};
pub use source::{InputChannel, StreamClock, StreamId};
pub use stats::MuxStats;
