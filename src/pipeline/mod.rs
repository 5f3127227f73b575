//! Multiplexing pipeline components.
//!
//! Work is split across two contexts:
//!
//! ```text
//! control:   channel list → Discovery → groups + remapped selection → MuxLayout
//! real-time: block → BlockMultiplexer → output rows + markers → MarkerSink
//! ```
//!
//! - **Discovery**: Partitions the flat channel list into groups of streams
//! - **Multiplexer**: Copies or splices the selected stream into the output rows
//! - **Markers**: Lock-free queue carrying switch markers off the real-time path
//!
//! The two contexts share only the atomic stream selection.

mod discovery;
mod markers;
mod multiplexer;

pub use discovery::{discover, discover_groups, partition_streams, remap, Discovery, Remap};
pub use markers::{marker_queue, MarkerConsumer, MarkerProducer, MarkerSink, StreamMarker};
pub(crate) use multiplexer::{BlockMultiplexer, MuxLayout};
pub use multiplexer::BlockOutput;
