//! Stream identification type.

use serde::{Deserialize, Serialize};

/// Identity of an upstream stream: the node that produced it plus the
/// sub-stream index within that node.
///
/// `StreamId` is `Copy` so it can travel through the real-time path and
/// inside [`MuxEvent`](crate::MuxEvent) values without allocation.
///
/// # Example
///
/// ```
/// use stream_mux::StreamId;
///
/// let probe_a = StreamId::new(104, 0);
/// let probe_b = StreamId::new(104, 1);
///
/// assert_ne!(probe_a, probe_b);
/// assert_eq!(probe_a.to_string(), "104/0");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamId {
    node_id: u16,
    sub_index: u16,
}

impl StreamId {
    /// Creates a stream id from a node id and sub-stream index.
    pub const fn new(node_id: u16, sub_index: u16) -> Self {
        Self { node_id, sub_index }
    }

    /// Returns the id of the node that produced the stream.
    pub const fn node_id(&self) -> u16 {
        self.node_id
    }

    /// Returns the sub-stream index within the producing node.
    pub const fn sub_index(&self) -> u16 {
        self.sub_index
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.node_id, self.sub_index)
    }
}

impl From<(u16, u16)> for StreamId {
    fn from((node_id, sub_index): (u16, u16)) -> Self {
        Self::new(node_id, sub_index)
    }
}
