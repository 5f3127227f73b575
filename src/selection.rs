//! Selection state shared between the control and real-time contexts.
//!
//! The selected stream index is the only value both contexts touch. It lives
//! in an atomic cell, published with release ordering and read once per
//! block with acquire ordering, so neither side ever blocks. Everything else
//! here belongs to the control context.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::group::GroupSignature;
use crate::pipeline::Remap;
use crate::StreamMuxError;

/// Atomic cell holding the selected stream and the stream count it was
/// validated against.
///
/// Both live in one word (count in the high half, stream in the low half),
/// so a selection validated against a stale count can never land after a
/// newer publish.
#[derive(Debug, Default)]
pub(crate) struct StreamSelector {
    packed: AtomicU64,
}

fn pack(stream: usize, stream_count: usize) -> u64 {
    let stream = u32::try_from(stream).unwrap_or(u32::MAX);
    let stream_count = u32::try_from(stream_count).unwrap_or(u32::MAX);
    (u64::from(stream_count) << 32) | u64::from(stream)
}

fn unpack(packed: u64) -> (usize, usize) {
    ((packed & 0xFFFF_FFFF) as usize, (packed >> 32) as usize)
}

impl StreamSelector {
    pub fn load(&self) -> usize {
        self.snapshot().0
    }

    pub fn stream_count(&self) -> usize {
        self.snapshot().1
    }

    /// Returns the stream and the count it is valid for, read together.
    pub fn snapshot(&self) -> (usize, usize) {
        unpack(self.packed.load(Ordering::Acquire))
    }

    /// Publishes a new stream count together with a stream valid for it.
    pub fn publish(&self, stream: usize, stream_count: usize) {
        self.packed
            .store(pack(stream, stream_count), Ordering::Release);
    }

    /// Publishes a new stream count, keeping the current stream if it is
    /// still in range and falling back to the first stream otherwise.
    pub fn revalidate(&self, stream_count: usize) {
        let _ = self
            .packed
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |packed| {
                let (stream, _) = unpack(packed);
                let stream = if stream < stream_count { stream } else { 0 };
                Some(pack(stream, stream_count))
            });
    }

    pub fn try_select(&self, index: usize) -> Result<(), StreamMuxError> {
        self.packed
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |packed| {
                let (_, available) = unpack(packed);
                (index < available).then(|| pack(index, available))
            })
            .map(|_| ())
            .map_err(|packed| match unpack(packed).1 {
                0 => StreamMuxError::NoGroups,
                available => StreamMuxError::StreamOutOfRange { index, available },
            })
    }
}

/// Cloneable handle for changing the selected stream from any thread.
///
/// Obtained from [`StreamMuxer::selection_handle()`]. Stream changes take
/// effect at the start of the next processed block.
///
/// [`StreamMuxer::selection_handle()`]: crate::StreamMuxer::selection_handle
#[derive(Debug, Clone)]
pub struct SelectionHandle {
    selector: Arc<StreamSelector>,
}

impl SelectionHandle {
    /// Selects a stream of the active group.
    ///
    /// # Errors
    ///
    /// Returns [`StreamMuxError::StreamOutOfRange`] if the active group has no
    /// such stream, or [`StreamMuxError::NoGroups`] if nothing is active.
    pub fn select_stream(&self, index: usize) -> Result<(), StreamMuxError> {
        self.selector.try_select(index)?;
        tracing::debug!(stream = index, "stream selected");
        Ok(())
    }

    /// Returns the currently selected stream index.
    pub fn selected_stream(&self) -> usize {
        self.selector.load()
    }

    /// Returns the number of streams in the active group.
    pub fn stream_count(&self) -> usize {
        self.selector.stream_count()
    }
}

/// Control-side selection: which group is active and whether the last
/// change came from a user pick.
#[derive(Debug, Default)]
pub(crate) struct SelectionState {
    selected_group: Option<usize>,
    group_changed: bool,
    selector: Arc<StreamSelector>,
}

impl SelectionState {
    pub fn selected_group(&self) -> Option<usize> {
        self.selected_group
    }

    pub fn selected_stream(&self) -> usize {
        self.selector.load()
    }

    pub fn selector(&self) -> &StreamSelector {
        &self.selector
    }

    pub fn handle(&self) -> SelectionHandle {
        SelectionHandle {
            selector: Arc::clone(&self.selector),
        }
    }

    /// Records a user group pick; the next refresh keeps it verbatim.
    pub fn pick_group(&mut self, index: usize) {
        self.selected_group = Some(index);
        self.group_changed = true;
    }

    /// Returns and clears the user-pick flag.
    pub fn take_group_changed(&mut self) -> bool {
        std::mem::take(&mut self.group_changed)
    }

    /// Applies a remap result from discovery. `None` invalidates the selection.
    pub fn apply(&mut self, remap: Option<Remap>, stream_count: usize) {
        match remap {
            Some(remap) => {
                self.selected_group = Some(remap.group);
                self.selector.publish(remap.stream, stream_count);
            }
            None => {
                self.selected_group = None;
                self.selector.publish(0, 0);
            }
        }
    }

    /// Re-validates the stream against a group's stream count, resetting it
    /// to the first stream when out of range.
    pub fn validate_stream(&mut self, stream_count: usize) {
        self.selector.revalidate(stream_count);
    }
}

/// A selection that survives group-list rebuilds.
///
/// Indices into the group list go stale on every topology refresh, so a
/// selection is remembered by the structural signature of its group plus the
/// stream index, and re-resolved against each new list. This is also the
/// only state worth persisting across sessions.
///
/// # Example
///
/// ```
/// use stream_mux::{GroupSignature, SavedSelection};
///
/// let saved = SavedSelection::new(GroupSignature::new(4, 30000.0), 1);
/// let json = saved.to_json()?;
/// assert_eq!(SavedSelection::from_json(&json)?, saved);
/// # Ok::<(), stream_mux::StreamMuxError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SavedSelection {
    /// Signature of the selected group.
    pub signature: GroupSignature,
    /// Index of the selected stream within that group.
    pub stream: usize,
}

impl SavedSelection {
    /// Creates a saved selection.
    pub fn new(signature: GroupSignature, stream: usize) -> Self {
        Self { signature, stream }
    }

    /// Encodes the selection as JSON.
    pub fn to_json(&self) -> Result<String, StreamMuxError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes a selection from JSON.
    pub fn from_json(json: &str) -> Result<Self, StreamMuxError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Writes the selection to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StreamMuxError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?).map_err(|e| StreamMuxError::persist(path, e))
    }

    /// Reads a selection from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StreamMuxError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| StreamMuxError::persist(path, e))?;
        Self::from_json(&json)
    }
}
