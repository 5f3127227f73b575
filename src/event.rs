//! Runtime events for monitoring the multiplexer.
//!
//! Events are non-fatal notifications. Processing continues after every
//! event; they are for logging and diagnostics, not error handling.

use std::sync::Arc;

use crate::source::StreamId;

/// Why samples were lost at a switch that could not be spliced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimCause {
    /// The new stream started before the splice point; its leading samples
    /// were dropped.
    EarlyStart,
    /// The new stream started after the splice point, but the block had no
    /// room for the previous-stream prefix, which was left out.
    NoRoom,
}

/// Runtime events emitted by the multiplexer.
///
/// Every variant is `Copy`, so raising one from the real-time path never
/// allocates. What the callback does with it is up to the host.
///
/// # Example
///
/// ```
/// use stream_mux::MuxEvent;
///
/// fn handle_event(event: MuxEvent) {
///     match event {
///         MuxEvent::StreamSwitched { from, to, offset, .. } => {
///             eprintln!("switched {from} -> {to} at sample {offset}");
///         }
///         MuxEvent::Discontinuity { stream, .. } => {
///             eprintln!("data loss on stream {stream}, splice skipped");
///         }
///         MuxEvent::SpliceTrimmed { trimmed, cause, .. } => {
///             eprintln!("dropped {trimmed} samples ({cause:?})");
///         }
///         MuxEvent::MarkerDropped { stream } => {
///             eprintln!("marker queue full, lost marker for stream {stream}");
///         }
///         MuxEvent::TopologyChanged { groups, .. } => {
///             eprintln!("{groups} groups discovered");
///         }
///     }
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MuxEvent {
    /// The active stream changed within the output timeline.
    StreamSwitched {
        /// Stream index active before the block.
        from: usize,
        /// Stream index active from `offset` on.
        to: usize,
        /// Sample offset within the block where the new stream begins.
        offset: usize,
        /// Timestamp recorded on the switch marker.
        timestamp: u64,
    },

    /// The previously active stream did not continue where the last block
    /// ended, so the switch was not spliced.
    Discontinuity {
        /// The previously active stream.
        stream: StreamId,
        /// Where it was expected to continue (`None` right after enable).
        expected: Option<u64>,
        /// Where it actually continued.
        actual: u64,
    },

    /// A switch lost samples instead of splicing.
    SpliceTrimmed {
        /// The newly selected stream.
        stream: StreamId,
        /// Number of samples lost from the output timeline.
        trimmed: usize,
        /// Which situation forced the trim.
        cause: TrimCause,
    },

    /// The marker sink rejected a marker.
    MarkerDropped {
        /// Stream index the marker announced.
        stream: usize,
    },

    /// A topology refresh rebuilt the group list.
    TopologyChanged {
        /// Number of groups discovered.
        groups: usize,
        /// Selected group after remapping, if any.
        selected_group: Option<usize>,
        /// Selected stream after remapping.
        selected_stream: usize,
    },
}

/// Callback type for receiving runtime events.
///
/// Register one via [`StreamMuxer::with_event_callback()`]. The callback is
/// invoked from the real-time path for block events, so it should hand the
/// event off rather than do work inline.
///
/// [`StreamMuxer::with_event_callback()`]: crate::StreamMuxer::with_event_callback
pub type EventCallback = Arc<dyn Fn(MuxEvent) + Send + Sync>;

/// Creates an [`EventCallback`] from a closure.
///
/// # Example
///
/// ```
/// use stream_mux::{event_callback, MuxEvent};
///
/// let callback = event_callback(|event| {
///     println!("Got event: {:?}", event);
/// });
/// ```
pub fn event_callback<F>(f: F) -> EventCallback
where
    F: Fn(MuxEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mux_event_debug() {
        let event = MuxEvent::SpliceTrimmed {
            stream: StreamId::new(3, 1),
            trimmed: 12,
            cause: TrimCause::NoRoom,
        };
        let debug = format!("{:?}", event);
        assert!(debug.contains("SpliceTrimmed"));
        assert!(debug.contains("NoRoom"));
        assert!(debug.contains("12"));
    }

    #[test]
    fn test_mux_event_is_copy() {
        let event = MuxEvent::MarkerDropped { stream: 2 };
        let copied = event;
        assert_eq!(event, copied);
    }

    #[test]
    fn test_event_callback_helper() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let called = Arc::new(AtomicBool::new(false));
        let called_clone = called.clone();

        let callback = event_callback(move |_| {
            called_clone.store(true, Ordering::SeqCst);
        });

        callback(MuxEvent::MarkerDropped { stream: 0 });
        assert!(called.load(Ordering::SeqCst));
    }
}
