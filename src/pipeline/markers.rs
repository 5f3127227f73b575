//! Stream-switch markers and the sinks that receive them.

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

/// A discrete event marking the sample at which the active stream changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamMarker {
    /// Timestamp recorded for the event, in the sample clock of the output.
    pub timestamp: u64,
    /// Sample offset within the processed block.
    pub offset: usize,
    /// Stream index active from this marker on.
    pub stream: usize,
}

/// Destination for markers produced on the real-time path.
///
/// Implementations must not block. A sink that cannot take a marker hands it
/// back; the multiplexer counts it as dropped and carries on.
pub trait MarkerSink {
    /// Offers a marker to the sink.
    fn push_marker(&mut self, marker: StreamMarker) -> Result<(), StreamMarker>;
}

impl MarkerSink for Vec<StreamMarker> {
    fn push_marker(&mut self, marker: StreamMarker) -> Result<(), StreamMarker> {
        self.push(marker);
        Ok(())
    }
}

/// Real-time side of a marker queue.
pub struct MarkerProducer {
    producer: HeapProd<StreamMarker>,
}

impl MarkerSink for MarkerProducer {
    fn push_marker(&mut self, marker: StreamMarker) -> Result<(), StreamMarker> {
        self.producer.try_push(marker)
    }
}

/// Consumer side of a marker queue, drained by whoever forwards markers
/// downstream.
pub struct MarkerConsumer {
    consumer: HeapCons<StreamMarker>,
}

impl MarkerConsumer {
    /// Pops the oldest marker, if any.
    pub fn try_pop(&mut self) -> Option<StreamMarker> {
        self.consumer.try_pop()
    }

    /// Pops every queued marker in order.
    pub fn drain(&mut self) -> Vec<StreamMarker> {
        self.consumer.pop_iter().collect()
    }

    /// Returns the number of queued markers.
    pub fn len(&self) -> usize {
        self.consumer.occupied_len()
    }

    /// Returns `true` if no marker is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Creates a lock-free single-producer single-consumer marker queue.
///
/// The producer goes to the real-time path; pushing never allocates or
/// blocks, and a full queue rejects the marker.
///
/// # Example
///
/// ```
/// use stream_mux::{marker_queue, MarkerSink, StreamMarker};
///
/// let (mut producer, mut consumer) = marker_queue(4);
/// let marker = StreamMarker { timestamp: 1000, offset: 5, stream: 1 };
/// producer.push_marker(marker).unwrap();
/// assert_eq!(consumer.try_pop(), Some(marker));
/// ```
pub fn marker_queue(capacity: usize) -> (MarkerProducer, MarkerConsumer) {
    let ring_buffer = HeapRb::<StreamMarker>::new(capacity.max(1));
    let (producer, consumer) = ring_buffer.split();
    (MarkerProducer { producer }, MarkerConsumer { consumer })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(stream: usize) -> StreamMarker {
        StreamMarker {
            timestamp: 100 * stream as u64,
            offset: 0,
            stream,
        }
    }

    #[test]
    fn test_vec_sink_collects() {
        let mut sink = Vec::new();
        sink.push_marker(marker(1)).unwrap();
        sink.push_marker(marker(2)).unwrap();
        assert_eq!(sink, vec![marker(1), marker(2)]);
    }

    #[test]
    fn test_queue_preserves_order() {
        let (mut producer, mut consumer) = marker_queue(8);
        for stream in 0..3 {
            producer.push_marker(marker(stream)).unwrap();
        }

        assert_eq!(consumer.len(), 3);
        assert_eq!(consumer.drain(), vec![marker(0), marker(1), marker(2)]);
        assert!(consumer.is_empty());
    }

    #[test]
    fn test_full_queue_rejects_marker() {
        let (mut producer, mut consumer) = marker_queue(2);
        producer.push_marker(marker(0)).unwrap();
        producer.push_marker(marker(1)).unwrap();

        assert_eq!(producer.push_marker(marker(2)), Err(marker(2)));

        assert_eq!(consumer.try_pop(), Some(marker(0)));
        producer.push_marker(marker(3)).unwrap();
        assert_eq!(consumer.drain(), vec![marker(1), marker(3)]);
    }

    #[test]
    fn test_zero_capacity_is_raised_to_one() {
        let (mut producer, mut consumer) = marker_queue(0);
        producer.push_marker(marker(4)).unwrap();
        assert_eq!(consumer.try_pop(), Some(marker(4)));
    }
}
