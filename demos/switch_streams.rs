//! Stream switching example.
//!
//! Simulates two probes recording in parallel, one of them running a few
//! samples ahead, and flips between them from a control task while blocks
//! are multiplexed on a dedicated thread.
//!
//! Run with: cargo run --example switch_streams
//!
//! Set `RUST_LOG=debug` to see selection changes and topology refreshes.

use std::time::Duration;

use stream_mux::source::{MockHost, StreamId};
use stream_mux::{event_callback, MuxConfig, MuxEvent, StreamMuxer};
use tracing_subscriber::EnvFilter;

const BLOCK_SIZE: usize = 512;
const BLOCKS: usize = 20;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let probe_a = StreamId::new(100, 0);
    let probe_b = StreamId::new(101, 0);
    let mut host = MockHost::new()
        .with_stream(probe_a, 8, 30000.0)
        .with_stream(StreamId::new(100, 1), 2, 2500.0)
        .with_stream(probe_b, 8, 30000.0);

    let mut muxer = StreamMuxer::new(MuxConfig::default()).with_event_callback(event_callback(
        |event| match event {
            MuxEvent::StreamSwitched {
                from,
                to,
                offset,
                timestamp,
            } => println!("  switched {from} -> {to} at offset {offset} (t={timestamp})"),
            other => println!("  event: {other:?}"),
        },
    ));

    muxer.update_settings(host.channels())?;

    println!("Discovered groups:");
    for (index, group) in muxer.list_groups().iter().enumerate() {
        println!("  [{index}] {group} x{}", group.stream_count);
    }
    println!();

    let handle = muxer.selection_handle();
    let realtime = tokio::task::spawn_blocking(move || {
        let (mut producer, mut consumer) = muxer.marker_queue();
        muxer.on_enable();

        for block in 0..BLOCKS {
            // Probe B runs 7 samples ahead of probe A.
            let start = (block * BLOCK_SIZE) as u64;
            host.set_timing(probe_a, start, BLOCK_SIZE);
            host.set_timing(probe_b, start + 7, BLOCK_SIZE);

            let mut buffer = host.block(BLOCK_SIZE + 16);
            let output = muxer.process(&mut buffer, &host, &mut producer);
            println!(
                "block {block:2}: t={} samples={}",
                output.timestamp, output.num_samples
            );
            for marker in consumer.drain() {
                println!(
                    "  marker: stream {} at offset {} (t={})",
                    marker.stream, marker.offset, marker.timestamp
                );
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        muxer.stats()
    });

    for stream in [1, 0, 1] {
        tokio::time::sleep(Duration::from_millis(25)).await;
        handle.select_stream(stream)?;
    }

    let stats = realtime.await?;
    println!();
    println!("{stats:#?}");

    Ok(())
}
