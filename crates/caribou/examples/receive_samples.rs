//! Receive I/Q samples from one channel.
//!
//! Demonstrates tuning the sub-1 GHz receiver, starting a streaming session
//! with a fixed block size, and computing the average power of each block
//! on the callback thread. The session runs for two seconds and then stops.
//!
//! The demo runs against the mock board from `caribou-test-harness`, which
//! generates a test tone; swap in a hardware transport to receive real
//! signals.
//!
//! # Usage
//!
//! ```sh
//! cargo run -p caribou --example receive_samples
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use caribou::lite::CaribouBuilder;
use caribou::{Channel, Direction, Radio, StreamEvent};
use caribou_test_harness::MockTransport;

const BLOCK_SIZE: usize = 20_000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let radio = CaribouBuilder::new()
        .build_with_transport(Box::new(MockTransport::new()))
        .await?;

    let channel = Channel::Sub1G;
    radio.set_frequency(channel, Direction::Rx, 915_000_000).await?;
    radio.set_bandwidth(channel, Direction::Rx, 1_000_000.0).await?;
    radio.set_gain(channel, Direction::Rx, 45.0).await?;

    println!(
        "Receiving on {} at {:.3} MHz, {} samples per block\n",
        channel,
        radio.get_frequency(channel, Direction::Rx).await? as f64 / 1_000_000.0,
        BLOCK_SIZE
    );

    let dropped = Arc::new(AtomicU64::new(0));
    let dropped_cb = dropped.clone();

    radio
        .start_stream(
            channel,
            Some(BLOCK_SIZE),
            Box::new(move |event| match event {
                StreamEvent::Samples(block) => {
                    // Print every 50th block to keep the output readable.
                    if block.meta.sequence % 50 != 0 {
                        return;
                    }
                    let power = block.samples.iter().map(|s| s.norm_sqr()).sum::<f32>()
                        / block.len() as f32;
                    println!(
                        "block {:>5}  t={:>9}  {:>+6.1} dBFS",
                        block.meta.sequence,
                        block.meta.timestamp,
                        10.0 * power.log10()
                    );
                }
                StreamEvent::Dropped { count, reason, .. } => {
                    dropped_cb.fetch_add(count, Ordering::Relaxed);
                    println!("dropped {count} blocks ({reason})");
                }
                StreamEvent::Terminated { reason } => {
                    println!("stream terminated: {reason}");
                }
            }),
        )
        .await?;

    tokio::time::sleep(Duration::from_secs(2)).await;

    let stats = radio.stream_stats(channel).await?;
    radio.stop_stream(channel).await?;

    println!(
        "\n{} blocks delivered, {} dropped, {} overflows",
        stats.blocks_delivered,
        dropped.load(Ordering::Relaxed),
        stats.overflows
    );

    radio.detach().await?;
    Ok(())
}
