//! Monitor controller events.
//!
//! Demonstrates subscribing to the radio event stream from a background task
//! while the main task changes settings and runs a short streaming session.
//!
//! # Usage
//!
//! ```sh
//! cargo run -p caribou --example monitor_events
//! ```

use std::time::Duration;

use caribou::lite::CaribouBuilder;
use caribou::{Channel, Direction, Radio, RadioEvent};
use caribou_test_harness::MockTransport;
use tokio::sync::broadcast::error::RecvError;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let radio = CaribouBuilder::new()
        .build_with_transport(Box::new(MockTransport::new()))
        .await?;

    let mut events = radio.subscribe()?;
    let start = tokio::time::Instant::now();

    let monitor = tokio::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(n)) => {
                    println!("(missed {} events due to lag)", n);
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            let elapsed = start.elapsed();
            let timestamp = format!("{:>4}.{:03}s", elapsed.as_secs(), elapsed.subsec_millis());
            match event {
                RadioEvent::FrequencyChanged {
                    channel,
                    direction,
                    freq_hz,
                } => println!(
                    "{} FrequencyChanged   {} {} -> {:.3} MHz",
                    timestamp,
                    channel,
                    direction,
                    freq_hz as f64 / 1_000_000.0
                ),
                RadioEvent::GainChanged {
                    channel,
                    direction,
                    gain_db,
                } => println!("{} GainChanged        {} {} -> {} dB", timestamp, channel, direction, gain_db),
                RadioEvent::GainModeChanged { channel, automatic } => {
                    let mode = if automatic { "AGC" } else { "manual" };
                    println!("{} GainModeChanged    {} -> {}", timestamp, channel, mode);
                }
                RadioEvent::BandwidthChanged {
                    channel,
                    direction,
                    bandwidth_hz,
                } => println!(
                    "{} BandwidthChanged   {} {} -> {} Hz",
                    timestamp, channel, direction, bandwidth_hz
                ),
                RadioEvent::StreamStateChanged { channel, state } => {
                    println!("{} StreamStateChanged {} -> {}", timestamp, channel, state);
                }
                RadioEvent::StreamTerminated { channel, reason } => {
                    println!("{} StreamTerminated   {}: {}", timestamp, channel, reason);
                }
                RadioEvent::Attached => println!("{} Attached", timestamp),
                RadioEvent::Detached => {
                    println!("{} Detached", timestamp);
                    break;
                }
            }
        }
    });

    radio.set_frequency(Channel::Sub1G, Direction::Rx, 433_920_000).await?;
    radio.set_gain(Channel::Sub1G, Direction::Rx, 21.0).await?;
    radio.set_gain_mode(Channel::Sub1G, true).await?;
    radio.set_bandwidth(Channel::Wideband6G, Direction::Tx, 500_000.0).await?;

    radio
        .start_stream(Channel::Wideband6G, None, Box::new(|_| {}))
        .await?;
    tokio::time::sleep(Duration::from_millis(250)).await;
    radio.stop_stream(Channel::Wideband6G).await?;

    radio.detach().await?;
    monitor.await?;
    Ok(())
}
