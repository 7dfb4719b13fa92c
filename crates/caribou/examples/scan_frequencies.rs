//! Frequency scan with RSSI readings.
//!
//! Demonstrates stepping the wideband receiver across a frequency range and
//! reading the RSSI sensor at each step, after printing the capabilities
//! the board reports for every channel.
//!
//! # Usage
//!
//! ```sh
//! cargo run -p caribou --example scan_frequencies
//! ```

use std::time::Duration;

use caribou::lite::CaribouBuilder;
use caribou::{Channel, Direction, Radio, SensorKey, format_bandwidth_khz};
use caribou_test_harness::MockTransport;

/// Scan parameters.
const START_FREQ: u64 = 2_400_000_000; // 2.400 GHz
const END_FREQ: u64 = 2_480_000_000; // 2.480 GHz
const STEP_HZ: u64 = 5_000_000; // 5 MHz steps
const SETTLE_MS: u64 = 20;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let radio = CaribouBuilder::new()
        .build_with_transport(Box::new(MockTransport::new()))
        .await?;

    for (key, value) in radio.hardware_info().to_map() {
        println!("{key:<18} {value}");
    }
    println!();

    for p in caribou::channel_profiles() {
        let ranges: Vec<String> = p.frequency_ranges.iter().map(|r| r.to_string()).collect();
        let widest = p.bandwidths().fallback().hz;
        println!(
            "{} {} [{}]: {} | gain {}..{} dB step {} | widest filter {}",
            p.channel,
            p.direction,
            p.antenna,
            ranges.join(", "),
            p.gain.min_db,
            p.gain.max_db,
            p.gain.step_db,
            format_bandwidth_khz(widest)
        );
    }
    println!();

    let channel = Channel::Wideband6G;
    let original_freq = radio.get_frequency(channel, Direction::Rx).await?;

    println!("{:<14} {:>10}", "Frequency", "RSSI");
    println!("{:-<14} {:-<10}", "", "");

    let mut freq = START_FREQ;
    while freq <= END_FREQ {
        radio.set_frequency(channel, Direction::Rx, freq).await?;

        // Let the AGC settle before reading the level.
        tokio::time::sleep(Duration::from_millis(SETTLE_MS)).await;

        let rssi = radio
            .read_sensor(channel, Direction::Rx, SensorKey::Rssi)
            .await?
            .as_f32()
            .unwrap_or(f32::NAN);

        let bar_len = ((rssi + 127.0) / 2.0).max(0.0) as usize;
        println!(
            "{:>10.3} MHz {:>+7.1} dBm  {}",
            freq as f64 / 1_000_000.0,
            rssi,
            "#".repeat(bar_len.min(40))
        );

        freq += STEP_HZ;
    }

    radio.set_frequency(channel, Direction::Rx, original_freq).await?;
    radio.detach().await?;
    Ok(())
}
