//! # caribou -- Async Control of the CaribouLite SDR
//!
//! `caribou` is an asynchronous Rust library for the dual-channel
//! CaribouLite front end: a sub-1 GHz channel and a 50 MHz to 6 GHz
//! wideband channel, each with its own receive and transmit path. It covers
//! tuning, gain and AGC, filter bandwidth, sensor readings, and continuous
//! I/Q sample streaming.
//!
//! ## Quick Start
//!
//! ```no_run
//! use caribou::{Channel, Direction, Radio};
//! use caribou::lite::CaribouBuilder;
//!
//! # async fn example(transport: Box<dyn caribou::Transport>) -> caribou::Result<()> {
//! let radio = CaribouBuilder::new()
//!     .build_with_transport(transport)
//!     .await?;
//!
//! radio.set_frequency(Channel::Sub1G, Direction::Rx, 915_000_000).await?;
//! radio.set_gain(Channel::Sub1G, Direction::Rx, 30.0).await?;
//! let freq = radio.get_frequency(Channel::Sub1G, Direction::Rx).await?;
//! println!("S1G RX: {} Hz", freq);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! | Crate                  | Purpose                                          |
//! |------------------------|--------------------------------------------------|
//! | `caribou-core`         | Traits ([`Radio`], [`Transport`]), types, codec, profiles, errors |
//! | `caribou-lite`         | Register protocol, channel controller, streaming sessions |
//! | `caribou-test-harness` | Mock board transport for tests and demos         |
//! | **`caribou`**          | This facade crate -- re-exports everything       |
//!
//! Hardware transports (SPI and the FPGA sample interface) live outside this
//! workspace and plug in through the [`Transport`] trait.
//!
//! ## Streaming
//!
//! Each channel runs at most one streaming session. Blocks arrive on a
//! callback as [`StreamEvent`]s with sequence numbers and drop accounting:
//!
//! ```no_run
//! use caribou::{Channel, Radio, StreamEvent};
//! # async fn example(radio: &dyn Radio) -> caribou::Result<()> {
//! radio
//!     .start_stream(
//!         Channel::Wideband6G,
//!         Some(20_000),
//!         Box::new(|event| match event {
//!             StreamEvent::Samples(block) => println!("block {}", block.meta.sequence),
//!             StreamEvent::Dropped { count, .. } => println!("dropped {count}"),
//!             StreamEvent::Terminated { reason } => println!("ended: {reason}"),
//!         }),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Event Subscription
//!
//! The controller emits [`RadioEvent`]s through a broadcast channel for
//! every committed setting change and streaming state transition:
//!
//! ```no_run
//! use caribou::{Radio, RadioEvent};
//! # async fn example(radio: &dyn Radio) -> caribou::Result<()> {
//! let mut events = radio.subscribe()?;
//! while let Ok(event) = events.recv().await {
//!     if let RadioEvent::FrequencyChanged { channel, direction, freq_hz } = event {
//!         println!("{channel} {direction}: {freq_hz} Hz");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub use caribou_core::*;

/// CaribouLite backend.
///
/// Provides [`CaribouRadio`](lite::CaribouRadio) and
/// [`CaribouBuilder`](lite::CaribouBuilder), plus the register map and
/// command builders they are built on.
pub mod lite {
    pub use caribou_lite::*;
}

/// Returns the capability records of every (channel, direction) path on the
/// board.
///
/// # Example
///
/// ```
/// for p in caribou::channel_profiles() {
///     println!("{} {} on {}: {} ranges", p.channel, p.direction, p.antenna, p.frequency_ranges.len());
/// }
/// assert_eq!(caribou::channel_profiles().len(), 4);
/// ```
pub fn channel_profiles() -> Vec<&'static ChannelProfile> {
    Channel::ALL
        .iter()
        .flat_map(|&channel| {
            Direction::ALL
                .iter()
                .map(move |&direction| profile::profile(channel, direction))
        })
        .collect()
}
