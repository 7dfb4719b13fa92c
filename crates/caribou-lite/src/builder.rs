//! CaribouBuilder -- fluent builder for constructing [`CaribouRadio`] instances.
//!
//! Separates configuration from construction so that callers can set the
//! command timeout, streaming parameters, and initial tuning before the
//! controller attaches to the board.
//!
//! # Example
//!
//! ```no_run
//! use caribou_core::Channel;
//! use caribou_lite::builder::CaribouBuilder;
//! use std::time::Duration;
//!
//! # async fn example(transport: Box<dyn caribou_core::Transport>) -> caribou_core::Result<()> {
//! let radio = CaribouBuilder::new()
//!     .command_timeout(Duration::from_millis(300))
//!     .initial_frequency(Channel::Sub1G, 868_000_000)
//!     .queue_depth(16)
//!     .build_with_transport(transport)
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use caribou_core::error::{Error, Result};
use caribou_core::profile::{self, NATIVE_MTU_SAMPLES};
use caribou_core::stream::MAX_BLOCK_SAMPLES;
use caribou_core::transport::Transport;
use caribou_core::types::{Channel, Direction};

use crate::io::spawn_io_task;
use crate::radio::{CaribouRadio, RadioConfig};

/// Fluent builder for [`CaribouRadio`].
///
/// Every setting has a default, so the simplest usage is:
///
/// ```ignore
/// let radio = CaribouBuilder::new()
///     .build_with_transport(transport)
///     .await?;
/// ```
pub struct CaribouBuilder {
    command_timeout: Duration,
    device_id: u32,
    native_mtu: usize,
    queue_depth: usize,
    event_capacity: usize,
    initial_freq_hz: [u64; 2],
}

impl CaribouBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        CaribouBuilder {
            command_timeout: Duration::from_millis(500),
            device_id: 0,
            native_mtu: NATIVE_MTU_SAMPLES,
            queue_depth: 8,
            event_capacity: 256,
            initial_freq_hz: [900_000_000, 2_400_000_000],
        }
    }

    /// Set the timeout for a single register transaction (default: 500ms).
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Set the logical device id reported in the hardware info (default: 0).
    pub fn device_id(mut self, id: u32) -> Self {
        self.device_id = id;
        self
    }

    /// Override the native sample block size used when a session does not
    /// request one (default: 32768 samples).
    pub fn native_mtu(mut self, samples: usize) -> Self {
        self.native_mtu = samples;
        self
    }

    /// Set how many blocks may wait for the callback before new blocks are
    /// dropped (default: 8).
    pub fn queue_depth(mut self, blocks: usize) -> Self {
        self.queue_depth = blocks;
        self
    }

    /// Set the capacity of the [`RadioEvent`](caribou_core::RadioEvent)
    /// broadcast channel (default: 256).
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Set the frequency both directions of `channel` are tuned to on attach.
    pub fn initial_frequency(mut self, channel: Channel, freq_hz: u64) -> Self {
        self.initial_freq_hz[channel.index()] = freq_hz;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.command_timeout.is_zero() {
            return Err(Error::InvalidParameter(
                "command_timeout must be non-zero".into(),
            ));
        }
        if self.native_mtu == 0 || self.native_mtu > MAX_BLOCK_SAMPLES {
            return Err(Error::InvalidParameter(format!(
                "native_mtu {} outside 1..={MAX_BLOCK_SAMPLES}",
                self.native_mtu
            )));
        }
        if self.queue_depth == 0 {
            return Err(Error::InvalidParameter("queue_depth must be at least 1".into()));
        }
        if self.event_capacity == 0 {
            return Err(Error::InvalidParameter(
                "event_capacity must be at least 1".into(),
            ));
        }
        for channel in Channel::ALL {
            let freq_hz = self.initial_freq_hz[channel.index()];
            let valid = Direction::ALL
                .iter()
                .all(|&dir| profile::is_frequency_valid(channel, dir, freq_hz));
            if !valid {
                return Err(Error::InvalidParameter(format!(
                    "initial frequency {freq_hz} Hz not tunable on {channel}"
                )));
            }
        }
        Ok(())
    }

    /// Build a [`CaribouRadio`] with a caller-provided transport.
    ///
    /// This is the only entry point: hardware transports live outside this
    /// crate, and tests pass a `MockTransport` from `caribou-test-harness`.
    /// The returned controller is attached: the board identity has been
    /// read and both channels have been idled and tuned.
    pub async fn build_with_transport(self, transport: Box<dyn Transport>) -> Result<CaribouRadio> {
        self.validate()?;

        let io = spawn_io_task(transport, self.command_timeout);
        CaribouRadio::attach(
            io,
            RadioConfig {
                device_id: self.device_id,
                native_mtu: self.native_mtu,
                queue_depth: self.queue_depth,
                event_capacity: self.event_capacity,
                initial_freq_hz: self.initial_freq_hz,
            },
        )
        .await
    }
}

impl Default for CaribouBuilder {
    fn default() -> Self {
        Self::new()
    }
}
