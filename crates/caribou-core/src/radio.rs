//! The `Radio` trait: the surface a driver-discovery host programs against.
//!
//! A host plugin shim wraps a `dyn Radio` and translates its calls and
//! errors into the host's own conventions. Discovery methods are
//! synchronous and answer from the static channel profiles; everything that
//! touches hardware is `async`.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::{Error, Result};
use crate::events::RadioEvent;
use crate::profile::{self, FREQUENCY_ELEMENT, GainDomain};
use crate::sensors::{SensorInfo, SensorKey, SensorValue};
use crate::stream::{SampleCallback, SessionState, SessionStats};
use crate::types::{Channel, Direction, FrequencyRange, HardwareInfo};

/// Unified asynchronous interface to a dual-channel front end.
///
/// Every per-path method takes the [`Channel`] and, where it matters, the
/// [`Direction`]. Setters validate before touching hardware and getters
/// report the last value that was successfully applied.
#[async_trait]
pub trait Radio: Send + Sync {
    /// Identity read from the board at attach time.
    fn hardware_info(&self) -> &HardwareInfo;

    /// Native MTU of a channel's sample path, in samples.
    fn native_mtu(&self, channel: Channel) -> usize;

    // -- discovery ----------------------------------------------------------

    /// Antenna ports available on the path (always exactly one).
    fn list_antennas(&self, channel: Channel, direction: Direction) -> Vec<String> {
        vec![profile::profile(channel, direction).antenna.to_string()]
    }

    /// The selected antenna port.
    fn get_antenna(&self, channel: Channel, direction: Direction) -> String {
        profile::profile(channel, direction).antenna.to_string()
    }

    /// Named gain elements. There are none; gain is a single overall value.
    fn list_gains(&self, _channel: Channel, _direction: Direction) -> Vec<String> {
        Vec::new()
    }

    /// Overall gain domain of the path.
    fn get_gain_range(&self, channel: Channel, direction: Direction) -> GainDomain {
        profile::profile(channel, direction).gain
    }

    /// Whether automatic gain control exists on this path.
    fn has_gain_mode(&self, channel: Channel, direction: Direction) -> bool {
        profile::profile(channel, direction).has_agc
    }

    /// Supported sample rates in hertz.
    fn list_sample_rates(&self, _channel: Channel, _direction: Direction) -> Vec<f64> {
        profile::list_sample_rates()
    }

    /// Supported bandwidths (RX) or cutoffs (TX) in ascending hertz.
    fn list_bandwidths(&self, channel: Channel, direction: Direction) -> Vec<f64> {
        profile::profile(channel, direction).bandwidths().list_hz()
    }

    /// Named tunable elements (always `["RF"]`).
    fn list_frequencies(&self, _channel: Channel, _direction: Direction) -> Vec<String> {
        vec![FREQUENCY_ELEMENT.to_string()]
    }

    /// Overall tuning ranges of the path, ascending.
    fn get_frequency_range(&self, channel: Channel, direction: Direction) -> Vec<FrequencyRange> {
        profile::list_frequency_ranges(channel, direction)
    }

    /// Tuning ranges of a named element.
    fn get_frequency_range_named(
        &self,
        channel: Channel,
        direction: Direction,
        name: &str,
    ) -> Result<Vec<FrequencyRange>> {
        profile::validate_frequency_name(name)?;
        Ok(self.get_frequency_range(channel, direction))
    }

    /// Sensors readable on the path.
    fn list_sensors(&self, channel: Channel, direction: Direction) -> Vec<SensorKey> {
        profile::profile(channel, direction).sensors.to_vec()
    }

    /// Metadata for a sensor, if the path has it.
    fn sensor_info(
        &self,
        channel: Channel,
        direction: Direction,
        key: SensorKey,
    ) -> Result<SensorInfo> {
        if profile::profile(channel, direction).has_sensor(key) {
            Ok(key.info())
        } else {
            Err(Error::UnknownKey(format!("{key} on {channel} {direction}")))
        }
    }

    // -- tuning -------------------------------------------------------------

    /// Get the committed frequency in hertz.
    async fn get_frequency(&self, channel: Channel, direction: Direction) -> Result<u64>;

    /// Tune the path. Takes effect immediately, even while streaming.
    async fn set_frequency(&self, channel: Channel, direction: Direction, freq_hz: u64)
    -> Result<()>;

    /// Get the frequency of a named element.
    async fn get_frequency_named(
        &self,
        channel: Channel,
        direction: Direction,
        name: &str,
    ) -> Result<u64> {
        profile::validate_frequency_name(name)?;
        self.get_frequency(channel, direction).await
    }

    /// Tune a named element.
    async fn set_frequency_named(
        &self,
        channel: Channel,
        direction: Direction,
        name: &str,
        freq_hz: u64,
    ) -> Result<()> {
        profile::validate_frequency_name(name)?;
        self.set_frequency(channel, direction, freq_hz).await
    }

    // -- gain ---------------------------------------------------------------

    /// Get the overall gain in dB.
    ///
    /// With RX AGC enabled this reports the gain the hardware is currently
    /// running, not the last manual request.
    async fn get_gain(&self, channel: Channel, direction: Direction) -> Result<f64>;

    /// Set the overall gain in dB (snapped to the hardware step).
    async fn set_gain(&self, channel: Channel, direction: Direction, gain_db: f64) -> Result<()>;

    /// Get a named gain element. No names exist.
    async fn get_gain_named(
        &self,
        _channel: Channel,
        _direction: Direction,
        name: &str,
    ) -> Result<f64> {
        Err(Error::UnknownName(name.to_string()))
    }

    /// Set a named gain element. No names exist.
    async fn set_gain_named(
        &self,
        _channel: Channel,
        _direction: Direction,
        name: &str,
        _gain_db: f64,
    ) -> Result<()> {
        Err(Error::UnknownName(name.to_string()))
    }

    /// Whether RX AGC is enabled, as reported by the hardware.
    async fn get_gain_mode(&self, channel: Channel) -> Result<bool>;

    /// Enable or disable RX AGC.
    async fn set_gain_mode(&self, channel: Channel, automatic: bool) -> Result<()>;

    // -- filters and rate ---------------------------------------------------

    /// Get the committed bandwidth (RX) or cutoff (TX) in hertz.
    async fn get_bandwidth(&self, channel: Channel, direction: Direction) -> Result<f64>;

    /// Set the bandwidth (RX) or cutoff (TX). Off-table values select the
    /// widest entry.
    async fn set_bandwidth(&self, channel: Channel, direction: Direction, bw_hz: f64)
    -> Result<()>;

    /// Get the sample rate in hertz.
    async fn get_sample_rate(&self, channel: Channel, direction: Direction) -> Result<f64>;

    /// Set the sample rate. Only 4 MSPS is accepted.
    async fn set_sample_rate(&self, channel: Channel, direction: Direction, rate_hz: f64)
    -> Result<()>;

    // -- sensors ------------------------------------------------------------

    /// Read a sensor's latest hardware value.
    async fn read_sensor(
        &self,
        channel: Channel,
        direction: Direction,
        key: SensorKey,
    ) -> Result<SensorValue>;

    /// Read a sensor by its string key.
    async fn read_sensor_by_name(
        &self,
        channel: Channel,
        direction: Direction,
        key: &str,
    ) -> Result<SensorValue> {
        let key: SensorKey = key.parse()?;
        self.read_sensor(channel, direction, key).await
    }

    // -- streaming ----------------------------------------------------------

    /// Start receiving on a channel.
    ///
    /// Fails with [`Error::AlreadyStreaming`] unless the channel is idle.
    /// `block_size` defaults to [`native_mtu`](Radio::native_mtu).
    async fn start_stream(
        &self,
        channel: Channel,
        block_size: Option<usize>,
        callback: SampleCallback,
    ) -> Result<()>;

    /// Stop receiving on a channel.
    ///
    /// Idempotent. Once this returns, the callback is never invoked again.
    async fn stop_stream(&self, channel: Channel) -> Result<()>;

    /// Current lifecycle state of a channel's session.
    async fn stream_state(&self, channel: Channel) -> SessionState;

    /// Counters of the running session on a channel.
    async fn stream_stats(&self, channel: Channel) -> Result<SessionStats>;

    // -- lifecycle ----------------------------------------------------------

    /// Subscribe to state change events.
    fn subscribe(&self) -> Result<broadcast::Receiver<RadioEvent>>;

    /// Stop all sessions, idle both transceivers, and close the transport.
    async fn detach(&self) -> Result<()>;
}
