//! Asynchronous radio event types.
//!
//! The controller emits events through a [`tokio::sync::broadcast`] channel
//! whenever a setter commits a change to hardware or a streaming session
//! changes state. Spectrum displays and loggers subscribe to these instead
//! of polling the getters.

use crate::stream::SessionState;
use crate::types::{Channel, Direction};

/// An event emitted by the controller when radio state changes.
///
/// Subscribe via [`crate::radio::Radio::subscribe()`]. Delivery is
/// best-effort through a bounded broadcast channel; slow subscribers may
/// miss events.
#[derive(Debug, Clone, PartialEq)]
pub enum RadioEvent {
    /// A tuning frequency was committed.
    FrequencyChanged {
        /// Which path.
        channel: Channel,
        /// Which direction.
        direction: Direction,
        /// New frequency in hertz.
        freq_hz: u64,
    },

    /// A manual gain was committed.
    GainChanged {
        /// Which path.
        channel: Channel,
        /// Which direction.
        direction: Direction,
        /// New gain in dB.
        gain_db: f64,
    },

    /// RX automatic gain control was switched.
    GainModeChanged {
        /// Which path.
        channel: Channel,
        /// `true` when AGC is now enabled.
        automatic: bool,
    },

    /// A filter bandwidth (RX) or cutoff (TX) was committed.
    BandwidthChanged {
        /// Which path.
        channel: Channel,
        /// Which direction.
        direction: Direction,
        /// Engineering value actually applied, after table snapping.
        bandwidth_hz: f64,
    },

    /// A streaming session changed lifecycle state.
    StreamStateChanged {
        /// Which path.
        channel: Channel,
        /// New state.
        state: SessionState,
    },

    /// A streaming session ended because of a fatal fault.
    StreamTerminated {
        /// Which path.
        channel: Channel,
        /// Rendered cause.
        reason: String,
    },

    /// The controller attached to the hardware.
    Attached,

    /// The controller detached from the hardware.
    Detached,
}
