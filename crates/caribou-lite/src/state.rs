//! Per-channel live state.
//!
//! [`ChannelState`] is the single source of truth behind every getter. The
//! controller only writes to it after the hardware accepted the change, so
//! a rejected or failed request never shows up here.

use caribou_core::profile::SAMPLE_RATE_HZ;
use caribou_core::{Channel, Direction};

/// Committed settings of one direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionState {
    /// Tuning in hertz.
    pub freq_hz: u64,
    /// Bandwidth (RX) or cutoff (TX) in hertz, after table snapping.
    pub bandwidth_hz: f64,
    /// Last manual gain in dB.
    pub gain_db: f64,
    /// Sample rate in hertz.
    pub sample_rate_hz: f64,
}

/// Committed settings and last-read status of one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelState {
    pub channel: Channel,
    pub rx: DirectionState,
    pub tx: DirectionState,
    /// RX AGC enable. While set, `rx.gain_db` is advisory only.
    pub agc_enabled: bool,
    /// Last modem PLL lock reading.
    pub pll_lock_modem: bool,
    /// Last mixer LO lock reading; `None` on the sub-1 GHz path.
    pub pll_lock_mixer: Option<bool>,
}

impl ChannelState {
    /// State after attach, before any setter ran.
    pub fn new(channel: Channel, freq_hz: u64, rx_bandwidth_hz: f64, tx_cutoff_hz: f64) -> Self {
        ChannelState {
            channel,
            rx: DirectionState {
                freq_hz,
                bandwidth_hz: rx_bandwidth_hz,
                gain_db: 0.0,
                sample_rate_hz: SAMPLE_RATE_HZ,
            },
            tx: DirectionState {
                freq_hz,
                bandwidth_hz: tx_cutoff_hz,
                gain_db: 0.0,
                sample_rate_hz: SAMPLE_RATE_HZ,
            },
            agc_enabled: false,
            pll_lock_modem: false,
            pll_lock_mixer: match channel {
                Channel::Sub1G => None,
                Channel::Wideband6G => Some(false),
            },
        }
    }

    pub fn dir(&self, direction: Direction) -> &DirectionState {
        match direction {
            Direction::Rx => &self.rx,
            Direction::Tx => &self.tx,
        }
    }

    pub fn dir_mut(&mut self, direction: Direction) -> &mut DirectionState {
        match direction {
            Direction::Rx => &mut self.rx,
            Direction::Tx => &mut self.tx,
        }
    }
}
