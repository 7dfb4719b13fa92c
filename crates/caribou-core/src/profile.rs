//! Per-(channel, direction) capability records and range validation.
//!
//! Every operation that needs to know what a path can do resolves a single
//! [`ChannelProfile`] via [`profile()`] instead of branching on channel and
//! direction itself. The profile carries the allowed frequency ranges, the
//! bandwidth table, the gain domain, whether AGC applies, the readable
//! sensors, and the antenna name.
//!
//! # Example
//!
//! ```
//! use caribou_core::{Channel, Direction, profile};
//!
//! assert!(profile::is_frequency_valid(Channel::Sub1G, Direction::Rx, 920_000_000));
//! assert!(!profile::is_frequency_valid(Channel::Sub1G, Direction::Rx, 600_000_000));
//! assert_eq!(profile::list_frequency_ranges(Channel::Sub1G, Direction::Rx).len(), 2);
//! ```

use crate::codec::{self, BandwidthTable};
use crate::error::{Error, Result};
use crate::helpers::format_freq_mhz;
use crate::sensors::SensorKey;
use crate::types::{Channel, Direction, FrequencyRange};

/// The single sample rate supported by the current FPGA image, in hertz.
///
/// The transceiver itself can run slower rates; the sample path is fixed at
/// 4 MSPS and this restriction is intentional.
pub const SAMPLE_RATE_HZ: f64 = 4_000_000.0;

/// Native maximum transfer unit of the FPGA sample path, in samples.
pub const NATIVE_MTU_SAMPLES: usize = 32_768;

/// The name of the only tunable frequency element on either channel.
pub const FREQUENCY_ELEMENT: &str = "RF";

const SUB1G_RANGES: [FrequencyRange; 2] = [
    FrequencyRange::new(389_500_000, 510_000_000),
    FrequencyRange::new(779_000_000, 1_020_000_000),
];

const WIDEBAND_RANGES: [FrequencyRange; 1] = [FrequencyRange::new(50_000_000, 6_000_000_000)];

/// A stepped gain domain in dB.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainDomain {
    /// Lowest settable gain.
    pub min_db: f64,
    /// Highest settable gain.
    pub max_db: f64,
    /// Hardware step size.
    pub step_db: f64,
}

impl GainDomain {
    /// RX: 0 to 66 dB in 3 dB steps (23 settings).
    pub const RX: GainDomain = GainDomain {
        min_db: 0.0,
        max_db: 66.0,
        step_db: 3.0,
    };

    /// TX: 0 to 31 dB in 1 dB steps, relative to the baseline output level.
    pub const TX: GainDomain = GainDomain {
        min_db: 0.0,
        max_db: 31.0,
        step_db: 1.0,
    };

    /// Whether `db` lies inside the domain (inclusive).
    pub fn contains(&self, db: f64) -> bool {
        db.is_finite() && db >= self.min_db && db <= self.max_db
    }

    /// Number of hardware settings in the domain.
    pub fn steps(&self) -> usize {
        ((self.max_db - self.min_db) / self.step_db).round() as usize + 1
    }

    /// Validate `db` and snap it to the nearest hardware step.
    pub fn quantize(&self, db: f64) -> Result<f64> {
        if !self.contains(db) {
            return Err(Error::OutOfRange(format!(
                "gain {db} dB outside {}..{} dB",
                self.min_db, self.max_db
            )));
        }
        let index = ((db - self.min_db) / self.step_db).round();
        Ok(self.min_db + index * self.step_db)
    }

    /// Index of a (validated) gain within the step table.
    pub fn index_of(&self, db: f64) -> Result<usize> {
        let snapped = self.quantize(db)?;
        Ok(((snapped - self.min_db) / self.step_db).round() as usize)
    }

    /// Gain value for a step index, if the index is inside the domain.
    pub fn value_at(&self, index: usize) -> Option<f64> {
        (index < self.steps()).then(|| self.min_db + index as f64 * self.step_db)
    }
}

/// Capability record for one (channel, direction) pair.
#[derive(Debug)]
pub struct ChannelProfile {
    /// The physical path.
    pub channel: Channel,
    /// The direction.
    pub direction: Direction,
    /// The single antenna port serving this path.
    pub antenna: &'static str,
    /// Allowed tuning ranges, ascending and disjoint.
    pub frequency_ranges: &'static [FrequencyRange],
    /// Gain domain.
    pub gain: GainDomain,
    /// Whether automatic gain control applies.
    pub has_agc: bool,
    /// Sensors readable on this path, in discovery order.
    pub sensors: &'static [SensorKey],
}

impl ChannelProfile {
    /// The bandwidth table for this path.
    pub fn bandwidths(&self) -> &'static BandwidthTable {
        codec::table(self.direction)
    }

    /// Whether `freq_hz` lies inside any allowed range.
    pub fn contains_frequency(&self, freq_hz: u64) -> bool {
        self.frequency_ranges.iter().any(|r| r.contains(freq_hz))
    }

    /// Whether `key` is readable on this path.
    pub fn has_sensor(&self, key: SensorKey) -> bool {
        self.sensors.contains(&key)
    }
}

static PROFILES: [ChannelProfile; 4] = [
    ChannelProfile {
        channel: Channel::Sub1G,
        direction: Direction::Rx,
        antenna: "TX/RX Sub1GHz",
        frequency_ranges: &SUB1G_RANGES,
        gain: GainDomain::RX,
        has_agc: true,
        sensors: &[SensorKey::Rssi, SensorKey::Energy, SensorKey::PllLockModem],
    },
    ChannelProfile {
        channel: Channel::Sub1G,
        direction: Direction::Tx,
        antenna: "TX/RX Sub1GHz",
        frequency_ranges: &SUB1G_RANGES,
        gain: GainDomain::TX,
        has_agc: false,
        sensors: &[SensorKey::PllLockModem],
    },
    ChannelProfile {
        channel: Channel::Wideband6G,
        direction: Direction::Rx,
        antenna: "TX/RX 6GHz",
        frequency_ranges: &WIDEBAND_RANGES,
        gain: GainDomain::RX,
        has_agc: true,
        sensors: &[
            SensorKey::Rssi,
            SensorKey::Energy,
            SensorKey::PllLockModem,
            SensorKey::PllLockMixer,
        ],
    },
    ChannelProfile {
        channel: Channel::Wideband6G,
        direction: Direction::Tx,
        antenna: "TX/RX 6GHz",
        frequency_ranges: &WIDEBAND_RANGES,
        gain: GainDomain::TX,
        has_agc: false,
        sensors: &[SensorKey::PllLockModem, SensorKey::PllLockMixer],
    },
];

/// Resolve the capability record for a (channel, direction) pair.
pub fn profile(channel: Channel, direction: Direction) -> &'static ChannelProfile {
    let index = channel.index() * 2
        + match direction {
            Direction::Rx => 0,
            Direction::Tx => 1,
        };
    &PROFILES[index]
}

/// Whether `freq_hz` is tunable on the pair.
pub fn is_frequency_valid(channel: Channel, direction: Direction, freq_hz: u64) -> bool {
    profile(channel, direction).contains_frequency(freq_hz)
}

/// Validate a frequency before committing it to hardware.
///
/// Fails with [`Error::OutOfRange`]; frequencies are never clamped.
pub fn validate_frequency(channel: Channel, direction: Direction, freq_hz: u64) -> Result<()> {
    if is_frequency_valid(channel, direction, freq_hz) {
        Ok(())
    } else {
        Err(Error::OutOfRange(format!(
            "{} is outside the {channel} {direction} bands",
            format_freq_mhz(freq_hz)
        )))
    }
}

/// The allowed tuning ranges of the pair, in ascending order.
pub fn list_frequency_ranges(channel: Channel, direction: Direction) -> Vec<FrequencyRange> {
    profile(channel, direction).frequency_ranges.to_vec()
}

/// Supported sample rates (exactly one).
pub fn list_sample_rates() -> Vec<f64> {
    vec![SAMPLE_RATE_HZ]
}

/// Validate a sample rate request.
///
/// Non-positive or non-finite rates are [`Error::OutOfRange`]; any other
/// rate than [`SAMPLE_RATE_HZ`] is [`Error::Unsupported`].
pub fn validate_sample_rate(rate_hz: f64) -> Result<()> {
    if !rate_hz.is_finite() || rate_hz <= 0.0 {
        return Err(Error::OutOfRange(format!("sample rate {rate_hz} Hz")));
    }
    if (rate_hz - SAMPLE_RATE_HZ).abs() > codec::MATCH_TOLERANCE_HZ {
        return Err(Error::Unsupported(format!(
            "sample rate {rate_hz} Hz (only {SAMPLE_RATE_HZ} Hz is available)"
        )));
    }
    Ok(())
}

/// Validate a frequency element name.
pub fn validate_frequency_name(name: &str) -> Result<()> {
    if name == FREQUENCY_ELEMENT {
        Ok(())
    } else {
        Err(Error::UnknownName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_lookup_matches_key() {
        for ch in Channel::ALL {
            for dir in Direction::ALL {
                let p = profile(ch, dir);
                assert_eq!(p.channel, ch);
                assert_eq!(p.direction, dir);
                assert_eq!(p.bandwidths().direction(), dir);
            }
        }
    }

    #[test]
    fn sub1g_has_two_disjoint_ascending_ranges() {
        for dir in Direction::ALL {
            let ranges = list_frequency_ranges(Channel::Sub1G, dir);
            assert_eq!(ranges.len(), 2);
            assert!(ranges[0].high_hz < ranges[1].low_hz);
            assert!(!ranges[0].overlaps(&ranges[1]));
        }
    }

    #[test]
    fn wideband_has_one_range() {
        for dir in Direction::ALL {
            let ranges = list_frequency_ranges(Channel::Wideband6G, dir);
            assert_eq!(ranges, vec![FrequencyRange::new(50_000_000, 6_000_000_000)]);
        }
    }

    #[test]
    fn boundaries_are_inclusive() {
        for ch in Channel::ALL {
            for dir in Direction::ALL {
                for r in list_frequency_ranges(ch, dir) {
                    assert!(validate_frequency(ch, dir, r.low_hz).is_ok());
                    assert!(validate_frequency(ch, dir, r.high_hz).is_ok());
                    assert!(validate_frequency(ch, dir, r.low_hz - 1).is_err());
                    assert!(validate_frequency(ch, dir, r.high_hz + 1).is_err());
                }
            }
        }
    }

    #[test]
    fn gap_between_sub1g_bands_is_rejected() {
        assert!(validate_frequency(Channel::Sub1G, Direction::Rx, 920_000_000).is_ok());
        let err = validate_frequency(Channel::Sub1G, Direction::Rx, 600_000_000).unwrap_err();
        assert!(matches!(err, Error::OutOfRange(_)));
    }

    #[test]
    fn gain_domains() {
        assert_eq!(GainDomain::RX.steps(), 23);
        assert_eq!(GainDomain::TX.steps(), 32);
        assert_eq!(GainDomain::RX.quantize(50.0).unwrap(), 51.0);
        assert_eq!(GainDomain::RX.quantize(66.0).unwrap(), 66.0);
        assert_eq!(GainDomain::TX.quantize(12.4).unwrap(), 12.0);
        assert!(matches!(
            GainDomain::RX.quantize(67.0),
            Err(Error::OutOfRange(_))
        ));
        assert!(GainDomain::TX.quantize(-1.0).is_err());
        assert!(GainDomain::TX.quantize(f64::NAN).is_err());
    }

    #[test]
    fn gain_index_round_trip() {
        assert_eq!(GainDomain::RX.index_of(21.0).unwrap(), 7);
        assert_eq!(GainDomain::RX.value_at(7), Some(21.0));
        assert_eq!(GainDomain::RX.value_at(23), None);
        assert_eq!(GainDomain::TX.value_at(31), Some(31.0));
    }

    #[test]
    fn agc_is_rx_only() {
        for ch in Channel::ALL {
            assert!(profile(ch, Direction::Rx).has_agc);
            assert!(!profile(ch, Direction::Tx).has_agc);
        }
    }

    #[test]
    fn sensor_gating() {
        assert!(profile(Channel::Sub1G, Direction::Rx).has_sensor(SensorKey::Rssi));
        assert!(!profile(Channel::Sub1G, Direction::Tx).has_sensor(SensorKey::Energy));
        assert!(!profile(Channel::Sub1G, Direction::Rx).has_sensor(SensorKey::PllLockMixer));
        assert!(profile(Channel::Wideband6G, Direction::Tx).has_sensor(SensorKey::PllLockMixer));
    }

    #[test]
    fn sample_rate_validation() {
        assert_eq!(list_sample_rates(), vec![4_000_000.0]);
        assert!(validate_sample_rate(4_000_000.0).is_ok());
        assert!(matches!(
            validate_sample_rate(2_000_000.0),
            Err(Error::Unsupported(_))
        ));
        assert!(matches!(validate_sample_rate(0.0), Err(Error::OutOfRange(_))));
    }

    #[test]
    fn frequency_name_validation() {
        assert!(validate_frequency_name("RF").is_ok());
        assert!(matches!(
            validate_frequency_name("LO"),
            Err(Error::UnknownName(_))
        ));
    }
}
