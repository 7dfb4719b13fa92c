//! Core types used throughout caribou.
//!
//! These types describe the two physical radio paths, the RX/TX direction
//! axis, frequency intervals, and the board identity reported by the
//! hardware layer.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::helpers::format_freq_mhz;

/// One of the two physical radio paths of the front end.
///
/// The identity is immutable; it selects which validation tables and which
/// transceiver register block apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    /// The sub-1 GHz path (two disjoint sub-bands).
    Sub1G,
    /// The wideband 50 MHz - 6 GHz path (mixer-assisted).
    Wideband6G,
}

impl Channel {
    /// Both channels, in host channel-index order.
    pub const ALL: [Channel; 2] = [Channel::Sub1G, Channel::Wideband6G];

    /// The host channel index of this channel.
    pub fn index(&self) -> usize {
        match self {
            Channel::Sub1G => 0,
            Channel::Wideband6G => 1,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Channel::Sub1G => "Sub1G",
            Channel::Wideband6G => "Wideband6G",
        };
        write!(f, "{s}")
    }
}

/// Error returned when a string cannot be parsed into a [`Channel`] or
/// [`Direction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseChannelError(String);

impl fmt::Display for ParseChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown channel or direction: '{}'", self.0)
    }
}

impl std::error::Error for ParseChannelError {}

impl FromStr for Channel {
    type Err = ParseChannelError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sub1g" | "s1g" | "0" => Ok(Channel::Sub1G),
            "wideband6g" | "wideband" | "6g" | "hif" | "1" => Ok(Channel::Wideband6G),
            _ => Err(ParseChannelError(s.to_string())),
        }
    }
}

/// Signal direction. Orthogonal to [`Channel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    /// Receive.
    Rx,
    /// Transmit.
    Tx,
}

impl Direction {
    /// Both directions.
    pub const ALL: [Direction; 2] = [Direction::Rx, Direction::Tx];
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Rx => write!(f, "RX"),
            Direction::Tx => write!(f, "TX"),
        }
    }
}

impl FromStr for Direction {
    type Err = ParseChannelError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "RX" => Ok(Direction::Rx),
            "TX" => Ok(Direction::Tx),
            _ => Err(ParseChannelError(s.to_string())),
        }
    }
}

/// A closed frequency interval `[low_hz, high_hz]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrequencyRange {
    /// Lower bound in hertz (inclusive).
    pub low_hz: u64,
    /// Upper bound in hertz (inclusive).
    pub high_hz: u64,
}

impl FrequencyRange {
    /// Create a new frequency range.
    pub const fn new(low_hz: u64, high_hz: u64) -> Self {
        FrequencyRange { low_hz, high_hz }
    }

    /// Check whether a frequency (in hertz) falls within this range (inclusive).
    pub fn contains(&self, freq_hz: u64) -> bool {
        freq_hz >= self.low_hz && freq_hz <= self.high_hz
    }

    /// Whether two ranges share at least one frequency.
    pub fn overlaps(&self, other: &FrequencyRange) -> bool {
        self.low_hz <= other.high_hz && other.low_hz <= self.high_hz
    }
}

impl fmt::Display for FrequencyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            format_freq_mhz(self.low_hz),
            format_freq_mhz(self.high_hz)
        )
    }
}

/// Board identity as reported by the hardware layer.
///
/// Serial number and board strings come from the board EEPROM, which is
/// owned by the transport side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardIdentity {
    /// Vendor string (e.g. "CaribouLabs LTD").
    pub vendor_name: String,
    /// Product string (e.g. "CaribouLite RPI Hat").
    pub product_name: String,
    /// Hardware revision string.
    pub hardware_revision: String,
    /// FPGA firmware revision.
    pub fpga_revision: u32,
    /// Board serial number.
    pub serial_number: u32,
}

/// Hardware identity exposed to the host framework.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareInfo {
    /// Logical device id assigned by the host.
    pub device_id: u32,
    /// Identity read from the board at attach time.
    pub board: BoardIdentity,
}

impl HardwareInfo {
    /// Key/value form used by driver-discovery hosts.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut args = BTreeMap::new();
        args.insert("device_id".to_string(), self.device_id.to_string());
        args.insert(
            "serial_number".to_string(),
            self.board.serial_number.to_string(),
        );
        args.insert(
            "hardware_revision".to_string(),
            self.board.hardware_revision.clone(),
        );
        args.insert(
            "fpga_revision".to_string(),
            self.board.fpga_revision.to_string(),
        );
        args.insert("vendor_name".to_string(), self.board.vendor_name.clone());
        args.insert("product_name".to_string(), self.board.product_name.clone());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_index_matches_all_order() {
        for (i, ch) in Channel::ALL.iter().enumerate() {
            assert_eq!(ch.index(), i);
        }
    }

    #[test]
    fn channel_display_and_parse() {
        assert_eq!(Channel::Sub1G.to_string(), "Sub1G");
        assert_eq!(Channel::Wideband6G.to_string(), "Wideband6G");
        assert_eq!("s1g".parse::<Channel>().unwrap(), Channel::Sub1G);
        assert_eq!("HiF".parse::<Channel>().unwrap(), Channel::Wideband6G);
        assert_eq!("wideband6g".parse::<Channel>().unwrap(), Channel::Wideband6G);
        assert!("2.4g".parse::<Channel>().is_err());
    }

    #[test]
    fn direction_display_and_parse() {
        assert_eq!(Direction::Rx.to_string(), "RX");
        assert_eq!(Direction::Tx.to_string(), "TX");
        assert_eq!("rx".parse::<Direction>().unwrap(), Direction::Rx);
        assert_eq!("Tx".parse::<Direction>().unwrap(), Direction::Tx);
        assert!("duplex".parse::<Direction>().is_err());
    }

    #[test]
    fn frequency_range_contains_is_inclusive() {
        let r = FrequencyRange::new(779_000_000, 1_020_000_000);
        assert!(r.contains(779_000_000));
        assert!(r.contains(1_020_000_000));
        assert!(r.contains(915_000_000));
        assert!(!r.contains(778_999_999));
        assert!(!r.contains(1_020_000_001));
    }

    #[test]
    fn frequency_range_overlap() {
        let a = FrequencyRange::new(100, 200);
        assert!(a.overlaps(&FrequencyRange::new(200, 300)));
        assert!(a.overlaps(&FrequencyRange::new(150, 160)));
        assert!(!a.overlaps(&FrequencyRange::new(201, 300)));
    }

    #[test]
    fn frequency_range_display() {
        let r = FrequencyRange::new(389_500_000, 510_000_000);
        assert_eq!(r.to_string(), "389.500000 MHz - 510.000000 MHz");
    }

    #[test]
    fn hardware_info_map() {
        let info = HardwareInfo {
            device_id: 0,
            board: BoardIdentity {
                vendor_name: "CaribouLabs LTD".into(),
                product_name: "CaribouLite RPI Hat".into(),
                hardware_revision: "0x0001".into(),
                fpga_revision: 1,
                serial_number: 0x1234_5678,
            },
        };
        let map = info.to_map();
        assert_eq!(map["device_id"], "0");
        assert_eq!(map["serial_number"], "305419896");
        assert_eq!(map["hardware_revision"], "0x0001");
        assert_eq!(map["fpga_revision"], "1");
        assert_eq!(map["vendor_name"], "CaribouLabs LTD");
        assert_eq!(map["product_name"], "CaribouLite RPI Hat");
        assert_eq!(map.len(), 6);
    }
}
