//! Bandwidth / cutoff codec.
//!
//! The transceiver does not take a continuous filter bandwidth. RX selects
//! one of twelve receiver bandwidth / IF combinations and TX selects one of
//! twelve analog cutoff settings. Each [`BandwidthTable`] maps between the
//! engineering value in hertz and the small-integer hardware code.
//!
//! Hz to code is best-effort: a value within [`MATCH_TOLERANCE_HZ`] of an
//! entry selects that entry, and anything else falls back to the table's
//! last (widest) entry. Code to Hz is total over the table's codes.
//!
//! # Example
//!
//! ```
//! use caribou_core::{Direction, codec};
//!
//! let code = codec::to_hardware_code(Direction::Rx, 1_000_000.0);
//! assert_eq!(codec::table(Direction::Rx).entry(code).unwrap().name, "BW1000KHZ_IF1000KHZ");
//!
//! // No match: the widest RX bandwidth is selected rather than an error.
//! let code = codec::to_hardware_code(Direction::Rx, 50_000_000.0);
//! assert_eq!(codec::to_engineering_value(Direction::Rx, code).unwrap(), 2_000_000.0);
//! ```

use crate::error::{Error, Result};
use crate::types::Direction;

/// Maximum distance, inclusive, between a requested value and a table entry
/// for the entry to be selected.
pub const MATCH_TOLERANCE_HZ: f64 = 1.0;

/// One row of a bandwidth table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandwidthEntry {
    /// Hardware enumeration code written to the transceiver.
    pub code: u8,
    /// Chip-side name of the setting.
    pub name: &'static str,
    /// Engineering value in hertz.
    pub hz: f64,
}

/// Ordered mapping between bandwidth values and hardware codes for one
/// direction.
#[derive(Debug)]
pub struct BandwidthTable {
    direction: Direction,
    entries: &'static [BandwidthEntry],
}

const fn entry(code: u8, name: &'static str, hz: f64) -> BandwidthEntry {
    BandwidthEntry { code, name, hz }
}

const RX_ENTRIES: [BandwidthEntry; 12] = [
    entry(0x0, "BW160KHZ_IF250KHZ", 160_000.0),
    entry(0x1, "BW200KHZ_IF250KHZ", 200_000.0),
    entry(0x2, "BW250KHZ_IF250KHZ", 250_000.0),
    entry(0x3, "BW320KHZ_IF500KHZ", 320_000.0),
    entry(0x4, "BW400KHZ_IF500KHZ", 400_000.0),
    entry(0x5, "BW500KHZ_IF500KHZ", 500_000.0),
    entry(0x6, "BW630KHZ_IF1000KHZ", 630_000.0),
    entry(0x7, "BW800KHZ_IF1000KHZ", 800_000.0),
    entry(0x8, "BW1000KHZ_IF1000KHZ", 1_000_000.0),
    entry(0x9, "BW1250KHZ_IF2000KHZ", 1_250_000.0),
    entry(0xA, "BW1600KHZ_IF2000KHZ", 1_600_000.0),
    entry(0xB, "BW2000KHZ_IF2000KHZ", 2_000_000.0),
];

const TX_ENTRIES: [BandwidthEntry; 12] = [
    entry(0x0, "CUT_OFF_80KHZ", 80_000.0),
    entry(0x1, "CUT_OFF_100KHZ", 100_000.0),
    entry(0x2, "CUT_OFF_125KHZ", 125_000.0),
    entry(0x3, "CUT_OFF_160KHZ", 160_000.0),
    entry(0x4, "CUT_OFF_200KHZ", 200_000.0),
    entry(0x5, "CUT_OFF_250KHZ", 250_000.0),
    entry(0x6, "CUT_OFF_315KHZ", 315_000.0),
    entry(0x7, "CUT_OFF_400KHZ", 400_000.0),
    entry(0x8, "CUT_OFF_500KHZ", 500_000.0),
    entry(0x9, "CUT_OFF_625KHZ", 625_000.0),
    entry(0xA, "CUT_OFF_800KHZ", 800_000.0),
    entry(0xB, "CUT_OFF_1000KHZ", 1_000_000.0),
];

static RX_TABLE: BandwidthTable = BandwidthTable {
    direction: Direction::Rx,
    entries: &RX_ENTRIES,
};

static TX_TABLE: BandwidthTable = BandwidthTable {
    direction: Direction::Tx,
    entries: &TX_ENTRIES,
};

/// The bandwidth table for a direction.
pub fn table(direction: Direction) -> &'static BandwidthTable {
    match direction {
        Direction::Rx => &RX_TABLE,
        Direction::Tx => &TX_TABLE,
    }
}

/// Convert a bandwidth in hertz to the direction's hardware code.
///
/// Never fails; see [`BandwidthTable::to_hardware_code`].
pub fn to_hardware_code(direction: Direction, hz: f64) -> u8 {
    table(direction).to_hardware_code(hz)
}

/// Convert a hardware code back to a bandwidth in hertz.
pub fn to_engineering_value(direction: Direction, code: u8) -> Result<f64> {
    table(direction).to_engineering_value(code)
}

impl BandwidthTable {
    /// The direction this table applies to.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// All entries in table order (ascending hertz).
    pub fn entries(&self) -> &'static [BandwidthEntry] {
        self.entries
    }

    /// The entry selected when a requested value matches nothing.
    pub fn fallback(&self) -> &'static BandwidthEntry {
        &self.entries[self.entries.len() - 1]
    }

    /// Look up the entry for a hardware code.
    pub fn entry(&self, code: u8) -> Option<&'static BandwidthEntry> {
        self.entries.iter().find(|e| e.code == code)
    }

    /// Convert hertz to a hardware code.
    ///
    /// Entries are scanned in table order and the first one within
    /// [`MATCH_TOLERANCE_HZ`] wins. On a miss the last entry's code is
    /// returned; this matches how deployed boards have always behaved and
    /// is not an error.
    pub fn to_hardware_code(&self, hz: f64) -> u8 {
        self.entries
            .iter()
            .find(|e| (hz - e.hz).abs() <= MATCH_TOLERANCE_HZ)
            .unwrap_or_else(|| self.fallback())
            .code
    }

    /// Convert a hardware code to hertz.
    ///
    /// Fails with [`Error::Protocol`] only for a code the chip does not
    /// define, which can only come from a corrupted read-back.
    pub fn to_engineering_value(&self, code: u8) -> Result<f64> {
        self.entry(code).map(|e| e.hz).ok_or_else(|| {
            Error::Protocol(format!(
                "{} bandwidth code 0x{code:02X} is not defined",
                self.direction
            ))
        })
    }

    /// All supported bandwidths in ascending hertz.
    pub fn list_hz(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.hz).collect()
    }
}
