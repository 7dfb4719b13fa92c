//! Sensor keys, metadata, and values.
//!
//! Sensor reads return a [`SensorValue`] whose variant is fixed by the
//! [`SensorKey`]: signal measurements are floats in dBm, PLL lock
//! indications are booleans.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A readable hardware sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKey {
    /// Modem-level received signal strength (RX only).
    Rssi,
    /// Modem-level energy detection (RX only).
    Energy,
    /// Transceiver PLL lock indication.
    PllLockModem,
    /// Mixer LO PLL lock indication (wideband channel only).
    PllLockMixer,
}

impl SensorKey {
    /// The host-facing string key.
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKey::Rssi => "RSSI",
            SensorKey::Energy => "ENERGY",
            SensorKey::PllLockModem => "PLL_LOCK_MODEM",
            SensorKey::PllLockMixer => "PLL_LOCK_MIXER",
        }
    }

    /// Static metadata describing this sensor.
    pub fn info(&self) -> SensorInfo {
        match self {
            SensorKey::Rssi => SensorInfo {
                key: *self,
                name: "RX RSSI",
                kind: SensorKind::Float,
                description: "Modem level RSSI measurement",
                range: Some((-127.0, 4.0)),
            },
            SensorKey::Energy => SensorInfo {
                key: *self,
                name: "RX ENERGY",
                kind: SensorKind::Float,
                description: "Modem level ENERGY (EDC) measurement",
                range: Some((-127.0, 4.0)),
            },
            SensorKey::PllLockModem => SensorInfo {
                key: *self,
                name: "PLL Lock Modem",
                kind: SensorKind::Bool,
                description: "Modem PLL locking indication",
                range: None,
            },
            SensorKey::PllLockMixer => SensorInfo {
                key: *self,
                name: "PLL Lock Mixer",
                kind: SensorKind::Bool,
                description: "Mixer LO PLL locking indication",
                range: None,
            },
        }
    }
}

impl fmt::Display for SensorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SensorKey {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "RSSI" => Ok(SensorKey::Rssi),
            "ENERGY" => Ok(SensorKey::Energy),
            "PLL_LOCK_MODEM" => Ok(SensorKey::PllLockModem),
            "PLL_LOCK_MIXER" => Ok(SensorKey::PllLockMixer),
            _ => Err(Error::UnknownKey(s.to_string())),
        }
    }
}

/// Payload type of a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    /// Floating point measurement.
    Float,
    /// Boolean indication.
    Bool,
}

/// Sensor metadata for discovery.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorInfo {
    /// The sensor this describes.
    pub key: SensorKey,
    /// Display name.
    pub name: &'static str,
    /// Payload type.
    pub kind: SensorKind,
    /// Human-readable description.
    pub description: &'static str,
    /// Numeric range `(min, max)` for float sensors.
    pub range: Option<(f64, f64)>,
}

/// A sensor reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorValue {
    /// A float measurement (dBm for RSSI and ENERGY).
    Float(f32),
    /// A boolean indication.
    Bool(bool),
}

impl SensorValue {
    /// The float payload, if this is a float reading.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            SensorValue::Float(v) => Some(*v),
            SensorValue::Bool(_) => None,
        }
    }

    /// The boolean payload, if this is a boolean reading.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SensorValue::Bool(b) => Some(*b),
            SensorValue::Float(_) => None,
        }
    }
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorValue::Float(v) => write!(f, "{v:.1}"),
            SensorValue::Bool(b) => write!(f, "{b}"),
        }
    }
}
