//! caribou-core: Core traits, types, and error definitions for caribou.
//!
//! This crate holds the hardware-independent half of the radio channel
//! layer: the bandwidth codec, the per-(channel, direction) capability
//! profiles that drive range validation, sensor and stream types, and the
//! traits that the controller implements ([`Radio`]) and consumes
//! ([`Transport`]).
//!
//! # Key types
//!
//! - [`Radio`] -- the interface a driver-discovery shim programs against
//! - [`Transport`] -- register and sample access to the board
//! - [`ChannelProfile`] -- what one path can do
//! - [`RadioEvent`] -- asynchronous state change notifications
//! - [`Error`] / [`Result`] -- error handling

pub mod codec;
pub mod error;
pub mod events;
pub mod helpers;
pub mod profile;
pub mod radio;
pub mod sensors;
pub mod stream;
pub mod transport;
pub mod types;

// Re-export key types at crate root for ergonomic `use caribou_core::*`.
pub use codec::{BandwidthEntry, BandwidthTable};
pub use error::{Error, Result};
pub use events::RadioEvent;
pub use helpers::{format_bandwidth_khz, format_freq_mhz};
pub use profile::{ChannelProfile, GainDomain};
pub use radio::Radio;
pub use sensors::{SensorInfo, SensorKey, SensorKind, SensorValue};
pub use stream::{
    BlockMeta, DropReason, RawIq, SampleBlock, SampleCallback, SampleRead, SessionState,
    SessionStats, StreamEvent,
};
pub use transport::Transport;
pub use types::*;

pub use num_complex::Complex32;
