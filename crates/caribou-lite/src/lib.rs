//! CaribouLite backend for caribou.
//!
//! This crate drives the dual-channel CaribouLite front end through the
//! register-level [`Transport`](caribou_core::Transport) abstraction. It
//! provides:
//!
//! - **Register map** ([`regs`]) -- per-channel register blocks, transceiver
//!   states, and the 40-bit frequency encoding.
//! - **Command builders** ([`commands`]) -- construct register writes and
//!   reads for tuning, filters, gain, AGC and sensors, and parse the
//!   corresponding read-backs.
//! - **Channel state** ([`state`]) -- the committed settings behind every
//!   getter.
//! - **CaribouRadio** ([`radio`]) -- the [`Radio`](caribou_core::Radio) trait
//!   implementation: validation, hardware access, state and streaming
//!   sessions for both channels.
//! - **CaribouBuilder** ([`builder`]) -- fluent builder for constructing
//!   `CaribouRadio` instances.
//!
//! # Example
//!
//! ```
//! use caribou_core::{Channel, Direction};
//! use caribou_lite::commands::cmd_set_frequency;
//!
//! // Tune the sub-1 GHz receiver to 915 MHz.
//! let cmd = cmd_set_frequency(Channel::Sub1G, Direction::Rx, 915_000_000).unwrap();
//! assert_eq!(cmd.addr, 0x0110);
//! assert_eq!(cmd.data, vec![0xC0, 0xCA, 0x89, 0x36, 0x00]);
//! ```

pub mod builder;
pub mod commands;
mod io;
pub mod radio;
pub mod regs;
mod session;
pub mod state;

pub use builder::CaribouBuilder;
pub use radio::CaribouRadio;
