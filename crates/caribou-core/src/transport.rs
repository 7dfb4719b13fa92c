//! Transport trait for the board's hardware link.
//!
//! The [`Transport`] trait abstracts over the bus to the RF transceiver and
//! the FPGA sample path. The real SPI/GPIO implementation lives outside this
//! workspace; the controller in `caribou-lite` only ever talks to a
//! `Transport`, which makes deterministic testing with `MockTransport` from
//! the `caribou-test-harness` crate possible.

use async_trait::async_trait;

use crate::error::Result;
use crate::stream::{RawIq, SampleRead};
use crate::types::{BoardIdentity, Channel};

/// Asynchronous register and sample transport to the board.
///
/// Register addresses are the transceiver's 16-bit address space.
/// Implementations report a vanished link as
/// [`Error::ConnectionLost`](crate::error::Error::ConnectionLost) and any
/// recoverable bus hiccup as
/// [`Error::Transport`](crate::error::Error::Transport).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Write `data` to consecutive registers starting at `addr`.
    async fn write_registers(&mut self, addr: u16, data: &[u8]) -> Result<()>;

    /// Read `buf.len()` consecutive registers starting at `addr`.
    async fn read_registers(&mut self, addr: u16, buf: &mut [u8]) -> Result<()>;

    /// Read up to `buf.len()` raw I/Q words from a channel's FPGA FIFO.
    ///
    /// Implementations should return promptly with whatever is available;
    /// a short read is not an error.
    async fn read_samples(&mut self, channel: Channel, buf: &mut [RawIq]) -> Result<SampleRead>;

    /// Read the board identity (EEPROM and FPGA version registers).
    async fn board_identity(&mut self) -> Result<BoardIdentity>;

    /// Close the link.
    ///
    /// After calling `close()`, every other call should return
    /// [`Error::NotConnected`](crate::error::Error::NotConnected).
    async fn close(&mut self) -> Result<()>;
}
