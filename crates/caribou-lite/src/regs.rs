//! Transceiver register map and payload encoding.
//!
//! Each channel owns one register block in the transceiver's 16-bit address
//! space. Registers are addressed as `block base + offset`; the offsets are
//! identical for both blocks, so every command builder takes a [`Channel`]
//! and an offset and never hard-codes an absolute address.
//!
//! Multi-byte values are little-endian. Frequencies are 40-bit hertz values,
//! which comfortably covers the 6 GHz wideband path.
//!
//! # Register block layout
//!
//! ```text
//! +0x02  STATE        transceiver state (TRXOFF / RX)
//! +0x10  FREQ_RX      5 bytes, RX tuning in Hz
//! +0x18  FREQ_TX      5 bytes, TX tuning in Hz
//! +0x20  RX_BW        RX bandwidth / IF code
//! +0x21  TX_CUTOFF    TX analog cutoff code
//! +0x22  RX_SR        RX sample rate code
//! +0x23  TX_SR        TX sample rate code
//! +0x24  AGC_CTRL     bit 0: AGC enable
//! +0x25  RX_GAIN      RX gain step index (3 dB per step)
//! +0x26  TX_POWER     TX power field (output dBm + 18)
//! +0x27  RSSI         signed dBm
//! +0x28  EDV          signed dBm energy detection value
//! +0x29  PLL_STATUS   bit 0: modem PLL locked
//! +0x2A  MIXER_STATUS bit 0: mixer LO locked (wideband only)
//! ```

use bytes::{BufMut, BytesMut};

use caribou_core::{Channel, Direction, Error, Result};

/// Register block base for the sub-1 GHz path.
pub const SUB1G_BASE: u16 = 0x0100;

/// Register block base for the wideband path.
pub const WIDEBAND_BASE: u16 = 0x0200;

pub const STATE: u16 = 0x02;
pub const FREQ_RX: u16 = 0x10;
pub const FREQ_TX: u16 = 0x18;
pub const RX_BW: u16 = 0x20;
pub const TX_CUTOFF: u16 = 0x21;
pub const RX_SR: u16 = 0x22;
pub const TX_SR: u16 = 0x23;
pub const AGC_CTRL: u16 = 0x24;
pub const RX_GAIN: u16 = 0x25;
pub const TX_POWER: u16 = 0x26;
pub const RSSI: u16 = 0x27;
pub const EDV: u16 = 0x28;
pub const PLL_STATUS: u16 = 0x29;
pub const MIXER_STATUS: u16 = 0x2A;

/// Width of a frequency register in bytes.
pub const FREQ_LEN: usize = 5;

/// Largest value a frequency register can hold.
pub const FREQ_MAX_HZ: u64 = (1 << 40) - 1;

/// Sample rate code for 4000 kHz.
pub const SR_4000KHZ: u8 = 0x1;

/// Offset between TX power field and output dBm.
pub const TX_POWER_OFFSET_DBM: i16 = 18;

/// Transceiver state command values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TrxState {
    /// Transceiver off; registers retained.
    TrxOff = 0x02,
    /// Receiving.
    Rx = 0x05,
}

/// Base address of a channel's register block.
pub fn base(channel: Channel) -> u16 {
    match channel {
        Channel::Sub1G => SUB1G_BASE,
        Channel::Wideband6G => WIDEBAND_BASE,
    }
}

/// Absolute address of `offset` in a channel's block.
pub fn addr(channel: Channel, offset: u16) -> u16 {
    base(channel) + offset
}

/// Offset of the frequency register for a direction.
pub fn freq_offset(direction: Direction) -> u16 {
    match direction {
        Direction::Rx => FREQ_RX,
        Direction::Tx => FREQ_TX,
    }
}

/// Offset of the bandwidth (RX) or cutoff (TX) register.
pub fn bandwidth_offset(direction: Direction) -> u16 {
    match direction {
        Direction::Rx => RX_BW,
        Direction::Tx => TX_CUTOFF,
    }
}

/// Offset of the sample rate register for a direction.
pub fn sample_rate_offset(direction: Direction) -> u16 {
    match direction {
        Direction::Rx => RX_SR,
        Direction::Tx => TX_SR,
    }
}

/// Encode a frequency into its 40-bit little-endian register payload.
///
/// ```
/// use caribou_lite::regs::encode_frequency;
///
/// let bytes = encode_frequency(900_000_000).unwrap();
/// assert_eq!(bytes, vec![0x00, 0xE9, 0xA4, 0x35, 0x00]);
/// ```
pub fn encode_frequency(freq_hz: u64) -> Result<Vec<u8>> {
    if freq_hz > FREQ_MAX_HZ {
        return Err(Error::InvalidParameter(format!(
            "frequency {freq_hz} Hz does not fit a 40-bit register"
        )));
    }
    let mut buf = BytesMut::with_capacity(FREQ_LEN);
    buf.put_uint_le(freq_hz, FREQ_LEN);
    Ok(buf.to_vec())
}
