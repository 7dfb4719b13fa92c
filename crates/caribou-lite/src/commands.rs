//! Register command builders and response parsers.
//!
//! Builders turn validated engineering values into [`RegWrite`]s and
//! [`RegRead`]s; parsers turn the bytes read back into engineering values.
//! Everything here is pure. Range validation happens in the controller
//! before a builder is called, so builders only guard against values that
//! cannot be represented in the register at all.

use caribou_core::{Channel, Direction, Error, GainDomain, Result};

use crate::regs::{self, TrxState};

/// A register write: `data` goes to consecutive registers at `addr`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegWrite {
    pub addr: u16,
    pub data: Vec<u8>,
}

/// A register read of `len` consecutive registers at `addr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegRead {
    pub addr: u16,
    pub len: usize,
}

fn write(channel: Channel, offset: u16, data: Vec<u8>) -> RegWrite {
    RegWrite {
        addr: regs::addr(channel, offset),
        data,
    }
}

fn read(channel: Channel, offset: u16, len: usize) -> RegRead {
    RegRead {
        addr: regs::addr(channel, offset),
        len,
    }
}

fn single_byte(data: &[u8], what: &str) -> Result<u8> {
    match data {
        [b] => Ok(*b),
        _ => Err(Error::Protocol(format!(
            "{what}: expected 1 byte, got {}",
            data.len()
        ))),
    }
}

// ---------------------------------------------------------------
// Builders
// ---------------------------------------------------------------

/// Switch the channel's transceiver state.
pub fn cmd_set_state(channel: Channel, state: TrxState) -> RegWrite {
    write(channel, regs::STATE, vec![state as u8])
}

/// Tune one direction of a channel.
pub fn cmd_set_frequency(channel: Channel, direction: Direction, freq_hz: u64) -> Result<RegWrite> {
    Ok(write(
        channel,
        regs::freq_offset(direction),
        regs::encode_frequency(freq_hz)?,
    ))
}

/// Select a bandwidth (RX) or cutoff (TX) code.
pub fn cmd_set_bandwidth(channel: Channel, direction: Direction, code: u8) -> RegWrite {
    write(channel, regs::bandwidth_offset(direction), vec![code])
}

/// Select the sample rate code for a direction.
pub fn cmd_set_sample_rate(channel: Channel, direction: Direction, code: u8) -> RegWrite {
    write(channel, regs::sample_rate_offset(direction), vec![code])
}

/// Enable or disable RX AGC.
pub fn cmd_set_agc(channel: Channel, enabled: bool) -> RegWrite {
    write(channel, regs::AGC_CTRL, vec![enabled as u8])
}

/// Read the AGC control register.
pub fn cmd_read_agc(channel: Channel) -> RegRead {
    read(channel, regs::AGC_CTRL, 1)
}

/// Set the RX gain by step index.
pub fn cmd_set_rx_gain(channel: Channel, index: usize) -> Result<RegWrite> {
    if index >= GainDomain::RX.steps() {
        return Err(Error::InvalidParameter(format!(
            "RX gain index {index} out of table"
        )));
    }
    Ok(write(channel, regs::RX_GAIN, vec![index as u8]))
}

/// Read the RX gain step index the hardware is currently using.
pub fn cmd_read_rx_gain(channel: Channel) -> RegRead {
    read(channel, regs::RX_GAIN, 1)
}

/// Set the TX output power in dBm (-18 to 13).
pub fn cmd_set_tx_power(channel: Channel, dbm: i16) -> Result<RegWrite> {
    let field = dbm + regs::TX_POWER_OFFSET_DBM;
    if !(0..=31).contains(&field) {
        return Err(Error::InvalidParameter(format!(
            "TX power {dbm} dBm outside -18..13 dBm"
        )));
    }
    Ok(write(channel, regs::TX_POWER, vec![field as u8]))
}

/// Read the TX power field.
pub fn cmd_read_tx_power(channel: Channel) -> RegRead {
    read(channel, regs::TX_POWER, 1)
}

/// Read the RSSI register.
pub fn cmd_read_rssi(channel: Channel) -> RegRead {
    read(channel, regs::RSSI, 1)
}

/// Read the energy detection register.
pub fn cmd_read_energy(channel: Channel) -> RegRead {
    read(channel, regs::EDV, 1)
}

/// Read the modem PLL status register.
pub fn cmd_read_pll_lock(channel: Channel) -> RegRead {
    read(channel, regs::PLL_STATUS, 1)
}

/// Read the mixer LO status register.
pub fn cmd_read_mixer_lock(channel: Channel) -> RegRead {
    read(channel, regs::MIXER_STATUS, 1)
}

// ---------------------------------------------------------------
// Parsers
// ---------------------------------------------------------------

/// Parse the AGC control register.
pub fn parse_agc(data: &[u8]) -> Result<bool> {
    Ok(single_byte(data, "AGC control")? & 0x01 != 0)
}

/// Parse an RX gain index into dB.
pub fn parse_rx_gain(data: &[u8]) -> Result<f64> {
    let index = single_byte(data, "RX gain")? as usize;
    GainDomain::RX
        .value_at(index)
        .ok_or_else(|| Error::Protocol(format!("RX gain index {index} out of table")))
}

/// Parse the TX power field into output dBm.
pub fn parse_tx_power(data: &[u8]) -> Result<i16> {
    let field = single_byte(data, "TX power")? as i16;
    if field > 31 {
        return Err(Error::Protocol(format!("TX power field {field} out of range")));
    }
    Ok(field - regs::TX_POWER_OFFSET_DBM)
}

/// Parse a signed dBm measurement (RSSI or energy), clamped to -127..4.
pub fn parse_dbm(data: &[u8]) -> Result<f32> {
    let raw = single_byte(data, "level")? as i8;
    Ok((raw as f32).clamp(-127.0, 4.0))
}

/// Parse a lock status register.
pub fn parse_lock(data: &[u8]) -> Result<bool> {
    Ok(single_byte(data, "lock status")? & 0x01 != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- builder tests -------------------------------------------------------

    #[test]
    fn set_state_rx() {
        let cmd = cmd_set_state(Channel::Wideband6G, TrxState::Rx);
        assert_eq!(cmd.addr, 0x0202);
        assert_eq!(cmd.data, vec![0x05]);
    }

    #[test]
    fn set_frequency_targets_direction_register() {
        let rx = cmd_set_frequency(Channel::Sub1G, Direction::Rx, 900_000_000).unwrap();
        let tx = cmd_set_frequency(Channel::Sub1G, Direction::Tx, 900_000_000).unwrap();
        assert_eq!(rx.addr, 0x0110);
        assert_eq!(tx.addr, 0x0118);
        assert_eq!(rx.data, tx.data);
    }

    #[test]
    fn set_bandwidth_register() {
        let cmd = cmd_set_bandwidth(Channel::Sub1G, Direction::Tx, 0xB);
        assert_eq!(cmd.addr, 0x0121);
        assert_eq!(cmd.data, vec![0x0B]);
    }

    #[test]
    fn rx_gain_index_bounds() {
        assert_eq!(cmd_set_rx_gain(Channel::Sub1G, 22).unwrap().data, vec![22]);
        assert!(cmd_set_rx_gain(Channel::Sub1G, 23).is_err());
    }

    #[test]
    fn tx_power_field() {
        assert_eq!(cmd_set_tx_power(Channel::Sub1G, -18).unwrap().data, vec![0]);
        assert_eq!(cmd_set_tx_power(Channel::Sub1G, 13).unwrap().data, vec![31]);
        assert!(cmd_set_tx_power(Channel::Sub1G, 14).is_err());
        assert!(cmd_set_tx_power(Channel::Sub1G, -19).is_err());
    }

    // -- parser tests --------------------------------------------------------

    #[test]
    fn parse_gain_registers() {
        assert_eq!(parse_rx_gain(&[7]).unwrap(), 21.0);
        assert!(parse_rx_gain(&[23]).is_err());
        assert_eq!(parse_tx_power(&[18]).unwrap(), 0);
        assert_eq!(parse_tx_power(&[0]).unwrap(), -18);
        assert!(parse_tx_power(&[32]).is_err());
    }

    #[test]
    fn parse_levels() {
        assert_eq!(parse_dbm(&[(-80i8) as u8]).unwrap(), -80.0);
        assert_eq!(parse_dbm(&[127]).unwrap(), 4.0);
        assert_eq!(parse_dbm(&[(-128i8) as u8]).unwrap(), -127.0);
    }

    #[test]
    fn parse_flags() {
        assert!(parse_agc(&[0x01]).unwrap());
        assert!(!parse_agc(&[0x00]).unwrap());
        assert!(parse_lock(&[0x81]).unwrap());
        assert!(!parse_lock(&[0x80]).unwrap());
    }
}
