//! Mock board transport for deterministic testing of the channel layer.
//!
//! [`MockTransport`] implements [`Transport`] on top of an in-memory
//! register file and a seeded sample source. Clones share the same state,
//! so a test can hand one clone to the controller and keep another to play
//! the hardware side: drift the AGC gain, change a sensor register, inject
//! faults, or inspect the write log.
//!
//! # Example
//!
//! ```
//! use caribou_test_harness::MockTransport;
//!
//! let mock = MockTransport::new();
//! let hardware = mock.clone();
//! hardware.set_register(0x0127, (-72i8) as u8);
//! assert_eq!(mock.register(0x0127), 0xB8);
//! ```

use std::collections::HashMap;
use std::f64::consts::TAU;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use caribou_core::error::{Error, Result};
use caribou_core::stream::{RawIq, SampleRead};
use caribou_core::transport::Transport;
use caribou_core::types::{BoardIdentity, Channel};

/// Modem PLL status registers, preset to "locked".
const PLL_STATUS_REGS: [u16; 2] = [0x0129, 0x0229];

/// Mixer LO status register of the wideband block, preset to "locked".
const MIXER_STATUS_REG: u16 = 0x022A;

/// Amplitude of the generated test tone in 13-bit counts.
const TONE_AMPLITUDE: f64 = 2000.0;

/// Peak noise added to the tone in 13-bit counts.
const NOISE_AMPLITUDE: i16 = 16;

#[derive(Debug)]
struct MockState {
    registers: HashMap<u16, u8>,
    writes: Vec<(u16, Vec<u8>)>,
    open: bool,
    identity: BoardIdentity,
    failing_reads: u32,
    failing_writes: u32,
    failing_sample_reads: u32,
    /// Sample reads left before the link drops.
    disconnect_after: Option<u64>,
    /// Overflow flags to report on the next sample reads.
    pending_overflows: u32,
    /// Largest number of words returned per sample read.
    max_chunk: Option<usize>,
    sample_reads: u64,
    phase: [u64; 2],
    rng: StdRng,
}

/// A mock [`Transport`] for testing the controller without a board.
///
/// Unwritten registers read as zero, except the PLL status registers which
/// start out locked. Sample reads fill the whole buffer with a seeded tone
/// plus noise unless a fault or a chunk limit is configured.
#[derive(Debug, Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a connected mock with the default seed.
    pub fn new() -> Self {
        Self::with_seed(0x5EED)
    }

    /// Create a connected mock whose sample noise is derived from `seed`.
    pub fn with_seed(seed: u64) -> Self {
        let mut registers = HashMap::new();
        for reg in PLL_STATUS_REGS {
            registers.insert(reg, 0x01);
        }
        registers.insert(MIXER_STATUS_REG, 0x01);

        MockTransport {
            state: Arc::new(Mutex::new(MockState {
                registers,
                writes: Vec::new(),
                open: true,
                identity: BoardIdentity {
                    vendor_name: "CaribouLabs LTD".into(),
                    product_name: "CaribouLite RPI Hat".into(),
                    hardware_revision: "0x0001".into(),
                    fpga_revision: 1,
                    serial_number: 0x0000_1234,
                },
                failing_reads: 0,
                failing_writes: 0,
                failing_sample_reads: 0,
                disconnect_after: None,
                pending_overflows: 0,
                max_chunk: None,
                sample_reads: 0,
                phase: [0; 2],
                rng: StdRng::seed_from_u64(seed),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -- hardware side ------------------------------------------------------

    /// Set a register as if the hardware changed it.
    pub fn set_register(&self, addr: u16, value: u8) {
        self.lock().registers.insert(addr, value);
    }

    /// Current value of a register (zero if never written).
    pub fn register(&self, addr: u16) -> u8 {
        self.lock().registers.get(&addr).copied().unwrap_or(0)
    }

    /// Replace the board identity.
    pub fn set_identity(&self, identity: BoardIdentity) {
        self.lock().identity = identity;
    }

    /// Every register write so far, as `(address, data)`.
    pub fn writes(&self) -> Vec<(u16, Vec<u8>)> {
        self.lock().writes.clone()
    }

    /// Forget the write log.
    pub fn clear_writes(&self) {
        self.lock().writes.clear();
    }

    /// Number of sample reads served so far.
    pub fn sample_reads(&self) -> u64 {
        self.lock().sample_reads
    }

    /// Whether the link is still open.
    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    // -- fault injection ----------------------------------------------------

    /// Fail the next `n` register reads with a transient transport error.
    pub fn fail_next_reads(&self, n: u32) {
        self.lock().failing_reads = n;
    }

    /// Fail the next `n` register writes with a transient transport error.
    pub fn fail_next_writes(&self, n: u32) {
        self.lock().failing_writes = n;
    }

    /// Fail the next `n` sample reads with a transient transport error.
    pub fn fail_next_sample_reads(&self, n: u32) {
        self.lock().failing_sample_reads = n;
    }

    /// Drop the link after `n` more successful sample reads.
    ///
    /// Every call after that fails with [`Error::ConnectionLost`].
    pub fn disconnect_after_blocks(&self, n: u64) {
        self.lock().disconnect_after = Some(n);
    }

    /// Drop the link now.
    pub fn disconnect(&self) {
        self.lock().disconnect_after = Some(0);
    }

    /// Report a FIFO overflow on the next `n` sample reads.
    pub fn overflow_next(&self, n: u32) {
        self.lock().pending_overflows = n;
    }

    /// Return at most `n` words per sample read.
    pub fn limit_chunk(&self, n: usize) {
        self.lock().max_chunk = Some(n);
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockState {
    fn check_link(&self) -> Result<()> {
        if !self.open {
            return Err(Error::NotConnected);
        }
        if self.disconnect_after == Some(0) {
            return Err(Error::ConnectionLost);
        }
        Ok(())
    }

    fn fill_samples(&mut self, channel: Channel, buf: &mut [RawIq]) {
        // The sub-1 GHz path carries a slower tone so the channels differ.
        let cycle = match channel {
            Channel::Sub1G => 64.0,
            Channel::Wideband6G => 16.0,
        };
        let index = channel.index();
        for word in buf.iter_mut() {
            let angle = TAU * self.phase[index] as f64 / cycle;
            let noise_i = self.rng.gen_range(-NOISE_AMPLITUDE..=NOISE_AMPLITUDE);
            let noise_q = self.rng.gen_range(-NOISE_AMPLITUDE..=NOISE_AMPLITUDE);
            *word = RawIq::new(
                (TONE_AMPLITUDE * angle.cos()) as i16 + noise_i,
                (TONE_AMPLITUDE * angle.sin()) as i16 + noise_q,
            );
            self.phase[index] += 1;
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn write_registers(&mut self, addr: u16, data: &[u8]) -> Result<()> {
        let mut state = self.lock();
        state.check_link()?;
        if state.failing_writes > 0 {
            state.failing_writes -= 1;
            return Err(Error::Transport(format!("injected write fault at 0x{addr:04X}")));
        }
        state.writes.push((addr, data.to_vec()));
        for (offset, byte) in data.iter().enumerate() {
            state.registers.insert(addr + offset as u16, *byte);
        }
        Ok(())
    }

    async fn read_registers(&mut self, addr: u16, buf: &mut [u8]) -> Result<()> {
        let mut state = self.lock();
        state.check_link()?;
        if state.failing_reads > 0 {
            state.failing_reads -= 1;
            return Err(Error::Transport(format!("injected read fault at 0x{addr:04X}")));
        }
        for (offset, byte) in buf.iter_mut().enumerate() {
            *byte = state
                .registers
                .get(&(addr + offset as u16))
                .copied()
                .unwrap_or(0);
        }
        Ok(())
    }

    async fn read_samples(&mut self, channel: Channel, buf: &mut [RawIq]) -> Result<SampleRead> {
        let mut state = self.lock();
        state.check_link()?;
        if state.failing_sample_reads > 0 {
            state.failing_sample_reads -= 1;
            return Err(Error::Transport("injected sample read fault".into()));
        }
        if let Some(left) = state.disconnect_after.as_mut() {
            *left -= 1;
        }

        let count = state.max_chunk.map_or(buf.len(), |max| max.min(buf.len()));
        state.fill_samples(channel, &mut buf[..count]);
        state.sample_reads += 1;

        let overflow = state.pending_overflows > 0;
        if overflow {
            state.pending_overflows -= 1;
        }
        Ok(SampleRead { count, overflow })
    }

    async fn board_identity(&mut self) -> Result<BoardIdentity> {
        let state = self.lock();
        state.check_link()?;
        Ok(state.identity.clone())
    }

    async fn close(&mut self) -> Result<()> {
        self.lock().open = false;
        Ok(())
    }
}
