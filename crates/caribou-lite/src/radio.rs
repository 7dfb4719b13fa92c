//! CaribouRadio -- the [`Radio`] implementation for the dual-channel board.
//!
//! The controller owns one unit per [`Channel`]: the channel's
//! [`ChannelState`] behind an async mutex, and its [`SessionManager`]. Every
//! setter follows the same path:
//!
//! 1. validate against the channel profile (nothing is sent on failure),
//! 2. encode into a register command,
//! 3. submit it to the IO task,
//! 4. commit the new value to the channel state and emit a [`RadioEvent`].
//!
//! The state lock is held across steps 3 and 4 so concurrent setters on one
//! channel commit in the order the hardware saw them. Streaming runs outside
//! that lock, which is why tuning never waits for a block delivery.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

use caribou_core::codec::{self, MATCH_TOLERANCE_HZ};
use caribou_core::profile::{self, GainDomain};
use caribou_core::{
    Channel, Direction, Error, HardwareInfo, Radio, RadioEvent, Result, SampleCallback,
    SensorKey, SensorValue, SessionState, SessionStats, format_bandwidth_khz, format_freq_mhz,
};

use crate::commands::{self, RegRead};
use crate::io::{IoHandle, RadioIo};
use crate::regs::{self, TrxState};
use crate::session::{SessionConfig, SessionManager};
use crate::state::ChannelState;

/// Output level at TX gain 0 dB.
pub const TX_BASELINE_DBM: f64 = -18.0;

/// Settings resolved by [`CaribouBuilder`](crate::builder::CaribouBuilder).
#[derive(Debug, Clone)]
pub(crate) struct RadioConfig {
    pub device_id: u32,
    pub native_mtu: usize,
    pub queue_depth: usize,
    pub event_capacity: usize,
    pub initial_freq_hz: [u64; 2],
}

struct ChannelUnit {
    state: Mutex<ChannelState>,
    session: SessionManager,
}

/// Controller for a CaribouLite board.
///
/// Construct via [`CaribouBuilder`](crate::builder::CaribouBuilder). Dropping
/// the controller cancels any running session and the IO task; call
/// [`detach()`](Radio::detach) first to leave the transceivers idle.
pub struct CaribouRadio {
    io: IoHandle,
    owner: Mutex<RadioIo>,
    units: [ChannelUnit; 2],
    event_tx: broadcast::Sender<RadioEvent>,
    info: HardwareInfo,
    native_mtu: usize,
    attached: AtomicBool,
}

impl Drop for CaribouRadio {
    fn drop(&mut self) {
        let owner = self.owner.get_mut();
        owner.cancel.cancel();
        owner.task.abort();
    }
}

impl CaribouRadio {
    /// Read the board identity, bring both channels to a known idle state,
    /// and return the attached controller.
    pub(crate) async fn attach(owner: RadioIo, config: RadioConfig) -> Result<Self> {
        let io = owner.handle.clone();
        let (event_tx, _) = broadcast::channel(config.event_capacity);

        let board = match io.identity().await {
            Ok(board) => board,
            Err(e) => {
                owner.cancel.cancel();
                return Err(e);
            }
        };
        let info = HardwareInfo {
            device_id: config.device_id,
            board,
        };

        let session_config = SessionConfig {
            native_mtu: config.native_mtu,
            queue_depth: config.queue_depth,
            sample_rate_hz: profile::SAMPLE_RATE_HZ,
        };
        let unit = |channel: Channel| ChannelUnit {
            state: Mutex::new(ChannelState::new(
                channel,
                config.initial_freq_hz[channel.index()],
                codec::table(Direction::Rx).fallback().hz,
                codec::table(Direction::Tx).fallback().hz,
            )),
            session: SessionManager::new(channel, io.clone(), event_tx.clone(), session_config),
        };

        let radio = CaribouRadio {
            units: [unit(Channel::Sub1G), unit(Channel::Wideband6G)],
            io,
            owner: Mutex::new(owner),
            event_tx,
            info,
            native_mtu: config.native_mtu,
            attached: AtomicBool::new(true),
        };

        for channel in Channel::ALL {
            radio.init_channel(channel).await?;
        }

        info!(
            device_id = radio.info.device_id,
            serial = radio.info.board.serial_number,
            product = %radio.info.board.product_name,
            "attached"
        );
        let _ = radio.event_tx.send(RadioEvent::Attached);
        Ok(radio)
    }

    /// Push the initial channel state to hardware.
    async fn init_channel(&self, channel: Channel) -> Result<()> {
        let state = self.unit(channel).state.lock().await;
        debug!(%channel, "initializing channel");
        self.io
            .write(commands::cmd_set_state(channel, TrxState::TrxOff))
            .await?;
        for direction in Direction::ALL {
            let d = state.dir(direction);
            self.io
                .write(commands::cmd_set_frequency(channel, direction, d.freq_hz)?)
                .await?;
            let code = codec::to_hardware_code(direction, d.bandwidth_hz);
            self.io
                .write(commands::cmd_set_bandwidth(channel, direction, code))
                .await?;
            self.io
                .write(commands::cmd_set_sample_rate(channel, direction, regs::SR_4000KHZ))
                .await?;
        }
        self.io.write(commands::cmd_set_agc(channel, false)).await?;
        self.io.write(commands::cmd_set_rx_gain(channel, 0)?).await?;
        self.io
            .write(commands::cmd_set_tx_power(channel, tx_gain_to_dbm(0.0))?)
            .await?;
        Ok(())
    }

    fn unit(&self, channel: Channel) -> &ChannelUnit {
        &self.units[channel.index()]
    }

    fn emit(&self, event: RadioEvent) {
        let _ = self.event_tx.send(event);
    }

    async fn read_reg(&self, cmd: RegRead) -> Result<Vec<u8>> {
        self.io.read(cmd).await
    }

    /// Snapshot of a channel's committed state.
    pub async fn channel_state(&self, channel: Channel) -> ChannelState {
        self.unit(channel).state.lock().await.clone()
    }
}

/// TX gain in dB to output power in dBm.
fn tx_gain_to_dbm(gain_db: f64) -> i16 {
    (gain_db + TX_BASELINE_DBM).round() as i16
}

/// Output power in dBm back to TX gain in dB.
fn dbm_to_tx_gain(dbm: i16) -> f64 {
    f64::from(dbm) - TX_BASELINE_DBM
}

#[async_trait]
impl Radio for CaribouRadio {
    fn hardware_info(&self) -> &HardwareInfo {
        &self.info
    }

    fn native_mtu(&self, _channel: Channel) -> usize {
        self.native_mtu
    }

    // -- tuning -------------------------------------------------------------

    async fn get_frequency(&self, channel: Channel, direction: Direction) -> Result<u64> {
        Ok(self.unit(channel).state.lock().await.dir(direction).freq_hz)
    }

    async fn set_frequency(
        &self,
        channel: Channel,
        direction: Direction,
        freq_hz: u64,
    ) -> Result<()> {
        profile::validate_frequency(channel, direction, freq_hz)?;
        let cmd = commands::cmd_set_frequency(channel, direction, freq_hz)?;

        let mut state = self.unit(channel).state.lock().await;
        debug!(%channel, %direction, freq = %format_freq_mhz(freq_hz), "setting frequency");
        self.io.write(cmd).await?;
        state.dir_mut(direction).freq_hz = freq_hz;
        self.emit(RadioEvent::FrequencyChanged {
            channel,
            direction,
            freq_hz,
        });
        Ok(())
    }

    // -- gain ---------------------------------------------------------------

    async fn get_gain(&self, channel: Channel, direction: Direction) -> Result<f64> {
        let state = self.unit(channel).state.lock().await;
        match direction {
            Direction::Rx if state.agc_enabled => {
                debug!(%channel, "reading AGC gain from hardware");
                let data = self.read_reg(commands::cmd_read_rx_gain(channel)).await?;
                commands::parse_rx_gain(&data)
            }
            Direction::Rx => Ok(state.rx.gain_db),
            Direction::Tx => {
                let data = self.read_reg(commands::cmd_read_tx_power(channel)).await?;
                Ok(dbm_to_tx_gain(commands::parse_tx_power(&data)?))
            }
        }
    }

    async fn set_gain(&self, channel: Channel, direction: Direction, gain_db: f64) -> Result<()> {
        let domain = profile::profile(channel, direction).gain;
        let gain_db = domain.quantize(gain_db)?;
        let cmd = match direction {
            Direction::Rx => commands::cmd_set_rx_gain(channel, domain.index_of(gain_db)?)?,
            Direction::Tx => commands::cmd_set_tx_power(channel, tx_gain_to_dbm(gain_db))?,
        };

        let mut state = self.unit(channel).state.lock().await;
        debug!(%channel, %direction, gain_db, "setting gain");
        self.io.write(cmd).await?;
        state.dir_mut(direction).gain_db = gain_db;
        self.emit(RadioEvent::GainChanged {
            channel,
            direction,
            gain_db,
        });
        Ok(())
    }

    async fn get_gain_mode(&self, channel: Channel) -> Result<bool> {
        let data = self.read_reg(commands::cmd_read_agc(channel)).await?;
        commands::parse_agc(&data)
    }

    async fn set_gain_mode(&self, channel: Channel, automatic: bool) -> Result<()> {
        let mut state = self.unit(channel).state.lock().await;
        debug!(%channel, automatic, "setting gain mode");
        // AGC starts from the last manual gain, and leaving AGC restores it.
        let manual = commands::cmd_set_rx_gain(channel, GainDomain::RX.index_of(state.rx.gain_db)?)?;
        if automatic {
            self.io.write(manual).await?;
            self.io.write(commands::cmd_set_agc(channel, true)).await?;
        } else {
            self.io.write(commands::cmd_set_agc(channel, false)).await?;
            self.io.write(manual).await?;
        }
        state.agc_enabled = automatic;
        self.emit(RadioEvent::GainModeChanged { channel, automatic });
        Ok(())
    }

    // -- filters and rate ---------------------------------------------------

    async fn get_bandwidth(&self, channel: Channel, direction: Direction) -> Result<f64> {
        Ok(self.unit(channel).state.lock().await.dir(direction).bandwidth_hz)
    }

    async fn set_bandwidth(
        &self,
        channel: Channel,
        direction: Direction,
        bw_hz: f64,
    ) -> Result<()> {
        let table = codec::table(direction);
        let code = table.to_hardware_code(bw_hz);
        let applied = table.to_engineering_value(code)?;
        if (applied - bw_hz).abs() > MATCH_TOLERANCE_HZ {
            warn!(
                %channel,
                %direction,
                requested = bw_hz,
                applied = %format_bandwidth_khz(applied),
                "bandwidth not in table, using widest setting"
            );
        }

        let mut state = self.unit(channel).state.lock().await;
        debug!(%channel, %direction, code, "setting bandwidth");
        self.io
            .write(commands::cmd_set_bandwidth(channel, direction, code))
            .await?;
        state.dir_mut(direction).bandwidth_hz = applied;
        self.emit(RadioEvent::BandwidthChanged {
            channel,
            direction,
            bandwidth_hz: applied,
        });
        Ok(())
    }

    async fn get_sample_rate(&self, channel: Channel, direction: Direction) -> Result<f64> {
        Ok(self.unit(channel).state.lock().await.dir(direction).sample_rate_hz)
    }

    async fn set_sample_rate(
        &self,
        channel: Channel,
        direction: Direction,
        rate_hz: f64,
    ) -> Result<()> {
        profile::validate_sample_rate(rate_hz)?;

        let mut state = self.unit(channel).state.lock().await;
        debug!(%channel, %direction, rate_hz, "setting sample rate");
        self.io
            .write(commands::cmd_set_sample_rate(channel, direction, regs::SR_4000KHZ))
            .await?;
        state.dir_mut(direction).sample_rate_hz = profile::SAMPLE_RATE_HZ;
        Ok(())
    }

    // -- sensors ------------------------------------------------------------

    async fn read_sensor(
        &self,
        channel: Channel,
        direction: Direction,
        key: SensorKey,
    ) -> Result<SensorValue> {
        if !profile::profile(channel, direction).has_sensor(key) {
            return Err(Error::UnknownKey(format!("{key} on {channel} {direction}")));
        }
        debug!(%channel, %direction, %key, "reading sensor");
        match key {
            SensorKey::Rssi => {
                let data = self.read_reg(commands::cmd_read_rssi(channel)).await?;
                Ok(SensorValue::Float(commands::parse_dbm(&data)?))
            }
            SensorKey::Energy => {
                let data = self.read_reg(commands::cmd_read_energy(channel)).await?;
                Ok(SensorValue::Float(commands::parse_dbm(&data)?))
            }
            SensorKey::PllLockModem => {
                let data = self.read_reg(commands::cmd_read_pll_lock(channel)).await?;
                let locked = commands::parse_lock(&data)?;
                self.unit(channel).state.lock().await.pll_lock_modem = locked;
                Ok(SensorValue::Bool(locked))
            }
            SensorKey::PllLockMixer => {
                let data = self.read_reg(commands::cmd_read_mixer_lock(channel)).await?;
                let locked = commands::parse_lock(&data)?;
                self.unit(channel).state.lock().await.pll_lock_mixer = Some(locked);
                Ok(SensorValue::Bool(locked))
            }
        }
    }

    // -- streaming ----------------------------------------------------------

    async fn start_stream(
        &self,
        channel: Channel,
        block_size: Option<usize>,
        callback: SampleCallback,
    ) -> Result<()> {
        self.unit(channel).session.start(block_size, callback).await
    }

    async fn stop_stream(&self, channel: Channel) -> Result<()> {
        self.unit(channel).session.stop().await
    }

    async fn stream_state(&self, channel: Channel) -> SessionState {
        self.unit(channel).session.state()
    }

    async fn stream_stats(&self, channel: Channel) -> Result<SessionStats> {
        self.unit(channel).session.stats()
    }

    // -- lifecycle ----------------------------------------------------------

    fn subscribe(&self) -> Result<broadcast::Receiver<RadioEvent>> {
        Ok(self.event_tx.subscribe())
    }

    async fn detach(&self) -> Result<()> {
        if !self.attached.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        info!(device_id = self.info.device_id, "detaching");

        let mut first_err = None;
        for channel in Channel::ALL {
            if let Err(e) = self.unit(channel).session.stop().await {
                warn!(%channel, error = %e, "stopping stream during detach failed");
                first_err.get_or_insert(e);
            }
            // A session that was running already switched to TRXOFF.
            if let Err(e) = self
                .io
                .write(commands::cmd_set_state(channel, TrxState::TrxOff))
                .await
            {
                warn!(%channel, error = %e, "idling transceiver during detach failed");
                first_err.get_or_insert(e);
            }
        }
        if let Err(e) = self.owner.lock().await.close().await {
            first_err.get_or_insert(e);
        }
        self.emit(RadioEvent::Detached);

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::CaribouBuilder;
    use caribou_core::{BoardIdentity, FrequencyRange, StreamEvent};
    use caribou_test_harness::MockTransport;
    use std::sync::Arc;
    use std::sync::atomic::AtomicU64;
    use std::time::Duration;

    async fn radio() -> (CaribouRadio, MockTransport) {
        let mock = MockTransport::new();
        let radio = CaribouBuilder::new()
            .build_with_transport(Box::new(mock.clone()))
            .await
            .unwrap();
        mock.clear_writes();
        (radio, mock)
    }

    fn reg(channel: Channel, offset: u16) -> u16 {
        regs::addr(channel, offset)
    }

    // -- attach tests -------------------------------------------------------

    #[tokio::test]
    async fn attach_reads_identity_and_idles_channels() {
        let mock = MockTransport::new();
        mock.set_identity(BoardIdentity {
            vendor_name: "CaribouLabs LTD".into(),
            product_name: "CaribouLite RPI Hat".into(),
            hardware_revision: "0x0002".into(),
            fpga_revision: 3,
            serial_number: 0x00C0_FFEE,
        });
        let radio = CaribouBuilder::new()
            .device_id(3)
            .build_with_transport(Box::new(mock.clone()))
            .await
            .unwrap();

        let map = radio.hardware_info().to_map();
        assert_eq!(map["device_id"], "3");
        assert_eq!(map["product_name"], "CaribouLite RPI Hat");
        assert_eq!(map["hardware_revision"], "0x0002");
        assert_eq!(map["fpga_revision"], "3");
        assert_eq!(map["serial_number"], 0x00C0_FFEE_u32.to_string());
        for channel in Channel::ALL {
            assert_eq!(mock.register(reg(channel, regs::STATE)), TrxState::TrxOff as u8);
            assert_eq!(mock.register(reg(channel, regs::RX_SR)), regs::SR_4000KHZ);
        }
        assert_eq!(
            radio.get_frequency(Channel::Sub1G, Direction::Rx).await.unwrap(),
            900_000_000
        );
        assert_eq!(
            radio.get_frequency(Channel::Wideband6G, Direction::Tx).await.unwrap(),
            2_400_000_000
        );
    }

    #[tokio::test]
    async fn attach_fails_without_link() {
        let mock = MockTransport::new();
        mock.disconnect();
        let result = CaribouBuilder::new()
            .build_with_transport(Box::new(mock))
            .await;
        assert!(matches!(result, Err(Error::ConnectionLost)));
    }

    // -- frequency tests ----------------------------------------------------

    #[tokio::test]
    async fn set_frequency_in_band() {
        let (radio, mock) = radio().await;
        radio
            .set_frequency(Channel::Sub1G, Direction::Rx, 920_000_000)
            .await
            .unwrap();
        assert_eq!(
            radio.get_frequency(Channel::Sub1G, Direction::Rx).await.unwrap(),
            920_000_000
        );
        let bytes = regs::encode_frequency(920_000_000).unwrap();
        assert_eq!(mock.writes(), vec![(reg(Channel::Sub1G, regs::FREQ_RX), bytes)]);
    }

    #[tokio::test]
    async fn set_frequency_in_gap_is_rejected_without_io() {
        let (radio, mock) = radio().await;
        let err = radio
            .set_frequency(Channel::Sub1G, Direction::Rx, 600_000_000)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::OutOfRange(_)));
        assert!(mock.writes().is_empty());
        assert_eq!(
            radio.get_frequency(Channel::Sub1G, Direction::Rx).await.unwrap(),
            900_000_000
        );
    }

    #[tokio::test]
    async fn frequency_boundaries() {
        let (radio, _mock) = radio().await;
        for channel in Channel::ALL {
            for FrequencyRange { low_hz, high_hz } in
                radio.get_frequency_range(channel, Direction::Tx)
            {
                radio.set_frequency(channel, Direction::Tx, low_hz).await.unwrap();
                radio.set_frequency(channel, Direction::Tx, high_hz).await.unwrap();
                assert!(
                    radio
                        .set_frequency(channel, Direction::Tx, high_hz + 1)
                        .await
                        .is_err()
                );
            }
        }
    }

    #[tokio::test]
    async fn transport_failure_leaves_state_unchanged() {
        let (radio, mock) = radio().await;
        mock.fail_next_writes(1);
        let err = radio
            .set_frequency(Channel::Wideband6G, Direction::Rx, 1_000_000_000)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(
            radio.get_frequency(Channel::Wideband6G, Direction::Rx).await.unwrap(),
            2_400_000_000
        );
    }

    #[tokio::test]
    async fn named_frequency() {
        let (radio, _mock) = radio().await;
        assert_eq!(radio.list_frequencies(Channel::Sub1G, Direction::Rx), vec!["RF"]);
        radio
            .set_frequency_named(Channel::Sub1G, Direction::Rx, "RF", 433_920_000)
            .await
            .unwrap();
        assert_eq!(
            radio
                .get_frequency_named(Channel::Sub1G, Direction::Rx, "RF")
                .await
                .unwrap(),
            433_920_000
        );
        assert!(matches!(
            radio
                .set_frequency_named(Channel::Sub1G, Direction::Rx, "LO", 433_920_000)
                .await,
            Err(Error::UnknownName(_))
        ));
        assert!(matches!(
            radio.get_frequency_range_named(Channel::Sub1G, Direction::Rx, "BB"),
            Err(Error::UnknownName(_))
        ));
    }

    // -- gain tests ---------------------------------------------------------

    #[tokio::test]
    async fn tx_gain_round_trip_with_baseline() {
        let (radio, mock) = radio().await;
        radio
            .set_gain(Channel::Sub1G, Direction::Tx, 12.0)
            .await
            .unwrap();
        assert_eq!(radio.get_gain(Channel::Sub1G, Direction::Tx).await.unwrap(), 12.0);
        // 12 dB gain = -6 dBm output = field 12.
        assert_eq!(mock.register(reg(Channel::Sub1G, regs::TX_POWER)), 12);
    }

    #[tokio::test]
    async fn tx_gain_is_read_back_from_hardware() {
        let (radio, mock) = radio().await;
        assert_eq!(radio.get_gain(Channel::Wideband6G, Direction::Tx).await.unwrap(), 0.0);

        // Field 28 = +10 dBm = 28 dB over the -18 dBm baseline.
        mock.set_register(reg(Channel::Wideband6G, regs::TX_POWER), 28);
        assert_eq!(radio.get_gain(Channel::Wideband6G, Direction::Tx).await.unwrap(), 28.0);

        mock.set_register(reg(Channel::Wideband6G, regs::TX_POWER), 40);
        assert!(matches!(
            radio.get_gain(Channel::Wideband6G, Direction::Tx).await,
            Err(Error::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn tx_gain_rounds_to_step() {
        let (radio, _mock) = radio().await;
        radio
            .set_gain(Channel::Wideband6G, Direction::Tx, 7.4)
            .await
            .unwrap();
        assert_eq!(
            radio.get_gain(Channel::Wideband6G, Direction::Tx).await.unwrap(),
            7.0
        );
    }

    #[tokio::test]
    async fn gain_out_of_domain() {
        let (radio, mock) = radio().await;
        assert!(matches!(
            radio.set_gain(Channel::Sub1G, Direction::Rx, 70.0).await,
            Err(Error::OutOfRange(_))
        ));
        assert!(matches!(
            radio.set_gain(Channel::Sub1G, Direction::Tx, 32.0).await,
            Err(Error::OutOfRange(_))
        ));
        assert!(mock.writes().is_empty());
    }

    #[tokio::test]
    async fn rx_gain_writes_step_index() {
        let (radio, mock) = radio().await;
        radio
            .set_gain(Channel::Sub1G, Direction::Rx, 50.0)
            .await
            .unwrap();
        assert_eq!(radio.get_gain(Channel::Sub1G, Direction::Rx).await.unwrap(), 51.0);
        assert_eq!(mock.register(reg(Channel::Sub1G, regs::RX_GAIN)), 17);
    }

    #[tokio::test]
    async fn agc_reports_hardware_gain() {
        let (radio, mock) = radio().await;
        radio
            .set_gain(Channel::Sub1G, Direction::Rx, 30.0)
            .await
            .unwrap();
        radio.set_gain_mode(Channel::Sub1G, true).await.unwrap();
        assert!(radio.get_gain_mode(Channel::Sub1G).await.unwrap());

        // The AGC loop moves the gain on its own.
        mock.set_register(reg(Channel::Sub1G, regs::RX_GAIN), 4);
        assert_eq!(radio.get_gain(Channel::Sub1G, Direction::Rx).await.unwrap(), 12.0);

        radio.set_gain_mode(Channel::Sub1G, false).await.unwrap();
        assert_eq!(radio.get_gain(Channel::Sub1G, Direction::Rx).await.unwrap(), 30.0);
        assert_eq!(mock.register(reg(Channel::Sub1G, regs::RX_GAIN)), 10);
    }

    #[tokio::test]
    async fn enabling_agc_seeds_with_manual_gain() {
        let (radio, mock) = radio().await;
        radio
            .set_gain(Channel::Wideband6G, Direction::Rx, 42.0)
            .await
            .unwrap();
        mock.clear_writes();
        radio.set_gain_mode(Channel::Wideband6G, true).await.unwrap();
        assert_eq!(
            mock.writes(),
            vec![
                (reg(Channel::Wideband6G, regs::RX_GAIN), vec![14]),
                (reg(Channel::Wideband6G, regs::AGC_CTRL), vec![1]),
            ]
        );
        assert!(radio.channel_state(Channel::Wideband6G).await.agc_enabled);
    }

    #[tokio::test]
    async fn named_gains_do_not_exist() {
        let (radio, _mock) = radio().await;
        assert!(radio.list_gains(Channel::Sub1G, Direction::Rx).is_empty());
        assert!(matches!(
            radio.get_gain_named(Channel::Sub1G, Direction::Rx, "LNA").await,
            Err(Error::UnknownName(_))
        ));
        assert!(matches!(
            radio
                .set_gain_named(Channel::Sub1G, Direction::Tx, "PA", 3.0)
                .await,
            Err(Error::UnknownName(_))
        ));
        for channel in Channel::ALL {
            assert!(radio.has_gain_mode(channel, Direction::Rx));
            assert!(!radio.has_gain_mode(channel, Direction::Tx));
        }
        assert_eq!(radio.get_gain_range(Channel::Sub1G, Direction::Rx), GainDomain::RX);
    }

    // -- bandwidth and sample rate tests ------------------------------------

    #[tokio::test]
    async fn bandwidth_snaps_and_falls_back() {
        let (radio, mock) = radio().await;
        radio
            .set_bandwidth(Channel::Sub1G, Direction::Rx, 999_999.0)
            .await
            .unwrap();
        assert_eq!(
            radio.get_bandwidth(Channel::Sub1G, Direction::Rx).await.unwrap(),
            1_000_000.0
        );
        assert_eq!(mock.register(reg(Channel::Sub1G, regs::RX_BW)), 0x8);

        radio
            .set_bandwidth(Channel::Sub1G, Direction::Rx, 50_000_000.0)
            .await
            .unwrap();
        assert_eq!(
            radio.get_bandwidth(Channel::Sub1G, Direction::Rx).await.unwrap(),
            2_000_000.0
        );

        radio
            .set_bandwidth(Channel::Sub1G, Direction::Tx, 315_000.0)
            .await
            .unwrap();
        assert_eq!(mock.register(reg(Channel::Sub1G, regs::TX_CUTOFF)), 0x6);
    }

    #[tokio::test]
    async fn bandwidth_lists_ascend() {
        let (radio, _mock) = radio().await;
        for direction in Direction::ALL {
            let list = radio.list_bandwidths(Channel::Wideband6G, direction);
            assert_eq!(list.len(), 12);
            assert!(list.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[tokio::test]
    async fn single_sample_rate() {
        let (radio, _mock) = radio().await;
        assert_eq!(
            radio.list_sample_rates(Channel::Sub1G, Direction::Rx),
            vec![4_000_000.0]
        );
        radio
            .set_sample_rate(Channel::Sub1G, Direction::Rx, 4_000_000.0)
            .await
            .unwrap();
        assert!(matches!(
            radio
                .set_sample_rate(Channel::Sub1G, Direction::Rx, 2_000_000.0)
                .await,
            Err(Error::Unsupported(_))
        ));
        assert_eq!(
            radio.get_sample_rate(Channel::Sub1G, Direction::Rx).await.unwrap(),
            4_000_000.0
        );
    }

    // -- sensor tests -------------------------------------------------------

    #[tokio::test]
    async fn rssi_reads_latest_hardware_value() {
        let (radio, mock) = radio().await;
        mock.set_register(reg(Channel::Sub1G, regs::RSSI), (-90i8) as u8);
        assert_eq!(
            radio
                .read_sensor(Channel::Sub1G, Direction::Rx, SensorKey::Rssi)
                .await
                .unwrap(),
            SensorValue::Float(-90.0)
        );
        mock.set_register(reg(Channel::Sub1G, regs::RSSI), (-60i8) as u8);
        assert_eq!(
            radio
                .read_sensor_by_name(Channel::Sub1G, Direction::Rx, "RSSI")
                .await
                .unwrap(),
            SensorValue::Float(-60.0)
        );
    }

    #[tokio::test]
    async fn sensor_gating() {
        let (radio, mock) = radio().await;
        assert!(matches!(
            radio
                .read_sensor(Channel::Sub1G, Direction::Tx, SensorKey::Energy)
                .await,
            Err(Error::UnknownKey(_))
        ));
        assert!(matches!(
            radio
                .read_sensor(Channel::Sub1G, Direction::Rx, SensorKey::PllLockMixer)
                .await,
            Err(Error::UnknownKey(_))
        ));
        assert!(matches!(
            radio
                .read_sensor_by_name(Channel::Sub1G, Direction::Rx, "TEMP")
                .await,
            Err(Error::UnknownKey(_))
        ));

        mock.set_register(reg(Channel::Wideband6G, regs::MIXER_STATUS), 0);
        assert_eq!(
            radio
                .read_sensor(Channel::Wideband6G, Direction::Rx, SensorKey::PllLockMixer)
                .await
                .unwrap(),
            SensorValue::Bool(false)
        );
        assert_eq!(
            radio.channel_state(Channel::Wideband6G).await.pll_lock_mixer,
            Some(false)
        );
        assert_eq!(
            radio
                .read_sensor(Channel::Wideband6G, Direction::Tx, SensorKey::PllLockModem)
                .await
                .unwrap(),
            SensorValue::Bool(true)
        );
    }

    #[tokio::test]
    async fn sensor_discovery() {
        let (radio, _mock) = radio().await;
        assert_eq!(
            radio.list_sensors(Channel::Sub1G, Direction::Rx),
            vec![SensorKey::Rssi, SensorKey::Energy, SensorKey::PllLockModem]
        );
        let info = radio
            .sensor_info(Channel::Wideband6G, Direction::Rx, SensorKey::Energy)
            .unwrap();
        assert_eq!(info.range, Some((-127.0, 4.0)));
        assert_eq!(
            radio.list_antennas(Channel::Wideband6G, Direction::Tx),
            vec!["TX/RX 6GHz"]
        );
        assert_eq!(radio.get_antenna(Channel::Sub1G, Direction::Rx), "TX/RX Sub1GHz");
    }

    // -- event tests --------------------------------------------------------

    #[tokio::test]
    async fn setters_emit_events() {
        let (radio, _mock) = radio().await;
        let mut events = radio.subscribe().unwrap();

        radio
            .set_frequency(Channel::Wideband6G, Direction::Rx, 1_090_000_000)
            .await
            .unwrap();
        radio
            .set_bandwidth(Channel::Wideband6G, Direction::Rx, 3_000_000.0)
            .await
            .unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            RadioEvent::FrequencyChanged {
                channel: Channel::Wideband6G,
                direction: Direction::Rx,
                freq_hz: 1_090_000_000,
            }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            RadioEvent::BandwidthChanged {
                channel: Channel::Wideband6G,
                direction: Direction::Rx,
                bandwidth_hz: 2_000_000.0,
            }
        );
    }

    // -- streaming tests ----------------------------------------------------

    #[tokio::test]
    async fn channels_stream_independently() {
        let (radio, _mock) = radio().await;
        let counts: [Arc<AtomicU64>; 2] = Default::default();
        for channel in Channel::ALL {
            let count = counts[channel.index()].clone();
            radio
                .start_stream(
                    channel,
                    Some(512),
                    Box::new(move |ev| {
                        if matches!(ev, StreamEvent::Samples(_)) {
                            count.fetch_add(1, Ordering::SeqCst);
                        }
                    }),
                )
                .await
                .unwrap();
        }

        // Tuning while streaming takes effect without a restart.
        radio
            .set_frequency(Channel::Sub1G, Direction::Rx, 868_000_000)
            .await
            .unwrap();
        assert_eq!(radio.stream_state(Channel::Sub1G).await, SessionState::Streaming);

        while counts.iter().any(|c| c.load(Ordering::SeqCst) < 3) {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        radio.stop_stream(Channel::Sub1G).await.unwrap();
        assert_eq!(radio.stream_state(Channel::Sub1G).await, SessionState::Idle);
        assert_eq!(
            radio.stream_state(Channel::Wideband6G).await,
            SessionState::Streaming
        );
        assert!(radio.stream_stats(Channel::Wideband6G).await.unwrap().blocks_delivered >= 3);
        assert!(matches!(
            radio.stream_stats(Channel::Sub1G).await,
            Err(Error::NotStreaming(Channel::Sub1G))
        ));
        radio.stop_stream(Channel::Wideband6G).await.unwrap();
    }

    // -- lifecycle tests ----------------------------------------------------

    #[tokio::test]
    async fn detach_stops_sessions_and_closes_transport() {
        let (radio, mock) = radio().await;
        radio
            .start_stream(Channel::Wideband6G, Some(256), Box::new(|_| {}))
            .await
            .unwrap();

        radio.detach().await.unwrap();
        assert_eq!(
            radio.stream_state(Channel::Wideband6G).await,
            SessionState::Idle
        );
        assert!(!mock.is_open());
        for channel in Channel::ALL {
            assert_eq!(mock.register(reg(channel, regs::STATE)), TrxState::TrxOff as u8);
        }

        // Second detach is a no-op; hardware calls now fail.
        radio.detach().await.unwrap();
        assert!(matches!(
            radio.set_gain(Channel::Sub1G, Direction::Tx, 1.0).await,
            Err(Error::NotConnected)
        ));
    }

    #[tokio::test]
    async fn drop_cancels_running_session() {
        let (radio, mock) = radio().await;
        radio
            .start_stream(Channel::Sub1G, Some(256), Box::new(|_| {}))
            .await
            .unwrap();
        while mock.sample_reads() < 2 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        drop(radio);
        tokio::time::sleep(Duration::from_millis(20)).await;
        let reads = mock.sample_reads();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(mock.sample_reads(), reads);
    }
}
