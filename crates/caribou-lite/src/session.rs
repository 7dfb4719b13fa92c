//! Per-channel streaming sessions.
//!
//! A [`SessionManager`] owns the lifecycle of one channel's sample stream:
//!
//! ```text
//! Idle -> Starting -> Streaming -> Stopping -> Idle
//! ```
//!
//! A running session is two execution contexts:
//!
//! - an **acquisition task** that reads one block per sample period from the
//!   IO task, normalizes it, and pushes it into a bounded queue with
//!   `try_send`, so a slow consumer costs dropped blocks instead of stalling
//!   the control path;
//! - a **delivery worker** on the blocking pool that drains the queue and
//!   invokes the user callback.
//!
//! `stop` cancels both and joins them before returning, which is what
//! guarantees no callback runs after `stop` returns. The callback must not
//! call `stop` on its own channel.
//!
//! A session also ends on its own when the link drops or the callback
//! panics. Either way the channel goes back to `Idle` and a
//! [`RadioEvent::StreamTerminated`] is broadcast.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use caribou_core::stream::{self, convert_samples};
use caribou_core::{
    BlockMeta, Channel, DropReason, Error, RadioEvent, Result, SampleBlock, SampleCallback,
    SessionState, SessionStats, StreamEvent,
};

use crate::commands;
use crate::io::IoHandle;
use crate::regs::TrxState;

/// Back-off after an empty FIFO read.
const EMPTY_READ_BACKOFF: Duration = Duration::from_millis(1);

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// State visible to the manager, the acquisition task, and the delivery
/// worker.
#[derive(Debug)]
struct Shared {
    state: Mutex<SessionState>,
    block_size: AtomicUsize,
    delivered: AtomicU64,
    dropped: AtomicU64,
    overflows: AtomicU64,
}

impl Shared {
    fn new() -> Self {
        Shared {
            state: Mutex::new(SessionState::Idle),
            block_size: AtomicUsize::new(0),
            delivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            overflows: AtomicU64::new(0),
        }
    }

    fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: SessionState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn reset(&self, block_size: usize) {
        self.block_size.store(block_size, Ordering::Relaxed);
        self.delivered.store(0, Ordering::Relaxed);
        self.dropped.store(0, Ordering::Relaxed);
        self.overflows.store(0, Ordering::Relaxed);
    }

    fn stats(&self) -> SessionStats {
        SessionStats {
            block_size: self.block_size.load(Ordering::Relaxed),
            blocks_delivered: self.delivered.load(Ordering::Relaxed),
            blocks_dropped: self.dropped.load(Ordering::Relaxed),
            overflows: self.overflows.load(Ordering::Relaxed),
        }
    }
}

/// Handles of a running (or terminated but not yet joined) session.
struct Running {
    cancel: CancellationToken,
    acquire: JoinHandle<()>,
    deliver: JoinHandle<()>,
}

impl Running {
    /// Cancel both contexts and wait for them.
    async fn join(self) {
        self.cancel.cancel();
        self.finish().await;
    }

    /// Wait for both contexts without cancelling, so a queued terminal
    /// event still reaches the callback.
    async fn finish(self) {
        for (task, handle) in [("acquisition", self.acquire), ("delivery", self.deliver)] {
            if let Err(e) = handle.await {
                warn!(task, error = %e, "session task failed");
            }
        }
    }
}

/// Settings fixed at controller construction.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SessionConfig {
    pub native_mtu: usize,
    pub queue_depth: usize,
    pub sample_rate_hz: f64,
}

// ---------------------------------------------------------------------------
// SessionManager
// ---------------------------------------------------------------------------

/// Streaming session owner for one channel.
pub(crate) struct SessionManager {
    channel: Channel,
    io: IoHandle,
    event_tx: broadcast::Sender<RadioEvent>,
    config: SessionConfig,
    slot: tokio::sync::Mutex<Option<Running>>,
    shared: Arc<Shared>,
}

impl SessionManager {
    pub fn new(
        channel: Channel,
        io: IoHandle,
        event_tx: broadcast::Sender<RadioEvent>,
        config: SessionConfig,
    ) -> Self {
        SessionManager {
            channel,
            io,
            event_tx,
            config,
            slot: tokio::sync::Mutex::new(None),
            shared: Arc::new(Shared::new()),
        }
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Counters of the running session.
    pub fn stats(&self) -> Result<SessionStats> {
        match self.shared.state() {
            SessionState::Idle => Err(Error::NotStreaming(self.channel)),
            _ => Ok(self.shared.stats()),
        }
    }

    fn transition(&self, state: SessionState) {
        self.shared.set_state(state);
        let _ = self.event_tx.send(RadioEvent::StreamStateChanged {
            channel: self.channel,
            state,
        });
    }

    /// Start a session.
    ///
    /// Rejected with [`Error::AlreadyStreaming`] unless the channel is idle;
    /// a rejected start never disturbs the running session.
    pub async fn start(&self, block_size: Option<usize>, callback: SampleCallback) -> Result<()> {
        let channel = self.channel;
        let mut slot = self
            .slot
            .try_lock()
            .map_err(|_| Error::AlreadyStreaming(channel))?;
        if self.shared.state() != SessionState::Idle {
            return Err(Error::AlreadyStreaming(channel));
        }
        let block_size = stream::resolve_block_size(block_size, self.config.native_mtu)?;

        // A session that terminated on its own leaves finished handles behind.
        if let Some(stale) = slot.take() {
            stale.finish().await;
        }

        self.shared.reset(block_size);
        self.transition(SessionState::Starting);
        debug!(%channel, block_size, "switching transceiver to RX");
        if let Err(e) = self
            .io
            .write(commands::cmd_set_state(channel, TrxState::Rx))
            .await
        {
            self.transition(SessionState::Idle);
            return Err(e);
        }

        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(self.config.queue_depth);

        let deliver = {
            let cancel = cancel.clone();
            let shared = self.shared.clone();
            tokio::task::spawn_blocking(move || deliver_loop(rx, callback, cancel, shared))
        };

        self.transition(SessionState::Streaming);

        let acquire = tokio::spawn(acquire_loop(Acquisition {
            channel,
            io: self.io.clone(),
            block_size,
            period: Duration::from_secs_f64(block_size as f64 / self.config.sample_rate_hz),
            tx,
            cancel: cancel.clone(),
            shared: self.shared.clone(),
            event_tx: self.event_tx.clone(),
        }));

        *slot = Some(Running {
            cancel,
            acquire,
            deliver,
        });
        info!(%channel, block_size, "stream started");
        Ok(())
    }

    /// Stop the session. Idempotent.
    ///
    /// Returns only after the delivery worker has exited.
    pub async fn stop(&self) -> Result<()> {
        let channel = self.channel;
        let mut slot = self.slot.lock().await;
        let Some(running) = slot.take() else {
            return Ok(());
        };

        if self.shared.state() == SessionState::Idle {
            // Terminated on its own; nothing left to switch off.
            running.finish().await;
            return Ok(());
        }

        self.transition(SessionState::Stopping);
        running.join().await;

        debug!(%channel, "switching transceiver to TRXOFF");
        let result = self
            .io
            .write(commands::cmd_set_state(channel, TrxState::TrxOff))
            .await;
        self.transition(SessionState::Idle);
        info!(%channel, stats = ?self.shared.stats(), "stream stopped");
        result
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if let Some(running) = self.slot.get_mut().take() {
            running.cancel.cancel();
            running.acquire.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// Acquisition
// ---------------------------------------------------------------------------

struct Acquisition {
    channel: Channel,
    io: IoHandle,
    block_size: usize,
    period: Duration,
    tx: mpsc::Sender<Queued>,
    cancel: CancellationToken,
    shared: Arc<Shared>,
    event_tx: broadcast::Sender<RadioEvent>,
}

/// A run of discarded blocks not yet reported to the callback.
#[derive(Debug, Clone, Copy)]
struct Gap {
    first: u64,
    count: u64,
    reason: DropReason,
}

impl Gap {
    fn extend(gap: &mut Option<Gap>, sequence: u64, reason: DropReason) {
        match gap {
            Some(g) => g.count += 1,
            None => {
                *gap = Some(Gap {
                    first: sequence,
                    count: 1,
                    reason,
                })
            }
        }
    }

    fn event(self) -> StreamEvent {
        StreamEvent::Dropped {
            sequence: self.first,
            count: self.count,
            reason: self.reason,
        }
    }
}

/// One slot of the delivery queue. A gap travels with the block that
/// follows it so reporting a drop never needs a queue slot of its own.
enum Queued {
    Block {
        gap: Option<Gap>,
        block: SampleBlock,
    },
    Terminated {
        gap: Option<Gap>,
        reason: String,
    },
}

/// Read exactly `block_size` raw words, tolerating short reads.
async fn read_block(acq: &Acquisition) -> Result<(SampleBlock, bool)> {
    let mut raw = Vec::with_capacity(acq.block_size);
    let mut overflow = false;
    while raw.len() < acq.block_size {
        let chunk = acq
            .io
            .read_samples(acq.channel, acq.block_size - raw.len())
            .await?;
        overflow |= chunk.overflow;
        if chunk.samples.is_empty() {
            tokio::time::sleep(EMPTY_READ_BACKOFF).await;
            continue;
        }
        raw.extend_from_slice(&chunk.samples);
    }
    let block = SampleBlock {
        samples: convert_samples(&raw),
        meta: BlockMeta::default(),
    };
    Ok((block, overflow))
}

async fn acquire_loop(acq: Acquisition) {
    let channel = acq.channel;
    let mut ticker = tokio::time::interval(acq.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut sequence: u64 = 0;
    let mut gap: Option<Gap> = None;

    loop {
        tokio::select! {
            biased;
            _ = acq.cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let read = tokio::select! {
            biased;
            _ = acq.cancel.cancelled() => break,
            r = read_block(&acq) => r,
        };

        match read {
            Ok((mut block, overflow)) => {
                if overflow {
                    acq.shared.overflows.fetch_add(1, Ordering::Relaxed);
                    debug!(%channel, sequence, "FPGA FIFO overflow");
                }
                block.meta = BlockMeta {
                    sequence,
                    timestamp: sequence * acq.block_size as u64,
                    discontinuity: overflow || gap.is_some(),
                    dropped_before: gap.map_or(0, |g| g.count),
                };
                match acq.tx.try_send(Queued::Block { gap, block }) {
                    Ok(()) => {
                        trace!(%channel, sequence, "block queued");
                        gap = None;
                    }
                    Err(TrySendError::Full(_)) => {
                        if gap.is_none() {
                            warn!(%channel, sequence, "delivery queue full, dropping blocks");
                        }
                        acq.shared.dropped.fetch_add(1, Ordering::Relaxed);
                        Gap::extend(&mut gap, sequence, DropReason::Overrun);
                    }
                    Err(TrySendError::Closed(_)) => {
                        if !acq.cancel.is_cancelled() {
                            // Switch off before going Idle so a restart's RX write lands last.
                            if let Err(e) = acq
                                .io
                                .write(commands::cmd_set_state(channel, TrxState::TrxOff))
                                .await
                            {
                                warn!(%channel, error = %e, "failed to switch transceiver off");
                            }
                            terminate(&acq, sequence, &Error::StreamClosed);
                        }
                        break;
                    }
                }
            }
            Err(e) if e.is_fatal() => {
                let reason = terminate(&acq, sequence, &e);
                tokio::select! {
                    biased;
                    _ = acq.cancel.cancelled() => {}
                    _ = acq.tx.send(Queued::Terminated { gap, reason }) => {}
                }
                break;
            }
            Err(e) => {
                warn!(%channel, sequence, error = %e, "transport fault, dropping block");
                acq.shared.dropped.fetch_add(1, Ordering::Relaxed);
                Gap::extend(&mut gap, sequence, DropReason::TransportFault);
            }
        }

        sequence += 1;
    }
    debug!(%channel, "acquisition task exiting");
}

/// Return the channel to `Idle` and announce the end of the stream.
fn terminate(acq: &Acquisition, sequence: u64, cause: &Error) -> String {
    let channel = acq.channel;
    error!(%channel, sequence, error = %cause, "stream terminated");
    let reason = cause.to_string();
    acq.shared.set_state(SessionState::Idle);
    let _ = acq.event_tx.send(RadioEvent::StreamTerminated {
        channel,
        reason: reason.clone(),
    });
    let _ = acq.event_tx.send(RadioEvent::StreamStateChanged {
        channel,
        state: SessionState::Idle,
    });
    reason
}

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

fn deliver_loop(
    mut rx: mpsc::Receiver<Queued>,
    mut callback: SampleCallback,
    cancel: CancellationToken,
    shared: Arc<Shared>,
) {
    while let Some(item) = rx.blocking_recv() {
        let delivered = match item {
            Queued::Block { gap, block } => {
                if cancel.is_cancelled() {
                    break;
                }
                let ok = gap.map_or(true, |g| invoke(&mut callback, g.event()))
                    && invoke(&mut callback, StreamEvent::Samples(block));
                if ok {
                    shared.delivered.fetch_add(1, Ordering::Relaxed);
                }
                ok
            }
            // The terminal event is delivered even after cancellation.
            Queued::Terminated { gap, reason } => {
                if gap.map_or(true, |g| invoke(&mut callback, g.event())) {
                    invoke(&mut callback, StreamEvent::Terminated { reason });
                }
                break;
            }
        };
        if !delivered {
            // Dropping the queue ends the session from the acquisition side.
            break;
        }
    }
}

/// Run the callback, containing a panic. Returns `false` if it panicked.
fn invoke(callback: &mut SampleCallback, event: StreamEvent) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(|| callback(event))) {
        Ok(()) => true,
        Err(_) => {
            error!("sample callback panicked, closing stream");
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
