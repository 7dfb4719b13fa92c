//! IO task that owns the board transport.
//!
//! Every hardware access, whether a control-path register write or a
//! streaming block read, is a [`Request`] sent to one task that owns the
//! [`Transport`] exclusively. Requests are executed one at a time, so a
//! register write can never interleave with a sample read, and no caller
//! ever holds a lock across an await point.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use caribou_core::error::{Error, Result};
use caribou_core::stream::RawIq;
use caribou_core::transport::Transport;
use caribou_core::types::{BoardIdentity, Channel};

use crate::commands::{RegRead, RegWrite};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Depth of the request queue in front of the IO task.
const REQUEST_QUEUE: usize = 64;

/// A chunk of raw samples read from the FPGA.
#[derive(Debug, Default)]
pub(crate) struct RawChunk {
    pub samples: Vec<RawIq>,
    pub overflow: bool,
}

/// A request sent to the IO task.
pub(crate) enum Request {
    Write {
        cmd: RegWrite,
        reply: oneshot::Sender<Result<()>>,
    },
    Read {
        cmd: RegRead,
        reply: oneshot::Sender<Result<Vec<u8>>>,
    },
    ReadSamples {
        channel: Channel,
        max: usize,
        reply: oneshot::Sender<Result<RawChunk>>,
    },
    Identity {
        reply: oneshot::Sender<Result<BoardIdentity>>,
    },
    /// Close the transport and exit the task.
    Close {
        reply: oneshot::Sender<Result<()>>,
    },
}

impl Request {
    /// The caller stopped waiting for the reply, usually after a timeout.
    fn is_abandoned(&self) -> bool {
        match self {
            Request::Write { reply, .. } => reply.is_closed(),
            Request::Read { reply, .. } => reply.is_closed(),
            Request::ReadSamples { reply, .. } => reply.is_closed(),
            Request::Identity { reply } => reply.is_closed(),
            Request::Close { .. } => false,
        }
    }
}

/// Clonable handle for submitting requests to the IO task.
#[derive(Clone)]
pub(crate) struct IoHandle {
    cmd_tx: mpsc::Sender<Request>,
    timeout: Duration,
}

impl IoHandle {
    async fn submit<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<Result<T>>) -> Request,
    ) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(make(reply_tx))
            .await
            .map_err(|_| Error::NotConnected)?;

        // The IO task enforces the transport-level timeout; this one also
        // covers time spent queued behind other requests.
        match tokio::time::timeout(self.timeout * 2, reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::NotConnected),
            Err(_) => Err(Error::Timeout),
        }
    }

    /// Write registers.
    pub async fn write(&self, cmd: RegWrite) -> Result<()> {
        self.submit(|reply| Request::Write { cmd, reply }).await
    }

    /// Read registers.
    pub async fn read(&self, cmd: RegRead) -> Result<Vec<u8>> {
        self.submit(|reply| Request::Read { cmd, reply }).await
    }

    /// Read up to `max` raw samples from a channel's FIFO.
    pub async fn read_samples(&self, channel: Channel, max: usize) -> Result<RawChunk> {
        self.submit(|reply| Request::ReadSamples {
            channel,
            max,
            reply,
        })
        .await
    }

    /// Read the board identity.
    pub async fn identity(&self) -> Result<BoardIdentity> {
        self.submit(|reply| Request::Identity { reply }).await
    }
}

/// Owner of the IO task. Stored inside `CaribouRadio`.
pub(crate) struct RadioIo {
    pub handle: IoHandle,
    pub cancel: CancellationToken,
    pub task: JoinHandle<()>,
}

impl RadioIo {
    /// Close the transport and wait for the IO task to exit.
    pub async fn close(&mut self) -> Result<()> {
        let result = self.handle.submit(|reply| Request::Close { reply }).await;
        self.cancel.cancel();
        (&mut self.task).await.ok();
        match result {
            // Already gone counts as closed.
            Err(Error::NotConnected) => Ok(()),
            other => other,
        }
    }
}

// ---------------------------------------------------------------------------
// Spawn
// ---------------------------------------------------------------------------

/// Spawn the IO task. Returns the owner with a handle for submitting requests.
pub(crate) fn spawn_io_task(transport: Box<dyn Transport>, timeout: Duration) -> RadioIo {
    let (cmd_tx, cmd_rx) = mpsc::channel::<Request>(REQUEST_QUEUE);
    let cancel = CancellationToken::new();

    let task = tokio::spawn(io_loop(transport, timeout, cmd_rx, cancel.clone()));

    RadioIo {
        handle: IoHandle { cmd_tx, timeout },
        cancel,
        task,
    }
}

// ---------------------------------------------------------------------------
// IO loop
// ---------------------------------------------------------------------------

async fn with_timeout<T>(
    timeout: Duration,
    fut: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(timeout, fut)
        .await
        .unwrap_or(Err(Error::Timeout))
}

/// The main IO loop. Runs as a spawned Tokio task.
async fn io_loop(
    mut transport: Box<dyn Transport>,
    timeout: Duration,
    mut cmd_rx: mpsc::Receiver<Request>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!("IO task cancelled");
                break;
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(req) if req.is_abandoned() => {
                        trace!("skipping request whose caller gave up");
                    }
                    Some(Request::Write { cmd, reply }) => {
                        trace!(addr = cmd.addr, len = cmd.data.len(), "register write");
                        let result = with_timeout(
                            timeout,
                            transport.write_registers(cmd.addr, &cmd.data),
                        ).await;
                        let _ = reply.send(result);
                    }
                    Some(Request::Read { cmd, reply }) => {
                        trace!(addr = cmd.addr, len = cmd.len, "register read");
                        let mut buf = vec![0u8; cmd.len];
                        let result = with_timeout(
                            timeout,
                            transport.read_registers(cmd.addr, &mut buf),
                        ).await;
                        let _ = reply.send(result.map(|()| buf));
                    }
                    Some(Request::ReadSamples { channel, max, reply }) => {
                        let mut buf = vec![RawIq::default(); max];
                        let result = with_timeout(
                            timeout,
                            transport.read_samples(channel, &mut buf),
                        ).await;
                        let result = result.map(|read| {
                            buf.truncate(read.count.min(max));
                            RawChunk { samples: buf, overflow: read.overflow }
                        });
                        let _ = reply.send(result);
                    }
                    Some(Request::Identity { reply }) => {
                        let result = with_timeout(timeout, transport.board_identity()).await;
                        let _ = reply.send(result);
                    }
                    Some(Request::Close { reply }) => {
                        debug!("IO task closing transport");
                        let result = transport.close().await;
                        let _ = reply.send(result);
                        return;
                    }
                    None => {
                        debug!("all request senders dropped, exiting IO task");
                        break;
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands;
    use caribou_test_harness::MockTransport;

    fn spawn(mock: &MockTransport) -> RadioIo {
        spawn_io_task(Box::new(mock.clone()), Duration::from_millis(500))
    }

    #[tokio::test]
    async fn handle_reports_not_connected_when_task_gone() {
        let (cmd_tx, cmd_rx) = mpsc::channel(4);
        drop(cmd_rx);
        let handle = IoHandle {
            cmd_tx,
            timeout: Duration::from_millis(100),
        };
        let result = handle.read(commands::cmd_read_agc(Channel::Sub1G)).await;
        assert!(matches!(result, Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn write_then_read_register() {
        let mock = MockTransport::new();
        let io = spawn(&mock);

        io.handle
            .write(commands::cmd_set_agc(Channel::Sub1G, true))
            .await
            .unwrap();
        let data = io
            .handle
            .read(commands::cmd_read_agc(Channel::Sub1G))
            .await
            .unwrap();
        assert_eq!(data, vec![0x01]);
        assert_eq!(mock.writes().len(), 1);
    }

    #[tokio::test]
    async fn read_samples_truncates_to_count() {
        let mock = MockTransport::new();
        let io = spawn(&mock);

        let chunk = io.handle.read_samples(Channel::Sub1G, 256).await.unwrap();
        assert_eq!(chunk.samples.len(), 256);
        assert!(!chunk.overflow);
    }

    #[tokio::test]
    async fn identity_passes_through() {
        let mock = MockTransport::new();
        let io = spawn(&mock);

        let id = io.handle.identity().await.unwrap();
        assert_eq!(id.product_name, "CaribouLite RPI Hat");
    }

    #[tokio::test]
    async fn transport_errors_reach_caller() {
        let mock = MockTransport::new();
        mock.fail_next_reads(1);
        let io = spawn(&mock);

        let result = io.handle.read(commands::cmd_read_rssi(Channel::Sub1G)).await;
        assert!(matches!(result, Err(Error::Transport(_))));
        // The next read succeeds again.
        assert!(io.handle.read(commands::cmd_read_rssi(Channel::Sub1G)).await.is_ok());
    }

    #[tokio::test]
    async fn abandoned_request_is_not_executed() {
        let mock = MockTransport::new();
        let io = spawn(&mock);

        let (reply, reply_rx) = oneshot::channel();
        drop(reply_rx);
        io.handle
            .cmd_tx
            .send(Request::Write {
                cmd: commands::cmd_set_agc(Channel::Sub1G, true),
                reply,
            })
            .await
            .unwrap();
        io.handle
            .write(commands::cmd_set_agc(Channel::Wideband6G, true))
            .await
            .unwrap();

        assert_eq!(mock.writes(), vec![(0x0224, vec![0x01])]);
    }

    #[tokio::test]
    async fn close_shuts_down_task() {
        let mock = MockTransport::new();
        let mut io = spawn(&mock);

        io.close().await.unwrap();
        assert!(!mock.is_open());
        assert!(io.task.is_finished());

        let result = io.handle.write(commands::cmd_set_agc(Channel::Sub1G, false)).await;
        assert!(matches!(result, Err(Error::NotConnected)));
    }
}
