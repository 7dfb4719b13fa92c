//! Sample streaming types.
//!
//! The FPGA sample path produces raw 13-bit signed I/Q words. At the API
//! boundary samples are always normalized to [`Complex32`] in `[-1.0, 1.0)`,
//! so consumers never see the native word format.
//!
//! A streaming session delivers fixed-size [`SampleBlock`]s to a registered
//! [`SampleCallback`] through [`StreamEvent`]s. Each block carries a
//! [`BlockMeta`] with a strictly increasing sequence number and a
//! sample-clock timestamp. Blocks the session had to discard, because the
//! consumer fell behind or the transport hiccuped, are reported once as a
//! [`StreamEvent::Dropped`] run and flagged on the next delivered block.

use std::fmt;

use num_complex::Complex32;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Raw samples
// ---------------------------------------------------------------------------

/// Full scale of a 13-bit signed sample word.
pub const SAMPLE_FULL_SCALE: f32 = 4096.0;

/// Largest block a session will accept, in samples.
pub const MAX_BLOCK_SAMPLES: usize = 1 << 20;

/// One raw I/Q pair as read from the FPGA, sign-extended to `i16`.
///
/// Valid words lie in `-4096..=4095`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawIq {
    /// In-phase component.
    pub i: i16,
    /// Quadrature component.
    pub q: i16,
}

impl RawIq {
    /// Create a raw pair.
    pub const fn new(i: i16, q: i16) -> Self {
        RawIq { i, q }
    }

    /// Normalize to a complex sample in `[-1.0, 1.0)`.
    ///
    /// Words outside the 13-bit range are clamped to full scale.
    pub fn to_complex(self) -> Complex32 {
        Complex32::new(normalize(self.i), normalize(self.q))
    }
}

fn normalize(word: i16) -> f32 {
    let clamped = word.clamp(-4096, 4095);
    clamped as f32 / SAMPLE_FULL_SCALE
}

/// Convert a slice of raw words into normalized complex samples.
///
/// ```
/// use caribou_core::stream::{RawIq, convert_samples};
///
/// let out = convert_samples(&[RawIq::new(2048, -4096)]);
/// assert_eq!(out[0].re, 0.5);
/// assert_eq!(out[0].im, -1.0);
/// ```
pub fn convert_samples(raw: &[RawIq]) -> Vec<Complex32> {
    raw.iter().map(|s| s.to_complex()).collect()
}

/// Result of one raw block read from the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleRead {
    /// Number of words written into the caller's buffer.
    pub count: usize,
    /// The FPGA reported that its FIFO overflowed since the previous read.
    pub overflow: bool,
}

// ---------------------------------------------------------------------------
// Blocks and events
// ---------------------------------------------------------------------------

/// Per-block synchronization metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockMeta {
    /// Sequence number of this block within the session, starting at 0.
    ///
    /// Sequence numbers count every block the session acquired, so a gap
    /// between consecutive delivered blocks is exactly the number of
    /// dropped blocks.
    pub sequence: u64,
    /// Sample-clock index of the first sample in this block.
    pub timestamp: u64,
    /// Samples were lost immediately before this block.
    pub discontinuity: bool,
    /// Number of blocks dropped since the previous delivered block.
    pub dropped_before: u64,
}

/// A fixed-size block of normalized complex baseband samples.
#[derive(Debug, Clone)]
pub struct SampleBlock {
    /// The samples, always exactly the session's block size.
    pub samples: Vec<Complex32>,
    /// Synchronization metadata.
    pub meta: BlockMeta,
}

impl SampleBlock {
    /// Number of samples in the block.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the block is empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration covered by this block at the given sample rate.
    pub fn duration_secs(&self, sample_rate_hz: f64) -> f64 {
        if sample_rate_hz <= 0.0 {
            return 0.0;
        }
        self.samples.len() as f64 / sample_rate_hz
    }
}

/// Why a block was discarded instead of delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The delivery queue was full because the callback fell behind.
    Overrun,
    /// A transient transport fault prevented the read.
    TransportFault,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::Overrun => write!(f, "overrun"),
            DropReason::TransportFault => write!(f, "transport fault"),
        }
    }
}

/// An event handed to the session callback.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// A block of samples.
    Samples(SampleBlock),
    /// A run of consecutive blocks was discarded.
    ///
    /// Always precedes the next delivered block, whose metadata repeats
    /// the count in [`BlockMeta::dropped_before`].
    Dropped {
        /// Sequence number of the first discarded block.
        sequence: u64,
        /// Number of consecutive blocks discarded.
        count: u64,
        /// Why the first block of the run was discarded.
        reason: DropReason,
    },
    /// The session ended because of a fatal fault. No further events follow.
    Terminated {
        /// Rendered cause.
        reason: String,
    },
}

/// Callback registered with a streaming session.
///
/// Invoked on the session's own delivery thread, never concurrently with
/// itself, and never after the session's `stop` has returned.
pub type SampleCallback = Box<dyn FnMut(StreamEvent) + Send + 'static>;

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// Lifecycle of a channel's streaming session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session.
    Idle,
    /// Hardware is being switched into receive.
    Starting,
    /// Blocks are being delivered.
    Streaming,
    /// The session is draining.
    Stopping,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Idle => "idle",
            SessionState::Starting => "starting",
            SessionState::Streaming => "streaming",
            SessionState::Stopping => "stopping",
        };
        write!(f, "{s}")
    }
}

/// Counters for a running session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Block size in samples.
    pub block_size: usize,
    /// Blocks handed to the callback.
    pub blocks_delivered: u64,
    /// Blocks discarded for any reason.
    pub blocks_dropped: u64,
    /// FIFO overflows reported by the FPGA.
    pub overflows: u64,
}

/// Resolve the block size for a new session.
///
/// `None` selects the native MTU. Zero or anything above
/// [`MAX_BLOCK_SAMPLES`] is rejected.
pub fn resolve_block_size(requested: Option<usize>, native_mtu: usize) -> Result<usize> {
    let size = requested.unwrap_or(native_mtu);
    if size == 0 || size > MAX_BLOCK_SAMPLES {
        return Err(Error::InvalidParameter(format!(
            "block size {size} outside 1..={MAX_BLOCK_SAMPLES} samples"
        )));
    }
    Ok(size)
}
