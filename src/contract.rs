use std::num::NonZeroU32;
use std::{fmt, fmt::Display};

use crate::BackendKind;
use crate::handle::FrameHandle;

/// Opaque status code reported by a native decoder engine.
///
/// Codes are carried verbatim; only [`NativeCode::TRY_AGAIN`] has meaning to
/// the decode loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeCode(pub i32);

impl NativeCode {
    pub const TRY_AGAIN: Self = Self(-11);
    pub const INVALID_ARGUMENT: Self = Self(-22);
}

impl Display for NativeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: NonZeroU32,
    pub height: NonZeroU32,
}

impl Dimensions {
    /// Native engines report sizes as signed integers; anything non-positive
    /// means the size is unknown.
    #[must_use]
    pub fn from_native(width: i32, height: i32) -> Option<Self> {
        let width = u32::try_from(width).ok().and_then(NonZeroU32::new)?;
        let height = u32::try_from(height).ok().and_then(NonZeroU32::new)?;
        Some(Self { width, height })
    }
}

impl Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Presentation timestamp in microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimestampUs(pub i64);

impl Display for TimestampUs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}us", self.0)
    }
}

/// One compressed access unit handed to [`crate::DecodeLoop::submit`].
#[derive(Debug, Clone, Default)]
pub struct DecodeRequest {
    pub payload: Vec<u8>,
    pub pts: TimestampUs,
    /// Final request of the stream; the payload is ignored.
    pub end_of_stream: bool,
    /// Data before the intended start position: decoded, not meant to be shown.
    pub decode_only: bool,
    /// Discontinuity (seek); native state is flushed before this request.
    pub reset: bool,
}

impl DecodeRequest {
    #[must_use]
    pub fn access_unit(payload: Vec<u8>, pts: TimestampUs) -> Self {
        Self {
            payload,
            pts,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn end_of_stream() -> Self {
        Self {
            end_of_stream: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_reset(mut self) -> Self {
        self.reset = true;
        self
    }

    #[must_use]
    pub fn with_decode_only(mut self, decode_only: bool) -> Self {
        self.decode_only = decode_only;
        self
    }
}

#[must_use]
#[derive(Debug)]
pub enum DecodeOutcome<P> {
    FrameProduced(FrameHandle<P>),
    NoFrameYet,
    EndOfStreamReached,
}

impl<P> DecodeOutcome<P> {
    pub fn frame(&self) -> Option<&FrameHandle<P>> {
        match self {
            Self::FrameProduced(frame) => Some(frame),
            Self::NoFrameYet | Self::EndOfStreamReached => None,
        }
    }

    pub fn into_frame(self) -> Option<FrameHandle<P>> {
        match self {
            Self::FrameProduced(frame) => Some(frame),
            Self::NoFrameYet | Self::EndOfStreamReached => None,
        }
    }

    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::EndOfStreamReached)
    }
}

/// What happened to the submitted request's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputDisposition {
    /// Handed to the native decoder; do not submit it again.
    Queued,
    /// Native queue was full; submit the same request again later.
    Retained,
    /// End-of-stream marker processed.
    EndOfStream,
}

impl Display for InputDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => f.write_str("queued"),
            Self::Retained => f.write_str("retained"),
            Self::EndOfStream => f.write_str("end_of_stream"),
        }
    }
}

#[must_use]
#[derive(Debug)]
pub struct Submission<P> {
    pub outcome: DecodeOutcome<P>,
    pub input: InputDisposition,
}

/// How a backend signals that its input queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backpressure {
    /// `has_capacity` is consulted before every queue call.
    ProbeCapacity,
    /// The queue call itself answers [`QueueStatus::TryAgain`].
    QueueTryAgain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueStatus {
    Ok,
    TryAgain,
    Err(NativeCode),
}

/// A picture as returned by the native dequeue call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPicture<P> {
    pub picture: P,
    pub width: i32,
    pub height: i32,
    pub pts: TimestampUs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DequeueStatus<P> {
    None,
    Frame(DecodedPicture<P>),
    Err(NativeCode),
}

impl<P> DequeueStatus<P> {
    pub fn map<Q>(self, f: impl FnOnce(P) -> Q) -> DequeueStatus<Q> {
        match self {
            Self::None => DequeueStatus::None,
            Self::Frame(decoded) => DequeueStatus::Frame(DecodedPicture {
                picture: f(decoded.picture),
                width: decoded.width,
                height: decoded.height,
                pts: decoded.pts,
            }),
            Self::Err(code) => DequeueStatus::Err(code),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("native decoder creation failed: {0}")]
    CreationFailed(String),
    #[error("queue input failed: native code {0}")]
    QueueFailed(NativeCode),
    #[error("dequeue frame failed: native code {0}")]
    DequeueFailed(NativeCode),
    #[error("render to output target failed: native code {0}")]
    RenderFailed(NativeCode),
    #[error("decoder released")]
    Released,
    #[error("end of stream already signaled; reset before submitting new input")]
    StreamEnded,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unsupported config: {0}")]
    UnsupportedConfig(String),
    #[error("invalid codec configuration: {0}")]
    InvalidConfiguration(String),
}

/// Native call surface of one software decoder backend.
///
/// Every method except [`DecoderAdapter::dequeue`] may do real work, but none
/// may block: `dequeue` in particular must answer [`DequeueStatus::None`]
/// immediately when no picture is ready.
pub trait DecoderAdapter {
    type ThreadHints: Copy + fmt::Debug;
    type Context;
    type Picture;
    /// Output target; equality is identity.
    type Surface: Clone + PartialEq + fmt::Debug;

    fn backend(&self) -> BackendKind;

    fn backpressure(&self) -> Backpressure;

    fn create(&mut self, hints: Self::ThreadHints) -> Result<Self::Context, BackendError>;

    fn queue(&mut self, ctx: &mut Self::Context, payload: &[u8], pts: TimestampUs) -> QueueStatus;

    fn dequeue(&mut self, ctx: &mut Self::Context) -> DequeueStatus<Self::Picture>;

    fn flush(&mut self, ctx: &mut Self::Context);

    fn signal_end_of_stream(&mut self, ctx: &mut Self::Context);

    fn has_capacity(&self, ctx: &Self::Context) -> bool;

    fn bind_surface(&mut self, ctx: &mut Self::Context, target: Option<&Self::Surface>);

    fn render(&mut self, ctx: &mut Self::Context, picture: &Self::Picture) -> Result<(), NativeCode>;

    fn release_picture(&mut self, ctx: &mut Self::Context, picture: Self::Picture);

    fn close(&mut self, ctx: Self::Context);

    fn version(&self) -> String;
}
