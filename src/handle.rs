use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use crate::{BackendError, DecodedPicture, DecoderAdapter, Dimensions, TimestampUs};

static NEXT_DECODER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one native decoder instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecoderId(u64);

impl DecoderId {
    fn next() -> Self {
        Self(NEXT_DECODER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for DecoderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dec#{}", self.0)
    }
}

/// Single owner of one native decoder context.
///
/// The context lives in an `Option`: `None` is the released state, so a
/// closed context can never be handed to the adapter again.
pub(crate) struct NativeDecoder<A: DecoderAdapter> {
    id: DecoderId,
    adapter: A,
    ctx: Option<A::Context>,
}

impl<A: DecoderAdapter> NativeDecoder<A> {
    pub(crate) fn open(mut adapter: A, hints: A::ThreadHints) -> Result<Self, BackendError> {
        let ctx = adapter.create(hints)?;
        let id = DecoderId::next();
        debug!(decoder = %id, backend = %adapter.backend(), ?hints, "native decoder created");
        Ok(Self {
            id,
            adapter,
            ctx: Some(ctx),
        })
    }

    pub(crate) fn id(&self) -> DecoderId {
        self.id
    }

    pub(crate) fn adapter(&self) -> &A {
        &self.adapter
    }

    pub(crate) fn is_open(&self) -> bool {
        self.ctx.is_some()
    }

    pub(crate) fn parts(&mut self) -> Result<(&mut A, &mut A::Context), BackendError> {
        match self.ctx.as_mut() {
            Some(ctx) => Ok((&mut self.adapter, ctx)),
            None => Err(BackendError::Released),
        }
    }

    pub(crate) fn close(&mut self) -> bool {
        match self.ctx.take() {
            Some(ctx) => {
                self.adapter.close(ctx);
                debug!(decoder = %self.id, "native decoder closed");
                true
            }
            None => false,
        }
    }
}

impl<A: DecoderAdapter> Drop for NativeDecoder<A> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Owned reference to one decoded picture inside a native frame pool.
///
/// Not `Clone`: the only way to give the picture back is to move the handle
/// into [`crate::DecodeLoop::release_frame`] (directly or through an output
/// slot). Dropping a live handle leaks the native picture and is logged.
#[must_use = "frame handles must be released back to the decoder that produced them"]
pub struct FrameHandle<P> {
    owner: DecoderId,
    picture: Option<P>,
    pts: TimestampUs,
    dims: Option<Dimensions>,
    skip: bool,
}

impl<P> FrameHandle<P> {
    pub(crate) fn new(owner: DecoderId, decoded: DecodedPicture<P>, skip: bool) -> Self {
        Self {
            owner,
            dims: Dimensions::from_native(decoded.width, decoded.height),
            pts: decoded.pts,
            picture: Some(decoded.picture),
            skip,
        }
    }

    pub fn owner(&self) -> DecoderId {
        self.owner
    }

    pub fn pts(&self) -> TimestampUs {
        self.pts
    }

    pub fn dims(&self) -> Option<Dimensions> {
        self.dims
    }

    /// Set when the frame came out of decode-only (preroll) input.
    pub fn should_skip(&self) -> bool {
        self.skip
    }

    pub(crate) fn picture(&self) -> Option<&P> {
        self.picture.as_ref()
    }

    pub(crate) fn into_picture(mut self) -> Option<P> {
        self.picture.take()
    }
}

impl<P> fmt::Debug for FrameHandle<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameHandle")
            .field("owner", &self.owner)
            .field("pts", &self.pts)
            .field("dims", &self.dims)
            .field("skip", &self.skip)
            .field("live", &self.picture.is_some())
            .finish()
    }
}

impl<P> Drop for FrameHandle<P> {
    fn drop(&mut self) {
        if self.picture.is_some() {
            warn!(
                decoder = %self.owner,
                pts = %self.pts,
                "frame handle dropped without release; native picture leaked"
            );
        }
    }
}

/// Frame refused by [`crate::DecodeLoop::release_frame`], handed back so it
/// can still be released through the decoder that produced it.
pub struct RejectedFrame<P> {
    pub error: BackendError,
    pub frame: FrameHandle<P>,
}

impl<P> RejectedFrame<P> {
    pub fn into_parts(self) -> (BackendError, FrameHandle<P>) {
        (self.error, self.frame)
    }
}

impl<P> fmt::Debug for RejectedFrame<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RejectedFrame")
            .field("error", &self.error)
            .field("frame", &self.frame)
            .finish()
    }
}

impl<P> fmt::Display for RejectedFrame<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame {} from {} refused: {}", self.frame.pts, self.frame.owner, self.error)
    }
}

impl<P> std::error::Error for RejectedFrame<P> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
