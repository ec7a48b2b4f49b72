use std::fmt::{self, Display};

mod bitstream;
mod config;
mod contract;
#[cfg(feature = "backend-dav1d")]
mod dav1d_backend;
mod decode_loop;
#[cfg(test)]
mod fake_adapter;
mod handle;
mod hints;
#[cfg(any(test, feature = "backend-dav1d", feature = "backend-vvdec"))]
mod native;
mod pool;
mod registry;
mod render;
mod surface;
#[cfg(feature = "backend-vvdec")]
mod vvdec_backend;

pub use bitstream::{ANNEXB_START_CODE, AnnexBFramer, length_prefixed_to_annexb};
pub use config::{CodecConfigParser, FourCc, VideoConfiguration, VvcConfigParser};
pub use contract::{
    BackendError, Backpressure, DecodeOutcome, DecodeRequest, DecodedPicture, DecoderAdapter,
    DequeueStatus, Dimensions, InputDisposition, NativeCode, QueueStatus, Submission, TimestampUs,
};
#[cfg(feature = "backend-dav1d")]
pub use dav1d_backend::{Dav1dAdapter, Dav1dContext, Dav1dPicture, Dav1dPlugin};
pub use decode_loop::{DecodeLoop, DecodeSummary, LoopSettings, LoopState};
pub use handle::{DecoderId, FrameHandle, RejectedFrame};
pub use hints::{Av1ThreadHints, DEFAULT_TILE_THREADS, VvcThreadHints};
#[cfg(any(feature = "backend-dav1d", feature = "backend-vvdec"))]
pub use native::NativeWindow;
pub use pool::{DEFAULT_OUTPUT_SLOTS, OutputPool, SlotId};
pub use registry::{DecoderPlugin, DecoderRegistry};
pub use render::{
    FormatSupport, FrameAction, FrameTimingPolicy, StreamFormat, can_reuse_decoder,
    format_support,
};
pub use surface::SurfaceBinding;
#[cfg(feature = "backend-vvdec")]
pub use vvdec_backend::{VvdecAdapter, VvdecContext, VvdecPicture, VvdecPlugin};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Av1,
    Vvc,
}

impl BackendKind {
    pub const ALL: [BackendKind; 2] = [BackendKind::Av1, BackendKind::Vvc];

    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            BackendKind::Av1 => "video/av01",
            BackendKind::Vvc => "video/vvc",
        }
    }

    #[must_use]
    pub fn plugin_id(self) -> &'static str {
        match self {
            BackendKind::Av1 => "vcat.dav1d",
            BackendKind::Vvc => "vcat.vvdec",
        }
    }

    /// Prefix of decoder instance names; the native version is appended.
    #[must_use]
    pub fn decoder_prefix(self) -> &'static str {
        match self {
            BackendKind::Av1 => "vcat-dav1d",
            BackendKind::Vvc => "vcat-vvdec",
        }
    }

    #[must_use]
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.mime_type().eq_ignore_ascii_case(mime_type))
    }
}

impl Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Av1 => f.write_str("av1"),
            BackendKind::Vvc => f.write_str("vvc"),
        }
    }
}

/// Decoder produced by the compiled-in plugins.
#[derive(Debug)]
pub enum BuiltinDecoder {
    #[cfg(feature = "backend-dav1d")]
    Av1(DecodeLoop<Dav1dAdapter>),
    #[cfg(feature = "backend-vvdec")]
    Vvc(DecodeLoop<VvdecAdapter>),
}

impl BuiltinDecoder {
    pub fn backend(&self) -> BackendKind {
        match *self {
            #[cfg(feature = "backend-dav1d")]
            BuiltinDecoder::Av1(_) => BackendKind::Av1,
            #[cfg(feature = "backend-vvdec")]
            BuiltinDecoder::Vvc(_) => BackendKind::Vvc,
        }
    }

    pub fn name(&self) -> &str {
        match *self {
            #[cfg(feature = "backend-dav1d")]
            BuiltinDecoder::Av1(ref decoder) => decoder.name(),
            #[cfg(feature = "backend-vvdec")]
            BuiltinDecoder::Vvc(ref decoder) => decoder.name(),
        }
    }
}

/// Registry holding every backend enabled at build time.
pub fn builtin_registry() -> DecoderRegistry<BuiltinDecoder> {
    #[allow(unused_mut)]
    let mut registry = DecoderRegistry::new();
    #[cfg(feature = "backend-dav1d")]
    registry.register(Dav1dPlugin);
    #[cfg(feature = "backend-vvdec")]
    registry.register(VvdecPlugin);
    registry
}
