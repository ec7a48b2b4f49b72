use std::fmt::{self, Display};

use crate::BackendKind;

/// What the host should do with the next decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameAction {
    Render,
    /// Not yet due; hold the frame.
    Wait,
    Drop,
    /// Too far behind: skip input up to the next keyframe.
    DropToKeyframe,
}

/// Late/early thresholds for frames coming out of a software decoder.
///
/// `early_us` is the time until the frame's presentation deadline; negative
/// values mean the frame is late.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTimingPolicy {
    pub drop_below_us: i64,
    pub drop_to_keyframe_below_us: i64,
    pub force_render_within_us: i64,
}

impl Default for FrameTimingPolicy {
    fn default() -> Self {
        Self {
            drop_below_us: -150_000,
            drop_to_keyframe_below_us: -1_000_000,
            force_render_within_us: 20_000,
        }
    }
}

impl FrameTimingPolicy {
    pub fn should_drop(&self, early_us: i64) -> bool {
        early_us < self.drop_below_us
    }

    pub fn should_drop_to_keyframe(&self, early_us: i64) -> bool {
        early_us < self.drop_to_keyframe_below_us
    }

    pub fn should_force_render(&self, early_us: i64) -> bool {
        early_us <= self.force_render_within_us
    }

    pub fn decide(&self, early_us: i64) -> FrameAction {
        if self.should_drop_to_keyframe(early_us) {
            FrameAction::DropToKeyframe
        } else if self.should_drop(early_us) {
            FrameAction::Drop
        } else if self.should_force_render(early_us) {
            FrameAction::Render
        } else {
            FrameAction::Wait
        }
    }
}

/// Track properties relevant to picking a software decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFormat {
    pub mime_type: String,
    pub drm_protected: bool,
}

impl StreamFormat {
    pub fn clear(mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            drm_protected: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatSupport {
    Handled,
    UnsupportedType,
    UnsupportedDrm,
}

impl Display for FormatSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handled => f.write_str("handled"),
            Self::UnsupportedType => f.write_str("unsupported_type"),
            Self::UnsupportedDrm => f.write_str("unsupported_drm"),
        }
    }
}

/// Both backends are clear-content only.
pub fn format_support(backend: BackendKind, format: &StreamFormat) -> FormatSupport {
    if !backend.mime_type().eq_ignore_ascii_case(&format.mime_type) {
        FormatSupport::UnsupportedType
    } else if format.drm_protected {
        FormatSupport::UnsupportedDrm
    } else {
        FormatSupport::Handled
    }
}

/// A format change always tears the decoder down and builds a new one.
pub fn can_reuse_decoder(_old: &StreamFormat, _new: &StreamFormat) -> bool {
    false
}
