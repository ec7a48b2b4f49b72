use std::ffi::{CStr, c_char, c_int, c_void};
use std::ptr::NonNull;

use crate::{DecodedPicture, DequeueStatus, NativeCode, QueueStatus, TimestampUs};

/// Host-owned output window (an `ANativeWindow*` on Android).
///
/// Equality is pointer identity, which is what surface rebinding keys on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeWindow(NonNull<c_void>);

impl NativeWindow {
    /// # Safety
    ///
    /// `ptr` must stay a valid window for as long as any decoder has it
    /// bound, i.e. until it is replaced or the decoder is released.
    pub unsafe fn from_raw(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }
}

/// Out-parameter block filled by the shim's dequeue call.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct NativeFrameInfo {
    pub width: c_int,
    pub height: c_int,
    pub pts_us: i64,
    /// Negative on failure; `-EAGAIN` means nothing ready.
    pub status: c_int,
}

pub(crate) fn queue_status(rc: c_int) -> QueueStatus {
    match rc {
        0 => QueueStatus::Ok,
        rc if rc == NativeCode::TRY_AGAIN.0 => QueueStatus::TryAgain,
        rc => QueueStatus::Err(NativeCode(rc)),
    }
}

pub(crate) fn dequeue_status(
    picture: *mut c_void,
    info: &NativeFrameInfo,
) -> DequeueStatus<NonNull<c_void>> {
    if info.status < 0 && info.status != NativeCode::TRY_AGAIN.0 {
        return DequeueStatus::Err(NativeCode(info.status));
    }
    match NonNull::new(picture) {
        Some(picture) => DequeueStatus::Frame(DecodedPicture {
            picture,
            width: info.width,
            height: info.height,
            pts: TimestampUs(info.pts_us),
        }),
        None => DequeueStatus::None,
    }
}

pub(crate) fn render_status(rc: c_int) -> Result<(), NativeCode> {
    if rc == 0 { Ok(()) } else { Err(NativeCode(rc)) }
}

/// # Safety
///
/// `ptr` is null or a NUL-terminated string that outlives this call.
pub(crate) unsafe fn version_from_raw(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return "unknown".to_string();
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}
