use std::ffi::{c_char, c_int, c_void};
use std::ptr::NonNull;

use tracing::debug;

use crate::native::{
    NativeFrameInfo, NativeWindow, dequeue_status, queue_status, render_status, version_from_raw,
};
use crate::{
    Av1ThreadHints, BackendError, BackendKind, Backpressure, BuiltinDecoder, DecodeLoop,
    DecoderAdapter, DecoderPlugin, DequeueStatus, LoopSettings, NativeCode, QueueStatus,
    TimestampUs, VideoConfiguration,
};

#[link(name = "vcat_dav1d")]
unsafe extern "C" {
    fn vcat_dav1d_create(frame_threads: c_int, tile_threads: c_int) -> *mut c_void;
    fn vcat_dav1d_close(ctx: *mut c_void);
    fn vcat_dav1d_flush(ctx: *mut c_void);
    fn vcat_dav1d_has_capacity(ctx: *mut c_void) -> c_int;
    fn vcat_dav1d_signal_eof(ctx: *mut c_void);
    fn vcat_dav1d_queue_input(ctx: *mut c_void, data: *const u8, len: usize, pts_us: i64)
    -> c_int;
    fn vcat_dav1d_dequeue_frame(ctx: *mut c_void, info: *mut NativeFrameInfo) -> *mut c_void;
    fn vcat_dav1d_set_surface(ctx: *mut c_void, window: *mut c_void);
    fn vcat_dav1d_render_to_surface(ctx: *mut c_void, picture: *mut c_void) -> c_int;
    fn vcat_dav1d_release_picture(ctx: *mut c_void, picture: *mut c_void);
    fn vcat_dav1d_version() -> *const c_char;
}

/// Owned dav1d shim context; only [`Dav1dAdapter::close`] consumes it.
#[derive(Debug)]
pub struct Dav1dContext(NonNull<c_void>);

/// Reference-counted dav1d picture held by the shim until released.
#[derive(Debug)]
pub struct Dav1dPicture(NonNull<c_void>);

#[derive(Debug, Default, Clone, Copy)]
pub struct Dav1dAdapter;

fn to_c_int(value: u32) -> c_int {
    c_int::try_from(value).unwrap_or(c_int::MAX)
}

impl DecoderAdapter for Dav1dAdapter {
    type ThreadHints = Av1ThreadHints;
    type Context = Dav1dContext;
    type Picture = Dav1dPicture;
    type Surface = NativeWindow;

    fn backend(&self) -> BackendKind {
        BackendKind::Av1
    }

    fn backpressure(&self) -> Backpressure {
        Backpressure::ProbeCapacity
    }

    fn create(&mut self, hints: Av1ThreadHints) -> Result<Dav1dContext, BackendError> {
        let raw = unsafe {
            vcat_dav1d_create(to_c_int(hints.frame_threads), to_c_int(hints.tile_threads))
        };
        NonNull::new(raw).map(Dav1dContext).ok_or_else(|| {
            BackendError::CreationFailed(format!("vcat_dav1d_create returned null for {hints}"))
        })
    }

    fn queue(&mut self, ctx: &mut Dav1dContext, payload: &[u8], pts: TimestampUs) -> QueueStatus {
        queue_status(unsafe {
            vcat_dav1d_queue_input(ctx.0.as_ptr(), payload.as_ptr(), payload.len(), pts.0)
        })
    }

    fn dequeue(&mut self, ctx: &mut Dav1dContext) -> DequeueStatus<Dav1dPicture> {
        let mut info = NativeFrameInfo::default();
        let raw = unsafe { vcat_dav1d_dequeue_frame(ctx.0.as_ptr(), &mut info) };
        dequeue_status(raw, &info).map(Dav1dPicture)
    }

    fn flush(&mut self, ctx: &mut Dav1dContext) {
        unsafe { vcat_dav1d_flush(ctx.0.as_ptr()) }
    }

    fn signal_end_of_stream(&mut self, ctx: &mut Dav1dContext) {
        unsafe { vcat_dav1d_signal_eof(ctx.0.as_ptr()) }
    }

    fn has_capacity(&self, ctx: &Dav1dContext) -> bool {
        unsafe { vcat_dav1d_has_capacity(ctx.0.as_ptr()) != 0 }
    }

    fn bind_surface(&mut self, ctx: &mut Dav1dContext, target: Option<&NativeWindow>) {
        let window = target.map_or(std::ptr::null_mut(), |w| w.as_ptr());
        unsafe { vcat_dav1d_set_surface(ctx.0.as_ptr(), window) }
    }

    fn render(&mut self, ctx: &mut Dav1dContext, picture: &Dav1dPicture) -> Result<(), NativeCode> {
        render_status(unsafe { vcat_dav1d_render_to_surface(ctx.0.as_ptr(), picture.0.as_ptr()) })
    }

    fn release_picture(&mut self, ctx: &mut Dav1dContext, picture: Dav1dPicture) {
        unsafe { vcat_dav1d_release_picture(ctx.0.as_ptr(), picture.0.as_ptr()) }
    }

    fn close(&mut self, ctx: Dav1dContext) {
        unsafe { vcat_dav1d_close(ctx.0.as_ptr()) }
    }

    fn version(&self) -> String {
        unsafe { version_from_raw(vcat_dav1d_version()) }
    }
}

/// Registry entry for the dav1d backend (`vcat.dav1d`).
#[derive(Debug, Default, Clone, Copy)]
pub struct Dav1dPlugin;

impl DecoderPlugin<BuiltinDecoder> for Dav1dPlugin {
    fn id(&self) -> &str {
        BackendKind::Av1.plugin_id()
    }

    fn version(&self) -> String {
        Dav1dAdapter.version()
    }

    fn mime_type(&self) -> &str {
        BackendKind::Av1.mime_type()
    }

    fn supported_profiles(&self) -> &[&str] {
        &["main"]
    }

    fn create(
        &self,
        threads: u32,
        config: Option<&VideoConfiguration>,
    ) -> Result<BuiltinDecoder, BackendError> {
        if let Some(config) = config.filter(|c| !self.supports(&c.mime_type)) {
            return Err(BackendError::UnsupportedConfig(format!(
                "{} cannot decode {}",
                self.id(),
                config.mime_type
            )));
        }
        let hints = Av1ThreadHints::from_thread_count(threads);
        debug!(%hints, "creating dav1d decoder");
        DecodeLoop::new(Dav1dAdapter, hints, LoopSettings::default()).map(BuiltinDecoder::Av1)
    }
}
