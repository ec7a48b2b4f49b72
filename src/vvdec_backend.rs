use std::ffi::{c_char, c_int, c_void};
use std::ptr::NonNull;

use tracing::{debug, warn};

use crate::native::{
    NativeFrameInfo, NativeWindow, dequeue_status, queue_status, render_status, version_from_raw,
};
use crate::{
    AnnexBFramer, BackendError, BackendKind, Backpressure, BuiltinDecoder, CodecConfigParser,
    DecodeLoop, DecoderAdapter, DecoderPlugin, DequeueStatus, LoopSettings, NativeCode,
    QueueStatus, TimestampUs, VideoConfiguration, VvcConfigParser, VvcThreadHints,
};

#[link(name = "vcat_vvdec")]
unsafe extern "C" {
    fn vcat_vvdec_create(workers: c_int) -> *mut c_void;
    fn vcat_vvdec_close(ctx: *mut c_void);
    fn vcat_vvdec_flush(ctx: *mut c_void);
    fn vcat_vvdec_has_capacity(ctx: *mut c_void) -> c_int;
    fn vcat_vvdec_signal_eof(ctx: *mut c_void);
    fn vcat_vvdec_queue_input(ctx: *mut c_void, data: *const u8, len: usize, pts_us: i64)
    -> c_int;
    fn vcat_vvdec_dequeue_frame(ctx: *mut c_void, info: *mut NativeFrameInfo) -> *mut c_void;
    fn vcat_vvdec_set_surface(ctx: *mut c_void, window: *mut c_void);
    fn vcat_vvdec_render_to_surface(ctx: *mut c_void, picture: *mut c_void) -> c_int;
    fn vcat_vvdec_release_picture(ctx: *mut c_void, picture: *mut c_void);
    fn vcat_vvdec_version() -> *const c_char;
}

#[derive(Debug)]
pub struct VvdecContext(NonNull<c_void>);

#[derive(Debug)]
pub struct VvdecPicture(NonNull<c_void>);

/// vvdec only accepts Annex-B input, so samples pass through an
/// [`AnnexBFramer`] built from the stream's `vvcC` record.
#[derive(Debug, Default)]
pub struct VvdecAdapter {
    framer: AnnexBFramer,
}

impl VvdecAdapter {
    pub fn new(config: Option<&VideoConfiguration>) -> Self {
        let framer = match config {
            Some(config) => {
                AnnexBFramer::new(config.initialization_data.clone(), config.nal_length_size)
            }
            None => AnnexBFramer::default(),
        };
        Self { framer }
    }
}

impl DecoderAdapter for VvdecAdapter {
    type ThreadHints = VvcThreadHints;
    type Context = VvdecContext;
    type Picture = VvdecPicture;
    type Surface = NativeWindow;

    fn backend(&self) -> BackendKind {
        BackendKind::Vvc
    }

    fn backpressure(&self) -> Backpressure {
        Backpressure::QueueTryAgain
    }

    fn create(&mut self, hints: VvcThreadHints) -> Result<VvdecContext, BackendError> {
        let workers = c_int::try_from(hints.workers).unwrap_or(c_int::MAX);
        let raw = unsafe { vcat_vvdec_create(workers) };
        let ctx = NonNull::new(raw).map(VvdecContext).ok_or_else(|| {
            BackendError::CreationFailed(format!("vcat_vvdec_create returned null for {hints}"))
        })?;
        self.framer.rearm();
        Ok(ctx)
    }

    fn queue(&mut self, ctx: &mut VvdecContext, payload: &[u8], pts: TimestampUs) -> QueueStatus {
        let framed = match self.framer.frame(payload) {
            Ok(framed) => framed,
            Err(err) => {
                warn!(%pts, error = %err, "dropping malformed VVC sample");
                return QueueStatus::Err(NativeCode::INVALID_ARGUMENT);
            }
        };
        let status = queue_status(unsafe {
            vcat_vvdec_queue_input(ctx.0.as_ptr(), framed.as_ptr(), framed.len(), pts.0)
        });
        if status == QueueStatus::Ok {
            self.framer.commit();
        }
        status
    }

    fn dequeue(&mut self, ctx: &mut VvdecContext) -> DequeueStatus<VvdecPicture> {
        let mut info = NativeFrameInfo::default();
        let raw = unsafe { vcat_vvdec_dequeue_frame(ctx.0.as_ptr(), &mut info) };
        dequeue_status(raw, &info).map(VvdecPicture)
    }

    fn flush(&mut self, ctx: &mut VvdecContext) {
        unsafe { vcat_vvdec_flush(ctx.0.as_ptr()) }
        self.framer.rearm();
    }

    fn signal_end_of_stream(&mut self, ctx: &mut VvdecContext) {
        unsafe { vcat_vvdec_signal_eof(ctx.0.as_ptr()) }
    }

    fn has_capacity(&self, ctx: &VvdecContext) -> bool {
        unsafe { vcat_vvdec_has_capacity(ctx.0.as_ptr()) != 0 }
    }

    fn bind_surface(&mut self, ctx: &mut VvdecContext, target: Option<&NativeWindow>) {
        let window = target.map_or(std::ptr::null_mut(), |w| w.as_ptr());
        unsafe { vcat_vvdec_set_surface(ctx.0.as_ptr(), window) }
    }

    fn render(&mut self, ctx: &mut VvdecContext, picture: &VvdecPicture) -> Result<(), NativeCode> {
        render_status(unsafe { vcat_vvdec_render_to_surface(ctx.0.as_ptr(), picture.0.as_ptr()) })
    }

    fn release_picture(&mut self, ctx: &mut VvdecContext, picture: VvdecPicture) {
        unsafe { vcat_vvdec_release_picture(ctx.0.as_ptr(), picture.0.as_ptr()) }
    }

    fn close(&mut self, ctx: VvdecContext) {
        unsafe { vcat_vvdec_close(ctx.0.as_ptr()) }
    }

    fn version(&self) -> String {
        unsafe { version_from_raw(vcat_vvdec_version()) }
    }
}

/// Registry entry for the vvdec backend (`vcat.vvdec`).
#[derive(Debug, Default, Clone, Copy)]
pub struct VvdecPlugin;

impl DecoderPlugin<BuiltinDecoder> for VvdecPlugin {
    fn id(&self) -> &str {
        BackendKind::Vvc.plugin_id()
    }

    fn version(&self) -> String {
        VvdecAdapter::default().version()
    }

    fn mime_type(&self) -> &str {
        BackendKind::Vvc.mime_type()
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
        let hints = VvcThreadHints::new(threads);
        debug!(%hints, has_config = config.is_some(), "creating vvdec decoder");
        DecodeLoop::new(VvdecAdapter::new(config), hints, LoopSettings::default())
            .map(BuiltinDecoder::Vvc)
    }

    fn config_parser(&self) -> Option<Box<dyn CodecConfigParser>> {
        Some(Box::new(VvcConfigParser))
    }
}
