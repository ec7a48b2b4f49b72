use std::fmt::{self, Display};

use tracing::{debug, info, warn};

use crate::handle::NativeDecoder;
use crate::pool::{DEFAULT_OUTPUT_SLOTS, OutputPool, SlotId};
use crate::surface::SurfaceBinding;
use crate::{
    BackendError, Backpressure, DecodeOutcome, DecodeRequest, DecoderAdapter, DecoderId,
    DequeueStatus, FrameHandle, InputDisposition, QueueStatus, RejectedFrame, Submission,
};

fn should_report_metrics() -> bool {
    std::env::var("VIDEO_SW_METRICS")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSettings {
    pub output_slots: usize,
    /// `None` defers to the `VIDEO_SW_METRICS` environment variable.
    pub report_metrics: Option<bool>,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            output_slots: DEFAULT_OUTPUT_SLOTS,
            report_metrics: None,
        }
    }
}

impl Display for LoopSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LoopSettings(output_slots={}, report_metrics={:?})",
            self.output_slots, self.report_metrics
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Ready,
    /// Input was held back, or end of stream has been signaled.
    Draining,
    /// End of stream signaled and a drain attempt came back empty.
    Ended,
}

impl Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => f.write_str("ready"),
            Self::Draining => f.write_str("draining"),
            Self::Ended => f.write_str("ended"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeSummary {
    pub queued_inputs: usize,
    pub retained_inputs: usize,
    pub try_again: usize,
    pub frames_produced: usize,
    pub frames_rendered: usize,
    pub frames_released: usize,
    pub frames_skipped: usize,
    pub flushes: usize,
}

impl DecodeSummary {
    /// Frames handed out that have not come back through `release_frame`.
    pub fn frames_outstanding(&self) -> usize {
        self.frames_produced.saturating_sub(self.frames_released)
    }
}

impl Display for DecodeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DecodeSummary(queued={}, retained={}, try_again={}, produced={}, rendered={}, released={}, skipped={}, flushes={})",
            self.queued_inputs,
            self.retained_inputs,
            self.try_again,
            self.frames_produced,
            self.frames_rendered,
            self.frames_released,
            self.frames_skipped,
            self.flushes
        )
    }
}

/// Drives one native decoder: queues access units, drains at most one frame
/// per call, and owns the output slots and surface binding.
///
/// Not thread-safe; a single caller feeds `submit` and releases frames.
pub struct DecodeLoop<A: DecoderAdapter> {
    native: NativeDecoder<A>,
    surface: SurfaceBinding<A::Surface>,
    outputs: OutputPool<A::Picture>,
    state: LoopState,
    eos_signaled: bool,
    settings: LoopSettings,
    summary: DecodeSummary,
    last_error: Option<BackendError>,
    last_input: Option<InputDisposition>,
    name: String,
}

impl<A: DecoderAdapter> DecodeLoop<A> {
    pub fn new(
        adapter: A,
        hints: A::ThreadHints,
        settings: LoopSettings,
    ) -> Result<Self, BackendError> {
        if settings.output_slots == 0 {
            return Err(BackendError::UnsupportedConfig(
                "output_slots must be at least 1".to_string(),
            ));
        }
        let native = NativeDecoder::open(adapter, hints)?;
        let name = format!(
            "{}-{}",
            native.adapter().backend().decoder_prefix(),
            native.adapter().version()
        );
        debug!(decoder = %native.id(), %name, %settings, "decode loop ready");
        Ok(Self {
            native,
            surface: SurfaceBinding::new(),
            outputs: OutputPool::with_capacity(settings.output_slots),
            state: LoopState::Ready,
            eos_signaled: false,
            settings,
            summary: DecodeSummary::default(),
            last_error: None,
            last_input: None,
            name,
        })
    }

    pub fn id(&self) -> DecoderId {
        self.native.id()
    }

    /// `<prefix>-<native version>`, e.g. `vcat-dav1d-1.4.3`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn settings(&self) -> LoopSettings {
        self.settings
    }

    pub fn summary(&self) -> DecodeSummary {
        self.summary
    }

    /// Most recent fatal error. Survives `reset`.
    pub fn last_error(&self) -> Option<&BackendError> {
        self.last_error.as_ref()
    }

    /// What the most recent `submit` did with its request, including one that
    /// returned `Err`. `None` when that call failed before reaching the
    /// native queue, so the request was not consumed.
    pub fn last_input(&self) -> Option<InputDisposition> {
        self.last_input
    }

    pub fn is_released(&self) -> bool {
        !self.native.is_open()
    }

    pub fn has_free_output(&self) -> bool {
        self.outputs.has_free_slot()
    }

    pub fn held_outputs(&self) -> usize {
        self.outputs.occupied()
    }

    pub fn output_target(&self) -> Option<&A::Surface> {
        self.surface.current()
    }

    /// Feeds one request and performs at most one non-blocking dequeue.
    ///
    /// When `input` comes back as [`InputDisposition::Retained`] the payload
    /// was not consumed and the same request must be submitted again. On
    /// `Err`, [`DecodeLoop::last_input`] tells whether the payload had
    /// already been queued before the failure.
    pub fn submit(
        &mut self,
        request: &DecodeRequest,
    ) -> Result<Submission<A::Picture>, BackendError> {
        self.last_input = None;
        if self.is_released() {
            return Err(BackendError::Released);
        }
        if request.reset {
            self.reset()?;
        }
        if request.end_of_stream {
            return self.submit_end_of_stream(request.decode_only);
        }
        if self.eos_signaled {
            return Err(BackendError::StreamEnded);
        }
        if request.payload.is_empty() {
            return Err(BackendError::InvalidInput(
                "access unit payload is empty".to_string(),
            ));
        }

        let status = {
            let (adapter, ctx) = self.native.parts()?;
            if adapter.backpressure() == Backpressure::ProbeCapacity && !adapter.has_capacity(ctx)
            {
                None
            } else {
                Some(adapter.queue(ctx, &request.payload, request.pts))
            }
        };
        match status {
            None => self.hold_input(request.decode_only),
            Some(QueueStatus::TryAgain) => {
                self.summary.try_again += 1;
                self.hold_input(request.decode_only)
            }
            Some(QueueStatus::Err(code)) => Err(self.fail(BackendError::QueueFailed(code))),
            Some(QueueStatus::Ok) => {
                self.summary.queued_inputs += 1;
                self.last_input = Some(InputDisposition::Queued);
                self.state = LoopState::Ready;
                Ok(Submission {
                    outcome: self.dequeue_once(request.decode_only)?,
                    input: InputDisposition::Queued,
                })
            }
        }
    }

    /// Flushes native state and returns to `Ready`; clears `Ended`.
    ///
    /// Frames already handed out stay valid and must still be released.
    pub fn reset(&mut self) -> Result<(), BackendError> {
        let (adapter, ctx) = self.native.parts()?;
        adapter.flush(ctx);
        self.summary.flushes += 1;
        debug!(decoder = %self.native.id(), from = %self.state, "decoder flushed");
        self.state = LoopState::Ready;
        self.eos_signaled = false;
        Ok(())
    }

    fn submit_end_of_stream(
        &mut self,
        skip: bool,
    ) -> Result<Submission<A::Picture>, BackendError> {
        self.last_input = Some(InputDisposition::EndOfStream);
        if self.state == LoopState::Ended {
            return Ok(Submission {
                outcome: DecodeOutcome::EndOfStreamReached,
                input: InputDisposition::EndOfStream,
            });
        }
        if !self.eos_signaled {
            let (adapter, ctx) = self.native.parts()?;
            adapter.signal_end_of_stream(ctx);
            self.eos_signaled = true;
            self.state = LoopState::Draining;
            debug!(decoder = %self.native.id(), "end of stream signaled");
        }
        let outcome = match self.dequeue_once(skip)? {
            DecodeOutcome::NoFrameYet => {
                self.state = LoopState::Ended;
                debug!(decoder = %self.native.id(), summary = %self.summary, "stream drained");
                DecodeOutcome::EndOfStreamReached
            }
            produced => produced,
        };
        Ok(Submission {
            outcome,
            input: InputDisposition::EndOfStream,
        })
    }

    fn hold_input(&mut self, skip: bool) -> Result<Submission<A::Picture>, BackendError> {
        self.summary.retained_inputs += 1;
        self.last_input = Some(InputDisposition::Retained);
        self.state = LoopState::Draining;
        debug!(decoder = %self.native.id(), "native queue full; input retained");
        Ok(Submission {
            outcome: self.dequeue_once(skip)?,
            input: InputDisposition::Retained,
        })
    }

    fn dequeue_once(&mut self, skip: bool) -> Result<DecodeOutcome<A::Picture>, BackendError> {
        let owner = self.native.id();
        let status = {
            let (adapter, ctx) = self.native.parts()?;
            adapter.dequeue(ctx)
        };
        match status {
            DequeueStatus::None => Ok(DecodeOutcome::NoFrameYet),
            DequeueStatus::Frame(decoded) => {
                self.summary.frames_produced += 1;
                if skip {
                    self.summary.frames_skipped += 1;
                }
                Ok(DecodeOutcome::FrameProduced(FrameHandle::new(
                    owner, decoded, skip,
                )))
            }
            DequeueStatus::Err(code) => Err(self.fail(BackendError::DequeueFailed(code))),
        }
    }

    fn fail(&mut self, err: BackendError) -> BackendError {
        warn!(decoder = %self.native.id(), error = %err, "native call failed");
        self.last_error = Some(err.clone());
        err
    }

    fn check_owner(&self, frame: &FrameHandle<A::Picture>) -> Result<(), BackendError> {
        if frame.owner() == self.native.id() {
            Ok(())
        } else {
            Err(BackendError::InvalidInput(format!(
                "frame from {} given to {}",
                frame.owner(),
                self.native.id()
            )))
        }
    }

    /// Renders the frame into the currently bound output target.
    pub fn render(&mut self, frame: &FrameHandle<A::Picture>) -> Result<(), BackendError> {
        self.check_owner(frame)?;
        let result = {
            let (adapter, ctx) = self.native.parts()?;
            match frame.picture() {
                Some(picture) => adapter.render(ctx, picture),
                None => return Err(BackendError::InvalidInput("frame already released".into())),
            }
        };
        match result {
            Ok(()) => {
                self.summary.frames_rendered += 1;
                Ok(())
            }
            Err(code) => Err(self.fail(BackendError::RenderFailed(code))),
        }
    }

    /// Gives the picture back to the native frame pool.
    ///
    /// A frame from another decoder comes back inside the error so it can
    /// still be released by its owner. After [`DecodeLoop::release`] this
    /// fails with `Released` and the native picture is gone with the context.
    pub fn release_frame(
        &mut self,
        frame: FrameHandle<A::Picture>,
    ) -> Result<(), RejectedFrame<A::Picture>> {
        if let Err(error) = self.check_owner(&frame) {
            return Err(RejectedFrame { error, frame });
        }
        let (adapter, ctx) = match self.native.parts() {
            Ok(parts) => parts,
            Err(error) => return Err(RejectedFrame { error, frame }),
        };
        if let Some(picture) = frame.into_picture() {
            adapter.release_picture(ctx, picture);
            self.summary.frames_released += 1;
        }
        Ok(())
    }

    /// Parks a frame in a free output slot. The frame comes back untouched
    /// when every slot is taken or it belongs to another decoder.
    pub fn hold(
        &mut self,
        frame: FrameHandle<A::Picture>,
    ) -> Result<SlotId, FrameHandle<A::Picture>> {
        if self.is_released() || self.check_owner(&frame).is_err() {
            return Err(frame);
        }
        self.outputs.insert(frame)
    }

    pub fn output(&self, slot: SlotId) -> Option<&FrameHandle<A::Picture>> {
        self.outputs.get(slot)
    }

    /// Releases the frame held in `slot`; `Ok(false)` for an empty slot.
    pub fn recycle(&mut self, slot: SlotId) -> Result<bool, BackendError> {
        if self.is_released() {
            return Err(BackendError::Released);
        }
        match self.outputs.take(slot) {
            Some(frame) => self
                .release_frame(frame)
                .map(|()| true)
                .map_err(|rejected| rejected.error),
            None => Ok(false),
        }
    }

    /// Binds `target` (or unbinds with `None`); returns whether the native
    /// decoder was told.
    pub fn set_output_target(&mut self, target: Option<A::Surface>) -> Result<bool, BackendError> {
        let (adapter, ctx) = self.native.parts()?;
        let changed = self
            .surface
            .set_target(target, |bound| adapter.bind_surface(ctx, bound));
        if changed {
            debug!(decoder = %self.native.id(), target = ?self.surface.current(), "output target bound");
        }
        Ok(changed)
    }

    /// Rebinds if needed, renders the slot's frame and releases it. The
    /// frame is released even when rendering fails.
    pub fn render_slot(
        &mut self,
        slot: SlotId,
        target: Option<A::Surface>,
    ) -> Result<bool, BackendError> {
        self.set_output_target(target)?;
        let Some(frame) = self.outputs.take(slot) else {
            return Ok(false);
        };
        let rendered = self.render(&frame);
        self.release_frame(frame)
            .map_err(|rejected| rejected.error)?;
        rendered.map(|()| true)
    }

    /// Unbinds the output target, releases every pooled frame, then closes
    /// the native context. Idempotent.
    pub fn release(&mut self) {
        if self.is_released() {
            return;
        }
        if let Ok((adapter, ctx)) = self.native.parts() {
            self.surface
                .set_target(None, |bound| adapter.bind_surface(ctx, bound));
            for frame in self.outputs.drain() {
                if let Some(picture) = frame.into_picture() {
                    adapter.release_picture(ctx, picture);
                    self.summary.frames_released += 1;
                }
            }
        }
        self.native.close();

        let outstanding = self.summary.frames_outstanding();
        if outstanding > 0 {
            warn!(decoder = %self.native.id(), outstanding, "decoder released with frames still held by caller");
        }
        if self.settings.report_metrics.unwrap_or_else(should_report_metrics) {
            info!(decoder = %self.native.id(), name = %self.name, summary = %self.summary, "decoder closed");
        } else {
            debug!(decoder = %self.native.id(), summary = %self.summary, "decoder closed");
        }
    }
}

impl<A: DecoderAdapter> Drop for DecodeLoop<A> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<A: DecoderAdapter> fmt::Debug for DecodeLoop<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeLoop")
            .field("id", &self.native.id())
            .field("name", &self.name)
            .field("state", &self.state)
            .field("outputs", &self.outputs)
            .field("summary", &self.summary)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_adapter::{FakeAdapter, SharedNative, frame};
    use crate::{NativeCode, TimestampUs};

    fn open() -> (DecodeLoop<FakeAdapter>, SharedNative) {
        let (adapter, native) = FakeAdapter::new();
        (
            DecodeLoop::new(adapter, 2, LoopSettings::default()).unwrap(),
            native,
        )
    }

    fn unit(pts: i64) -> DecodeRequest {
        DecodeRequest::access_unit(vec![0x12, 0x00], TimestampUs(pts))
    }

    #[test]
    fn name_combines_prefix_and_version() {
        let (decoder, _native) = open();
        assert_eq!(decoder.name(), "vcat-dav1d-9.9.9");
        assert_eq!(decoder.state(), LoopState::Ready);
    }

    #[test]
    fn zero_output_slots_are_rejected() {
        let (adapter, native) = FakeAdapter::new();
        let settings = LoopSettings {
            output_slots: 0,
            report_metrics: Some(false),
        };
        assert!(matches!(
            DecodeLoop::new(adapter, 1, settings),
            Err(BackendError::UnsupportedConfig(_))
        ));
        assert_eq!(native.borrow().closed, 0);
    }

    #[test]
    fn creation_failure_is_surfaced() {
        let (adapter, native) = FakeAdapter::new();
        native.borrow_mut().fail_create = true;
        assert!(matches!(
            DecodeLoop::new(adapter, 1, LoopSettings::default()),
            Err(BackendError::CreationFailed(_))
        ));
    }

    #[test]
    fn retained_input_marks_draining_until_next_queue() {
        let (mut decoder, native) = open();
        native.borrow_mut().capacity.push_back(false);
        let first = decoder.submit(&unit(0)).unwrap();
        assert_eq!(first.input, InputDisposition::Retained);
        assert_eq!(decoder.state(), LoopState::Draining);

        let again = decoder.submit(&unit(0)).unwrap();
        assert_eq!(again.input, InputDisposition::Queued);
        assert_eq!(decoder.state(), LoopState::Ready);
        assert_eq!(native.borrow().queued, vec![TimestampUs(0)]);
        assert_eq!(decoder.summary().retained_inputs, 1);
    }

    #[test]
    fn try_again_mode_never_probes_capacity() {
        let (adapter, native) = FakeAdapter::with_backpressure(Backpressure::QueueTryAgain);
        let mut decoder = DecodeLoop::new(adapter, 1, LoopSettings::default()).unwrap();
        native
            .borrow_mut()
            .queue_results
            .push_back(QueueStatus::TryAgain);
        native.borrow_mut().dequeue_results.push_back(frame(4, 40));

        let held = decoder.submit(&unit(80)).unwrap();
        assert_eq!(held.input, InputDisposition::Retained);
        let frame = held.outcome.into_frame().unwrap();
        assert_eq!(frame.pts(), TimestampUs(40));
        decoder.release_frame(frame).unwrap();

        assert_eq!(native.borrow().capacity_calls, 0);
        assert_eq!(decoder.summary().try_again, 1);
    }

    #[test]
    fn queue_failure_is_fatal_and_survives_reset() {
        let (mut decoder, native) = open();
        native
            .borrow_mut()
            .queue_results
            .push_back(QueueStatus::Err(NativeCode(-5)));
        assert_eq!(
            decoder.submit(&unit(0)).unwrap_err(),
            BackendError::QueueFailed(NativeCode(-5))
        );
        assert_eq!(native.borrow().dequeue_calls, 0);

        decoder.reset().unwrap();
        assert_eq!(
            decoder.last_error(),
            Some(&BackendError::QueueFailed(NativeCode(-5)))
        );
    }

    #[test]
    fn dequeue_failure_while_draining_is_reported() {
        let (mut decoder, native) = open();
        native
            .borrow_mut()
            .dequeue_results
            .push_back(DequeueStatus::Err(NativeCode(-1)));
        assert_eq!(
            decoder
                .submit(&DecodeRequest::end_of_stream())
                .unwrap_err(),
            BackendError::DequeueFailed(NativeCode(-1))
        );
        assert_eq!(decoder.state(), LoopState::Draining);
    }

    #[test]
    fn end_of_stream_is_signaled_once_while_draining() {
        let (mut decoder, native) = open();
        native.borrow_mut().dequeue_results.extend([frame(1, 0), frame(2, 33)]);
        for id in [1, 2] {
            let out = decoder.submit(&DecodeRequest::end_of_stream()).unwrap();
            let frame = out.outcome.into_frame().unwrap();
            decoder.release_frame(frame).unwrap();
            assert_eq!(native.borrow().released.last(), Some(&id));
        }
        let done = decoder.submit(&DecodeRequest::end_of_stream()).unwrap();
        assert!(done.outcome.is_end_of_stream());
        assert_eq!(decoder.state(), LoopState::Ended);
        assert_eq!(native.borrow().eos_calls, 1);
    }

    #[test]
    fn reset_reopens_an_ended_stream() {
        let (mut decoder, native) = open();
        let _ = decoder.submit(&DecodeRequest::end_of_stream()).unwrap();
        assert_eq!(decoder.submit(&unit(0)).unwrap_err(), BackendError::StreamEnded);

        let resumed = decoder.submit(&unit(0).with_reset()).unwrap();
        assert_eq!(resumed.input, InputDisposition::Queued);
        assert_eq!(decoder.state(), LoopState::Ready);
        assert_eq!(native.borrow().flush_calls, 1);
        assert_eq!(decoder.summary().flushes, 1);
    }

    #[test]
    fn empty_payload_is_rejected_without_native_calls() {
        let (mut decoder, native) = open();
        assert!(matches!(
            decoder.submit(&DecodeRequest::access_unit(Vec::new(), TimestampUs(0))),
            Err(BackendError::InvalidInput(_))
        ));
        assert_eq!(native.borrow().queue_calls, 0);
        assert_eq!(native.borrow().capacity_calls, 0);
    }

    #[test]
    fn decode_only_frames_carry_skip_hint() {
        let (mut decoder, native) = open();
        native.borrow_mut().dequeue_results.push_back(frame(6, 0));
        let out = decoder.submit(&unit(0).with_decode_only(true)).unwrap();
        let frame = out.outcome.into_frame().unwrap();
        assert!(frame.should_skip());
        decoder.release_frame(frame).unwrap();
        assert_eq!(decoder.summary().frames_skipped, 1);
    }

    #[test]
    fn render_slot_releases_even_when_render_fails() {
        let (mut decoder, native) = open();
        native.borrow_mut().dequeue_results.push_back(frame(8, 0));
        native.borrow_mut().render_result = Some(NativeCode(-3));
        let frame = decoder.submit(&unit(0)).unwrap().outcome.into_frame().unwrap();
        let slot = decoder.hold(frame).unwrap();

        assert_eq!(
            decoder.render_slot(slot, Some(11)).unwrap_err(),
            BackendError::RenderFailed(NativeCode(-3))
        );
        assert_eq!(native.borrow().released, vec![8]);
        assert_eq!(native.borrow().binds, vec![Some(11)]);
        assert!(decoder.output(slot).is_none());
        assert!(!decoder.recycle(slot).unwrap());
    }

    #[test]
    fn render_slot_counts_rendered_frames() {
        let (mut decoder, native) = open();
        native.borrow_mut().dequeue_results.push_back(frame(2, 0));
        let frame = decoder.submit(&unit(0)).unwrap().outcome.into_frame().unwrap();
        let slot = decoder.hold(frame).unwrap();
        assert!(decoder.render_slot(slot, Some(1)).unwrap());
        assert_eq!(native.borrow().rendered, vec![2]);
        assert_eq!(decoder.summary().frames_rendered, 1);
    }

    #[test]
    fn frames_from_another_decoder_are_refused() {
        let (mut first, first_native) = open();
        let (mut second, _second_native) = open();
        first_native.borrow_mut().dequeue_results.push_back(frame(1, 0));
        let frame = first.submit(&unit(0)).unwrap().outcome.into_frame().unwrap();

        let frame = second.hold(frame).unwrap_err();
        assert!(second.render(&frame).is_err());
        let rejected = second.release_frame(frame).unwrap_err();
        assert!(matches!(rejected.error, BackendError::InvalidInput(_)));
        assert_eq!(second.summary().frames_released, 0);

        first.release_frame(rejected.frame).unwrap();
        first.release();
        assert_eq!(first_native.borrow().released, vec![1]);
        assert_eq!(first.summary().frames_outstanding(), 0);
    }

    #[test]
    fn dequeue_failure_after_queue_reports_the_input_as_consumed() {
        let (mut decoder, native) = open();
        native
            .borrow_mut()
            .dequeue_results
            .push_back(DequeueStatus::Err(NativeCode(-1)));
        assert_eq!(
            decoder.submit(&unit(7)).unwrap_err(),
            BackendError::DequeueFailed(NativeCode(-1))
        );
        assert_eq!(decoder.last_input(), Some(InputDisposition::Queued));
        assert_eq!(native.borrow().queued, vec![TimestampUs(7)]);
    }

    #[test]
    fn dequeue_failure_after_full_queue_leaves_the_input_retained() {
        let (mut decoder, native) = open();
        native.borrow_mut().capacity.push_back(false);
        native
            .borrow_mut()
            .dequeue_results
            .push_back(DequeueStatus::Err(NativeCode(-1)));
        assert!(decoder.submit(&unit(7)).is_err());
        assert_eq!(decoder.last_input(), Some(InputDisposition::Retained));
        assert!(native.borrow().queued.is_empty());

        let retried = decoder.submit(&unit(7)).unwrap();
        assert_eq!(retried.input, InputDisposition::Queued);
        assert_eq!(native.borrow().queued, vec![TimestampUs(7)]);
    }

    #[test]
    fn refused_submit_leaves_no_input_fate() {
        let (mut decoder, _native) = open();
        let _ = decoder.submit(&unit(0)).unwrap();
        assert_eq!(decoder.last_input(), Some(InputDisposition::Queued));
        assert!(decoder.submit(&DecodeRequest::access_unit(Vec::new(), TimestampUs(1))).is_err());
        assert_eq!(decoder.last_input(), None);
    }

    #[test]
    fn release_unbinds_then_releases_pool_then_closes() {
        let (mut decoder, native) = open();
        decoder.set_output_target(Some(3)).unwrap();
        native.borrow_mut().dequeue_results.push_back(frame(5, 0));
        let frame = decoder.submit(&unit(0)).unwrap().outcome.into_frame().unwrap();
        let slot = decoder.hold(frame).unwrap();

        decoder.release();
        decoder.release();
        assert!(decoder.is_released());
        assert_eq!(
            native.borrow().events,
            vec!["bind", "bind", "release", "close"]
        );
        assert_eq!(native.borrow().binds, vec![Some(3), None]);
        assert_eq!(decoder.submit(&unit(1)).unwrap_err(), BackendError::Released);
        assert_eq!(decoder.recycle(slot).unwrap_err(), BackendError::Released);
    }

    #[test]
    fn drop_closes_exactly_once() {
        let (decoder, native) = open();
        drop(decoder);
        assert_eq!(native.borrow().closed, 1);
        assert_eq!(native.borrow().events, vec!["close"]);
    }

    #[test]
    fn settings_display_lists_fields() {
        assert_eq!(
            LoopSettings::default().to_string(),
            "LoopSettings(output_slots=4, report_metrics=None)"
        );
    }
}
