use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::{
    BackendError, BackendKind, Backpressure, DecodedPicture, DecoderAdapter, DequeueStatus,
    NativeCode, QueueStatus, TimestampUs,
};

pub(crate) type SharedNative = Rc<RefCell<FakeNative>>;

/// Scripted native engine; empty scripts answer capacity=true, queue=Ok,
/// dequeue=None.
#[derive(Debug, Default)]
pub(crate) struct FakeNative {
    pub fail_create: bool,
    pub capacity: VecDeque<bool>,
    pub queue_results: VecDeque<QueueStatus>,
    pub dequeue_results: VecDeque<DequeueStatus<u32>>,
    pub render_result: Option<NativeCode>,

    pub capacity_calls: usize,
    pub queue_calls: usize,
    pub queued: Vec<TimestampUs>,
    pub dequeue_calls: usize,
    pub flush_calls: usize,
    pub eos_calls: usize,
    pub binds: Vec<Option<u32>>,
    pub rendered: Vec<u32>,
    pub released: Vec<u32>,
    pub closed: usize,
    /// Ordered log of teardown-relevant calls.
    pub events: Vec<&'static str>,
}

#[derive(Debug)]
pub(crate) struct FakeAdapter {
    native: SharedNative,
    backpressure: Backpressure,
}

impl FakeAdapter {
    pub(crate) fn new() -> (Self, SharedNative) {
        Self::with_backpressure(Backpressure::ProbeCapacity)
    }

    pub(crate) fn with_backpressure(backpressure: Backpressure) -> (Self, SharedNative) {
        let native = SharedNative::default();
        (
            Self {
                native: Rc::clone(&native),
                backpressure,
            },
            native,
        )
    }
}

pub(crate) fn frame(picture: u32, pts: i64) -> DequeueStatus<u32> {
    DequeueStatus::Frame(DecodedPicture {
        picture,
        width: 64,
        height: 36,
        pts: TimestampUs(pts),
    })
}

impl DecoderAdapter for FakeAdapter {
    type ThreadHints = u32;
    type Context = ();
    type Picture = u32;
    type Surface = u32;

    fn backend(&self) -> BackendKind {
        BackendKind::Av1
    }

    fn backpressure(&self) -> Backpressure {
        self.backpressure
    }

    fn create(&mut self, _hints: u32) -> Result<(), BackendError> {
        if self.native.borrow().fail_create {
            return Err(BackendError::CreationFailed("scripted".to_string()));
        }
        Ok(())
    }

    fn queue(&mut self, _ctx: &mut (), _payload: &[u8], pts: TimestampUs) -> QueueStatus {
        let mut native = self.native.borrow_mut();
        native.queue_calls += 1;
        let status = native.queue_results.pop_front().unwrap_or(QueueStatus::Ok);
        if status == QueueStatus::Ok {
            native.queued.push(pts);
        }
        status
    }

    fn dequeue(&mut self, _ctx: &mut ()) -> DequeueStatus<u32> {
        let mut native = self.native.borrow_mut();
        native.dequeue_calls += 1;
        native.dequeue_results.pop_front().unwrap_or(DequeueStatus::None)
    }

    fn flush(&mut self, _ctx: &mut ()) {
        self.native.borrow_mut().flush_calls += 1;
    }

    fn signal_end_of_stream(&mut self, _ctx: &mut ()) {
        self.native.borrow_mut().eos_calls += 1;
    }

    fn has_capacity(&self, _ctx: &()) -> bool {
        let mut native = self.native.borrow_mut();
        native.capacity_calls += 1;
        native.capacity.pop_front().unwrap_or(true)
    }

    fn bind_surface(&mut self, _ctx: &mut (), target: Option<&u32>) {
        let mut native = self.native.borrow_mut();
        native.binds.push(target.copied());
        native.events.push("bind");
    }

    fn render(&mut self, _ctx: &mut (), picture: &u32) -> Result<(), NativeCode> {
        let mut native = self.native.borrow_mut();
        match native.render_result {
            Some(code) => Err(code),
            None => {
                native.rendered.push(*picture);
                Ok(())
            }
        }
    }

    fn release_picture(&mut self, _ctx: &mut (), picture: u32) {
        let mut native = self.native.borrow_mut();
        native.released.push(picture);
        native.events.push("release");
    }

    fn close(&mut self, _ctx: ()) {
        let mut native = self.native.borrow_mut();
        native.closed += 1;
        native.events.push("close");
    }

    fn version(&self) -> String {
        "9.9.9".to_string()
    }
}
