use std::fmt;

use crate::FrameHandle;

pub const DEFAULT_OUTPUT_SLOTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(usize);

impl SlotId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot{}", self.0)
    }
}

/// Fixed set of output slots, each holding at most one frame.
///
/// The pool only stores handles; giving the picture back to the native
/// decoder is done by [`crate::DecodeLoop::recycle`].
pub struct OutputPool<P> {
    slots: Vec<Option<FrameHandle<P>>>,
}

impl<P> OutputPool<P> {
    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity.max(1));
        slots.resize_with(capacity.max(1), || None);
        Self { slots }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn has_free_slot(&self) -> bool {
        self.slots.iter().any(Option::is_none)
    }

    /// Hands the frame back when every slot is taken.
    pub fn insert(&mut self, frame: FrameHandle<P>) -> Result<SlotId, FrameHandle<P>> {
        match self.slots.iter().position(Option::is_none) {
            Some(index) => {
                self.slots[index] = Some(frame);
                Ok(SlotId(index))
            }
            None => Err(frame),
        }
    }

    pub fn get(&self, slot: SlotId) -> Option<&FrameHandle<P>> {
        self.slots.get(slot.0).and_then(Option::as_ref)
    }

    pub fn take(&mut self, slot: SlotId) -> Option<FrameHandle<P>> {
        self.slots.get_mut(slot.0).and_then(Option::take)
    }

    pub fn drain(&mut self) -> Vec<FrameHandle<P>> {
        self.slots.iter_mut().filter_map(Option::take).collect()
    }
}

impl<P> fmt::Debug for OutputPool<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputPool")
            .field("capacity", &self.capacity())
            .field("occupied", &self.occupied())
            .finish()
    }
}
