use std::fmt::{self, Display};

/// Tile threads the AV1 plugin pairs with every frame thread.
pub const DEFAULT_TILE_THREADS: u32 = 4;

/// AV1 parallelism: frames decoded concurrently times tiles per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Av1ThreadHints {
    pub frame_threads: u32,
    pub tile_threads: u32,
}

impl Av1ThreadHints {
    #[must_use]
    pub fn new(frame_threads: u32, tile_threads: u32) -> Self {
        Self {
            frame_threads: frame_threads.max(1),
            tile_threads: tile_threads.max(1),
        }
    }

    /// Plugin mapping: `threads` frame threads, [`DEFAULT_TILE_THREADS`] tile
    /// threads.
    #[must_use]
    pub fn from_thread_count(threads: u32) -> Self {
        Self::new(threads, DEFAULT_TILE_THREADS)
    }
}

impl Default for Av1ThreadHints {
    fn default() -> Self {
        Self::from_thread_count(1)
    }
}

impl Display for Av1ThreadHints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Av1ThreadHints(frame_threads={}, tile_threads={})",
            self.frame_threads, self.tile_threads
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VvcThreadHints {
    pub workers: u32,
}

impl VvcThreadHints {
    #[must_use]
    pub fn new(workers: u32) -> Self {
        Self {
            workers: workers.max(1),
        }
    }
}

impl Default for VvcThreadHints {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Display for VvcThreadHints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VvcThreadHints(workers={})", self.workers)
    }
}
