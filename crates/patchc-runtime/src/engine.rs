//! One running program instance.

use std::fmt;

use crate::commons::Commons;
use crate::float::Float;
use crate::fs::{FileSystem, FsHost};

/// State of one engine: audio settings, frame counter, commons and file
/// operations. Engines share nothing, so several can run side by side.
///
/// # Example
///
/// ```rust
/// use patchc_runtime::{Engine, RecordingHost};
///
/// let mut engine: Engine<f64, _> = Engine::new(RecordingHost::default());
/// engine.configure(48000.0, 64);
/// engine.advance_frame();
/// assert_eq!(engine.frame(), 1);
/// ```
pub struct Engine<F, H> {
    sample_rate: f64,
    block_size: usize,
    frame: u64,
    commons: Commons<F>,
    fs: FileSystem<F, H>,
}

impl<F: Float, H: FsHost<F>> Engine<F, H> {
    /// Unconfigured engine talking to `host`.
    pub fn new(host: H) -> Self {
        Self {
            sample_rate: 0.0,
            block_size: 0,
            frame: 0,
            commons: Commons::new(),
            fs: FileSystem::new(host),
        }
    }

    /// Sets the audio settings, rewinds the frame counter and fires the
    /// engine-configure event.
    pub fn configure(&mut self, sample_rate: f64, block_size: usize) {
        tracing::debug!(sample_rate, block_size, "engine configure");
        self.sample_rate = sample_rate;
        self.block_size = block_size;
        self.frame = 0;
        self.commons.emit_engine_configure();
    }

    /// Fires the waits for the current frame, then moves to the next one.
    pub fn advance_frame(&mut self) {
        self.commons.emit_frame(self.frame);
        self.frame += 1;
    }

    /// Runs [`advance_frame`](Self::advance_frame) once per frame of a block.
    pub fn advance_block(&mut self) {
        for _ in 0..self.block_size {
            self.advance_frame();
        }
    }

    /// Current frame.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Sample rate set by the last [`configure`](Self::configure).
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Block size set by the last [`configure`](Self::configure).
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Arrays and events.
    pub fn commons(&self) -> &Commons<F> {
        &self.commons
    }

    /// Arrays and events, mutably.
    pub fn commons_mut(&mut self) -> &mut Commons<F> {
        &mut self.commons
    }

    /// File operations.
    pub fn fs(&self) -> &FileSystem<F, H> {
        &self.fs
    }

    /// File operations, mutably.
    pub fn fs_mut(&mut self) -> &mut FileSystem<F, H> {
        &mut self.fs
    }
}

impl<F, H: fmt::Debug> fmt::Debug for Engine<F, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("sample_rate", &self.sample_rate)
            .field("block_size", &self.block_size)
            .field("frame", &self.frame)
            .field("fs", &self.fs)
            .finish_non_exhaustive()
    }
}
