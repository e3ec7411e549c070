//! Fixed-capacity circular sample buffer.
//!
//! Used on both sides of sound streams: the host pushes decoded blocks in and
//! the audio loop pulls one sample per frame. The same storage doubles as a
//! delay line through [`SoundBuffer::write_sample`] and
//! [`SoundBuffer::read_sample`], which ignore the read cursor entirely.

use crate::float::Float;

/// Circular buffer of samples.
///
/// # Example
///
/// ```rust
/// use patchc_runtime::SoundBuffer;
///
/// let mut buffer = SoundBuffer::<f32>::new(4);
/// buffer.push(&[1.0, 2.0]);
/// assert_eq!(buffer.pull(), 1.0);
/// assert_eq!(buffer.available(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct SoundBuffer<F> {
    data: Vec<F>,
    write_cursor: usize,
    read_cursor: usize,
    available: usize,
}

impl<F: Float> SoundBuffer<F> {
    /// Creates an empty buffer holding up to `capacity` samples.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "SoundBuffer capacity must be > 0");

        Self {
            data: vec![F::zero(); capacity],
            write_cursor: 0,
            read_cursor: 0,
            available: 0,
        }
    }

    /// Maximum number of samples held.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Number of samples that can be pulled.
    pub fn available(&self) -> usize {
        self.available
    }

    /// Appends `samples`, overwriting the oldest unread ones when full.
    ///
    /// Returns the number of samples available afterwards.
    pub fn push(&mut self, samples: &[F]) -> usize {
        let capacity = self.data.len();
        for &sample in samples {
            self.data[self.write_cursor] = sample;
            self.write_cursor = (self.write_cursor + 1) % capacity;
        }

        let total = self.available + samples.len();
        if total > capacity {
            self.available = capacity;
            self.read_cursor = self.write_cursor;
        } else {
            self.available = total;
        }
        self.available
    }

    /// Takes the oldest unread sample, or silence when empty.
    pub fn pull(&mut self) -> F {
        if self.available == 0 {
            return F::zero();
        }
        let sample = self.data[self.read_cursor];
        self.read_cursor = (self.read_cursor + 1) % self.data.len();
        self.available -= 1;
        sample
    }

    /// Writes one sample at the write cursor, delay-line style.
    #[inline]
    pub fn write_sample(&mut self, sample: F) {
        self.data[self.write_cursor] = sample;
        self.write_cursor = (self.write_cursor + 1) % self.data.len();
    }

    /// Reads the sample written `offset` writes ago (`offset` 1 is the latest).
    ///
    /// Offsets wrap modulo the capacity.
    #[inline]
    pub fn read_sample(&self, offset: usize) -> F {
        let len = self.data.len();
        self.data[(len + self.write_cursor - offset % len) % len]
    }

    /// Zeroes the storage and resets both cursors.
    pub fn clear(&mut self) {
        self.data.fill(F::zero());
        self.write_cursor = 0;
        self.read_cursor = 0;
        self.available = 0;
    }
}
