//! Sample and message float width.
//!
//! A compiled program runs with a single float width, chosen once through its
//! [`BitDepth`]. On the native side the width is the type parameter `F` of
//! [`Message`](crate::Message), [`SoundBuffer`](crate::SoundBuffer) and
//! [`Engine`](crate::Engine), so two widths can never meet inside one program.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Float width of a compiled program, in bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum BitDepth {
    /// Single precision samples and message floats.
    F32,
    /// Double precision samples and message floats.
    #[default]
    F64,
}

impl BitDepth {
    /// Number of bits.
    pub const fn bits(self) -> u8 {
        match self {
            BitDepth::F32 => 32,
            BitDepth::F64 => 64,
        }
    }

    /// Number of bytes taken by one float.
    pub const fn bytes(self) -> usize {
        match self {
            BitDepth::F32 => 4,
            BitDepth::F64 => 8,
        }
    }
}

impl TryFrom<u8> for BitDepth {
    type Error = String;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            32 => Ok(BitDepth::F32),
            64 => Ok(BitDepth::F64),
            other => Err(format!("unsupported bit depth {other}, expected 32 or 64")),
        }
    }
}

impl From<BitDepth> for u8 {
    fn from(depth: BitDepth) -> Self {
        depth.bits()
    }
}

impl fmt::Display for BitDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

/// Float type a program is instantiated with (`f32` or `f64`).
pub trait Float:
    Copy + Default + PartialEq + PartialOrd + fmt::Debug + fmt::Display + Send + 'static
{
    /// Bit depth matching this type.
    const BIT_DEPTH: BitDepth;

    /// Encoded size in bytes.
    const BYTES: usize;

    /// Writes the value as little-endian bytes into `out` (`out.len() == BYTES`).
    fn write_le(self, out: &mut [u8]);

    /// Reads a value from little-endian bytes (`bytes.len() == BYTES`).
    fn read_le(bytes: &[u8]) -> Self;

    /// Lossy conversion from `f64`.
    fn from_f64(value: f64) -> Self;

    /// Widening conversion to `f64`.
    fn to_f64(self) -> f64;

    /// Silence.
    #[inline]
    fn zero() -> Self {
        Self::default()
    }
}

impl Float for f32 {
    const BIT_DEPTH: BitDepth = BitDepth::F32;
    const BYTES: usize = 4;

    #[inline]
    fn write_le(self, out: &mut [u8]) {
        out.copy_from_slice(&self.to_le_bytes());
    }

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(bytes);
        f32::from_le_bytes(raw)
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    #[inline]
    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl Float for f64 {
    const BIT_DEPTH: BitDepth = BitDepth::F64;
    const BYTES: usize = 8;

    #[inline]
    fn write_le(self, out: &mut [u8]) {
        out.copy_from_slice(&self.to_le_bytes());
    }

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        f64::from_le_bytes(raw)
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }
}
