//! Runtime primitives for compiled patches.
//!
//! Generated programs lean on a small support bundle: a binary message format,
//! a named-event scheduler, ring buffers for streamed audio, a registry of
//! named arrays and request/response file operations. This crate provides the
//! native versions of those primitives, owned per engine instance.
//!
//! # Features
//!
//! - **Messages**: float/string tokens in one flat buffer ([`Message`])
//! - **Skeduler**: wait, wait-future, subscribe, emit and cancel on named events
//! - **Sound buffers**: fixed-capacity circular sample storage
//! - **Commons**: arrays, engine-configure and per-frame events
//! - **File operations**: request ids, callbacks and stream buffers behind [`FsHost`]
//!
//! # Example
//!
//! ```rust
//! use patchc_runtime::{Engine, Message, RecordingHost};
//!
//! let mut engine: Engine<f32, _> = Engine::new(RecordingHost::default());
//! engine.commons_mut().set_array("table", vec![0.0, 0.5, 1.0]);
//! engine.configure(44100.0, 64);
//!
//! let msg: Message<f32> = Message::floats(&[440.0]);
//! assert_eq!(msg.to_string(), "[440.0]");
//! ```

mod commons;
mod engine;
mod error;
mod float;
mod fs;
mod skeduler;
mod sound_buffer;

/// Binary message codec.
pub mod message;

pub use commons::{Commons, ENGINE_CONFIGURE_EVENT};
pub use engine::Engine;
pub use error::{MessageError, RuntimeError};
pub use float::{BitDepth, Float};
pub use fs::{
    FileSystem, FsHost, OperationId, OperationStatus, ReadSoundFileCallback, RecordingHost,
    SoundInfo, StatusCallback,
};
pub use message::{HEADER_CELL_BYTES, Message, Token, TokenSpec, TokenType, header_cells};
pub use skeduler::{RequestCallback, SkedId, Skeduler, SubscriptionCallback};
pub use sound_buffer::SoundBuffer;
