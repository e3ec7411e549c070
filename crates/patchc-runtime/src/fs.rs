//! File operations as request/response pairs.
//!
//! A compiled program never touches the file system. It asks its host through
//! [`FsHost`], gets an [`OperationId`] back, and is called back when the host
//! answers with one of the `on_*` methods of [`FileSystem`]. Read streams keep
//! one [`SoundBuffer`] per channel that the host fills and the audio loop drains.
//!
//! Bookkeeping for an operation is dropped before its callback runs, whatever
//! the status, so a failed operation leaves nothing behind.

use std::collections::HashMap;
use std::fmt;

use crate::error::RuntimeError;
use crate::float::Float;
use crate::message::{Message, Token, TokenType};
use crate::sound_buffer::SoundBuffer;

/// Id of a pending file operation. Ids start at 1.
pub type OperationId = u32;

/// Outcome reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationStatus {
    /// The operation completed.
    Success,
    /// The operation failed.
    Failure,
}

impl OperationStatus {
    /// Numeric code used across the host boundary.
    pub const fn code(self) -> u8 {
        match self {
            OperationStatus::Success => 0,
            OperationStatus::Failure => 1,
        }
    }

    /// Parses a host status code. Anything but 0 is a failure.
    pub const fn from_code(code: u8) -> Self {
        if code == 0 {
            OperationStatus::Success
        } else {
            OperationStatus::Failure
        }
    }
}

/// Format of a sound file or stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundInfo {
    /// Number of channels.
    pub channel_count: u32,
    /// Samples per second.
    pub sample_rate: u32,
    /// Bits per sample.
    pub bit_depth: u32,
    /// Container or encoding, e.g. `"wav"`.
    pub encoding_format: String,
    /// `"l"` or `"b"`.
    pub endianness: String,
    /// Free-form options passed through to the host.
    pub extra_options: String,
}

const SOUND_INFO_PATTERN: [TokenType; 6] = [
    TokenType::Float,
    TokenType::Float,
    TokenType::Float,
    TokenType::String,
    TokenType::String,
    TokenType::String,
];

impl SoundInfo {
    /// Encodes as `[channels, sampleRate, bitDepth, format, endianness, options]`.
    pub fn to_message<F: Float>(&self) -> Message<F> {
        Message::encode(&[
            Token::Float(F::from_f64(f64::from(self.channel_count))),
            Token::Float(F::from_f64(f64::from(self.sample_rate))),
            Token::Float(F::from_f64(f64::from(self.bit_depth))),
            Token::string(self.encoding_format.as_str()),
            Token::string(self.endianness.as_str()),
            Token::string(self.extra_options.as_str()),
        ])
    }

    /// Decodes the layout written by [`SoundInfo::to_message`].
    pub fn from_message<F: Float>(message: &Message<F>) -> Result<Self, RuntimeError> {
        if !message.is_matching(&SOUND_INFO_PATTERN) {
            return Err(RuntimeError::InvalidSoundInfo(message.to_string()));
        }
        let count = |i: usize| -> Result<u32, RuntimeError> {
            let value = message.read_float(i)?.to_f64();
            if value < 0.0 || value.fract() != 0.0 || value > f64::from(u32::MAX) {
                return Err(RuntimeError::InvalidSoundInfo(format!(
                    "token {i} is not a count: {value}"
                )));
            }
            Ok(value as u32)
        };
        Ok(Self {
            channel_count: count(0)?,
            sample_rate: count(1)?,
            bit_depth: count(2)?,
            encoding_format: message.read_string(3)?,
            endianness: message.read_string(4)?,
            extra_options: message.read_string(5)?,
        })
    }
}

impl Default for SoundInfo {
    fn default() -> Self {
        Self {
            channel_count: 2,
            sample_rate: 44100,
            bit_depth: 32,
            encoding_format: String::new(),
            endianness: "l".to_owned(),
            extra_options: String::new(),
        }
    }
}

/// Requests a program sends to its host.
pub trait FsHost<F> {
    /// Read a whole sound file; answered by [`FileSystem::on_read_sound_file_response`].
    fn read_sound_file(&mut self, id: OperationId, url: &str, info: &SoundInfo);

    /// Write a whole sound file; answered by [`FileSystem::on_write_sound_file_response`].
    fn write_sound_file(&mut self, id: OperationId, sound: &[Vec<F>], url: &str, info: &SoundInfo);

    /// Start streaming a file in; data arrives through [`FileSystem::on_sound_stream_data`].
    fn open_sound_read_stream(&mut self, id: OperationId, url: &str, info: &SoundInfo);

    /// Start streaming a file out.
    fn open_sound_write_stream(&mut self, id: OperationId, url: &str, info: &SoundInfo);

    /// One block of an outgoing stream, one vector per channel.
    fn send_sound_stream_data(&mut self, id: OperationId, block: &[Vec<F>]);

    /// The program closed a stream.
    fn close_sound_stream(&mut self, id: OperationId, status: OperationStatus);
}

/// Callback for a whole-file read: status and one vector per channel.
pub type ReadSoundFileCallback<F> = Box<dyn FnOnce(OperationId, OperationStatus, Vec<Vec<F>>)>;

/// Callback for completions that carry only a status.
pub type StatusCallback = Box<dyn FnOnce(OperationId, OperationStatus)>;

enum Operation<F> {
    ReadFile(ReadSoundFileCallback<F>),
    WriteFile(StatusCallback),
    ReadStream {
        buffers: Vec<SoundBuffer<F>>,
        on_close: StatusCallback,
    },
    WriteStream {
        on_close: StatusCallback,
    },
}

impl<F> Operation<F> {
    fn kind(&self) -> &'static str {
        match self {
            Operation::ReadFile(_) => "read sound file",
            Operation::WriteFile(_) => "write sound file",
            Operation::ReadStream { .. } => "read stream",
            Operation::WriteStream { .. } => "write stream",
        }
    }
}

/// Pending file operations of one engine.
pub struct FileSystem<F, H> {
    host: H,
    next_id: OperationId,
    operations: HashMap<OperationId, Operation<F>>,
}

impl<F: Float, H: FsHost<F>> FileSystem<F, H> {
    /// Creates the bookkeeping around `host`.
    pub fn new(host: H) -> Self {
        Self {
            host,
            next_id: 1,
            operations: HashMap::new(),
        }
    }

    /// The host.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// The host, mutably.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Number of operations still waiting for an answer.
    pub fn pending_count(&self) -> usize {
        self.operations.len()
    }

    /// True if `id` is pending.
    pub fn is_pending(&self, id: OperationId) -> bool {
        self.operations.contains_key(&id)
    }

    /// Asks the host to read `url`.
    pub fn read_sound_file(
        &mut self,
        url: &str,
        info: &SoundInfo,
        callback: impl FnOnce(OperationId, OperationStatus, Vec<Vec<F>>) + 'static,
    ) -> OperationId {
        let id = self.insert(Operation::ReadFile(Box::new(callback)));
        self.host.read_sound_file(id, url, info);
        id
    }

    /// Asks the host to write `sound` to `url`.
    pub fn write_sound_file(
        &mut self,
        sound: &[Vec<F>],
        url: &str,
        info: &SoundInfo,
        callback: impl FnOnce(OperationId, OperationStatus) + 'static,
    ) -> OperationId {
        let id = self.insert(Operation::WriteFile(Box::new(callback)));
        self.host.write_sound_file(id, sound, url, info);
        id
    }

    /// Opens a read stream with one buffer of `buffer_capacity` samples per channel.
    ///
    /// # Panics
    ///
    /// Panics if `buffer_capacity` is 0.
    pub fn open_sound_read_stream(
        &mut self,
        url: &str,
        info: &SoundInfo,
        buffer_capacity: usize,
        on_close: impl FnOnce(OperationId, OperationStatus) + 'static,
    ) -> OperationId {
        let buffers = (0..info.channel_count)
            .map(|_| SoundBuffer::new(buffer_capacity))
            .collect();
        let id = self.insert(Operation::ReadStream {
            buffers,
            on_close: Box::new(on_close),
        });
        self.host.open_sound_read_stream(id, url, info);
        id
    }

    /// Opens a write stream.
    pub fn open_sound_write_stream(
        &mut self,
        url: &str,
        info: &SoundInfo,
        on_close: impl FnOnce(OperationId, OperationStatus) + 'static,
    ) -> OperationId {
        let id = self.insert(Operation::WriteStream {
            on_close: Box::new(on_close),
        });
        self.host.open_sound_write_stream(id, url, info);
        id
    }

    /// Sends one block on an open write stream.
    pub fn send_sound_stream_data(
        &mut self,
        id: OperationId,
        block: &[Vec<F>],
    ) -> Result<(), RuntimeError> {
        match self.operations.get(&id) {
            Some(Operation::WriteStream { .. }) => {
                self.host.send_sound_stream_data(id, block);
                Ok(())
            }
            _ => Err(RuntimeError::unknown_operation("write stream", id)),
        }
    }

    /// Channel buffers of an open read stream.
    pub fn stream_buffers(&mut self, id: OperationId) -> Option<&mut [SoundBuffer<F>]> {
        match self.operations.get_mut(&id) {
            Some(Operation::ReadStream { buffers, .. }) => Some(buffers.as_mut_slice()),
            _ => None,
        }
    }

    /// Closes a stream from the program side and tells the host.
    ///
    /// Unknown or already closed ids are ignored.
    pub fn close_sound_stream(&mut self, id: OperationId, status: OperationStatus) {
        if self.finish_stream(id, status) {
            self.host.close_sound_stream(id, status);
        }
    }

    /// Host answer to [`FileSystem::read_sound_file`].
    pub fn on_read_sound_file_response(
        &mut self,
        id: OperationId,
        status: OperationStatus,
        sound: Vec<Vec<F>>,
    ) -> Result<(), RuntimeError> {
        match self.operations.remove(&id) {
            Some(Operation::ReadFile(callback)) => {
                callback(id, status, sound);
                Ok(())
            }
            other => Err(self.mismatch(id, other, "read sound file")),
        }
    }

    /// Host answer to [`FileSystem::write_sound_file`].
    pub fn on_write_sound_file_response(
        &mut self,
        id: OperationId,
        status: OperationStatus,
    ) -> Result<(), RuntimeError> {
        match self.operations.remove(&id) {
            Some(Operation::WriteFile(callback)) => {
                callback(id, status);
                Ok(())
            }
            other => Err(self.mismatch(id, other, "write sound file")),
        }
    }

    /// Host pushes a block into a read stream. Returns the samples now
    /// available on the first channel.
    pub fn on_sound_stream_data(
        &mut self,
        id: OperationId,
        block: &[Vec<F>],
    ) -> Result<usize, RuntimeError> {
        let Some(buffers) = self.stream_buffers(id) else {
            tracing::warn!(id, "stream data for unknown read stream");
            return Err(RuntimeError::unknown_operation("read stream", id));
        };
        let mut available = 0;
        for (channel, (buffer, samples)) in buffers.iter_mut().zip(block).enumerate() {
            let now = buffer.push(samples);
            if channel == 0 {
                available = now;
            }
        }
        Ok(available)
    }

    /// Host closed a stream.
    pub fn on_close_sound_stream(
        &mut self,
        id: OperationId,
        status: OperationStatus,
    ) -> Result<(), RuntimeError> {
        if self.finish_stream(id, status) {
            Ok(())
        } else {
            tracing::warn!(id, "close for unknown stream");
            Err(RuntimeError::unknown_operation("stream", id))
        }
    }

    fn insert(&mut self, operation: Operation<F>) -> OperationId {
        let id = self.next_id;
        self.next_id += 1;
        tracing::trace!(id, kind = operation.kind(), "file operation requested");
        self.operations.insert(id, operation);
        id
    }

    fn finish_stream(&mut self, id: OperationId, status: OperationStatus) -> bool {
        match self.operations.remove(&id) {
            Some(
                Operation::ReadStream { on_close, .. } | Operation::WriteStream { on_close },
            ) => {
                on_close(id, status);
                true
            }
            Some(other) => {
                self.operations.insert(id, other);
                false
            }
            None => false,
        }
    }

    // Puts back an operation answered with the wrong response kind.
    fn mismatch(
        &mut self,
        id: OperationId,
        operation: Option<Operation<F>>,
        expected: &'static str,
    ) -> RuntimeError {
        tracing::warn!(id, expected, "response for unknown operation");
        if let Some(operation) = operation {
            self.operations.insert(id, operation);
        }
        RuntimeError::unknown_operation(expected, id)
    }
}

impl<F, H: fmt::Debug> fmt::Debug for FileSystem<F, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSystem")
            .field("host", &self.host)
            .field("next_id", &self.next_id)
            .field("pending", &self.operations.len())
            .finish()
    }
}

/// Host that records requests and never answers on its own.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RecordingHost {
    /// Requests in arrival order, one line each.
    pub requests: Vec<String>,
}

impl<F: Float> FsHost<F> for RecordingHost {
    fn read_sound_file(&mut self, id: OperationId, url: &str, _info: &SoundInfo) {
        self.requests.push(format!("read {id} {url}"));
    }

    fn write_sound_file(&mut self, id: OperationId, sound: &[Vec<F>], url: &str, _info: &SoundInfo) {
        self.requests
            .push(format!("write {id} {url} channels={}", sound.len()));
    }

    fn open_sound_read_stream(&mut self, id: OperationId, url: &str, _info: &SoundInfo) {
        self.requests.push(format!("open_read {id} {url}"));
    }

    fn open_sound_write_stream(&mut self, id: OperationId, url: &str, _info: &SoundInfo) {
        self.requests.push(format!("open_write {id} {url}"));
    }

    fn send_sound_stream_data(&mut self, id: OperationId, block: &[Vec<F>]) {
        let frames = block.first().map_or(0, Vec::len);
        self.requests.push(format!("data {id} frames={frames}"));
    }

    fn close_sound_stream(&mut self, id: OperationId, status: OperationStatus) {
        self.requests
            .push(format!("close {id} status={}", status.code()));
    }
}
