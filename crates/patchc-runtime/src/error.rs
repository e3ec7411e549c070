//! Error types for the runtime primitives.

use thiserror::Error;

use crate::message::TokenType;

/// Errors raised while reading, writing or validating a [`Message`](crate::Message).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    /// Buffer is shorter than its header claims
    #[error("message truncated: expected at least {expected} bytes, got {actual}")]
    Truncated {
        /// Minimum byte length required.
        expected: usize,
        /// Byte length found.
        actual: usize,
    },

    /// Negative or oversized token count
    #[error("invalid token count {0}")]
    InvalidTokenCount(i32),

    /// Header type tag is neither float nor string
    #[error("token {index} has invalid type tag {tag}")]
    InvalidTokenType {
        /// Token position.
        index: usize,
        /// Tag found in the header.
        tag: i32,
    },

    /// Offsets are not monotonic or do not fit the payload
    #[error("token {index} has inconsistent offsets")]
    InvalidOffsets {
        /// Token position.
        index: usize,
    },

    /// String cell is not a Unicode scalar value
    #[error("token {index} contains invalid code point {value:#x}")]
    InvalidCodePoint {
        /// Token position.
        index: usize,
        /// Raw cell value.
        value: i32,
    },

    /// Token accessed as the wrong type
    #[error("token {index} is a {actual}, not a {expected}")]
    TokenTypeMismatch {
        /// Token position.
        index: usize,
        /// Type requested by the caller.
        expected: TokenType,
        /// Type stored in the header.
        actual: TokenType,
    },

    /// Token index past the end
    #[error("token index {index} out of range for message of length {len}")]
    IndexOutOfRange {
        /// Requested position.
        index: usize,
        /// Number of tokens.
        len: usize,
    },

    /// String does not fit the slot allocated by the template
    #[error("token {index} holds {expected} characters, got {actual}")]
    StringLengthMismatch {
        /// Token position.
        index: usize,
        /// Characters allocated.
        expected: usize,
        /// Characters supplied.
        actual: usize,
    },
}

/// Errors raised by [`Commons`](crate::Commons), [`FileSystem`](crate::FileSystem)
/// and node receivers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// Array lookup by an unregistered name
    #[error("unknown array '{0}'")]
    UnknownArray(String),

    /// A receiver got a message shape it has no handler for
    #[error("[{node_type}], id \"{node_id}\", inlet \"{inlet_id}\", unsupported message : {message}")]
    UnsupportedMessage {
        /// Type tag of the receiving node.
        node_type: String,
        /// Id of the receiving node.
        node_id: String,
        /// Id of the receiving inlet.
        inlet_id: String,
        /// Rendered message.
        message: String,
    },

    /// Response or data for an operation id that is not pending
    #[error("unknown {operation} operation id {id}")]
    UnknownOperation {
        /// Kind of operation the response was for.
        operation: &'static str,
        /// Operation id.
        id: u32,
    },

    /// Sound info message has the wrong shape
    #[error("invalid sound info: {0}")]
    InvalidSoundInfo(String),

    /// Message codec failure
    #[error("message error: {0}")]
    Message(#[from] MessageError),
}

impl RuntimeError {
    /// Create an unsupported message error.
    pub fn unsupported_message(
        node_type: impl Into<String>,
        node_id: impl Into<String>,
        inlet_id: impl Into<String>,
        message: impl ToString,
    ) -> Self {
        RuntimeError::UnsupportedMessage {
            node_type: node_type.into(),
            node_id: node_id.into(),
            inlet_id: inlet_id.into(),
            message: message.to_string(),
        }
    }

    /// Create an unknown operation error.
    pub fn unknown_operation(operation: &'static str, id: u32) -> Self {
        RuntimeError::UnknownOperation { operation, id }
    }
}
