//! Flat binary messages exchanged between message portlets.
//!
//! A message is a sequence of float and string tokens packed into one byte
//! buffer with a self-describing header. Every header cell is a little-endian
//! `i32`:
//!
//! ```text
//! [ count | type_0 .. type_{N-1} | offset_0 .. offset_N | payload ... ]
//! ```
//!
//! Offsets are byte positions relative to the end of the header, `offset_N`
//! being the end of the payload, so the byte length of token `i` is
//! `offset_{i+1} - offset_i`. Floats take the width of `F`. Strings take one
//! header-sized cell per Unicode scalar value, which keeps character access O(1).
//!
//! # Example
//!
//! ```rust
//! use patchc_runtime::message::{Message, Token, TokenType};
//!
//! let msg: Message<f64> = Message::encode(&[Token::Float(1.0), Token::string("a")]);
//! assert!(msg.is_matching(&[TokenType::Float, TokenType::String]));
//! assert_eq!(msg.to_string(), "[1.0, \"a\"]");
//! ```

use core::fmt;
use core::marker::PhantomData;
use core::ops::Range;

use crate::error::MessageError;
use crate::float::Float;

/// Size in bytes of one header cell (and of one string character).
pub const HEADER_CELL_BYTES: usize = 4;

/// Kind of a message token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    /// A float in the program's bit depth.
    Float,
    /// A string of Unicode scalar values.
    String,
}

impl TokenType {
    /// Tag written in the message header.
    pub const fn tag(self) -> i32 {
        match self {
            TokenType::Float => 0,
            TokenType::String => 1,
        }
    }

    /// Parses a header tag.
    pub const fn from_tag(tag: i32) -> Option<Self> {
        match tag {
            0 => Some(TokenType::Float),
            1 => Some(TokenType::String),
            _ => None,
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::Float => write!(f, "float"),
            TokenType::String => write!(f, "string"),
        }
    }
}

/// A decoded token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<F> {
    /// Float token.
    Float(F),
    /// String token.
    String(String),
}

impl<F: Float> Token<F> {
    /// Shorthand for a string token.
    pub fn string(value: impl Into<String>) -> Self {
        Token::String(value.into())
    }

    /// Type of this token.
    pub fn token_type(&self) -> TokenType {
        match self {
            Token::Float(_) => TokenType::Float,
            Token::String(_) => TokenType::String,
        }
    }

    fn spec(&self) -> TokenSpec {
        match self {
            Token::Float(_) => TokenSpec::Float,
            Token::String(s) => TokenSpec::String(s.chars().count()),
        }
    }
}

/// Shape of a token, used to allocate a message before writing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSpec {
    /// One float.
    Float,
    /// A string with the given number of characters.
    String(usize),
}

impl TokenSpec {
    fn token_type(self) -> TokenType {
        match self {
            TokenSpec::Float => TokenType::Float,
            TokenSpec::String(_) => TokenType::String,
        }
    }

    fn byte_len<F: Float>(self) -> usize {
        match self {
            TokenSpec::Float => F::BYTES,
            TokenSpec::String(chars) => chars * HEADER_CELL_BYTES,
        }
    }
}

/// Encoded message with float width `F`.
#[derive(Clone, PartialEq)]
pub struct Message<F> {
    bytes: Vec<u8>,
    token_count: usize,
    _width: PhantomData<F>,
}

/// Number of header cells for `token_count` tokens.
pub const fn header_cells(token_count: usize) -> usize {
    2 + 2 * token_count
}

fn read_cell(bytes: &[u8], cell: usize) -> i32 {
    let start = cell * HEADER_CELL_BYTES;
    let mut raw = [0u8; HEADER_CELL_BYTES];
    raw.copy_from_slice(&bytes[start..start + HEADER_CELL_BYTES]);
    i32::from_le_bytes(raw)
}

fn write_cell(bytes: &mut [u8], cell: usize, value: i32) {
    let start = cell * HEADER_CELL_BYTES;
    bytes[start..start + HEADER_CELL_BYTES].copy_from_slice(&value.to_le_bytes());
}

impl<F: Float> Message<F> {
    /// Allocates a zeroed message with the given token shapes.
    pub fn from_template(template: &[TokenSpec]) -> Self {
        let token_count = template.len();
        let header_len = header_cells(token_count) * HEADER_CELL_BYTES;
        let payload_len: usize = template.iter().map(|spec| spec.byte_len::<F>()).sum();

        let mut bytes = vec![0u8; header_len + payload_len];
        write_cell(&mut bytes, 0, token_count as i32);

        let mut offset = 0usize;
        write_cell(&mut bytes, 1 + token_count, 0);
        for (i, spec) in template.iter().enumerate() {
            write_cell(&mut bytes, 1 + i, spec.token_type().tag());
            offset += spec.byte_len::<F>();
            write_cell(&mut bytes, 2 + token_count + i, offset as i32);
        }

        Self {
            bytes,
            token_count,
            _width: PhantomData,
        }
    }

    /// Encodes a token sequence.
    pub fn encode(tokens: &[Token<F>]) -> Self {
        let template: Vec<TokenSpec> = tokens.iter().map(Token::spec).collect();
        let mut message = Self::from_template(&template);
        for (i, token) in tokens.iter().enumerate() {
            match token {
                Token::Float(value) => message.put_float(i, *value),
                Token::String(value) => message.put_string(i, value),
            }
        }
        message
    }

    /// Message made only of floats.
    pub fn floats(values: &[F]) -> Self {
        let tokens: Vec<Token<F>> = values.iter().map(|&v| Token::Float(v)).collect();
        Self::encode(&tokens)
    }

    /// Message made only of strings.
    pub fn strings(values: &[&str]) -> Self {
        let tokens: Vec<Token<F>> = values.iter().map(|&v| Token::string(v)).collect();
        Self::encode(&tokens)
    }

    /// The `["bang"]` message.
    pub fn bang() -> Self {
        Self::strings(&["bang"])
    }

    /// Parses and validates an encoded message.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, MessageError> {
        if bytes.len() < HEADER_CELL_BYTES {
            return Err(MessageError::Truncated {
                expected: HEADER_CELL_BYTES,
                actual: bytes.len(),
            });
        }

        let raw_count = read_cell(&bytes, 0);
        let token_count =
            usize::try_from(raw_count).map_err(|_| MessageError::InvalidTokenCount(raw_count))?;
        let header_len = header_cells(token_count)
            .checked_mul(HEADER_CELL_BYTES)
            .ok_or(MessageError::InvalidTokenCount(raw_count))?;
        if bytes.len() < header_len {
            return Err(MessageError::Truncated {
                expected: header_len,
                actual: bytes.len(),
            });
        }

        let payload_len = bytes.len() - header_len;
        let message = Self {
            bytes,
            token_count,
            _width: PhantomData,
        };

        if message.raw_offset(0) != 0 || message.raw_offset(token_count) != payload_len as i64 {
            return Err(MessageError::InvalidOffsets { index: 0 });
        }

        for index in 0..token_count {
            let tag = read_cell(&message.bytes, 1 + index);
            let token_type =
                TokenType::from_tag(tag).ok_or(MessageError::InvalidTokenType { index, tag })?;

            let (start, end) = (message.raw_offset(index), message.raw_offset(index + 1));
            if end < start {
                return Err(MessageError::InvalidOffsets { index });
            }
            let len = (end - start) as usize;
            match token_type {
                TokenType::Float if len != F::BYTES => {
                    return Err(MessageError::InvalidOffsets { index });
                }
                TokenType::String if len % HEADER_CELL_BYTES != 0 => {
                    return Err(MessageError::InvalidOffsets { index });
                }
                TokenType::String => {
                    let range = message.token_range(index);
                    for cell in range.step_by(HEADER_CELL_BYTES) {
                        let value = read_cell(&message.bytes[cell..], 0);
                        if char::from_u32(value as u32).is_none() {
                            return Err(MessageError::InvalidCodePoint { index, value });
                        }
                    }
                }
                TokenType::Float => {}
            }
        }

        Ok(message)
    }

    /// Raw encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the message, returning its encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Number of tokens.
    pub fn len(&self) -> usize {
        self.token_count
    }

    /// True if the message has no tokens.
    pub fn is_empty(&self) -> bool {
        self.token_count == 0
    }

    /// Type of token `index`, `None` past the end.
    pub fn token_type(&self, index: usize) -> Option<TokenType> {
        if index >= self.token_count {
            return None;
        }
        TokenType::from_tag(read_cell(&self.bytes, 1 + index))
    }

    /// True if token `index` is a float.
    pub fn is_float_token(&self, index: usize) -> bool {
        self.token_type(index) == Some(TokenType::Float)
    }

    /// True if token `index` is a string.
    pub fn is_string_token(&self, index: usize) -> bool {
        self.token_type(index) == Some(TokenType::String)
    }

    /// True iff the message has exactly the given token types, in order.
    pub fn is_matching(&self, pattern: &[TokenType]) -> bool {
        self.token_count == pattern.len()
            && pattern
                .iter()
                .enumerate()
                .all(|(i, &expected)| self.token_type(i) == Some(expected))
    }

    /// True for `["bang"]`.
    pub fn is_bang(&self) -> bool {
        self.is_matching(&[TokenType::String]) && self.string_at(0) == "bang"
    }

    /// Reads float token `index`.
    pub fn read_float(&self, index: usize) -> Result<F, MessageError> {
        self.check(index, TokenType::Float)?;
        let range = self.token_range(index);
        Ok(F::read_le(&self.bytes[range]))
    }

    /// Reads string token `index`.
    pub fn read_string(&self, index: usize) -> Result<String, MessageError> {
        self.check(index, TokenType::String)?;
        Ok(self.string_at(index))
    }

    /// Overwrites float token `index`.
    pub fn write_float(&mut self, index: usize, value: F) -> Result<(), MessageError> {
        self.check(index, TokenType::Float)?;
        self.put_float(index, value);
        Ok(())
    }

    /// Overwrites string token `index`; the character count must match the template.
    pub fn write_string(&mut self, index: usize, value: &str) -> Result<(), MessageError> {
        self.check(index, TokenType::String)?;
        let expected = self.token_range(index).len() / HEADER_CELL_BYTES;
        let actual = value.chars().count();
        if expected != actual {
            return Err(MessageError::StringLengthMismatch {
                index,
                expected,
                actual,
            });
        }
        self.put_string(index, value);
        Ok(())
    }

    /// Decodes all tokens, checking each one against its header type.
    pub fn decode(&self) -> Result<Vec<Token<F>>, MessageError> {
        (0..self.token_count)
            .map(|i| match self.token_type(i) {
                Some(TokenType::Float) => self.read_float(i).map(Token::Float),
                Some(TokenType::String) => self.read_string(i).map(Token::String),
                None => Err(MessageError::InvalidTokenType {
                    index: i,
                    tag: read_cell(&self.bytes, 1 + i),
                }),
            })
            .collect()
    }

    /// Decodes all tokens.
    ///
    /// Infallible because every constructor either builds the header itself
    /// or goes through [`Message::from_bytes`], which rejects unknown tags and
    /// invalid code points. Use [`Message::decode`] to get typed errors.
    pub fn tokens(&self) -> Vec<Token<F>> {
        (0..self.token_count)
            .map(|i| match self.token_type(i) {
                Some(TokenType::String) => Token::String(self.string_at(i)),
                Some(TokenType::Float) => Token::Float(F::read_le(&self.bytes[self.token_range(i)])),
                // tags are validated at construction
                None => Token::Float(F::zero()),
            })
            .collect()
    }

    fn check(&self, index: usize, expected: TokenType) -> Result<(), MessageError> {
        match self.token_type(index) {
            None => Err(MessageError::IndexOutOfRange {
                index,
                len: self.token_count,
            }),
            Some(actual) if actual != expected => Err(MessageError::TokenTypeMismatch {
                index,
                expected,
                actual,
            }),
            Some(_) => Ok(()),
        }
    }

    fn header_len(&self) -> usize {
        header_cells(self.token_count) * HEADER_CELL_BYTES
    }

    fn raw_offset(&self, index: usize) -> i64 {
        i64::from(read_cell(&self.bytes, 1 + self.token_count + index))
    }

    fn token_range(&self, index: usize) -> Range<usize> {
        let header_len = self.header_len();
        let start = header_len + self.raw_offset(index) as usize;
        let end = header_len + self.raw_offset(index + 1) as usize;
        start..end
    }

    fn put_float(&mut self, index: usize, value: F) {
        let range = self.token_range(index);
        value.write_le(&mut self.bytes[range]);
    }

    fn put_string(&mut self, index: usize, value: &str) {
        let start = self.token_range(index).start;
        for (i, c) in value.chars().enumerate() {
            let cell = start + i * HEADER_CELL_BYTES;
            self.bytes[cell..cell + HEADER_CELL_BYTES]
                .copy_from_slice(&(c as u32 as i32).to_le_bytes());
        }
    }

    fn string_at(&self, index: usize) -> String {
        self.token_range(index)
            .step_by(HEADER_CELL_BYTES)
            .map(|cell| {
                let value = read_cell(&self.bytes[cell..], 0) as u32;
                char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER)
            })
            .collect()
    }
}

/// Encodes tokens into raw bytes.
pub fn encode<F: Float>(tokens: &[Token<F>]) -> Vec<u8> {
    Message::encode(tokens).into_bytes()
}

/// Decodes raw bytes into tokens.
pub fn decode<F: Float>(bytes: &[u8]) -> Result<Vec<Token<F>>, MessageError> {
    Message::<F>::from_bytes(bytes.to_vec())?.decode()
}

/// Free-function form of [`Message::is_matching`].
pub fn is_matching<F: Float>(message: &Message<F>, pattern: &[TokenType]) -> bool {
    message.is_matching(pattern)
}

impl<F: Float> fmt::Display for Message<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, token) in self.tokens().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match token {
                Token::Float(value) => write!(f, "{value:?}")?,
                Token::String(value) => write!(f, "\"{value}\"")?,
            }
        }
        write!(f, "]")
    }
}

impl<F: Float> fmt::Debug for Message<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("tokens", &self.tokens())
            .finish()
    }
}
