//! Property-based tests for the runtime primitives.
//!
//! Covers message codec round-trips, structural matching and ring buffer
//! ordering using proptest for randomized inputs.

use patchc_runtime::message::{decode, encode};
use patchc_runtime::{Message, SoundBuffer, Token, TokenType};
use proptest::prelude::*;

fn token_f64() -> impl Strategy<Value = Token<f64>> {
    prop_oneof![
        (-1.0e9f64..1.0e9f64).prop_map(Token::Float),
        ".{0,12}".prop_map(Token::String),
    ]
}

fn token_f32() -> impl Strategy<Value = Token<f32>> {
    prop_oneof![
        (-1.0e6f32..1.0e6f32).prop_map(Token::Float),
        "[a-z~]{0,6}".prop_map(Token::String),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Any finite token sequence survives encode then decode at 64 bits.
    #[test]
    fn codec_roundtrip_f64(tokens in prop::collection::vec(token_f64(), 0..10)) {
        let bytes = encode(&tokens);
        let decoded = decode::<f64>(&bytes).unwrap();
        prop_assert_eq!(decoded, tokens);
    }

    /// Same at 32 bits.
    #[test]
    fn codec_roundtrip_f32(tokens in prop::collection::vec(token_f32(), 0..10)) {
        let msg = Message::encode(&tokens);
        let reparsed = Message::<f32>::from_bytes(msg.clone().into_bytes()).unwrap();
        prop_assert_eq!(reparsed.decode().unwrap(), tokens);
        prop_assert_eq!(reparsed, msg);
    }

    /// A message always matches the pattern of its own token types and never
    /// a pattern of a different length.
    #[test]
    fn message_matches_own_shape(tokens in prop::collection::vec(token_f64(), 0..8)) {
        let msg = Message::encode(&tokens);
        let pattern: Vec<TokenType> = tokens.iter().map(Token::token_type).collect();
        prop_assert!(msg.is_matching(&pattern));

        let mut longer = pattern.clone();
        longer.push(TokenType::Float);
        prop_assert!(!msg.is_matching(&longer));
    }

    /// Pulling after any push yields the newest `min(n, capacity)` samples in order.
    #[test]
    fn ring_buffer_keeps_newest(
        capacity in 1usize..16,
        samples in prop::collection::vec(-1.0f64..1.0, 0..40),
    ) {
        let mut buffer = SoundBuffer::new(capacity);
        let available = buffer.push(&samples);
        let kept = samples.len().min(capacity);
        prop_assert_eq!(available, kept);

        let tail = &samples[samples.len() - kept..];
        for &expected in tail {
            prop_assert_eq!(buffer.pull(), expected);
        }
        prop_assert_eq!(buffer.pull(), 0.0);
    }
}
