//! Criterion benchmarks for the runtime primitives.
//!
//! Run with: cargo bench -p patchc-runtime
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use patchc_runtime::{Message, Skeduler, SoundBuffer, Token, TokenType};

const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512, 1024];

fn bench_message(c: &mut Criterion) {
    let mut group = c.benchmark_group("Message");

    let tokens: Vec<Token<f32>> = vec![
        Token::Float(440.0),
        Token::string("set"),
        Token::Float(0.5),
        Token::string("frequency"),
    ];
    group.bench_function("encode", |b| {
        b.iter(|| black_box(Message::encode(black_box(&tokens))));
    });

    let message = Message::encode(&tokens);
    group.bench_function("decode", |b| {
        b.iter(|| black_box(black_box(&message).decode()));
    });
    group.bench_function("is_matching", |b| {
        let shape = [
            TokenType::Float,
            TokenType::String,
            TokenType::Float,
            TokenType::String,
        ];
        b.iter(|| black_box(black_box(&message).is_matching(&shape)));
    });

    group.finish();
}

fn bench_sound_buffer(c: &mut Criterion) {
    let mut group = c.benchmark_group("SoundBuffer");

    for &block_size in BLOCK_SIZES {
        let block: Vec<f32> = (0..block_size).map(|i| i as f32).collect();
        group.bench_with_input(
            BenchmarkId::new("push_pull", block_size),
            &block_size,
            |b, &size| {
                let mut buffer = SoundBuffer::new(size * 4);
                b.iter(|| {
                    buffer.push(black_box(&block));
                    for _ in 0..size {
                        black_box(buffer.pull());
                    }
                });
            },
        );
    }

    group.finish();
}

fn bench_skeduler(c: &mut Criterion) {
    c.bench_function("Skeduler/frame_events", |b| {
        let mut skeduler = Skeduler::unlogged();
        let mut frame = 0u64;
        b.iter(|| {
            let event = frame.to_string();
            skeduler.wait_future(&(frame + 1).to_string(), |_: &str| {});
            skeduler.emit(black_box(&event));
            frame += 1;
        });
    });
}

criterion_group!(benches, bench_message, bench_sound_buffer, bench_skeduler);
criterion_main!(benches);
