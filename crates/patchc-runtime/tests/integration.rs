//! Integration tests for patchc-runtime.
//!
//! Exercises the skeduler, ring buffer and engine the way generated programs
//! drive them: configure, frame events, array updates and stream data.

use std::cell::RefCell;
use std::rc::Rc;

use patchc_runtime::{
    Engine, Message, OperationStatus, RecordingHost, SkedId, Skeduler, SoundBuffer, SoundInfo,
    Token, TokenType,
};

type Log = Rc<RefCell<Vec<String>>>;

fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

fn push(log: &Log, entry: impl Into<String>) -> impl FnOnce(&str) + 'static {
    let log = Rc::clone(log);
    let entry = entry.into();
    move |_: &str| log.borrow_mut().push(entry)
}

// ============================================================================
// 1. Message matching
// ============================================================================

#[test]
fn matching_is_positional_and_exact() {
    let msg: Message<f64> = Message::encode(&[Token::Float(1.0), Token::string("a")]);
    assert!(msg.is_matching(&[TokenType::Float, TokenType::String]));
    assert!(!msg.is_matching(&[TokenType::Float]));

    let single: Message<f64> = Message::floats(&[1.0]);
    assert!(!single.is_matching(&[TokenType::Float, TokenType::Float]));
}

// ============================================================================
// 2. Skeduler semantics
// ============================================================================

#[test]
fn logged_wait_resolves_once() {
    let calls = log();
    let mut sked = Skeduler::logged();

    let id = sked.wait("e", push(&calls, "first"));
    assert!(!id.is_null());
    assert!(calls.borrow().is_empty());

    sked.emit("e");
    assert_eq!(*calls.borrow(), vec!["first"]);

    sked.emit("e");
    assert_eq!(calls.borrow().len(), 1);

    let late = sked.wait("e", push(&calls, "late"));
    assert_eq!(late, SkedId::NULL);
    assert_eq!(*calls.borrow(), vec!["first", "late"]);
}

#[test]
fn cancel_is_idempotent() {
    let calls = log();
    let mut sked = Skeduler::unlogged();
    let id = sked.wait("e", push(&calls, "x"));

    sked.cancel(id);
    sked.cancel(id);
    sked.cancel(SkedId::NULL);
    sked.emit("e");
    assert!(calls.borrow().is_empty());

    let fired = sked.wait("e", push(&calls, "y"));
    sked.emit("e");
    sked.cancel(fired);
    assert_eq!(*calls.borrow(), vec!["y"]);
}

#[test]
fn wait_future_ignores_the_past() {
    let calls = log();
    let mut sked = Skeduler::logged();
    sked.emit("e");

    let id = sked.wait_future("e", push(&calls, "future"));
    assert!(!id.is_null());
    assert!(calls.borrow().is_empty());

    sked.emit("e");
    assert_eq!(*calls.borrow(), vec!["future"]);
}

#[test]
fn requests_fire_in_registration_order_before_subscriptions() {
    let calls = log();
    let mut sked = Skeduler::unlogged();
    let sub_log = Rc::clone(&calls);
    sked.subscribe("e", move |_| sub_log.borrow_mut().push("sub".into()));
    sked.wait("e", push(&calls, "a"));
    sked.wait("e", push(&calls, "b"));

    sked.emit("e");
    assert_eq!(*calls.borrow(), vec!["a", "b", "sub"]);
}

// ============================================================================
// 3. Ring buffer
// ============================================================================

#[test]
fn ring_buffer_wraparound() {
    let mut buffer = SoundBuffer::<f64>::new(5);
    buffer.push(&[11.0, 22.0, 33.0, 44.0]);
    assert_eq!(buffer.pull(), 11.0);
    assert_eq!(buffer.pull(), 22.0);

    assert_eq!(buffer.push(&[55.0, 66.0, 77.0]), 5);
    let drained: Vec<f64> = (0..5).map(|_| buffer.pull()).collect();
    assert_eq!(drained, vec![33.0, 44.0, 55.0, 66.0, 77.0]);
}

#[test]
fn empty_buffer_pulls_silence() {
    let mut buffer = SoundBuffer::<f32>::new(3);
    assert_eq!(buffer.pull(), 0.0);
    assert_eq!(buffer.available(), 0);
}

// ============================================================================
// 4. Engine
// ============================================================================

#[test]
fn engine_drives_frames_and_streams() {
    let calls = log();
    let mut engine: Engine<f32, _> = Engine::new(RecordingHost::default());

    let configured = Rc::clone(&calls);
    engine
        .commons_mut()
        .wait_engine_configure(move || configured.borrow_mut().push("configured".into()));
    engine.configure(48000.0, 2);

    let at_one = Rc::clone(&calls);
    engine
        .commons_mut()
        .wait_frame(1, move || at_one.borrow_mut().push("frame 1".into()));

    let info = SoundInfo {
        channel_count: 1,
        ..SoundInfo::default()
    };
    let closed = Rc::clone(&calls);
    let id = engine.fs_mut().open_sound_read_stream("in.wav", &info, 4, move |_, status| {
        closed.borrow_mut().push(format!("closed {}", status.code()));
    });
    assert_eq!(
        engine.fs_mut().on_sound_stream_data(id, &[vec![0.25, 0.5]]),
        Ok(2)
    );

    engine.advance_block();
    let pulled = engine.fs_mut().stream_buffers(id).map(|b| b[0].pull());
    assert_eq!(pulled, Some(0.25));

    engine
        .fs_mut()
        .on_close_sound_stream(id, OperationStatus::Success)
        .unwrap();
    assert!(engine.fs_mut().stream_buffers(id).is_none());

    assert_eq!(*calls.borrow(), vec!["configured", "frame 1", "closed 0"]);
    assert_eq!(engine.fs().host().requests, vec!["open_read 1 in.wav"]);
}
