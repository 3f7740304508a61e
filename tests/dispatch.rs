//! Integration tests for action dispatch and user callables.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use keypad_hid::codes::{consumer, key, mouse};
use keypad_hid::{OutputEvent, Recorder, RecorderProvider};
use lemon_keypad::event::{self, EventSender};
use lemon_keypad::{
    ActiveAction, KeyAction, KeyEvent, Keymap, Keypad, LayerAction, LayerId, UserCallable,
};

fn keypad(layers: Vec<(LayerId, Vec<KeyAction>)>) -> (Keypad, Recorder, EventSender) {
    let key_count = layers[0].1.len();
    let keymap = Keymap::new(layers, LayerId::Index(0), key_count).unwrap();
    let recorder = Recorder::new();
    let (sender, source) = event::channel(64);
    let keypad = Keypad::new(keymap, source, RecorderProvider::new(recorder.clone()));
    (keypad, recorder, sender)
}

fn two_layers() -> (Keypad, Recorder, EventSender) {
    keypad(vec![
        (0.into(), vec![KeyAction::None, KeyAction::None]),
        (1.into(), vec![KeyAction::None, KeyAction::None]),
        (2.into(), vec![KeyAction::None, KeyAction::None]),
    ])
}

// ── Stateful actions ──

#[tokio::test]
async fn release_reverses_recorded_press() {
    let (mut kp, rec, _tx) = two_layers();

    let cases = [
        (
            KeyAction::RawKey(key::F1),
            OutputEvent::KeyPress(key::F1),
            OutputEvent::KeyRelease(key::F1),
        ),
        (
            KeyAction::MouseButton(mouse::RIGHT),
            OutputEvent::MousePress(mouse::RIGHT),
            OutputEvent::MouseRelease(mouse::RIGHT),
        ),
        (
            KeyAction::ConsumerCode(consumer::MUTE),
            OutputEvent::ConsumerPress(consumer::MUTE),
            OutputEvent::ConsumerRelease,
        ),
    ];
    for (action, pressed, released) in cases {
        kp.trigger_press(1, action).await;
        kp.trigger_release(1).await;
        assert_eq!(rec.take(), vec![pressed, released]);
        assert_eq!(kp.key_state(1), None);
    }
}

#[tokio::test]
async fn release_without_press_does_nothing() {
    let (mut kp, rec, _tx) = two_layers();
    kp.trigger_release(0).await;
    kp.trigger_release(99).await;
    assert!(rec.events().is_empty());
}

#[tokio::test]
async fn text_releases_everything_first() {
    let (mut kp, rec, _tx) = two_layers();
    kp.trigger_press(0, KeyAction::text("Hi")).await;
    assert_eq!(
        rec.events(),
        vec![
            OutputEvent::KeyReleaseAll,
            OutputEvent::ConsumerRelease,
            OutputEvent::MouseReleaseAll,
            OutputEvent::KeyPress(key::LEFT_SHIFT),
            OutputEvent::KeyPress(0x0B),
            OutputEvent::KeyReleaseAll,
            OutputEvent::KeyPress(0x0C),
            OutputEvent::KeyReleaseAll,
        ]
    );
    assert_eq!(kp.key_state(0), None);
}

// ── Sequences and combinations ──

#[tokio::test]
async fn sequence_clicks_each_element() {
    let (mut kp, rec, _tx) = two_layers();
    let seq = KeyAction::sequence(
        vec![KeyAction::RawKey(key::A), KeyAction::ConsumerCode(consumer::MUTE)],
        Duration::ZERO,
    )
    .unwrap();
    kp.trigger_press(0, seq).await;
    assert_eq!(
        rec.events(),
        vec![
            OutputEvent::KeyPress(key::A),
            OutputEvent::KeyRelease(key::A),
            OutputEvent::ConsumerPress(consumer::MUTE),
            OutputEvent::ConsumerRelease,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn sequence_waits_after_each_element() {
    let (mut kp, _rec, _tx) = two_layers();
    let seq = KeyAction::sequence(
        vec![KeyAction::RawKey(key::A), KeyAction::RawKey(key::B), KeyAction::RawKey(key::C)],
        Duration::from_millis(30),
    )
    .unwrap();
    let start = tokio::time::Instant::now();
    kp.trigger_press(0, seq).await;
    assert!(start.elapsed() >= Duration::from_millis(90));
}

#[tokio::test]
async fn combination_releases_in_press_order() {
    let (mut kp, rec, _tx) = two_layers();
    let combo: KeyAction = "Ctrl+Shift+Esc".parse().unwrap();
    kp.trigger_press(0, combo).await;
    assert_eq!(
        rec.events(),
        vec![
            OutputEvent::KeyPress(key::LEFT_CONTROL),
            OutputEvent::KeyPress(key::LEFT_SHIFT),
            OutputEvent::KeyPress(key::ESCAPE),
            OutputEvent::KeyRelease(key::LEFT_CONTROL),
            OutputEvent::KeyRelease(key::LEFT_SHIFT),
            OutputEvent::KeyRelease(key::ESCAPE),
        ]
    );
}

// ── Layer actions ──

#[tokio::test]
async fn layer_action_pushes_and_pops() {
    let (mut kp, rec, _tx) = two_layers();
    let action = LayerAction {
        layer: Some(1.into()),
        action: Some(KeyAction::MouseButton(mouse::LEFT)),
    };
    kp.trigger_press(0, action).await;
    assert_eq!(kp.layers().active(), &LayerId::Index(1));
    assert_eq!(
        kp.key_state(0),
        Some(&ActiveAction::Layer {
            layer: Some(1.into()),
            inner: Some(Box::new(ActiveAction::Mouse(mouse::LEFT))),
        })
    );

    kp.trigger_release(0).await;
    assert_eq!(kp.layers().as_slice(), &[LayerId::Index(0)]);
    assert_eq!(
        rec.events(),
        vec![
            OutputEvent::MousePress(mouse::LEFT),
            OutputEvent::MouseRelease(mouse::LEFT),
        ]
    );
}

#[tokio::test]
async fn unknown_layer_still_presses_inner_action() {
    let (mut kp, rec, _tx) = two_layers();
    let action = LayerAction {
        layer: Some("nope".into()),
        action: Some(KeyAction::RawKey(key::A)),
    };
    kp.trigger_press(0, action).await;
    assert_eq!(kp.layers().depth(), 1);
    kp.trigger_release(0).await;
    assert_eq!(
        rec.events(),
        vec![OutputEvent::KeyPress(key::A), OutputEvent::KeyRelease(key::A)]
    );
}

#[tokio::test]
async fn overlapping_layer_holds_pop_by_identity() {
    let (mut kp, _rec, _tx) = two_layers();
    kp.trigger_press(0, LayerAction { layer: Some(1.into()), action: None }).await;
    kp.trigger_press(1, LayerAction { layer: Some(2.into()), action: None }).await;
    // Releasing the first holder removes layer 1 from under layer 2
    kp.trigger_release(0).await;
    assert_eq!(kp.layers().as_slice(), &[LayerId::Index(0), LayerId::Index(2)]);
    kp.trigger_release(1).await;
    assert_eq!(kp.layers().as_slice(), &[LayerId::Index(0)]);
}

// ── Devices ──

#[tokio::test]
async fn missing_devices_are_skipped() {
    let (mut kp, rec, _tx) = two_layers();
    rec.set_connected(false);
    kp.trigger_press(0, KeyAction::RawKey(key::A)).await;
    kp.trigger_release(0).await;
    kp.trigger_press(0, KeyAction::text("x")).await;
    assert!(rec.events().is_empty());
    // The state was still recorded and released
    assert_eq!(kp.key_state(0), None);
}

// ── User callables ──

#[tokio::test]
async fn callable_gets_exclusive_access_and_engine_is_reset() {
    let (mut kp, rec, tx) = two_layers();
    let seen = Arc::new(AtomicUsize::new(0));

    let counter = seen.clone();
    let callable = UserCallable::from_fn("layer_and_key", move |kp: &mut Keypad| {
        // Queue was cleared before the call
        assert_eq!(kp.next_event(), None);
        kp.push_layer(2.into());
        kp.press_key(key::X);
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    kp.push_layer(1.into());
    kp.push_layer(2.into());
    kp.trigger_press(1, KeyAction::RawKey(key::B)).await;
    tx.push(KeyEvent::press(0));
    rec.clear();

    kp.trigger_press(0, KeyAction::UserCallable(callable)).await;

    assert_eq!(seen.load(Ordering::SeqCst), 1);
    assert_eq!(kp.layers().as_slice(), &[LayerId::Index(0)]);
    assert_eq!(kp.key_state(1), None);
    assert_eq!(kp.next_event(), None);
    assert_eq!(
        rec.events(),
        vec![
            OutputEvent::KeyReleaseAll,
            OutputEvent::ConsumerRelease,
            OutputEvent::MouseReleaseAll,
            OutputEvent::KeyPress(key::X),
            OutputEvent::KeyReleaseAll,
            OutputEvent::ConsumerRelease,
            OutputEvent::MouseReleaseAll,
        ]
    );
}

#[tokio::test]
async fn callable_errors_and_panics_are_contained() {
    let (mut kp, _rec, _tx) = two_layers();

    let failing = UserCallable::from_fn("failing", |_| anyhow::bail!("nope"));
    kp.push_layer(1.into());
    kp.trigger_press(0, KeyAction::UserCallable(failing)).await;
    assert_eq!(kp.layers().depth(), 1);

    let panicking = UserCallable::from_fn("panicking", |_| panic!("boom"));
    kp.push_layer(1.into());
    kp.trigger_press(0, KeyAction::UserCallable(panicking)).await;
    assert_eq!(kp.layers().depth(), 1);

    // Still usable afterwards
    kp.trigger_press(1, KeyAction::RawKey(key::A)).await;
    assert_eq!(kp.key_state(1), Some(&ActiveAction::Key(key::A)));
}

#[tokio::test]
async fn callable_inside_sequence_runs_in_order() {
    let (mut kp, rec, _tx) = two_layers();
    let callable = UserCallable::from_fn("type_z", |kp: &mut Keypad| {
        kp.tap_key(key::Z);
        Ok(())
    });
    let seq = KeyAction::sequence(
        vec![KeyAction::RawKey(key::A), KeyAction::UserCallable(callable)],
        Duration::ZERO,
    )
    .unwrap();
    kp.trigger_press(0, seq).await;
    assert_eq!(rec.key_presses(), vec![key::A, key::Z]);
}
