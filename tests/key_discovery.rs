// tests/key_discovery.rs

mod common;
use crate::common::builders::{options_ms, state_with};
use crate::common::{settle, spawn_recording};

use serde_json::json;
use tokio::time::{sleep, Duration};

use formwatch::{FieldUpdate, FormState, Origin};

#[tokio::test(start_paused = true)]
async fn key_added_later_is_watched_from_then_on() {
    let state = state_with(&[("name", json!(""))]);
    let (watchers, recorder) = spawn_recording(&state, options_ms(100));

    state.set("phone", json!("123"));
    settle().await;
    assert!(watchers.watched_keys().contains("phone"));

    // The write that created the key only triggers discovery.
    sleep(Duration::from_millis(200)).await;
    assert!(recorder.is_empty());

    state.set("phone", json!("1234"));
    sleep(Duration::from_millis(200)).await;
    assert_eq!(
        recorder.updates(),
        vec![FieldUpdate::new("phone", json!("1234"), Origin::User)]
    );

    watchers.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn keys_present_before_spawn_are_watched() {
    let state = FormState::new();
    state.set("a", json!(1));
    state.set("b", json!(2));
    let (watchers, _recorder) = spawn_recording(&state, options_ms(100));

    let watched: Vec<_> = watchers.watched_keys().into_iter().collect();
    assert_eq!(watched, vec!["a".to_string(), "b".to_string()]);
    // One per field plus the key-set observation.
    assert_eq!(watchers.active_watchers(), 3);
    assert_eq!(state.observer_count(), (2, 1));

    watchers.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn excluded_late_key_is_never_watched() {
    let state = state_with(&[("name", json!(""))]);
    let (watchers, recorder) = spawn_recording(&state, options_ms(50).exclude_key("token"));

    state.set("token", json!("abc"));
    state.set("token", json!("def"));
    sleep(Duration::from_millis(200)).await;

    assert!(!watchers.watched_keys().contains("token"));
    assert!(recorder.is_empty());
    watchers.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn removed_then_readded_key_keeps_a_single_watcher() {
    let state = state_with(&[("nickname", json!("JJ"))]);
    let (watchers, recorder) = spawn_recording(&state, options_ms(50));
    let before = state.observer_count();

    state.remove("nickname");
    state.set("nickname", json!("Johnny"));
    sleep(Duration::from_millis(200)).await;

    assert_eq!(state.observer_count(), before);
    assert_eq!(
        recorder.updates(),
        vec![FieldUpdate::new("nickname", json!("Johnny"), Origin::User)]
    );
    watchers.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn initial_keys_are_not_reported_as_added() {
    use formwatch_test_utils::recording::RecordingSink;
    use formwatch::DiagnosticEvent;

    let sink = RecordingSink::new();
    let state = state_with(&[("name", json!("")), ("email", json!(""))]);
    let (watchers, _recorder) =
        spawn_recording(&state, options_ms(50).with_diagnostic_sink(sink.sink()));

    state.set("phone", json!("1"));
    settle().await;

    let added: Vec<_> = sink
        .events()
        .into_iter()
        .filter(|e| matches!(e, DiagnosticEvent::KeysAdded { .. }))
        .collect();
    assert_eq!(
        added,
        vec![DiagnosticEvent::KeysAdded {
            keys: vec!["phone".into()],
        }]
    );
    watchers.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn diagnostic_sink_may_add_keys_while_keys_are_being_added() {
    use formwatch::DiagnosticEvent;

    let state = state_with(&[("name", json!(""))]);
    let sink = {
        let state = state.clone();
        move |event: &DiagnosticEvent| {
            let adds_phone = matches!(
                event,
                DiagnosticEvent::KeysAdded { keys } if keys.iter().any(|k| k == "phone")
            );
            if adds_phone {
                state.set("phone_verified", json!(false));
            }
        }
    };
    let (watchers, _recorder) =
        spawn_recording(&state, options_ms(50).with_diagnostic_sink(sink));

    state.set("phone", json!("1"));
    settle().await;

    let watched = watchers.watched_keys();
    assert!(watched.contains("phone"));
    assert!(watched.contains("phone_verified"));
    watchers.shutdown().await.unwrap();
}
