// tests/exclusion_and_diagnostics.rs

mod common;
use crate::common::builders::{options_ms, state_with};
use crate::common::spawn_recording;

use serde_json::json;
use tokio::time::{sleep, Duration};

use formwatch::{DiagnosticEvent, FieldUpdate, Origin, SkipReason, WatchOptions};
use formwatch_test_utils::recording::RecordingSink;

#[tokio::test(start_paused = true)]
async fn excluded_key_is_never_forwarded() {
    let state = state_with(&[("name", json!("")), ("email", json!(""))]);
    let (watchers, recorder) = spawn_recording(&state, options_ms(100).exclude_key("email"));

    state.set("email", json!("a@b.c"));
    sleep(Duration::from_millis(300)).await;
    assert!(recorder.is_empty());

    state.set("name", json!("Ann"));
    sleep(Duration::from_millis(300)).await;
    assert_eq!(
        recorder.updates(),
        vec![FieldUpdate::new("name", json!("Ann"), Origin::User)]
    );

    watchers.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn exclude_patterns_match_keys() {
    let state = state_with(&[("_internal", json!(0)), ("meta.rev", json!(1)), ("title", json!(""))]);
    let options = options_ms(50)
        .exclude_pattern("_*")
        .exclude_pattern("meta.*");
    let (watchers, recorder) = spawn_recording(&state, options);

    let watched: Vec<_> = watchers.watched_keys().into_iter().collect();
    assert_eq!(watched, vec!["title".to_string()]);

    state.set("_internal", json!(5));
    state.set("meta.rev", json!(2));
    sleep(Duration::from_millis(200)).await;
    assert!(recorder.is_empty());

    watchers.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn options_from_json_drive_exclusion() {
    let options =
        WatchOptions::from_json(&json!({"debounceDelay": 20, "excludedKeys": ["secret"]})).unwrap();
    let state = state_with(&[("secret", json!("")), ("name", json!(""))]);
    let (watchers, recorder) = spawn_recording(&state, options);

    state.set("secret", json!("hunter2"));
    sleep(Duration::from_millis(100)).await;
    state.set("name", json!("x"));
    sleep(Duration::from_millis(100)).await;

    let keys: Vec<_> = recorder.updates().into_iter().map(|u| u.key).collect();
    assert_eq!(keys, vec!["name".to_string()]);
    watchers.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn diagnostics_report_the_whole_lifecycle() {
    let sink = RecordingSink::new();
    let state = state_with(&[("name", json!("")), ("password", json!(""))]);
    let options = options_ms(50)
        .exclude_key("password")
        .with_diagnostic_sink(sink.sink());
    let (watchers, _recorder) = spawn_recording(&state, options);

    state.set("name", json!("Ann"));
    sleep(Duration::from_millis(100)).await;
    watchers.with_external(|| {
        state.set("name", json!("Server"));
    });
    sleep(Duration::from_millis(100)).await;
    state.set("age", json!(30));
    sleep(Duration::from_millis(10)).await;
    watchers.destroy();

    assert_eq!(
        sink.events(),
        vec![
            DiagnosticEvent::UpdateSkipped {
                key: "password".into(),
                reason: SkipReason::Excluded,
            },
            DiagnosticEvent::ValueChanged {
                key: "name".into(),
                old: Some(json!("")),
                new: json!("Ann"),
                origin: Origin::User,
            },
            DiagnosticEvent::DebouncedUpdate {
                key: "name".into(),
                value: json!("Ann"),
                origin: Origin::User,
            },
            DiagnosticEvent::ValueChanged {
                key: "name".into(),
                old: Some(json!("Ann")),
                new: json!("Server"),
                origin: Origin::External,
            },
            DiagnosticEvent::UpdateSkipped {
                key: "name".into(),
                reason: SkipReason::ExternalUpdate,
            },
            DiagnosticEvent::KeysAdded {
                keys: vec!["age".into()],
            },
            DiagnosticEvent::Destroyed,
        ]
    );

    watchers.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn diagnostics_are_silent_when_disabled() {
    let sink = RecordingSink::new();
    let state = state_with(&[("name", json!(""))]);
    let options = options_ms(50)
        .with_diagnostic_sink(sink.sink())
        .with_diagnostics(false);
    let (watchers, recorder) = spawn_recording(&state, options);

    state.set("name", json!("Ann"));
    sleep(Duration::from_millis(100)).await;

    assert_eq!(recorder.len(), 1);
    assert!(sink.events().is_empty());
    watchers.shutdown().await.unwrap();
}
