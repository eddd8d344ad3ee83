// tests/external_updates.rs

mod common;
use crate::common::builders::{options_ms, state_with};
use crate::common::{settle, spawn_recording};

use anyhow::anyhow;
use serde_json::{json, Value};
use tokio::time::{sleep, Duration};

use formwatch::{FieldUpdate, Origin};

#[tokio::test(start_paused = true)]
async fn external_changes_are_skipped_by_default() {
    let state = state_with(&[("id", json!(0)), ("name", json!(""))]);
    let (watchers, recorder) = spawn_recording(&state, options_ms(100));

    watchers
        .mark_update_as_external(|| {
            state.set("id", json!(42));
            state.set("name", json!("from server"));
            Ok::<_, anyhow::Error>(())
        })
        .unwrap();
    sleep(Duration::from_millis(300)).await;

    assert!(recorder.is_empty());
    watchers.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn external_changes_are_forwarded_with_origin_when_not_skipping() {
    let state = state_with(&[("id", json!(0))]);
    let (watchers, recorder) =
        spawn_recording(&state, options_ms(100).with_skip_external_updates(false));

    let returned = watchers.with_external(|| {
        state.set("id", json!(42));
        "done"
    });
    assert_eq!(returned, "done");
    sleep(Duration::from_millis(300)).await;

    assert_eq!(
        recorder.updates(),
        vec![FieldUpdate::new("id", json!(42), Origin::External)]
    );
    watchers.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn write_in_the_same_turn_as_the_scope_is_still_external() {
    let state = state_with(&[("id", json!(0)), ("name", json!(""))]);
    let (watchers, recorder) =
        spawn_recording(&state, options_ms(100).with_skip_external_updates(false));

    watchers.with_external(|| {
        state.set("id", json!(1));
    });
    // The reset is deferred to the engine loop, which has not run yet.
    state.set("name", json!("typed"));
    sleep(Duration::from_millis(300)).await;

    assert_eq!(
        recorder.updates(),
        vec![FieldUpdate::new("name", json!("typed"), Origin::External)]
    );
    watchers.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn write_after_the_loop_ran_is_a_user_change() {
    let state = state_with(&[("id", json!(0)), ("name", json!(""))]);
    let (watchers, recorder) =
        spawn_recording(&state, options_ms(100).with_skip_external_updates(false));

    watchers.with_external(|| {
        state.set("id", json!(1));
    });
    settle().await;
    state.set("name", json!("typed"));
    sleep(Duration::from_millis(300)).await;

    assert_eq!(
        recorder.updates(),
        vec![FieldUpdate::new("name", json!("typed"), Origin::User)]
    );
    watchers.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn failing_mutator_resets_the_flag_and_returns_the_error() {
    let state = state_with(&[("id", json!(0)), ("name", json!(""))]);
    let (watchers, recorder) = spawn_recording(&state, options_ms(100));

    let err = watchers
        .mark_update_as_external(|| {
            state.set("id", json!(9));
            Err::<(), _>(anyhow!("server rejected"))
        })
        .unwrap_err();
    assert_eq!(err.to_string(), "server rejected");

    state.set("name", json!("after"));
    sleep(Duration::from_millis(300)).await;

    // The write inside the failed scope was still external and skipped.
    assert_eq!(
        recorder.updates(),
        vec![FieldUpdate::new("name", json!("after"), Origin::User)]
    );
    watchers.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn panicking_mutator_does_not_leave_the_flag_set() {
    let state = state_with(&[("name", json!(""))]);
    let (watchers, recorder) = spawn_recording(&state, options_ms(100));

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        watchers.mark_update_as_external(|| -> anyhow::Result<()> { panic!("mutator blew up") })
    }));
    assert!(outcome.is_err());

    state.set("name", json!("still user"));
    sleep(Duration::from_millis(300)).await;

    assert_eq!(
        recorder.updates(),
        vec![FieldUpdate::new("name", json!("still user"), Origin::User)]
    );
    watchers.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn custom_classifier_marks_changes_external() {
    let state = state_with(&[("id", json!(0)), ("name", json!(""))]);
    let options = options_ms(100)
        .with_skip_external_updates(false)
        .with_classifier(|key: &str, _new: &Value, _old: Option<&Value>| key == "id");
    let (watchers, recorder) = spawn_recording(&state, options);

    state.set("id", json!(5));
    sleep(Duration::from_millis(200)).await;
    state.set("name", json!("x"));
    sleep(Duration::from_millis(200)).await;

    assert_eq!(
        recorder.updates(),
        vec![
            FieldUpdate::new("id", json!(5), Origin::External),
            FieldUpdate::new("name", json!("x"), Origin::User),
        ]
    );
    watchers.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn flag_wins_over_a_classifier_that_says_user() {
    let state = state_with(&[("name", json!(""))]);
    let options = options_ms(100)
        .with_skip_external_updates(false)
        .with_classifier(|_: &str, _: &Value, _: Option<&Value>| false);
    let (watchers, recorder) = spawn_recording(&state, options);

    watchers.with_external(|| {
        state.set("name", json!("server"));
    });
    sleep(Duration::from_millis(200)).await;

    assert_eq!(
        recorder.updates(),
        vec![FieldUpdate::new("name", json!("server"), Origin::External)]
    );
    watchers.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn skipped_external_change_does_not_cancel_a_pending_user_update() {
    let state = state_with(&[("name", json!("")), ("id", json!(0))]);
    let (watchers, recorder) = spawn_recording(&state, options_ms(100));

    state.set("name", json!("typed"));
    sleep(Duration::from_millis(20)).await;
    watchers.with_external(|| {
        state.set("id", json!(3));
    });
    sleep(Duration::from_millis(300)).await;

    assert_eq!(
        recorder.updates(),
        vec![FieldUpdate::new("name", json!("typed"), Origin::User)]
    );
    watchers.shutdown().await.unwrap();
}
