// tests/common/mod.rs

#![allow(dead_code)]

use formwatch::{FormState, FormWatchers, WatchOptions};
use formwatch_test_utils::recording::{Recorder, RecordingHandler};

pub use formwatch_test_utils::builders;
pub use formwatch_test_utils::{init_tracing, settle};

/// Spawn watchers over `state` with a recording handler.
pub fn spawn_recording(state: &FormState, options: WatchOptions) -> (FormWatchers, Recorder) {
    init_tracing();
    let (handler, recorder) = RecordingHandler::new();
    let watchers =
        FormWatchers::spawn(state.clone(), handler, options).expect("watchers should spawn");
    (watchers, recorder)
}
