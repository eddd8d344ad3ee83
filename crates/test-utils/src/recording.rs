use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use formwatch::{DiagnosticEvent, FieldUpdate, UpdateHandler};
use tokio::time::Instant;

/// One delivered update and when it arrived.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub update: FieldUpdate,
    pub at: Instant,
}

/// Read side of a [`RecordingHandler`]; clone freely.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    deliveries: Arc<Mutex<Vec<Delivery>>>,
}

impl Recorder {
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<FieldUpdate> {
        self.deliveries().into_iter().map(|d| d.update).collect()
    }

    pub fn len(&self) -> usize {
        self.deliveries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An [`UpdateHandler`] that records every update it receives.
///
/// Optionally fails for one key (after recording it), to exercise error
/// isolation.
pub struct RecordingHandler {
    recorder: Recorder,
    fail_on: Option<String>,
}

impl RecordingHandler {
    pub fn new() -> (Self, Recorder) {
        let recorder = Recorder::default();
        let handler = Self {
            recorder: recorder.clone(),
            fail_on: None,
        };
        (handler, recorder)
    }

    pub fn failing_on(key: &str) -> (Self, Recorder) {
        let (mut handler, recorder) = Self::new();
        handler.fail_on = Some(key.to_string());
        (handler, recorder)
    }
}

impl UpdateHandler for RecordingHandler {
    fn on_update(&mut self, update: FieldUpdate) -> anyhow::Result<()> {
        let key = update.key.clone();
        self.recorder.deliveries.lock().unwrap().push(Delivery {
            update,
            at: Instant::now(),
        });
        match &self.fail_on {
            Some(bad) if *bad == key => Err(anyhow!("handler rejected {key}")),
            _ => Ok(()),
        }
    }
}

/// Collects diagnostic events.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<DiagnosticEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink closure to pass to `WatchOptions::with_diagnostic_sink`.
    pub fn sink(&self) -> impl Fn(&DiagnosticEvent) + Send + Sync + 'static {
        let events = Arc::clone(&self.events);
        move |event: &DiagnosticEvent| events.lock().unwrap().push(event.clone())
    }

    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.lock().unwrap().clone()
    }
}
