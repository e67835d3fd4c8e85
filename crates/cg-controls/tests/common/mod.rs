#![allow(dead_code)]

use std::sync::Arc;

use cg_controls::Actuator;
use parking_lot::Mutex;

/// Actuator that remembers every command it receives.
#[derive(Default)]
pub struct RecordingActuator {
    writes: Mutex<Vec<f64>>,
}

impl RecordingActuator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn writes(&self) -> Vec<f64> {
        self.writes.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.writes.lock().len()
    }

    pub fn last(&self) -> Option<f64> {
        self.writes.lock().last().copied()
    }
}

impl Actuator for RecordingActuator {
    fn write(&self, command: f64) {
        self.writes.lock().push(command);
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
