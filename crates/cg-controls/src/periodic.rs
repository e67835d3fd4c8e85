//! Background thread running a closure at a fixed rate.

use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{RecvTimeoutError, Sender};
use tracing::{debug, warn};

use crate::error::{ControlError, ControlResult};
use crate::sampled::{SampleClock, SampleConfig};

/// Handle to a running periodic task.
///
/// The task runs until [`PeriodicTask::stop`] is called or the handle is dropped.
/// Both join the thread, so no tick is in flight once they return.
pub struct PeriodicTask {
    name: String,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    /// Spawn a thread calling `tick` once per period, first tick one period from now.
    pub fn spawn<F>(name: impl Into<String>, config: SampleConfig, mut tick: F) -> ControlResult<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let name = name.into();
        let period = config.as_duration();
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);

        let task_name = name.clone();
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let mut clock = SampleClock::new(period, Instant::now());
                loop {
                    match stop_rx.recv_deadline(clock.deadline()) {
                        Err(RecvTimeoutError::Timeout) => {
                            tick();
                            if clock.advance(Instant::now()) {
                                warn!(
                                    task = %task_name,
                                    overruns = clock.overruns(),
                                    "tick overran its period"
                                );
                            }
                        }
                        // Explicit stop or the handle went away
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!(task = %task_name, "periodic task exiting");
            })
            .map_err(|e| ControlError::Spawn {
                name: name.clone(),
                what: e.to_string(),
            })?;

        debug!(task = %name, period_s = config.dt, "periodic task started");
        Ok(Self {
            name,
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stop the task and wait for the thread to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the sender disconnects the channel and wakes the thread.
        drop(self.stop_tx.take());

        let Some(handle) = self.handle.take() else {
            return;
        };
        if handle.thread().id() == thread::current().id() {
            // Stopped from inside its own tick; the loop exits after this tick.
            warn!(task = %self.name, "periodic task stopped from within itself");
            return;
        }
        if handle.join().is_err() {
            warn!(task = %self.name, "periodic task panicked");
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.shutdown();
    }
}
