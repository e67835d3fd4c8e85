//! Several outputs sharing one periodic task.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::error::{ControlError, ControlResult};
use crate::output::{Driver, Output, OutputShared};
use crate::periodic::PeriodicTask;
use crate::sampled::SampleConfig;

/// Batches outputs running at the same rate onto one periodic task.
///
/// Each tick runs every member's evaluate-and-write step in list order. Members'
/// own `enable` is not used; their individual periods are ignored in favour of
/// the group's.
pub struct OutputGroup {
    name: String,
    outputs: Vec<Arc<Output>>,
    task: Mutex<Option<PeriodicTask>>,
}

impl OutputGroup {
    pub fn new(outputs: Vec<Arc<Output>>) -> Self {
        Self {
            name: "output-group".to_string(),
            outputs,
            task: Mutex::new(None),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn outputs(&self) -> &[Arc<Output>] {
        &self.outputs
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Start the shared task. Enabling a running group is a no-op.
    pub fn enable(&self, config: SampleConfig) -> ControlResult<()> {
        let mut task = self.task.lock();
        if task.is_some() {
            warn!(group = %self.name, "enable() on an enabled output group ignored");
            return Ok(());
        }

        let members: Vec<Arc<OutputShared>> =
            self.outputs.iter().map(|o| o.shared().clone()).collect();
        for (claimed, member) in members.iter().enumerate() {
            if !member.try_claim(Driver::Group) {
                for member in &members[..claimed] {
                    member.release();
                }
                warn!(
                    group = %self.name,
                    output = %self.outputs[claimed].name(),
                    "group member is already enabled"
                );
                return Err(ControlError::AlreadyEnabled {
                    name: self.outputs[claimed].name().to_string(),
                });
            }
        }

        let spawned = PeriodicTask::spawn(self.name.clone(), config, move || {
            for member in &members {
                member.tick_for(Driver::Group);
            }
        });
        match spawned {
            Ok(spawned) => *task = Some(spawned),
            Err(e) => {
                drop(task);
                self.disable_members();
                return Err(e);
            }
        }

        info!(
            group = %self.name,
            outputs = self.outputs.len(),
            period_s = config.dt,
            "output group enabled"
        );
        Ok(())
    }

    /// Stop the shared task, then disable every member (one neutral write each).
    pub fn disable(&self) {
        let task = self.task.lock().take();
        if let Some(task) = task {
            task.stop();
            info!(group = %self.name, "output group disabled");
        }
        self.disable_members();
    }

    pub fn is_enabled(&self) -> bool {
        self.task.lock().is_some()
    }

    fn disable_members(&self) {
        for output in &self.outputs {
            output.disable();
        }
    }
}

impl Drop for OutputGroup {
    fn drop(&mut self) {
        if self.task.get_mut().is_some() {
            self.disable();
        }
    }
}
