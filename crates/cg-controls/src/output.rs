//! Periodic execution of a node chain into an actuator.
//!
//! An [`Output`] is either disabled (initial) or enabled. While enabled a
//! background task evaluates the chain once per period and writes the clamped
//! result to the actuator. Disabling stops the task, waits for it, and then
//! writes a neutral `0.0` command.
//!
//! Every write for one output goes through a single tick lock, so periodic ticks,
//! wake-up evaluations triggered by a [`crate::RefInput`], and the fail-safe write
//! never overlap.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Instant;

use cg_core::clamp;
use cg_core::timing::{AccumulatingTimer, TickStats};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::actuator::Actuator;
use crate::error::ControlResult;
use crate::node::{Guarded, NodeRef};
use crate::periodic::PeriodicTask;
use crate::sampled::SampleConfig;

/// Which periodic task currently drives an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum Driver {
    Own = 1,
    Group = 2,
}

const IDLE: u8 = 0;

/// State shared between an output, its periodic task and its wake-up callback.
pub(crate) struct OutputShared {
    chain: NodeRef,
    actuator: Arc<dyn Actuator>,
    range: Guarded<(f64, f64)>,
    driver: AtomicU8,
    tick_lock: Mutex<()>,
    timer: AccumulatingTimer,
}

impl OutputShared {
    fn evaluate_and_write(&self) {
        let start = Instant::now();
        let value = self.chain.output();
        let (min_u, max_u) = self.range.get();
        self.actuator.write(clamp(value, min_u, max_u));
        self.timer.record(start.elapsed());
    }

    fn tick(&self) {
        let _guard = self.tick_lock.lock();
        self.evaluate_and_write();
    }

    fn is_active(&self) -> bool {
        self.driver.load(Ordering::SeqCst) != IDLE
    }

    /// Wake-up entry point: writes while any task drives the output.
    fn tick_if_active(&self) {
        let _guard = self.tick_lock.lock();
        if self.is_active() {
            self.evaluate_and_write();
        }
    }

    /// Periodic entry point: writes only while `driver` owns the output.
    pub(crate) fn tick_for(&self, driver: Driver) {
        let _guard = self.tick_lock.lock();
        if self.driver.load(Ordering::SeqCst) == driver as u8 {
            self.evaluate_and_write();
        }
    }

    /// Claim the output for `driver`. Fails if another task already drives it.
    pub(crate) fn try_claim(&self, driver: Driver) -> bool {
        self.driver
            .compare_exchange(IDLE, driver as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Release a claim that never ran a tick.
    pub(crate) fn release(&self) {
        self.driver.store(IDLE, Ordering::SeqCst);
    }

    fn write_neutral(&self) {
        let _guard = self.tick_lock.lock();
        self.driver.store(IDLE, Ordering::SeqCst);
        self.actuator.write(0.0);
    }
}

/// Drives one node chain into one actuator at a fixed period.
pub struct Output {
    name: String,
    config: SampleConfig,
    shared: Arc<OutputShared>,
    task: Mutex<Option<PeriodicTask>>,
}

impl Output {
    /// Bind `chain` to `actuator`. The output starts disabled with range `[-1, 1]`.
    ///
    /// Registers a wake-up with every source in the chain so that setting a
    /// reference input re-evaluates the output immediately while it is enabled.
    pub fn new(chain: NodeRef, actuator: Arc<dyn Actuator>, config: SampleConfig) -> Self {
        let shared = Arc::new(OutputShared {
            chain,
            actuator,
            range: Guarded::new((-1.0, 1.0)),
            driver: AtomicU8::new(IDLE),
            tick_lock: Mutex::new(()),
            timer: AccumulatingTimer::new(),
        });

        let weak = Arc::downgrade(&shared);
        shared.chain.register_wakeup(Arc::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.tick_if_active();
            }
        }));

        Self {
            name: "output".to_string(),
            config,
            shared,
            task: Mutex::new(None),
        }
    }

    /// Name used for the periodic thread and log records.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start the periodic task.
    ///
    /// Enabling an output that is already driven, by its own task or by an
    /// enabled [`crate::OutputGroup`], is a no-op.
    pub fn enable(&self) -> ControlResult<()> {
        let mut task = self.task.lock();
        if task.is_some() || !self.shared.try_claim(Driver::Own) {
            warn!(output = %self.name, "enable() on an enabled output ignored");
            return Ok(());
        }

        let shared = self.shared.clone();
        match PeriodicTask::spawn(self.name.clone(), self.config, move || {
            shared.tick_for(Driver::Own)
        }) {
            Ok(spawned) => *task = Some(spawned),
            Err(e) => {
                self.shared.release();
                return Err(e);
            }
        }

        info!(output = %self.name, period_s = self.config.dt, "output enabled");
        Ok(())
    }

    /// Stop the periodic task, then write exactly one `0.0`.
    ///
    /// Safe to call in any state; a disabled output repeats the neutral write.
    pub fn disable(&self) {
        // Stop wake-ups before joining so nothing re-arms the actuator.
        self.shared.release();
        let task = self.task.lock().take();
        if let Some(task) = task {
            task.stop();
            info!(output = %self.name, "output disabled");
        }
        self.shared.write_neutral();
        debug!(output = %self.name, "neutral command written");
    }

    /// Whether a periodic task (own or group) currently drives this output.
    pub fn is_enabled(&self) -> bool {
        self.shared.is_active()
    }

    /// Evaluate the chain once and write the clamped result, regardless of state.
    ///
    /// This is the per-tick step; use it to drive the output from an external
    /// scheduler.
    pub fn tick(&self) {
        self.shared.tick();
    }

    /// Set the command clamp, effective on the next evaluation.
    pub fn set_range(&self, min_u: f64, max_u: f64) {
        self.shared.range.set((min_u, max_u));
    }

    pub fn range(&self) -> (f64, f64) {
        self.shared.range.get()
    }

    pub fn period(&self) -> SampleConfig {
        self.config
    }

    /// Evaluate-and-write timing since construction.
    pub fn tick_stats(&self) -> TickStats {
        self.shared.timer.stats()
    }

    pub(crate) fn shared(&self) -> &Arc<OutputShared> {
        &self.shared
    }
}

impl Drop for Output {
    fn drop(&mut self) {
        if self.task.get_mut().is_some() {
            self.disable();
        }
    }
}
