//! Closed-loop PID controller composed from graph primitives.
//!
//! Wiring:
//!
//! ```text
//! reference (RefInput) --+--> error (SumNode) --> PidNode --> Output --> actuator
//! measurement --------(-)+
//! ```
//!
//! When the gains carry a feedforward term it is applied to the reference.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::actuator::Actuator;
use crate::config::{LoopConfig, PidGains};
use crate::error::ControlResult;
use crate::node::{Node, NodeRef};
use crate::output::Output;
use crate::pid::PidNode;
use crate::sampled::SampleConfig;
use crate::source::RefInput;
use crate::sum::SumNode;

/// PID loop from a measurement to an actuator.
pub struct PidController {
    reference: Arc<RefInput>,
    measurement: NodeRef,
    error: Arc<SumNode>,
    pid: Arc<PidNode>,
    output: Output,
}

impl fmt::Debug for PidController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PidController")
            .field("reference", &self.reference)
            .finish_non_exhaustive()
    }
}

impl PidController {
    /// Build a disabled controller with setpoint zero.
    pub fn new(
        gains: PidGains,
        measurement: NodeRef,
        actuator: Arc<dyn Actuator>,
        config: SampleConfig,
    ) -> Self {
        let reference = Arc::new(RefInput::new(0.0));
        let error = Arc::new(SumNode::error(reference.clone(), measurement.clone()));

        let pid = Arc::new(match gains.kff {
            Some(kff) => PidNode::with_feedforward(
                gains.kp,
                gains.ki,
                gains.kd,
                kff,
                reference.clone(),
                error.clone(),
                config.dt,
            ),
            None => PidNode::new(gains.kp, gains.ki, gains.kd, error.clone(), config.dt),
        });

        let output = Output::new(pid.clone(), actuator, config).named("pid-controller");

        Self {
            reference,
            measurement,
            error,
            pid,
            output,
        }
    }

    /// Build and configure a controller from validated configuration.
    pub fn from_config(
        config: &LoopConfig,
        measurement: NodeRef,
        actuator: Arc<dyn Actuator>,
    ) -> ControlResult<Self> {
        config.validate()?;
        let controller = Self::new(config.gains, measurement, actuator, config.sample_config()?);

        if let Some(izone) = config.izone {
            controller.set_izone(izone);
        }
        let (min_u, max_u) = config.output_range;
        controller.set_output_range(min_u, max_u);
        if let Some(range) = config.input_range {
            controller.set_input_range(range.min, range.max);
            controller.set_continuous(range.continuous);
        }
        if let Some(tol) = config.tolerance {
            controller.set_tolerance(tol.error, tol.delta_or_inf());
        }
        Ok(controller)
    }

    pub fn set_pid(&self, kp: f64, ki: f64, kd: f64) {
        self.pid.set_pid(kp, ki, kd);
    }

    pub fn set_feedforward(&self, kff: f64) {
        self.pid.set_feedforward(kff);
    }

    pub fn set_izone(&self, max_error_magnitude: f64) {
        self.pid.set_izone(max_error_magnitude);
    }

    /// Change the setpoint; an enabled controller reacts immediately.
    pub fn set_setpoint(&self, setpoint: f64) {
        debug!(setpoint, "setpoint changed");
        self.reference.set(setpoint);
    }

    pub fn setpoint(&self) -> f64 {
        self.reference.get()
    }

    /// Current measurement, read through the measurement node.
    pub fn measurement(&self) -> f64 {
        self.measurement.output()
    }

    /// Last raw error seen by the loop.
    pub fn error(&self) -> f64 {
        self.error.current()
    }

    pub fn set_continuous(&self, continuous: bool) {
        self.error.set_continuous(continuous);
    }

    pub fn set_input_range(&self, min_input: f64, max_input: f64) {
        self.error.set_input_range(min_input, max_input);
    }

    pub fn set_tolerance(&self, tolerance: f64, delta_tolerance: f64) {
        self.error.set_tolerance(tolerance, delta_tolerance);
    }

    pub fn at_reference(&self) -> bool {
        self.error.in_tolerance()
    }

    /// Clamp both the PID result and the command written to the actuator.
    pub fn set_output_range(&self, min_u: f64, max_u: f64) {
        self.pid.set_output_range(min_u, max_u);
        self.output.set_range(min_u, max_u);
    }

    pub fn enable(&self) -> ControlResult<()> {
        self.output.enable()
    }

    pub fn disable(&self) {
        self.output.disable();
    }

    pub fn is_enabled(&self) -> bool {
        self.output.is_enabled()
    }

    /// Clear integrator, differentiator and settling history.
    pub fn reset(&self) {
        self.pid.reset();
        self.error.reset();
    }

    pub fn pid(&self) -> &PidNode {
        &self.pid
    }

    pub fn output(&self) -> &Output {
        &self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Constant, RefInput};
    use parking_lot::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<f64>>>, Arc<dyn Actuator>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let actuator: Arc<dyn Actuator> = Arc::new(move |cmd: f64| sink.lock().push(cmd));
        (log, actuator)
    }

    #[test]
    fn proportional_step() {
        let (log, actuator) = recorder();
        let controller = PidController::new(
            PidGains::new(0.5, 0.0, 0.0),
            Arc::new(Constant::new(1.0)),
            actuator,
            SampleConfig::default(),
        );
        controller.set_setpoint(1.5);
        controller.output().tick();

        assert!((controller.error() - 0.5).abs() < 1e-12);
        assert_eq!(controller.measurement(), 1.0);
        assert!((log.lock()[0] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn output_range_applies_to_command() {
        let (log, actuator) = recorder();
        let controller = PidController::new(
            PidGains::new(10.0, 0.0, 0.0),
            Arc::new(Constant::new(0.0)),
            actuator,
            SampleConfig::default(),
        );
        controller.set_output_range(-0.2, 0.4);
        controller.set_setpoint(5.0);
        controller.output().tick();
        controller.set_setpoint(-5.0);
        controller.output().tick();
        assert_eq!(*log.lock(), vec![0.4, -0.2]);
    }

    #[test]
    fn continuous_heading_error() {
        let (log, actuator) = recorder();
        let controller = PidController::new(
            PidGains::new(0.01, 0.0, 0.0),
            Arc::new(Constant::new(350.0)),
            actuator,
            SampleConfig::default(),
        );
        controller.set_input_range(0.0, 360.0);
        controller.set_continuous(true);
        controller.set_setpoint(10.0);
        controller.output().tick();
        // Shortest path is +20 degrees, not -340
        assert!((log.lock()[0] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn feedforward_from_gains() {
        let (log, actuator) = recorder();
        let controller = PidController::new(
            PidGains::new(0.0, 0.0, 0.0).with_feedforward(0.1),
            Arc::new(Constant::new(0.0)),
            actuator,
            SampleConfig::default(),
        );
        controller.set_setpoint(3.0);
        controller.output().tick();
        assert!((log.lock()[0] - 0.3).abs() < 1e-12);
    }

    #[test]
    fn settling_needs_two_calm_ticks() {
        let (_log, actuator) = recorder();
        let position = Arc::new(RefInput::new(0.0));
        let controller = PidController::new(
            PidGains::new(0.1, 0.0, 0.0),
            position.clone(),
            actuator,
            SampleConfig::default(),
        );
        controller.set_tolerance(1.0, 0.1);
        controller.set_setpoint(5.0);

        controller.output().tick();
        assert!((controller.error() - 5.0).abs() < 1e-12);

        // Error drops from 5.0 to 0.5 in one tick: small, but not settled
        position.set(4.5);
        controller.output().tick();
        assert!((controller.error() - 0.5).abs() < 1e-12);
        assert!(!controller.at_reference());

        controller.output().tick();
        assert!(controller.at_reference());
    }

    #[test]
    fn measurement_read_once_per_tick() {
        use crate::source::FuncNode;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let (_log, actuator) = recorder();
        let reads = Arc::new(AtomicUsize::new(0));
        let counter = reads.clone();
        let controller = PidController::new(
            PidGains::new(1.0, 0.5, 0.1),
            Arc::new(FuncNode::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                0.0
            })),
            actuator,
            SampleConfig::default(),
        );
        controller.output().tick();
        controller.output().tick();
        assert_eq!(reads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn from_config_applies_settings() {
        let (_log, actuator) = recorder();
        let mut config = LoopConfig::new(PidGains::new(1.0, 0.5, 0.0));
        config.izone = Some(2.0);
        config.output_range = (-0.5, 0.5);
        config.tolerance = Some(crate::config::ToleranceConfig {
            error: 0.1,
            delta: None,
        });

        let controller =
            PidController::from_config(&config, Arc::new(Constant::new(0.0)), actuator).unwrap();
        assert_eq!(controller.pid().output_range(), (-0.5, 0.5));
        assert_eq!(controller.output().range(), (-0.5, 0.5));
        assert_eq!(controller.pid().i(), 0.5);

        controller.set_setpoint(0.05);
        controller.output().tick();
        controller.output().tick();
        assert!(controller.at_reference());

        config.period_s = -1.0;
        let (_log, actuator) = recorder();
        assert!(
            PidController::from_config(&config, Arc::new(Constant::new(0.0)), actuator).is_err()
        );
    }
}
