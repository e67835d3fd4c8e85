//! Differential drive position/heading controller.
//!
//! Two loops share one [`OutputGroup`]: a forward loop on the mean of the left
//! and right wheel distances and a rotation loop on the heading. The left side
//! is commanded `forward - rotation`, the right side `forward + rotation`
//! (counter-clockwise positive heading).

use std::sync::Arc;

use tracing::debug;

use crate::actuator::Actuator;
use crate::config::PidGains;
use crate::error::ControlResult;
use crate::gain::GainNode;
use crate::node::{Guarded, Node, NodeRef, WakeupCallback};
use crate::group::OutputGroup;
use crate::output::Output;
use crate::pid::PidNode;
use crate::sampled::SampleConfig;
use crate::source::{Measurement, RefInput, Sensor};
use crate::sum::{Sign, SumNode};

/// Measurements a differential drive needs.
#[derive(Clone)]
pub struct DriveSensors {
    pub left_distance: Arc<dyn Measurement>,
    pub right_distance: Arc<dyn Measurement>,
    pub heading: Arc<dyn Measurement>,
}

/// Evaluates both loops once per tick for the two sides.
///
/// The left command evaluates the forward and rotation PIDs and latches the pair;
/// the right command reuses the latched pair, so the stateful I and D terms advance
/// once per tick. The group ticks left before right.
struct DriveMixer {
    forward: NodeRef,
    rotation: NodeRef,
    latched: Guarded<(f64, f64)>,
}

struct LeftCommand(Arc<DriveMixer>);

struct RightCommand(Arc<DriveMixer>);

impl Node for LeftCommand {
    fn output(&self) -> f64 {
        let forward = self.0.forward.output();
        let rotation = self.0.rotation.output();
        self.0.latched.set((forward, rotation));
        forward - rotation
    }

    fn register_wakeup(&self, callback: WakeupCallback) {
        self.0.forward.register_wakeup(callback.clone());
        self.0.rotation.register_wakeup(callback);
    }
}

impl Node for RightCommand {
    fn output(&self) -> f64 {
        let (forward, rotation) = self.0.latched.get();
        forward + rotation
    }
}

/// Drives a differential base to a distance and heading.
pub struct DiffDriveController {
    forward_ref: Arc<RefInput>,
    rotation_ref: Arc<RefInput>,
    forward_error: Arc<SumNode>,
    rotation_error: Arc<SumNode>,
    forward_pid: Arc<PidNode>,
    rotation_pid: Arc<PidNode>,
    group: OutputGroup,
    config: SampleConfig,
}

impl DiffDriveController {
    pub fn new(
        forward: PidGains,
        rotation: PidGains,
        sensors: DriveSensors,
        left: Arc<dyn Actuator>,
        right: Arc<dyn Actuator>,
        config: SampleConfig,
    ) -> Self {
        let left_distance: NodeRef = Arc::new(Sensor::new(sensors.left_distance));
        let right_distance: NodeRef = Arc::new(Sensor::new(sensors.right_distance));
        let heading: NodeRef = Arc::new(Sensor::new(sensors.heading));

        let distance_sum: NodeRef = Arc::new(SumNode::new(vec![
            (left_distance, Sign::Plus),
            (right_distance, Sign::Plus),
        ]));
        let distance: NodeRef = Arc::new(GainNode::new(0.5, distance_sum));

        let forward_ref = Arc::new(RefInput::new(0.0));
        let rotation_ref = Arc::new(RefInput::new(0.0));
        let forward_error = Arc::new(SumNode::error(forward_ref.clone(), distance));
        let rotation_error = Arc::new(SumNode::error(rotation_ref.clone(), heading));

        let forward_pid = Arc::new(PidNode::new(
            forward.kp,
            forward.ki,
            forward.kd,
            forward_error.clone(),
            config.dt,
        ));
        let rotation_pid = Arc::new(PidNode::new(
            rotation.kp,
            rotation.ki,
            rotation.kd,
            rotation_error.clone(),
            config.dt,
        ));

        let mixer = Arc::new(DriveMixer {
            forward: forward_pid.clone(),
            rotation: rotation_pid.clone(),
            latched: Guarded::new((0.0, 0.0)),
        });
        let left_output = Output::new(Arc::new(LeftCommand(mixer.clone())), left, config)
            .named("drive-left");
        let right_output =
            Output::new(Arc::new(RightCommand(mixer)), right, config).named("drive-right");
        let group = OutputGroup::new(vec![Arc::new(left_output), Arc::new(right_output)])
            .named("diff-drive");

        Self {
            forward_ref,
            rotation_ref,
            forward_error,
            rotation_error,
            forward_pid,
            rotation_pid,
            group,
            config,
        }
    }

    /// Set distance and heading goals.
    pub fn set_goal(&self, distance: f64, heading: f64) {
        debug!(distance, heading, "drive goal changed");
        self.forward_ref.set(distance);
        self.rotation_ref.set(heading);
    }

    pub fn goal(&self) -> (f64, f64) {
        (self.forward_ref.get(), self.rotation_ref.get())
    }

    pub fn set_forward_pid(&self, kp: f64, ki: f64, kd: f64) {
        self.forward_pid.set_pid(kp, ki, kd);
    }

    pub fn set_rotation_pid(&self, kp: f64, ki: f64, kd: f64) {
        self.rotation_pid.set_pid(kp, ki, kd);
    }

    /// Declare the heading span and whether it wraps (e.g. `0..360`, `true`).
    pub fn set_heading_range(&self, min_heading: f64, max_heading: f64, continuous: bool) {
        self.rotation_error.set_input_range(min_heading, max_heading);
        self.rotation_error.set_continuous(continuous);
    }

    pub fn set_tolerances(
        &self,
        distance: f64,
        distance_delta: f64,
        heading: f64,
        heading_delta: f64,
    ) {
        self.forward_error.set_tolerance(distance, distance_delta);
        self.rotation_error.set_tolerance(heading, heading_delta);
    }

    /// Both loops have settled.
    pub fn at_goal(&self) -> bool {
        self.forward_error.in_tolerance() && self.rotation_error.in_tolerance()
    }

    pub fn forward_error(&self) -> f64 {
        self.forward_error.current()
    }

    pub fn rotation_error(&self) -> f64 {
        self.rotation_error.current()
    }

    pub fn enable(&self) -> ControlResult<()> {
        self.group.enable(self.config)
    }

    pub fn disable(&self) {
        self.group.disable();
    }

    pub fn is_enabled(&self) -> bool {
        self.group.is_enabled()
    }

    pub fn reset(&self) {
        self.forward_pid.reset();
        self.rotation_pid.reset();
        self.forward_error.reset();
        self.rotation_error.reset();
    }

    /// Run one tick of both sides from the caller's thread.
    pub fn tick(&self) {
        for output in self.group.outputs() {
            output.tick();
        }
    }

    pub fn outputs(&self) -> &[Arc<Output>] {
        self.group.outputs()
    }
}
