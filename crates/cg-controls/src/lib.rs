//! Composable feedback-control graph for robot controllers.
//!
//! The control graph is a set of small nodes evaluated on demand: sources
//! (setpoints, sensors), transforms (gain, integral, derivative), fan-in sums and
//! compound PID nodes. Periodic outputs pull the graph once per tick and write
//! the clamped result to an actuator.
//!
//! # Architecture
//!
//! - Signals are scalar `f64` values pulled through [`Node::output`]
//! - Nodes hold `Arc` handles to upstream nodes given at construction, so graphs
//!   are acyclic by construction
//! - Every node guards its own mutable state; there is no graph-wide lock
//! - [`Output`] and [`OutputGroup`] run evaluations on background threads and
//!   always finish with a neutral `0.0` command when disabled
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use cg_controls::{Constant, Node, PidNode, RefInput, SumNode};
//!
//! let setpoint = Arc::new(RefInput::new(2.0));
//! let measurement = Arc::new(Constant::new(1.5));
//! let error = Arc::new(SumNode::error(setpoint.clone(), measurement));
//! let pid = PidNode::new(0.8, 0.0, 0.0, error, 0.05);
//!
//! assert!((pid.output() - 0.4).abs() < 1e-12);
//! ```

pub mod actuator;
pub mod config;
pub mod controller;
pub mod derivative;
pub mod drive;
pub mod error;
pub mod gain;
pub mod group;
pub mod integral;
pub mod node;
pub mod output;
pub mod periodic;
pub mod pid;
pub mod sampled;
pub mod source;
pub mod sum;

pub use actuator::{Actuator, ActuatorState, FirstOrderActuator, SimulatedMotor};
pub use config::{InputRange, LoopConfig, PidGains, ToleranceConfig};
pub use controller::PidController;
pub use derivative::DerivativeNode;
pub use drive::{DiffDriveController, DriveSensors};
pub use error::{ControlError, ControlResult};
pub use gain::GainNode;
pub use group::OutputGroup;
pub use integral::IntegralNode;
pub use node::{Guarded, Node, NodeRef, WakeupCallback, noop_wakeup};
pub use output::Output;
pub use periodic::PeriodicTask;
pub use pid::PidNode;
pub use sampled::{DEFAULT_PERIOD_S, SampleClock, SampleConfig};
pub use source::{Constant, FuncNode, Measurement, RefInput, Sensor};
pub use sum::{Sign, SumNode};
