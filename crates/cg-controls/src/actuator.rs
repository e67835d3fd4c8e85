//! Actuator interface and a simulated plant.
//!
//! Outputs write their commands to an [`Actuator`]. Real hardware lives outside
//! this crate; [`SimulatedMotor`] stands in for it in closed-loop tests. The
//! motor's velocity follows the command through a first-order lag with rate
//! limiting, which models:
//! - Mechanical time constants (motor and gearbox response)
//! - Rate limits (maximum acceleration)
//! - Command limits (e.g. [-1, 1] duty cycle)

use cg_core::{clamp, ensure_positive};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{ControlError, ControlResult};
use crate::source::Measurement;

/// Sink for actuator commands.
pub trait Actuator: Send + Sync {
    /// Apply a command. Called once per tick by an output.
    fn write(&self, command: f64);
}

impl<F> Actuator for F
where
    F: Fn(f64) + Send + Sync,
{
    fn write(&self, command: f64) {
        self(command)
    }
}

/// State of a first-order actuator.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ActuatorState {
    /// Current output, within the actuator limits.
    pub output: f64,
}

/// First-order actuator with rate limiting.
///
/// Dynamics: `dy/dt = (1/tau) * (cmd - y)`, clamped to `[-rate_limit, rate_limit]`,
/// with `y` clamped to `[min, max]`.
///
/// # Example
///
/// ```
/// use cg_controls::{ActuatorState, FirstOrderActuator};
///
/// let actuator = FirstOrderActuator::new(0.2, 5.0).unwrap();
/// let mut state = ActuatorState { output: 0.0 };
///
/// // Step to 1.0 over time
/// for _ in 0..100 {
///     state = actuator.step(&state, 0.01, 1.0);
/// }
///
/// assert!(state.output > 0.9);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FirstOrderActuator {
    /// Time constant (seconds), must be positive
    pub tau: f64,
    /// Rate limit (1/second), must be positive
    pub rate_limit: f64,
    /// Lower output limit
    pub min: f64,
    /// Upper output limit
    pub max: f64,
}

impl FirstOrderActuator {
    /// Create a new first-order actuator with output limits `[-1, 1]`.
    ///
    /// # Arguments
    ///
    /// * `tau` - Time constant in seconds (must be positive)
    /// * `rate_limit` - Maximum rate of change in 1/s (must be positive)
    ///
    /// # Errors
    ///
    /// Returns error if `tau` or `rate_limit` are not positive and finite.
    pub fn new(tau: f64, rate_limit: f64) -> ControlResult<Self> {
        let tau = ensure_positive(tau, "tau must be positive")?;
        let rate_limit = ensure_positive(rate_limit, "rate_limit must be positive")?;
        Ok(Self {
            tau,
            rate_limit,
            min: -1.0,
            max: 1.0,
        })
    }

    /// Replace the output limits.
    pub fn with_limits(mut self, min: f64, max: f64) -> ControlResult<Self> {
        if min.is_nan() || max.is_nan() || min >= max {
            return Err(ControlError::InvalidArg {
                what: "min must be less than max",
            });
        }
        self.min = min;
        self.max = max;
        Ok(self)
    }

    /// Output derivative given current output and command, clamped to the rate limit.
    pub fn dydt(&self, output: f64, command: f64) -> f64 {
        let raw = (command - output) / self.tau;
        clamp(raw, -self.rate_limit, self.rate_limit)
    }

    /// Advance actuator state by timestep `dt` (explicit Euler).
    pub fn step(&self, state: &ActuatorState, dt: f64, command: f64) -> ActuatorState {
        let dydt = self.dydt(state.output, command);
        let next = state.output + dydt * dt;
        ActuatorState {
            output: clamp(next, self.min, self.max),
        }
    }
}

#[derive(Debug, Default)]
struct MotorState {
    command: f64,
    velocity: ActuatorState,
    position: f64,
}

/// Simulated motor: commands drive a lagged velocity, position integrates it.
///
/// Implements [`Actuator`] (duty-cycle command) and [`Measurement`] (position),
/// so it can close a loop on its own. Time only advances through
/// [`SimulatedMotor::advance`].
#[derive(Debug)]
pub struct SimulatedMotor {
    lag: FirstOrderActuator,
    /// Position units per second at full command.
    max_speed: f64,
    state: Mutex<MotorState>,
}

impl SimulatedMotor {
    pub fn new(lag: FirstOrderActuator, max_speed: f64) -> Self {
        Self {
            lag,
            max_speed,
            state: Mutex::new(MotorState::default()),
        }
    }

    /// Step the plant forward by `dt` seconds.
    pub fn advance(&self, dt: f64) {
        let mut state = self.state.lock();
        state.velocity = self.lag.step(&state.velocity, dt, state.command);
        state.position += state.velocity.output * self.max_speed * dt;
    }

    pub fn position(&self) -> f64 {
        self.state.lock().position
    }

    pub fn velocity(&self) -> f64 {
        self.state.lock().velocity.output * self.max_speed
    }

    /// Last command written.
    pub fn command(&self) -> f64 {
        self.state.lock().command
    }
}

impl Actuator for SimulatedMotor {
    fn write(&self, command: f64) {
        self.state.lock().command = command;
    }
}

impl Measurement for SimulatedMotor {
    fn read(&self) -> f64 {
        self.position()
    }
}
