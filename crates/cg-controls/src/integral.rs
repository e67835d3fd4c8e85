//! Integrator node with I-zone reset and windup clamping.
//!
//! Each evaluation reads the input once. If `|input|` exceeds the I-zone the
//! accumulator is reset to zero, otherwise `input * period` is added and the
//! total is clamped to `[-|1/K|, |1/K|]` so that the scaled contribution never
//! exceeds unity in magnitude. A zero gain makes the bound infinite, which is
//! harmless because the term is then disabled anyway.

use cg_core::clamp;
use parking_lot::Mutex;

use crate::node::{Guarded, Node, NodeRef};

#[derive(Debug, Clone, Copy)]
struct IntegralState {
    total: f64,
    max_input_magnitude: f64,
}

impl Default for IntegralState {
    fn default() -> Self {
        Self {
            total: 0.0,
            max_input_magnitude: f64::INFINITY,
        }
    }
}

/// Accumulates `input * period`, scaled by `K`.
pub struct IntegralNode {
    k: Guarded<f64>,
    input: NodeRef,
    period: f64,
    state: Mutex<IntegralState>,
}

impl IntegralNode {
    /// `period` is the sample period in seconds.
    pub fn new(k: f64, input: NodeRef, period: f64) -> Self {
        Self {
            k: Guarded::new(k),
            input,
            period,
            state: Mutex::new(IntegralState::default()),
        }
    }

    pub fn set_gain(&self, k: f64) {
        self.k.set(k);
    }

    pub fn gain(&self) -> f64 {
        self.k.get()
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    /// Inputs larger than this in magnitude reset the accumulator.
    pub fn set_izone(&self, max_input_magnitude: f64) {
        self.state.lock().max_input_magnitude = max_input_magnitude;
    }

    pub fn izone(&self) -> f64 {
        self.state.lock().max_input_magnitude
    }

    /// Current (unscaled) accumulator.
    pub fn total(&self) -> f64 {
        self.state.lock().total
    }

    /// Clear the accumulator. The I-zone is configuration and survives.
    pub fn reset(&self) {
        self.state.lock().total = 0.0;
    }
}

impl Node for IntegralNode {
    fn output(&self) -> f64 {
        let input = self.input.output();
        let k = self.k.get();

        let mut state = self.state.lock();
        if input.abs() > state.max_input_magnitude {
            state.total = 0.0;
        } else {
            let bound = (1.0 / k).abs();
            state.total = clamp(state.total + input * self.period, -bound, bound);
        }
        k * state.total
    }

    fn input_node(&self) -> Option<&NodeRef> {
        Some(&self.input)
    }
}
