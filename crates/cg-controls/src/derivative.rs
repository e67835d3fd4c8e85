//! Finite-difference rate node.

use parking_lot::Mutex;

use crate::node::{Guarded, Node, NodeRef};

/// Outputs `K * (input - previous input) / period`.
///
/// The previous sample starts at zero, so the first evaluation differentiates
/// against zero.
pub struct DerivativeNode {
    k: Guarded<f64>,
    input: NodeRef,
    period: f64,
    prev_input: Mutex<f64>,
}

impl DerivativeNode {
    pub fn new(k: f64, input: NodeRef, period: f64) -> Self {
        Self {
            k: Guarded::new(k),
            input,
            period,
            prev_input: Mutex::new(0.0),
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

    pub fn reset(&self) {
        *self.prev_input.lock() = 0.0;
    }
}

impl Node for DerivativeNode {
    fn output(&self) -> f64 {
        let input = self.input.output();
        let k = self.k.get();

        let mut prev = self.prev_input.lock();
        let output = k * (input - *prev) / self.period;
        *prev = input;
        output
    }

    fn input_node(&self) -> Option<&NodeRef> {
        Some(&self.input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::RefInput;
    use std::sync::Arc;

    #[test]
    fn differentiates_step_sequence() {
        let input = Arc::new(RefInput::new(0.0));
        let node = DerivativeNode::new(1.0, input.clone(), 1.0);

        let mut outputs = Vec::new();
        for x in [0.0, 1.0, 1.0] {
            input.set(x);
            outputs.push(node.output());
        }
        assert_eq!(outputs, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn scales_by_gain_and_period() {
        let input = Arc::new(RefInput::new(0.5));
        let node = DerivativeNode::new(2.0, input.clone(), 0.5);
        assert!((node.output() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn reset_differentiates_against_zero_again() {
        let input = Arc::new(RefInput::new(3.0));
        let node = DerivativeNode::new(1.0, input, 1.0);
        assert_eq!(node.output(), 3.0);
        assert_eq!(node.output(), 0.0);
        node.reset();
        assert_eq!(node.output(), 3.0);
    }
}
