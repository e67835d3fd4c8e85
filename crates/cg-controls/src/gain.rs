//! Proportional scaling node.

use crate::node::{Guarded, Node, NodeRef};

/// Scales its input by a mutable gain `K`.
pub struct GainNode {
    k: Guarded<f64>,
    input: NodeRef,
}

impl GainNode {
    pub fn new(k: f64, input: NodeRef) -> Self {
        Self {
            k: Guarded::new(k),
            input,
        }
    }

    pub fn set_gain(&self, k: f64) {
        self.k.set(k);
    }

    pub fn gain(&self) -> f64 {
        self.k.get()
    }
}

impl Node for GainNode {
    fn output(&self) -> f64 {
        let input = self.input.output();
        self.k.get() * input
    }

    fn input_node(&self) -> Option<&NodeRef> {
        Some(&self.input)
    }
}
