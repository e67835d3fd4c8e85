//! Signed N-ary summing junction.
//!
//! Besides the sum itself the node keeps the last two raw sums so a controller
//! can ask whether the loop has settled, and optionally wraps the result for
//! cyclic quantities such as headings.

use parking_lot::Mutex;

use crate::node::{Node, NodeRef, WakeupCallback};

/// Sign applied to one input of a [`SumNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Plus,
    Minus,
}

impl Sign {
    fn apply(self, value: f64) -> f64 {
        match self {
            Sign::Plus => value,
            Sign::Minus => -value,
        }
    }
}

impl From<bool> for Sign {
    /// `true` is positive.
    fn from(positive: bool) -> Self {
        if positive { Sign::Plus } else { Sign::Minus }
    }
}

#[derive(Debug, Clone, Copy)]
struct SumState {
    continuous: bool,
    input_range: f64,
    tolerance: f64,
    delta_tolerance: f64,
    current: f64,
    previous: f64,
}

impl Default for SumState {
    fn default() -> Self {
        Self {
            continuous: false,
            input_range: 0.0,
            tolerance: 0.05,
            delta_tolerance: f64::INFINITY,
            current: 0.0,
            previous: 0.0,
        }
    }
}

/// Sums its inputs, each with a sign fixed at construction.
pub struct SumNode {
    inputs: Vec<(NodeRef, Sign)>,
    state: Mutex<SumState>,
}

impl SumNode {
    pub fn new(inputs: Vec<(NodeRef, Sign)>) -> Self {
        Self {
            inputs,
            state: Mutex::new(SumState::default()),
        }
    }

    /// `reference - measurement`, the usual error junction.
    pub fn error(reference: NodeRef, measurement: NodeRef) -> Self {
        Self::new(vec![(reference, Sign::Plus), (measurement, Sign::Minus)])
    }

    pub fn inputs(&self) -> &[(NodeRef, Sign)] {
        &self.inputs
    }

    /// Treat the result as cyclic over the configured input range.
    pub fn set_continuous(&self, continuous: bool) {
        self.state.lock().continuous = continuous;
    }

    pub fn is_continuous(&self) -> bool {
        self.state.lock().continuous
    }

    /// Set the span used for wrapping; an empty or inverted range disables it.
    pub fn set_input_range(&self, min_input: f64, max_input: f64) {
        let range = if max_input > min_input {
            max_input - min_input
        } else {
            0.0
        };
        self.state.lock().input_range = range;
    }

    pub fn input_range(&self) -> f64 {
        self.state.lock().input_range
    }

    pub fn set_tolerance(&self, tolerance: f64, delta_tolerance: f64) {
        let mut state = self.state.lock();
        state.tolerance = tolerance;
        state.delta_tolerance = delta_tolerance;
    }

    /// Both the last sum and its change since the one before are within bounds.
    pub fn in_tolerance(&self) -> bool {
        let state = self.state.lock();
        state.current.abs() < state.tolerance
            && (state.current - state.previous).abs() < state.delta_tolerance
    }

    /// Last raw (unwrapped) sum.
    pub fn current(&self) -> f64 {
        self.state.lock().current
    }

    /// Forget the settling history.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.current = 0.0;
        state.previous = 0.0;
    }
}

/// Shortest signed distance of `value` through the wrap point of `range`.
fn wrap(value: f64, range: f64) -> f64 {
    let wrapped = value % range;
    if wrapped.abs() > range / 2.0 {
        wrapped - range * wrapped.signum()
    } else {
        wrapped
    }
}

impl Node for SumNode {
    fn output(&self) -> f64 {
        let raw: f64 = self
            .inputs
            .iter()
            .map(|(node, sign)| sign.apply(node.output()))
            .sum();

        let mut state = self.state.lock();
        state.previous = state.current;
        state.current = raw;

        if state.continuous && state.input_range != 0.0 {
            wrap(raw, state.input_range)
        } else {
            raw
        }
    }

    fn register_wakeup(&self, callback: WakeupCallback) {
        for (node, _) in &self.inputs {
            node.register_wakeup(callback.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Constant, RefInput};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn constant(v: f64) -> NodeRef {
        Arc::new(Constant::new(v))
    }

    #[test]
    fn signed_sum() {
        let sum = SumNode::new(vec![
            (constant(3.0), Sign::Plus),
            (constant(1.5), Sign::Minus),
            (constant(0.5), Sign::Plus),
        ]);
        assert_eq!(sum.output(), 2.0);
    }

    #[test]
    fn empty_sum_is_zero() {
        assert_eq!(SumNode::new(Vec::new()).output(), 0.0);
    }

    #[test]
    fn continuous_wraps_through_shortest_path() {
        let sum = SumNode::new(vec![(constant(350.0), Sign::Plus)]);
        sum.set_input_range(0.0, 360.0);
        assert_eq!(sum.output(), 350.0);

        sum.set_continuous(true);
        assert!((sum.output() + 10.0).abs() < 1e-12);
    }

    #[test]
    fn continuous_without_range_does_not_wrap() {
        let sum = SumNode::new(vec![(constant(350.0), Sign::Plus)]);
        sum.set_continuous(true);
        assert_eq!(sum.output(), 350.0);
    }

    #[test]
    fn wrap_handles_negative_and_multiple_turns() {
        assert!((wrap(-350.0, 360.0) - 10.0).abs() < 1e-12);
        assert!((wrap(725.0, 360.0) - 5.0).abs() < 1e-12);
        assert!((wrap(180.0, 360.0) - 180.0).abs() < 1e-12);
    }

    #[test]
    fn tolerance_needs_two_samples() {
        let input = Arc::new(RefInput::new(0.6));
        let sum = SumNode::new(vec![(input.clone() as NodeRef, Sign::Plus)]);
        sum.set_tolerance(1.0, 1.0);

        sum.output();
        input.set(0.5);
        sum.output();
        assert!(sum.in_tolerance());

        sum.set_tolerance(0.4, 1.0);
        assert!(!sum.in_tolerance());
    }

    #[test]
    fn tolerance_rejects_fast_change() {
        let input = Arc::new(RefInput::new(0.0));
        let sum = SumNode::new(vec![(input.clone() as NodeRef, Sign::Plus)]);
        sum.set_tolerance(1.0, 0.1);

        input.set(5.0);
        sum.output();
        input.set(0.5);
        sum.output();
        // Error is small but dropped by 4.5 in one sample
        assert!(!sum.in_tolerance());
        sum.output();
        assert!(sum.in_tolerance());
    }

    #[test]
    fn wakeup_reaches_every_input() {
        let a = Arc::new(RefInput::new(0.0));
        let b = Arc::new(RefInput::new(0.0));
        let sum = SumNode::error(a.clone(), b.clone());

        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        sum.register_wakeup(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        a.set(1.0);
        b.set(2.0);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(sum.output(), -1.0);
    }

    #[test]
    fn sign_from_bool() {
        assert_eq!(Sign::from(true), Sign::Plus);
        assert_eq!(Sign::from(false), Sign::Minus);
    }
}
