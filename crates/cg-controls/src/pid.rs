//! Compound PID node.
//!
//! Wires a [`GainNode`] (P), [`IntegralNode`] (I), [`DerivativeNode`] (D) and an
//! optional feedforward [`GainNode`] through one [`SumNode`], then clamps the
//! result to the output range.
//!
//! The error input is sampled once per evaluation and the three terms read that
//! sample, so a live sensor is read once per tick and the error node's settling
//! history advances once per tick.
//!
//! Gains are individually locked. `set_pid` updates them one after another, so a
//! concurrent evaluation may observe a mix of old and new gains for one tick.

use std::sync::Arc;

use cg_core::clamp;

use crate::derivative::DerivativeNode;
use crate::gain::GainNode;
use crate::integral::IntegralNode;
use crate::node::{Guarded, Node, NodeRef, WakeupCallback};
use crate::sum::{Sign, SumNode};

/// Holds the value of its input sampled by [`SampleLatch::sample`].
struct SampleLatch {
    input: NodeRef,
    value: Guarded<f64>,
}

impl SampleLatch {
    fn sample(&self) {
        self.value.set(self.input.output());
    }
}

impl Node for SampleLatch {
    fn output(&self) -> f64 {
        self.value.get()
    }

    fn input_node(&self) -> Option<&NodeRef> {
        Some(&self.input)
    }
}

/// PID controller expressed as a node.
pub struct PidNode {
    input: NodeRef,
    latch: Arc<SampleLatch>,
    p: Arc<GainNode>,
    i: Arc<IntegralNode>,
    d: Arc<DerivativeNode>,
    feedforward: Option<Arc<GainNode>>,
    sum: SumNode,
    output_range: Guarded<(f64, f64)>,
}

impl PidNode {
    /// Create a PID node over an error signal.
    ///
    /// # Arguments
    ///
    /// * `kp` - Proportional gain
    /// * `ki` - Integral gain
    /// * `kd` - Derivative gain
    /// * `input` - Error node
    /// * `period` - Sample period (seconds) used by the I and D terms
    pub fn new(kp: f64, ki: f64, kd: f64, input: NodeRef, period: f64) -> Self {
        Self::build(kp, ki, kd, None, input, period)
    }

    /// Create a PID node with a feedforward term `kff * reference`.
    pub fn with_feedforward(
        kp: f64,
        ki: f64,
        kd: f64,
        kff: f64,
        reference: NodeRef,
        input: NodeRef,
        period: f64,
    ) -> Self {
        Self::build(kp, ki, kd, Some((kff, reference)), input, period)
    }

    fn build(
        kp: f64,
        ki: f64,
        kd: f64,
        feedforward: Option<(f64, NodeRef)>,
        input: NodeRef,
        period: f64,
    ) -> Self {
        let latch = Arc::new(SampleLatch {
            input: input.clone(),
            value: Guarded::new(0.0),
        });
        let p = Arc::new(GainNode::new(kp, latch.clone()));
        let i = Arc::new(IntegralNode::new(ki, latch.clone(), period));
        let d = Arc::new(DerivativeNode::new(kd, latch.clone(), period));
        let feedforward =
            feedforward.map(|(kff, reference)| Arc::new(GainNode::new(kff, reference)));

        let mut terms: Vec<(NodeRef, Sign)> = vec![
            (p.clone() as NodeRef, Sign::Plus),
            (i.clone() as NodeRef, Sign::Plus),
            (d.clone() as NodeRef, Sign::Plus),
        ];
        if let Some(ff) = &feedforward {
            terms.push((ff.clone() as NodeRef, Sign::Plus));
        }

        Self {
            input,
            latch,
            p,
            i,
            d,
            feedforward,
            sum: SumNode::new(terms),
            output_range: Guarded::new((-1.0, 1.0)),
        }
    }

    pub fn set_p(&self, kp: f64) {
        self.p.set_gain(kp);
    }

    pub fn set_i(&self, ki: f64) {
        self.i.set_gain(ki);
    }

    pub fn set_d(&self, kd: f64) {
        self.d.set_gain(kd);
    }

    /// Set all three gains. Each gain is applied atomically, the triple is not.
    pub fn set_pid(&self, kp: f64, ki: f64, kd: f64) {
        self.set_p(kp);
        self.set_i(ki);
        self.set_d(kd);
    }

    /// Set the feedforward gain. No-op when built without feedforward.
    pub fn set_feedforward(&self, kff: f64) {
        if let Some(ff) = &self.feedforward {
            ff.set_gain(kff);
        }
    }

    pub fn p(&self) -> f64 {
        self.p.gain()
    }

    pub fn i(&self) -> f64 {
        self.i.gain()
    }

    pub fn d(&self) -> f64 {
        self.d.gain()
    }

    pub fn feedforward(&self) -> Option<f64> {
        self.feedforward.as_ref().map(|ff| ff.gain())
    }

    pub fn set_izone(&self, max_input_magnitude: f64) {
        self.i.set_izone(max_input_magnitude);
    }

    pub fn set_output_range(&self, min_u: f64, max_u: f64) {
        self.output_range.set((min_u, max_u));
    }

    pub fn output_range(&self) -> (f64, f64) {
        self.output_range.get()
    }

    /// Clear integrator and differentiator state. P and feedforward are stateless.
    pub fn reset(&self) {
        self.i.reset();
        self.d.reset();
    }
}

impl Node for PidNode {
    fn output(&self) -> f64 {
        self.latch.sample();
        let sum = self.sum.output();
        let (min_u, max_u) = self.output_range.get();
        clamp(sum, min_u, max_u)
    }

    fn input_node(&self) -> Option<&NodeRef> {
        Some(&self.input)
    }

    fn register_wakeup(&self, callback: WakeupCallback) {
        // Reaches the error input through every term and the feedforward reference.
        self.sum.register_wakeup(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Constant, RefInput};

    #[test]
    fn proportional_only() {
        let pid = PidNode::new(0.5, 0.0, 0.0, Arc::new(Constant::new(1.0)), 0.05);
        assert!((pid.output() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn terms_add_up() {
        let input = Arc::new(RefInput::new(0.2));
        let pid = PidNode::new(1.0, 1.0, 0.1, input.clone(), 0.1);
        pid.set_output_range(-10.0, 10.0);
        // P = 0.2, I = 0.02, D = 0.1 * 0.2 / 0.1 = 0.2
        assert!((pid.output() - 0.42).abs() < 1e-12);
    }

    #[test]
    fn output_clamped_to_default_range() {
        let pid = PidNode::new(10.0, 0.0, 0.0, Arc::new(Constant::new(1.0)), 0.05);
        assert_eq!(pid.output(), 1.0);

        let pid = PidNode::new(10.0, 0.0, 0.0, Arc::new(Constant::new(-1.0)), 0.05);
        assert_eq!(pid.output(), -1.0);
    }

    #[test]
    fn custom_output_range() {
        let pid = PidNode::new(10.0, 0.0, 0.0, Arc::new(Constant::new(1.0)), 0.05);
        pid.set_output_range(-0.3, 0.3);
        assert_eq!(pid.output_range(), (-0.3, 0.3));
        assert_eq!(pid.output(), 0.3);
    }

    #[test]
    fn feedforward_scales_reference() {
        let reference = Arc::new(RefInput::new(2.0));
        let pid = PidNode::with_feedforward(
            0.0,
            0.0,
            0.0,
            0.25,
            reference.clone(),
            Arc::new(Constant::new(0.0)),
            0.05,
        );
        assert!((pid.output() - 0.5).abs() < 1e-12);
        pid.set_feedforward(0.1);
        assert_eq!(pid.feedforward(), Some(0.1));
        assert!((pid.output() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn set_pid_updates_each_gain() {
        let pid = PidNode::new(0.0, 0.0, 0.0, Arc::new(Constant::new(0.0)), 0.05);
        pid.set_pid(1.0, 2.0, 3.0);
        assert_eq!((pid.p(), pid.i(), pid.d()), (1.0, 2.0, 3.0));
        assert_eq!(pid.feedforward(), None);
        pid.set_feedforward(1.0);
        assert_eq!(pid.feedforward(), None);
    }

    #[test]
    fn input_read_once_per_evaluation() {
        use crate::source::FuncNode;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let reads = Arc::new(AtomicUsize::new(0));
        let counter = reads.clone();
        let error = Arc::new(FuncNode::new(move || {
            // Each read returns a different value
            counter.fetch_add(1, Ordering::SeqCst) as f64 + 1.0
        }));
        let pid = PidNode::new(1.0, 1.0, 0.1, error, 0.1);
        pid.set_output_range(-100.0, 100.0);

        // P = 1, I = 0.1, D = 0.1 * 1 / 0.1 = 1, all from the same sample
        assert!((pid.output() - 2.1).abs() < 1e-12);
        assert_eq!(reads.load(Ordering::SeqCst), 1);
        pid.output();
        assert_eq!(reads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn reset_restores_fresh_sequence() {
        let input = Arc::new(RefInput::new(0.0));
        let pid = PidNode::new(0.3, 0.5, 0.05, input.clone(), 0.1);
        let samples = [0.4, 0.1, -0.2, 0.3];

        let run = |pid: &PidNode| {
            samples
                .iter()
                .map(|&x| {
                    input.set(x);
                    pid.output()
                })
                .collect::<Vec<_>>()
        };

        let first = run(&pid);
        pid.reset();
        let second = run(&pid);
        assert_eq!(first, second);
    }
}
