//! Source nodes: setpoints, constants and measurement adapters.
//!
//! Sources have no upstream node. [`RefInput`] additionally stores the wake-up
//! callback of the output that evaluates it, so that a new setpoint is acted on
//! immediately instead of at the next scheduled tick.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::node::{Guarded, Node, WakeupCallback, noop_wakeup};

/// External measurement primitive (encoder, gyro, potentiometer, ...).
pub trait Measurement: Send + Sync {
    /// Read the current measured value.
    fn read(&self) -> f64;
}

impl<F> Measurement for F
where
    F: Fn() -> f64 + Send + Sync,
{
    fn read(&self) -> f64 {
        self()
    }
}

/// Mutable reference input (setpoint).
pub struct RefInput {
    value: Guarded<f64>,
    callback: Mutex<WakeupCallback>,
}

impl RefInput {
    pub fn new(value: f64) -> Self {
        Self {
            value: Guarded::new(value),
            callback: Mutex::new(noop_wakeup()),
        }
    }

    /// Store a new reference, then wake the registered output.
    pub fn set(&self, value: f64) {
        self.value.set(value);
        // Clone out so the callback runs without our lock held.
        let callback = self.callback.lock().clone();
        callback();
    }

    pub fn get(&self) -> f64 {
        self.value.get()
    }
}

impl Default for RefInput {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl fmt::Debug for RefInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefInput")
            .field("value", &self.get())
            .finish_non_exhaustive()
    }
}

impl Node for RefInput {
    fn output(&self) -> f64 {
        self.get()
    }

    fn register_wakeup(&self, callback: WakeupCallback) {
        *self.callback.lock() = callback;
    }
}

/// Constant signal source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constant {
    value: f64,
}

impl Constant {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl Node for Constant {
    fn output(&self) -> f64 {
        self.value
    }
}

/// Adapter exposing a [`Measurement`] as a node.
#[derive(Clone)]
pub struct Sensor {
    source: Arc<dyn Measurement>,
}

impl Sensor {
    pub fn new(source: Arc<dyn Measurement>) -> Self {
        Self { source }
    }
}

impl Node for Sensor {
    fn output(&self) -> f64 {
        self.source.read()
    }
}

/// Node computing its value from an arbitrary closure.
pub struct FuncNode<F> {
    func: F,
}

impl<F> FuncNode<F>
where
    F: Fn() -> f64 + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> Node for FuncNode<F>
where
    F: Fn() -> f64 + Send + Sync,
{
    fn output(&self) -> f64 {
        (self.func)()
    }
}
