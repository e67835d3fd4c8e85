//! Node interface and the per-node lock wrapper.
//!
//! A node produces one scalar per call to [`Node::output`]. Nodes are wired to
//! their upstream nodes at construction time through [`NodeRef`] handles and
//! never rewired afterwards, so a graph can only be built from nodes that already
//! exist and cannot contain a cycle.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

/// Shared handle to a node in a control graph.
pub type NodeRef = Arc<dyn Node>;

/// Callback invoked by a source node to request an immediate re-evaluation.
pub type WakeupCallback = Arc<dyn Fn() + Send + Sync>;

/// Callback that does nothing; the default for sources nobody listens to.
pub fn noop_wakeup() -> WakeupCallback {
    Arc::new(|| {})
}

/// A unit of the control graph producing a scalar value.
///
/// `output` evaluates each upstream node exactly once per call. Implementations
/// must not cache values across calls beyond their explicit state.
pub trait Node: Send + Sync {
    /// Evaluate the node.
    fn output(&self) -> f64;

    /// Upstream node of a single-input node.
    fn input_node(&self) -> Option<&NodeRef> {
        None
    }

    /// Register a wake-up callback with every source feeding this node.
    ///
    /// The default forwards to [`Node::input_node`]; fan-in nodes forward to all
    /// of their inputs and sources store the callback.
    fn register_wakeup(&self, callback: WakeupCallback) {
        if let Some(input) = self.input_node() {
            input.register_wakeup(callback);
        }
    }
}

/// A value guarded by its own lock.
///
/// Every mutable node parameter lives behind one of these. Locks are per value,
/// never per graph, so a concurrent setter may become visible partway through an
/// evaluation of a larger graph.
#[derive(Default)]
pub struct Guarded<T> {
    inner: Mutex<T>,
}

impl<T: Copy> Guarded<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    pub fn get(&self) -> T {
        *self.inner.lock()
    }

    pub fn set(&self, value: T) {
        *self.inner.lock() = value;
    }

    /// Read-modify-write under the lock.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

impl<T: Copy + fmt::Debug> fmt::Debug for Guarded<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Guarded").field(&self.get()).finish()
    }
}
