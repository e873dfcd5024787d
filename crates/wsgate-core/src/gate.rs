//! Authorization gate.
//!
//! A session must not be started until some external authority (a device
//! management layer, a login flow) says the application is authorized. The
//! [`Gate`] is the latch between the two: the authority calls
//! [`authorize`](Gate::authorize) and [`revoke`](Gate::revoke), and the code
//! that owns the session defers its first connect with
//! [`when_authorized`](Gate::when_authorized).
//!
//! ```
//! use wsgate_core::Gate;
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::sync::Arc;
//!
//! let gate = Gate::new();
//! let started = Arc::new(AtomicBool::new(false));
//!
//! let started_clone = started.clone();
//! gate.when_authorized(move || started_clone.store(true, Ordering::SeqCst));
//! assert!(!started.load(Ordering::SeqCst));
//!
//! gate.authorize();
//! assert!(started.load(Ordering::SeqCst));
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::logging::targets;
use crate::signal::Signal;

type Pending = Box<dyn FnOnce() + Send>;

/// An authorization latch with one-shot deferred actions.
pub struct Gate {
    authorized: AtomicBool,
    pending: Mutex<Vec<Pending>>,

    /// Emitted every time the gate goes from closed to open.
    pub opened: Arc<Signal<()>>,
    /// Emitted every time the gate goes from open to closed.
    pub revoked: Arc<Signal<()>>,
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

impl Gate {
    /// Create a closed gate.
    pub fn new() -> Self {
        Self {
            authorized: AtomicBool::new(false),
            pending: Mutex::new(Vec::new()),
            opened: Arc::new(Signal::new()),
            revoked: Arc::new(Signal::new()),
        }
    }

    /// Whether the last signal from the authority was an authorization.
    pub fn is_authorized(&self) -> bool {
        self.authorized.load(Ordering::SeqCst)
    }

    /// Open the gate, running every action deferred by
    /// [`when_authorized`](Self::when_authorized).
    ///
    /// Opening an already open gate does nothing.
    pub fn authorize(&self) {
        if self.authorized.swap(true, Ordering::SeqCst) {
            tracing::trace!(target: targets::GATE, "already authorized");
            return;
        }

        let pending = std::mem::take(&mut *self.pending.lock());
        tracing::debug!(target: targets::GATE, deferred = pending.len(), "authorized");
        for action in pending {
            action();
        }
        self.opened.emit(());
    }

    /// Close the gate. Actions deferred later wait for the next authorization.
    pub fn revoke(&self) {
        if self.authorized.swap(false, Ordering::SeqCst) {
            tracing::debug!(target: targets::GATE, "authorization revoked");
            self.revoked.emit(());
        }
    }

    /// Run `action` now if the gate is open, otherwise exactly once on the
    /// next [`authorize`](Self::authorize).
    pub fn when_authorized<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut pending = self.pending.lock();
            // Checked under the lock so an action can't slip in after
            // `authorize` drained the queue.
            if !self.is_authorized() {
                pending.push(Box::new(action));
                return;
            }
        }
        action();
    }

    /// Number of actions waiting for authorization.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

impl std::fmt::Debug for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gate")
            .field("authorized", &self.is_authorized())
            .field("pending", &self.pending_count())
            .finish()
    }
}
