//! Core systems for wsgate.
//!
//! This crate provides the foundational pieces shared by the wsgate crates:
//!
//! - **Signal/Slot System**: Type-safe observer notification
//! - **Authorization Gate**: Defers work until an external authority says go
//! - **Logging**: `tracing` targets and span names for each subsystem
//!
//! # Signal/Slot Example
//!
//! ```
//! use wsgate_core::Signal;
//!
//! let state_changed = Signal::<&'static str>::new();
//!
//! let conn_id = state_changed.connect(|state| {
//!     println!("State changed to: {}", state);
//! });
//!
//! state_changed.emit("Open");
//! state_changed.disconnect(conn_id);
//! ```

pub mod gate;
pub mod logging;
pub mod signal;

pub use gate::Gate;
pub use signal::{ConnectionGuard, ConnectionId, Signal};
