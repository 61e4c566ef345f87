//! warden: capability-style access control in front of nestfs.
//!
//! Callers register a set of path-prefix grants and service names; the
//! [`ScopedFs`] wrapper checks every filesystem call against those grants
//! before it reaches the underlying facade, so a denied call has no side
//! effect and fires no watch event.

mod checker;
mod error;
mod grant;
mod scoped;

pub use checker::PermissionChecker;
pub use error::{Error, Result};
pub use grant::{AccessMode, Grant};
pub use scoped::ScopedFs;
