//! # Status Management
//!
//! Records binding results on the Infra status: one condition, runtime
//! properties for every flavor, and the volumes to mount.

mod condition;
mod persist;
mod runtime;

pub use condition::{set_failure, set_success};
pub use persist::persist;
pub use runtime::{set_runtime_properties, set_volumes};
