//! Task groups and isolation scopes.

pub mod group;
pub mod isolation;

pub use group::TaskGroup;
pub use isolation::{is_isolated, isolate};
