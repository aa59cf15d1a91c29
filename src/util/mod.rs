pub mod backoff;
pub mod delay;

pub use backoff::Backoff;
pub use delay::{DelayProvider, FixedDelay, UniformDelay};
