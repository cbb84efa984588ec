//! Frame kernel: fixed-timestep clock that decouples simulation from rendering.
//!
//! # Invariants
//! - Simulation advances only in whole fixed steps.
//! - Residual lag after a drain is always smaller than one step.
//! - Elapsed time comes from a monotonic source, never the wall clock.

pub mod timestep;

pub use timestep::{FixedTimestep, ManualClock, SteadyClock, TimeSource};
