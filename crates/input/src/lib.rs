//! Viewer input: device-agnostic actions and pointer tracking.
//!
//! # Invariants
//! - Camera logic consumes actions, never raw key codes.
//! - Pointer motion while look is disabled never produces a delta.

pub mod action;
pub mod mouse_look;

pub use action::{Action, ActionState, MoveDirection};
pub use mouse_look::MouseLook;
