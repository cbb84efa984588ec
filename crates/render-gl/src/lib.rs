//! OpenGL backend for the mesh viewer.
//!
//! # Invariants
//! - Every GL call happens on the thread that owns the context; [`GlApi`]
//!   is neither `Send` nor `Sync`.
//! - A [`GlApi`] only exists once the context is current and every required
//!   entry point for the tier has loaded.

mod api;
mod context;

pub use api::GlApi;
pub use context::{ContextError, GlContext};
