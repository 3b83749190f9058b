//! Scene Node - retained-mode 2D scene graph
//!
//! A tree of reference-counted nodes carrying transform, input and render
//! state, composited into world-space matrices for drawing and hit testing.
//!
//! Key points:
//! - Children sorted by z-order, owned by their parent (`Arc`), parent links weak
//! - Re-entrant structural mutation rejected, never queued
//! - Lazy transform caching with independent dirty bits for matrix and inverse
//! - Timers, actions and input handlers follow the node's running state
//! - Scheduler, action manager and event dispatcher injected via `SceneContext`

pub mod camera;
pub mod context;
pub mod error;
pub mod event;
pub mod hooks;
pub mod node;
pub mod render;
pub mod timer;
pub mod transform;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use camera::*;
pub use context::*;
pub use error::*;
pub use event::*;
pub use hooks::*;
pub use node::*;
pub use render::*;
pub use timer::*;
pub use transform::*;
pub use types::*;

pub fn version() -> &'static str {
    "0.1.0"
}
