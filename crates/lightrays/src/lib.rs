//! Light rays background effect.
//!
//! The crate renders an animated ray field behind other content, drawing one
//! full-surface quad per frame while the surface is on screen. The overall
//! flow is:
//!
//! ```text
//!   host (raysview / tests)
//!          │ activate(acquire backend, geometry, visible ratio)
//!          ▼
//!   AnimationSession ──▶ ProgramBuilder ──▶ UniformTable (once per program)
//!          │
//!          │ tick(token) while VisibilityGate says visible
//!          ├─▶ ResizeController::apply_pending ─▶ backend.resize_surface
//!          ├─▶ PointerTracker::advance
//!          ├─▶ resolve_anchor_and_direction
//!          └─▶ push uniforms ─▶ backend.draw ─▶ schedule next tick
//! ```
//!
//! All GPU access goes through [`GraphicsBackend`]; [`WgpuBackend`] presents
//! to a window surface. Frame pacing is owned by the host through the
//! [`scheduler::TickScheduler`] seam, and host signals are registered through
//! [`HostEvents`] so teardown can detach them as one scope.

mod backend;
mod color;
mod gpu;
mod host;
mod origin;
mod pointer;
mod program;
mod resize;
mod session;
mod shaders;
#[cfg(test)]
mod testing;
mod types;
mod uniforms;
mod visibility;

pub use backend::{
    BufferId, GraphicsBackend, ProgramId, ShaderId, ShaderStage, UniformKind, UniformLocation,
    UniformSlot, UniformValue,
};
pub use color::{hex_to_rgb, OPAQUE_WHITE};
pub use gpu::WgpuBackend;
pub use host::{HostEvents, Listener, ListenerHandle, Subscriptions};
pub use origin::{resolve_anchor_and_direction, RayOrigin, RayPlacement, ANCHOR_MARGIN};
pub use pointer::{PointerSample, PointerTracker, POINTER_SMOOTHING};
pub use program::{ProgramBuilder, ProgramError};
pub use resize::{backing_size, ResizeController, MAX_PIXEL_DENSITY};
pub use session::{AnimationSession, SessionError, SessionState};
pub use shaders::{FRAGMENT_SHADER, QUAD_VERTICES, VERTEX_SHADER};
pub use types::{BackingSize, RenderConfig, SurfaceGeometry, SurfaceSize, DEFAULT_COLOR};
pub use uniforms::{UniformTable, UNIFORM_NAMES};
pub use visibility::{VisibilityGate, VisibilityTransition, VISIBILITY_THRESHOLD};
