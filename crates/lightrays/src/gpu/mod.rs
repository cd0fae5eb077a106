//! `wgpu` implementation of the graphics backend.
//!
//! - `context` owns instance/adapter/device/surface wiring and reconfigures
//!   the swapchain when the backing size changes.
//! - `reflect` runs naga's GLSL frontend to produce compile logs and to read
//!   member offsets out of the uniform block.
//! - `backend` maps shader/program/buffer ids onto wgpu objects and records
//!   one render pass per draw.

mod backend;
mod context;
mod reflect;

pub use backend::WgpuBackend;
