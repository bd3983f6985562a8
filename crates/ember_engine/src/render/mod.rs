//! # Rendering System
//!
//! The core rendering abstraction layer of the engine: a deferred,
//! multi-pass renderer driven by a per-frame render queue.
//!
//! ## Architecture
//!
//! - **Renderer**: owns the render targets and drives the frame algorithm
//! - **RenderQueue**: collects per-frame draw submissions into deferred,
//!   shadow-casting, and post-processing buckets
//! - **PipelineStateCache**: mirrors global pipeline state so redundant
//!   device calls are elided
//! - **MaterialLibrary**: built-in shaders plus per-draw uniform sets
//! - **GraphicsDevice**: the trait boundary to the actual graphics context;
//!   windowed backends live outside the engine, a headless backend ships
//!   in-tree for tests and CI

pub mod api;
pub mod backends;
pub mod camera;
pub mod lighting;
pub mod material;
pub mod material_library;
pub mod mesh;
pub mod queue;
pub mod renderer;
pub mod state;
pub mod target;

pub use api::{
    BlendFactor, ClearFlags, DepthFunction, Face, FramebufferHandle, GraphicsDevice, MeshHandle,
    PolygonMode, PrimitiveTopology, ShaderHandle, TextureDescriptor, TextureFormat, TextureHandle,
};
pub use backends::headless::HeadlessDevice;
pub use camera::Camera;
pub use lighting::{DirectionalLight, PointLight, SpotLight};
pub use material::{Material, MaterialId, MaterialKind, SamplerBinding, UniformValue};
pub use material_library::MaterialLibrary;
pub use mesh::{Mesh, Vertex};
pub use queue::{RenderCommand, RenderQueue};
pub use renderer::{MeshId, Renderer};
pub use state::PipelineStateCache;
pub use target::{RenderTarget, RenderTargetDescriptor};

use thiserror::Error;

/// High-level rendering error types
///
/// Failures here are setup failures: the renderer cannot operate without its
/// baseline shaders and targets, so construction paths return these instead
/// of limping along. Per-draw problems (stale handles) are logged and the
/// offending command is skipped, never surfaced as an error.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Renderer initialization failed during setup
    #[error("Renderer initialization failed: {0}")]
    InitializationFailed(String),

    /// Resource creation or management failed
    #[error("Resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// A handle referred to a resource that no longer exists
    #[error("Invalid resource handle: {0}")]
    InvalidHandle(String),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
