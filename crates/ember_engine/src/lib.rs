//! # Ember Engine
//!
//! A real-time 3D rendering engine built around a deferred shading pipeline.
//!
//! ## Features
//!
//! - **Deferred Shading**: G-buffer geometry pass followed by per-light
//!   accumulation, decoupling lighting cost from scene complexity
//! - **Render Queue**: per-frame command collection with deferred, shadow,
//!   and post-processing buckets
//! - **State Cache**: pipeline state changes deduplicated before they reach
//!   the graphics device
//! - **Pluggable Device**: all GPU work goes through the [`render::GraphicsDevice`]
//!   trait, so windowed and headless backends are interchangeable
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ember_engine::prelude::*;
//!
//! fn main() -> RenderResult<()> {
//!     let device = Box::new(HeadlessDevice::new());
//!     let config = RendererConfig::default();
//!     let mut renderer = Renderer::new(device, &config)?;
//!
//!     let mesh = renderer.create_mesh(&Mesh::cube());
//!     let material = renderer.create_textured_material();
//!
//!     renderer.push_to_render_queue(mesh, material, Mat4::identity());
//!     renderer.render_all_queue_items();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod core;
pub mod foundation;
pub mod render;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        core::config::{ConfigError, RendererConfig},
        foundation::math::{Mat4, Transform, Vec3},
        render::{
            Camera, DirectionalLight, HeadlessDevice, Material, MaterialId, MaterialKind, Mesh,
            MeshId, PointLight, RenderError, RenderResult, RenderTarget, Renderer, SpotLight,
        },
    };
}
