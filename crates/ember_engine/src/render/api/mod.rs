//! Backend abstraction for the rendering system
//!
//! Defines the [`GraphicsDevice`] trait that rendering backends implement,
//! along with the handle and enum types shared across the boundary.

mod device;

pub use device::{
    BlendFactor, ClearFlags, DepthFunction, Face, FramebufferHandle, GraphicsDevice, MeshHandle,
    PolygonMode, PrimitiveTopology, ShaderHandle, TextureDescriptor, TextureFormat, TextureHandle,
};
