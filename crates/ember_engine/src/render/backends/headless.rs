//! Headless bookkeeping device
//!
//! A [`GraphicsDevice`] implementation that performs no GPU work. It
//! allocates handles, mirrors bound state, and counts calls, which is
//! enough to drive the complete frame algorithm and observe what it did.
//! Used by the engine's own tests and by applications that want a frame
//! dry-run (CI smoke tests, command-stream debugging).

use std::collections::HashMap;

use slotmap::SlotMap;

use crate::render::api::{
    BlendFactor, ClearFlags, DepthFunction, Face, FramebufferHandle, GraphicsDevice, MeshHandle,
    PolygonMode, PrimitiveTopology, ShaderHandle, TextureDescriptor, TextureFormat, TextureHandle,
};
use crate::render::material::UniformValue;
use crate::render::{RenderError, RenderResult};

#[derive(Debug, Clone, Copy)]
struct TextureRecord {
    width: u32,
    height: u32,
    format: TextureFormat,
}

#[derive(Debug, Clone)]
struct FramebufferRecord {
    color_attachments: Vec<TextureHandle>,
    depth_attachment: Option<TextureHandle>,
    last_clear_color: Option<[f32; 4]>,
    depth_cleared: bool,
}

#[derive(Debug, Clone)]
struct ShaderRecord {
    name: String,
}

#[derive(Debug, Clone, Copy)]
struct MeshRecord {
    vertex_count: u32,
    index_count: u32,
}

/// A no-GPU [`GraphicsDevice`] for tests and CI
///
/// Resources are slotmap entries, pipeline state is mirrored verbatim, and
/// draw/state-change calls are counted. Inspection methods expose what a
/// frame did after the fact.
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    textures: SlotMap<TextureHandle, TextureRecord>,
    framebuffers: SlotMap<FramebufferHandle, FramebufferRecord>,
    shaders: SlotMap<ShaderHandle, ShaderRecord>,
    meshes: SlotMap<MeshHandle, MeshRecord>,

    bound_framebuffer: Option<FramebufferHandle>,
    active_shader: Option<ShaderHandle>,
    bound_textures: HashMap<u32, TextureHandle>,
    uniforms: HashMap<String, UniformValue>,
    clear_color: [f32; 4],
    viewport: (u32, u32),

    state_change_count: u32,
    draw_call_count: u32,
    uniform_upload_count: u32,

    /// When set, the next `create_shader` call fails - lets tests exercise
    /// the fatal-initialization path.
    pub fail_shader_creation: bool,
}

impl HeadlessDevice {
    /// Create an empty headless device
    pub fn new() -> Self {
        Self::default()
    }

    /// How many pipeline-state applications the device has seen
    pub fn state_change_count(&self) -> u32 {
        self.state_change_count
    }

    /// How many draw calls the device has seen
    pub fn draw_call_count(&self) -> u32 {
        self.draw_call_count
    }

    /// How many uniform uploads the device has seen
    pub fn uniform_upload_count(&self) -> u32 {
        self.uniform_upload_count
    }

    /// Dimensions of an allocated texture, if the handle is live
    pub fn texture_size(&self, texture: TextureHandle) -> Option<(u32, u32)> {
        self.textures.get(texture).map(|t| (t.width, t.height))
    }

    /// Format of an allocated texture, if the handle is live
    pub fn texture_format(&self, texture: TextureHandle) -> Option<TextureFormat> {
        self.textures.get(texture).map(|t| t.format)
    }

    /// The color a framebuffer was last cleared to, if it has been cleared
    pub fn cleared_color(&self, framebuffer: FramebufferHandle) -> Option<[f32; 4]> {
        self.framebuffers
            .get(framebuffer)
            .and_then(|f| f.last_clear_color)
    }

    /// Whether a framebuffer's depth plane has been cleared at least once
    pub fn depth_cleared(&self, framebuffer: FramebufferHandle) -> bool {
        self.framebuffers
            .get(framebuffer)
            .is_some_and(|f| f.depth_cleared)
    }

    /// The texture currently bound to a unit
    pub fn bound_texture(&self, unit: u32) -> Option<TextureHandle> {
        self.bound_textures.get(&unit).copied()
    }

    /// The last value uploaded for a named uniform, across all shaders
    pub fn uniform(&self, name: &str) -> Option<&UniformValue> {
        self.uniforms.get(name)
    }

    /// Number of live shader programs
    pub fn shader_count(&self) -> usize {
        self.shaders.len()
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn set_depth_test(&mut self, _enabled: bool) {
        self.state_change_count += 1;
    }

    fn set_depth_function(&mut self, _function: DepthFunction) {
        self.state_change_count += 1;
    }

    fn set_face_culling(&mut self, _enabled: bool) {
        self.state_change_count += 1;
    }

    fn set_culled_face(&mut self, _face: Face) {
        self.state_change_count += 1;
    }

    fn set_polygon_mode(&mut self, _mode: PolygonMode) {
        self.state_change_count += 1;
    }

    fn set_blending(&mut self, _enabled: bool) {
        self.state_change_count += 1;
    }

    fn set_blend_function(&mut self, _source: BlendFactor, _destination: BlendFactor) {
        self.state_change_count += 1;
    }

    fn create_texture(&mut self, descriptor: &TextureDescriptor) -> TextureHandle {
        self.textures.insert(TextureRecord {
            width: descriptor.width,
            height: descriptor.height,
            format: descriptor.format,
        })
    }

    fn resize_texture(&mut self, texture: TextureHandle, width: u32, height: u32) {
        match self.textures.get_mut(texture) {
            Some(record) => {
                record.width = width;
                record.height = height;
            }
            None => log::error!("resize_texture on dead handle {texture:?}"),
        }
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        if self.textures.remove(texture).is_none() {
            log::error!("delete_texture on dead handle {texture:?}");
        }
    }

    fn create_framebuffer(
        &mut self,
        color_attachments: &[TextureHandle],
        depth_attachment: Option<TextureHandle>,
    ) -> FramebufferHandle {
        self.framebuffers.insert(FramebufferRecord {
            color_attachments: color_attachments.to_vec(),
            depth_attachment,
            last_clear_color: None,
            depth_cleared: false,
        })
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferHandle) {
        if self.framebuffers.remove(framebuffer).is_none() {
            log::error!("delete_framebuffer on dead handle {framebuffer:?}");
        }
        if self.bound_framebuffer == Some(framebuffer) {
            self.bound_framebuffer = None;
        }
    }

    fn create_shader(
        &mut self,
        name: &str,
        vertex_path: &str,
        fragment_path: &str,
    ) -> RenderResult<ShaderHandle> {
        if self.fail_shader_creation || vertex_path.is_empty() || fragment_path.is_empty() {
            return Err(RenderError::InitializationFailed(format!(
                "shader '{name}' failed to compile"
            )));
        }
        log::debug!("compiled shader '{name}' ({vertex_path} + {fragment_path})");
        Ok(self.shaders.insert(ShaderRecord {
            name: name.to_owned(),
        }))
    }

    fn upload_mesh(
        &mut self,
        _vertex_bytes: &[u8],
        vertex_count: u32,
        indices: &[u32],
    ) -> MeshHandle {
        self.meshes.insert(MeshRecord {
            vertex_count,
            index_count: indices.len() as u32,
        })
    }

    fn delete_mesh(&mut self, mesh: MeshHandle) {
        if self.meshes.remove(mesh).is_none() {
            log::error!("delete_mesh on dead handle {mesh:?}");
        }
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferHandle>) {
        if let Some(handle) = framebuffer {
            if !self.framebuffers.contains_key(handle) {
                log::error!("bind_framebuffer on dead handle {handle:?}");
                return;
            }
        }
        self.bound_framebuffer = framebuffer;
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    fn set_clear_color(&mut self, color: [f32; 4]) {
        self.clear_color = color;
    }

    fn clear(&mut self, flags: ClearFlags) {
        let Some(handle) = self.bound_framebuffer else {
            // Default framebuffer; nothing to record headlessly.
            return;
        };
        if let Some(record) = self.framebuffers.get_mut(handle) {
            if flags.contains(ClearFlags::COLOR) {
                record.last_clear_color = Some(self.clear_color);
            }
            if flags.contains(ClearFlags::DEPTH) {
                record.depth_cleared = true;
            }
        }
    }

    fn use_shader(&mut self, shader: ShaderHandle) {
        if let Some(record) = self.shaders.get(shader) {
            log::trace!("shader '{}' active", record.name);
            self.active_shader = Some(shader);
        } else {
            log::error!("use_shader on dead handle {shader:?}");
        }
    }

    fn set_uniform(&mut self, name: &str, value: &UniformValue) {
        if self.active_shader.is_none() {
            log::error!("set_uniform '{name}' with no active shader");
            return;
        }
        // Exhaustive by construction: every variant stores the same way
        // headlessly, but the match keeps this in sync with the enum.
        let stored = match value {
            UniformValue::Bool(v) => UniformValue::Bool(*v),
            UniformValue::Int(v) => UniformValue::Int(*v),
            UniformValue::Float(v) => UniformValue::Float(*v),
            UniformValue::Vec2(v) => UniformValue::Vec2(*v),
            UniformValue::Vec3(v) => UniformValue::Vec3(*v),
            UniformValue::Vec4(v) => UniformValue::Vec4(*v),
            UniformValue::Mat3(v) => UniformValue::Mat3(*v),
            UniformValue::Mat4(v) => UniformValue::Mat4(*v),
        };
        self.uniforms.insert(name.to_owned(), stored);
        self.uniform_upload_count += 1;
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) {
        if !self.textures.contains_key(texture) {
            log::error!("bind_texture on dead handle {texture:?} (unit {unit})");
            return;
        }
        self.bound_textures.insert(unit, texture);
    }

    fn draw_arrays(&mut self, mesh: MeshHandle, _topology: PrimitiveTopology, _vertex_count: u32) {
        if !self.meshes.contains_key(mesh) {
            log::error!("draw_arrays on dead handle {mesh:?}");
            return;
        }
        self.draw_call_count += 1;
    }

    fn draw_indexed(&mut self, mesh: MeshHandle, _topology: PrimitiveTopology, _index_count: u32) {
        if !self.meshes.contains_key(mesh) {
            log::error!("draw_indexed on dead handle {mesh:?}");
            return;
        }
        self.draw_call_count += 1;
    }

    fn blit_depth(
        &mut self,
        source: FramebufferHandle,
        destination: FramebufferHandle,
        _width: u32,
        _height: u32,
    ) {
        let source_cleared = self
            .framebuffers
            .get(source)
            .is_some_and(|f| f.depth_cleared);
        if let Some(record) = self.framebuffers.get_mut(destination) {
            record.depth_cleared = record.depth_cleared || source_cleared;
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_allocation_and_resize() {
        let mut device = HeadlessDevice::new();
        let texture = device.create_texture(&TextureDescriptor {
            width: 64,
            height: 32,
            format: TextureFormat::Rgba8,
        });
        assert_eq!(device.texture_size(texture), Some((64, 32)));

        device.resize_texture(texture, 128, 128);
        assert_eq!(device.texture_size(texture), Some((128, 128)));
        assert_eq!(device.texture_format(texture), Some(TextureFormat::Rgba8));
    }

    #[test]
    fn test_clear_records_color_on_bound_framebuffer() {
        let mut device = HeadlessDevice::new();
        let color = device.create_texture(&TextureDescriptor {
            width: 8,
            height: 8,
            format: TextureFormat::Rgba8,
        });
        let framebuffer = device.create_framebuffer(&[color], None);

        device.bind_framebuffer(Some(framebuffer));
        device.set_clear_color([0.2, 0.4, 0.6, 1.0]);
        device.clear(ClearFlags::COLOR);

        assert_eq!(device.cleared_color(framebuffer), Some([0.2, 0.4, 0.6, 1.0]));
        assert!(!device.depth_cleared(framebuffer));
    }

    #[test]
    fn test_shader_creation_can_fail() {
        let mut device = HeadlessDevice::new();
        device.fail_shader_creation = true;
        let result = device.create_shader("broken", "a.vert", "a.frag");
        assert!(matches!(result, Err(RenderError::InitializationFailed(_))));
    }

    #[test]
    fn test_draw_on_dead_mesh_is_skipped() {
        let mut device = HeadlessDevice::new();
        device.draw_indexed(MeshHandle::default(), PrimitiveTopology::TriangleList, 36);
        assert_eq!(device.draw_call_count(), 0);
    }

    #[test]
    fn test_uniform_requires_active_shader() {
        let mut device = HeadlessDevice::new();
        device.set_uniform("model", &UniformValue::Float(1.0));
        assert_eq!(device.uniform_upload_count(), 0);

        let shader = device.create_shader("s", "s.vert", "s.frag").unwrap();
        device.use_shader(shader);
        device.set_uniform("model", &UniformValue::Float(1.0));
        assert_eq!(device.uniform_upload_count(), 1);
    }
}
