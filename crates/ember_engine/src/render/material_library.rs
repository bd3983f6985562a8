//! Material library
//!
//! Owns every material in the scene (behind [`MaterialId`] handles) and the
//! built-in shader programs the frame algorithm depends on. Shader
//! compilation failure here is fatal: the renderer cannot produce a frame
//! without its baseline programs, so construction propagates the error
//! instead of continuing degraded.

use slotmap::SlotMap;

use crate::render::api::{GraphicsDevice, ShaderHandle};
use crate::render::material::{Material, MaterialId, MaterialKind};
use crate::render::RenderResult;

/// Built-in shaders plus the material storage
#[derive(Debug)]
pub struct MaterialLibrary {
    materials: SlotMap<MaterialId, Material>,

    geometry_shader: ShaderHandle,
    shadow_depth_shader: ShaderHandle,
    deferred_directional_shader: ShaderHandle,
    deferred_point_shader: ShaderHandle,
    light_volume_debug_shader: ShaderHandle,
    post_process_shader: ShaderHandle,
}

impl MaterialLibrary {
    /// Compile the built-in shader set and create an empty library
    pub fn new(device: &mut dyn GraphicsDevice) -> RenderResult<Self> {
        let geometry_shader = device.create_shader(
            "gbuffer_geometry",
            "shaders/gbuffer_geometry.vert",
            "shaders/gbuffer_geometry.frag",
        )?;
        let shadow_depth_shader = device.create_shader(
            "shadow_depth",
            "shaders/shadow_depth.vert",
            "shaders/shadow_depth.frag",
        )?;
        let deferred_directional_shader = device.create_shader(
            "deferred_directional",
            "shaders/deferred_quad.vert",
            "shaders/deferred_directional.frag",
        )?;
        let deferred_point_shader = device.create_shader(
            "deferred_point",
            "shaders/deferred_volume.vert",
            "shaders/deferred_point.frag",
        )?;
        let light_volume_debug_shader = device.create_shader(
            "light_volume_debug",
            "shaders/deferred_volume.vert",
            "shaders/light_volume_debug.frag",
        )?;
        let post_process_shader = device.create_shader(
            "post_process",
            "shaders/deferred_quad.vert",
            "shaders/post_process.frag",
        )?;
        log::info!("material library initialized with built-in shader set");

        Ok(Self {
            materials: SlotMap::with_key(),
            geometry_shader,
            shadow_depth_shader,
            deferred_directional_shader,
            deferred_point_shader,
            light_volume_debug_shader,
            post_process_shader,
        })
    }

    /// Create an opaque G-buffer material using the built-in geometry shader
    pub fn create_textured_material(&mut self) -> MaterialId {
        self.materials
            .insert(Material::new(self.geometry_shader, MaterialKind::Textured))
    }

    /// Create a forward-shaded material drawn after deferred lighting
    ///
    /// The caller supplies the shader; transparency and effect materials
    /// rarely share a program.
    pub fn create_custom_material(&mut self, shader: ShaderHandle) -> MaterialId {
        self.materials
            .insert(Material::new(shader, MaterialKind::Custom))
    }

    /// Create a fullscreen post-processing material
    ///
    /// Defaults to the built-in resolve shader; pass a custom shader for
    /// bespoke screen effects.
    pub fn create_post_processing_material(&mut self, shader: Option<ShaderHandle>) -> MaterialId {
        let shader = shader.unwrap_or(self.post_process_shader);
        self.materials
            .insert(Material::new(shader, MaterialKind::PostProcess))
    }

    /// Look up a material
    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id)
    }

    /// Look up a material mutably, for `set_*` calls between frames
    pub fn get_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id)
    }

    /// Remove a material from the library
    pub fn remove(&mut self, id: MaterialId) -> Option<Material> {
        self.materials.remove(id)
    }

    /// Number of materials in the library
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// Whether the library holds no materials
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// The depth-only shader shared by every shadow-pass draw
    pub fn shadow_depth_shader(&self) -> ShaderHandle {
        self.shadow_depth_shader
    }

    /// The directional-light accumulation shader
    pub fn deferred_directional_shader(&self) -> ShaderHandle {
        self.deferred_directional_shader
    }

    /// The point-light volume accumulation shader
    pub fn deferred_point_shader(&self) -> ShaderHandle {
        self.deferred_point_shader
    }

    /// The wireframe light-volume debug shader
    pub fn light_volume_debug_shader(&self) -> ShaderHandle {
        self.light_volume_debug_shader
    }

    /// The tone-map / bloom-composite resolve shader
    pub fn post_process_shader(&self) -> ShaderHandle {
        self.post_process_shader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::headless::HeadlessDevice;
    use crate::render::RenderError;

    #[test]
    fn test_library_compiles_builtin_shaders() {
        let mut device = HeadlessDevice::new();
        let library = MaterialLibrary::new(&mut device).unwrap();
        assert_eq!(device.shader_count(), 6);
        assert!(library.is_empty());
    }

    #[test]
    fn test_shader_failure_is_fatal() {
        let mut device = HeadlessDevice::new();
        device.fail_shader_creation = true;
        let result = MaterialLibrary::new(&mut device);
        assert!(matches!(result, Err(RenderError::InitializationFailed(_))));
    }

    #[test]
    fn test_created_materials_have_expected_kind() {
        let mut device = HeadlessDevice::new();
        let mut library = MaterialLibrary::new(&mut device).unwrap();

        let textured = library.create_textured_material();
        let post = library.create_post_processing_material(None);

        assert_eq!(library.get(textured).unwrap().kind, MaterialKind::Textured);
        assert_eq!(library.get(post).unwrap().kind, MaterialKind::PostProcess);
        assert_eq!(
            library.get(post).unwrap().shader,
            library.post_process_shader()
        );
        assert_eq!(library.len(), 2);
    }

    #[test]
    fn test_removed_material_lookup_fails() {
        let mut device = HeadlessDevice::new();
        let mut library = MaterialLibrary::new(&mut device).unwrap();
        let id = library.create_textured_material();
        assert!(library.remove(id).is_some());
        assert!(library.get(id).is_none());
    }
}
