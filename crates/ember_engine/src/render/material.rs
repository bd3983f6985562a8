//! Material definitions
//!
//! A material pairs a shader with the typed uniform values and sampler
//! bindings a draw needs, plus the pipeline-state flags the draw toggles.
//! Materials are stored in the [`crate::render::MaterialLibrary`] and
//! referenced by [`MaterialId`]; render commands never own them.

use std::collections::BTreeMap;

use crate::foundation::math::{Mat3, Mat4, Vec2, Vec3, Vec4};
use crate::render::api::{BlendFactor, DepthFunction, Face, ShaderHandle, TextureHandle};

slotmap::new_key_type! {
    /// Handle to a material stored in the material library
    pub struct MaterialId;
}

/// A typed shader uniform value
///
/// Uniform storage is a closed sum type matched exhaustively at upload
/// time, so a mis-tagged uniform cannot exist: every variant has exactly
/// one upload path.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    /// Boolean flag
    Bool(bool),
    /// 32-bit signed integer (also used for sampler unit bindings)
    Int(i32),
    /// 32-bit float
    Float(f32),
    /// 2-component float vector
    Vec2(Vec2),
    /// 3-component float vector
    Vec3(Vec3),
    /// 4-component float vector
    Vec4(Vec4),
    /// 3x3 float matrix
    Mat3(Mat3),
    /// 4x4 float matrix
    Mat4(Mat4),
}

/// A texture bound to a named sampler uniform at a fixed texture unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerBinding {
    /// The texture to bind (shared, not owned by the material)
    pub texture: TextureHandle,
    /// The texture unit the sampler reads from
    pub unit: u32,
}

/// How the renderer routes a material through the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialKind {
    /// Opaque surface rendered through the G-buffer geometry pass
    Textured,
    /// Forward-shaded surface drawn after deferred lighting (transparency,
    /// special effects)
    Custom,
    /// Fullscreen pass over the resolved image
    PostProcess,
}

/// Per-draw shader parameters and pipeline-state flags
///
/// The shader and any bound textures are shared GPU resources; the uniform
/// and sampler maps are value state. `Clone` therefore yields a deep copy
/// of the maps that still references the same shader and textures -
/// mutating the copy's uniforms never touches the original.
///
/// Both maps are ordered by uniform name, so upload order is deterministic
/// across frames and across copies.
#[derive(Debug, Clone)]
pub struct Material {
    /// Shader program this material draws with (shared across materials)
    pub shader: ShaderHandle,
    /// Frame routing for this material
    pub kind: MaterialKind,

    uniforms: BTreeMap<String, UniformValue>,
    samplers: BTreeMap<String, SamplerBinding>,

    /// Depth testing for draws using this material
    pub depth_test: bool,
    /// Depth comparison function
    pub depth_function: DepthFunction,
    /// Face culling for draws using this material
    pub face_culling: bool,
    /// Which face gets culled
    pub culled_face: Face,
    /// Blending for draws using this material
    pub blending: bool,
    /// Blend source factor
    pub blend_source: BlendFactor,
    /// Blend destination factor
    pub blend_destination: BlendFactor,

    /// Whether geometry drawn with this material is rendered into shadow maps
    pub shadow_casting: bool,
    /// Whether draws with this material sample shadow maps
    pub shadow_receiving: bool,
}

impl Material {
    /// Create a material with default pipeline state for its kind
    ///
    /// Opaque kinds depth-test with back-face culling and participate in
    /// shadows; post-process materials disable depth and shadows entirely.
    pub fn new(shader: ShaderHandle, kind: MaterialKind) -> Self {
        let opaque = kind != MaterialKind::PostProcess;
        Self {
            shader,
            kind,
            uniforms: BTreeMap::new(),
            samplers: BTreeMap::new(),
            depth_test: opaque,
            depth_function: DepthFunction::Less,
            face_culling: opaque,
            culled_face: Face::Back,
            blending: false,
            blend_source: BlendFactor::SrcAlpha,
            blend_destination: BlendFactor::OneMinusSrcAlpha,
            shadow_casting: opaque,
            shadow_receiving: opaque,
        }
    }

    /// Set a boolean uniform
    pub fn set_shader_bool(&mut self, name: impl Into<String>, value: bool) {
        self.uniforms.insert(name.into(), UniformValue::Bool(value));
    }

    /// Set an integer uniform
    pub fn set_shader_int(&mut self, name: impl Into<String>, value: i32) {
        self.uniforms.insert(name.into(), UniformValue::Int(value));
    }

    /// Set a float uniform
    pub fn set_shader_float(&mut self, name: impl Into<String>, value: f32) {
        self.uniforms.insert(name.into(), UniformValue::Float(value));
    }

    /// Set a 2-component vector uniform
    pub fn set_shader_vector2(&mut self, name: impl Into<String>, value: Vec2) {
        self.uniforms.insert(name.into(), UniformValue::Vec2(value));
    }

    /// Set a 3-component vector uniform
    pub fn set_shader_vector3(&mut self, name: impl Into<String>, value: Vec3) {
        self.uniforms.insert(name.into(), UniformValue::Vec3(value));
    }

    /// Set a 4-component vector uniform
    pub fn set_shader_vector4(&mut self, name: impl Into<String>, value: Vec4) {
        self.uniforms.insert(name.into(), UniformValue::Vec4(value));
    }

    /// Set a 3x3 matrix uniform
    pub fn set_shader_matrix3(&mut self, name: impl Into<String>, value: Mat3) {
        self.uniforms.insert(name.into(), UniformValue::Mat3(value));
    }

    /// Set a 4x4 matrix uniform
    pub fn set_shader_matrix4(&mut self, name: impl Into<String>, value: Mat4) {
        self.uniforms.insert(name.into(), UniformValue::Mat4(value));
    }

    /// Bind a texture to a named sampler at a fixed texture unit
    pub fn set_shader_texture(
        &mut self,
        name: impl Into<String>,
        texture: TextureHandle,
        unit: u32,
    ) {
        self.samplers
            .insert(name.into(), SamplerBinding { texture, unit });
    }

    /// The scalar uniforms this material declares, ordered by name
    pub fn uniforms(&self) -> &BTreeMap<String, UniformValue> {
        &self.uniforms
    }

    /// The sampler bindings this material declares, ordered by name
    pub fn samplers(&self) -> &BTreeMap<String, SamplerBinding> {
        &self.samplers
    }
}
