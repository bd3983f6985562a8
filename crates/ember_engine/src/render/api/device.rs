//! Graphics device trait
//!
//! This is the seam between the high-level renderer and the actual graphics
//! context. The renderer never talks to a driver directly; every state
//! change, resource allocation, and draw goes through [`GraphicsDevice`].
//! A windowed OpenGL implementation lives with the windowing layer outside
//! this crate, while [`crate::render::HeadlessDevice`] provides a
//! bookkeeping implementation for tests and CI.
//!
//! Pipeline-state setters on this trait are only ever called through
//! [`crate::render::PipelineStateCache`], which guarantees a device never
//! sees the same state applied twice in a row.

use crate::render::material::UniformValue;
use crate::render::RenderResult;

slotmap::new_key_type! {
    /// Handle to a GPU texture owned by the device
    pub struct TextureHandle;

    /// Handle to a framebuffer object owned by the device
    pub struct FramebufferHandle;

    /// Handle to a compiled and linked shader program
    pub struct ShaderHandle;

    /// Handle to uploaded mesh geometry (vertex + index buffers)
    pub struct MeshHandle;
}

/// Depth comparison functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthFunction {
    /// Never passes
    Never,
    /// Passes if the incoming depth is less than the stored depth
    Less,
    /// Passes if the incoming depth is equal to the stored depth
    Equal,
    /// Passes if the incoming depth is less than or equal to the stored depth
    LessOrEqual,
    /// Passes if the incoming depth is greater than the stored depth
    Greater,
    /// Passes if the incoming depth is not equal to the stored depth
    NotEqual,
    /// Passes if the incoming depth is greater than or equal to the stored depth
    GreaterOrEqual,
    /// Always passes
    Always,
}

/// Which face of a triangle gets culled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    /// Cull front faces (shadow pass, light volumes)
    Front,
    /// Cull back faces (the usual case)
    Back,
    /// Cull both faces
    FrontAndBack,
}

/// Polygon rendering mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolygonMode {
    /// Normal solid rendering
    Fill,
    /// Wireframe mode
    Line,
    /// Point cloud mode
    Point,
}

/// Blend function factors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFactor {
    /// Factor of zero
    Zero,
    /// Factor of one (additive light accumulation uses One/One)
    One,
    /// Source alpha
    SrcAlpha,
    /// One minus source alpha (standard transparency)
    OneMinusSrcAlpha,
    /// Destination alpha
    DstAlpha,
    /// One minus destination alpha
    OneMinusDstAlpha,
}

/// Primitive assembly topology for a mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveTopology {
    /// Independent triangles
    TriangleList,
    /// Triangle strip (fullscreen quads)
    TriangleStrip,
}

/// Texel storage formats for render-target attachments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    /// 8-bit normalized RGBA
    Rgba8,
    /// 16-bit float RGBA (HDR accumulation, G-buffer position/normal)
    Rgba16F,
    /// 24-bit depth with 8-bit stencil
    Depth24Stencil8,
    /// 32-bit float depth (shadow maps)
    Depth32F,
}

impl TextureFormat {
    /// Whether this format stores depth rather than color
    pub fn is_depth(self) -> bool {
        matches!(self, Self::Depth24Stencil8 | Self::Depth32F)
    }
}

/// Allocation parameters for a device texture
#[derive(Debug, Clone, Copy)]
pub struct TextureDescriptor {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Texel storage format
    pub format: TextureFormat,
}

bitflags::bitflags! {
    /// Which framebuffer planes a clear operation touches
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClearFlags: u32 {
        /// Color attachments
        const COLOR = 1 << 0;
        /// Depth attachment
        const DEPTH = 1 << 1;
        /// Stencil attachment
        const STENCIL = 1 << 2;
    }
}

/// Main graphics device trait
///
/// Implementations own all GPU resources; the renderer only holds handles.
/// All methods are called from the single thread owning the graphics
/// context, in strict frame order - implementations need no synchronization.
pub trait GraphicsDevice {
    // === Pipeline state (reached only through the state cache) ===

    /// Enable or disable depth testing
    fn set_depth_test(&mut self, enabled: bool);

    /// Set the depth comparison function
    fn set_depth_function(&mut self, function: DepthFunction);

    /// Enable or disable face culling
    fn set_face_culling(&mut self, enabled: bool);

    /// Select which face gets culled
    fn set_culled_face(&mut self, face: Face);

    /// Set the polygon rasterization mode
    fn set_polygon_mode(&mut self, mode: PolygonMode);

    /// Enable or disable blending
    fn set_blending(&mut self, enabled: bool);

    /// Set the blend function factor pair
    fn set_blend_function(&mut self, source: BlendFactor, destination: BlendFactor);

    // === Resource management ===

    /// Allocate a texture and return its handle
    fn create_texture(&mut self, descriptor: &TextureDescriptor) -> TextureHandle;

    /// Reallocate a texture's backing storage at a new size, preserving
    /// its handle and format
    fn resize_texture(&mut self, texture: TextureHandle, width: u32, height: u32);

    /// Release a texture
    fn delete_texture(&mut self, texture: TextureHandle);

    /// Create a framebuffer from color attachments and an optional depth
    /// attachment
    fn create_framebuffer(
        &mut self,
        color_attachments: &[TextureHandle],
        depth_attachment: Option<TextureHandle>,
    ) -> FramebufferHandle;

    /// Release a framebuffer (attachments are released separately)
    fn delete_framebuffer(&mut self, framebuffer: FramebufferHandle);

    /// Compile and link a shader program from source files
    ///
    /// Shader text loading and compilation are the device's concern; the
    /// renderer only passes paths. Failure here is a fatal setup error.
    fn create_shader(
        &mut self,
        name: &str,
        vertex_path: &str,
        fragment_path: &str,
    ) -> RenderResult<ShaderHandle>;

    /// Upload mesh geometry and return its handle
    fn upload_mesh(&mut self, vertex_bytes: &[u8], vertex_count: u32, indices: &[u32])
        -> MeshHandle;

    /// Release uploaded mesh geometry
    fn delete_mesh(&mut self, mesh: MeshHandle);

    // === Frame operations ===

    /// Bind a framebuffer as the draw target; `None` binds the default
    /// (window) framebuffer
    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferHandle>);

    /// Set the viewport rectangle to the full target size
    fn set_viewport(&mut self, width: u32, height: u32);

    /// Set the color used by subsequent color clears
    fn set_clear_color(&mut self, color: [f32; 4]);

    /// Clear the selected planes of the bound framebuffer
    fn clear(&mut self, flags: ClearFlags);

    /// Make a shader program active for subsequent uniform uploads and draws
    fn use_shader(&mut self, shader: ShaderHandle);

    /// Upload a uniform value to the active shader
    ///
    /// The value is a closed tagged enum, matched exhaustively by each
    /// implementation - there is no unrecognized-type failure path.
    fn set_uniform(&mut self, name: &str, value: &UniformValue);

    /// Bind a texture to a texture unit
    fn bind_texture(&mut self, unit: u32, texture: TextureHandle);

    /// Issue a non-indexed draw of the given mesh
    fn draw_arrays(&mut self, mesh: MeshHandle, topology: PrimitiveTopology, vertex_count: u32);

    /// Issue an indexed draw of the given mesh
    fn draw_indexed(&mut self, mesh: MeshHandle, topology: PrimitiveTopology, index_count: u32);

    /// Copy the depth plane of one framebuffer into another
    ///
    /// Used after the lighting pass so forward draws depth-test against the
    /// opaque geometry laid down in the G-buffer.
    fn blit_depth(
        &mut self,
        source: FramebufferHandle,
        destination: FramebufferHandle,
        width: u32,
        height: u32,
    );

    /// Downcast support for backend-specific inspection (tests, tooling)
    fn as_any(&self) -> &dyn std::any::Any;
}
