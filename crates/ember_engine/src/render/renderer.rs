//! # Deferred Renderer
//!
//! The frame coordinator. Owns the graphics device, the pipeline state
//! cache, the render queue, the material library, the mesh registry, and
//! every render target the pipeline writes to.
//!
//! ## Frame Algorithm
//!
//! [`Renderer::render_all_queue_items`] executes a fixed pass sequence:
//!
//! 1. **Geometry pass** - opaque commands into the G-buffer
//! 2. **Shadow pass** - depth-only renders per shadow-casting directional
//!    light (skipped entirely when shadows are disabled)
//! 3. **Deferred lighting pass** - additive accumulation into the HDR
//!    lighting target: one fullscreen quad per directional light, one
//!    front-culled volume sphere per point light
//! 4. **Depth blit** - G-buffer depth copied into the lighting target
//! 5. **Forward pass** - custom-material commands shaded forward
//! 6. **Light-volume debug** - optional wireframe overlay
//! 7. **Resolve** - tone-map/bloom composite into the presentable target,
//!    then queued post-process commands
//! 8. **Queue drain**
//!
//! Deferred shading decouples lighting cost from scene complexity: the
//! expensive per-light work scales with lights x screen pixels instead of
//! lights x triangles.
//!
//! All submission happens on the single thread owning the graphics
//! context; a frame, once begun, always runs to completion. Within a pass,
//! commands draw in queue-insertion order - stable, but not a semantic
//! guarantee.

use slotmap::SlotMap;

use crate::core::config::RendererConfig;
use crate::foundation::math::{Mat4, Point3, Vec3};
use crate::render::api::{
    BlendFactor, ClearFlags, Face, GraphicsDevice, MeshHandle, PolygonMode, PrimitiveTopology,
    ShaderHandle, TextureFormat,
};
use crate::render::camera::Camera;
use crate::render::lighting::{DirectionalLight, PointLight, SpotLight};
use crate::render::material::{Material, MaterialId, MaterialKind, UniformValue};
use crate::render::material_library::MaterialLibrary;
use crate::render::mesh::Mesh;
use crate::render::queue::{RenderCommand, RenderQueue};
use crate::render::state::PipelineStateCache;
use crate::render::target::{RenderTarget, RenderTargetDescriptor};
use crate::render::RenderResult;

slotmap::new_key_type! {
    /// Handle to a mesh registered with the renderer
    pub struct MeshId;
}

/// Bookkeeping for a registered mesh after device upload
#[derive(Debug, Clone, Copy)]
struct MeshRecord {
    gpu: MeshHandle,
    topology: PrimitiveTopology,
    vertex_count: u32,
    index_count: u32,
}

// Light-space orthographic bounds for directional shadow maps.
const SHADOW_ORTHO_EXTENT: f32 = 10.0;
const SHADOW_NEAR_PLANE: f32 = 1.0;
const SHADOW_FAR_PLANE: f32 = 30.5;

/// Texture unit the deferred lighting pass samples the shadow map from.
const SHADOW_MAP_TEXTURE_UNIT: u32 = 3;
/// First texture unit for shadow maps bound to forward-shaded receivers;
/// light N (1-indexed) binds at `SHADOW_RECEIVE_BASE_UNIT + N - 1`.
const SHADOW_RECEIVE_BASE_UNIT: u32 = 10;
/// Upper bound on shadow-casting directional lights per frame.
const MAX_SHADOW_MAPS: usize = 4;

/// The deferred renderer
///
/// Render targets, built-in meshes, and built-in shaders are exclusively
/// owned here; scene meshes and materials live in registries behind
/// [`MeshId`] / [`MaterialId`] handles and are shared read-only with the
/// submitting code during rendering.
pub struct Renderer {
    device: Box<dyn GraphicsDevice>,
    state: PipelineStateCache,
    queue: RenderQueue,
    materials: MaterialLibrary,
    meshes: SlotMap<MeshId, MeshRecord>,

    gbuffer: RenderTarget,
    lighting_target: RenderTarget,
    custom_target: RenderTarget,
    main_target: RenderTarget,
    shadow_targets: Vec<RenderTarget>,

    directional_lights: Vec<DirectionalLight>,
    point_lights: Vec<PointLight>,
    spot_lights: Vec<SpotLight>,
    camera: Camera,

    clear_color: [f32; 4],
    shadows_enabled: bool,
    soft_shadows: bool,
    pcf_sample_amount: f32,
    light_volume_debug: bool,
    wireframe: bool,
    custom_target_enabled: bool,

    quad_mesh: MeshId,
    sphere_mesh: MeshId,

    width: u32,
    height: u32,
}

impl Renderer {
    /// One-time renderer setup
    ///
    /// Compiles the built-in shader set and allocates every render target.
    /// Any failure here is fatal - the renderer cannot produce frames
    /// without its baseline resources, so no partially-initialized
    /// renderer is ever returned.
    pub fn new(mut device: Box<dyn GraphicsDevice>, config: &RendererConfig) -> RenderResult<Self> {
        let width = config.width.max(1);
        let height = config.height.max(1);
        log::info!("initializing deferred renderer at {width}x{height}");

        let materials = MaterialLibrary::new(device.as_mut())?;

        // Position and normal need float precision; albedo and the extra
        // attachment are plain color data.
        let gbuffer = RenderTarget::new(
            device.as_mut(),
            width,
            height,
            RenderTargetDescriptor {
                color_formats: vec![
                    TextureFormat::Rgba16F,
                    TextureFormat::Rgba16F,
                    TextureFormat::Rgba8,
                    TextureFormat::Rgba8,
                ],
                depth_format: Some(TextureFormat::Depth24Stencil8),
            },
        );

        // HDR accumulation plus a bloom attachment slot for the resolve.
        let lighting_target = RenderTarget::new(
            device.as_mut(),
            width,
            height,
            RenderTargetDescriptor {
                color_formats: vec![TextureFormat::Rgba16F, TextureFormat::Rgba16F],
                depth_format: Some(TextureFormat::Depth24Stencil8),
            },
        );

        let custom_target = RenderTarget::new(
            device.as_mut(),
            width,
            height,
            RenderTargetDescriptor::color_depth(TextureFormat::Rgba16F),
        );

        let main_target = RenderTarget::new(
            device.as_mut(),
            width,
            height,
            RenderTargetDescriptor::color_only(TextureFormat::Rgba8),
        );

        let resolution = config.shadow_map_resolution.max(1);
        let shadow_targets: Vec<RenderTarget> = (0..config
            .max_shadow_casting_lights
            .min(MAX_SHADOW_MAPS))
            .map(|_| {
                RenderTarget::new(
                    device.as_mut(),
                    resolution,
                    resolution,
                    RenderTargetDescriptor::depth_only(TextureFormat::Depth32F),
                )
            })
            .collect();

        let mut meshes = SlotMap::with_key();
        let quad_mesh = register_mesh(device.as_mut(), &mut meshes, &Mesh::fullscreen_quad());
        let sphere_mesh = register_mesh(device.as_mut(), &mut meshes, &Mesh::uv_sphere(16, 32));

        device.set_clear_color(config.clear_color);

        let mut camera = Camera::default();
        camera.set_aspect_ratio(width as f32 / height as f32);

        Ok(Self {
            device,
            state: PipelineStateCache::new(),
            queue: RenderQueue::new(),
            materials,
            meshes,
            gbuffer,
            lighting_target,
            custom_target,
            main_target,
            shadow_targets,
            directional_lights: Vec::new(),
            point_lights: Vec::new(),
            spot_lights: Vec::new(),
            camera,
            clear_color: config.clear_color,
            shadows_enabled: config.shadows_enabled,
            soft_shadows: config.soft_shadows,
            pcf_sample_amount: config.pcf_sample_amount,
            light_volume_debug: config.light_volume_debug,
            wireframe: false,
            custom_target_enabled: false,
            quad_mesh,
            sphere_mesh,
            width,
            height,
        })
    }

    // === Resource registration ===

    /// Upload a mesh and register it for rendering
    pub fn create_mesh(&mut self, mesh: &Mesh) -> MeshId {
        let id = register_mesh(self.device.as_mut(), &mut self.meshes, mesh);
        log::debug!(
            "registered mesh ({} vertices, {} indices)",
            mesh.vertices.len(),
            mesh.indices.len()
        );
        id
    }

    /// Compile a shader program for custom materials
    pub fn create_shader(
        &mut self,
        name: &str,
        vertex_path: &str,
        fragment_path: &str,
    ) -> RenderResult<ShaderHandle> {
        self.device.create_shader(name, vertex_path, fragment_path)
    }

    /// Create an opaque G-buffer material
    pub fn create_textured_material(&mut self) -> MaterialId {
        self.materials.create_textured_material()
    }

    /// Create a forward-shaded material with a caller-supplied shader
    pub fn create_custom_material(&mut self, shader: ShaderHandle) -> MaterialId {
        self.materials.create_custom_material(shader)
    }

    /// Create a fullscreen post-processing material
    pub fn create_post_processing_material(&mut self, shader: Option<ShaderHandle>) -> MaterialId {
        self.materials.create_post_processing_material(shader)
    }

    /// Look up a material
    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id)
    }

    /// Look up a material mutably, for `set_*` calls between frames
    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id)
    }

    // === Per-frame scene inputs ===

    /// Submit one draw for this frame
    ///
    /// The transform is snapshotted by value. The material's kind and
    /// shadow flags at push time decide the bucket(s) the command lands in.
    pub fn push_to_render_queue(&mut self, mesh: MeshId, material: MaterialId, transform: Mat4) {
        let Some(entry) = self.materials.get(material) else {
            log::error!("push_to_render_queue with dead material handle; dropping command");
            return;
        };
        self.queue.push(
            RenderCommand {
                mesh,
                material,
                transform,
            },
            entry.kind,
            entry.shadow_casting,
        );
    }

    /// Set the camera used for every pass of the next frame
    pub fn set_scene_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    /// The current scene camera
    pub fn scene_camera(&self) -> &Camera {
        &self.camera
    }

    /// Add a directional light to the scene
    pub fn add_directional_light(&mut self, light: DirectionalLight) {
        self.directional_lights.push(light);
    }

    /// Add a point light to the scene
    pub fn add_point_light(&mut self, light: PointLight) {
        self.point_lights.push(light);
    }

    /// Add a spot light to the scene (shaded in the forward pass)
    pub fn add_spot_light(&mut self, light: SpotLight) {
        self.spot_lights.push(light);
    }

    /// The scene's directional lights, including per-frame shadow state
    pub fn directional_lights(&self) -> &[DirectionalLight] {
        &self.directional_lights
    }

    /// The scene's point lights
    pub fn point_lights(&self) -> &[PointLight] {
        &self.point_lights
    }

    // === Global toggles and sizing ===

    /// Resize every screen-sized render target
    ///
    /// Degenerate sizes (a collapsed editor viewport mid-drag) are ignored
    /// rather than forwarded to the graphics API. Repeat calls with the
    /// current size are no-ops.
    pub fn set_render_window_size(&mut self, width: i32, height: i32) {
        if width <= 0 || height <= 0 {
            log::warn!("ignoring degenerate render window size {width}x{height}");
            return;
        }
        let (width, height) = (width as u32, height as u32);
        if width == self.width && height == self.height {
            return;
        }

        self.gbuffer.resize(self.device.as_mut(), width, height);
        self.lighting_target.resize(self.device.as_mut(), width, height);
        self.custom_target.resize(self.device.as_mut(), width, height);
        self.main_target.resize(self.device.as_mut(), width, height);

        self.width = width;
        self.height = height;
        self.camera.set_aspect_ratio(width as f32 / height as f32);
        log::info!("render window resized to {width}x{height}");
    }

    /// Toggle wireframe rasterization globally
    pub fn toggle_wireframe_rendering(&mut self, enabled: bool) {
        self.wireframe = enabled;
        let mode = if enabled {
            PolygonMode::Line
        } else {
            PolygonMode::Fill
        };
        self.state.set_polygon_mode(self.device.as_mut(), mode);
    }

    /// Toggle depth testing globally
    pub fn toggle_depth_testing(&mut self, enabled: bool) {
        self.state.toggle_depth_testing(self.device.as_mut(), enabled);
    }

    /// Toggle face culling globally
    pub fn toggle_face_culling(&mut self, enabled: bool) {
        self.state.toggle_face_culling(self.device.as_mut(), enabled);
    }

    /// Enable or disable the shadow pass
    pub fn toggle_shadows(&mut self, enabled: bool) {
        self.shadows_enabled = enabled;
    }

    /// Enable or disable the wireframe light-volume overlay
    pub fn toggle_light_volume_debug(&mut self, enabled: bool) {
        self.light_volume_debug = enabled;
    }

    /// Route the forward pass into the dedicated custom target instead of
    /// the lighting target, isolating custom-material output for
    /// inspection
    pub fn toggle_custom_render_target(&mut self, enabled: bool) {
        self.custom_target_enabled = enabled;
    }

    // === Target accessors for the presentation/editor layer ===

    /// The final presentable target
    pub fn main_render_target(&self) -> &RenderTarget {
        &self.main_target
    }

    /// The geometry-pass G-buffer
    pub fn gbuffer(&self) -> &RenderTarget {
        &self.gbuffer
    }

    /// The intermediate HDR lighting target
    pub fn lighting_render_target(&self) -> &RenderTarget {
        &self.lighting_target
    }

    /// The dedicated custom-material target
    pub fn custom_render_target(&self) -> &RenderTarget {
        &self.custom_target
    }

    /// The pending render queue (drained by `render_all_queue_items`)
    pub fn queue(&self) -> &RenderQueue {
        &self.queue
    }

    /// The underlying graphics device, for backend-specific inspection
    pub fn device(&self) -> &dyn GraphicsDevice {
        self.device.as_ref()
    }

    // === Frame execution ===

    /// Execute the full pass sequence over the queued commands, then drain
    /// the queue
    pub fn render_all_queue_items(&mut self) {
        log::trace!(
            "frame: {} deferred, {} shadow, {} post-process commands, {} dir / {} point lights",
            self.queue.deferred_commands().len(),
            self.queue.shadow_casting_commands().len(),
            self.queue.post_processing_commands().len(),
            self.directional_lights.len(),
            self.point_lights.len(),
        );

        self.geometry_pass();
        if self.shadows_enabled {
            self.shadow_pass();
        } else {
            // Stale assignments from a previous frame must not leak into
            // the lighting pass.
            for light in &mut self.directional_lights {
                light.shadow_map = None;
            }
        }
        self.lighting_pass();
        self.depth_blit();
        self.forward_pass();
        if self.light_volume_debug {
            self.light_volume_debug_pass();
        }
        self.resolve_pass();

        self.queue.clear();
    }

    /// Step 1: opaque geometry into the G-buffer
    fn geometry_pass(&mut self) {
        let framebuffer = self.gbuffer.framebuffer();
        self.device.bind_framebuffer(Some(framebuffer));
        self.device.set_viewport(self.width, self.height);
        // Zeroed position/normal marks empty G-buffer texels.
        self.device.set_clear_color([0.0, 0.0, 0.0, 1.0]);
        self.device.clear(ClearFlags::COLOR | ClearFlags::DEPTH);

        self.state.toggle_depth_testing(self.device.as_mut(), true);
        self.state.toggle_blending(self.device.as_mut(), false);
        self.state.toggle_face_culling(self.device.as_mut(), true);
        self.state.set_culled_face(self.device.as_mut(), Face::Back);

        let camera = self.camera.clone();
        let commands = self.queue.deferred_commands().to_vec();
        for command in &commands {
            let kind = self.materials.get(command.material).map(|m| m.kind);
            if kind == Some(MaterialKind::Textured) {
                self.render_custom_command(command, &camera, false);
            }
        }
    }

    /// Step 2: depth-only render per shadow-casting directional light
    fn shadow_pass(&mut self) {
        let resolution = self.shadow_targets.first().map_or(0, RenderTarget::width);

        self.state.toggle_depth_testing(self.device.as_mut(), true);
        self.state.toggle_blending(self.device.as_mut(), false);
        self.state.toggle_face_culling(self.device.as_mut(), true);
        // Rasterizing back faces into the depth map reduces peter-panning
        // and surface self-shadowing.
        self.state.set_culled_face(self.device.as_mut(), Face::Front);

        let commands = self.queue.shadow_casting_commands().to_vec();
        let shadow_shader = self.materials.shadow_depth_shader();
        let mut slot = 0;
        for index in 0..self.directional_lights.len() {
            self.directional_lights[index].shadow_map = None;
            if !self.directional_lights[index].cast_shadows {
                continue;
            }
            if slot >= self.shadow_targets.len() {
                log::warn!(
                    "shadow-casting light {index} exceeds the {} allocated shadow target(s); skipping",
                    self.shadow_targets.len()
                );
                continue;
            }

            let light_space =
                directional_light_space_matrix(self.directional_lights[index].direction);
            let framebuffer = self.shadow_targets[slot].framebuffer();
            let depth_texture = self.shadow_targets[slot].depth_attachment();

            self.device.bind_framebuffer(Some(framebuffer));
            self.device.set_viewport(resolution, resolution);
            self.device.clear(ClearFlags::DEPTH);
            self.device.use_shader(shadow_shader);
            self.device
                .set_uniform("lightSpaceMatrix", &UniformValue::Mat4(light_space));

            for command in &commands {
                let Some(mesh) = self.meshes.get(command.mesh).copied() else {
                    log::error!("shadow command references dead mesh; skipping draw");
                    continue;
                };
                self.device
                    .set_uniform("model", &UniformValue::Mat4(command.transform));
                draw_mesh(self.device.as_mut(), mesh);
            }

            let light = &mut self.directional_lights[index];
            light.light_space_matrix = light_space;
            light.shadow_map = depth_texture;
            slot += 1;
        }

        self.state.set_culled_face(self.device.as_mut(), Face::Back);
    }

    /// Step 3: per-light accumulation into the HDR lighting target
    fn lighting_pass(&mut self) {
        let framebuffer = self.lighting_target.framebuffer();
        self.device.bind_framebuffer(Some(framebuffer));
        self.device.set_viewport(self.width, self.height);
        self.device.set_clear_color([0.0, 0.0, 0.0, 1.0]);
        self.device.clear(ClearFlags::COLOR | ClearFlags::DEPTH);

        // Full-screen accumulation: every light adds its contribution.
        self.state.toggle_depth_testing(self.device.as_mut(), false);
        self.state.toggle_blending(self.device.as_mut(), true);
        self.state
            .set_blend_function(self.device.as_mut(), BlendFactor::One, BlendFactor::One);

        let position_texture = self.gbuffer.color_attachment(0);
        let normal_texture = self.gbuffer.color_attachment(1);
        let albedo_texture = self.gbuffer.color_attachment(2);
        let quad = self.meshes.get(self.quad_mesh).copied();
        let sphere = self.meshes.get(self.sphere_mesh).copied();
        let camera_position = self.camera.position;
        let projection = self.camera.projection_matrix();
        let view = self.camera.view_matrix();

        // Directional lights: one fullscreen quad each.
        self.state.toggle_face_culling(self.device.as_mut(), false);
        let directional_shader = self.materials.deferred_directional_shader();
        for light in &self.directional_lights {
            self.device.use_shader(directional_shader);
            bind_gbuffer_inputs(
                self.device.as_mut(),
                position_texture,
                normal_texture,
                albedo_texture,
            );
            self.device
                .set_uniform("viewPosition", &UniformValue::Vec3(camera_position));

            self.device.set_uniform(
                "directionalLight.lightDirection",
                &UniformValue::Vec3(light.direction),
            );
            self.device.set_uniform(
                "directionalLight.ambientIntensity",
                &UniformValue::Vec3(light.ambient_intensity),
            );
            self.device.set_uniform(
                "directionalLight.diffuseIntensity",
                &UniformValue::Vec3(light.diffuse_intensity),
            );
            self.device.set_uniform(
                "directionalLight.specularIntensity",
                &UniformValue::Vec3(light.specular_intensity),
            );

            if let Some(shadow_map) = light.shadow_map {
                self.device.bind_texture(SHADOW_MAP_TEXTURE_UNIT, shadow_map);
                self.device.set_uniform(
                    "shadowMap",
                    &UniformValue::Int(SHADOW_MAP_TEXTURE_UNIT as i32),
                );
                self.device.set_uniform(
                    "lightSpaceMatrix",
                    &UniformValue::Mat4(light.light_space_matrix),
                );
                self.device
                    .set_uniform("shadowsEnabled", &UniformValue::Bool(true));
                self.device
                    .set_uniform("softShadows", &UniformValue::Bool(self.soft_shadows));
                self.device.set_uniform(
                    "pcfSampleAmount",
                    &UniformValue::Float(self.pcf_sample_amount),
                );
            } else {
                self.device
                    .set_uniform("shadowsEnabled", &UniformValue::Bool(false));
            }

            if let Some(quad) = quad {
                draw_mesh(self.device.as_mut(), quad);
            }
        }

        // Point lights: one bounding sphere each, front faces culled so
        // shading runs on the back faces - a camera inside the volume
        // would otherwise clip the whole light away.
        self.state.toggle_face_culling(self.device.as_mut(), true);
        self.state.set_culled_face(self.device.as_mut(), Face::Front);
        let point_shader = self.materials.deferred_point_shader();
        for (index, light) in self.point_lights.iter().enumerate() {
            self.device.use_shader(point_shader);
            bind_gbuffer_inputs(
                self.device.as_mut(),
                position_texture,
                normal_texture,
                albedo_texture,
            );
            self.device
                .set_uniform("viewPosition", &UniformValue::Vec3(camera_position));
            self.device
                .set_uniform("projection", &UniformValue::Mat4(projection));
            self.device.set_uniform("view", &UniformValue::Mat4(view));

            let model = Mat4::new_translation(&light.position)
                * Mat4::new_scaling(light.volume_radius());
            self.device.set_uniform("model", &UniformValue::Mat4(model));

            self.device.set_uniform(
                &format!("pointLights[{index}].lightPosition"),
                &UniformValue::Vec3(light.position),
            );
            self.device.set_uniform(
                &format!("pointLights[{index}].ambientIntensity"),
                &UniformValue::Vec3(light.ambient_intensity),
            );
            self.device.set_uniform(
                &format!("pointLights[{index}].diffuseIntensity"),
                &UniformValue::Vec3(light.diffuse_intensity),
            );
            self.device.set_uniform(
                &format!("pointLights[{index}].specularIntensity"),
                &UniformValue::Vec3(light.specular_intensity),
            );
            self.device.set_uniform(
                &format!("pointLights[{index}].attenuationConstant"),
                &UniformValue::Float(light.attenuation_constant),
            );
            self.device.set_uniform(
                &format!("pointLights[{index}].attenuationLinear"),
                &UniformValue::Float(light.attenuation_linear),
            );
            self.device.set_uniform(
                &format!("pointLights[{index}].attenuationQuadratic"),
                &UniformValue::Float(light.attenuation_quadratic),
            );

            if let Some(sphere) = sphere {
                draw_mesh(self.device.as_mut(), sphere);
            }
        }
        self.state.set_culled_face(self.device.as_mut(), Face::Back);
    }

    /// Step 4: copy G-buffer depth so forward draws test against opaque
    /// geometry
    fn depth_blit(&mut self) {
        self.device.blit_depth(
            self.gbuffer.framebuffer(),
            self.lighting_target.framebuffer(),
            self.width,
            self.height,
        );
    }

    /// Step 5: custom-material commands shaded forward
    fn forward_pass(&mut self) {
        let commands: Vec<RenderCommand> = self
            .queue
            .deferred_commands()
            .iter()
            .copied()
            .filter(|command| {
                self.materials.get(command.material).map(|m| m.kind)
                    == Some(MaterialKind::Custom)
            })
            .collect();
        if commands.is_empty() {
            return;
        }

        let framebuffer = if self.custom_target_enabled {
            self.custom_target.framebuffer()
        } else {
            self.lighting_target.framebuffer()
        };
        self.device.bind_framebuffer(Some(framebuffer));
        self.device.set_viewport(self.width, self.height);
        if self.custom_target_enabled {
            self.device.set_clear_color([0.0, 0.0, 0.0, 1.0]);
            self.device.clear(ClearFlags::COLOR | ClearFlags::DEPTH);
        }
        self.state.toggle_depth_testing(self.device.as_mut(), true);

        // Each command toggles only the state its material requests; the
        // cache keeps the repeats cheap.
        let camera = self.camera.clone();
        for command in &commands {
            self.render_custom_command(command, &camera, true);
        }
    }

    /// Step 6: wireframe point-light volumes for diagnostics
    fn light_volume_debug_pass(&mut self) {
        let Some(sphere) = self.meshes.get(self.sphere_mesh).copied() else {
            return;
        };
        let framebuffer = self.lighting_target.framebuffer();
        self.device.bind_framebuffer(Some(framebuffer));

        self.state
            .set_polygon_mode(self.device.as_mut(), PolygonMode::Line);
        self.state.toggle_depth_testing(self.device.as_mut(), true);
        self.state.toggle_blending(self.device.as_mut(), false);
        self.state.toggle_face_culling(self.device.as_mut(), false);

        let shader = self.materials.light_volume_debug_shader();
        self.device.use_shader(shader);
        self.device.set_uniform(
            "projection",
            &UniformValue::Mat4(self.camera.projection_matrix()),
        );
        self.device
            .set_uniform("view", &UniformValue::Mat4(self.camera.view_matrix()));

        for light in &self.point_lights {
            let model = Mat4::new_translation(&light.position)
                * Mat4::new_scaling(light.volume_radius());
            self.device.set_uniform("model", &UniformValue::Mat4(model));
            self.device.set_uniform(
                "volumeColor",
                &UniformValue::Vec3(light.diffuse_intensity),
            );
            draw_mesh(self.device.as_mut(), sphere);
        }

        let restore = if self.wireframe {
            PolygonMode::Line
        } else {
            PolygonMode::Fill
        };
        self.state.set_polygon_mode(self.device.as_mut(), restore);
    }

    /// Step 7: composite into the presentable target, then queued
    /// post-process commands
    fn resolve_pass(&mut self) {
        let framebuffer = self.main_target.framebuffer();
        self.device.bind_framebuffer(Some(framebuffer));
        self.device.set_viewport(self.width, self.height);
        self.device.set_clear_color(self.clear_color);
        self.device.clear(ClearFlags::COLOR);

        self.state.toggle_depth_testing(self.device.as_mut(), false);
        self.state.toggle_blending(self.device.as_mut(), false);
        self.state.toggle_face_culling(self.device.as_mut(), false);

        let shader = self.materials.post_process_shader();
        self.device.use_shader(shader);
        if let Some(color) = self.lighting_target.color_attachment(0) {
            self.device.bind_texture(0, color);
        }
        if let Some(bloom) = self.lighting_target.color_attachment(1) {
            self.device.bind_texture(1, bloom);
        }
        self.device
            .set_uniform("screenTexture", &UniformValue::Int(0));
        self.device
            .set_uniform("bloomTexture", &UniformValue::Int(1));
        if let Some(quad) = self.meshes.get(self.quad_mesh).copied() {
            draw_mesh(self.device.as_mut(), quad);
        }

        let commands = self.queue.post_processing_commands().to_vec();
        let camera = self.camera.clone();
        for command in &commands {
            self.render_custom_command(command, &camera, true);
        }
    }

    /// Draw one command with its own material
    ///
    /// Binds the material's shader, uploads the frame's camera matrices and
    /// the command's world transform, conditionally uploads shadow inputs
    /// for eligible receivers, pushes the material's declared samplers and
    /// scalar uniforms, and issues the indexed or non-indexed draw per the
    /// mesh topology.
    ///
    /// `update_gl_states` applies the material's depth/blend/cull flags
    /// through the state cache; bulk passes that set state once leave it
    /// off to avoid cache churn.
    ///
    /// A dead mesh or material handle logs an error and skips this single
    /// draw; the rest of the frame is unaffected.
    pub fn render_custom_command(
        &mut self,
        command: &RenderCommand,
        camera: &Camera,
        update_gl_states: bool,
    ) {
        let Some(material) = self.materials.get(command.material) else {
            log::error!("render command references dead material; skipping draw");
            return;
        };
        let Some(mesh) = self.meshes.get(command.mesh).copied() else {
            log::error!("render command references dead mesh; skipping draw");
            return;
        };

        if update_gl_states {
            self.state
                .toggle_depth_testing(&mut *self.device, material.depth_test);
            self.state
                .set_depth_function(&mut *self.device, material.depth_function);
            self.state
                .toggle_face_culling(&mut *self.device, material.face_culling);
            self.state
                .set_culled_face(&mut *self.device, material.culled_face);
            self.state
                .toggle_blending(&mut *self.device, material.blending);
            self.state.set_blend_function(
                &mut *self.device,
                material.blend_source,
                material.blend_destination,
            );
        }

        self.device.use_shader(material.shader);
        self.device.set_uniform(
            "projection",
            &UniformValue::Mat4(camera.projection_matrix()),
        );
        self.device
            .set_uniform("view", &UniformValue::Mat4(camera.view_matrix()));
        self.device
            .set_uniform("viewPosition", &UniformValue::Vec3(camera.position));
        self.device
            .set_uniform("model", &UniformValue::Mat4(command.transform));

        let receives_shadows = material.shadow_receiving
            && matches!(
                material.kind,
                MaterialKind::Textured | MaterialKind::Custom
            );
        if receives_shadows {
            let mut slot = 1usize; // uniform names are 1-indexed
            for light in &self.directional_lights {
                let Some(shadow_map) = light.shadow_map else {
                    continue;
                };
                if slot > MAX_SHADOW_MAPS {
                    break;
                }
                let unit = SHADOW_RECEIVE_BASE_UNIT + slot as u32 - 1;
                self.device.set_uniform(
                    &format!("lightShadowViewProjection{slot}"),
                    &UniformValue::Mat4(light.light_space_matrix),
                );
                self.device.bind_texture(unit, shadow_map);
                self.device
                    .set_uniform(&format!("shadowMap{slot}"), &UniformValue::Int(unit as i32));
                slot += 1;
            }
        }

        if material.kind == MaterialKind::Custom {
            // Forward-shaded draws need the scene lights the deferred
            // passes would otherwise supply.
            if let Some(light) = self.directional_lights.first() {
                self.device.set_uniform(
                    "directionalLight.lightDirection",
                    &UniformValue::Vec3(light.direction),
                );
                self.device.set_uniform(
                    "directionalLight.ambientIntensity",
                    &UniformValue::Vec3(light.ambient_intensity),
                );
                self.device.set_uniform(
                    "directionalLight.diffuseIntensity",
                    &UniformValue::Vec3(light.diffuse_intensity),
                );
                self.device.set_uniform(
                    "directionalLight.specularIntensity",
                    &UniformValue::Vec3(light.specular_intensity),
                );
            }
            for (index, light) in self.point_lights.iter().enumerate() {
                self.device.set_uniform(
                    &format!("pointLights[{index}].lightPosition"),
                    &UniformValue::Vec3(light.position),
                );
                self.device.set_uniform(
                    &format!("pointLights[{index}].ambientIntensity"),
                    &UniformValue::Vec3(light.ambient_intensity),
                );
                self.device.set_uniform(
                    &format!("pointLights[{index}].diffuseIntensity"),
                    &UniformValue::Vec3(light.diffuse_intensity),
                );
                self.device.set_uniform(
                    &format!("pointLights[{index}].specularIntensity"),
                    &UniformValue::Vec3(light.specular_intensity),
                );
                self.device.set_uniform(
                    &format!("pointLights[{index}].attenuationConstant"),
                    &UniformValue::Float(light.attenuation_constant),
                );
                self.device.set_uniform(
                    &format!("pointLights[{index}].attenuationLinear"),
                    &UniformValue::Float(light.attenuation_linear),
                );
                self.device.set_uniform(
                    &format!("pointLights[{index}].attenuationQuadratic"),
                    &UniformValue::Float(light.attenuation_quadratic),
                );
            }
            if let Some(light) = self.spot_lights.first() {
                self.device.set_uniform(
                    "spotLight.lightPosition",
                    &UniformValue::Vec3(light.position),
                );
                self.device.set_uniform(
                    "spotLight.lightDirection",
                    &UniformValue::Vec3(light.direction),
                );
                self.device.set_uniform(
                    "spotLight.innerLightCutoff",
                    &UniformValue::Float(light.inner_cutoff_cosine()),
                );
                self.device.set_uniform(
                    "spotLight.outerLightCutoff",
                    &UniformValue::Float(light.outer_cutoff_cosine()),
                );
                self.device.set_uniform(
                    "spotLight.ambientIntensity",
                    &UniformValue::Vec3(light.ambient_intensity),
                );
                self.device.set_uniform(
                    "spotLight.diffuseIntensity",
                    &UniformValue::Vec3(light.diffuse_intensity),
                );
                self.device.set_uniform(
                    "spotLight.specularIntensity",
                    &UniformValue::Vec3(light.specular_intensity),
                );
                self.device.set_uniform(
                    "spotLight.attenuationConstant",
                    &UniformValue::Float(light.attenuation_constant),
                );
                self.device.set_uniform(
                    "spotLight.attenuationLinear",
                    &UniformValue::Float(light.attenuation_linear),
                );
                self.device.set_uniform(
                    "spotLight.attenuationQuadratic",
                    &UniformValue::Float(light.attenuation_quadratic),
                );
            }
        }

        for (name, binding) in material.samplers() {
            self.device.bind_texture(binding.unit, binding.texture);
            self.device
                .set_uniform(name, &UniformValue::Int(binding.unit as i32));
        }
        for (name, value) in material.uniforms() {
            self.device.set_uniform(name, value);
        }

        draw_mesh(&mut *self.device, mesh);
    }
}

/// Upload a mesh to the device and register it
fn register_mesh(
    device: &mut dyn GraphicsDevice,
    meshes: &mut SlotMap<MeshId, MeshRecord>,
    mesh: &Mesh,
) -> MeshId {
    let gpu = device.upload_mesh(
        mesh.vertex_bytes(),
        mesh.vertices.len() as u32,
        &mesh.indices,
    );
    meshes.insert(MeshRecord {
        gpu,
        topology: mesh.topology,
        vertex_count: mesh.vertices.len() as u32,
        index_count: mesh.indices.len() as u32,
    })
}

/// Issue the draw call a mesh's topology and index data call for
fn draw_mesh(device: &mut dyn GraphicsDevice, mesh: MeshRecord) {
    if mesh.index_count > 0 {
        device.draw_indexed(mesh.gpu, mesh.topology, mesh.index_count);
    } else {
        device.draw_arrays(mesh.gpu, mesh.topology, mesh.vertex_count);
    }
}

/// Bind the G-buffer attachments the lighting shaders sample
fn bind_gbuffer_inputs(
    device: &mut dyn GraphicsDevice,
    position: Option<crate::render::api::TextureHandle>,
    normal: Option<crate::render::api::TextureHandle>,
    albedo: Option<crate::render::api::TextureHandle>,
) {
    if let Some(texture) = position {
        device.bind_texture(0, texture);
    }
    if let Some(texture) = normal {
        device.bind_texture(1, texture);
    }
    if let Some(texture) = albedo {
        device.bind_texture(2, texture);
    }
    device.set_uniform("gPosition", &UniformValue::Int(0));
    device.set_uniform("gNormal", &UniformValue::Int(1));
    device.set_uniform("gAlbedoSpec", &UniformValue::Int(2));
}

/// Orthographic light-space view-projection bounding the scene for a
/// directional light
fn directional_light_space_matrix(direction: Vec3) -> Mat4 {
    let projection = Mat4::new_orthographic(
        -SHADOW_ORTHO_EXTENT,
        SHADOW_ORTHO_EXTENT,
        -SHADOW_ORTHO_EXTENT,
        SHADOW_ORTHO_EXTENT,
        SHADOW_NEAR_PLANE,
        SHADOW_FAR_PLANE,
    );

    let direction = if direction.magnitude() > 1e-6 {
        direction.normalize()
    } else {
        Vec3::new(0.0, -1.0, 0.0)
    };
    // A straight-down light is parallel to the world up vector; look_at
    // needs a different up in that case.
    let up = if direction.x.abs() < 1e-4 && direction.z.abs() < 1e-4 {
        Vec3::new(0.0, 0.0, 1.0)
    } else {
        Vec3::new(0.0, 1.0, 0.0)
    };
    let eye = -direction * ((SHADOW_FAR_PLANE + SHADOW_NEAR_PLANE) * 0.5);
    let view = Mat4::look_at_rh(&Point3::from(eye), &Point3::origin(), &up);

    projection * view
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::headless::HeadlessDevice;

    fn test_renderer() -> Renderer {
        test_renderer_with(RendererConfig::default())
    }

    fn test_renderer_with(config: RendererConfig) -> Renderer {
        Renderer::new(Box::new(HeadlessDevice::new()), &config).unwrap()
    }

    fn headless(renderer: &Renderer) -> &HeadlessDevice {
        renderer
            .device()
            .as_any()
            .downcast_ref::<HeadlessDevice>()
            .unwrap()
    }

    #[test]
    fn test_initialization_creates_all_targets() {
        let renderer = test_renderer();
        assert_eq!(renderer.gbuffer().color_attachment_count(), 4);
        assert!(renderer.gbuffer().depth_attachment().is_some());
        assert_eq!(renderer.lighting_render_target().color_attachment_count(), 2);
        assert_eq!(renderer.main_render_target().color_attachment_count(), 1);
        assert_eq!(renderer.custom_render_target().color_attachment_count(), 1);
    }

    #[test]
    fn test_initialization_fails_on_shader_error() {
        let mut device = Box::new(HeadlessDevice::new());
        device.fail_shader_creation = true;
        assert!(Renderer::new(device, &RendererConfig::default()).is_err());
    }

    #[test]
    fn test_shadow_scenario_assigns_map_and_matrix() {
        let mut renderer = test_renderer();
        let mesh = renderer.create_mesh(&Mesh::cube());
        let material = renderer.create_textured_material();

        for offset in 0..3 {
            renderer.push_to_render_queue(
                mesh,
                material,
                Mat4::new_translation(&Vec3::new(offset as f32 * 2.0, 0.0, 0.0)),
            );
        }
        renderer.add_directional_light(DirectionalLight::default());

        renderer.render_all_queue_items();

        let light = &renderer.directional_lights()[0];
        assert!(light.shadow_map.is_some());
        assert_ne!(light.light_space_matrix, Mat4::identity());
        assert!(renderer.queue().is_empty());
    }

    #[test]
    fn test_empty_frame_clears_to_configured_color() {
        let clear = [0.3, 0.1, 0.2, 1.0];
        let mut renderer =
            test_renderer_with(RendererConfig::default().with_clear_color(clear));

        renderer.render_all_queue_items();

        let main = renderer.main_render_target().framebuffer();
        assert_eq!(headless(&renderer).cleared_color(main), Some(clear));
        // Only the resolve quad draws in an empty frame.
        assert_eq!(headless(&renderer).draw_call_count(), 1);
    }

    #[test]
    fn test_post_process_command_lands_only_in_post_bucket() {
        let mut renderer = test_renderer();
        let mesh = renderer.create_mesh(&Mesh::fullscreen_quad());
        let material = renderer.create_post_processing_material(None);

        renderer.push_to_render_queue(mesh, material, Mat4::identity());

        assert_eq!(renderer.queue().post_processing_commands().len(), 1);
        assert_eq!(renderer.queue().deferred_commands().len(), 0);
        assert_eq!(renderer.queue().shadow_casting_commands().len(), 0);

        renderer.render_all_queue_items();
        assert!(renderer.queue().is_empty());
    }

    #[test]
    fn test_full_pipeline_draw_counts() {
        let mut renderer = test_renderer();
        let mesh = renderer.create_mesh(&Mesh::cube());
        let material = renderer.create_textured_material();

        renderer.push_to_render_queue(mesh, material, Mat4::identity());
        renderer.add_directional_light(DirectionalLight::default());
        renderer.add_point_light(PointLight::new(Vec3::new(0.0, 2.0, 0.0)));

        renderer.render_all_queue_items();

        // geometry (1) + shadow (1) + directional quad (1) + point volume
        // (1) + resolve quad (1)
        assert_eq!(headless(&renderer).draw_call_count(), 5);
        assert_eq!(
            headless(&renderer).uniform("pointLights[0].lightPosition"),
            Some(&UniformValue::Vec3(Vec3::new(0.0, 2.0, 0.0)))
        );
        assert_eq!(
            headless(&renderer).uniform("pointLights[0].attenuationLinear"),
            Some(&UniformValue::Float(0.09))
        );
    }

    #[test]
    fn test_shadow_pass_skipped_when_disabled() {
        let mut renderer = test_renderer_with(RendererConfig::default().with_shadows(false));
        let mesh = renderer.create_mesh(&Mesh::cube());
        let material = renderer.create_textured_material();

        renderer.push_to_render_queue(mesh, material, Mat4::identity());
        renderer.add_directional_light(DirectionalLight::default());

        renderer.render_all_queue_items();

        assert!(renderer.directional_lights()[0].shadow_map.is_none());
        // geometry (1) + directional quad (1) + resolve quad (1)
        assert_eq!(headless(&renderer).draw_call_count(), 3);
    }

    #[test]
    fn test_non_casting_light_gets_no_shadow_map() {
        let mut renderer = test_renderer();
        let mesh = renderer.create_mesh(&Mesh::cube());
        let material = renderer.create_textured_material();

        renderer.push_to_render_queue(mesh, material, Mat4::identity());
        renderer.add_directional_light(DirectionalLight::default().with_shadows(false));

        renderer.render_all_queue_items();

        assert!(renderer.directional_lights()[0].shadow_map.is_none());
        assert_eq!(
            renderer.directional_lights()[0].light_space_matrix,
            Mat4::identity()
        );
    }

    #[test]
    fn test_resize_is_idempotent() {
        let mut renderer = test_renderer();

        renderer.set_render_window_size(1920, 1080);
        let after_first: Vec<_> = (0..4)
            .map(|i| {
                let texture = renderer.gbuffer().color_attachment(i).unwrap();
                headless(&renderer).texture_size(texture)
            })
            .collect();

        renderer.set_render_window_size(1920, 1080);
        for (index, size) in after_first.iter().enumerate() {
            let texture = renderer.gbuffer().color_attachment(index).unwrap();
            assert_eq!(headless(&renderer).texture_size(texture), *size);
            assert_eq!(*size, Some((1920, 1080)));
        }
        assert_eq!(renderer.gbuffer().color_attachment_count(), 4);
        assert_eq!(renderer.main_render_target().width(), 1920);
    }

    #[test]
    fn test_degenerate_window_size_is_ignored() {
        let mut renderer = test_renderer();
        renderer.set_render_window_size(0, 720);
        renderer.set_render_window_size(1280, -1);

        assert_eq!(renderer.gbuffer().width(), 1280);
        assert_eq!(renderer.gbuffer().height(), 720);
    }

    #[test]
    fn test_resize_updates_camera_aspect() {
        let mut renderer = test_renderer();
        renderer.set_render_window_size(1000, 500);
        assert!((renderer.scene_camera().aspect - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_stale_mesh_command_is_skipped() {
        let mut renderer = test_renderer();
        let material = renderer.create_textured_material();

        renderer.push_to_render_queue(MeshId::default(), material, Mat4::identity());
        renderer.render_all_queue_items();

        // The dead mesh is dropped per-command; the resolve quad still draws.
        assert_eq!(headless(&renderer).draw_call_count(), 1);
        assert!(renderer.queue().is_empty());
    }

    #[test]
    fn test_push_with_dead_material_drops_command() {
        let mut renderer = test_renderer();
        let mesh = renderer.create_mesh(&Mesh::cube());
        renderer.push_to_render_queue(mesh, MaterialId::default(), Mat4::identity());
        assert!(renderer.queue().is_empty());
    }

    #[test]
    fn test_custom_commands_draw_in_forward_pass() {
        let mut renderer = test_renderer();
        let mesh = renderer.create_mesh(&Mesh::cube());
        let shader = renderer
            .create_shader("glass", "shaders/glass.vert", "shaders/glass.frag")
            .unwrap();
        let material = renderer.create_custom_material(shader);
        renderer
            .material_mut(material)
            .unwrap()
            .set_shader_float("refraction", 1.5);
        renderer.add_spot_light(SpotLight::new(
            Vec3::new(0.0, 3.0, 0.0),
            Vec3::new(0.0, -1.0, 0.0),
        ));

        renderer.push_to_render_queue(mesh, material, Mat4::identity());
        renderer.render_all_queue_items();

        // forward (1) + resolve (1); the geometry pass skips the custom
        // command and no directional light means no shadow draws.
        assert_eq!(headless(&renderer).draw_call_count(), 2);
        assert_eq!(
            headless(&renderer).uniform("refraction"),
            Some(&UniformValue::Float(1.5))
        );
        assert_eq!(
            headless(&renderer).uniform("spotLight.innerLightCutoff"),
            Some(&UniformValue::Float(12.5f32.to_radians().cos()))
        );
    }

    #[test]
    fn test_light_volume_debug_draws_spheres() {
        let mut renderer =
            test_renderer_with(RendererConfig::default().with_light_volume_debug(true));
        renderer.add_point_light(PointLight::new(Vec3::zeros()));
        renderer.add_point_light(PointLight::new(Vec3::new(3.0, 0.0, 0.0)));

        renderer.render_all_queue_items();

        // point volumes (2) + debug wireframes (2) + resolve quad (1)
        assert_eq!(headless(&renderer).draw_call_count(), 5);
    }

    #[test]
    fn test_shadow_receiver_gets_shadow_uniform_block() {
        let mut renderer = test_renderer();
        let mesh = renderer.create_mesh(&Mesh::cube());
        let shader = renderer
            .create_shader("leaf", "shaders/leaf.vert", "shaders/leaf.frag")
            .unwrap();
        let custom = renderer.create_custom_material(shader);
        let textured = renderer.create_textured_material();

        renderer.push_to_render_queue(mesh, textured, Mat4::identity());
        renderer.push_to_render_queue(mesh, custom, Mat4::identity());
        renderer.add_directional_light(DirectionalLight::default());

        renderer.render_all_queue_items();

        // The forward-pass draw ran after the shadow pass, so the receiver
        // saw the 1-indexed shadow matrix and its depth texture on unit 10.
        let device = headless(&renderer);
        assert!(device.uniform("lightShadowViewProjection1").is_some());
        assert_eq!(
            device.uniform("shadowMap1"),
            Some(&UniformValue::Int(10))
        );
        let shadow_map = renderer.directional_lights()[0].shadow_map.unwrap();
        assert_eq!(device.bound_texture(10), Some(shadow_map));
    }

    #[test]
    fn test_second_frame_starts_from_empty_queue() {
        let mut renderer = test_renderer();
        let mesh = renderer.create_mesh(&Mesh::cube());
        let material = renderer.create_textured_material();

        renderer.push_to_render_queue(mesh, material, Mat4::identity());
        renderer.render_all_queue_items();
        let first_frame_draws = headless(&renderer).draw_call_count();

        renderer.render_all_queue_items();
        // Second frame re-ran only the fixed passes (resolve quad).
        assert_eq!(headless(&renderer).draw_call_count(), first_frame_draws + 1);
    }
}
