//! Light sources
//!
//! Light definitions are pure data with no backend references; the
//! renderer interprets them during the shadow and lighting passes. Field
//! names mirror the shader uniform contract (`ambientIntensity`,
//! `attenuationConstant`, ...) one-to-one.

use crate::foundation::math::{Mat4, Vec3};
use crate::render::api::TextureHandle;

/// A directional light (sunlight)
///
/// When `cast_shadows` is set, the renderer assigns `shadow_map` and
/// `light_space_matrix` during the shadow pass each frame. The shadow map
/// texture belongs to a renderer-owned shadow target; the light only holds
/// a handle to it for the lighting pass to sample.
#[derive(Debug, Clone)]
pub struct DirectionalLight {
    /// Direction the light travels (from the light source)
    pub direction: Vec3,
    /// Ambient contribution per channel
    pub ambient_intensity: Vec3,
    /// Diffuse contribution per channel
    pub diffuse_intensity: Vec3,
    /// Specular contribution per channel
    pub specular_intensity: Vec3,
    /// Whether this light renders a shadow map
    pub cast_shadows: bool,
    /// Depth texture of this light's shadow target, assigned per frame
    pub shadow_map: Option<TextureHandle>,
    /// Light-space view-projection matrix, recomputed per frame when
    /// shadow casting
    pub light_space_matrix: Mat4,
}

impl DirectionalLight {
    /// Create a directional light with standard intensities
    pub fn new(direction: Vec3) -> Self {
        Self {
            direction,
            ambient_intensity: Vec3::new(0.2, 0.2, 0.2),
            diffuse_intensity: Vec3::new(0.5, 0.5, 0.5),
            specular_intensity: Vec3::new(1.0, 1.0, 1.0),
            cast_shadows: true,
            shadow_map: None,
            light_space_matrix: Mat4::identity(),
        }
    }

    /// Set the diffuse intensity
    pub fn with_diffuse_intensity(mut self, intensity: Vec3) -> Self {
        self.diffuse_intensity = intensity;
        self
    }

    /// Enable or disable shadow casting
    pub fn with_shadows(mut self, cast_shadows: bool) -> Self {
        self.cast_shadows = cast_shadows;
        self
    }
}

impl Default for DirectionalLight {
    /// An overhead light angled slightly forward
    fn default() -> Self {
        Self::new(Vec3::new(-0.2, -1.0, -0.3))
    }
}

/// A point light (light bulb) shaded through a bounding light volume
#[derive(Debug, Clone)]
pub struct PointLight {
    /// World-space position
    pub position: Vec3,
    /// Ambient contribution per channel
    pub ambient_intensity: Vec3,
    /// Diffuse contribution per channel
    pub diffuse_intensity: Vec3,
    /// Specular contribution per channel
    pub specular_intensity: Vec3,
    /// Constant attenuation term
    pub attenuation_constant: f32,
    /// Linear attenuation term
    pub attenuation_linear: f32,
    /// Quadratic attenuation term
    pub attenuation_quadratic: f32,
}

impl PointLight {
    /// Create a point light with standard intensities and attenuation
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            ambient_intensity: Vec3::new(0.2, 0.2, 0.2),
            diffuse_intensity: Vec3::new(0.5, 0.5, 0.5),
            specular_intensity: Vec3::new(1.0, 1.0, 1.0),
            attenuation_constant: 1.0,
            attenuation_linear: 0.09,
            attenuation_quadratic: 0.032,
        }
    }

    /// Set the diffuse intensity
    pub fn with_diffuse_intensity(mut self, intensity: Vec3) -> Self {
        self.diffuse_intensity = intensity;
        self
    }

    /// Set the attenuation terms
    pub fn with_attenuation(mut self, constant: f32, linear: f32, quadratic: f32) -> Self {
        self.attenuation_constant = constant;
        self.attenuation_linear = linear;
        self.attenuation_quadratic = quadratic;
        self
    }

    /// Radius of the bounding volume outside which this light contributes
    /// less than 5/256 of its peak brightness
    ///
    /// Solves `constant + linear*d + quadratic*d^2 = brightness * 256/5`
    /// for the distance `d`; the lighting pass scales the volume sphere by
    /// this radius so shading only runs on plausibly lit pixels.
    pub fn volume_radius(&self) -> f32 {
        let brightness = self
            .diffuse_intensity
            .x
            .max(self.diffuse_intensity.y)
            .max(self.diffuse_intensity.z);
        let threshold = 256.0 / 5.0 * brightness;
        let discriminant = self.attenuation_linear * self.attenuation_linear
            - 4.0 * self.attenuation_quadratic * (self.attenuation_constant - threshold);
        (-self.attenuation_linear + discriminant.max(0.0).sqrt())
            / (2.0 * self.attenuation_quadratic)
    }
}

/// A spot light (flashlight), shaded in the forward pass
///
/// Cutoff angles are stored in degrees and converted to cosine terms at
/// upload time, matching what the fragment shaders compare against.
#[derive(Debug, Clone)]
pub struct SpotLight {
    /// World-space position
    pub position: Vec3,
    /// Direction the cone points
    pub direction: Vec3,
    /// Inner cone angle in degrees (full intensity inside)
    pub inner_cutoff_degrees: f32,
    /// Outer cone angle in degrees (falloff band between inner and outer)
    pub outer_cutoff_degrees: f32,
    /// Ambient contribution per channel
    pub ambient_intensity: Vec3,
    /// Diffuse contribution per channel
    pub diffuse_intensity: Vec3,
    /// Specular contribution per channel
    pub specular_intensity: Vec3,
    /// Constant attenuation term
    pub attenuation_constant: f32,
    /// Linear attenuation term
    pub attenuation_linear: f32,
    /// Quadratic attenuation term
    pub attenuation_quadratic: f32,
}

impl SpotLight {
    /// Create a spot light with standard cone angles and attenuation
    pub fn new(position: Vec3, direction: Vec3) -> Self {
        Self {
            position,
            direction,
            inner_cutoff_degrees: 12.5,
            outer_cutoff_degrees: 17.5,
            ambient_intensity: Vec3::new(0.2, 0.2, 0.2),
            diffuse_intensity: Vec3::new(0.5, 0.5, 0.5),
            specular_intensity: Vec3::new(1.0, 1.0, 1.0),
            attenuation_constant: 1.0,
            attenuation_linear: 0.09,
            attenuation_quadratic: 0.032,
        }
    }

    /// Cosine of the inner cutoff, as the shader expects it
    pub fn inner_cutoff_cosine(&self) -> f32 {
        self.inner_cutoff_degrees.to_radians().cos()
    }

    /// Cosine of the outer cutoff, as the shader expects it
    pub fn outer_cutoff_cosine(&self) -> f32 {
        self.outer_cutoff_degrees.to_radians().cos()
    }
}
