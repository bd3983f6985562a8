//! Pipeline state cache
//!
//! Mirrors the global pipeline state so repeated requests for the state the
//! device is already in never reach the driver. Interleaved draws toggle
//! depth/blend/cull constantly; without the mirror every material change
//! would re-apply the full set.
//!
//! All renderer state changes funnel through here - nothing else in the
//! engine calls the device's state setters, which also keeps the classic
//! "blending left enabled by an earlier pass" bug class out: the cache is
//! the single place the current state is known and changed.

use crate::render::api::{BlendFactor, DepthFunction, Face, GraphicsDevice, PolygonMode};

/// Cached mirror of global pipeline state
///
/// Every `toggle_*` / `set_*` call is a no-op when the requested value
/// equals the cached value; otherwise it forwards exactly one call to the
/// device and updates the cache. Initial values match default device state
/// (depth and blending off, culling off, `Less`, `Back`, `Fill`,
/// `One`/`Zero`), so the first frame applies only what differs from a
/// fresh context.
#[derive(Debug)]
pub struct PipelineStateCache {
    depth_test: bool,
    depth_function: DepthFunction,
    face_culling: bool,
    culled_face: Face,
    polygon_mode: PolygonMode,
    blending: bool,
    blend_source: BlendFactor,
    blend_destination: BlendFactor,
}

impl Default for PipelineStateCache {
    fn default() -> Self {
        Self {
            depth_test: false,
            depth_function: DepthFunction::Less,
            face_culling: false,
            culled_face: Face::Back,
            polygon_mode: PolygonMode::Fill,
            blending: false,
            blend_source: BlendFactor::One,
            blend_destination: BlendFactor::Zero,
        }
    }
}

impl PipelineStateCache {
    /// Create a cache mirroring default device state
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable depth testing
    pub fn toggle_depth_testing(&mut self, device: &mut dyn GraphicsDevice, enabled: bool) {
        if self.depth_test != enabled {
            device.set_depth_test(enabled);
            self.depth_test = enabled;
        }
    }

    /// Set the depth comparison function
    pub fn set_depth_function(&mut self, device: &mut dyn GraphicsDevice, function: DepthFunction) {
        if self.depth_function != function {
            device.set_depth_function(function);
            self.depth_function = function;
        }
    }

    /// Enable or disable face culling
    pub fn toggle_face_culling(&mut self, device: &mut dyn GraphicsDevice, enabled: bool) {
        if self.face_culling != enabled {
            device.set_face_culling(enabled);
            self.face_culling = enabled;
        }
    }

    /// Select which face gets culled
    pub fn set_culled_face(&mut self, device: &mut dyn GraphicsDevice, face: Face) {
        if self.culled_face != face {
            device.set_culled_face(face);
            self.culled_face = face;
        }
    }

    /// Set the polygon rasterization mode
    pub fn set_polygon_mode(&mut self, device: &mut dyn GraphicsDevice, mode: PolygonMode) {
        if self.polygon_mode != mode {
            device.set_polygon_mode(mode);
            self.polygon_mode = mode;
        }
    }

    /// Enable or disable blending
    pub fn toggle_blending(&mut self, device: &mut dyn GraphicsDevice, enabled: bool) {
        if self.blending != enabled {
            device.set_blending(enabled);
            self.blending = enabled;
        }
    }

    /// Set the blend function factor pair
    ///
    /// The pair is cached as a unit: changing either factor re-applies both.
    pub fn set_blend_function(
        &mut self,
        device: &mut dyn GraphicsDevice,
        source: BlendFactor,
        destination: BlendFactor,
    ) {
        if self.blend_source != source || self.blend_destination != destination {
            device.set_blend_function(source, destination);
            self.blend_source = source;
            self.blend_destination = destination;
        }
    }

    /// Currently cached polygon mode
    pub fn polygon_mode(&self) -> PolygonMode {
        self.polygon_mode
    }

    /// Currently cached depth-test state
    pub fn depth_test(&self) -> bool {
        self.depth_test
    }

    /// Currently cached face-culling state
    pub fn face_culling(&self) -> bool {
        self.face_culling
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::headless::HeadlessDevice;

    #[test]
    fn test_repeated_toggles_apply_once() {
        let mut device = HeadlessDevice::new();
        let mut cache = PipelineStateCache::new();

        cache.toggle_depth_testing(&mut device, true);
        cache.toggle_depth_testing(&mut device, true);
        cache.toggle_depth_testing(&mut device, true);
        assert_eq!(device.state_change_count(), 1);

        cache.toggle_depth_testing(&mut device, false);
        assert_eq!(device.state_change_count(), 2);
    }

    #[test]
    fn test_initial_state_is_not_reapplied() {
        let mut device = HeadlessDevice::new();
        let mut cache = PipelineStateCache::new();

        // All of these match the defaults of a fresh context.
        cache.toggle_depth_testing(&mut device, false);
        cache.toggle_blending(&mut device, false);
        cache.toggle_face_culling(&mut device, false);
        cache.set_depth_function(&mut device, DepthFunction::Less);
        cache.set_culled_face(&mut device, Face::Back);
        cache.set_polygon_mode(&mut device, PolygonMode::Fill);
        cache.set_blend_function(&mut device, BlendFactor::One, BlendFactor::Zero);

        assert_eq!(device.state_change_count(), 0);
    }

    #[test]
    fn test_each_distinct_transition_applies() {
        let mut device = HeadlessDevice::new();
        let mut cache = PipelineStateCache::new();

        cache.set_polygon_mode(&mut device, PolygonMode::Line);
        cache.set_polygon_mode(&mut device, PolygonMode::Fill);
        cache.set_polygon_mode(&mut device, PolygonMode::Line);
        assert_eq!(device.state_change_count(), 3);
    }

    #[test]
    fn test_blend_function_cached_as_pair() {
        let mut device = HeadlessDevice::new();
        let mut cache = PipelineStateCache::new();

        cache.set_blend_function(&mut device, BlendFactor::One, BlendFactor::One);
        cache.set_blend_function(&mut device, BlendFactor::One, BlendFactor::One);
        assert_eq!(device.state_change_count(), 1);

        cache.set_blend_function(&mut device, BlendFactor::SrcAlpha, BlendFactor::One);
        assert_eq!(device.state_change_count(), 2);
    }

    #[test]
    fn test_interleaved_states_tracked_independently() {
        let mut device = HeadlessDevice::new();
        let mut cache = PipelineStateCache::new();

        cache.toggle_depth_testing(&mut device, true);
        cache.toggle_blending(&mut device, true);
        cache.toggle_depth_testing(&mut device, true); // no-op
        cache.toggle_blending(&mut device, true); // no-op
        cache.set_culled_face(&mut device, Face::Front);
        cache.set_culled_face(&mut device, Face::Front); // no-op

        assert_eq!(device.state_change_count(), 3);
    }
}
