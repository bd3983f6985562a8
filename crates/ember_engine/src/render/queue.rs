//! # Render Queue System
//!
//! Collects per-frame draw submissions and separates them into the buckets
//! the frame algorithm consumes: deferred geometry, shadow casters, and
//! post-processing passes.
//!
//! Insertion order is preserved within each bucket and used as a stable
//! draw order. This is a non-guarantee: opaque deferred geometry is
//! order-independent, so a future version may sort by shader or material
//! to reduce state changes without breaking callers.

use crate::foundation::math::Mat4;
use crate::render::material::{MaterialId, MaterialKind};
use crate::render::renderer::MeshId;

/// A snapshot of one draw submission
///
/// The transform is copied by value at push time, so later mutation of the
/// submitting object cannot race the frame that consumes the command. Mesh
/// and material are non-owning handles into renderer-owned registries and
/// therefore outlive the frame by construction.
#[derive(Debug, Clone, Copy)]
pub struct RenderCommand {
    /// Geometry to draw
    pub mesh: MeshId,
    /// Material to draw it with
    pub material: MaterialId,
    /// World transform at submission time
    pub transform: Mat4,
}

/// Per-frame command collection in three buckets
///
/// Populated by pushes between frames, drained by `clear` exactly once per
/// frame after the draws complete. A command lands in the buckets its
/// classification dictates and nowhere else:
///
/// - `PostProcess` materials go to the post-processing bucket only
/// - everything else goes to the deferred-geometry bucket, and additionally
///   to the shadow bucket when the material casts shadows (the default for
///   all opaque non-post-process materials)
#[derive(Debug, Default)]
pub struct RenderQueue {
    deferred_commands: Vec<RenderCommand>,
    shadow_casting_commands: Vec<RenderCommand>,
    post_processing_commands: Vec<RenderCommand>,
}

impl RenderQueue {
    /// Create an empty render queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify and append a command
    ///
    /// O(1) amortized. `kind` and `casts_shadows` come from the command's
    /// material at push time; the queue itself never looks materials up.
    pub fn push(&mut self, command: RenderCommand, kind: MaterialKind, casts_shadows: bool) {
        match kind {
            MaterialKind::PostProcess => {
                self.post_processing_commands.push(command);
            }
            MaterialKind::Textured | MaterialKind::Custom => {
                if casts_shadows {
                    self.shadow_casting_commands.push(command);
                }
                self.deferred_commands.push(command);
            }
        }
    }

    /// All deferred-geometry commands pushed since the last clear
    pub fn deferred_commands(&self) -> &[RenderCommand] {
        &self.deferred_commands
    }

    /// All shadow-casting commands pushed since the last clear
    pub fn shadow_casting_commands(&self) -> &[RenderCommand] {
        &self.shadow_casting_commands
    }

    /// All post-processing commands pushed since the last clear
    pub fn post_processing_commands(&self) -> &[RenderCommand] {
        &self.post_processing_commands
    }

    /// Total number of queued commands across all buckets
    ///
    /// A shadow-casting command counts twice; this is a bucket-entry count,
    /// not a submission count.
    pub fn command_count(&self) -> usize {
        self.deferred_commands.len()
            + self.shadow_casting_commands.len()
            + self.post_processing_commands.len()
    }

    /// Whether no commands are queued
    pub fn is_empty(&self) -> bool {
        self.deferred_commands.is_empty()
            && self.shadow_casting_commands.is_empty()
            && self.post_processing_commands.is_empty()
    }

    /// Empty all three buckets for the next frame
    pub fn clear(&mut self) {
        self.deferred_commands.clear();
        self.shadow_casting_commands.clear();
        self.post_processing_commands.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> RenderCommand {
        RenderCommand {
            mesh: MeshId::default(),
            material: MaterialId::default(),
            transform: Mat4::identity(),
        }
    }

    #[test]
    fn test_new_queue_is_empty() {
        let queue = RenderQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.command_count(), 0);
    }

    #[test]
    fn test_textured_goes_to_deferred_and_shadow() {
        let mut queue = RenderQueue::new();
        queue.push(command(), MaterialKind::Textured, true);

        assert_eq!(queue.deferred_commands().len(), 1);
        assert_eq!(queue.shadow_casting_commands().len(), 1);
        assert_eq!(queue.post_processing_commands().len(), 0);
    }

    #[test]
    fn test_non_casting_textured_skips_shadow_bucket() {
        let mut queue = RenderQueue::new();
        queue.push(command(), MaterialKind::Textured, false);

        assert_eq!(queue.deferred_commands().len(), 1);
        assert_eq!(queue.shadow_casting_commands().len(), 0);
    }

    #[test]
    fn test_post_process_goes_to_post_bucket_only() {
        let mut queue = RenderQueue::new();
        queue.push(command(), MaterialKind::PostProcess, false);

        assert_eq!(queue.deferred_commands().len(), 0);
        assert_eq!(queue.shadow_casting_commands().len(), 0);
        assert_eq!(queue.post_processing_commands().len(), 1);
    }

    #[test]
    fn test_custom_classified_like_opaque() {
        let mut queue = RenderQueue::new();
        queue.push(command(), MaterialKind::Custom, true);

        assert_eq!(queue.deferred_commands().len(), 1);
        assert_eq!(queue.shadow_casting_commands().len(), 1);
        assert_eq!(queue.post_processing_commands().len(), 0);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut queue = RenderQueue::new();
        let transforms = [
            Mat4::new_translation(&crate::foundation::math::Vec3::new(1.0, 0.0, 0.0)),
            Mat4::new_translation(&crate::foundation::math::Vec3::new(2.0, 0.0, 0.0)),
            Mat4::new_translation(&crate::foundation::math::Vec3::new(3.0, 0.0, 0.0)),
        ];
        for transform in transforms {
            queue.push(
                RenderCommand {
                    transform,
                    ..command()
                },
                MaterialKind::Textured,
                true,
            );
        }

        for (index, queued) in queue.deferred_commands().iter().enumerate() {
            assert_eq!(queued.transform, transforms[index]);
        }
    }

    #[test]
    fn test_clear_empties_all_buckets() {
        let mut queue = RenderQueue::new();
        queue.push(command(), MaterialKind::Textured, true);
        queue.push(command(), MaterialKind::Custom, false);
        queue.push(command(), MaterialKind::PostProcess, false);
        assert!(!queue.is_empty());

        queue.clear();

        assert!(queue.is_empty());
        assert_eq!(queue.deferred_commands().len(), 0);
        assert_eq!(queue.shadow_casting_commands().len(), 0);
        assert_eq!(queue.post_processing_commands().len(), 0);
    }
}
