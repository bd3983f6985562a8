//! Render targets
//!
//! A render target owns a set of color attachment textures, an optional
//! depth attachment, and the framebuffer that ties them together. Targets
//! are created once and mutated only through [`RenderTarget::resize`],
//! which reallocates the backing storage while preserving the attachment
//! count, formats, and handles.

use crate::render::api::{
    FramebufferHandle, GraphicsDevice, TextureDescriptor, TextureFormat, TextureHandle,
};

/// Attachment layout for a render target
#[derive(Debug, Clone)]
pub struct RenderTargetDescriptor {
    /// Format of each color attachment, in attachment order
    pub color_formats: Vec<TextureFormat>,
    /// Format of the depth attachment, if any
    pub depth_format: Option<TextureFormat>,
}

impl RenderTargetDescriptor {
    /// A single-color-attachment target with a depth buffer
    pub fn color_depth(color: TextureFormat) -> Self {
        Self {
            color_formats: vec![color],
            depth_format: Some(TextureFormat::Depth24Stencil8),
        }
    }

    /// A color-only target (post-process resolve destinations)
    pub fn color_only(color: TextureFormat) -> Self {
        Self {
            color_formats: vec![color],
            depth_format: None,
        }
    }

    /// A depth-only target (shadow maps)
    pub fn depth_only(depth: TextureFormat) -> Self {
        Self {
            color_formats: Vec::new(),
            depth_format: Some(depth),
        }
    }
}

/// A framebuffer with its owned attachments
#[derive(Debug)]
pub struct RenderTarget {
    width: u32,
    height: u32,
    descriptor: RenderTargetDescriptor,
    color_attachments: Vec<TextureHandle>,
    depth_attachment: Option<TextureHandle>,
    framebuffer: FramebufferHandle,
}

impl RenderTarget {
    /// Allocate attachments and a framebuffer on the device
    ///
    /// Degenerate dimensions are clamped to 1x1 so a target always has
    /// valid storage; callers that can defer instead (window resizes) guard
    /// before reaching this point.
    pub fn new(
        device: &mut dyn GraphicsDevice,
        width: u32,
        height: u32,
        descriptor: RenderTargetDescriptor,
    ) -> Self {
        let width = width.max(1);
        let height = height.max(1);

        let color_attachments: Vec<TextureHandle> = descriptor
            .color_formats
            .iter()
            .map(|&format| {
                device.create_texture(&TextureDescriptor {
                    width,
                    height,
                    format,
                })
            })
            .collect();

        let depth_attachment = descriptor.depth_format.map(|format| {
            device.create_texture(&TextureDescriptor {
                width,
                height,
                format,
            })
        });

        let framebuffer = device.create_framebuffer(&color_attachments, depth_attachment);
        log::debug!(
            "created render target {width}x{height} ({} color, depth: {})",
            color_attachments.len(),
            depth_attachment.is_some()
        );

        Self {
            width,
            height,
            descriptor,
            color_attachments,
            depth_attachment,
            framebuffer,
        }
    }

    /// Reallocate attachment storage at a new size
    ///
    /// Attachment count, formats, and handles are preserved. Requests with
    /// a zero dimension are rejected as a no-op - forwarding them to the
    /// graphics API would fault - and requests matching the current size
    /// return without touching the device.
    pub fn resize(&mut self, device: &mut dyn GraphicsDevice, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::warn!("ignoring degenerate render target resize to {width}x{height}");
            return;
        }
        if width == self.width && height == self.height {
            return;
        }

        for &texture in &self.color_attachments {
            device.resize_texture(texture, width, height);
        }
        if let Some(texture) = self.depth_attachment {
            device.resize_texture(texture, width, height);
        }

        self.width = width;
        self.height = height;
        log::debug!("resized render target to {width}x{height}");
    }

    /// Release the attachments and framebuffer
    pub fn destroy(&mut self, device: &mut dyn GraphicsDevice) {
        for &texture in &self.color_attachments {
            device.delete_texture(texture);
        }
        if let Some(texture) = self.depth_attachment {
            device.delete_texture(texture);
        }
        device.delete_framebuffer(self.framebuffer);
        self.color_attachments.clear();
        self.depth_attachment = None;
    }

    /// Current width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Current height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The framebuffer handle
    pub fn framebuffer(&self) -> FramebufferHandle {
        self.framebuffer
    }

    /// A color attachment texture by index
    pub fn color_attachment(&self, index: usize) -> Option<TextureHandle> {
        self.color_attachments.get(index).copied()
    }

    /// Number of color attachments
    pub fn color_attachment_count(&self) -> usize {
        self.color_attachments.len()
    }

    /// The depth attachment texture, if the target has one
    pub fn depth_attachment(&self) -> Option<TextureHandle> {
        self.depth_attachment
    }

    /// The attachment layout this target was created with
    pub fn descriptor(&self) -> &RenderTargetDescriptor {
        &self.descriptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::headless::HeadlessDevice;

    fn gbuffer_descriptor() -> RenderTargetDescriptor {
        RenderTargetDescriptor {
            color_formats: vec![
                TextureFormat::Rgba16F,
                TextureFormat::Rgba16F,
                TextureFormat::Rgba8,
                TextureFormat::Rgba8,
            ],
            depth_format: Some(TextureFormat::Depth24Stencil8),
        }
    }

    #[test]
    fn test_attachment_allocation() {
        let mut device = HeadlessDevice::new();
        let target = RenderTarget::new(&mut device, 320, 240, gbuffer_descriptor());

        assert_eq!(target.color_attachment_count(), 4);
        assert!(target.depth_attachment().is_some());
        for index in 0..4 {
            let texture = target.color_attachment(index).unwrap();
            assert_eq!(device.texture_size(texture), Some((320, 240)));
        }
        assert_eq!(
            device.texture_format(target.color_attachment(0).unwrap()),
            Some(TextureFormat::Rgba16F)
        );
    }

    #[test]
    fn test_resize_preserves_layout_and_handles() {
        let mut device = HeadlessDevice::new();
        let mut target = RenderTarget::new(&mut device, 320, 240, gbuffer_descriptor());
        let original_handles: Vec<_> = (0..4).map(|i| target.color_attachment(i)).collect();

        target.resize(&mut device, 640, 480);

        assert_eq!(target.width(), 640);
        assert_eq!(target.height(), 480);
        assert_eq!(target.color_attachment_count(), 4);
        for (index, handle) in original_handles.iter().enumerate() {
            assert_eq!(target.color_attachment(index), *handle);
        }
        let depth = target.depth_attachment().unwrap();
        assert_eq!(device.texture_size(depth), Some((640, 480)));
    }

    #[test]
    fn test_resize_is_idempotent() {
        let mut device = HeadlessDevice::new();
        let mut target = RenderTarget::new(&mut device, 320, 240, gbuffer_descriptor());

        target.resize(&mut device, 640, 480);
        target.resize(&mut device, 640, 480);

        assert_eq!(target.width(), 640);
        assert_eq!(target.height(), 480);
        let texture = target.color_attachment(0).unwrap();
        assert_eq!(device.texture_size(texture), Some((640, 480)));
    }

    #[test]
    fn test_degenerate_resize_is_rejected() {
        let mut device = HeadlessDevice::new();
        let mut target = RenderTarget::new(&mut device, 320, 240, gbuffer_descriptor());

        target.resize(&mut device, 0, 480);
        target.resize(&mut device, 640, 0);

        assert_eq!(target.width(), 320);
        assert_eq!(target.height(), 240);
        let texture = target.color_attachment(0).unwrap();
        assert_eq!(device.texture_size(texture), Some((320, 240)));
    }

    #[test]
    fn test_depth_only_target() {
        let mut device = HeadlessDevice::new();
        let target = RenderTarget::new(
            &mut device,
            2048,
            2048,
            RenderTargetDescriptor::depth_only(TextureFormat::Depth32F),
        );
        assert_eq!(target.color_attachment_count(), 0);
        let depth = target.depth_attachment().unwrap();
        assert_eq!(device.texture_format(depth), Some(TextureFormat::Depth32F));
    }
}
