//! GPU texture resource.

use std::sync::Arc;

use crate::backend::TextureHandle;
use crate::context::RenderContext;
use crate::device::{GraphicsDevice, ResourceId};
use crate::error::GraphicsError;

/// Texture dimensionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureKind {
    /// Single 2D image.
    #[default]
    Texture2D,
    /// Six square faces.
    CubeMap,
}

impl TextureKind {
    /// Number of image layers.
    pub fn layer_count(&self) -> u32 {
        match self {
            Self::Texture2D => 1,
            Self::CubeMap => 6,
        }
    }
}

/// Texel format. Both variants are 4 bytes per texel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFormat {
    /// 8-bit RGBA channels, unsigned normalized.
    #[default]
    Rgba8Unorm,
    /// 8-bit RGBA channels, sRGB.
    Rgba8UnormSrgb,
}

/// Descriptor for creating a texture.
///
/// # Example
///
/// ```ignore
/// let desc = TextureDescriptor::new_2d(256, 256).with_label("albedo");
/// let texture = Texture::new(&context, desc, &pixels)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDescriptor {
    pub kind: TextureKind,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub label: Option<String>,
}

impl TextureDescriptor {
    /// Describe a 2D texture.
    pub fn new_2d(width: u32, height: u32) -> Self {
        Self {
            kind: TextureKind::Texture2D,
            width,
            height,
            format: TextureFormat::default(),
            label: None,
        }
    }

    /// Describe a cube map with square faces of `size` texels.
    pub fn new_cube(size: u32) -> Self {
        Self {
            kind: TextureKind::CubeMap,
            width: size,
            height: size,
            format: TextureFormat::default(),
            label: None,
        }
    }

    /// Set the texel format.
    pub fn with_format(mut self, format: TextureFormat) -> Self {
        self.format = format;
        self
    }

    /// Set a debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Bytes of texel data the texture expects.
    pub fn byte_size(&self) -> usize {
        self.width as usize * self.height as usize * 4 * self.kind.layer_count() as usize
    }
}

/// A GPU texture resource.
///
/// Textures are reference-counted and hold a strong reference to their device.
pub struct Texture {
    device: Arc<GraphicsDevice>,
    id: ResourceId,
    handle: TextureHandle,
    descriptor: TextureDescriptor,
}

impl Texture {
    /// Upload `data` (tightly packed RGBA8) into a new texture.
    pub fn new(
        context: &RenderContext,
        descriptor: TextureDescriptor,
        data: &[u8],
    ) -> Result<Arc<Self>, GraphicsError> {
        if descriptor.width == 0 || descriptor.height == 0 {
            return Err(GraphicsError::InvalidParameter(
                "texture dimensions cannot be zero".to_string(),
            ));
        }
        if descriptor.kind == TextureKind::CubeMap && descriptor.width != descriptor.height {
            return Err(GraphicsError::InvalidParameter(format!(
                "cube map faces must be square, got {}x{}",
                descriptor.width, descriptor.height
            )));
        }
        if data.len() != descriptor.byte_size() {
            return Err(GraphicsError::InvalidParameter(format!(
                "texture data is {} bytes, expected {}",
                data.len(),
                descriptor.byte_size()
            )));
        }

        let device = Arc::clone(context.device());
        let handle = device.backend().create_texture(&descriptor, data)?;
        let bytes = descriptor.byte_size() as u64;
        device.update_stats(|stats| {
            stats.textures += 1;
            stats.texture_bytes += bytes;
        });

        log::trace!(
            "Texture: created {:?} {:?} {}x{}",
            descriptor.label,
            descriptor.kind,
            descriptor.width,
            descriptor.height
        );

        Ok(Arc::new(Self {
            id: device.allocate_id(),
            device,
            handle,
            descriptor,
        }))
    }

    /// 1x1 texture (or cube map) filled with one RGBA8 color.
    pub fn solid(
        context: &RenderContext,
        kind: TextureKind,
        rgba: [u8; 4],
        label: &str,
    ) -> Result<Arc<Self>, GraphicsError> {
        let descriptor = match kind {
            TextureKind::Texture2D => TextureDescriptor::new_2d(1, 1),
            TextureKind::CubeMap => TextureDescriptor::new_cube(1),
        }
        .with_label(label);
        let data = rgba.repeat(kind.layer_count() as usize);
        Self::new(context, descriptor, &data)
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn kind(&self) -> TextureKind {
        self.descriptor.kind
    }

    pub fn width(&self) -> u32 {
        self.descriptor.width
    }

    pub fn height(&self) -> u32 {
        self.descriptor.height
    }

    pub fn descriptor(&self) -> &TextureDescriptor {
        &self.descriptor
    }

    /// Get the texture label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }

    pub(crate) fn handle(&self) -> TextureHandle {
        self.handle
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.device.backend().destroy_texture(self.handle);
        let bytes = self.descriptor.byte_size() as u64;
        self.device.update_stats(|stats| {
            stats.textures = stats.textures.saturating_sub(1);
            stats.texture_bytes = stats.texture_bytes.saturating_sub(bytes);
        });
    }
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.id)
            .field("kind", &self.descriptor.kind)
            .field("width", &self.descriptor.width)
            .field("height", &self.descriptor.height)
            .field("label", &self.descriptor.label)
            .finish()
    }
}

// Ensure Texture is Send + Sync
static_assertions::assert_impl_all!(Texture: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;

    fn create_test_context() -> RenderContext {
        RenderContext::new(Arc::new(DummyBackend::new()))
    }

    #[test]
    fn test_texture_dimensions() {
        let context = create_test_context();
        let texture =
            Texture::new(&context, TextureDescriptor::new_2d(4, 2), &[0u8; 32]).unwrap();
        assert_eq!(texture.width(), 4);
        assert_eq!(texture.height(), 2);
        assert_eq!(texture.kind(), TextureKind::Texture2D);
    }

    #[test]
    fn test_texture_data_size_checked() {
        let context = create_test_context();
        let result = Texture::new(&context, TextureDescriptor::new_2d(4, 4), &[0u8; 10]);
        assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
    }

    #[test]
    fn test_cube_map_byte_size() {
        assert_eq!(TextureDescriptor::new_cube(2).byte_size(), 2 * 2 * 4 * 6);
    }

    #[test]
    fn test_texture_stats() {
        let context = create_test_context();
        let texture = Texture::solid(&context, TextureKind::CubeMap, [255; 4], "cube").unwrap();
        assert_eq!(context.stats().textures, 1);
        assert_eq!(context.stats().texture_bytes, 24);

        drop(texture);
        assert_eq!(context.stats().textures, 0);
        assert_eq!(context.stats().texture_bytes, 0);
    }

    #[test]
    fn test_texture_debug() {
        let context = create_test_context();
        let texture =
            Texture::solid(&context, TextureKind::Texture2D, [1, 2, 3, 4], "dot").unwrap();
        let debug = format!("{:?}", texture);
        assert!(debug.contains("Texture"));
        assert!(debug.contains("dot"));
    }
}
