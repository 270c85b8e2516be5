use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

/// Formats every `ImageCodec` implementation must accept (§4.1).
pub const SUPPORTED_EXTENSIONS: &[&str] =
    &["jpg", "jpeg", "png", "gif", "bmp", "webp", "tiff"];

pub const DEFAULT_CACHE_QUALITY: u8 = 85;
pub const DEFAULT_THUMBNAIL_QUALITY: u8 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResult {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Bmp,
    WebP,
    Tiff,
}

impl ImageFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            "gif" => Some(ImageFormat::Gif),
            "bmp" => Some(ImageFormat::Bmp),
            "webp" => Some(ImageFormat::WebP),
            "tiff" | "tif" => Some(ImageFormat::Tiff),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
            ImageFormat::WebP => "webp",
            ImageFormat::Tiff => "tiff",
        }
    }
}

/// Decode, resize, and probe capability. Implementations must not read a
/// full file when only dimensions are required (§4.1).
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait ImageCodec: Send + Sync {
    /// Probe dimensions/format from a path without materializing pixels.
    async fn probe(&self, path: &Path) -> Result<ProbeResult>;

    /// Probe dimensions/format from an in-memory buffer (e.g. an archive
    /// entry already read into a scratch buffer).
    async fn probe_bytes(&self, bytes: &[u8]) -> Result<ProbeResult>;

    /// Produce a thumbnail preserving aspect ratio (min of the two scale
    /// factors), using a high-quality resampling filter.
    async fn thumbnail(
        &self,
        src: &[u8],
        target_width: u32,
        target_height: u32,
        format: ImageFormat,
        quality: u8,
    ) -> Result<Vec<u8>>;

    /// Produce an arbitrary-size resize; same contract as `thumbnail`.
    async fn resize(
        &self,
        src: &[u8],
        target_width: u32,
        target_height: u32,
        format: ImageFormat,
        quality: u8,
    ) -> Result<Vec<u8>>;

    /// Best-effort metadata extraction. Never fails the caller: missing
    /// fields are left `None`.
    async fn extract_metadata(
        &self,
        src: &[u8],
    ) -> Result<imago_model::collection::ImageMetadata>;

    fn supported_extensions(&self) -> &'static [&'static str] {
        SUPPORTED_EXTENSIONS
    }
}
