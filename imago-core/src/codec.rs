//! `ImageCodec` backed by the `image` crate, with EXIF extraction via
//! `kamadak-exif` (§4.1). Never reads full files when only dimensions are
//! needed: `probe` uses `image::io::Reader::with_guessed_format` against a
//! bounded header read plus the crate's own dimension-only decode path.

use std::io::Cursor;
use std::path::Path;

use async_trait::async_trait;
use image::{imageops::FilterType, GenericImageView, ImageFormat as CrateFormat};
use imago_contracts::image_codec::{ImageCodec, ImageFormat, ProbeResult};
use imago_model::collection::ImageMetadata;
use tracing::{debug, warn};

use crate::error::{CoreError, Result};

#[derive(Debug, Default, Clone, Copy)]
pub struct StdImageCodec;

impl StdImageCodec {
    pub fn new() -> Self {
        StdImageCodec
    }

    fn crate_format(format: ImageFormat) -> CrateFormat {
        match format {
            ImageFormat::Jpeg => CrateFormat::Jpeg,
            ImageFormat::Png => CrateFormat::Png,
            ImageFormat::Gif => CrateFormat::Gif,
            ImageFormat::Bmp => CrateFormat::Bmp,
            ImageFormat::WebP => CrateFormat::WebP,
            ImageFormat::Tiff => CrateFormat::Tiff,
        }
    }

    fn encode(img: &image::DynamicImage, format: ImageFormat, quality: u8) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        match format {
            ImageFormat::Jpeg => {
                let encoder =
                    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality);
                img.write_with_encoder(encoder).map_err(|e| {
                    CoreError::Internal(format!("jpeg encode failed: {e}"))
                })?;
            }
            other => {
                let mut cursor = Cursor::new(&mut out);
                img.write_to(&mut cursor, Self::crate_format(other))
                    .map_err(|e| CoreError::Internal(format!("encode failed: {e}")))?;
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl ImageCodec for StdImageCodec {
    async fn probe(&self, path: &Path) -> Result<ProbeResult> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| CoreError::UnsupportedFormat(path.display().to_string()))?;
        let format = ImageFormat::from_extension(ext)
            .ok_or_else(|| CoreError::UnsupportedFormat(ext.to_string()))?;

        let reader = image::io::Reader::open(path)
            .map_err(CoreError::Io)?
            .with_guessed_format()
            .map_err(CoreError::Io)?;
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| CoreError::CorruptAsset {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        Ok(ProbeResult { width, height, format })
    }

    async fn probe_bytes(&self, bytes: &[u8]) -> Result<ProbeResult> {
        let reader = image::io::Reader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(CoreError::Io)?;
        let crate_format = reader
            .format()
            .ok_or_else(|| CoreError::UnsupportedFormat("unrecognized magic bytes".into()))?;
        let format = match crate_format {
            CrateFormat::Jpeg => ImageFormat::Jpeg,
            CrateFormat::Png => ImageFormat::Png,
            CrateFormat::Gif => ImageFormat::Gif,
            CrateFormat::Bmp => ImageFormat::Bmp,
            CrateFormat::WebP => ImageFormat::WebP,
            CrateFormat::Tiff => ImageFormat::Tiff,
            other => {
                return Err(CoreError::UnsupportedFormat(format!("{other:?}")));
            }
        };
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| CoreError::CorruptAsset {
                path: "<bytes>".into(),
                message: e.to_string(),
            })?;
        Ok(ProbeResult { width, height, format })
    }

    async fn thumbnail(
        &self,
        src: &[u8],
        target_width: u32,
        target_height: u32,
        format: ImageFormat,
        quality: u8,
    ) -> Result<Vec<u8>> {
        let img = image::load_from_memory(src).map_err(|e| CoreError::CorruptAsset {
            path: "<bytes>".into(),
            message: e.to_string(),
        })?;
        let (w, h) = img.dimensions();
        let scale = f64::min(
            target_width as f64 / w as f64,
            target_height as f64 / h as f64,
        );
        let new_w = ((w as f64 * scale).round() as u32).max(1);
        let new_h = ((h as f64 * scale).round() as u32).max(1);
        debug!(new_w, new_h, "generating thumbnail");
        let resized = img.resize(new_w, new_h, FilterType::Lanczos3);
        Self::encode(&resized, format, quality)
    }

    async fn resize(
        &self,
        src: &[u8],
        target_width: u32,
        target_height: u32,
        format: ImageFormat,
        quality: u8,
    ) -> Result<Vec<u8>> {
        let img = image::load_from_memory(src).map_err(|e| CoreError::CorruptAsset {
            path: "<bytes>".into(),
            message: e.to_string(),
        })?;
        let resized = img.resize_exact(target_width, target_height, FilterType::Lanczos3);
        Self::encode(&resized, format, quality)
    }

    async fn extract_metadata(&self, src: &[u8]) -> Result<ImageMetadata> {
        let mut metadata = ImageMetadata::default();

        let mut cursor = Cursor::new(src);
        let exif_reader = exif::Reader::new();
        match exif_reader.read_from_container(&mut cursor) {
            Ok(exif) => {
                for field in exif.fields() {
                    match field.tag {
                        exif::Tag::Make => {
                            metadata.camera =
                                Some(field.display_value().with_unit(&exif).to_string());
                        }
                        exif::Tag::Software => {
                            metadata.software =
                                Some(field.display_value().to_string());
                        }
                        exif::Tag::Compression => {
                            metadata.compression = Some(field.display_value().to_string());
                        }
                        exif::Tag::DateTimeOriginal | exif::Tag::DateTime => {
                            metadata.additional.insert(
                                format!("{}", field.tag),
                                field.display_value().to_string(),
                            );
                        }
                        _ => {}
                    }
                }
            }
            Err(e) => {
                // Missing/corrupt EXIF is never fatal (§4.1): leave fields None.
                warn!("no exif metadata: {e}");
            }
        }

        Ok(metadata)
    }
}
