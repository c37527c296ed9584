//! Raster encoding and decoding through the `image` crate.

use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat};
use pixmill_engine::surface::{EncodeFormat, SurfaceError};
use pixmill_engine::types::RgbaImage;

use crate::data_uri::DataUriError;

/// Errors from codec, data-URI, and file operations.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceIoError {
    /// The data URI is malformed.
    #[error(transparent)]
    DataUri(#[from] DataUriError),

    /// The image bytes could not be decoded.
    #[error("image decode failed: {0}")]
    Decode(#[source] image::ImageError),

    /// The image could not be encoded.
    #[error("image encode failed: {0}")]
    Encode(#[source] image::ImageError),

    /// Reading or writing a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The path's extension names no supported format.
    #[error("unsupported image format for {0}")]
    UnsupportedFormat(String),
}

impl From<SurfaceIoError> for SurfaceError {
    fn from(err: SurfaceIoError) -> Self {
        match err {
            SurfaceIoError::Encode(_) | SurfaceIoError::UnsupportedFormat(_) => {
                Self::Encode(err.to_string())
            }
            SurfaceIoError::DataUri(_) | SurfaceIoError::Decode(_) | SurfaceIoError::Io(_) => {
                Self::Decode(err.to_string())
            }
        }
    }
}

/// Decode PNG, JPEG, BMP, or WebP bytes into RGBA.
///
/// # Errors
///
/// Returns [`SurfaceIoError::Decode`] if the format is unrecognized or
/// the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<RgbaImage, SurfaceIoError> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(SurfaceIoError::Decode)
}

/// Encode RGBA pixels in `format`.
///
/// JPEG has no alpha channel; it is dropped before encoding.
///
/// # Errors
///
/// Returns [`SurfaceIoError::Encode`] if the encoder rejects the image.
pub fn encode(image: &RgbaImage, format: EncodeFormat) -> Result<Vec<u8>, SurfaceIoError> {
    let mut bytes = Vec::new();
    match format {
        EncodeFormat::Png => PngEncoder::new(&mut bytes).write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        ),
        EncodeFormat::Jpeg { quality } => {
            let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            JpegEncoder::new_with_quality(&mut bytes, EncodeFormat::jpeg_quality_percent(quality))
                .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        }
    }
    .map_err(SurfaceIoError::Encode)?;
    Ok(bytes)
}

/// MIME type of encoded bytes, sniffed from their header.
#[must_use]
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes).map_or("application/octet-stream", |f| f.to_mime_type())
}

/// The encode format implied by a path's extension.
///
/// # Errors
///
/// Returns [`SurfaceIoError::UnsupportedFormat`] for extensions other
/// than PNG and JPEG.
pub fn format_for_path(path: &Path, jpeg_quality: f64) -> Result<EncodeFormat, SurfaceIoError> {
    match ImageFormat::from_path(path) {
        Ok(ImageFormat::Png) => Ok(EncodeFormat::Png),
        Ok(ImageFormat::Jpeg) => Ok(EncodeFormat::Jpeg {
            quality: jpeg_quality,
        }),
        _ => Err(SurfaceIoError::UnsupportedFormat(path.display().to_string())),
    }
}

/// Read an image file's bytes.
///
/// # Errors
///
/// Returns [`SurfaceIoError::Io`] if the file cannot be read.
pub fn read_file(path: &Path) -> Result<Vec<u8>, SurfaceIoError> {
    Ok(std::fs::read(path)?)
}

/// Encode `image` for `path` (by extension) and write it.
///
/// # Errors
///
/// Returns [`SurfaceIoError::UnsupportedFormat`], [`SurfaceIoError::Encode`],
/// or [`SurfaceIoError::Io`].
pub fn write_file(path: &Path, image: &RgbaImage, jpeg_quality: f64) -> Result<(), SurfaceIoError> {
    let bytes = encode(image, format_for_path(path, jpeg_quality)?)?;
    std::fs::write(path, bytes)?;
    Ok(())
}
