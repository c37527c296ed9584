//! The capability seam between the engine and whatever holds the pixels.
//!
//! A [`Surface`] is anything that can hand over an RGBA grid, accept one
//! back, and produce an encoded representation of itself. The engine
//! never inspects what kind of target it is talking to: an `<img>`-like
//! target holding encoded bytes and a canvas-like target holding raw
//! pixels are just two implementations of the same trait.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::RgbaImage;

/// Errors a surface implementation may report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum SurfaceError {
    /// The target has no pixels the engine can work with.
    #[error("target cannot supply pixels: {0}")]
    Unsupported(String),

    /// Encoding the surface into an image format failed.
    #[error("failed to encode surface: {0}")]
    Encode(String),

    /// Decoding previously encoded data failed.
    #[error("failed to decode surface data: {0}")]
    Decode(String),
}

/// Output format for [`Surface::encode`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum EncodeFormat {
    /// Lossless PNG.
    Png,
    /// JPEG with quality in `[0, 1]`.
    Jpeg {
        /// Encode quality; values outside `[0, 1]` are clamped.
        quality: f64,
    },
}

impl EncodeFormat {
    /// MIME type of the encoded output.
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg { .. } => "image/jpeg",
        }
    }

    /// JPEG quality mapped onto the `1..=100` scale codecs expect.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn jpeg_quality_percent(quality: f64) -> u8 {
        (quality.clamp(0.0, 1.0) * 100.0).round().max(1.0) as u8
    }
}

impl fmt::Display for EncodeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Png => f.write_str("png"),
            Self::Jpeg { quality } => write!(f, "jpeg(q={quality})"),
        }
    }
}

/// A filter target.
///
/// Implementations provide the host primitives the engine needs:
/// reading and writing RGBA pixels, and producing or loading an
/// encoded representation used by the `save`/`restore` backup slot and
/// the encode commands.
pub trait Surface {
    /// Copy the current pixels out of the target.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::Unsupported`] when the target has nothing
    /// drawable, or [`SurfaceError::Decode`] if its data is corrupt.
    fn read_pixels(&self) -> Result<RgbaImage, SurfaceError>;

    /// Replace the target's pixels. The image may have different
    /// dimensions than the current content (resize).
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::Encode`] if the target stores encoded
    /// data and re-encoding fails.
    fn write_pixels(&mut self, pixels: &RgbaImage) -> Result<(), SurfaceError>;

    /// Encode the current content as a data URI.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError`] if the content cannot be read or encoded.
    fn encode(&self, format: EncodeFormat) -> Result<String, SurfaceError>;

    /// The representation stored by `save`.
    ///
    /// Defaults to a PNG data URI. Targets that already hold an encoded
    /// source return it verbatim so a later restore is byte-exact.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError`] if the content cannot be encoded.
    fn snapshot(&self) -> Result<String, SurfaceError> {
        self.encode(EncodeFormat::Png)
    }

    /// Replace the content with a previously produced encoded form.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::Decode`] if the data cannot be decoded.
    fn load_encoded(&mut self, encoded: &str) -> Result<(), SurfaceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_types() {
        assert_eq!(EncodeFormat::Png.mime_type(), "image/png");
        assert_eq!(
            EncodeFormat::Jpeg { quality: 0.5 }.mime_type(),
            "image/jpeg"
        );
    }

    #[test]
    fn jpeg_quality_is_clamped_to_codec_range() {
        assert_eq!(EncodeFormat::jpeg_quality_percent(1.0), 100);
        assert_eq!(EncodeFormat::jpeg_quality_percent(0.75), 75);
        assert_eq!(EncodeFormat::jpeg_quality_percent(7.0), 100);
        assert_eq!(EncodeFormat::jpeg_quality_percent(0.0), 1);
        assert_eq!(EncodeFormat::jpeg_quality_percent(-3.0), 1);
    }
}
