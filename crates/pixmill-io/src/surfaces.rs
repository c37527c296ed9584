//! The two [`Surface`] implementations.
//!
//! [`ImageSurface`] behaves like an `<img>` element: its state is an
//! encoded `src` data URI, pixels are decoded on demand, and written
//! pixels are re-encoded as PNG. [`CanvasSurface`] behaves like a canvas:
//! it holds raw RGBA and only encodes when asked.

use pixmill_engine::surface::{EncodeFormat, Surface, SurfaceError};
use pixmill_engine::types::RgbaImage;
use tracing::debug;

use crate::codec;
use crate::data_uri::DataUri;

/// Encode pixels as a data URI.
///
/// # Errors
///
/// Returns [`SurfaceError::Encode`] if the codec fails.
pub fn to_data_uri(image: &RgbaImage, format: EncodeFormat) -> Result<String, SurfaceError> {
    let bytes = codec::encode(image, format)?;
    Ok(DataUri::new(format.mime_type(), bytes).to_string())
}

/// Decode a data URI to pixels.
///
/// # Errors
///
/// Returns [`SurfaceError::Decode`] for a malformed URI or payload.
pub fn from_data_uri(src: &str) -> Result<RgbaImage, SurfaceError> {
    let uri: DataUri = src.parse().map_err(crate::SurfaceIoError::from)?;
    Ok(codec::decode(uri.bytes())?)
}

/// A target whose state is an encoded image source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageSurface {
    src: Option<String>,
}

impl ImageSurface {
    /// An image with no source; it cannot supply pixels.
    #[must_use]
    pub const fn empty() -> Self {
        Self { src: None }
    }

    /// An image showing `src` (a data URI).
    #[must_use]
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: Some(src.into()),
        }
    }

    /// An image from encoded file bytes; the MIME type is sniffed.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let mime = codec::sniff_mime(&bytes);
        Self::new(DataUri::new(mime, bytes).to_string())
    }

    /// The current source.
    #[must_use]
    pub fn src(&self) -> Option<&str> {
        self.src.as_deref()
    }

    /// The encoded bytes behind the current source.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::Unsupported`] with no source, or
    /// [`SurfaceError::Decode`] for a malformed one.
    pub fn bytes(&self) -> Result<Vec<u8>, SurfaceError> {
        let uri: DataUri = self
            .source()?
            .parse()
            .map_err(crate::SurfaceIoError::from)?;
        Ok(uri.into_bytes())
    }

    fn source(&self) -> Result<&str, SurfaceError> {
        self.src
            .as_deref()
            .ok_or_else(|| SurfaceError::Unsupported("image has no source".to_owned()))
    }
}

impl Surface for ImageSurface {
    fn read_pixels(&self) -> Result<RgbaImage, SurfaceError> {
        from_data_uri(self.source()?)
    }

    fn write_pixels(&mut self, pixels: &RgbaImage) -> Result<(), SurfaceError> {
        self.src = Some(to_data_uri(pixels, EncodeFormat::Png)?);
        Ok(())
    }

    fn encode(&self, format: EncodeFormat) -> Result<String, SurfaceError> {
        to_data_uri(&self.read_pixels()?, format)
    }

    /// The source itself, so a restore brings back the exact bytes.
    fn snapshot(&self) -> Result<String, SurfaceError> {
        Ok(self.source()?.to_owned())
    }

    fn load_encoded(&mut self, encoded: &str) -> Result<(), SurfaceError> {
        encoded
            .parse::<DataUri>()
            .map_err(crate::SurfaceIoError::from)?;
        debug!(len = encoded.len(), "image source replaced");
        self.src = Some(encoded.to_owned());
        Ok(())
    }
}

/// A target holding raw RGBA pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanvasSurface {
    image: RgbaImage,
}

impl CanvasSurface {
    /// A transparent canvas.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    /// A canvas showing `image`.
    #[must_use]
    pub const fn from_image(image: RgbaImage) -> Self {
        Self { image }
    }

    /// The current pixels.
    #[must_use]
    pub const fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Consume into the current pixels.
    #[must_use]
    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

impl Surface for CanvasSurface {
    fn read_pixels(&self) -> Result<RgbaImage, SurfaceError> {
        Ok(self.image.clone())
    }

    fn write_pixels(&mut self, pixels: &RgbaImage) -> Result<(), SurfaceError> {
        self.image.clone_from(pixels);
        Ok(())
    }

    fn encode(&self, format: EncodeFormat) -> Result<String, SurfaceError> {
        to_data_uri(&self.image, format)
    }

    fn load_encoded(&mut self, encoded: &str) -> Result<(), SurfaceError> {
        self.image = from_data_uri(encoded)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pixmill_engine::types::Rgba;

    use super::*;

    fn gradient() -> RgbaImage {
        RgbaImage::from_fn(5, 3, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            let v = (x * 50 + y * 20) as u8;
            Rgba([v, 255 - v, 7, 255])
        })
    }

    #[test]
    fn empty_image_is_unsupported() {
        let surface = ImageSurface::empty();
        assert!(matches!(
            surface.read_pixels(),
            Err(SurfaceError::Unsupported(_))
        ));
        assert!(matches!(surface.snapshot(), Err(SurfaceError::Unsupported(_))));
    }

    #[test]
    fn image_write_then_read() {
        let mut surface = ImageSurface::empty();
        surface.write_pixels(&gradient()).unwrap();
        assert!(surface.src().unwrap().starts_with("data:image/png;base64,"));
        assert_eq!(surface.read_pixels().unwrap(), gradient());
    }

    #[test]
    fn image_snapshot_is_verbatim_source() {
        let src = to_data_uri(&gradient(), EncodeFormat::Jpeg { quality: 0.7 }).unwrap();
        let surface = ImageSurface::new(src.clone());
        assert_eq!(surface.snapshot().unwrap(), src);
        assert!(surface.encode(EncodeFormat::Png).unwrap().starts_with("data:image/png"));
    }

    #[test]
    fn image_from_bytes_sniffs_mime() {
        let png = codec::encode(&gradient(), EncodeFormat::Png).unwrap();
        let surface = ImageSurface::from_bytes(png.clone());
        assert!(surface.src().unwrap().starts_with("data:image/png;base64,"));
        assert_eq!(surface.bytes().unwrap(), png);
    }

    #[test]
    fn load_rejects_non_data_uri() {
        let mut surface = ImageSurface::new("data:image/png;base64,AAAA");
        assert!(surface.load_encoded("file:///tmp/x.png").is_err());
        assert_eq!(surface.src(), Some("data:image/png;base64,AAAA"));
    }

    #[test]
    fn canvas_round_trips_through_png() {
        let mut canvas = CanvasSurface::from_image(gradient());
        let encoded = canvas.encode(EncodeFormat::Png).unwrap();
        canvas.write_pixels(&RgbaImage::new(1, 1)).unwrap();
        canvas.load_encoded(&encoded).unwrap();
        assert_eq!(canvas.image(), &gradient());
    }
}
