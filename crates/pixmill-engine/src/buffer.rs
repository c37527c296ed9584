//! Shadow pixel buffer: an independent, mutable copy of a target's pixels.
//!
//! Each pixel is stored as one packed 32-bit word with red in the lowest
//! byte, then green, blue and alpha. This matches the little-endian
//! layout of an RGBA8 byte buffer, so conversion to and from
//! [`RgbaImage`] is a plain reinterpretation of four bytes.

use crate::surface::{Surface, SurfaceError};
use crate::types::{Dimensions, Rgba, RgbaImage};

/// Pack four channels into one word.
#[must_use]
pub const fn pack(c: Rgba<u8>) -> u32 {
    u32::from_le_bytes(c.0)
}

/// Unpack a word into four channels.
#[must_use]
pub const fn unpack(word: u32) -> Rgba<u8> {
    Rgba(word.to_le_bytes())
}

/// A mutable RGBA pixel grid owned by one in-flight operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
    dirty: bool,
}

impl PixelBuffer {
    /// A fully transparent buffer.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; Dimensions::new(width, height).pixel_count()],
            dirty: false,
        }
    }

    /// Copy an image into a fresh, clean buffer.
    #[must_use]
    pub fn from_image(image: &RgbaImage) -> Self {
        let pixels = image
            .as_raw()
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Self {
            width: image.width(),
            height: image.height(),
            pixels,
            dirty: false,
        }
    }

    /// Copy the target's pixels into an independent buffer.
    ///
    /// # Errors
    ///
    /// Propagates the surface's read error, e.g.
    /// [`SurfaceError::Unsupported`] when the target has nothing drawable.
    pub fn build(surface: &dyn Surface) -> Result<Self, SurfaceError> {
        Ok(Self::from_image(&surface.read_pixels()?))
    }

    /// Buffer width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Buffer height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Buffer dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    /// Whether any in-bounds write has happened since the buffer was built.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Mark the buffer as modified without writing a pixel.
    pub const fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        let in_bounds =
            x >= 0 && y >= 0 && x < i64::from(self.width) && y < i64::from(self.height);
        if !in_bounds {
            return None;
        }
        usize::try_from(y * i64::from(self.width) + x).ok()
    }

    /// The color at `(x, y)`, or `None` outside the buffer.
    #[must_use]
    pub fn get(&self, x: i64, y: i64) -> Option<Rgba<u8>> {
        self.index(x, y).map(|n| unpack(self.pixels[n]))
    }

    /// Write a color. Out-of-range coordinates are ignored.
    pub fn set(&mut self, x: i64, y: i64, color: Rgba<u8>) {
        if let Some(n) = self.index(x, y) {
            self.pixels[n] = pack(color);
            self.dirty = true;
        }
    }

    /// The packed pixel words, row-major.
    #[must_use]
    pub fn words(&self) -> &[u32] {
        &self.pixels
    }

    /// Convert back into an [`RgbaImage`].
    #[must_use]
    pub fn to_image(&self) -> RgbaImage {
        let raw: Vec<u8> = self.pixels.iter().flat_map(|w| w.to_le_bytes()).collect();
        RgbaImage::from_raw(self.width, self.height, raw)
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }

    /// Write the buffer back to `target` if it was modified.
    ///
    /// Returns whether a write happened. Clean buffers (metadata-only
    /// commands, histogram sampling) leave the target untouched.
    ///
    /// # Errors
    ///
    /// Propagates the surface's write error.
    pub fn commit(&self, target: &mut dyn Surface) -> Result<bool, SurfaceError> {
        if !self.dirty {
            return Ok(false);
        }
        target.write_pixels(&self.to_image())?;
        Ok(true)
    }
}
