//! Whole-target resampling for the `resize` command.

use image::imageops::{self, FilterType};

use crate::buffer::PixelBuffer;
use crate::types::Dimensions;

/// Resampling filter for `resize`.
pub const RESIZE_FILTER: FilterType = FilterType::Triangle;

/// Size after resizing `current` to the requested dimensions. A missing
/// dimension keeps the current one.
#[must_use]
pub fn target_size(current: Dimensions, width: Option<u32>, height: Option<u32>) -> Dimensions {
    Dimensions::new(
        width.unwrap_or(current.width),
        height.unwrap_or(current.height),
    )
}

/// Resample `buffer` to `size`.
///
/// Returns a dirty buffer of the new size, or the input untouched when
/// the size does not change.
#[must_use]
pub fn resize(buffer: PixelBuffer, size: Dimensions) -> PixelBuffer {
    if buffer.dimensions() == size {
        return buffer;
    }
    let resized = imageops::resize(&buffer.to_image(), size.width, size.height, RESIZE_FILTER);
    let mut out = PixelBuffer::from_image(&resized);
    out.mark_dirty();
    out
}
