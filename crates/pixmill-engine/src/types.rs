//! Shared types for the pixmill filter engine.

use serde::{Deserialize, Serialize};

use crate::surface::SurfaceError;

/// Re-export `RgbaImage` so surface implementations can exchange pixel
/// grids without depending on `image` directly.
pub use image::RgbaImage;

/// Re-export `Rgba` as the engine's color type.
pub use image::Rgba;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Create a new dimensions value.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total number of pixels.
    #[must_use]
    pub const fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Handle for a target attached to a [`Workbench`](crate::Workbench).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(u64);

impl TargetId {
    /// Wrap a raw id.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors that can occur while submitting or running a filter.
///
/// Configuration errors are returned synchronously from submission and
/// are never retried. Target errors are reported through a `failed`
/// event and do not stall the target's queue.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum FilterError {
    /// Options, kernel, or command are malformed.
    #[error("invalid filter configuration: {0}")]
    InvalidConfig(String),

    /// The target cannot supply pixels (neither an image nor a drawable surface).
    #[error("unsupported target: {0}")]
    UnsupportedTarget(String),

    /// No target is attached under this id.
    #[error("unknown target: {0}")]
    UnknownTarget(TargetId),

    /// The surface failed while reading, writing, or encoding.
    #[error("surface error: {0}")]
    Surface(SurfaceError),
}

impl From<SurfaceError> for FilterError {
    fn from(err: SurfaceError) -> Self {
        match err {
            SurfaceError::Unsupported(reason) => Self::UnsupportedTarget(reason),
            other => Self::Surface(other),
        }
    }
}
