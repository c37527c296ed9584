//! Region of interest: the inclusive pixel rectangle an operation touches.
//!
//! A [`RegionSpec`] describes the rectangle either as offset + size or as
//! margins from all four edges (or a mix; a given size wins over the
//! opposite margin). [`RegionSpec::resolve`] turns it into absolute
//! inclusive bounds against a concrete buffer. Nothing is clamped: a
//! region reaching past the buffer simply finds no pixels there.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::types::Dimensions;

/// Caller-facing region description, relative to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegionSpec {
    /// Offset from the left edge.
    pub left: i64,
    /// Offset from the top edge.
    pub top: i64,
    /// Width of the region; `None` runs to the right margin.
    pub width: Option<i64>,
    /// Height of the region; `None` runs to the bottom margin.
    pub height: Option<i64>,
    /// Margin from the right edge, used when `width` is `None`.
    pub right: i64,
    /// Margin from the bottom edge, used when `height` is `None`.
    pub bottom: i64,
}

impl RegionSpec {
    /// Resolve against a buffer of the given size.
    #[must_use]
    pub fn resolve(&self, size: Dimensions) -> Region {
        let xs = self.left;
        let ys = self.top;
        let xe = self.width.map_or_else(
            || (i64::from(size.width) - 1).saturating_sub(self.right),
            |w| xs.saturating_add(w).saturating_sub(1),
        );
        let ye = self.height.map_or_else(
            || (i64::from(size.height) - 1).saturating_sub(self.bottom),
            |h| ys.saturating_add(h).saturating_sub(1),
        );
        Region { xs, ys, xe, ye }
    }
}

/// Absolute inclusive bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// First column.
    pub xs: i64,
    /// First row.
    pub ys: i64,
    /// Last column (inclusive).
    pub xe: i64,
    /// Last row (inclusive).
    pub ye: i64,
}

impl Region {
    /// The whole buffer.
    #[must_use]
    pub fn full(size: Dimensions) -> Self {
        RegionSpec::default().resolve(size)
    }

    /// `true` when the region contains no coordinates at all.
    #[must_use]
    pub const fn is_degenerate(&self) -> bool {
        self.xs > self.xe || self.ys > self.ye
    }

    /// Whether `(x, y)` lies inside the region.
    #[must_use]
    pub const fn contains(&self, x: i64, y: i64) -> bool {
        x >= self.xs && x <= self.xe && y >= self.ys && y <= self.ye
    }

    /// Columns of the region that exist in a buffer of `size`.
    #[must_use]
    pub fn columns_within(&self, size: Dimensions) -> RangeInclusive<i64> {
        self.xs.max(0)..=self.xe.min(i64::from(size.width) - 1)
    }

    /// Rows of the region that exist in a buffer of `size`.
    #[must_use]
    pub fn rows_within(&self, size: Dimensions) -> RangeInclusive<i64> {
        self.ys.max(0)..=self.ye.min(i64::from(size.height) - 1)
    }
}
