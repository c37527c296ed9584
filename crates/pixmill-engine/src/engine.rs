//! Resumable pixel passes: point transform, convolution, and sampling.
//!
//! A [`Pass`] walks the rows of a [`Region`]. It does not schedule
//! itself: the caller hands it an [`AsyncCursor`] and a [`SliceBudget`],
//! and [`Pass::step`] processes whole rows until either the region is
//! finished ([`Step::Done`] with the result buffer) or the budget runs
//! out ([`Step::Progress`] with the cursor to resume from). Suspension
//! only ever happens between rows, and all per-pass state (including the
//! noise generator) advances in pixel order, so the output is the same
//! however the work is sliced.
//!
//! ```rust
//! # use pixmill_engine::buffer::PixelBuffer;
//! # use pixmill_engine::channels::ChannelMask;
//! # use pixmill_engine::clock::SystemClock;
//! # use pixmill_engine::engine::{Algorithm, Pass, PointFunction, SliceBudget, Step};
//! # use pixmill_engine::region::Region;
//! # use pixmill_engine::types::{Rgba, RgbaImage};
//! let buffer = PixelBuffer::from_image(&RgbaImage::from_pixel(8, 8, Rgba([0, 40, 200, 255])));
//! let region = Region::full(buffer.dimensions());
//! let mut pass = Pass::new(
//!     Algorithm::Point(PointFunction::Negate),
//!     region,
//!     ChannelMask::ALL,
//!     1.0,
//!     0.0,
//! );
//! let clock = SystemClock;
//! let mut cursor = pass.begin(buffer);
//! let result = loop {
//!     let budget = SliceBudget::start(&clock, std::time::Duration::ZERO, false);
//!     match pass.step(cursor, &budget) {
//!         Step::Progress(next) => cursor = next,
//!         Step::Done(buffer) => break buffer,
//!     }
//! };
//! assert_eq!(result.get(0, 0).map(|c| c.0), Some([255, 215, 55, 255]));
//! ```

use std::time::Duration;

use crate::buffer::PixelBuffer;
use crate::channels::ChannelMask;
use crate::clock::{Clock, SystemClock};
use crate::kernel::{ColorMatrix, Kernel};
use crate::region::Region;
use crate::rng::NoiseRng;
use crate::sample::ColorHistogram;
use crate::types::Rgba;

/// Clamp to `[0, 255]` and truncate toward zero. NaN becomes 0.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn saturate(v: f64) -> u8 {
    v.clamp(0.0, 255.0) as u8
}

fn to_f64(c: Rgba<u8>) -> [f64; 4] {
    c.0.map(f64::from)
}

/// Scale and shift the enabled channels of `values`; disabled channels
/// keep `original`.
fn blend(original: Rgba<u8>, values: [f64; 4], mask: [bool; 4], factor: f64, bias: f64) -> Rgba<u8> {
    let mut out = original;
    for ((slot, on), v) in out.0.iter_mut().zip(mask).zip(values) {
        if on {
            *slot = saturate(factor.mul_add(v, bias));
        }
    }
    out
}

/// Per-pixel function of a point transform. It sees only the pixel's own
/// original value.
#[derive(Debug, Clone, PartialEq)]
pub enum PointFunction {
    /// Mix R, G, B through a color matrix. Alpha passes through.
    Color(ColorMatrix),
    /// `f * (v - 128) + 128` on R, G, B.
    Contrast {
        /// Contrast multiplier.
        f: f64,
    },
    /// `255 - v` on R, G, B.
    Negate,
    /// Add `level * (rand - 0.5)` to R, G, B (one draw per pixel),
    /// clamped and truncated.
    Noise {
        /// Noise amplitude.
        level: f64,
        /// Seeded generator.
        rng: NoiseRng,
    },
}

impl PointFunction {
    /// Transform a working copy of one pixel.
    pub fn apply(&mut self, c: [f64; 4]) -> [f64; 4] {
        let [r, g, b, a] = c;
        match self {
            Self::Color(m) => {
                let [r, g, b] = m.apply([r, g, b]);
                [r, g, b, a]
            }
            Self::Contrast { f } => {
                let f = *f;
                [
                    f.mul_add(r - 128.0, 128.0),
                    f.mul_add(g - 128.0, 128.0),
                    f.mul_add(b - 128.0, 128.0),
                    a,
                ]
            }
            Self::Negate => [255.0 - r, 255.0 - g, 255.0 - b, a],
            Self::Noise { level, rng } => {
                let nb = *level * (rng.next_f64() - 0.5);
                let shift = |v: f64| f64::from(saturate(v + nb));
                [shift(r), shift(g), shift(b), a]
            }
        }
    }
}

/// What a pass does to each pixel of its region.
#[derive(Debug, Clone, PartialEq)]
pub enum Algorithm {
    /// In-place per-pixel transform.
    Point(PointFunction),
    /// Kernel convolution of R, G, B with toroidal addressing into a
    /// second buffer. Alpha is always copied from the source.
    Convolve(Kernel),
    /// Read-only color histogram.
    Sample(ColorHistogram),
}

impl Algorithm {
    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Point(_) => "point",
            Self::Convolve(_) => "convolve",
            Self::Sample(_) => "sample",
        }
    }
}

/// Time budget for one slice.
pub struct SliceBudget<'a, C: Clock> {
    clock: &'a C,
    started: C::Instant,
    interval: Duration,
    sync: bool,
}

impl<'a, C: Clock> SliceBudget<'a, C> {
    /// Start a slice now. With `sync` the budget never runs out.
    pub fn start(clock: &'a C, interval: Duration, sync: bool) -> Self {
        Self {
            clock,
            started: clock.now(),
            interval,
            sync,
        }
    }

    /// Whether the slice should yield at the next row boundary.
    pub fn exhausted(&self) -> bool {
        !self.sync && self.clock.elapsed(&self.started) >= self.interval
    }
}

/// Resumable progress through one pass.
///
/// Carries the working buffers between slices: `source` is the buffer
/// read from (and, for point transforms, written in place), `scratch` is
/// the convolution destination.
#[derive(Debug, Clone)]
pub struct AsyncCursor {
    /// Column the next row starts at.
    pub xs: i64,
    /// Next row to process.
    pub ys: i64,
    first_row: i64,
    last_row: i64,
    source: PixelBuffer,
    scratch: Option<PixelBuffer>,
}

impl AsyncCursor {
    /// Rows already processed.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub const fn rows_done(&self) -> u64 {
        (self.ys - self.first_row) as u64
    }

    /// Rows in the pass.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub const fn total_rows(&self) -> u64 {
        if self.last_row < self.first_row {
            0
        } else {
            (self.last_row - self.first_row + 1) as u64
        }
    }

    /// Completed fraction in `[0, 1]`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> f64 {
        match self.total_rows() {
            0 => 1.0,
            total => self.rows_done() as f64 / total as f64,
        }
    }

    const fn is_finished(&self) -> bool {
        self.ys > self.last_row
    }

    fn into_result(self) -> PixelBuffer {
        self.scratch.unwrap_or(self.source)
    }
}

/// Outcome of one [`Pass::step`].
#[derive(Debug)]
#[must_use]
pub enum Step {
    /// Budget ran out; resume from this cursor.
    Progress(AsyncCursor),
    /// Region finished; this is the result buffer.
    Done(PixelBuffer),
}

/// One configured pass over a region.
#[derive(Debug, Clone, PartialEq)]
pub struct Pass {
    algorithm: Algorithm,
    region: Region,
    channels: ChannelMask,
    factor: f64,
    bias: f64,
}

impl Pass {
    /// Configure a pass.
    #[must_use]
    pub const fn new(
        algorithm: Algorithm,
        region: Region,
        channels: ChannelMask,
        factor: f64,
        bias: f64,
    ) -> Self {
        Self {
            algorithm,
            region,
            channels,
            factor,
            bias,
        }
    }

    /// The pass's algorithm (and any accumulated state, e.g. a histogram).
    #[must_use]
    pub const fn algorithm(&self) -> &Algorithm {
        &self.algorithm
    }

    /// Consume the pass, returning its algorithm state.
    #[must_use]
    pub fn into_algorithm(self) -> Algorithm {
        self.algorithm
    }

    /// The resolved region.
    #[must_use]
    pub const fn region(&self) -> Region {
        self.region
    }

    /// Create the cursor for a fresh run over `buffer`.
    ///
    /// Convolution gets an independent destination copy here so pixels
    /// outside the region stay identical to the source.
    #[must_use]
    pub fn begin(&self, buffer: PixelBuffer) -> AsyncCursor {
        let size = buffer.dimensions();
        let columns = self.region.columns_within(size);
        let rows = self.region.rows_within(size);
        let (first_row, last_row) = if columns.is_empty() || rows.is_empty() {
            (0, -1)
        } else {
            (*rows.start(), *rows.end())
        };
        let scratch = matches!(self.algorithm, Algorithm::Convolve(_)).then(|| buffer.clone());
        AsyncCursor {
            xs: *columns.start(),
            ys: first_row,
            first_row,
            last_row,
            source: buffer,
            scratch,
        }
    }

    /// Process rows until the region is done or the budget runs out.
    ///
    /// The budget is checked after each completed row, never after the
    /// last one, so a pass that finishes never reports `Progress`.
    pub fn step<C: Clock>(&mut self, mut cursor: AsyncCursor, budget: &SliceBudget<'_, C>) -> Step {
        while !cursor.is_finished() {
            let y = cursor.ys;
            self.process_row(&mut cursor, y);
            cursor.ys += 1;
            if !cursor.is_finished() && budget.exhausted() {
                return Step::Progress(cursor);
            }
        }
        Step::Done(cursor.into_result())
    }

    /// Run the whole pass without yielding.
    pub fn run(&mut self, buffer: PixelBuffer) -> PixelBuffer {
        let clock = SystemClock;
        let budget = SliceBudget::start(&clock, Duration::MAX, true);
        let mut cursor = self.begin(buffer);
        loop {
            match self.step(cursor, &budget) {
                Step::Progress(next) => cursor = next,
                Step::Done(result) => return result,
            }
        }
    }

    fn process_row(&mut self, cursor: &mut AsyncCursor, y: i64) {
        let columns = self.region.columns_within(cursor.source.dimensions());
        let mask = self.channels.as_array();
        let (factor, bias) = (self.factor, self.bias);
        match &mut self.algorithm {
            Algorithm::Point(function) => {
                for x in columns {
                    let Some(original) = cursor.source.get(x, y) else {
                        continue;
                    };
                    let transformed = function.apply(to_f64(original));
                    cursor
                        .source
                        .set(x, y, blend(original, transformed, mask, factor, bias));
                }
            }
            Algorithm::Convolve(kernel) => {
                let Some(dest) = cursor.scratch.as_mut() else {
                    return;
                };
                let source = &cursor.source;
                let mask = [mask[0], mask[1], mask[2], false];
                for x in columns {
                    let Some(original) = source.get(x, y) else {
                        continue;
                    };
                    let acc = convolve_at(source, kernel, x, y, mask);
                    dest.set(x, y, blend(original, acc, mask, factor, bias));
                }
            }
            Algorithm::Sample(histogram) => {
                for x in columns {
                    if let Some(c) = cursor.source.get(x, y) {
                        histogram.add(c);
                    }
                }
            }
        }
    }
}

/// Weighted sum around `(x, y)` for the enabled channels.
///
/// Neighbors are addressed modulo the buffer size on both axes, so the
/// kernel always samples real pixels from the whole buffer, wrapping
/// across edges instead of padding or clamping.
fn convolve_at(source: &PixelBuffer, kernel: &Kernel, x: i64, y: i64, mask: [bool; 4]) -> [f64; 4] {
    let w = i64::from(source.width());
    let h = i64::from(source.height());
    let (cx, cy) = kernel.center();
    #[allow(clippy::cast_possible_wrap)]
    let (cx, cy) = (cx as i64, cy as i64);
    let mut acc = [0.0; 4];
    for (kx, ky, weight) in kernel.cells() {
        #[allow(clippy::cast_possible_wrap)]
        let (kx, ky) = (kx as i64, ky as i64);
        let sx = (x - cx + kx).rem_euclid(w);
        let sy = (y - cy + ky).rem_euclid(h);
        let Some(p) = source.get(sx, sy) else {
            continue;
        };
        for ((sum, on), v) in acc.iter_mut().zip(mask).zip(p.0) {
            if on {
                *sum = f64::from(v).mul_add(weight, *sum);
            }
        }
    }
    acc
}
