//! Command catalog: maps resolved [`FilterOptions`] to what actually runs.
//!
//! Everything here is pure. [`recipe`] validates the options and returns
//! a [`Recipe`]; the kernel and matrix builders are exposed for callers
//! that want to inspect them.

use std::f64::consts::PI;

use crate::engine::{Algorithm, PointFunction};
use crate::kernel::{ColorMatrix, Kernel};
use crate::options::{Command, FilterOptions};
use crate::rng::NoiseRng;
use crate::sample::ColorHistogram;
use crate::surface::EncodeFormat;
use crate::types::FilterError;

/// Luma weights used by `grayscale`, one row per output channel.
pub const GRAYSCALE: ColorMatrix = ColorMatrix([[0.30, 0.59, 0.11]; 3]);

/// Sepia tone matrix.
pub const SEPIA: ColorMatrix = ColorMatrix([
    [0.393, 0.769, 0.189],
    [0.349, 0.686, 0.168],
    [0.272, 0.534, 0.131],
]);

/// Below this radius `blur` uses the fixed 3×3 soft kernel.
pub const GAUSSIAN_MIN_RADIUS: f64 = 2.0;

/// What a command does once its options are resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum Recipe {
    /// A pixel pass. `factor` and `bias` may differ from the caller's
    /// (e.g. `mean` forces `1/9`).
    Pixels {
        /// The per-pixel algorithm.
        algorithm: Algorithm,
        /// Effective multiplier.
        factor: f64,
        /// Effective offset.
        bias: f64,
    },
    /// Resample the whole target. `None` keeps that dimension.
    Resize {
        /// New width.
        width: Option<u32>,
        /// New height.
        height: Option<u32>,
    },
    /// Store a snapshot in the target's backup slot.
    Save,
    /// Reload the backup slot, if any.
    Restore,
    /// Re-encode the target.
    Encode(EncodeFormat),
}

impl Recipe {
    /// Whether this recipe walks pixels in time slices.
    #[must_use]
    pub const fn is_pixel_pass(&self) -> bool {
        matches!(self, Self::Pixels { .. })
    }
}

/// Resolve options into a runnable recipe.
///
/// `fallback_seed` seeds `noise` when the options carry no `seed`.
///
/// # Errors
///
/// Returns [`FilterError::InvalidConfig`] for a malformed `matrix`
/// (`color` and `matrix` commands), a `blur` radius that yields no
/// usable Gaussian, or a zero `resize` dimension.
pub fn recipe(options: &FilterOptions, fallback_seed: u64) -> Result<Recipe, FilterError> {
    let caller = |algorithm| Recipe::Pixels {
        algorithm,
        factor: options.factor,
        bias: options.bias,
    };
    let fixed = |algorithm, factor| Recipe::Pixels {
        algorithm,
        factor,
        bias: options.bias,
    };
    let point = Algorithm::Point;
    let convolve = Algorithm::Convolve;

    Ok(match options.command {
        Command::Blur => caller(convolve(blur_kernel(options.radius)?)),
        Command::Sharpen if options.more => caller(convolve(sharpen_more_kernel()?)),
        Command::Sharpen => fixed(convolve(sharpen_kernel()?), 1.0 / 8.0),
        Command::Edges => caller(convolve(edges_kernel()?)),
        Command::Emboss => caller(convolve(emboss_kernel(options.more)?)),
        Command::Mean => fixed(convolve(mean_kernel()?), 1.0 / 9.0),
        Command::Matrix => caller(convolve(Kernel::new(options.matrix.clone())?)),
        Command::Brightness => caller(convolve(identity_kernel()?)),
        Command::Grayscale => caller(point(PointFunction::Color(GRAYSCALE))),
        Command::Sepia => caller(point(PointFunction::Color(SEPIA))),
        Command::Color => caller(point(PointFunction::Color(ColorMatrix::new(
            &options.matrix,
        )?))),
        Command::Contrast => caller(point(PointFunction::Contrast {
            f: contrast_factor(options.level),
        })),
        Command::Negate => caller(point(PointFunction::Negate)),
        Command::Noise => caller(point(PointFunction::Noise {
            level: options.level,
            rng: NoiseRng::new(options.seed.unwrap_or(fallback_seed)),
        })),
        Command::Sample => caller(Algorithm::Sample(ColorHistogram::default())),
        Command::Resize => {
            if options.width == Some(0) || options.height == Some(0) {
                return Err(FilterError::InvalidConfig(
                    "resize width and height must be non-zero".to_owned(),
                ));
            }
            Recipe::Resize {
                width: options.width,
                height: options.height,
            }
        }
        Command::Save => Recipe::Save,
        Command::Restore => Recipe::Restore,
        Command::Png => Recipe::Encode(EncodeFormat::Png),
        Command::Jpeg => Recipe::Encode(EncodeFormat::Jpeg {
            quality: options.factor,
        }),
    })
}

/// Kernel for `blur` at `radius`.
///
/// # Errors
///
/// Never fails for finite radii; the `Result` carries kernel validation.
pub fn blur_kernel(radius: f64) -> Result<Kernel, FilterError> {
    if radius < GAUSSIAN_MIN_RADIUS {
        Kernel::new(vec![
            vec![0.0, 0.2, 0.0],
            vec![0.2, 0.2, 0.2],
            vec![0.0, 0.2, 0.0],
        ])
    } else {
        gaussian_kernel(radius.max(GAUSSIAN_MIN_RADIUS) / 3.0)
    }
}

/// Unnormalized Gaussian with standard deviation `phi`.
///
/// Half-size is `max(1, ceil(3 phi))`, so the kernel is always odd and
/// at least 3×3.
///
/// # Errors
///
/// Returns [`FilterError::InvalidConfig`] if `phi` is not a positive
/// finite number.
pub fn gaussian_kernel(phi: f64) -> Result<Kernel, FilterError> {
    if !(phi.is_finite() && phi > 0.0) {
        return Err(FilterError::InvalidConfig(format!(
            "gaussian sigma must be positive, got {phi}"
        )));
    }
    #[allow(clippy::cast_possible_truncation)]
    let n = (phi * 3.0).ceil().max(1.0) as i64;
    let two_phi_sq = 2.0 * phi * phi;
    let scale = 1.0 / (PI * two_phi_sq);
    #[allow(clippy::cast_precision_loss)]
    let rows = (-n..=n)
        .map(|y| {
            (-n..=n)
                .map(|x| scale * (-((x * x + y * y) as f64) / two_phi_sq).exp())
                .collect()
        })
        .collect();
    Kernel::new(rows)
}

/// 5×5 sharpen; applied with factor `1/8`.
///
/// # Errors
///
/// Never fails; the `Result` carries kernel validation.
pub fn sharpen_kernel() -> Result<Kernel, FilterError> {
    Kernel::new(vec![
        vec![-1.0; 5],
        vec![-1.0, 2.0, 2.0, 2.0, -1.0],
        vec![-1.0, 2.0, 8.0, 2.0, -1.0],
        vec![-1.0, 2.0, 2.0, 2.0, -1.0],
        vec![-1.0; 5],
    ])
}

/// Aggressive 3×3 sharpen.
///
/// # Errors
///
/// Never fails; the `Result` carries kernel validation.
pub fn sharpen_more_kernel() -> Result<Kernel, FilterError> {
    Kernel::new(vec![
        vec![1.0, 1.0, 1.0],
        vec![1.0, -7.0, 1.0],
        vec![1.0, 1.0, 1.0],
    ])
}

/// Laplacian edge detector.
///
/// # Errors
///
/// Never fails; the `Result` carries kernel validation.
pub fn edges_kernel() -> Result<Kernel, FilterError> {
    Kernel::new(vec![
        vec![-1.0, -1.0, -1.0],
        vec![-1.0, 8.0, -1.0],
        vec![-1.0, -1.0, -1.0],
    ])
}

/// Emboss; `more` deepens the relief.
///
/// # Errors
///
/// Never fails; the `Result` carries kernel validation.
pub fn emboss_kernel(more: bool) -> Result<Kernel, FilterError> {
    if more {
        Kernel::new(vec![
            vec![-2.0, -1.0, 0.0],
            vec![-1.0, 1.0, 1.0],
            vec![0.0, 1.0, 2.0],
        ])
    } else {
        Kernel::new(vec![
            vec![-1.0, -1.0, 0.0],
            vec![-1.0, 1.0, 1.0],
            vec![0.0, 1.0, 1.0],
        ])
    }
}

/// Single center tap; `brightness` scales R, G, B through it.
///
/// # Errors
///
/// Never fails; the `Result` carries kernel validation.
pub fn identity_kernel() -> Result<Kernel, FilterError> {
    Kernel::new(vec![
        vec![0.0, 0.0, 0.0],
        vec![0.0, 1.0, 0.0],
        vec![0.0, 0.0, 0.0],
    ])
}

/// 3×3 box; applied with factor `1/9`.
///
/// # Errors
///
/// Never fails; the `Result` carries kernel validation.
pub fn mean_kernel() -> Result<Kernel, FilterError> {
    Kernel::new(vec![vec![1.0; 3]; 3])
}

/// Contrast multiplier for `level` in roughly `[-255, 255]`.
#[must_use]
pub fn contrast_factor(level: f64) -> f64 {
    (259.0 * (level + 255.0)) / (255.0 * (259.0 - level))
}
