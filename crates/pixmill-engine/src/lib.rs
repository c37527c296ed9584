//! pixmill-engine: Incremental, time-sliced pixel filters (sans-IO).
//!
//! Applies convolution kernels, color matrices, and per-pixel adjustments
//! to raster targets without ever holding the caller for longer than a
//! configured interval:
//! build buffer -> resolve region/channels -> run pass in slices ->
//! commit -> reducer.
//!
//! This crate has **no I/O dependencies**. Targets are reached through
//! the [`Surface`] trait; decoding, encoding, and file access live in
//! `pixmill-io`.
//!
//! Most hosts use a [`Workbench`]: attach targets, [`submit`] filters,
//! and call [`tick`] until idle. Callers that just want a result can
//! use [`apply`].
//!
//! [`submit`]: Workbench::submit
//! [`tick`]: Workbench::tick

pub mod buffer;
pub mod catalog;
pub mod channels;
pub mod clock;
pub mod engine;
pub mod events;
pub mod kernel;
pub mod operation;
pub mod options;
pub mod queue;
pub mod region;
pub mod resize;
pub mod rng;
pub mod sample;
pub mod sink;
pub mod surface;
pub mod types;
pub mod workbench;

pub use buffer::PixelBuffer;
pub use channels::ChannelMask;
pub use clock::{Clock, SystemClock};
pub use events::FilterEvent;
pub use operation::{Advance, Operation, Phase};
pub use options::{Command, FilterOptions, FilterRequest};
pub use region::{Region, RegionSpec};
pub use sink::{FilterOutput, Reducer};
pub use surface::{EncodeFormat, Surface, SurfaceError};
pub use types::{Dimensions, FilterError, TargetId};
pub use workbench::Workbench;

/// Run one filter on `surface` to completion, without a queue.
///
/// Time slicing still applies internally but every slice runs back to
/// back. There is no backup slot, so `restore` is always a no-op.
///
/// # Errors
///
/// Returns [`FilterError::InvalidConfig`] for options that describe no
/// runnable filter, or the surface error that stopped the operation.
pub fn apply(
    surface: &mut dyn Surface,
    request: impl Into<FilterRequest>,
) -> Result<FilterOutput, FilterError> {
    let mut operation = Operation::new(request.into(), rng::seed_from_time())?;
    let mut backup = None;
    let clock = SystemClock;
    loop {
        match operation.advance(surface, &mut backup, &clock)? {
            Advance::Yielded { .. } => {}
            Advance::Complete(output) => return Ok(output),
        }
    }
}
