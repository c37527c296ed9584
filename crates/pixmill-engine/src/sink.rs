//! Delivery of a finished operation: commit to the target, then hand the
//! result to the caller's reducer.

use serde::{Deserialize, Serialize};

use crate::buffer::PixelBuffer;
use crate::surface::{Surface, SurfaceError};
use crate::types::Dimensions;

/// Caller callback run once per operation, after the target has been
/// updated. It sees the target in its final state.
pub type Reducer = Box<dyn FnOnce(&dyn Surface, &FilterOutput)>;

/// What an operation produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterOutput {
    /// A pixel pass or resize finished.
    Pixels {
        /// Whether the target was written (false for a clean buffer).
        committed: bool,
        /// Size of the result.
        dimensions: Dimensions,
    },
    /// `sample` color counts, most frequent first.
    Histogram {
        /// `(color key, count)` pairs.
        colors: Vec<(String, u64)>,
    },
    /// The target was re-encoded; this is the new data URI.
    Encoded {
        /// Encoded representation.
        data: String,
    },
    /// The target's backup slot was filled.
    Saved,
    /// `restore` ran; `false` when there was nothing to restore.
    Restored {
        /// Whether a backup was applied.
        restored: bool,
    },
}

/// Write `buffer` to `target` if it is dirty.
///
/// # Errors
///
/// Propagates the surface write error.
pub fn commit_pixels(
    target: &mut dyn Surface,
    buffer: &PixelBuffer,
) -> Result<FilterOutput, SurfaceError> {
    let committed = buffer.commit(target)?;
    Ok(FilterOutput::Pixels {
        committed,
        dimensions: buffer.dimensions(),
    })
}

/// Run the reducer, if any, against the target's final state.
pub fn reduce(target: &dyn Surface, output: &FilterOutput, reducer: Option<Reducer>) {
    if let Some(reducer) = reducer {
        reducer(target, output);
    }
}
