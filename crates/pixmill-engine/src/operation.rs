//! One queued filter invocation and its state machine.
//!
//! ```text
//! Idle ─▶ BuildingBuffer ─▶ Running ─▶ Committing ─▶ Complete
//!                            ▲    │
//!                            │    ▼
//!                           Yielded
//! ```
//!
//! `BuildingBuffer` and `Committing` never outlive a single call to
//! [`Operation::advance`]; an operation observed between calls is
//! `Idle`, `Yielded`, or `Complete`. Commands that do not walk pixels
//! (`save`, `restore`, `resize`, `png`, `jpeg`) go from `Idle` straight
//! to `Complete` in one call.

use std::fmt;
use std::mem;

use tracing::{debug, trace};

use crate::buffer::PixelBuffer;
use crate::catalog::{self, Recipe};
use crate::clock::Clock;
use crate::engine::{Algorithm, AsyncCursor, Pass, SliceBudget, Step};
use crate::options::{Command, FilterOptions, FilterRequest};
use crate::resize;
use crate::sink::{self, FilterOutput, Reducer};
use crate::surface::Surface;
use crate::types::FilterError;

/// Where an operation is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Queued or about to start; nothing read yet.
    Idle,
    /// Copying the target's pixels.
    BuildingBuffer,
    /// Inside a slice.
    Running,
    /// Between slices.
    Yielded,
    /// Writing the result back and running the reducer.
    Committing,
    /// Finished, successfully or not.
    Complete,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::BuildingBuffer => "building-buffer",
            Self::Running => "running",
            Self::Yielded => "yielded",
            Self::Committing => "committing",
            Self::Complete => "complete",
        })
    }
}

/// Result of one [`Operation::advance`] call.
#[derive(Debug)]
#[must_use]
pub enum Advance {
    /// A slice ran out of time; call `advance` again later.
    Yielded {
        /// Completed fraction.
        fraction: f64,
    },
    /// The operation finished and the reducer has run.
    Complete(FilterOutput),
}

enum State {
    Idle(Recipe),
    Yielded { pass: Pass, cursor: AsyncCursor },
    Complete,
}

/// A validated filter invocation bound to no target in particular.
pub struct Operation {
    options: FilterOptions,
    reducer: Option<Reducer>,
    state: State,
}

impl Operation {
    /// Validate `request` and build an idle operation.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidConfig`] when the options do not
    /// describe a runnable filter (e.g. a malformed kernel).
    pub fn new(request: FilterRequest, fallback_seed: u64) -> Result<Self, FilterError> {
        let recipe = catalog::recipe(&request.options, fallback_seed)?;
        Ok(Self {
            options: request.options,
            reducer: request.reducer,
            state: State::Idle(recipe),
        })
    }

    /// The command being run.
    #[must_use]
    pub const fn command(&self) -> Command {
        self.options.command
    }

    /// The resolved options.
    #[must_use]
    pub const fn options(&self) -> &FilterOptions {
        &self.options
    }

    /// Current phase, as seen between calls to [`advance`](Self::advance).
    #[must_use]
    pub const fn phase(&self) -> Phase {
        match self.state {
            State::Idle(_) => Phase::Idle,
            State::Yielded { .. } => Phase::Yielded,
            State::Complete => Phase::Complete,
        }
    }

    /// Whether the operation has finished.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self.state, State::Complete)
    }

    /// Run the next step against `target`.
    ///
    /// `backup` is the target's save/restore slot. A failure leaves the
    /// operation `Complete`; the reducer is not called.
    ///
    /// # Errors
    ///
    /// Returns the surface or target error that stopped the operation,
    /// or [`FilterError::InvalidConfig`] if called after completion.
    pub fn advance<C: Clock>(
        &mut self,
        target: &mut dyn Surface,
        backup: &mut Option<String>,
        clock: &C,
    ) -> Result<Advance, FilterError> {
        match mem::replace(&mut self.state, State::Complete) {
            State::Idle(recipe) => self.start(recipe, target, backup, clock),
            State::Yielded { pass, cursor } => self.slice(pass, cursor, target, clock),
            State::Complete => Err(FilterError::InvalidConfig(format!(
                "{} has already completed",
                self.command()
            ))),
        }
    }

    fn transition(&self, phase: Phase) {
        trace!(filter = %self.command(), %phase, "phase");
    }

    fn start<C: Clock>(
        &mut self,
        recipe: Recipe,
        target: &mut dyn Surface,
        backup: &mut Option<String>,
        clock: &C,
    ) -> Result<Advance, FilterError> {
        let output = match recipe {
            Recipe::Pixels {
                algorithm,
                factor,
                bias,
            } => {
                self.transition(Phase::BuildingBuffer);
                let buffer = PixelBuffer::build(target)?;
                let region = self.options.region.resolve(buffer.dimensions());
                let pass = Pass::new(algorithm, region, self.options.channels, factor, bias);
                let cursor = pass.begin(buffer);
                debug!(
                    filter = %self.command(),
                    algorithm = pass.algorithm().name(),
                    rows = cursor.total_rows(),
                    "pass begins"
                );
                return self.slice(pass, cursor, target, clock);
            }
            Recipe::Resize { width, height } => {
                self.transition(Phase::BuildingBuffer);
                let buffer = PixelBuffer::build(target)?;
                let size = resize::target_size(buffer.dimensions(), width, height);
                let resized = resize::resize(buffer, size);
                self.transition(Phase::Committing);
                sink::commit_pixels(target, &resized)?
            }
            Recipe::Save => {
                *backup = Some(target.snapshot()?);
                FilterOutput::Saved
            }
            Recipe::Restore => match backup.as_deref() {
                Some(saved) => {
                    target.load_encoded(saved)?;
                    FilterOutput::Restored { restored: true }
                }
                None => {
                    debug!("restore without a saved backup");
                    FilterOutput::Restored { restored: false }
                }
            },
            Recipe::Encode(format) => {
                let data = target.encode(format)?;
                target.load_encoded(&data)?;
                FilterOutput::Encoded { data }
            }
        };
        Ok(self.finish(target, output))
    }

    fn slice<C: Clock>(
        &mut self,
        mut pass: Pass,
        cursor: AsyncCursor,
        target: &mut dyn Surface,
        clock: &C,
    ) -> Result<Advance, FilterError> {
        self.transition(Phase::Running);
        let budget = SliceBudget::start(clock, self.options.interval, self.options.sync);
        match pass.step(cursor, &budget) {
            Step::Progress(cursor) => {
                let fraction = cursor.fraction();
                self.transition(Phase::Yielded);
                self.state = State::Yielded { pass, cursor };
                Ok(Advance::Yielded { fraction })
            }
            Step::Done(buffer) => {
                self.transition(Phase::Committing);
                let output = match pass.into_algorithm() {
                    Algorithm::Sample(histogram) => FilterOutput::Histogram {
                        colors: histogram.into_sorted(),
                    },
                    Algorithm::Point(_) | Algorithm::Convolve(_) => {
                        sink::commit_pixels(target, &buffer)?
                    }
                };
                Ok(self.finish(target, output))
            }
        }
    }

    fn finish(&mut self, target: &dyn Surface, output: FilterOutput) -> Advance {
        sink::reduce(target, &output, self.reducer.take());
        self.state = State::Complete;
        self.transition(Phase::Complete);
        Advance::Complete(output)
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("command", &self.command())
            .field("phase", &self.phase())
            .field("reducer", &self.reducer.is_some())
            .finish_non_exhaustive()
    }
}
