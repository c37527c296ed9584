//! Lifecycle notifications emitted by the [`Workbench`](crate::Workbench).
//!
//! Every operation that makes it into a queue produces exactly one
//! `Start`, zero or more `Progress` in ascending order, and then exactly
//! one of `Complete` or `Failed`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::options::Command;
use crate::types::{FilterError, TargetId};

/// One lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FilterEvent {
    /// The operation became active on its target.
    Start {
        /// Target the operation runs against.
        target: TargetId,
        /// Command being run.
        filter: Command,
    },
    /// A slice ended before the region was finished.
    Progress {
        /// Target the operation runs against.
        target: TargetId,
        /// Command being run.
        filter: Command,
        /// Completed fraction in `[0, 1)`.
        f: f64,
    },
    /// The result was committed and the reducer ran.
    Complete {
        /// Target the operation ran against.
        target: TargetId,
        /// Command that ran.
        filter: Command,
        /// Wall time from start to completion.
        #[serde(with = "crate::clock::duration_millis")]
        time: Duration,
        /// Jobs still queued on this target.
        pending: usize,
    },
    /// The operation stopped with an error; the queue moved on.
    Failed {
        /// Target the operation ran against.
        target: TargetId,
        /// Command that failed.
        filter: Command,
        /// What went wrong.
        error: FilterError,
    },
}

impl FilterEvent {
    /// The target this event concerns.
    #[must_use]
    pub const fn target(&self) -> TargetId {
        match self {
            Self::Start { target, .. }
            | Self::Progress { target, .. }
            | Self::Complete { target, .. }
            | Self::Failed { target, .. } => *target,
        }
    }

    /// The command this event concerns.
    #[must_use]
    pub const fn filter(&self) -> Command {
        match self {
            Self::Start { filter, .. }
            | Self::Progress { filter, .. }
            | Self::Complete { filter, .. }
            | Self::Failed { filter, .. } => *filter,
        }
    }

    /// Whether this event ends an operation.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Failed { .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn complete_serializes_time_as_millis() {
        let event = FilterEvent::Complete {
            target: TargetId::new(1),
            filter: Command::Blur,
            time: Duration::from_micros(12_900),
            pending: 2,
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"event": "complete", "target": 1, "filter": "blur", "time": 12, "pending": 2})
        );
    }

    #[test]
    fn failed_carries_error() {
        let event = FilterEvent::Failed {
            target: TargetId::new(4),
            filter: Command::Negate,
            error: FilterError::UnsupportedTarget("no pixels".to_owned()),
        };
        assert!(event.is_terminal());
        assert_eq!(event.target(), TargetId::new(4));
        assert_eq!(event.filter(), Command::Negate);
        let back: FilterEvent =
            serde_json::from_value(serde_json::to_value(&event).unwrap()).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn progress_is_not_terminal() {
        let event = FilterEvent::Progress {
            target: TargetId::new(0),
            filter: Command::Sharpen,
            f: 0.5,
        };
        assert!(!event.is_terminal());
    }
}
