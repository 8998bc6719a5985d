//! Timeout bound derived from a measured baseline run.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Smallest bound ever handed out, in seconds.
pub const MIN_TIMEOUT_SECS: u64 = 5;

/// Execution time limit applied to every mutation trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeoutBound {
    secs: u64,
}

impl TimeoutBound {
    /// Externally configured bound; used as given.
    pub fn fixed(secs: u64) -> Self {
        Self { secs }
    }

    /// Bound in whole seconds.
    pub fn secs(&self) -> u64 {
        self.secs
    }

    /// Bound as a duration.
    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(self.secs)
    }
}

impl fmt::Display for TimeoutBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.secs)
    }
}

/// Turns baseline elapsed time into a [`TimeoutBound`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TimeoutCalibrator;

impl TimeoutCalibrator {
    /// Twice the baseline, rounded up, never below [`MIN_TIMEOUT_SECS`].
    pub fn bound_for_secs(elapsed_secs: f64) -> TimeoutBound {
        let doubled = elapsed_secs * 2.0;
        if !doubled.is_finite() || doubled < MIN_TIMEOUT_SECS as f64 {
            return TimeoutBound::fixed(MIN_TIMEOUT_SECS);
        }
        TimeoutBound::fixed(doubled.ceil() as u64)
    }

    /// Same as [`TimeoutCalibrator::bound_for_secs`] for a measured duration.
    pub fn calibrate(elapsed: Duration) -> TimeoutBound {
        Self::bound_for_secs(elapsed.as_secs_f64())
    }
}
