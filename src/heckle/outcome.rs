//! Trial outcomes and their aggregation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Classification of one mutation trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationOutcome {
    /// The suite failed with the mutation applied.
    Killed,
    /// The suite passed despite the mutation.
    Survived,
    /// Timed out or errored ("thick skin").
    Inconclusive,
}

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValidationOutcome::Killed => "killed",
            ValidationOutcome::Survived => "survived",
            ValidationOutcome::Inconclusive => "inconclusive",
        })
    }
}

/// Tri-state outcome counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateCounts {
    /// Trials the suite detected.
    pub killed: usize,
    /// Trials the suite missed.
    pub survived: usize,
    /// Trials without a clean verdict.
    pub inconclusive: usize,
}

impl AggregateCounts {
    /// Count one outcome.
    pub fn record(&mut self, outcome: ValidationOutcome) {
        match outcome {
            ValidationOutcome::Killed => self.killed += 1,
            ValidationOutcome::Survived => self.survived += 1,
            ValidationOutcome::Inconclusive => self.inconclusive += 1,
        }
    }

    /// Count for one outcome.
    pub fn get(&self, outcome: ValidationOutcome) -> usize {
        match outcome {
            ValidationOutcome::Killed => self.killed,
            ValidationOutcome::Survived => self.survived,
            ValidationOutcome::Inconclusive => self.inconclusive,
        }
    }

    /// Total recorded trials.
    pub fn total(&self) -> usize {
        self.killed + self.survived + self.inconclusive
    }

    /// Overall verdict: nothing survived. Inconclusive trials do not fail a class.
    pub fn all_good(&self) -> bool {
        self.survived == 0
    }
}

impl Extend<ValidationOutcome> for AggregateCounts {
    fn extend<I: IntoIterator<Item = ValidationOutcome>>(&mut self, iter: I) {
        for outcome in iter {
            self.record(outcome);
        }
    }
}

impl FromIterator<ValidationOutcome> for AggregateCounts {
    fn from_iter<I: IntoIterator<Item = ValidationOutcome>>(iter: I) -> Self {
        let mut counts = Self::default();
        counts.extend(iter);
        counts
    }
}
