//! Per-method mutation validation.

use std::panic::{self, AssertUnwindSafe};

use log::{debug, error, info, warn};
use regex::Regex;
use serde::Serialize;

use super::context::HeckleContext;
use super::engine::{DiscoveryError, MutationTrial, MutatorError};
use super::outcome::ValidationOutcome;
use super::scheduler::{RunOutcome, SchedulerError};
use super::target::{MethodCandidate, NodeKind, TargetClass};

/// Verdict for one mutation trial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrialReport {
    /// Trial id.
    pub id: String,
    /// Mutated node kind, if enumeration got that far.
    pub node: Option<NodeKind>,
    /// Trial description.
    pub description: String,
    /// Classification.
    pub outcome: ValidationOutcome,
    /// Why the trial was inconclusive, or which test killed it.
    pub detail: Option<String>,
}

/// Classify one trial from its apply, run, and revert results.
pub fn classify_trial(
    applied: &Result<(), MutatorError>,
    run: Option<&Result<RunOutcome, SchedulerError>>,
    reverted: &Result<(), MutatorError>,
) -> (ValidationOutcome, Option<String>) {
    if let Err(err) = applied {
        return (ValidationOutcome::Inconclusive, Some(format!("apply failed: {err}")));
    }
    if let Err(err) = reverted {
        return (ValidationOutcome::Inconclusive, Some(format!("revert failed: {err}")));
    }
    match run {
        Some(Ok(outcome)) if outcome.failure_detected => (
            ValidationOutcome::Killed,
            outcome.fault.as_ref().map(|fault| fault.to_string()),
        ),
        Some(Ok(_)) => (ValidationOutcome::Survived, None),
        Some(Err(err)) => (ValidationOutcome::Inconclusive, Some(err.to_string())),
        None => (
            ValidationOutcome::Inconclusive,
            Some("suite did not run".to_string()),
        ),
    }
}

fn guarded<F>(what: &str, op: F) -> Result<(), MutatorError>
where
    F: FnOnce() -> Result<(), MutatorError>,
{
    panic::catch_unwind(AssertUnwindSafe(op))
        .unwrap_or_else(|_| Err(MutatorError::Engine(format!("mutator panicked during {what}"))))
}

/// Runs every trial for one method of a target class.
pub struct MutationValidator<'a> {
    ctx: &'a mut HeckleContext,
    target: &'a TargetClass,
    method: Option<MethodCandidate>,
    nodes: Vec<NodeKind>,
}

impl<'a> MutationValidator<'a> {
    /// Validator for `method`; `None` only checks the unmutated suite.
    /// Loads tests into the context on first use.
    pub fn new(
        ctx: &'a mut HeckleContext,
        target: &'a TargetClass,
        method: Option<MethodCandidate>,
        nodes: Option<Vec<NodeKind>>,
    ) -> Result<Self, DiscoveryError> {
        ctx.ensure_tests_loaded()?;
        let nodes = nodes.unwrap_or_else(|| ctx.default_nodes());
        Ok(Self {
            ctx,
            target,
            method,
            nodes,
        })
    }

    /// Validator that applies nothing.
    pub fn baseline(
        ctx: &'a mut HeckleContext,
        target: &'a TargetClass,
    ) -> Result<Self, DiscoveryError> {
        Self::new(ctx, target, None, None)
    }

    /// Targeted method, if any.
    pub fn method(&self) -> Option<&MethodCandidate> {
        self.method.as_ref()
    }

    fn focus_filter(&self) -> Option<Regex> {
        if !self.ctx.config().focus {
            return None;
        }
        let method = self.method.as_ref()?;
        let pattern = self.ctx.naming().method_to_test_pattern(method);
        match Regex::new(&pattern) {
            Ok(re) => Some(re),
            Err(err) => {
                warn!("ignoring focus pattern /{pattern}/ for {method}: {err}");
                None
            }
        }
    }

    /// Run the suite once under the current timeout bound.
    pub fn tests_pass(&mut self) -> Result<RunOutcome, SchedulerError> {
        let filter = self.focus_filter();
        let bound = self.ctx.timeout().map(|t| t.as_duration());
        let scheduler = self.ctx.scheduler_mut().ok_or(SchedulerError::NotLoaded)?;
        scheduler.run(filter.as_ref(), bound)
    }

    /// Apply, test, and revert every trial of the method, in enumeration order.
    pub fn validate(&mut self) -> Vec<TrialReport> {
        let Some(method) = self.method.clone() else {
            return Vec::new();
        };
        let qualified = method.qualified(&self.target.name);
        let filter = self.focus_filter();

        let trials = {
            let (_, mutator, _) = self.ctx.trial_parts();
            mutator.enumerate_trials(self.target, &method, &self.nodes)
        };
        let trials = match trials {
            Ok(trials) => trials,
            Err(err) => {
                error!("could not enumerate mutations for {qualified}: {err}");
                return vec![TrialReport {
                    id: format!("{qualified}:enumerate"),
                    node: None,
                    description: "mutation enumeration".to_string(),
                    outcome: ValidationOutcome::Inconclusive,
                    detail: Some(err.to_string()),
                }];
            }
        };
        debug!("{qualified}: {} mutation trials", trials.len());

        let mut reports = Vec::with_capacity(trials.len());
        for trial in trials {
            if self.ctx.is_interrupted() {
                warn!("interrupted, skipping remaining trials for {qualified}");
                break;
            }
            reports.push(self.run_trial(trial, filter.as_ref()));
        }
        reports
    }

    fn run_trial(&mut self, trial: MutationTrial, filter: Option<&Regex>) -> TrialReport {
        let (scheduler, mutator, timeout) = self.ctx.trial_parts();
        info!("{}: {}", trial.id, trial.description);

        let applied = guarded("apply", || mutator.apply(&trial));
        let run = match &applied {
            Ok(()) => Some(match scheduler {
                Some(scheduler) => scheduler.run(filter, timeout.map(|t| t.as_duration())),
                None => Err(SchedulerError::NotLoaded),
            }),
            Err(_) => None,
        };
        let reverted = guarded("revert", || mutator.revert(&trial));
        if let Err(err) = &reverted {
            error!("{} could not be reverted, source may still be mutated: {err}", trial.id);
        }

        let (outcome, detail) = classify_trial(&applied, run.as_ref(), &reverted);
        match outcome {
            ValidationOutcome::Survived => warn!("{} survived: {}", trial.id, trial.description),
            _ => debug!("{} {outcome}", trial.id),
        }

        TrialReport {
            id: trial.id,
            node: Some(trial.node),
            description: trial.description,
            outcome,
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::heckle::suite::TestFault;

    fn outcome(failure_detected: bool) -> RunOutcome {
        RunOutcome {
            completed: !failure_detected,
            failure_detected,
            executed: 1,
            skipped: 0,
            fault: failure_detected.then(|| TestFault::new("test_add", "expected 3")),
        }
    }

    #[test]
    fn detected_failure_is_killed() {
        let (verdict, detail) = classify_trial(&Ok(()), Some(&Ok(outcome(true))), &Ok(()));
        assert_eq!(verdict, ValidationOutcome::Killed);
        assert_eq!(detail.as_deref(), Some("test_add: expected 3"));
    }

    #[test]
    fn clean_run_is_survived() {
        let (verdict, _) = classify_trial(&Ok(()), Some(&Ok(outcome(false))), &Ok(()));
        assert_eq!(verdict, ValidationOutcome::Survived);
    }

    #[test]
    fn timeouts_and_mutator_errors_are_inconclusive() {
        let timeout = Err(SchedulerError::Timeout {
            test: "test_add".to_string(),
            bound: Duration::from_secs(5),
        });
        assert_eq!(
            classify_trial(&Ok(()), Some(&timeout), &Ok(())).0,
            ValidationOutcome::Inconclusive
        );

        let apply_err = Err(MutatorError::Engine("bad site".to_string()));
        assert_eq!(
            classify_trial(&apply_err, None, &Ok(())).0,
            ValidationOutcome::Inconclusive
        );

        let revert_err = Err(MutatorError::Engine("cannot restore".to_string()));
        let (verdict, detail) = classify_trial(&Ok(()), Some(&Ok(outcome(true))), &revert_err);
        assert_eq!(verdict, ValidationOutcome::Inconclusive);
        assert!(detail.is_some_and(|d| d.starts_with("revert failed")));
    }

    #[test]
    fn panicking_mutator_is_contained() {
        let result = guarded("apply", || panic!("engine blew up"));
        assert!(matches!(result, Err(MutatorError::Engine(msg)) if msg.contains("apply")));
    }
}
