//! Adaptive fail-fast test scheduling.
//!
//! Tests run fastest-first according to a per-test duration estimate that lives
//! for the whole process. Before a test runs its estimate is halved, so a test
//! that fails keeps a low estimate and is tried early next time; a test that
//! completes gets its estimate overwritten with the measured duration. The first
//! fault cancels the rest of the run.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, trace, warn};
use regex::Regex;
use thiserror::Error;

use super::suite::{
    OutputGate, TestCase, TestContext, TestFault, TestNode, flatten, install_panic_filter,
};

/// Factor applied to an estimate right before its test runs.
pub const PRE_DECAY: f64 = 0.5;

/// Errors that abort a run without a verdict.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Run exceeded its time bound.
    #[error("test run exceeded {bound:?} while running {test}")]
    Timeout {
        /// Test that was running at expiry.
        test: String,
        /// Bound that was exceeded.
        bound: Duration,
    },
    /// Worker thread could not be started.
    #[error("failed to spawn test worker: {0}")]
    WorkerSpawn(#[from] std::io::Error),
    /// Worker thread vanished without reporting.
    #[error("test worker for {0} exited without a result")]
    WorkerLost(String),
    /// No test tree has been discovered yet.
    #[error("tests have not been loaded")]
    NotLoaded,
}

/// Result of one scheduler run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Every selected test executed without fault.
    pub completed: bool,
    /// A fault cancelled the run.
    pub failure_detected: bool,
    /// Tests that executed, including the faulting one.
    pub executed: usize,
    /// Tests that never ran because of cancellation.
    pub skipped: usize,
    /// The fault that cancelled the run.
    pub fault: Option<TestFault>,
}

impl RunOutcome {
    /// True if the suite passed.
    pub fn passed(&self) -> bool {
        self.completed && !self.failure_detected
    }
}

/// Per-test duration estimates in seconds, defaulting to zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DurationTable {
    estimates: HashMap<String, f64>,
}

impl DurationTable {
    /// Current estimate for `test`.
    pub fn get(&self, test: &str) -> f64 {
        self.estimates.get(test).copied().unwrap_or(0.0)
    }

    /// Overwrite the estimate for `test`.
    pub fn record(&mut self, test: &str, seconds: f64) {
        self.estimates.insert(test.to_string(), seconds.max(0.0));
    }

    fn decay(&mut self, test: &str) {
        let decayed = self.get(test) * PRE_DECAY;
        self.estimates.insert(test.to_string(), decayed);
    }

    /// Number of tests with an estimate.
    pub fn len(&self) -> usize {
        self.estimates.len()
    }

    /// True if no test has run yet.
    pub fn is_empty(&self) -> bool {
        self.estimates.is_empty()
    }
}

/// Runs a discovered test tree fastest-first and stops at the first fault.
#[derive(Debug)]
pub struct AdaptiveScheduler {
    tree: Vec<TestNode>,
    durations: DurationTable,
    gate: OutputGate,
    quiet: bool,
}

impl AdaptiveScheduler {
    /// Build a scheduler over a discovered tree.
    pub fn new(tree: Vec<TestNode>) -> Self {
        Self {
            tree,
            durations: DurationTable::default(),
            gate: OutputGate::default(),
            quiet: true,
        }
    }

    /// Let test output through instead of suppressing it.
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Duration estimates.
    pub fn durations(&self) -> &DurationTable {
        &self.durations
    }

    /// Mutable duration estimates.
    pub fn durations_mut(&mut self) -> &mut DurationTable {
        &mut self.durations
    }

    /// Output gate shared with every test context.
    pub fn output_gate(&self) -> &OutputGate {
        &self.gate
    }

    /// Number of test cases in the tree.
    pub fn test_count(&self) -> usize {
        flatten(&self.tree).len()
    }

    /// Tests in the order the next run would execute them.
    pub fn execution_order(&self, filter: Option<&Regex>) -> Vec<&TestCase> {
        let mut order: Vec<&TestCase> = flatten(&self.tree)
            .into_iter()
            .filter(|case| filter.is_none_or(|re| re.is_match(case.name())))
            .collect();
        // Stable: equal estimates keep discovery order.
        order.sort_by(|a, b| {
            self.durations
                .get(a.name())
                .total_cmp(&self.durations.get(b.name()))
        });
        order
    }

    /// Execute one run. `bound` limits the whole run; `None` waits indefinitely.
    pub fn run(
        &mut self,
        filter: Option<&Regex>,
        bound: Option<Duration>,
    ) -> Result<RunOutcome, SchedulerError> {
        if self.quiet {
            install_panic_filter();
        }
        let _silenced = self.quiet.then(|| self.gate.silence());

        let order: Vec<TestCase> = self
            .execution_order(filter)
            .into_iter()
            .cloned()
            .collect();
        let total = order.len();
        let deadline = bound.map(|bound| (Instant::now() + bound, bound));
        debug!("running {total} tests");

        for (idx, case) in order.iter().enumerate() {
            self.durations.decay(case.name());
            let started = Instant::now();

            match self.execute(case, deadline)? {
                ControlFlow::Break(fault) => {
                    debug!("fault in {}, cancelling run: {}", case.name(), fault.message);
                    return Ok(RunOutcome {
                        completed: false,
                        failure_detected: true,
                        executed: idx + 1,
                        skipped: total - idx - 1,
                        fault: Some(fault),
                    });
                }
                ControlFlow::Continue(()) => {
                    let elapsed = started.elapsed().as_secs_f64();
                    trace!("{} passed in {elapsed:.4}s", case.name());
                    self.durations.record(case.name(), elapsed);
                }
            }
        }

        Ok(RunOutcome {
            completed: true,
            failure_detected: false,
            executed: total,
            skipped: 0,
            fault: None,
        })
    }

    /// Run one test body on a watchdog-supervised worker.
    fn execute(
        &self,
        case: &TestCase,
        deadline: Option<(Instant, Duration)>,
    ) -> Result<ControlFlow<TestFault>, SchedulerError> {
        let (tx, rx) = mpsc::channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let ctx = TestContext::new(self.gate.clone(), Arc::clone(&cancelled));
        let body = case.body();
        let name = case.name().to_string();

        thread::Builder::new()
            .name(format!("heckle-test-{name}"))
            .spawn(move || {
                ctx.bind_to_current_thread();
                let result = panic::catch_unwind(AssertUnwindSafe(|| body(&ctx)))
                    .unwrap_or_else(|payload| Err(TestFault::from_panic(&name, payload)));
                let _ = tx.send(result);
            })?;

        let received = match deadline {
            Some((at, bound)) => {
                let remaining = at.saturating_duration_since(Instant::now());
                match rx.recv_timeout(remaining) {
                    Ok(result) => result,
                    Err(RecvTimeoutError::Timeout) => {
                        cancelled.store(true, Ordering::SeqCst);
                        warn!("{} exceeded the {bound:?} bound, abandoning it", case.name());
                        return Err(SchedulerError::Timeout {
                            test: case.name().to_string(),
                            bound,
                        });
                    }
                    Err(RecvTimeoutError::Disconnected) => {
                        return Err(SchedulerError::WorkerLost(case.name().to_string()));
                    }
                }
            }
            None => rx
                .recv()
                .map_err(|_| SchedulerError::WorkerLost(case.name().to_string()))?,
        };

        Ok(match received {
            Ok(()) => ControlFlow::Continue(()),
            Err(fault) => ControlFlow::Break(fault),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    type Log = Arc<Mutex<Vec<String>>>;

    fn recording(name: &str, log: &Log, fail: bool) -> TestNode {
        let log = Arc::clone(log);
        let owned = name.to_string();
        TestNode::case(name, move |_| {
            log.lock().expect("log lock").push(owned.clone());
            if fail {
                Err(TestFault::new(owned.clone(), "assertion failed"))
            } else {
                Ok(())
            }
        })
    }

    fn ran(log: &Log) -> Vec<String> {
        log.lock().expect("log lock").clone()
    }

    #[test]
    fn orders_by_estimate_with_stable_ties() {
        let log: Log = Arc::default();
        let mut scheduler = AdaptiveScheduler::new(vec![
            recording("a", &log, false),
            recording("b", &log, false),
            recording("c", &log, false),
        ]);
        scheduler.durations_mut().record("a", 0.4);
        scheduler.durations_mut().record("b", 0.1);
        scheduler.durations_mut().record("c", 0.1);

        let order: Vec<&str> = scheduler
            .execution_order(None)
            .iter()
            .map(|c| c.name())
            .collect();
        assert_eq!(order, vec!["b", "c", "a"]);

        let outcome = scheduler.run(None, None).expect("run should finish");
        assert!(outcome.passed());
        assert_eq!(ran(&log), vec!["b", "c", "a"]);
    }

    #[test]
    fn unrun_tests_sort_ahead_in_discovery_order() {
        let log: Log = Arc::default();
        let mut scheduler = AdaptiveScheduler::new(vec![
            recording("slow", &log, false),
            TestNode::Group(vec![recording("x", &log, false), recording("y", &log, false)]),
        ]);
        scheduler.durations_mut().record("slow", 3.0);

        scheduler.run(None, None).expect("run should finish");
        assert_eq!(ran(&log), vec!["x", "y", "slow"]);
    }

    #[test]
    fn first_fault_cancels_remaining_tests() {
        let log: Log = Arc::default();
        let mut scheduler = AdaptiveScheduler::new(vec![
            recording("first", &log, false),
            recording("second", &log, true),
            recording("third", &log, false),
            recording("fourth", &log, false),
        ]);

        let outcome = scheduler.run(None, None).expect("run should finish");
        assert!(outcome.failure_detected);
        assert!(!outcome.completed);
        assert_eq!(outcome.executed, 2);
        assert_eq!(outcome.skipped, 2);
        assert_eq!(outcome.fault.map(|f| f.test), Some("second".to_string()));
        assert_eq!(ran(&log), vec!["first", "second"]);
        assert!(!scheduler.output_gate().is_silenced());
    }

    #[test]
    fn panicking_test_counts_as_fault() {
        let mut scheduler = AdaptiveScheduler::new(vec![TestNode::case("boom", |_| {
            panic!("kaboom");
        })]);

        let outcome = scheduler.run(None, None).expect("run should finish");
        assert!(outcome.failure_detected);
        assert_eq!(outcome.fault.map(|f| f.message), Some("kaboom".to_string()));
        assert!(!scheduler.output_gate().is_silenced());
    }

    #[test]
    fn failing_assertion_is_silenced_inside_the_worker() {
        let seen = Arc::new(AtomicBool::new(false));
        let witness = Arc::clone(&seen);
        let mut scheduler = AdaptiveScheduler::new(vec![TestNode::case("assert", move |ctx| {
            witness.store(ctx.is_silenced(), Ordering::SeqCst);
            assert!(!ctx.is_silenced(), "mutant changed the result");
            Ok(())
        })]);

        let outcome = scheduler.run(None, None).expect("run should finish");
        assert!(seen.load(Ordering::SeqCst));
        assert_eq!(
            outcome.fault.map(|f| f.message),
            Some("mutant changed the result".to_string())
        );
        assert!(!scheduler.output_gate().is_silenced());
    }

    #[test]
    fn faulting_test_keeps_pre_decayed_estimate() {
        let log: Log = Arc::default();
        let mut scheduler = AdaptiveScheduler::new(vec![recording("flaky", &log, true)]);
        scheduler.durations_mut().record("flaky", 2.0);

        scheduler.run(None, None).expect("run should finish");
        assert_eq!(scheduler.durations().get("flaky"), 1.0);
    }

    #[test]
    fn passing_test_estimate_is_overwritten_with_measurement() {
        let mut scheduler = AdaptiveScheduler::new(vec![TestNode::case("quick", |_| Ok(()))]);
        scheduler.durations_mut().record("quick", 2.0);

        scheduler.run(None, None).expect("run should finish");
        let estimate = scheduler.durations().get("quick");
        // Neither the decayed value nor an average of it with the measurement.
        assert!(estimate < 0.5, "estimate should be the raw measurement, got {estimate}");
    }

    #[test]
    fn timed_out_run_reports_timeout_and_scheduler_stays_usable() {
        let log: Log = Arc::default();
        let mut scheduler = AdaptiveScheduler::new(vec![
            recording("fast", &log, false),
            TestNode::case("hang", |ctx| {
                while !ctx.is_cancelled() {
                    thread::sleep(Duration::from_millis(5));
                }
                Ok(())
            }),
        ]);
        scheduler.durations_mut().record("hang", 2.0);

        let err = scheduler
            .run(None, Some(Duration::from_millis(100)))
            .expect_err("hanging test should time out");
        assert!(matches!(err, SchedulerError::Timeout { ref test, .. } if test == "hang"));
        assert_eq!(scheduler.durations().get("hang"), 1.0);
        assert!(!scheduler.output_gate().is_silenced());

        let filter = Regex::new("fast").expect("valid regex");
        let outcome = scheduler
            .run(Some(&filter), Some(Duration::from_secs(5)))
            .expect("scheduler should still run");
        assert!(outcome.passed());
    }

    #[test]
    fn filter_restricts_executed_tests() {
        let log: Log = Arc::default();
        let mut scheduler = AdaptiveScheduler::new(vec![
            recording("test_add", &log, false),
            recording("test_sub", &log, true),
            recording("test_add_negative", &log, false),
        ]);

        let filter = Regex::new("test_add").expect("valid regex");
        let outcome = scheduler.run(Some(&filter), None).expect("run should finish");
        assert!(outcome.passed());
        assert_eq!(outcome.executed, 2);
        assert_eq!(ran(&log), vec!["test_add", "test_add_negative"]);
    }

    #[test]
    fn output_is_silenced_only_during_run() {
        let seen = Arc::new(AtomicBool::new(false));
        let witness = Arc::clone(&seen);
        let mut scheduler = AdaptiveScheduler::new(vec![TestNode::case("gate", move |ctx| {
            witness.store(ctx.is_silenced(), Ordering::SeqCst);
            Ok(())
        })]);

        scheduler.run(None, None).expect("run should finish");
        assert!(seen.load(Ordering::SeqCst));
        assert!(!scheduler.output_gate().is_silenced());
    }
}
