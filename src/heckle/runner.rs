//! Top-level validation of one class: baseline, timeout calibration, then every
//! method's mutation trials in label order.

use std::io::{self, Write};
use std::time::Instant;

use log::{info, warn};
use thiserror::Error;

use super::calibrate::{TimeoutBound, TimeoutCalibrator};
use super::context::HeckleContext;
use super::engine::DiscoveryError;
use super::outcome::AggregateCounts;
use super::report::{HeckleSummary, MethodSummary, ReportFormat, render_header, render_json, render_results};
use super::target::{MethodCandidate, NodeKind};
use super::validator::MutationValidator;

/// Fatal orchestration errors. Per-trial failures never surface here.
#[derive(Debug, Error)]
pub enum HeckleError {
    /// Class could not be resolved.
    #[error("Unknown class: {0}")]
    UnknownClass(String),
    /// Method is not defined on the class (`Class#m` or `Class.m`).
    #[error("Unknown method: {0}")]
    UnknownMethod(String),
    /// Unmutated suite failed and `force` was not set.
    #[error("Initial run of tests failed... fix and run heckle again")]
    BaselineFailed,
    /// Tests could not be discovered.
    #[error("test discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),
    /// Run stopped by an interrupt request.
    #[error("validation interrupted")]
    Interrupted,
    /// Report could not be serialized.
    #[error("report error: {0}")]
    Report(#[from] serde_json::Error),
    /// Report could not be written.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Drives a full validation against a shared [`HeckleContext`].
pub struct ValidationOrchestrator<'a> {
    ctx: &'a mut HeckleContext,
    out: Box<dyn Write + 'a>,
}

impl<'a> ValidationOrchestrator<'a> {
    /// Orchestrator printing its report to stdout.
    pub fn new(ctx: &'a mut HeckleContext) -> Self {
        Self {
            ctx,
            out: Box::new(io::stdout()),
        }
    }

    /// Send the report somewhere else.
    pub fn with_output(mut self, out: impl Write + 'a) -> Self {
        self.out = Box::new(out);
        self
    }

    /// Validate `class_name` (or one method of it). True iff no mutation survived.
    /// `force` is combined with [`HeckleConfig::force`](super::HeckleConfig).
    pub fn validate(
        &mut self,
        class_name: &str,
        method_name: Option<&str>,
        nodes: Option<&[NodeKind]>,
        force: bool,
    ) -> Result<bool, HeckleError> {
        self.run(class_name, method_name, nodes, force)
            .map(|summary| summary.success())
    }

    /// Same as [`ValidationOrchestrator::validate`], returning the full summary.
    pub fn run(
        &mut self,
        class_name: &str,
        method_name: Option<&str>,
        nodes: Option<&[NodeKind]>,
        force: bool,
    ) -> Result<HeckleSummary, HeckleError> {
        self.ctx.ensure_tests_loaded()?;

        let target = self
            .ctx
            .resolver()
            .resolve(class_name)
            .ok_or_else(|| HeckleError::UnknownClass(class_name.to_string()))?;

        let selected = match method_name {
            Some(label) => {
                let method = MethodCandidate::parse(label);
                if !target.defines(&method) {
                    return Err(HeckleError::UnknownMethod(method.qualified(&target.name)));
                }
                Some(method)
            }
            None => None,
        };

        // Each invocation calibrates from an unbounded baseline.
        self.ctx.clear_timeout();
        let force = force || self.ctx.config().force;
        let started = Instant::now();
        let baseline = MutationValidator::baseline(self.ctx, &target)?.tests_pass();
        let elapsed = started.elapsed();
        let baseline_passed = match &baseline {
            Ok(outcome) => outcome.passed(),
            Err(err) => {
                warn!("baseline run errored: {err}");
                false
            }
        };

        if !baseline_passed {
            if !force {
                return Err(HeckleError::BaselineFailed);
            }
            warn!("initial tests failed, continuing because force is set");
        }

        let timeout = match self.ctx.config().timeout_secs {
            Some(secs) => TimeoutBound::fixed(secs),
            None => TimeoutCalibrator::calibrate(elapsed),
        };
        info!("baseline took {:.3}s, timeout {timeout}s", elapsed.as_secs_f64());
        self.ctx.set_timeout(timeout);

        let format = self.ctx.config().format;
        if format == ReportFormat::Console {
            self.out.write_all(render_header(timeout, baseline_passed).as_bytes())?;
            self.out.flush()?;
        }

        let methods = match &selected {
            Some(method) => vec![method.clone()],
            None => target.candidates(),
        };
        let nodes = nodes.map(<[NodeKind]>::to_vec);

        let mut counts = AggregateCounts::default();
        let mut breakdown = Vec::with_capacity(methods.len());
        for method in methods {
            if self.ctx.is_interrupted() {
                return Err(HeckleError::Interrupted);
            }

            let label = method.label();
            let qualified = method.qualified(&target.name);
            let trials =
                MutationValidator::new(self.ctx, &target, Some(method), nodes.clone())?.validate();
            if trials.is_empty() {
                info!("{qualified}: no mutatable nodes");
            }

            let method_counts: AggregateCounts = trials.iter().map(|t| t.outcome).collect();
            counts.extend(trials.iter().map(|t| t.outcome));
            breakdown.push(MethodSummary {
                method: label,
                counts: method_counts,
                trials,
            });
        }

        if self.ctx.is_interrupted() {
            return Err(HeckleError::Interrupted);
        }

        let summary = HeckleSummary {
            class_name: target.name.clone(),
            method: selected.as_ref().map(MethodCandidate::label),
            timeout,
            baseline_passed,
            counts,
            methods: breakdown,
        };

        match format {
            ReportFormat::Console => self.out.write_all(render_results(&counts).as_bytes())?,
            ReportFormat::Json => writeln!(self.out, "{}", render_json(&summary)?)?,
        }
        self.out.flush()?;

        Ok(summary)
    }
}
