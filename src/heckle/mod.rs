//! Mutation validation: adaptive test scheduling, timeout calibration, and
//! per-method mutation trials aggregated into a pass/fail verdict.

pub mod calibrate;
pub mod config;
pub mod context;
pub mod discovery;
pub mod engine;
#[cfg(feature = "cli")]
#[cfg_attr(docsrs, doc(cfg(feature = "cli")))]
pub mod logging;
pub mod manifest;
pub mod naming;
pub mod outcome;
pub mod report;
pub mod runner;
pub mod scheduler;
pub mod suite;
pub mod target;
pub mod validator;

pub use calibrate::{TimeoutBound, TimeoutCalibrator};
pub use config::HeckleConfig;
pub use context::HeckleContext;
pub use discovery::GlobDiscovery;
pub use engine::{
    ClassResolver, DiscoveryError, MutationTrial, Mutator, MutatorError, NamingConvention,
    TestDiscovery,
};
pub use manifest::{Manifest, ManifestError, ManifestMutator};
pub use naming::TestNameMapping;
pub use outcome::{AggregateCounts, ValidationOutcome};
pub use report::{HeckleSummary, MethodSummary, ReportFormat};
pub use runner::{HeckleError, ValidationOrchestrator};
pub use scheduler::{AdaptiveScheduler, DurationTable, RunOutcome, SchedulerError};
pub use suite::{TestCase, TestContext, TestFault, TestNode};
pub use target::{MethodCandidate, MethodKind, NodeKind, TargetClass};
pub use validator::{MutationValidator, TrialReport};
