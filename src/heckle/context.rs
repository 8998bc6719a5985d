//! Process-lifetime state shared by every validation: the loaded test tree with
//! its duration estimates, the calibrated timeout, the collaborators, and the
//! interrupt flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info};

use super::calibrate::TimeoutBound;
use super::config::HeckleConfig;
use super::engine::{ClassResolver, DiscoveryError, Mutator, NamingConvention, TestDiscovery};
use super::naming::TestNameMapping;
use super::scheduler::AdaptiveScheduler;
use super::target::NodeKind;

/// Owns everything that must outlive a single validation.
pub struct HeckleContext {
    config: HeckleConfig,
    discovery: Box<dyn TestDiscovery>,
    resolver: Box<dyn ClassResolver>,
    mutator: Box<dyn Mutator>,
    naming: Box<dyn NamingConvention>,
    scheduler: Option<AdaptiveScheduler>,
    timeout: Option<TimeoutBound>,
    interrupted: Arc<AtomicBool>,
}

impl HeckleContext {
    /// Assemble a context; tests are not loaded until first needed.
    pub fn new(
        config: HeckleConfig,
        discovery: impl TestDiscovery + 'static,
        resolver: impl ClassResolver + 'static,
        mutator: impl Mutator + 'static,
    ) -> Self {
        Self {
            config,
            discovery: Box::new(discovery),
            resolver: Box::new(resolver),
            mutator: Box::new(mutator),
            naming: Box::new(TestNameMapping),
            scheduler: None,
            timeout: None,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Replace the default naming convention.
    pub fn with_naming(mut self, naming: impl NamingConvention + 'static) -> Self {
        self.naming = Box::new(naming);
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &HeckleConfig {
        &self.config
    }

    /// True once test discovery has run.
    pub fn tests_loaded(&self) -> bool {
        self.scheduler.is_some()
    }

    /// Discover tests on first call; later calls reuse the same tree and estimates.
    pub fn ensure_tests_loaded(&mut self) -> Result<(), DiscoveryError> {
        if self.scheduler.is_some() {
            return Ok(());
        }
        let pattern = self.config.resolved_test_pattern();
        let tree = self.discovery.discover(&pattern)?;
        let scheduler = AdaptiveScheduler::new(tree).with_quiet(!self.config.verbose);
        info!("loaded {} tests from {pattern}", scheduler.test_count());
        self.scheduler = Some(scheduler);
        Ok(())
    }

    /// Shared scheduler, if tests are loaded.
    pub fn scheduler(&self) -> Option<&AdaptiveScheduler> {
        self.scheduler.as_ref()
    }

    /// Mutable shared scheduler, if tests are loaded.
    pub fn scheduler_mut(&mut self) -> Option<&mut AdaptiveScheduler> {
        self.scheduler.as_mut()
    }

    /// Class resolver.
    pub fn resolver(&self) -> &dyn ClassResolver {
        self.resolver.as_ref()
    }

    /// Naming convention used by focus mode.
    pub fn naming(&self) -> &dyn NamingConvention {
        self.naming.as_ref()
    }

    /// Node kinds to mutate: configured selection or the mutator's full set.
    pub fn default_nodes(&self) -> Vec<NodeKind> {
        self.config
            .nodes
            .clone()
            .unwrap_or_else(|| self.mutator.supported_nodes())
    }

    /// Timeout bound once calibrated or fixed.
    pub fn timeout(&self) -> Option<TimeoutBound> {
        self.timeout
    }

    /// Install the bound every later trial runs under.
    pub fn set_timeout(&mut self, bound: TimeoutBound) {
        debug!("timeout bound set to {bound}s");
        self.timeout = Some(bound);
    }

    /// Drop the bound so the next run is unlimited.
    pub fn clear_timeout(&mut self) {
        self.timeout = None;
    }

    /// Flag checked between trials; set it (e.g. from a Ctrl-C handler) to stop early.
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupted)
    }

    /// True if an interrupt was requested.
    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    /// Split borrow of the scheduler and mutator for a trial.
    pub(crate) fn trial_parts(
        &mut self,
    ) -> (Option<&mut AdaptiveScheduler>, &mut dyn Mutator, Option<TimeoutBound>) {
        (self.scheduler.as_mut(), self.mutator.as_mut(), self.timeout)
    }
}
