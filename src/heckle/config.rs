//! Validation run configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::report::ReportFormat;
use super::target::NodeKind;

/// Default glob for test files, relative to the project directory.
pub const DEFAULT_TEST_PATTERN: &str = "test/test_*";

/// Configuration for a heckle run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeckleConfig {
    /// Project directory; test patterns and mutation sites resolve against it.
    pub project_dir: PathBuf,
    /// Glob selecting test files.
    pub test_pattern: String,
    /// Restrict a single-method run to that method's tests.
    pub focus: bool,
    /// Fixed timeout in seconds; `None` calibrates from the baseline.
    pub timeout_secs: Option<u64>,
    /// Node kinds to mutate; `None` uses everything the mutator supports.
    pub nodes: Option<Vec<NodeKind>>,
    /// Keep going when the baseline run fails.
    pub force: bool,
    /// Let test output through.
    pub verbose: bool,
    /// Report rendering.
    pub format: ReportFormat,
}

impl Default for HeckleConfig {
    fn default() -> Self {
        Self {
            project_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            test_pattern: DEFAULT_TEST_PATTERN.to_string(),
            focus: false,
            timeout_secs: None,
            nodes: None,
            force: false,
            verbose: false,
            format: ReportFormat::Console,
        }
    }
}

impl HeckleConfig {
    /// Set project directory.
    pub fn with_project_dir(mut self, project_dir: impl Into<PathBuf>) -> Self {
        self.project_dir = project_dir.into();
        self
    }

    /// Set test file glob.
    pub fn with_test_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.test_pattern = pattern.into();
        self
    }

    /// Enable or disable focus mode.
    pub fn with_focus(mut self, focus: bool) -> Self {
        self.focus = focus;
        self
    }

    /// Use a fixed timeout instead of calibrating.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }

    /// Restrict mutations to `nodes`.
    pub fn with_nodes(mut self, nodes: impl Into<Vec<NodeKind>>) -> Self {
        self.nodes = Some(nodes.into());
        self
    }

    /// Proceed past a failing baseline.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Show test output.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set report format.
    pub fn with_format(mut self, format: ReportFormat) -> Self {
        self.format = format;
        self
    }

    /// Test pattern joined onto the project directory.
    pub fn resolved_test_pattern(&self) -> String {
        let pattern = PathBuf::from(&self.test_pattern);
        if pattern.is_absolute() {
            self.test_pattern.clone()
        } else {
            self.project_dir.join(pattern).to_string_lossy().into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_builder_overrides_work() {
        let default = HeckleConfig::default();
        assert_eq!(default.test_pattern, DEFAULT_TEST_PATTERN);
        assert!(default.timeout_secs.is_none());
        assert!(!default.focus && !default.force && !default.verbose);

        let cfg = HeckleConfig::default()
            .with_project_dir("/tmp/project-a")
            .with_test_pattern("spec/*_test.sh")
            .with_focus(true)
            .with_timeout_secs(42)
            .with_nodes([NodeKind::If, NodeKind::Lit])
            .with_force(true)
            .with_format(ReportFormat::Json);

        assert_eq!(cfg.project_dir, PathBuf::from("/tmp/project-a"));
        assert_eq!(cfg.timeout_secs, Some(42));
        assert_eq!(cfg.nodes, Some(vec![NodeKind::If, NodeKind::Lit]));
        assert!(cfg.focus && cfg.force);
        assert_eq!(cfg.format, ReportFormat::Json);
        assert_eq!(
            cfg.resolved_test_pattern(),
            "/tmp/project-a/spec/*_test.sh".to_string()
        );
    }

    #[test]
    fn absolute_patterns_are_kept() {
        let cfg = HeckleConfig::default()
            .with_project_dir("/tmp/p")
            .with_test_pattern("/opt/tests/test_*");
        assert_eq!(cfg.resolved_test_pattern(), "/opt/tests/test_*");
    }
}
