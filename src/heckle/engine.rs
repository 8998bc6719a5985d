//! Contracts for the collaborators the orchestrator drives: test discovery,
//! class resolution, the mutation engine, and test naming.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::suite::TestNode;
use super::target::{MethodCandidate, NodeKind, TargetClass};

/// One mutation of one method. Opaque beyond apply/revert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationTrial {
    /// Stable identifier, unique within a class.
    pub id: String,
    /// Mutated method.
    pub method: MethodCandidate,
    /// Kind of node the mutation alters.
    pub node: NodeKind,
    /// Human-readable description.
    pub description: String,
}

/// Mutation engine errors.
#[derive(Debug, Error)]
pub enum MutatorError {
    /// The mutation site no longer matches the source.
    #[error("mutation site for {trial} not found in {path}")]
    SiteNotFound {
        /// Trial id.
        trial: String,
        /// File that was searched.
        path: PathBuf,
    },
    /// Trial id is not known to this engine.
    #[error("unknown mutation trial: {0}")]
    UnknownTrial(String),
    /// Engine-specific failure.
    #[error("mutation engine failed: {0}")]
    Engine(String),
    /// IO failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Test discovery errors.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Pattern could not be parsed.
    #[error("invalid test pattern {pattern}: {message}")]
    InvalidPattern {
        /// Offending pattern.
        pattern: String,
        /// Parser message.
        message: String,
    },
    /// IO failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Loads the test tree matching a file pattern.
pub trait TestDiscovery {
    /// Discover all tests matching `pattern`.
    fn discover(&self, pattern: &str) -> Result<Vec<TestNode>, DiscoveryError>;
}

/// Resolves a class name to its method candidates.
pub trait ClassResolver {
    /// `None` when the class does not exist.
    fn resolve(&self, class_name: &str) -> Option<TargetClass>;
}

/// Mutation engine contract.
pub trait Mutator {
    /// Node kinds this engine can mutate; the default selection.
    fn supported_nodes(&self) -> Vec<NodeKind> {
        NodeKind::ALL.to_vec()
    }

    /// Trials for `method`, restricted to `nodes`.
    fn enumerate_trials(
        &mut self,
        target: &TargetClass,
        method: &MethodCandidate,
        nodes: &[NodeKind],
    ) -> Result<Vec<MutationTrial>, MutatorError>;

    /// Apply a trial to the code under test.
    fn apply(&mut self, trial: &MutationTrial) -> Result<(), MutatorError>;

    /// Undo a trial. Must be safe to call after a failed or partial apply.
    fn revert(&mut self, trial: &MutationTrial) -> Result<(), MutatorError>;
}

/// Maps a method to the pattern its tests are named after.
pub trait NamingConvention {
    /// Regex source matching the tests of `method`.
    fn method_to_test_pattern(&self, method: &MethodCandidate) -> String;
}
