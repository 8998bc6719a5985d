//! JSON manifest describing target classes and textual mutation sites.
//!
//! ```json
//! {
//!   "classes": [{
//!     "name": "Calculator",
//!     "instance_methods": ["add"],
//!     "class_methods": ["zero"],
//!     "mutations": [
//!       { "method": "add", "node": "call", "file": "src/calc.rs", "find": "a + b", "replace": "a - b" }
//!     ]
//!   }]
//! }
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::engine::{ClassResolver, MutationTrial, Mutator, MutatorError};
use super::target::{MethodCandidate, NodeKind, TargetClass};

/// Manifest loading errors.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// IO failure.
    #[error("io error reading {path}: {source}")]
    Io {
        /// Manifest path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// Malformed JSON.
    #[error("invalid manifest: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Replace the first occurrence of `find` in `file` with `replace`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationSite {
    /// Method label (`add` or `self.zero`).
    pub method: String,
    /// Node kind the edit represents.
    pub node: NodeKind,
    /// File, relative to the project directory.
    pub file: PathBuf,
    /// Original text.
    pub find: String,
    /// Mutated text.
    pub replace: String,
}

impl MutationSite {
    fn describe(&self) -> String {
        format!(
            "{}: replace `{}` with `{}`",
            self.file.display(),
            self.find,
            self.replace
        )
    }
}

/// A class plus its mutation sites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestClass {
    /// Class and methods.
    #[serde(flatten)]
    pub target: TargetClass,
    /// Mutation sites, in enumeration order.
    #[serde(default)]
    pub mutations: Vec<MutationSite>,
}

/// Parsed manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Declared classes.
    pub classes: Vec<ManifestClass>,
}

impl Manifest {
    /// Parse a manifest file.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let raw = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Parse manifest JSON.
    pub fn from_json(raw: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(raw)?)
    }

    fn class(&self, name: &str) -> Option<&ManifestClass> {
        self.classes.iter().find(|class| class.target.name == name)
    }
}

impl ClassResolver for Manifest {
    fn resolve(&self, class_name: &str) -> Option<TargetClass> {
        self.class(class_name).map(|class| class.target.clone())
    }
}

/// Applies manifest sites by rewriting files in place and restores them on revert.
#[derive(Debug)]
pub struct ManifestMutator {
    manifest: Manifest,
    root: PathBuf,
    known: HashMap<String, MutationSite>,
    originals: HashMap<String, (PathBuf, String)>,
}

impl ManifestMutator {
    /// Mutator over `manifest`, resolving site files against `root`.
    pub fn new(manifest: Manifest, root: impl Into<PathBuf>) -> Self {
        Self {
            manifest,
            root: root.into(),
            known: HashMap::new(),
            originals: HashMap::new(),
        }
    }
}

impl Mutator for ManifestMutator {
    fn enumerate_trials(
        &mut self,
        target: &TargetClass,
        method: &MethodCandidate,
        nodes: &[NodeKind],
    ) -> Result<Vec<MutationTrial>, MutatorError> {
        let Some(class) = self.manifest.class(&target.name) else {
            return Ok(Vec::new());
        };

        let mut trials = Vec::new();
        for (idx, site) in class.mutations.iter().enumerate() {
            if MethodCandidate::parse(&site.method) != *method || !nodes.contains(&site.node) {
                continue;
            }
            let id = format!("{}:{idx}", method.qualified(&target.name));
            self.known.insert(id.clone(), site.clone());
            trials.push(MutationTrial {
                id,
                method: method.clone(),
                node: site.node,
                description: site.describe(),
            });
        }
        Ok(trials)
    }

    fn apply(&mut self, trial: &MutationTrial) -> Result<(), MutatorError> {
        let site = self
            .known
            .get(&trial.id)
            .ok_or_else(|| MutatorError::UnknownTrial(trial.id.clone()))?;
        let path = self.root.join(&site.file);
        let text = fs::read_to_string(&path)?;
        if !text.contains(&site.find) {
            return Err(MutatorError::SiteNotFound {
                trial: trial.id.clone(),
                path,
            });
        }

        let mutated = text.replacen(&site.find, &site.replace, 1);
        self.originals.insert(trial.id.clone(), (path.clone(), text));
        debug!("writing mutant {} to {}", trial.id, path.display());
        fs::write(&path, mutated)?;
        Ok(())
    }

    fn revert(&mut self, trial: &MutationTrial) -> Result<(), MutatorError> {
        if let Some((path, text)) = self.originals.remove(&trial.id) {
            fs::write(&path, text)?;
        }
        Ok(())
    }
}
