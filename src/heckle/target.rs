//! Target classes, their method candidates, and mutatable node kinds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Prefix used to address class-level methods (`self.build`).
pub const CLASS_METHOD_PREFIX: &str = "self.";

/// Whether a method belongs to instances or to the class itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    /// Instance method, reported as `Class#name`.
    Instance,
    /// Class-level ("singleton") method, reported as `Class.name`.
    Class,
}

/// One method of a target class eligible for mutation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodCandidate {
    /// Bare method name, unique within its kind.
    pub name: String,
    /// Method kind.
    pub kind: MethodKind,
}

impl MethodCandidate {
    /// Instance method candidate.
    pub fn instance(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MethodKind::Instance,
        }
    }

    /// Class-level method candidate.
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MethodKind::Class,
        }
    }

    /// Parse a user-supplied method label; `self.foo` selects a class method.
    pub fn parse(label: &str) -> Self {
        match label.strip_prefix(CLASS_METHOD_PREFIX) {
            Some(name) => Self::class(name),
            None => Self::instance(label),
        }
    }

    /// Label used for sorting and naming: `foo` or `self.foo`.
    pub fn label(&self) -> String {
        match self.kind {
            MethodKind::Instance => self.name.clone(),
            MethodKind::Class => format!("{CLASS_METHOD_PREFIX}{}", self.name),
        }
    }

    /// Fully qualified name: `Class#foo` or `Class.foo`.
    pub fn qualified(&self, class_name: &str) -> String {
        match self.kind {
            MethodKind::Instance => format!("{class_name}#{}", self.name),
            MethodKind::Class => format!("{class_name}.{}", self.name),
        }
    }
}

impl fmt::Display for MethodCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// A class under validation and the methods it exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetClass {
    /// Class name.
    pub name: String,
    /// Instance method names.
    #[serde(default)]
    pub instance_methods: Vec<String>,
    /// Class-level method names.
    #[serde(default)]
    pub class_methods: Vec<String>,
}

impl TargetClass {
    /// Create an empty target.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instance_methods: Vec::new(),
            class_methods: Vec::new(),
        }
    }

    /// Add an instance method.
    pub fn with_instance_method(mut self, name: impl Into<String>) -> Self {
        self.instance_methods.push(name.into());
        self
    }

    /// Add a class-level method.
    pub fn with_class_method(mut self, name: impl Into<String>) -> Self {
        self.class_methods.push(name.into());
        self
    }

    /// True if the candidate is defined on this class with the same kind.
    pub fn defines(&self, candidate: &MethodCandidate) -> bool {
        let names = match candidate.kind {
            MethodKind::Instance => &self.instance_methods,
            MethodKind::Class => &self.class_methods,
        };
        names.iter().any(|name| *name == candidate.name)
    }

    /// All candidates, instance and class-level, sorted by label.
    pub fn candidates(&self) -> Vec<MethodCandidate> {
        let mut all: Vec<MethodCandidate> = self
            .instance_methods
            .iter()
            .map(MethodCandidate::instance)
            .chain(self.class_methods.iter().map(MethodCandidate::class))
            .collect();
        all.sort_by_key(MethodCandidate::label);
        all.dedup();
        all
    }
}

/// AST node kinds a mutator may alter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Method calls and operators.
    Call,
    /// Numeric and symbol literals.
    Lit,
    /// String literals.
    Str,
    /// `true` literal.
    True,
    /// `false` literal.
    False,
    /// Conditionals.
    If,
    /// `while` loops.
    While,
    /// `until` loops.
    Until,
    /// Local and instance variable assignments.
    Asgn,
}

impl NodeKind {
    /// Every node kind, in declaration order.
    pub const ALL: [NodeKind; 9] = [
        NodeKind::Call,
        NodeKind::Lit,
        NodeKind::Str,
        NodeKind::True,
        NodeKind::False,
        NodeKind::If,
        NodeKind::While,
        NodeKind::Until,
        NodeKind::Asgn,
    ];

    /// Short lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Call => "call",
            NodeKind::Lit => "lit",
            NodeKind::Str => "str",
            NodeKind::True => "true",
            NodeKind::False => "false",
            NodeKind::If => "if",
            NodeKind::While => "while",
            NodeKind::Until => "until",
            NodeKind::Asgn => "asgn",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        NodeKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| format!("unknown node kind: {s}"))
    }
}
