//! Diagnostics collected while parsing and building.
//!
//! Nothing in here aborts a run. Every defect is recorded with the line it came
//! from and the caller decides what to do with the list afterwards.

use crate::loc::Loc;

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VariableError {
    #[error("empty variable name")]
    EmptyName,

    #[error("invalid variable name `{0}`")]
    InvalidName(String),

    #[error("variable name `{name}` too long (max {max} chars)")]
    NameTooLong { name: String, max: usize },

    #[error("value of `{name}` too long (max {max} chars)")]
    ValueTooLong { name: String, max: usize },

    #[error("too many variables (max {0})")]
    TooMany(usize),

    #[error("undefined variable `{0}`")]
    Undefined(String),

    #[error("unclosed variable reference `{0}`")]
    Unclosed(String),

    #[error("variable expansion nested too deeply (max depth {0})")]
    DepthExceeded(usize),

    #[error("expanded string too long (max {0} chars)")]
    Overflow(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("invalid line: `{0}`")]
    InvalidLine(String),

    #[error("empty target name")]
    EmptyTarget,

    #[error("duplicate target `{0}`")]
    DuplicateTarget(String),

    #[error("target name `{name}` too long (max {max} chars)")]
    TargetTooLong { name: String, max: usize },

    #[error("dependency name `{name}` too long (max {max} chars)")]
    DependencyTooLong { name: String, max: usize },

    #[error("too many rules (max {0})")]
    TooManyRules(usize),

    #[error("too many dependencies for `{target}` (max {max})")]
    TooManyDependencies { target: String, max: usize },

    #[error("too many commands for `{target}` (max {max})")]
    TooManyCommands { target: String, max: usize },

    #[error("command for `{target}` too long (max {max} chars)")]
    CommandTooLong { target: String, max: usize },

    #[error("circular dependency among {{{}}}", .0.join(", "))]
    CircularDependency(Vec::<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
    #[error("dependency `{dep}` of `{target}` does not exist")]
    Missing { target: String, dep: String },

    #[error("dependency `{dep}` of `{target}` failed to build")]
    Failed { target: String, dep: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("`{target}`: command `{command}` exited with status {code}")]
    Exit { target: String, command: String, code: i32 },

    #[error("`{target}`: command `{command}` was terminated by signal {signal}")]
    Signal { target: String, command: String, signal: i32 },

    #[error("`{target}`: could not launch command `{command}`: {reason}")]
    Launch { target: String, command: String, reason: String },

    #[error("cycle detected: {}", .0.join(" -> "))]
    Cycle(Vec::<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiagnosticKind {
    #[error("variable error: {0}")]
    Variable(#[from] VariableError),

    #[error("rule error: {0}")]
    Rule(#[from] RuleError),

    #[error("dependency error: {0}")]
    Dependency(#[from] DependencyError),

    #[error("build error: {0}")]
    Build(#[from] BuildError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub loc: Loc,
    pub kind: DiagnosticKind,
}

impl fmt::Display for Diagnostic {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.loc, self.kind)
    }
}

/// Insertion-ordered diagnostic list with a soft cap.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    cap: usize,
    list: Vec::<Diagnostic>,
}

impl Diagnostics {
    #[inline]
    pub fn new(cap: usize) -> Self {
        Self { cap, list: Vec::new() }
    }

    /// Records a diagnostic. Once the cap is reached further ones are dropped.
    #[inline]
    pub fn push(&mut self, loc: Loc, kind: impl Into::<DiagnosticKind>) {
        if self.list.len() >= self.cap { return }
        self.list.push(Diagnostic { loc, kind: kind.into() })
    }

    #[inline]
    pub fn extend(&mut self, other: Diagnostics) {
        for Diagnostic { loc, kind } in other.list {
            self.push(loc, kind)
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    #[inline(always)]
    pub fn iter(&self) -> std::slice::Iter::<'_, Diagnostic> {
        self.list.iter()
    }

    #[inline]
    pub fn kinds(&self) -> impl Iterator::<Item = &DiagnosticKind> {
        self.list.iter().map(|d| &d.kind)
    }
}

impl<'d> IntoIterator for &'d Diagnostics {
    type Item = &'d Diagnostic;
    type IntoIter = std::slice::Iter::<'d, Diagnostic>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
