//! `minimake`: a small make-style build engine.
//!
//! A rule file is parsed into rules and variables, turned into a dependency graph,
//! ordered with Kahn's algorithm and then brought up to date target by target,
//! comparing modification times and running shell commands for stale targets.
//! Problems with the rule file are collected as diagnostics rather than aborting.

#[macro_use]
pub mod loc;

pub mod vars;
pub mod util;
pub mod diag;
pub mod types;
pub mod graph;
pub mod config;
pub mod consts;
pub mod parser;
pub mod driver;
pub mod command;

use loc::Loc;
use config::Config;
use parser::Parser;
use command::Executor;
use driver::{BuildDriver, BuildOutcome};
use diag::{Diagnostics, RuleError};
use graph::{topological_sort, DependencyGraph};

use std::io;
use std::str::Utf8Error;
use std::path::{Path, PathBuf};

use bumpalo::Bump;
use thiserror::Error;
use tracing::{debug, warn};

/// Failures that stop a run before anything can be reported per line.
#[derive(Debug, Error)]
pub enum Error {
    #[error("could not read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("{} is not valid UTF-8: {source}", .path.display())]
    Utf8 { path: PathBuf, source: Utf8Error },

    #[error("no target `{target}`, available targets: [{available}]")]
    NoSuchTarget { target: String, available: String },
}

#[derive(Debug)]
pub struct Report {
    pub diagnostics: Diagnostics,
    /// Targets in the order they finished. Empty when the build was refused.
    pub outcomes: Vec::<(String, BuildOutcome)>,
}

impl Report {
    #[inline]
    pub fn failed(&self) -> bool {
        !self.diagnostics.is_empty() || self.outcomes.iter().any(|(_, o)| o.is_failed())
    }

    /// `0` when everything went fine, `1` on any diagnostic or failed target.
    #[inline(always)]
    pub fn exit_code(&self) -> u8 {
        self.failed() as u8
    }
}

/// Reads the rule file at `path` and builds it.
pub fn build_file(path: impl AsRef::<Path>, config: &Config) -> Result::<Report, Error> {
    let path = path.as_ref();
    let mmap = util::read_file(path).map_err(|source| Error::Read {
        path: path.to_owned(),
        source
    })?;
    let content = std::str::from_utf8(&mmap[..]).map_err(|source| Error::Utf8 {
        path: path.to_owned(),
        source
    })?;
    build(content, config)
}

/// Parses `content`, orders its targets and brings them up to date.
///
/// Diagnostics from the rule file stop the run before anything is executed
/// unless `config.force` is set.
pub fn build(content: &str, config: &Config) -> Result::<Report, Error> {
    let arena = Bump::new();
    let model = Parser::parse(content, &arena, &config.limits);
    debug!("parsed {r} rules, {v} variables", r = model.rules.len(), v = model.vars.len());
    debug!("model:\n{model}");

    if let Some(target) = config.target.as_deref() {
        if !model.is_target(target) {
            return Err(Error::NoSuchTarget {
                target: target.to_owned(),
                available: model.pretty_print_targets()
            })
        }
    }

    let graph = DependencyGraph::build(&model);
    debug!("dependency graph, {n} nodes, {e} edges:\n{graph}", n = graph.len(), e = graph.edge_count());

    let schedule = topological_sort(&graph);
    debug!("order: {:?}", graph.names(&schedule.order));

    let mut diagnostics = model.diagnostics.clone();
    if !schedule.is_complete() {
        let loc = schedule.stalled.iter()
            .find_map(|&i| model.rule(graph.node(i)))
            .map_or(Loc::default(), |rule| rule.loc);
        let names = graph.names(&schedule.stalled)
            .into_iter()
            .map(ToOwned::to_owned)
            .collect();
        diagnostics.push(loc, RuleError::CircularDependency(names))
    }

    if !diagnostics.is_empty() && !config.force {
        warn!("rule file has {n} problem(s), nothing was built", n = diagnostics.len());
        return Ok(Report { diagnostics, outcomes: Vec::new() })
    }

    let driver = BuildDriver::new(
        &model,
        Executor::new(config.build.echo),
        config.build,
        config.limits.max_diagnostics
    );
    let report = match config.target.as_deref() {
        Some(target) => driver.run_target(target),
        None => driver.run(&graph, &schedule),
    };

    diagnostics.extend(report.diagnostics);
    let outcomes = report.outcomes.into_iter()
        .map(|(target, outcome)| (target.to_owned(), outcome))
        .collect();

    Ok(Report { diagnostics, outcomes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::{BuildError, DiagnosticKind, VariableError};

    fn dry() -> Config {
        let mut config = Config::default();
        config.build.dry_run = true;
        config
    }

    #[test]
    fn cycle_is_diagnosed_and_blocks_the_build() {
        let report = build("a: b\nb: a\n", &dry()).unwrap();

        assert!(report.outcomes.is_empty());
        let diags = report.diagnostics.iter().collect::<Vec::<_>>();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].loc, Loc(1));
        assert_eq!(diags[0].kind, DiagnosticKind::from(RuleError::CircularDependency(vec!["a".into(), "b".into()])));
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn forced_build_reports_cycle_path() {
        let config = Config { force: true, ..dry() };
        let report = build("a: b\nb: a\n", &config).unwrap();

        assert_eq!(report.outcomes.len(), 2);
        assert!(report.diagnostics.kinds().any(|k| {
            *k == DiagnosticKind::from(BuildError::Cycle(vec!["a".into(), "b".into(), "a".into()]))
        }));
    }

    #[test]
    fn parse_diagnostics_refuse_build_unless_forced() {
        let content = "X = $(UNDEFINED)\nall:\n\ttrue $(X)\n";

        let report = build(content, &dry()).unwrap();
        assert!(report.outcomes.is_empty());
        assert_eq!(report.diagnostics.kinds().cloned().collect::<Vec::<_>>(), vec![
            DiagnosticKind::from(VariableError::Undefined("UNDEFINED".into()))
        ]);

        let report = build(content, &Config { force: true, ..dry() }).unwrap();
        assert_eq!(report.outcomes, vec![("all".to_owned(), BuildOutcome::Rebuilt)]);
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn unknown_target_lists_available_ones() {
        let config = Config { target: Some("nope".into()), ..dry() };
        let err = build("app: lib\nlib:\n", &config).unwrap_err();
        assert_eq!(err.to_string(), "no target `nope`, available targets: [app, lib]");
    }

    #[test]
    fn selected_target_builds_only_its_subtree() {
        let config = Config { target: Some("lib".into()), ..dry() };
        let report = build("app: lib\n\ttrue\nlib:\n\ttrue\ndocs:\n\ttrue\n", &config).unwrap();
        assert_eq!(report.outcomes, vec![("lib".to_owned(), BuildOutcome::Rebuilt)]);
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn unreadable_file_is_fatal() {
        let err = build_file("/nonexistent/minimake/Makefile", &Config::default()).unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }

    #[test]
    fn invalid_utf8_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Makefile");
        std::fs::write(&path, b"all:\n\techo \xff\n").unwrap();
        assert!(matches!(build_file(&path, &Config::default()), Err(Error::Utf8 { .. })));
    }
}
