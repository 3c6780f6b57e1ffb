//! Incremental build driver.
//!
//! Targets are visited in topological order. Before a target is judged, every
//! dependency that is itself a target is brought up to date with an explicit
//! depth-first walk. The walk colours rules unvisited / in progress / done, so
//! running into an in-progress rule is a cycle: it is reported and only the rules
//! on that cycle fail.

use crate::loc::Loc;
use crate::config::BuildOptions;
use crate::graph::{DependencyGraph, Schedule};
use crate::parser::{MakefileModel, Rule};
use crate::types::StrIndexMap;
use crate::command::{Executor, FailureKind, MetadataCache};
use crate::diag::{BuildError, DependencyError, DiagnosticKind, Diagnostics};

use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    UpToDate,
    Rebuilt,
    Failed { reason: DiagnosticKind },
}

impl BuildOutcome {
    #[inline(always)]
    pub fn is_failed(&self) -> bool {
        matches!(self, BuildOutcome::Failed { .. })
    }
}

#[derive(Debug)]
pub struct BuildReport<'a> {
    /// One entry per visited rule, in the order they finished.
    pub outcomes: StrIndexMap<'a, BuildOutcome>,
    pub diagnostics: Diagnostics,
}

impl BuildReport<'_> {
    #[inline]
    pub fn failed(&self) -> bool {
        self.outcomes.values().any(BuildOutcome::is_failed)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Mark { Unvisited, InProgress, Done }

struct Frame {
    rule: usize,
    next_dep: usize,
    /// Set when the rule sits on a cycle; it then fails without being judged.
    blocked: Option::<DiagnosticKind>,
}

impl Frame {
    #[inline(always)]
    fn new(rule: usize) -> Self {
        Self { rule, next_dep: 0, blocked: None }
    }
}

pub struct BuildDriver<'a, 'm> {
    model: &'m MakefileModel<'a>,
    executor: Executor,
    options: BuildOptions,

    marks: Vec::<Mark>,
    mtimes: MetadataCache<'a>,

    outcomes: StrIndexMap<'a, BuildOutcome>,
    diagnostics: Diagnostics,
}

impl<'a, 'm> BuildDriver<'a, 'm> {
    pub fn new(model: &'m MakefileModel<'a>, executor: Executor, options: BuildOptions, max_diagnostics: usize) -> Self {
        Self {
            model,
            options,
            executor,
            marks: vec![Mark::Unvisited; model.rules.len()],
            mtimes: MetadataCache::default(),
            outcomes: StrIndexMap::default(),
            diagnostics: Diagnostics::new(max_diagnostics),
        }
    }

    /// Walks `schedule` and brings every target in it up to date. Stalled
    /// (cyclic) nodes are visited last so their cycles get reported too.
    pub fn run(mut self, graph: &DependencyGraph<'a>, schedule: &Schedule) -> BuildReport<'a> {
        for &node in schedule.order.iter().chain(schedule.stalled.iter()) {
            if let Some(rule) = self.model.rule_index(graph.node(node)) {
                self.ensure(rule)
            }
        }
        self.finish()
    }

    /// Brings just `target` and whatever it depends on up to date.
    pub fn run_target(mut self, target: &str) -> BuildReport<'a> {
        if let Some(rule) = self.model.rule_index(target) {
            self.ensure(rule)
        }
        self.finish()
    }

    #[inline]
    fn finish(self) -> BuildReport<'a> {
        BuildReport { outcomes: self.outcomes, diagnostics: self.diagnostics }
    }

    fn ensure(&mut self, root: usize) {
        if self.marks[root] != Mark::Unvisited { return }

        let model = self.model;
        self.marks[root] = Mark::InProgress;
        let mut stack = vec![Frame::new(root)];

        while let Some(top) = stack.last_mut() {
            let rule = &model.rules[top.rule];
            let Some(&dep) = rule.deps.get(top.next_dep) else {
                let Some(Frame { rule, blocked, .. }) = stack.pop() else { break };
                let outcome = match blocked {
                    Some(reason) => BuildOutcome::Failed { reason },
                    None => self.judge(&model.rules[rule]),
                };
                self.marks[rule] = Mark::Done;
                self.outcomes.insert(model.rules[rule].target, outcome);
                continue
            };

            top.next_dep += 1;

            let Some(dep_rule) = model.rule_index(dep) else { continue };
            match self.marks[dep_rule] {
                Mark::Done => {}
                Mark::Unvisited => {
                    self.marks[dep_rule] = Mark::InProgress;
                    stack.push(Frame::new(dep_rule))
                }
                Mark::InProgress => {
                    let start = stack.iter().position(|f| f.rule == dep_rule).unwrap_or(0);
                    let mut path = stack[start..].iter()
                        .map(|f| model.rules[f.rule].target.to_owned())
                        .collect::<Vec::<_>>();
                    path.push(dep.to_owned());

                    let reason = DiagnosticKind::from(BuildError::Cycle(path));
                    self.diagnostics.push(rule.loc, reason.clone());
                    for frame in stack[start..].iter_mut() {
                        frame.blocked.get_or_insert_with(|| reason.clone());
                    }
                }
            }
        }
    }

    fn fail(&mut self, loc: Loc, reason: impl Into::<DiagnosticKind>) -> BuildOutcome {
        let reason = reason.into();
        self.diagnostics.push(loc, reason.clone());
        BuildOutcome::Failed { reason }
    }

    /// Decides whether `rule` is stale and, if so, runs its commands.
    /// All dependency targets are already done when this is called.
    fn judge(&mut self, rule: &Rule<'a>) -> BuildOutcome {
        let failed_dep = rule.deps.iter().find(|dep| {
            self.outcomes.get(*dep).is_some_and(BuildOutcome::is_failed)
        });
        if let Some(dep) = failed_dep {
            return self.fail(rule.loc, DependencyError::Failed {
                target: rule.target.to_owned(),
                dep: dep.to_string()
            })
        }

        if !self.is_stale(rule) {
            debug!("`{}` is up to date", rule.target);
            return BuildOutcome::UpToDate
        }

        let mut missing = None;
        for &dep in rule.deps.iter() {
            if self.is_present(dep) { continue }
            let reason = DependencyError::Missing {
                target: rule.target.to_owned(),
                dep: dep.to_owned()
            };
            self.diagnostics.push(rule.loc, reason.clone());
            missing.get_or_insert(reason);
        }
        if let Some(reason) = missing {
            return BuildOutcome::Failed { reason: reason.into() }
        }

        info!("building `{}`", rule.target);

        if self.options.dry_run {
            for command in rule.commands.iter() {
                println!("{command}")
            }
            return BuildOutcome::Rebuilt
        }

        let result = self.executor.execute(&rule.commands);
        self.mtimes.invalidate(rule.target);

        let Err(failure) = result else {
            return BuildOutcome::Rebuilt
        };

        let target = rule.target.to_owned();
        let command = failure.command;
        let error = match failure.kind {
            FailureKind::Exit(code) => BuildError::Exit { target, command, code },
            FailureKind::Signal(signal) => BuildError::Signal { target, command, signal },
            FailureKind::Launch(e) => BuildError::Launch { target, command, reason: e.to_string() },
        };
        self.fail(rule.loc, error)
    }

    fn is_stale(&mut self, rule: &Rule<'a>) -> bool {
        if self.options.always_build { return true }

        let Some(target_mtime) = self.mtimes.mtime(rule.target) else {
            debug!("`{}` does not exist", rule.target);
            return true
        };

        rule.deps.iter().any(|&dep| {
            let newer = self.rebuilt_in_dry_run(dep) ||
                self.mtimes.mtime(dep).is_some_and(|m| m > target_mtime);
            if newer {
                debug!("`{dep}` is newer than `{}`", rule.target)
            } newer
        })
    }

    /// In a dry run nothing gets written, so a target "rebuilt" earlier in the
    /// run counts as present and fresh.
    #[inline]
    fn rebuilt_in_dry_run(&self, dep: &str) -> bool {
        self.options.dry_run && matches!(self.outcomes.get(dep), Some(BuildOutcome::Rebuilt))
    }

    #[inline]
    fn is_present(&mut self, dep: &'a str) -> bool {
        self.rebuilt_in_dry_run(dep) || self.mtimes.exists(dep)
    }
}
