use crate::loc::Loc;
use crate::vars::VarStore;
use crate::config::Limits;
use crate::types::StrHashMap;
use crate::consts::syntax::*;
use crate::diag::{Diagnostics, RuleError};

use std::fmt;

use bumpalo::Bump;
use tracing::debug;
#[cfg(feature = "dbg")]
use tramer::tramer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule<'a> {
    pub loc: Loc,
    pub target: &'a str,
    pub deps: Vec::<&'a str>,
    pub commands: Vec::<&'a str>,
}

/// Writes the rule back in rule-file syntax.
impl fmt::Display for Rule<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{target}{RULE_SEPARATOR}", target = self.target)?;
        for dep in self.deps.iter() {
            write!(f, " {dep}")?
        }
        for command in self.commands.iter() {
            write!(f, "\n{COMMAND_PREFIX}{command}")?
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct MakefileModel<'a> {
    pub rules: Vec::<Rule<'a>>,
    pub vars: VarStore<'a>,
    pub diagnostics: Diagnostics,
    index: StrHashMap::<'a, usize>,
}

impl<'a> MakefileModel<'a> {
    #[inline]
    pub fn new(limits: &Limits) -> Self {
        Self {
            rules: Vec::new(),
            vars: VarStore::new(limits),
            diagnostics: Diagnostics::new(limits.max_diagnostics),
            index: StrHashMap::default(),
        }
    }

    #[inline(always)]
    pub fn rule_index(&self, target: &str) -> Option::<usize> {
        self.index.get(target).copied()
    }

    #[inline(always)]
    pub fn rule(&self, target: &str) -> Option::<&Rule<'a>> {
        self.rule_index(target).map(|i| &self.rules[i])
    }

    #[inline(always)]
    pub fn is_target(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    #[inline]
    pub fn pretty_print_targets(&self) -> String {
        let mut buf = String::with_capacity(self.rules.len() * 24);
        self.rules.first().map(|r| buf.push_str(r.target));
        self.rules.iter().skip(1).for_each(|r| {
            buf.push_str(", ");
            buf.push_str(r.target);
        });
        buf
    }
}

/// Re-serializes the whole model: variable bindings first, then rules.
impl fmt::Display for MakefileModel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.vars.iter() {
            writeln!(f, "{name} {ASSIGN} {value}")?
        }
        for rule in self.rules.iter() {
            writeln!(f, "{rule}")?
        }
        Ok(())
    }
}

pub struct Parser<'a> {
    cursor: usize,
    limits: Limits,
    arena: &'a Bump,
    /// Rule that tab-indented command lines attach to.
    current: Option::<usize>,
    model: MakefileModel<'a>,
}

impl<'a> Parser<'a> {
    /// Parses the whole rule file. Content problems never stop the parse,
    /// they end up in `MakefileModel::diagnostics`.
    #[cfg_attr(feature = "dbg", tramer("nanos"))]
    pub fn parse(content: &'a str, arena: &'a Bump, limits: &Limits) -> MakefileModel<'a> {
        let mut parser = Self {
            arena,
            cursor: 0,
            current: None,
            limits: limits.clone(),
            model: MakefileModel::new(limits),
        };

        for line in content.lines() {
            parser.cursor += 1;
            parser.parse_line(line)
        }

        parser.model
    }

    fn parse_line(&mut self, line: &'a str) {
        let line = match line.find(COMMENT) {
            Some(i) => &line[..i],
            None => line
        }.trim_end();

        if line.trim_start().is_empty() { return }

        let loc = Loc(self.cursor);

        if let Some((name, value)) = line.split_once(ASSIGN) {
            self.parse_assignment(name.trim(), value.trim(), loc)
        } else if let Some((target, deps)) = line.split_once(RULE_SEPARATOR) {
            self.parse_rule(target.trim(), deps, loc)
        } else if let Some(command) = line.strip_prefix(COMMAND_PREFIX) {
            self.parse_command(command.trim(), loc)
        } else {
            self.model.diagnostics.push(loc, RuleError::InvalidLine(line.trim().to_owned()))
        }
    }

    fn parse_assignment(&mut self, name: &'a str, value: &'a str, loc: Loc) {
        let MakefileModel { vars, diagnostics, .. } = &mut self.model;
        if !vars.define(name, value, loc, diagnostics) {
            debug!("line {loc}: definition of `{name}` discarded")
        }
    }

    fn parse_rule(&mut self, target: &'a str, deps: &str, loc: Loc) {
        let max = self.limits.max_name_len;
        let MakefileModel { rules, vars, diagnostics, index } = &mut self.model;

        if target.is_empty() {
            diagnostics.push(loc, RuleError::EmptyTarget);
            return
        }

        if target.len() > max {
            diagnostics.push(loc, RuleError::TargetTooLong { name: target.to_owned(), max });
            return
        }

        if index.contains_key(target) {
            diagnostics.push(loc, RuleError::DuplicateTarget(target.to_owned()));
            return
        }

        if rules.len() >= self.limits.max_rules {
            diagnostics.push(loc, RuleError::TooManyRules(self.limits.max_rules));
            return
        }

        let expanded = vars.expand(deps, loc, diagnostics);
        let expanded = &*self.arena.alloc_str(&expanded);

        let mut rule_deps = Vec::new();
        for dep in expanded.split_ascii_whitespace() {
            if dep.len() > max {
                diagnostics.push(loc, RuleError::DependencyTooLong { name: dep.to_owned(), max });
                continue
            }

            if rule_deps.len() >= self.limits.max_dependencies {
                diagnostics.push(loc, RuleError::TooManyDependencies {
                    target: target.to_owned(),
                    max: self.limits.max_dependencies
                });
                break
            }

            rule_deps.push(dep)
        }

        let i = rules.len();
        index.insert(target, i);
        rules.push(Rule { loc, target, deps: rule_deps, commands: Vec::new() });
        self.current = Some(i)
    }

    fn parse_command(&mut self, command: &str, loc: Loc) {
        let Some(i) = self.current else {
            debug!("line {loc}: command without a rule is ignored: {command}");
            return
        };

        let MakefileModel { rules, vars, diagnostics, .. } = &mut self.model;
        let rule = &mut rules[i];

        if rule.commands.len() >= self.limits.max_commands {
            diagnostics.push(loc, RuleError::TooManyCommands {
                target: rule.target.to_owned(),
                max: self.limits.max_commands
            });
            return
        }

        let expanded = vars.expand(command, loc, diagnostics);
        if expanded.len() > self.limits.max_command_len {
            diagnostics.push(loc, RuleError::CommandTooLong {
                target: rule.target.to_owned(),
                max: self.limits.max_command_len
            });
            return
        }

        rule.commands.push(self.arena.alloc_str(&expanded))
    }
}
