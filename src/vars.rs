//! Variable store and `$(NAME)` / `${NAME}` expansion.
//!
//! Values are stored exactly as written and expanded recursively on every
//! reference, so `A = $(B)` sees whatever `B` is bound to when `A` is used.
//! Each definition is expanded once up front to check its length and surface
//! runaway nesting; undefined names are only reported where they are used.
//! Expansion is bounded both in nesting depth and in output length.

use crate::loc::Loc;
use crate::config::Limits;
use crate::types::StrIndexMap;
use crate::consts::syntax::*;
use crate::diag::{DiagnosticKind, Diagnostics, VariableError};

/// Output hit `Limits::max_expanded_len`; scanning stops at the first overflow.
struct Overflow;

type Expansion = Result::<(), Overflow>;

#[derive(Debug)]
pub struct VarStore<'a> {
    limits: Limits,
    vars: StrIndexMap<'a, &'a str>,
}

impl<'a> VarStore<'a> {
    #[inline]
    pub fn new(limits: &Limits) -> Self {
        Self {
            limits: limits.clone(),
            vars: StrIndexMap::default(),
        }
    }

    #[inline(always)]
    pub fn get(&self, name: &str) -> Option::<&'a str> {
        self.vars.get(name).copied()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Bindings in first-definition order.
    #[inline]
    pub fn iter(&self) -> impl Iterator::<Item = (&'a str, &'a str)> + '_ {
        self.vars.iter().map(|(k, v)| (*k, *v))
    }

    fn is_valid_name(name: &str) -> bool {
        let mut chars = name.chars();
        chars.next().map_or(false, |c| c.is_ascii_alphabetic() || c == '_') &&
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }

    /// Binds `name` to `value`, overwriting any earlier binding.
    /// Returns `false` (and records why) when the definition was discarded,
    /// in which case an earlier binding of `name` stays in place.
    pub fn define(&mut self, name: &'a str, value: &'a str, loc: Loc, diags: &mut Diagnostics) -> bool {
        if name.is_empty() {
            diags.push(loc, VariableError::EmptyName);
            return false
        }

        if !Self::is_valid_name(name) {
            diags.push(loc, VariableError::InvalidName(name.to_owned()));
            return false
        }

        if name.len() > self.limits.max_var_name_len {
            diags.push(loc, VariableError::NameTooLong {
                name: name.to_owned(),
                max: self.limits.max_var_name_len
            });
            return false
        }

        if !self.vars.contains_key(name) && self.vars.len() >= self.limits.max_variables {
            diags.push(loc, VariableError::TooMany(self.limits.max_variables));
            return false
        }

        // Bound before expanding so a self reference runs into the depth limit.
        let previous = self.vars.insert(name, value);

        let mut scratch = Diagnostics::new(self.limits.max_diagnostics);
        let expanded = self.expand(value, loc, &mut scratch);
        for d in scratch.iter() {
            if !matches!(d.kind, DiagnosticKind::Variable(VariableError::Undefined(_))) {
                diags.push(d.loc, d.kind.clone())
            }
        }

        if expanded.len() > self.limits.max_var_value_len {
            match previous {
                Some(old) => { self.vars.insert(name, old); }
                None => { self.vars.pop(); }
            }
            diags.push(loc, VariableError::ValueTooLong {
                name: name.to_owned(),
                max: self.limits.max_var_value_len
            });
            return false
        }

        true
    }

    /// Expands every variable reference in `input`. Problems are recorded in
    /// `diags` under `loc`; the store itself is never touched.
    pub fn expand(&self, input: &str, loc: Loc, diags: &mut Diagnostics) -> String {
        let mut out = String::with_capacity(input.len());
        if self.expand_into(input, 0, &mut out, loc, diags).is_err() {
            diags.push(loc, VariableError::Overflow(self.limits.max_expanded_len))
        }
        out
    }

    fn expand_into(
        &self,
        input: &str,
        depth: usize,
        out: &mut String,
        loc: Loc,
        diags: &mut Diagnostics
    ) -> Expansion {
        if depth >= self.limits.max_expand_depth {
            diags.push(loc, VariableError::DepthExceeded(self.limits.max_expand_depth));
            return Ok(())
        }

        let mut rest = input;
        while let Some(dollar) = rest.find(DOLLAR) {
            self.push_bounded(out, &rest[..dollar])?;

            let reference = &rest[dollar..];
            let after = &reference[1..];
            let close = match after.chars().next() {
                Some(PAREN_OPEN) => PAREN_CLOSE,
                Some(BRACE_OPEN) => BRACE_CLOSE,
                _ => {
                    self.push_bounded(out, "$")?;
                    rest = after;
                    continue
                }
            };

            // The first closer of either kind has to match the opener: `$(A}` is unclosed.
            let body = &after[1..];
            match body.find([PAREN_CLOSE, BRACE_CLOSE]) {
                Some(end) if body[end..].starts_with(close) => {
                    rest = &body[end + 1..];
                    self.substitute(&body[..end], depth, out, loc, diags)?
                }
                _ => {
                    diags.push(loc, VariableError::Unclosed(reference.to_owned()));
                    self.push_bounded(out, "$")?;
                    rest = after
                }
            }
        }

        self.push_bounded(out, rest)
    }

    fn substitute(
        &self,
        name: &str,
        depth: usize,
        out: &mut String,
        loc: Loc,
        diags: &mut Diagnostics
    ) -> Expansion {
        if name.len() > self.limits.max_var_name_len {
            diags.push(loc, VariableError::NameTooLong {
                name: name.to_owned(),
                max: self.limits.max_var_name_len
            });
            return Ok(())
        }

        match self.vars.get(name) {
            Some(value) => self.expand_into(value, depth + 1, out, loc, diags),
            None => {
                diags.push(loc, VariableError::Undefined(name.to_owned()));
                Ok(())
            }
        }
    }

    #[inline]
    fn push_bounded(&self, out: &mut String, s: &str) -> Expansion {
        let room = self.limits.max_expanded_len.saturating_sub(out.len());
        if s.len() <= room {
            out.push_str(s);
            return Ok(())
        }

        let mut cut = room;
        while !s.is_char_boundary(cut) { cut -= 1 }
        out.push_str(&s[..cut]);
        Err(Overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store<'a>(defs: &[(&'a str, &'a str)]) -> (VarStore<'a>, Diagnostics) {
        let limits = Limits::default();
        let mut diags = Diagnostics::new(limits.max_diagnostics);
        let mut vars = VarStore::new(&limits);
        for &(name, value) in defs {
            assert!(vars.define(name, value, Loc(1), &mut diags));
        }
        (vars, diags)
    }

    fn variable_errors(diags: &Diagnostics) -> Vec::<VariableError> {
        diags.kinds().filter_map(|k| match k {
            DiagnosticKind::Variable(e) => Some(e.clone()),
            _ => None
        }).collect()
    }

    #[test]
    fn both_delimiters() {
        let (vars, mut diags) = store(&[("CC", "gcc"), ("OUT", "app")]);
        let s = vars.expand("$(CC) -o ${OUT} main.c", Loc(2), &mut diags);
        assert_eq!(s, "gcc -o app main.c");
        assert!(diags.is_empty());
    }

    #[test]
    fn nested_values_expand_recursively() {
        let (vars, mut diags) = store(&[("PREFIX", "$(HOME)/local"), ("HOME", "/home/me"), ("BIN", "${PREFIX}/bin")]);
        assert_eq!(vars.expand("$(BIN)", Loc(1), &mut diags), "/home/me/local/bin");
        assert!(diags.is_empty());
    }

    #[test]
    fn no_references_is_identity() {
        let (vars, mut diags) = store(&[("X", "y")]);
        for s in ["", "plain text", "echo $HOME", "cost: 5$", "a $ b", "{}()"] {
            assert_eq!(vars.expand(s, Loc(1), &mut diags), s);
        }
        assert!(diags.is_empty());
    }

    #[test]
    fn last_definition_wins() {
        let (mut vars, mut diags) = store(&[("CC", "gcc")]);
        assert!(vars.define("CC", "clang", Loc(2), &mut diags));
        assert_eq!(vars.len(), 1);
        assert_eq!(vars.expand("$(CC)", Loc(3), &mut diags), "clang");
    }

    #[test]
    fn undefined_expands_to_nothing() {
        let (vars, mut diags) = store(&[]);
        assert_eq!(vars.expand("[$(NOPE)]", Loc(4), &mut diags), "[]");
        assert_eq!(variable_errors(&diags), vec![VariableError::Undefined("NOPE".into())]);
        assert_eq!(diags.iter().next().map(|d| d.loc), Some(Loc(4)));
    }

    #[test]
    fn unclosed_copies_dollar() {
        let (vars, mut diags) = store(&[("CC", "gcc")]);
        assert_eq!(vars.expand("echo $(CC", Loc(1), &mut diags), "echo $(CC");
        assert_eq!(variable_errors(&diags), vec![VariableError::Unclosed("$(CC".into())]);
    }

    #[test]
    fn mismatched_delimiter_is_unclosed() {
        let (vars, mut diags) = store(&[("CC", "gcc")]);
        assert_eq!(vars.expand("$(CC} x", Loc(1), &mut diags), "$(CC} x");
        assert_eq!(variable_errors(&diags), vec![VariableError::Unclosed("$(CC} x".into())]);

        let mut diags = Diagnostics::new(10);
        assert_eq!(vars.expand("${CC) $(CC)", Loc(1), &mut diags), "${CC) gcc");
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn self_reference_hits_depth_limit() {
        let (vars, diags) = store(&[("VAR", "$(VAR)")]);
        assert_eq!(variable_errors(&diags), vec![VariableError::DepthExceeded(10)]);

        let mut diags = Diagnostics::new(10);
        assert_eq!(vars.expand("$(VAR)", Loc(2), &mut diags), "");
        assert_eq!(variable_errors(&diags), vec![VariableError::DepthExceeded(10)]);
    }

    #[test]
    fn mutual_reference_hits_depth_limit() {
        let (vars, diags) = store(&[("A", "$(B)"), ("B", "$(A)")]);
        assert_eq!(variable_errors(&diags), vec![VariableError::DepthExceeded(10)]);

        let mut diags = Diagnostics::new(10);
        assert_eq!(vars.expand("x$(A)y", Loc(3), &mut diags), "xy");
        assert_eq!(variable_errors(&diags), vec![VariableError::DepthExceeded(10)]);
    }

    #[test]
    fn overflow_truncates() {
        let limits = Limits { max_expanded_len: 8, ..Limits::default() };
        let mut vars = VarStore::new(&limits);
        let mut diags = Diagnostics::new(10);
        assert!(vars.define("LONG", "0123456789", Loc(1), &mut diags));
        assert_eq!(variable_errors(&diags), vec![VariableError::Overflow(8)]);

        let mut diags = Diagnostics::new(10);
        assert_eq!(vars.expand("ab$(LONG)cd", Loc(2), &mut diags), "ab012345");
        assert_eq!(variable_errors(&diags), vec![VariableError::Overflow(8)]);
    }

    #[test]
    fn forward_reference_is_reported_only_where_used() {
        let (mut vars, mut diags) = store(&[("B", "$(A)")]);
        assert!(diags.is_empty());

        assert!(vars.define("A", "x", Loc(2), &mut diags));
        assert_eq!(vars.expand("echo $(B)", Loc(3), &mut diags), "echo x");
        assert!(diags.is_empty());

        let (vars, mut diags) = store(&[("B", "$(A)")]);
        assert_eq!(vars.expand("echo $(B)", Loc(2), &mut diags), "echo ");
        assert_eq!(variable_errors(&diags), vec![VariableError::Undefined("A".into())]);
        assert_eq!(diags.iter().next().map(|d| d.loc), Some(Loc(2)));
    }

    #[test]
    fn value_length_is_checked_after_expansion() {
        let a = "a".repeat(300);
        let (mut vars, mut diags) = store(&[("A", a.as_str()), ("B", "short")]);

        assert!(!vars.define("B", "$(A)$(A)", Loc(3), &mut diags));
        assert!(!vars.define("C", "$(A)$(A)", Loc(4), &mut diags));
        assert_eq!(variable_errors(&diags), vec![
            VariableError::ValueTooLong { name: "B".into(), max: 511 },
            VariableError::ValueTooLong { name: "C".into(), max: 511 },
        ]);

        assert_eq!(vars.get("B"), Some("short"));
        assert_eq!(vars.get("C"), None);
        assert_eq!(vars.len(), 2);
        assert!(vars.define("D", "$(A)", Loc(5), &mut diags));
    }

    #[test]
    fn rejects_bad_definitions() {
        let long_name = "N".repeat(32);
        let long_value = "v".repeat(512);
        let limits = Limits { max_variables: 1, ..Limits::default() };
        let mut diags = Diagnostics::new(10);
        let mut vars = VarStore::new(&limits);

        assert!(!vars.define("", "x", Loc(1), &mut diags));
        assert!(!vars.define("1ABC", "x", Loc(2), &mut diags));
        assert!(!vars.define("MY VAR", "x", Loc(3), &mut diags));
        assert!(!vars.define("A$B", "x", Loc(4), &mut diags));
        assert!(!vars.define(&long_name, "x", Loc(5), &mut diags));
        assert!(!vars.define("V", &long_value, Loc(6), &mut diags));
        assert!(vars.define("_ok1", "x", Loc(7), &mut diags));
        assert!(!vars.define("OTHER", "x", Loc(8), &mut diags));
        assert!(vars.define("_ok1", "overwrite at capacity", Loc(9), &mut diags));

        assert_eq!(variable_errors(&diags), vec![
            VariableError::EmptyName,
            VariableError::InvalidName("1ABC".into()),
            VariableError::InvalidName("MY VAR".into()),
            VariableError::InvalidName("A$B".into()),
            VariableError::NameTooLong { name: long_name.clone(), max: 31 },
            VariableError::ValueTooLong { name: "V".into(), max: 511 },
            VariableError::TooMany(1),
        ]);
        assert_eq!(vars.get("_ok1"), Some("overwrite at capacity"));
    }
}
