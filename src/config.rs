/// Soft capacity limits. Exceeding any of them produces a diagnostic, never a panic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Limits {
    /// Longest target or dependency name, in bytes.
    pub max_name_len: usize,
    pub max_command_len: usize,
    pub max_rules: usize,
    pub max_dependencies: usize,
    pub max_commands: usize,

    pub max_variables: usize,
    pub max_var_name_len: usize,
    pub max_var_value_len: usize,

    /// Nesting depth at which an expansion gives up and yields nothing.
    pub max_expand_depth: usize,
    pub max_expanded_len: usize,

    pub max_diagnostics: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_name_len: 32,
            max_command_len: 1023,
            max_rules: 100,
            max_dependencies: 50,
            max_commands: 20,

            max_variables: 50,
            max_var_name_len: 31,
            max_var_value_len: 511,

            max_expand_depth: 10,
            max_expanded_len: 2047,

            max_diagnostics: 100,
        }
    }
}

/// Knobs for the build phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Treat every target as stale.
    pub always_build: bool,
    /// Print commands instead of running them.
    pub dry_run: bool,
    /// Echo each command to stdout before running it.
    pub echo: bool,
}

#[derive(Clone, Debug, Default)]
pub struct Config {
    pub limits: Limits,
    pub build: BuildOptions,
    /// Build even when parsing produced diagnostics.
    pub force: bool,
    /// Build only this target and whatever it depends on.
    pub target: Option::<String>,
}
