pub mod syntax {
    pub const COMMENT: char = '#';
    pub const ASSIGN: char = '=';
    pub const RULE_SEPARATOR: char = ':';
    pub const COMMAND_PREFIX: char = '\t';

    pub const DOLLAR: char = '$';
    pub const PAREN_OPEN: char = '(';
    pub const PAREN_CLOSE: char = ')';
    pub const BRACE_OPEN: char = '{';
    pub const BRACE_CLOSE: char = '}';
}

pub const DEFAULT_MAKEFILE: &str = "Makefile";

pub const SHELL: &std::ffi::CStr = c"/bin/sh";
