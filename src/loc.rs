use std::fmt;

/// 1-based line number in the rule file.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Loc(pub usize);

impl fmt::Display for Loc {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[macro_export]
macro_rules! report_fmt {
    ($path: expr, $loc: expr, $($arg:tt)*) => {
        format!{
            "{f}:{row}: {msg}",
            f = $path,
            row = $loc.0,
            msg = std::fmt::format(format_args!($($arg)*))
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_fmt_prefixes_path_and_row() {
        let loc = Loc(7);
        let s = report_fmt!("Makefile", loc, "undefined variable `{}`", "CC");
        assert_eq!(s, "Makefile:7: undefined variable `CC`");
    }
}
