/*
    Switches take no value: `-v`, `-B`, `--help`.
    Values follow their flag: `-f path/to/Makefile`, `-t=app`.
*/

macro_rules! define_flags {
    (
        switches { $([$short: literal, $long: literal, $name: ident, $description: literal]), * $(,)? }
        values { $([$vshort: literal, $vlong: literal, $vname: ident: $ty: ty, $vdescription: literal]), * $(,)? }
    ) => { paste::paste! {
        $(
            const [<$name:snake:upper _FLAG>]: flager::Flag = flager::Flag::new(
                concat!("-", $short),
                concat!("--", $long),
                None
            ).help($description);
        )*

        $(
            const [<$vname:snake:upper _FLAG>]: flager::Flag::<$ty> = flager::Flag::new(
                concat!("-", $vshort),
                concat!("--", $vlong),
                None
            ).help($vdescription);
        )*

        #[cfg_attr(feature = "dbg", derive(Debug))]
        pub struct Flags {
            $($name: bool,)*
            $($vname: Option::<$ty>,)*
        }

        impl Flags {
            pub fn new(flag_parser: &flager::Parser) -> Self {
                Self {
                    $($name: flag_parser.passed(&[<$name:snake:upper _FLAG>]),)*
                    $($vname: if flag_parser.passed(&[<$vname:snake:upper _FLAG>]) {
                        flag_parser.parse(&[<$vname:snake:upper _FLAG>])
                    } else {
                        None
                    },)*
                }
            }

            pub fn print_help() {
                println!("usage: minimake [flags]");
                $(println!("{flag}", flag = [<$name:snake:upper _FLAG>]);)*
                $(println!("{flag}", flag = [<$vname:snake:upper _FLAG>]);)*
            }

            $(#[inline(always)] pub fn $name(&self) -> bool { self.$name })*
            $(#[inline(always)] pub fn $vname(&self) -> Option::<&$ty> { self.$vname.as_ref() })*
        }
    }}
}

define_flags! {
    switches {
        ["h", "help",         help,         "print this text and exit"],
        ["v", "verbose",      verbose,      "log parsing, graph and staleness decisions"],
        ["B", "always-build", always_build, "rebuild every target, up-to-date or not"],
        ["n", "dry-run",      dry_run,      "print the commands that would run, without running them"],
        ["F", "force",        force,        "build even if the rule file has problems"],
    }
    values {
        ["f", "file",   file_path: String, "read rules from this file instead of `Makefile`"],
        ["t", "target", target:    String, "build only this target and what it depends on"],
    }
}
