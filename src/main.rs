mod flags;

use flags::Flags;

use minimake::report_fmt;
use minimake::consts::DEFAULT_MAKEFILE;
use minimake::config::{BuildOptions, Config};

use std::process::ExitCode;

use flager::Parser as FlagParser;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> ExitCode {
    let flag_parser = FlagParser::new();
    let flags = Flags::new(&flag_parser);

    if flags.help() {
        Flags::print_help();
        return ExitCode::SUCCESS
    }

    init_tracing(flags.verbose());

    let path = flags.file_path().map(String::as_str).unwrap_or(DEFAULT_MAKEFILE);

    let config = Config {
        force: flags.force(),
        target: flags.target().cloned(),
        build: BuildOptions {
            always_build: flags.always_build(),
            dry_run: flags.dry_run(),
            echo: !flags.dry_run(),
        },
        ..Config::default()
    };

    let report = match minimake::build_file(path, &config) {
        Ok(ok) => ok,
        Err(e) => {
            eprintln!("{path}: {e}");
            return ExitCode::FAILURE
        }
    };

    for diag in report.diagnostics.iter() {
        eprintln!("{}", report_fmt!(path, diag.loc, "{}", diag.kind))
    }

    ExitCode::from(report.exit_code())
}
