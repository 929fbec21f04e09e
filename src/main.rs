//! # appxpack: The Main Entry Point
//!
//! This module handles Command Line Interface (CLI) parsing, logging initialization,
//! and dispatching commands to the packaging pipeline.
//!
//! Every `package` input can also come from the GitHub Actions input environment
//! (`INPUT_PROJECT-PATH`, `INPUT_PACKAGE-TYPE`, ...), so the binary can run as an
//! action step without a wrapper script.

use std::path::PathBuf;
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{info, LevelFilter};
use simplelog::{ColorChoice, Config, SimpleLogger, TermLogger, TerminalMode};

mod arguments;
mod certificate;
mod cleaner;
mod config;
mod discovery;
mod doctor;
mod error;
mod invariants;
mod pipeline;
mod platform;
mod report;
mod system;

use config::{tokenize_additional_args, PackageConfig, PackageType};
use report::{GithubActions, Json, OutputSink, Plain};
use system::{SystemOps, WindowsSystem};

/// The primary Command Line Interface (CLI) configuration.
#[derive(Parser)]
#[command(name = "appxpack")]
#[command(about = "Builds, signs and locates Windows app packages with MSBuild", long_about = None)]
struct Cli {
    /// The sub-command to execute (package, doctor).
    #[command(subcommand)]
    command: Option<Commands>,

    /// Turn on verbose logging.
    ///
    /// - `-v`: Debug (also keeps MSBuild at its default verbosity)
    /// - `-vv`: Trace
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the solution into an app package and report where it landed.
    ///
    /// This command will:
    /// 1. Find the solution under the project path.
    /// 2. Remove any stale `AppPackages` directory.
    /// 3. Run MSBuild (signing with a `.pfx` for sideload packages).
    /// 4. Report `output-directory` and `executable`.
    Package(PackageArgs),
    /// Inspect the host and project and report what `package` would use.
    Doctor {
        /// Solution file, or a directory searched for one.
        #[arg(long, env = "INPUT_PROJECT-PATH", default_value = ".")]
        project_path: PathBuf,

        /// Build tool executable.
        #[arg(long, default_value = "msbuild")]
        msbuild: String,
    },
}

#[derive(Args)]
struct PackageArgs {
    /// Solution file, or a directory searched recursively for one.
    #[arg(long, env = "INPUT_PROJECT-PATH")]
    project_path: PathBuf,

    /// MSBuild configuration (e.g. `Release`).
    #[arg(long, env = "INPUT_CONFIGURATION")]
    configuration: String,

    /// `upload` (store package) or `sideload` (signed, installable package).
    #[arg(long, env = "INPUT_PACKAGE-TYPE")]
    package_type: String,

    /// MSBuild platform (e.g. `x64`, `ARM64`).
    #[arg(long, env = "INPUT_ARCHITECTURE")]
    architecture: Option<String>,

    /// Glob for the signing certificate. Defaults to any `.pfx` under the project.
    #[arg(long, env = "INPUT_CERTIFICATE-PATH")]
    certificate_path: Option<String>,

    /// Extra MSBuild arguments as one whitespace-separated string.
    #[arg(long, env = "INPUT_ADDITIONAL-ARGS", allow_hyphen_values = true)]
    additional_args: Option<String>,

    /// Build tool executable.
    #[arg(long, default_value = "msbuild")]
    msbuild: String,

    /// Resolve everything and print the MSBuild command line, without cleaning or building.
    #[arg(long)]
    dry_run: bool,

    /// Where results go. Defaults to `github` under GitHub Actions, `plain` otherwise.
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Extra MSBuild arguments, already tokenized (after `--`).
    #[arg(last = true)]
    extra: Vec<String>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Github,
    Plain,
    Json,
}

impl OutputFormat {
    fn detect() -> Self {
        if std::env::var("GITHUB_ACTIONS").as_deref() == Ok("true") {
            OutputFormat::Github
        } else {
            OutputFormat::Plain
        }
    }
}

/// Runner-provided inputs are present but empty when the workflow leaves them unset.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl PackageArgs {
    fn into_config(self, debug: bool) -> Result<PackageConfig> {
        if self.project_path.as_os_str().is_empty() {
            bail!("Input required and not supplied: project-path");
        }
        if self.configuration.trim().is_empty() {
            bail!("Input required and not supplied: configuration");
        }
        let package_type: PackageType = self.package_type.trim().parse()?;

        let mut additional_args = Vec::new();
        if let Some(raw) = non_empty(self.additional_args) {
            info!("additional-args: \"{}\"", raw);
            additional_args.extend(tokenize_additional_args(&raw));
        }
        additional_args.extend(self.extra);

        let architecture = non_empty(self.architecture);
        if let Some(arch) = &architecture {
            info!("architecture: \"{}\"", arch);
        }

        let mut config =
            PackageConfig::new(self.project_path, self.configuration.trim(), package_type);
        config.architecture = architecture;
        config.certificate_path = non_empty(self.certificate_path);
        config.additional_args = additional_args;
        config.debug = debug;
        config.msbuild = self.msbuild;
        config.dry_run = self.dry_run;
        Ok(config)
    }
}

/// `core.isDebug()` equivalent: the runner sets `RUNNER_DEBUG=1` for debug re-runs.
fn runner_debug() -> bool {
    std::env::var("RUNNER_DEBUG").as_deref() == Ok("1")
}

/// The host is checked before any input is validated, so an unsupported runner
/// is reported as such regardless of what the workflow passed.
fn package(
    args: PackageArgs,
    debug: bool,
    system: &impl SystemOps,
    sink: &mut impl OutputSink,
) -> Result<()> {
    platform::ensure_supported(system)?;
    let config = args.into_config(debug)?;
    let outcome = pipeline::run_package(&config, system, sink).context("Packaging failed")?;
    info!(
        "Packaged {} into {} ({} package file(s))",
        outcome.solution.display(),
        outcome.output_directory.display(),
        outcome.artifacts.len()
    );
    Ok(())
}

/// Runs `package` against one sink and returns the process exit code.
fn run_with_sink(args: PackageArgs, debug: bool, mut sink: impl OutputSink) -> i32 {
    let code = match package(args, debug, &WindowsSystem, &mut sink) {
        Ok(()) => 0,
        Err(e) => {
            sink.failure(&format!("{:#}", e));
            1
        }
    };
    if let Err(e) = sink.finish() {
        log::error!("Failed to write results: {}", e);
        return 1;
    }
    code
}

fn main() {
    let cli = Cli::parse();
    let debug = cli.verbose > 0 || runner_debug();

    // Determine log level based on verbosity flag
    let log_level = match cli.verbose {
        0 if debug => LevelFilter::Debug,
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    // JSON results own stdout, so logs move to stderr.
    let json = matches!(
        &cli.command,
        Some(Commands::Package(args)) if args.format == Some(OutputFormat::Json)
    );
    if json {
        let _ = TermLogger::init(
            log_level,
            Config::default(),
            TerminalMode::Stderr,
            ColorChoice::Never,
        );
    } else {
        let _ = SimpleLogger::init(log_level, Config::default());
    }

    match cli.command {
        Some(Commands::Package(args)) => {
            let code = match args.format.unwrap_or_else(OutputFormat::detect) {
                OutputFormat::Github => run_with_sink(args, debug, GithubActions::from_env()),
                OutputFormat::Plain => run_with_sink(args, debug, Plain),
                OutputFormat::Json => run_with_sink(args, debug, Json::default()),
            };
            if code != 0 {
                std::process::exit(code);
            }
        }
        Some(Commands::Doctor { project_path, msbuild }) => {
            let report = doctor::diagnose(&WindowsSystem, &project_path, &msbuild);
            doctor::print_report(&report);
        }
        None => {
            // Default behavior if no command: print the help message
            use clap::CommandFactory;
            let _ = Cli::command().print_help();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PackageError;
    use crate::report::MemorySink;
    use crate::system::MockSystem;

    fn parse(argv: &[&str]) -> PackageArgs {
        match Cli::try_parse_from(argv).unwrap().command {
            Some(Commands::Package(args)) => args,
            _ => panic!("expected package command"),
        }
    }

    #[test]
    fn cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_become_config() {
        let args = parse(&[
            "appxpack", "package",
            "--project-path", "src",
            "--configuration", "Release",
            "--package-type", "sideload",
            "--architecture", "",
            "--additional-args", "/p:X=1 /p:Y=2",
            "--", "/p:Z=\"a b\"",
        ]);
        let config = args.into_config(false).unwrap();

        assert_eq!(config.project_path, PathBuf::from("src"));
        assert_eq!(config.package_type, PackageType::Sideload);
        assert_eq!(config.architecture, None);
        assert_eq!(config.additional_args, vec!["/p:X=1", "/p:Y=2", "/p:Z=\"a b\""]);
        assert_eq!(config.msbuild, "msbuild");
    }

    #[test]
    fn invalid_package_type_is_rejected() {
        let args = parse(&[
            "appxpack", "package",
            "--project-path", "src",
            "--configuration", "Release",
            "--package-type", "store",
        ]);
        let err = args.into_config(false).unwrap_err();
        assert!(err.to_string().contains("Invalid package type: \"store\""));
    }

    #[test]
    fn unsupported_host_is_reported_before_inputs() {
        let args = parse(&[
            "appxpack", "package",
            "--project-path", "src",
            "--configuration", "Release",
            "--package-type", "store",
        ]);
        let system = MockSystem { os: "linux".to_string(), ..MockSystem::new() };
        let mut sink = MemorySink::default();

        let err = package(args, false, &system, &mut sink).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PackageError>(),
            Some(PackageError::PlatformUnsupported(os)) if os == "linux"
        ));
        assert!(system.calls().is_empty());
    }

    #[test]
    fn blank_configuration_is_rejected() {
        let args = parse(&[
            "appxpack", "package",
            "--project-path", "src",
            "--configuration", " ",
            "--package-type", "upload",
        ]);
        assert!(args.into_config(false).is_err());
    }
}
