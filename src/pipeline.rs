//! # Packaging Pipeline
//!
//! The orchestrator for one packaging run:
//! 1. Platform guard.
//! 2. Resolve the solution.
//! 3. Clean `AppPackages`.
//! 4. Build the MSBuild arguments (resolving the signing certificate for sideload).
//! 5. Run MSBuild.
//! 6. Find the produced package.
//! 7. Report `output-directory` and `executable`.
//!
//! The run is a function of its inputs: configuration in, [`SystemOps`] for
//! processes, [`OutputSink`] for results. Nothing here reads the environment.

use std::path::{Path, PathBuf};
use log::info;
use serde::Serialize;
use crate::arguments::{build_arguments, invocation_args, Packaging};
use crate::certificate::{resolve_signing_identity, SigningIdentity};
use crate::cleaner::clean_output_directory;
use crate::config::{PackageConfig, PackageType};
use crate::discovery::{
    discover_artifacts, resolve_solution, select_artifact, OUTPUT_DIRECTORY_NAME,
};
use crate::error::PackageError;
use crate::platform;
use crate::report::{OutputSink, EXECUTABLE, OUTPUT_DIRECTORY};
use crate::system::SystemOps;

/// What a run produced. `executable` is `None` when the build emitted no
/// package of the requested kind.
#[derive(Debug, Clone, Serialize)]
pub struct PackageOutcome {
    pub solution: PathBuf,
    pub output_directory: PathBuf,
    /// Build tool arguments, solution first.
    pub command_line: Vec<String>,
    pub artifacts: Vec<PathBuf>,
    pub executable: Option<PathBuf>,
    /// Advisories sent to the sink, in order.
    pub warnings: Vec<String>,
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn publish(sink: &mut impl OutputSink, name: &str, value: &Path) -> Result<(), PackageError> {
    sink.set_output(name, &value.display().to_string())
        .map_err(|source| PackageError::Output { name: name.to_string(), source })
}

fn advise(sink: &mut impl OutputSink, warnings: &mut Vec<String>, message: String) {
    sink.warning(&message);
    warnings.push(message);
}

/// Runs the whole packaging pipeline once.
///
/// # Returns
///
/// The outcome on success (including "built, but nothing to report"), or the
/// first fatal [`PackageError`]. Outputs published before a failure stay published.
pub fn run_package(
    config: &PackageConfig,
    system: &impl SystemOps,
    sink: &mut impl OutputSink,
) -> Result<PackageOutcome, PackageError> {
    platform::ensure_supported(system)?;

    let location = resolve_solution(&config.project_path)?;
    info!("Building {}", location.solution.display());
    let output_directory = absolute(&location.project_root.join(OUTPUT_DIRECTORY_NAME));

    if !config.dry_run {
        clean_output_directory(&output_directory)?;
    }

    let mut warnings = Vec::new();
    info!("package-type: \"{}\"", config.package_type);
    let identity: Option<SigningIdentity> = match config.package_type {
        PackageType::Upload => None,
        PackageType::Sideload => {
            let (identity, advisory) = resolve_signing_identity(
                system,
                config.certificate_path.as_deref(),
                &location.project_root,
            )?;
            if let Some(text) = advisory {
                advise(sink, &mut warnings, text);
            }
            Some(identity)
        }
    };
    let packaging = match &identity {
        Some(id) => Packaging::Sideload(id),
        None => Packaging::Upload,
    };

    let args = build_arguments(config, packaging);
    let command_line = invocation_args(&location.solution, &args);

    let mut outcome = PackageOutcome {
        solution: location.solution,
        output_directory: output_directory.clone(),
        command_line,
        artifacts: Vec::new(),
        executable: None,
        warnings,
    };

    if config.dry_run {
        info!("Dry run, nothing was cleaned or built. Build command:");
        info!("{} {}", config.msbuild, outcome.command_line.join(" "));
        return Ok(outcome);
    }

    let status = system
        .run_streaming(&config.msbuild, &outcome.command_line)
        .map_err(|source| PackageError::BuildToolSpawn {
            program: config.msbuild.clone(),
            source,
        })?;
    if !status.success {
        return Err(PackageError::BuildToolFailed { code: status.code });
    }

    info!("outputDirectory: {}", output_directory.display());
    publish(sink, OUTPUT_DIRECTORY, &output_directory)?;

    outcome.artifacts = discover_artifacts(&output_directory);
    if outcome.artifacts.is_empty() {
        advise(sink, &mut outcome.warnings, "No executables found.".to_string());
        return Ok(outcome);
    }

    info!("Found executables:");
    for artifact in &outcome.artifacts {
        info!("  - \"{}\"", artifact.display());
    }

    outcome.executable =
        select_artifact(&output_directory, &outcome.artifacts, config.package_type);
    match &outcome.executable {
        Some(executable) => {
            info!("Found executable: \"{}\"", executable.display());
            publish(sink, EXECUTABLE, executable)?;
        }
        None => advise(
            sink,
            &mut outcome.warnings,
            format!("No {} package among the build outputs.", config.package_type),
        ),
    }

    Ok(outcome)
}
