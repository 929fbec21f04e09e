//! # Error Taxonomy
//!
//! Every fatal condition the packaging pipeline can hit. Each variant aborts the
//! run at the point of detection; nothing is retried.
//!
//! "No artifacts found" is intentionally absent: an empty output directory is a
//! warning, not a failure.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("This tool can only run on a Windows host (detected `{0}`).")]
    PlatformUnsupported(String),

    #[error("No solution file found under {}.", .0.display())]
    SolutionNotFound(PathBuf),

    #[error("Solution file {} is not readable: {source}", path.display())]
    SolutionNotAccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid package type: \"{0}\" (expected `upload` or `sideload`).")]
    InvalidPackageType(String),

    #[error("Invalid glob pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("No certificate file found matching '{0}'. Please set the 'certificate-path' input.")]
    CertificateNotFound(String),

    #[error("Certificate file {} is not readable: {source}", path.display())]
    CertificateNotAccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read the thumbprint of {}: {reason}", path.display())]
    CertificateThumbprint { path: PathBuf, reason: String },

    #[error("Failed to clean output directory {}: {source}", path.display())]
    CleanupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start build tool `{program}`: {source}")]
    BuildToolSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Build tool exited with {}.", describe_exit(.code))]
    BuildToolFailed { code: Option<i32> },

    #[error("Failed to write output '{name}': {source}")]
    Output {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("code {}", c),
        None => "no exit code (terminated by signal)".to_string(),
    }
}
