//! # Package Configuration
//!
//! The immutable set of inputs for one packaging run. The CLI layer in `main.rs`
//! turns raw flags and `INPUT_*` environment values into a [`PackageConfig`];
//! nothing downstream reads the environment.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use crate::error::PackageError;

/// The two kinds of package MSBuild can produce for us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageType {
    /// Store-distribution package (`.appxupload` / `.msixupload`), unsigned.
    Upload,
    /// Directly installable package (`.appx` / `.msix` and bundles), signed.
    Sideload,
}

impl FromStr for PackageType {
    type Err = PackageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upload" => Ok(PackageType::Upload),
            "sideload" => Ok(PackageType::Sideload),
            other => Err(PackageError::InvalidPackageType(other.to_string())),
        }
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageType::Upload => write!(f, "upload"),
            PackageType::Sideload => write!(f, "sideload"),
        }
    }
}

/// Everything a packaging run needs to know, fixed before the pipeline starts.
#[derive(Debug, Clone)]
pub struct PackageConfig {
    /// A `.sln` file, or a directory searched recursively for one.
    pub project_path: PathBuf,
    /// MSBuild configuration name (e.g. `Release`).
    pub configuration: String,
    /// MSBuild platform (e.g. `x64`). Omitted from the command line when `None`.
    pub architecture: Option<String>,
    pub package_type: PackageType,
    /// Glob pattern for the signing certificate. Sideload only.
    pub certificate_path: Option<String>,
    /// Extra MSBuild tokens, appended verbatim in order.
    pub additional_args: Vec<String>,
    /// Debug diagnostics requested: keeps MSBuild at its default verbosity.
    pub debug: bool,
    /// Build tool executable.
    pub msbuild: String,
    /// Resolve and print the command line without cleaning or building.
    pub dry_run: bool,
}

impl PackageConfig {
    pub fn new(
        project_path: impl Into<PathBuf>,
        configuration: &str,
        package_type: PackageType,
    ) -> Self {
        Self {
            project_path: project_path.into(),
            configuration: configuration.to_string(),
            architecture: None,
            package_type,
            certificate_path: None,
            additional_args: Vec::new(),
            debug: false,
            msbuild: "msbuild".to_string(),
            dry_run: false,
        }
    }
}

/// Splits a raw `additional-args` string on whitespace.
///
/// No quote handling: `/p:A="x y"` becomes two tokens. Pass pre-tokenized
/// arguments after `--` on the command line when that matters.
pub fn tokenize_additional_args(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}
