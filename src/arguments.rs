//! # MSBuild Argument Builder
//!
//! Pure translation of a [`PackageConfig`] into the ordered token list handed to
//! MSBuild. Order matters: MSBuild parses flags positionally and the last
//! `/p:` of a given name wins, so user-supplied extras come after ours.

use std::path::Path;
use log::debug;
use crate::certificate::SigningIdentity;
use crate::config::PackageConfig;
use crate::invariants::{assert_invariant, SIDELOAD_IS_NOT_STORE, UPLOAD_IS_UNSIGNED};

/// Property prefixes that only make sense for a signed sideload package.
pub const SIDELOAD_ONLY_FLAGS: &[&str] = &[
    "/p:UapAppxPackageBuildMode=SideloadOnly",
    "/p:AppxPackageSigningEnabled=true",
    "/p:PackageCertificateThumbprint=",
    "/p:PackageCertificateKeyFile=",
];

/// Property prefixes that only make sense for a store-upload package.
pub const UPLOAD_ONLY_FLAGS: &[&str] = &[
    "/p:UapAppxPackageBuildMode=StoreUpload",
    "/p:GenerateAppInstallerFile=false",
    "/p:AppxPackageSigningEnabled=false",
    "/p:BuildAppxUploadPackageForUap=true",
];

pub const MINIMAL_VERBOSITY: &str = "/verbosity:minimal";

/// Which package flavour to request, with the signing identity a sideload needs.
#[derive(Debug, Clone, Copy)]
pub enum Packaging<'a> {
    Upload,
    Sideload(&'a SigningIdentity),
}

/// Builds the MSBuild argument list (without the solution path).
pub fn build_arguments(config: &PackageConfig, packaging: Packaging<'_>) -> Vec<String> {
    let mut args = vec![
        "/t:Build".to_string(),
        format!("/p:Configuration={}", config.configuration),
    ];

    if let Some(architecture) = &config.architecture {
        args.push(format!("/p:Platform={}", architecture));
    }

    match packaging {
        Packaging::Upload => {
            args.extend(UPLOAD_ONLY_FLAGS.iter().map(|f| f.to_string()));
        }
        Packaging::Sideload(identity) => {
            args.push("/p:UapAppxPackageBuildMode=SideloadOnly".to_string());
            args.push("/p:AppxPackageSigningEnabled=true".to_string());
            args.push(format!("/p:PackageCertificateThumbprint={}", identity.thumbprint));
            args.push(format!("/p:PackageCertificateKeyFile={}", quote(&identity.certificate)));
        }
    }

    // Checked before user extras are appended: those are the caller's business.
    let carries = |flags: &[&str]| args.iter().any(|a| flags.iter().any(|f| a.starts_with(f)));
    match packaging {
        Packaging::Upload => assert_invariant(
            !carries(SIDELOAD_ONLY_FLAGS),
            UPLOAD_IS_UNSIGNED,
            "Arguments",
        ),
        Packaging::Sideload(_) => assert_invariant(
            !carries(UPLOAD_ONLY_FLAGS),
            SIDELOAD_IS_NOT_STORE,
            "Arguments",
        ),
    }

    if !config.additional_args.is_empty() {
        debug!("additional-args: {:?}", config.additional_args);
        args.extend(config.additional_args.iter().cloned());
    }

    if !config.debug {
        args.push(MINIMAL_VERBOSITY.to_string());
    }

    args
}

/// Full verbatim argument list for the build tool: quoted solution, then flags.
pub fn invocation_args(solution: &Path, args: &[String]) -> Vec<String> {
    let mut all = Vec::with_capacity(args.len() + 1);
    all.push(quote(solution));
    all.extend(args.iter().cloned());
    all
}

/// Wraps a path in double quotes so MSBuild tolerates embedded spaces.
pub fn quote(path: &Path) -> String {
    format!("\"{}\"", path.display())
}
