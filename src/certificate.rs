//! # Certificate Resolver
//!
//! Sideload packages are signed by MSBuild with a `.pfx` certificate selected by
//! thumbprint. This module finds the certificate file and asks PowerShell for
//! its thumbprint.

use std::path::{Path, PathBuf};
use log::info;
use crate::discovery::{self, ensure_readable, glob_files};
use crate::error::PackageError;
use crate::system::SystemOps;

/// The certificate MSBuild should sign with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningIdentity {
    pub certificate: PathBuf,
    pub thumbprint: String,
}

/// A resolved certificate file plus any other candidates the pattern matched.
#[derive(Debug, Clone)]
pub struct CertificateMatch {
    pub path: PathBuf,
    pub candidates: Vec<PathBuf>,
}

impl CertificateMatch {
    /// Advisory text when the pattern was ambiguous.
    pub fn ambiguity_warning(&self) -> Option<String> {
        if self.candidates.len() <= 1 {
            return None;
        }
        let listing: Vec<String> =
            self.candidates.iter().map(|p| p.display().to_string()).collect();
        Some(format!(
            "More than one certificate file found, using the first one found:\n{}",
            listing.join("\n")
        ))
    }
}

/// Resolves the certificate pattern to exactly one readable file.
///
/// With no explicit pattern, every `.pfx` under `project_root` is a candidate.
pub fn resolve_certificate(
    pattern: Option<&str>,
    project_root: &Path,
) -> Result<CertificateMatch, PackageError> {
    let pattern = match pattern {
        Some(p) => p.to_string(),
        None => discovery::default_certificate_pattern(project_root),
    };

    let matches = glob_files(&pattern)?;
    let path = matches
        .first()
        .cloned()
        .ok_or_else(|| PackageError::CertificateNotFound(pattern.clone()))?;

    ensure_readable(&path).map_err(|source| PackageError::CertificateNotAccessible {
        path: path.clone(),
        source,
    })?;

    Ok(CertificateMatch { path, candidates: matches.candidates })
}

/// PowerShell invocation printing the certificate's thumbprint.
pub fn thumbprint_command(certificate: &Path) -> (String, Vec<String>) {
    // Single-quoted PowerShell literal: embedded quotes are doubled.
    let literal = certificate.display().to_string().replace('\'', "''");
    (
        "powershell".to_string(),
        vec![
            "-NoProfile".to_string(),
            "-NonInteractive".to_string(),
            "-Command".to_string(),
            format!("(Get-PfxCertificate -FilePath '{}').Thumbprint", literal),
        ],
    )
}

/// Reads the thumbprint of `certificate` via PowerShell, trimmed.
///
/// The output is trusted verbatim; no format validation.
pub fn read_thumbprint(
    system: &impl SystemOps,
    certificate: &Path,
) -> Result<String, PackageError> {
    let (program, args) = thumbprint_command(certificate);
    let output = system
        .run_captured(&program, &args)
        .map_err(|e| PackageError::CertificateThumbprint {
            path: certificate.to_path_buf(),
            reason: format!("failed to run {}: {}", program, e),
        })?;

    if !output.status.success {
        return Err(PackageError::CertificateThumbprint {
            path: certificate.to_path_buf(),
            reason: format!("{} exited with {:?}", program, output.status.code),
        });
    }

    Ok(output.stdout.trim().to_string())
}

/// Full sideload signing lookup: resolve the file, then its thumbprint.
///
/// Returns the identity and, when the pattern was ambiguous, an advisory to surface.
pub fn resolve_signing_identity(
    system: &impl SystemOps,
    pattern: Option<&str>,
    project_root: &Path,
) -> Result<(SigningIdentity, Option<String>), PackageError> {
    let found = resolve_certificate(pattern, project_root)?;
    let advisory = found.ambiguity_warning();

    let thumbprint = read_thumbprint(system, &found.path)?;
    info!("Signing with {} (thumbprint {})", found.path.display(), thumbprint);
    Ok((SigningIdentity { certificate: found.path, thumbprint }, advisory))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::{MockSystem, ProcessStatus};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_pattern_finds_pfx_under_project() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("App")).unwrap();
        let pfx = dir.path().join("App/App_TemporaryKey.pfx");
        fs::write(&pfx, b"cert").unwrap();

        let found = resolve_certificate(None, dir.path()).unwrap();
        assert_eq!(found.path, pfx);
        assert!(found.ambiguity_warning().is_none());
    }

    #[test]
    fn two_matches_pick_first_and_warn() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.pfx");
        let b = dir.path().join("b.pfx");
        fs::write(&b, b"cert").unwrap();
        fs::write(&a, b"cert").unwrap();

        let found = resolve_certificate(None, dir.path()).unwrap();
        assert_eq!(found.path, a);
        let warning = found.ambiguity_warning().unwrap();
        assert!(warning.contains("a.pfx") && warning.contains("b.pfx"));
    }

    #[test]
    fn explicit_pattern_is_used_verbatim() {
        let dir = TempDir::new().unwrap();
        let pfx = dir.path().join("signing.pfx");
        fs::write(&pfx, b"cert").unwrap();
        fs::write(dir.path().join("other.pfx"), b"cert").unwrap();

        let pattern = pfx.to_string_lossy().to_string();
        let found = resolve_certificate(Some(&pattern), dir.path()).unwrap();
        assert_eq!(found.path, pfx);
        assert_eq!(found.candidates.len(), 1);
    }

    #[test]
    fn no_candidates_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = resolve_certificate(None, dir.path()).unwrap_err();
        assert!(matches!(err, PackageError::CertificateNotFound(_)));
        assert!(err.to_string().contains("certificate-path"));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_certificate_is_not_accessible() {
        let dir = TempDir::new().unwrap();
        let link = dir.path().join("App_TemporaryKey.pfx");
        std::os::unix::fs::symlink(dir.path().join("revoked/App.pfx"), &link).unwrap();

        let err = resolve_certificate(None, dir.path()).unwrap_err();
        assert!(matches!(err, PackageError::CertificateNotAccessible { path, .. } if path == link));
    }

    #[test]
    fn thumbprint_is_trimmed() {
        let system = MockSystem::with_stdout("  ABCDEF0123456789\r\n");
        let thumb = read_thumbprint(&system, Path::new("cert.pfx")).unwrap();
        assert_eq!(thumb, "ABCDEF0123456789");

        let calls = system.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "powershell");
        assert!(calls[0].1.last().unwrap().contains("Get-PfxCertificate -FilePath 'cert.pfx'"));
    }

    #[test]
    fn failing_inspection_is_an_error() {
        let system = MockSystem {
            captured_status: ProcessStatus { success: false, code: Some(1) },
            ..MockSystem::new()
        };
        let err = read_thumbprint(&system, Path::new("cert.pfx")).unwrap_err();
        assert!(matches!(err, PackageError::CertificateThumbprint { .. }));
    }

    #[test]
    fn single_quotes_are_escaped_for_powershell() {
        let (_, args) = thumbprint_command(Path::new("C:/O'Brien/key.pfx"));
        assert!(args[3].contains("'C:/O''Brien/key.pfx'"));
    }
}
