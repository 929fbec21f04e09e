//! # Output Cleaner
//!
//! Makes sure the packaging output directory does not exist before MSBuild runs,
//! so artifact discovery afterwards only sees packages from this build.
//!
//! Cleanup failure is fatal: a leftover `AppPackages` tree could hand a stale
//! package to the caller as if it were fresh.

use std::io::ErrorKind;
use std::path::Path;
use log::{info, debug};
use crate::error::PackageError;

/// Removes `output_dir` recursively. A missing directory is a no-op.
///
/// # Returns
///
/// `Ok(true)` if something was removed, `Ok(false)` if there was nothing to clean.
pub fn clean_output_directory(output_dir: &Path) -> Result<bool, PackageError> {
    match std::fs::symlink_metadata(output_dir) {
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("Nothing to clean at {:?}", output_dir);
            return Ok(false);
        }
        Err(source) => {
            return Err(PackageError::CleanupFailed { path: output_dir.to_path_buf(), source });
        }
        Ok(_) => {}
    }

    info!("Cleaning AppPackages directory: {}", output_dir.display());
    match std::fs::remove_dir_all(output_dir) {
        Ok(()) => Ok(true),
        // Raced with someone else removing it; the postcondition holds.
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(true),
        Err(source) => Err(PackageError::CleanupFailed { path: output_dir.to_path_buf(), source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn removes_existing_tree() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("AppPackages");
        fs::create_dir_all(out.join("App_1.0.0.0_Test/Dependencies/x64")).unwrap();
        fs::write(out.join("App_1.0.0.0_Test/App.msix"), b"old").unwrap();

        assert!(clean_output_directory(&out).unwrap());
        assert!(!out.exists());
        assert!(dir.path().exists());
    }

    #[test]
    fn missing_directory_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("AppPackages");
        assert!(!clean_output_directory(&out).unwrap());
        assert!(!clean_output_directory(&out).unwrap());
    }

    #[test]
    fn a_file_in_the_way_is_an_error() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("AppPackages");
        fs::write(&out, b"not a directory").unwrap();

        let err = clean_output_directory(&out).unwrap_err();
        assert!(matches!(err, PackageError::CleanupFailed { path, .. } if path == out));
    }
}
