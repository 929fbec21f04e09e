//! # Platform Guard
//!
//! MSBuild's app-packaging targets and `Get-PfxCertificate` only exist on Windows.
//! Fail fast elsewhere instead of letting the build tool produce a confusing error.

use log::debug;
use crate::error::PackageError;
use crate::system::SystemOps;

/// Returns `Ok(())` when the host reports itself as Windows.
pub fn ensure_supported(system: &impl SystemOps) -> Result<(), PackageError> {
    let os = system.host_os();
    debug!("Host platform: {}", os);
    if os == "windows" {
        Ok(())
    } else {
        Err(PackageError::PlatformUnsupported(os.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::MockSystem;

    #[test]
    fn windows_is_supported() {
        assert!(ensure_supported(&MockSystem::new()).is_ok());
    }

    #[test]
    fn other_hosts_are_rejected() {
        for os in ["linux", "macos", "freebsd"] {
            let system = MockSystem { os: os.to_string(), ..MockSystem::new() };
            match ensure_supported(&system) {
                Err(PackageError::PlatformUnsupported(found)) => assert_eq!(found, os),
                other => panic!("expected PlatformUnsupported, got {:?}", other),
            }
        }
    }
}
