//! # Doctor
//!
//! Read-only health report for a project: can this host package it, and what
//! would `package` pick? Nothing is cleaned, built or signed.

use std::path::{Path, PathBuf};
use crate::discovery::{self, glob_files, resolve_solution};
use crate::platform;
use crate::system::SystemOps;

/// Findings of a doctor run, printed by [`print_report`].
#[derive(Debug)]
pub struct DoctorReport {
    pub host_os: String,
    pub platform_ok: bool,
    /// Version line of `<msbuild> -version`, or why it could not be run.
    pub build_tool: Result<String, String>,
    pub solution: Result<PathBuf, String>,
    pub certificates: Vec<PathBuf>,
}

impl DoctorReport {
    pub fn is_healthy(&self) -> bool {
        self.platform_ok && self.build_tool.is_ok() && self.solution.is_ok()
    }
}

fn query_build_tool(system: &impl SystemOps, msbuild: &str) -> Result<String, String> {
    match system.run_captured(msbuild, &["-version".to_string(), "-nologo".to_string()]) {
        Ok(output) if output.status.success => Ok(output
            .stdout
            .lines()
            .map(str::trim)
            .rfind(|l| !l.is_empty())
            .unwrap_or("unknown version")
            .to_string()),
        Ok(output) => Err(format!("`{} -version` exited with {:?}", msbuild, output.status.code)),
        Err(e) => Err(format!("`{}` could not be started: {}", msbuild, e)),
    }
}

/// Inspects the project without modifying anything.
pub fn diagnose(system: &impl SystemOps, project_path: &Path, msbuild: &str) -> DoctorReport {
    let platform_ok = platform::ensure_supported(system).is_ok();
    let build_tool = query_build_tool(system, msbuild);

    let location = resolve_solution(project_path);
    let certificates = match &location {
        Ok(loc) => glob_files(&discovery::default_certificate_pattern(&loc.project_root))
            .map(|m| m.candidates)
            .unwrap_or_default(),
        Err(_) => Vec::new(),
    };

    DoctorReport {
        host_os: system.host_os().to_string(),
        platform_ok,
        build_tool,
        solution: location.map(|l| l.solution).map_err(|e| e.to_string()),
        certificates,
    }
}

pub fn print_report(report: &DoctorReport) {
    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                   Packaging Health Report");
    println!("═══════════════════════════════════════════════════════════════");
    println!();

    if report.platform_ok {
        println!("  ✓ Host: {}", report.host_os);
    } else {
        println!("  ⚠ Host: {} (packaging requires Windows)", report.host_os);
    }

    match &report.build_tool {
        Ok(version) => println!("  ✓ Build tool: {}", version),
        Err(e) => println!("  ⚠ Build tool: {}", e),
    }

    match &report.solution {
        Ok(path) => println!("  ✓ Solution: {}", path.display()),
        Err(e) => println!("  ⚠ Solution: {}", e),
    }

    match report.certificates.len() {
        0 => println!("  - Certificates: none found (only needed for sideload packages)"),
        1 => println!("  ✓ Certificate: {}", report.certificates[0].display()),
        n => {
            println!("  ⚠ Certificates: {} found, sideload would use the first:", n);
            for cert in &report.certificates {
                println!("      - {}", cert.display());
            }
        }
    }

    println!();
    println!("───────────────────────────────────────────────────────────────");
    if report.is_healthy() {
        println!("✓ Ready to package.");
    } else {
        println!("Fix the issues above before running 'appxpack package'.");
    }
    println!();
}
