//! # Discovery Module
//!
//! Filesystem lookups for the packaging pipeline:
//!
//! 1.  **Solution**: a literal `.sln` path, or the first `**/*.sln` under a
//!     directory or a directory pattern.
//! 2.  **Certificates**: every file matching a signing-certificate glob.
//! 3.  **Artifacts**: produced package files under `AppPackages`, minus the
//!     `dependencies` subtree (framework packages, not ours).
//!
//! Every multi-match lookup is sorted lexically, so "first match" is deterministic
//! regardless of how the filesystem enumerates entries.

use std::fs::File;
use std::path::{Path, PathBuf};
use glob::{glob_with, MatchOptions, Pattern};
use log::{debug, warn};
use walkdir::{DirEntry, WalkDir};
use crate::config::PackageType;
use crate::error::PackageError;
use crate::invariants::{assert_invariant, SELECTION_SKIPS_DEPENDENCIES};

pub const SOLUTION_EXTENSION: &str = "sln";
pub const OUTPUT_DIRECTORY_NAME: &str = "AppPackages";
pub const DEPENDENCIES_DIRECTORY_NAME: &str = "dependencies";

/// Package suffixes scanned after a build.
pub const PACKAGE_EXTENSIONS: &[&str] =
    &["appx", "msix", "appxbundle", "msixbundle", "appxupload", "msixupload"];
const UPLOAD_EXTENSIONS: &[&str] = &["appxupload", "msixupload"];
const SIDELOAD_EXTENSIONS: &[&str] = &["appx", "msix", "appxbundle", "msixbundle"];

/// A resolved solution and the directory packaging happens relative to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionLocation {
    pub solution: PathBuf,
    /// `AppPackages` and the default certificate search live under here.
    pub project_root: PathBuf,
}

/// Files discovered by a glob, sorted; the first one is the pick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matches {
    pub candidates: Vec<PathBuf>,
}

impl Matches {
    pub fn first(&self) -> Option<&PathBuf> {
        self.candidates.first()
    }

    pub fn is_ambiguous(&self) -> bool {
        self.candidates.len() > 1
    }
}

/// Windows paths are case-insensitive, and `*` should cross dot-files.
fn match_options() -> MatchOptions {
    MatchOptions {
        case_sensitive: false,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    }
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

/// Expands a glob pattern to the sorted list of matching entries.
///
/// Directories are skipped. Unreadable directory entries are logged and skipped.
pub fn glob_files(pattern: &str) -> Result<Matches, PackageError> {
    let paths =
        glob_with(pattern, match_options()).map_err(|source| invalid_pattern(pattern, source))?;

    let mut candidates = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) if !path.is_dir() => candidates.push(path),
            Ok(_) => {}
            Err(e) => warn!("Skipping unreadable path while globbing '{}': {}", pattern, e),
        }
    }
    candidates.sort();
    candidates.dedup();
    Ok(Matches { candidates })
}

fn invalid_pattern(pattern: &str, source: glob::PatternError) -> PackageError {
    PackageError::InvalidPattern { pattern: pattern.to_string(), source }
}

/// Builds `<dir>/**/*.<ext>` with `dir` escaped, so `[`, `*` and `?` in
/// directory names are matched literally.
pub fn recursive_pattern(dir: &Path, extension: &str) -> String {
    let escaped = Pattern::escape(&dir.to_string_lossy());
    format!("{}/**/*.{}", escaped.trim_end_matches(['/', '\\']), extension)
}

/// Checks that `path` can actually be opened for reading.
pub fn ensure_readable(path: &Path) -> std::io::Result<()> {
    File::open(path).map(|_| ())
}

fn is_pattern(path: &Path) -> bool {
    path.to_string_lossy().contains(['*', '?', '['])
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// The outermost ancestor of `solution` that `pattern` matches on its own,
/// with `*` and `?` stopping at separators.
fn pattern_root(pattern: &str, solution: &Path) -> Result<PathBuf, PackageError> {
    let compiled = Pattern::new(pattern).map_err(|source| invalid_pattern(pattern, source))?;
    let options = MatchOptions { require_literal_separator: true, ..match_options() };
    let root = solution
        .ancestors()
        .skip(1)
        .filter(|dir| compiled.matches_path_with(dir, options))
        .last()
        .map(Path::to_path_buf);
    Ok(root.unwrap_or_else(|| parent_dir(solution)))
}

fn first_solution(pattern: &str, project_path: &Path) -> Result<PathBuf, PackageError> {
    let matches = glob_files(pattern)?;
    if matches.is_ambiguous() {
        debug!("Multiple solutions found, using the first: {:?}", matches.candidates);
    }
    matches
        .first()
        .cloned()
        .ok_or_else(|| PackageError::SolutionNotFound(project_path.to_path_buf()))
}

/// Resolves the project input to exactly one readable solution file.
///
/// The input is tried, in order, as:
///
/// 1.  A `.sln` file path, used as-is (also when its name contains `[`).
/// 2.  A directory, searched recursively. Its name is matched literally.
/// 3.  A glob pattern. One ending in `.sln` must match solutions directly;
///     anything else names directories that are searched recursively.
///
/// The lexically first match wins. The project root is the solution's directory
/// for `.sln` inputs, and the searched directory otherwise.
pub fn resolve_solution(project_path: &Path) -> Result<SolutionLocation, PackageError> {
    let names_solution = has_extension(project_path, &[SOLUTION_EXTENSION]);

    let literal = !is_pattern(project_path) || project_path.is_file();
    let (solution, project_root) = if names_solution && literal {
        if !project_path.is_file() {
            return Err(PackageError::SolutionNotFound(project_path.to_path_buf()));
        }
        (project_path.to_path_buf(), parent_dir(project_path))
    } else if project_path.is_dir() || !is_pattern(project_path) {
        let pattern = recursive_pattern(project_path, SOLUTION_EXTENSION);
        (first_solution(&pattern, project_path)?, project_path.to_path_buf())
    } else {
        let raw = project_path.to_string_lossy();
        let raw = raw.trim_end_matches(['/', '\\']);
        if names_solution {
            let solution = first_solution(raw, project_path)?;
            let root = parent_dir(&solution);
            (solution, root)
        } else {
            let pattern = format!("{}/**/*.{}", raw, SOLUTION_EXTENSION);
            let solution = first_solution(&pattern, project_path)?;
            let root = pattern_root(raw, &solution)?;
            (solution, root)
        }
    };

    ensure_readable(&solution).map_err(|source| PackageError::SolutionNotAccessible {
        path: solution.clone(),
        source,
    })?;

    Ok(SolutionLocation { solution, project_root })
}

/// Default signing-certificate pattern: any `.pfx` under the project.
pub fn default_certificate_pattern(project_root: &Path) -> String {
    recursive_pattern(project_root, "pfx")
}

fn is_dependencies_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry.file_name().to_string_lossy().eq_ignore_ascii_case(DEPENDENCIES_DIRECTORY_NAME)
}

/// Lists every package file under `output_dir`, sorted, skipping `dependencies/`.
///
/// A missing output directory yields an empty list.
pub fn discover_artifacts(output_dir: &Path) -> Vec<PathBuf> {
    let mut artifacts: Vec<PathBuf> = WalkDir::new(output_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_dependencies_dir(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && has_extension(e.path(), PACKAGE_EXTENSIONS))
        .map(|e| e.into_path())
        .collect();
    artifacts.sort();
    artifacts
}

/// Picks the artifact for the requested package type: the first match in
/// discovery order, or `None` if nothing of that kind was produced.
pub fn select_artifact(
    output_dir: &Path,
    artifacts: &[PathBuf],
    package_type: PackageType,
) -> Option<PathBuf> {
    let wanted = match package_type {
        PackageType::Upload => UPLOAD_EXTENSIONS,
        PackageType::Sideload => SIDELOAD_EXTENSIONS,
    };
    let selected = artifacts.iter().find(|p| has_extension(p, wanted)).cloned();

    if let Some(path) = &selected {
        let relative = path.strip_prefix(output_dir).unwrap_or(path);
        let inside_dependencies = relative.components().any(|c| {
            c.as_os_str().to_string_lossy().eq_ignore_ascii_case(DEPENDENCIES_DIRECTORY_NAME)
        });
        assert_invariant(
            !inside_dependencies,
            SELECTION_SKIPS_DEPENDENCIES,
            "Artifacts",
        );
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invariants::contract_test;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"x").unwrap();
        path
    }

    #[test]
    fn literal_solution_is_returned_unchanged() {
        let dir = TempDir::new().unwrap();
        let sln = touch(dir.path(), "src/App.sln");
        // A second solution that a glob would have found first.
        touch(dir.path(), "src/AAA.sln");

        let location = resolve_solution(&sln).unwrap();
        assert_eq!(location.solution, sln);
        assert_eq!(location.project_root, dir.path().join("src"));
    }

    #[test]
    fn missing_literal_solution_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = resolve_solution(&dir.path().join("Nope.sln")).unwrap_err();
        assert!(matches!(err, PackageError::SolutionNotFound(_)));
    }

    #[test]
    fn single_solution_in_directory_is_found() {
        let dir = TempDir::new().unwrap();
        let sln = touch(dir.path(), "nested/deeper/App.sln");
        touch(dir.path(), "nested/App.csproj");

        let location = resolve_solution(dir.path()).unwrap();
        assert_eq!(location.solution, sln);
        assert_eq!(location.project_root, dir.path());
    }

    #[test]
    fn empty_directory_is_not_found() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "readme.md");
        let err = resolve_solution(dir.path()).unwrap_err();
        assert!(matches!(err, PackageError::SolutionNotFound(p) if p == dir.path()));
    }

    #[test]
    fn multiple_solutions_pick_lexically_first() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "b/Zeta.sln");
        let first = touch(dir.path(), "a/Alpha.sln");
        assert_eq!(resolve_solution(dir.path()).unwrap().solution, first);
    }

    #[test]
    fn glob_metacharacters_in_directory_are_literal() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("app [v2]");
        let sln = touch(&root, "App.sln");
        assert_eq!(resolve_solution(&root).unwrap().solution, sln);
        assert_eq!(resolve_solution(&sln).unwrap().project_root, root);
    }

    fn escaped(dir: &Path) -> String {
        Pattern::escape(&dir.to_string_lossy())
    }

    #[test]
    fn wildcard_project_path_searches_matching_directories() {
        let dir = TempDir::new().unwrap();
        let sln = touch(dir.path(), "proj1/src/App.sln");
        touch(dir.path(), "other/Other.sln");

        let input = PathBuf::from(format!("{}/proj*", escaped(dir.path())));
        let location = resolve_solution(&input).unwrap();
        assert_eq!(location.solution, sln);
        assert_eq!(location.project_root, dir.path().join("proj1"));
    }

    #[test]
    fn solution_pattern_matches_files_directly() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "app/Zeta.sln");
        let first = touch(dir.path(), "app/Alpha.sln");

        let input = PathBuf::from(format!("{}/app/*.sln", escaped(dir.path())));
        let location = resolve_solution(&input).unwrap();
        assert_eq!(location.solution, first);
        assert_eq!(location.project_root, dir.path().join("app"));
    }

    #[test]
    fn pattern_without_matches_is_not_found() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "proj1/readme.md");
        let input = PathBuf::from(format!("{}/proj*", escaped(dir.path())));
        let err = resolve_solution(&input).unwrap_err();
        assert!(matches!(err, PackageError::SolutionNotFound(p) if p == input));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_solution_is_not_accessible() {
        let dir = TempDir::new().unwrap();
        let link = dir.path().join("App.sln");
        std::os::unix::fs::symlink(dir.path().join("moved/App.sln"), &link).unwrap();

        let err = resolve_solution(dir.path()).unwrap_err();
        assert!(matches!(err, PackageError::SolutionNotAccessible { path, .. } if path == link));
    }

    #[test]
    fn certificate_glob_returns_all_candidates_sorted() {
        let dir = TempDir::new().unwrap();
        let b = touch(dir.path(), "pkg/B.pfx");
        let a = touch(dir.path(), "A.pfx");
        touch(dir.path(), "A.cer");

        let matches = glob_files(&default_certificate_pattern(dir.path())).unwrap();
        assert_eq!(matches.candidates, vec![a.clone(), b]);
        assert!(matches.is_ambiguous());
        assert_eq!(matches.first(), Some(&a));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = glob_files("[").unwrap_err();
        assert!(matches!(err, PackageError::InvalidPattern { .. }));
    }

    #[test]
    fn artifacts_skip_dependencies_subtree() {
        let dir = TempDir::new().unwrap();
        let bundle = touch(dir.path(), "App_1.0.0.0_Test/foo.appxbundle");
        touch(dir.path(), "App_1.0.0.0_Test/Dependencies/x64/bar.appx");
        touch(dir.path(), "App_1.0.0.0_Test/dependencies/bar.appx");
        touch(dir.path(), "App_1.0.0.0_Test/Install.ps1");

        let artifacts = discover_artifacts(dir.path());
        assert_eq!(artifacts, vec![bundle.clone()]);
        assert_eq!(select_artifact(dir.path(), &artifacts, PackageType::Sideload), Some(bundle));
        assert_eq!(select_artifact(dir.path(), &artifacts, PackageType::Upload), None);
        contract_test("Artifacts", &[SELECTION_SKIPS_DEPENDENCIES]);
    }

    #[test]
    fn upload_selects_upload_suffix() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "App_1.0.0.0_x64_Test/App_1.0.0.0_x64.msix");
        let upload = touch(dir.path(), "App_1.0.0.0_x64_bundle.msixupload");

        let artifacts = discover_artifacts(dir.path());
        assert_eq!(artifacts.len(), 2);
        assert_eq!(select_artifact(dir.path(), &artifacts, PackageType::Upload), Some(upload));
    }

    #[test]
    fn missing_output_directory_has_no_artifacts() {
        let dir = TempDir::new().unwrap();
        assert!(discover_artifacts(&dir.path().join(OUTPUT_DIRECTORY_NAME)).is_empty());
    }
}
