//! # Reporter
//!
//! Where the step's results go. The pipeline only talks to [`OutputSink`]; the
//! concrete sink is picked in `main.rs` from `--format` (or auto-detected when
//! running under GitHub Actions).

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use log::{warn, error};
use serde::Serialize;

pub const OUTPUT_DIRECTORY: &str = "output-directory";
pub const EXECUTABLE: &str = "executable";

/// Receives named results and advisories from a packaging run.
pub trait OutputSink {
    /// Publish a named result value.
    fn set_output(&mut self, name: &str, value: &str) -> std::io::Result<()>;

    /// Surface a non-fatal advisory to the caller.
    fn warning(&mut self, message: &str) {
        warn!("{}", message);
    }

    /// Surface a fatal error to the caller.
    fn failure(&mut self, message: &str) {
        error!("{}", message);
    }

    /// Flush anything buffered. Called once, at the end of the run.
    fn finish(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// GitHub Actions runner protocol.
///
/// Outputs are appended to the `$GITHUB_OUTPUT` file. Without one (e.g. an old
/// runner or a local run) they are printed as `name=value`.
pub struct GithubActions {
    output_file: Option<PathBuf>,
}

const HEREDOC_DELIMITER: &str = "APPXPACK_EOF";

impl GithubActions {
    pub fn new(output_file: Option<PathBuf>) -> Self {
        Self { output_file }
    }

    pub fn from_env() -> Self {
        Self::new(std::env::var_os("GITHUB_OUTPUT").filter(|v| !v.is_empty()).map(PathBuf::from))
    }

    fn format_entry(name: &str, value: &str) -> std::io::Result<String> {
        if !value.contains('\n') {
            return Ok(format!("{}={}\n", name, value));
        }
        if value.contains(HEREDOC_DELIMITER) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("value of '{}' contains the output delimiter", name),
            ));
        }
        Ok(format!("{name}<<{d}\n{value}\n{d}\n", d = HEREDOC_DELIMITER))
    }

    /// Workflow commands treat `%`, CR and LF specially in messages.
    fn escape_message(message: &str) -> String {
        message.replace('%', "%25").replace('\r', "%0D").replace('\n', "%0A")
    }
}

impl OutputSink for GithubActions {
    fn set_output(&mut self, name: &str, value: &str) -> std::io::Result<()> {
        let entry = Self::format_entry(name, value)?;
        match &self.output_file {
            Some(path) => {
                let mut file = OpenOptions::new().create(true).append(true).open(path)?;
                file.write_all(entry.as_bytes())
            }
            None => {
                print!("{}", entry);
                Ok(())
            }
        }
    }

    fn warning(&mut self, message: &str) {
        warn!("{}", message);
        println!("::warning::{}", Self::escape_message(message));
    }

    fn failure(&mut self, message: &str) {
        error!("{}", message);
        println!("::error::{}", Self::escape_message(message));
    }
}

/// Prints `name=value` lines on stdout. Warnings only go to the log.
pub struct Plain;

impl OutputSink for Plain {
    fn set_output(&mut self, name: &str, value: &str) -> std::io::Result<()> {
        println!("{}={}", name, value);
        Ok(())
    }
}

/// Collects everything and prints a single JSON object at the end.
#[derive(Debug, Default, Serialize)]
pub struct Json {
    outputs: BTreeMap<String, String>,
    warnings: Vec<String>,
    error: Option<String>,
}

impl OutputSink for Json {
    fn set_output(&mut self, name: &str, value: &str) -> std::io::Result<()> {
        self.outputs.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn warning(&mut self, message: &str) {
        warn!("{}", message);
        self.warnings.push(message.to_string());
    }

    fn failure(&mut self, message: &str) {
        error!("{}", message);
        self.error = Some(message.to_string());
    }

    fn finish(&mut self) -> std::io::Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        println!("{}", text);
        Ok(())
    }
}

/// In-memory sink for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemorySink {
    pub outputs: Vec<(String, String)>,
    pub warnings: Vec<String>,
}

#[cfg(test)]
impl MemorySink {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.outputs.iter().rev().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
impl OutputSink for MemorySink {
    fn set_output(&mut self, name: &str, value: &str) -> std::io::Result<()> {
        self.outputs.push((name.to_string(), value.to_string()));
        Ok(())
    }

    fn warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }
}
