use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};
use log::{info, debug};

/// Exit information of an external process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessStatus {
    pub success: bool,
    pub code: Option<i32>,
}

/// Exit information plus captured standard output.
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    pub status: ProcessStatus,
    pub stdout: String,
}

/// Abstraction for host interactions (platform detection, external processes).
/// This allows us to mock MSBuild and PowerShell for testing.
pub trait SystemOps {
    /// Name of the host operating system (`std::env::consts::OS` style).
    fn host_os(&self) -> &str;

    /// Run the build tool, streaming its standard output into the log.
    ///
    /// Arguments are passed verbatim: the caller is responsible for quoting.
    fn run_streaming(&self, program: &str, args: &[String]) -> std::io::Result<ProcessStatus>;

    /// Run a short-lived command and capture its standard output.
    fn run_captured(&self, program: &str, args: &[String]) -> std::io::Result<CapturedOutput>;
}

/// The Real System implementation (Production).
pub struct WindowsSystem;

impl WindowsSystem {
    fn command(program: &str, args: &[String]) -> Command {
        let mut cmd = Command::new(program);
        for arg in args {
            // MSBuild parses its own command line. Rust's default quoting would turn
            // `/p:Key="C:\a b\c.pfx"` into `"/p:Key=\"C:\a b\c.pfx\""`, which it rejects.
            #[cfg(windows)]
            {
                use std::os::windows::process::CommandExt;
                cmd.raw_arg(arg);
            }
            #[cfg(not(windows))]
            {
                cmd.arg(arg);
            }
        }
        cmd
    }
}

impl SystemOps for WindowsSystem {
    fn host_os(&self) -> &str {
        std::env::consts::OS
    }

    fn run_streaming(&self, program: &str, args: &[String]) -> std::io::Result<ProcessStatus> {
        debug!("Spawning: {} {}", program, args.join(" "));
        let mut child = Self::command(program, args)
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;

        if let Some(stdout) = child.stdout.take() {
            for line in BufReader::new(stdout).lines() {
                match line {
                    Ok(line) => info!("{}", line),
                    // Non UTF-8 output from the tool; keep draining so it doesn't block.
                    Err(e) => debug!("Unreadable build output line: {}", e),
                }
            }
        }

        let status = child.wait()?;
        Ok(ProcessStatus { success: status.success(), code: status.code() })
    }

    fn run_captured(&self, program: &str, args: &[String]) -> std::io::Result<CapturedOutput> {
        debug!("Running: {} {}", program, args.join(" "));
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()?;

        Ok(CapturedOutput {
            status: ProcessStatus { success: output.status.success(), code: output.status.code() },
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        })
    }
}

/// A Mock System for Testing.
///
/// Records every invocation. When the build runs, the files listed in
/// `build_creates` are written to disk so artifact discovery has something to find.
#[cfg(test)]
#[derive(Debug)]
pub struct MockSystem {
    pub os: String,
    pub build_status: ProcessStatus,
    pub build_creates: Vec<std::path::PathBuf>,
    pub captured_stdout: String,
    pub captured_status: ProcessStatus,
    pub invocations: std::sync::Mutex<Vec<(String, Vec<String>)>>,
}

#[cfg(test)]
impl Default for MockSystem {
    fn default() -> Self {
        let ok = ProcessStatus { success: true, code: Some(0) };
        Self {
            os: "windows".to_string(),
            build_status: ok,
            build_creates: Vec::new(),
            captured_stdout: String::new(),
            captured_status: ok,
            invocations: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[cfg(test)]
impl MockSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stdout(stdout: &str) -> Self {
        Self {
            captured_stdout: stdout.to_string(),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.invocations.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl SystemOps for MockSystem {
    fn host_os(&self) -> &str {
        &self.os
    }

    fn run_streaming(&self, program: &str, args: &[String]) -> std::io::Result<ProcessStatus> {
        self.invocations.lock().unwrap().push((program.to_string(), args.to_vec()));
        for file in &self.build_creates {
            if let Some(parent) = file.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(file, b"package")?;
        }
        Ok(self.build_status)
    }

    fn run_captured(&self, program: &str, args: &[String]) -> std::io::Result<CapturedOutput> {
        self.invocations.lock().unwrap().push((program.to_string(), args.to_vec()));
        Ok(CapturedOutput { status: self.captured_status, stdout: self.captured_stdout.clone() })
    }
}
