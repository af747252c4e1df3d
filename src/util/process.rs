//! Subprocess execution utilities.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Output, Stdio};

use anyhow::{Context, Result};
use semver::Version;

use crate::core::errors::HookError;

/// An external tool invocation.
///
/// Hooks run tools with inherited stdio ([`run`](Self::run)) so npm and
/// lerna output reaches the terminal unchanged; only queries whose output
/// is parsed are captured.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|s| s.as_ref().to_string_lossy().into_owned()));
        self
    }

    /// Run in `cwd` instead of the invocation directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        cmd
    }

    /// Run with captured stdout and stderr; stdin is closed.
    pub fn output(&self) -> Result<Output> {
        tracing::debug!("running `{}` (captured)", self.display_command());
        self.command()
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("failed to execute `{}`", self.program.display()))
    }

    /// Run with inherited stdio and return the exit status.
    pub fn status(&self) -> Result<ExitStatus> {
        tracing::debug!("running `{}`", self.display_command());
        self.command()
            .status()
            .with_context(|| format!("failed to execute `{}`", self.program.display()))
    }

    /// Run with inherited stdio and fail on a non-zero exit code.
    ///
    /// This is the fail-fast primitive every hook uses for external tools.
    pub fn run(&self) -> Result<()> {
        let status = self.status()?;
        self.check(status)
    }

    /// Run captured, require success and return stdout.
    pub fn read_stdout(&self) -> Result<String> {
        let output = self.output()?;
        if !output.status.success() {
            tracing::debug!(
                "`{}` stderr: {}",
                self.display_command(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        self.check(output.status)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn check(&self, status: ExitStatus) -> Result<()> {
        if status.success() {
            return Ok(());
        }
        Err(HookError::ToolFailed {
            command: self.display_command(),
            code: status.code(),
        }
        .into())
    }

    /// The command line as shown in messages.
    pub fn display_command(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Resolve a configured tool, failing with [`HookError::ToolNotFound`] when it
/// is neither an existing path nor on PATH.
pub fn require_tool(name: &str) -> Result<PathBuf> {
    let candidate = Path::new(name);
    if candidate.components().count() > 1 && candidate.exists() {
        return Ok(candidate.to_path_buf());
    }
    which::which(name).map_err(|_| {
        HookError::ToolNotFound {
            tool: name.to_string(),
        }
        .into()
    })
}

/// Start a command for a configured tool.
pub fn tool(name: &str) -> Result<ProcessBuilder> {
    Ok(ProcessBuilder::new(require_tool(name)?))
}

/// Parse the output of `<tool> --version` into a semantic version.
///
/// Accepts the usual shapes: `v18.17.0`, `9.6.7`, `Python 3.11.4`.
pub fn parse_tool_version(output: &str) -> Option<Version> {
    output
        .split_whitespace()
        .map(|word| word.trim_start_matches('v'))
        .find_map(|word| Version::parse(word).ok())
}

/// Query the version of a tool by running `<tool> --version`.
pub fn tool_version(tool: &str) -> Result<Version> {
    let program = require_tool(tool)?;
    let stdout = ProcessBuilder::new(&program)
        .arg("--version")
        .read_stdout()?;
    parse_tool_version(&stdout)
        .with_context(|| format!("could not parse version of `{}` from {:?}", tool, stdout.trim()))
}

/// Ensure that a tool's major version matches the pinned one.
pub fn check_major_version(tool: &str, required_major: u64) -> Result<Version> {
    let found = tool_version(tool)?;
    if found.major != required_major {
        return Err(HookError::VersionMismatch {
            tool: tool.to_string(),
            required: required_major,
            found,
        }
        .into());
    }
    tracing::debug!("{} {} satisfies major {}", tool, found, required_major);
    Ok(found)
}
