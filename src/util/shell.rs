//! Centralized shell output and progress management.
//!
//! The Shell provides one API for all user-facing CLI output:
//! - Status messages with consistent formatting
//! - Progress bars (via indicatif) for loops over components
//! - Scoped timing spans with delayed start
//! - Verbatim argument echo for dry-run hook invocations
//!
//! Hooks never manage spacing or colors directly. Diagnostics for developers
//! go through `tracing`, not through the Shell.

use std::fmt::Display;
use std::io::{self, IsTerminal};
use std::sync::Arc;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// --quiet: errors only, no progress
    Quiet,
    /// Default: status messages + progress bars
    #[default]
    Normal,
    /// --verbose: immediate status lines, no progress bars
    Verbose,
}

/// Color output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Detect TTY and use colors if available.
    #[default]
    Auto,
    /// Always use ANSI colors.
    Always,
    /// Never use ANSI colors.
    Never,
}

/// Status types for output messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    // Success statuses (green)
    Added,
    Created,
    Finished,
    Published,
    Committed,

    // In-progress statuses (cyan)
    Running,
    Building,
    Testing,
    Installing,
    Fetching,
    Merging,
    Publishing,

    // Info statuses (blue)
    Info,

    // Warning statuses (yellow)
    Skipped,
    Warning,

    // Error status (red)
    Error,
}

impl Status {
    fn as_str(&self) -> &'static str {
        match self {
            Status::Added => "Added",
            Status::Created => "Created",
            Status::Finished => "Finished",
            Status::Published => "Published",
            Status::Committed => "Committed",
            Status::Running => "Running",
            Status::Building => "Building",
            Status::Testing => "Testing",
            Status::Installing => "Installing",
            Status::Fetching => "Fetching",
            Status::Merging => "Merging",
            Status::Publishing => "Publishing",
            Status::Info => "Info",
            Status::Skipped => "Skipped",
            Status::Warning => "Warning",
            Status::Error => "error",
        }
    }

    fn color_code(&self) -> &'static str {
        match self {
            Status::Added
            | Status::Created
            | Status::Finished
            | Status::Published
            | Status::Committed => "\x1b[1;32m",
            Status::Running
            | Status::Building
            | Status::Testing
            | Status::Installing
            | Status::Fetching
            | Status::Merging
            | Status::Publishing => "\x1b[1;36m",
            Status::Info => "\x1b[1;34m",
            Status::Skipped | Status::Warning => "\x1b[1;33m",
            Status::Error => "\x1b[1;31m",
        }
    }

    /// Statuses are right-aligned to this width.
    const WIDTH: usize = 12;
}

/// Central shell for all CLI output.
#[derive(Debug)]
pub struct Shell {
    verbosity: Verbosity,
    use_color: bool,
}

impl Shell {
    /// Create a new shell.
    pub fn new(verbosity: Verbosity, color: ColorChoice) -> Self {
        let use_color = match color {
            ColorChoice::Auto => io::stderr().is_terminal(),
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        };

        Shell {
            verbosity,
            use_color,
        }
    }

    /// Create a shell from CLI flags; quiet wins over verbose.
    pub fn from_flags(quiet: bool, verbose: bool, color: ColorChoice) -> Self {
        let verbosity = if quiet {
            Verbosity::Quiet
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        };
        Shell::new(verbosity, color)
    }

    pub fn is_quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }

    pub fn is_verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }

    /// Print a status message.
    ///
    /// Format: `{status:>12} {message}`. In quiet mode only errors print.
    pub fn status(&self, status: Status, msg: impl Display) {
        if self.is_quiet() && status != Status::Error {
            return;
        }
        eprintln!("{} {}", self.format_status(status), msg);
    }

    /// Print an info message.
    pub fn note(&self, msg: impl Display) {
        self.status(Status::Info, msg);
    }

    /// Print a warning message.
    pub fn warn(&self, msg: impl Display) {
        self.status(Status::Warning, msg);
    }

    /// Print free-form text (multi-line listings) unless quiet.
    pub fn print(&self, text: impl Display) {
        if !self.is_quiet() {
            eprintln!("{}", text);
        }
    }

    /// Echo hook arguments verbatim, one per line.
    ///
    /// Arguments holding JSON are pretty-printed so nested payloads stay
    /// readable. This always prints, even in quiet mode: it is requested
    /// explicitly through the dry-run flag.
    pub fn echo_args(&self, hook: &str, args: &[String]) {
        eprintln!("{} `{}` received {} argument(s):", self.format_status(Status::Info), hook, args.len());
        for (i, arg) in args.iter().enumerate() {
            eprintln!("  ${}: {}", i + 1, render_arg(arg));
        }
    }

    fn format_status(&self, status: Status) -> String {
        let text = status.as_str();
        if self.use_color {
            format!(
                "{}{:>width$}\x1b[0m",
                status.color_code(),
                text,
                width = Status::WIDTH
            )
        } else {
            format!("{:>width$}", text, width = Status::WIDTH)
        }
    }

    /// Create a scoped span for timing operations.
    ///
    /// The start message is printed immediately in verbose mode, otherwise
    /// only when the operation runs longer than the delay.
    pub fn span(self: &Arc<Self>, status: Status, msg: impl Display) -> Span {
        Span::new(Arc::clone(self), status, msg.to_string())
    }

    /// Create a progress bar; a no-op in quiet or verbose mode.
    pub fn progress(self: &Arc<Self>, total: u64, msg: impl Display) -> Progress {
        Progress::new(Arc::clone(self), total, msg.to_string())
    }
}

/// Pretty-print an argument if it parses as a JSON array or object.
fn render_arg(arg: &str) -> String {
    let trimmed = arg.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(arg) {
            if let Ok(pretty) = serde_json::to_string_pretty(&value) {
                return pretty.replace('\n', "\n    ");
            }
        }
    }
    arg.to_string()
}

/// A scoped timing span with delayed start output.
///
/// The end message with duration is printed on [`Span::finish_with_message`]
/// or on drop.
pub struct Span {
    shell: Arc<Shell>,
    status: Status,
    message: String,
    start: Instant,
    start_printed: bool,
    finished: bool,
}

impl Span {
    /// Delay before a start message is worth printing.
    const DEFAULT_DELAY: Duration = Duration::from_millis(200);

    fn new(shell: Arc<Shell>, status: Status, message: String) -> Self {
        let start_printed = shell.is_verbose();
        if start_printed {
            shell.status(status, &message);
        }

        Span {
            shell,
            status,
            message,
            start: Instant::now(),
            start_printed,
            finished: false,
        }
    }

    /// Mark the span as finished with a custom message.
    pub fn finish_with_message(mut self, msg: impl Display) {
        self.finished = true;
        let duration_str = format_duration(self.start.elapsed());
        self.shell
            .status(Status::Finished, format!("{} in {}", msg, duration_str));
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        let elapsed = self.start.elapsed();
        if self.start_printed || elapsed > Self::DEFAULT_DELAY {
            self.shell
                .status(Status::Finished, format!("in {}", format_duration(elapsed)));
        }
    }
}

/// Progress bar wrapper that respects shell verbosity.
pub struct Progress {
    shell: Arc<Shell>,
    pb: Option<ProgressBar>,
    total: u64,
    current: u64,
    message: String,
}

impl Progress {
    fn new(shell: Arc<Shell>, total: u64, message: String) -> Self {
        let pb = if shell.is_quiet() || shell.is_verbose() || total <= 1 {
            None
        } else {
            let pb = ProgressBar::new(total);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len}")
            {
                pb.set_style(style.progress_chars("#>-"));
            }
            pb.set_message(message.clone());
            Some(pb)
        };

        Progress {
            shell,
            pb,
            total,
            current: 0,
            message,
        }
    }

    /// Advance the progress.
    pub fn inc(&mut self, delta: u64) {
        self.current += delta;

        if let Some(pb) = &self.pb {
            pb.inc(delta);
        }

        if self.shell.is_verbose() {
            eprintln!("  {} [{}/{}]", self.message, self.current, self.total);
        }
    }

    /// Print a line above the bar without tearing it.
    pub fn println(&self, msg: impl Display) {
        match &self.pb {
            Some(pb) => pb.println(msg.to_string()),
            None => self.shell.print(msg),
        }
    }

    /// Finish and clear the progress bar.
    pub fn finish(&self) {
        if let Some(pb) = &self.pb {
            pb.finish_and_clear();
        }
    }
}

/// Format a duration in a human-readable way.
fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 60.0 {
        format!("{:.2}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}
