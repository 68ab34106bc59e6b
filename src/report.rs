//! Pass reporting.
//!
//! Console and null implementations of [`PassObserver`], plus a collecting
//! reporter used by tests to assert on the event sequence.

use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

use crate::error::Error;
use crate::orchestrator::PassObserver;

/// Console reporter with optional colors, writing to stderr by default.
pub struct ConsoleReporter {
    use_colors: bool,
    verbose: bool,
    output: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for ConsoleReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleReporter")
            .field("use_colors", &self.use_colors)
            .field("verbose", &self.verbose)
            .finish()
    }
}

impl ConsoleReporter {
    /// Create a console reporter. Colors follow stderr's tty status.
    pub fn new() -> Self {
        Self {
            use_colors: atty::is(atty::Stream::Stderr),
            verbose: false,
            output: Mutex::new(Box::new(std::io::stderr())),
        }
    }

    /// Create a console reporter that writes to a custom output.
    pub fn with_output<W: Write + Send + 'static>(output: W) -> Self {
        Self { use_colors: false, verbose: false, output: Mutex::new(Box::new(output)) }
    }

    /// Set whether to use colors.
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    /// Set verbose mode: per-stream start lines and skip notices.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn color(&self, text: &str, color: &str) -> String {
        if self.use_colors {
            format!("{}{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    fn green(&self, text: &str) -> String {
        self.color(text, "\x1b[32m")
    }

    fn yellow(&self, text: &str) -> String {
        self.color(text, "\x1b[33m")
    }

    fn red(&self, text: &str) -> String {
        self.color(text, "\x1b[31m")
    }

    fn cyan(&self, text: &str) -> String {
        self.color(text, "\x1b[36m")
    }

    fn writeln(&self, line: &str) {
        if let Ok(mut output) = self.output.lock() {
            let _ = writeln!(output, "{}", line);
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl PassObserver for ConsoleReporter {
    fn pass_started(&self, pass: u64, streams: usize) {
        self.writeln(&format!(
            "{} pass #{}: {} stream{}",
            self.cyan("[pass]"),
            pass,
            streams,
            if streams == 1 { "" } else { "s" }
        ));
    }

    fn stream_started(&self, _pass: u64, tag: &str) {
        if self.verbose {
            self.writeln(&format!("{} {} running...", self.cyan("[pass]"), tag));
        }
    }

    fn stream_finished(&self, _pass: u64, tag: &str, outputs: usize, elapsed: Duration) {
        self.writeln(&format!(
            "{} {} {} ({} file{}, {})",
            self.cyan("[pass]"),
            self.green("ok"),
            tag,
            outputs,
            if outputs == 1 { "" } else { "s" },
            format_duration(elapsed)
        ));
    }

    fn stream_skipped(&self, _pass: u64, tag: &str) {
        if self.verbose {
            self.writeln(&format!("{} {} {}", self.cyan("[pass]"), self.yellow("skipped"), tag));
        }
    }

    fn pass_completed(&self, pass: u64, outputs: usize, elapsed: Duration) {
        self.writeln(&format!(
            "{} pass #{} complete: {} file{} in {}",
            self.green("[done]"),
            pass,
            outputs,
            if outputs == 1 { "" } else { "s" },
            format_duration(elapsed)
        ));
    }

    fn pass_failed(&self, pass: u64, error: &Error) {
        self.writeln(&format!("{} pass #{} failed: {}", self.red("[error]"), pass, error));
    }
}

/// Reporter that discards all events.
#[derive(Debug, Default)]
pub struct NullReporter;

impl NullReporter {
    /// Create a null reporter.
    pub fn new() -> Self {
        Self
    }
}

impl PassObserver for NullReporter {}

/// Format a duration to a human-readable string.
fn format_duration(duration: Duration) -> String {
    let ms = duration.as_millis();
    if ms < 1000 {
        format!("{}ms", ms)
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}
