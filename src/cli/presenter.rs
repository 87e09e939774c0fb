//! CLI presenter for output formatting

use std::time::Duration;

use colored::*;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::domain::conversion::{CapabilityVerdict, ConversionResult};
use crate::domain::error::ErrorKind;
use crate::domain::recording::format_clock;

/// Width of the recording progress bar in cells
const BAR_WIDTH: usize = 20;

/// Presenter for CLI output formatting
pub struct Presenter {
    spinner: Option<ProgressBar>,
}

impl Presenter {
    /// Create a new presenter
    pub fn new() -> Self {
        Self { spinner: None }
    }

    /// Start a spinner with message
    pub fn start_spinner(&mut self, message: &str) {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(spinner_style());
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(80));
        self.spinner = Some(spinner);
    }

    /// Mark spinner as success and finish
    pub fn spinner_success(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!("{} {}", "✓".green(), message));
        }
    }

    /// Mark spinner as failed and finish
    pub fn spinner_fail(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!("{} {}", "✗".red(), message));
        }
    }

    /// Spinner that callbacks can drive from other threads
    pub fn recording_spinner(&self, target_seconds: f64) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(spinner_style());
        spinner.set_message(format!(
            "Recording... {}",
            format_progress(0.0, target_seconds)
        ));
        spinner.enable_steady_tick(Duration::from_millis(80));
        spinner
    }

    /// Percent bar that stays hidden until [`reveal`] is called
    pub fn conversion_bar(&self) -> ProgressBar {
        let bar = ProgressBar::with_draw_target(Some(100), ProgressDrawTarget::hidden());
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} Converting [{bar:20.cyan}] {pos:>3}%")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█░ "),
        );
        bar
    }

    /// Print info message to stderr
    pub fn info(&self, message: &str) {
        eprintln!("{} {}", "ℹ".cyan(), message);
    }

    /// Print success message to stderr
    pub fn success(&self, message: &str) {
        eprintln!("{} {}", "✓".green(), message);
    }

    /// Print warning message to stderr
    pub fn warn(&self, message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Print error message to stderr
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Print a classified failure with its remediation steps
    pub fn error_kind(&self, kind: ErrorKind, message: &str) {
        eprintln!("{} {}: {}", "✗".red(), kind.title().bold(), message);
        eprintln!("  {}", kind.message_key().dimmed());
        for step in kind.remediation() {
            eprintln!("  {} {}", "→".cyan(), step);
        }
    }

    /// Output text to stdout
    pub fn output(&self, text: &str) {
        println!("{}", text);
    }

    /// Print a key-value pair (for config list)
    pub fn key_value(&self, key: &str, value: &str) {
        println!("{}: {}", key.cyan(), value);
    }

    /// Summary line for a finished conversion
    pub fn conversion_summary(&self, result: &ConversionResult, input_bytes: usize) {
        let bitrate = match result.metadata.bitrate_kbps {
            0 => "-".to_string(),
            kbps => format!("{} kbps", kbps),
        };
        self.success(&format!(
            "{} via {}: {} ({:.0}% of input), {}, {} Hz, {} ch, {}",
            result.compressed.mime_type(),
            result.strategy,
            result.compressed.human_readable_size(),
            result.size_ratio(input_bytes) * 100.0,
            format_clock(result.duration_seconds),
            result.metadata.sample_rate,
            result.metadata.channels,
            bitrate
        ));
    }

    /// Capability table for `check`
    pub fn capabilities(&self, verdict: &CapabilityVerdict) {
        let rows = [
            ("shared memory", verdict.shared_memory_supported),
            ("secure context", verdict.secure_context),
            ("recorder", verdict.recorder_api_supported),
            ("transcoder loaded", verdict.transcoder_loaded),
            ("native pipeline", verdict.native_pipeline_supported),
        ];
        for (name, ok) in rows {
            let mark = if ok { "✓".green() } else { "✗".red() };
            println!("{} {}", mark, name);
        }
    }
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new()
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Make a bar from [`Presenter::conversion_bar`] visible
pub fn reveal(bar: &ProgressBar) {
    bar.set_draw_target(ProgressDrawTarget::stderr());
    bar.enable_steady_tick(Duration::from_millis(80));
}

/// Format recording progress as a bar with elapsed and target clocks
pub fn format_progress(elapsed_seconds: f64, target_seconds: f64) -> String {
    let fraction = if target_seconds > 0.0 {
        (elapsed_seconds / target_seconds).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let filled = (fraction * BAR_WIDTH as f64) as usize;
    let empty = BAR_WIDTH - filled;

    format!(
        "[{}{}] {} / {}",
        "█".repeat(filled).cyan(),
        "░".repeat(empty),
        format_clock(elapsed_seconds),
        format_clock(target_seconds)
    )
}
