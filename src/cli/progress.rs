//! Progress rendering for the movemint CLI
//!
//! Renders [`ProgressTracker`](crate::progress::ProgressTracker) events in
//! whichever mode fits the output:
//! - TTY mode: one animated bar per operation
//! - Non-TTY mode: a line per 10% step and per stage change
//! - Robot mode: JSON progress events to stderr
//! - Quiet mode: No output
//!
//! # Usage
//!
//! ```rust,ignore
//! let reporter = ProgressReporter::new(robot_mode, quiet);
//! let mut tracker = ProgressTracker::default();
//! tracker.subscribe(reporter.listener());
//! ```

use std::collections::HashMap;
use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use serde::Serialize;

use crate::progress::{OperationProgress, ProgressEvent, ProgressEventKind, ProgressListener};

/// Progress output mode based on terminal capabilities and user preferences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMode {
    /// TTY mode: animated spinners and progress bars
    Tty,
    /// Non-TTY mode: simple line-by-line output to stderr
    NonTty,
    /// Robot mode: JSON progress events to stderr
    Robot,
    /// Quiet mode: no progress output
    Quiet,
}

impl ProgressMode {
    /// Detect the appropriate progress mode based on environment
    #[must_use]
    pub fn detect(robot_mode: bool, quiet: bool) -> Self {
        if quiet {
            Self::Quiet
        } else if robot_mode {
            Self::Robot
        } else if std::io::stderr().is_terminal() {
            Self::Tty
        } else {
            Self::NonTty
        }
    }

    #[must_use]
    pub const fn has_output(&self) -> bool {
        !matches!(self, Self::Quiet)
    }
}

/// JSON line written to stderr in robot mode
#[derive(Debug, Clone, Serialize)]
pub struct RobotProgressLine<'a> {
    #[serde(rename = "type")]
    pub line_type: &'static str,
    pub event: ProgressEventKind,
    pub operation: &'a OperationProgress,
    pub timestamp: String,
}

impl<'a> RobotProgressLine<'a> {
    fn new(event: &'a ProgressEvent) -> Self {
        Self {
            line_type: "progress",
            event: event.kind,
            operation: &event.operation,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Progress reporter that adapts to output context
#[derive(Clone)]
pub struct ProgressReporter {
    inner: Arc<Renderer>,
}

struct Renderer {
    mode: ProgressMode,
    multi: Option<MultiProgress>,
    bars: Mutex<HashMap<String, ProgressBar>>,
    /// Last 10% step printed per operation in non-TTY mode
    steps: Mutex<HashMap<String, u64>>,
}

impl ProgressReporter {
    #[must_use]
    pub fn new(robot_mode: bool, quiet: bool) -> Self {
        Self::with_mode(ProgressMode::detect(robot_mode, quiet))
    }

    #[must_use]
    pub fn with_mode(mode: ProgressMode) -> Self {
        let multi = (mode == ProgressMode::Tty).then(MultiProgress::new);
        Self {
            inner: Arc::new(Renderer {
                mode,
                multi,
                bars: Mutex::new(HashMap::new()),
                steps: Mutex::new(HashMap::new()),
            }),
        }
    }

    #[must_use]
    pub fn mode(&self) -> ProgressMode {
        self.inner.mode
    }

    /// Listener that renders every tracker event.
    #[must_use]
    pub fn listener(&self) -> ProgressListener {
        let inner = Arc::clone(&self.inner);
        Box::new(move |event: &ProgressEvent| inner.render(event))
    }

    /// Render one event directly.
    pub fn render(&self, event: &ProgressEvent) {
        self.inner.render(event);
    }

    /// Spinner for calls with no measurable progress.
    #[must_use]
    pub fn spinner(&self, msg: &str) -> SpinnerHandle {
        match self.inner.mode {
            ProgressMode::Quiet => SpinnerHandle::Noop,
            ProgressMode::Robot => {
                emit_json_line(&serde_json::json!({
                    "type": "spinner",
                    "event": "start",
                    "operation": msg,
                    "timestamp": Utc::now().to_rfc3339(),
                }));
                SpinnerHandle::Robot {
                    operation: msg.to_string(),
                }
            }
            ProgressMode::NonTty => {
                eprintln!("[movemint] {msg}...");
                SpinnerHandle::NonTty
            }
            ProgressMode::Tty => {
                let pb = ProgressBar::new_spinner();
                pb.set_style(
                    ProgressStyle::default_spinner()
                        .template("{spinner:.cyan} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner())
                        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
                );
                pb.set_message(msg.to_string());
                pb.enable_steady_tick(Duration::from_millis(100));
                let pb = match &self.inner.multi {
                    Some(multi) => multi.add(pb),
                    None => pb,
                };
                SpinnerHandle::Tty(pb)
            }
        }
    }

    /// Log a message (respects quiet mode)
    pub fn log(&self, msg: &str) {
        match self.inner.mode {
            ProgressMode::Quiet => {}
            ProgressMode::Robot => emit_json_line(&serde_json::json!({
                "type": "log",
                "message": msg,
                "timestamp": Utc::now().to_rfc3339(),
            })),
            ProgressMode::NonTty | ProgressMode::Tty => self.inner.println(&format!("[movemint] {msg}")),
        }
    }

    /// Log a warning (respects quiet mode)
    pub fn warn(&self, msg: &str) {
        match self.inner.mode {
            ProgressMode::Quiet => {}
            ProgressMode::Robot => emit_json_line(&serde_json::json!({
                "type": "warning",
                "message": msg,
                "timestamp": Utc::now().to_rfc3339(),
            })),
            ProgressMode::NonTty | ProgressMode::Tty => {
                self.inner.println(&format!("[movemint] WARN: {msg}"));
            }
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(false, false)
    }
}

impl Renderer {
    fn render(&self, event: &ProgressEvent) {
        match self.mode {
            ProgressMode::Quiet => {}
            ProgressMode::Robot => emit_json_line(&RobotProgressLine::new(event)),
            ProgressMode::NonTty => self.render_line(event),
            ProgressMode::Tty => self.render_bar(event),
        }
    }

    fn render_line(&self, event: &ProgressEvent) {
        let op = &event.operation;
        match event.kind {
            ProgressEventKind::Started => eprintln!("[movemint] {}...", op.title),
            ProgressEventKind::Updated | ProgressEventKind::SubStage => {
                let step = whole_percent(op.percentage) / 10;
                let mut steps = self.steps.lock();
                let last = steps.insert(op.id.clone(), step);
                if last.is_none_or(|last| step > last) {
                    eprintln!("[movemint] {}: {}% ({})", op.title, step * 10, status_text(op));
                }
            }
            ProgressEventKind::Paused => eprintln!("[movemint] {} paused", op.title),
            ProgressEventKind::Resumed => eprintln!("[movemint] {} resumed", op.title),
            ProgressEventKind::Completed => {
                self.steps.lock().remove(&op.id);
                eprintln!("[movemint] ✓ {}", op.message.as_deref().unwrap_or(&op.title));
            }
            ProgressEventKind::Failed => {
                self.steps.lock().remove(&op.id);
                eprintln!(
                    "[movemint] ✗ ERROR: {}: {}",
                    op.title,
                    op.error.as_deref().unwrap_or("failed")
                );
            }
            ProgressEventKind::Cancelled => {
                self.steps.lock().remove(&op.id);
                eprintln!("[movemint] {} cancelled", op.title);
            }
            ProgressEventKind::Removed => {
                self.steps.lock().remove(&op.id);
            }
        }
    }

    fn render_bar(&self, event: &ProgressEvent) {
        let op = &event.operation;
        let mut bars = self.bars.lock();
        let bar = bars.entry(op.id.clone()).or_insert_with(|| self.new_bar(op));
        bar.set_position(whole_percent(op.percentage));
        match event.kind {
            ProgressEventKind::Completed => {
                bar.finish_with_message(format!(
                    "✓ {}",
                    op.message.as_deref().unwrap_or("done")
                ));
                bars.remove(&op.id);
            }
            ProgressEventKind::Failed => {
                bar.abandon_with_message(format!("✗ {}", op.error.as_deref().unwrap_or("failed")));
                bars.remove(&op.id);
            }
            ProgressEventKind::Cancelled => {
                bar.abandon_with_message("cancelled");
                bars.remove(&op.id);
            }
            ProgressEventKind::Removed => {
                bar.finish_and_clear();
                bars.remove(&op.id);
            }
            _ => bar.set_message(status_text(op)),
        }
    }

    fn new_bar(&self, op: &OperationProgress) -> ProgressBar {
        let pb = ProgressBar::new(100);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} {prefix} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓▒░"),
        );
        pb.set_prefix(op.title.clone());
        pb.enable_steady_tick(Duration::from_millis(120));
        match &self.multi {
            Some(multi) => multi.add(pb),
            None => pb,
        }
    }

    fn println(&self, line: &str) {
        match &self.multi {
            Some(multi) => {
                if multi.println(line).is_err() {
                    eprintln!("{line}");
                }
            }
            None => eprintln!("{line}"),
        }
    }
}

/// Handle for a spinner created by [`ProgressReporter::spinner`]
pub enum SpinnerHandle {
    Tty(ProgressBar),
    NonTty,
    Robot { operation: String },
    Noop,
}

impl SpinnerHandle {
    pub fn finish_with_message(&self, msg: &str) {
        match self {
            Self::Tty(pb) => pb.finish_with_message(format!("✓ {msg}")),
            Self::NonTty => eprintln!("[movemint] ✓ {msg}"),
            Self::Robot { operation } => emit_json_line(&serde_json::json!({
                "type": "spinner",
                "event": "complete",
                "operation": operation,
                "message": msg,
                "timestamp": Utc::now().to_rfc3339(),
            })),
            Self::Noop => {}
        }
    }

    pub fn abandon_with_message(&self, msg: &str) {
        match self {
            Self::Tty(pb) => pb.abandon_with_message(format!("✗ {msg}")),
            Self::NonTty => eprintln!("[movemint] ✗ ERROR: {msg}"),
            Self::Robot { operation } => emit_json_line(&serde_json::json!({
                "type": "spinner",
                "event": "error",
                "operation": operation,
                "message": msg,
                "timestamp": Utc::now().to_rfc3339(),
            })),
            Self::Noop => {}
        }
    }

    #[must_use]
    pub const fn is_noop(&self) -> bool {
        matches!(self, Self::Noop)
    }
}

fn status_text(op: &OperationProgress) -> String {
    let mut text = if op.paused {
        format!("{} (paused)", op.stage)
    } else {
        op.stage.clone()
    };
    if let Some(message) = &op.message {
        text.push_str(" - ");
        text.push_str(message);
    }
    if let Some(eta) = op.estimated_remaining {
        text.push_str(&format!(" (~{}s left)", eta.as_secs()));
    }
    text
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_percent(percentage: f64) -> u64 {
    percentage.clamp(0.0, 100.0).floor() as u64
}

fn emit_json_line<T: Serialize>(value: &T) {
    if let Ok(json) = serde_json::to_string(value) {
        eprintln!("{json}");
    }
}
