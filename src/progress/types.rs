use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Stage an operation is in right after `start`.
pub const STAGE_STARTING: &str = "starting";
pub const STAGE_COMPLETE: &str = "complete";
pub const STAGE_FAILED: &str = "failed";
pub const STAGE_CANCELLED: &str = "cancelled";

/// Stages that end an operation. No update is accepted afterwards.
pub const TERMINAL_STAGES: [&str; 3] = [STAGE_COMPLETE, STAGE_FAILED, STAGE_CANCELLED];

/// No ETA is reported below this percentage; early estimates are noise.
pub const ETA_MIN_PERCENTAGE: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubStageStatus {
    Pending,
    Active,
    Completed,
    Failed,
}

/// Named checkpoint inside a tracked operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubStage {
    pub name: String,
    pub status: SubStageStatus,
    pub percentage: f64,
}

impl SubStage {
    fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: SubStageStatus::Pending,
            percentage: 0.0,
        }
    }
}

/// Options for [`ProgressTracker::start`](super::ProgressTracker::start).
#[derive(Debug, Clone, Default)]
pub struct OperationOptions {
    pub title: String,
    pub sub_stages: Vec<String>,
    pub can_pause: bool,
    pub can_cancel: bool,
}

impl OperationOptions {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_sub_stages<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sub_stages = names.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub const fn pausable(mut self) -> Self {
        self.can_pause = true;
        self
    }

    #[must_use]
    pub const fn cancellable(mut self) -> Self {
        self.can_cancel = true;
        self
    }
}

/// State of one tracked operation.
#[derive(Debug, Clone, Serialize)]
pub struct OperationProgress {
    pub id: String,
    pub title: String,
    pub stage: String,
    pub percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sub_stages: Vec<SubStage>,
    pub can_pause: bool,
    pub can_cancel: bool,
    pub paused: bool,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(
        with = "humantime_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub estimated_remaining: Option<Duration>,
    #[serde(skip)]
    pub(super) paused_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub(super) paused_for: Duration,
}

impl OperationProgress {
    pub(super) fn new(id: &str, options: OperationOptions, now: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            title: options.title,
            stage: STAGE_STARTING.to_string(),
            percentage: 0.0,
            message: None,
            sub_stages: options.sub_stages.into_iter().map(SubStage::pending).collect(),
            can_pause: options.can_pause,
            can_cancel: options.can_cancel,
            paused: false,
            started_at: now,
            updated_at: now,
            error: None,
            estimated_remaining: None,
            paused_at: None,
            paused_for: Duration::ZERO,
        }
    }

    /// Whether the operation reached `complete`, `failed` or `cancelled`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        TERMINAL_STAGES.contains(&self.stage.as_str())
    }

    #[must_use]
    pub fn active_sub_stage(&self) -> Option<&SubStage> {
        self.sub_stages
            .iter()
            .find(|s| s.status == SubStageStatus::Active)
    }

    /// At most one active sub-stage, and once a pending sub-stage appears
    /// every later one is pending too.
    #[must_use]
    pub fn sub_stages_well_ordered(&self) -> bool {
        let active = self
            .sub_stages
            .iter()
            .filter(|s| s.status == SubStageStatus::Active)
            .count();
        if active > 1 {
            return false;
        }
        let mut seen_pending = false;
        for stage in &self.sub_stages {
            if stage.status == SubStageStatus::Pending {
                seen_pending = true;
            } else if seen_pending {
                return false;
            }
        }
        true
    }

    /// Time spent running, excluding pauses.
    #[must_use]
    pub fn active_elapsed(&self, now: DateTime<Utc>) -> Duration {
        let total = (now - self.started_at).to_std().unwrap_or(Duration::ZERO);
        let current_pause = self
            .paused_at
            .and_then(|at| (now - at).to_std().ok())
            .unwrap_or(Duration::ZERO);
        total.saturating_sub(self.paused_for + current_pause)
    }

    /// Remaining time extrapolated from the pace so far.
    #[must_use]
    pub fn estimate_remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        if self.paused || self.is_terminal() || self.percentage < ETA_MIN_PERCENTAGE {
            return None;
        }
        let elapsed = self.active_elapsed(now).as_secs_f64();
        let remaining = elapsed / self.percentage * (100.0 - self.percentage);
        Duration::try_from_secs_f64(remaining).ok()
    }

    /// Overall percentage implied by the sub-stages, if there are any.
    pub(super) fn sub_stage_percentage(&self) -> Option<f64> {
        if self.sub_stages.is_empty() {
            return None;
        }
        let sum: f64 = self
            .sub_stages
            .iter()
            .map(|s| match s.status {
                SubStageStatus::Completed => 100.0,
                SubStageStatus::Active | SubStageStatus::Failed => s.percentage,
                SubStageStatus::Pending => 0.0,
            })
            .sum();
        #[allow(clippy::cast_precision_loss)]
        Some(sum / self.sub_stages.len() as f64)
    }

    /// Raise the percentage; lower values leave it unchanged.
    pub(super) fn raise_percentage(&mut self, percentage: f64) {
        if percentage > self.percentage {
            self.percentage = percentage.min(100.0);
        }
    }

    pub(super) fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
        self.estimated_remaining = self.estimate_remaining(now);
    }

    pub(super) fn end_pause(&mut self, now: DateTime<Utc>) {
        if let Some(at) = self.paused_at.take() {
            self.paused_for += (now - at).to_std().unwrap_or(Duration::ZERO);
        }
        self.paused = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressEventKind {
    Started,
    Updated,
    SubStage,
    Paused,
    Resumed,
    Completed,
    Failed,
    Cancelled,
    Removed,
}

/// Delivered to listeners after every change.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub kind: ProgressEventKind,
    pub operation: OperationProgress,
}
