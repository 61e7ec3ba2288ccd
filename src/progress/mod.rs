//! Progress tracking for long-running operations.
//!
//! [`ProgressTracker`] keeps one [`OperationProgress`] per operation id and
//! notifies listeners synchronously after every change. The CLI renders those
//! events as progress bars; the engine client feeds analysis polling into it.

mod types;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use crate::clock::{Clock, SystemClock};
use crate::error::{MoveMintError, Result};

pub use types::{
    ETA_MIN_PERCENTAGE, OperationOptions, OperationProgress, ProgressEvent, ProgressEventKind,
    STAGE_CANCELLED, STAGE_COMPLETE, STAGE_FAILED, STAGE_STARTING, SubStage, SubStageStatus,
    TERMINAL_STAGES,
};

/// Callback invoked for every progress event.
pub type ProgressListener = Box<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Handle returned by [`ProgressTracker::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Subscription {
    id: ListenerId,
    operation: Option<String>,
    listener: ProgressListener,
}

pub struct ProgressTracker {
    operations: HashMap<String, OperationProgress>,
    subscriptions: Vec<Subscription>,
    next_listener: u64,
    clock: Arc<dyn Clock>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("operations", &self.operations.len())
            .field("listeners", &self.subscriptions.len())
            .finish()
    }
}

impl ProgressTracker {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            operations: HashMap::new(),
            subscriptions: Vec::new(),
            next_listener: 0,
            clock,
        }
    }

    /// Begin tracking an operation.
    ///
    /// An id whose previous operation is terminal is replaced; a live id is
    /// rejected.
    pub fn start(&mut self, id: &str, options: OperationOptions) -> Result<OperationProgress> {
        if id.trim().is_empty() {
            return Err(MoveMintError::ValidationFailed(
                "operation id must not be empty".to_string(),
            ));
        }
        if self.operations.get(id).is_some_and(|op| !op.is_terminal()) {
            return Err(MoveMintError::OperationExists(id.to_string()));
        }
        validate_sub_stage_names(&options.sub_stages)?;

        let op = OperationProgress::new(id, options, self.clock.now());
        debug!(operation = id, title = %op.title, sub_stages = op.sub_stages.len(), "operation started");
        self.operations.insert(id.to_string(), op.clone());
        self.emit(ProgressEventKind::Started, &op);
        Ok(op)
    }

    /// Report progress. Lower percentages than the current one are ignored.
    pub fn update(
        &mut self,
        id: &str,
        percentage: f64,
        stage: Option<&str>,
        message: Option<&str>,
    ) -> Result<OperationProgress> {
        if !percentage.is_finite() {
            return Err(MoveMintError::InvalidProgress(format!(
                "{percentage} is not a finite percentage"
            )));
        }
        if let Some(stage) = stage {
            if TERMINAL_STAGES.contains(&stage) {
                return Err(MoveMintError::ValidationFailed(format!(
                    "stage '{stage}' is reserved; use complete, fail or cancel"
                )));
            }
        }
        let now = self.clock.now();
        let op = self.live_mut(id)?;
        op.raise_percentage(percentage.clamp(0.0, 100.0));
        if let Some(stage) = stage {
            op.stage = stage.to_string();
        }
        if let Some(message) = message {
            op.message = Some(message.to_string());
        }
        op.touch(now);
        trace!(operation = id, percentage = op.percentage, stage = %op.stage, "progress");
        let snapshot = op.clone();
        self.emit(ProgressEventKind::Updated, &snapshot);
        Ok(snapshot)
    }

    pub fn set_message(&mut self, id: &str, message: &str) -> Result<OperationProgress> {
        let now = self.clock.now();
        let op = self.live_mut(id)?;
        op.message = Some(message.to_string());
        op.touch(now);
        let snapshot = op.clone();
        self.emit(ProgressEventKind::Updated, &snapshot);
        Ok(snapshot)
    }

    /// Activate a sub-stage, completing the one that was active before it.
    ///
    /// Every earlier sub-stage must be completed (or be the active one) and
    /// every later one must still be pending. A failed sub-stage at the
    /// frontier may be restarted.
    pub fn start_sub_stage(&mut self, id: &str, name: &str) -> Result<OperationProgress> {
        let now = self.clock.now();
        let op = self.live_mut(id)?;
        let index = sub_stage_index(op, name)?;

        let target = &op.sub_stages[index];
        match target.status {
            SubStageStatus::Active => return Ok(op.clone()),
            SubStageStatus::Completed => {
                return Err(out_of_order(id, name, "already completed"));
            }
            SubStageStatus::Pending | SubStageStatus::Failed => {}
        }
        if let Some(blocking) = op.sub_stages[..index]
            .iter()
            .find(|s| !matches!(s.status, SubStageStatus::Completed | SubStageStatus::Active))
        {
            return Err(out_of_order(
                id,
                name,
                &format!("'{}' is {}", blocking.name, status_label(blocking.status)),
            ));
        }
        if let Some(ahead) = op.sub_stages[index + 1..]
            .iter()
            .find(|s| s.status != SubStageStatus::Pending)
        {
            return Err(out_of_order(
                id,
                name,
                &format!("later sub-stage '{}' already started", ahead.name),
            ));
        }

        for earlier in &mut op.sub_stages[..index] {
            if earlier.status == SubStageStatus::Active {
                earlier.status = SubStageStatus::Completed;
                earlier.percentage = 100.0;
            }
        }
        let target = &mut op.sub_stages[index];
        target.status = SubStageStatus::Active;
        target.percentage = 0.0;
        op.stage = name.to_string();
        op.error = None;
        if let Some(pct) = op.sub_stage_percentage() {
            op.raise_percentage(pct);
        }
        op.touch(now);
        debug!(operation = id, sub_stage = name, "sub-stage started");
        let snapshot = op.clone();
        self.emit(ProgressEventKind::SubStage, &snapshot);
        Ok(snapshot)
    }

    /// Report progress within the active sub-stage.
    pub fn update_sub_stage(
        &mut self,
        id: &str,
        name: &str,
        percentage: f64,
    ) -> Result<OperationProgress> {
        if !percentage.is_finite() {
            return Err(MoveMintError::InvalidProgress(format!(
                "{percentage} is not a finite percentage"
            )));
        }
        let now = self.clock.now();
        let op = self.live_mut(id)?;
        let index = sub_stage_index(op, name)?;
        let stage = &mut op.sub_stages[index];
        if stage.status != SubStageStatus::Active {
            return Err(out_of_order(id, name, "not active"));
        }
        let pct = percentage.clamp(0.0, 100.0);
        if pct > stage.percentage {
            stage.percentage = pct;
        }
        if let Some(overall) = op.sub_stage_percentage() {
            op.raise_percentage(overall);
        }
        op.touch(now);
        let snapshot = op.clone();
        self.emit(ProgressEventKind::SubStage, &snapshot);
        Ok(snapshot)
    }

    /// Mark a sub-stage completed. It must be active, or the first pending
    /// sub-stage with nothing active.
    pub fn complete_sub_stage(&mut self, id: &str, name: &str) -> Result<OperationProgress> {
        let now = self.clock.now();
        let op = self.live_mut(id)?;
        let index = sub_stage_index(op, name)?;
        match op.sub_stages[index].status {
            SubStageStatus::Completed => return Ok(op.clone()),
            SubStageStatus::Failed => return Err(out_of_order(id, name, "failed")),
            SubStageStatus::Active => {}
            SubStageStatus::Pending => {
                let frontier = op.sub_stages[..index]
                    .iter()
                    .all(|s| s.status == SubStageStatus::Completed);
                if !frontier {
                    return Err(out_of_order(id, name, "earlier sub-stages are not completed"));
                }
            }
        }
        let stage = &mut op.sub_stages[index];
        stage.status = SubStageStatus::Completed;
        stage.percentage = 100.0;
        if let Some(overall) = op.sub_stage_percentage() {
            op.raise_percentage(overall);
        }
        op.touch(now);
        debug!(operation = id, sub_stage = name, "sub-stage completed");
        let snapshot = op.clone();
        self.emit(ProgressEventKind::SubStage, &snapshot);
        Ok(snapshot)
    }

    /// Mark the active sub-stage failed without ending the operation.
    pub fn fail_sub_stage(&mut self, id: &str, name: &str, error: &str) -> Result<OperationProgress> {
        let now = self.clock.now();
        let op = self.live_mut(id)?;
        let index = sub_stage_index(op, name)?;
        if op.sub_stages[index].status != SubStageStatus::Active {
            return Err(out_of_order(id, name, "not active"));
        }
        op.sub_stages[index].status = SubStageStatus::Failed;
        op.error = Some(error.to_string());
        op.touch(now);
        debug!(operation = id, sub_stage = name, error, "sub-stage failed");
        let snapshot = op.clone();
        self.emit(ProgressEventKind::SubStage, &snapshot);
        Ok(snapshot)
    }

    pub fn pause(&mut self, id: &str) -> Result<OperationProgress> {
        let now = self.clock.now();
        let op = self.unfinished_mut(id)?;
        if !op.can_pause {
            return Err(unsupported(id, "pause"));
        }
        if op.paused {
            return Ok(op.clone());
        }
        op.paused = true;
        op.paused_at = Some(now);
        op.touch(now);
        let snapshot = op.clone();
        self.emit(ProgressEventKind::Paused, &snapshot);
        Ok(snapshot)
    }

    pub fn resume(&mut self, id: &str) -> Result<OperationProgress> {
        let now = self.clock.now();
        let op = self.unfinished_mut(id)?;
        if !op.can_pause {
            return Err(unsupported(id, "pause"));
        }
        if !op.paused {
            return Ok(op.clone());
        }
        op.end_pause(now);
        op.touch(now);
        let snapshot = op.clone();
        self.emit(ProgressEventKind::Resumed, &snapshot);
        Ok(snapshot)
    }

    pub fn cancel(&mut self, id: &str) -> Result<OperationProgress> {
        let now = self.clock.now();
        let op = self.unfinished_mut(id)?;
        if !op.can_cancel {
            return Err(unsupported(id, "cancel"));
        }
        op.end_pause(now);
        op.stage = STAGE_CANCELLED.to_string();
        op.touch(now);
        debug!(operation = id, "operation cancelled");
        let snapshot = op.clone();
        self.emit(ProgressEventKind::Cancelled, &snapshot);
        Ok(snapshot)
    }

    /// Finish an operation: 100%, stage `complete`, every sub-stage completed.
    pub fn complete(&mut self, id: &str, message: Option<&str>) -> Result<OperationProgress> {
        let now = self.clock.now();
        let op = self.unfinished_mut(id)?;
        op.end_pause(now);
        for stage in &mut op.sub_stages {
            stage.status = SubStageStatus::Completed;
            stage.percentage = 100.0;
        }
        op.percentage = 100.0;
        op.stage = STAGE_COMPLETE.to_string();
        if let Some(message) = message {
            op.message = Some(message.to_string());
        }
        op.touch(now);
        debug!(operation = id, "operation completed");
        let snapshot = op.clone();
        self.emit(ProgressEventKind::Completed, &snapshot);
        Ok(snapshot)
    }

    /// End an operation with an error. The percentage stays where it was.
    pub fn fail(&mut self, id: &str, error: &str) -> Result<OperationProgress> {
        let now = self.clock.now();
        let op = self.unfinished_mut(id)?;
        op.end_pause(now);
        for stage in &mut op.sub_stages {
            if stage.status == SubStageStatus::Active {
                stage.status = SubStageStatus::Failed;
            }
        }
        op.stage = STAGE_FAILED.to_string();
        op.error = Some(error.to_string());
        op.touch(now);
        debug!(operation = id, error, "operation failed");
        let snapshot = op.clone();
        self.emit(ProgressEventKind::Failed, &snapshot);
        Ok(snapshot)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&OperationProgress> {
        self.operations.get(id)
    }

    /// Operations that have not reached a terminal stage, oldest first.
    #[must_use]
    pub fn active_operations(&self) -> Vec<&OperationProgress> {
        let mut ops: Vec<_> = self
            .operations
            .values()
            .filter(|op| !op.is_terminal())
            .collect();
        ops.sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.id.cmp(&b.id)));
        ops
    }

    pub fn remove(&mut self, id: &str) -> Option<OperationProgress> {
        let op = self.operations.remove(id)?;
        self.emit(ProgressEventKind::Removed, &op);
        self.subscriptions
            .retain(|s| s.operation.as_deref() != Some(id));
        Some(op)
    }

    /// Drop every terminal operation. Returns how many were removed.
    pub fn clear_finished(&mut self) -> usize {
        let finished: Vec<String> = self
            .operations
            .values()
            .filter(|op| op.is_terminal())
            .map(|op| op.id.clone())
            .collect();
        for id in &finished {
            self.remove(id);
        }
        finished.len()
    }

    /// Estimated time left, excluding paused time.
    #[must_use]
    pub fn estimate_remaining(&self, id: &str) -> Option<Duration> {
        self.operations
            .get(id)?
            .estimate_remaining(self.clock.now())
    }

    /// Listen to events from every operation.
    pub fn subscribe(&mut self, listener: ProgressListener) -> ListenerId {
        self.add_subscription(None, listener)
    }

    /// Listen to events from a single operation.
    pub fn subscribe_to(&mut self, id: &str, listener: ProgressListener) -> ListenerId {
        self.add_subscription(Some(id.to_string()), listener)
    }

    /// Returns `false` when the id was not subscribed.
    pub fn unsubscribe(&mut self, listener: ListenerId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != listener);
        self.subscriptions.len() != before
    }

    fn add_subscription(&mut self, operation: Option<String>, listener: ProgressListener) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.subscriptions.push(Subscription {
            id,
            operation,
            listener,
        });
        id
    }

    fn emit(&self, kind: ProgressEventKind, op: &OperationProgress) {
        let interested: Vec<_> = self
            .subscriptions
            .iter()
            .filter(|s| s.operation.as_deref().is_none_or(|target| target == op.id))
            .collect();
        if interested.is_empty() {
            return;
        }
        let event = ProgressEvent {
            kind,
            operation: op.clone(),
        };
        for subscription in interested {
            (subscription.listener)(&event);
        }
    }

    /// Existing operation that is neither terminal nor paused.
    fn live_mut(&mut self, id: &str) -> Result<&mut OperationProgress> {
        let op = self.unfinished_mut(id)?;
        if op.paused {
            return Err(MoveMintError::OperationPaused(id.to_string()));
        }
        Ok(op)
    }

    fn unfinished_mut(&mut self, id: &str) -> Result<&mut OperationProgress> {
        let op = self
            .operations
            .get_mut(id)
            .ok_or_else(|| MoveMintError::UnknownOperation(id.to_string()))?;
        if op.is_terminal() {
            return Err(MoveMintError::OperationFinished {
                operation_id: id.to_string(),
                stage: op.stage.clone(),
            });
        }
        Ok(op)
    }
}

fn validate_sub_stage_names(names: &[String]) -> Result<()> {
    for (i, name) in names.iter().enumerate() {
        if name.trim().is_empty() {
            return Err(MoveMintError::ValidationFailed(
                "sub-stage names must not be empty".to_string(),
            ));
        }
        if TERMINAL_STAGES.contains(&name.as_str()) {
            return Err(MoveMintError::ValidationFailed(format!(
                "sub-stage name '{name}' is reserved"
            )));
        }
        if names[..i].contains(name) {
            return Err(MoveMintError::ValidationFailed(format!(
                "duplicate sub-stage '{name}'"
            )));
        }
    }
    Ok(())
}

fn sub_stage_index(op: &OperationProgress, name: &str) -> Result<usize> {
    op.sub_stages
        .iter()
        .position(|s| s.name == name)
        .ok_or_else(|| MoveMintError::UnknownSubStage {
            operation_id: op.id.clone(),
            sub_stage: name.to_string(),
        })
}

fn out_of_order(id: &str, name: &str, reason: &str) -> MoveMintError {
    MoveMintError::SubStageOutOfOrder {
        operation_id: id.to_string(),
        sub_stage: name.to_string(),
        reason: reason.to_string(),
    }
}

fn unsupported(id: &str, capability: &'static str) -> MoveMintError {
    MoveMintError::OperationUnsupported {
        operation_id: id.to_string(),
        capability,
    }
}

const fn status_label(status: SubStageStatus) -> &'static str {
    match status {
        SubStageStatus::Pending => "still pending",
        SubStageStatus::Active => "active",
        SubStageStatus::Completed => "completed",
        SubStageStatus::Failed => "failed",
    }
}
