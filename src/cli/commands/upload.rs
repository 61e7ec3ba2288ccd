//! movemint upload - Upload a dance video and record it in the session

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use clap::Args;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::api::UploadProgress;
use crate::app::AppContext;
use crate::cli::output::{self, HumanLayout, robot_ok};
use crate::cli::progress::ProgressReporter;
use crate::error::{MoveMintError, Result};
use crate::progress::{OperationOptions, ProgressTracker};
use crate::session::{UploadSession, UploadStatus, WorkflowStep};

const OPERATION_ID: &str = "upload";

#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Video file to upload
    pub file: PathBuf,
}

#[derive(Debug, Serialize)]
struct UploadReport {
    video_id: String,
    file_name: String,
    file_size: u64,
    session_id: String,
    next_step: WorkflowStep,
}

pub fn run(ctx: &AppContext, args: &UploadArgs) -> Result<()> {
    let path = ctx.resolve(&args.file);
    let metadata = std::fs::metadata(&path).map_err(|err| {
        MoveMintError::ValidationFailed(format!("cannot read {}: {err}", path.display()))
    })?;
    if !metadata.is_file() {
        return Err(MoveMintError::ValidationFailed(format!(
            "{} is not a file",
            path.display()
        )));
    }
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let engine = ctx.engine()?;

    let mut pending = UploadSession {
        file_name: file_name.clone(),
        file_size: metadata.len(),
        video_id: None,
        status: UploadStatus::Uploading,
        progress: 0.0,
        uploaded_at: None,
    };
    // A new upload starts a new workflow.
    ctx.sessions.start_session()?;
    ctx.sessions.save_upload(pending.clone())?;

    let reporter = ProgressReporter::new(ctx.robot_mode, ctx.quiet);
    let tracker = Arc::new(Mutex::new(ProgressTracker::default()));
    {
        let mut tracker = tracker.lock();
        tracker.subscribe(reporter.listener());
        tracker.start(
            OPERATION_ID,
            OperationOptions::new(format!("Uploading {file_name}")).cancellable(),
        )?;
    }

    let result = engine.upload_video(&path, Some(upload_callback(Arc::clone(&tracker))));
    let response = match result {
        Ok(response) => response,
        Err(err) => {
            tracker.lock().fail(OPERATION_ID, &err.to_string())?;
            pending.status = UploadStatus::Failed;
            ctx.sessions.save_upload(pending)?;
            return Err(err);
        }
    };
    tracker.lock().complete(OPERATION_ID, Some("Upload complete"))?;

    let session = ctx.sessions.save_upload(UploadSession {
        video_id: Some(response.video_id.clone()),
        status: UploadStatus::Completed,
        progress: 100.0,
        uploaded_at: Some(Utc::now()),
        ..pending
    })?;

    let report = UploadReport {
        video_id: response.video_id,
        file_name,
        file_size: metadata.len(),
        session_id: session.session_id.clone(),
        next_step: session.resume_step(),
    };
    if ctx.robot_mode {
        return output::emit_robot(&robot_ok(&report));
    }
    if !ctx.quiet {
        let mut layout = HumanLayout::new();
        layout
            .title("Upload complete")
            .kv("video id", &report.video_id)
            .kv("file", &report.file_name)
            .kv("size", &format!("{} bytes", report.file_size))
            .kv("next", &format!("movemint analyze {}", report.video_id));
        output::emit_human(layout);
    }
    Ok(())
}

/// Feed byte counts into the tracker, one event per whole percent.
fn upload_callback(tracker: Arc<Mutex<ProgressTracker>>) -> UploadProgress {
    let last = AtomicU64::new(0);
    Arc::new(move |sent: u64, total: u64| {
        let percent = (sent.saturating_mul(100)).checked_div(total).unwrap_or(0).min(100);
        if percent <= last.load(Ordering::Relaxed) {
            return;
        }
        last.store(percent, Ordering::Relaxed);
        #[allow(clippy::cast_precision_loss)]
        let percentage = percent as f64;
        if let Err(err) = tracker.lock().update(OPERATION_ID, percentage, None, None) {
            debug!(error = %err, "dropped upload progress");
        }
    })
}
