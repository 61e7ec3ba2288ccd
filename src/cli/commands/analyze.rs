//! movemint analyze - Start pose analysis and wait for the result

use chrono::Utc;
use clap::Args;
use serde::Serialize;
use tracing::info;

use crate::app::AppContext;
use crate::cli::output::{self, HumanLayout, robot_ok};
use crate::cli::progress::ProgressReporter;
use crate::engine::AnalysisState;
use crate::error::{MoveMintError, Result};
use crate::progress::ProgressTracker;
use crate::session::{AnalysisSession, AnalysisStatus, WorkflowStep};

const OPERATION_ID: &str = "analysis";

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Video to analyze (default: the video uploaded in this session)
    pub video_id: Option<String>,

    /// Start the analysis and return without polling
    #[arg(long)]
    pub no_wait: bool,
}

#[derive(Debug, Serialize)]
struct AnalyzeReport {
    video_id: String,
    status: AnalysisStatus,
    progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    results: Option<serde_json::Value>,
    next_step: WorkflowStep,
}

pub fn run(ctx: &AppContext, args: &AnalyzeArgs) -> Result<()> {
    let video_id = resolve_video_id(ctx, args.video_id.as_deref())?;
    let engine = ctx.engine()?;

    let started = engine.start_analysis(&video_id)?;
    let started_at = Utc::now();
    info!(video_id = %video_id, status = ?started.status, "analysis started");
    ctx.sessions.save_analysis(AnalysisSession {
        video_id: video_id.clone(),
        status: AnalysisStatus::Processing,
        progress: started.progress,
        results: None,
        error: None,
        started_at: Some(started_at),
        completed_at: None,
    })?;

    let state = if args.no_wait {
        started
    } else {
        let reporter = ProgressReporter::new(ctx.robot_mode, ctx.quiet);
        let mut tracker = ProgressTracker::default();
        tracker.subscribe(reporter.listener());
        let polling = &ctx.config.polling;
        match engine.wait_for_analysis(
            &video_id,
            &mut tracker,
            OPERATION_ID,
            polling.interval,
            polling.timeout,
        ) {
            Ok(state) => state,
            Err(err) => {
                ctx.sessions.save_analysis(failed_analysis(&video_id, started_at, &err))?;
                return Err(err);
            }
        }
    };

    let session = ctx.sessions.save_analysis(session_record(&state, started_at))?;
    let report = AnalyzeReport {
        video_id: state.video_id,
        status: state.status,
        progress: state.progress,
        results: state.results,
        next_step: session.resume_step(),
    };

    if ctx.robot_mode {
        return output::emit_robot(&robot_ok(&report));
    }
    if !ctx.quiet {
        let mut layout = HumanLayout::new();
        layout
            .title("Analysis")
            .kv("video id", &report.video_id)
            .kv("status", &format!("{:?}", report.status).to_lowercase())
            .kv("progress", &format!("{:.0}%", report.progress))
            .kv("next", report.next_step.as_str());
        output::emit_human(layout);
    }
    Ok(())
}

/// Explicit id first, then the completed upload in the session.
fn resolve_video_id(ctx: &AppContext, explicit: Option<&str>) -> Result<String> {
    if let Some(id) = explicit {
        return Ok(id.to_string());
    }
    ctx.sessions
        .upload()
        .and_then(|upload| upload.video_id)
        .ok_or_else(|| MoveMintError::SubSessionMissing("upload".to_string()))
}

fn session_record(state: &AnalysisState, started_at: chrono::DateTime<Utc>) -> AnalysisSession {
    AnalysisSession {
        video_id: state.video_id.clone(),
        status: state.status,
        progress: if state.status == AnalysisStatus::Completed {
            100.0
        } else {
            state.progress
        },
        results: state.results.clone(),
        error: state.error.clone(),
        started_at: Some(started_at),
        completed_at: state.status.is_terminal().then(Utc::now),
    }
}

fn failed_analysis(
    video_id: &str,
    started_at: chrono::DateTime<Utc>,
    err: &MoveMintError,
) -> AnalysisSession {
    AnalysisSession {
        video_id: video_id.to_string(),
        status: AnalysisStatus::Failed,
        progress: 0.0,
        results: None,
        error: Some(err.to_string()),
        started_at: Some(started_at),
        completed_at: Some(Utc::now()),
    }
}
