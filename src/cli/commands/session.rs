//! movemint session - Inspect, resume or clear the saved workflow

use chrono::{DateTime, TimeDelta, Utc};
use clap::{Args, Subcommand, ValueEnum};
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{self, HumanLayout, format_delta, robot_ok};
use crate::error::{MoveMintError, Result};
use crate::session::{SubSessionKind, WorkflowSession, WorkflowStep};

#[derive(Args, Debug)]
pub struct SessionArgs {
    #[command(subcommand)]
    pub command: SessionCommand,
}

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// Show the saved session
    Show,

    /// Delete the saved session, or one part of it
    Clear {
        /// Only clear this part of the session
        #[arg(long, value_enum)]
        only: Option<SessionPart>,
    },

    /// Print the step to continue from
    Resume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SessionPart {
    Upload,
    Analysis,
    License,
    Minting,
}

impl From<SessionPart> for SubSessionKind {
    fn from(part: SessionPart) -> Self {
        match part {
            SessionPart::Upload => Self::Upload,
            SessionPart::Analysis => Self::Analysis,
            SessionPart::License => Self::License,
            SessionPart::Minting => Self::Minting,
        }
    }
}

#[derive(Debug, Serialize)]
struct SessionReport {
    session: WorkflowSession,
    resume_step: WorkflowStep,
    age_secs: i64,
    expires_in_secs: i64,
    /// `None` when the lifetime runs past the representable date range.
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct ResumeReport {
    step: WorkflowStep,
    next: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    video_id: Option<String>,
}

pub fn run(ctx: &AppContext, args: &SessionArgs) -> Result<()> {
    match &args.command {
        SessionCommand::Show => show(ctx),
        SessionCommand::Clear { only } => clear(ctx, *only),
        SessionCommand::Resume => resume(ctx),
    }
}

fn show(ctx: &AppContext) -> Result<()> {
    let session = ctx
        .sessions
        .load_session()
        .ok_or(MoveMintError::NoActiveSession)?;
    let age = ctx.sessions.session_age().unwrap_or_else(TimeDelta::zero);
    let remaining = ctx.sessions.time_until_expiry().unwrap_or_else(TimeDelta::zero);

    let report = SessionReport {
        resume_step: session.resume_step(),
        age_secs: age.num_seconds(),
        expires_in_secs: remaining.num_seconds(),
        expires_at: expiry(&session, ctx.sessions.max_age()),
        session,
    };

    if ctx.robot_mode {
        return output::emit_robot(&robot_ok(&report));
    }

    let session = &report.session;
    let mut layout = HumanLayout::new();
    layout
        .title("Workflow session")
        .kv("id", &session.session_id)
        .kv("step", session.current_step.as_str())
        .kv("resume at", report.resume_step.as_str())
        .kv("age", &format_delta(age))
        .kv("expires in", &format_delta(remaining))
        .kv(
            "expires at",
            &report
                .expires_at
                .map_or_else(|| "never".to_string(), |at| at.to_rfc3339()),
        );

    if let Some(upload) = &session.upload {
        layout
            .section("Upload")
            .kv("file", &upload.file_name)
            .kv("status", &format!("{:?}", upload.status).to_lowercase())
            .kv("video id", upload.video_id.as_deref().unwrap_or("-"));
    }
    if let Some(analysis) = &session.analysis {
        layout
            .section("Analysis")
            .kv("video id", &analysis.video_id)
            .kv("status", &format!("{:?}", analysis.status).to_lowercase())
            .kv("progress", &format!("{:.0}%", analysis.progress));
        if let Some(error) = &analysis.error {
            layout.kv("error", error);
        }
    }
    if let Some(license) = &session.license {
        layout
            .section("License")
            .kv("type", &license.license_config.license_type)
            .kv(
                "royalty",
                &format!("{}%", license.license_config.royalty_percentage),
            );
    }
    if let Some(minting) = &session.minting {
        layout
            .section("Minting")
            .kv("title", &minting.nft_title)
            .kv("status", &format!("{:?}", minting.status).to_lowercase())
            .kv("tx", minting.transaction_hash.as_deref().unwrap_or("-"));
    }
    output::emit_human(layout);
    Ok(())
}

fn expiry(session: &WorkflowSession, max_age: TimeDelta) -> Option<DateTime<Utc>> {
    session.last_updated_at.checked_add_signed(max_age)
}

fn clear(ctx: &AppContext, only: Option<SessionPart>) -> Result<()> {
    let cleared = match only {
        Some(part) => {
            let kind = SubSessionKind::from(part);
            ctx.sessions.clear_sub_session(kind)?;
            kind.as_str().to_string()
        }
        None => {
            ctx.sessions.clear_session()?;
            "session".to_string()
        }
    };

    if ctx.robot_mode {
        return output::emit_robot(&robot_ok(serde_json::json!({ "cleared": cleared })));
    }
    if !ctx.quiet {
        println!("Cleared {cleared}.");
    }
    Ok(())
}

fn resume(ctx: &AppContext) -> Result<()> {
    let session = ctx
        .sessions
        .load_session()
        .ok_or(MoveMintError::NoActiveSession)?;
    let step = session.resume_step();
    let video_id = session
        .upload
        .as_ref()
        .and_then(|u| u.video_id.clone())
        .or_else(|| session.analysis.as_ref().map(|a| a.video_id.clone()));
    let report = ResumeReport {
        step,
        next: next_action(step, video_id.as_deref()),
        video_id,
    };

    if ctx.robot_mode {
        return output::emit_robot(&robot_ok(&report));
    }
    println!("Resume at: {}", report.step);
    println!("Next: {}", report.next);
    Ok(())
}

fn next_action(step: WorkflowStep, video_id: Option<&str>) -> String {
    match step {
        WorkflowStep::Upload => "movemint upload <video-file>".to_string(),
        WorkflowStep::Analysis => match video_id {
            Some(id) => format!("movemint analyze {id}"),
            None => "movemint analyze <video-id>".to_string(),
        },
        WorkflowStep::Results | WorkflowStep::License => {
            "choose a license (movemint templates)".to_string()
        }
        WorkflowStep::Minting => "finish minting in the MoveMint app".to_string(),
        WorkflowStep::Complete => "nothing left to do; clear the session to start over".to_string(),
    }
}
