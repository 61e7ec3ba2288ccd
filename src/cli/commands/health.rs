//! movemint health - Check that the minting engine answers

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{self, HumanLayout, robot_ok};
use crate::cli::progress::ProgressReporter;
use crate::error::Result;

#[derive(Args, Debug)]
pub struct HealthArgs {}

#[derive(Debug, Serialize)]
struct HealthReport {
    base_url: String,
    status: String,
    healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
}

pub fn run(ctx: &AppContext, _args: &HealthArgs) -> Result<()> {
    let engine = ctx.engine()?;
    let reporter = ProgressReporter::new(ctx.robot_mode, ctx.quiet);
    let spinner = reporter.spinner("Contacting minting engine");

    let health = match engine.health() {
        Ok(health) => health,
        Err(err) => {
            spinner.abandon_with_message("engine unreachable");
            return Err(err);
        }
    };
    spinner.finish_with_message("engine responded");

    let report = HealthReport {
        base_url: engine.api().base_url().to_string(),
        healthy: health.is_healthy(),
        status: health.status,
        version: health.version,
    };

    if ctx.robot_mode {
        return output::emit_robot(&robot_ok(&report));
    }

    let mut layout = HumanLayout::new();
    layout
        .title("Minting engine")
        .kv("url", &report.base_url)
        .kv("status", &report.status)
        .kv("version", report.version.as_deref().unwrap_or("unknown"));
    output::emit_human(layout);
    if !report.healthy {
        reporter.warn(&format!("engine reports status '{}'", report.status));
    }
    Ok(())
}
