//! movemint config - Show the effective configuration

use clap::Args;

use crate::app::AppContext;
use crate::cli::output;
use crate::config::Config;
use crate::error::{MoveMintError, Result};

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Also print which config files were considered
    #[arg(long)]
    pub sources: bool,
}

pub fn run(ctx: &AppContext, args: &ConfigArgs) -> Result<()> {
    let config = ctx.config.redacted();
    let sources = config_sources(ctx);

    if ctx.robot_mode {
        let mut payload = serde_json::to_value(&config)?;
        if args.sources {
            payload["sources"] = serde_json::json!(sources);
        }
        return output::emit_robot(&output::robot_ok(payload));
    }

    let rendered = toml::to_string_pretty(&config)
        .map_err(|err| MoveMintError::Config(format!("render config: {err}")))?;
    println!("{rendered}");
    if args.sources {
        println!("# sources (later wins):");
        for source in &sources {
            println!("#   {source}");
        }
    }
    Ok(())
}

fn config_sources(ctx: &AppContext) -> Vec<String> {
    let mut sources = vec!["defaults".to_string()];
    if let Some(path) = &ctx.config_path {
        sources.push(path.display().to_string());
    } else {
        if let Some(global) = Config::global_path().filter(|p| p.exists()) {
            sources.push(global.display().to_string());
        }
        let project = Config::project_path(&ctx.root);
        if project.exists() {
            sources.push(project.display().to_string());
        }
    }
    sources.push("MOVEMINT_* environment".to_string());
    sources
}
