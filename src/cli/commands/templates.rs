//! movemint templates - List license templates

use clap::Args;

use crate::app::AppContext;
use crate::cli::output::{self, HumanLayout, robot_ok};
use crate::cli::progress::ProgressReporter;
use crate::error::Result;

#[derive(Args, Debug)]
pub struct TemplatesArgs {}

pub fn run(ctx: &AppContext, _args: &TemplatesArgs) -> Result<()> {
    let engine = ctx.engine()?;
    let reporter = ProgressReporter::new(ctx.robot_mode, ctx.quiet);
    let spinner = reporter.spinner("Fetching license templates");
    let templates = match engine.license_templates() {
        Ok(templates) => templates,
        Err(err) => {
            spinner.abandon_with_message("could not fetch templates");
            return Err(err);
        }
    };
    spinner.finish_with_message(&format!("{} templates", templates.len()));

    if ctx.robot_mode {
        return output::emit_robot(&robot_ok(&templates));
    }

    let mut layout = HumanLayout::new();
    layout.title("License templates");
    if templates.is_empty() {
        layout.push_line("No templates available.");
    }
    for template in &templates {
        let config = &template.config;
        layout.section(&format!("{} ({})", template.name, template.id));
        if !template.description.is_empty() {
            layout.push_line(template.description.clone());
        }
        layout
            .kv("type", &config.license_type)
            .kv("commercial use", yes_no(config.commercial_use))
            .kv("derivatives", yes_no(config.derivatives_allowed))
            .kv("attribution", yes_no(config.attribution_required))
            .kv("royalty", &format!("{}%", config.royalty_percentage));
        if let Some(fee) = &config.minting_fee {
            layout.kv("minting fee", fee);
        }
    }
    output::emit_human(layout);
    Ok(())
}

const fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
