//! `offload plan`: read-only view of what `resolve` would do.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use offload_reconcile::PlanReport;

use super::{load_config, reconciler};

/// Arguments for `offload plan`.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "function")]
    function: String,
    #[tabled(rename = "remote")]
    remote: String,
    #[tabled(rename = "create")]
    create: String,
    #[tabled(rename = "config update")]
    config_update: String,
    #[tabled(rename = "code update")]
    code_update: String,
}

impl PlanArgs {
    pub fn run(self, config_path: Option<&Path>) -> Result<()> {
        let loaded = load_config(config_path)?;
        let spec = loaded.desired_spec()?;
        let report = reconciler(&loaded.config)?
            .plan(&spec)
            .with_context(|| format!("planning failed for '{}'", spec.name()))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize plan JSON")?
            );
            return Ok(());
        }
        print_table(&report);
        Ok(())
    }
}

fn print_table(report: &PlanReport) {
    let flag = |set: bool| if set { "yes".yellow().to_string() } else { "no".to_string() };
    let row = match report.plan {
        Some(plan) => PlanRow {
            function: report.name.to_string(),
            remote: report.remote.clone(),
            create: flag(plan.needs_create()),
            config_update: flag(plan.needs_config_update()),
            code_update: flag(plan.needs_code_update()),
        },
        None => PlanRow {
            function: report.name.to_string(),
            remote: report.remote.clone(),
            create: "-".to_string(),
            config_update: "-".to_string(),
            code_update: "-".to_string(),
        },
    };

    let mut table = Table::new([row]);
    table.with(Style::rounded());
    println!("{table}");

    match report.plan {
        Some(plan) if plan.is_noop() => println!("{} up to date", "✓".green()),
        Some(_) => println!("Run 'offload resolve' to apply."),
        None => println!("Function service offline; resolve would return the name unchanged."),
    }
}
