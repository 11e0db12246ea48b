use std::sync::Arc;

use accord_common::network::target::{self, Target};
use accord_core::planner::{AttemptPlan, AttemptPlanner};
use colored::*;

use crate::commands::NegotiationArgs;
use crate::terminal::{colors, print};

pub fn plan(target: Target, options: &NegotiationArgs) -> anyhow::Result<()> {
    let addresses = target::to_addresses(target)?;
    let store = options.load_store()?;
    let config = options.engine_config();

    let planner = AttemptPlanner::new(Arc::new(store), config.url_generators.clone());
    let plan = planner.plan(&addresses, &config.credential_source())?;

    print_plan(&plan);
    Ok(())
}

fn print_plan(plan: &AttemptPlan) {
    for (idx, address_plan) in plan.addresses.iter().enumerate() {
        print::tree_head(idx, address_plan.address.as_str());
        let details: Vec<(String, ColoredString)> = address_plan
            .credentials
            .iter()
            .flat_map(|credential_plan| {
                credential_plan.endpoints.iter().map(|endpoint| {
                    (
                        credential_plan.credential.to_string(),
                        endpoint.to_string().color(colors::ACCENT),
                    )
                })
            })
            .collect();
        print::as_tree_one_level(details);
    }

    for warning in &plan.warnings {
        tracing::warn!("{warning}");
    }

    print::fat_separator();
    let summary = format!(
        "{} attempts across {} addresses",
        plan.len().to_string().bold().green(),
        plan.addresses.len().to_string().bold().yellow()
    );
    print::centerln(&summary);
}
