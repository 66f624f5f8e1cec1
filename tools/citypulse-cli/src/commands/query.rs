//! Query zone results.

use std::path::PathBuf;

use clap::Subcommand;
use serde_json::Value;

use citypulse_common::config::AppConfig;
use citypulse_results_store::ResultsStore;

#[derive(Subcommand)]
pub enum QueryCommand {
    /// List zone names
    Zones,

    /// Most recent result per zone
    Latest,

    /// All results of one zone, oldest first
    History {
        zone: String,
    },

    /// Results with a timestamp in [FROM, TO]
    Range {
        from: i64,
        to: i64,
    },

    /// Dashboard summary of the latest snapshot
    Summary,

    /// Threshold alerts from the configured limits
    Alerts,
}

pub fn run(config: &AppConfig, results: PathBuf, query: QueryCommand) -> anyhow::Result<()> {
    let store = ResultsStore::load(&results)
        .map_err(|e| anyhow::anyhow!("Failed to load results: {e}"))?;

    let value: Value = match query {
        QueryCommand::Zones => serde_json::to_value(store.zones())?,
        QueryCommand::Latest => serde_json::to_value(store.latest_by_zone())?,
        QueryCommand::History { zone } => serde_json::to_value(store.history(&zone))?,
        QueryCommand::Range { from, to } => {
            let results = store
                .range(from, to)
                .map_err(|e| anyhow::anyhow!("Invalid range: {e}"))?;
            serde_json::to_value(results)?
        }
        QueryCommand::Summary => serde_json::to_value(store.summary())?,
        QueryCommand::Alerts => serde_json::to_value(store.alerts(&config.alerts))?,
    };

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
