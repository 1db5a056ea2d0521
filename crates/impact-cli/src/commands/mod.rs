pub mod run;
pub mod script;

use crate::cli::ConfigArgs;
use crate::config::PartialSimulationConfig;
use crate::error::Result;
use impactmd::engine::config::SimulationConfig;
use tracing::info;

fn resolve_config(args: &ConfigArgs) -> Result<SimulationConfig> {
    let partial_config = PartialSimulationConfig::load(args)?;
    info!("Merging configuration from file and CLI arguments...");
    partial_config.merge_with_cli(args)
}
