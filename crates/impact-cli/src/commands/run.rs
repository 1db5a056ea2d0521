use crate::cli::RunArgs;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use impactmd::{
    core::io::report,
    engine::{process::ProcessEngine, progress::ProgressReporter},
    workflows::{self, impact::ImpactResult},
};
use std::path::{Path, PathBuf};
use tracing::info;

pub async fn run(args: RunArgs) -> Result<()> {
    let config = super::resolve_config(&args.config)?;
    let output_dir = config.paths.output_dir.clone();

    std::fs::create_dir_all(&output_dir)?;
    info!("Engine output goes to {:?}", &output_dir);

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Starting impact simulation...");
    info!("Invoking the core impact workflow...");

    let outcome = tokio::task::block_in_place(|| {
        workflows::impact::run(
            || ProcessEngine::launch(&config.execution, &output_dir),
            &config,
            &reporter,
        )
    })?;

    let total = outcome.results.len();
    info!("Workflow finished with {} impact result(s).", total);

    for result in &outcome.results {
        write_report(&output_dir, result, total)?;
        print_result(result);
    }

    Ok(())
}

fn write_report(dir: &Path, result: &ImpactResult, total: usize) -> Result<()> {
    let table_path = report_path(dir, "clusters", "csv", result.run_number, total);
    info!("Writing cluster table to {:?}", &table_path);
    report::write_cluster_table_to_path(&result.summary, &table_path)?;

    let summary_path = report_path(dir, "summary", "toml", result.run_number, total);
    info!("Writing run summary to {:?}", &summary_path);
    report::write_summary_to_path(result, &summary_path)?;
    Ok(())
}

fn print_result(result: &ImpactResult) {
    let summary = &result.summary;
    println!(
        "✓ Impact {}: {} of {} atom(s) sputtered in {} cluster(s).",
        result.run_number,
        summary.sputtered_atoms,
        summary.total_atoms,
        summary.cluster_count()
    );
    if let Some(largest) = summary.largest() {
        println!(
            "  Largest cluster: id {} with {} atom(s).",
            largest.id, largest.size
        );
    }
}

fn report_path(dir: &Path, stem: &str, extension: &str, run: usize, total: usize) -> PathBuf {
    if total <= 1 {
        dir.join(format!("{}.{}", stem, extension))
    } else {
        dir.join(format!("{}_{}.{}", stem, run, extension))
    }
}
