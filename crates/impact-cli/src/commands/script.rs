use crate::cli::ScriptArgs;
use crate::error::Result;
use impactmd::{
    core::io::script::write_script,
    engine::{progress::ProgressReporter, recorder::RecordingEngine},
    workflows,
};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use tracing::info;

pub async fn run(args: ScriptArgs) -> Result<()> {
    let config = super::resolve_config(&args.config)?;

    info!("Recording the command deck without launching the engine...");
    let outcome = workflows::impact::run(
        || Ok(RecordingEngine::new()),
        &config,
        &ProgressReporter::new(),
    )?;
    let lines = outcome.engine.script_lines();

    let title = format!("impactmd {} command deck", env!("CARGO_PKG_VERSION"));
    let header = [
        title.as_str(),
        "Recorded without an engine; extraction points appear as comments.",
    ];

    match &args.output {
        Some(path) => {
            info!("Writing {} command(s) to {:?}", lines.len(), path);
            let mut writer = BufWriter::new(File::create(path)?);
            write_deck(&header, &lines, &mut writer)?;
            println!("✓ Input script written to: {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            write_deck(&header, &lines, &mut writer)?;
        }
    }

    Ok(())
}

fn write_deck(header: &[&str], lines: &[String], writer: &mut impl Write) -> io::Result<()> {
    write_script(header, lines.iter().map(String::as_str), writer)
}
