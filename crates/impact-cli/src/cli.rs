use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "impactmd - drives a C60-on-silicon sputtering simulation through a LAMMPS engine and summarizes the sputtered clusters.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the engine, run the impact and write the cluster report.
    Run(RunArgs),
    /// Write the command deck as an input script without launching the engine.
    Script(ScriptArgs),
}

/// Configuration sources shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Path to a configuration file in TOML format. Built-in defaults apply when omitted.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the OpenMP thread count. Zero or a negative value selects the GPU backend.
    #[arg(short = 'j', long, value_name = "NUM", allow_negative_numbers = true)]
    pub threads: Option<i32>,

    /// Override the number of MPI ranks the engine is launched with.
    #[arg(short = 'n', long, value_name = "NUM")]
    pub cores: Option<usize>,

    /// Override the directory receiving the engine log, dumps and the run report.
    #[arg(short, long, value_name = "PATH")]
    pub output_dir: Option<PathBuf>,

    /// Override the initial structure data file.
    #[arg(short, long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Override the engine executable.
    #[arg(long, value_name = "PATH")]
    pub lmp: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file and flags.
    /// Can be used multiple times. Example: -S dynamics.steps=500
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Arguments for the `script` subcommand.
#[derive(Args, Debug)]
pub struct ScriptArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Destination of the input script. Printed to stdout when omitted.
    #[arg(value_name = "OUTPUT")]
    pub output: Option<PathBuf>,
}
