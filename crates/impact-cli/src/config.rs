mod defaults;

use crate::cli::ConfigArgs;
use crate::error::{CliError, Result};
use defaults::DefaultsConfig;
use impactmd::engine::config as core_config;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialExecutionConfig {
    mpi_cores: Option<usize>,
    omp_threads: Option<i32>,
    lmp: Option<PathBuf>,
    mpirun: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialPathsConfig {
    output_dir: Option<PathBuf>,
    input_data: Option<PathBuf>,
    molecule_file: Option<PathBuf>,
    potential_file: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialPotentialConfig {
    pair_style: Option<String>,
    elements: Option<Vec<String>>,
    neighbor_skin: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialGeometryConfig {
    lattice_constant: Option<f64>,
    box_width: Option<f64>,
    box_bottom: Option<f64>,
    surface_top: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialProjectileConfig {
    x: Option<f64>,
    y: Option<f64>,
    height_offset: Option<f64>,
    energy_ev: Option<f64>,
    velocity_factor: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialDynamicsConfig {
    timestep: Option<f64>,
    steps: Option<u64>,
    dump_every: Option<u32>,
    temperature: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialAnalysisConfig {
    zero_level: Option<f64>,
    cluster_cutoff: Option<f64>,
}

/// The configuration file as written by the user; every key is optional.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialSimulationConfig {
    execution: Option<PartialExecutionConfig>,
    paths: Option<PartialPathsConfig>,
    potential: Option<PartialPotentialConfig>,
    geometry: Option<PartialGeometryConfig>,
    projectile: Option<PartialProjectileConfig>,
    dynamics: Option<PartialDynamicsConfig>,
    analysis: Option<PartialAnalysisConfig>,
}

impl PartialSimulationConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Reads the file named by `--config`, or starts from an empty configuration.
    pub fn load(args: &ConfigArgs) -> Result<Self> {
        match &args.config {
            Some(path) => Self::from_file(path),
            None => {
                debug!("No configuration file given; using built-in defaults.");
                Ok(Self::default())
            }
        }
    }

    /// Resolves the final configuration: defaults, then file, then flags, then `--set`.
    pub fn merge_with_cli(mut self, args: &ConfigArgs) -> Result<core_config::SimulationConfig> {
        self.apply_cli_flags(args);
        self.apply_set_values(&args.set_values)?;

        let d = DefaultsConfig::default();
        let execution = self.execution.unwrap_or_default();
        let paths = self.paths.unwrap_or_default();
        let potential = self.potential.unwrap_or_default();
        let geometry = self.geometry.unwrap_or_default();
        let projectile = self.projectile.unwrap_or_default();
        let dynamics = self.dynamics.unwrap_or_default();
        let analysis = self.analysis.unwrap_or_default();

        core_config::SimulationConfigBuilder::new()
            .mpi_cores(execution.mpi_cores.unwrap_or(d.mpi_cores))
            .omp_threads(execution.omp_threads.unwrap_or(d.omp_threads))
            .lmp_executable(execution.lmp.unwrap_or_else(|| d.lmp_executable.into()))
            .mpirun(execution.mpirun.unwrap_or_else(|| d.mpirun.into()))
            .output_dir(paths.output_dir.unwrap_or_else(|| d.output_dir.into()))
            .input_data(paths.input_data.unwrap_or_else(|| d.input_data.into()))
            .molecule_file(paths.molecule_file.unwrap_or_else(|| d.molecule_file.into()))
            .potential_file(paths.potential_file.unwrap_or_else(|| d.potential_file.into()))
            .pair_style(potential.pair_style.unwrap_or_else(|| d.pair_style.to_string()))
            .elements(
                potential
                    .elements
                    .unwrap_or_else(|| d.elements.iter().map(|e| e.to_string()).collect()),
            )
            .neighbor_skin(potential.neighbor_skin.unwrap_or(d.neighbor_skin))
            .lattice_constant(geometry.lattice_constant.unwrap_or(d.lattice_constant))
            .box_width(geometry.box_width.unwrap_or(d.box_width))
            .box_bottom(geometry.box_bottom.unwrap_or(d.box_bottom))
            .surface_top(geometry.surface_top.unwrap_or(d.surface_top))
            .projectile_xy(
                projectile.x.unwrap_or(d.projectile_x),
                projectile.y.unwrap_or(d.projectile_y),
            )
            .height_offset(projectile.height_offset.unwrap_or(d.height_offset))
            .energy_ev(projectile.energy_ev.unwrap_or(d.energy_ev))
            .velocity_factor(projectile.velocity_factor.unwrap_or(d.velocity_factor))
            .timestep(dynamics.timestep.unwrap_or(d.timestep))
            .steps(dynamics.steps.unwrap_or(d.steps))
            .dump_every(dynamics.dump_every.unwrap_or(d.dump_every))
            .temperature(dynamics.temperature.unwrap_or(d.temperature))
            .zero_level(analysis.zero_level.unwrap_or(d.zero_level))
            .cluster_cutoff(analysis.cluster_cutoff.unwrap_or(d.cluster_cutoff))
            .build()
            .map_err(|e| CliError::Config(e.to_string()))
    }

    fn apply_cli_flags(&mut self, args: &ConfigArgs) {
        if let Some(threads) = args.threads {
            self.execution_mut().omp_threads = Some(threads);
        }
        if let Some(cores) = args.cores {
            self.execution_mut().mpi_cores = Some(cores);
        }
        if let Some(lmp) = &args.lmp {
            self.execution_mut().lmp = Some(lmp.clone());
        }
        if let Some(dir) = &args.output_dir {
            self.paths_mut().output_dir = Some(dir.clone());
        }
        if let Some(input) = &args.input {
            self.paths_mut().input_data = Some(input.clone());
        }
    }

    fn execution_mut(&mut self) -> &mut PartialExecutionConfig {
        self.execution.get_or_insert_with(Default::default)
    }

    fn paths_mut(&mut self) -> &mut PartialPathsConfig {
        self.paths.get_or_insert_with(Default::default)
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };
            debug!("Applying override {} = {}", key, value);

            match key {
                "execution.mpi-cores" => {
                    self.execution_mut().mpi_cores = Some(parse(key, value)?);
                }
                "execution.omp-threads" => {
                    self.execution_mut().omp_threads = Some(parse(key, value)?);
                }
                "execution.lmp" => self.execution_mut().lmp = Some(value.into()),
                "execution.mpirun" => self.execution_mut().mpirun = Some(value.into()),

                "paths.output-dir" => self.paths_mut().output_dir = Some(value.into()),
                "paths.input-data" => self.paths_mut().input_data = Some(value.into()),
                "paths.molecule-file" => self.paths_mut().molecule_file = Some(value.into()),
                "paths.potential-file" => self.paths_mut().potential_file = Some(value.into()),

                "potential.pair-style" => {
                    self.potential
                        .get_or_insert_with(Default::default)
                        .pair_style = Some(value.to_string());
                }
                "potential.elements" => {
                    self.potential.get_or_insert_with(Default::default).elements = Some(
                        value
                            .split(',')
                            .map(str::trim)
                            .filter(|e| !e.is_empty())
                            .map(str::to_string)
                            .collect(),
                    );
                }
                "potential.neighbor-skin" => {
                    self.potential
                        .get_or_insert_with(Default::default)
                        .neighbor_skin = Some(parse(key, value)?);
                }

                "geometry.lattice-constant" => {
                    self.geometry
                        .get_or_insert_with(Default::default)
                        .lattice_constant = Some(parse(key, value)?);
                }
                "geometry.box-width" => {
                    self.geometry.get_or_insert_with(Default::default).box_width =
                        Some(parse(key, value)?);
                }
                "geometry.box-bottom" => {
                    self.geometry.get_or_insert_with(Default::default).box_bottom =
                        Some(parse(key, value)?);
                }
                "geometry.surface-top" => {
                    self.geometry.get_or_insert_with(Default::default).surface_top =
                        Some(parse(key, value)?);
                }

                "projectile.x" => {
                    self.projectile.get_or_insert_with(Default::default).x =
                        Some(parse(key, value)?);
                }
                "projectile.y" => {
                    self.projectile.get_or_insert_with(Default::default).y =
                        Some(parse(key, value)?);
                }
                "projectile.height-offset" => {
                    self.projectile
                        .get_or_insert_with(Default::default)
                        .height_offset = Some(parse(key, value)?);
                }
                "projectile.energy-ev" => {
                    self.projectile.get_or_insert_with(Default::default).energy_ev =
                        Some(parse(key, value)?);
                }
                "projectile.velocity-factor" => {
                    self.projectile
                        .get_or_insert_with(Default::default)
                        .velocity_factor = Some(parse(key, value)?);
                }

                "dynamics.timestep" => {
                    self.dynamics.get_or_insert_with(Default::default).timestep =
                        Some(parse(key, value)?);
                }
                "dynamics.steps" => {
                    self.dynamics.get_or_insert_with(Default::default).steps =
                        Some(parse(key, value)?);
                }
                "dynamics.dump-every" => {
                    self.dynamics.get_or_insert_with(Default::default).dump_every =
                        Some(parse(key, value)?);
                }
                "dynamics.temperature" => {
                    self.dynamics.get_or_insert_with(Default::default).temperature =
                        Some(parse(key, value)?);
                }

                "analysis.zero-level" => {
                    self.analysis.get_or_insert_with(Default::default).zero_level =
                        Some(parse(key, value)?);
                }
                "analysis.cluster-cutoff" => {
                    self.analysis
                        .get_or_insert_with(Default::default)
                        .cluster_cutoff = Some(parse(key, value)?);
                }

                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        CliError::Config(format!(
            "Invalid {} value for {}: '{}'",
            std::any::type_name::<T>(),
            key,
            value
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    fn write_config_file(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("impact.toml");
        fs::write(&path, content).unwrap();
        path
    }

    fn config_args(extra: &[&str]) -> ConfigArgs {
        let mut argv = vec!["impactmd", "run"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Run(args) => args.config,
            Commands::Script(_) => panic!("Expected 'run' subcommand"),
        }
    }

    fn resolve(extra: &[&str]) -> Result<core_config::SimulationConfig> {
        let args = config_args(extra);
        PartialSimulationConfig::load(&args)?.merge_with_cli(&args)
    }

    #[test]
    fn no_file_and_no_flags_yields_reference_run() {
        let config = resolve(&[]).unwrap();

        assert_eq!(config.execution.mpi_cores, 1);
        assert_eq!(config.execution.omp_threads, 4);
        assert_eq!(config.execution.lmp_executable, PathBuf::from("lmp"));
        assert_eq!(config.paths.output_dir, PathBuf::from("results"));
        assert_eq!(config.paths.input_data, PathBuf::from("fall700.input.data"));
        assert_eq!(config.potential.elements, vec!["Si", "C"]);
        assert_eq!(config.geometry.lattice_constant, 5.43);
        assert_eq!(config.projectile.energy_ev, 8000.0);
        assert_eq!(config.dynamics.steps, 200);
        assert_eq!(config.dynamics.dump_every, 20);
        assert_eq!(config.analysis.zero_level, 83.391);
        assert_eq!(
            config.projectile.height(&config.geometry).to_bits(),
            (15.3_f64 * 5.43 + 20.0).to_bits()
        );
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config_file(
            &dir,
            r#"
        [execution]
        omp-threads = 0

        [potential]
        elements = ["Si", "C", "C"]

        [dynamics]
        steps = 1000
        dump-every = 50
        "#,
        );
        let config = resolve(&["-c", path.to_str().unwrap()]).unwrap();

        assert_eq!(config.execution.omp_threads, 0);
        assert_eq!(config.potential.elements, vec!["Si", "C", "C"]);
        assert_eq!(config.dynamics.steps, 1000);
        assert_eq!(config.dynamics.dump_every, 50);
        assert_eq!(config.dynamics.temperature, 700.0);
    }

    #[test]
    fn cli_flags_override_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config_file(
            &dir,
            r#"
        [execution]
        omp-threads = 8
        mpi-cores = 2

        [paths]
        output-dir = "from-file"
        "#,
        );
        let config = resolve(&[
            "-c",
            path.to_str().unwrap(),
            "--threads",
            "-1",
            "--cores",
            "16",
            "--output-dir",
            "from-cli",
            "--input",
            "other.data",
            "--lmp",
            "/opt/lammps/bin/lmp_mpi",
        ])
        .unwrap();

        assert_eq!(config.execution.omp_threads, -1);
        assert_eq!(config.execution.mpi_cores, 16);
        assert_eq!(config.paths.output_dir, PathBuf::from("from-cli"));
        assert_eq!(config.paths.input_data, PathBuf::from("other.data"));
        assert_eq!(
            config.execution.lmp_executable,
            PathBuf::from("/opt/lammps/bin/lmp_mpi")
        );
    }

    #[test]
    fn set_values_take_highest_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config_file(
            &dir,
            r#"
        [dynamics]
        steps = 1000
        "#,
        );
        let config = resolve(&[
            "-c",
            path.to_str().unwrap(),
            "--threads",
            "2",
            "-S",
            "dynamics.steps=20",
            "-S",
            "execution.omp-threads=6",
            "-S",
            "potential.elements=Si, C",
            "-S",
            "projectile.energy-ev=2000",
        ])
        .unwrap();

        assert_eq!(config.dynamics.steps, 20);
        assert_eq!(config.execution.omp_threads, 6);
        assert_eq!(config.potential.elements, vec!["Si", "C"]);
        assert_eq!(config.projectile.energy_ev, 2000.0);
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config_file(
            &dir,
            r#"
        [dynamics]
        stepz = 10
        "#,
        );
        let result = PartialSimulationConfig::from_file(&path);
        assert!(matches!(result, Err(CliError::FileParsing { .. })));
    }

    #[test]
    fn malformed_set_values_are_config_errors() {
        for bad in ["dynamics.steps", "dynamics.steps=many", "dynamics.speed=3"] {
            let result = resolve(&["-S", bad]);
            assert!(
                matches!(result, Err(CliError::Config(_))),
                "'{}' should be rejected",
                bad
            );
        }
    }

    #[test]
    fn invalid_values_fail_core_validation() {
        let result = resolve(&["-S", "dynamics.dump-every=0"]);
        assert!(matches!(result, Err(CliError::Config(ref msg)) if msg.contains("dump_every")));
    }
}
