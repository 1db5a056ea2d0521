use nalgebra::Point3;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidParameter {
        parameter: &'static str,
        reason: String,
    },
}

/// How the engine process is launched and parallelized.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionConfig {
    pub mpi_cores: usize,
    /// Zero or less selects GPU offload.
    pub omp_threads: i32,
    pub lmp_executable: PathBuf,
    pub mpirun: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathsConfig {
    pub output_dir: PathBuf,
    pub input_data: PathBuf,
    pub molecule_file: PathBuf,
    pub potential_file: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PotentialConfig {
    pub pair_style: String,
    /// Element names mapped onto atom types 1..=n.
    pub elements: Vec<String>,
    pub neighbor_skin: f64,
}

/// Substrate geometry, in lattice units unless noted.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryConfig {
    /// Lattice spacing in Angstrom.
    pub lattice_constant: f64,
    pub box_width: f64,
    pub box_bottom: f64,
    pub surface_top: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectileConfig {
    pub x: f64,
    pub y: f64,
    /// Gap above the surface, in Angstrom.
    pub height_offset: f64,
    pub energy_ev: f64,
    /// Converts sqrt(eV) into Angstrom/ps for the projectile mass.
    pub velocity_factor: f64,
}

impl ProjectileConfig {
    /// Starting height in box units: the surface top scaled by the lattice constant, plus the gap.
    pub fn height(&self, geometry: &GeometryConfig) -> f64 {
        self.surface_top_scaled(geometry) + self.height_offset
    }

    /// Initial velocity along z; negative points into the substrate.
    pub fn velocity(&self) -> f64 {
        -self.energy_ev.sqrt() * self.velocity_factor
    }

    pub fn position(&self, geometry: &GeometryConfig) -> Point3<f64> {
        Point3::new(self.x, self.y, self.height(geometry))
    }

    fn surface_top_scaled(&self, geometry: &GeometryConfig) -> f64 {
        geometry.surface_top * geometry.lattice_constant
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DynamicsConfig {
    /// Upper bound of the adaptive timestep, in ps.
    pub timestep: f64,
    pub steps: u64,
    pub dump_every: u32,
    pub temperature: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Atoms above this height (Angstrom) count as sputtered.
    pub zero_level: f64,
    pub cluster_cutoff: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub execution: ExecutionConfig,
    pub paths: PathsConfig,
    pub potential: PotentialConfig,
    pub geometry: GeometryConfig,
    pub projectile: ProjectileConfig,
    pub dynamics: DynamicsConfig,
    pub analysis: AnalysisConfig,
}

#[derive(Default)]
pub struct SimulationConfigBuilder {
    mpi_cores: Option<usize>,
    omp_threads: Option<i32>,
    lmp_executable: Option<PathBuf>,
    mpirun: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    input_data: Option<PathBuf>,
    molecule_file: Option<PathBuf>,
    potential_file: Option<PathBuf>,
    pair_style: Option<String>,
    elements: Option<Vec<String>>,
    neighbor_skin: Option<f64>,
    lattice_constant: Option<f64>,
    box_width: Option<f64>,
    box_bottom: Option<f64>,
    surface_top: Option<f64>,
    projectile_x: Option<f64>,
    projectile_y: Option<f64>,
    height_offset: Option<f64>,
    energy_ev: Option<f64>,
    velocity_factor: Option<f64>,
    timestep: Option<f64>,
    steps: Option<u64>,
    dump_every: Option<u32>,
    temperature: Option<f64>,
    zero_level: Option<f64>,
    cluster_cutoff: Option<f64>,
}

impl SimulationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mpi_cores(mut self, cores: usize) -> Self {
        self.mpi_cores = Some(cores);
        self
    }
    pub fn omp_threads(mut self, threads: i32) -> Self {
        self.omp_threads = Some(threads);
        self
    }
    pub fn lmp_executable(mut self, path: PathBuf) -> Self {
        self.lmp_executable = Some(path);
        self
    }
    pub fn mpirun(mut self, path: PathBuf) -> Self {
        self.mpirun = Some(path);
        self
    }
    pub fn output_dir(mut self, path: PathBuf) -> Self {
        self.output_dir = Some(path);
        self
    }
    pub fn input_data(mut self, path: PathBuf) -> Self {
        self.input_data = Some(path);
        self
    }
    pub fn molecule_file(mut self, path: PathBuf) -> Self {
        self.molecule_file = Some(path);
        self
    }
    pub fn potential_file(mut self, path: PathBuf) -> Self {
        self.potential_file = Some(path);
        self
    }
    pub fn pair_style(mut self, style: String) -> Self {
        self.pair_style = Some(style);
        self
    }
    pub fn elements(mut self, elements: Vec<String>) -> Self {
        self.elements = Some(elements);
        self
    }
    pub fn neighbor_skin(mut self, skin: f64) -> Self {
        self.neighbor_skin = Some(skin);
        self
    }
    pub fn lattice_constant(mut self, a: f64) -> Self {
        self.lattice_constant = Some(a);
        self
    }
    pub fn box_width(mut self, width: f64) -> Self {
        self.box_width = Some(width);
        self
    }
    pub fn box_bottom(mut self, bottom: f64) -> Self {
        self.box_bottom = Some(bottom);
        self
    }
    pub fn surface_top(mut self, top: f64) -> Self {
        self.surface_top = Some(top);
        self
    }
    pub fn projectile_xy(mut self, x: f64, y: f64) -> Self {
        self.projectile_x = Some(x);
        self.projectile_y = Some(y);
        self
    }
    pub fn height_offset(mut self, offset: f64) -> Self {
        self.height_offset = Some(offset);
        self
    }
    pub fn energy_ev(mut self, energy: f64) -> Self {
        self.energy_ev = Some(energy);
        self
    }
    pub fn velocity_factor(mut self, factor: f64) -> Self {
        self.velocity_factor = Some(factor);
        self
    }
    pub fn timestep(mut self, dt: f64) -> Self {
        self.timestep = Some(dt);
        self
    }
    pub fn steps(mut self, steps: u64) -> Self {
        self.steps = Some(steps);
        self
    }
    pub fn dump_every(mut self, every: u32) -> Self {
        self.dump_every = Some(every);
        self
    }
    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }
    pub fn zero_level(mut self, level: f64) -> Self {
        self.zero_level = Some(level);
        self
    }
    pub fn cluster_cutoff(mut self, cutoff: f64) -> Self {
        self.cluster_cutoff = Some(cutoff);
        self
    }

    pub fn build(self) -> Result<SimulationConfig, ConfigError> {
        let execution = ExecutionConfig {
            mpi_cores: self
                .mpi_cores
                .ok_or(ConfigError::MissingParameter("mpi_cores"))?,
            omp_threads: self
                .omp_threads
                .ok_or(ConfigError::MissingParameter("omp_threads"))?,
            lmp_executable: self
                .lmp_executable
                .ok_or(ConfigError::MissingParameter("lmp_executable"))?,
            mpirun: self.mpirun.ok_or(ConfigError::MissingParameter("mpirun"))?,
        };
        let paths = PathsConfig {
            output_dir: self
                .output_dir
                .ok_or(ConfigError::MissingParameter("output_dir"))?,
            input_data: self
                .input_data
                .ok_or(ConfigError::MissingParameter("input_data"))?,
            molecule_file: self
                .molecule_file
                .ok_or(ConfigError::MissingParameter("molecule_file"))?,
            potential_file: self
                .potential_file
                .ok_or(ConfigError::MissingParameter("potential_file"))?,
        };
        let potential = PotentialConfig {
            pair_style: self
                .pair_style
                .ok_or(ConfigError::MissingParameter("pair_style"))?,
            elements: self
                .elements
                .ok_or(ConfigError::MissingParameter("elements"))?,
            neighbor_skin: self
                .neighbor_skin
                .ok_or(ConfigError::MissingParameter("neighbor_skin"))?,
        };
        let geometry = GeometryConfig {
            lattice_constant: self
                .lattice_constant
                .ok_or(ConfigError::MissingParameter("lattice_constant"))?,
            box_width: self
                .box_width
                .ok_or(ConfigError::MissingParameter("box_width"))?,
            box_bottom: self
                .box_bottom
                .ok_or(ConfigError::MissingParameter("box_bottom"))?,
            surface_top: self
                .surface_top
                .ok_or(ConfigError::MissingParameter("surface_top"))?,
        };
        let projectile = ProjectileConfig {
            x: self
                .projectile_x
                .ok_or(ConfigError::MissingParameter("projectile_x"))?,
            y: self
                .projectile_y
                .ok_or(ConfigError::MissingParameter("projectile_y"))?,
            height_offset: self
                .height_offset
                .ok_or(ConfigError::MissingParameter("height_offset"))?,
            energy_ev: self
                .energy_ev
                .ok_or(ConfigError::MissingParameter("energy_ev"))?,
            velocity_factor: self
                .velocity_factor
                .ok_or(ConfigError::MissingParameter("velocity_factor"))?,
        };
        let dynamics = DynamicsConfig {
            timestep: self
                .timestep
                .ok_or(ConfigError::MissingParameter("timestep"))?,
            steps: self.steps.ok_or(ConfigError::MissingParameter("steps"))?,
            dump_every: self
                .dump_every
                .ok_or(ConfigError::MissingParameter("dump_every"))?,
            temperature: self
                .temperature
                .ok_or(ConfigError::MissingParameter("temperature"))?,
        };
        let analysis = AnalysisConfig {
            zero_level: self
                .zero_level
                .ok_or(ConfigError::MissingParameter("zero_level"))?,
            cluster_cutoff: self
                .cluster_cutoff
                .ok_or(ConfigError::MissingParameter("cluster_cutoff"))?,
        };

        let config = SimulationConfig {
            execution,
            paths,
            potential,
            geometry,
            projectile,
            dynamics,
            analysis,
        };
        config.validate()?;
        Ok(config)
    }
}

fn invalid(parameter: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidParameter {
        parameter,
        reason: reason.into(),
    }
}

fn positive(parameter: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(parameter, format!("must be a positive number, got {}", value)))
    }
}

fn finite(parameter: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(invalid(parameter, format!("must be finite, got {}", value)))
    }
}

impl SimulationConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.execution.mpi_cores == 0 {
            return Err(invalid("mpi_cores", "at least one core is required"));
        }
        if self.potential.pair_style.trim().is_empty() {
            return Err(invalid("pair_style", "must not be empty"));
        }
        if self.potential.elements.is_empty() {
            return Err(invalid("elements", "at least one element is required"));
        }
        if !self.potential.neighbor_skin.is_finite() || self.potential.neighbor_skin < 0.0 {
            return Err(invalid("neighbor_skin", "must be a non-negative number"));
        }

        positive("lattice_constant", self.geometry.lattice_constant)?;
        positive("box_width", self.geometry.box_width)?;
        finite("box_bottom", self.geometry.box_bottom)?;
        finite("surface_top", self.geometry.surface_top)?;
        if self.geometry.surface_top <= self.geometry.box_bottom {
            return Err(invalid(
                "surface_top",
                format!(
                    "must lie above box_bottom ({} <= {})",
                    self.geometry.surface_top, self.geometry.box_bottom
                ),
            ));
        }

        finite("projectile_x", self.projectile.x)?;
        finite("projectile_y", self.projectile.y)?;
        finite("height_offset", self.projectile.height_offset)?;
        if !self.projectile.energy_ev.is_finite() || self.projectile.energy_ev < 0.0 {
            return Err(invalid("energy_ev", "must be a non-negative number"));
        }
        positive("velocity_factor", self.projectile.velocity_factor)?;

        positive("timestep", self.dynamics.timestep)?;
        if self.dynamics.dump_every == 0 {
            return Err(invalid("dump_every", "must be at least 1"));
        }
        finite("temperature", self.dynamics.temperature)?;

        finite("zero_level", self.analysis.zero_level)?;
        positive("cluster_cutoff", self.analysis.cluster_cutoff)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn reference_builder() -> SimulationConfigBuilder {
        SimulationConfigBuilder::new()
            .mpi_cores(1)
            .omp_threads(4)
            .lmp_executable(PathBuf::from("lmp"))
            .mpirun(PathBuf::from("mpirun"))
            .output_dir(PathBuf::from("results"))
            .input_data(PathBuf::from("fall700.input.data"))
            .molecule_file(PathBuf::from("mol.C60"))
            .potential_file(PathBuf::from("SiC.tersoff.zbl"))
            .pair_style("tersoff/zbl".to_string())
            .elements(vec!["Si".to_string(), "C".to_string()])
            .neighbor_skin(3.0)
            .lattice_constant(5.43)
            .box_width(12.0)
            .box_bottom(-16.0)
            .surface_top(15.3)
            .projectile_xy(0.0, 0.0)
            .height_offset(20.0)
            .energy_ev(8000.0)
            .velocity_factor(5.174)
            .timestep(1e-3)
            .steps(200)
            .dump_every(20)
            .temperature(700.0)
            .zero_level(83.391)
            .cluster_cutoff(3.0)
    }

    pub(crate) fn reference_config() -> SimulationConfig {
        reference_builder().build().unwrap()
    }

    #[test]
    fn reference_values_build() {
        let config = reference_config();
        assert_eq!(config.execution.omp_threads, 4);
        assert_eq!(config.dynamics.steps, 200);
        assert_eq!(config.analysis.zero_level, 83.391);
    }

    #[test]
    fn derived_projectile_constants_follow_the_formulas_exactly() {
        let config = reference_config();
        let height = config.projectile.height(&config.geometry);
        let velocity = config.projectile.velocity();

        assert_eq!(height.to_bits(), (15.3_f64 * 5.43 + 20.0).to_bits());
        assert_eq!(velocity.to_bits(), (-(8000.0_f64.sqrt()) * 5.174).to_bits());
        assert!((height - 103.079).abs() < 1e-9);
        assert!((velocity + 462.7766).abs() < 1e-3);
    }

    #[test]
    fn projectile_position_combines_xy_and_height() {
        let config = reference_config();
        let pos = config.projectile.position(&config.geometry);
        assert_eq!(pos.x, 0.0);
        assert_eq!(pos.y, 0.0);
        assert_eq!(pos.z, config.projectile.height(&config.geometry));
    }

    #[test]
    fn missing_parameter_is_named() {
        let result = SimulationConfigBuilder::new().mpi_cores(1).build();
        assert_eq!(result, Err(ConfigError::MissingParameter("omp_threads")));
    }

    #[test]
    fn zero_cores_is_rejected() {
        let err = reference_builder().mpi_cores(0).build().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidParameter {
                parameter: "mpi_cores",
                ..
            }
        ));
    }

    #[test]
    fn non_positive_lattice_constant_is_rejected() {
        for bad in [0.0, -5.43, f64::NAN] {
            let err = reference_builder().lattice_constant(bad).build().unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidParameter {
                    parameter: "lattice_constant",
                    ..
                }
            ));
        }
    }

    #[test]
    fn surface_must_lie_above_bottom() {
        let err = reference_builder()
            .surface_top(-20.0)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidParameter {
                parameter: "surface_top",
                ..
            }
        ));
    }

    #[test]
    fn zero_dump_cadence_is_rejected() {
        let err = reference_builder().dump_every(0).build().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidParameter {
                parameter: "dump_every",
                ..
            }
        ));
    }

    #[test]
    fn gpu_thread_counts_are_valid_configuration() {
        assert!(reference_builder().omp_threads(0).build().is_ok());
        assert!(reference_builder().omp_threads(-1).build().is_ok());
    }
}
