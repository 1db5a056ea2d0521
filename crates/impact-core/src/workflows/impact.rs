use crate::core::cluster::ClusterSummary;
use crate::core::command::{
    AtomStyle, Block, BoundaryKind, Command, ComputeDef, DistanceUnits, FixStyle, GroupSelector,
    LatticeStyle, Orientation, UnitStyle, VariableFormula,
};
use crate::core::value::Value;
use crate::engine::backend::{backend_commands, select_backend};
use crate::engine::config::SimulationConfig;
use crate::engine::driver::{ComputeKind, ComputeStyle, Engine};
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter, Stage};
use crate::engine::session::Session;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info, info_span, instrument};

/// Impact runs per invocation. The per-impact block sits in a loop so that sequential
/// impacts can be added later; only a single run is performed today.
const IMPACT_RUNS: usize = 1;

const PROJECTILE: &str = "C60";
const SUBSTRATE: &str = "Si";
const FIXED: &str = "Si_fixed";
const MOBILE: &str = "nve";
const CLUSTERS: &str = "clusters";
const SPUTTERED: &str = "is_sputtered";

const SUBSTRATE_TYPE: u32 = 1;
const PROJECTILE_TYPE: u32 = 2;
const FIXED_LAYER_THICKNESS: f64 = 0.5;
const DT_RESET_MAX_DISPLACEMENT: f64 = 0.1;

const TRAJECTORY_COLUMNS: [&str; 5] = ["id", "type", "x", "y", "z"];
const CLUSTER_COLUMNS: [&str; 9] = ["id", "x", "y", "z", "vx", "vy", "vz", "type", "c_clusters"];

#[derive(Debug, Clone, Serialize)]
pub struct ImpactResult {
    pub run_number: usize,
    pub projectile_position: [f64; 3],
    pub projectile_velocity: f64,
    pub dynamics_steps: u64,
    pub summary: ClusterSummary,
    /// Per-atom cluster ids, ordered by atom id; 0 for atoms that were not sputtered.
    #[serde(skip)]
    pub atom_clusters: Vec<f64>,
}

/// Results of every impact, plus the engine after it has been released.
pub struct ImpactRun<E> {
    pub results: Vec<ImpactResult>,
    pub engine: E,
}

#[instrument(skip_all, name = "impact_workflow")]
pub fn run<E, F>(
    connect: F,
    config: &SimulationConfig,
    reporter: &ProgressReporter,
) -> Result<ImpactRun<E>, EngineError>
where
    E: Engine,
    F: FnOnce() -> Result<E, EngineError>,
{
    let mut session = stage(reporter, Stage::Connect, || {
        let mut session = Session::open(connect()?);
        session.issue(&Command::Log {
            path: config.paths.output_dir.join("log.init"),
        })?;
        Ok(session)
    })?;

    stage(reporter, Stage::SelectBackend, || {
        let backend = select_backend(config.execution.omp_threads);
        info!(?backend, "Selected execution backend.");
        session.issue_all(&backend_commands(backend))
    })?;

    stage(reporter, Stage::DeclareUnitsAndGeometry, || {
        session.issue_all(&[
            Command::Units(UnitStyle::Metal),
            Command::Dimension(3),
            Command::Boundary([
                BoundaryKind::Periodic,
                BoundaryKind::Periodic,
                BoundaryKind::ShrinkMin,
            ]),
            Command::AtomStyle(AtomStyle::Atomic),
            Command::AtomMap,
        ])
    })?;

    stage(reporter, Stage::LoadStructure, || {
        info!("Loading initial structure from {:?}", config.paths.input_data);
        session.issue(&Command::ReadData {
            path: config.paths.input_data.clone(),
        })
    })?;

    let mut results = Vec::with_capacity(IMPACT_RUNS);
    for run_num in 1..=IMPACT_RUNS {
        let span = info_span!("impact", run_num);
        let _guard = span.enter();

        reporter.report(Progress::ImpactStart {
            run: run_num,
            total: IMPACT_RUNS,
        });
        let result = run_impact(&mut session, config, reporter, run_num)?;
        info!(
            sputtered = result.summary.sputtered_atoms,
            clusters = result.summary.cluster_count(),
            "Impact finished."
        );
        reporter.report(Progress::ImpactFinish { run: run_num });
        results.push(result);
    }

    let engine = stage(reporter, Stage::Release, move || session.finish())?;
    Ok(ImpactRun { results, engine })
}

fn stage<T>(
    reporter: &ProgressReporter,
    stage: Stage,
    body: impl FnOnce() -> Result<T, EngineError>,
) -> Result<T, EngineError> {
    reporter.report(Progress::StageStart(stage));
    debug!(stage = stage.label(), "Entering stage.");
    let out = body()?;
    reporter.report(Progress::StageFinish(stage));
    Ok(out)
}

fn run_impact<E: Engine>(
    session: &mut Session<E>,
    config: &SimulationConfig,
    reporter: &ProgressReporter,
    run_num: usize,
) -> Result<ImpactResult, EngineError> {
    let position = config.projectile.position(&config.geometry);
    let velocity = config.projectile.velocity();
    info!(
        x = position.x,
        y = position.y,
        z = position.z,
        velocity,
        "Projectile initial conditions."
    );

    stage(reporter, Stage::DefineRunVariables, || {
        let geometry = &config.geometry;
        session.issue(&Command::Lattice {
            style: LatticeStyle::Diamond,
            constant: geometry.lattice_constant,
            orientation: Orientation::default(),
        })?;

        let bindings = [
            ("step", config.dynamics.timestep),
            ("C60_x", position.x),
            ("C60_y", position.y),
            ("C60_z", position.z),
            ("C60_vel", velocity),
            ("box_width", geometry.box_width),
            ("box_bottom", geometry.box_bottom),
            ("Si_top", geometry.surface_top),
            ("temperature", config.dynamics.temperature),
            ("zero_lvl", config.analysis.zero_level),
            ("Si_lattice", geometry.lattice_constant),
        ];
        for (name, value) in bindings {
            session.rebind(name, value)?;
        }
        Ok(())
    })?;

    stage(reporter, Stage::CreateProjectile, || {
        session.issue_all(&[
            Command::Molecule {
                id: PROJECTILE.to_string(),
                path: config.paths.molecule_file.clone(),
            },
            Command::CreateAtomsSingle {
                atom_type: SUBSTRATE_TYPE,
                position: [Value::var("C60_x"), Value::var("C60_y"), Value::var("C60_z")],
                molecule: PROJECTILE.to_string(),
                seed: 1,
                units: DistanceUnits::Box,
            },
        ])
    })?;

    stage(reporter, Stage::DefineRegionsAndPotential, || {
        let lateral = || (Value::neg_var("box_width"), Value::var("box_width"));
        session.issue_all(&[
            Command::VariableEqual {
                name: FIXED.to_string(),
                formula: VariableFormula::Expression(format!(
                    "v_box_bottom + {}",
                    FIXED_LAYER_THICKNESS
                )),
            },
            Command::Region {
                id: FIXED.to_string(),
                block: Block {
                    x: lateral(),
                    y: lateral(),
                    z: (Value::var("box_bottom"), Value::var(FIXED)),
                },
                units: DistanceUnits::Lattice,
            },
            Command::Region {
                id: CLUSTERS.to_string(),
                block: Block {
                    x: lateral(),
                    y: lateral(),
                    z: (Value::Integer(0), Value::Inf),
                },
                units: DistanceUnits::Lattice,
            },
            Command::PairStyle(config.potential.pair_style.clone()),
            Command::PairCoeff {
                path: config.paths.potential_file.clone(),
                elements: config.potential.elements.clone(),
            },
            Command::Neighbor {
                skin: config.potential.neighbor_skin,
            },
        ])
    })?;

    stage(reporter, Stage::DefineGroups, || {
        session.issue_all(&[
            group(PROJECTILE, GroupSelector::Type(PROJECTILE_TYPE)),
            group(SUBSTRATE, GroupSelector::Type(SUBSTRATE_TYPE)),
            group(FIXED, GroupSelector::Region(FIXED.to_string())),
            group(
                MOBILE,
                GroupSelector::Subtract(vec!["all".to_string(), FIXED.to_string()]),
            ),
            Command::VariableAtom {
                name: SPUTTERED.to_string(),
                formula: "z>v_zero_lvl".to_string(),
            },
        ])
    })?;

    stage(reporter, Stage::AttachIntegratorAndDump, || {
        session.issue_all(&[
            Command::Fix {
                id: "nve".to_string(),
                group: MOBILE.to_string(),
                style: FixStyle::Nve,
            },
            Command::Fix {
                id: "dt".to_string(),
                group: "all".to_string(),
                style: FixStyle::DtReset {
                    every: 1,
                    tmin: Value::immediate("v_step/10"),
                    tmax: Value::var("step"),
                    xmax: DT_RESET_MAX_DISPLACEMENT,
                },
            },
            dump(
                "all",
                "all",
                config.dynamics.dump_every,
                output(config, "all.dump"),
                &TRAJECTORY_COLUMNS,
            ),
            Command::Velocity {
                group: PROJECTILE.to_string(),
                components: [Value::Null, Value::Null, Value::var("C60_vel")],
                sum: true,
                units: DistanceUnits::Box,
            },
        ])
    })?;

    stage(reporter, Stage::RunDynamics, || {
        info!(steps = config.dynamics.steps, "Running impact dynamics.");
        session.run(config.dynamics.steps)
    })?;

    stage(reporter, Stage::RecomputeClusterMembership, || {
        session.issue(&group(CLUSTERS, GroupSelector::Variable(SPUTTERED.to_string())))
    })?;

    stage(reporter, Stage::ComputeClustering, || {
        session.issue_all(&[
            Command::Compute {
                id: CLUSTERS.to_string(),
                group: CLUSTERS.to_string(),
                def: ComputeDef::ClusterAtom {
                    cutoff: config.analysis.cluster_cutoff,
                },
            },
            Command::Compute {
                id: "mass".to_string(),
                group: CLUSTERS.to_string(),
                def: ComputeDef::PropertyAtom(vec!["mass".to_string()]),
            },
        ])
    })?;

    stage(reporter, Stage::DumpClusterData, || {
        session.issue_all(&[
            dump(
                CLUSTERS,
                CLUSTERS,
                1,
                output(config, "clusters.dump"),
                &CLUSTER_COLUMNS,
            ),
            dump("final", "all", 1, output(config, "final.dump"), &CLUSTER_COLUMNS),
        ])
    })?;

    stage(reporter, Stage::RunZeroStepFlush, || session.run(0))?;

    let atom_clusters = stage(reporter, Stage::ExtractResult, || {
        session
            .extract(CLUSTERS, ComputeStyle::PerAtom, ComputeKind::Vector)?
            .into_vector()
            .ok_or_else(|| EngineError::Extraction {
                id: CLUSTERS.to_string(),
                message: "expected a per-atom vector".to_string(),
            })
    })?;

    let summary = ClusterSummary::from_ids(&atom_clusters);
    reporter.report(Progress::Message(format!(
        "Run {}: {} sputtered atom(s) in {} cluster(s)",
        run_num,
        summary.sputtered_atoms,
        summary.cluster_count()
    )));

    Ok(ImpactResult {
        run_number: run_num,
        projectile_position: [position.x, position.y, position.z],
        projectile_velocity: velocity,
        dynamics_steps: config.dynamics.steps,
        summary,
        atom_clusters,
    })
}

fn group(id: &str, selector: GroupSelector) -> Command {
    Command::Group {
        id: id.to_string(),
        selector,
    }
}

fn dump(id: &str, group: &str, every: u32, path: PathBuf, columns: &[&str]) -> Command {
    Command::Dump {
        id: id.to_string(),
        group: group.to_string(),
        every,
        path,
        columns: columns.iter().map(|c| c.to_string()).collect(),
    }
}

fn output(config: &SimulationConfig, name: &str) -> PathBuf {
    config.paths.output_dir.join(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::tests::{reference_builder, reference_config};
    use crate::engine::driver::ComputeValue;
    use crate::engine::recorder::RecordingEngine;
    use std::sync::{Arc, Mutex};

    fn record(config: &SimulationConfig, engine: RecordingEngine) -> ImpactRun<RecordingEngine> {
        run(|| Ok(engine), config, &ProgressReporter::new()).unwrap()
    }

    fn deck(config: &SimulationConfig) -> Vec<String> {
        let outcome = record(config, RecordingEngine::new());
        let lines = outcome.engine.commands();
        lines.into_iter().map(str::to_string).collect()
    }

    fn position_of(lines: &[String], line: &str) -> usize {
        lines
            .iter()
            .position(|l| l == line)
            .unwrap_or_else(|| panic!("'{}' was never issued", line))
    }

    #[test]
    fn reference_run_issues_the_full_deck_in_order() {
        let config = reference_config();
        let z = 15.3_f64 * 5.43 + 20.0;
        let v = -(8000.0_f64.sqrt()) * 5.174;

        let expected: Vec<String> = [
            "log results/log.init",
            "package omp 4",
            "suffix omp",
            "units metal",
            "dimension 3",
            "boundary p p m",
            "atom_style atomic",
            "atom_modify map yes",
            "read_data fall700.input.data",
            "lattice diamond 5.43 orient x 1 0 0 orient y 0 1 0 orient z 0 0 1",
            "variable step delete",
            "variable step equal 0.001",
            "variable C60_x delete",
            "variable C60_x equal 0",
            "variable C60_y delete",
            "variable C60_y equal 0",
            "variable C60_z delete",
            &format!("variable C60_z equal {}", z),
            "variable C60_vel delete",
            &format!("variable C60_vel equal {}", v),
            "variable box_width delete",
            "variable box_width equal 12",
            "variable box_bottom delete",
            "variable box_bottom equal -16",
            "variable Si_top delete",
            "variable Si_top equal 15.3",
            "variable temperature delete",
            "variable temperature equal 700",
            "variable zero_lvl delete",
            "variable zero_lvl equal 83.391",
            "variable Si_lattice delete",
            "variable Si_lattice equal 5.43",
            "molecule C60 \"mol.C60\"",
            "create_atoms 1 single ${C60_x} ${C60_y} ${C60_z} mol C60 1 units box",
            "variable Si_fixed equal 'v_box_bottom + 0.5'",
            "region Si_fixed block -${box_width} ${box_width} -${box_width} ${box_width} ${box_bottom} ${Si_fixed} units lattice",
            "region clusters block -${box_width} ${box_width} -${box_width} ${box_width} 0 INF units lattice",
            "pair_style tersoff/zbl",
            "pair_coeff * * SiC.tersoff.zbl Si C",
            "neighbor 3.0 bin",
            "group C60 type 2",
            "group Si type 1",
            "group Si_fixed region Si_fixed",
            "group nve subtract all Si_fixed",
            "variable is_sputtered atom \"z>v_zero_lvl\"",
            "fix nve nve nve",
            "fix dt all dt/reset 1 $(v_step/10) ${step} 0.1",
            "dump all all custom 20 results/all.dump id type x y z",
            "velocity C60 set NULL NULL ${C60_vel} sum yes units box",
            "run 200",
            "group clusters variable is_sputtered",
            "compute clusters clusters cluster/atom 3",
            "compute mass clusters property/atom mass",
            "dump clusters clusters custom 1 results/clusters.dump id x y z vx vy vz type c_clusters",
            "dump final all custom 1 results/final.dump id x y z vx vy vz type c_clusters",
            "run 0",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        assert_eq!(deck(&config), expected);
    }

    #[test]
    fn derived_constants_reach_the_engine_bit_for_bit() {
        let config = reference_config();
        let lines = deck(&config);

        let value_of = |name: &str| -> f64 {
            let prefix = format!("variable {} equal ", name);
            lines
                .iter()
                .find_map(|l| l.strip_prefix(prefix.as_str()))
                .unwrap()
                .parse()
                .unwrap()
        };

        assert_eq!(value_of("C60_z").to_bits(), (15.3_f64 * 5.43 + 20.0).to_bits());
        assert_eq!(
            value_of("C60_vel").to_bits(),
            (-(8000.0_f64.sqrt()) * 5.174).to_bits()
        );
    }

    #[test]
    fn backend_is_selected_exactly_once_before_geometry() {
        for (threads, package, suffix) in [
            (4, "package omp 4", "suffix omp"),
            (0, "package gpu 0", "suffix gpu"),
            (-2, "package gpu 0", "suffix gpu"),
        ] {
            let config = reference_builder().omp_threads(threads).build().unwrap();
            let lines = deck(&config);

            assert_eq!(lines.iter().filter(|l| l.starts_with("package ")).count(), 1);
            assert_eq!(lines.iter().filter(|l| l.starts_with("suffix ")).count(), 1);
            let units = position_of(&lines, "units metal");
            assert!(position_of(&lines, package) < units);
            assert!(position_of(&lines, suffix) < units);
        }
    }

    #[test]
    fn every_rebound_variable_is_deleted_immediately_before_definition() {
        let lines = deck(&reference_config());
        let mut rebinds = 0;
        for (i, line) in lines.iter().enumerate() {
            if let Some(name) = line
                .strip_prefix("variable ")
                .and_then(|rest| rest.strip_suffix(" delete"))
            {
                let next = &lines[i + 1];
                assert!(next.starts_with(&format!("variable {} equal ", name)));
                rebinds += 1;
            }
        }
        assert_eq!(rebinds, 11);
    }

    #[test]
    fn regions_precede_groups_and_potential_precedes_dynamics() {
        let lines = deck(&reference_config());
        assert!(
            position_of(&lines, "region Si_fixed block -${box_width} ${box_width} -${box_width} ${box_width} ${box_bottom} ${Si_fixed} units lattice")
                < position_of(&lines, "group Si_fixed region Si_fixed")
        );
        assert!(
            position_of(&lines, "region clusters block -${box_width} ${box_width} -${box_width} ${box_width} 0 INF units lattice")
                < position_of(&lines, "group clusters variable is_sputtered")
        );
        assert!(position_of(&lines, "pair_style tersoff/zbl") < position_of(&lines, "run 200"));
    }

    #[test]
    fn dynamics_runs_configured_steps_then_flushes_with_zero() {
        let config = reference_builder().steps(350).build().unwrap();
        let runs: Vec<_> = deck(&config)
            .into_iter()
            .filter(|l| l.starts_with("run "))
            .collect();
        assert_eq!(runs, vec!["run 350", "run 0"]);
    }

    #[test]
    fn extracted_cluster_ids_are_summarized() {
        let config = reference_config();
        let engine = RecordingEngine::new().with_compute(
            "clusters",
            ComputeValue::Vector(vec![0.0, 5.0, 5.0, 0.0, 9.0]),
        );
        let outcome = record(&config, engine);

        assert_eq!(outcome.results.len(), 1);
        let result = &outcome.results[0];
        assert_eq!(result.run_number, 1);
        assert_eq!(result.dynamics_steps, 200);
        assert_eq!(result.atom_clusters.len(), 5);
        assert_eq!(result.summary.cluster_count(), 2);
        assert_eq!(result.summary.sputtered_atoms, 3);
        assert_eq!(
            result.projectile_position[2].to_bits(),
            (15.3_f64 * 5.43 + 20.0).to_bits()
        );
    }

    #[test]
    fn scalar_answer_for_cluster_ids_is_an_extraction_error() {
        let config = reference_config();
        let engine = RecordingEngine::new().with_compute("clusters", ComputeValue::Scalar(1.0));
        let result = run(|| Ok(engine), &config, &ProgressReporter::new());
        assert!(matches!(result, Err(EngineError::Extraction { .. })));
    }

    #[test]
    fn engine_is_released_exactly_once_on_success() {
        let outcome = record(&reference_config(), RecordingEngine::new());
        assert_eq!(outcome.engine.close_count(), 1);
    }

    #[test]
    fn engine_failure_aborts_the_workflow() {
        let config = reference_config();
        let engine = RecordingEngine::new().rejecting("read_data", "ERROR: Cannot open file");
        let result = run(|| Ok(engine), &config, &ProgressReporter::new());
        assert!(matches!(
            result,
            Err(EngineError::CommandRejected { ref command, .. }) if command == "read_data fall700.input.data"
        ));
    }

    #[test]
    fn connection_failure_is_fatal() {
        let config = reference_config();
        let result = run(
            || -> Result<RecordingEngine, EngineError> {
                Err(EngineError::Disconnected {
                    command: "connect".to_string(),
                })
            },
            &config,
            &ProgressReporter::new(),
        );
        assert!(matches!(result, Err(EngineError::Disconnected { .. })));
    }

    #[test]
    fn stages_are_reported_in_state_machine_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let reporter = ProgressReporter::with_callback(Box::new(move |p: Progress| {
            if let Progress::StageStart(stage) = p {
                sink.lock().unwrap().push(stage);
            }
        }));

        run(|| Ok(RecordingEngine::new()), &reference_config(), &reporter).unwrap();

        let mut expected = vec![
            Stage::Connect,
            Stage::SelectBackend,
            Stage::DeclareUnitsAndGeometry,
            Stage::LoadStructure,
        ];
        expected.extend(Stage::PER_IMPACT);
        expected.push(Stage::Release);
        assert_eq!(*seen.lock().unwrap(), expected);
    }
}
