/// Named steps of the impact workflow, in the order they execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Connect,
    SelectBackend,
    DeclareUnitsAndGeometry,
    LoadStructure,
    DefineRunVariables,
    CreateProjectile,
    DefineRegionsAndPotential,
    DefineGroups,
    AttachIntegratorAndDump,
    RunDynamics,
    RecomputeClusterMembership,
    ComputeClustering,
    DumpClusterData,
    RunZeroStepFlush,
    ExtractResult,
    Release,
}

impl Stage {
    /// Stages repeated for every impact run.
    pub const PER_IMPACT: [Stage; 11] = [
        Stage::DefineRunVariables,
        Stage::CreateProjectile,
        Stage::DefineRegionsAndPotential,
        Stage::DefineGroups,
        Stage::AttachIntegratorAndDump,
        Stage::RunDynamics,
        Stage::RecomputeClusterMembership,
        Stage::ComputeClustering,
        Stage::DumpClusterData,
        Stage::RunZeroStepFlush,
        Stage::ExtractResult,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Stage::Connect => "Connecting to engine",
            Stage::SelectBackend => "Selecting backend",
            Stage::DeclareUnitsAndGeometry => "Declaring units and geometry",
            Stage::LoadStructure => "Loading structure",
            Stage::DefineRunVariables => "Defining run variables",
            Stage::CreateProjectile => "Creating projectile",
            Stage::DefineRegionsAndPotential => "Defining regions and potential",
            Stage::DefineGroups => "Defining groups",
            Stage::AttachIntegratorAndDump => "Attaching integrator and dump",
            Stage::RunDynamics => "Running dynamics",
            Stage::RecomputeClusterMembership => "Recomputing cluster membership",
            Stage::ComputeClustering => "Computing clusters",
            Stage::DumpClusterData => "Dumping cluster data",
            Stage::RunZeroStepFlush => "Flushing computes",
            Stage::ExtractResult => "Extracting result",
            Stage::Release => "Releasing engine",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Progress {
    ImpactStart { run: usize, total: usize },
    StageStart(Stage),
    StageFinish(Stage),
    ImpactFinish { run: usize },

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}
