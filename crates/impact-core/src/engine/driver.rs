use super::error::EngineError;

/// Which family of computed quantity to pull back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeStyle {
    Global,
    PerAtom,
    Local,
}

/// Shape of the extracted quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeKind {
    Scalar,
    Vector,
    Array,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComputeValue {
    Scalar(f64),
    /// Per-atom vectors are ordered by ascending atom id.
    Vector(Vec<f64>),
}

impl ComputeValue {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            ComputeValue::Scalar(v) => Some(*v),
            ComputeValue::Vector(_) => None,
        }
    }

    pub fn into_vector(self) -> Option<Vec<f64>> {
        match self {
            ComputeValue::Vector(v) => Some(v),
            ComputeValue::Scalar(_) => None,
        }
    }
}

/// The external simulation engine as seen by the orchestrator.
///
/// Every call blocks until the engine has finished with the request. Implementations own
/// whatever channel reaches the engine and release it in [`Engine::close`], which must be
/// safe to call more than once.
pub trait Engine {
    /// Submits one text command.
    fn command(&mut self, line: &str) -> Result<(), EngineError>;

    /// Advances the simulation by `steps` integration steps; zero flushes computes and dumps.
    fn run(&mut self, steps: u64) -> Result<(), EngineError> {
        self.command(&format!("run {}", steps))
    }

    /// Pulls a named compute's current value back into this process.
    fn extract_compute(
        &mut self,
        id: &str,
        style: ComputeStyle,
        kind: ComputeKind,
    ) -> Result<ComputeValue, EngineError>;

    fn close(&mut self) -> Result<(), EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_value_accessors_match_variant() {
        assert_eq!(ComputeValue::Scalar(2.5).as_scalar(), Some(2.5));
        assert_eq!(ComputeValue::Scalar(2.5).into_vector(), None);
        assert_eq!(
            ComputeValue::Vector(vec![1.0, 2.0]).into_vector(),
            Some(vec![1.0, 2.0])
        );
        assert_eq!(ComputeValue::Vector(vec![]).as_scalar(), None);
    }
}
