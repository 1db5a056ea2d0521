use super::driver::{ComputeKind, ComputeStyle, ComputeValue, Engine};
use super::error::EngineError;
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
enum Entry {
    Command(String),
    Extraction {
        id: String,
        style: ComputeStyle,
        kind: ComputeKind,
    },
}

/// An engine that performs nothing and remembers everything.
///
/// Used to export the command deck as a script and to observe workflows in tests.
/// Extractions return a registered value when one exists; otherwise an empty vector for
/// per-atom vectors and zero for global scalars, as a dry run has nothing to report.
#[derive(Debug, Default)]
pub struct RecordingEngine {
    entries: Vec<Entry>,
    computes: HashMap<String, ComputeValue>,
    rejections: Vec<(String, String)>,
    closes: usize,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers extractions of `id` with `value`.
    pub fn with_compute(mut self, id: &str, value: ComputeValue) -> Self {
        self.computes.insert(id.to_string(), value);
        self
    }

    /// Fails any command starting with `prefix`, as the engine would on a bad directive.
    pub fn rejecting(mut self, prefix: &str, message: &str) -> Self {
        self.rejections
            .push((prefix.to_string(), message.to_string()));
        self
    }

    /// Every command line received, runs included, in order.
    pub fn commands(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                Entry::Command(line) => Some(line.as_str()),
                Entry::Extraction { .. } => None,
            })
            .collect()
    }

    /// Commands plus a comment line marking each extraction point.
    pub fn script_lines(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| match e {
                Entry::Command(line) => line.clone(),
                Entry::Extraction { id, style, kind } => {
                    format!("# extract compute {} ({:?}, {:?})", id, style, kind)
                }
            })
            .collect()
    }

    pub fn close_count(&self) -> usize {
        self.closes
    }
}

impl Engine for RecordingEngine {
    fn command(&mut self, line: &str) -> Result<(), EngineError> {
        if let Some((_, message)) = self
            .rejections
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
        {
            return Err(EngineError::CommandRejected {
                command: line.to_string(),
                message: message.clone(),
            });
        }
        self.entries.push(Entry::Command(line.to_string()));
        Ok(())
    }

    fn extract_compute(
        &mut self,
        id: &str,
        style: ComputeStyle,
        kind: ComputeKind,
    ) -> Result<ComputeValue, EngineError> {
        self.entries.push(Entry::Extraction {
            id: id.to_string(),
            style,
            kind,
        });
        if let Some(value) = self.computes.get(id) {
            return Ok(value.clone());
        }
        match (style, kind) {
            (ComputeStyle::PerAtom, ComputeKind::Vector) => {
                warn!("No recorded value for compute '{}'; returning an empty vector.", id);
                Ok(ComputeValue::Vector(Vec::new()))
            }
            (ComputeStyle::Global, ComputeKind::Scalar) => {
                warn!("No recorded value for compute '{}'; returning zero.", id);
                Ok(ComputeValue::Scalar(0.0))
            }
            _ => Err(EngineError::UnsupportedExtraction {
                id: id.to_string(),
                style,
                kind,
            }),
        }
    }

    fn close(&mut self) -> Result<(), EngineError> {
        self.closes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_commands_and_default_run() {
        let mut engine = RecordingEngine::new();
        engine.command("units metal").unwrap();
        engine.run(200).unwrap();
        assert_eq!(engine.commands(), vec!["units metal", "run 200"]);
    }

    #[test]
    fn rejection_prefix_fails_matching_commands_only() {
        let mut engine = RecordingEngine::new().rejecting("read_data", "ERROR: Cannot open file");
        engine.command("units metal").unwrap();
        let err = engine.command("read_data missing.data").unwrap_err();
        assert!(matches!(
            err,
            EngineError::CommandRejected { ref message, .. } if message == "ERROR: Cannot open file"
        ));
        assert_eq!(engine.commands(), vec!["units metal"]);
    }

    #[test]
    fn extraction_uses_registered_value_or_dry_run_default() {
        let mut engine =
            RecordingEngine::new().with_compute("clusters", ComputeValue::Vector(vec![0.0, 3.0]));
        assert_eq!(
            engine
                .extract_compute("clusters", ComputeStyle::PerAtom, ComputeKind::Vector)
                .unwrap(),
            ComputeValue::Vector(vec![0.0, 3.0])
        );
        assert_eq!(
            engine
                .extract_compute("ke", ComputeStyle::Global, ComputeKind::Scalar)
                .unwrap(),
            ComputeValue::Scalar(0.0)
        );
        assert!(matches!(
            engine.extract_compute("stress", ComputeStyle::Local, ComputeKind::Array),
            Err(EngineError::UnsupportedExtraction { .. })
        ));
    }

    #[test]
    fn script_lines_mark_extractions() {
        let mut engine = RecordingEngine::new();
        engine.command("run 0").unwrap();
        engine
            .extract_compute("clusters", ComputeStyle::PerAtom, ComputeKind::Vector)
            .unwrap();
        assert_eq!(
            engine.script_lines(),
            vec![
                "run 0".to_string(),
                "# extract compute clusters (PerAtom, Vector)".to_string(),
            ]
        );
        assert_eq!(engine.commands(), vec!["run 0"]);
    }
}
