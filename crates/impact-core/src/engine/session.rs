use super::driver::{ComputeKind, ComputeStyle, ComputeValue, Engine};
use super::error::EngineError;
use crate::core::command::{Command, DefinitionKind, Reference, VariableFormula};
use crate::core::value::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Names the engine already knows about, as far as this session has told it.
#[derive(Debug)]
struct Registry {
    defined: HashSet<(DefinitionKind, String)>,
    potential_set: bool,
    backend_selected: bool,
    setup_started: bool,
}

impl Registry {
    fn new() -> Self {
        let mut defined = HashSet::new();
        defined.insert((DefinitionKind::Group, "all".to_string()));
        Self {
            defined,
            potential_set: false,
            backend_selected: false,
            setup_started: false,
        }
    }

    fn contains(&self, kind: DefinitionKind, id: &str) -> bool {
        self.defined.contains(&(kind, id.to_string()))
    }

    fn check(&self, command: &Command, line: &str) -> Result<(), EngineError> {
        match command {
            Command::Package(_) if self.backend_selected => {
                return Err(EngineError::BackendSelection {
                    command: line.to_string(),
                    reason: "a backend has already been selected",
                });
            }
            Command::Package(_) | Command::Suffix(_) if self.setup_started => {
                return Err(EngineError::BackendSelection {
                    command: line.to_string(),
                    reason: "the backend must be chosen before any physics command",
                });
            }
            Command::Suffix(_) if !self.backend_selected => {
                return Err(EngineError::BackendSelection {
                    command: line.to_string(),
                    reason: "a suffix requires a preceding package command",
                });
            }
            _ => {}
        }

        for reference in command.references() {
            match reference {
                Reference::Defined(kind, id) if !self.contains(kind, id) => {
                    return Err(EngineError::UndefinedReference {
                        command: line.to_string(),
                        kind,
                        id: id.to_string(),
                    });
                }
                Reference::Potential if !self.potential_set => {
                    return Err(EngineError::PotentialNotSet {
                        command: line.to_string(),
                    });
                }
                _ => {}
            }
        }

        if let Some((kind, id)) = command.defines() {
            if !kind.allows_redefinition() && self.contains(kind, id) {
                return Err(EngineError::DuplicateDefinition {
                    command: line.to_string(),
                    kind,
                    id: id.to_string(),
                });
            }
        }
        Ok(())
    }

    fn record(&mut self, command: &Command) {
        match command {
            Command::Log { .. } | Command::Print { .. } | Command::Suffix(_) => {}
            Command::Package(_) => self.backend_selected = true,
            Command::VariableDelete { name } => {
                self.defined
                    .remove(&(DefinitionKind::Variable, name.clone()));
            }
            Command::VariableEqual { .. } | Command::VariableAtom { .. } => {}
            Command::PairStyle(_) => {
                self.potential_set = true;
                self.setup_started = true;
            }
            _ => self.setup_started = true,
        }
        if let Some((kind, id)) = command.defines() {
            self.defined.insert((kind, id.to_string()));
        }
    }
}

/// Scoped ownership of one engine.
///
/// Commands go through [`Session::issue`], which checks every name a command references
/// against what this session has already defined before anything reaches the engine. The
/// engine is closed exactly once: explicitly by [`Session::finish`], or on drop when the
/// session is abandoned on an error path.
pub struct Session<E: Engine> {
    engine: Option<E>,
    registry: Registry,
    issued: usize,
}

impl<E: Engine> Session<E> {
    pub fn open(engine: E) -> Self {
        Self {
            engine: Some(engine),
            registry: Registry::new(),
            issued: 0,
        }
    }

    /// Number of commands accepted by the engine so far (runs included).
    pub fn issued(&self) -> usize {
        self.issued
    }

    pub fn is_defined(&self, kind: DefinitionKind, id: &str) -> bool {
        self.registry.contains(kind, id)
    }

    fn engine_mut(&mut self) -> Result<&mut E, EngineError> {
        self.engine.as_mut().ok_or(EngineError::Closed)
    }

    pub fn issue(&mut self, command: &Command) -> Result<(), EngineError> {
        let line = command.to_string();
        self.registry.check(command, &line)?;
        debug!(command = %line, "Issuing engine command.");

        let engine = self.engine_mut()?;
        match command {
            Command::Run { steps } => engine.run(*steps)?,
            _ => engine.command(&line)?,
        }

        self.registry.record(command);
        self.issued += 1;
        Ok(())
    }

    pub fn issue_all<'c>(
        &mut self,
        commands: impl IntoIterator<Item = &'c Command>,
    ) -> Result<(), EngineError> {
        for command in commands {
            self.issue(command)?;
        }
        Ok(())
    }

    /// Deletes any previous binding of `name`, then defines it as `value`.
    ///
    /// Always two commands, in that order. A failing delete is returned, not swallowed.
    pub fn rebind(&mut self, name: &str, value: impl Into<Value>) -> Result<(), EngineError> {
        self.issue(&Command::VariableDelete {
            name: name.to_string(),
        })?;
        self.issue(&Command::VariableEqual {
            name: name.to_string(),
            formula: VariableFormula::Value(value.into()),
        })
    }

    pub fn run(&mut self, steps: u64) -> Result<(), EngineError> {
        self.issue(&Command::Run { steps })
    }

    pub fn extract(
        &mut self,
        id: &str,
        style: ComputeStyle,
        kind: ComputeKind,
    ) -> Result<ComputeValue, EngineError> {
        if !self.registry.contains(DefinitionKind::Compute, id) {
            return Err(EngineError::UndefinedReference {
                command: format!("extract_compute {}", id),
                kind: DefinitionKind::Compute,
                id: id.to_string(),
            });
        }
        debug!(compute = id, ?style, ?kind, "Extracting compute.");
        self.engine_mut()?.extract_compute(id, style, kind)
    }

    /// Closes the engine and hands it back.
    pub fn finish(mut self) -> Result<E, EngineError> {
        let mut engine = self.engine.take().ok_or(EngineError::Closed)?;
        engine.close()?;
        Ok(engine)
    }
}

impl<E: Engine> Drop for Session<E> {
    fn drop(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            debug!("Session dropped while open; releasing engine.");
            if let Err(e) = engine.close() {
                warn!("Failed to release engine: {}", e);
            }
        }
    }
}
