use super::driver::{ComputeKind, ComputeStyle};
use crate::core::command::DefinitionKind;
use crate::core::io::dump::DumpError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to launch engine '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Engine I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Engine exited unexpectedly while processing '{command}'")]
    Disconnected { command: String },

    #[error("Engine rejected '{command}': {message}")]
    CommandRejected { command: String, message: String },

    #[error("'{command}' references undefined {kind} '{id}'")]
    UndefinedReference {
        command: String,
        kind: DefinitionKind,
        id: String,
    },

    #[error("'{command}' redefines existing {kind} '{id}'")]
    DuplicateDefinition {
        command: String,
        kind: DefinitionKind,
        id: String,
    },

    #[error("'{command}' requires an interatomic potential, but no pair style is set")]
    PotentialNotSet { command: String },

    #[error("Backend selection '{command}' rejected: {reason}")]
    BackendSelection {
        command: String,
        reason: &'static str,
    },

    #[error("Extracting compute '{id}' as {style:?}/{kind:?} is not supported by this engine")]
    UnsupportedExtraction {
        id: String,
        style: ComputeStyle,
        kind: ComputeKind,
    },

    #[error("Extraction of compute '{id}' failed: {message}")]
    Extraction { id: String, message: String },

    #[error("Failed to read extracted values: {0}")]
    Dump(#[from] DumpError),

    #[error("Engine session is already closed")]
    Closed,
}
