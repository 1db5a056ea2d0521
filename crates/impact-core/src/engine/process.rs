use super::config::ExecutionConfig;
use super::driver::{ComputeKind, ComputeStyle, ComputeValue, Engine};
use super::error::EngineError;
use crate::core::command::Command;
use crate::core::io::dump::DumpFile;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command as ProcessCommand, Stdio};
use tracing::{debug, info, trace, warn};

const MARKER: &str = "@@impactmd";
/// `-nonbuf`: screen output must reach the pipe line by line.
const LMP_ARGS: [&str; 6] = ["-echo", "none", "-log", "none", "-nocite", "-nonbuf"];

/// A LAMMPS executable driven over its standard input.
///
/// After each command a `print` of a sequence-numbered marker is sent, and stdout is read
/// until that marker comes back. This makes every call block until the engine has
/// finished, and any `ERROR` line seen in between fails the command.
pub struct ProcessEngine {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    scratch_dir: PathBuf,
    sequence: u64,
    closed: bool,
}

impl ProcessEngine {
    /// Starts the engine. Extraction files are written below `scratch_dir`.
    pub fn launch(execution: &ExecutionConfig, scratch_dir: &Path) -> Result<Self, EngineError> {
        let mut command = launch_command(execution);
        let program = command.get_program().to_string_lossy().into_owned();
        info!(
            program = %program,
            cores = execution.mpi_cores,
            "Launching simulation engine."
        );

        let mut child = command.spawn().map_err(|source| EngineError::Launch {
            program: program.clone(),
            source,
        })?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take().ok_or_else(|| EngineError::Launch {
            program,
            source: std::io::Error::other("engine stdout was not captured"),
        })?;

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            scratch_dir: scratch_dir.to_path_buf(),
            sequence: 0,
            closed: false,
        })
    }

    fn send(&mut self, line: &str) -> Result<(), EngineError> {
        let stdin = self.stdin.as_mut().ok_or(EngineError::Closed)?;
        writeln!(stdin, "{}", line)?;
        stdin.flush()?;
        Ok(())
    }

    /// Waits for the engine to finish everything sent so far and returns any value payloads
    /// printed in the meantime.
    fn synchronize(&mut self, command: &str) -> Result<Vec<String>, EngineError> {
        self.sequence += 1;
        let ack = format!("{} ack {}", MARKER, self.sequence);
        let value_prefix = format!("{} value ", MARKER);
        // The engine may already be gone after a bad command; its last words are still on stdout.
        let request = Command::Print { text: ack.clone() }.to_string();
        match self.send(&request) {
            Err(EngineError::Io(e)) => debug!("Acknowledgement request not delivered: {}", e),
            other => other?,
        }

        let mut payload = Vec::new();
        let mut buf = String::new();
        loop {
            buf.clear();
            if self.stdout.read_line(&mut buf)? == 0 {
                return Err(EngineError::Disconnected {
                    command: command.to_string(),
                });
            }
            let line = buf.trim_end();
            if line == ack {
                return Ok(payload);
            } else if let Some(value) = line.strip_prefix(value_prefix.as_str()) {
                payload.push(value.to_string());
            } else if line.starts_with("ERROR") {
                return Err(EngineError::CommandRejected {
                    command: command.to_string(),
                    message: line.to_string(),
                });
            } else if line.starts_with("WARNING") {
                warn!(target: "lammps", "{}", line);
            } else if !line.is_empty() {
                trace!(target: "lammps", "{}", line);
            }
        }
    }

    fn extract_scalar(&mut self, id: &str) -> Result<ComputeValue, EngineError> {
        let request = Command::Print {
            text: format!("{} value $(c_{})", MARKER, id),
        }
        .to_string();
        self.send(&request)?;
        let payload = self.synchronize(&request)?;
        let raw = payload.first().ok_or_else(|| EngineError::Extraction {
            id: id.to_string(),
            message: "engine printed no value".to_string(),
        })?;
        raw.trim()
            .parse::<f64>()
            .map(ComputeValue::Scalar)
            .map_err(|_| EngineError::Extraction {
                id: id.to_string(),
                message: format!("'{}' is not a number", raw),
            })
    }

    fn extract_per_atom(&mut self, id: &str) -> Result<ComputeValue, EngineError> {
        let column = format!("c_{}", id);
        let path = self.scratch_dir.join(format!("extract.{}.dump", id));
        let request = Command::WriteDump {
            group: "all".to_string(),
            path: path.clone(),
            columns: vec!["id".to_string(), column.clone()],
        };
        let written = self.command(&request.to_string());

        let values = written.and_then(|_| read_extracted_column(&path, &column, id));
        if let Err(e) = std::fs::remove_file(&path) {
            debug!("Could not remove extraction file {:?}: {}", path, e);
        }
        values.map(ComputeValue::Vector)
    }
}

fn read_extracted_column(path: &Path, column: &str, id: &str) -> Result<Vec<f64>, EngineError> {
    let snapshots = DumpFile::read_from_path(path)?;
    let snapshot = snapshots.last().ok_or_else(|| EngineError::Extraction {
        id: id.to_string(),
        message: format!("{} contains no snapshot", path.display()),
    })?;
    Ok(snapshot.column(column)?)
}

fn launch_command(execution: &ExecutionConfig) -> ProcessCommand {
    let mut command = if execution.mpi_cores > 1 {
        let mut c = ProcessCommand::new(&execution.mpirun);
        c.arg("-np")
            .arg(execution.mpi_cores.to_string())
            .arg(&execution.lmp_executable);
        c
    } else {
        ProcessCommand::new(&execution.lmp_executable)
    };
    command
        .args(LMP_ARGS)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit());
    command
}

impl Engine for ProcessEngine {
    fn command(&mut self, line: &str) -> Result<(), EngineError> {
        self.send(line)?;
        self.synchronize(line)?;
        Ok(())
    }

    fn extract_compute(
        &mut self,
        id: &str,
        style: ComputeStyle,
        kind: ComputeKind,
    ) -> Result<ComputeValue, EngineError> {
        match (style, kind) {
            (ComputeStyle::Global, ComputeKind::Scalar) => self.extract_scalar(id),
            (ComputeStyle::PerAtom, ComputeKind::Vector) => self.extract_per_atom(id),
            _ => Err(EngineError::UnsupportedExtraction {
                id: id.to_string(),
                style,
                kind,
            }),
        }
    }

    fn close(&mut self) -> Result<(), EngineError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if let Some(mut stdin) = self.stdin.take() {
            if let Err(e) = writeln!(stdin, "quit").and_then(|_| stdin.flush()) {
                debug!("Engine input already closed: {}", e);
            }
        }
        let status = self.child.wait()?;
        if status.success() {
            info!("Simulation engine exited cleanly.");
        } else {
            warn!("Simulation engine exited with {}.", status);
        }
        Ok(())
    }
}

impl Drop for ProcessEngine {
    fn drop(&mut self) {
        if !self.closed {
            self.stdin.take();
            if let Err(e) = self.child.kill() {
                debug!("Engine process already gone: {}", e);
            }
            let _ = self.child.wait();
        }
    }
}
