//! Generator backed by an external program.
//!
//! Each call stages the configured files into a fresh scratch directory,
//! runs the program there and collects the files it leaves behind.

use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use artipub_core::errors::{ExError, ExErrorKind, Result};
use artipub_core::generator::ArtifactGenerator;
use artipub_core::model::ArtifactSet;

use super::{collect_tree, generator_error};

/// Environment variable naming the directory the program should write to
pub const OUTPUT_DIR_ENV: &str = "ARTIPUB_OUTPUT_DIR";

/// Bytes of stderr kept in a failure message
const STDERR_TAIL_BYTES: u64 = 2048;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

const OP: &str = "run_generator_command";

#[derive(Debug, Clone)]
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
    stage: Vec<PathBuf>,
    include: Vec<String>,
    env: Vec<(String, String)>,
    timeout: Option<Duration>,
}

impl CommandGenerator {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stage: Vec::new(),
            include: Vec::new(),
            env: Vec::new(),
            timeout: None,
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Files copied into the working directory before the program runs.
    ///
    /// Staged files are never collected as artifacts.
    pub fn with_stage(mut self, stage: Vec<PathBuf>) -> Self {
        self.stage = stage;
        self
    }

    pub fn with_include(mut self, include: Vec<String>) -> Self {
        self.include = include;
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Kill the program if it runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Program path as the child will see it.
    ///
    /// A relative path with a separator is taken relative to our working
    /// directory, since the child runs elsewhere.
    fn resolved_program(&self) -> Result<PathBuf> {
        let program = Path::new(&self.program);
        if program.is_relative() && program.components().count() > 1 {
            let cwd = std::env::current_dir().map_err(|e| {
                generator_error(OP, format!("Failed to resolve working directory: {}", e))
            })?;
            return Ok(cwd.join(program));
        }
        Ok(program.to_path_buf())
    }

    fn stage_files(&self, workdir: &Path) -> Result<Vec<String>> {
        let mut staged = Vec::with_capacity(self.stage.len());
        for source in &self.stage {
            let file_name = source.file_name().ok_or_else(|| {
                generator_error(OP, "Staged path has no file name")
                    .with_entity_id(source.display().to_string())
            })?;
            fs::copy(source, workdir.join(file_name)).map_err(|e| {
                generator_error(OP, format!("Failed to stage file: {}", e))
                    .with_entity_id(source.display().to_string())
            })?;
            staged.push(file_name.to_string_lossy().into_owned());
        }
        Ok(staged)
    }

    fn wait(&self, child: &mut std::process::Child) -> Result<ExitStatus> {
        let deadline = self.timeout.and_then(|t| Instant::now().checked_add(t));
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {}
                Err(e) => {
                    return Err(generator_error(OP, format!("Failed to wait for program: {}", e))
                        .with_entity_id(self.program.clone()))
                }
            }

            if deadline.is_some_and(|d| Instant::now() >= d) {
                let _ = child.kill();
                let _ = child.wait();
                let timeout_ms = self.timeout.map(|t| t.as_millis()).unwrap_or_default();
                tracing::warn!(
                    program = %self.program,
                    timeout_ms = timeout_ms as u64,
                    "Generator program killed at deadline"
                );
                return Err(ExError::new(ExErrorKind::GeneratorTimeout)
                    .with_op(OP)
                    .with_entity_id(self.program.clone())
                    .with_message(format!("Program did not exit within {} ms", timeout_ms)));
            }

            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl ArtifactGenerator for CommandGenerator {
    fn generate(&self) -> Result<ArtifactSet> {
        let scratch = tempfile::Builder::new()
            .prefix("artipub-gen-")
            .tempdir()
            .map_err(|e| {
                generator_error(OP, format!("Failed to create scratch directory: {}", e))
            })?;
        let workdir = scratch.path().join("work");
        fs::create_dir(&workdir)
            .map_err(|e| {
                generator_error(OP, format!("Failed to create working directory: {}", e))
            })?;

        let staged = self.stage_files(&workdir)?;

        let stdout_path = scratch.path().join("stdout.log");
        let stderr_path = scratch.path().join("stderr.log");
        let stdout = File::create(&stdout_path)
            .map_err(|e| generator_error(OP, format!("Failed to create stdout log: {}", e)))?;
        let stderr = File::create(&stderr_path)
            .map_err(|e| generator_error(OP, format!("Failed to create stderr log: {}", e)))?;

        let program = self.resolved_program()?;
        tracing::debug!(
            program = %program.display(),
            args = ?self.args,
            "Starting generator program"
        );

        let mut command = Command::new(&program);
        command
            .args(&self.args)
            .current_dir(&workdir)
            .env(OUTPUT_DIR_ENV, &workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));
        for (key, value) in &self.env {
            command.env(key, value);
        }

        let mut child = command.spawn().map_err(|e| {
            generator_error(OP, format!("Failed to start program: {}", e))
                .with_entity_id(self.program.clone())
        })?;
        let status = self.wait(&mut child)?;

        if !status.success() {
            let tail = read_tail(&stderr_path, STDERR_TAIL_BYTES);
            return Err(generator_error(
                OP,
                format!("Program exited with {}; stderr: {}", status, tail.trim()),
            )
            .with_entity_id(self.program.clone()));
        }

        collect_tree(&workdir, &self.include, &staged)
    }

    fn describe(&self) -> String {
        if self.args.is_empty() {
            format!("command({})", self.program)
        } else {
            format!("command({} {})", self.program, self.args.join(" "))
        }
    }
}

/// Last `max` bytes of a file, lossily decoded; empty if unreadable
fn read_tail(path: &Path, max: u64) -> String {
    let Ok(mut file) = File::open(path) else {
        return String::new();
    };
    let len = file.metadata().map(|m| m.len()).unwrap_or(0);
    if len > max && file.seek(SeekFrom::Start(len - max)).is_err() {
        return String::new();
    }
    let mut buf = Vec::new();
    if file.read_to_end(&mut buf).is_err() {
        return String::new();
    }
    String::from_utf8_lossy(&buf).into_owned()
}
