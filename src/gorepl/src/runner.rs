use crate::program::Program;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunResult {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
}

impl RunResult {
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// The external build-and-run step.
pub trait Toolchain {
    /// Build and run the given files as one program, with `dir` as the
    /// working directory. Stdin is inherited.
    fn run(&self, dir: &Path, files: &[PathBuf]) -> io::Result<RunResult>;

    /// Source directory of an importable package, or `None` if it cannot be
    /// resolved.
    fn package_dir(&self, import_path: &str, dir: &Path) -> io::Result<Option<PathBuf>>;
}

/// The `go` command.
#[derive(Debug, Clone)]
pub struct GoToolchain {
    go: PathBuf,
    run_args: Vec<String>,
}

impl GoToolchain {
    pub fn new(go: impl Into<PathBuf>, run_args: Vec<String>) -> Self {
        Self {
            go: go.into(),
            run_args,
        }
    }

    pub fn binary(&self) -> &Path {
        &self.go
    }
}

impl Default for GoToolchain {
    fn default() -> Self {
        Self::new("go", Vec::new())
    }
}

impl Toolchain for GoToolchain {
    fn run(&self, dir: &Path, files: &[PathBuf]) -> io::Result<RunResult> {
        debug!(go = %self.go.display(), files = files.len(), "go run");
        let output = Command::new(&self.go)
            .arg("run")
            .args(&self.run_args)
            .args(files)
            .current_dir(dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;
        Ok(RunResult {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.status.code(),
        })
    }

    fn package_dir(&self, import_path: &str, dir: &Path) -> io::Result<Option<PathBuf>> {
        let output = Command::new(&self.go)
            .args(["list", "-f", "{{.Dir}}", import_path])
            .current_dir(dir)
            .stdin(Stdio::null())
            .output()?;
        if !output.status.success() {
            debug!(
                package = import_path,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "go list failed"
            );
            return Ok(None);
        }
        let found = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!found.is_empty()).then(|| PathBuf::from(found)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Recoverable,
    Fatal,
}

/// Decides what a finished run means for the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureClassifier {
    recoverable: Vec<i32>,
}

impl FailureClassifier {
    pub fn new(recoverable: Vec<i32>) -> Self {
        Self { recoverable }
    }

    pub fn classify(&self, result: &RunResult) -> Outcome {
        match result.exit_code {
            Some(0) if result.stderr.is_empty() => Outcome::Success,
            Some(code) if self.recoverable.contains(&code) => Outcome::Recoverable,
            _ => Outcome::Fatal,
        }
    }
}

impl Default for FailureClassifier {
    fn default() -> Self {
        Self::new(vec![2])
    }
}

/// Writes the program into the session file and runs it together with the
/// auxiliary unit files.
pub struct ExecutionRunner {
    toolchain: Box<dyn Toolchain>,
    dir: PathBuf,
    session_file: PathBuf,
}

impl ExecutionRunner {
    pub fn new(toolchain: Box<dyn Toolchain>, dir: &Path, session_file: &str) -> Self {
        Self {
            toolchain,
            dir: dir.to_path_buf(),
            session_file: dir.join(session_file),
        }
    }

    pub fn session_file(&self) -> &Path {
        &self.session_file
    }

    pub fn toolchain(&self) -> &dyn Toolchain {
        self.toolchain.as_ref()
    }

    pub fn write_program(&self, program: &Program, use_spaces: bool) -> io::Result<()> {
        fs::write(&self.session_file, program.render(use_spaces))
    }

    pub fn run(
        &self,
        program: &Program,
        units: &[PathBuf],
        use_spaces: bool,
    ) -> io::Result<RunResult> {
        self.write_program(program, use_spaces)?;
        let mut files = Vec::with_capacity(units.len() + 1);
        files.push(self.session_file.clone());
        files.extend(units.iter().cloned());
        self.toolchain.run(&self.dir, &files)
    }
}

/// Looks an executable up on `PATH`, honouring `PATHEXT` on Windows.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    match which::which(name) {
        Ok(path) => Some(path),
        Err(e) => {
            debug!(name, error = %e, "executable not found");
            None
        }
    }
}
