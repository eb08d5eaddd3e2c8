//! Auxiliary compilation units: included files and declaration fragments.
//!
//! A unit is a Go file in the session directory that is passed to every
//! build next to the session file. It shares the session's package and never
//! declares `main`.

use crate::ast::File;
use crate::compiler::{CompilationUnit, ParseError, parse_file};
use crate::imports::FixError;
use crate::program::ENTRY_POINT;
use crate::runner::Toolchain;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const UNIT_PREFIX: &str = "gorepl_unit_";

#[derive(Debug)]
pub enum IncludeError {
    Io { path: PathBuf, source: io::Error },
    Parse { unit: CompilationUnit, error: ParseError },
    Fix(FixError),
    NotFound(String),
}

impl fmt::Display for IncludeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncludeError::Io { path, source } => {
                write!(f, "cannot read {}: {}", path.display(), source)
            }
            IncludeError::Parse { unit, error } => write!(f, "{}:{}", unit.name(), error),
            IncludeError::Fix(e) => write!(f, "{}", e),
            IncludeError::NotFound(target) => write!(f, "package {} not found", target),
        }
    }
}

impl std::error::Error for IncludeError {}

impl From<FixError> for IncludeError {
    fn from(error: FixError) -> Self {
        IncludeError::Fix(error)
    }
}

/// Where a unit came from; a new unit with the same origin replaces the old.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOrigin {
    File(PathBuf),
    /// Sorted names declared by a fragment.
    Declaration(Vec<String>),
}

impl fmt::Display for UnitOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitOrigin::File(path) => write!(f, "{}", path.display()),
            UnitOrigin::Declaration(names) => write!(f, "declaration of {}", names.join(", ")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxiliaryUnit {
    pub path: PathBuf,
    pub origin: UnitOrigin,
}

#[derive(Debug, Default)]
pub struct UnitRegistry {
    units: Vec<AuxiliaryUnit>,
    next_id: usize,
}

impl UnitRegistry {
    /// Writes `source` under a fresh file name in `dir` and registers it.
    pub fn write(
        &mut self,
        dir: &Path,
        origin: UnitOrigin,
        source: &str,
    ) -> io::Result<&AuxiliaryUnit> {
        let path = dir.join(format!("{}{}.go", UNIT_PREFIX, self.next_id));
        self.next_id += 1;
        fs::write(&path, source)?;

        let before = self.units.len();
        self.units.retain(|unit| unit.origin != origin);
        if self.units.len() != before {
            debug!(%origin, "replacing auxiliary unit");
        }
        self.units.push(AuxiliaryUnit { path, origin });
        Ok(&self.units[self.units.len() - 1])
    }

    pub fn units(&self) -> &[AuxiliaryUnit] {
        &self.units
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.units.iter().map(|unit| unit.path.clone()).collect()
    }

    pub fn snapshot(&self) -> Vec<AuxiliaryUnit> {
        self.units.clone()
    }

    /// Puts back a snapshot; file names already handed out stay used.
    pub fn restore(&mut self, units: Vec<AuxiliaryUnit>) {
        self.units = units;
    }
}

/// Reads and parses a Go file to include.
pub fn read_unit(path: &Path) -> Result<File, IncludeError> {
    let source = fs::read_to_string(path).map_err(|source| IncludeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let unit = CompilationUnit::new(path.display().to_string(), source);
    parse_file(unit.source()).map_err(|error| IncludeError::Parse { unit, error })
}

/// Moves a file into the session's package and drops its entry point.
pub fn adapt_unit(mut file: File, package: &str) -> File {
    file.package = package.to_string();
    if file.remove_func(ENTRY_POINT) {
        debug!("dropped func main from included unit");
    }
    file
}

/// Non-test Go files of a package directory, sorted.
pub fn package_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if path.is_file() && name.ends_with(".go") && !name.ends_with("_test.go") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// A directory is taken as is; anything else is resolved as an import path.
pub fn resolve_package(
    toolchain: &dyn Toolchain,
    target: &str,
    cwd: &Path,
) -> Result<Vec<PathBuf>, IncludeError> {
    let as_dir = Path::new(target);
    let dir = if as_dir.is_dir() {
        as_dir.to_path_buf()
    } else {
        toolchain
            .package_dir(target, cwd)
            .map_err(|source| IncludeError::Io {
                path: PathBuf::from(target),
                source,
            })?
            .ok_or_else(|| IncludeError::NotFound(target.to_string()))?
    };
    package_files(&dir).map_err(|source| IncludeError::Io { path: dir, source })
}
