#![allow(dead_code)]

use gorepl::imports::BuiltinFixer;
use gorepl::printer::PrinterSpec;
use gorepl::runner::{RunResult, Toolchain};
use gorepl::session::{Session, SessionBuilder};
use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub type Script = Box<dyn Fn(&str) -> RunResult>;

/// Stands in for `go run`: records each program and answers from a script.
pub struct FakeGo {
    script: Script,
    pub programs: Rc<RefCell<Vec<String>>>,
}

impl FakeGo {
    pub fn new(script: impl Fn(&str) -> RunResult + 'static) -> Self {
        Self {
            script: Box::new(script),
            programs: Rc::default(),
        }
    }
}

impl Toolchain for FakeGo {
    fn run(&self, _dir: &Path, files: &[PathBuf]) -> io::Result<RunResult> {
        let source = fs::read_to_string(&files[0])?;
        let result = (self.script)(&source);
        self.programs.borrow_mut().push(source);
        Ok(result)
    }

    fn package_dir(&self, _import_path: &str, _dir: &Path) -> io::Result<Option<PathBuf>> {
        Ok(None)
    }
}

pub fn fake_builder(fake: FakeGo) -> SessionBuilder {
    Session::builder()
        .toolchain(Box::new(fake))
        .fixer(Box::new(BuiltinFixer))
        .printer(PrinterSpec::fmt())
}

/// Prints the isolation marker followed by `tail`, as a run of the program
/// would.
pub fn answer(source: &str, tail: &str) -> RunResult {
    let start = source
        .find("\"gorepl-marker-")
        .map(|i| i + 1)
        .unwrap_or_default();
    let end = source[start..]
        .find('"')
        .map(|i| start + i)
        .unwrap_or(start);
    RunResult {
        stdout: format!("\"{}\"\n{}", &source[start..end], tail).into_bytes(),
        stderr: Vec::new(),
        exit_code: Some(0),
    }
}
