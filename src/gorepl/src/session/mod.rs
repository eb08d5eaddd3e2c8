//! The evaluation session: one growing program, recompiled and run per
//! fragment, rolled back when a run fails.

mod fragment;

pub use fragment::split_imports;

use crate::ast::visit::is_pure;
use crate::ast::{Decl, Expr, FuncDecl, ImportSpec, Stmt};
use crate::classify::{Accepted, ClassifyError, classify};
use crate::compiler::{ParseError, expr_to_string, parse_file, render_file};
use crate::imports::{BuiltinFixer, FixError, ImportFixer, ImportResolver, ImportSet};
use crate::include::{
    AuxiliaryUnit, IncludeError, UnitOrigin, UnitRegistry, adapt_unit, read_unit, resolve_package,
};
use crate::printer::{PrinterSpec, discard_call, discover, print_call, unwrap_print_call};
use crate::program::Program;
use crate::runner::{ExecutionRunner, FailureClassifier, GoToolchain, Outcome, RunResult, Toolchain};
use serde::Serialize;
use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::TempDir;
use tracing::{Dispatch, debug, info, info_span, warn};

pub const SESSION_FILE: &str = "gorepl_session.go";

#[derive(Debug)]
pub enum EvalError {
    /// Not an expression, statement or declaration. The program is unchanged.
    Parse(ParseError),
    /// Unbalanced braces; the caller should read more input.
    Continue,
    /// The build or the program failed. The program has been rolled back.
    Run {
        stdout: String,
        stderr: String,
        exit_code: Option<i32>,
    },
    Resource(io::Error),
    Fix(FixError),
    Include(IncludeError),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::Parse(e) => write!(f, "{}", e),
            EvalError::Continue => write!(f, "incomplete input"),
            EvalError::Run {
                stderr, exit_code, ..
            } => {
                let stderr = stderr.trim();
                match exit_code {
                    _ if !stderr.is_empty() => write!(f, "{}", stderr),
                    Some(code) => write!(f, "exit status {}", code),
                    None => write!(f, "killed by signal"),
                }
            }
            EvalError::Resource(e) => write!(f, "session I/O error: {}", e),
            EvalError::Fix(e) => write!(f, "{}", e),
            EvalError::Include(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for EvalError {}

impl From<ParseError> for EvalError {
    fn from(error: ParseError) -> Self {
        EvalError::Parse(error)
    }
}

impl From<ClassifyError> for EvalError {
    fn from(error: ClassifyError) -> Self {
        match error {
            ClassifyError::Continue => EvalError::Continue,
            ClassifyError::Parse(e) => EvalError::Parse(e),
        }
    }
}

impl From<FixError> for EvalError {
    fn from(error: FixError) -> Self {
        match error {
            FixError::Syntax(e) => EvalError::Parse(e),
            other => EvalError::Fix(other),
        }
    }
}

impl From<io::Error> for EvalError {
    fn from(error: io::Error) -> Self {
        EvalError::Resource(error)
    }
}

impl From<IncludeError> for EvalError {
    fn from(error: IncludeError) -> Self {
        EvalError::Include(error)
    }
}

/// What a finished evaluation produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    /// Standard output of this evaluation only when output isolation is on.
    pub output: String,
    /// Standard error of a recoverable failure, or warnings.
    pub diagnostics: String,
    /// Whether the fragment became part of the program.
    pub committed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub use_spaces: bool,
    pub quick_fix: bool,
    pub isolate_output: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            use_spaces: false,
            quick_fix: true,
            isolate_output: true,
        }
    }
}

pub struct SessionBuilder {
    toolchain: Option<Box<dyn Toolchain>>,
    fixer: Option<Box<dyn ImportFixer>>,
    printer: Option<PrinterSpec>,
    candidates: Vec<PrinterSpec>,
    recoverable_exit_codes: Vec<i32>,
    options: SessionOptions,
    dispatch: Option<Dispatch>,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self {
            toolchain: None,
            fixer: None,
            printer: None,
            candidates: PrinterSpec::defaults(),
            recoverable_exit_codes: vec![2],
            options: SessionOptions::default(),
            dispatch: None,
        }
    }

    pub fn toolchain(mut self, toolchain: Box<dyn Toolchain>) -> Self {
        self.toolchain = Some(toolchain);
        self
    }

    pub fn fixer(mut self, fixer: Box<dyn ImportFixer>) -> Self {
        self.fixer = Some(fixer);
        self
    }

    /// Use this printer instead of probing the candidates.
    pub fn printer(mut self, printer: PrinterSpec) -> Self {
        self.printer = Some(printer);
        self
    }

    pub fn printer_candidates(mut self, candidates: Vec<PrinterSpec>) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn recoverable_exit_codes(mut self, codes: Vec<i32>) -> Self {
        self.recoverable_exit_codes = codes;
        self
    }

    pub fn options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Route this session's logs to `dispatch` instead of the global default.
    pub fn dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    pub fn build(self) -> Result<Session, EvalError> {
        let dispatch = self
            .dispatch
            .unwrap_or_else(|| tracing::dispatcher::get_default(Dispatch::clone));
        tracing::dispatcher::with_default(&dispatch, || -> Result<Session, EvalError> {
            let dir = tempfile::Builder::new().prefix("gorepl-").tempdir()?;
            let toolchain = self
                .toolchain
                .unwrap_or_else(|| Box::new(GoToolchain::default()));
            let printer = match self.printer {
                Some(printer) => printer,
                None => discover(toolchain.as_ref(), &self.candidates, dir.path()),
            };
            let program = Program::new(&printer)?;
            let fixer = self.fixer.unwrap_or_else(|| Box::new(BuiltinFixer));
            let imports = ImportResolver::new(fixer);
            let runner = ExecutionRunner::new(toolchain, dir.path(), SESSION_FILE);
            runner.write_program(&program, self.options.use_spaces)?;

            info!(
                dir = %dir.path().display(),
                printer = %printer.package,
                fixer = imports.fixer_name(),
                "session started"
            );
            Ok(Session {
                dir,
                program,
                imports,
                runner,
                classifier: FailureClassifier::new(self.recoverable_exit_codes),
                units: UnitRegistry::default(),
                printer,
                options: self.options,
                dispatch: dispatch.clone(),
            })
        })
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

struct Checkpoint {
    body_len: usize,
    imports: Vec<ImportSpec>,
    import_set: ImportSet,
    units: Vec<AuxiliaryUnit>,
}

pub struct Session {
    dir: TempDir,
    program: Program,
    imports: ImportResolver,
    runner: ExecutionRunner,
    classifier: FailureClassifier,
    units: UnitRegistry,
    printer: PrinterSpec,
    options: SessionOptions,
    dispatch: Dispatch,
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Evaluate a fragment, echoing the targets of a trailing assignment.
    pub fn eval(&mut self, fragment: &str) -> Result<Evaluation, EvalError> {
        self.in_session(|session| session.eval_fragment(fragment, true))
    }

    /// Evaluate a fragment without echoing assignments.
    pub fn eval_silent(&mut self, fragment: &str) -> Result<Evaluation, EvalError> {
        self.in_session(|session| session.eval_fragment(fragment, false))
    }

    pub fn add_import(&mut self, spec: ImportSpec) -> Result<bool, EvalError> {
        self.in_session(|session| {
            let added = session.imports.add_import(&mut session.program, spec)?;
            session.persist()?;
            Ok(added)
        })
    }

    pub fn include_file(&mut self, path: &Path) -> Result<(), EvalError> {
        self.in_session(|session| {
            session.include_one(path)?;
            session.persist()
        })
    }

    /// Include every non-test file of a directory or import path.
    pub fn include_package(&mut self, target: &str) -> Result<usize, EvalError> {
        self.in_session(|session| {
            let cwd = env::current_dir()?;
            let files = resolve_package(session.runner.toolchain(), target, &cwd)?;
            for file in &files {
                session.include_one(file)?;
            }
            session.persist()?;
            Ok(files.len())
        })
    }

    /// Empty `main`; imports and units stay.
    pub fn reset(&mut self) -> Result<(), EvalError> {
        self.in_session(|session| {
            info!(statements = session.program.body_len(), "clearing session body");
            session.program.clear_body();
            session.persist()
        })
    }

    pub fn source(&self, use_spaces: bool) -> String {
        self.program.render(use_spaces)
    }

    pub fn write_source(&self, path: &Path) -> Result<(), EvalError> {
        fs::write(path, self.source(self.options.use_spaces))?;
        Ok(())
    }

    /// End the session and remove its directory.
    pub fn close(self) -> io::Result<()> {
        let dispatch = self.dispatch.clone();
        tracing::dispatcher::with_default(&dispatch, || {
            info!(dir = %self.dir.path().display(), "closing session");
            self.dir.close()
        })
    }

    pub fn body_len(&self) -> usize {
        self.program.body_len()
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn units(&self) -> &[AuxiliaryUnit] {
        self.units.units()
    }

    pub fn import_set(&self) -> &ImportSet {
        self.imports.set()
    }

    pub fn printer(&self) -> &PrinterSpec {
        &self.printer
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn session_file(&self) -> &Path {
        self.runner.session_file()
    }

    fn in_session<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let dispatch = self.dispatch.clone();
        tracing::dispatcher::with_default(&dispatch, || f(self))
    }

    fn eval_fragment(&mut self, fragment: &str, echo: bool) -> Result<Evaluation, EvalError> {
        let span = info_span!("eval", lines = fragment.lines().count());
        let _enter = span.enter();

        let checkpoint = self.checkpoint();
        let result = self.eval_checked(fragment, echo, &checkpoint);
        if let Err(e) = &result {
            debug!(error = %e, "rolling back");
            self.restore(checkpoint);
        }

        match (self.persist(), result) {
            (Err(e), Ok(_)) => Err(e),
            (Err(e), Err(original)) => {
                warn!(error = %e, "could not rewrite session file");
                Err(original)
            }
            (Ok(()), result) => result,
        }
    }

    fn eval_checked(
        &mut self,
        fragment: &str,
        echo: bool,
        checkpoint: &Checkpoint,
    ) -> Result<Evaluation, EvalError> {
        let (specs, rest) = split_imports(fragment)?;
        for spec in specs {
            self.imports.add_import(&mut self.program, spec)?;
        }

        let accepted = classify(&rest)?;
        if accepted.is_empty() {
            return Ok(Evaluation {
                committed: true,
                ..Evaluation::default()
            });
        }

        let marker = self.options.isolate_output.then(next_marker);
        if let Some(marker) = &marker {
            self.program
                .append([Stmt::Expr(print_call(vec![Expr::string_lit(marker)]))]);
        }
        for item in &accepted {
            match item {
                Accepted::Expr(expr) => {
                    self.program.append([Stmt::Expr(print_call(vec![expr.clone()]))]);
                }
                Accepted::Stmt { stmts, echo: targets } => {
                    self.program.append(with_guards(stmts));
                    if echo && !targets.is_empty() {
                        self.program.append([Stmt::Expr(print_call(targets.clone()))]);
                    }
                }
                Accepted::Decl(source) => self.declare(source)?,
            }
        }

        let mut result = self.build_and_run()?;
        let mut outcome = self.classifier.classify(&result);
        let mut valueless = Vec::new();
        if outcome != Outcome::Success
            && self.options.quick_fix
            && result.stderr_text().contains("used as value")
        {
            valueless = self.unwrap_printed_calls(checkpoint.body_len);
            if !valueless.is_empty() {
                info!(calls = valueless.len(), "retrying with printed calls unwrapped");
                result = self.build_and_run()?;
                outcome = self.classifier.classify(&result);
            }
        }

        let stdout = result.stdout_text();
        let output = isolate(&stdout, marker.as_deref());
        match outcome {
            Outcome::Success => {
                self.commit(checkpoint.body_len, &accepted, &valueless)?;
                Ok(Evaluation {
                    output,
                    diagnostics: result.stderr_text(),
                    committed: true,
                })
            }
            Outcome::Recoverable => {
                info!(exit_code = ?result.exit_code, "recoverable failure, rolling back");
                self.restore_from(checkpoint);
                Ok(Evaluation {
                    output,
                    diagnostics: result.stderr_text(),
                    committed: false,
                })
            }
            Outcome::Fatal => Err(EvalError::Run {
                stdout: output,
                stderr: result.stderr_text(),
                exit_code: result.exit_code,
            }),
        }
    }

    /// Registers a declaration fragment as an auxiliary unit.
    fn declare(&mut self, source: &str) -> Result<(), EvalError> {
        let unit = format!("package {}\n\n{}\n", self.program.package(), source);
        let fixed = self.imports.fix_source(&unit)?;
        let file = adapt_unit(parse_file(&fixed)?, self.program.package());
        let mut names = file.declared_names();
        names.extend(file.decls.iter().filter_map(|decl| match decl {
            Decl::Func(FuncDecl {
                recv: Some(recv),
                name,
                ..
            }) => Some(format!("{}.{}", expr_to_string(&recv.ty), name)),
            _ => None,
        }));
        names.sort();
        debug!(names = ?names, "declaring");
        self.units.write(
            self.dir.path(),
            UnitOrigin::Declaration(names),
            &render_file(&file, self.options.use_spaces),
        )?;
        Ok(())
    }

    fn include_one(&mut self, path: &Path) -> Result<(), EvalError> {
        info!(path = %path.display(), "including file");
        let file = read_unit(path)?;
        for spec in &file.imports {
            if let Err(e) = self.imports.add_import(&mut self.program, spec.clone()) {
                warn!(
                    path = %spec.path,
                    error = %e,
                    "could not import dependency of included file"
                );
            }
        }
        let file = adapt_unit(file, self.program.package());
        let fixed = self
            .imports
            .fix_source(&render_file(&file, self.options.use_spaces))
            .map_err(IncludeError::Fix)?;
        let origin =
            UnitOrigin::File(fs::canonicalize(path).unwrap_or_else(|_| PathBuf::from(path)));
        self.units.write(self.dir.path(), origin, &fixed)?;
        Ok(())
    }

    fn build_and_run(&mut self) -> Result<RunResult, EvalError> {
        self.imports.reconcile(&mut self.program)?;
        let units = self.units.paths();
        let result = self
            .runner
            .run(&self.program, &units, self.options.use_spaces)?;
        debug!(
            exit_code = ?result.exit_code,
            stdout = result.stdout.len(),
            stderr = result.stderr.len(),
            "run finished"
        );
        Ok(result)
    }

    /// `__gorepl_print(f())` to `f()` for everything appended since `from`.
    /// Returns the unwrapped calls as source text.
    fn unwrap_printed_calls(&mut self, from: usize) -> Vec<String> {
        let mut unwrapped = Vec::new();
        for (stmt, _) in self.program.body_mut().iter_mut().skip(from) {
            let bare = match stmt {
                Stmt::Expr(expr) => match unwrap_print_call(expr) {
                    Some(inner) if matches!(inner, Expr::Call { .. }) => inner.clone(),
                    _ => continue,
                },
                _ => continue,
            };
            unwrapped.push(expr_to_string(&bare));
            *stmt = Stmt::Expr(bare);
        }
        unwrapped
    }

    /// Replace everything appended since `from` with its cleaned form.
    /// `valueless` holds the calls the run proved have no result.
    fn commit(
        &mut self,
        from: usize,
        accepted: &[Accepted],
        valueless: &[String],
    ) -> Result<(), EvalError> {
        self.program.truncate_body(from);
        for item in accepted {
            match item {
                Accepted::Expr(expr) => {
                    if let Some(stmt) = keep_effect(expr, valueless) {
                        self.program.append([stmt]);
                    }
                }
                Accepted::Stmt { stmts, .. } => self.program.append(with_guards(stmts)),
                Accepted::Decl(_) => {}
            }
        }
        self.program.reparse_normalize()?;
        debug!(statements = self.program.body_len(), "committed");
        Ok(())
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            body_len: self.program.body_len(),
            imports: self.program.imports().to_vec(),
            import_set: self.imports.set().clone(),
            units: self.units.snapshot(),
        }
    }

    fn restore_from(&mut self, checkpoint: &Checkpoint) {
        self.program.truncate_body(checkpoint.body_len);
        self.program.set_imports(checkpoint.imports.clone());
        self.imports.restore(checkpoint.import_set.clone());
        self.units.restore(checkpoint.units.clone());
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.restore_from(&checkpoint);
    }

    fn persist(&self) -> Result<(), EvalError> {
        self.runner
            .write_program(&self.program, self.options.use_spaces)?;
        Ok(())
    }
}

/// The statements followed by `_ = name` for every name they define.
fn with_guards(stmts: &[Stmt]) -> Vec<Stmt> {
    let mut out = Vec::with_capacity(stmts.len());
    for stmt in stmts {
        out.push(stmt.clone());
        for name in stmt.defined_names() {
            out.push(Stmt::Assign {
                lhs: vec![Expr::ident("_")],
                op: "=",
                rhs: vec![Expr::ident(name)],
            });
        }
    }
    out
}

/// What remains of an evaluated expression once its value has been shown.
/// Anything with a result goes through the discard helper, which accepts
/// conversions and multi-value calls alike.
fn keep_effect(expr: &Expr, valueless: &[String]) -> Option<Stmt> {
    if is_pure(expr) {
        return None;
    }
    if valueless.contains(&expr_to_string(expr)) {
        Some(Stmt::Expr(expr.clone()))
    } else {
        Some(Stmt::Expr(discard_call(vec![expr.clone()])))
    }
}

fn next_marker() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or_default();
    format!(
        "gorepl-marker-{}-{}-{}",
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::Relaxed),
        nanos
    )
}

/// The part of `stdout` printed after the marker line.
fn isolate(stdout: &str, marker: Option<&str>) -> String {
    let Some(marker) = marker else {
        return stdout.to_string();
    };
    match stdout.find(marker) {
        Some(found) => match stdout[found..].find('\n') {
            Some(newline) => stdout[found + newline + 1..].to_string(),
            None => String::new(),
        },
        None => stdout.to_string(),
    }
}
