use crate::cli::config::{Config, Mode, ProgramSource};
use crate::cli::errors::CliError;
use crate::cli::repl::{Repl, show_result};
use crate::compiler::CompilationUnit;
use crate::diagnostics::DiagnosticManager;
use crate::session::{EvalError, Evaluation, Session};
use serde_json::{Value, json};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use tracing::info;

pub struct App;

impl App {
    pub fn run(config: Config) -> Result<(), CliError> {
        info!("{}", config.describe_source());
        let mut session = config.session_builder().build()?;

        match config.mode {
            Mode::Repl { includes, packages } => {
                for path in &includes {
                    session.include_file(path)?;
                }
                for target in &packages {
                    session.include_package(target)?;
                }
                Repl::new(session).run()
            }
            Mode::Eval {
                source,
                includes,
                json,
            } => Self::run_eval(session, source, &includes, json),
        }
    }

    fn run_eval(
        mut session: Session,
        source: ProgramSource,
        includes: &[PathBuf],
        json: bool,
    ) -> Result<(), CliError> {
        let unit = Self::load_source(source)?;
        for path in includes {
            session.include_file(path)?;
        }

        let result = session.eval(unit.source());
        if json {
            println!("{}", Self::to_json(&result));
        } else {
            show_result(&mut DiagnosticManager::default(), &unit, &result);
        }
        session.close()?;

        match result {
            Ok(_) => Ok(()),
            Err(_) => Err(CliError::Reported),
        }
    }

    fn load_source(source: ProgramSource) -> Result<CompilationUnit, CliError> {
        Ok(match source {
            ProgramSource::File(path) => {
                let content = fs::read_to_string(&path)?;
                CompilationUnit::new(path.display().to_string(), content)
            }
            ProgramSource::Inline(code) => CompilationUnit::from_string(code),
            ProgramSource::Stdin => {
                let mut content = String::new();
                io::stdin().read_to_string(&mut content)?;
                CompilationUnit::new("<stdin>".to_string(), content)
            }
        })
    }

    pub fn to_json(result: &Result<Evaluation, EvalError>) -> Value {
        match result {
            Ok(evaluation) => json!({
                "ok": true,
                "output": evaluation.output,
                "diagnostics": evaluation.diagnostics,
                "committed": evaluation.committed,
            }),
            Err(EvalError::Parse(error)) => json!({
                "ok": false,
                "error": "parse",
                "message": error.message,
                "line": error.line,
                "column": error.column,
            }),
            Err(EvalError::Run {
                stdout,
                stderr,
                exit_code,
            }) => json!({
                "ok": false,
                "error": "run",
                "output": stdout,
                "stderr": stderr,
                "exit_code": exit_code,
            }),
            Err(other) => json!({
                "ok": false,
                "error": match other {
                    EvalError::Continue => "incomplete",
                    EvalError::Resource(_) => "resource",
                    EvalError::Fix(_) => "import_fixer",
                    EvalError::Include(_) => "include",
                    EvalError::Parse(_) | EvalError::Run { .. } => "error",
                },
                "message": other.to_string(),
            }),
        }
    }
}
