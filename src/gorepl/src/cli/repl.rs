use crate::ast::ImportSpec;
use crate::cli::errors::CliError;
use crate::compiler::CompilationUnit;
use crate::diagnostics::DiagnosticManager;
use crate::session::{EvalError, Evaluation, Session};
use rustyline::error::ReadlineError;
use std::path::PathBuf;
use tracing::warn;

const PROMPT: &str = "gorepl> ";
const CONTINUATION_PROMPT: &str = "... ";

const HELP: &str = "\
:import <path>          import a package (`:import name path` for an alias)
:include <file>         add a Go file's declarations to the session
:package <dir|path>     include every file of a package
:print                  show the current program
:write <file>           write the current program to a file
:clear                  clear the body of main, keeping imports and includes
:help                   show this help
:quit                   leave the session";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Import(ImportSpec),
    Include(PathBuf),
    Package(String),
    Print,
    Write(PathBuf),
    Clear,
    Help,
    Quit,
    /// Unknown command or missing argument, with a message.
    Invalid(String),
}

/// `None` when the line is Go source rather than a command.
pub fn parse_command(line: &str) -> Option<ReplCommand> {
    let command = line.trim().strip_prefix(':')?;
    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    Some(match (name, args.as_slice()) {
        ("import", [path]) => ReplCommand::Import(ImportSpec::new(unquote(path))),
        ("import", [alias, path]) => ReplCommand::Import(ImportSpec::named(*alias, unquote(path))),
        ("include", [file]) => ReplCommand::Include(PathBuf::from(file)),
        ("package", [target]) => ReplCommand::Package(target.to_string()),
        ("print" | "p", []) => ReplCommand::Print,
        ("write" | "w", [file]) => ReplCommand::Write(PathBuf::from(file)),
        ("clear", []) => ReplCommand::Clear,
        ("help" | "h", []) => ReplCommand::Help,
        ("quit" | "q" | "exit", []) => ReplCommand::Quit,
        ("import" | "include" | "package" | "write" | "w", _) => {
            ReplCommand::Invalid(format!("usage: see :help for :{}", name))
        }
        _ => ReplCommand::Invalid(format!("unknown command :{}", name)),
    })
}

fn unquote(path: &str) -> String {
    path.trim_matches('"').to_string()
}

/// Prints an evaluation result the way the interactive loop shows it.
pub fn show_result(
    diagnostics: &mut DiagnosticManager,
    unit: &CompilationUnit,
    result: &Result<Evaluation, EvalError>,
) {
    match result {
        Ok(evaluation) => {
            print!("{}", evaluation.output);
            if !evaluation.diagnostics.is_empty() {
                eprint!("{}", evaluation.diagnostics);
            }
        }
        Err(EvalError::Parse(error)) => {
            if let Err(e) = diagnostics.emit_parse_error(unit, error) {
                warn!(error = %e, "could not render diagnostic");
                eprintln!("{}: {}", unit.name(), error);
            }
        }
        Err(EvalError::Run { stdout, stderr, .. }) => {
            print!("{}", stdout);
            if let Err(e) = diagnostics.emit_run_failure(stderr) {
                warn!(error = %e, "could not render diagnostic");
                eprint!("{}", stderr);
            }
        }
        Err(other) => eprintln!("error: {}", other),
    }
}

pub struct Repl {
    session: Session,
    diagnostics: DiagnosticManager,
    inputs: usize,
}

impl Repl {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            diagnostics: DiagnosticManager::default(),
            inputs: 0,
        }
    }

    pub fn run(mut self) -> Result<(), CliError> {
        let mut editor = rustyline::DefaultEditor::new()?;
        let mut buffer = String::new();

        println!("gorepl {}", env!("CARGO_PKG_VERSION"));
        println!("Type :help for help, :quit to exit.\n");

        loop {
            let prompt = if buffer.is_empty() {
                PROMPT
            } else {
                CONTINUATION_PROMPT
            };
            let line = match editor.readline(prompt) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) => {
                    buffer.clear();
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(e) => return Err(e.into()),
            };

            if buffer.is_empty() {
                if let Some(command) = parse_command(&line) {
                    let _ = editor.add_history_entry(&line);
                    if !self.execute(command) {
                        break;
                    }
                    continue;
                }
            }

            buffer.push_str(&line);
            buffer.push('\n');
            match self.session.eval(&buffer) {
                Err(EvalError::Continue) => continue,
                result => {
                    let _ = editor.add_history_entry(buffer.trim_end());
                    self.inputs += 1;
                    let unit =
                        CompilationUnit::new(format!("<input {}>", self.inputs), buffer.clone());
                    show_result(&mut self.diagnostics, &unit, &result);
                    buffer.clear();
                }
            }
        }

        self.session.close()?;
        Ok(())
    }

    /// Returns `false` when the session should end.
    fn execute(&mut self, command: ReplCommand) -> bool {
        let result = match command {
            ReplCommand::Import(spec) => self.session.add_import(spec).map(|_| ()),
            ReplCommand::Include(path) => self.session.include_file(&path),
            ReplCommand::Package(target) => self
                .session
                .include_package(&target)
                .map(|count| println!("included {} files", count)),
            ReplCommand::Print => {
                print!("{}", self.session.source(false));
                Ok(())
            }
            ReplCommand::Write(path) => self.session.write_source(&path),
            ReplCommand::Clear => self.session.reset(),
            ReplCommand::Help => {
                println!("{}", HELP);
                Ok(())
            }
            ReplCommand::Quit => return false,
            ReplCommand::Invalid(message) => {
                eprintln!("{}", message);
                Ok(())
            }
        };
        if let Err(e) = result {
            eprintln!("error: {}", e);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(":import strings", ReplCommand::Import(ImportSpec::new("strings")))]
    #[case(":import \"encoding/json\"", ReplCommand::Import(ImportSpec::new("encoding/json")))]
    #[case(":import str strings", ReplCommand::Import(ImportSpec::named("str", "strings")))]
    #[case(":include helper.go", ReplCommand::Include(PathBuf::from("helper.go")))]
    #[case(":package ./util", ReplCommand::Package("./util".to_string()))]
    #[case(" :print", ReplCommand::Print)]
    #[case(":w out.go", ReplCommand::Write(PathBuf::from("out.go")))]
    #[case(":clear", ReplCommand::Clear)]
    #[case(":help", ReplCommand::Help)]
    #[case(":q", ReplCommand::Quit)]
    fn parses_commands(#[case] line: &str, #[case] expected: ReplCommand) {
        assert_eq!(parse_command(line), Some(expected));
    }

    #[test]
    fn rejects_bad_commands() {
        assert!(matches!(
            parse_command(":frobnicate"),
            Some(ReplCommand::Invalid(m)) if m.contains("unknown")
        ));
        assert!(matches!(parse_command(":include"), Some(ReplCommand::Invalid(_))));
    }

    #[test]
    fn go_source_is_not_a_command() {
        assert_eq!(parse_command("x := 1"), None);
        assert_eq!(parse_command("m[\"a\"]"), None);
    }
}
