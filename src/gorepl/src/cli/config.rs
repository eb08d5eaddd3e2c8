use crate::cli::args::{Args, Command, EvalArgs, FileConfig, ReplArgs};
use crate::cli::errors::CliError;
use crate::imports::{FixerChoice, select_fixer};
use crate::printer::PrinterSpec;
use crate::runner::GoToolchain;
use crate::session::{SessionBuilder, SessionOptions};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug)]
pub struct Config {
    pub go: PathBuf,
    pub run_args: Vec<String>,
    pub recoverable_exit_codes: Vec<i32>,
    pub import_fixer: FixerChoice,
    pub goimports: Option<PathBuf>,
    pub printers: Vec<PrinterSpec>,
    pub options: SessionOptions,
    pub mode: Mode,
}

#[derive(Debug)]
pub enum Mode {
    Repl {
        includes: Vec<PathBuf>,
        packages: Vec<String>,
    },
    Eval {
        source: ProgramSource,
        includes: Vec<PathBuf>,
        json: bool,
    },
}

#[derive(Debug)]
pub enum ProgramSource {
    File(PathBuf),
    Inline(String),
    Stdin,
}

impl Config {
    /// Command line over the configuration file over defaults.
    pub fn load(args: Args) -> Result<Self, CliError> {
        let file_config = match &args.config {
            Some(path) => Self::read_file_config(path)?,
            None => match Self::default_config_path() {
                Some(path) if path.is_file() => Self::read_file_config(&path)?,
                _ => FileConfig::default(),
            },
        };
        Ok(Self::from_parts(args, file_config))
    }

    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("gorepl").join("config.toml"))
    }

    fn read_file_config(path: &Path) -> Result<FileConfig, CliError> {
        debug!(path = %path.display(), "reading configuration");
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::ConfigError(format!("cannot read {}: {}", path.display(), e)))?;
        Ok(toml::from_str(&content)?)
    }

    pub fn from_parts(args: Args, file: FileConfig) -> Self {
        let defaults = SessionOptions::default();
        let options = SessionOptions {
            use_spaces: args.use_spaces || file.use_spaces.unwrap_or(defaults.use_spaces),
            quick_fix: !args.no_quick_fix && file.quick_fix.unwrap_or(defaults.quick_fix),
            isolate_output: !args.no_isolate_output
                && file.isolate_output.unwrap_or(defaults.isolate_output),
        };
        let recoverable_exit_codes = if args.recoverable_exit_codes.is_empty() {
            file.recoverable_exit_codes.unwrap_or_else(|| vec![2])
        } else {
            args.recoverable_exit_codes
        };

        let mode = match args.command {
            None => Mode::Repl {
                includes: Vec::new(),
                packages: Vec::new(),
            },
            Some(Command::Repl(ReplArgs { include, package })) => Mode::Repl {
                includes: include,
                packages: package,
            },
            Some(Command::Eval(EvalArgs {
                file: path,
                inline,
                include,
                json,
            })) => Mode::Eval {
                source: match (path, inline) {
                    (Some(path), _) => ProgramSource::File(path),
                    (None, Some(code)) => ProgramSource::Inline(code),
                    (None, None) => ProgramSource::Stdin,
                },
                includes: include,
                json,
            },
        };

        Config {
            go: args.go.or(file.go).unwrap_or_else(|| PathBuf::from("go")),
            run_args: file.run_args.unwrap_or_default(),
            recoverable_exit_codes,
            import_fixer: args.import_fixer.or(file.import_fixer).unwrap_or_default(),
            goimports: args.goimports.or(file.goimports),
            printers: file.printer.unwrap_or_else(PrinterSpec::defaults),
            options,
            mode,
        }
    }

    pub fn session_builder(&self) -> SessionBuilder {
        SessionBuilder::new()
            .toolchain(Box::new(GoToolchain::new(self.go.clone(), self.run_args.clone())))
            .fixer(select_fixer(self.import_fixer, self.goimports.clone()))
            .printer_candidates(self.printers.clone())
            .recoverable_exit_codes(self.recoverable_exit_codes.clone())
            .options(self.options.clone())
    }

    pub fn describe_source(&self) -> String {
        match &self.mode {
            Mode::Repl { .. } => "Interactive session".to_string(),
            Mode::Eval {
                source: ProgramSource::File(path),
                ..
            } => format!("Evaluating {}", path.display()),
            Mode::Eval {
                source: ProgramSource::Inline(_),
                ..
            } => "Evaluating inline fragment".to_string(),
            Mode::Eval {
                source: ProgramSource::Stdin,
                ..
            } => "Evaluating standard input".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(argv: &[&str]) -> Args {
        Args::parse_from(argv)
    }

    #[test]
    fn defaults_to_repl() {
        let config = Config::from_parts(args(&["gorepl"]), FileConfig::default());
        assert!(matches!(config.mode, Mode::Repl { .. }));
        assert_eq!(config.go, PathBuf::from("go"));
        assert_eq!(config.recoverable_exit_codes, vec![2]);
        assert_eq!(config.import_fixer, FixerChoice::Auto);
        assert_eq!(config.options, SessionOptions::default());
        assert_eq!(config.printers, PrinterSpec::defaults());
    }

    #[test]
    fn file_values_apply_and_flags_win() {
        let file: FileConfig = toml::from_str(
            r#"
go = "/usr/local/go/bin/go"
run_args = ["-race"]
recoverable_exit_codes = [2, 3]
import_fixer = "builtin"
use_spaces = true
quick_fix = false

[[printer]]
package = "fmt"
call = 'fmt.Println(x)'
"#,
        )
        .unwrap();

        let config = Config::from_parts(
            args(&[
                "gorepl",
                "--go",
                "/opt/go",
                "--recoverable-exit-code",
                "1",
                "eval",
                "-i",
                "1 + 2",
            ]),
            file,
        );

        assert_eq!(config.go, PathBuf::from("/opt/go"));
        assert_eq!(config.run_args, vec!["-race".to_string()]);
        assert_eq!(config.recoverable_exit_codes, vec![1]);
        assert_eq!(config.import_fixer, FixerChoice::Builtin);
        assert!(config.options.use_spaces);
        assert!(!config.options.quick_fix);
        assert!(config.options.isolate_output);
        assert_eq!(config.printers, vec![PrinterSpec::new("fmt", "fmt.Println(x)")]);
        match config.mode {
            Mode::Eval {
                source: ProgramSource::Inline(code),
                json,
                ..
            } => {
                assert_eq!(code, "1 + 2");
                assert!(!json);
            }
            other => panic!("Expected inline eval, got {:?}", other),
        }
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "colour = true\n").unwrap();
        let result = Config::load(args(&["gorepl", "--config", path.to_str().unwrap()]));
        assert!(matches!(result, Err(CliError::ConfigError(_))));
    }

    #[test]
    fn repl_includes() {
        let config = Config::from_parts(
            args(&["gorepl", "repl", "--include", "a.go", "--package", "./util"]),
            FileConfig::default(),
        );
        match config.mode {
            Mode::Repl { includes, packages } => {
                assert_eq!(includes, vec![PathBuf::from("a.go")]);
                assert_eq!(packages, vec!["./util".to_string()]);
            }
            other => panic!("Expected repl, got {:?}", other),
        }
    }
}
