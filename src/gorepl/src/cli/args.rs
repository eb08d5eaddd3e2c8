use crate::imports::FixerChoice;
use crate::printer::PrinterSpec;
use clap::{ArgAction, Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gorepl")]
#[command(version)]
#[command(about = "An interactive evaluation session for Go")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[arg(
        short = 'c',
        long,
        global = true,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        short = 'v',
        long,
        global = true,
        action = ArgAction::Count,
        help = "Increase log verbosity (-v info, -vv debug)"
    )]
    pub verbose: u8,

    #[arg(long, global = true, help = "Write logs as JSON lines")]
    pub log_json: bool,

    #[arg(long, global = true, value_name = "PATH", help = "Go binary to build and run with")]
    pub go: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_enum,
        value_name = "FIXER",
        help = "Import fixer: auto, goimports or builtin"
    )]
    pub import_fixer: Option<FixerChoice>,

    #[arg(long, global = true, value_name = "PATH", help = "goimports binary")]
    pub goimports: Option<PathBuf>,

    #[arg(
        long = "recoverable-exit-code",
        global = true,
        value_name = "CODE",
        help = "Exit code treated as a recoverable failure (repeatable)"
    )]
    pub recoverable_exit_codes: Vec<i32>,

    #[arg(long, global = true, help = "Indent the generated source with spaces")]
    pub use_spaces: bool,

    #[arg(long, global = true, help = "Do not retry valueless calls without the printer")]
    pub no_quick_fix: bool,

    #[arg(long, global = true, help = "Show the whole program output on every evaluation")]
    pub no_isolate_output: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(about = "Start an interactive session (the default)")]
    Repl(ReplArgs),

    #[command(about = "Evaluate a fragment and exit")]
    Eval(EvalArgs),
}

#[derive(Parser, Debug, Default)]
pub struct ReplArgs {
    #[arg(long, value_name = "FILE", help = "Go file to include before the first prompt")]
    pub include: Vec<PathBuf>,

    #[arg(long, value_name = "DIR|PATH", help = "Package to include before the first prompt")]
    pub package: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct EvalArgs {
    #[arg(short = 'f', long, value_name = "FILE", conflicts_with = "inline")]
    pub file: Option<PathBuf>,

    #[arg(short = 'i', long, value_name = "CODE", conflicts_with = "file")]
    pub inline: Option<String>,

    #[arg(long, value_name = "FILE", help = "Go file to include before evaluating")]
    pub include: Vec<PathBuf>,

    #[arg(long, help = "Print the result as JSON")]
    pub json: bool,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub go: Option<PathBuf>,
    pub run_args: Option<Vec<String>>,
    pub recoverable_exit_codes: Option<Vec<i32>>,
    pub import_fixer: Option<FixerChoice>,
    pub goimports: Option<PathBuf>,
    pub printer: Option<Vec<PrinterSpec>>,
    pub use_spaces: Option<bool>,
    pub quick_fix: Option<bool>,
    pub isolate_output: Option<bool>,
}
