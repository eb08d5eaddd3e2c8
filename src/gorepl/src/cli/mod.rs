mod app;
mod args;
pub mod config;
mod errors;
mod repl;

pub use app::App;
pub use args::Args;
pub use config::{Config, Mode};
pub use errors::CliError;
pub use repl::{ReplCommand, parse_command};
