use crate::compiler::ParseError;
use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::{self, SimpleFiles};
use codespan_reporting::term::termcolor::{ColorChoice, NoColor, StandardStream, WriteColor};
use codespan_reporting::term::{self, Config};

pub type FileId = usize;
pub type SourceFiles = SimpleFiles<String, String>;

#[derive(Clone)]
pub struct DiagnosticReporter {
    config: Config,
    color: ColorChoice,
}

impl DiagnosticReporter {
    pub fn new(color: ColorChoice) -> Self {
        Self {
            config: Config::default(),
            color,
        }
    }

    pub fn parse_diagnostic(
        &self,
        file_id: FileId,
        source: &str,
        error: &ParseError,
    ) -> Diagnostic<FileId> {
        let start = error.offset.min(source.len());
        let end = source[start..]
            .chars()
            .next()
            .map(|c| start + c.len_utf8())
            .unwrap_or(start);
        Diagnostic::error()
            .with_message("syntax error")
            .with_labels(vec![
                Label::primary(file_id, start..end).with_message(error.message.clone()),
            ])
    }

    pub fn run_diagnostic(&self, stderr: &str) -> Diagnostic<FileId> {
        let mut lines = stderr.trim().lines();
        let headline = lines.next().unwrap_or("run failed").to_string();
        Diagnostic::error()
            .with_message(headline)
            .with_notes(lines.map(str::to_string).collect())
    }

    pub fn emit_diagnostic(
        &self,
        files: &SourceFiles,
        diagnostic: &Diagnostic<FileId>,
    ) -> Result<(), files::Error> {
        let writer = StandardStream::stderr(self.color);
        let mut lock = writer.lock();
        self.write_diagnostic(&mut lock, files, diagnostic)
    }

    /// Renders without color, e.g. for JSON output.
    pub fn render_diagnostic(
        &self,
        files: &SourceFiles,
        diagnostic: &Diagnostic<FileId>,
    ) -> Result<String, files::Error> {
        let mut buffer = NoColor::new(Vec::new());
        self.write_diagnostic(&mut buffer, files, diagnostic)?;
        Ok(String::from_utf8_lossy(&buffer.into_inner()).into_owned())
    }

    fn write_diagnostic(
        &self,
        writer: &mut dyn WriteColor,
        files: &SourceFiles,
        diagnostic: &Diagnostic<FileId>,
    ) -> Result<(), files::Error> {
        term::emit(writer, &self.config, files, diagnostic)
    }
}

impl Default for DiagnosticReporter {
    fn default() -> Self {
        Self::new(ColorChoice::Auto)
    }
}
