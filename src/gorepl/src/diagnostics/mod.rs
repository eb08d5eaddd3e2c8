pub mod reporter;

pub use reporter::{DiagnosticReporter, FileId, SourceFiles};

use crate::compiler::{CompilationUnit, ParseError};
use codespan_reporting::files;

/// Keeps every fragment shown in an error so labels can point into it.
pub struct DiagnosticManager {
    files: SourceFiles,
    reporter: DiagnosticReporter,
}

impl DiagnosticManager {
    pub fn new(reporter: DiagnosticReporter) -> Self {
        Self {
            files: SourceFiles::new(),
            reporter,
        }
    }

    pub fn add_unit(&mut self, unit: &CompilationUnit) -> FileId {
        self.files.add(unit.name().to_string(), unit.source().to_string())
    }

    pub fn emit_parse_error(
        &mut self,
        unit: &CompilationUnit,
        error: &ParseError,
    ) -> Result<(), files::Error> {
        let file_id = self.add_unit(unit);
        let diagnostic = self.reporter.parse_diagnostic(file_id, unit.source(), error);
        self.reporter.emit_diagnostic(&self.files, &diagnostic)
    }

    pub fn render_parse_error(
        &mut self,
        unit: &CompilationUnit,
        error: &ParseError,
    ) -> Result<String, files::Error> {
        let file_id = self.add_unit(unit);
        let diagnostic = self.reporter.parse_diagnostic(file_id, unit.source(), error);
        self.reporter.render_diagnostic(&self.files, &diagnostic)
    }

    pub fn emit_run_failure(&self, stderr: &str) -> Result<(), files::Error> {
        let diagnostic = self.reporter.run_diagnostic(stderr);
        self.reporter.emit_diagnostic(&self.files, &diagnostic)
    }

    pub fn files(&self) -> &SourceFiles {
        &self.files
    }

    pub fn reporter(&self) -> &DiagnosticReporter {
        &self.reporter
    }
}

impl Default for DiagnosticManager {
    fn default() -> Self {
        Self::new(DiagnosticReporter::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::parse_expr;

    #[test]
    fn renders_parse_error_with_label() {
        let mut manager = DiagnosticManager::default();
        let unit = CompilationUnit::new("<repl>".to_string(), "x := (1 +".to_string());
        let error = parse_expr(unit.source()).unwrap_err();

        let rendered = manager.render_parse_error(&unit, &error).unwrap();

        assert!(rendered.contains("error: syntax error"), "{}", rendered);
        assert!(rendered.contains("<repl>:1:"), "{}", rendered);
        assert!(rendered.contains(&error.message), "{}", rendered);
        assert_eq!(manager.files().get(0).unwrap().name(), "<repl>");
    }

    #[test]
    fn error_at_end_of_input_is_renderable() {
        let mut manager = DiagnosticManager::default();
        let unit = CompilationUnit::from_string("func bad(".to_string());
        let error = ParseError::at(unit.source(), unit.source().len(), "expected type, found EOF");
        let rendered = manager.render_parse_error(&unit, &error).unwrap();
        assert!(rendered.contains("expected type, found EOF"));
    }

    #[test]
    fn run_failure_keeps_first_line_as_message() {
        let reporter = DiagnosticReporter::default();
        let diagnostic = reporter.run_diagnostic("./gorepl_session.go:9:2: undefined: y\nnote\n");
        assert_eq!(diagnostic.message, "./gorepl_session.go:9:2: undefined: y");
        assert_eq!(diagnostic.notes, vec!["note".to_string()]);
    }
}
