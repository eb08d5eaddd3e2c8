//! The single growing Go program behind a session.
//!
//! The file is kept split in two: every declaration except `main`, and the
//! statement list of `main` (the body). Rendering puts `main` back last.

use crate::ast::{Block, Decl, File, FuncDecl, FuncType, ImportSpec, Span, Spanned, Stmt};
use crate::compiler::{ParseError, parse_file, render_file};
use crate::printer::{PrinterSpec, discard_source};

pub const ENTRY_POINT: &str = "main";

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    header: File,
    body: Vec<Spanned<Stmt>>,
}

impl Program {
    /// Package `main`, the printer's import, the printer and discard helpers
    /// and an empty `main`.
    pub fn new(printer: &PrinterSpec) -> Result<Self, ParseError> {
        let source = format!(
            "package main\n\nimport {:?}\n\n{}\n{}\nfunc {}() {{\n}}\n",
            printer.package,
            printer.helper_source(),
            discard_source(),
            ENTRY_POINT
        );
        Self::parse(&source)
    }

    /// Parses a whole file; it must declare `func main()`.
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        let mut header = parse_file(source)?;
        let main = header
            .decls
            .iter()
            .position(|decl| {
                matches!(decl, Decl::Func(f) if f.recv.is_none() && f.name == ENTRY_POINT)
            })
            .ok_or_else(|| ParseError::at(source, source.len(), "program has no func main"))?;
        let body = match header.decls.remove(main) {
            Decl::Func(FuncDecl {
                body: Some(block), ..
            }) => block.stmts,
            _ => Vec::new(),
        };
        Ok(Self { header, body })
    }

    /// The full syntax tree with `main` in place.
    pub fn file(&self) -> File {
        let mut file = self.header.clone();
        file.decls.push(Decl::Func(FuncDecl {
            recv: None,
            name: ENTRY_POINT.to_string(),
            ty: FuncType::default(),
            body: Some(Block {
                stmts: self.body.clone(),
            }),
            span: Span::dummy(),
        }));
        file
    }

    pub fn render(&self, use_spaces: bool) -> String {
        render_file(&self.file(), use_spaces)
    }

    /// Render and parse again, replacing the whole tree so every span points
    /// into the current text.
    pub fn reparse_normalize(&mut self) -> Result<(), ParseError> {
        let source = self.render(false);
        self.replace_source(&source)
    }

    /// Replace the program with the given source, e.g. the import fixer's
    /// output.
    pub fn replace_source(&mut self, source: &str) -> Result<(), ParseError> {
        *self = Self::parse(source)?;
        Ok(())
    }

    pub fn package(&self) -> &str {
        &self.header.package
    }

    pub fn imports(&self) -> &[ImportSpec] {
        &self.header.imports
    }

    pub fn set_imports(&mut self, imports: Vec<ImportSpec>) {
        self.header.imports = imports;
    }

    pub fn has_import(&self, path: &str) -> bool {
        self.header.imports.iter().any(|spec| spec.path == path)
    }

    pub fn body(&self) -> &[Spanned<Stmt>] {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Vec<Spanned<Stmt>> {
        &mut self.body
    }

    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    pub fn truncate_body(&mut self, len: usize) {
        self.body.truncate(len);
    }

    /// Append statements built in memory; they carry dummy spans until the
    /// next `reparse_normalize`.
    pub fn append(&mut self, nodes: impl IntoIterator<Item = Stmt>) {
        self.body
            .extend(nodes.into_iter().map(|stmt| (stmt, Span::dummy())));
    }

    pub fn clear_body(&mut self) {
        self.body.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;
    use crate::compiler::parse_stmt_list;
    use crate::printer::{DISCARD_FUNC, PRINTER_FUNC, print_call};

    fn program() -> Program {
        Program::new(&PrinterSpec::fmt()).unwrap()
    }

    #[test]
    fn template_has_printer_and_empty_main() {
        let program = program();
        assert_eq!(program.package(), "main");
        assert!(program.has_import("fmt"));
        assert_eq!(program.body_len(), 0);
        let file = program.file();
        assert!(file.func(PRINTER_FUNC).is_some());
        assert!(file.func(DISCARD_FUNC).is_some());
        assert!(file.func(ENTRY_POINT).is_some());
        assert!(program.render(false).ends_with("func main() {\n}\n"));
    }

    #[test]
    fn append_and_truncate() {
        let mut program = program();
        let checkpoint = program.body_len();
        program.append(vec![Stmt::Expr(print_call(vec![Expr::ident("x")]))]);
        program.append(
            parse_stmt_list("y := 2\n_ = y")
                .unwrap()
                .into_iter()
                .map(|(s, _)| s),
        );
        assert_eq!(program.body_len(), 3);
        assert!(program.body()[0].1.is_dummy());

        program.truncate_body(checkpoint);
        assert_eq!(program.body_len(), checkpoint);
        assert_eq!(program, self::program());
    }

    #[test]
    fn reparse_refreshes_spans_and_is_fixed_point() {
        let mut program = program();
        program.append(
            parse_stmt_list("x := []int{1, 2}\nfor _, v := range x {\n\t_ = v\n}")
                .unwrap()
                .into_iter()
                .map(|(s, _)| s),
        );
        program.append(vec![Stmt::Expr(print_call(vec![Expr::ident("x")]))]);
        let before = program.render(false);

        program.reparse_normalize().unwrap();
        assert!(program.body().iter().all(|(_, span)| !span.is_dummy()));
        assert_eq!(program.render(false), before);
        assert_eq!(program.body_len(), 3);
    }

    #[test]
    fn parse_requires_main() {
        let err = Program::parse("package main\n\nfunc helper() {}\n").unwrap_err();
        assert_eq!(err.message, "program has no func main");
    }
}
