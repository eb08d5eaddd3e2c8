pub mod lexer;
pub mod parser;
pub mod render;

use crate::ast::{Decl, Expr, File, Spanned, Stmt};
use std::fmt;

pub use render::{expr_to_string, render_decl, render_file, render_stmts, stmt_to_string};

/// A named piece of Go source, kept together so errors can point into it.
#[derive(Debug, Clone)]
pub struct CompilationUnit {
    source: String,
    name: String,
}

impl CompilationUnit {
    pub fn new(name: String, source: String) -> Self {
        Self { name, source }
    }

    pub fn from_string(source: String) -> Self {
        Self {
            name: "input".to_string(),
            source,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    /// Byte offset into the parsed source.
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    pub fn at(source: &str, offset: usize, message: impl Into<String>) -> Self {
        let (line, column) = calculate_line_column(source, offset);
        Self {
            message: message.into(),
            offset,
            line,
            column,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

impl std::error::Error for ParseError {}

fn calculate_line_column(source: &str, position: usize) -> (usize, usize) {
    let mut line = 1;
    let mut column = 1;

    for (i, ch) in source.char_indices() {
        if i >= position {
            break;
        }
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }

    (line, column)
}

fn parser_for(source: &str) -> Result<parser::Parser, ParseError> {
    let tokens = lexer::tokenize(source)
        .map_err(|e| ParseError::at(source, e.offset, e.message))?;
    Ok(parser::Parser::new(tokens))
}

fn lift<T>(source: &str, result: parser::PResult<T>) -> Result<T, ParseError> {
    result.map_err(|e| ParseError::at(source, e.offset, e.message))
}

/// Parse a complete Go source file.
pub fn parse_file(source: &str) -> Result<File, ParseError> {
    let mut parser = parser_for(source)?;
    lift(source, parser.parse_file())
}

/// Parse exactly one expression, optionally followed by a semicolon.
pub fn parse_expr(source: &str) -> Result<Expr, ParseError> {
    let mut parser = parser_for(source)?;
    lift(source, parser.parse_expr_only())
}

/// Parse a statement list such as the body of a function.
pub fn parse_stmt_list(source: &str) -> Result<Vec<Spanned<Stmt>>, ParseError> {
    let mut parser = parser_for(source)?;
    lift(source, parser.parse_stmt_list_only())
}

/// Parse top-level declarations without a package clause or imports.
pub fn parse_decls(source: &str) -> Result<Vec<Decl>, ParseError> {
    let mut parser = parser_for(source)?;
    lift(source, parser.parse_decls_only())
}

#[cfg(test)]
mod parser_test;

#[cfg(test)]
mod render_test;
