//! Splits a fragment into expressions, statement blocks and declarations.
//!
//! Lines are taken one at a time. Outside a pending block each line is first
//! tried as a bare expression; otherwise it opens (or continues) a block that
//! is buffered until its braces balance, then parsed as an expression, a
//! statement list or top-level declarations, in that order.

use crate::ast::{Expr, Stmt};
use crate::compiler::{ParseError, parse_decls, parse_expr, parse_stmt_list};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum Accepted {
    Expr(Expr),
    Stmt {
        stmts: Vec<Stmt>,
        /// Left-hand side of a trailing assignment, to be displayed.
        echo: Vec<Expr>,
    },
    /// Source text of one or more top-level declarations.
    Decl(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassifyError {
    /// Braces are still open; more input is needed.
    Continue,
    Parse(ParseError),
}

impl fmt::Display for ClassifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifyError::Continue => write!(f, "unterminated block, more input expected"),
            ClassifyError::Parse(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ClassifyError {}

impl From<ParseError> for ClassifyError {
    fn from(error: ParseError) -> Self {
        ClassifyError::Parse(error)
    }
}

/// Brace depth across lines, ignoring braces inside literals and comments.
#[derive(Debug, Clone, Default)]
pub struct BlockTracker {
    depth: i32,
    in_raw_string: bool,
    in_block_comment: bool,
}

impl BlockTracker {
    pub fn depth(&self) -> i32 {
        self.depth
    }

    pub fn feed(&mut self, line: &str) {
        let mut chars = line.chars().peekable();
        let mut quote: Option<char> = None;

        while let Some(c) = chars.next() {
            if self.in_block_comment {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    self.in_block_comment = false;
                }
                continue;
            }
            if self.in_raw_string {
                if c == '`' {
                    self.in_raw_string = false;
                }
                continue;
            }
            if let Some(q) = quote {
                if c == '\\' {
                    chars.next();
                } else if c == q {
                    quote = None;
                }
                continue;
            }
            match c {
                '"' | '\'' => quote = Some(c),
                '`' => self.in_raw_string = true,
                '/' if chars.peek() == Some(&'/') => break,
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    self.in_block_comment = true;
                }
                '{' => self.depth += 1,
                '}' => self.depth -= 1,
                _ => {}
            }
        }
    }

    pub fn is_open(&self) -> bool {
        self.depth > 0 || self.in_raw_string || self.in_block_comment
    }
}

/// Line-by-line classifier for one fragment.
#[derive(Debug, Default)]
pub struct Classifier {
    tracker: BlockTracker,
    pending: Vec<String>,
    accepted: Vec<Accepted>,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_line(&mut self, line: &str) -> Result<(), ParseError> {
        if self.pending.is_empty() {
            if line.trim().is_empty() {
                return Ok(());
            }
            if let Ok(expr) = parse_expr(line) {
                debug!(line, "classified as expression");
                self.accepted.push(Accepted::Expr(expr));
                return Ok(());
            }
        }

        self.pending.push(line.to_string());
        self.tracker.feed(line);
        if !self.tracker.is_open() {
            let block = self.pending.join("\n");
            self.pending.clear();
            self.tracker = BlockTracker::default();
            self.accepted.push(classify_block(&block)?);
        }
        Ok(())
    }

    pub fn finish(self) -> Result<Vec<Accepted>, ClassifyError> {
        if !self.pending.is_empty() {
            return Err(ClassifyError::Continue);
        }
        Ok(self.accepted)
    }
}

/// Classify a whole fragment.
pub fn classify(fragment: &str) -> Result<Vec<Accepted>, ClassifyError> {
    let mut classifier = Classifier::new();
    for line in fragment.lines() {
        classifier.push_line(line)?;
    }
    classifier.finish()
}

/// Ordered attempts: expression, statement list, declarations.
fn classify_block(block: &str) -> Result<Accepted, ParseError> {
    if let Ok(expr) = parse_expr(block) {
        debug!("block classified as expression");
        return Ok(Accepted::Expr(expr));
    }

    let stmt_error = match parse_stmt_list(block) {
        Ok(stmts) => {
            let stmts: Vec<Stmt> = stmts.into_iter().map(|(stmt, _)| stmt).collect();
            let echo = echo_targets(&stmts);
            debug!(count = stmts.len(), "block classified as statements");
            return Ok(Accepted::Stmt { stmts, echo });
        }
        Err(e) => e,
    };

    match parse_decls(block) {
        Ok(_) => {
            debug!("block classified as declarations");
            Ok(Accepted::Decl(block.to_string()))
        }
        Err(decl_error) => {
            if block.trim_start().starts_with("func") {
                Err(decl_error)
            } else {
                Err(stmt_error)
            }
        }
    }
}

fn echo_targets(stmts: &[Stmt]) -> Vec<Expr> {
    match stmts.last() {
        Some(Stmt::Assign { lhs, .. }) => lhs.iter().filter(|e| !e.is_blank()).cloned().collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("x := 1 {", 1)]
    #[case("if x {}", 0)]
    #[case("s := \"{\" // {", 0)]
    #[case("r := '{'", 0)]
    #[case("f(func() {", 1)]
    #[case("}", -1)]
    #[case("/* { */ {", 1)]
    fn tracks_brace_depth(#[case] line: &str, #[case] depth: i32) {
        let mut tracker = BlockTracker::default();
        tracker.feed(line);
        assert_eq!(tracker.depth(), depth, "{}", line);
    }

    #[test]
    fn raw_strings_span_lines() {
        let mut tracker = BlockTracker::default();
        tracker.feed("s := `{");
        assert!(tracker.is_open());
        assert_eq!(tracker.depth(), 0);
        tracker.feed("}`");
        assert!(!tracker.is_open());
    }

    #[test]
    fn bare_expression() {
        let accepted = classify("1 + 2").unwrap();
        assert_eq!(accepted.len(), 1);
        assert!(matches!(accepted[0], Accepted::Expr(Expr::Binary { op: "+", .. })));
    }

    #[test]
    fn assignment_echoes_left_side() {
        let accepted = classify("x, _, err := f()").unwrap();
        match &accepted[0] {
            Accepted::Stmt { stmts, echo } => {
                assert_eq!(stmts.len(), 1);
                assert_eq!(echo, &vec![Expr::ident("x"), Expr::ident("err")]);
            }
            other => panic!("Expected statement, got {:?}", other),
        }
    }

    #[test]
    fn block_waits_for_closing_brace() {
        let mut classifier = Classifier::new();
        classifier.push_line("for i := 0; i < 3; i++ {").unwrap();
        classifier.push_line("\tfmt.Println(i)").unwrap();
        assert!(classifier.accepted.is_empty());
        classifier.push_line("}").unwrap();
        let accepted = classifier.finish().unwrap();
        assert_eq!(accepted.len(), 1);
        match &accepted[0] {
            Accepted::Stmt { stmts, echo } => {
                assert!(matches!(stmts[0], Stmt::For { .. }));
                assert!(echo.is_empty());
            }
            other => panic!("Expected statement, got {:?}", other),
        }
    }

    #[test]
    fn unclosed_block_requests_continuation() {
        assert_eq!(classify("if x {\n\ty()"), Err(ClassifyError::Continue));
        assert_eq!(classify("s := `open"), Err(ClassifyError::Continue));
    }

    #[test]
    fn multi_line_composite_is_expression() {
        let accepted = classify("[]int{\n\t1,\n\t2,\n}").unwrap();
        assert!(matches!(accepted[0], Accepted::Expr(Expr::CompositeLit { .. })));
    }

    #[test]
    fn declarations_fall_through() {
        let accepted = classify("func Helper() int {\n\treturn 42\n}").unwrap();
        assert!(matches!(&accepted[0], Accepted::Decl(src) if src.starts_with("func Helper")));

        let accepted = classify("func (p P) Name() string { return \"p\" }").unwrap();
        assert!(matches!(accepted[0], Accepted::Decl(_)));
    }

    #[test]
    fn type_declaration_is_a_statement() {
        let accepted = classify("type P struct{ X int }").unwrap();
        assert!(matches!(accepted[0], Accepted::Stmt { .. }));
    }

    #[test]
    fn unterminated_function_is_parse_error() {
        match classify("func bad(") {
            Err(ClassifyError::Parse(e)) => assert!(e.message.starts_with("expected"), "{}", e),
            other => panic!("Expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn mixed_lines() {
        let accepted = classify("x := 5\nx\n\nx * 2").unwrap();
        assert_eq!(accepted.len(), 3);
        assert!(matches!(accepted[0], Accepted::Stmt { .. }));
        assert!(matches!(accepted[1], Accepted::Expr(Expr::Ident(_))));
        assert!(matches!(accepted[2], Accepted::Expr(Expr::Binary { .. })));
    }
}
