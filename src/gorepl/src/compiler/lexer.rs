use crate::ast::{LitKind, Span};
use combine::parser::char::{char, string};
use combine::parser::range::{recognize, take_until_range, take_while, take_while1};
use combine::parser::repeat::skip_many;
use combine::{Parser, any, attempt, choice, one_of, satisfy};
use std::fmt;

pub const KEYWORDS: [&str; 25] = [
    "break",
    "case",
    "chan",
    "const",
    "continue",
    "default",
    "defer",
    "else",
    "fallthrough",
    "for",
    "func",
    "go",
    "goto",
    "if",
    "import",
    "interface",
    "map",
    "package",
    "range",
    "return",
    "select",
    "struct",
    "switch",
    "type",
    "var",
];

const OPS3: [&str; 4] = ["<<=", ">>=", "&^=", "..."];

const OPS2: [&str; 21] = [
    "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<", ">>", "&&", "||", "<-", "++", "--",
    "==", "!=", "<=", ">=", ":=", "&^",
];

const OPS1: [&str; 23] = [
    "+", "-", "*", "/", "%", "&", "|", "^", "<", ">", "=", "!", "~", "(", ")", "[", "]", "{",
    "}", ",", ";", ".", ":",
];

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Keyword(&'static str),
    /// Literal text exactly as written, quotes included.
    Literal(LitKind, String),
    Op(&'static str),
    Semi { implicit: bool },
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(name) => write!(f, "{}", name),
            TokenKind::Keyword(kw) => write!(f, "'{}'", kw),
            TokenKind::Literal(_, text) => write!(f, "{}", text),
            TokenKind::Op(op) => write!(f, "'{}'", op),
            TokenKind::Semi { implicit: true } => write!(f, "newline"),
            TokenKind::Semi { implicit: false } => write!(f, "';'"),
            TokenKind::Eof => write!(f, "EOF"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub message: String,
    pub offset: usize,
}

/// What a single recognizer step produced.
enum Piece<'a> {
    Blank,
    Newline,
    Comment { newline: bool },
    Token(TokenKind, &'a str),
}

fn raw_string<'a>() -> impl Parser<&'a str, Output = &'a str> {
    recognize((char('`'), take_while(|c: char| c != '`'), char('`')))
}

fn quoted<'a>(quote: char) -> impl Parser<&'a str, Output = &'a str> {
    recognize((
        char(quote),
        skip_many(choice((
            char('\\').with(any()).map(|_| ()),
            satisfy(move |c: char| c != quote && c != '\\' && c != '\n').map(|_| ()),
        ))),
        char(quote),
    ))
}

fn number<'a>() -> impl Parser<&'a str, Output = &'a str> {
    recognize((
        take_while1(|c: char| c.is_ascii_digit() || c == '.'),
        skip_many(choice((
            attempt((one_of("eEpP".chars()), one_of("+-".chars()))).map(|_| ()),
            satisfy(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.').map(|_| ()),
        ))),
    ))
}

fn block_comment<'a>() -> impl Parser<&'a str, Output = &'a str> {
    string("/*")
        .with(take_until_range("*/"))
        .skip(string("*/"))
}

fn operator<'a>() -> impl Parser<&'a str, Output = &'static str> {
    choice((
        choice(OPS3.map(|op| attempt(string(op)))),
        choice(OPS2.map(|op| attempt(string(op)))),
        choice(OPS1.map(|op| attempt(string(op)))),
    ))
    .map(|op: &str| static_op(op))
}

fn static_op(op: &str) -> &'static str {
    OPS3.iter()
        .chain(OPS2.iter())
        .chain(OPS1.iter())
        .find(|candidate| **candidate == op)
        .copied()
        .unwrap_or("?")
}

/// `0x1e+2` is a hex literal followed by `+ 2`, not an exponent.
fn trim_hex_exponent(text: &str) -> &str {
    if !(text.starts_with("0x") || text.starts_with("0X")) {
        return text;
    }
    let bytes = text.as_bytes();
    for i in 1..bytes.len() {
        if matches!(bytes[i], b'+' | b'-') && matches!(bytes[i - 1], b'e' | b'E') {
            return &text[..i];
        }
    }
    text
}

fn number_kind(text: &str) -> LitKind {
    let hex = text.starts_with("0x") || text.starts_with("0X");
    if text.ends_with('i') {
        LitKind::Imag
    } else if hex {
        if text.contains(['p', 'P']) {
            LitKind::Float
        } else {
            LitKind::Int
        }
    } else if text.contains(['.', 'e', 'E']) {
        LitKind::Float
    } else {
        LitKind::Int
    }
}

fn next_piece(rest: &str) -> Result<(Piece<'_>, &str), String> {
    let mut chars = rest.chars();
    let first = chars.next().unwrap_or('\0');
    let second = chars.next().unwrap_or('\0');

    match first {
        ' ' | '\t' | '\r' => take_while1(|c: char| c == ' ' || c == '\t' || c == '\r')
            .parse(rest)
            .map(|(_, rest)| (Piece::Blank, rest))
            .map_err(|_| "invalid whitespace".to_string()),
        '\n' => Ok((Piece::Newline, &rest[1..])),
        '/' if second == '/' => {
            let end = rest.find('\n').unwrap_or(rest.len());
            Ok((Piece::Comment { newline: false }, &rest[end..]))
        }
        '/' if second == '*' => block_comment()
            .parse(rest)
            .map(|(body, rest)| (Piece::Comment { newline: body.contains('\n') }, rest))
            .map_err(|_| "comment not terminated".to_string()),
        '`' => raw_string()
            .parse(rest)
            .map(|(text, rest)| {
                (
                    Piece::Token(TokenKind::Literal(LitKind::String, text.to_string()), text),
                    rest,
                )
            })
            .map_err(|_| "raw string literal not terminated".to_string()),
        '"' => quoted('"')
            .parse(rest)
            .map(|(text, rest)| {
                (
                    Piece::Token(TokenKind::Literal(LitKind::String, text.to_string()), text),
                    rest,
                )
            })
            .map_err(|_| "string literal not terminated".to_string()),
        '\'' => quoted('\'')
            .parse(rest)
            .map(|(text, rest)| {
                (
                    Piece::Token(TokenKind::Literal(LitKind::Rune, text.to_string()), text),
                    rest,
                )
            })
            .map_err(|_| "rune literal not terminated".to_string()),
        c if c.is_ascii_digit() || (c == '.' && second.is_ascii_digit()) => {
            let (text, _) = number()
                .parse(rest)
                .map_err(|_| "invalid number literal".to_string())?;
            let text = trim_hex_exponent(text);
            let kind = number_kind(text);
            Ok((
                Piece::Token(TokenKind::Literal(kind, text.to_string()), text),
                &rest[text.len()..],
            ))
        }
        c if c.is_alphabetic() || c == '_' => {
            let (text, rest) = take_while1(|c: char| c.is_alphanumeric() || c == '_')
                .parse(rest)
                .map_err(|_| "invalid identifier".to_string())?;
            let kind = match KEYWORDS.iter().find(|kw| **kw == text) {
                Some(kw) => TokenKind::Keyword(*kw),
                None => TokenKind::Ident(text.to_string()),
            };
            Ok((Piece::Token(kind, text), rest))
        }
        _ => match operator().parse(rest) {
            Ok((";", rest)) => Ok((Piece::Token(TokenKind::Semi { implicit: false }, ";"), rest)),
            Ok((op, rest)) => Ok((Piece::Token(TokenKind::Op(op), op), rest)),
            Err(_) => Err(format!("unexpected character {:?}", first)),
        },
    }
}

fn ends_statement(kind: &TokenKind) -> bool {
    match kind {
        TokenKind::Ident(_) | TokenKind::Literal(..) => true,
        TokenKind::Keyword(kw) => matches!(*kw, "break" | "continue" | "fallthrough" | "return"),
        TokenKind::Op(op) => matches!(*op, "++" | "--" | ")" | "]" | "}"),
        _ => false,
    }
}

/// Splits Go source into tokens, inserting semicolons at line ends the way
/// the Go compiler does. The last token is always `Eof`, placed where the
/// previous token ends so errors at end of input point at real text.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let mut tokens = Vec::new();
    let mut rest = source;
    let mut pending_semi = false;

    while !rest.is_empty() {
        let offset = source.len() - rest.len();
        let (piece, next) = next_piece(rest).map_err(|message| LexError { message, offset })?;
        match piece {
            Piece::Blank | Piece::Comment { newline: false } => {}
            Piece::Newline | Piece::Comment { newline: true } => {
                if pending_semi {
                    tokens.push(Token {
                        kind: TokenKind::Semi { implicit: true },
                        span: Span::new(offset, offset),
                    });
                    pending_semi = false;
                }
            }
            Piece::Token(kind, text) => {
                pending_semi = ends_statement(&kind);
                tokens.push(Token {
                    kind,
                    span: Span::new(offset, offset + text.len()),
                });
            }
        }
        rest = next;
    }

    if pending_semi {
        tokens.push(Token {
            kind: TokenKind::Semi { implicit: true },
            span: Span::new(source.len(), source.len()),
        });
    }
    let end = tokens.last().map(|token| token.span.end).unwrap_or(0);
    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span::new(end, end),
    });
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .expect("lex")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_semicolon_insertion() {
        let tokens = kinds("x := 1\nreturn\n}\nfoo(\n");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Ident("x".to_string()),
                TokenKind::Op(":="),
                TokenKind::Literal(LitKind::Int, "1".to_string()),
                TokenKind::Semi { implicit: true },
                TokenKind::Keyword("return"),
                TokenKind::Semi { implicit: true },
                TokenKind::Op("}"),
                TokenKind::Semi { implicit: true },
                TokenKind::Ident("foo".to_string()),
                TokenKind::Op("("),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_eof_follows_last_token() {
        let tokens = tokenize("func (\n\n  ").expect("lex");
        let eof = tokens.last().unwrap();
        assert_eq!(eof.kind, TokenKind::Eof);
        assert_eq!((eof.span.start, eof.span.end), (6, 6));
        assert_eq!(tokenize("").expect("lex")[0].span.start, 0);
    }

    #[test]
    fn test_semicolon_at_end_of_input() {
        let tokens = kinds("a++");
        assert_eq!(tokens[1], TokenKind::Op("++"));
        assert_eq!(tokens[2], TokenKind::Semi { implicit: true });
    }

    #[test]
    fn test_comments_are_dropped() {
        let tokens = kinds("a // trailing\nb /* multi\nline */ c /* inline */ d");
        let idents: Vec<_> = tokens
            .iter()
            .filter(|t| matches!(t, TokenKind::Ident(_)))
            .collect();
        assert_eq!(idents.len(), 4);
        let semis = tokens
            .iter()
            .filter(|t| matches!(t, TokenKind::Semi { .. }))
            .count();
        assert_eq!(semis, 3);
    }

    #[rstest]
    #[case("42", LitKind::Int)]
    #[case("0x1F", LitKind::Int)]
    #[case("1_000", LitKind::Int)]
    #[case("3.14", LitKind::Float)]
    #[case(".5", LitKind::Float)]
    #[case("1e10", LitKind::Float)]
    #[case("6.02e+23", LitKind::Float)]
    #[case("0x1p-2", LitKind::Float)]
    #[case("2i", LitKind::Imag)]
    #[case("'a'", LitKind::Rune)]
    #[case("'\\n'", LitKind::Rune)]
    #[case("\"hi \\\"there\\\"\"", LitKind::String)]
    #[case("`raw\nstring`", LitKind::String)]
    fn test_literals(#[case] source: &str, #[case] kind: LitKind) {
        let tokens = kinds(source);
        assert_eq!(tokens[0], TokenKind::Literal(kind, source.to_string()));
    }

    #[test]
    fn test_hex_literal_does_not_take_sign() {
        let tokens = kinds("0x1e+2");
        assert_eq!(tokens[0], TokenKind::Literal(LitKind::Int, "0x1e".to_string()));
        assert_eq!(tokens[1], TokenKind::Op("+"));
    }

    #[test]
    fn test_maximal_munch() {
        let tokens = kinds("a &^= b <- c ... x<<=1");
        assert!(tokens.contains(&TokenKind::Op("&^=")));
        assert!(tokens.contains(&TokenKind::Op("<-")));
        assert!(tokens.contains(&TokenKind::Op("...")));
        assert!(tokens.contains(&TokenKind::Op("<<=")));
    }

    #[test]
    fn test_keywords() {
        let tokens = kinds("func go goto");
        assert_eq!(tokens[0], TokenKind::Keyword("func"));
        assert_eq!(tokens[1], TokenKind::Keyword("go"));
        assert_eq!(tokens[2], TokenKind::Keyword("goto"));
    }

    #[rstest]
    #[case("\"open", "string literal not terminated")]
    #[case("`open", "raw string literal not terminated")]
    #[case("/* open", "comment not terminated")]
    #[case("a @ b", "unexpected character '@'")]
    fn test_errors(#[case] source: &str, #[case] message: &str) {
        let err = tokenize(source).expect_err("should fail");
        assert_eq!(err.message, message);
    }

    #[test]
    fn test_spans_are_byte_offsets() {
        let tokens = tokenize("ab + \"é\"").expect("lex");
        assert_eq!(tokens[0].span, Span::new(0, 2));
        assert_eq!(tokens[1].span, Span::new(3, 4));
        assert_eq!(tokens[2].span, Span::new(5, 9));
    }
}
