use crate::ast::{
    Block, CaseClause, ChanDir, CommClause, Decl, Expr, Field, File, FuncDecl, FuncType, GenDecl,
    GenKind, ImportSpec, InterfaceElem, LitKind, Span, Spanned, Spec, Stmt, TypeSpec, ValueSpec,
};
use crate::compiler::lexer::{Token, TokenKind};

#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError {
    pub message: String,
    pub offset: usize,
}

pub type PResult<T> = Result<T, SyntaxError>;

const ASSIGN_OPS: [&str; 13] = [
    "=", ":=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<=", ">>=", "&^=",
];

fn binary_precedence(op: &str) -> Option<u8> {
    match op {
        "||" => Some(1),
        "&&" => Some(2),
        "==" | "!=" | "<" | "<=" | ">" | ">=" => Some(3),
        "+" | "-" | "|" | "^" => Some(4),
        "*" | "/" | "%" | "<<" | ">>" | "&" | "&^" => Some(5),
        _ => None,
    }
}

/// Recursive-descent parser over the token stream produced by the lexer.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Inside `if`/`for`/`switch` headers a `{` after a bare type name opens
    /// the block, not a composite literal.
    no_composite: bool,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            no_composite: false,
        }
    }

    // Token helpers

    fn peek(&self) -> &TokenKind {
        self.peek_at(0)
    }

    fn peek_at(&self, n: usize) -> &TokenKind {
        let index = (self.pos + n).min(self.tokens.len().saturating_sub(1));
        self.tokens
            .get(index)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.span.start)
            .unwrap_or(0)
    }

    fn prev_end(&self) -> usize {
        if self.pos == 0 {
            return 0;
        }
        self.tokens
            .get(self.pos - 1)
            .map(|t| t.span.end)
            .unwrap_or(0)
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        kind
    }

    fn at_op(&self, op: &str) -> bool {
        matches!(self.peek(), TokenKind::Op(o) if *o == op)
    }

    fn at_kw(&self, kw: &str) -> bool {
        matches!(self.peek(), TokenKind::Keyword(k) if *k == kw)
    }

    fn at_semi(&self) -> bool {
        matches!(self.peek(), TokenKind::Semi { .. })
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), TokenKind::Eof)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if self.at_op(op) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error<T>(&self, expected: &str) -> PResult<T> {
        Err(SyntaxError {
            message: format!("expected {}, found {}", expected, self.peek()),
            offset: self.offset(),
        })
    }

    fn expect_op(&mut self, op: &str) -> PResult<()> {
        if self.eat_op(op) {
            Ok(())
        } else {
            self.error(&format!("'{}'", op))
        }
    }

    fn expect_kw(&mut self, kw: &str) -> PResult<()> {
        if self.at_kw(kw) {
            self.advance();
            Ok(())
        } else {
            self.error(&format!("'{}'", kw))
        }
    }

    fn expect_ident(&mut self) -> PResult<String> {
        match self.peek() {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => self.error("identifier"),
        }
    }

    /// A statement terminator, which may be omitted before a closing `)` or `}`.
    fn expect_semi(&mut self) -> PResult<()> {
        match self.peek() {
            TokenKind::Semi { .. } => {
                self.advance();
                Ok(())
            }
            TokenKind::Op(")") | TokenKind::Op("}") | TokenKind::Eof => Ok(()),
            _ => self.error("';' or newline"),
        }
    }

    fn expect_eof(&mut self) -> PResult<()> {
        while self.at_semi() {
            self.advance();
        }
        if self.at_eof() {
            Ok(())
        } else {
            self.error("EOF")
        }
    }

    fn with_composites<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        let saved = std::mem::replace(&mut self.no_composite, false);
        let result = f(self);
        self.no_composite = saved;
        result
    }

    fn in_control_clause<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        let saved = std::mem::replace(&mut self.no_composite, true);
        let result = f(self);
        self.no_composite = saved;
        result
    }

    // Entry points

    pub fn parse_file(&mut self) -> PResult<File> {
        while self.at_semi() {
            self.advance();
        }
        self.expect_kw("package")?;
        let package = self.expect_ident()?;
        self.expect_semi()?;

        let mut imports = Vec::new();
        while self.at_kw("import") {
            self.advance();
            if self.eat_op("(") {
                while !self.at_op(")") {
                    imports.push(self.parse_import_spec()?);
                    self.expect_semi()?;
                }
                self.expect_op(")")?;
            } else {
                imports.push(self.parse_import_spec()?);
            }
            self.expect_semi()?;
        }

        let mut decls = Vec::new();
        while !self.at_eof() {
            if self.at_semi() {
                self.advance();
                continue;
            }
            decls.push(self.parse_decl()?);
            self.expect_semi()?;
        }

        Ok(File {
            package,
            imports,
            decls,
        })
    }

    pub fn parse_expr_only(&mut self) -> PResult<Expr> {
        let expr = self.parse_expr()?;
        self.expect_eof()?;
        Ok(expr)
    }

    pub fn parse_stmt_list_only(&mut self) -> PResult<Vec<Spanned<Stmt>>> {
        let stmts = self.parse_stmt_list()?;
        self.expect_eof()?;
        Ok(stmts)
    }

    /// Parses any number of top-level declarations, as found after the
    /// import section of a file.
    pub fn parse_decls_only(&mut self) -> PResult<Vec<Decl>> {
        let mut decls = Vec::new();
        loop {
            while self.at_semi() {
                self.advance();
            }
            if self.at_eof() {
                break;
            }
            decls.push(self.parse_decl()?);
            self.expect_semi()?;
        }
        Ok(decls)
    }

    // Declarations

    fn parse_import_spec(&mut self) -> PResult<ImportSpec> {
        let name = match self.peek() {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Some(name)
            }
            TokenKind::Op(".") => {
                self.advance();
                Some(".".to_string())
            }
            _ => None,
        };
        match self.peek() {
            TokenKind::Literal(LitKind::String, text) => {
                let path = unquote(text);
                self.advance();
                Ok(ImportSpec { name, path })
            }
            _ => self.error("import path"),
        }
    }

    fn parse_decl(&mut self) -> PResult<Decl> {
        match self.peek() {
            TokenKind::Keyword("func") => self.parse_func_decl().map(Decl::Func),
            TokenKind::Keyword("var" | "const" | "type") => self.parse_gen_decl().map(Decl::Gen),
            TokenKind::Keyword("import") => Err(SyntaxError {
                message: "imports must appear before other declarations".to_string(),
                offset: self.offset(),
            }),
            _ => self.error("declaration"),
        }
    }

    fn parse_func_decl(&mut self) -> PResult<FuncDecl> {
        let start = self.offset();
        self.expect_kw("func")?;

        let recv = if self.at_op("(") {
            let mut fields = self.parse_params()?;
            if fields.len() != 1 {
                return Err(SyntaxError {
                    message: "method has multiple receivers".to_string(),
                    offset: start,
                });
            }
            fields.pop()
        } else {
            None
        };

        let name = self.expect_ident()?;
        let type_params = if self.at_op("[") && recv.is_none() {
            self.parse_type_params()?
        } else {
            Vec::new()
        };
        let mut ty = self.parse_signature()?;
        ty.type_params = type_params;

        let body = if self.at_op("{") {
            Some(self.parse_block()?)
        } else {
            None
        };

        Ok(FuncDecl {
            recv,
            name,
            ty,
            body,
            span: Span::new(start, self.prev_end()),
        })
    }

    fn parse_gen_decl(&mut self) -> PResult<GenDecl> {
        let kind = match self.advance() {
            TokenKind::Keyword("var") => GenKind::Var,
            TokenKind::Keyword("const") => GenKind::Const,
            _ => GenKind::Type,
        };

        if self.eat_op("(") {
            let mut specs = Vec::new();
            loop {
                while self.at_semi() {
                    self.advance();
                }
                if self.at_op(")") {
                    break;
                }
                specs.push(self.parse_spec(kind)?);
                self.expect_semi()?;
            }
            self.expect_op(")")?;
            Ok(GenDecl {
                kind,
                specs,
                grouped: true,
            })
        } else {
            Ok(GenDecl {
                kind,
                specs: vec![self.parse_spec(kind)?],
                grouped: false,
            })
        }
    }

    fn parse_spec(&mut self, kind: GenKind) -> PResult<Spec> {
        if kind == GenKind::Type {
            let name = self.expect_ident()?;
            let type_params = if self.at_type_params() {
                self.parse_type_params()?
            } else {
                Vec::new()
            };
            let alias = self.eat_op("=");
            let ty = self.parse_type()?;
            return Ok(Spec::Type(TypeSpec {
                name,
                type_params,
                alias,
                ty,
            }));
        }

        let mut names = vec![self.expect_ident()?];
        while self.eat_op(",") {
            names.push(self.expect_ident()?);
        }
        let ty = if !self.at_op("=") && !self.at_semi() && !self.at_op(")") {
            Some(self.parse_type()?)
        } else {
            None
        };
        let values = if self.eat_op("=") {
            self.parse_expr_list()?
        } else {
            Vec::new()
        };
        if kind == GenKind::Var && ty.is_none() && values.is_empty() {
            return self.error("type");
        }
        Ok(Spec::Value(ValueSpec { names, ty, values }))
    }

    /// `type A[T any]` declares type parameters, `type A [N]T` an array.
    fn at_type_params(&self) -> bool {
        self.at_op("[")
            && matches!(self.peek_at(1), TokenKind::Ident(_))
            && !matches!(self.peek_at(2), TokenKind::Op("]"))
    }

    fn parse_type_params(&mut self) -> PResult<Vec<Field>> {
        self.expect_op("[")?;
        let mut fields = Vec::new();
        let mut pending = Vec::new();
        while !self.at_op("]") {
            let name = self.expect_ident()?;
            if self.at_op(",") || self.at_op("]") {
                pending.push(name);
            } else {
                pending.push(name);
                let constraint = self.parse_constraint()?;
                fields.push(Field {
                    names: std::mem::take(&mut pending),
                    ty: constraint,
                    tag: None,
                });
            }
            if !self.eat_op(",") {
                break;
            }
        }
        if !pending.is_empty() {
            return self.error("type constraint");
        }
        self.expect_op("]")?;
        Ok(fields)
    }

    /// A type or a union of `~T` terms.
    fn parse_constraint(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_constraint_term()?;
        while self.eat_op("|") {
            let rhs = self.parse_constraint_term()?;
            expr = Expr::Binary {
                op: "|",
                x: Box::new(expr),
                y: Box::new(rhs),
            };
        }
        Ok(expr)
    }

    fn parse_constraint_term(&mut self) -> PResult<Expr> {
        if self.eat_op("~") {
            let ty = self.parse_type()?;
            Ok(Expr::Unary {
                op: "~",
                x: Box::new(ty),
            })
        } else {
            self.parse_type()
        }
    }

    fn parse_signature(&mut self) -> PResult<FuncType> {
        let params = self.parse_params()?;
        let results = if self.at_op("(") {
            self.parse_params()?
        } else if self.at_type_start() {
            vec![Field::anonymous(self.parse_type()?)]
        } else {
            Vec::new()
        };
        Ok(FuncType {
            type_params: Vec::new(),
            params,
            results,
        })
    }

    fn at_type_start(&self) -> bool {
        match self.peek() {
            TokenKind::Ident(_) => true,
            TokenKind::Op(op) => matches!(*op, "*" | "[" | "(" | "<-"),
            TokenKind::Keyword(kw) => {
                matches!(*kw, "func" | "map" | "chan" | "struct" | "interface")
            }
            _ => false,
        }
    }

    fn parse_param_type(&mut self) -> PResult<Expr> {
        if self.eat_op("...") {
            let elem = self.parse_type()?;
            Ok(Expr::Ellipsis(Some(Box::new(elem))))
        } else {
            self.parse_type()
        }
    }

    /// Parameter lists group names the way the Go grammar does:
    /// `(a, b int, c string)` or `(int, string)`, never a mix.
    fn parse_params(&mut self) -> PResult<Vec<Field>> {
        self.expect_op("(")?;
        let mut items: Vec<(Option<String>, Expr)> = Vec::new();
        while !self.at_op(")") {
            let named = matches!(self.peek(), TokenKind::Ident(_))
                && !matches!(
                    self.peek_at(1),
                    TokenKind::Op(",") | TokenKind::Op(")") | TokenKind::Op(".")
                );
            if named {
                let name = self.expect_ident()?;
                let ty = self.parse_param_type()?;
                items.push((Some(name), ty));
            } else {
                items.push((None, self.parse_param_type()?));
            }
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op(")")?;

        if items.iter().all(|(name, _)| name.is_none()) {
            return Ok(items
                .into_iter()
                .map(|(_, ty)| Field::anonymous(ty))
                .collect());
        }

        let mut fields = Vec::new();
        let mut pending = Vec::new();
        for (name, ty) in items {
            match name {
                Some(name) => {
                    pending.push(name);
                    fields.push(Field {
                        names: std::mem::take(&mut pending),
                        ty,
                        tag: None,
                    });
                }
                None => match ty {
                    Expr::Ident(name) => pending.push(name),
                    _ => {
                        return Err(SyntaxError {
                            message: "mixed named and unnamed parameters".to_string(),
                            offset: self.prev_end(),
                        });
                    }
                },
            }
        }
        if !pending.is_empty() {
            return Err(SyntaxError {
                message: "mixed named and unnamed parameters".to_string(),
                offset: self.prev_end(),
            });
        }
        Ok(fields)
    }

    // Types

    pub fn parse_type(&mut self) -> PResult<Expr> {
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                let mut ty = Expr::Ident(name);
                if self.at_op(".") {
                    self.advance();
                    let sel = self.expect_ident()?;
                    ty = Expr::Selector {
                        x: Box::new(ty),
                        sel,
                    };
                }
                if self.at_op("[") {
                    self.advance();
                    let indices = self.with_composites(|p| {
                        let mut indices = vec![p.parse_type()?];
                        while p.eat_op(",") {
                            if p.at_op("]") {
                                break;
                            }
                            indices.push(p.parse_type()?);
                        }
                        Ok(indices)
                    })?;
                    self.expect_op("]")?;
                    ty = Expr::Index {
                        x: Box::new(ty),
                        indices,
                    };
                }
                Ok(ty)
            }
            TokenKind::Op("*") => {
                self.advance();
                Ok(Expr::Star(Box::new(self.parse_type()?)))
            }
            TokenKind::Op("(") => {
                self.advance();
                let inner = self.with_composites(|p| p.parse_type())?;
                self.expect_op(")")?;
                Ok(Expr::Paren(Box::new(inner)))
            }
            TokenKind::Op("[") => self.parse_array_type(),
            TokenKind::Op("<-") => {
                self.advance();
                self.expect_kw("chan")?;
                let value = self.parse_type()?;
                Ok(Expr::ChanType {
                    dir: ChanDir::Recv,
                    value: Box::new(value),
                })
            }
            TokenKind::Keyword("map") => self.parse_map_type(),
            TokenKind::Keyword("chan") => self.parse_chan_type(),
            TokenKind::Keyword("func") => {
                self.advance();
                Ok(Expr::FuncType(self.parse_signature()?))
            }
            TokenKind::Keyword("struct") => self.parse_struct_type(),
            TokenKind::Keyword("interface") => self.parse_interface_type(),
            _ => self.error("type"),
        }
    }

    fn parse_array_type(&mut self) -> PResult<Expr> {
        self.expect_op("[")?;
        let len = if self.at_op("]") {
            None
        } else if self.eat_op("...") {
            Some(Box::new(Expr::Ellipsis(None)))
        } else {
            Some(Box::new(self.with_composites(|p| p.parse_expr())?))
        };
        self.expect_op("]")?;
        let elem = self.parse_type()?;
        Ok(Expr::ArrayType {
            len,
            elem: Box::new(elem),
        })
    }

    fn parse_map_type(&mut self) -> PResult<Expr> {
        self.expect_kw("map")?;
        self.expect_op("[")?;
        let key = self.with_composites(|p| p.parse_type())?;
        self.expect_op("]")?;
        let value = self.parse_type()?;
        Ok(Expr::MapType {
            key: Box::new(key),
            value: Box::new(value),
        })
    }

    fn parse_chan_type(&mut self) -> PResult<Expr> {
        self.expect_kw("chan")?;
        let dir = if self.eat_op("<-") {
            ChanDir::Send
        } else {
            ChanDir::Both
        };
        let value = self.parse_type()?;
        Ok(Expr::ChanType {
            dir,
            value: Box::new(value),
        })
    }

    fn parse_struct_type(&mut self) -> PResult<Expr> {
        self.expect_kw("struct")?;
        self.expect_op("{")?;
        let mut fields = Vec::new();
        loop {
            while self.at_semi() {
                self.advance();
            }
            if self.at_op("}") {
                break;
            }
            fields.push(self.parse_struct_field()?);
            self.expect_semi()?;
        }
        self.expect_op("}")?;
        Ok(Expr::StructType(fields))
    }

    fn parse_struct_field(&mut self) -> PResult<Field> {
        let named = matches!(self.peek(), TokenKind::Ident(_))
            && match self.peek_at(1) {
                TokenKind::Op(",") => true,
                TokenKind::Op(op) => matches!(*op, "*" | "[" | "(" | "<-"),
                TokenKind::Ident(_) => true,
                TokenKind::Keyword(kw) => {
                    matches!(*kw, "func" | "map" | "chan" | "struct" | "interface")
                }
                _ => false,
            };

        let (names, ty) = if named {
            let mut names = vec![self.expect_ident()?];
            while self.eat_op(",") {
                names.push(self.expect_ident()?);
            }
            (names, self.parse_type()?)
        } else {
            (Vec::new(), self.parse_type()?)
        };

        let tag = match self.peek() {
            TokenKind::Literal(LitKind::String, text) => {
                let text = text.clone();
                self.advance();
                Some(text)
            }
            _ => None,
        };
        Ok(Field { names, ty, tag })
    }

    fn parse_interface_type(&mut self) -> PResult<Expr> {
        self.expect_kw("interface")?;
        self.expect_op("{")?;
        let mut elems = Vec::new();
        loop {
            while self.at_semi() {
                self.advance();
            }
            if self.at_op("}") {
                break;
            }
            let is_method = matches!(self.peek(), TokenKind::Ident(_))
                && matches!(self.peek_at(1), TokenKind::Op("("));
            if is_method {
                let name = self.expect_ident()?;
                let ty = self.parse_signature()?;
                elems.push(InterfaceElem::Method { name, ty });
            } else {
                elems.push(InterfaceElem::Embed(self.parse_constraint()?));
            }
            self.expect_semi()?;
        }
        self.expect_op("}")?;
        Ok(Expr::InterfaceType(elems))
    }

    // Expressions

    pub fn parse_expr(&mut self) -> PResult<Expr> {
        self.parse_binary(1)
    }

    fn parse_expr_list(&mut self) -> PResult<Vec<Expr>> {
        let mut list = vec![self.parse_expr()?];
        while self.eat_op(",") {
            list.push(self.parse_expr()?);
        }
        Ok(list)
    }

    fn parse_binary(&mut self, min_prec: u8) -> PResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                TokenKind::Op(op) => *op,
                _ => break,
            };
            let prec = match binary_precedence(op) {
                Some(prec) if prec >= min_prec => prec,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_binary(prec + 1)?;
            lhs = Expr::Binary {
                op,
                x: Box::new(lhs),
                y: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        match self.peek() {
            TokenKind::Op(op @ ("+" | "-" | "!" | "^" | "&")) => {
                let op = *op;
                self.advance();
                let x = self.parse_unary()?;
                Ok(Expr::Unary { op, x: Box::new(x) })
            }
            TokenKind::Op("*") => {
                self.advance();
                let x = self.parse_unary()?;
                Ok(Expr::Star(Box::new(x)))
            }
            TokenKind::Op("<-") => {
                if matches!(self.peek_at(1), TokenKind::Keyword("chan")) {
                    let ty = self.parse_type()?;
                    return self.parse_postfix(ty);
                }
                self.advance();
                let x = self.parse_unary()?;
                Ok(Expr::Unary {
                    op: "<-",
                    x: Box::new(x),
                })
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_operand(&mut self) -> PResult<Expr> {
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Expr::Ident(name))
            }
            TokenKind::Literal(kind, value) => {
                self.advance();
                Ok(Expr::BasicLit { kind, value })
            }
            TokenKind::Op("(") => {
                self.advance();
                let inner = self.with_composites(|p| p.parse_expr_or_type())?;
                self.expect_op(")")?;
                Ok(Expr::Paren(Box::new(inner)))
            }
            TokenKind::Keyword("func") => {
                self.advance();
                let ty = self.parse_signature()?;
                if self.at_op("{") {
                    let body = self.with_composites(|p| p.parse_block())?;
                    Ok(Expr::FuncLit { ty, body })
                } else {
                    Ok(Expr::FuncType(ty))
                }
            }
            TokenKind::Op("[")
            | TokenKind::Keyword("map")
            | TokenKind::Keyword("chan")
            | TokenKind::Keyword("struct")
            | TokenKind::Keyword("interface") => self.parse_type(),
            _ => self.error("expression"),
        }
    }

    /// Inside parentheses `*T` and `[]T` are both valid; the expression
    /// grammar already covers them.
    fn parse_expr_or_type(&mut self) -> PResult<Expr> {
        self.parse_expr()
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let operand = self.parse_operand()?;
        self.parse_postfix(operand)
    }

    fn parse_postfix(&mut self, mut x: Expr) -> PResult<Expr> {
        loop {
            match self.peek() {
                TokenKind::Op(".") => {
                    self.advance();
                    match self.peek().clone() {
                        TokenKind::Ident(sel) => {
                            self.advance();
                            x = Expr::Selector {
                                x: Box::new(x),
                                sel,
                            };
                        }
                        TokenKind::Op("(") => {
                            self.advance();
                            let ty = if self.at_kw("type") {
                                self.advance();
                                None
                            } else {
                                Some(Box::new(self.with_composites(|p| p.parse_type())?))
                            };
                            self.expect_op(")")?;
                            x = Expr::TypeAssert { x: Box::new(x), ty };
                        }
                        _ => return self.error("selector or type assertion"),
                    }
                }
                TokenKind::Op("[") => {
                    self.advance();
                    x = self.with_composites(|p| p.parse_index_or_slice(x))?;
                }
                TokenKind::Op("(") => {
                    self.advance();
                    x = self.with_composites(|p| p.parse_call(x))?;
                }
                TokenKind::Op("{") if self.composite_allowed(&x) => {
                    x = self.with_composites(|p| p.parse_composite_lit(Some(x)))?;
                }
                _ => return Ok(x),
            }
        }
    }

    fn composite_allowed(&self, ty: &Expr) -> bool {
        let is_type_name = match ty {
            Expr::Ident(_) => true,
            Expr::Selector { x, .. } => matches!(**x, Expr::Ident(_)),
            _ => false,
        };
        let is_literal_type = match ty {
            Expr::Ident(_)
            | Expr::ArrayType { .. }
            | Expr::StructType(_)
            | Expr::MapType { .. } => true,
            Expr::Selector { x, .. } => matches!(**x, Expr::Ident(_)),
            Expr::Index { x, .. } => {
                matches!(**x, Expr::Ident(_) | Expr::Selector { .. })
            }
            _ => false,
        };
        is_literal_type && (!self.no_composite || !is_type_name)
    }

    fn parse_index_or_slice(&mut self, x: Expr) -> PResult<Expr> {
        let mut bounds: Vec<Option<Box<Expr>>> = Vec::new();
        let mut colons = 0;
        let first = if self.at_op(":") {
            None
        } else {
            Some(Box::new(self.parse_expr_or_type()?))
        };

        if self.at_op(",") || self.at_op("]") {
            let mut indices = vec![*first.ok_or_else(|| SyntaxError {
                message: "expected operand".to_string(),
                offset: self.offset(),
            })?];
            while self.eat_op(",") {
                if self.at_op("]") {
                    break;
                }
                indices.push(self.parse_expr_or_type()?);
            }
            self.expect_op("]")?;
            return Ok(Expr::Index {
                x: Box::new(x),
                indices,
            });
        }

        bounds.push(first);
        while self.eat_op(":") {
            colons += 1;
            if colons > 2 {
                return self.error("']'");
            }
            if self.at_op(":") || self.at_op("]") {
                bounds.push(None);
            } else {
                bounds.push(Some(Box::new(self.parse_expr()?)));
            }
        }
        self.expect_op("]")?;

        let three = colons == 2;
        let mut bounds = bounds.into_iter();
        let low = bounds.next().flatten();
        let high = bounds.next().flatten();
        let max = bounds.next().flatten();
        if three && (high.is_none() || max.is_none()) {
            return Err(SyntaxError {
                message: "middle and final index required in 3-index slice".to_string(),
                offset: self.prev_end(),
            });
        }
        Ok(Expr::Slice {
            x: Box::new(x),
            low,
            high,
            max,
            three,
        })
    }

    fn parse_call(&mut self, fun: Expr) -> PResult<Expr> {
        let mut args = Vec::new();
        let mut ellipsis = false;
        while !self.at_op(")") {
            args.push(self.parse_expr_or_type()?);
            if self.eat_op("...") {
                ellipsis = true;
            }
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op(")")?;
        Ok(Expr::Call {
            fun: Box::new(fun),
            args,
            ellipsis,
        })
    }

    fn parse_composite_lit(&mut self, ty: Option<Expr>) -> PResult<Expr> {
        self.expect_op("{")?;
        let mut elts = Vec::new();
        while !self.at_op("}") {
            let elt = self.parse_element()?;
            if self.eat_op(":") {
                let value = self.parse_element()?;
                elts.push(Expr::KeyValue {
                    key: Box::new(elt),
                    value: Box::new(value),
                });
            } else {
                elts.push(elt);
            }
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op("}")?;
        Ok(Expr::CompositeLit {
            ty: ty.map(Box::new),
            elts,
        })
    }

    fn parse_element(&mut self) -> PResult<Expr> {
        if self.at_op("{") {
            self.parse_composite_lit(None)
        } else {
            self.parse_expr()
        }
    }

    // Statements

    fn parse_block(&mut self) -> PResult<Block> {
        self.expect_op("{")?;
        let stmts = self.with_composites(|p| p.parse_stmt_list())?;
        self.expect_op("}")?;
        Ok(Block { stmts })
    }

    pub fn parse_stmt_list(&mut self) -> PResult<Vec<Spanned<Stmt>>> {
        let mut stmts = Vec::new();
        loop {
            while self.at_semi() {
                self.advance();
            }
            if self.at_eof()
                || self.at_op("}")
                || self.at_kw("case")
                || self.at_kw("default")
            {
                break;
            }
            let start = self.offset();
            let stmt = self.parse_stmt()?;
            let span = Span::new(start, self.prev_end());
            if !matches!(stmt, Stmt::Empty) {
                stmts.push((stmt, span));
            }
            if !(self.at_kw("case") || self.at_kw("default")) {
                self.expect_semi()?;
            }
        }
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> PResult<Stmt> {
        match self.peek().clone() {
            TokenKind::Keyword(kw) => match kw {
                "var" | "const" | "type" => self.parse_gen_decl().map(Stmt::Decl),
                "go" => {
                    self.advance();
                    self.parse_expr().map(Stmt::Go)
                }
                "defer" => {
                    self.advance();
                    self.parse_expr().map(Stmt::Defer)
                }
                "return" => {
                    self.advance();
                    if self.at_semi() || self.at_op("}") || self.at_eof() {
                        Ok(Stmt::Return(Vec::new()))
                    } else {
                        self.parse_expr_list().map(Stmt::Return)
                    }
                }
                "break" | "continue" | "goto" => {
                    self.advance();
                    let label = match self.peek() {
                        TokenKind::Ident(name) => {
                            let name = name.clone();
                            self.advance();
                            Some(name)
                        }
                        _ => None,
                    };
                    Ok(Stmt::Branch { keyword: kw, label })
                }
                "fallthrough" => {
                    self.advance();
                    Ok(Stmt::Branch {
                        keyword: kw,
                        label: None,
                    })
                }
                "if" => self.parse_if(),
                "switch" => self.parse_switch(),
                "select" => self.parse_select(),
                "for" => self.parse_for(),
                "func" | "map" | "chan" | "struct" | "interface" => {
                    self.parse_simple_stmt(true, false)
                }
                _ => self.error("statement"),
            },
            TokenKind::Op("{") => self.parse_block().map(Stmt::Block),
            TokenKind::Semi { .. } => Ok(Stmt::Empty),
            _ => self.parse_simple_stmt(true, false),
        }
    }

    /// Expression, send, inc/dec, assignment or labeled statement.
    /// An assignment whose right side starts with `range` comes back as a
    /// `Range` statement with an empty body for the `for` parser to fill.
    fn parse_simple_stmt(&mut self, labels: bool, range_ok: bool) -> PResult<Stmt> {
        let lhs = self.parse_expr_list()?;

        let op = match self.peek() {
            TokenKind::Op(op) => *op,
            _ => return single_expr(lhs, self.offset()).map(Stmt::Expr),
        };

        if ASSIGN_OPS.contains(&op) {
            let op_offset = self.offset();
            self.advance();
            if (op == ":=" || op == "=") && self.at_kw("range") {
                if !range_ok {
                    return self.error("expression");
                }
                self.advance();
                let x = self.parse_expr()?;
                if lhs.len() > 2 {
                    return Err(SyntaxError {
                        message: "range clause permits at most two iteration variables"
                            .to_string(),
                        offset: op_offset,
                    });
                }
                let mut vars = lhs.into_iter();
                return Ok(Stmt::Range {
                    key: vars.next(),
                    value: vars.next(),
                    define: op == ":=",
                    x,
                    body: Block::default(),
                });
            }
            let rhs = self.parse_expr_list()?;
            let op = ASSIGN_OPS
                .iter()
                .find(|candidate| **candidate == op)
                .copied()
                .unwrap_or("=");
            return Ok(Stmt::Assign { lhs, op, rhs });
        }

        match op {
            ":" if labels && lhs.len() == 1 && matches!(lhs[0], Expr::Ident(_)) => {
                self.advance();
                let label = match lhs.into_iter().next() {
                    Some(Expr::Ident(name)) => name,
                    _ => return self.error("label"),
                };
                let start = self.offset();
                let stmt = if self.at_op("}") {
                    Stmt::Empty
                } else {
                    self.parse_stmt()?
                };
                let span = Span::new(start, self.prev_end());
                Ok(Stmt::Labeled {
                    label,
                    stmt: Box::new((stmt, span)),
                })
            }
            "<-" => {
                let chan = single_expr(lhs, self.offset())?;
                self.advance();
                let value = self.parse_expr()?;
                Ok(Stmt::Send { chan, value })
            }
            "++" | "--" => {
                let x = single_expr(lhs, self.offset())?;
                self.advance();
                Ok(Stmt::IncDec { x, inc: op == "++" })
            }
            _ => single_expr(lhs, self.offset()).map(Stmt::Expr),
        }
    }

    fn parse_if(&mut self) -> PResult<Stmt> {
        self.expect_kw("if")?;
        let (init, cond) = self.in_control_clause(|p| {
            if p.at_op("{") {
                return p.error("condition");
            }
            let first = if p.at_semi() {
                None
            } else {
                Some(p.parse_simple_stmt(false, false)?)
            };
            if p.at_semi() {
                p.advance();
                let cond = p.parse_expr()?;
                Ok((first.map(Box::new), cond))
            } else {
                match first {
                    Some(Stmt::Expr(cond)) => Ok((None, cond)),
                    _ => p.error("condition"),
                }
            }
        })?;
        let then = self.parse_block()?;
        let els = if self.at_kw("else") {
            self.advance();
            if self.at_kw("if") {
                Some(Box::new(self.parse_if()?))
            } else if self.at_op("{") {
                Some(Box::new(Stmt::Block(self.parse_block()?)))
            } else {
                return self.error("if statement or block");
            }
        } else {
            None
        };
        Ok(Stmt::If {
            init,
            cond,
            then,
            els,
        })
    }

    fn parse_switch(&mut self) -> PResult<Stmt> {
        self.expect_kw("switch")?;
        let (init, tag) = self.in_control_clause(|p| {
            let mut init = None;
            let mut tag = None;
            if !p.at_op("{") {
                let first = if p.at_semi() {
                    None
                } else {
                    Some(p.parse_simple_stmt(false, false)?)
                };
                if p.at_semi() {
                    p.advance();
                    init = first;
                    if !p.at_op("{") {
                        tag = Some(p.parse_simple_stmt(false, false)?);
                    }
                } else {
                    tag = first;
                }
            }
            Ok((init.map(Box::new), tag))
        })?;

        let type_switch = match &tag {
            Some(Stmt::Expr(Expr::TypeAssert { ty: None, .. })) => true,
            Some(Stmt::Assign { op: ":=", lhs, rhs }) => {
                lhs.len() == 1
                    && rhs.len() == 1
                    && matches!(rhs[0], Expr::TypeAssert { ty: None, .. })
            }
            _ => false,
        };

        let body = self.parse_case_clauses()?;

        match tag {
            Some(assign) if type_switch => Ok(Stmt::TypeSwitch {
                init,
                assign: Box::new(assign),
                body,
            }),
            Some(Stmt::Expr(tag)) => Ok(Stmt::Switch {
                init,
                tag: Some(tag),
                body,
            }),
            None => Ok(Stmt::Switch {
                init,
                tag: None,
                body,
            }),
            Some(_) => Err(SyntaxError {
                message: "switch expression must be an expression".to_string(),
                offset: self.offset(),
            }),
        }
    }

    fn parse_case_clauses(&mut self) -> PResult<Vec<CaseClause>> {
        self.expect_op("{")?;
        let mut clauses = Vec::new();
        loop {
            while self.at_semi() {
                self.advance();
            }
            if self.at_op("}") {
                break;
            }
            let list = if self.at_kw("case") {
                self.advance();
                let list = self.with_composites(|p| p.parse_expr_list())?;
                Some(list)
            } else if self.at_kw("default") {
                self.advance();
                None
            } else {
                return self.error("'case' or 'default'");
            };
            self.expect_op(":")?;
            let body = self.with_composites(|p| p.parse_stmt_list())?;
            clauses.push(CaseClause { list, body });
        }
        self.expect_op("}")?;
        Ok(clauses)
    }

    fn parse_select(&mut self) -> PResult<Stmt> {
        self.expect_kw("select")?;
        self.expect_op("{")?;
        let mut clauses = Vec::new();
        loop {
            while self.at_semi() {
                self.advance();
            }
            if self.at_op("}") {
                break;
            }
            let comm = if self.at_kw("case") {
                self.advance();
                Some(Box::new(self.with_composites(|p| p.parse_simple_stmt(false, false))?))
            } else if self.at_kw("default") {
                self.advance();
                None
            } else {
                return self.error("'case' or 'default'");
            };
            self.expect_op(":")?;
            let body = self.with_composites(|p| p.parse_stmt_list())?;
            clauses.push(CommClause { comm, body });
        }
        self.expect_op("}")?;
        Ok(Stmt::Select { body: clauses })
    }

    fn parse_for(&mut self) -> PResult<Stmt> {
        self.expect_kw("for")?;
        if self.at_op("{") {
            let body = self.parse_block()?;
            return Ok(Stmt::For {
                init: None,
                cond: None,
                post: None,
                body,
            });
        }

        let header = self.in_control_clause(|p| {
            if p.at_kw("range") {
                p.advance();
                let x = p.parse_expr()?;
                return Ok(Stmt::Range {
                    key: None,
                    value: None,
                    define: false,
                    x,
                    body: Block::default(),
                });
            }

            let first = if p.at_semi() {
                None
            } else {
                Some(p.parse_simple_stmt(false, true)?)
            };
            if let Some(range @ Stmt::Range { .. }) = first {
                return Ok(range);
            }

            if p.at_semi() {
                p.advance();
                let cond = if p.at_semi() {
                    None
                } else {
                    Some(p.parse_expr()?)
                };
                if !p.at_semi() {
                    return p.error("';'");
                }
                p.advance();
                let post = if p.at_op("{") {
                    None
                } else {
                    Some(Box::new(p.parse_simple_stmt(false, false)?))
                };
                return Ok(Stmt::For {
                    init: first.map(Box::new),
                    cond,
                    post,
                    body: Block::default(),
                });
            }

            match first {
                Some(Stmt::Expr(cond)) => Ok(Stmt::For {
                    init: None,
                    cond: Some(cond),
                    post: None,
                    body: Block::default(),
                }),
                _ => p.error("for loop condition"),
            }
        })?;

        let block = self.parse_block()?;
        Ok(match header {
            Stmt::Range {
                key,
                value,
                define,
                x,
                ..
            } => Stmt::Range {
                key,
                value,
                define,
                x,
                body: block,
            },
            Stmt::For {
                init, cond, post, ..
            } => Stmt::For {
                init,
                cond,
                post,
                body: block,
            },
            other => other,
        })
    }
}

fn single_expr(mut list: Vec<Expr>, offset: usize) -> PResult<Expr> {
    if list.len() == 1 {
        if let Some(expr) = list.pop() {
            return Ok(expr);
        }
    }
    Err(SyntaxError {
        message: format!("expected 1 expression, found {}", list.len()),
        offset,
    })
}

/// Strips the quotes from an import path literal.
pub fn unquote(text: &str) -> String {
    let inner = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .or_else(|| text.strip_prefix('`').and_then(|t| t.strip_suffix('`')))
        .unwrap_or(text);
    inner.replace("\\\"", "\"").replace("\\\\", "\\")
}
