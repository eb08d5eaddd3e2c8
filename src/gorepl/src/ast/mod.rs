//! Syntax tree for a single Go compilation unit.
//!
//! The tree follows the shape of Go's own `go/ast` closely enough that the
//! renderer can print it back out and the parser can read that output again.
//! Types are expressions, as in Go's grammar, so `[]int{1}` and `[]byte(s)`
//! need no special cases.

pub mod visit;

use std::fmt;

/// Byte range of a node in the source it was parsed from.
///
/// Nodes built in memory carry [`Span::dummy`] until the next re-parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn dummy() -> Self {
        Self {
            start: usize::MAX,
            end: usize::MAX,
        }
    }

    pub fn is_dummy(&self) -> bool {
        self.start == usize::MAX
    }

    pub fn to_byte_range(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

pub type Spanned<T> = (T, Span);

#[derive(Debug, Clone, PartialEq)]
pub struct File {
    pub package: String,
    pub imports: Vec<ImportSpec>,
    pub decls: Vec<Decl>,
}

impl File {
    /// Finds a top-level function (not a method) by name.
    pub fn func(&self, name: &str) -> Option<&FuncDecl> {
        self.decls.iter().find_map(|decl| match decl {
            Decl::Func(func) if func.recv.is_none() && func.name == name => Some(func),
            _ => None,
        })
    }

    pub fn func_mut(&mut self, name: &str) -> Option<&mut FuncDecl> {
        self.decls.iter_mut().find_map(|decl| match decl {
            Decl::Func(func) if func.recv.is_none() && func.name == name => Some(func),
            _ => None,
        })
    }

    /// Removes a top-level function by name, returning whether one was found.
    pub fn remove_func(&mut self, name: &str) -> bool {
        let before = self.decls.len();
        self.decls.retain(|decl| {
            !matches!(decl, Decl::Func(func) if func.recv.is_none() && func.name == name)
        });
        self.decls.len() != before
    }

    /// Package-level names introduced by this file, methods excluded.
    pub fn declared_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for decl in &self.decls {
            match decl {
                Decl::Func(func) if func.recv.is_none() => names.push(func.name.clone()),
                Decl::Func(_) => {}
                Decl::Gen(gen_decl) => {
                    for spec in &gen_decl.specs {
                        match spec {
                            Spec::Value(value) => names.extend(value.names.iter().cloned()),
                            Spec::Type(ty) => names.push(ty.name.clone()),
                        }
                    }
                }
            }
        }
        names
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportSpec {
    /// Explicit local name: an identifier, `_` or `.`.
    pub name: Option<String>,
    /// Import path without quotes.
    pub path: String,
}

impl ImportSpec {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            name: None,
            path: path.into(),
        }
    }

    pub fn named(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            path: path.into(),
        }
    }

    /// The identifier code uses to refer to this import.
    pub fn package_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => assumed_package_name(&self.path),
        }
    }

    /// Blank and dot imports are never reported as unused.
    pub fn is_side_effect(&self) -> bool {
        matches!(self.name.as_deref(), Some("_") | Some("."))
    }
}

/// Guesses a package name from its import path the way goimports does:
/// last element, skipping a `vN` major-version suffix, without a `go-`
/// prefix, cut at the first character that cannot appear in an identifier.
pub fn assumed_package_name(path: &str) -> String {
    let mut elems: Vec<&str> = path.split('/').filter(|e| !e.is_empty()).collect();
    let mut base = elems.pop().unwrap_or(path);
    if let Some(version) = base.strip_prefix('v') {
        if !version.is_empty() && version.chars().all(|c| c.is_ascii_digit()) {
            if let Some(parent) = elems.pop() {
                base = parent;
            }
        }
    }
    let base = base.strip_prefix("go-").unwrap_or(base);
    let end = base
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(base.len());
    base[..end].to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Func(FuncDecl),
    Gen(GenDecl),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub recv: Option<Field>,
    pub name: String,
    pub ty: FuncType,
    pub body: Option<Block>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FuncType {
    pub type_params: Vec<Field>,
    pub params: Vec<Field>,
    pub results: Vec<Field>,
}

/// A parameter, result, struct field or type parameter group.
///
/// An empty `names` list means an anonymous parameter or an embedded field.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub names: Vec<String>,
    pub ty: Expr,
    pub tag: Option<String>,
}

impl Field {
    pub fn anonymous(ty: Expr) -> Self {
        Self {
            names: Vec::new(),
            ty,
            tag: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenKind {
    Var,
    Const,
    Type,
}

impl GenKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            GenKind::Var => "var",
            GenKind::Const => "const",
            GenKind::Type => "type",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenDecl {
    pub kind: GenKind,
    pub specs: Vec<Spec>,
    pub grouped: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Spec {
    Value(ValueSpec),
    Type(TypeSpec),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueSpec {
    pub names: Vec<String>,
    pub ty: Option<Expr>,
    pub values: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeSpec {
    pub name: String,
    pub type_params: Vec<Field>,
    pub alias: bool,
    pub ty: Expr,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub stmts: Vec<Spanned<Stmt>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Empty,
    Expr(Expr),
    Send {
        chan: Expr,
        value: Expr,
    },
    IncDec {
        x: Expr,
        inc: bool,
    },
    /// `=`, `:=` and the compound assignment operators.
    Assign {
        lhs: Vec<Expr>,
        op: &'static str,
        rhs: Vec<Expr>,
    },
    Decl(GenDecl),
    Labeled {
        label: String,
        stmt: Box<Spanned<Stmt>>,
    },
    Go(Expr),
    Defer(Expr),
    Return(Vec<Expr>),
    /// `break`, `continue`, `goto` or `fallthrough`.
    Branch {
        keyword: &'static str,
        label: Option<String>,
    },
    Block(Block),
    If {
        init: Option<Box<Stmt>>,
        cond: Expr,
        then: Block,
        /// Either another `If` or a `Block`.
        els: Option<Box<Stmt>>,
    },
    Switch {
        init: Option<Box<Stmt>>,
        tag: Option<Expr>,
        body: Vec<CaseClause>,
    },
    TypeSwitch {
        init: Option<Box<Stmt>>,
        /// `x.(type)` or `v := x.(type)`.
        assign: Box<Stmt>,
        body: Vec<CaseClause>,
    },
    Select {
        body: Vec<CommClause>,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        post: Option<Box<Stmt>>,
        body: Block,
    },
    Range {
        key: Option<Expr>,
        value: Option<Expr>,
        define: bool,
        x: Expr,
        body: Block,
    },
}

impl Stmt {
    /// Names bound by a top-level `:=` or `var` statement, blanks excluded.
    pub fn defined_names(&self) -> Vec<String> {
        match self {
            Stmt::Assign { lhs, op: ":=", .. } => lhs
                .iter()
                .filter_map(Expr::as_ident)
                .filter(|name| *name != "_")
                .map(str::to_string)
                .collect(),
            Stmt::Decl(GenDecl {
                kind: GenKind::Var,
                specs,
                ..
            }) => specs
                .iter()
                .filter_map(|spec| match spec {
                    Spec::Value(value) => Some(value.names.iter()),
                    Spec::Type(_) => None,
                })
                .flatten()
                .filter(|name| name.as_str() != "_")
                .cloned()
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseClause {
    /// `None` for `default:`.
    pub list: Option<Vec<Expr>>,
    pub body: Vec<Spanned<Stmt>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommClause {
    /// `None` for `default:`.
    pub comm: Option<Box<Stmt>>,
    pub body: Vec<Spanned<Stmt>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LitKind {
    Int,
    Float,
    Imag,
    Rune,
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InterfaceElem {
    Method { name: String, ty: FuncType },
    /// Embedded interface or type-set term such as `~int | ~string`.
    Embed(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Ident(String),
    BasicLit {
        kind: LitKind,
        value: String,
    },
    CompositeLit {
        ty: Option<Box<Expr>>,
        elts: Vec<Expr>,
    },
    KeyValue {
        key: Box<Expr>,
        value: Box<Expr>,
    },
    FuncLit {
        ty: FuncType,
        body: Block,
    },
    Paren(Box<Expr>),
    Selector {
        x: Box<Expr>,
        sel: String,
    },
    /// Index expression or generic instantiation.
    Index {
        x: Box<Expr>,
        indices: Vec<Expr>,
    },
    Slice {
        x: Box<Expr>,
        low: Option<Box<Expr>>,
        high: Option<Box<Expr>>,
        max: Option<Box<Expr>>,
        three: bool,
    },
    /// `x.(T)`, or `x.(type)` inside a type switch when `ty` is `None`.
    TypeAssert {
        x: Box<Expr>,
        ty: Option<Box<Expr>>,
    },
    Call {
        fun: Box<Expr>,
        args: Vec<Expr>,
        ellipsis: bool,
    },
    /// Pointer type or dereference.
    Star(Box<Expr>),
    Unary {
        op: &'static str,
        x: Box<Expr>,
    },
    Binary {
        op: &'static str,
        x: Box<Expr>,
        y: Box<Expr>,
    },
    /// `[]T` when `len` is `None`, `[N]T` or `[...]T` otherwise.
    ArrayType {
        len: Option<Box<Expr>>,
        elem: Box<Expr>,
    },
    /// `...T` in a parameter list, or the `...` of `[...]T`.
    Ellipsis(Option<Box<Expr>>),
    MapType {
        key: Box<Expr>,
        value: Box<Expr>,
    },
    ChanType {
        dir: ChanDir,
        value: Box<Expr>,
    },
    FuncType(FuncType),
    StructType(Vec<Field>),
    InterfaceType(Vec<InterfaceElem>),
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident(name.into())
    }

    pub fn call(fun: Expr, args: Vec<Expr>) -> Self {
        Expr::Call {
            fun: Box::new(fun),
            args,
            ellipsis: false,
        }
    }

    pub fn string_lit(text: &str) -> Self {
        Expr::BasicLit {
            kind: LitKind::String,
            value: format!("{:?}", text),
        }
    }

    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Expr::Ident(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.as_ident() == Some("_")
    }

    /// True for calls of the named function with any arguments.
    pub fn is_call_to(&self, name: &str) -> bool {
        matches!(self, Expr::Call { fun, .. } if fun.as_ident() == Some(name))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", crate::compiler::render::expr_to_string(self))
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", crate::compiler::render::stmt_to_string(self))
    }
}

impl fmt::Display for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", crate::compiler::render::render_file(self, false))
    }
}
