use super::{
    Block, CaseClause, CommClause, Decl, Expr, Field, File, FuncType, GenDecl, InterfaceElem,
    Spec, Stmt,
};

/// Callbacks for a pre-order walk over the tree.
///
/// `visit_declared` sees every name introduced in some scope: package-level
/// declarations, parameters, `:=` targets, range variables and type
/// parameters. Struct field and method names are not reported.
pub trait Visitor {
    fn visit_expr(&mut self, _expr: &Expr) {}
    fn visit_stmt(&mut self, _stmt: &Stmt) {}
    fn visit_declared(&mut self, _name: &str) {}
}

pub fn walk_file<V: Visitor + ?Sized>(visitor: &mut V, file: &File) {
    for decl in &file.decls {
        walk_decl(visitor, decl);
    }
}

pub fn walk_decl<V: Visitor + ?Sized>(visitor: &mut V, decl: &Decl) {
    match decl {
        Decl::Func(func) => {
            if let Some(recv) = &func.recv {
                walk_field(visitor, recv, true);
            }
            if func.recv.is_none() {
                visitor.visit_declared(&func.name);
            }
            walk_func_type(visitor, &func.ty);
            if let Some(body) = &func.body {
                walk_block(visitor, body);
            }
        }
        Decl::Gen(gen_decl) => walk_gen_decl(visitor, gen_decl),
    }
}

pub fn walk_gen_decl<V: Visitor + ?Sized>(visitor: &mut V, gen_decl: &GenDecl) {
    for spec in &gen_decl.specs {
        match spec {
            Spec::Value(value) => {
                for name in &value.names {
                    visitor.visit_declared(name);
                }
                if let Some(ty) = &value.ty {
                    walk_expr(visitor, ty);
                }
                for expr in &value.values {
                    walk_expr(visitor, expr);
                }
            }
            Spec::Type(ty) => {
                visitor.visit_declared(&ty.name);
                for param in &ty.type_params {
                    walk_field(visitor, param, true);
                }
                walk_expr(visitor, &ty.ty);
            }
        }
    }
}

fn walk_field<V: Visitor + ?Sized>(visitor: &mut V, field: &Field, declares: bool) {
    if declares {
        for name in &field.names {
            visitor.visit_declared(name);
        }
    }
    walk_expr(visitor, &field.ty);
}

pub fn walk_func_type<V: Visitor + ?Sized>(visitor: &mut V, ty: &FuncType) {
    for field in ty
        .type_params
        .iter()
        .chain(&ty.params)
        .chain(&ty.results)
    {
        walk_field(visitor, field, true);
    }
}

pub fn walk_block<V: Visitor + ?Sized>(visitor: &mut V, block: &Block) {
    for (stmt, _) in &block.stmts {
        walk_stmt(visitor, stmt);
    }
}

fn walk_case_clauses<V: Visitor + ?Sized>(visitor: &mut V, clauses: &[CaseClause]) {
    for clause in clauses {
        for expr in clause.list.iter().flatten() {
            walk_expr(visitor, expr);
        }
        for (stmt, _) in &clause.body {
            walk_stmt(visitor, stmt);
        }
    }
}

fn walk_comm_clauses<V: Visitor + ?Sized>(visitor: &mut V, clauses: &[CommClause]) {
    for clause in clauses {
        if let Some(comm) = &clause.comm {
            walk_stmt(visitor, comm);
        }
        for (stmt, _) in &clause.body {
            walk_stmt(visitor, stmt);
        }
    }
}

pub fn walk_stmt<V: Visitor + ?Sized>(visitor: &mut V, stmt: &Stmt) {
    visitor.visit_stmt(stmt);
    match stmt {
        Stmt::Empty | Stmt::Branch { .. } => {}
        Stmt::Expr(expr) | Stmt::Go(expr) | Stmt::Defer(expr) => walk_expr(visitor, expr),
        Stmt::Send { chan, value } => {
            walk_expr(visitor, chan);
            walk_expr(visitor, value);
        }
        Stmt::IncDec { x, .. } => walk_expr(visitor, x),
        Stmt::Assign { lhs, op, rhs } => {
            if *op == ":=" {
                for name in lhs.iter().filter_map(Expr::as_ident) {
                    visitor.visit_declared(name);
                }
            }
            for expr in lhs.iter().chain(rhs) {
                walk_expr(visitor, expr);
            }
        }
        Stmt::Decl(gen_decl) => walk_gen_decl(visitor, gen_decl),
        Stmt::Labeled { stmt, .. } => walk_stmt(visitor, &stmt.0),
        Stmt::Return(results) => {
            for expr in results {
                walk_expr(visitor, expr);
            }
        }
        Stmt::Block(block) => walk_block(visitor, block),
        Stmt::If {
            init,
            cond,
            then,
            els,
        } => {
            if let Some(init) = init {
                walk_stmt(visitor, init);
            }
            walk_expr(visitor, cond);
            walk_block(visitor, then);
            if let Some(els) = els {
                walk_stmt(visitor, els);
            }
        }
        Stmt::Switch { init, tag, body } => {
            if let Some(init) = init {
                walk_stmt(visitor, init);
            }
            if let Some(tag) = tag {
                walk_expr(visitor, tag);
            }
            walk_case_clauses(visitor, body);
        }
        Stmt::TypeSwitch { init, assign, body } => {
            if let Some(init) = init {
                walk_stmt(visitor, init);
            }
            walk_stmt(visitor, assign);
            walk_case_clauses(visitor, body);
        }
        Stmt::Select { body } => walk_comm_clauses(visitor, body),
        Stmt::For {
            init,
            cond,
            post,
            body,
        } => {
            if let Some(init) = init {
                walk_stmt(visitor, init);
            }
            if let Some(cond) = cond {
                walk_expr(visitor, cond);
            }
            if let Some(post) = post {
                walk_stmt(visitor, post);
            }
            walk_block(visitor, body);
        }
        Stmt::Range {
            key,
            value,
            define,
            x,
            body,
        } => {
            for var in key.iter().chain(value) {
                if *define {
                    if let Some(name) = var.as_ident() {
                        visitor.visit_declared(name);
                    }
                }
                walk_expr(visitor, var);
            }
            walk_expr(visitor, x);
            walk_block(visitor, body);
        }
    }
}

pub fn walk_expr<V: Visitor + ?Sized>(visitor: &mut V, expr: &Expr) {
    visitor.visit_expr(expr);
    match expr {
        Expr::Ident(_) | Expr::BasicLit { .. } => {}
        Expr::CompositeLit { ty, elts } => {
            if let Some(ty) = ty {
                walk_expr(visitor, ty);
            }
            for elt in elts {
                walk_expr(visitor, elt);
            }
        }
        Expr::KeyValue { key, value } => {
            walk_expr(visitor, key);
            walk_expr(visitor, value);
        }
        Expr::FuncLit { ty, body } => {
            walk_func_type(visitor, ty);
            walk_block(visitor, body);
        }
        Expr::Paren(x) | Expr::Star(x) | Expr::Unary { x, .. } => walk_expr(visitor, x),
        Expr::Selector { x, .. } => walk_expr(visitor, x),
        Expr::Index { x, indices } => {
            walk_expr(visitor, x);
            for index in indices {
                walk_expr(visitor, index);
            }
        }
        Expr::Slice {
            x, low, high, max, ..
        } => {
            walk_expr(visitor, x);
            for bound in [low, high, max].into_iter().flatten() {
                walk_expr(visitor, bound);
            }
        }
        Expr::TypeAssert { x, ty } => {
            walk_expr(visitor, x);
            if let Some(ty) = ty {
                walk_expr(visitor, ty);
            }
        }
        Expr::Call { fun, args, .. } => {
            walk_expr(visitor, fun);
            for arg in args {
                walk_expr(visitor, arg);
            }
        }
        Expr::Binary { x, y, .. } => {
            walk_expr(visitor, x);
            walk_expr(visitor, y);
        }
        Expr::ArrayType { len, elem } => {
            if let Some(len) = len {
                walk_expr(visitor, len);
            }
            walk_expr(visitor, elem);
        }
        Expr::Ellipsis(elem) => {
            if let Some(elem) = elem {
                walk_expr(visitor, elem);
            }
        }
        Expr::MapType { key, value } => {
            walk_expr(visitor, key);
            walk_expr(visitor, value);
        }
        Expr::ChanType { value, .. } => walk_expr(visitor, value),
        Expr::FuncType(ty) => walk_func_type(visitor, ty),
        Expr::StructType(fields) => {
            for field in fields {
                walk_field(visitor, field, false);
            }
        }
        Expr::InterfaceType(elems) => {
            for elem in elems {
                match elem {
                    InterfaceElem::Method { ty, .. } => walk_func_type(visitor, ty),
                    InterfaceElem::Embed(expr) => walk_expr(visitor, expr),
                }
            }
        }
    }
}

/// Collects the identifiers used as the base of a selector, i.e. the
/// candidate package qualifiers in `fmt.Println` or `strings.Builder{}`.
#[derive(Debug, Default)]
pub struct QualifierCollector {
    pub qualifiers: Vec<String>,
    pub declared: Vec<String>,
}

impl Visitor for QualifierCollector {
    fn visit_expr(&mut self, expr: &Expr) {
        if let Expr::Selector { x, .. } = expr {
            if let Some(name) = x.as_ident() {
                if !self.qualifiers.iter().any(|q| q == name) {
                    self.qualifiers.push(name.to_string());
                }
            }
        }
    }

    fn visit_declared(&mut self, name: &str) {
        if !self.declared.iter().any(|d| d == name) {
            self.declared.push(name.to_string());
        }
    }
}

impl QualifierCollector {
    pub fn from_file(file: &File) -> Self {
        let mut collector = Self::default();
        walk_file(&mut collector, file);
        collector
    }

    pub fn uses(&self, name: &str) -> bool {
        self.qualifiers.iter().any(|q| q == name)
    }

    pub fn declares(&self, name: &str) -> bool {
        self.declared.iter().any(|d| d == name)
    }
}

/// Builtins whose calls have no observable effect.
const PURE_BUILTINS: &[&str] = &[
    "len", "cap", "append", "make", "new", "complex", "real", "imag", "min", "max",
];

/// Predeclared types; calling one of these is a conversion.
const PREDECLARED_TYPES: &[&str] = &[
    "bool", "byte", "complex64", "complex128", "error", "float32", "float64", "int", "int8",
    "int16", "int32", "int64", "rune", "string", "uint", "uint8", "uint16", "uint32", "uint64",
    "uintptr", "any",
];

/// Flags expressions that may have side effects: calls other than pure
/// builtins and conversions, and channel receives.
#[derive(Debug, Default)]
pub struct EffectFinder {
    pub effectful: bool,
}

impl Visitor for EffectFinder {
    fn visit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Call { fun, .. } if !is_pure_callee(fun) => self.effectful = true,
            Expr::Unary { op: "<-", .. } => self.effectful = true,
            _ => {}
        }
    }
}

/// Builtins without side effects, conversions and type expressions.
pub fn is_pure_callee(fun: &Expr) -> bool {
    match fun {
        Expr::Ident(name) => {
            PURE_BUILTINS.contains(&name.as_str()) || PREDECLARED_TYPES.contains(&name.as_str())
        }
        Expr::Paren(inner) => matches!(**inner, Expr::Star(_)) || is_pure_callee(inner),
        Expr::ArrayType { .. }
        | Expr::MapType { .. }
        | Expr::ChanType { .. }
        | Expr::FuncType(_)
        | Expr::StructType(_)
        | Expr::InterfaceType(_) => true,
        _ => false,
    }
}

/// True when evaluating the expression cannot change program state.
pub fn is_pure(expr: &Expr) -> bool {
    let mut finder = EffectFinder::default();
    walk_expr(&mut finder, expr);
    !finder.effectful
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{parse_expr, parse_file};
    use rstest::rstest;

    #[rstest]
    #[case("1 + 2", true)]
    #[case("x", true)]
    #[case("len(s) + cap(s)", true)]
    #[case("[]byte(s)", true)]
    #[case("int64(x) * 2", true)]
    #[case("map[string]int{\"a\": 1}", true)]
    #[case("fmt.Sprint(1)", false)]
    #[case("f()", false)]
    #[case("<-ch", false)]
    #[case("x + g(1)", false)]
    #[case("func() int { return 1 }", true)]
    fn test_purity(#[case] source: &str, #[case] expected: bool) {
        let expr = parse_expr(source).expect("parse");
        assert_eq!(is_pure(&expr), expected, "{}", source);
    }

    #[test]
    fn test_qualifiers_and_declared_names() {
        let file = parse_file(
            "package main\n\
             type T struct { time int }\n\
             func main() {\n\
             \tb := strings.Builder{}\n\
             \tfmt.Println(b.String(), os.Args)\n\
             \tfor i, v := range xs { _ = i; _ = v }\n\
             }\n",
        )
        .expect("parse");
        let collector = QualifierCollector::from_file(&file);

        assert!(collector.uses("strings"));
        assert!(collector.uses("fmt"));
        assert!(collector.uses("os"));
        assert!(collector.uses("b"));
        assert!(!collector.uses("time"));

        assert!(collector.declares("T"));
        assert!(collector.declares("main"));
        assert!(collector.declares("b"));
        assert!(collector.declares("i"));
        assert!(collector.declares("v"));
        assert!(!collector.declares("time"));
    }
}
