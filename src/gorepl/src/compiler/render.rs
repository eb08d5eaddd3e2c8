//! Prints a syntax tree back to gofmt-shaped Go source.
//!
//! Output depends only on the tree, never on spans, so a tree built in
//! memory prints exactly like the same tree parsed from text. Comments are
//! not preserved.

use crate::ast::{
    Block, CaseClause, ChanDir, CommClause, Decl, Expr, Field, File, FuncDecl, FuncType, GenDecl,
    ImportSpec, InterfaceElem, Spanned, Spec, Stmt,
};

/// Render a whole file. `use_spaces` indents with four spaces instead of tabs.
#[must_use]
pub fn render_file(file: &File, use_spaces: bool) -> String {
    let mut f = Formatter::new(use_spaces);
    f.format_file(file);
    f.output
}

#[must_use]
pub fn render_decl(decl: &Decl, use_spaces: bool) -> String {
    let mut f = Formatter::new(use_spaces);
    f.format_decl(decl);
    f.output
}

/// Render statements one per line at the top indentation level.
#[must_use]
pub fn render_stmts(stmts: &[Spanned<Stmt>], use_spaces: bool) -> String {
    let mut f = Formatter::new(use_spaces);
    for (stmt, _) in stmts {
        f.write_indent();
        f.format_stmt(stmt);
        f.newline();
    }
    f.output
}

#[must_use]
pub fn expr_to_string(expr: &Expr) -> String {
    let mut f = Formatter::new(false);
    f.format_expr(expr);
    f.output
}

#[must_use]
pub fn stmt_to_string(stmt: &Stmt) -> String {
    let mut f = Formatter::new(false);
    f.format_stmt(stmt);
    f.output
}

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Binary { op, .. } => match *op {
            "||" => 1,
            "&&" => 2,
            "==" | "!=" | "<" | "<=" | ">" | ">=" => 3,
            "+" | "-" | "|" | "^" => 4,
            _ => 5,
        },
        _ => 6,
    }
}

struct Formatter {
    output: String,
    indent: usize,
    use_spaces: bool,
}

impl Formatter {
    fn new(use_spaces: bool) -> Self {
        Self {
            output: String::new(),
            indent: 0,
            use_spaces,
        }
    }

    fn write(&mut self, s: &str) {
        self.output.push_str(s);
    }

    fn newline(&mut self) {
        self.output.push('\n');
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            if self.use_spaces {
                self.output.push_str("    ");
            } else {
                self.output.push('\t');
            }
        }
    }

    fn comma_sep<T>(&mut self, items: &[T], mut fmt_item: impl FnMut(&mut Self, &T)) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            fmt_item(self, item);
        }
    }

    fn format_file(&mut self, file: &File) {
        self.write("package ");
        self.write(&file.package);
        self.newline();

        if !file.imports.is_empty() {
            self.newline();
            self.write("import (");
            self.newline();
            self.indent += 1;
            for spec in &file.imports {
                self.write_indent();
                self.format_import_spec(spec);
                self.newline();
            }
            self.indent -= 1;
            self.write(")");
            self.newline();
        }

        for decl in &file.decls {
            self.newline();
            self.format_decl(decl);
        }
    }

    fn format_import_spec(&mut self, spec: &ImportSpec) {
        if let Some(name) = &spec.name {
            self.write(name);
            self.write(" ");
        }
        self.write(&format!("{:?}", spec.path));
    }

    fn format_decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Func(func) => self.format_func_decl(func),
            Decl::Gen(gen_decl) => {
                self.write_indent();
                self.format_gen_decl(gen_decl);
            }
        }
        self.newline();
    }

    fn format_func_decl(&mut self, func: &FuncDecl) {
        self.write_indent();
        self.write("func ");
        if let Some(recv) = &func.recv {
            self.write("(");
            self.format_field(recv);
            self.write(") ");
        }
        self.write(&func.name);
        self.format_type_params(&func.ty.type_params);
        self.format_signature(&func.ty);
        if let Some(body) = &func.body {
            self.write(" ");
            self.format_block(body);
        }
    }

    fn format_gen_decl(&mut self, gen_decl: &GenDecl) {
        self.write(gen_decl.kind.keyword());
        if gen_decl.grouped {
            self.write(" (");
            self.newline();
            self.indent += 1;
            for spec in &gen_decl.specs {
                self.write_indent();
                self.format_spec(spec);
                self.newline();
            }
            self.indent -= 1;
            self.write_indent();
            self.write(")");
        } else {
            for spec in &gen_decl.specs {
                self.write(" ");
                self.format_spec(spec);
            }
        }
    }

    fn format_spec(&mut self, spec: &Spec) {
        match spec {
            Spec::Value(value) => {
                self.write(&value.names.join(", "));
                if let Some(ty) = &value.ty {
                    self.write(" ");
                    self.format_expr(ty);
                }
                if !value.values.is_empty() {
                    self.write(" = ");
                    self.comma_sep(&value.values, |f, e| f.format_expr(e));
                }
            }
            Spec::Type(ty) => {
                self.write(&ty.name);
                self.format_type_params(&ty.type_params);
                self.write(if ty.alias { " = " } else { " " });
                self.format_expr(&ty.ty);
            }
        }
    }

    fn format_type_params(&mut self, params: &[Field]) {
        if params.is_empty() {
            return;
        }
        self.write("[");
        self.comma_sep(params, |f, p| f.format_field(p));
        self.write("]");
    }

    fn format_field(&mut self, field: &Field) {
        if !field.names.is_empty() {
            self.write(&field.names.join(", "));
            self.write(" ");
        }
        self.format_expr(&field.ty);
        if let Some(tag) = &field.tag {
            self.write(" ");
            self.write(tag);
        }
    }

    fn format_signature(&mut self, ty: &FuncType) {
        self.write("(");
        self.comma_sep(&ty.params, |f, p| f.format_field(p));
        self.write(")");
        match ty.results.as_slice() {
            [] => {}
            [single] if single.names.is_empty() => {
                self.write(" ");
                self.format_expr(&single.ty);
            }
            results => {
                self.write(" (");
                self.comma_sep(results, |f, p| f.format_field(p));
                self.write(")");
            }
        }
    }

    fn format_block(&mut self, block: &Block) {
        self.write("{");
        self.newline();
        self.indent += 1;
        self.format_stmt_lines(&block.stmts);
        self.indent -= 1;
        self.write_indent();
        self.write("}");
    }

    fn format_stmt_lines(&mut self, stmts: &[Spanned<Stmt>]) {
        for (stmt, _) in stmts {
            self.write_indent();
            self.format_stmt(stmt);
            self.newline();
        }
    }

    fn format_optional_simple(&mut self, stmt: &Option<Box<Stmt>>) {
        if let Some(stmt) = stmt {
            self.format_stmt(stmt);
        }
    }

    fn format_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Empty => {}
            Stmt::Expr(expr) => self.format_expr(expr),
            Stmt::Send { chan, value } => {
                self.format_expr(chan);
                self.write(" <- ");
                self.format_expr(value);
            }
            Stmt::IncDec { x, inc } => {
                self.format_expr(x);
                self.write(if *inc { "++" } else { "--" });
            }
            Stmt::Assign { lhs, op, rhs } => {
                self.comma_sep(lhs, |f, e| f.format_expr(e));
                self.write(" ");
                self.write(op);
                self.write(" ");
                self.comma_sep(rhs, |f, e| f.format_expr(e));
            }
            Stmt::Decl(gen_decl) => self.format_gen_decl(gen_decl),
            Stmt::Labeled { label, stmt } => {
                self.write(label);
                self.write(":");
                if !matches!(stmt.0, Stmt::Empty) {
                    self.newline();
                    self.write_indent();
                    self.format_stmt(&stmt.0);
                }
            }
            Stmt::Go(expr) => {
                self.write("go ");
                self.format_expr(expr);
            }
            Stmt::Defer(expr) => {
                self.write("defer ");
                self.format_expr(expr);
            }
            Stmt::Return(results) => {
                self.write("return");
                if !results.is_empty() {
                    self.write(" ");
                    self.comma_sep(results, |f, e| f.format_expr(e));
                }
            }
            Stmt::Branch { keyword, label } => {
                self.write(keyword);
                if let Some(label) = label {
                    self.write(" ");
                    self.write(label);
                }
            }
            Stmt::Block(block) => self.format_block(block),
            Stmt::If {
                init,
                cond,
                then,
                els,
            } => {
                self.write("if ");
                if init.is_some() {
                    self.format_optional_simple(init);
                    self.write("; ");
                }
                self.format_expr(cond);
                self.write(" ");
                self.format_block(then);
                if let Some(els) = els {
                    self.write(" else ");
                    self.format_stmt(els);
                }
            }
            Stmt::Switch { init, tag, body } => {
                self.write("switch ");
                if init.is_some() {
                    self.format_optional_simple(init);
                    self.write("; ");
                }
                if let Some(tag) = tag {
                    self.format_expr(tag);
                    self.write(" ");
                }
                self.format_case_clauses(body);
            }
            Stmt::TypeSwitch { init, assign, body } => {
                self.write("switch ");
                if init.is_some() {
                    self.format_optional_simple(init);
                    self.write("; ");
                }
                self.format_stmt(assign);
                self.write(" ");
                self.format_case_clauses(body);
            }
            Stmt::Select { body } => {
                self.write("select ");
                self.format_comm_clauses(body);
            }
            Stmt::For {
                init,
                cond,
                post,
                body,
            } => {
                self.write("for ");
                if init.is_some() || post.is_some() {
                    self.format_optional_simple(init);
                    self.write("; ");
                    if let Some(cond) = cond {
                        self.format_expr(cond);
                    }
                    self.write("; ");
                    self.format_optional_simple(post);
                    self.write(" ");
                } else if let Some(cond) = cond {
                    self.format_expr(cond);
                    self.write(" ");
                }
                self.format_block(body);
            }
            Stmt::Range {
                key,
                value,
                define,
                x,
                body,
            } => {
                self.write("for ");
                if let Some(key) = key {
                    self.format_expr(key);
                    if let Some(value) = value {
                        self.write(", ");
                        self.format_expr(value);
                    }
                    self.write(if *define { " := " } else { " = " });
                }
                self.write("range ");
                self.format_expr(x);
                self.write(" ");
                self.format_block(body);
            }
        }
    }

    fn format_case_clauses(&mut self, clauses: &[CaseClause]) {
        self.write("{");
        self.newline();
        for clause in clauses {
            self.write_indent();
            match &clause.list {
                Some(list) => {
                    self.write("case ");
                    self.comma_sep(list, |f, e| f.format_expr(e));
                    self.write(":");
                }
                None => self.write("default:"),
            }
            self.newline();
            self.indent += 1;
            self.format_stmt_lines(&clause.body);
            self.indent -= 1;
        }
        self.write_indent();
        self.write("}");
    }

    fn format_comm_clauses(&mut self, clauses: &[CommClause]) {
        self.write("{");
        self.newline();
        for clause in clauses {
            self.write_indent();
            match &clause.comm {
                Some(comm) => {
                    self.write("case ");
                    self.format_stmt(comm);
                    self.write(":");
                }
                None => self.write("default:"),
            }
            self.newline();
            self.indent += 1;
            self.format_stmt_lines(&clause.body);
            self.indent -= 1;
        }
        self.write_indent();
        self.write("}");
    }

    fn format_operand(&mut self, expr: &Expr, min_prec: u8) {
        if precedence(expr) < min_prec {
            self.write("(");
            self.format_expr(expr);
            self.write(")");
        } else {
            self.format_expr(expr);
        }
    }

    fn format_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Ident(name) => self.write(name),
            Expr::BasicLit { value, .. } => self.write(value),
            Expr::CompositeLit { ty, elts } => {
                if let Some(ty) = ty {
                    self.format_expr(ty);
                }
                self.write("{");
                self.comma_sep(elts, |f, e| f.format_expr(e));
                self.write("}");
            }
            Expr::KeyValue { key, value } => {
                self.format_expr(key);
                self.write(": ");
                self.format_expr(value);
            }
            Expr::FuncLit { ty, body } => {
                self.write("func");
                self.format_signature(ty);
                self.write(" ");
                self.format_block(body);
            }
            Expr::Paren(inner) => {
                self.write("(");
                self.format_expr(inner);
                self.write(")");
            }
            Expr::Selector { x, sel } => {
                self.format_operand(x, 6);
                self.write(".");
                self.write(sel);
            }
            Expr::Index { x, indices } => {
                self.format_operand(x, 6);
                self.write("[");
                self.comma_sep(indices, |f, e| f.format_expr(e));
                self.write("]");
            }
            Expr::Slice {
                x,
                low,
                high,
                max,
                three,
            } => {
                self.format_operand(x, 6);
                self.write("[");
                if let Some(low) = low {
                    self.format_expr(low);
                }
                self.write(":");
                if let Some(high) = high {
                    self.format_expr(high);
                }
                if *three {
                    self.write(":");
                    if let Some(max) = max {
                        self.format_expr(max);
                    }
                }
                self.write("]");
            }
            Expr::TypeAssert { x, ty } => {
                self.format_operand(x, 6);
                self.write(".(");
                match ty {
                    Some(ty) => self.format_expr(ty),
                    None => self.write("type"),
                }
                self.write(")");
            }
            Expr::Call {
                fun,
                args,
                ellipsis,
            } => {
                self.format_operand(fun, 6);
                self.write("(");
                self.comma_sep(args, |f, e| f.format_expr(e));
                if *ellipsis {
                    self.write("...");
                }
                self.write(")");
            }
            Expr::Star(x) => {
                self.write("*");
                self.format_operand(x, 6);
            }
            Expr::Unary { op, x } => {
                self.write(op);
                let mut inner = Formatter::new(self.use_spaces);
                inner.indent = self.indent;
                inner.format_operand(x, 6);
                let clash = matches!(*op, "-" | "+")
                    && inner.output.starts_with(op.chars().next().unwrap_or(' '));
                if clash {
                    self.write(" ");
                }
                self.write(&inner.output);
            }
            Expr::Binary { op, x, y } => {
                let prec = precedence(expr);
                self.format_operand(x, prec);
                self.write(" ");
                self.write(op);
                self.write(" ");
                self.format_operand(y, prec + 1);
            }
            Expr::ArrayType { len, elem } => {
                self.write("[");
                if let Some(len) = len {
                    self.format_expr(len);
                }
                self.write("]");
                self.format_expr(elem);
            }
            Expr::Ellipsis(elem) => {
                self.write("...");
                if let Some(elem) = elem {
                    self.format_expr(elem);
                }
            }
            Expr::MapType { key, value } => {
                self.write("map[");
                self.format_expr(key);
                self.write("]");
                self.format_expr(value);
            }
            Expr::ChanType { dir, value } => {
                self.write(match dir {
                    ChanDir::Both => "chan ",
                    ChanDir::Send => "chan<- ",
                    ChanDir::Recv => "<-chan ",
                });
                self.format_expr(value);
            }
            Expr::FuncType(ty) => {
                self.write("func");
                self.format_signature(ty);
            }
            Expr::StructType(fields) => {
                if fields.is_empty() {
                    self.write("struct{}");
                    return;
                }
                self.write("struct {");
                self.newline();
                self.indent += 1;
                for field in fields {
                    self.write_indent();
                    self.format_field(field);
                    self.newline();
                }
                self.indent -= 1;
                self.write_indent();
                self.write("}");
            }
            Expr::InterfaceType(elems) => {
                if elems.is_empty() {
                    self.write("interface{}");
                    return;
                }
                self.write("interface {");
                self.newline();
                self.indent += 1;
                for elem in elems {
                    self.write_indent();
                    match elem {
                        InterfaceElem::Method { name, ty } => {
                            self.write(name);
                            self.format_signature(ty);
                        }
                        InterfaceElem::Embed(expr) => self.format_expr(expr),
                    }
                    self.newline();
                }
                self.indent -= 1;
                self.write_indent();
                self.write("}");
            }
        }
    }
}
