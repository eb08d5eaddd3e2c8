use super::*;
use crate::ast::{ChanDir, Decl, Expr, GenKind, LitKind, Spec, Stmt};

fn stmts(source: &str) -> Vec<Stmt> {
    parse_stmt_list(source)
        .unwrap_or_else(|e| panic!("parse failed for {:?}: {}", source, e))
        .into_iter()
        .map(|(stmt, _)| stmt)
        .collect()
}

#[test]
fn parses_binary_precedence() {
    let expr = parse_expr("1 + 2 * 3").unwrap();
    match expr {
        Expr::Binary { op: "+", x, y } => {
            assert!(matches!(*x, Expr::BasicLit { kind: LitKind::Int, .. }));
            assert!(matches!(*y, Expr::Binary { op: "*", .. }));
        }
        other => panic!("Expected addition at the root, got {:?}", other),
    }
}

#[test]
fn expression_entry_rejects_statements() {
    assert!(parse_expr("x := 5").is_err());
    assert!(parse_expr("x = 5").is_err());
    assert!(parse_expr("if x { }").is_err());
    assert!(parse_expr("1 + 2;").is_ok());
}

#[test]
fn parses_calls_selectors_and_composites() {
    let expr = parse_expr(r#"fmt.Println([]int{1, 2}, map[string]int{"a": 1}, xs...)"#).unwrap();
    match expr {
        Expr::Call {
            fun,
            args,
            ellipsis,
        } => {
            assert!(matches!(*fun, Expr::Selector { ref sel, .. } if sel == "Println"));
            assert_eq!(args.len(), 3);
            assert!(ellipsis);
            assert!(matches!(args[0], Expr::CompositeLit { .. }));
            match &args[1] {
                Expr::CompositeLit { elts, .. } => {
                    assert!(matches!(elts[0], Expr::KeyValue { .. }))
                }
                other => panic!("Expected map literal, got {:?}", other),
            }
        }
        other => panic!("Expected call, got {:?}", other),
    }
}

#[test]
fn parses_conversions_and_type_operands() {
    assert!(matches!(
        parse_expr("[]byte(s)").unwrap(),
        Expr::Call { ref fun, .. } if matches!(**fun, Expr::ArrayType { len: None, .. })
    ));
    assert!(matches!(
        parse_expr("(*T)(p)").unwrap(),
        Expr::Call { ref fun, .. } if matches!(**fun, Expr::Paren(_))
    ));
    assert!(matches!(
        parse_expr("make(chan int, 3)").unwrap(),
        Expr::Call { ref args, .. } if matches!(args[0], Expr::ChanType { dir: ChanDir::Both, .. })
    ));
    assert!(parse_expr("struct{}{}").is_ok());
    assert!(parse_expr("interface{}(x)").is_ok());
}

#[test]
fn parses_slices_and_type_assertions() {
    assert!(matches!(
        parse_expr("s[1:]").unwrap(),
        Expr::Slice { high: None, three: false, .. }
    ));
    assert!(matches!(
        parse_expr("s[:2:4]").unwrap(),
        Expr::Slice { low: None, three: true, .. }
    ));
    assert!(parse_expr("s[1::4]").is_err());
    assert!(matches!(
        parse_expr("v.(fmt.Stringer)").unwrap(),
        Expr::TypeAssert { ty: Some(_), .. }
    ));
}

#[test]
fn parses_receive_and_func_literal() {
    assert!(matches!(
        parse_expr("<-ch").unwrap(),
        Expr::Unary { op: "<-", .. }
    ));
    assert!(matches!(
        parse_expr("func(a, b int) int { return a + b }(1, 2)").unwrap(),
        Expr::Call { ref fun, .. } if matches!(**fun, Expr::FuncLit { .. })
    ));
}

#[test]
fn parses_simple_statements() {
    let list = stmts("x := 5\ny, z = 1, 2\nx += 3\ni++\nch <- v\nf()");
    assert!(matches!(list[0], Stmt::Assign { op: ":=", .. }));
    assert!(matches!(list[1], Stmt::Assign { op: "=", ref lhs, .. } if lhs.len() == 2));
    assert!(matches!(list[2], Stmt::Assign { op: "+=", .. }));
    assert!(matches!(list[3], Stmt::IncDec { inc: true, .. }));
    assert!(matches!(list[4], Stmt::Send { .. }));
    assert!(matches!(list[5], Stmt::Expr(Expr::Call { .. })));
}

#[test]
fn parses_control_flow() {
    let list = stmts(
        "if x := f(); x > 0 {\n\tg()\n} else if y {\n} else {\n}\n\
         for i := 0; i < 3; i++ {\n}\n\
         for k, v := range m {\n}\n\
         for range ch {\n}\n\
         for {\n\tbreak\n}\n\
         switch t := v.(type) {\ncase int, string:\ndefault:\n}\n\
         switch {\ncase a > b:\n\tfallthrough\ncase true:\n}\n\
         select {\ncase v := <-ch:\n\t_ = v\ncase out <- 1:\ndefault:\n}",
    );
    assert_eq!(list.len(), 8);
    match &list[0] {
        Stmt::If { init, els, .. } => {
            assert!(init.is_some());
            assert!(matches!(els.as_deref(), Some(Stmt::If { .. })));
        }
        other => panic!("Expected if, got {:?}", other),
    }
    assert!(matches!(list[1], Stmt::For { cond: Some(_), .. }));
    assert!(matches!(list[2], Stmt::Range { define: true, value: Some(_), .. }));
    assert!(matches!(list[3], Stmt::Range { key: None, .. }));
    assert!(matches!(list[4], Stmt::For { cond: None, .. }));
    match &list[5] {
        Stmt::TypeSwitch { body, .. } => assert_eq!(body.len(), 2),
        other => panic!("Expected type switch, got {:?}", other),
    }
    assert!(matches!(list[6], Stmt::Switch { tag: None, .. }));
    match &list[7] {
        Stmt::Select { body } => assert_eq!(body.len(), 3),
        other => panic!("Expected select, got {:?}", other),
    }
}

#[test]
fn composite_literal_restricted_in_control_clause() {
    let list = stmts(
        "for _, p := range points {\n\tp.X++\n}\nif v == (T{}) {\n}\n\
         for _, x := range []int{1, 2} {\n}",
    );
    assert_eq!(list.len(), 3);
    match &list[0] {
        Stmt::Range { x, body, .. } => {
            assert!(matches!(x, Expr::Ident(name) if name == "points"));
            assert_eq!(body.stmts.len(), 1);
        }
        other => panic!("Expected range, got {:?}", other),
    }
}

#[test]
fn parses_labels_and_declarations() {
    let list = stmts(
        "outer:\nfor {\n\tcontinue outer\n}\nvar a, b int = 1, 2\n\
         const c = 3\ntype P struct{ X, Y int }",
    );
    assert!(matches!(list[0], Stmt::Labeled { ref label, .. } if label == "outer"));
    assert!(matches!(
        list[1],
        Stmt::Decl(ref gen_decl) if gen_decl.kind == GenKind::Var
    ));
    assert!(matches!(list[2], Stmt::Decl(ref gen_decl) if gen_decl.kind == GenKind::Const));
    assert!(matches!(list[3], Stmt::Decl(ref gen_decl) if gen_decl.kind == GenKind::Type));
}

#[test]
fn range_outside_for_is_rejected() {
    assert!(parse_stmt_list("x := range y").is_err());
}

#[test]
fn parses_file_with_imports_and_generics() {
    let file = parse_file(
        "package main\n\n\
         import (\n\t\"fmt\"\n\tstr \"strings\"\n\t_ \"embed\"\n)\n\n\
         type List[T any] struct {\n\titems []T `json:\"items\"`\n}\n\n\
         type Number interface {\n\t~int | ~float64\n}\n\n\
         func Map[T, U any](xs []T, f func(T) U) []U {\n\treturn nil\n}\n\n\
         func (l *List[T]) Len() int { return len(l.items) }\n\n\
         func main() {\n\tfmt.Println(str.ToUpper(\"x\"), Map[int, int](nil, nil))\n}\n",
    )
    .unwrap();

    assert_eq!(file.package, "main");
    assert_eq!(file.imports.len(), 3);
    assert_eq!(file.imports[1].name.as_deref(), Some("str"));
    assert_eq!(file.imports[2].name.as_deref(), Some("_"));
    assert_eq!(file.decls.len(), 5);

    match &file.decls[0] {
        Decl::Gen(gen_decl) => match &gen_decl.specs[0] {
            Spec::Type(ty) => {
                assert_eq!(ty.name, "List");
                assert_eq!(ty.type_params.len(), 1);
            }
            other => panic!("Expected type spec, got {:?}", other),
        },
        other => panic!("Expected type decl, got {:?}", other),
    }
    match &file.decls[2] {
        Decl::Func(func) => {
            assert_eq!(func.ty.type_params.len(), 1);
            assert_eq!(func.ty.type_params[0].names, vec!["T", "U"]);
            assert_eq!(func.ty.params.len(), 2);
            assert_eq!(func.ty.results.len(), 1);
        }
        other => panic!("Expected generic func, got {:?}", other),
    }
    match &file.decls[3] {
        Decl::Func(func) => assert!(func.recv.is_some()),
        other => panic!("Expected method, got {:?}", other),
    }
    assert!(file.func("main").is_some());
}

#[test]
fn array_type_declaration_is_not_generic() {
    let file = parse_file("package p\ntype Buf [N]byte\nconst N = 4\n").unwrap();
    match &file.decls[0] {
        Decl::Gen(gen_decl) => match &gen_decl.specs[0] {
            Spec::Type(ty) => {
                assert!(ty.type_params.is_empty());
                assert!(matches!(ty.ty, Expr::ArrayType { len: Some(_), .. }));
            }
            other => panic!("Expected type spec, got {:?}", other),
        },
        other => panic!("Expected type decl, got {:?}", other),
    }
}

#[test]
fn parses_bare_declarations() {
    let decls = parse_decls("func Helper() int { return 42 }\n\nvar counter int\n").unwrap();
    assert_eq!(decls.len(), 2);
}

#[test]
fn reports_position_of_errors() {
    let err = parse_file("package main\n\nfunc bad(\n").unwrap_err();
    assert_eq!((err.line, err.column), (3, 10));
    assert!(err.message.ends_with("found EOF"), "{}", err.message);
    assert!(err.message.starts_with("expected"), "{}", err.message);

    let err = parse_stmt_list("x := \"open").unwrap_err();
    assert_eq!(err.message, "string literal not terminated");
    assert_eq!((err.line, err.column), (1, 6));
}

#[test]
fn mixed_parameters_are_rejected() {
    let err = parse_decls("func f(a int, string) {}").unwrap_err();
    assert_eq!(err.message, "mixed named and unnamed parameters");
}
