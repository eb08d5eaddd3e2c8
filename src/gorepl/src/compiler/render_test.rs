use super::*;
use crate::ast::Expr;
use rstest::rstest;

const SAMPLE: &str = r#"package main

import (
	"fmt"
	str "strings"
)

type Point struct {
	X, Y int `json:"x"`
	Label string
}

type Shape interface {
	Area() float64
	fmt.Stringer
}

var (
	origin = Point{X: 0, Y: 0}
	count int
)

func (p *Point) Move(dx, dy int) {
	p.X += dx
	p.Y += dy
}

func Sum[T ~int | ~float64](xs ...T) (total T) {
	for _, x := range xs {
		total += x
	}
	return
}

func main() {
	ch := make(chan int, 1)
	go func() {
		ch <- 1
	}()
	select {
	case v := <-ch:
		fmt.Println(v)
	default:
	}
	switch s := str.ToUpper("a"); s {
	case "A", "B":
		fmt.Println(s)
		fallthrough
	default:
	}
	if n := len(origin.Label); n > 0 && -n < 0 {
		count++
	} else if n == 0 {
		count--
	} else {
	}
	for i := 0; i < 3; i++ {
		defer fmt.Println(i)
	}
outer:
	for {
		break outer
	}
	var arr [3]int
	_ = arr[1:2]
	_ = []func() int{func() int {
		return 1
	}}
}
"#;

#[test]
fn render_is_fixed_point() {
    let file = parse_file(SAMPLE).unwrap();
    let first = render_file(&file, false);
    let second = render_file(&parse_file(&first).unwrap(), false);
    assert_eq!(first, second);
    assert_eq!(parse_file(&first).unwrap(), parse_file(&second).unwrap());
}

#[test]
fn render_with_spaces_is_fixed_point() {
    let file = parse_file(SAMPLE).unwrap();
    let first = render_file(&file, true);
    assert!(first.contains("\n    p.X += dx\n"));
    assert!(!first.contains('\t'));
    let second = render_file(&parse_file(&first).unwrap(), true);
    assert_eq!(first, second);
}

#[test]
fn renders_minimal_program() {
    let file = parse_file("package main\nimport \"fmt\"\nfunc main() {}\n").unwrap();
    assert_eq!(
        render_file(&file, false),
        "package main\n\nimport (\n\t\"fmt\"\n)\n\nfunc main() {\n}\n"
    );
}

#[rstest]
#[case("1 + 2*3", "1 + 2 * 3")]
#[case("(1 + 2) * 3", "(1 + 2) * 3")]
#[case("- -x", "- -x")]
#[case("x.(type)", "x.(type)")]
#[case("f(a, b...)", "f(a, b...)")]
#[case("map[string][]int{\"a\": {1}}", "map[string][]int{\"a\": {1}}")]
#[case("<-chan int(nil)", "<-chan int(nil)")]
#[case("s[1:2:3]", "s[1:2:3]")]
fn renders_expressions(#[case] source: &str, #[case] expected: &str) {
    let expr = parse_expr(source).unwrap();
    assert_eq!(expr_to_string(&expr), expected);
}

#[test]
fn adds_parentheses_for_built_trees() {
    let sum = Expr::Binary {
        op: "+",
        x: Box::new(Expr::ident("a")),
        y: Box::new(Expr::ident("b")),
    };
    let product = Expr::Binary {
        op: "*",
        x: Box::new(sum),
        y: Box::new(Expr::ident("c")),
    };
    assert_eq!(expr_to_string(&product), "(a + b) * c");
}
