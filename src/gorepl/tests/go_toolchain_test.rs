//! Runs against a real `go` binary; each test returns early without one.

use gorepl::imports::BuiltinFixer;
use gorepl::printer::PrinterSpec;
use gorepl::runner::{GoToolchain, find_executable};
use gorepl::session::{EvalError, Evaluation, Session};
use std::fs;

fn go_session() -> Option<Session> {
    let go = find_executable("go")?;
    let session = Session::builder()
        .toolchain(Box::new(GoToolchain::new(go, Vec::new())))
        .fixer(Box::new(BuiltinFixer))
        .printer(PrinterSpec::fmt())
        .build()
        .unwrap();
    Some(session)
}

/// A failed run is either a fatal error or an uncommitted evaluation,
/// depending on the exit status the installed `go run` reports.
fn assert_rejected(result: Result<Evaluation, EvalError>, needle: &str) {
    match result {
        Err(EvalError::Run { stderr, .. }) => assert!(stderr.contains(needle), "{}", stderr),
        Ok(evaluation) => {
            assert!(!evaluation.committed);
            assert!(evaluation.diagnostics.contains(needle), "{}", evaluation.diagnostics);
        }
        Err(other) => panic!("Expected a rejected run, got {:?}", other),
    }
}

#[test]
fn test_expression_value() {
    let Some(mut session) = go_session() else {
        return;
    };
    assert_eq!(session.eval("1 + 2").unwrap().output, "3\n");
    assert_eq!(session.eval("\"go\" + \"pher\"").unwrap().output, "\"gopher\"\n");
}

#[test]
fn test_variables_survive() {
    let Some(mut session) = go_session() else {
        return;
    };
    assert_eq!(session.eval("x := 5").unwrap().output, "5\n");
    assert_eq!(session.eval("x").unwrap().output, "5\n");
    assert_eq!(session.eval("strings.Repeat(\"a\", x)").unwrap().output, "\"aaaaa\"\n");
}

#[test]
fn test_errors_leave_program_untouched() {
    let Some(mut session) = go_session() else {
        return;
    };
    session.eval("y := 1").unwrap();
    let before = session.source(false);

    assert!(matches!(session.eval("func bad("), Err(EvalError::Parse(_))));
    assert_rejected(session.eval("undefinedName + 1"), "undefinedName");
    assert_rejected(session.eval("panic(\"boom\")"), "boom");
    assert_eq!(session.source(false), before);
    assert_eq!(session.eval("y").unwrap().output, "1\n");
}

#[test]
fn test_included_file() {
    let Some(mut session) = go_session() else {
        return;
    };
    let dir = tempfile::tempdir().unwrap();
    let helper = dir.path().join("helper.go");
    fs::write(&helper, "package helper\n\nfunc Helper() int { return 42 }\n").unwrap();

    session.include_file(&helper).unwrap();
    assert_eq!(session.eval("Helper()").unwrap().output, "42\n");
}
