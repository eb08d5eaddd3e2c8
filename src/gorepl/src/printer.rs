use crate::ast::Expr;
use crate::runner::Toolchain;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Name of the variadic helper every displayed value goes through.
pub const PRINTER_FUNC: &str = "__gorepl_print";

/// Variadic no-op taking any values, so a committed expression with a
/// result stays a legal statement.
pub const DISCARD_FUNC: &str = "__gorepl_discard";

/// How values are displayed: the package to import and a Go expression
/// printing a single value named `x`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterSpec {
    pub package: String,
    pub call: String,
}

impl PrinterSpec {
    pub fn new(package: impl Into<String>, call: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            call: call.into(),
        }
    }

    pub fn fmt() -> Self {
        Self::new("fmt", r#"fmt.Printf("%#v\n", x)"#)
    }

    /// Candidates in order of preference; `fmt` always resolves.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("github.com/k0kubun/pp", "pp.Println(x)"),
            Self::new("github.com/davecgh/go-spew/spew", r#"spew.Printf("%#v\n", x)"#),
            Self::fmt(),
        ]
    }

    /// Go source of the helper function declaration.
    pub fn helper_source(&self) -> String {
        format!(
            "func {}(xx ...interface{{}}) {{\n\tfor _, x := range xx {{\n\t\t{}\n\t}}\n}}\n",
            PRINTER_FUNC, self.call
        )
    }

    fn is_builtin(&self) -> bool {
        self.package == "fmt"
    }
}

impl Default for PrinterSpec {
    fn default() -> Self {
        Self::fmt()
    }
}

/// `__gorepl_print(args...)`
pub fn print_call(args: Vec<Expr>) -> Expr {
    Expr::call(Expr::ident(PRINTER_FUNC), args)
}

/// `__gorepl_discard(args...)`
pub fn discard_call(args: Vec<Expr>) -> Expr {
    Expr::call(Expr::ident(DISCARD_FUNC), args)
}

/// Go source of the discard helper declaration.
pub fn discard_source() -> String {
    format!("func {}(xx ...interface{{}}) {{\n}}\n", DISCARD_FUNC)
}

/// Unwraps `__gorepl_print(f())` back to `f()`; anything else is `None`.
pub fn unwrap_print_call(expr: &Expr) -> Option<&Expr> {
    match expr {
        Expr::Call { fun, args, .. } if fun.as_ident() == Some(PRINTER_FUNC) && args.len() == 1 => {
            Some(&args[0])
        }
        _ => None,
    }
}

/// Picks the first candidate whose package the toolchain can resolve from
/// `dir`, falling back to `fmt`.
pub fn discover(toolchain: &dyn Toolchain, candidates: &[PrinterSpec], dir: &Path) -> PrinterSpec {
    for candidate in candidates {
        if candidate.is_builtin() {
            info!(package = %candidate.package, "using standard library printer");
            return candidate.clone();
        }
        match toolchain.package_dir(&candidate.package, dir) {
            Ok(Some(_)) => {
                info!(package = %candidate.package, "found printer package");
                return candidate.clone();
            }
            Ok(None) => debug!(package = %candidate.package, "printer package not available"),
            Err(e) => debug!(package = %candidate.package, error = %e, "printer probe failed"),
        }
    }
    PrinterSpec::fmt()
}
