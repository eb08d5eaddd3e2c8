//! Keeps the program's import list minimal and correct.
//!
//! Every import ever requested is remembered in the [`ImportSet`]; the
//! program only declares the ones currently referenced. Before each run the
//! configured [`ImportFixer`] rewrites the rendered source.

use crate::ast::visit::QualifierCollector;
use crate::ast::ImportSpec;
use crate::compiler::{ParseError, parse_file, render_file};
use crate::program::Program;
use crate::runner::find_executable;
use clap::ValueEnum;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

#[derive(Debug)]
pub enum FixError {
    /// The source handed to the fixer does not parse.
    Syntax(ParseError),
    /// The fixer tool ran and failed.
    Tool { tool: String, stderr: String },
    Io(io::Error),
}

impl fmt::Display for FixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixError::Syntax(e) => write!(f, "{}", e),
            FixError::Tool { tool, stderr } => write!(f, "{} failed: {}", tool, stderr.trim()),
            FixError::Io(e) => write!(f, "import fixer I/O error: {}", e),
        }
    }
}

impl std::error::Error for FixError {}

impl From<io::Error> for FixError {
    fn from(error: io::Error) -> Self {
        FixError::Io(error)
    }
}

impl From<ParseError> for FixError {
    fn from(error: ParseError) -> Self {
        FixError::Syntax(error)
    }
}

/// Source text in, source text with corrected imports out.
pub trait ImportFixer {
    fn name(&self) -> &str;
    fn fix(&self, source: &str) -> Result<String, FixError>;
}

/// The external `goimports` tool.
#[derive(Debug, Clone)]
pub struct GoImports {
    binary: PathBuf,
}

impl GoImports {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl ImportFixer for GoImports {
    fn name(&self) -> &str {
        "goimports"
    }

    fn fix(&self, source: &str) -> Result<String, FixError> {
        let mut child = Command::new(&self.binary)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(source.as_bytes())?;
        }
        let output = child.wait_with_output()?;
        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        match syntax_error_from_stderr(source, &stderr) {
            Some(error) => Err(FixError::Syntax(error)),
            None => Err(FixError::Tool {
                tool: "goimports".to_string(),
                stderr,
            }),
        }
    }
}

/// Reads `<file>:<line>:<col>: message` from the first line of a Go tool's
/// stderr.
pub fn syntax_error_from_stderr(source: &str, stderr: &str) -> Option<ParseError> {
    let first = stderr.lines().next()?;
    let mut parts = first.splitn(4, ':');
    let _file = parts.next()?;
    let line: usize = parts.next()?.trim().parse().ok()?;
    let column: usize = parts.next()?.trim().parse().ok()?;
    let message = parts.next()?.trim();
    let offset = source
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum::<usize>()
        + column.saturating_sub(1);
    Some(ParseError::at(source, offset.min(source.len()), message))
}

/// Well-known standard library packages the builtin fixer may add.
const STDLIB: &[(&str, &str)] = &[
    ("atomic", "sync/atomic"),
    ("base64", "encoding/base64"),
    ("big", "math/big"),
    ("binary", "encoding/binary"),
    ("bits", "math/bits"),
    ("bufio", "bufio"),
    ("bytes", "bytes"),
    ("cmp", "cmp"),
    ("cmplx", "math/cmplx"),
    ("context", "context"),
    ("csv", "encoding/csv"),
    ("errors", "errors"),
    ("exec", "os/exec"),
    ("filepath", "path/filepath"),
    ("flag", "flag"),
    ("fmt", "fmt"),
    ("heap", "container/heap"),
    ("hex", "encoding/hex"),
    ("http", "net/http"),
    ("io", "io"),
    ("json", "encoding/json"),
    ("list", "container/list"),
    ("log", "log"),
    ("maps", "maps"),
    ("math", "math"),
    ("md5", "crypto/md5"),
    ("net", "net"),
    ("os", "os"),
    ("path", "path"),
    ("rand", "math/rand"),
    ("reflect", "reflect"),
    ("regexp", "regexp"),
    ("runtime", "runtime"),
    ("sha256", "crypto/sha256"),
    ("slices", "slices"),
    ("sort", "sort"),
    ("strconv", "strconv"),
    ("strings", "strings"),
    ("sync", "sync"),
    ("tabwriter", "text/tabwriter"),
    ("template", "text/template"),
    ("time", "time"),
    ("unicode", "unicode"),
    ("url", "net/url"),
    ("utf8", "unicode/utf8"),
];

pub fn stdlib_path(name: &str) -> Option<&'static str> {
    STDLIB
        .binary_search_by(|(candidate, _)| candidate.cmp(&name))
        .ok()
        .map(|index| STDLIB[index].1)
}

/// In-process fixer: drops imports nothing refers to and adds well-known
/// standard library packages that are referred to but missing.
#[derive(Debug, Clone, Default)]
pub struct BuiltinFixer;

impl ImportFixer for BuiltinFixer {
    fn name(&self) -> &str {
        "builtin"
    }

    fn fix(&self, source: &str) -> Result<String, FixError> {
        let mut file = parse_file(source)?;
        let usage = QualifierCollector::from_file(&file);

        let mut imports: Vec<ImportSpec> = file
            .imports
            .iter()
            .filter(|spec| spec.is_side_effect() || usage.uses(&spec.package_name()))
            .cloned()
            .collect();

        for qualifier in &usage.qualifiers {
            let provided = imports.iter().any(|spec| spec.package_name() == *qualifier);
            if provided || usage.declares(qualifier) {
                continue;
            }
            if let Some(path) = stdlib_path(qualifier) {
                debug!(path, "adding missing import");
                imports.push(ImportSpec::new(path));
            }
        }

        imports.sort_by(|a, b| a.path.cmp(&b.path));
        imports.dedup();
        file.imports = imports;
        Ok(render_file(&file, false))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FixerChoice {
    #[default]
    Auto,
    Goimports,
    Builtin,
}

/// `auto` prefers `goimports` when it can be found.
pub fn select_fixer(choice: FixerChoice, goimports: Option<PathBuf>) -> Box<dyn ImportFixer> {
    let located = || goimports.clone().or_else(|| find_executable("goimports"));
    match choice {
        FixerChoice::Builtin => Box::new(BuiltinFixer),
        FixerChoice::Goimports => Box::new(GoImports::new(
            located().unwrap_or_else(|| PathBuf::from("goimports")),
        )),
        FixerChoice::Auto => match located() {
            Some(binary) => Box::new(GoImports::new(binary)),
            None => {
                debug!("goimports not found, using builtin import fixer");
                Box::new(BuiltinFixer)
            }
        },
    }
}

/// Checks an import path the way the Go toolchain does before resolving it.
pub fn validate_import_path(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("empty import path".to_string());
    }
    if path.starts_with('/') || path.ends_with('/') || path.contains("//") {
        return Err(format!("malformed import path {:?}", path));
    }
    const FORBIDDEN: &str = "!\"#$%&'()*,:;<=>?[\\]^`{|}";
    if let Some(bad) = path
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || FORBIDDEN.contains(*c))
    {
        return Err(format!("invalid char {:?} in import path {:?}", bad, path));
    }
    if path.split('/').any(|elem| elem == "." || elem == "..") {
        return Err(format!("relative import path {:?} not allowed", path));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEntry {
    pub spec: ImportSpec,
    /// Whether the program currently declares it.
    pub used: bool,
}

/// Every import requested during the session, keyed by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSet {
    entries: Vec<ImportEntry>,
}

impl ImportSet {
    pub fn get(&self, path: &str) -> Option<&ImportEntry> {
        self.entries.iter().find(|entry| entry.spec.path == path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Records a request; a later alias for the same path wins.
    pub fn request(&mut self, spec: ImportSpec) -> bool {
        match self.entries.iter_mut().find(|entry| entry.spec.path == spec.path) {
            Some(entry) => {
                if spec.name.is_some() {
                    entry.spec.name = spec.name;
                }
                false
            }
            None => {
                self.entries.push(ImportEntry { spec, used: false });
                true
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImportEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn refresh(&mut self, program: &Program) {
        for spec in program.imports() {
            if !self.contains(&spec.path) {
                self.entries.push(ImportEntry {
                    spec: spec.clone(),
                    used: true,
                });
            }
        }
        for entry in &mut self.entries {
            entry.used = program.has_import(&entry.spec.path);
        }
    }
}

/// Owns the import fixer and the session's import memory.
pub struct ImportResolver {
    fixer: Box<dyn ImportFixer>,
    set: ImportSet,
}

impl ImportResolver {
    pub fn new(fixer: Box<dyn ImportFixer>) -> Self {
        Self {
            fixer,
            set: ImportSet::default(),
        }
    }

    pub fn fixer_name(&self) -> &str {
        self.fixer.name()
    }

    pub fn set(&self) -> &ImportSet {
        &self.set
    }

    pub fn restore(&mut self, set: ImportSet) {
        self.set = set;
    }

    pub fn declared_imports(&self, program: &Program) -> BTreeSet<String> {
        program
            .imports()
            .iter()
            .map(|spec| spec.path.clone())
            .collect()
    }

    /// Adds the import to the program if absent and remembers it. Returns
    /// whether the program changed.
    pub fn add_import(
        &mut self,
        program: &mut Program,
        spec: ImportSpec,
    ) -> Result<bool, ParseError> {
        validate_import_path(&spec.path)
            .map_err(|message| ParseError::at(&spec.path, 0, message))?;
        if let Some(name) = &spec.name {
            let valid = name == "_"
                || name == "."
                || (name.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_')
                    && name.chars().all(|c| c.is_alphanumeric() || c == '_'));
            if !valid {
                return Err(ParseError::at(name, 0, format!("invalid import name {:?}", name)));
            }
        }

        self.set.request(spec.clone());
        if program.has_import(&spec.path) {
            return Ok(false);
        }
        debug!(path = %spec.path, "adding import");
        let mut imports = program.imports().to_vec();
        imports.push(spec.clone());
        program.set_imports(imports);
        if let Some(entry) = self.set.entries.iter_mut().find(|e| e.spec.path == spec.path) {
            entry.used = true;
        }
        Ok(true)
    }

    /// Runs the fixer over the rendered program and replaces the program
    /// with the result.
    pub fn trim_unused(&mut self, program: &mut Program) -> Result<(), FixError> {
        let fixed = self.fix_source(&program.render(false))?;
        program.replace_source(&fixed)?;
        self.set.refresh(program);
        Ok(())
    }

    /// Re-declares remembered imports the program refers to again, then
    /// trims.
    pub fn reconcile(&mut self, program: &mut Program) -> Result<(), FixError> {
        let usage = QualifierCollector::from_file(&program.file());
        let mut imports = program.imports().to_vec();
        for entry in self.set.iter() {
            let name = entry.spec.package_name();
            if !program.has_import(&entry.spec.path)
                && usage.uses(&name)
                && !usage.declares(&name)
            {
                debug!(path = %entry.spec.path, "re-adding remembered import");
                imports.push(entry.spec.clone());
            }
        }
        program.set_imports(imports);
        self.trim_unused(program)
    }

    pub fn fix_source(&self, source: &str) -> Result<String, FixError> {
        self.fixer.fix(source).inspect_err(|e| {
            warn!(fixer = self.fixer.name(), error = %e, "import fixer failed");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Stmt;
    use crate::compiler::parse_stmt_list;
    use crate::printer::PrinterSpec;
    use rstest::rstest;

    fn program_with(body: &str) -> Program {
        let mut program = Program::new(&PrinterSpec::fmt()).unwrap();
        let stmts: Vec<Stmt> = parse_stmt_list(body)
            .unwrap()
            .into_iter()
            .map(|(s, _)| s)
            .collect();
        program.append(stmts);
        program
    }

    #[test]
    fn stdlib_table_is_sorted() {
        assert!(STDLIB.windows(2).all(|w| w[0].0 < w[1].0));
        assert_eq!(stdlib_path("json"), Some("encoding/json"));
        assert_eq!(stdlib_path("nope"), None);
    }

    #[test]
    fn builtin_fixer_drops_unused_and_adds_missing() {
        let source = "package main\n\nimport (\n\t\"os\"\n\t_ \"embed\"\n)\n\n\
                      func main() {\n\tfmt.Println(strings.ToUpper(\"a\"))\n}\n";
        let fixed = BuiltinFixer.fix(source).unwrap();
        let file = parse_file(&fixed).unwrap();
        let paths: Vec<_> = file.imports.iter().map(|s| s.path.as_str()).collect();
        assert_eq!(paths, vec!["embed", "fmt", "strings"]);
    }

    #[test]
    fn builtin_fixer_respects_local_names() {
        let source = "package main\n\nfunc main() {\n\tstrings := T{}\n\t_ = strings.Field\n}\n";
        let fixed = BuiltinFixer.fix(source).unwrap();
        assert!(parse_file(&fixed).unwrap().imports.is_empty());
    }

    #[test]
    fn builtin_fixer_reports_syntax_errors() {
        match BuiltinFixer.fix("package main\nfunc main() {\n") {
            Err(FixError::Syntax(e)) => assert_eq!(e.line, 3),
            other => panic!("Expected syntax error, got {:?}", other),
        }
    }

    #[rstest]
    #[case("fmt", true)]
    #[case("github.com/user/repo/v2", true)]
    #[case("", false)]
    #[case("has space", false)]
    #[case("quote\"d", false)]
    #[case("/abs", false)]
    #[case("a//b", false)]
    #[case("../up", false)]
    fn validates_import_paths(#[case] path: &str, #[case] ok: bool) {
        assert_eq!(validate_import_path(path).is_ok(), ok, "{}", path);
    }

    #[test]
    fn parses_tool_syntax_errors() {
        let source = "package main\n\nfunc main() {\n\tx :=\n}\n";
        let error =
            syntax_error_from_stderr(source, "<standard input>:4:5: expected operand\n").unwrap();
        assert_eq!((error.line, error.column), (4, 5));
        assert_eq!(error.message, "expected operand");
        assert!(syntax_error_from_stderr(source, "goimports: something else").is_none());
    }

    #[test]
    fn add_import_is_idempotent() {
        let mut program = program_with("");
        let mut resolver = ImportResolver::new(Box::new(BuiltinFixer));
        assert!(resolver.add_import(&mut program, ImportSpec::new("strings")).unwrap());
        assert!(!resolver.add_import(&mut program, ImportSpec::new("strings")).unwrap());
        assert_eq!(
            resolver.declared_imports(&program),
            ["fmt", "strings"].iter().map(|s| s.to_string()).collect()
        );
        assert!(resolver.add_import(&mut program, ImportSpec::new("bad path")).is_err());
        assert!(resolver.add_import(&mut program, ImportSpec::named("9x", "os")).is_err());
    }

    #[test]
    fn unused_import_dropped_by_trim() {
        let mut program = program_with("");
        let mut resolver = ImportResolver::new(Box::new(BuiltinFixer));
        resolver.add_import(&mut program, ImportSpec::new("strings")).unwrap();

        resolver.trim_unused(&mut program).unwrap();

        assert!(!program.has_import("strings"));
        let entry = resolver.set().get("strings").unwrap();
        assert!(!entry.used);
    }

    #[test]
    fn reconcile_restores_remembered_alias() {
        let mut program = program_with("");
        let mut resolver = ImportResolver::new(Box::new(BuiltinFixer));
        resolver
            .add_import(&mut program, ImportSpec::named("str", "strings"))
            .unwrap();
        resolver.trim_unused(&mut program).unwrap();
        assert!(!program.has_import("strings"));

        program.append(
            parse_stmt_list("_ = str.ToUpper(\"a\")")
                .unwrap()
                .into_iter()
                .map(|(s, _)| s),
        );
        resolver.reconcile(&mut program).unwrap();

        assert!(program.imports().contains(&ImportSpec::named("str", "strings")));
        assert!(resolver.set().get("strings").unwrap().used);
    }

    #[test]
    fn selects_builtin_when_asked() {
        assert_eq!(select_fixer(FixerChoice::Builtin, None).name(), "builtin");
        let fixer = select_fixer(FixerChoice::Goimports, Some(PathBuf::from("/opt/goimports")));
        assert_eq!(fixer.name(), "goimports");
    }
}
