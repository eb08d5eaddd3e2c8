use crate::ast::ImportSpec;
use crate::classify::ClassifyError;
use crate::compiler::{ParseError, parse_file};

const PACKAGE_CLAUSE: &str = "package main\n";

/// Pulls Go import declarations out of a fragment.
///
/// Import lines are blanked with spaces rather than removed so offsets in the
/// remaining text still point into the original fragment.
pub fn split_imports(fragment: &str) -> Result<(Vec<ImportSpec>, String), ClassifyError> {
    let mut specs = Vec::new();
    let mut rest = String::with_capacity(fragment.len());
    let mut group: Option<(usize, String)> = None;
    let mut offset = 0;

    for line in fragment.split_inclusive('\n') {
        let trimmed = line.trim();
        let is_import = group.is_some() || starts_import(trimmed);

        if is_import {
            for c in line.chars() {
                match c {
                    '\n' => rest.push('\n'),
                    _ => rest.extend(std::iter::repeat_n(' ', c.len_utf8())),
                }
            }
            match group.as_mut() {
                Some((_, text)) => text.push_str(line),
                None if trimmed.contains('(') && !trimmed.contains(')') => {
                    group = Some((offset, line.to_string()));
                }
                None => specs.extend(parse_imports(fragment, offset, line)?),
            }
            if trimmed.starts_with(')') {
                if let Some((start, text)) = group.take() {
                    specs.extend(parse_imports(fragment, start, &text)?);
                }
            }
        } else {
            rest.push_str(line);
        }
        offset += line.len();
    }

    if group.is_some() {
        return Err(ClassifyError::Continue);
    }
    Ok((specs, rest))
}

fn starts_import(line: &str) -> bool {
    line.strip_prefix("import")
        .and_then(|after| after.chars().next())
        .is_some_and(|c| c.is_whitespace() || c == '"' || c == '(' || c == '`')
}

fn parse_imports(fragment: &str, start: usize, text: &str) -> Result<Vec<ImportSpec>, ParseError> {
    let source = format!("{}{}", PACKAGE_CLAUSE, text);
    match parse_file(&source) {
        Ok(file) if file.decls.is_empty() => Ok(file.imports),
        Ok(_) => Err(ParseError::at(fragment, start, "unexpected declaration after import")),
        Err(e) => {
            let offset = start + e.offset.saturating_sub(PACKAGE_CLAUSE.len());
            Err(ParseError::at(fragment, offset.min(fragment.len()), e.message))
        }
    }
}
