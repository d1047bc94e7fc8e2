use std::str;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum HeaderError {
    #[error("source is not valid UTF-8")]
    NotUtf8,
    #[error("no package clause found")]
    MissingPackageClause,
    #[error("import block opened but never closed")]
    UnterminatedImportBlock,
}

/// What the walker needs out of a source file, without running a real
/// parser over it: the declared package name, the paths it imports
/// (quotes stripped, as written), and any `go:build` directive text found
/// in the file's leading comments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceHeader {
    pub package_name: String,
    pub imports: Vec<String>,
    pub build_directives: Vec<String>,
}

/// Strips a line comment (`// ...`) or block comment (`/* ... */`) marker
/// from a single line, returning the inner text if the line is entirely a
/// comment, or `None` otherwise.
fn strip_comment_marker(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if let Some(rest) = trimmed.strip_prefix("//") {
        return Some(rest.trim());
    }
    if let Some(rest) = trimmed.strip_prefix("/*") {
        return Some(rest.trim_end_matches("*/").trim());
    }
    None
}

/// Scans file bytes for the package clause, the first import block and
/// every top-of-file comment, the way `go/parser`'s `ImportsOnly` mode
/// does: enough to recover identity and dependencies, not a full AST.
pub fn parse_header(bytes: &[u8]) -> Result<SourceHeader, HeaderError> {
    let text = str::from_utf8(bytes).map_err(|_| HeaderError::NotUtf8)?;

    let mut build_directives = Vec::new();
    let mut package_name = None;
    let mut lines = text.lines().peekable();

    while let Some(line) = lines.peek() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            lines.next();
            continue;
        }

        if let Some(comment) = strip_comment_marker(trimmed) {
            if let Some(directive) = comment.strip_prefix("go:build") {
                build_directives.push(directive.trim().to_string());
            }
            lines.next();
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix("package ") {
            package_name = Some(rest.trim().to_string());
            lines.next();
            break;
        }

        // Some other top-level token before `package` — not our concern,
        // keep scanning for the clause.
        lines.next();
    }

    let package_name = package_name.ok_or(HeaderError::MissingPackageClause)?;

    let mut imports = Vec::new();
    while let Some(line) = lines.next() {
        let trimmed = line.trim();

        if trimmed.is_empty() || strip_comment_marker(trimmed).is_some() {
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix("import ") {
            let rest = rest.trim();
            if rest.starts_with('(') {
                let mut closed = false;
                for inner in lines.by_ref() {
                    let inner_trimmed = inner.trim();
                    if inner_trimmed == ")" || inner_trimmed.starts_with(")") {
                        closed = true;
                        break;
                    }
                    if let Some(path) = extract_quoted(inner_trimmed) {
                        imports.push(path);
                    }
                }
                if !closed {
                    return Err(HeaderError::UnterminatedImportBlock);
                }
            } else if let Some(path) = extract_quoted(rest) {
                imports.push(path);
            }
            break;
        }

        // First non-import, non-comment top-level line after the package
        // clause ends the header region we care about.
        break;
    }

    Ok(SourceHeader {
        package_name,
        imports,
        build_directives,
    })
}

fn extract_quoted(line: &str) -> Option<String> {
    let start = line.find('"')?;
    let rest = &line[start + 1..];
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn single_import() {
        let header = parse_header(
            b"package foo\n\nimport \"bar/baz\"\n\nfunc main() {}\n",
        )
        .unwrap();
        assert_eq!(header.package_name, "foo");
        assert_eq!(header.imports, vec!["bar/baz".to_string()]);
        assert!(header.build_directives.is_empty());
    }

    #[test]
    fn single_import_with_blank_or_named_alias() {
        let header = parse_header(
            b"package foo\n\nimport _ \"net/http/pprof\"\n",
        )
        .unwrap();
        assert_eq!(header.imports, vec!["net/http/pprof".to_string()]);

        let header = parse_header(
            b"package foo\n\nimport foo \"bar/baz\"\n",
        )
        .unwrap();
        assert_eq!(header.imports, vec!["bar/baz".to_string()]);
    }

    #[test]
    fn grouped_imports() {
        let header = parse_header(
            b"package foo\n\nimport (\n\t\"bar/baz\"\n\t\"fmt\"\n)\n\nfunc main() {}\n",
        )
        .unwrap();
        assert_eq!(header.package_name, "foo");
        assert_eq!(
            header.imports,
            vec!["bar/baz".to_string(), "fmt".to_string()]
        );
    }

    #[test]
    fn build_directive_from_leading_comment() {
        let header = parse_header(
            b"//go:build linux && !cgo\n\npackage foo\n\nimport \"fmt\"\n",
        )
        .unwrap();
        assert_eq!(header.build_directives, vec!["linux && !cgo".to_string()]);
    }

    #[test]
    fn block_comment_build_directive() {
        let header = parse_header(
            b"/*go:build darwin*/\n\npackage foo\n",
        )
        .unwrap();
        assert_eq!(header.build_directives, vec!["darwin".to_string()]);
    }

    #[test]
    fn unrelated_leading_comment_is_not_a_directive() {
        let header = parse_header(
            b"// Copyright 2024\n\npackage foo\n\nimport \"fmt\"\n",
        )
        .unwrap();
        assert!(header.build_directives.is_empty());
    }

    #[test]
    fn no_imports_is_not_an_error() {
        let header = parse_header(b"package foo\n\nfunc main() {}\n").unwrap();
        assert_eq!(header.package_name, "foo");
        assert!(header.imports.is_empty());
    }

    #[test]
    fn missing_package_clause_is_malformed() {
        let err = parse_header(b"import \"fmt\"\n").unwrap_err();
        assert_eq!(err, HeaderError::MissingPackageClause);
    }

    #[test]
    fn unterminated_import_block_is_malformed() {
        let err = parse_header(b"package foo\n\nimport (\n\t\"fmt\"\n").unwrap_err();
        assert_eq!(err, HeaderError::UnterminatedImportBlock);
    }

    #[test]
    fn non_utf8_is_malformed() {
        let err = parse_header(&[0xff, 0xfe]).unwrap_err();
        assert_eq!(err, HeaderError::NotUtf8);
    }
}
