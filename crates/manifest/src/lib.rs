use std::str;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ManifestError {
    #[error("manifest is not valid UTF-8")]
    NotUtf8,
    #[error("manifest has no `module` directive")]
    MissingModuleDirective,
}

/// The subset of a manifest file's contents this system cares about: the
/// module's declared import path. Every other directive (require/replace
/// equivalents) is out of scope — the manifest parser is treated as a black
/// box beyond this one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub module_path: String,
}

/// Parses a line-oriented manifest: one directive per line, first
/// whitespace-separated token is a keyword. Only the `module <path>`
/// directive is extracted; everything else (including `//`-prefixed
/// comments and blank lines) is ignored.
pub fn parse_manifest(bytes: &[u8]) -> Result<Manifest, ManifestError> {
    let text = str::from_utf8(bytes).map_err(|_| ManifestError::NotUtf8)?;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }

        let mut parts = line.splitn(2, char::is_whitespace);
        let Some(keyword) = parts.next() else {
            continue;
        };

        if keyword == "module" {
            let module_path = parts.next().unwrap_or("").trim();
            if module_path.is_empty() {
                continue;
            }
            return Ok(Manifest {
                module_path: module_path.to_string(),
            });
        }
    }

    Err(ManifestError::MissingModuleDirective)
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_module_directive() {
        let manifest = parse_manifest(b"module example.com/m\n\ngo 1.24\n").unwrap();
        assert_eq!(manifest.module_path, "example.com/m");
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let manifest = parse_manifest(
            b"// this is a comment\n\n\nmodule example.com/m\nrequire foo v1.0.0\n",
        )
        .unwrap();
        assert_eq!(manifest.module_path, "example.com/m");
    }

    #[test]
    fn missing_module_directive_is_malformed() {
        let err = parse_manifest(b"go 1.24\nrequire foo v1.0.0\n").unwrap_err();
        assert_eq!(err, ManifestError::MissingModuleDirective);
    }

    #[test]
    fn non_utf8_is_malformed() {
        let err = parse_manifest(&[0xff, 0xfe, 0x00]).unwrap_err();
        assert_eq!(err, ManifestError::NotUtf8);
    }

    #[test]
    fn empty_manifest_is_malformed() {
        let err = parse_manifest(b"").unwrap_err();
        assert_eq!(err, ManifestError::MissingModuleDirective);
    }
}
