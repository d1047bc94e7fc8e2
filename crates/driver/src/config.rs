use std::collections::HashMap;
use std::io;
use std::path::Path;

use serde::Deserialize;

const CONFIG_FILE_NAME: &str = ".packages-driver.json";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("parsing {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// An optional, purely local convenience layered in front of the driver
/// façade (component G): named pattern sets, so a caller can pass `@default`
/// instead of spelling out a pattern list. Never touches the response
/// schema.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatternSetConfig {
    #[serde(flatten)]
    sets: HashMap<String, Vec<String>>,
}

impl PatternSetConfig {
    /// Tolerates a missing file the way the teacher's `tsconfig.json`
    /// readers tolerate an absent config: empty config, not an error.
    pub fn load(repo_root: &Path) -> Result<Self, ConfigError> {
        let path = repo_root.join(CONFIG_FILE_NAME);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };

        serde_json::from_slice(&bytes).map_err(|source| ConfigError::Json {
            path: path.display().to_string(),
            source,
        })
    }

    /// Expands an `@name` pattern into its configured list, or `None` if
    /// `pattern` isn't an `@`-reference or names an unknown set.
    pub fn expand(&self, pattern: &str) -> Option<Vec<String>> {
        let name = pattern.strip_prefix('@')?;
        self.sets.get(name).cloned()
    }

    /// Expands every `@`-reference in `patterns`, leaving other patterns
    /// untouched; an unknown `@name` is passed through verbatim so the
    /// locator's own "not found" diagnostics can report it.
    pub fn expand_all(&self, patterns: &[String]) -> Vec<String> {
        patterns
            .iter()
            .flat_map(|p| self.expand(p).unwrap_or_else(|| vec![p.clone()]))
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn missing_config_file_is_empty() {
        let dir = tempdir().unwrap();
        let config = PatternSetConfig::load(dir.path()).unwrap();
        assert!(config.expand("@default").is_none());
    }

    #[test]
    fn expands_named_pattern_set() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(".packages-driver.json"),
            r#"{"default": ["example.com/m/...", "example.com/m/cmd"]}"#,
        )
        .unwrap();

        let config = PatternSetConfig::load(dir.path()).unwrap();
        assert_eq!(
            config.expand("@default"),
            Some(vec![
                "example.com/m/...".to_string(),
                "example.com/m/cmd".to_string()
            ])
        );
    }

    #[test]
    fn expand_all_passes_through_unknown_references() {
        let dir = tempdir().unwrap();
        let config = PatternSetConfig::load(dir.path()).unwrap();
        let expanded = config.expand_all(&["@missing".to_string(), "example.com/m".to_string()]);
        assert_eq!(
            expanded,
            vec!["@missing".to_string(), "example.com/m".to_string()]
        );
    }
}
