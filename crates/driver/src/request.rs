use serde::Deserialize;

/// The JSON request read from stdin (spec.md §6). `tests` and `overlay` are
/// accepted so a real toolchain-level caller's request still deserializes,
/// but neither influences the core per spec.md §1's non-goals.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DriverRequest {
    #[serde(default, rename = "Env")]
    pub env: Vec<String>,
    #[serde(default, rename = "BuildFlags")]
    pub build_flags: Vec<String>,
    #[serde(default, rename = "Tests")]
    pub tests: bool,
    #[serde(default, rename = "Overlay")]
    pub overlay: Option<serde_json::Value>,
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn deserializes_expected_fields() {
        let req: DriverRequest = serde_json::from_str(
            r#"{"Env": ["GOOS=linux"], "BuildFlags": ["-tags=foo"], "Tests": true}"#,
        )
        .unwrap();

        assert_eq!(req.env, vec!["GOOS=linux".to_string()]);
        assert_eq!(req.build_flags, vec!["-tags=foo".to_string()]);
        assert!(req.tests);
        assert!(req.overlay.is_none());
    }

    #[test]
    fn missing_fields_default_empty() {
        let req: DriverRequest = serde_json::from_str("{}").unwrap();
        assert!(req.env.is_empty());
        assert!(req.build_flags.is_empty());
        assert!(!req.tests);
    }
}
