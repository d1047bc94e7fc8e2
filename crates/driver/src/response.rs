use std::collections::BTreeMap;

use serde::Serialize;

use package_walker::Package;

/// The JSON response written to stdout (spec.md §6). Field names are
/// `PascalCase` to match the upstream package-loader protocol this driver
/// plugs into.
#[derive(Debug, Clone, Serialize)]
pub struct DriverResponse {
    #[serde(rename = "NotHandled")]
    pub not_handled: bool,
    #[serde(rename = "Compiler")]
    pub compiler: String,
    #[serde(rename = "Arch")]
    pub arch: String,
    #[serde(rename = "GoVersion")]
    pub go_version: i64,
    #[serde(rename = "Roots")]
    pub roots: Vec<String>,
    #[serde(rename = "Packages")]
    pub packages: Vec<PackageRecord>,
}

impl DriverResponse {
    /// The `not_handled` short-circuit: no filesystem walk happened, so
    /// every field but the two booleans carries its zero value.
    pub fn not_handled(arch: String) -> Self {
        Self {
            not_handled: true,
            compiler: "gc".to_string(),
            arch,
            go_version: 0,
            roots: Vec::new(),
            packages: Vec::new(),
        }
    }
}

/// Mirrors spec.md §6's package record. `OtherFiles`/`EmbedFiles`/
/// `EmbedPatterns`/`ExportFile`/`Target` have no counterpart in the data
/// model (spec.md §3) and are always emitted empty — present only so the
/// response shape matches what callers of the real protocol expect.
#[derive(Debug, Clone, Serialize)]
pub struct PackageRecord {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "PkgPath")]
    pub pkg_path: String,
    #[serde(rename = "Dir")]
    pub dir: String,
    #[serde(rename = "Errors")]
    pub errors: Vec<String>,
    #[serde(rename = "GoFiles")]
    pub go_files: Vec<String>,
    #[serde(rename = "CompiledGoFiles")]
    pub compiled_go_files: Vec<String>,
    #[serde(rename = "OtherFiles")]
    pub other_files: Vec<String>,
    #[serde(rename = "EmbedFiles")]
    pub embed_files: Vec<String>,
    #[serde(rename = "EmbedPatterns")]
    pub embed_patterns: Vec<String>,
    #[serde(rename = "IgnoredFiles")]
    pub ignored_files: Vec<String>,
    #[serde(rename = "ExportFile")]
    pub export_file: String,
    #[serde(rename = "Target")]
    pub target: String,
    #[serde(rename = "Imports")]
    pub imports: BTreeMap<String, String>,
    #[serde(rename = "DepOnly")]
    pub dep_only: bool,
}

fn path_to_string(path: &std::path::Path) -> String {
    path.to_string_lossy().to_string()
}

impl From<&Package> for PackageRecord {
    fn from(pkg: &Package) -> Self {
        Self {
            id: pkg.id.clone(),
            name: pkg.name.clone(),
            pkg_path: pkg.id.clone(),
            dir: path_to_string(&pkg.dir),
            errors: pkg.errors.clone(),
            go_files: pkg.go_files.iter().map(|p| path_to_string(p)).collect(),
            compiled_go_files: pkg
                .compiled_go_files
                .iter()
                .map(|p| path_to_string(p))
                .collect(),
            other_files: Vec::new(),
            embed_files: Vec::new(),
            embed_patterns: Vec::new(),
            ignored_files: pkg
                .ignored_files
                .iter()
                .map(|p| path_to_string(p))
                .collect(),
            export_file: String::new(),
            target: String::new(),
            imports: pkg.imports.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            dep_only: pkg.dep_only,
        }
    }
}
