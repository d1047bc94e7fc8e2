use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// OS family aliases seeded into the tag set alongside `os` itself, mirroring
/// the toolchain's own `unix`-build-tag convention (spec.md §3's
/// "OS-family alias (e.g. linux -> {linux, unix})").
const UNIX_LIKE: &[&str] = &[
    "aix",
    "android",
    "darwin",
    "dragonfly",
    "freebsd",
    "hurd",
    "illumos",
    "ios",
    "linux",
    "netbsd",
    "openbsd",
    "solaris",
];

#[derive(thiserror::Error, Debug)]
pub enum EnvironmentError {
    #[error("request env is missing GOMOD (path to the main module's manifest)")]
    MissingGomod,
    #[error("request env is missing GOROOT")]
    MissingGoroot,
    #[error("request env is missing GOPATH")]
    MissingGopath,
    #[error("request env is missing GOOS")]
    MissingGoos,
    #[error("request env is missing GOARCH")]
    MissingGoarch,
    #[error("request env is missing GOVERSION")]
    MissingGoversion,
    #[error("resolving target {raw:?}: {source}")]
    Target {
        raw: String,
        #[source]
        source: abspath::Error,
    },
}

/// Immutable, built once before the locator/walker run. Mirrors spec.md §3's
/// `Environment` value, plus the ambient `targets`/`patterns` the driver
/// needs to thread through to the walker.
#[derive(Debug, Clone)]
pub struct Environment {
    pub module_manifest_path: PathBuf,
    pub toolchain_root: PathBuf,
    pub dep_cache: PathBuf,
    pub os: String,
    pub arch: String,
    pub version: String,
    pub vendor_mode: bool,
    pub tags: HashSet<String>,
    pub targets: Vec<PathBuf>,
    pub patterns: Vec<String>,
}

/// Parses the `KEY=VALUE` strings from the request's `env[]` field. A
/// malformed entry (no `=`) is ignored, matching the toolchain-environment
/// probe's tolerant behavior (out of scope here, per spec.md §1, but this is
/// the one place the driver itself reads raw env strings).
pub fn parse_env(entries: &[String]) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for entry in entries {
        if let Some((key, value)) = entry.split_once('=') {
            map.insert(key.to_string(), value.to_string());
        }
    }
    map
}

fn parse_goflags_vendor_mode(goflags: Option<&String>, build_flags: &[String]) -> bool {
    let in_goflags = goflags
        .map(|flags| flags.split_whitespace().any(|f| f == "-mod=vendor"))
        .unwrap_or(false);
    let in_build_flags = build_flags.iter().any(|f| f == "-mod=vendor");
    in_goflags || in_build_flags
}

fn parse_targets(
    raw: Option<&String>,
    cwd: &Path,
) -> Result<Vec<PathBuf>, EnvironmentError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    let mut targets = Vec::new();
    for piece in raw.split(',') {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }

        let absolute =
            abspath::join_abspath(cwd, piece).map_err(|source| EnvironmentError::Target {
                raw: piece.to_string(),
                source,
            })?;
        targets.push(absolute);
    }

    Ok(targets)
}

impl Environment {
    pub fn build(
        env: &HashMap<String, String>,
        build_flags: &[String],
        patterns: Vec<String>,
        cwd: &Path,
        fs: &dyn package_fs::PackageFs,
    ) -> Result<Self, EnvironmentError> {
        let module_manifest_path = env
            .get("GOMOD")
            .ok_or(EnvironmentError::MissingGomod)?
            .into();
        let toolchain_root: PathBuf = env
            .get("GOROOT")
            .ok_or(EnvironmentError::MissingGoroot)?
            .into();
        let gopath: PathBuf = env
            .get("GOPATH")
            .ok_or(EnvironmentError::MissingGopath)?
            .into();
        let os = env
            .get("GOOS")
            .ok_or(EnvironmentError::MissingGoos)?
            .clone();
        let arch = env
            .get("GOARCH")
            .ok_or(EnvironmentError::MissingGoarch)?
            .clone();
        let version = env
            .get("GOVERSION")
            .ok_or(EnvironmentError::MissingGoversion)?
            .clone();

        let vendor_mode = parse_goflags_vendor_mode(env.get("GOFLAGS"), build_flags);
        let dep_cache = gopath.join("pkg").join("mod");

        let mut tags = HashSet::new();
        tags.insert(os.clone());
        tags.insert(arch.clone());
        if UNIX_LIKE.contains(&os.as_str()) {
            tags.insert("unix".to_string());
        }
        if env.get("CGO_ENABLED").map(String::as_str) == Some("1") {
            tags.insert("cgo".to_string());
        }

        let mut targets = parse_targets(env.get("SPDTARGETS"), cwd)?;
        // Per SPEC_FULL §4.F's supplement: targets that don't resolve to an
        // existing directory are dropped silently at construction, not a
        // hard error; the walker never sees them.
        targets.retain(|dir| fs.exists(dir));

        Ok(Self {
            module_manifest_path,
            toolchain_root,
            dep_cache,
            os,
            arch,
            version,
            vendor_mode,
            tags,
            targets,
            patterns,
        })
    }
}
