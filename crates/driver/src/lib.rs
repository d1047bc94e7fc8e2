//! Component G: the driver façade. Accepts a request plus command-line
//! patterns, orchestrates the locator and walker, and assembles the JSON
//! response (spec.md §4.G).

pub mod cli;
pub mod config;
pub mod environment;
pub mod request;
pub mod response;

use std::path::Path;

use build_constraint::Evaluator;
use logger::Logger;
use package_fs::PackageFs;
use package_locator::{LocateError, Locator, LocatorConfig};
use package_walker::{Walker, WalkOptions};

pub use environment::{Environment, EnvironmentError};
pub use request::DriverRequest;
pub use response::{DriverResponse, PackageRecord};

#[derive(thiserror::Error, Debug)]
pub enum DriverError {
    #[error(transparent)]
    Environment(#[from] EnvironmentError),
    #[error("constructing package locator: {0}")]
    Locate(#[from] LocateError),
    #[error("walking package graph: {0}")]
    Walk(#[from] package_walker::WalkError),
    #[error("toolchain GOVERSION {0:?} is not of the form major.minor[.patch]")]
    MalformedGoVersion(String),
}

/// The numeric minor component of a `goN.M[.P]`-shaped version string.
/// Strict per spec.md §4.G: any other shape is a hard failure, not a best
/// effort parse.
fn parse_go_version_minor(version: &str) -> Result<i64, DriverError> {
    let stripped = version.strip_prefix("go").unwrap_or(version);
    let mut parts = stripped.split('.');

    let major = parts.next().unwrap_or("");
    let minor = parts.next().ok_or_else(|| DriverError::MalformedGoVersion(version.to_string()))?;
    // a trailing patch component is allowed but not required; anything past
    // it, or a non-numeric major/minor, is malformed.
    if major.parse::<u64>().is_err() {
        return Err(DriverError::MalformedGoVersion(version.to_string()));
    }
    if let Some(patch) = parts.next() {
        if patch.parse::<u64>().is_err() {
            return Err(DriverError::MalformedGoVersion(version.to_string()));
        }
    }
    if parts.next().is_some() {
        return Err(DriverError::MalformedGoVersion(version.to_string()));
    }

    minor
        .parse::<i64>()
        .map_err(|_| DriverError::MalformedGoVersion(version.to_string()))
}

/// Cheap, purely syntactic check for whether `pattern` could plausibly
/// resolve within this run, using only the main module's import path (a
/// single manifest read) — never the locator's four-root filesystem walk.
/// SPEC_FULL.md §4.G requires the `not_handled` decision to be made before
/// any filesystem walk happens.
///
/// A pattern is plausible if it's locally scoped (`file=`), if it falls
/// under the main module's import path, or if its first path segment has
/// no dot in it — the same convention the toolchain itself uses to tell a
/// standard-library import (`fmt`, `encoding/json`) apart from a
/// remote-host module path (`github.com/x/y`) that isn't ours.
fn plausibly_handled(pattern: &str, module_path: &str) -> bool {
    if pattern.starts_with("file=") {
        return true;
    }

    let id = pattern.strip_suffix("/...").unwrap_or(pattern);

    if id == module_path
        || id
            .strip_prefix(module_path)
            .map(|rest| rest.starts_with('/'))
            .unwrap_or(false)
    {
        return true;
    }

    match id.split('/').next() {
        Some(first) => !first.contains('.'),
        None => false,
    }
}

/// Runs the full driver pipeline: builds the `Environment`, decides
/// `not_handled` from a single cheap manifest read, and (if handled)
/// constructs the locator, runs the walker, and assembles the response.
pub fn run<L: Logger>(
    req: &DriverRequest,
    patterns: &[String],
    fs: &dyn PackageFs,
    cwd: &Path,
    logger: L,
) -> Result<DriverResponse, DriverError> {
    let env_map = environment::parse_env(&req.env);

    if patterns.is_empty() {
        let arch = env_map.get("GOARCH").cloned().unwrap_or_default();
        return Ok(DriverResponse::not_handled(arch));
    }

    let environment = Environment::build(&env_map, &req.build_flags, patterns.to_vec(), cwd, fs)?;

    // A single manifest read is enough to decide `not_handled` without
    // paying for the locator's four-root filesystem walk.
    let manifest_bytes = fs
        .read_file(&environment.module_manifest_path)
        .map_err(LocateError::Io)?;
    let manifest = manifest::parse_manifest(&manifest_bytes).map_err(LocateError::Manifest)?;

    let any_plausible = patterns
        .iter()
        .any(|p| plausibly_handled(p, &manifest.module_path));
    if !any_plausible {
        return Ok(DriverResponse::not_handled(environment.arch.clone()));
    }

    let locator = Locator::new(
        fs,
        LocatorConfig {
            module_manifest_path: &environment.module_manifest_path,
            toolchain_root: &environment.toolchain_root,
            dep_cache: &environment.dep_cache,
            vendor_mode: environment.vendor_mode,
        },
    )?;

    let go_version = parse_go_version_minor(&environment.version)?;

    let evaluator = Evaluator::new(logger.clone());
    let walk_environment = package_walker::Environment {
        toolchain_root: environment.toolchain_root.clone(),
        targets: environment.targets.clone(),
        tags: environment.tags.clone(),
    };

    let walker = Walker::new(
        fs,
        &locator,
        &evaluator,
        walk_environment,
        WalkOptions::default(),
        logger.clone(),
    );

    let (output, diagnostics) = walker.run(patterns)?;
    for diagnostic in Into::<Vec<_>>::into(diagnostics) {
        logger.warn(format!("{diagnostic:?}"));
    }

    let packages = output
        .packages
        .values()
        .map(PackageRecord::from)
        .collect();

    Ok(DriverResponse {
        not_handled: false,
        compiler: "gc".to_string(),
        arch: environment.arch,
        go_version,
        roots: output.roots,
        packages,
    })
}
