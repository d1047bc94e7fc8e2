use clap::Parser;

/// Command-line surface for the `packages-driver` binary (SPEC_FULL §4.K).
/// In production the real toolchain-level loader always sends a JSON
/// request over stdin; `--env`/`--build-flag` exist so the driver can be
/// exercised directly from a shell without that caller.
#[derive(Debug, Parser)]
#[command(name = "packages-driver", about = "External package-graph driver")]
pub struct Cli {
    /// Patterns to resolve: a bare package identifier, `<id>/...`, or
    /// `file=<path>` (spec.md §4.F). `@name` expands against the optional
    /// `.packages-driver.json` pattern-set file.
    pub patterns: Vec<String>,

    /// `KEY=VALUE`, repeatable; mirrors the request's `Env` field.
    #[arg(long = "env")]
    pub env: Vec<String>,

    /// Repeatable; mirrors the request's `BuildFlags` field.
    #[arg(long = "build-flag")]
    pub build_flags: Vec<String>,

    /// Read the full JSON request from stdin instead of assembling one from
    /// `--env`/`--build-flag`.
    #[arg(long)]
    pub stdin_request: bool,
}
