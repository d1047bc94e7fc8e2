use std::io::Read;

use anyhow::Context;
use clap::Parser;

use driver::cli::Cli;
use driver::config::PatternSetConfig;
use driver::request::DriverRequest;
use logger::StdioLogger;
use package_fs::OsFs;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let request = if cli.stdin_request {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading request from stdin")?;
        serde_json::from_str(&buf).context("parsing request JSON")?
    } else {
        DriverRequest {
            env: cli.env.clone(),
            build_flags: cli.build_flags.clone(),
            tests: false,
            overlay: None,
        }
    };

    let cwd = std::env::current_dir().context("reading current directory")?;
    let repo_root = repo_root::find_git_root_from(&cwd);
    let config = PatternSetConfig::load(&repo_root).unwrap_or_default();
    let patterns = config.expand_all(&cli.patterns);

    let fs = OsFs;
    let logger = StdioLogger::new();

    let response = driver::run(&request, &patterns, &fs, &cwd, &logger)
        .context("running packages driver")?;

    serde_json::to_writer(std::io::stdout(), &response).context("writing response JSON")?;
    println!();

    Ok(())
}
