use std::{fs, path::PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use lev_golden::{Action, Config, Runner, Whitespace};

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.no_color {
        colored::control::set_override(false);
    }

    let workspace = fs::canonicalize(&cli.workspace)
        .with_context(|| format!("failed to resolve workspace {}", cli.workspace.display()))?;
    let config = cli.config(workspace)?;
    let runner = Runner::new(config);
    let summary = runner.run(cli.action)?;

    let log = summary
        .log_file
        .as_ref()
        .map(|path| format!(" Log: {}", path.display()))
        .unwrap_or_default();
    match cli.action {
        Action::Run => println!(
            "{}/{} passed ({} failed, {} errored, {} skipped).{log}",
            summary.passed, summary.total, summary.failed, summary.errored, summary.skipped
        ),
        Action::Update => println!(
            "updated {}/{} files. Review the changes before committing.{log}",
            summary.updated, summary.total
        ),
    }

    if !summary.is_success() {
        bail!(
            "{} of {} test files did not pass",
            summary.failed + summary.errored,
            summary.total
        );
    }
    Ok(())
}

#[derive(Parser, Debug)]
#[command(
    name = "lev-golden",
    version,
    about = "Golden-file test harness for the lev executable"
)]
struct Cli {
    #[arg(value_enum, default_value = "run")]
    action: Action,
    #[arg(long, default_value = ".")]
    workspace: PathBuf,
    /// Config file, defaults to `<workspace>/lev-golden.toml` when present.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Command used to invoke lev, relative to the workspace.
    #[arg(long)]
    lev_exe: Option<String>,
    #[arg(long)]
    test_dir: Option<PathBuf>,
    /// Only run files whose name matches this regex.
    #[arg(long)]
    filter: Option<String>,
    /// Keep running after the first failing file.
    #[arg(long)]
    keep_going: bool,
    #[arg(long, value_enum)]
    whitespace: Option<Whitespace>,
    /// Do not write the run log or `last_run.json`.
    #[arg(long)]
    no_log: bool,
    #[arg(long)]
    no_color: bool,
}

impl Cli {
    fn config(&self, workspace: PathBuf) -> Result<Config> {
        let mut config = Config::load(&workspace, self.config.as_deref())?;
        if let Some(lev_exe) = &self.lev_exe {
            config = config.with_lev_exe(lev_exe);
        }
        if let Some(test_dir) = &self.test_dir {
            config = config.with_test_dir(test_dir);
        }
        if let Some(pattern) = &self.filter {
            config = config.with_filter(pattern)?;
        }
        if self.keep_going {
            config = config.with_fail_fast(false);
        }
        if let Some(whitespace) = self.whitespace {
            config = config.with_whitespace(whitespace);
        }
        if self.no_log {
            config = config.with_log_dir(None);
        }
        Ok(config)
    }
}
