//! Console reporting, the per-run log file and the JSON run summary.

use std::{
    fmt,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use colored::Colorize;
use serde::Serialize;

use crate::{diff, test_file::Mismatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Passed,
    Failed,
    Errored,
    Updated,
    Skipped,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Passed => "passed",
            FileStatus::Failed => "failed",
            FileStatus::Errored => "errored",
            FileStatus::Updated => "updated",
            FileStatus::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FileDetail {
    pub path: PathBuf,
    pub status: FileStatus,
    pub duration_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mismatch_line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileDetail {
    pub fn skipped(path: PathBuf) -> Self {
        Self {
            path,
            status: FileStatus::Skipped,
            duration_ms: 0,
            mismatch_line: None,
            error: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub action: String,
    pub lev_exe: String,
    pub test_dir: PathBuf,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub updated: usize,
    pub skipped: usize,
    pub log_file: Option<PathBuf>,
    pub files: Vec<FileDetail>,
}

impl RunSummary {
    pub fn new(
        action: &str,
        lev_exe: &str,
        test_dir: &Path,
        started_at: DateTime<Local>,
        files: Vec<FileDetail>,
        log_file: Option<PathBuf>,
    ) -> Self {
        let count = |status| files.iter().filter(|f| f.status == status).count();
        Self {
            action: action.to_string(),
            lev_exe: lev_exe.to_string(),
            test_dir: test_dir.to_path_buf(),
            started_at,
            finished_at: Local::now(),
            total: files.len(),
            passed: count(FileStatus::Passed),
            failed: count(FileStatus::Failed),
            errored: count(FileStatus::Errored),
            updated: count(FileStatus::Updated),
            skipped: count(FileStatus::Skipped),
            log_file,
            files,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.errored == 0
    }
}

/// `harness.log` for one invocation, under `<log_root>/<action>/<timestamp>/`.
/// A run without a log root writes nothing.
pub struct RunLog {
    file: Option<File>,
    path: Option<PathBuf>,
    summary_path: Option<PathBuf>,
}

impl RunLog {
    pub fn create(log_root: Option<&Path>, action: &str) -> Result<Self> {
        let Some(log_root) = log_root else {
            return Ok(Self {
                file: None,
                path: None,
                summary_path: None,
            });
        };
        let action_root = log_root.join(action);
        fs::create_dir_all(&action_root)
            .with_context(|| format!("failed to create log directory {}", action_root.display()))?;
        let run_dir = unique_run_dir(&action_root)?;
        let path = run_dir.join("harness.log");
        let file =
            File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
        Ok(Self {
            file: Some(file),
            path: Some(path),
            summary_path: Some(action_root.join("last_run.json")),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn line(&mut self, args: fmt::Arguments<'_>) -> Result<()> {
        if let Some(file) = &mut self.file {
            writeln!(file, "{args}")?;
        }
        Ok(())
    }

    pub fn record(&mut self, detail: &FileDetail) -> Result<()> {
        let mut entry = format!(
            "[file] {} {} in {} ms",
            detail.path.display(),
            detail.status.as_str(),
            detail.duration_ms
        );
        if let Some(line) = detail.mismatch_line {
            entry.push_str(&format!(" (first mismatch at line {line})"));
        }
        self.line(format_args!("{entry}"))?;
        if let Some(error) = &detail.error {
            self.line(format_args!("       {error}"))?;
        }
        Ok(())
    }

    /// Writes `last_run.json` next to the per-run directories.
    pub fn finish(self, summary: &RunSummary) -> Result<()> {
        if let Some(path) = &self.summary_path {
            fs::write(path, serde_json::to_string_pretty(summary)?)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        Ok(())
    }
}

/// Creates `<timestamp>` under `action_root`, or `<timestamp>-N` when a run
/// in the same millisecond already claimed it.
fn unique_run_dir(action_root: &Path) -> Result<PathBuf> {
    let timestamp = Local::now().format("%Y%m%d-%H%M%S%.3f").to_string();
    let mut run_dir = action_root.join(&timestamp);
    let mut attempt = 1;
    loop {
        match fs::create_dir(&run_dir) {
            Ok(()) => return Ok(run_dir),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                run_dir = action_root.join(format!("{timestamp}-{attempt}"));
                attempt += 1;
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to create log directory {}", run_dir.display())
                });
            }
        }
    }
}

pub fn print_passed(path: &Path) {
    println!("{} ... [{}]", path.display(), "OKAY".green().bold());
}

pub fn print_updated(path: &Path) {
    println!("{} ... [{}]", path.display(), "UPDATED".cyan().bold());
}

pub fn print_failed(path: &Path, mismatch: &Mismatch) {
    println!("{} ... [{}]", path.display(), "ERR".red().bold());
    println!(
        "  line {}: {}",
        mismatch.line_number,
        diff::render_line(mismatch.expected.as_deref(), mismatch.actual.as_deref())
    );
}

pub fn print_errored(path: &Path, error: &anyhow::Error) {
    println!("{} ... [{}]", path.display(), "ERR".red().bold());
    println!("  {}", format!("{error:#}").dimmed());
}
