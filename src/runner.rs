use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};

use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::ValueEnum;

use crate::{
    config::Config,
    report::{self, FileDetail, FileStatus, RunLog, RunSummary},
    test_file::{TestFile, TestOutcome},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Action {
    /// Check every file against its recorded output.
    Run,
    /// Rewrite the recorded output of every file.
    #[value(alias = "generate")]
    Update,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Run => "run",
            Action::Update => "update",
        }
    }
}

pub struct Runner {
    config: Config,
}

impl Runner {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Test files in the configured directory, sorted by file name.
    /// Hidden files are skipped, as are files rejected by the extension or filter.
    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        let dir = self.config.test_dir_path();
        let entries = fs::read_dir(&dir)
            .with_context(|| format!("failed to read test directory {}", dir.display()))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.with_context(|| format!("failed to list {}", dir.display()))?;
            let path = entry.path();
            // follows symlinks, so linked test files are picked up
            let metadata = fs::metadata(&path)
                .with_context(|| format!("failed to stat {}", path.display()))?;
            if !metadata.is_file() || !self.is_test_file(&path) {
                continue;
            }
            files.push(path);
        }
        files.sort();
        Ok(files)
    }

    fn is_test_file(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            return false;
        };
        if name.starts_with('.') {
            return false;
        }
        if let Some(extension) = &self.config.extension {
            if path.extension().and_then(|ext| ext.to_str()) != Some(extension.as_str()) {
                return false;
            }
        }
        self.config
            .filter
            .as_ref()
            .is_none_or(|filter| filter.is_match(name))
    }

    pub fn run(&self, action: Action) -> Result<RunSummary> {
        let files = self.discover()?;
        if files.is_empty() {
            bail!(
                "no test files found in {}",
                self.config.test_dir_path().display()
            );
        }

        let started_at = Local::now();
        let mut log = RunLog::create(self.config.log_dir_path().as_deref(), action.as_str())?;
        log.line(format_args!(
            "[harness] {} {} file(s) in {} with `{}`",
            action.as_str(),
            files.len(),
            self.config.test_dir.display(),
            self.config.lev_exe
        ))?;

        let details = match action {
            Action::Run => self.run_all(&files, &mut log)?,
            Action::Update => self.update_all(&files, &mut log)?,
        };

        let log_file = log.path().map(|path| rel_path(path, &self.config.workspace));
        let summary = RunSummary::new(
            action.as_str(),
            &self.config.lev_exe,
            &self.config.test_dir,
            started_at,
            details,
            log_file,
        );
        log.line(format_args!(
            "[harness] finished: {} passed, {} failed, {} errored, {} updated, {} skipped",
            summary.passed, summary.failed, summary.errored, summary.updated, summary.skipped
        ))?;
        log.finish(&summary)?;
        Ok(summary)
    }

    fn run_all(&self, files: &[PathBuf], log: &mut RunLog) -> Result<Vec<FileDetail>> {
        let mut details = Vec::with_capacity(files.len());
        let mut remaining = files.iter();

        for path in remaining.by_ref() {
            let detail = self.run_one(path);
            log.record(&detail)?;
            let stop = self.config.fail_fast && detail.status != FileStatus::Passed;
            details.push(detail);
            if stop {
                break;
            }
        }

        for path in remaining {
            let detail = FileDetail::skipped(rel_path(path, &self.config.workspace));
            log.record(&detail)?;
            details.push(detail);
        }
        Ok(details)
    }

    fn run_one(&self, path: &Path) -> FileDetail {
        let display = rel_path(path, &self.config.workspace);
        let start = Instant::now();
        let result = TestFile::load(path, &display).and_then(|test| {
            test.run_test(
                &self.config.lev_exe,
                &self.config.workspace,
                self.config.whitespace,
            )
        });
        let duration_ms = start.elapsed().as_millis();

        let (status, mismatch_line, error) = match result {
            Ok(TestOutcome::Passed) => {
                report::print_passed(&display);
                (FileStatus::Passed, None, None)
            }
            Ok(TestOutcome::Failed(mismatch)) => {
                report::print_failed(&display, &mismatch);
                (FileStatus::Failed, Some(mismatch.line_number), None)
            }
            Err(err) => {
                report::print_errored(&display, &err);
                (FileStatus::Errored, None, Some(format!("{err:#}")))
            }
        };

        FileDetail {
            path: display,
            status,
            duration_ms,
            mismatch_line,
            error,
        }
    }

    fn update_all(&self, files: &[PathBuf], log: &mut RunLog) -> Result<Vec<FileDetail>> {
        let mut details = Vec::with_capacity(files.len());

        for path in files {
            let display = rel_path(path, &self.config.workspace);
            let start = Instant::now();
            let result = TestFile::load(path, &display).and_then(|mut test| {
                test.update_expected_lines(
                    &self.config.lev_exe,
                    &self.config.workspace,
                    self.config.whitespace,
                )
            });

            if let Err(err) = result {
                report::print_errored(&display, &err);
                log.line(format_args!(
                    "[file] {} errored: {err:#}",
                    display.display()
                ))?;
                return Err(err.context(format!("failed to update {}", display.display())));
            }

            report::print_updated(&display);
            let detail = FileDetail {
                path: display,
                status: FileStatus::Updated,
                duration_ms: start.elapsed().as_millis(),
                mismatch_line: None,
                error: None,
            };
            log.record(&detail)?;
            details.push(detail);
        }
        Ok(details)
    }
}

pub fn rel_path(path: &Path, workspace: &Path) -> PathBuf {
    path.strip_prefix(workspace).unwrap_or(path).to_path_buf()
}
