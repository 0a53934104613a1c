//! A single annotated golden test file.
//!
//! The file is source for the executable under test, with directives embedded
//! as line comments:
//!
//! ```text
//! <source>
//! // RUN-ARGS: --flag
//! // CHECK-STDOUT: first expected line
//! // CHECK-STDOUT: second expected line
//! ```
//!
//! Everything before the first `CHECK-STDOUT` line is source; the `CHECK-STDOUT`
//! lines form one contiguous trailing block.

use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use anyhow::{Context, Result, bail};

use crate::config::Whitespace;

pub const RUN_ARGS_MARKER: &str = "// RUN-ARGS:";
pub const CHECK_STDOUT_MARKER: &str = "// CHECK-STDOUT:";

#[derive(Debug)]
pub struct TestFile {
    path: PathBuf,
    display: PathBuf,
    /// Lines with their original terminators.
    lines: Vec<String>,
}

/// First point where captured output departs from the recorded expectations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// Zero-based index into the output/expected sequences.
    pub index: usize,
    /// 1-based line number in the test file.
    pub line_number: usize,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOutcome {
    Passed,
    Failed(Mismatch),
}

impl TestOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, TestOutcome::Passed)
    }
}

impl TestFile {
    /// Reads `path`. `display` is the path relative to the workspace; it is
    /// what lev receives on its command line and what reports show.
    pub fn load(path: impl Into<PathBuf>, display: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let text = fs::read_to_string(&path)
            .with_context(|| format!("could not open test file {}", path.display()))?;
        let file = Self::from_text(path, display, &text);
        file.check_expectation_block()?;
        Ok(file)
    }

    fn from_text(path: PathBuf, display: impl Into<PathBuf>, text: &str) -> Self {
        Self {
            path,
            display: display.into(),
            lines: text.split_inclusive('\n').map(str::to_string).collect(),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// The argument string of the first `RUN-ARGS` directive, trimmed.
    pub fn parse_run_args(&self) -> Option<&str> {
        self.lines
            .iter()
            .find_map(|line| line.strip_prefix(RUN_ARGS_MARKER))
            .map(str::trim)
    }

    /// Contents of every `CHECK-STDOUT` directive, in file order.
    pub fn parse_expected_lines(&self, whitespace: Whitespace) -> Vec<String> {
        self.lines
            .iter()
            .filter_map(|line| line.strip_prefix(CHECK_STDOUT_MARKER))
            .map(|rest| {
                let rest = strip_terminator(rest);
                match whitespace {
                    Whitespace::Exact => rest.strip_prefix(' ').unwrap_or(rest),
                    Whitespace::Trim => rest.trim(),
                }
                .to_string()
            })
            .collect()
    }

    /// Index of the first `CHECK-STDOUT` line, or the line count when there is none.
    pub fn source_end_line(&self) -> usize {
        self.lines
            .iter()
            .position(|line| line.starts_with(CHECK_STDOUT_MARKER))
            .unwrap_or(self.lines.len())
    }

    fn check_expectation_block(&self) -> Result<()> {
        let start = self.source_end_line();
        let mut first_blank = None;
        for (offset, line) in self.lines[start..].iter().enumerate() {
            let line_number = start + offset + 1;
            let interruption = if line.starts_with(CHECK_STDOUT_MARKER) {
                first_blank
            } else if line.trim().is_empty() {
                if first_blank.is_none() {
                    first_blank = Some(line_number);
                }
                None
            } else {
                Some(line_number)
            };
            if let Some(line_number) = interruption {
                bail!(
                    "{}:{}: CHECK-STDOUT block must be contiguous and trail the source",
                    self.display.display(),
                    line_number
                );
            }
        }
        Ok(())
    }

    /// The shell command line that runs the executable on this file.
    pub fn command_line(&self, lev_exe: &str) -> Result<String> {
        let Some(run_args) = self.parse_run_args() else {
            bail!("the test file {} has no run args", self.display.display());
        };
        let path = self.display.to_string_lossy();
        Ok(format!("{lev_exe} {run_args} {}", shell_quote(&path)))
    }

    /// Runs the executable and returns its stdout split into lines.
    /// stderr is discarded; a non-zero exit is an error.
    pub fn output_lines(
        &self,
        lev_exe: &str,
        workspace: &Path,
        whitespace: Whitespace,
    ) -> Result<Vec<String>> {
        let command_line = self.command_line(lev_exe)?;
        let output = Command::new("sh")
            .arg("-c")
            .arg(&command_line)
            .current_dir(workspace)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .with_context(|| format!("failed to run `{command_line}`"))?;

        if !output.status.success() {
            bail!(
                "`{command_line}` failed for {} ({})",
                self.display.display(),
                output.status
            );
        }

        let stdout = String::from_utf8(output.stdout).with_context(|| {
            format!("output of `{command_line}` is not valid UTF-8")
        })?;
        Ok(stdout
            .lines()
            .map(|line| match whitespace {
                Whitespace::Exact => line.to_string(),
                Whitespace::Trim => line.trim().to_string(),
            })
            .collect())
    }

    /// Runs the executable and compares its output against the recorded expectations.
    pub fn run_test(
        &self,
        lev_exe: &str,
        workspace: &Path,
        whitespace: Whitespace,
    ) -> Result<TestOutcome> {
        let actual = self.output_lines(lev_exe, workspace, whitespace)?;
        let expected = self.parse_expected_lines(whitespace);
        Ok(self.compare(&expected, &actual))
    }

    fn compare(&self, expected: &[String], actual: &[String]) -> TestOutcome {
        let first_difference = expected
            .iter()
            .zip(actual)
            .position(|(expected, actual)| expected != actual)
            .or_else(|| {
                (expected.len() != actual.len()).then_some(expected.len().min(actual.len()))
            });

        match first_difference {
            None => TestOutcome::Passed,
            Some(index) => TestOutcome::Failed(Mismatch {
                index,
                line_number: self.source_end_line() + index + 1,
                expected: expected.get(index).cloned(),
                actual: actual.get(index).cloned(),
            }),
        }
    }

    /// Replaces the `CHECK-STDOUT` block with freshly captured output and
    /// writes the file back. The previous expectations are lost.
    pub fn update_expected_lines(
        &mut self,
        lev_exe: &str,
        workspace: &Path,
        whitespace: Whitespace,
    ) -> Result<()> {
        let output = self.output_lines(lev_exe, workspace, whitespace)?;
        let source_end = self.source_end_line();

        let mut lines = self.lines[..source_end].to_vec();
        if let Some(last) = lines.last_mut() {
            if !last.ends_with('\n') {
                last.push('\n');
            }
        }
        lines.extend(
            output
                .iter()
                .map(|line| format!("{CHECK_STDOUT_MARKER} {line}\n")),
        );

        write_replacing(&self.path, &lines.concat())?;
        self.lines = lines;
        Ok(())
    }
}

fn strip_terminator(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

fn shell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

/// Writes `contents` next to `path` under a hidden name, then renames it over `path`.
fn write_replacing(path: &Path, contents: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .with_context(|| format!("{} has no file name", path.display()))?;
    let tmp = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));
    fs::write(&tmp, contents).with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| {
        format!("failed to replace {} with {}", path.display(), tmp.display())
    })
}
