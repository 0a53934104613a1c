use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::ValueEnum;
use regex::Regex;
use serde::Deserialize;

pub const CONFIG_FILE_NAME: &str = "lev-golden.toml";

/// How the text following a `CHECK-STDOUT` marker is compared.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Whitespace {
    /// Strip only the single space written after the marker.
    #[default]
    Exact,
    /// Trim surrounding whitespace from expected and captured lines.
    Trim,
}

/// On-disk form of `lev-golden.toml`. Every field is optional.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Manifest {
    lev_exe: String,
    test_dir: PathBuf,
    extension: Option<String>,
    fail_fast: bool,
    whitespace: Whitespace,
    log_dir: PathBuf,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            lev_exe: "build/lev".to_string(),
            test_dir: PathBuf::from("tests"),
            extension: None,
            fail_fast: true,
            whitespace: Whitespace::Exact,
            log_dir: PathBuf::from("logs"),
        }
    }
}

/// Everything the runner needs, resolved against a workspace root.
#[derive(Debug, Clone)]
pub struct Config {
    pub workspace: PathBuf,
    pub lev_exe: String,
    pub test_dir: PathBuf,
    pub extension: Option<String>,
    pub filter: Option<Regex>,
    pub fail_fast: bool,
    pub whitespace: Whitespace,
    pub log_dir: Option<PathBuf>,
}

impl Config {
    /// Defaults for `workspace` without reading any file.
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self::from_manifest(workspace.into(), Manifest::default())
    }

    /// Loads `path`, or `<workspace>/lev-golden.toml` when `path` is `None`.
    /// A missing default file yields the defaults; a missing explicit file is an error.
    pub fn load(workspace: &Path, path: Option<&Path>) -> Result<Self> {
        let manifest = match path {
            Some(path) => read_manifest(path)?,
            None => {
                let default_path = workspace.join(CONFIG_FILE_NAME);
                if default_path.exists() {
                    read_manifest(&default_path)?
                } else {
                    Manifest::default()
                }
            }
        };
        Ok(Self::from_manifest(workspace.to_path_buf(), manifest))
    }

    fn from_manifest(workspace: PathBuf, manifest: Manifest) -> Self {
        Self {
            workspace,
            lev_exe: manifest.lev_exe,
            test_dir: manifest.test_dir,
            extension: manifest.extension,
            filter: None,
            fail_fast: manifest.fail_fast,
            whitespace: manifest.whitespace,
            log_dir: Some(manifest.log_dir),
        }
    }

    pub fn with_lev_exe(mut self, lev_exe: impl Into<String>) -> Self {
        self.lev_exe = lev_exe.into();
        self
    }

    pub fn with_test_dir(mut self, test_dir: impl Into<PathBuf>) -> Self {
        self.test_dir = test_dir.into();
        self
    }

    pub fn with_filter(mut self, pattern: &str) -> Result<Self> {
        let regex =
            Regex::new(pattern).with_context(|| format!("invalid filter pattern `{pattern}`"))?;
        self.filter = Some(regex);
        Ok(self)
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn with_whitespace(mut self, whitespace: Whitespace) -> Self {
        self.whitespace = whitespace;
        self
    }

    /// `None` disables the run log and summary.
    pub fn with_log_dir(mut self, log_dir: Option<PathBuf>) -> Self {
        self.log_dir = log_dir;
        self
    }

    pub fn test_dir_path(&self) -> PathBuf {
        self.workspace.join(&self.test_dir)
    }

    pub fn log_dir_path(&self) -> Option<PathBuf> {
        self.log_dir.as_ref().map(|dir| self.workspace.join(dir))
    }
}

fn read_manifest(path: &Path) -> Result<Manifest> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("failed to parse config {}", path.display()))
}
