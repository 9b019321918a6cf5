use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::Path,
    process::Command,
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use popper_core::{VERSION, popper::RandomSeed};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::proto::ENV_ID;

/// Describes one run of the drivers, written next to its frames.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RunManifest {
    pub env_id: String,
    pub seed: Option<RandomSeed>,
    pub reward_preset: String,
    pub created_at: DateTime<Utc>,
    pub pkg_version: String,
    #[serde(default)]
    pub git_commit: Option<String>,
    pub os: String,
    #[serde(default)]
    pub os_version: Option<String>,
    /// Free-form extras such as the command line.
    #[serde(default)]
    pub meta: Map<String, Value>,
}

impl RunManifest {
    pub fn new(seed: Option<RandomSeed>, reward_preset: &str) -> Self {
        Self {
            env_id: ENV_ID.to_owned(),
            seed,
            reward_preset: reward_preset.to_owned(),
            created_at: Utc::now(),
            pkg_version: VERSION.to_owned(),
            git_commit: git_commit_short(),
            os: std::env::consts::OS.to_owned(),
            os_version: os_version(),
            meta: Map::new(),
        }
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.meta.insert(key.to_owned(), value.into());
        self
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}

/// Short hash of the checked-out commit, `None` outside a git work tree.
fn git_commit_short() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())?;
    let commit = String::from_utf8(output.stdout).ok()?;
    let commit = commit.trim();
    (!commit.is_empty()).then(|| commit.to_owned())
}

// kernel release on Linux; other platforms leave it unset
fn os_version() -> Option<String> {
    fs::read_to_string("/proc/sys/kernel/osrelease")
        .ok()
        .map(|release| release.trim().to_owned())
        .filter(|release| !release.is_empty())
}

pub fn write_json(path: &Path, manifest: &RunManifest) -> Result<()> {
    let mut json = manifest.to_json()?;
    json.push('\n');
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

pub fn append_jsonl<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut line = serde_json::to_vec(record)?;
    line.push(b'\n');
    file.write_all(&line)
        .with_context(|| format!("failed to append to {}", path.display()))
}
