use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;

pub const PROJECT_CONFIG_FILE: &str = ".davsync.json";

pub(crate) const DEFAULT_SYSTEM_PATH: &str = "/webdav";
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug)]
pub struct SyncConfig {
    pub system_path: String,
    pub request_timeout: Duration,
    pub child_process: bool,
    pub project_config_path: Option<PathBuf>,
    pub working_dir: PathBuf,
}

impl SyncConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let home = dirs::home_dir().context("home directory is unavailable")?;
        let working_dir =
            std::env::current_dir().context("current working directory is unavailable")?;
        let system_path = std::env::var("DAVSYNC_SYSTEM_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SYSTEM_PATH.to_string());
        let request_timeout =
            Duration::from_secs(read_u64_env("DAVSYNC_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS));
        let child_process = read_bool_env("DAVSYNC_CHILD_PROCESS", false);
        let project_config_path = std::env::var("DAVSYNC_PROJECT_CONFIG")
            .ok()
            .map(|value| expand_with_home(&value, &home));

        Ok(Self {
            system_path,
            request_timeout,
            child_process,
            project_config_path,
            working_dir,
        })
    }
}

/// Walks from `start` up through its ancestors looking for the project file.
pub fn find_project_config(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(PROJECT_CONFIG_FILE))
        .find(|candidate| candidate.is_file())
}

pub(crate) fn expand_with_home(value: &str, home: &Path) -> PathBuf {
    if value == "~" {
        return home.to_path_buf();
    }
    if let Some(rest) = value.strip_prefix("~/") {
        return home.join(rest);
    }
    PathBuf::from(value)
}

pub(crate) fn read_u64_env(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

pub(crate) fn read_bool_env(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .map(|value| parse_bool(&value))
        .unwrap_or(default)
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
