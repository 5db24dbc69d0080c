//! Claude Code installation status
//!
//! The launcher only needs two read-only answers from here: which version is
//! installed and whether it runs at all. Both are backed by timeout-guarded
//! probes, so a hung binary reads as "not installed" instead of blocking.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use crate::launcher::{run_aux_command, AuxOutcome, DEFAULT_AUX_TIMEOUT};

/// Limit for `claude update`, which downloads
pub const DEFAULT_UPDATE_TIMEOUT: Duration = Duration::from_secs(120);

/// Read-only view of the external tool.
#[async_trait]
pub trait ToolStatus: Send + Sync {
    async fn current_version(&self) -> Option<String>;
    async fn is_installed(&self) -> bool;
}

/// Probes and updates the `claude` executable.
#[derive(Debug, Clone)]
pub struct ClaudeCodeManager {
    executable: String,
    probe_timeout: Duration,
    update_timeout: Duration,
}

impl ClaudeCodeManager {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            probe_timeout: DEFAULT_AUX_TIMEOUT,
            update_timeout: DEFAULT_UPDATE_TIMEOUT,
        }
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_update_timeout(mut self, timeout: Duration) -> Self {
        self.update_timeout = timeout;
        self
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    /// Resolved location of the executable, if any.
    pub fn locate(&self) -> Option<PathBuf> {
        find_executable(&self.executable)
    }

    /// Run `claude update`.
    pub async fn update(&self) -> AuxOutcome {
        info!("Updating Claude Code via {} update", self.executable);
        run_aux_command(&self.executable, &["update"], self.update_timeout).await
    }
}

#[async_trait]
impl ToolStatus for ClaudeCodeManager {
    async fn current_version(&self) -> Option<String> {
        let outcome = run_aux_command(&self.executable, &["--version"], self.probe_timeout).await;
        if !outcome.success {
            debug!(
                "Version probe for {} failed (code {:?}): {}",
                self.executable,
                outcome.code,
                outcome.stderr.trim()
            );
            return None;
        }
        parse_version(&outcome.stdout)
    }

    async fn is_installed(&self) -> bool {
        if self.locate().is_none() {
            debug!("{} not found", self.executable);
            return false;
        }
        self.current_version().await.is_some()
    }
}

/// First semver-looking token in `output`, e.g. `1.0.72` from
/// `1.0.72 (Claude Code)`.
pub fn parse_version(output: &str) -> Option<String> {
    output
        .split_whitespace()
        .map(|token| token.trim_start_matches('v').trim_end_matches([',', ')']))
        .find(|token| {
            let mut parts = token.split('.');
            let major = parts.next().unwrap_or_default();
            let rest: Vec<&str> = parts.collect();
            !major.is_empty()
                && major.chars().all(|c| c.is_ascii_digit())
                && !rest.is_empty()
                && rest[0].chars().next().is_some_and(|c| c.is_ascii_digit())
        })
        .map(str::to_string)
}

fn is_executable_file(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

/// Look `executable` up the way a shell would, using the current `PATH`.
pub fn find_executable(executable: &str) -> Option<PathBuf> {
    find_executable_in(executable, std::env::var_os("PATH").as_deref())
}

/// Like [`find_executable`] with an explicit search path.
pub fn find_executable_in(executable: &str, path_var: Option<&OsStr>) -> Option<PathBuf> {
    let trimmed = executable.trim();
    if trimmed.is_empty() {
        return None;
    }

    let candidate = Path::new(trimmed);
    if candidate.is_absolute() || trimmed.contains(std::path::MAIN_SEPARATOR) {
        return is_executable_file(candidate).then(|| candidate.to_path_buf());
    }

    std::env::split_paths(path_var?)
        .flat_map(|dir| executable_candidates(&dir, trimmed))
        .find(|path| is_executable_file(path))
}

#[cfg(windows)]
fn executable_candidates(dir: &Path, name: &str) -> Vec<PathBuf> {
    ["", ".exe", ".cmd", ".bat"]
        .iter()
        .map(|ext| dir.join(format!("{}{}", name, ext)))
        .collect()
}

#[cfg(not(windows))]
fn executable_candidates(dir: &Path, name: &str) -> Vec<PathBuf> {
    vec![dir.join(name)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    fn set_exec(path: &Path, mode: u32) {
        let mut perms = std::fs::metadata(path).unwrap().permissions();
        perms.set_mode(mode);
        std::fs::set_permissions(path, perms).unwrap();
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("1.0.72 (Claude Code)\n"), Some("1.0.72".to_string()));
        assert_eq!(parse_version("claude v2.1.0"), Some("2.1.0".to_string()));
        assert_eq!(parse_version("version 10.2"), Some("10.2".to_string()));
        assert_eq!(parse_version("no version here"), None);
        assert_eq!(parse_version(""), None);
        assert_eq!(parse_version("a.b.c"), None);
    }

    #[test]
    fn test_find_executable_rejects_empty() {
        assert!(find_executable("").is_none());
        assert!(find_executable("   ").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_find_executable_checks_absolute_paths() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("claude");
        std::fs::write(&path, "#!/bin/sh\n").unwrap();
        set_exec(&path, 0o755);
        assert_eq!(find_executable(path.to_str().unwrap()), Some(path.clone()));

        set_exec(&path, 0o644);
        assert!(find_executable(path.to_str().unwrap()).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_find_executable_searches_path() {
        let empty = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("mock-claude");
        std::fs::write(&path, "#!/bin/sh\n").unwrap();
        set_exec(&path, 0o755);

        let search = std::env::join_paths([empty.path(), temp.path()]).unwrap();
        assert_eq!(
            find_executable_in("mock-claude", Some(search.as_os_str())),
            Some(path)
        );
        assert!(find_executable_in("mock-claude", Some(empty.path().as_os_str())).is_none());
        assert!(find_executable_in("mock-claude", None).is_none());
    }

    #[tokio::test]
    async fn test_missing_tool_is_not_installed() {
        let manager = ClaudeCodeManager::new("synclaude-definitely-missing-binary");
        assert!(!manager.is_installed().await);
        assert!(manager.current_version().await.is_none());
    }
}
