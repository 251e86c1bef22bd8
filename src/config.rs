//! Configuration for verdict
//!
//! Configuration hierarchy:
//! 1. CLI flags (highest priority)
//! 2. Environment variables (VERDICT_*)
//! 3. Project config (verdict.toml)
//! 4. User config (~/.config/verdict/config.toml)
//! 5. Built-in defaults (lowest priority)

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{VerdictError, VerdictResult};
use crate::security::{default_blocked_commands, SecurityPolicy};

/// Runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_output_dir() -> String {
    "test_reports".to_string()
}

/// Security configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub allow_sudo: bool,

    #[serde(default)]
    pub allow_su: bool,

    #[serde(default = "default_true")]
    pub allow_shell_expansion: bool,

    #[serde(default)]
    pub allow_pipe_to_file: bool,

    #[serde(default = "default_blocked_commands")]
    pub blocked: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allow_sudo: false,
            allow_su: false,
            allow_shell_expansion: true,
            allow_pipe_to_file: false,
            blocked: default_blocked_commands(),
        }
    }
}

impl SecurityConfig {
    pub fn to_policy(&self) -> SecurityPolicy {
        SecurityPolicy {
            allow_sudo: self.allow_sudo,
            allow_su: self.allow_su,
            allow_shell_expansion: self.allow_shell_expansion,
            allow_pipe_to_file: self.allow_pipe_to_file,
            blocked_commands: self.blocked.clone(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    #[serde(default)]
    pub verbosity: Verbosity,
}

/// Verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
    Debug,
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub run: RunConfig,

    #[serde(default)]
    pub security: SecurityConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Non-fatal configuration warning surfaced to CLI users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub key: String,
    pub file: PathBuf,
    pub line: Option<usize>,
    pub suggestion: Option<String>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> VerdictResult<Self> {
        let (config, _warnings) = Self::load_with_warnings(path)?;
        Ok(config)
    }

    /// Load configuration and collect non-fatal warnings (e.g. unknown keys).
    pub fn load_with_warnings(path: &Path) -> VerdictResult<(Self, Vec<ConfigWarning>)> {
        let content = fs::read_to_string(path)?;

        let mut unknown_paths: Vec<String> = Vec::new();
        let deserializer = toml::de::Deserializer::new(&content);

        let config: Self = serde_ignored::deserialize(deserializer, |path| {
            unknown_paths.push(path.to_string());
        })
        .map_err(|e| VerdictError::InvalidConfig {
            file: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let warnings = unknown_paths
            .into_iter()
            .map(|path_str| {
                let key = path_str
                    .split('.')
                    .last()
                    .unwrap_or(path_str.as_str())
                    .to_string();
                ConfigWarning {
                    key: key.clone(),
                    file: path.to_path_buf(),
                    line: find_line_number(&content, &key),
                    suggestion: suggest_key(&key),
                }
            })
            .collect();

        Ok((config, warnings))
    }

    /// Load from project config, user config, or defaults
    pub fn load_or_default(project_root: Option<&Path>) -> Self {
        if let Some(root) = project_root {
            let project_config = root.join("verdict.toml");
            if project_config.exists() {
                if let Ok(config) = Self::load(&project_config) {
                    return config.with_env_overrides();
                }
            }
        }

        if let Some(user_config_dir) = dirs_config_dir() {
            let user_config = user_config_dir.join("verdict/config.toml");
            if user_config.exists() {
                if let Ok(config) = Self::load(&user_config) {
                    return config.with_env_overrides();
                }
            }
        }

        Self::default().with_env_overrides()
    }

    /// Apply environment variable overrides (VERDICT_* prefix)
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("VERDICT_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse::<u64>() {
                self.run.timeout_secs = secs;
            }
        }

        if let Ok(dir) = std::env::var("VERDICT_OUTPUT_DIR") {
            if !dir.is_empty() {
                self.run.output_dir = dir;
            }
        }

        if let Ok(val) = std::env::var("VERDICT_ALLOW_SUDO") {
            self.security.allow_sudo = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(verbosity) = std::env::var("VERDICT_VERBOSITY") {
            self.output.verbosity = match verbosity.to_lowercase().as_str() {
                "quiet" => Verbosity::Quiet,
                "verbose" => Verbosity::Verbose,
                "debug" => Verbosity::Debug,
                _ => Verbosity::Normal,
            };
        }

        self
    }
}

/// Get XDG config directory
fn dirs_config_dir() -> Option<PathBuf> {
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        })
}

fn find_line_number(content: &str, needle: &str) -> Option<usize> {
    for (i, line) in content.lines().enumerate() {
        if line.contains(needle) {
            return Some(i + 1);
        }
    }
    None
}

fn suggest_key(unknown: &str) -> Option<String> {
    const CANDIDATES: &[&str] = &[
        "run",
        "timeout_secs",
        "output_dir",
        "security",
        "allow_sudo",
        "allow_su",
        "allow_shell_expansion",
        "allow_pipe_to_file",
        "blocked",
        "output",
        "verbosity",
    ];

    let mut best: Option<(&str, usize)> = None;
    for candidate in CANDIDATES {
        let dist = levenshtein(unknown, candidate);
        best = match best {
            None => Some((candidate, dist)),
            Some((_, best_dist)) if dist < best_dist => Some((candidate, dist)),
            Some(current) => Some(current),
        };
    }

    match best {
        Some((candidate, dist)) if dist <= 2 => Some(candidate.to_string()),
        _ => None,
    }
}

fn levenshtein(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }

    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    let mut prev: Vec<usize> = (0..=b_bytes.len()).collect();
    let mut curr = vec![0usize; b_bytes.len() + 1];

    for (i, &ac) in a_bytes.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &bc) in b_bytes.iter().enumerate() {
            let cost = if ac == bc { 0 } else { 1 };
            curr[j + 1] = std::cmp::min(
                std::cmp::min(prev[j + 1] + 1, curr[j] + 1),
                prev[j] + cost,
            );
        }
        prev.clone_from_slice(&curr);
    }

    prev[b_bytes.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.run.timeout_secs, 300);
        assert_eq!(config.run.output_dir, "test_reports");
        assert!(!config.security.allow_sudo);
        assert!(config.security.allow_shell_expansion);
        assert_eq!(config.output.verbosity, Verbosity::Normal);
    }

    #[test]
    fn test_config_parse_toml() {
        let toml = r#"
[run]
timeout_secs = 60
output_dir = "reports"

[security]
allow_sudo = true
blocked = ["rm -rf /"]

[output]
verbosity = "verbose"
"#;

        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.run.timeout_secs, 60);
        assert_eq!(config.run.output_dir, "reports");
        assert!(config.security.allow_sudo);
        assert_eq!(config.security.blocked, vec!["rm -rf /".to_string()]);
        assert_eq!(config.output.verbosity, Verbosity::Verbose);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str("[run]\ntimeout_secs = 5\n").unwrap();

        assert_eq!(config.run.timeout_secs, 5);
        assert_eq!(config.run.output_dir, "test_reports");
        assert!(!config.security.blocked.is_empty());
    }

    #[test]
    fn test_to_policy_mirrors_security_section() {
        let mut config = Config::default();
        config.security.allow_sudo = true;
        config.security.blocked = vec!["mkfs".to_string()];

        let policy = config.security.to_policy();
        assert!(policy.allow_sudo);
        assert!(!policy.allow_su);
        assert_eq!(policy.blocked_commands, vec!["mkfs".to_string()]);
    }

    #[test]
    fn test_env_override_timeout() {
        // SAFETY: Single-threaded test, no concurrent access to env vars
        unsafe { std::env::set_var("VERDICT_TIMEOUT_SECS", "42") };
        let config = Config::default().with_env_overrides();
        assert_eq!(config.run.timeout_secs, 42);
        unsafe { std::env::remove_var("VERDICT_TIMEOUT_SECS") };
    }

    #[test]
    fn test_env_override_verbosity() {
        // SAFETY: Single-threaded test, no concurrent access to env vars
        unsafe { std::env::set_var("VERDICT_VERBOSITY", "debug") };
        let config = Config::default().with_env_overrides();
        assert_eq!(config.output.verbosity, Verbosity::Debug);
        unsafe { std::env::remove_var("VERDICT_VERBOSITY") };
    }

    #[test]
    fn test_env_override_allow_sudo() {
        // SAFETY: Single-threaded test, no concurrent access to env vars
        unsafe { std::env::set_var("VERDICT_ALLOW_SUDO", "true") };
        let config = Config::default().with_env_overrides();
        assert!(config.security.allow_sudo);
        unsafe { std::env::remove_var("VERDICT_ALLOW_SUDO") };
    }

    #[test]
    fn test_load_with_warnings_reports_unknown_key_with_suggestion() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        fs::write(&path, "[run]\ntimout_secs = 5\n").unwrap();

        let (config, warnings) = Config::load_with_warnings(&path).unwrap();
        assert_eq!(config.run.timeout_secs, 300);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].key, "timout_secs");
        assert_eq!(warnings[0].line, Some(2));
        assert_eq!(warnings[0].suggestion, Some("timeout_secs".to_string()));
    }

    #[test]
    fn test_load_rejects_invalid_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        fs::write(&path, "[run\n").unwrap();

        assert!(matches!(
            Config::load(&path),
            Err(VerdictError::InvalidConfig { .. })
        ));
    }
}
