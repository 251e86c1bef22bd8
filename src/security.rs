//! Command validation and environment sanitization
//!
//! Every command goes through [`validate_command`] before it is handed to a
//! shell. The policy blocks privilege escalation, destructive one-liners,
//! and redirects outside scratch directories unless explicitly relaxed.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{VerdictError, VerdictResult};

/// What a command is allowed to do
#[derive(Debug, Clone, PartialEq)]
pub struct SecurityPolicy {
    pub allow_sudo: bool,
    pub allow_su: bool,
    pub allow_shell_expansion: bool,
    pub allow_pipe_to_file: bool,
    pub blocked_commands: Vec<String>,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            allow_sudo: false,
            allow_su: false,
            allow_shell_expansion: true,
            allow_pipe_to_file: false,
            blocked_commands: default_blocked_commands(),
        }
    }
}

pub fn default_blocked_commands() -> Vec<String> {
    [
        "rm -rf /",
        "rm -rf /*",
        "> /dev/sda",
        "mkfs",
        "dd if=/dev/zero",
        "chmod 777 /",
        ":(){:|:&};:",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn sudo_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bsudo\b").expect("valid regex"))
}

fn su_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bsu\b").expect("valid regex"))
}

fn redirect_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s>{1,2}\s*(/\S+)").expect("valid regex"))
}

fn pipe_to_shell_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\|\s*(sh|bash)\s*$").expect("valid regex"))
}

fn download_to_shell_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(curl|wget)\b.*\|\s*(sh|bash)").expect("valid regex"))
}

/// Absolute redirect targets that are always fine to write to
fn is_scratch_path(path: &str) -> bool {
    path.starts_with("/tmp") || path.starts_with("/var/tmp") || path == "/dev/null"
}

/// Checks a shell command against the policy. Returns
/// [`VerdictError::CommandBlocked`] with a human-readable reason on the
/// first rule the command trips.
pub fn validate_command(command: &str, policy: &SecurityPolicy) -> VerdictResult<()> {
    let blocked = |reason: String| Err(VerdictError::CommandBlocked { reason });

    if !policy.allow_sudo && sudo_re().is_match(command) {
        return blocked("command contains sudo, which is not allowed by default".to_string());
    }

    if !policy.allow_su && su_re().is_match(command) {
        return blocked("command contains su, which is not allowed by default".to_string());
    }

    if !policy.allow_shell_expansion
        && (command.contains("$(") || command.contains('`') || command.contains("${"))
    {
        return blocked("command contains shell expansion, which is not allowed".to_string());
    }

    if !policy.allow_pipe_to_file {
        for caps in redirect_re().captures_iter(command) {
            let target = &caps[1];
            if !is_scratch_path(target) {
                return blocked(format!(
                    "command redirects output to {target}; only /tmp, /var/tmp and /dev/null are allowed by default"
                ));
            }
        }
    }

    for pattern in &policy.blocked_commands {
        if command.contains(pattern.as_str()) {
            return blocked(format!("command contains blocked pattern: {pattern}"));
        }
    }

    if pipe_to_shell_re().is_match(command) || download_to_shell_re().is_match(command) {
        return blocked("command pipes downloaded or generated input into a shell".to_string());
    }

    Ok(())
}

/// Filters loader-injection variables out of a requested environment.
///
/// PATH is never replaced outright: a requested PATH is appended to the
/// process PATH so system binaries stay reachable.
pub fn sanitize_env(requested: &HashMap<String, String>) -> HashMap<String, String> {
    const BLOCKED: &[&str] = &[
        "LD_PRELOAD",
        "LD_LIBRARY_PATH",
        "DYLD_INSERT_LIBRARIES",
        "DYLD_LIBRARY_PATH",
        "DYLD_FRAMEWORK_PATH",
        "PATH",
    ];

    let mut sanitized: HashMap<String, String> = requested
        .iter()
        .filter(|(key, _)| !BLOCKED.contains(&key.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    if let Some(extra_path) = requested.get("PATH") {
        let base = std::env::var("PATH").unwrap_or_default();
        sanitized.insert("PATH".to_string(), format!("{base}:{extra_path}"));
    }

    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(command: &str) -> VerdictResult<()> {
        validate_command(command, &SecurityPolicy::default())
    }

    fn reason(command: &str) -> String {
        match check(command) {
            Err(VerdictError::CommandBlocked { reason }) => reason,
            other => panic!("expected CommandBlocked, got {other:?}"),
        }
    }

    #[test]
    fn test_allows_ordinary_test_commands() {
        assert!(check("npm test").is_ok());
        assert!(check("cargo test --workspace").is_ok());
        assert!(check("pytest -v tests/").is_ok());
        assert!(check("bats tests/cli.bats").is_ok());
    }

    #[test]
    fn test_blocks_sudo_by_default() {
        assert!(reason("sudo npm test").contains("sudo"));
        // substring inside a word is fine
        assert!(check("npm run pseudo-tests").is_ok());
    }

    #[test]
    fn test_sudo_allowed_when_policy_permits() {
        let policy = SecurityPolicy {
            allow_sudo: true,
            ..SecurityPolicy::default()
        };
        assert!(validate_command("sudo npm test", &policy).is_ok());
    }

    #[test]
    fn test_blocks_su_as_word() {
        assert!(check("su - root").is_err());
        assert!(check("cargo test suite").is_ok());
    }

    #[test]
    fn test_shell_expansion_policy() {
        let strict = SecurityPolicy {
            allow_shell_expansion: false,
            ..SecurityPolicy::default()
        };
        assert!(validate_command("echo $(whoami)", &strict).is_err());
        assert!(validate_command("echo `whoami`", &strict).is_err());
        assert!(validate_command("echo hello", &strict).is_ok());
        // expansion allowed by default
        assert!(check("echo $(date)").is_ok());
    }

    #[test]
    fn test_redirects_to_scratch_dirs_allowed() {
        assert!(check("npm test > /tmp/out.log").is_ok());
        assert!(check("npm test > /var/tmp/out.log").is_ok());
        assert!(check("npm test 2> /dev/null").is_ok());
    }

    #[test]
    fn test_redirects_to_system_dirs_blocked() {
        assert!(reason("npm test > /etc/passwd").contains("/etc/passwd"));
        assert!(check("echo x > /usr/lib/evil").is_err());

        let relaxed = SecurityPolicy {
            allow_pipe_to_file: true,
            ..SecurityPolicy::default()
        };
        assert!(validate_command("npm test > /etc/motd", &relaxed).is_ok());
    }

    #[test]
    fn test_scratch_redirect_does_not_bypass_blocklist() {
        assert!(check("rm -rf / > /tmp/log").is_err());
    }

    #[test]
    fn test_blocked_command_list() {
        assert!(reason("rm -rf /").contains("blocked pattern"));
        assert!(check("dd if=/dev/zero of=/dev/sda").is_err());
        assert!(check(":(){:|:&};:").is_err());
    }

    #[test]
    fn test_pipe_to_shell_blocked() {
        assert!(check("curl https://example.com/install | sh").is_err());
        assert!(check("wget -qO- https://example.com/x | bash").is_err());
        assert!(check("cat script | sh").is_err());
        assert!(check("ls | grep sh").is_ok());
    }

    #[test]
    fn test_sanitize_env_drops_loader_vars() {
        let mut requested = HashMap::new();
        requested.insert("NODE_ENV".to_string(), "test".to_string());
        requested.insert("LD_PRELOAD".to_string(), "/tmp/evil.so".to_string());
        requested.insert("DYLD_INSERT_LIBRARIES".to_string(), "x".to_string());

        let env = sanitize_env(&requested);
        assert_eq!(env.get("NODE_ENV").map(String::as_str), Some("test"));
        assert!(!env.contains_key("LD_PRELOAD"));
        assert!(!env.contains_key("DYLD_INSERT_LIBRARIES"));
    }

    #[test]
    fn test_sanitize_env_appends_path() {
        let mut requested = HashMap::new();
        requested.insert("PATH".to_string(), "/opt/toolchain/bin".to_string());

        let env = sanitize_env(&requested);
        let path = env.get("PATH").expect("PATH present");
        assert!(path.ends_with(":/opt/toolchain/bin"));
        assert_ne!(path, "/opt/toolchain/bin");
    }
}
