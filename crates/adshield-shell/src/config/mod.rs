//! Configuration loading and resolution.

use std::path::{Path, PathBuf};

/// Site opened when nothing else is configured.
pub const DEFAULT_START_URL: &str = "https://www.itv.com/";

/// Navigation timeout when none is given.
pub const DEFAULT_NAV_TIMEOUT_MS: u64 = 30_000;

/// Rules file picked up from the working directory.
const LOCAL_RULES_FILE: &str = "adshield.json";

/// Resolved settings for one shell run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    pub start_url: String,
    /// `None` means the built-in ruleset.
    pub rules_path: Option<PathBuf>,
    pub profile_dir: PathBuf,
    pub headless: bool,
    pub nav_timeout_ms: u64,
}

impl ShellConfig {
    pub fn resolve(
        url: Option<&str>,
        rules: Option<&str>,
        profile_dir: Option<&str>,
        headless: bool,
        nav_timeout_ms: Option<u64>,
    ) -> Self {
        Self {
            start_url: resolve_start_url(url),
            rules_path: resolve_rules_path(rules),
            profile_dir: resolve_profile_dir(profile_dir),
            headless,
            nav_timeout_ms: nav_timeout_ms.unwrap_or(DEFAULT_NAV_TIMEOUT_MS),
        }
    }
}

/// Resolve the start URL: explicit, then `ADSHIELD_START_URL`, then the default site.
pub fn resolve_start_url(explicit: Option<&str>) -> String {
    if let Some(url) = explicit {
        return url.to_string();
    }

    if let Ok(env_url) = std::env::var("ADSHIELD_START_URL") {
        if !env_url.trim().is_empty() {
            return env_url;
        }
    }

    DEFAULT_START_URL.to_string()
}

/// Resolve the rules file.
///
/// Order: explicit path, `ADSHIELD_RULES`, `./adshield.json`, then
/// `<config dir>/adshield/rules.json`. `None` selects the built-in rules.
pub fn resolve_rules_path(explicit: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(PathBuf::from(path));
    }

    if let Ok(env_path) = std::env::var("ADSHIELD_RULES") {
        if !env_path.trim().is_empty() {
            return Some(PathBuf::from(env_path));
        }
    }

    let local = PathBuf::from(LOCAL_RULES_FILE);
    if local.exists() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("adshield").join("rules.json"))
        .filter(|path| path.exists())
}

/// Resolve the persistent browser profile directory.
pub fn resolve_profile_dir(explicit: Option<&str>) -> PathBuf {
    if let Some(path) = explicit {
        return PathBuf::from(path);
    }

    if let Ok(env_path) = std::env::var("ADSHIELD_PROFILE_DIR") {
        if !env_path.trim().is_empty() {
            return PathBuf::from(env_path);
        }
    }

    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("adshield")
        .join("browser-profile")
}

/// Create the profile directory if it does not exist yet.
pub fn ensure_profile_dir(path: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(path)
}
