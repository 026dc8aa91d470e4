//! Application configuration for Evidencer.
//!
//! User config lives at `~/.evidencer/evidencer.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EvidencerError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "evidencer.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".evidencer";

// ---------------------------------------------------------------------------
// Config structs (matching evidencer.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Fetch behavior.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// GitHub remote storage settings.
    #[serde(default)]
    pub github: GithubConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Source URL acquired when none is given on the command line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,

    /// Project root the evidence tree is written under.
    #[serde(default = "default_project_root")]
    pub project_root: String,

    /// Registry file path, relative to the project root.
    #[serde(default = "default_registry_file")]
    pub registry_file: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            source_url: None,
            project_root: default_project_root(),
            registry_file: default_registry_file(),
        }
    }
}

fn default_project_root() -> String {
    ".".into()
}
fn default_registry_file() -> String {
    "registry/sources.json".into()
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Whether the rendering-capable backend should be requested.
    #[serde(default = "default_true")]
    pub enable_rendering: bool,

    /// HTTP timeout in seconds for the content fetch.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            enable_rendering: default_true(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[github]` section.
///
/// Only env var *names* are stored here, never credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    /// Name of the env var holding the API token.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Name of the env var holding the `owner/repo` slug.
    #[serde(default = "default_repository_env")]
    pub repository_env: String,

    /// Branch commits are written to.
    #[serde(default = "default_branch")]
    pub branch: String,

    /// API base URL (overridable for self-hosted instances).
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token_env: default_token_env(),
            repository_env: default_repository_env(),
            branch: default_branch(),
            api_base: default_api_base(),
        }
    }
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".into()
}
fn default_repository_env() -> String {
    "GITHUB_REPOSITORY".into()
}
fn default_branch() -> String {
    "main".into()
}
fn default_api_base() -> String {
    "https://api.github.com".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.evidencer/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| EvidencerError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.evidencer/evidencer.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| EvidencerError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| EvidencerError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| EvidencerError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| EvidencerError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| EvidencerError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
