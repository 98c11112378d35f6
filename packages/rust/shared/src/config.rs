//! Application configuration for autoresearch.
//!
//! User config lives at `~/.autoresearch/autoresearch.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ResearchError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "autoresearch.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".autoresearch";

// ---------------------------------------------------------------------------
// Config structs (matching autoresearch.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Output defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Completion endpoint settings.
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Source fetching settings.
    #[serde(default)]
    pub fetch: FetchConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// File name used for written documents and download links.
    #[serde(default = "default_output_file")]
    pub output_file: String,

    /// Anchor text of generated download links.
    #[serde(default = "default_download_text")]
    pub download_text: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_file: default_output_file(),
            download_text: default_download_text(),
        }
    }
}

fn default_output_file() -> String {
    "ResearchResults.xml".into()
}
fn default_download_text() -> String {
    "Download XML file".into()
}

/// `[completion]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL of the completion API (without the `/completions` suffix).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model name sent with each request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum tokens generated per answer.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds.
    #[serde(default = "default_completion_timeout")]
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_completion_timeout(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "davinci-002".into()
}
fn default_max_tokens() -> u32 {
    100
}
fn default_completion_timeout() -> u64 {
    60
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Request timeout in seconds for pages and API sources.
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    /// Env var holding a bearer token sent to API sources, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            api_key_env: None,
        }
    }
}

fn default_fetch_timeout() -> u64 {
    30
}

impl FetchConfig {
    /// Bearer token for API sources, read from the configured env var.
    pub fn api_key(&self) -> Option<String> {
        let var = self.api_key_env.as_deref()?;
        std::env::var(var).ok().filter(|v| !v.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.autoresearch/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ResearchError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.autoresearch/autoresearch.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| ResearchError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| ResearchError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ResearchError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ResearchError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ResearchError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the completion API key env var is set and non-empty, returning its value.
pub fn validate_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.completion.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(ResearchError::config(format!(
            "completion API key not found. Set the {var_name} environment variable."
        ))),
    }
}
