//! Configuration loading and API key resolution
//!
//! Most knobs come from a TOML file with compiled defaults. The OpenAI API
//! key is special: it is resolved with Database → ENV → TOML priority, so an
//! operator can rotate it at runtime through the settings table without a
//! restart or a config edit.

use serde::Deserialize;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{Error, Result};

/// Environment variable naming the config file path
pub const CONFIG_PATH_ENV: &str = "AGORA_AI_CONFIG";

/// Environment variable carrying the OpenAI API key (tier 2)
pub const OPENAI_KEY_ENV: &str = "AGORA_OPENAI_API_KEY";

fn default_database_path() -> String {
    "agora-ai.db".to_string()
}

fn default_port() -> u16 {
    5731
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4.1".to_string()
}

fn default_vote_api_base_url() -> String {
    "http://localhost:8080".to_string()
}

/// Service configuration from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// OpenAI API key (tier 3, lowest priority)
    #[serde(default)]
    pub openai_api_key: Option<String>,

    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    #[serde(default = "default_vote_api_base_url")]
    pub vote_api_base_url: String,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            port: default_port(),
            openai_api_key: None,
            openai_base_url: default_openai_base_url(),
            openai_model: default_openai_model(),
            vote_api_base_url: default_vote_api_base_url(),
        }
    }
}

impl TomlConfig {
    /// Load configuration from a TOML file, falling back to defaults when the
    /// file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read config failed: {}", e)))?;
        let config: TomlConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse config failed: {}", e)))?;

        info!(path = %path.display(), "Config loaded");
        Ok(config)
    }

    /// Config file path from the environment, or the compiled default
    pub fn config_path() -> std::path::PathBuf {
        std::env::var(CONFIG_PATH_ENV)
            .map(std::path::PathBuf::from)
            .unwrap_or_else(|_| std::path::PathBuf::from("agora-ai.toml"))
    }
}

/// Resolve the OpenAI API key from 3-tier configuration
///
/// Priority: Database → ENV → TOML
pub async fn resolve_openai_api_key(db: &SqlitePool, toml_config: &TomlConfig) -> Result<String> {
    let mut sources = Vec::new();

    // Tier 1: Database (authoritative)
    let db_key = crate::db::settings::get_openai_api_key(db).await?;
    if db_key.as_deref().is_some_and(is_valid_key) {
        sources.push("database");
    }

    // Tier 2: Environment variable
    let env_key = std::env::var(OPENAI_KEY_ENV).ok();
    if env_key.as_deref().is_some_and(is_valid_key) {
        sources.push("environment");
    }

    // Tier 3: TOML config
    let toml_key = toml_config.openai_api_key.as_ref();
    if toml_key.map(String::as_str).is_some_and(is_valid_key) {
        sources.push("TOML");
    }

    if sources.len() > 1 {
        warn!(
            "OpenAI API key found in multiple sources: {}. Using database (highest priority).",
            sources.join(", ")
        );
    }

    if let Some(key) = db_key.filter(|k| is_valid_key(k)) {
        info!("OpenAI API key loaded from database");
        return Ok(key);
    }

    if let Some(key) = env_key.filter(|k| is_valid_key(k)) {
        info!("OpenAI API key loaded from environment variable");
        return Ok(key);
    }

    if let Some(key) = toml_key.filter(|k| is_valid_key(k)) {
        info!("OpenAI API key loaded from TOML config");
        return Ok(key.clone());
    }

    Err(Error::Config(format!(
        "OpenAI API key not configured. Please configure using one of:\n\
         1. Settings table: INSERT INTO settings (key, value) VALUES ('openai_api_key', 'sk-...')\n\
         2. Environment: {}=sk-...\n\
         3. TOML config: openai_api_key = \"sk-...\"",
        OPENAI_KEY_ENV
    )))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
