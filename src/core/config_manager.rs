// src/core/config_manager.rs
//! Unified configuration management: defaults, then config.yaml, then environment

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_AI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_APIFY_BASE_URL: &str = "https://api.apify.com";
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEV_JWT_SECRET: &str = "leadscope-local-development-secret";

#[derive(Debug, Clone)]
pub struct ConfigManager {
    pub environment: EnvironmentConfig,
    pub service: ServiceConfig,
    pub auth: AuthSettings,
}

#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub name: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub log_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub ai_model: String,
    pub apify_token: Option<String>,
    pub apify_base_url: String,
    pub post_actor_id: Option<String>,
    pub public_base_url: String,
    pub webhook_secret: Option<String>,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub issuer: String,
    pub token_ttl_hours: i64,
}

/// One environment section of config.yaml. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileOverrides {
    pub database_path: Option<PathBuf>,
    pub log_path: Option<PathBuf>,
    pub port: Option<u16>,
    pub public_base_url: Option<String>,
    pub openai_base_url: Option<String>,
    pub ai_model: Option<String>,
    pub apify_base_url: Option<String>,
    pub post_actor_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    local: FileOverrides,
    #[serde(default)]
    production: FileOverrides,
}

impl ConfigManager {
    /// Load all configurations from the process environment and ./config.yaml
    pub fn load() -> Result<Self> {
        let env_name = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "local".to_string());
        info!("Loading configuration for environment: {}", env_name);

        let overrides = Self::load_file(Path::new("config.yaml"), &env_name)?;
        Self::from_sources(|key| std::env::var(key).ok(), overrides)
    }

    /// Read the section of a config file matching `env_name`. A missing file is not an error.
    pub fn load_file(path: &Path, env_name: &str) -> Result<FileOverrides> {
        if !path.exists() {
            return Ok(FileOverrides::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file: ConfigFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        Ok(match env_name {
            "production" => file.production,
            _ => file.local,
        })
    }

    /// Build the configuration from a variable lookup and file overrides.
    /// Environment variables win over the file, the file wins over defaults.
    pub fn from_sources<F>(lookup: F, file: FileOverrides) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let name = var("ENVIRONMENT").unwrap_or_else(|| "local".to_string());
        let is_production = name == "production";

        let port = match var("ROCKET_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| anyhow::anyhow!("ROCKET_PORT must be a valid port number"))?,
            None => file.port.unwrap_or(DEFAULT_PORT),
        };

        let base_dir = if is_production {
            PathBuf::from("/app")
        } else {
            std::env::current_dir().context("Failed to get current directory")?
        };

        let database_path = var("DATABASE_PATH")
            .map(PathBuf::from)
            .or(file.database_path)
            .unwrap_or_else(|| PathBuf::from("data/leadscope.db"));

        let log_path = var("LOG_PATH")
            .map(PathBuf::from)
            .or(file.log_path)
            .unwrap_or_else(|| PathBuf::from("/tmp/leadscope.log"));

        let timeout_seconds = match var("HTTP_TIMEOUT_SECONDS") {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|_| anyhow::anyhow!("HTTP_TIMEOUT_SECONDS must be a number"))?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let service = ServiceConfig {
            openai_api_key: var("OPENAI_API_KEY"),
            openai_base_url: var("OPENAI_BASE_URL")
                .or(file.openai_base_url)
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            ai_model: var("AI_MODEL")
                .or(file.ai_model)
                .unwrap_or_else(|| DEFAULT_AI_MODEL.to_string()),
            apify_token: var("APIFY_API_TOKEN"),
            apify_base_url: var("APIFY_BASE_URL")
                .or(file.apify_base_url)
                .unwrap_or_else(|| DEFAULT_APIFY_BASE_URL.to_string()),
            post_actor_id: var("APIFY_POST_ACTOR_ID").or(file.post_actor_id),
            public_base_url: var("PUBLIC_BASE_URL")
                .or(file.public_base_url)
                .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_string()),
            webhook_secret: var("WEBHOOK_SECRET"),
            timeout_seconds,
        };

        let jwt_secret = match var("JWT_SECRET") {
            Some(secret) => secret,
            None if is_production => anyhow::bail!("JWT_SECRET must be set in production"),
            None => {
                warn!("JWT_SECRET not set, using the local development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let token_ttl_hours = var("TOKEN_TTL_HOURS")
            .and_then(|raw| raw.parse::<i64>().ok())
            .unwrap_or(24);

        Ok(Self {
            environment: EnvironmentConfig {
                name,
                port,
                database_path: resolve_path(&base_dir, &database_path),
                log_path,
            },
            service,
            auth: AuthSettings {
                jwt_secret,
                issuer: "leadscope".to_string(),
                token_ttl_hours,
            },
        })
    }

    /// Ensure the database and log directories exist
    pub async fn ensure_directories(&self) -> Result<()> {
        for path in [&self.environment.database_path, &self.environment.log_path] {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await.with_context(|| {
                    format!("Failed to create directory: {}", parent.display())
                })?;
            }
        }
        Ok(())
    }
}

impl ServiceConfig {
    pub fn ai_enabled(&self) -> bool {
        self.openai_api_key.is_some()
    }

    pub fn apify_enabled(&self) -> bool {
        self.apify_token.is_some()
    }

    /// Callback URL handed to the scraper for analysis runs
    pub fn analysis_webhook_url(&self) -> Result<String> {
        self.callback_url("/ingest/analysis/webhook")
    }

    /// Callback URL for manually triggered scraper runs
    pub fn apify_webhook_url(&self) -> Result<String> {
        self.callback_url("/ingest/apify/webhook")
    }

    /// The secret travels form-encoded so it decodes to the same bytes on the way back
    fn callback_url(&self, path: &str) -> Result<String> {
        let base = format!("{}{}", self.public_base_url.trim_end_matches('/'), path);
        let url = match &self.webhook_secret {
            Some(secret) => reqwest::Url::parse_with_params(&base, &[("secret", secret.as_str())]),
            None => reqwest::Url::parse(&base),
        }
        .with_context(|| format!("PUBLIC_BASE_URL is not a valid URL: {}", self.public_base_url))?;
        Ok(url.to_string())
    }
}

fn resolve_path(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = ConfigManager::from_sources(lookup(&[]), FileOverrides::default()).unwrap();
        assert_eq!(config.environment.port, 8000);
        assert_eq!(config.service.ai_model, "gpt-4o-mini");
        assert!(!config.service.ai_enabled());
        assert!(!config.service.apify_enabled());
        assert!(config.environment.database_path.is_absolute());
    }

    #[test]
    fn test_environment_wins_over_file() {
        let file = FileOverrides {
            ai_model: Some("file-model".to_string()),
            port: Some(9000),
            ..Default::default()
        };
        let config = ConfigManager::from_sources(
            lookup(&[("AI_MODEL", "env-model"), ("OPENAI_API_KEY", "sk-test")]),
            file,
        )
        .unwrap();
        assert_eq!(config.service.ai_model, "env-model");
        assert_eq!(config.environment.port, 9000);
        assert!(config.service.ai_enabled());
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let result =
            ConfigManager::from_sources(lookup(&[("ROCKET_PORT", "http")]), FileOverrides::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_production_requires_jwt_secret() {
        let result = ConfigManager::from_sources(
            lookup(&[("ENVIRONMENT", "production")]),
            FileOverrides::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_webhook_url_carries_secret() {
        let config = ConfigManager::from_sources(
            lookup(&[
                ("PUBLIC_BASE_URL", "https://leads.example.com/"),
                ("WEBHOOK_SECRET", "s3cret"),
            ]),
            FileOverrides::default(),
        )
        .unwrap();
        assert_eq!(
            config.service.analysis_webhook_url().unwrap(),
            "https://leads.example.com/ingest/analysis/webhook?secret=s3cret"
        );
        assert_eq!(
            config.service.apify_webhook_url().unwrap(),
            "https://leads.example.com/ingest/apify/webhook?secret=s3cret"
        );
    }

    #[test]
    fn test_webhook_secret_is_encoded() {
        let config = ConfigManager::from_sources(
            lookup(&[
                ("PUBLIC_BASE_URL", "https://leads.example.com"),
                ("WEBHOOK_SECRET", "a&b c#%+"),
            ]),
            FileOverrides::default(),
        )
        .unwrap();

        let url = reqwest::Url::parse(&config.service.analysis_webhook_url().unwrap()).unwrap();
        assert_eq!(url.path(), "/ingest/analysis/webhook");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(pairs, vec![("secret".to_string(), "a&b c#%+".to_string())]);
    }

    #[test]
    fn test_invalid_public_base_url() {
        let config = ConfigManager::from_sources(
            lookup(&[("PUBLIC_BASE_URL", "not a url")]),
            FileOverrides::default(),
        )
        .unwrap();
        assert!(config.service.analysis_webhook_url().is_err());
    }

    #[test]
    fn test_load_file_picks_environment_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "local:\n  ai_model: local-model\nproduction:\n  ai_model: prod-model\n",
        )
        .unwrap();

        let local = ConfigManager::load_file(&path, "local").unwrap();
        let production = ConfigManager::load_file(&path, "production").unwrap();
        assert_eq!(local.ai_model.as_deref(), Some("local-model"));
        assert_eq!(production.ai_model.as_deref(), Some("prod-model"));

        let missing = ConfigManager::load_file(&dir.path().join("nope.yaml"), "local").unwrap();
        assert!(missing.ai_model.is_none());
    }
}
