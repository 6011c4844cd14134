use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_EXCHANGE_RATE_URL: &str = "https://api.exchangerate-api.com";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExchangeRateProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub exchange_rate: Option<ExchangeRateProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            exchange_rate: Some(ExchangeRateProviderConfig {
                base_url: DEFAULT_EXCHANGE_RATE_URL.to_string(),
            }),
        }
    }
}

impl ProvidersConfig {
    pub fn exchange_rate_url(&self) -> &str {
        self.exchange_rate
            .as_ref()
            .map_or(DEFAULT_EXCHANGE_RATE_URL, |p| &p.base_url)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Base currency used until the user picks one.
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_auto_update_rates")]
    pub auto_update_rates: bool,
    #[serde(default)]
    pub providers: ProvidersConfig,
    pub data_path: Option<String>,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_auto_update_rates() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            currency: default_currency(),
            auto_update_rates: default_auto_update_rates(),
            providers: ProvidersConfig::default(),
            data_path: None,
        }
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "daybook", "daybook")
        .context("Could not determine project directories")
}

impl AppConfig {
    /// Loads the config from the default location, or the built-in defaults
    /// when no config file has been created yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.yaml"))
    }

    pub fn data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        Ok(project_dirs()?.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
currency: "EUR"
auto_update_rates: false
providers:
  exchange_rate:
    base_url: "http://example.com/rates"
data_path: "/tmp/daybook"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.currency, "EUR");
        assert!(!config.auto_update_rates);
        assert_eq!(
            config.providers.exchange_rate_url(),
            "http://example.com/rates"
        );
        assert_eq!(config.data_path().unwrap(), PathBuf::from("/tmp/daybook"));
    }

    #[test]
    fn test_config_defaults() {
        let config: AppConfig = serde_yaml::from_str("data_path: ~").unwrap();
        assert_eq!(config.currency, "USD");
        assert!(config.auto_update_rates);
        assert_eq!(
            config.providers.exchange_rate_url(),
            DEFAULT_EXCHANGE_RATE_URL
        );

        let config: AppConfig = serde_yaml::from_str("providers: {}\ndata_path: ~").unwrap();
        assert!(config.providers.exchange_rate.is_none());
        assert_eq!(
            config.providers.exchange_rate_url(),
            DEFAULT_EXCHANGE_RATE_URL
        );
    }

    #[test]
    fn test_load_from_path() -> Result<()> {
        let file = NamedTempFile::new()?;
        fs::write(file.path(), "currency: GBP\n")?;
        let config = AppConfig::load_from_path(file.path())?;
        assert_eq!(config.currency, "GBP");

        let missing = AppConfig::load_from_path("/nonexistent/daybook.yaml");
        assert!(
            missing
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
        Ok(())
    }
}
