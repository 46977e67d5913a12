//! Configuration management infrastructure.
//!
//! Validator timings, the result-page markers of the validation authority and
//! signing defaults are all kept in a TOML file so they can be adjusted when
//! the authority changes its markup, without a rebuild.

use crate::infra::error::{TrustError, TrustResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Smallest CMS reservation accepted in the signature dictionary.
const MIN_SIGNATURE_CAPACITY: usize = 4096;

/// Complete configuration for validation and signing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrustConfiguration {
    pub validator: ValidatorConfig,
    pub markers: MarkerConfig,
    pub batch: BatchConfig,
    pub signing: SigningDefaults,
}

/// Browser automation settings for the remote validation authority.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Page hosting the upload form
    pub validation_url: String,

    /// WebDriver endpoint used to open browser sessions
    pub webdriver_url: String,

    /// Optional driver binary (e.g. chromedriver) to spawn on pool start
    pub driver_binary: Option<PathBuf>,

    /// Port passed to a spawned driver binary
    pub driver_port: u16,

    pub headless: bool,

    pub browser_args: Vec<String>,

    pub page_load_timeout_secs: u64,

    /// How long to wait for the file input to appear
    pub upload_wait_secs: u64,

    pub poll_interval_ms: u64,

    /// Unchanged repeats of a marker-bearing read required to accept a result
    pub stable_samples: u32,

    pub max_wait_secs: u64,

    /// Delay before the single extra read taken after `max_wait_secs`
    pub grace_delay_secs: u64,

    /// Wall-clock budget for one document, session setup included
    pub hard_timeout_secs: u64,
}

/// Selectors and class markers of the authority's result page.
///
/// These describe third-party markup and will drift; keep them here rather
/// than in code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MarkerConfig {
    pub file_input_selector: String,
    pub results_container_selector: String,
    pub slot_selector: String,
    /// All of these must be present for a slot to pass
    pub pass_markers: Vec<String>,
    /// Any of these marks a slot as failed
    pub fail_markers: Vec<String>,
    /// Phrases the authority prints for documents without a signature
    pub unsigned_phrases: Vec<String>,
}

/// Fan-out limits for batch validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BatchConfig {
    pub max_concurrency: usize,
    /// Documents past this count are answered with an ERROR record
    pub max_documents: Option<usize>,
}

/// Defaults applied to signing requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SigningDefaults {
    pub default_reason: String,
    pub default_location: String,
    /// Bytes reserved for the CMS blob inside /Contents
    pub signature_capacity: usize,
    pub stamp_width: f64,
    pub stamp_height: f64,
    pub stamp_margin: f64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            validation_url: "https://conformidadepdf.tcees.tc.br/".to_string(),
            webdriver_url: "http://localhost:9515".to_string(),
            driver_binary: None,
            driver_port: 9515,
            headless: true,
            browser_args: vec![
                "--no-sandbox".to_string(),
                "--disable-dev-shm-usage".to_string(),
                "--disable-gpu".to_string(),
                "--disable-extensions".to_string(),
                "--disable-notifications".to_string(),
                "--blink-settings=imagesEnabled=false".to_string(),
                "--window-size=1280,720".to_string(),
                "--lang=pt-BR".to_string(),
            ],
            page_load_timeout_secs: 20,
            upload_wait_secs: 10,
            poll_interval_ms: 2000,
            stable_samples: 2,
            max_wait_secs: 35,
            grace_delay_secs: 5,
            hard_timeout_secs: 90,
        }
    }
}

impl ValidatorConfig {
    /// Reduced waits: faster, but more likely to end in a grace read.
    #[must_use]
    pub fn quick_mode() -> Self {
        Self::default().with_quick_timings()
    }

    /// Keep endpoints and browser settings, switch to the reduced waits.
    #[must_use]
    pub fn with_quick_timings(self) -> Self {
        Self {
            poll_interval_ms: 1000,
            max_wait_secs: 20,
            grace_delay_secs: 3,
            hard_timeout_secs: 60,
            ..self
        }
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }

    #[must_use]
    pub fn grace_delay(&self) -> Duration {
        Duration::from_secs(self.grace_delay_secs)
    }

    #[must_use]
    pub fn hard_timeout(&self) -> Duration {
        Duration::from_secs(self.hard_timeout_secs)
    }

    #[must_use]
    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    #[must_use]
    pub fn upload_wait(&self) -> Duration {
        Duration::from_secs(self.upload_wait_secs)
    }
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            file_input_selector: r#"input[type="file"]"#.to_string(),
            results_container_selector: "#validacoes-arquivo".to_string(),
            slot_selector: "div.d-inline-block".to_string(),
            pass_markers: vec!["fa-check".to_string(), "text-success".to_string()],
            fail_markers: vec![
                "text-danger".to_string(),
                "fa-close".to_string(),
                "fa-times".to_string(),
            ],
            unsigned_phrases: vec!["não assinado".to_string(), "nao assinado".to_string()],
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 3,
            max_documents: None,
        }
    }
}

impl Default for SigningDefaults {
    fn default() -> Self {
        Self {
            default_reason: "Documento assinado digitalmente".to_string(),
            default_location: "Brasil".to_string(),
            signature_capacity: 16384,
            stamp_width: 200.0,
            stamp_height: 80.0,
            stamp_margin: 30.0,
        }
    }
}

impl TrustConfiguration {
    /// Check every value that would otherwise fail at run time.
    pub fn validate(&self) -> TrustResult<()> {
        let v = &self.validator;
        for (name, url) in [
            ("validation_url", &v.validation_url),
            ("webdriver_url", &v.webdriver_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(config_error(format!(
                    "{name} must start with http:// or https://, got: {url}"
                )));
            }
        }

        if v.poll_interval_ms == 0 {
            return Err(config_error("poll_interval_ms must be greater than 0"));
        }
        if v.stable_samples == 0 {
            return Err(config_error("stable_samples must be greater than 0"));
        }
        if v.max_wait() < v.poll_interval() {
            return Err(config_error(
                "max_wait_secs must cover at least one poll interval",
            ));
        }
        if v.hard_timeout_secs == 0 {
            return Err(config_error("hard_timeout_secs must be greater than 0"));
        }

        let m = &self.markers;
        if m.pass_markers.is_empty() || m.fail_markers.is_empty() {
            return Err(config_error("pass_markers and fail_markers must not be empty"));
        }
        for (name, selector) in [
            ("file_input_selector", &m.file_input_selector),
            ("results_container_selector", &m.results_container_selector),
            ("slot_selector", &m.slot_selector),
        ] {
            if selector.trim().is_empty() {
                return Err(config_error(format!("{name} must not be empty")));
            }
        }

        if self.batch.max_concurrency == 0 {
            return Err(config_error("max_concurrency must be greater than 0"));
        }
        if self.batch.max_documents == Some(0) {
            return Err(config_error("max_documents must be greater than 0 when set"));
        }

        let s = &self.signing;
        if s.signature_capacity < MIN_SIGNATURE_CAPACITY {
            return Err(config_error(format!(
                "signature_capacity must be at least {MIN_SIGNATURE_CAPACITY} bytes"
            )));
        }
        if s.stamp_width <= 0.0 || s.stamp_height <= 0.0 || s.stamp_margin < 0.0 {
            return Err(config_error("stamp dimensions must be positive"));
        }

        Ok(())
    }
}

fn config_error(message: impl Into<String>) -> TrustError {
    TrustError::Configuration(message.into())
}

/// Configuration manager for handling config files
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new configuration manager with default path
    pub fn new() -> TrustResult<Self> {
        Ok(Self {
            config_path: Self::default_config_path(),
        })
    }

    /// Create a configuration manager with custom path
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        match dirs::config_dir() {
            Some(config_dir) => config_dir.join("pdf-trust").join("config.toml"),
            None => PathBuf::from("pdf-trust-config.toml"),
        }
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub fn load_or_create_default(&self) -> TrustResult<TrustConfiguration> {
        if self.config_path.exists() {
            self.load()
        } else {
            log::info!(
                "Configuration file not found, creating default: {}",
                self.config_path.display()
            );
            let default_config = TrustConfiguration::default();
            self.save(&default_config)?;
            Ok(default_config)
        }
    }

    /// Load configuration from file
    pub fn load(&self) -> TrustResult<TrustConfiguration> {
        log::info!("Loading configuration from: {}", self.config_path.display());

        let content = fs::read_to_string(&self.config_path).map_err(|e| {
            config_error(format!(
                "Failed to read config file {}: {e}",
                self.config_path.display()
            ))
        })?;

        let config: TrustConfiguration = toml::from_str(&content)
            .map_err(|e| config_error(format!("Failed to parse config file: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &TrustConfiguration) -> TrustResult<()> {
        config.validate()?;
        log::info!("Saving configuration to: {}", self.config_path.display());

        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    config_error(format!(
                        "Failed to create config directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        let content = toml::to_string_pretty(config)
            .map_err(|e| config_error(format!("Failed to serialize config: {e}")))?;

        fs::write(&self.config_path, content).map_err(|e| {
            config_error(format!(
                "Failed to write config file {}: {e}",
                self.config_path.display()
            ))
        })?;

        Ok(())
    }

    /// Update a specific configuration value
    pub fn update_value(&self, key: &str, value: &str) -> TrustResult<()> {
        let mut config = self.load_or_create_default()?;

        match key {
            "validation_url" => config.validator.validation_url = value.to_string(),
            "webdriver_url" => config.validator.webdriver_url = value.to_string(),
            "headless" => config.validator.headless = parse_value(key, value)?,
            "poll_interval_ms" => config.validator.poll_interval_ms = parse_value(key, value)?,
            "stable_samples" => config.validator.stable_samples = parse_value(key, value)?,
            "max_wait_secs" => config.validator.max_wait_secs = parse_value(key, value)?,
            "hard_timeout_secs" => config.validator.hard_timeout_secs = parse_value(key, value)?,
            "max_concurrency" => config.batch.max_concurrency = parse_value(key, value)?,
            "default_reason" => config.signing.default_reason = value.to_string(),
            "default_location" => config.signing.default_location = value.to_string(),
            "signature_capacity" => config.signing.signature_capacity = parse_value(key, value)?,
            _ => {
                return Err(config_error(format!("Unknown configuration key: {key}")));
            }
        }

        self.save(&config)
    }

    /// Get the configuration file path
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Export configuration as a portable format
    pub fn export_config(&self, format: ExportFormat) -> TrustResult<String> {
        let config = self.load()?;

        match format {
            ExportFormat::Toml => toml::to_string_pretty(&config)
                .map_err(|e| config_error(format!("TOML export failed: {e}"))),
            ExportFormat::Json => serde_json::to_string_pretty(&config)
                .map_err(|e| config_error(format!("JSON export failed: {e}"))),
            ExportFormat::Yaml => serde_yaml::to_string(&config)
                .map_err(|e| config_error(format!("YAML export failed: {e}"))),
        }
    }

    /// Import configuration from a string
    pub fn import_config(&self, content: &str, format: ExportFormat) -> TrustResult<()> {
        let config: TrustConfiguration = match format {
            ExportFormat::Toml => toml::from_str(content)
                .map_err(|e| config_error(format!("TOML import failed: {e}")))?,
            ExportFormat::Json => serde_json::from_str(content)
                .map_err(|e| config_error(format!("JSON import failed: {e}")))?,
            ExportFormat::Yaml => serde_yaml::from_str(content)
                .map_err(|e| config_error(format!("YAML import failed: {e}")))?,
        };

        self.save(&config)
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> TrustResult<T> {
    value
        .parse()
        .map_err(|_| config_error(format!("Invalid value for {key}: {value}")))
}

/// Configuration export/import formats
#[derive(Debug, Clone, Copy)]
pub enum ExportFormat {
    Toml,
    Json,
    Yaml,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_configuration() {
        let config = TrustConfiguration::default();
        assert_eq!(config.batch.max_concurrency, 3);
        assert_eq!(config.validator.stable_samples, 2);
        assert_eq!(config.markers.slot_selector, "div.d-inline-block");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_quick_mode_is_shorter() {
        let quick = ValidatorConfig::quick_mode();
        let normal = ValidatorConfig::default();
        assert!(quick.max_wait() < normal.max_wait());
        assert!(quick.grace_delay() < normal.grace_delay());

        let custom = ValidatorConfig {
            webdriver_url: "http://selenium:4444".to_string(),
            ..ValidatorConfig::default()
        }
        .with_quick_timings();
        assert_eq!(custom.webdriver_url, "http://selenium:4444");
        assert_eq!(custom.poll_interval_ms, quick.poll_interval_ms);
    }

    #[test]
    fn test_config_serialization() {
        let config = TrustConfiguration::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: TrustConfiguration = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let config: TrustConfiguration =
            toml::from_str("[batch]\nmax_concurrency = 5\n").unwrap();
        assert_eq!(config.batch.max_concurrency, 5);
        assert_eq!(config.validator.max_wait_secs, 35);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = TrustConfiguration::default();
        config.batch.max_concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = TrustConfiguration::default();
        config.markers.pass_markers.clear();
        assert!(config.validate().is_err());

        let mut config = TrustConfiguration::default();
        config.validator.webdriver_url = "localhost:9515".to_string();
        assert!(config.validate().is_err());

        let mut config = TrustConfiguration::default();
        config.signing.signature_capacity = 1024;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_manager_with_temp_path() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test_config.toml");
        let manager = ConfigManager::with_path(&config_path);

        let config = manager.load_or_create_default().unwrap();
        assert!(config_path.exists());

        manager.update_value("max_concurrency", "2").unwrap();
        let loaded = manager.load().unwrap();
        assert_eq!(loaded.batch.max_concurrency, 2);
        assert_eq!(loaded.validator, config.validator);

        assert!(manager.update_value("max_concurrency", "zero").is_err());
        assert!(manager.update_value("no_such_key", "1").is_err());
    }

    #[test]
    fn test_export_import_json() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp_dir.path().join("config.toml"));
        manager.load_or_create_default().unwrap();

        let json = manager.export_config(ExportFormat::Json).unwrap();
        assert!(json.contains("\"max_concurrency\": 3"));

        let other = ConfigManager::with_path(temp_dir.path().join("imported.toml"));
        other.import_config(&json, ExportFormat::Json).unwrap();
        assert_eq!(other.load().unwrap(), TrustConfiguration::default());
    }
}
