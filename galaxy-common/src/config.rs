//! Configuration loading and resolution
//!
//! Bootstrap configuration comes from a TOML file. Resolution order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Built-in defaults (code constants)
//!
//! Every section has built-in defaults, so an empty or missing file is valid.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const ENV_CONFIG_PATH: &str = "GALAXY_CONFIG";
/// Environment variable overriding `[contact] email`
pub const ENV_CONTACT_EMAIL: &str = "GALAXY_CONTACT_EMAIL";
/// Environment variable overriding `[keys] serpapi`
pub const ENV_SERPAPI_KEY: &str = "GALAXY_SERPAPI_KEY";
/// Environment variable overriding `[keys] semantic_scholar`
pub const ENV_S2_API_KEY: &str = "GALAXY_S2_API_KEY";

/// Largest works page requested from any directory
pub const MAX_PAGE_SIZE: usize = 200;

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Contact identity sent to polite-pool APIs
    pub contact: ContactConfig,
    /// Optional API keys
    pub keys: ApiKeys,
    /// Directory base URLs
    pub endpoints: Endpoints,
    /// Candidate resolution thresholds
    pub resolver: ResolverSettings,
    /// HTTP timeout/retry policy
    pub http: HttpSettings,
    /// Output rendering knobs
    pub display: DisplaySettings,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error), used when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Contact identity
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContactConfig {
    /// Email passed as `mailto` (OpenAlex, Crossref) and in the User-Agent
    pub email: String,
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            email: "galaxy@example.org".to_string(),
        }
    }
}

/// Optional third-party API keys
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiKeys {
    /// SerpAPI key (Google Patents). Patent search via SerpAPI is skipped without it.
    pub serpapi: Option<String>,
    /// Semantic Scholar API key (sent as `x-api-key`)
    pub semantic_scholar: Option<String>,
}

/// Directory base URLs
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Endpoints {
    pub openalex: String,
    pub orcid: String,
    pub semantic_scholar: String,
    pub crossref: String,
    pub patentsview: String,
    pub serpapi: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            openalex: "https://api.openalex.org".to_string(),
            orcid: "https://pub.orcid.org".to_string(),
            semantic_scholar: "https://api.semanticscholar.org/graph/v1".to_string(),
            crossref: "https://api.crossref.org".to_string(),
            patentsview: "https://api.patentsview.org".to_string(),
            serpapi: "https://serpapi.com/search.json".to_string(),
        }
    }
}

/// Candidate resolution thresholds
///
/// Empirically tuned; kept configurable rather than treated as optimal.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolverSettings {
    /// Single title match at or above this accepts a candidate
    pub high_thresh: u8,
    /// Per-title threshold counted as a mid-confidence hit
    pub mid_thresh: u8,
    /// Affiliation similarity that lets a near-mid title match through
    pub affiliation_thresh: u8,
    /// How far below `mid_thresh` a title may be when affiliation agrees
    pub affiliation_slack: u8,
    /// Candidates requested per name search (capped at 10)
    pub max_candidates: usize,
    /// Work pages fetched per candidate (capped at 2)
    pub max_pages: usize,
    /// Works per page (at most [`MAX_PAGE_SIZE`])
    pub page_size: usize,
    /// Token-set score at which a publication counts as verified by the evidence text
    pub verify_thresh: u8,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            high_thresh: 88,
            mid_thresh: 75,
            affiliation_thresh: 80,
            affiliation_slack: 2,
            max_candidates: 10,
            max_pages: 2,
            page_size: 200,
            verify_thresh: 80,
        }
    }
}

/// HTTP timeout and retry policy
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Per-request timeout
    pub timeout_secs: u64,
    /// Retries after the first attempt (transient statuses only)
    pub max_retries: u32,
    /// Backoff base; attempt n sleeps `backoff_secs * 2^(n-1)`
    pub backoff_secs: f64,
    /// Per-client request rate
    pub requests_per_second: u32,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 3,
            backoff_secs: 1.5,
            requests_per_second: 5,
        }
    }
}

/// Output rendering knobs
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Agency names longer than this are shortened with an ellipsis
    pub agency_short_len: usize,
    /// Tags attached to the last awarded grant
    pub grant_tag_limit: usize,
    /// Keywords in the grants keyword section
    pub keyword_limit: usize,
    /// Scalar values treated as "unset" when merging
    pub placeholders: Vec<String>,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            agency_short_len: 12,
            grant_tag_limit: 5,
            keyword_limit: 10,
            placeholders: vec!["pending input".to_string()],
        }
    }
}

impl TomlConfig {
    /// Load configuration following the resolution order
    ///
    /// A missing file yields defaults; an unreadable or malformed file is an error.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let mut config = match resolve_config_path(cli_path) {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                load_toml_config(&path)?
            }
            None => {
                info!("No configuration file found, using built-in defaults");
                TomlConfig::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Overlay environment variables on top of TOML values
    pub fn apply_env_overrides(&mut self) {
        if let Some(email) = env_value(ENV_CONTACT_EMAIL) {
            self.contact.email = email;
        }
        if let Some(key) = env_value(ENV_SERPAPI_KEY) {
            self.keys.serpapi = Some(key);
        }
        if let Some(key) = env_value(ENV_S2_API_KEY) {
            self.keys.semantic_scholar = Some(key);
        }
    }

    /// Reject threshold combinations that cannot work
    pub fn validate(&self) -> Result<()> {
        let r = &self.resolver;
        if r.high_thresh > 100 || r.mid_thresh > 100 || r.affiliation_thresh > 100 {
            return Err(Error::Config("Resolver thresholds must be within 0-100".to_string()));
        }
        if r.mid_thresh > r.high_thresh {
            return Err(Error::Config(format!(
                "mid_thresh ({}) must not exceed high_thresh ({})",
                r.mid_thresh, r.high_thresh
            )));
        }
        if r.max_candidates == 0 || r.max_pages == 0 || r.page_size == 0 {
            return Err(Error::Config(
                "max_candidates, max_pages and page_size must be positive".to_string(),
            ));
        }
        if r.page_size > MAX_PAGE_SIZE {
            return Err(Error::Config(format!(
                "page_size ({}) exceeds the {} records a directory page may hold",
                r.page_size, MAX_PAGE_SIZE
            )));
        }
        if self.http.requests_per_second == 0 {
            return Err(Error::Config("requests_per_second must be positive".to_string()));
        }
        if !self.http.backoff_secs.is_finite() || self.http.backoff_secs < 0.0 {
            return Err(Error::Config("backoff_secs must be a non-negative number".to_string()));
        }
        Ok(())
    }

    /// SerpAPI key, if one is usable
    pub fn serpapi_key(&self) -> Option<&str> {
        self.keys.serpapi.as_deref().filter(|k| is_valid_key(k))
    }

    /// Semantic Scholar key, if one is usable
    pub fn semantic_scholar_key(&self) -> Option<&str> {
        self.keys.semantic_scholar.as_deref().filter(|k| is_valid_key(k))
    }
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Locate the config file: CLI argument → `GALAXY_CONFIG` → user config dir
pub fn resolve_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Some(path) = env_value(ENV_CONFIG_PATH) {
        return Some(PathBuf::from(path));
    }

    // Priority 3: ~/.config/galaxy/enrich.toml, only when present
    let user_config = default_config_path()?;
    if user_config.exists() {
        Some(user_config)
    } else {
        None
    }
}

/// Platform config location (`<config dir>/galaxy/enrich.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("galaxy").join("enrich.toml"))
}

fn env_value(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) if is_valid_key(&value) => Some(value.trim().to_string()),
        Ok(_) => {
            warn!("Ignoring empty environment variable {}", name);
            None
        }
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_thresholds() {
        let config = TomlConfig::default();
        assert_eq!(config.resolver.high_thresh, 88);
        assert_eq!(config.resolver.mid_thresh, 75);
        assert_eq!(config.resolver.affiliation_thresh, 80);
        assert_eq!(config.display.agency_short_len, 12);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: TomlConfig = toml::from_str(
            r#"
            [resolver]
            high_thresh = 90
            "#,
        )
        .unwrap();
        assert_eq!(config.resolver.high_thresh, 90);
        assert_eq!(config.resolver.mid_thresh, 75);
        assert_eq!(config.http.max_retries, 3);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let mut config = TomlConfig::default();
        config.resolver.mid_thresh = 95;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_oversized_pages() {
        let mut config = TomlConfig::default();
        config.resolver.page_size = MAX_PAGE_SIZE;
        assert!(config.validate().is_ok());
        config.resolver.page_size = MAX_PAGE_SIZE + 1;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("abc"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("   "));
    }
}
