//! Optional config file loading. Search order: ./subscrape.toml, then
//! $XDG_CONFIG_HOME/subscrape/config.toml (or ~/.config/subscrape/config.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

const LOCAL_CONFIG: &str = "subscrape.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot determine current directory: {0}")]
    CurrentDir(#[source] std::io::Error),

    #[error("Cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Config file contents. All fields optional; only present keys override defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default, deny_unknown_fields)]
pub struct Config {
    /// Directory for exported files when -o is not set (default `Datasets`).
    pub output_dir: Option<PathBuf>,
    /// Listing API host (default https://www.reddit.com).
    pub base_url: Option<String>,
    /// HTTP User-Agent header.
    pub user_agent: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Minimum delay between requests in milliseconds.
    pub request_delay_ms: Option<u64>,
    /// Attempts per page before giving up (default 5).
    pub retry_count: Option<u32>,
    /// Delay before the first retry in milliseconds.
    pub backoff_base_ms: Option<u64>,
    /// Upper bound for a single retry delay in milliseconds.
    pub backoff_max_ms: Option<u64>,
    /// Growth factor between retry delays; 1.0 keeps the delay fixed.
    pub backoff_multiplier: Option<f64>,
    /// Random extra delay as a fraction of the computed delay (0.0 to 1.0).
    pub jitter_factor: Option<f64>,
    /// Stop a walk after this many pages.
    pub max_pages: Option<u32>,
    /// Posts per request (1 to 100).
    pub page_limit: Option<u32>,
    /// Output format: csv or json.
    pub format: Option<String>,
}

/// Candidate config paths, most specific first.
fn search_paths() -> Result<Vec<PathBuf>, ConfigError> {
    let cwd = std::env::current_dir().map_err(ConfigError::CurrentDir)?;
    let user = dirs::config_dir().map(|d| d.join("subscrape").join("config.toml"));
    Ok(std::iter::once(cwd.join(LOCAL_CONFIG)).chain(user).collect())
}

/// Load the first config file found. No file at all is `Ok(None)`; a file that
/// exists but cannot be read or parsed is an error.
pub fn load_config() -> Result<Option<Config>, ConfigError> {
    match search_paths()?.into_iter().find(|p| p.is_file()) {
        Some(path) => read_config(&path).map(Some),
        None => Ok(None),
    }
}

/// Parse one config file.
pub fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_config() {
        let c: Config = toml::from_str("").unwrap();
        assert!(c.output_dir.is_none());
        assert!(c.base_url.is_none());
        assert!(c.user_agent.is_none());
        assert!(c.timeout_secs.is_none());
        assert!(c.retry_count.is_none());
        assert!(c.max_pages.is_none());
        assert!(c.format.is_none());
    }

    #[test]
    fn parse_full_config() {
        let s = r#"
            output_dir = "out"
            base_url = "https://old.reddit.com"
            user_agent = "Custom/1.0"
            timeout_secs = 10
            request_delay_ms = 500
            retry_count = 3
            backoff_base_ms = 250
            backoff_max_ms = 4000
            backoff_multiplier = 1.5
            jitter_factor = 0.2
            max_pages = 40
            page_limit = 50
            format = "json"
        "#;
        let c: Config = toml::from_str(s).unwrap();
        assert_eq!(c.output_dir.as_deref(), Some(std::path::Path::new("out")));
        assert_eq!(c.base_url.as_deref(), Some("https://old.reddit.com"));
        assert_eq!(c.user_agent.as_deref(), Some("Custom/1.0"));
        assert_eq!(c.timeout_secs, Some(10));
        assert_eq!(c.request_delay_ms, Some(500));
        assert_eq!(c.retry_count, Some(3));
        assert_eq!(c.backoff_base_ms, Some(250));
        assert_eq!(c.backoff_max_ms, Some(4000));
        assert_eq!(c.backoff_multiplier, Some(1.5));
        assert_eq!(c.jitter_factor, Some(0.2));
        assert_eq!(c.max_pages, Some(40));
        assert_eq!(c.page_limit, Some(50));
        assert_eq!(c.format.as_deref(), Some("json"));
    }

    #[test]
    fn parse_partial_config() {
        let c: Config = toml::from_str("retry_count = 8").unwrap();
        assert_eq!(c.retry_count, Some(8));
        assert!(c.backoff_base_ms.is_none());
        assert!(c.output_dir.is_none());
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(toml::from_str::<Config>("retries = 3").is_err());
    }

    #[test]
    fn invalid_toml_errors() {
        assert!(toml::from_str::<Config>("output_dir = [").is_err());
    }

    #[test]
    fn read_config_from_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(LOCAL_CONFIG);
        std::fs::write(&path, "max_pages = 4\nformat = \"json\"\n")?;
        let c = read_config(&path)?;
        assert_eq!(c.max_pages, Some(4));
        assert_eq!(c.format.as_deref(), Some("json"));
        Ok(())
    }

    #[test]
    fn read_config_reports_path_on_bad_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(LOCAL_CONFIG);
        std::fs::write(&path, "retries = 3\n")?;
        let err = read_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(LOCAL_CONFIG));

        let missing = read_config(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Read { .. }));
        Ok(())
    }

    #[test]
    fn search_starts_in_working_directory() -> Result<(), ConfigError> {
        let paths = search_paths()?;
        assert!(paths[0].ends_with(LOCAL_CONFIG));
        assert!(paths.len() <= 2);
        Ok(())
    }
}
