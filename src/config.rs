use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub store: StoreConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub load: LoadConfig,
}

/// Connection and collection settings for the external document store.
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_scheme")]
    pub scheme: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_raw_index")]
    pub raw_index: String,
    #[serde(default = "default_agg_index")]
    pub agg_index: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl StoreConfig {
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// Tabular source and validated-output locations.
#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    /// Raw results CSV to validate.
    pub input: PathBuf,
    /// Where the validated CSV (with the derived finish_seconds column) is
    /// written.
    pub output: PathBuf,
}

/// Bulk-load tuning knobs.
#[derive(Debug, Deserialize, Clone)]
pub struct LoadConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_scan_page_size")]
    pub scan_page_size: usize,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            scan_page_size: default_scan_page_size(),
        }
    }
}

fn default_scheme() -> String {
    "http".to_string()
}
fn default_port() -> u16 {
    9200
}
fn default_raw_index() -> String {
    "race_results_raw".to_string()
}
fn default_agg_index() -> String {
    "race_results_aggregates".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_batch_size() -> usize {
    5000
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_backoff_ms() -> u64 {
    500
}
fn default_scan_page_size() -> usize {
    1000
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    match config.store.scheme.as_str() {
        "http" | "https" => {}
        other => anyhow::bail!("store.scheme must be http or https, got '{}'", other),
    }

    if config.store.raw_index == config.store.agg_index {
        anyhow::bail!("store.raw_index and store.agg_index must differ");
    }

    if config.load.batch_size == 0 {
        anyhow::bail!("load.batch_size must be > 0");
    }

    if config.load.scan_page_size == 0 {
        anyhow::bail!("load.scan_page_size must be > 0");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(body.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_minimal_config_with_defaults() {
        let f = write_config(
            r#"[store]
host = "localhost"

[source]
input = "results.csv"
output = "results_validated.csv"
"#,
        );
        let config = load_config(f.path()).unwrap();
        assert_eq!(config.store.port, 9200);
        assert_eq!(config.store.base_url(), "http://localhost:9200");
        assert_eq!(config.load.batch_size, 5000);
        assert_eq!(config.load.max_retries, 3);
    }

    #[test]
    fn test_rejects_same_index_names() {
        let f = write_config(
            r#"[store]
host = "localhost"
raw_index = "x"
agg_index = "x"

[source]
input = "a.csv"
output = "b.csv"
"#,
        );
        assert!(load_config(f.path()).is_err());
    }

    #[test]
    fn test_rejects_zero_batch_size() {
        let f = write_config(
            r#"[store]
host = "localhost"

[source]
input = "a.csv"
output = "b.csv"

[load]
batch_size = 0
"#,
        );
        assert!(load_config(f.path()).is_err());
    }
}
