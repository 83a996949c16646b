use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub database: DatabaseConfig,
    pub fetch: FetchSettings,
    pub robots: RobotsSettings,
    pub language_id: LanguageIdConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    pub data_dir: String,
    #[serde(default = "default_max_inflight")]
    pub max_inflight: usize,
    pub snapshot_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchSettings {
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RobotsSettings {
    pub user_agent: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LanguageIdConfig {
    pub model_path: String,
}

fn default_max_inflight() -> usize {
    16
}
fn default_connect_timeout_ms() -> u64 {
    15_000
}
fn default_read_timeout_ms() -> u64 {
    20_000
}
fn default_write_timeout_ms() -> u64 {
    5_000
}
fn default_max_redirects() -> usize {
    5
}

impl AppConfig {
    /// Embedded fallback, parsed the way the teacher binary falls back to
    /// `include_str!("../config/default.toml")` when no `--config` path
    /// is given or the file is missing.
    pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
        let raw = match path {
            Some(p) if std::path::Path::new(p).exists() => std::fs::read_to_string(p)?,
            _ => include_str!("../../../config/default.toml").to_string(),
        };
        Ok(toml::from_str(&raw)?)
    }
}
