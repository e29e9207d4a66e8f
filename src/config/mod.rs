use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};

use crate::notes::SortKey;

const APP_DOMAIN: &str = "io";
const APP_ORG: &str = "Notedash";
const APP_NAME: &str = "notedash";

pub const CONFIG_ENV: &str = "NOTEDASH_CONFIG";
pub const API_URL_ENV: &str = "NOTEDASH_API_URL";

pub struct ConfigLoader {
    paths: ConfigPaths,
}

impl ConfigLoader {
    /// `config_override` comes from `--config` and wins over the environment.
    pub fn discover(config_override: Option<PathBuf>) -> Result<Self> {
        let paths = ConfigPaths::discover(config_override)?;
        Ok(Self { paths })
    }

    pub fn with_paths(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn load_or_init(&self) -> Result<AppConfig> {
        self.paths.ensure_directories()?;
        if !self.paths.config_file.exists() {
            let default_cfg = AppConfig::default();
            self.write_default_config(&default_cfg)?;
            let mut cfg = default_cfg;
            cfg.post_load()?;
            return Ok(cfg);
        }

        self.load()
    }

    pub fn load(&self) -> Result<AppConfig> {
        let raw = fs::read_to_string(&self.paths.config_file)
            .with_context(|| format!("reading config {}", self.paths.config_file.display()))?;
        let mut cfg: AppConfig = toml::from_str(&raw).context("parsing config toml")?;
        cfg.post_load()?;
        Ok(cfg)
    }

    fn write_default_config(&self, cfg: &AppConfig) -> Result<()> {
        let toml = toml::to_string_pretty(cfg).context("serializing default config")?;
        if let Some(parent) = self.paths.config_file.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut file = fs::File::create(&self.paths.config_file)
            .with_context(|| format!("creating config {}", self.paths.config_file.display()))?;
        file.write_all(toml.as_bytes())
            .context("writing default config")?;
        tracing::info!(path = %self.paths.config_file.display(), "wrote default config");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub state_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl ConfigPaths {
    pub fn discover(config_override: Option<PathBuf>) -> Result<Self> {
        let override_config = config_override.or_else(|| env::var(CONFIG_ENV).ok().map(PathBuf::from));

        let project_dirs = ProjectDirs::from(APP_DOMAIN, APP_ORG, APP_NAME)
            .context("resolving XDG project directories")?;

        let config_dir = override_config
            .clone()
            .map(|p| {
                if p.is_dir() {
                    p
                } else {
                    p.parent().map(Path::to_path_buf).unwrap_or(p)
                }
            })
            .unwrap_or_else(|| project_dirs.config_dir().to_path_buf());

        let config_file = override_config
            .filter(|p| p.is_file() || p.extension().is_some())
            .unwrap_or_else(|| config_dir.join("config.toml"));

        let state_dir = project_dirs
            .state_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| project_dirs.data_local_dir().join("state"));

        Ok(Self::rooted(config_dir, config_file, state_dir))
    }

    pub fn rooted(config_dir: PathBuf, config_file: PathBuf, state_dir: PathBuf) -> Self {
        let log_dir = state_dir.join("logs");
        Self {
            config_dir,
            config_file,
            state_dir,
            log_dir,
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.config_dir, &self.state_dir, &self.log_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating application directory {}", dir.display()))?;
        }
        Ok(())
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join("notedash.log")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiOptions,
    pub search: SearchOptions,
    pub list: ListOptions,
}

impl AppConfig {
    fn post_load(&mut self) -> Result<()> {
        if let Ok(url) = env::var(API_URL_ENV) {
            tracing::debug!(%url, "api url taken from environment");
            self.api.base_url = url;
        }
        self.validate()
    }

    /// Applies `--api-url`, which takes precedence over file and environment.
    pub fn apply_api_url(&mut self, url: Option<&str>) -> Result<()> {
        if let Some(url) = url {
            self.api.base_url = url.to_string();
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.api.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            bail!("api.base_url must be an http(s) URL, got {url:?}");
        }
        if self.list.preview_chars == 0 {
            tracing::warn!("list.preview_chars is 0, previews will be empty");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiOptions {
    pub base_url: String,
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Idle time after the last keystroke before a search is sent.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "debounce_ms")]
    pub debounce: Duration,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListOptions {
    pub default_sort: SortKey,
    pub preview_chars: usize,
    pub show_archived: bool,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            default_sort: SortKey::Date,
            preview_chars: 50,
            show_archived: false,
        }
    }
}
