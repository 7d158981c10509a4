// src/config.rs
//
// TOML configuration. Every field has a default so an empty file (or no file
// at all) yields a working setup.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{Importance, PlatformKind, TitleNormalizer, DEFAULT_STRIP_PATTERN};
use crate::error::{AppError, AppResult};

const ENV_PATH: &str = "HOTSPOT_CONFIG_PATH";
const DEFAULT_CONFIG_FILE: &str = "config/hotspot.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotspotConfig {
    pub database: DatabaseConfig,
    pub identity: IdentityConfig,
    pub normalizer: NormalizerConfig,
    pub analysis: AnalysisConfig,
    pub push: PushConfig,
    pub platforms: Vec<PlatformConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// None resolves to `<data dir>/hotspot/news.db`
    pub path: Option<PathBuf>,
    pub pool_size: u32,
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            pool_size: 8,
            busy_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Max distance between an item's last_crawl_time and a rank-only
    /// observation for the title fallback to match.
    pub fallback_window_secs: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        // Hot lists turn over within a day; a story resurfacing after that is treated as new.
        Self {
            fallback_window_secs: 24 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    pub strip_pattern: String,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            strip_pattern: DEFAULT_STRIP_PATTERN.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub max_analyze_per_run: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_analyze_per_run: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    pub importance_levels: Vec<String>,
    pub max_push_per_run: usize,
    pub cross_platform_dedup: bool,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            importance_levels: vec!["critical".to_string(), "high".to_string()],
            max_push_per_run: 50,
            cross_platform_dedup: true,
        }
    }
}

impl PushConfig {
    pub fn levels(&self) -> AppResult<Vec<Importance>> {
        let mut levels = Vec::with_capacity(self.importance_levels.len());
        for raw in &self.importance_levels {
            let level: Importance = raw
                .parse()
                .map_err(|e| AppError::Config(format!("push.importance_levels: {}", e)))?;
            if !levels.contains(&level) {
                levels.push(level);
            }
        }
        Ok(levels)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformConfig {
    pub id: String,
    pub name: String,
    #[serde(default = "default_platform_kind")]
    pub kind: PlatformKind,
}

fn default_platform_kind() -> PlatformKind {
    PlatformKind::News
}

impl HotspotConfig {
    /// Load configuration using explicit path + fallbacks:
    /// 1) `path` argument
    /// 2) $HOTSPOT_CONFIG_PATH
    /// 3) config/hotspot.toml
    /// 4) built-in defaults
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        if let Some(p) = path {
            return Self::load_from(p);
        }
        if let Ok(p) = std::env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(AppError::Config(format!(
                    "{} points to non-existent path {}",
                    ENV_PATH,
                    pb.display()
                )));
            }
            return Self::load_from(&pb);
        }
        let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            return Self::load_from(&default_path);
        }

        log::info!("No configuration file found, using defaults");
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        let content = fs::read_to_string(path)?;
        log::info!("Loading configuration from {}", path.display());
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        let config: HotspotConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.database.pool_size == 0 {
            return Err(AppError::Config("database.pool_size must be > 0".to_string()));
        }
        if i64::try_from(self.identity.fallback_window_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .is_none()
        {
            return Err(AppError::Config(
                "identity.fallback_window_secs is out of range".to_string(),
            ));
        }
        if self.analysis.max_analyze_per_run == 0 {
            return Err(AppError::Config(
                "analysis.max_analyze_per_run must be > 0".to_string(),
            ));
        }
        if self.push.max_push_per_run == 0 {
            return Err(AppError::Config("push.max_push_per_run must be > 0".to_string()));
        }
        if self.push.levels()?.is_empty() {
            return Err(AppError::Config(
                "push.importance_levels cannot be empty".to_string(),
            ));
        }
        TitleNormalizer::new(&self.normalizer.strip_pattern)?;

        let mut seen = std::collections::HashSet::new();
        for platform in &self.platforms {
            crate::domain::platform::invariants::validate_id(&platform.id)?;
            if !seen.insert(platform.id.as_str()) {
                return Err(AppError::Config(format!(
                    "Platform '{}' is listed twice",
                    platform.id
                )));
            }
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(crate::db::default_database_path)
    }

    pub fn fallback_window(&self) -> Duration {
        Duration::seconds(self.identity.fallback_window_secs as i64)
    }

    pub fn normalizer(&self) -> AppResult<TitleNormalizer> {
        Ok(TitleNormalizer::new(&self.normalizer.strip_pattern)?)
    }
}
