use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;

use crate::detect::DEFAULT_PARTICLE_LABEL;
use crate::storage::DEFAULT_HISTORY_SLOT;

const DEFAULT_DB_PATH: &str = "particle_scope.db";
const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:5000/detect";
const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Deserialize, Default)]
struct ScopeConfigFile {
    db_path: Option<String>,
    particle_label: Option<String>,
    history: Option<HistoryConfigFile>,
    service: Option<ServiceConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct HistoryConfigFile {
    slot: Option<String>,
    page_size: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct ServiceConfigFile {
    url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ScopeConfig {
    pub db_path: String,
    pub particle_label: String,
    pub history: HistorySettings,
    pub service_url: String,
}

#[derive(Debug, Clone)]
pub struct HistorySettings {
    pub slot: String,
    pub page_size: usize,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self::from_file(ScopeConfigFile::default())
    }
}

impl ScopeConfig {
    /// Load from the JSON file named by `PARTICLE_SCOPE_CONFIG` (if set),
    /// then apply environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("PARTICLE_SCOPE_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ScopeConfigFile) -> Self {
        let history = HistorySettings {
            slot: file
                .history
                .as_ref()
                .and_then(|history| history.slot.clone())
                .unwrap_or_else(|| DEFAULT_HISTORY_SLOT.to_string()),
            page_size: file
                .history
                .as_ref()
                .and_then(|history| history.page_size)
                .unwrap_or(DEFAULT_PAGE_SIZE),
        };
        Self {
            db_path: file.db_path.unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            particle_label: file
                .particle_label
                .unwrap_or_else(|| DEFAULT_PARTICLE_LABEL.to_string()),
            history,
            service_url: file
                .service
                .and_then(|service| service.url)
                .unwrap_or_else(|| DEFAULT_SERVICE_URL.to_string()),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("PARTICLE_SCOPE_DB_PATH") {
            if !path.trim().is_empty() {
                self.db_path = path;
            }
        }
        if let Ok(url) = std::env::var("PARTICLE_SCOPE_SERVICE_URL") {
            if !url.trim().is_empty() {
                self.service_url = url;
            }
        }
        if let Ok(label) = std::env::var("PARTICLE_SCOPE_PARTICLE_LABEL") {
            if !label.trim().is_empty() {
                self.particle_label = label;
            }
        }
        if let Ok(page_size) = std::env::var("PARTICLE_SCOPE_PAGE_SIZE") {
            self.history.page_size = page_size
                .trim()
                .parse()
                .map_err(|_| anyhow!("PARTICLE_SCOPE_PAGE_SIZE must be a positive integer"))?;
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        self.particle_label = self.particle_label.trim().to_string();
        if self.particle_label.is_empty() {
            return Err(anyhow!("particle label cannot be empty"));
        }
        if self.history.slot.trim().is_empty() {
            return Err(anyhow!("history slot name cannot be empty"));
        }
        if self.history.page_size == 0 {
            return Err(anyhow!("history page size must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<ScopeConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let mut cfg = ScopeConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.particle_label, "microplastic");
        assert_eq!(cfg.history.slot, "particle_history");
        assert_eq!(cfg.history.page_size, 10);
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let mut cfg = ScopeConfig::from_file(ScopeConfigFile {
            history: Some(HistoryConfigFile {
                slot: None,
                page_size: Some(0),
            }),
            ..ScopeConfigFile::default()
        });
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn blank_label_is_rejected() {
        let mut cfg = ScopeConfig::from_file(ScopeConfigFile {
            particle_label: Some("  ".to_string()),
            ..ScopeConfigFile::default()
        });
        assert!(cfg.validate().is_err());
    }
}
