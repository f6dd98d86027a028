//! # Configuration
//!
//! Process configuration comes from environment variables with defaults;
//! practice settings used on reports live in `settings.yaml` inside the data
//! directory and are created with defaults on first start.
//!
//! | Variable | Default |
//! |---|---|
//! | `TAROT_DESK_DATA_DIR` | `~/Documents/Tarot Desk` |
//! | `TAROT_DESK_BIND` | `127.0.0.1:3000` |
//! | `TAROT_DESK_ALLOWED_ORIGIN` | `http://localhost:8080` |

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

pub const DATA_DIR_VAR: &str = "TAROT_DESK_DATA_DIR";
pub const BIND_VAR: &str = "TAROT_DESK_BIND";
pub const ALLOWED_ORIGIN_VAR: &str = "TAROT_DESK_ALLOWED_ORIGIN";

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:8080";
pub const SETTINGS_FILE: &str = "settings.yaml";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub allowed_origin: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve configuration through `lookup`, treating blank values as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let data_dir = match var(DATA_DIR_VAR) {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir()?,
        };

        let bind = var(BIND_VAR).unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr: SocketAddr = bind
            .parse()
            .with_context(|| format!("Invalid {} value: {}", BIND_VAR, bind))?;

        let allowed_origin = var(ALLOWED_ORIGIN_VAR).unwrap_or_else(|| DEFAULT_ALLOWED_ORIGIN.to_string());

        Ok(Self {
            data_dir,
            bind_addr,
            allowed_origin,
        })
    }
}

/// `~/Documents/Tarot Desk`, falling back to the home directory when there is no documents folder
fn default_data_dir() -> Result<PathBuf> {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .map(|dir| dir.join("Tarot Desk"))
        .ok_or_else(|| anyhow::anyhow!("Could not determine a data directory; set {}", DATA_DIR_VAR))
}

/// Practice details printed on reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PracticeSettings {
    pub business_name: String,
    pub currency_symbol: String,
    pub report_footer: String,
}

impl Default for PracticeSettings {
    fn default() -> Self {
        Self {
            business_name: "Tarot Desk".to_string(),
            currency_symbol: "R$".to_string(),
            report_footer: "Documento gerado automaticamente".to_string(),
        }
    }
}

impl PracticeSettings {
    /// Load `settings.yaml` from the data directory, writing defaults when it is missing
    pub fn load_or_create(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(SETTINGS_FILE);
        if !path.exists() {
            let settings = Self::default();
            fs::create_dir_all(data_dir)?;
            fs::write(&path, serde_yaml::to_string(&settings)?)?;
            info!("Created default practice settings at {:?}", path);
            return Ok(settings);
        }

        let content = fs::read_to_string(&path)?;
        match serde_yaml::from_str::<Self>(&content) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                warn!("Invalid practice settings in {:?} ({}), using defaults", path, e);
                Ok(Self::default())
            }
        }
    }
}
