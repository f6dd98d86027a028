use anyhow::Result;
use chrono::Utc;
use log::{debug, info, warn};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::backend::storage::traits::KeyValueStore;

/// JsonConnection keeps one `<key>.json` document per storage key in a data directory
///
/// ```text
/// data/
/// ├── settings.yaml
/// ├── atendimentos.json
/// ├── analises.json
/// ├── planos.json
/// └── lembretes.json
/// ```
#[derive(Clone, Debug)]
pub struct JsonConnection {
    base_directory: PathBuf,
}

impl JsonConnection {
    /// Create a new JSON connection with a base directory
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self> {
        let base_path = base_directory.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path)?;
            info!("Created data directory: {}", base_path.display());
        }

        Ok(Self {
            base_directory: base_path,
        })
    }

    /// Get the base directory path
    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    /// Resolve the file path for a key, rejecting anything that is not a plain name
    pub fn key_path(&self, key: &str) -> Result<PathBuf> {
        if !is_valid_key(key) {
            return Err(anyhow::anyhow!("Invalid storage key: {:?}", key));
        }
        Ok(self.base_directory.join(format!("{}.json", key)))
    }

    /// Existing `<key>.corrupt-*.json` backup holding exactly `raw`
    fn find_backup(&self, key: &str, raw: &str) -> Result<Option<PathBuf>> {
        let prefix = format!("{}.corrupt-", key);
        for entry in fs::read_dir(&self.base_directory)? {
            let path = entry?.path();
            let is_backup = path
                .file_name()
                .map(|name| name.to_string_lossy())
                .map(|name| name.starts_with(&prefix) && name.ends_with(".json"))
                .unwrap_or(false);
            if !is_backup {
                continue;
            }
            match fs::read_to_string(&path) {
                Ok(content) if content == raw => return Ok(Some(path)),
                Ok(_) => {}
                Err(e) => debug!("Could not read backup {}: {}", path.display(), e),
            }
        }
        Ok(None)
    }
}

/// Keys are lowercase ASCII names, digits, `_` and `-`
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= 64
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

impl KeyValueStore for JsonConnection {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No document stored for key '{}'", key);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key)?;

        // Write to temp file, then rename
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, value)?;
        fs::rename(&temp_path, &path)?;

        debug!("Saved {} bytes under key '{}' to {:?}", value.len(), key, path);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn preserve_corrupt(&self, key: &str, raw: &str) -> Result<()> {
        self.key_path(key)?;
        if let Some(existing) = self.find_backup(key, raw)? {
            debug!("Unreadable '{}' document already kept at {}", key, existing.display());
            return Ok(());
        }
        let backup = self
            .base_directory
            .join(format!("{}.corrupt-{}.json", key, Utc::now().timestamp_millis()));
        fs::write(&backup, raw)?;
        warn!("Preserved unreadable '{}' document at {}", key, backup.display());
        Ok(())
    }
}
