//! Configuration structures for extraction and sync runs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{ConfigError, Result};
use crate::invoice::rules::header::HEADER_SCAN_LINES;

pub const ENV_SUPABASE_URL: &str = "SUPABASE_URL";
pub const ENV_SUPABASE_KEY: &str = "SUPABASE_SERVICE_ROLE_KEY";
pub const ENV_SUPABASE_TABLE: &str = "SUPABASE_TABLE";
pub const ENV_SUPABASE_BUCKET: &str = "SUPABASE_STORAGE_BUCKET";

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FaturaConfig {
    /// Remote storage and table settings.
    pub storage: StorageConfig,

    /// Invoice extraction configuration.
    pub extraction: ExtractionConfig,

    /// Sync run tuning.
    pub sync: SyncConfig,
}

/// Supabase project settings. Every field may be overridden from the
/// environment.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub url: Option<String>,

    /// Service role key.
    pub service_role_key: Option<String>,

    /// Target table for rows.
    pub table: Option<String>,

    /// Storage bucket holding the invoice PDFs.
    pub bucket: Option<String>,
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("url", &self.url)
            .field("service_role_key", &self.service_role_key.as_ref().map(|_| "<redacted>"))
            .field("table", &self.table)
            .field("bucket", &self.bucket)
            .finish()
    }
}

impl StorageConfig {
    /// Override fields with non-empty values returned by `lookup`.
    pub fn merge_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_SUPABASE_URL) {
            self.url = Some(url);
        }
        if let Some(key) = get(ENV_SUPABASE_KEY) {
            self.service_role_key = Some(key);
        }
        if let Some(table) = get(ENV_SUPABASE_TABLE) {
            self.table = Some(table);
        }
        if let Some(bucket) = get(ENV_SUPABASE_BUCKET) {
            self.bucket = Some(bucket);
        }
    }
}

/// Validated settings for talking to Supabase.
#[derive(Clone)]
pub struct SupabaseSettings {
    /// Project URL without trailing slash.
    pub url: String,
    pub service_role_key: String,
    pub table: String,
    pub bucket: String,
}

impl fmt::Debug for SupabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseSettings")
            .field("url", &self.url)
            .field("service_role_key", &"<redacted>")
            .field("table", &self.table)
            .field("bucket", &self.bucket)
            .finish()
    }
}

/// Invoice extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Leading lines searched for due date and total.
    pub header_scan_lines: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            header_scan_lines: HEADER_SCAN_LINES,
        }
    }
}

/// Sync run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Rows per upsert request.
    pub batch_size: usize,

    /// Entries per storage list request.
    pub list_page_size: usize,

    /// Documents downloaded and extracted concurrently.
    pub jobs: usize,

    /// Timeout for list requests, in seconds.
    pub list_timeout_secs: u64,

    /// Timeout for downloads, in seconds.
    pub download_timeout_secs: u64,

    /// Timeout for each upsert request, in seconds.
    pub upsert_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            list_page_size: 1000,
            jobs: 4,
            list_timeout_secs: 120,
            download_timeout_secs: 180,
            upsert_timeout_secs: 120,
        }
    }
}

impl FaturaConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Load from `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the storage section into usable settings.
    pub fn supabase_settings(&self) -> std::result::Result<SupabaseSettings, ConfigError> {
        let required = |value: &Option<String>, name: &'static str| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or(ConfigError::Missing(name))
        };

        let url = required(&self.storage.url, ENV_SUPABASE_URL)?;
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ConfigError::Invalid {
                key: ENV_SUPABASE_URL,
                reason: format!("'{}' is not an http(s) URL", url),
            });
        }

        Ok(SupabaseSettings {
            url: url.trim_end_matches('/').to_string(),
            service_role_key: required(&self.storage.service_role_key, ENV_SUPABASE_KEY)?,
            table: required(&self.storage.table, ENV_SUPABASE_TABLE)?,
            bucket: required(&self.storage.bucket, ENV_SUPABASE_BUCKET)?,
        })
    }
}
