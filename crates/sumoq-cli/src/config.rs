//! Configuration management for Sumoq CLI
//!
//! Stores profiles (region + credentials) and the default profile in
//! ~/.config/sumoq/config.toml. `SUMOQ_CONFIG` points at another file.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_DIR: &str = "sumoq";
const CONFIG_FILE: &str = "config.toml";
const CONFIG_ENV: &str = "SUMOQ_CONFIG";
const ACCESS_KEY_ENV: &str = "SUMOQ_ACCESS_KEY";
const DEFAULT_REGION: &str = "us1";

/// Credentials and endpoint for one Sumo Logic deployment
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub access_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,
    /// Full API base, overrides the region
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

impl Profile {
    pub fn new(region: impl Into<String>, access_id: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            access_id: access_id.into(),
            ..Default::default()
        }
    }

    /// API base URL for this profile
    pub fn endpoint(&self) -> String {
        if let Some(endpoint) = &self.endpoint {
            return endpoint.trim_end_matches('/').to_string();
        }

        match self.region.trim().to_lowercase().as_str() {
            "" | "us1" => "https://api.sumologic.com/api/v1".to_string(),
            region => format!("https://api.{}.sumologic.com/api/v1", region),
        }
    }

    /// Stored key, or `SUMOQ_ACCESS_KEY`
    pub fn access_key(&self) -> Option<String> {
        self.access_key
            .clone()
            .or_else(|| std::env::var(ACCESS_KEY_ENV).ok())
            .filter(|key| !key.is_empty())
    }
}

/// CLI Configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join(CONFIG_DIR);
        Ok(config_dir)
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Profile names double as cache file names
    pub fn check_profile_name(name: &str) -> Result<()> {
        let valid_chars = name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'));

        if name.is_empty() || !valid_chars || name.starts_with('.') {
            bail!(
                "Invalid profile name '{}': use letters, digits, '-', '_' or '.' (not leading)",
                name
            );
        }
        Ok(())
    }

    /// Metadata cache file for a profile
    pub fn cache_path(profile: &str) -> Result<PathBuf> {
        Self::check_profile_name(profile)?;
        let cache_dir = dirs::cache_dir()
            .context("Could not determine cache directory")?
            .join(CONFIG_DIR);
        Ok(cache_dir.join(format!("{}.json", profile)))
    }

    /// Load config from file, or create default
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file")?;

        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory {:?}", dir))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        Ok(())
    }

    /// Add or replace a profile. The first profile becomes the default.
    pub fn add_profile(&mut self, name: String, profile: Profile) {
        if self.profiles.is_empty() && self.default_profile.is_none() {
            self.default_profile = Some(name.clone());
        }
        self.profiles.insert(name, profile);
    }

    /// Remove a profile, clearing the default if it pointed there
    pub fn remove_profile(&mut self, name: &str) -> bool {
        let removed = self.profiles.remove(name).is_some();
        if removed && self.default_profile.as_deref() == Some(name) {
            self.default_profile = None;
        }
        removed
    }

    /// Set default profile
    pub fn set_default_profile(&mut self, name: String) -> bool {
        if self.profiles.contains_key(&name) {
            self.default_profile = Some(name);
            true
        } else {
            false
        }
    }

    /// Get the active profile (specified or default) with its name
    pub fn get_profile(&self, name: Option<&str>) -> Option<(&str, &Profile)> {
        let profile_name = name.or(self.default_profile.as_deref())?;
        self.profiles
            .get_key_value(profile_name)
            .map(|(name, profile)| (name.as_str(), profile))
    }
}
