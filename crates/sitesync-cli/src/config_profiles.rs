//! Persistent CLI profile configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sitesync_core::sync::TransportConfig;
use sitesync_core::EngineConfig;

const CONFIG_FILE_NAME: &str = "cli-config.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfilesConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    #[serde(default)]
    pub active_profile: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, CliProfile>,
}

#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfile {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub auto_sync_interval_secs: Option<u64>,
}

impl std::fmt::Debug for CliProfile {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("CliProfile")
            .field("endpoint", &self.endpoint)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("auto_sync_interval_secs", &self.auto_sync_interval_secs)
            .finish()
    }
}

/// Sync settings after applying environment overrides to a profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSync {
    pub profile_name: String,
    pub transport: TransportConfig,
    pub engine: EngineConfig,
}

const fn default_config_version() -> u32 {
    1
}

pub fn default_config_path() -> Result<PathBuf, String> {
    dirs::config_dir()
        .map(|dir| dir.join("sitesync").join(CONFIG_FILE_NAME))
        .ok_or_else(|| "Failed to resolve CLI config directory".to_string())
}

pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    sitesync_core::util::normalize_text_option(value)
}

pub fn normalize_profile_name(value: Option<&str>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

impl CliProfilesConfig {
    pub fn load() -> Result<Self, String> {
        Self::load_from_path(&default_config_path()?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|error| format!("Failed to read config at {}: {}", path.display(), error))?;
        let mut config = serde_json::from_str::<Self>(&raw)
            .map_err(|error| format!("Failed to parse config at {}: {}", path.display(), error))?;
        config.normalize();
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, String> {
        let path = default_config_path()?;
        self.save_to_path(&path)?;
        Ok(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    error
                )
            })?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)
            .map_err(|error| format!("Failed to serialize config: {error}"))?;
        std::fs::write(path, serialized)
            .map_err(|error| format!("Failed to write config at {}: {}", path.display(), error))
    }

    pub fn resolve_profile_name(&self, explicit: Option<&str>) -> String {
        if let Some(profile) = normalize_profile_name(explicit) {
            return profile;
        }
        if let Some(profile) =
            normalize_profile_name(std::env::var("SITESYNC_PROFILE").ok().as_deref())
        {
            return profile;
        }
        if let Some(profile) = normalize_profile_name(self.active_profile.as_deref()) {
            return profile;
        }
        "default".to_string()
    }

    pub fn profile(&self, name: &str) -> Option<&CliProfile> {
        self.profiles.get(name)
    }

    pub fn profile_mut_or_default(&mut self, name: &str) -> &mut CliProfile {
        self.profiles.entry(name.to_string()).or_default()
    }

    /// Resolve sync settings for a profile, letting `SITESYNC_ENDPOINT` and
    /// `SITESYNC_AUTH_TOKEN` override the stored values.
    ///
    /// Returns `None` when no endpoint is configured anywhere.
    pub fn resolve_sync(&self, explicit_profile: Option<&str>) -> Option<ResolvedSync> {
        self.resolve_sync_with(explicit_profile, |key| std::env::var(key).ok())
    }

    pub(crate) fn resolve_sync_with(
        &self,
        explicit_profile: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Option<ResolvedSync> {
        let profile_name = self.resolve_profile_name(explicit_profile);
        let profile = self.profile(&profile_name).cloned().unwrap_or_default();

        let endpoint =
            normalize_text_option(env("SITESYNC_ENDPOINT")).or_else(|| profile.endpoint())?;
        let auth_token =
            normalize_text_option(env("SITESYNC_AUTH_TOKEN")).or_else(|| profile.auth_token());

        let mut engine = EngineConfig::default();
        if let Some(secs) = profile.auto_sync_interval_secs.filter(|secs| *secs > 0) {
            engine = engine.with_auto_sync_interval(Duration::from_secs(secs));
        }

        Some(ResolvedSync {
            profile_name,
            transport: TransportConfig {
                endpoint,
                auth_token,
            },
            engine,
        })
    }

    fn normalize(&mut self) {
        self.active_profile = normalize_profile_name(self.active_profile.as_deref());
        for profile in self.profiles.values_mut() {
            profile.normalize();
        }
    }
}

impl CliProfile {
    pub fn endpoint(&self) -> Option<String> {
        normalize_text_option(self.endpoint.clone())
    }

    pub fn auth_token(&self) -> Option<String> {
        normalize_text_option(self.auth_token.clone())
    }

    fn normalize(&mut self) {
        self.endpoint = normalize_text_option(self.endpoint.clone())
            .as_deref()
            .map(sitesync_core::util::trim_trailing_slash);
        self.auth_token = normalize_text_option(self.auth_token.clone());
    }
}
