use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;

/// Card defaults a guild has saved. Every field is optional; missing fields
/// fall through to the built-in defaults.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GuildDefaults {
    pub background_url: Option<String>,
    pub background_color: Option<String>,
    pub text_color: Option<String>,
    pub overlay_opacity: Option<f64>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub show_avatar: Option<bool>,
    pub avatar_url: Option<String>,
    pub server_icon_url: Option<String>,
    pub username: Option<String>,
    pub server_name: Option<String>,
    pub member_count: Option<String>,
}

/// Read-only lookup of per-guild card defaults.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn guild_defaults(&self, guild_id: &str) -> Result<Option<GuildDefaults>>;
}

/// Settings held in memory, optionally seeded from a JSON file of the form
/// `{ "<guild id>": { "title": "...", ... } }`.
#[derive(Default)]
pub struct MemorySettingsStore {
    guilds: RwLock<HashMap<String, GuildDefaults>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let guilds: HashMap<String, GuildDefaults> =
            serde_json::from_str(json).context("settings json is not a guild map")?;
        Ok(Self {
            guilds: RwLock::new(guilds),
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings file {}", path.display()))?;
        Self::from_json(&json)
    }

    pub fn insert(&self, guild_id: impl Into<String>, defaults: GuildDefaults) {
        self.guilds.write().insert(guild_id.into(), defaults);
    }

    pub fn len(&self) -> usize {
        self.guilds.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guilds.read().is_empty()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn guild_defaults(&self, guild_id: &str) -> Result<Option<GuildDefaults>> {
        Ok(self.guilds.read().get(guild_id).cloned())
    }
}
