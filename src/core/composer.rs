use std::sync::Arc;
use std::time::Duration;

use crate::core::error::CardError;
use crate::core::fetch::ImageResolver;
use crate::core::layout::TextSizes;
use crate::core::params::{self, CardQuery, CardRequest};
use crate::core::renderer::Rasterizer;
use crate::core::store::{GuildDefaults, SettingsStore};
use crate::core::template::{self, CardImages, DEFAULT_WATERMARK};

/// The full welcome-card pipeline: defaults lookup, parameter merge,
/// concurrent image resolution, document assembly and rasterization.
pub struct CardComposer {
    store: Arc<dyn SettingsStore>,
    resolver: ImageResolver,
    engine: Arc<dyn Rasterizer>,
    settings_timeout: Duration,
    watermark: String,
}

impl CardComposer {
    pub fn new(
        store: Arc<dyn SettingsStore>,
        resolver: ImageResolver,
        engine: impl Rasterizer + 'static,
        settings_timeout: Duration,
    ) -> Self {
        Self {
            store,
            resolver,
            engine: Arc::new(engine),
            settings_timeout,
            watermark: DEFAULT_WATERMARK.to_string(),
        }
    }

    pub fn with_watermark(mut self, watermark: impl Into<String>) -> Self {
        self.watermark = watermark.into();
        self
    }

    pub fn font_count(&self) -> usize {
        self.engine.font_count()
    }

    /// Stored defaults for `guild_id`, or `None` if the lookup fails or
    /// takes longer than the configured timeout.
    pub async fn stored_defaults(&self, guild_id: &str) -> Option<GuildDefaults> {
        match tokio::time::timeout(self.settings_timeout, self.store.guild_defaults(guild_id)).await
        {
            Ok(Ok(defaults)) => defaults,
            Ok(Err(e)) => {
                tracing::warn!(guild_id, "settings lookup failed, using built-in defaults: {:#}", e);
                None
            }
            Err(_) => {
                tracing::warn!(
                    guild_id,
                    "settings lookup timed out after {:?}, using built-in defaults",
                    self.settings_timeout
                );
                None
            }
        }
    }

    pub async fn resolve_request(&self, guild_id: &str, query: &CardQuery) -> CardRequest {
        let stored = self.stored_defaults(guild_id).await;
        params::resolve(query, stored.as_ref())
    }

    /// Fetch all three optional images at once. Each slot degrades on its own.
    pub async fn resolve_images(&self, card: &CardRequest) -> CardImages {
        let avatar_source = card.avatar_source.as_deref().filter(|_| card.show_avatar);

        let (background, avatar, server_icon) = tokio::join!(
            self.resolver
                .resolve("background", card.background_source.as_deref()),
            self.resolver.resolve("avatar", avatar_source),
            self.resolver
                .resolve("server_icon", card.server_icon_source.as_deref()),
        );

        CardImages {
            background,
            avatar,
            server_icon,
        }
    }

    /// Build the SVG document for a resolved card.
    pub async fn document(&self, card: &CardRequest) -> String {
        let images = self.resolve_images(card).await;
        let sizes = TextSizes::fit(&card.title, &card.subtitle);
        template::generate_svg(card, &images, sizes, &self.watermark)
    }

    pub async fn compose(&self, guild_id: &str, query: &CardQuery) -> Result<Vec<u8>, CardError> {
        let card = self.resolve_request(guild_id, query).await;
        let svg = self.document(&card).await;
        self.engine.rasterize(svg).await
    }
}
