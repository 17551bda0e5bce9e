use std::sync::Arc;

use poem::web::Data;
use poem_openapi::{
    OpenApi, Tags,
    param::{Path, Query},
    payload::Json,
};

use crate::{
    AppState,
    core::params::CardQuery,
    schemas::{
        card::{CardResponse, HealthCheckResponse},
        common::{ErrorResponse, HealthResponse},
    },
};

#[derive(Tags)]
enum ApiCardTags {
    Card,
}

pub struct ApiCard;

#[OpenApi()]
impl ApiCard {
    /// Welcome Card
    ///
    /// Render a welcome card for a guild member as a 1200x420 PNG.
    /// Parameters left out fall back to the guild's stored defaults, then to
    /// built-in defaults. Title and subtitle accept `{user.name}`,
    /// `{server.name}` and `{membercount}` placeholders.
    ///
    /// `overlayOpacity` is clamped to 0..0.85. Unreachable or invalid images
    /// never fail the request: the avatar falls back to a placeholder circle,
    /// the server icon and background are left out.
    #[oai(path = "/card/:guild_id", method = "get", tag = "ApiCardTags::Card")]
    async fn card(
        &self,
        state: Data<&Arc<AppState>>,
        guild_id: Path<String>,
        #[oai(name = "backgroundUrl")] background_url: Query<Option<String>>,
        #[oai(name = "backgroundImageUrl")] background_image_url: Query<Option<String>>,
        background: Query<Option<String>>,
        title: Query<Option<String>>,
        subtitle: Query<Option<String>>,
        #[oai(name = "backgroundColor")] background_color: Query<Option<String>>,
        #[oai(name = "textColor")] text_color: Query<Option<String>>,
        #[oai(name = "overlayOpacity")] overlay_opacity: Query<Option<String>>,
        #[oai(name = "showAvatar")] show_avatar: Query<Option<String>>,
        username: Query<Option<String>>,
        #[oai(name = "serverName")] server_name: Query<Option<String>>,
        membercount: Query<Option<String>>,
        #[oai(name = "memberCount")] member_count: Query<Option<String>>,
        #[oai(name = "avatarUrl")] avatar_url: Query<Option<String>>,
        #[oai(name = "serverIconUrl")] server_icon_url: Query<Option<String>>,
    ) -> CardResponse {
        let query = CardQuery {
            background_url: background_url.0,
            background_image_url: background_image_url.0,
            background: background.0,
            title: title.0,
            subtitle: subtitle.0,
            background_color: background_color.0,
            text_color: text_color.0,
            overlay_opacity: overlay_opacity.0,
            show_avatar: show_avatar.0,
            username: username.0,
            server_name: server_name.0,
            membercount: membercount.0,
            member_count: member_count.0,
            avatar_url: avatar_url.0,
            server_icon_url: server_icon_url.0,
        };

        tracing::info!(guild_id = %guild_id.0, "rendering welcome card");

        match state.composer.compose(&guild_id.0, &query).await {
            Ok(png) => {
                tracing::info!(guild_id = %guild_id.0, "card rendered, size: {} bytes", png.len());
                CardResponse::png(png)
            }
            Err(e) => CardResponse::InternalServerError(Json(ErrorResponse::new(
                "route.card",
                "card",
                &guild_id.0,
                &e.to_string(),
            ))),
        }
    }

    #[oai(path = "/health", method = "get")]
    async fn health(&self, state: Data<&Arc<AppState>>) -> HealthCheckResponse {
        HealthCheckResponse::Ok(Json(HealthResponse {
            status: "healthy".to_string(),
            fonts: state.composer.font_count() as u64,
        }))
    }
}
