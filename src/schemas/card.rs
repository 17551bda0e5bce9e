use poem_openapi::{
    ApiResponse,
    payload::{Binary, Json},
};

use super::common::{ErrorResponse, HealthResponse};

pub const CACHE_CONTROL_NO_STORE: &str = "no-store";

#[derive(ApiResponse)]
pub enum CardResponse {
    /// Rendered welcome card
    #[oai(status = 200, content_type = "image/png")]
    Png(
        Binary<Vec<u8>>,
        #[oai(header = "Cache-Control")] String,
    ),

    #[oai(status = 500)]
    InternalServerError(Json<ErrorResponse>),
}

impl CardResponse {
    pub fn png(bytes: Vec<u8>) -> Self {
        Self::Png(Binary(bytes), CACHE_CONTROL_NO_STORE.to_string())
    }
}

#[derive(ApiResponse)]
pub enum HealthCheckResponse {
    #[oai(status = 200, content_type = "application/json")]
    Ok(Json<HealthResponse>),
}
