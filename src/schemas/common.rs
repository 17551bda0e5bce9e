use poem_openapi::Object;

/// Body returned when a card could not be produced.
#[derive(Object, Debug)]
pub struct ErrorResponse {
    /// Always `false`
    pub ok: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(filepath: &str, function: &str, identifier: &str, err: &str) -> Self {
        tracing::error!(
            "error: on {}::{} iden: {} error: {}",
            filepath,
            function,
            identifier,
            err
        );
        Self {
            ok: false,
            error: err.to_string(),
        }
    }
}

#[derive(Object, Debug)]
pub struct HealthResponse {
    pub status: String,
    /// Font faces available to the rasterizer
    pub fonts: u64,
}
