use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use resvg::tiny_skia;
use resvg::usvg::{self, fontdb};

use crate::core::error::CardError;
use crate::core::layout::{CANVAS_HEIGHT, CANVAS_WIDTH};

static SYSTEM_FONTS: Lazy<Arc<fontdb::Database>> = Lazy::new(|| {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    tracing::debug!("loaded {} system font faces", db.len());
    Arc::new(db)
});

/// Turns a finished card document into PNG bytes.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn rasterize(&self, svg: String) -> Result<Vec<u8>, CardError>;

    /// Font faces available to text rendering.
    fn font_count(&self) -> usize;
}

/// Turns card SVG documents into PNG bytes.
#[derive(Clone)]
pub struct RenderingEngine {
    fontdb: Arc<fontdb::Database>,
}

impl Default for RenderingEngine {
    fn default() -> Self {
        Self {
            fontdb: SYSTEM_FONTS.clone(),
        }
    }
}

impl RenderingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// System fonts plus every font file found in `fonts_dir`.
    pub fn with_fonts_dir(fonts_dir: impl AsRef<Path>) -> Self {
        let mut db = fontdb::Database::clone(&SYSTEM_FONTS);
        db.load_fonts_dir(fonts_dir.as_ref());
        tracing::info!(
            "font database ready: {} faces (including {})",
            db.len(),
            fonts_dir.as_ref().display()
        );
        Self {
            fontdb: Arc::new(db),
        }
    }

    pub fn font_count(&self) -> usize {
        self.fontdb.len()
    }

    /// Rasterize on the blocking pool so renders never stall the runtime.
    pub async fn render(&self, svg: String) -> Result<Vec<u8>, CardError> {
        let engine = self.clone();

        tokio::task::spawn_blocking(move || engine.render_sync(&svg)).await?
    }

    pub fn render_sync(&self, svg: &str) -> Result<Vec<u8>, CardError> {
        let options = usvg::Options {
            fontdb: self.fontdb.clone(),
            ..Default::default()
        };
        let tree = usvg::Tree::from_str(svg, &options)?;

        let mut pixmap = tiny_skia::Pixmap::new(CANVAS_WIDTH, CANVAS_HEIGHT).ok_or(
            CardError::Canvas {
                width: CANVAS_WIDTH,
                height: CANVAS_HEIGHT,
            },
        )?;

        let size = tree.size();
        let transform = tiny_skia::Transform::from_scale(
            CANVAS_WIDTH as f32 / size.width(),
            CANVAS_HEIGHT as f32 / size.height(),
        );
        resvg::render(&tree, transform, &mut pixmap.as_mut());

        pixmap
            .encode_png()
            .map_err(|e| CardError::Encode(e.to_string()))
    }
}

#[async_trait]
impl Rasterizer for RenderingEngine {
    async fn rasterize(&self, svg: String) -> Result<Vec<u8>, CardError> {
        self.render(svg).await
    }

    fn font_count(&self) -> usize {
        RenderingEngine::font_count(self)
    }
}
