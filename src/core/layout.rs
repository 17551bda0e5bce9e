//! Fixed card geometry and text-fit sizing.
//!
//! The numbers here are tuned for one visual design and are kept as-is.

pub const CANVAS_WIDTH: u32 = 1200;
pub const CANVAS_HEIGHT: u32 = 420;

pub const PANEL_INSET: u32 = 40;
pub const PANEL_RADIUS: u32 = 28;
pub const ACCENT_BAR_WIDTH: u32 = 10;

pub const AVATAR_CENTER_X: u32 = 200;
pub const AVATAR_CENTER_Y: u32 = 210;
pub const AVATAR_RADIUS: u32 = 86;
pub const AVATAR_RING_RADIUS: u32 = 96;

pub const SERVER_ICON_CENTER_X: u32 = 1090;
pub const SERVER_ICON_CENTER_Y: u32 = 110;
pub const SERVER_ICON_RADIUS: u32 = 40;

pub const TEXT_LEFT: u32 = 340;
pub const TEXT_RIGHT_MARGIN: u32 = 60;
pub const TITLE_BASELINE: u32 = 200;
pub const SUBTITLE_BASELINE: u32 = 252;

pub const TITLE_FONT_BASE: u32 = 44;
pub const TITLE_FONT_MIN: u32 = 22;
pub const SUBTITLE_FONT_BASE: u32 = 22;
pub const SUBTITLE_FONT_MIN: u32 = 16;

/// Average glyph advance as a fraction of the font size.
pub const GLYPH_WIDTH_FACTOR: f64 = 0.60;

/// Horizontal room available to the title and subtitle.
pub const fn text_max_width() -> u32 {
    CANVAS_WIDTH - TEXT_LEFT - TEXT_RIGHT_MARGIN
}

/// Largest font size in `[min, base]` at which `text` is estimated to fit in
/// `max_width` pixels. A `min` above `base` is treated as `base`.
pub fn fit_font_size(text: &str, max_width: f64, base: u32, min: u32) -> u32 {
    let min = min.min(base);
    let chars = text.chars().count().max(1) as f64;
    let needed = max_width / (chars * GLYPH_WIDTH_FACTOR);
    let size = f64::from(base).min(needed).floor();

    // `needed` is non-negative here, so the cast saturates instead of wrapping.
    (size.max(0.0) as u32).clamp(min, base)
}

/// Font sizes for one card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSizes {
    pub title: u32,
    pub subtitle: u32,
}

impl TextSizes {
    pub fn fit(title: &str, subtitle: &str) -> Self {
        let max_width = f64::from(text_max_width());
        Self {
            title: fit_font_size(title, max_width, TITLE_FONT_BASE, TITLE_FONT_MIN),
            subtitle: fit_font_size(subtitle, max_width, SUBTITLE_FONT_BASE, SUBTITLE_FONT_MIN),
        }
    }
}
