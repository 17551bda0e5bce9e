use std::fmt::Write as _;

use crate::core::fetch::ResolvedImage;
use crate::core::layout::*;
use crate::core::params::{CardRequest, Color};

pub const DEFAULT_WATERMARK: &str = "welcome-card";

const ACCENT_COLOR: Color = Color::rgb(0x58, 0x65, 0xf2);
const PLACEHOLDER_COLOR: Color = Color::rgb(0x4e, 0x50, 0x58);
const GRADIENT_DARKEN: f64 = 0.35;
const PANEL_OPACITY: f64 = 0.28;
const SUBTITLE_OPACITY: f64 = 0.82;
const WATERMARK_OPACITY: f64 = 0.45;
const WATERMARK_FONT_SIZE: u32 = 14;
const FONT_FAMILY: &str = "Inter, Noto Sans, DejaVu Sans, Arial, sans-serif";

/// Images that made it through resolution. Absent slots are simply `None`.
#[derive(Debug, Clone, Default)]
pub struct CardImages {
    pub background: Option<ResolvedImage>,
    pub avatar: Option<ResolvedImage>,
    pub server_icon: Option<ResolvedImage>,
}

/// Escape text for use in XML character data and attribute values.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            // Control characters other than tab/newline are not legal XML.
            c if c.is_control() && c != '\t' && c != '\n' => {}
            c => out.push(c),
        }
    }
    out
}

/// Build the SVG document for a card. Pure: the same inputs always give the
/// same document.
pub fn generate_svg(
    card: &CardRequest,
    images: &CardImages,
    sizes: TextSizes,
    watermark: &str,
) -> String {
    let mut svg = String::with_capacity(4096);

    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = CANVAS_WIDTH,
        h = CANVAS_HEIGHT,
    );

    let _ = write!(
        svg,
        r#"<defs><linearGradient id="bg" x1="0" y1="0" x2="1" y2="1"><stop offset="0" stop-color="{from}"/><stop offset="1" stop-color="{to}"/></linearGradient><clipPath id="avatar-clip"><circle cx="{ax}" cy="{ay}" r="{ar}"/></clipPath><clipPath id="icon-clip"><circle cx="{ix}" cy="{iy}" r="{ir}"/></clipPath></defs>"#,
        from = card.background_color,
        to = card.background_color.darken(GRADIENT_DARKEN),
        ax = AVATAR_CENTER_X,
        ay = AVATAR_CENTER_Y,
        ar = AVATAR_RADIUS,
        ix = SERVER_ICON_CENTER_X,
        iy = SERVER_ICON_CENTER_Y,
        ir = SERVER_ICON_RADIUS,
    );

    let _ = write!(
        svg,
        r#"<rect id="gradient" width="{CANVAS_WIDTH}" height="{CANVAS_HEIGHT}" fill="url(#bg)"/>"#
    );

    if let Some(background) = &images.background {
        let _ = write!(
            svg,
            r#"<image id="background" x="0" y="0" width="{CANVAS_WIDTH}" height="{CANVAS_HEIGHT}" preserveAspectRatio="xMidYMid slice" xlink:href="{}"/>"#,
            escape_xml(&background.data_uri())
        );
    }

    let _ = write!(
        svg,
        r##"<rect id="overlay" width="{CANVAS_WIDTH}" height="{CANVAS_HEIGHT}" fill="#000000" fill-opacity="{}"/>"##,
        card.overlay_opacity
    );

    let _ = write!(
        svg,
        r#"<rect id="accent" x="0" y="0" width="{ACCENT_BAR_WIDTH}" height="{CANVAS_HEIGHT}" fill="{ACCENT_COLOR}"/>"#
    );

    let _ = write!(
        svg,
        r##"<rect id="panel" x="{PANEL_INSET}" y="{PANEL_INSET}" width="{pw}" height="{ph}" rx="{PANEL_RADIUS}" fill="#000000" fill-opacity="{PANEL_OPACITY}"/>"##,
        pw = CANVAS_WIDTH - 2 * PANEL_INSET,
        ph = CANVAS_HEIGHT - 2 * PANEL_INSET,
    );

    if card.show_avatar {
        let _ = write!(
            svg,
            r#"<circle id="avatar-ring" cx="{AVATAR_CENTER_X}" cy="{AVATAR_CENTER_Y}" r="{AVATAR_RING_RADIUS}" fill="{}" fill-opacity="0.9"/>"#,
            card.text_color
        );
        match &images.avatar {
            Some(avatar) => {
                let _ = write!(
                    svg,
                    r#"<image id="avatar" x="{x}" y="{y}" width="{d}" height="{d}" preserveAspectRatio="xMidYMid slice" clip-path="url(#avatar-clip)" xlink:href="{uri}"/>"#,
                    x = AVATAR_CENTER_X - AVATAR_RADIUS,
                    y = AVATAR_CENTER_Y - AVATAR_RADIUS,
                    d = 2 * AVATAR_RADIUS,
                    uri = escape_xml(&avatar.data_uri()),
                );
            }
            None => {
                let _ = write!(
                    svg,
                    r#"<circle id="avatar-placeholder" cx="{AVATAR_CENTER_X}" cy="{AVATAR_CENTER_Y}" r="{AVATAR_RADIUS}" fill="{PLACEHOLDER_COLOR}"/>"#
                );
            }
        }
    }

    if let Some(icon) = &images.server_icon {
        let _ = write!(
            svg,
            r#"<image id="server-icon" x="{x}" y="{y}" width="{d}" height="{d}" preserveAspectRatio="xMidYMid slice" clip-path="url(#icon-clip)" xlink:href="{uri}"/>"#,
            x = SERVER_ICON_CENTER_X - SERVER_ICON_RADIUS,
            y = SERVER_ICON_CENTER_Y - SERVER_ICON_RADIUS,
            d = 2 * SERVER_ICON_RADIUS,
            uri = escape_xml(&icon.data_uri()),
        );
    }

    let _ = write!(
        svg,
        r#"<text id="title" x="{TEXT_LEFT}" y="{TITLE_BASELINE}" font-family="{FONT_FAMILY}" font-size="{size}" font-weight="700" fill="{color}">{text}</text>"#,
        size = sizes.title,
        color = card.text_color,
        text = escape_xml(&card.title),
    );

    let _ = write!(
        svg,
        r#"<text id="subtitle" x="{TEXT_LEFT}" y="{SUBTITLE_BASELINE}" font-family="{FONT_FAMILY}" font-size="{size}" fill="{color}" fill-opacity="{SUBTITLE_OPACITY}">{text}</text>"#,
        size = sizes.subtitle,
        color = card.text_color,
        text = escape_xml(&card.subtitle),
    );

    let _ = write!(
        svg,
        r#"<text id="watermark" x="{x}" y="{y}" text-anchor="end" font-family="{FONT_FAMILY}" font-size="{WATERMARK_FONT_SIZE}" fill="{color}" fill-opacity="{WATERMARK_OPACITY}">{text}</text>"#,
        x = CANVAS_WIDTH - PANEL_INSET - 16,
        y = CANVAS_HEIGHT - PANEL_INSET - 14,
        color = card.text_color,
        text = escape_xml(watermark),
    );

    svg.push_str("</svg>");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::params::{CardQuery, resolve};

    fn image() -> ResolvedImage {
        ResolvedImage {
            mime: "image/png".to_string(),
            bytes: vec![0x89, 0x50, 0x4E, 0x47],
        }
    }

    fn card(query: CardQuery) -> CardRequest {
        resolve(&query, None)
    }

    fn svg_for(card: &CardRequest, images: &CardImages) -> String {
        generate_svg(
            card,
            images,
            TextSizes::fit(&card.title, &card.subtitle),
            DEFAULT_WATERMARK,
        )
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(
            escape_xml(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &apos;Jerry&apos;&lt;/b&gt;"
        );
        assert_eq!(escape_xml("a\u{0}b\u{1b}c\td"), "abc\td");
        assert_eq!(escape_xml("Nova ✨"), "Nova ✨");
    }

    #[test]
    fn test_plain_card_layers() {
        let card = card(CardQuery::default());
        let svg = svg_for(&card, &CardImages::default());

        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains(r#"width="1200" height="420""#));
        assert!(svg.contains(r#"id="gradient""#));
        assert!(svg.contains(r#"id="accent""#));
        assert!(svg.contains(r#"id="avatar-placeholder""#));
        assert!(!svg.contains("<image"));
        assert!(!svg.contains(r#"id="server-icon""#));
        assert!(svg.contains(r##"stop-color="#1e1f22""##));
        assert!(svg.contains(r#"fill-opacity="0.35""#));
    }

    #[test]
    fn test_resolved_images_are_embedded() {
        let card = card(CardQuery::default());
        let images = CardImages {
            background: Some(image()),
            avatar: Some(image()),
            server_icon: Some(image()),
        };
        let svg = svg_for(&card, &images);

        assert!(svg.contains(r#"id="background""#));
        assert!(svg.contains(r#"id="avatar""#));
        assert!(svg.contains(r#"id="server-icon""#));
        assert!(svg.contains(r#"clip-path="url(#avatar-clip)""#));
        assert!(svg.contains("data:image/png;base64,iVBORw=="));
        assert!(!svg.contains("avatar-placeholder"));
    }

    #[test]
    fn test_hidden_avatar_draws_nothing() {
        let card = card(CardQuery {
            show_avatar: Some("false".to_string()),
            ..Default::default()
        });
        let images = CardImages {
            avatar: Some(image()),
            ..Default::default()
        };
        let svg = svg_for(&card, &images);

        assert!(!svg.contains("avatar-ring"));
        assert!(!svg.contains(r#"id="avatar""#));
        assert!(!svg.contains("avatar-placeholder"));
    }

    #[test]
    fn test_user_text_is_escaped() {
        let card = card(CardQuery {
            title: Some(r#"Hi {user}</text><script>alert(1)</script>"#.to_string()),
            username: Some("\"&'".to_string()),
            ..Default::default()
        });
        let svg = svg_for(&card, &CardImages::default());

        assert!(!svg.contains("<script>"));
        assert!(svg.contains("Hi &quot;&amp;&apos;&lt;/text&gt;&lt;script&gt;"));
    }

    #[test]
    fn test_image_href_is_escaped() {
        let card = card(CardQuery::default());
        let images = CardImages {
            avatar: Some(ResolvedImage {
                mime: r#"image/x"&<y"#.to_string(),
                bytes: vec![1, 2, 3],
            }),
            ..Default::default()
        };
        let svg = svg_for(&card, &images);

        assert!(svg.contains(r#"xlink:href="data:image/x&quot;&amp;&lt;y;base64,AQID""#));
    }

    #[test]
    fn test_overlay_opacity_is_not_rounded() {
        let card = card(CardQuery {
            overlay_opacity: Some("0.355".to_string()),
            ..Default::default()
        });
        let svg = svg_for(&card, &CardImages::default());

        assert!(svg.contains(r#"id="overlay""#));
        assert!(svg.contains(r#"fill-opacity="0.355""#));
    }

    #[test]
    fn test_title_text_and_sizes() {
        let card = card(CardQuery {
            title: Some("Welcome {user.name}".to_string()),
            username: Some("Nova".to_string()),
            ..Default::default()
        });
        let sizes = TextSizes {
            title: 31,
            subtitle: 17,
        };
        let svg = generate_svg(&card, &CardImages::default(), sizes, "cards.example");

        assert!(svg.contains(r##"font-size="31" font-weight="700" fill="#ffffff">Welcome Nova</text>"##));
        assert!(svg.contains(r#"font-size="17""#));
        assert!(svg.contains(">cards.example</text>"));
    }
}
