//! Merging of request parameters, stored guild defaults and built-in
//! constants into one fully populated [`CardRequest`].

use std::fmt;

use crate::core::store::GuildDefaults;

pub const DEFAULT_BACKGROUND_COLOR: Color = Color::rgb(0x1e, 0x1f, 0x22);
pub const DEFAULT_TEXT_COLOR: Color = Color::rgb(0xff, 0xff, 0xff);
pub const DEFAULT_TITLE: &str = "Welcome {user.name}!";
pub const DEFAULT_SUBTITLE: &str = "You are member #{membercount} of {server.name}";
pub const DEFAULT_USERNAME: &str = "New Member";
pub const DEFAULT_SERVER_NAME: &str = "the server";
pub const DEFAULT_MEMBER_COUNT: &str = "0";

pub const OVERLAY_OPACITY_MIN: f64 = 0.0;
pub const OVERLAY_OPACITY_MAX: f64 = 0.85;
pub const DEFAULT_OVERLAY_OPACITY: f64 = 0.35;

pub const TITLE_MAX_CHARS: usize = 60;
pub const SUBTITLE_MAX_CHARS: usize = 90;
pub const USERNAME_MAX_CHARS: usize = 32;
pub const SERVER_NAME_MAX_CHARS: usize = 64;
pub const MEMBER_COUNT_MAX_CHARS: usize = 12;

pub const ELLIPSIS: char = '…';

const USER_TOKENS: &[&str] = &["{user}", "{user.name}", "{username}"];
const SERVER_TOKENS: &[&str] = &[
    "{server}",
    "{server.name}",
    "{servername}",
    "{guild}",
    "{guild.name}",
];
const MEMBER_COUNT_TOKENS: &[&str] = &[
    "{membercount}",
    "{memberCount}",
    "{server.memberCount}",
    "{server.membercount}",
    "{guild.memberCount}",
];

/// Raw card parameters as they arrive on the query string.
#[derive(Debug, Clone, Default)]
pub struct CardQuery {
    pub background_url: Option<String>,
    pub background_image_url: Option<String>,
    pub background: Option<String>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub background_color: Option<String>,
    pub text_color: Option<String>,
    pub overlay_opacity: Option<String>,
    pub show_avatar: Option<String>,
    pub username: Option<String>,
    pub server_name: Option<String>,
    pub membercount: Option<String>,
    pub member_count: Option<String>,
    pub avatar_url: Option<String>,
    pub server_icon_url: Option<String>,
}

/// An opaque sRGB color, always rendered as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rgb` or `#rrggbb`, with or without the leading `#`.
    pub fn parse(value: &str) -> Option<Self> {
        let hex = value.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }

        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            3 => {
                let mut digits = hex.chars().map(|c| c.to_string().repeat(2));
                Some(Self::rgb(
                    channel(&digits.next()?)?,
                    channel(&digits.next()?)?,
                    channel(&digits.next()?)?,
                ))
            }
            6 => Some(Self::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            _ => None,
        }
    }

    /// Scale every channel towards black by `amount` (0..=1).
    pub fn darken(self, amount: f64) -> Self {
        let keep = (1.0 - amount).clamp(0.0, 1.0);
        let scale = |c: u8| (f64::from(c) * keep).round() as u8;
        Self::rgb(scale(self.r), scale(self.g), scale(self.b))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Fully resolved parameters for one card. Text fields are already
/// substituted and truncated.
#[derive(Debug, Clone, PartialEq)]
pub struct CardRequest {
    pub background_source: Option<String>,
    pub background_color: Color,
    pub text_color: Color,
    pub overlay_opacity: f64,
    pub title: String,
    pub subtitle: String,
    pub show_avatar: bool,
    pub avatar_source: Option<String>,
    pub server_icon_source: Option<String>,
    pub username: String,
    pub server_name: String,
    pub member_count: String,
}

/// Merge `query` over `stored` over the built-in defaults.
pub fn resolve(query: &CardQuery, stored: Option<&GuildDefaults>) -> CardRequest {
    let empty = GuildDefaults::default();
    let stored = stored.unwrap_or(&empty);

    let username = first_text(&[&query.username, &stored.username])
        .map(|v| truncate(v, USERNAME_MAX_CHARS))
        .unwrap_or_else(|| DEFAULT_USERNAME.to_string());
    let server_name = first_text(&[&query.server_name, &stored.server_name])
        .map(|v| truncate(v, SERVER_NAME_MAX_CHARS))
        .unwrap_or_else(|| DEFAULT_SERVER_NAME.to_string());
    let member_count = first_text(&[&query.membercount, &query.member_count, &stored.member_count])
        .map(|v| truncate(v, MEMBER_COUNT_MAX_CHARS))
        .unwrap_or_else(|| DEFAULT_MEMBER_COUNT.to_string());

    let tokens = Tokens {
        username: &username,
        server_name: &server_name,
        member_count: &member_count,
    };

    let title_template = first_text(&[&query.title, &stored.title]).unwrap_or(DEFAULT_TITLE);
    let subtitle_template =
        first_text(&[&query.subtitle, &stored.subtitle]).unwrap_or(DEFAULT_SUBTITLE);

    CardRequest {
        background_source: first_text(&[
            &query.background_url,
            &query.background_image_url,
            &query.background,
            &stored.background_url,
        ])
        .map(str::to_string),
        background_color: first_color(&[&query.background_color, &stored.background_color])
            .unwrap_or(DEFAULT_BACKGROUND_COLOR),
        text_color: first_color(&[&query.text_color, &stored.text_color])
            .unwrap_or(DEFAULT_TEXT_COLOR),
        overlay_opacity: resolve_opacity(query.overlay_opacity.as_deref(), stored.overlay_opacity),
        title: render_text(title_template, &tokens, TITLE_MAX_CHARS),
        subtitle: render_text(subtitle_template, &tokens, SUBTITLE_MAX_CHARS),
        show_avatar: non_empty(&query.show_avatar)
            .and_then(parse_flag)
            .or(stored.show_avatar)
            .unwrap_or(true),
        avatar_source: first_text(&[&query.avatar_url, &stored.avatar_url]).map(str::to_string),
        server_icon_source: first_text(&[&query.server_icon_url, &stored.server_icon_url])
            .map(str::to_string),
        username,
        server_name,
        member_count,
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn first_text<'a>(layers: &[&'a Option<String>]) -> Option<&'a str> {
    layers.iter().find_map(|layer| non_empty(*layer))
}

fn first_color(layers: &[&Option<String>]) -> Option<Color> {
    layers
        .iter()
        .find_map(|layer| non_empty(*layer).and_then(Color::parse))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// The first supplied layer wins. A request value that is not a finite
/// number counts as the minimum.
fn resolve_opacity(requested: Option<&str>, stored: Option<f64>) -> f64 {
    let raw = match requested.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => value.parse::<f64>().unwrap_or(OVERLAY_OPACITY_MIN),
        None => stored.unwrap_or(DEFAULT_OVERLAY_OPACITY),
    };
    clamp_opacity(raw)
}

pub fn clamp_opacity(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(OVERLAY_OPACITY_MIN, OVERLAY_OPACITY_MAX)
    } else {
        OVERLAY_OPACITY_MIN
    }
}

/// Values substituted into title and subtitle templates.
pub struct Tokens<'a> {
    pub username: &'a str,
    pub server_name: &'a str,
    pub member_count: &'a str,
}

/// Replace every recognized placeholder in `template`. Unknown `{...}`
/// sequences are left alone.
pub fn substitute(template: &str, tokens: &Tokens<'_>) -> String {
    let groups = [
        (USER_TOKENS, tokens.username),
        (SERVER_TOKENS, tokens.server_name),
        (MEMBER_COUNT_TOKENS, tokens.member_count),
    ];

    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    'scan: while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let candidate = &rest[open..];
        for (names, value) in groups {
            if let Some(name) = names.iter().find(|name| candidate.starts_with(**name)) {
                out.push_str(value);
                rest = &candidate[name.len()..];
                continue 'scan;
            }
        }
        out.push('{');
        rest = &candidate[1..];
    }
    out.push_str(rest);
    out
}

/// Cut `text` to at most `max_chars` characters, ending with [`ELLIPSIS`]
/// when anything was dropped.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(max_chars - 1).collect();
    out.push(ELLIPSIS);
    out
}

pub fn render_text(template: &str, tokens: &Tokens<'_>, max_chars: usize) -> String {
    truncate(&substitute(template, tokens), max_chars)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> CardQuery {
        CardQuery::default()
    }

    fn some(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    #[test]
    fn test_defaults_when_nothing_is_supplied() {
        let card = resolve(&query(), None);

        assert_eq!(card.background_source, None);
        assert_eq!(card.background_color, DEFAULT_BACKGROUND_COLOR);
        assert_eq!(card.text_color, DEFAULT_TEXT_COLOR);
        assert_eq!(card.overlay_opacity, DEFAULT_OVERLAY_OPACITY);
        assert_eq!(card.title, "Welcome New Member!");
        assert_eq!(card.subtitle, "You are member #0 of the server");
        assert!(card.show_avatar);
        assert_eq!(card.avatar_source, None);
        assert_eq!(card.server_icon_source, None);
    }

    #[test]
    fn test_request_overrides_stored_overrides_constants() {
        let stored = GuildDefaults {
            title: some("Stored {user}"),
            subtitle: some("Stored subtitle"),
            text_color: some("#abcdef"),
            background_url: some("https://cdn.example/stored.png"),
            overlay_opacity: Some(0.6),
            show_avatar: Some(false),
            ..Default::default()
        };
        let q = CardQuery {
            title: some("Welcome {user.name}"),
            username: some("Nova"),
            ..query()
        };

        let card = resolve(&q, Some(&stored));

        assert_eq!(card.title, "Welcome Nova");
        assert_eq!(card.subtitle, "Stored subtitle");
        assert_eq!(card.text_color, Color::rgb(0xab, 0xcd, 0xef));
        assert_eq!(card.background_color, DEFAULT_BACKGROUND_COLOR);
        assert_eq!(card.background_source.as_deref(), Some("https://cdn.example/stored.png"));
        assert_eq!(card.overlay_opacity, 0.6);
        assert!(!card.show_avatar);
    }

    #[test]
    fn test_blank_request_values_fall_through() {
        let stored = GuildDefaults {
            title: some("Stored"),
            ..Default::default()
        };
        let q = CardQuery {
            title: some("   "),
            username: some(""),
            ..query()
        };

        let card = resolve(&q, Some(&stored));
        assert_eq!(card.title, "Stored");
        assert_eq!(card.username, DEFAULT_USERNAME);
    }

    #[test]
    fn test_background_alias_precedence() {
        let q = CardQuery {
            background_image_url: some("/assets/b.png"),
            background: some("/assets/c.png"),
            ..query()
        };
        assert_eq!(resolve(&q, None).background_source.as_deref(), Some("/assets/b.png"));

        let q = CardQuery {
            background_url: some("/assets/a.png"),
            ..q
        };
        assert_eq!(resolve(&q, None).background_source.as_deref(), Some("/assets/a.png"));
    }

    #[test]
    fn test_member_count_alias_precedence() {
        let q = CardQuery {
            membercount: some("1204"),
            member_count: some("9"),
            ..query()
        };
        assert_eq!(resolve(&q, None).member_count, "1204");

        let q = CardQuery {
            membercount: None,
            ..q
        };
        assert_eq!(resolve(&q, None).member_count, "9");
    }

    #[test]
    fn test_invalid_colors_fall_back() {
        let stored = GuildDefaults {
            background_color: some("#102030"),
            ..Default::default()
        };
        let q = CardQuery {
            background_color: some("red\"/><script>"),
            text_color: some("#12"),
            ..query()
        };

        let card = resolve(&q, Some(&stored));
        assert_eq!(card.background_color, Color::rgb(0x10, 0x20, 0x30));
        assert_eq!(card.text_color, DEFAULT_TEXT_COLOR);
    }

    #[test]
    fn test_color_parse() {
        assert_eq!(Color::parse("#fff"), Some(Color::rgb(255, 255, 255)));
        assert_eq!(Color::parse("5865F2"), Some(Color::rgb(0x58, 0x65, 0xf2)));
        assert_eq!(Color::parse(" #1e1f22 "), Some(Color::rgb(0x1e, 0x1f, 0x22)));
        assert_eq!(Color::parse("#ggg"), None);
        assert_eq!(Color::parse("#1234"), None);
        assert_eq!(Color::parse("blue"), None);
        assert_eq!(Color::parse("#éé"), None);
        assert_eq!(Color::rgb(0x58, 0x65, 0xf2).to_string(), "#5865f2");
    }

    #[test]
    fn test_darken() {
        assert_eq!(Color::rgb(200, 100, 0).darken(0.5), Color::rgb(100, 50, 0));
        assert_eq!(Color::rgb(200, 100, 0).darken(2.0), Color::rgb(0, 0, 0));
    }

    #[test]
    fn test_opacity_is_clamped() {
        let opacity = |value: &str| {
            let q = CardQuery {
                overlay_opacity: some(value),
                ..query()
            };
            resolve(&q, None).overlay_opacity
        };

        assert_eq!(opacity("0.4"), 0.4);
        assert_eq!(opacity("-1"), 0.0);
        assert_eq!(opacity("0.9"), 0.85);
        assert_eq!(opacity("12"), 0.85);
        assert_eq!(opacity("abc"), 0.0);
        assert_eq!(opacity("NaN"), 0.0);
        assert_eq!(opacity("inf"), 0.0);
    }

    #[test]
    fn test_stored_opacity_is_clamped() {
        let stored = GuildDefaults {
            overlay_opacity: Some(3.0),
            ..Default::default()
        };
        assert_eq!(resolve(&query(), Some(&stored)).overlay_opacity, 0.85);
    }

    #[test]
    fn test_show_avatar_parsing() {
        let flag = |value: &str, stored: Option<bool>| {
            let q = CardQuery {
                show_avatar: some(value),
                ..query()
            };
            let stored = GuildDefaults {
                show_avatar: stored,
                ..Default::default()
            };
            resolve(&q, Some(&stored)).show_avatar
        };

        assert!(!flag("false", None));
        assert!(!flag("0", Some(true)));
        assert!(flag("YES", Some(false)));
        assert!(!flag("maybe", Some(false)));
        assert!(flag("maybe", None));
    }

    #[test]
    fn test_substitute_all_token_families() {
        let tokens = Tokens {
            username: "Nova",
            server_name: "Orbit",
            member_count: "1,204",
        };

        assert_eq!(
            substitute("{user} joined {server.name} as #{memberCount}", &tokens),
            "Nova joined Orbit as #1,204"
        );
        assert_eq!(substitute("{username}@{guild}", &tokens), "Nova@Orbit");
        assert_eq!(substitute("{unknown} {user.name", &tokens), "{unknown} {user.name");
        assert_eq!(substitute("{{user}}", &tokens), "{Nova}");
    }

    #[test]
    fn test_substituted_values_are_not_rescanned() {
        let tokens = Tokens {
            username: "{server}",
            server_name: "Orbit",
            member_count: "1",
        };
        assert_eq!(substitute("Hi {user}", &tokens), "Hi {server}");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly10!", 10), "exactly10!");

        let cut = truncate("this is far too long", 10);
        assert_eq!(cut.chars().count(), 10);
        assert_eq!(cut, "this is f…");

        assert_eq!(truncate("ééééé", 3), "éé…");
        assert_eq!(truncate("abc", 0), "");
    }

    #[test]
    fn test_truncation_happens_after_substitution() {
        let q = CardQuery {
            title: some("Welcome {user}"),
            username: some(&"n".repeat(30)),
            ..query()
        };
        let card = resolve(&q, None);
        assert_eq!(card.title, format!("Welcome {}", "n".repeat(30)));

        let q = CardQuery {
            title: some("{user}{user}{user}"),
            ..q
        };
        let card = resolve(&q, None);
        assert_eq!(card.title.chars().count(), TITLE_MAX_CHARS);
        assert!(card.title.ends_with(ELLIPSIS));
    }

    #[test]
    fn test_long_text_is_cut_to_cap() {
        let q = CardQuery {
            title: some(&"t".repeat(200)),
            subtitle: some(&"s".repeat(200)),
            username: some(&"u".repeat(200)),
            ..query()
        };
        let card = resolve(&q, None);

        assert_eq!(card.title.chars().count(), TITLE_MAX_CHARS);
        assert_eq!(card.subtitle.chars().count(), SUBTITLE_MAX_CHARS);
        assert_eq!(card.username.chars().count(), USERNAME_MAX_CHARS);
        assert_eq!(card.title.chars().last(), Some(ELLIPSIS));
    }
}
