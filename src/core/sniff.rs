//! Content sniffing for fetched image bodies.
//!
//! Upstream hosts frequently mislabel images or hand back an HTML error page
//! with a 200 status, so the declared type is only trusted when it names an
//! image and the body does not look like markup.

/// A byte signature and the media type it identifies. `None` in the pattern
/// matches any byte.
struct Signature {
    pattern: &'static [Option<u8>],
    mime: &'static str,
}

macro_rules! sig {
    (@byte _) => { None };
    (@byte $b:literal) => { Some($b) };
    ($($b:tt),* $(,)?) => {
        &[$(sig!(@byte $b)),*]
    };
}

/// Checked in order; the first match wins.
const SIGNATURES: &[Signature] = &[
    Signature {
        pattern: sig![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A],
        mime: "image/png",
    },
    Signature {
        pattern: sig![0xFF, 0xD8, 0xFF],
        mime: "image/jpeg",
    },
    Signature {
        pattern: sig![0x47, 0x49, 0x46, 0x38],
        mime: "image/gif",
    },
    Signature {
        // RIFF....WEBP
        pattern: sig![0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50],
        mime: "image/webp",
    },
];

const HTML_MARKERS: &[&[u8]] = &[b"<!doctype html", b"<html", b"<head", b"<body"];

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Identify an image format from its leading bytes.
pub fn sniff_image(bytes: &[u8]) -> Option<&'static str> {
    SIGNATURES
        .iter()
        .find(|sig| matches_prefix(bytes, sig.pattern))
        .map(|sig| sig.mime)
}

fn matches_prefix(bytes: &[u8], pattern: &[Option<u8>]) -> bool {
    bytes.len() >= pattern.len()
        && pattern
            .iter()
            .zip(bytes)
            .all(|(expected, actual)| expected.is_none_or(|b| b == *actual))
}

/// True when the body starts like an HTML document.
pub fn looks_like_html(bytes: &[u8]) -> bool {
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let start = body
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(body.len());
    let body = &body[start..];

    HTML_MARKERS.iter().any(|marker| {
        body.len() >= marker.len() && body[..marker.len()].eq_ignore_ascii_case(marker)
    })
}

/// Normalize a declared `Content-Type` to its media type when it names an
/// image, e.g. `Image/PNG; charset=binary` becomes `image/png`. Subtypes other
/// than a plain `[a-z0-9.+-]` token are not trusted.
pub fn declared_image_type(content_type: Option<&str>) -> Option<String> {
    let essence = content_type?.split(';').next()?.trim().to_ascii_lowercase();
    match essence.strip_prefix("image/") {
        Some(subtype) if is_subtype_token(subtype) => Some(essence),
        _ => None,
    }
}

fn is_subtype_token(subtype: &str) -> bool {
    !subtype.is_empty()
        && subtype
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'.' | b'+' | b'-'))
}

/// Pick the media type to render a body with, or `None` when it must not be
/// rendered at all.
pub fn confirm_media_type(bytes: &[u8], content_type: Option<&str>) -> Option<String> {
    if bytes.is_empty() || looks_like_html(bytes) {
        return None;
    }
    declared_image_type(content_type).or_else(|| sniff_image(bytes).map(str::to_string))
}
