use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::DisplayMode;

use super::{
    scan::tag_extent,
    style::{BLOCK_CLASS, INLINE_CLASS},
};

const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";
const RASTER_FALLBACK_ALT: &str = "math";

static CLASS_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\sclass\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("class attribute pattern")
});
static XMLNS_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\sxmlns\s*=").expect("xmlns attribute pattern"));
static ROLE_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\srole\s*=").expect("role attribute pattern"));
static ARIA_LABEL_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\saria-label\s*=").expect("aria-label attribute pattern"));

pub(crate) fn semantic_class(display: DisplayMode) -> &'static str {
    if display.is_block() {
        BLOCK_CLASS
    } else {
        INLINE_CLASS
    }
}

/// Decorate the root `<svg>` tag of validated renderer output.
///
/// The semantic class is merged into any existing `class` list, `xmlns` is
/// added when absent, and when alternative text exists the element gains
/// `role="img"` and an `aria-label` unless the renderer already set them.
pub(crate) fn wrap_vector(svg: &str, display: DisplayMode, alt_text: Option<&str>) -> String {
    let Some(tag_len) = tag_extent(svg) else {
        return svg.to_string();
    };
    let (tag, body) = svg.split_at(tag_len);
    let class = semantic_class(display);

    let mut tag = match CLASS_ATTR.captures(tag) {
        Some(captures) => {
            let value = captures
                .get(1)
                .or_else(|| captures.get(2))
                .map_or("", |value| value.as_str());
            let whole = captures.get(0).map_or(0..0, |whole| whole.range());
            let merged = merge_class(value, display);
            format!(
                "{} class=\"{}\"{}",
                &tag[..whole.start],
                escape_attribute(&merged),
                &tag[whole.end..]
            )
        }
        None => format!("{} class=\"{class}\"{}", &tag[..4], &tag[4..]),
    };

    let mut extra = String::new();
    if !XMLNS_ATTR.is_match(&tag) {
        extra.push_str(&format!(" xmlns=\"{SVG_NAMESPACE}\""));
    }
    if let Some(alt) = alt_text {
        if !ROLE_ATTR.is_match(&tag) {
            extra.push_str(" role=\"img\"");
        }
        if !ARIA_LABEL_ATTR.is_match(&tag) {
            extra.push_str(&format!(" aria-label=\"{}\"", escape_attribute(alt)));
        }
    }
    tag.insert_str(4, &extra);

    let mut out = String::with_capacity(tag.len() + body.len());
    out.push_str(&tag);
    out.push_str(body);
    out
}

/// Embed a base64 PNG payload as an `<img>` element.
pub(crate) fn wrap_raster(payload: &str, display: DisplayMode, alt_text: Option<&str>) -> String {
    let alt = alt_text.unwrap_or(RASTER_FALLBACK_ALT);
    let mut html = String::with_capacity(payload.len() + alt.len() + 96);
    html.push_str("<img class=\"");
    html.push_str(semantic_class(display));
    html.push_str("\" src=\"data:image/png;base64,");
    html.push_str(payload);
    html.push_str("\" alt=\"");
    html.push_str(&escape_attribute(alt));
    html.push_str("\" />");
    html
}

/// Existing class tokens plus the semantic class for `display`, with the
/// opposite variant removed.
fn merge_class(existing: &str, display: DisplayMode) -> String {
    let wanted = semantic_class(display);
    let opposite = semantic_class(if display.is_block() {
        DisplayMode::Inline
    } else {
        DisplayMode::Block
    });

    let mut tokens: Vec<&str> = existing
        .split_whitespace()
        .filter(|token| *token != opposite)
        .collect();
    if !tokens.contains(&wanted) {
        tokens.push(wanted);
    }
    tokens.join(" ")
}

pub(crate) fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\n' | '\r' | '\t' => escaped.push(' '),
            _ => escaped.push(ch),
        }
    }
    escaped
}
