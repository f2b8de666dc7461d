use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

/// Class applied to inline math output.
pub const INLINE_CLASS: &str = "epubmath-inline";
/// Class applied to display (block) math output.
pub const BLOCK_CLASS: &str = "epubmath-block";

const STYLE_BLOCK: &str = concat!(
    "<style type=\"text/css\">\n",
    ".epubmath-inline { display: inline-block; vertical-align: middle; max-width: 100%; height: auto; }\n",
    ".epubmath-block { display: block; margin: 1em auto; max-width: 100%; height: auto; }\n",
    "</style>\n"
);

static HEAD_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<head(?:\s[^>]*)?>").expect("head open pattern"));
static HEAD_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</head\s*>").expect("head close pattern"));

/// Insert the math style rules just before `</head>`.
///
/// Leaves the document untouched when the head already carries rules for
/// both classes or when there is no closing head tag, so repeated calls
/// never stack style blocks.
pub fn inject_styles(document: &str) -> Cow<'_, str> {
    let Some(close) = HEAD_CLOSE.find(document) else {
        return Cow::Borrowed(document);
    };

    let head_start = HEAD_OPEN
        .find(&document[..close.start()])
        .map_or(0, |open| open.end());
    let head = &document[head_start..close.start()];
    if head.contains(&format!(".{INLINE_CLASS}")) && head.contains(&format!(".{BLOCK_CLASS}")) {
        return Cow::Borrowed(document);
    }

    let mut out = String::with_capacity(document.len() + STYLE_BLOCK.len());
    out.push_str(&document[..close.start()]);
    out.push_str(STYLE_BLOCK);
    out.push_str(&document[close.start()..]);
    Cow::Owned(out)
}
