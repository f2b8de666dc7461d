//! Locates `<math>` elements in XHTML text.
//!
//! The scan walks tag openings one `<` at a time instead of matching a single
//! pattern over the whole document: comments and CDATA sections are skipped,
//! quoted attribute values may contain `>`, and nested elements with the same
//! qualified name are balanced so the outermost element is returned whole.

use html_escape::decode_html_entities;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::{DisplayMode, MathNode};

static MATH_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^<((?:[A-Za-z_][\w.-]*:)?math)(?:[\s/>]|$)").expect("math start tag pattern")
});

static DISPLAY_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\sdisplay\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("display attribute pattern")
});

static ANNOTATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)<(?:[A-Za-z_][\w.-]*:)?annotation(\s[^>]*)?>(.*?)</(?:[A-Za-z_][\w.-]*:)?annotation\s*>",
    )
    .expect("annotation pattern")
});

static TEX_ENCODING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\sencoding\s*=\s*["']application/x-tex["']"#).expect("encoding pattern")
});

static MARKUP_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag pattern"));

/// Every math node in `document`, non-overlapping and in document order.
pub fn scan_math_nodes(document: &str) -> Vec<MathNode> {
    let mut nodes = Vec::new();
    let mut cursor = 0;

    while let Some(offset) = document[cursor..].find('<') {
        let start = cursor + offset;
        let rest = &document[start..];

        if let Some(skip) = skip_opaque(rest) {
            cursor = start + skip;
            continue;
        }

        let Some(captures) = MATH_START.captures(rest) else {
            cursor = start + 1;
            continue;
        };
        let name = &captures[1];
        let Some(tag_len) = tag_extent(rest) else {
            break;
        };
        let start_tag = &rest[..tag_len];
        if start_tag.ends_with("/>") {
            cursor = start + tag_len;
            continue;
        }

        match find_element_end(document, name, start + tag_len) {
            Some(end) => {
                nodes.push(build_node(document, start, end, start_tag));
                cursor = end;
            }
            None => cursor = start + tag_len,
        }
    }

    nodes
}

fn build_node(document: &str, start: usize, end: usize, start_tag: &str) -> MathNode {
    let markup = &document[start..end];
    MathNode {
        span: start..end,
        markup: markup.to_string(),
        display: DisplayMode::from_attribute(display_attribute(start_tag)),
        alt_text: tex_alt_text(markup),
    }
}

fn display_attribute(start_tag: &str) -> Option<&str> {
    DISPLAY_ATTR.captures(start_tag).and_then(|captures| {
        captures
            .get(1)
            .or_else(|| captures.get(2))
            .map(|value| value.as_str())
    })
}

/// Plain-text TeX source from the first `application/x-tex` annotation.
pub(crate) fn tex_alt_text(markup: &str) -> Option<String> {
    let body = ANNOTATION.captures_iter(markup).find_map(|captures| {
        let attrs = captures.get(1).map_or("", |attrs| attrs.as_str());
        TEX_ENCODING
            .is_match(attrs)
            .then(|| captures.get(2).map_or("", |body| body.as_str()))
    })?;

    let stripped = MARKUP_TAG.replace_all(body, "");
    let decoded = decode_html_entities(&stripped);
    let collapsed = decoded.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

/// Byte index just past the end tag matching an element named `name` whose
/// content starts at `from`.
fn find_element_end(document: &str, name: &str, from: usize) -> Option<usize> {
    let mut depth = 1_usize;
    let mut cursor = from;

    while let Some(offset) = document[cursor..].find('<') {
        let start = cursor + offset;
        let rest = &document[start..];

        if let Some(skip) = skip_opaque(rest) {
            cursor = start + skip;
            continue;
        }

        if let Some(after) = rest.strip_prefix("</").and_then(|r| r.strip_prefix(name))
            && after.starts_with(|c: char| c == '>' || c.is_whitespace())
        {
            let close_len = rest.find('>')? + 1;
            depth -= 1;
            cursor = start + close_len;
            if depth == 0 {
                return Some(cursor);
            }
            continue;
        }

        if let Some(after) = rest.strip_prefix('<').and_then(|r| r.strip_prefix(name))
            && after.starts_with(|c: char| c == '>' || c == '/' || c.is_whitespace())
        {
            let tag_len = tag_extent(rest)?;
            if !rest[..tag_len].ends_with("/>") {
                depth += 1;
            }
            cursor = start + tag_len;
            continue;
        }

        cursor = start + 1;
    }

    None
}

/// Length of a comment, CDATA section or processing instruction at the
/// start of `rest`, or of the remaining text when it is unterminated.
fn skip_opaque(rest: &str) -> Option<usize> {
    let terminator = if rest.starts_with("<!--") {
        "-->"
    } else if rest.starts_with("<![CDATA[") {
        "]]>"
    } else if rest.starts_with("<?") {
        "?>"
    } else {
        return None;
    };
    Some(
        rest[2..]
            .find(terminator)
            .map_or(rest.len(), |end| 2 + end + terminator.len()),
    )
}

/// Length of the tag starting at `rest[0] == '<'`, honouring quoted
/// attribute values.
pub(crate) fn tag_extent(rest: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (index, ch) in rest.char_indices().skip(1) {
        match (quote, ch) {
            (Some(open), c) if c == open => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '>') => return Some(index + 1),
            (None, _) => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_nodes_in_order_with_spans() {
        let doc = "<p>a <math><mi>x</mi></math> b <math display=\"block\"><mn>2</mn></math></p>";
        let nodes = scan_math_nodes(doc);

        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].markup, "<math><mi>x</mi></math>");
        assert_eq!(&doc[nodes[0].span.clone()], nodes[0].markup);
        assert_eq!(nodes[0].display, DisplayMode::Inline);
        assert_eq!(nodes[1].markup, "<math display=\"block\"><mn>2</mn></math>");
        assert_eq!(nodes[1].display, DisplayMode::Block);
    }

    #[test]
    fn no_math_yields_nothing() {
        assert!(scan_math_nodes("<html><body><p>mathematics</p></body></html>").is_empty());
        assert!(scan_math_nodes("<mathx>1</mathx>").is_empty());
    }

    #[test]
    fn tolerates_attributes_with_angle_brackets_and_single_quotes() {
        let doc = "<math alttext='a > b' display='block'><mi>a</mi></math>";
        let nodes = scan_math_nodes(doc);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].markup, doc);
        assert_eq!(nodes[0].display, DisplayMode::Block);
    }

    #[test]
    fn data_display_is_not_display() {
        let nodes = scan_math_nodes("<math data-display=\"block\"><mi>x</mi></math>");
        assert_eq!(nodes[0].display, DisplayMode::Inline);
    }

    #[test]
    fn namespace_prefixed_elements_are_matched() {
        let doc = "<m:math display=\"block\"><m:mi>y</m:mi></m:math>";
        let nodes = scan_math_nodes(doc);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].markup, doc);
    }

    #[test]
    fn nested_math_inside_annotation_stays_in_outer_node() {
        let doc = concat!(
            "<math><semantics><mi>x</mi>",
            "<annotation-xml encoding=\"MathML-Content\"><math><ci>x</ci></math></annotation-xml>",
            "</semantics></math><p>after</p>"
        );
        let nodes = scan_math_nodes(doc);
        assert_eq!(nodes.len(), 1);
        assert!(nodes[0].markup.ends_with("</semantics></math>"));
    }

    #[test]
    fn escaped_math_text_is_not_markup() {
        let doc = concat!(
            "<math><semantics><mi>x</mi>",
            "<annotation encoding=\"application/x-tex\">\\text{&lt;math&gt;} x</annotation>",
            "</semantics></math>"
        );
        let nodes = scan_math_nodes(doc);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].markup, doc);
        assert_eq!(nodes[0].alt_text.as_deref(), Some("\\text{<math>} x"));
    }

    #[test]
    fn comments_and_self_closing_tags_are_skipped() {
        let doc = "<!-- <math><mi>c</mi></math> --><math/><math><mi>z</mi></math>";
        let nodes = scan_math_nodes(doc);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].markup, "<math><mi>z</mi></math>");
    }

    #[test]
    fn unterminated_node_is_ignored() {
        assert!(scan_math_nodes("<p><math><mi>x</mi></p>").is_empty());
    }

    #[test]
    fn alt_text_is_stripped_collapsed_and_trimmed() {
        let markup = concat!(
            "<math><semantics><mrow/>",
            "<annotation encoding=\"application/x-tex\">\n  x^2 <b>+</b>\n   y  </annotation>",
            "</semantics></math>"
        );
        assert_eq!(tex_alt_text(markup).as_deref(), Some("x^2 + y"));
    }

    #[test]
    fn empty_or_foreign_annotations_give_no_alt_text() {
        assert_eq!(
            tex_alt_text("<math><annotation encoding=\"application/x-tex\">  </annotation></math>"),
            None
        );
        assert_eq!(
            tex_alt_text("<math><annotation encoding=\"text/plain\">x</annotation></math>"),
            None
        );
        assert_eq!(tex_alt_text("<math><mi>x</mi></math>"), None);
    }

    #[test]
    fn picks_tex_annotation_among_several() {
        let markup = concat!(
            "<math><semantics><mi>x</mi>",
            "<annotation encoding=\"text/plain\">plain</annotation>",
            "<annotation encoding='application/x-tex'>x</annotation>",
            "</semantics></math>"
        );
        assert_eq!(tex_alt_text(markup).as_deref(), Some("x"));
    }
}
