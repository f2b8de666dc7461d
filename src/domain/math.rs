use std::{fmt, ops::Range, str::FromStr};

/// Whether a math node renders as a block-level or inline element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    #[default]
    Inline,
    Block,
}

impl DisplayMode {
    /// Resolve the mode from the raw `display` attribute value. Only `block`
    /// selects block rendering; anything else, including absence, is inline.
    pub fn from_attribute(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("block") => Self::Block,
            _ => Self::Inline,
        }
    }

    pub fn is_block(self) -> bool {
        matches!(self, Self::Block)
    }
}

/// Target representation for converted math.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Inline `<svg>` markup.
    #[default]
    Vector,
    /// `<img>` carrying a base64 PNG data URI.
    Raster,
}

impl OutputMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vector => "vector",
            Self::Raster => "raster",
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "vector" | "svg" => Ok(Self::Vector),
            "raster" | "png" => Ok(Self::Raster),
            other => Err(format!("unknown output mode `{other}` (expected vector|raster)")),
        }
    }
}

/// One `<math>` element located inside a document.
///
/// `span` indexes into the document text the node was scanned from and
/// `markup` is the exact slice at that span, start and end tag included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathNode {
    pub span: Range<usize>,
    pub markup: String,
    pub display: DisplayMode,
    pub alt_text: Option<String>,
}
