//! Rich-text block handling.
//!
//! The internal catalog stores descriptions as a list of typed blocks. The
//! external platform wants plain text (attribute term descriptions) or HTML
//! (product descriptions), so both flattening and re-expansion live here.

use serde::{Deserialize, Serialize};

/// A single rich-text block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichBlock {
    /// Block type; only paragraphs are produced by re-expansion.
    #[serde(rename = "type")]
    pub block_type: String,
    /// Plain text content of the block.
    pub text: String,
}

impl RichBlock {
    /// Create a paragraph block.
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            block_type: "paragraph".to_string(),
            text: text.into(),
        }
    }
}

/// Flatten rich-text blocks to plain text, one block per paragraph.
#[must_use]
pub fn to_plain_text(blocks: &[RichBlock]) -> String {
    blocks
        .iter()
        .map(|b| b.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Re-expand plain text into paragraph blocks, splitting on blank lines.
#[must_use]
pub fn from_plain_text(text: &str) -> Vec<RichBlock> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(RichBlock::paragraph)
        .collect()
}

/// Strip HTML tags from a fragment, collapsing to plain text.
///
/// `<br>` and closing `</p>` tags become newlines so that paragraph structure
/// survives the round trip through [`from_plain_text`]. Entities for the
/// usual suspects are decoded.
#[must_use]
pub fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut chars = html.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '<' {
            let mut tag = String::new();
            for t in chars.by_ref() {
                if t == '>' {
                    break;
                }
                tag.push(t);
            }
            let tag = tag.trim().to_lowercase();
            if tag.starts_with("br") {
                out.push('\n');
            } else if tag == "/p" || tag == "/div" {
                out.push_str("\n\n");
            }
        } else {
            out.push(c);
        }
    }

    let decoded = out
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");

    // Collapse runs of 3+ newlines left behind by nested block tags.
    let mut collapsed = String::with_capacity(decoded.len());
    let mut newlines = 0usize;
    for c in decoded.chars() {
        if c == '\n' {
            newlines += 1;
            if newlines <= 2 {
                collapsed.push(c);
            }
        } else {
            newlines = 0;
            collapsed.push(c);
        }
    }

    collapsed.trim().to_string()
}

/// Strip HTML and expand into rich-text blocks in one step.
#[must_use]
pub fn blocks_from_html(html: &str) -> Vec<RichBlock> {
    from_plain_text(&strip_html(html))
}
