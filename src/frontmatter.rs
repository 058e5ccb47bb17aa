//! Front-matter detection, stripping, and decoding.
//!
//! A content file may open with a YAML block fenced by lines that are exactly
//! `---`:
//!
//! ```text
//! ---
//! title: Hello
//! tags: [rust, web]
//! ---
//! # Body starts here
//! ```
//!
//! The block decodes into a [`Metadata`] map; everything after the closing
//! fence is the body. A file whose first line is not `---` has no front
//! matter and is all body. An unterminated block runs to the end of the file.

use crate::route::Metadata;

pub const DELIMITER: &str = "---";

/// Whether `bytes` opens with a front-matter fence line.
pub fn has_front_matter(bytes: &[u8]) -> bool {
    let Some(rest) = bytes.strip_prefix(DELIMITER.as_bytes()) else {
        return false;
    };
    matches!(rest, [] | [b'\n', ..] | [b'\r', b'\n', ..])
}

/// Split `content` into its front-matter block (without fences) and body.
pub fn split(content: &str) -> (Option<&str>, &str) {
    if !has_front_matter(content.as_bytes()) {
        return (None, content);
    }
    let after_open = match content.find('\n') {
        Some(pos) => &content[pos + 1..],
        None => "",
    };

    let mut offset = 0;
    for line in after_open.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == DELIMITER {
            let block = &after_open[..offset];
            let body = &after_open[offset + line.len()..];
            return (Some(block), body);
        }
        offset += line.len();
    }
    (Some(after_open), "")
}

/// The body of `content` with any front-matter block removed.
pub fn strip(content: &str) -> &str {
    split(content).1
}

/// Decode a front-matter block. An empty block is an empty mapping.
pub fn decode(block: &str) -> Result<Metadata, serde_yaml::Error> {
    if block.trim().is_empty() {
        return Ok(Metadata::new());
    }
    serde_yaml::from_str(block)
}
