//! Figma URL parsing
//!
//! Share links look like
//! `https://www.figma.com/design/<fileKey>/<title>?node-id=66%3A509&t=...`.
//! The node id arrives percent-encoded and must be decoded before use, then
//! encoded again whenever it is put back on the wire.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static FIGMA_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"figma\.com/(?:file|design)/([a-zA-Z0-9]+)[^?]*\?(?:.*&)?node-id=([^&]+)")
        .expect("Figma URL pattern is valid")
});

/// A node inside a Figma file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeRef {
    /// File key from the URL path
    pub file_key: String,
    /// Decoded node id (e.g., "66:509"); may be a comma-separated list
    pub node_id: String,
}

/// Parse a Figma file/design URL into a [`NodeRef`].
///
/// Returns `None` when the URL does not match; callers report that as a
/// validation error.
pub fn parse_figma_url(url: &str) -> Option<NodeRef> {
    let captures = FIGMA_URL.captures(url)?;
    let file_key = captures.get(1)?.as_str().to_string();
    let node_id = decode_node_id(captures.get(2)?.as_str());

    Some(NodeRef { file_key, node_id })
}

/// Percent-decode a node id taken from a URL
pub fn decode_node_id(raw: &str) -> String {
    String::from_utf8_lossy(&urlencoding::decode_binary(raw.as_bytes())).into_owned()
}

/// Percent-encode a node id for an API query string (`66:509` -> `66%3A509`)
pub fn encode_node_id(node_id: &str) -> String {
    urlencoding::encode(node_id).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_design_url() {
        let node = parse_figma_url(
            "https://www.figma.com/design/AbC123xyz/My-App?node-id=66%3A509&t=abc-1",
        )
        .unwrap();
        assert_eq!(node.file_key, "AbC123xyz");
        assert_eq!(node.node_id, "66:509");
    }

    #[test]
    fn test_node_id_param_position_does_not_matter() {
        let first = parse_figma_url("https://figma.com/file/Key42/Title?node-id=1%3A2&mode=dev");
        let later = parse_figma_url("https://figma.com/file/Key42/Title?mode=dev&t=x&node-id=1%3A2");
        assert_eq!(first, later);
        assert_eq!(later.unwrap().node_id, "1:2");
    }

    #[test]
    fn test_dash_node_id_kept_verbatim() {
        let node = parse_figma_url("https://www.figma.com/design/Key/T?node-id=66-509").unwrap();
        assert_eq!(node.node_id, "66-509");
    }

    #[test]
    fn test_non_matching_urls() {
        assert!(parse_figma_url("https://www.figma.com/design/Key/Title").is_none());
        assert!(parse_figma_url("https://example.com/design/Key?node-id=1%3A2").is_none());
        assert!(parse_figma_url("not a url").is_none());
        assert!(parse_figma_url("").is_none());
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        for id in ["66:509", "1:2,3:4", "I5:6;7:8"] {
            let encoded = encode_node_id(id);
            assert!(!encoded.contains(':'));
            assert_eq!(decode_node_id(&encoded), id);
        }
        assert_eq!(encode_node_id("66:509"), "66%3A509");
    }
}
