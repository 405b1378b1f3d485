//! Node fetcher - downloads a node's JSON description and rendered image
//!
//! Both artifacts are written to fixed, well-known paths in the output
//! directory and overwritten on every fetch.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::{api_error_detail, snippet, FigmaError, Result};
use crate::locator::{encode_node_id, NodeRef};

/// Public Figma REST endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.figma.com";

/// Header carrying the personal access token
const TOKEN_HEADER: &str = "X-Figma-Token";

/// Characters of a non-JSON metadata body kept for diagnostics
const METADATA_SNIPPET_CHARS: usize = 200;

/// Characters of an images response kept for diagnostics
const IMAGE_SNIPPET_CHARS: usize = 100;

/// Where and how fetched artifacts are written
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Directory the files are written to
    pub dir: PathBuf,
    /// File name of the node JSON (e.g., "figma_node_data.json")
    pub json_filename: String,
    /// Prefix of the image file name (e.g., "figma_node_image_")
    pub image_prefix: String,
    /// Export format requested from Figma and used as extension (e.g., "svg")
    pub image_format: String,
}

impl OutputConfig {
    /// Path of the node JSON file
    pub fn json_path(&self) -> PathBuf {
        self.dir.join(&self.json_filename)
    }

    /// Path of the image file for `node_id`
    pub fn image_path(&self, node_id: &str) -> PathBuf {
        self.dir.join(image_file_name(
            &self.image_prefix,
            node_id,
            &self.image_format,
        ))
    }
}

/// `{prefix}{node id with : / \ replaced by -}.{format}`
pub fn image_file_name(prefix: &str, node_id: &str, format: &str) -> String {
    let safe_id: String = node_id
        .chars()
        .map(|c| if matches!(c, ':' | '/' | '\\') { '-' } else { c })
        .collect();
    format!("{}{}.{}", prefix, safe_id, format)
}

/// Pick the image URL for `node_id` out of an images map.
///
/// Figma may echo the id with a dash instead of a colon (or the caller may
/// have used the dash form), so lookup tries, in order: the exact key, the
/// id with its first dash turned into a colon, and finally the only entry
/// when exactly one image came back for a single requested id.
pub fn resolve_image_url(images: &Map<String, Value>, node_id: &str) -> Option<String> {
    let lookup = |key: &str| images.get(key).and_then(|v| v.as_str()).map(str::to_string);

    let mut url = lookup(node_id);

    if url.is_none() && node_id.contains('-') {
        url = lookup(&node_id.replacen('-', ":", 1));
    }

    if url.is_none() && !node_id.contains(',') && images.len() == 1 {
        url = images
            .values()
            .next()
            .and_then(|v| v.as_str())
            .map(str::to_string);
    }

    url
}

/// Serialize JSON with four-space indentation
pub fn to_indented_json(value: &Value) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    serde::Serialize::serialize(value, &mut serializer).map_err(|e| FigmaError::InvalidJson {
        error: e.to_string(),
        snippet: String::new(),
    })?;
    Ok(out)
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|source| FigmaError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Authenticated client for the node and image endpoints
pub struct NodeFetcher {
    /// HTTP client for API requests
    http_client: reqwest::Client,
    /// API root without trailing slash
    base_url: String,
    /// Personal access token
    token: String,
    /// Output file locations
    output: OutputConfig,
}

impl NodeFetcher {
    /// Create a fetcher against the public Figma API
    pub fn new(token: impl Into<String>, output: OutputConfig) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, token, output)
    }

    /// Create a fetcher against a custom API root
    pub fn with_base_url(
        base_url: impl Into<String>,
        token: impl Into<String>,
        output: OutputConfig,
    ) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            output,
        }
    }

    pub fn output(&self) -> &OutputConfig {
        &self.output
    }

    /// Authenticated GET returning the body of a successful response
    async fn get_text(&self, url: &str) -> Result<String> {
        let response = self
            .http_client
            .get(url)
            .header(TOKEN_HEADER, &self.token)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(FigmaError::Api {
                status: status.as_u16(),
                detail: api_error_detail(&body),
            });
        }
        Ok(body)
    }

    /// Fetch the node JSON and save it (re-indented) to the JSON output path
    pub async fn fetch_metadata(&self, node: &NodeRef) -> Result<PathBuf> {
        let url = format!(
            "{}/v1/files/{}/nodes?ids={}",
            self.base_url,
            node.file_key,
            encode_node_id(&node.node_id)
        );
        log::info!("Fetching node JSON for '{}'", node.node_id);

        let body = self.get_text(&url).await?;
        let value: Value =
            serde_json::from_str(&body).map_err(|e| FigmaError::InvalidJson {
                error: e.to_string(),
                snippet: snippet(&body, METADATA_SNIPPET_CHARS),
            })?;

        let path = self.output.json_path();
        write_file(&path, &to_indented_json(&value)?).await?;
        log::info!("Saved node JSON to {}", path.display());
        Ok(path)
    }

    /// Resolve the node's rendered image URL, download it and save it
    pub async fn fetch_image(&self, node: &NodeRef) -> Result<PathBuf> {
        let url = format!(
            "{}/v1/images/{}?ids={}&format={}",
            self.base_url,
            node.file_key,
            encode_node_id(&node.node_id),
            self.output.image_format
        );
        log::info!(
            "Requesting {} render URL for '{}'",
            self.output.image_format,
            node.node_id
        );

        let body = self.get_text(&url).await?;
        let value: Value =
            serde_json::from_str(&body).map_err(|e| FigmaError::InvalidJson {
                error: e.to_string(),
                snippet: snippet(&body, IMAGE_SNIPPET_CHARS),
            })?;

        let image_url = value
            .get("images")
            .and_then(|images| images.as_object())
            .and_then(|images| resolve_image_url(images, &node.node_id));

        let Some(image_url) = image_url else {
            let api_message = value
                .get("err")
                .and_then(|v| v.as_str())
                .unwrap_or("Image not found in API response.")
                .to_string();
            return Err(FigmaError::ImageNotFound {
                api_message,
                snippet: snippet(&value.to_string(), IMAGE_SNIPPET_CHARS),
            });
        };

        // Render URLs are pre-signed; no token.
        let response = self.http_client.get(&image_url).send().await?;
        if !response.status().is_success() {
            return Err(FigmaError::Download {
                status: response.status().as_u16(),
            });
        }
        let bytes = response.bytes().await?;

        let path = self.output.image_path(&node.node_id);
        write_file(&path, &bytes).await?;
        log::info!("Saved {} image to {}", self.output.image_format, path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn images(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn output_in(dir: &Path) -> OutputConfig {
        OutputConfig {
            dir: dir.to_path_buf(),
            json_filename: "figma_node_data.json".to_string(),
            image_prefix: "figma_node_image_".to_string(),
            image_format: "svg".to_string(),
        }
    }

    fn node(node_id: &str) -> NodeRef {
        NodeRef {
            file_key: "FileKey".to_string(),
            node_id: node_id.to_string(),
        }
    }

    #[test]
    fn test_resolve_exact_match() {
        let map = images(json!({"66:509": "http://x", "1:2": "http://y"}));
        assert_eq!(resolve_image_url(&map, "1:2").as_deref(), Some("http://y"));
    }

    #[test]
    fn test_resolve_dash_to_colon() {
        let map = images(json!({"66:509": "http://x"}));
        assert_eq!(resolve_image_url(&map, "66-509").as_deref(), Some("http://x"));
    }

    #[test]
    fn test_resolve_single_entry_fallback() {
        let map = images(json!({"unrelated": "http://only"}));
        assert_eq!(resolve_image_url(&map, "9:9").as_deref(), Some("http://only"));
    }

    #[test]
    fn test_resolve_no_fallback_for_multiple_ids() {
        let map = images(json!({"unrelated": "http://only"}));
        assert_eq!(resolve_image_url(&map, "1:2,3:4"), None);

        let map = images(json!({"a": "http://a", "b": "http://b"}));
        assert_eq!(resolve_image_url(&map, "9:9"), None);
    }

    #[test]
    fn test_resolve_null_render() {
        let map = images(json!({"1:2": null, "3:4": "http://z"}));
        assert_eq!(resolve_image_url(&map, "1:2"), None);
    }

    #[test]
    fn test_image_file_name_sanitized() {
        assert_eq!(
            image_file_name("figma_node_image_", "66:509/a\\b", "svg"),
            "figma_node_image_66-509-a-b.svg"
        );
    }

    #[tokio::test]
    async fn test_fetch_metadata_writes_indented_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/files/FileKey/nodes"))
            .and(query_param("ids", "66:509"))
            .and(header("X-Figma-Token", "tok"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"name":"App","nodes":{"66:509":{"document":{"id":"66:509"}}}}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let fetcher = NodeFetcher::with_base_url(server.uri(), "tok", output_in(dir.path()));
        let saved = fetcher.fetch_metadata(&node("66:509")).await.unwrap();

        assert_eq!(saved, dir.path().join("figma_node_data.json"));
        let written = std::fs::read_to_string(&saved).unwrap();
        assert!(written.contains("\n    \"name\": \"App\""));
        let reparsed: Value = serde_json::from_str(&written).unwrap();
        assert_eq!(reparsed["nodes"]["66:509"]["document"]["id"], "66:509");
    }

    #[tokio::test]
    async fn test_fetch_metadata_sends_encoded_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/files/FileKey/nodes"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let fetcher = NodeFetcher::with_base_url(server.uri(), "tok", output_in(dir.path()));
        fetcher.fetch_metadata(&node("66:509")).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests[0].url.query(), Some("ids=66%3A509"));
    }

    #[tokio::test]
    async fn test_fetch_metadata_api_error_detail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(403).set_body_string(r#"{"status":403,"err":"Invalid token"}"#),
            )
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let fetcher = NodeFetcher::with_base_url(server.uri(), "bad", output_in(dir.path()));
        let err = fetcher.fetch_metadata(&node("1:2")).await.unwrap_err();
        match err {
            FigmaError::Api { status, detail } => {
                assert_eq!(status, 403);
                assert_eq!(detail, "Invalid token");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!dir.path().join("figma_node_data.json").exists());
    }

    #[tokio::test]
    async fn test_fetch_metadata_non_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let fetcher = NodeFetcher::with_base_url(server.uri(), "tok", output_in(dir.path()));
        let err = fetcher.fetch_metadata(&node("1:2")).await.unwrap_err();
        match err {
            FigmaError::InvalidJson { snippet, .. } => assert_eq!(snippet, "<html>maintenance</html>"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_image_downloads_render() {
        let server = MockServer::start().await;
        let render_url = format!("{}/renders/abc.svg", server.uri());
        Mock::given(method("GET"))
            .and(path("/v1/images/FileKey"))
            .and(query_param("format", "svg"))
            .and(header("X-Figma-Token", "tok"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"err": null, "images": {"66:509": render_url}})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/renders/abc.svg"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<svg></svg>"))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let fetcher = NodeFetcher::with_base_url(server.uri(), "tok", output_in(dir.path()));
        let saved = fetcher.fetch_image(&node("66-509")).await.unwrap();

        assert_eq!(saved, dir.path().join("figma_node_image_66-509.svg"));
        assert_eq!(std::fs::read_to_string(saved).unwrap(), "<svg></svg>");
    }

    #[tokio::test]
    async fn test_fetch_image_missing_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/images/FileKey"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"err": "Render timeout", "images": {}})),
            )
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let fetcher = NodeFetcher::with_base_url(server.uri(), "tok", output_in(dir.path()));
        let err = fetcher.fetch_image(&node("1:2")).await.unwrap_err();
        match err {
            FigmaError::ImageNotFound { api_message, snippet } => {
                assert_eq!(api_message, "Render timeout");
                assert!(snippet.contains("images"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
