//! Figma REST client
//!
//! - [`parse_figma_url`]: pull the file key and node id out of a share link
//! - [`NodeFetcher`]: download a node's JSON and rendered vector image to disk

pub mod error;
pub mod fetcher;
pub mod locator;

pub use error::{FigmaError, Result};
pub use fetcher::{
    image_file_name, resolve_image_url, to_indented_json, NodeFetcher, OutputConfig,
};
pub use locator::{decode_node_id, encode_node_id, parse_figma_url, NodeRef};
