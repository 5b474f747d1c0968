//! Utility modules
//!
//! Bootstrap helpers that turn user-facing identifiers into node configs.

pub mod cloud_id;
pub mod node_url;

pub use cloud_id::{parse_cloud_id, CloudId, DEFAULT_CLOUD_PORT};
pub use node_url::{basic_auth_header, url_to_node_config};
