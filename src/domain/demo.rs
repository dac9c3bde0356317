//! Links to the public stream-test player.

use super::layout::{DASH_MANIFEST_NAME, HLS_MANIFEST_NAME};
use serde::Serialize;
use url::form_urlencoded;

const PLAYER_URL: &str = "https://bitmovin.com/demos/stream-test";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DemoUrls {
    pub dash: String,
    pub hls: String,
}

impl DemoUrls {
    pub fn new(account_name: &str, container: &str, base_name: &str) -> Self {
        let manifest_root = format!(
            "https://{}.blob.core.windows.net/{}/{}",
            account_name, container, base_name
        );
        Self {
            dash: player_url("dash", &format!("{}/{}", manifest_root, DASH_MANIFEST_NAME)),
            hls: player_url("hls", &format!("{}/{}", manifest_root, HLS_MANIFEST_NAME)),
        }
    }
}

fn player_url(format: &str, manifest_url: &str) -> String {
    let manifest: String = form_urlencoded::byte_serialize(manifest_url.as_bytes()).collect();
    format!("{}?format={}&manifest={}", PLAYER_URL, format, manifest)
}
