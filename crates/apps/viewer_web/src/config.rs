use runtime::{AccessToken, MapOptions};
use serde::Deserialize;

use crate::error::ViewerError;

pub const DEFAULT_DATA_FILE: &str = "polygons.json";
pub const DEFAULT_SOURCE_ID: &str = "zipcodes";
pub const CHOROPLETH_LAYER_ID: &str = "zipcode-depth-layer";
pub const OVERLAY_LAYER_ID: &str = "3d-model";

/// Token baked in at build time, used when the page does not pass one.
const BUILD_ACCESS_TOKEN: Option<&str> = option_env!("MAP_ACCESS_TOKEN");
const BUILD_PUBLIC_URL: Option<&str> = option_env!("PUBLIC_URL");

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewerConfig {
    pub map: MapOptions,
    /// Prefix the data file is served under, without a trailing slash.
    pub public_url: String,
    pub data_file: String,
    pub source_id: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        let mut config = Self {
            map: MapOptions::default(),
            public_url: BUILD_PUBLIC_URL.unwrap_or_default().to_string(),
            data_file: DEFAULT_DATA_FILE.to_string(),
            source_id: DEFAULT_SOURCE_ID.to_string(),
        };
        config.fill_access_token(BUILD_ACCESS_TOKEN);
        config
    }
}

impl ViewerConfig {
    /// Parses the page-supplied JSON. Blank input means all defaults.
    pub fn from_json(json: &str) -> Result<Self, ViewerError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut config: Self = serde_json::from_str(json).map_err(ViewerError::Config)?;
        config.fill_access_token(BUILD_ACCESS_TOKEN);
        Ok(config)
    }

    /// Keeps an explicit token; otherwise takes `fallback` if it is usable.
    pub fn fill_access_token(&mut self, fallback: Option<&str>) {
        if self.map.access_token.is_none() {
            self.map.access_token = fallback.and_then(AccessToken::new);
        }
    }

    pub fn data_url(&self) -> String {
        format!("{}/{}", self.public_url.trim_end_matches('/'), self.data_file)
    }
}

#[cfg(test)]
mod tests {
    use super::{BUILD_ACCESS_TOKEN, ViewerConfig};
    use crate::error::ViewerError;
    use pretty_assertions::assert_eq;
    use runtime::AccessToken;

    #[test]
    fn blank_json_gives_defaults() {
        let config = ViewerConfig::from_json("  ").expect("defaults");
        assert_eq!(config.data_file, "polygons.json");
        assert_eq!(config.source_id, "zipcodes");
        assert_eq!(config.map.container, "map");
    }

    #[test]
    fn nested_map_options_override_defaults() {
        let config = ViewerConfig::from_json(
            r#"{"publicUrl": "https://example.org/app/", "map": {"zoom": 12, "accessToken": "pk.page"}}"#,
        )
        .expect("config");
        assert_eq!(config.map.zoom, 12.0);
        assert_eq!(config.map.pitch, 45.0);
        assert_eq!(config.map.access_token, AccessToken::new("pk.page"));
        assert_eq!(config.data_url(), "https://example.org/app/polygons.json");
    }

    #[test]
    fn empty_public_url_serves_from_root() {
        let mut config = ViewerConfig::from_json(r#"{"publicUrl": ""}"#).expect("config");
        assert_eq!(config.data_url(), "/polygons.json");
        config.data_file = "other.geojson".to_string();
        assert_eq!(config.data_url(), "/other.geojson");
    }

    #[test]
    fn fallback_token_only_fills_gaps() {
        let mut config = ViewerConfig::from_json(r#"{"map": {}}"#).expect("config");
        config.map.access_token = None;
        config.fill_access_token(Some(""));
        assert_eq!(config.map.access_token, None);
        config.fill_access_token(Some("pk.build"));
        assert_eq!(config.map.access_token, AccessToken::new("pk.build"));
        config.fill_access_token(Some("pk.other"));
        assert_eq!(config.map.access_token, AccessToken::new("pk.build"));
    }

    #[test]
    fn blank_page_token_takes_the_fallback() {
        let config =
            ViewerConfig::from_json(r#"{"map": {"accessToken": "  "}}"#).expect("config");
        assert_eq!(
            config.map.access_token,
            BUILD_ACCESS_TOKEN.and_then(AccessToken::new)
        );
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = ViewerConfig::from_json(r#"{"map": {"zoom": "far"}}"#).expect_err("bad zoom");
        assert!(matches!(err, ViewerError::Config(_)));
        assert!(err.to_string().starts_with("invalid viewer config"));
    }
}
