use foundation::math::{LngLat, MAX_MERCATOR_LAT_DEG};
use serde::{Deserialize, Deserializer};

use crate::error::MapError;

const MAPBOX_SCHEME: &str = "mapbox://";
const STYLES_API: &str = "https://api.mapbox.com/styles/v1/";

/// Credential for the style and tile APIs. Never printed, never blank.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// `None` for blank input.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A blank `accessToken` reads as absent.
fn blank_token_is_none<'de, D>(deserializer: D) -> Result<Option<AccessToken>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.and_then(AccessToken::new))
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MapOptions {
    /// Id of the canvas element the map draws into.
    pub container: String,
    pub style: String,
    /// `[lng, lat]` in degrees.
    pub center: [f64; 2],
    pub zoom: f64,
    /// Degrees from the vertical.
    pub pitch: f64,
    pub bearing: f64,
    pub antialias: bool,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub max_pitch: f64,
    #[serde(deserialize_with = "blank_token_is_none")]
    pub access_token: Option<AccessToken>,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            container: "map".to_string(),
            style: "mapbox://styles/mapbox/streets-v11".to_string(),
            center: [-71.0589, 42.3601],
            zoom: 11.0,
            pitch: 45.0,
            bearing: 0.0,
            antialias: true,
            min_zoom: 0.0,
            max_zoom: 22.0,
            max_pitch: 60.0,
            access_token: None,
        }
    }
}

impl MapOptions {
    pub fn with_access_token(mut self, token: AccessToken) -> Self {
        self.access_token = Some(token);
        self
    }

    pub fn center_lng_lat(&self) -> LngLat {
        LngLat::from_array(self.center)
    }

    pub fn validate(&self) -> Result<(), MapError> {
        if self.access_token.is_none() {
            return Err(MapError::MissingAccessToken);
        }

        let finite = [
            ("center", self.center[0].is_finite() && self.center[1].is_finite()),
            ("zoom", self.zoom.is_finite()),
            ("pitch", self.pitch.is_finite()),
            ("bearing", self.bearing.is_finite()),
            ("minZoom", self.min_zoom.is_finite()),
            ("maxZoom", self.max_zoom.is_finite()),
            ("maxPitch", self.max_pitch.is_finite()),
        ];
        if let Some((name, _)) = finite.into_iter().find(|&(_, ok)| !ok) {
            return Err(invalid(name, "must be a finite number".to_string()));
        }

        if self.min_zoom > self.max_zoom {
            return Err(invalid(
                "minZoom",
                format!("{} is greater than maxZoom {}", self.min_zoom, self.max_zoom),
            ));
        }
        if self.center[1].abs() > MAX_MERCATOR_LAT_DEG {
            return Err(invalid(
                "center",
                format!("latitude {} is outside ±{MAX_MERCATOR_LAT_DEG}", self.center[1]),
            ));
        }
        if !(0.0..=180.0).contains(&self.max_pitch) {
            return Err(invalid("maxPitch", format!("{} is outside [0, 180]", self.max_pitch)));
        }
        if !(0.0..=self.max_pitch).contains(&self.pitch) {
            return Err(invalid(
                "pitch",
                format!("{} is outside [0, {}]", self.pitch, self.max_pitch),
            ));
        }
        Ok(())
    }

    /// Resolves `mapbox://styles/<owner>/<id>` into the styles API URL,
    /// appending the access token. Other URLs pass through.
    pub fn style_url(&self) -> String {
        let Some(path) = self.style.strip_prefix(MAPBOX_SCHEME) else {
            return self.style.clone();
        };
        let Some(style_path) = path.strip_prefix("styles/") else {
            return self.style.clone();
        };
        let mut url = format!("{STYLES_API}{style_path}");
        if let Some(token) = &self.access_token {
            url.push_str("?access_token=");
            url.push_str(token.as_str());
        }
        url
    }
}

fn invalid(name: &'static str, reason: String) -> MapError {
    MapError::InvalidOption { name, reason }
}

#[cfg(test)]
mod tests {
    use super::{AccessToken, MapOptions};
    use crate::error::MapError;
    use pretty_assertions::assert_eq;

    fn token() -> AccessToken {
        AccessToken::new("pk.test").expect("token")
    }

    #[test]
    fn defaults_match_the_boston_view() {
        let options = MapOptions::default();
        assert_eq!(options.container, "map");
        assert_eq!(options.center, [-71.0589, 42.3601]);
        assert_eq!(options.zoom, 11.0);
        assert_eq!(options.pitch, 45.0);
        assert_eq!(options.bearing, 0.0);
        assert!(options.antialias);
    }

    #[test]
    fn deserializes_partial_json_over_defaults() {
        let options: MapOptions =
            serde_json::from_str(r#"{"zoom": 9.5, "maxPitch": 70, "accessToken": "pk.abc"}"#)
                .expect("parse options");
        assert_eq!(options.zoom, 9.5);
        assert_eq!(options.max_pitch, 70.0);
        assert_eq!(options.style, "mapbox://styles/mapbox/streets-v11");
        assert_eq!(options.access_token, AccessToken::new("pk.abc"));
    }

    #[test]
    fn blank_token_in_json_reads_as_missing() {
        for json in [r#"{"accessToken": ""}"#, r#"{"accessToken": "   "}"#, r#"{"accessToken": null}"#] {
            let options: MapOptions = serde_json::from_str(json).expect("parse options");
            assert_eq!(options.access_token, None, "{json}");
            assert_eq!(options.validate(), Err(MapError::MissingAccessToken));
        }
    }

    #[test]
    fn validation_requires_token() {
        assert_eq!(MapOptions::default().validate(), Err(MapError::MissingAccessToken));
        assert!(AccessToken::new("  ").is_none());
        assert_eq!(MapOptions::default().with_access_token(token()).validate(), Ok(()));
    }

    #[test]
    fn validation_rejects_out_of_range_values() {
        let base = MapOptions::default().with_access_token(token());

        let mut o = base.clone();
        o.pitch = 75.0;
        assert!(matches!(o.validate(), Err(MapError::InvalidOption { name: "pitch", .. })));

        let mut o = base.clone();
        o.center = [0.0, 89.0];
        assert!(matches!(o.validate(), Err(MapError::InvalidOption { name: "center", .. })));

        let mut o = base.clone();
        o.min_zoom = 12.0;
        o.max_zoom = 3.0;
        assert!(matches!(o.validate(), Err(MapError::InvalidOption { name: "minZoom", .. })));

        let mut o = base;
        o.zoom = f64::NAN;
        assert!(matches!(o.validate(), Err(MapError::InvalidOption { name: "zoom", .. })));
    }

    #[test]
    fn token_is_redacted_in_debug_output() {
        let options = MapOptions::default().with_access_token(token());
        let printed = format!("{options:?}");
        assert!(!printed.contains("pk.test"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn style_url_resolves_mapbox_scheme() {
        let options = MapOptions::default().with_access_token(token());
        assert_eq!(
            options.style_url(),
            "https://api.mapbox.com/styles/v1/mapbox/streets-v11?access_token=pk.test"
        );

        let mut custom = options;
        custom.style = "https://example.org/style.json".to_string();
        assert_eq!(custom.style_url(), "https://example.org/style.json");
    }
}
