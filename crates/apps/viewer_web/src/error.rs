use formats::GeoJsonError;
use layers::ExpressionError;
use runtime::MapError;
use wasm_bindgen::JsValue;

#[derive(Debug)]
pub enum ViewerError {
    Config(serde_json::Error),
    Fetch(gloo_net::Error),
    Http { url: String, status: u16 },
    GeoJson(GeoJsonError),
    Map(MapError),
    Paint(ExpressionError),
    Dom(String),
    Gpu(String),
    NotMounted,
}

impl std::fmt::Display for ViewerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewerError::Config(e) => write!(f, "invalid viewer config: {e}"),
            ViewerError::Fetch(e) => write!(f, "request failed: {e}"),
            ViewerError::Http { url, status } => write!(f, "GET {url} returned {status}"),
            ViewerError::GeoJson(e) => write!(f, "{e}"),
            ViewerError::Map(e) => write!(f, "{e}"),
            ViewerError::Paint(e) => write!(f, "{e}"),
            ViewerError::Dom(msg) => write!(f, "DOM error: {msg}"),
            ViewerError::Gpu(msg) => write!(f, "GPU error: {msg}"),
            ViewerError::NotMounted => write!(f, "map is not mounted"),
        }
    }
}

impl std::error::Error for ViewerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ViewerError::Config(e) => Some(e),
            ViewerError::Fetch(e) => Some(e),
            ViewerError::GeoJson(e) => Some(e),
            ViewerError::Map(e) => Some(e),
            ViewerError::Paint(e) => Some(e),
            _ => None,
        }
    }
}

impl From<gloo_net::Error> for ViewerError {
    fn from(e: gloo_net::Error) -> Self {
        ViewerError::Fetch(e)
    }
}

impl From<GeoJsonError> for ViewerError {
    fn from(e: GeoJsonError) -> Self {
        ViewerError::GeoJson(e)
    }
}

impl From<MapError> for ViewerError {
    fn from(e: MapError) -> Self {
        ViewerError::Map(e)
    }
}

impl From<ExpressionError> for ViewerError {
    fn from(e: ExpressionError) -> Self {
        ViewerError::Paint(e)
    }
}

impl From<ViewerError> for JsValue {
    fn from(e: ViewerError) -> Self {
        JsValue::from_str(&e.to_string())
    }
}

/// Flattens a `JsValue` error from a DOM call.
pub(crate) fn dom_error(context: &str, value: JsValue) -> ViewerError {
    let detail = value.as_string().unwrap_or_else(|| format!("{value:?}"));
    ViewerError::Dom(format!("{context}: {detail}"))
}
