use crate::layer::LayerError;

#[derive(Debug, Clone, PartialEq)]
pub enum MapError {
    MissingAccessToken,
    InvalidOption { name: &'static str, reason: String },
    StyleNotLoaded,
    DuplicateSource(String),
    DuplicateLayer(String),
    UnknownLayer(String),
    Layer { id: String, source: LayerError },
}

impl std::fmt::Display for MapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MapError::MissingAccessToken => write!(f, "an access token is required"),
            MapError::InvalidOption { name, reason } => write!(f, "invalid option `{name}`: {reason}"),
            MapError::StyleNotLoaded => write!(f, "style is not done loading"),
            MapError::DuplicateSource(id) => write!(f, "source {id:?} already exists"),
            MapError::DuplicateLayer(id) => write!(f, "layer {id:?} already exists"),
            MapError::UnknownLayer(id) => write!(f, "no layer with id {id:?}"),
            MapError::Layer { id, source } => write!(f, "layer {id:?} failed to attach: {source}"),
        }
    }
}

impl std::error::Error for MapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MapError::Layer { source, .. } => Some(source),
            _ => None,
        }
    }
}
