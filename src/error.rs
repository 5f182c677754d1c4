//! Errors raised while loading tours and sites or touching durable storage.
//!
//! Tour transitions themselves never fail; these errors only surface from
//! the loaders and store plumbing around them.

use std::path::PathBuf;
use thiserror::Error;

use crate::selector::SelectorError;

#[derive(Error, Debug)]
pub enum TourError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("unsupported tour file format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("tour has no steps")]
    EmptyCatalog,

    #[error("invalid selector '{selector}': {source}")]
    Selector {
        selector: String,
        #[source]
        source: SelectorError,
    },

    #[error("page '{0}' is not defined in the site")]
    UnknownPage(String),
}
