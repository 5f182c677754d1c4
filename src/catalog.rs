//! Tour step definitions and tour file loading.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::TourError;
use crate::site::PageSpec;

/// Title shown when a step leaves it blank
pub const DEFAULT_TITLE: &str = "Tour Step";

/// One unit of the tour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDescriptor {
    /// Page identifier the step belongs to (e.g. "dashboard.html")
    pub page: String,
    /// CSS selector of the element to highlight; absent for page-level steps
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

impl StepDescriptor {
    pub fn new(page: impl Into<String>, selector: Option<&str>, title: impl Into<String>) -> Self {
        Self {
            page: page.into(),
            selector: selector.map(str::to_string),
            title: title.into(),
            body: String::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Selector, treating a blank string as no selector
    pub fn selector(&self) -> Option<&str> {
        self.selector
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            DEFAULT_TITLE
        } else {
            &self.title
        }
    }
}

/// Ordered, immutable steps; the index is the step's identity.
///
/// An empty catalog is allowed and disables the tour.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepCatalog {
    steps: Vec<StepDescriptor>,
}

impl StepCatalog {
    pub fn new(steps: Vec<StepDescriptor>) -> Self {
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&StepDescriptor> {
        self.steps.get(index)
    }

    pub fn last_index(&self) -> Option<usize> {
        self.steps.len().checked_sub(1)
    }

    pub fn is_last(&self, index: usize) -> bool {
        self.last_index() == Some(index)
    }

}

impl From<Vec<StepDescriptor>> for StepCatalog {
    fn from(steps: Vec<StepDescriptor>) -> Self {
        Self::new(steps)
    }
}

/// On-disk tour definition: the steps plus an optional simulated site
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TourFile {
    #[serde(default)]
    pub steps: Vec<StepDescriptor>,
    #[serde(default)]
    pub pages: Vec<PageSpec>,
}

impl TourFile {
    /// Load a tour file, choosing the format by extension (toml, yaml/yml, json)
    pub fn load(path: &Path) -> Result<Self, TourError> {
        let contents = fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let tour = match extension.as_deref() {
            Some("toml") => toml::from_str(&contents)?,
            Some("yaml" | "yml") => serde_yaml::from_str(&contents)?,
            Some("json") => serde_json::from_str(&contents)?,
            _ => return Err(TourError::UnsupportedFormat(path.to_path_buf())),
        };
        tracing::debug!(path = %path.display(), "Loaded tour file");
        Ok(tour)
    }

    pub fn catalog(&self) -> StepCatalog {
        StepCatalog::new(self.steps.clone())
    }
}
