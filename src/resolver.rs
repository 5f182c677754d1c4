//! Locating a step's target element on the current page.

use std::collections::HashMap;

use crate::layout::Rect;

/// The element a step highlights
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Selector the element was found by
    pub selector: String,
    /// Short description for display and logs, e.g. `button#save.primary`
    pub label: String,
    /// Bounds in page coordinates
    pub rect: Rect,
}

/// Finds target elements on the current page.
///
/// Implementations must not fail: a malformed selector resolves to `None`
/// exactly like a selector that matches nothing.
pub trait TargetResolver {
    fn resolve(&self, selector: &str) -> Option<Target>;
}

impl<T: TargetResolver + ?Sized> TargetResolver for &T {
    fn resolve(&self, selector: &str) -> Option<Target> {
        (**self).resolve(selector)
    }
}

/// Resolver over a fixed selector-to-bounds table
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    targets: HashMap<String, Rect>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, selector: &str, rect: Rect) -> Self {
        self.insert(selector, rect);
        self
    }

    pub fn insert(&mut self, selector: &str, rect: Rect) {
        self.targets.insert(selector.to_string(), rect);
    }

    pub fn remove(&mut self, selector: &str) {
        self.targets.remove(selector);
    }
}

impl TargetResolver for StaticResolver {
    fn resolve(&self, selector: &str) -> Option<Target> {
        self.targets.get(selector).map(|rect| Target {
            selector: selector.to_string(),
            label: selector.to_string(),
            rect: *rect,
        })
    }
}
