//! Simulated host pages.
//!
//! A site is a set of named pages, each a tree of elements with fixed
//! bounds. Elements can declare a render delay to model content that
//! appears some time after the page loads.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::layout::Rect;
use crate::resolver::{Target, TargetResolver};
use crate::scheduler::VirtualClock;
use crate::selector::{ElementTree, Selector};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSpec {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub elements: Vec<ElementSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSpec {
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    /// Text shown inside the element in the preview
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub rect: Rect,
    /// Milliseconds after page load before the element exists
    #[serde(default)]
    pub appears_after_ms: u64,
    #[serde(default)]
    pub children: Vec<ElementSpec>,
}

fn default_tag() -> String {
    "div".to_string()
}

impl ElementSpec {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            id: None,
            classes: Vec::new(),
            attrs: BTreeMap::new(),
            text: None,
            rect: Rect::default(),
            appears_after_ms: 0,
            children: Vec::new(),
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn rect(mut self, rect: Rect) -> Self {
        self.rect = rect;
        self
    }

    pub fn appears_after(mut self, millis: u64) -> Self {
        self.appears_after_ms = millis;
        self
    }

    pub fn child(mut self, child: ElementSpec) -> Self {
        self.children.push(child);
        self
    }
}

/// A flattened element inside a loaded page
#[derive(Debug, Clone)]
pub struct Node {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: BTreeMap<String, String>,
    pub text: Option<String>,
    pub rect: Rect,
    pub parent: Option<usize>,
    /// Time after load when this node and all its ancestors exist
    pub ready_at: Duration,
}

impl Node {
    pub fn label(&self) -> String {
        let mut label = self.tag.clone();
        if let Some(id) = &self.id {
            label.push('#');
            label.push_str(id);
        }
        for class in &self.classes {
            label.push('.');
            label.push_str(class);
        }
        label
    }
}

/// The set of pages a tour runs over
#[derive(Debug, Clone, Default)]
pub struct Site {
    pages: Vec<PageSpec>,
}

impl Site {
    pub fn new(pages: Vec<PageSpec>) -> Self {
        Self { pages }
    }

    pub fn page(&self, name: &str) -> Option<&PageSpec> {
        self.pages.iter().find(|p| p.name == name)
    }

    pub fn has_page(&self, name: &str) -> bool {
        self.page(name).is_some()
    }

    /// Load `name` as a fresh document; unknown pages load empty
    pub fn load(&self, name: &str, clock: VirtualClock) -> PageDocument {
        match self.page(name) {
            Some(spec) => PageDocument::new(spec, clock),
            None => {
                tracing::debug!(page = name, "Page not defined in site, loading empty document");
                PageDocument::empty(name, clock)
            }
        }
    }
}

/// A loaded page: element tree plus the clock measuring time since load
#[derive(Debug, Clone)]
pub struct PageDocument {
    name: String,
    nodes: Vec<Node>,
    clock: VirtualClock,
    loaded_at: Duration,
}

impl PageDocument {
    pub fn new(spec: &PageSpec, clock: VirtualClock) -> Self {
        let mut nodes = Vec::new();
        for element in &spec.elements {
            flatten(element, None, Duration::ZERO, &mut nodes);
        }
        let loaded_at = clock.now();
        Self {
            name: spec.name.clone(),
            nodes,
            clock,
            loaded_at,
        }
    }

    pub fn empty(name: &str, clock: VirtualClock) -> Self {
        let loaded_at = clock.now();
        Self {
            name: name.to_string(),
            nodes: Vec::new(),
            clock,
            loaded_at,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.now().saturating_sub(self.loaded_at)
    }

    /// Nodes that exist at the current instant, in document order
    pub fn rendered(&self) -> impl Iterator<Item = (usize, &Node)> {
        let elapsed = self.elapsed();
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, node)| node.ready_at <= elapsed)
    }

    pub fn query(&self, selector: &Selector) -> Option<usize> {
        self.rendered()
            .map(|(index, _)| index)
            .find(|&index| selector.matches(self, index))
    }

    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    /// Every node, rendered yet or not
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }
}

fn flatten(element: &ElementSpec, parent: Option<usize>, parent_ready: Duration, out: &mut Vec<Node>) {
    let ready_at = parent_ready.max(Duration::from_millis(element.appears_after_ms));
    let index = out.len();
    out.push(Node {
        tag: element.tag.clone(),
        id: element.id.clone(),
        classes: element.classes.clone(),
        attrs: element.attrs.clone(),
        text: element.text.clone(),
        rect: element.rect,
        parent,
        ready_at,
    });
    for child in &element.children {
        flatten(child, Some(index), ready_at, out);
    }
}

impl ElementTree for PageDocument {
    fn tag(&self, node: usize) -> &str {
        &self.nodes[node].tag
    }

    fn id(&self, node: usize) -> Option<&str> {
        self.nodes[node].id.as_deref()
    }

    fn has_class(&self, node: usize, class: &str) -> bool {
        self.nodes[node].classes.iter().any(|c| c == class)
    }

    fn attr(&self, node: usize, name: &str) -> Option<&str> {
        let node = &self.nodes[node];
        match name {
            "id" => node.id.as_deref(),
            _ => node.attrs.get(name).map(String::as_str),
        }
    }

    fn parent(&self, node: usize) -> Option<usize> {
        self.nodes[node].parent
    }
}

impl TargetResolver for PageDocument {
    fn resolve(&self, selector: &str) -> Option<Target> {
        let parsed = match Selector::parse(selector) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!(selector, error = %err, "Invalid tour selector");
                return None;
            }
        };
        let index = self.query(&parsed)?;
        let node = &self.nodes[index];
        Some(Target {
            selector: selector.to_string(),
            label: node.label(),
            rect: node.rect,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> PageSpec {
        PageSpec {
            name: "index.html".to_string(),
            title: None,
            elements: vec![ElementSpec::new("main")
                .id("app")
                .rect(Rect::new(0, 0, 1000, 800))
                .child(
                    ElementSpec::new("button")
                        .id("save")
                        .class("primary")
                        .rect(Rect::new(20, 30, 80, 24)),
                )
                .child(
                    ElementSpec::new("section")
                        .class("report")
                        .appears_after(300)
                        .child(
                            ElementSpec::new("table")
                                .attr("data-kind", "summary")
                                .rect(Rect::new(0, 100, 600, 300)),
                        ),
                )],
        }
    }

    #[test]
    fn test_resolve_by_id_and_compound() {
        let doc = PageDocument::new(&page(), VirtualClock::new());
        let target = doc.resolve("#app > button.primary").unwrap();
        assert_eq!(target.label, "button#save.primary");
        assert_eq!(target.rect, Rect::new(20, 30, 80, 24));
        assert_eq!(target.selector, "#app > button.primary");
    }

    #[test]
    fn test_invalid_selector_resolves_to_none() {
        let doc = PageDocument::new(&page(), VirtualClock::new());
        assert!(doc.resolve("button[").is_none());
        assert!(doc.resolve("").is_none());
    }

    #[test]
    fn test_late_content_inherits_parent_delay() {
        let clock = VirtualClock::new();
        let doc = PageDocument::new(&page(), clock.clone());
        assert!(doc.resolve("[data-kind=summary]").is_none());

        clock.advance(Duration::from_millis(299));
        assert!(doc.resolve(".report table").is_none());

        clock.advance(Duration::from_millis(1));
        assert!(doc.resolve(".report table").is_some());
    }

    #[test]
    fn test_elapsed_counts_from_load() {
        let clock = VirtualClock::new();
        clock.advance(Duration::from_millis(1000));
        let doc = PageDocument::new(&page(), clock.clone());
        assert_eq!(doc.elapsed(), Duration::ZERO);
        assert!(doc.resolve(".report").is_none());
        clock.advance(Duration::from_millis(300));
        assert!(doc.resolve(".report").is_some());
    }

    #[test]
    fn test_unknown_page_loads_empty() {
        let site = Site::new(vec![page()]);
        assert!(site.has_page("index.html"));
        let doc = site.load("missing.html", VirtualClock::new());
        assert_eq!(doc.name(), "missing.html");
        assert_eq!(doc.rendered().count(), 0);
        assert!(doc.resolve("#app").is_none());
    }
}
