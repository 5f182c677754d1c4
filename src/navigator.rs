//! Location access for the tour controller.

use url::Url;

use crate::handoff;

/// The browser location as seen by a tour
pub trait Navigator {
    fn current_url(&self) -> Url;

    /// Begin a full navigation; the current page is unloaded afterwards
    fn navigate_to(&mut self, url: Url);

    /// Rewrite the current URL in place without reloading (history replacement)
    fn replace_url(&mut self, url: Url);

    fn current_page(&self) -> String {
        handoff::page_name(&self.current_url())
    }

    fn read_handoff(&self, param: &str) -> Option<usize> {
        handoff::read_handoff(&self.current_url(), param)
    }

    /// Remove the handoff parameter from the current URL; no-op when absent
    fn clear_handoff(&mut self, param: &str) {
        if let Some(url) = handoff::strip_handoff(&self.current_url(), param) {
            self.replace_url(url);
        }
    }
}

/// Navigator over an in-memory location.
///
/// Navigations are recorded rather than performed; the host decides when
/// to "arrive" by loading the destination with a fresh navigator.
#[derive(Debug, Clone)]
pub struct SimulatedNavigator {
    location: Url,
    navigations: Vec<Url>,
    replacements: Vec<Url>,
}

impl SimulatedNavigator {
    pub fn new(location: Url) -> Self {
        Self {
            location,
            navigations: Vec::new(),
            replacements: Vec::new(),
        }
    }

    /// Navigator for `page` under `base`; falls back to `base` itself if
    /// the page does not form a valid URL.
    pub fn at_page(base: &Url, page: &str) -> Self {
        let location = base.join(page).unwrap_or_else(|_| base.clone());
        Self::new(location)
    }

    /// Most recent navigation that has not been followed
    pub fn pending_navigation(&self) -> Option<&Url> {
        self.navigations.last()
    }

    pub fn navigations(&self) -> &[Url] {
        &self.navigations
    }

    pub fn replacements(&self) -> &[Url] {
        &self.replacements
    }
}

impl Navigator for SimulatedNavigator {
    fn current_url(&self) -> Url {
        self.location.clone()
    }

    fn navigate_to(&mut self, url: Url) {
        tracing::debug!(url = %url, "Navigation requested");
        self.navigations.push(url);
    }

    fn replace_url(&mut self, url: Url) {
        self.replacements.push(url.clone());
        self.location = url;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_handoff_replaces_location() {
        let mut nav = SimulatedNavigator::new(
            Url::parse("https://app.test/b.html?bp_tour_step=2&x=1").unwrap(),
        );
        assert_eq!(nav.read_handoff("bp_tour_step"), Some(2));

        nav.clear_handoff("bp_tour_step");
        assert_eq!(nav.current_url().as_str(), "https://app.test/b.html?x=1");
        assert_eq!(nav.read_handoff("bp_tour_step"), None);
        assert_eq!(nav.replacements().len(), 1);

        // idempotent
        nav.clear_handoff("bp_tour_step");
        assert_eq!(nav.replacements().len(), 1);
    }

    #[test]
    fn test_navigation_is_recorded_not_followed() {
        let base = Url::parse("https://app.test/").unwrap();
        let mut nav = SimulatedNavigator::at_page(&base, "a.html");
        assert_eq!(nav.current_page(), "a.html");

        nav.navigate_to(base.join("b.html").unwrap());
        assert_eq!(nav.current_page(), "a.html");
        assert_eq!(
            nav.pending_navigation().map(Url::as_str),
            Some("https://app.test/b.html")
        );
    }
}
