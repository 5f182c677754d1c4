//! One-shot URL step handoff.
//!
//! Before a cross-page navigation the target step index is written into a
//! query parameter of the destination URL. The destination page reads it
//! once on load and strips it with a history replacement, so refreshes,
//! bookmarks and back/forward navigation never re-trigger it.

use url::Url;

/// Page identifier used when the path has no final segment
pub const INDEX_PAGE: &str = "index.html";

/// Page identifier of a URL: its last path segment, or `index.html`
pub fn page_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .unwrap_or(INDEX_PAGE)
        .to_string()
}

/// Whether a step declared for `page` belongs to the page at `current`.
///
/// Pages are identified by final path segment, so `reports/q1.html` and
/// `q1.html` both match a location ending in `/q1.html`.
pub fn is_current_page(current: &Url, page: &str) -> bool {
    let declared = current
        .join(page)
        .map(|url| page_name(&url))
        .unwrap_or_else(|_| page.to_string());
    declared == page_name(current)
}

/// URL of `page` resolved against `current`, carrying `step` in `param`.
///
/// Query parameters already present on `page` are kept; an existing
/// `param` is replaced rather than duplicated.
pub fn handoff_url(current: &Url, page: &str, param: &str, step: usize) -> Option<Url> {
    let mut url = match current.join(page) {
        Ok(url) => url,
        Err(err) => {
            tracing::warn!(page, error = %err, "Cannot build navigation URL for tour step");
            return None;
        }
    };
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != param)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(param, &step.to_string());
    Some(url)
}

/// Whether `url` carries `param` at all, whatever its value
pub fn has_handoff(url: &Url, param: &str) -> bool {
    url.query_pairs().any(|(key, _)| key == param)
}

/// Step index carried by `url`, if any.
///
/// Any finite number is accepted, floored, with negatives mapped to 0
/// (`"3"`, `" 3 "`, `"1.5"` reads as 1, `"-1"` as 0). Empty and non-numeric
/// values read as absent.
pub fn read_handoff(url: &Url, param: &str) -> Option<usize> {
    let (_, raw) = url.query_pairs().find(|(key, _)| key == param)?;
    parse_step(&raw)
}

fn parse_step(raw: &str) -> Option<usize> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(step) = raw.parse::<usize>() {
        return Some(step);
    }
    let number = raw.parse::<f64>().ok().filter(|n| n.is_finite())?;
    // float to int casts saturate
    Some(number.max(0.0).floor() as usize)
}

/// `url` without `param`, or `None` when it carries no handoff.
///
/// Other query parameters (in order) and the fragment are preserved; a
/// query left empty is removed entirely.
pub fn strip_handoff(url: &Url, param: &str) -> Option<Url> {
    if !has_handoff(url, param) {
        return None;
    }
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != param)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut stripped = url.clone();
    if kept.is_empty() {
        stripped.set_query(None);
    } else {
        stripped.query_pairs_mut().clear().extend_pairs(kept);
    }
    Some(stripped)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAM: &str = "bp_tour_step";

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_page_name() {
        assert_eq!(page_name(&url("https://app.test/docs/a.html")), "a.html");
        assert_eq!(page_name(&url("https://app.test/docs/")), "index.html");
        assert_eq!(page_name(&url("https://app.test")), "index.html");
        assert_eq!(page_name(&url("https://app.test/b.html?x=1#top")), "b.html");
    }

    #[test]
    fn test_is_current_page() {
        let current = url("https://app.test/docs/reports/q1.html?x=1");
        assert!(is_current_page(&current, "q1.html"));
        assert!(is_current_page(&current, "reports/q1.html"));
        assert!(is_current_page(&current, "/elsewhere/q1.html"));
        assert!(!is_current_page(&current, "q2.html"));
        assert!(is_current_page(&url("https://app.test/"), "index.html"));
    }

    #[test]
    fn test_handoff_url_resolves_relative_page() {
        let current = url("https://app.test/docs/a.html?theme=dark#intro");
        let next = handoff_url(&current, "b.html", PARAM, 3).unwrap();
        assert_eq!(next.path(), "/docs/b.html");
        assert_eq!(read_handoff(&next, PARAM), Some(3));
        assert_eq!(next.fragment(), None);
        assert!(!next.query_pairs().any(|(k, _)| k == "theme"));
    }

    #[test]
    fn test_handoff_url_replaces_existing_param() {
        let current = url("https://app.test/a.html");
        let next = handoff_url(&current, "b.html?tab=2&bp_tour_step=9", PARAM, 1).unwrap();
        let pairs: Vec<_> = next.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("tab".to_string(), "2".to_string()),
                (PARAM.to_string(), "1".to_string())
            ]
        );
    }

    #[test]
    fn test_read_handoff_values() {
        let read = |q: &str| read_handoff(&url(&format!("https://app.test/a.html?{q}")), PARAM);
        assert_eq!(read("bp_tour_step=2"), Some(2));
        assert_eq!(read("bp_tour_step=%202%20"), Some(2));
        assert_eq!(read("bp_tour_step=4.0"), Some(4));
        assert_eq!(read("bp_tour_step="), None);
        assert_eq!(read("bp_tour_step=abc"), None);
        assert_eq!(read("bp_tour_step=inf"), None);
        assert_eq!(read("bp_tour_step=NaN"), None);
        assert_eq!(read("other=1"), None);
    }

    #[test]
    fn test_read_handoff_floors_and_clamps_numbers() {
        let read = |q: &str| read_handoff(&url(&format!("https://app.test/a.html?{q}")), PARAM);
        assert_eq!(read("bp_tour_step=-1"), Some(0));
        assert_eq!(read("bp_tour_step=-0.5"), Some(0));
        assert_eq!(read("bp_tour_step=1.5"), Some(1));
        assert_eq!(read("bp_tour_step=2e1"), Some(20));
    }

    #[test]
    fn test_has_handoff_ignores_value() {
        assert!(has_handoff(&url("https://app.test/a.html?bp_tour_step=oops"), PARAM));
        assert!(has_handoff(&url("https://app.test/a.html?bp_tour_step="), PARAM));
        assert!(!has_handoff(&url("https://app.test/a.html?step=1"), PARAM));
    }

    #[test]
    fn test_strip_handoff_preserves_rest() {
        let stripped = strip_handoff(
            &url("https://app.test/b.html?a=1&bp_tour_step=3&b=2#section"),
            PARAM,
        )
        .unwrap();
        assert_eq!(stripped.as_str(), "https://app.test/b.html?a=1&b=2#section");
    }

    #[test]
    fn test_strip_handoff_drops_empty_query() {
        let stripped = strip_handoff(&url("https://app.test/b.html?bp_tour_step=3"), PARAM).unwrap();
        assert_eq!(stripped.as_str(), "https://app.test/b.html");
    }

    #[test]
    fn test_strip_handoff_absent_is_noop() {
        assert!(strip_handoff(&url("https://app.test/b.html?a=1"), PARAM).is_none());
    }
}
