//! Cross-page tours over the file-backed store.
//!
//! Every "page load" builds a new controller; the only things that survive
//! are the state file and the URL, as in a browser.

use std::time::Duration;

use pagetour::catalog::{StepDescriptor, TourFile};
use pagetour::config::Config;
use pagetour::controller::{Phase, TourController};
use pagetour::layout::{Rect, Size};
use pagetour::navigator::{Navigator, SimulatedNavigator};
use pagetour::render::RecordingRenderer;
use pagetour::scheduler::VirtualClock;
use pagetour::session::{Action, SessionEvent, TourSession};
use pagetour::site::{ElementSpec, PageSpec, Site};
use pagetour::state::{JsonFileStore, StateStore, TourState};
use tempfile::TempDir;
use url::Url;

fn tour() -> TourFile {
    TourFile {
        steps: vec![
            StepDescriptor::new("index.html", Some("#hero"), "Welcome").with_body("Start here"),
            StepDescriptor::new("reports.html", Some("table.summary"), "Reports"),
            StepDescriptor::new("reports.html", Some("#export"), "Export"),
            StepDescriptor::new("settings.html", None, "Settings"),
        ],
        pages: vec![
            PageSpec {
                name: "index.html".to_string(),
                title: Some("Home".to_string()),
                elements: vec![ElementSpec::new("section")
                    .id("hero")
                    .rect(Rect::new(0, 0, 1280, 300))],
            },
            PageSpec {
                name: "reports.html".to_string(),
                title: Some("Reports".to_string()),
                elements: vec![
                    ElementSpec::new("table")
                        .class("summary")
                        .appears_after(320)
                        .rect(Rect::new(20, 120, 800, 400)),
                    ElementSpec::new("button")
                        .id("export")
                        .rect(Rect::new(1100, 60, 120, 32)),
                ],
            },
        ],
    }
}

fn store(dir: &TempDir) -> JsonFileStore {
    JsonFileStore::new(dir.path(), "bpTourState")
}

#[test]
fn test_state_file_carries_tour_between_controllers() {
    let dir = TempDir::new().unwrap();
    let tour = tour();
    let site = Site::new(tour.pages.clone());
    let clock = VirtualClock::new();

    let home = Url::parse("https://site.local/index.html").unwrap();
    let mut first = TourController::new(
        tour.catalog(),
        store(&dir),
        SimulatedNavigator::new(home),
        site.load("index.html", clock.clone()),
        RecordingRenderer::new(Size::new(1280, 800)),
        clock.clone(),
    );
    first.start();
    first.next();

    assert!(matches!(first.phase(), Phase::AwaitingPage { step: 1, .. }));
    let destination = first.navigator().pending_navigation().unwrap().clone();
    assert_eq!(
        destination.as_str(),
        "https://site.local/reports.html?bp_tour_step=1"
    );
    let on_disk = std::fs::read_to_string(dir.path().join("bpTourState.json")).unwrap();
    assert_eq!(on_disk, r#"{"active":true,"step":1}"#);
    drop(first);

    let mut second = TourController::new(
        tour.catalog(),
        store(&dir),
        SimulatedNavigator::new(destination),
        site.load("reports.html", clock.clone()),
        RecordingRenderer::new(Size::new(1280, 800)),
        clock,
    );
    second.boot();
    assert_eq!(
        second.navigator().current_url().as_str(),
        "https://site.local/reports.html"
    );

    second.settle(Duration::from_secs(5));
    let handle = second.artifacts().unwrap();
    assert_eq!(handle.step, 1);
    assert_eq!(handle.target.as_ref().unwrap().label, "table.summary");
    // resume at 50ms, table at 320ms: attempts at 50..=350
    assert_eq!(handle.retries, 3);
    assert_eq!(store(&dir).read(), TourState::active_at(1));
}

#[test]
fn test_session_walks_the_whole_tour() {
    let dir = TempDir::new().unwrap();
    let mut session =
        TourSession::open(&tour(), &Config::default(), store(&dir), None).unwrap();
    session.apply(Action::Start);
    session.settle();

    for _ in 0..3 {
        session.apply(Action::Next);
        session.settle();
    }
    assert_eq!(
        session.current_url().as_str(),
        "https://site.local/settings.html"
    );
    assert_eq!(session.controller().phase().showing_step(), Some(3));
    assert_eq!(store(&dir).read(), TourState::active_at(3));

    session.apply(Action::Next);
    assert_eq!(store(&dir).read(), TourState::inactive());

    let navigations = session
        .events()
        .iter()
        .filter(|e| matches!(e, SessionEvent::Navigated { .. }))
        .count();
    assert_eq!(navigations, 2);
    assert_eq!(
        session.events().last(),
        Some(&SessionEvent::Finished { skipped: false })
    );
}

#[test]
fn test_back_across_pages_returns_to_previous_page() {
    let dir = TempDir::new().unwrap();
    let mut session =
        TourSession::open(&tour(), &Config::default(), store(&dir), None).unwrap();
    session.apply(Action::Start);
    session.apply(Action::Next);
    session.settle();
    assert_eq!(session.controller().phase().showing_step(), Some(1));

    session.apply(Action::Back);
    session.settle();
    assert_eq!(
        session.current_url().as_str(),
        "https://site.local/index.html"
    );
    assert_eq!(session.controller().phase().showing_step(), Some(0));
    assert_eq!(session.scene().highlighted.as_deref(), Some("section#hero"));
}

#[test]
fn test_reopening_a_page_resumes_persisted_progress() {
    let dir = TempDir::new().unwrap();
    let mut writer = store(&dir);
    writer.write(TourState::active_at(2));

    let mut session = TourSession::open(
        &tour(),
        &Config::default(),
        store(&dir),
        Some("reports.html"),
    )
    .unwrap();
    session.settle();
    assert_eq!(session.controller().phase().showing_step(), Some(2));
    assert_eq!(session.scene().highlighted.as_deref(), Some("button#export"));

    // Resuming on the wrong page sends the visitor to the right one
    writer.write(TourState::active_at(0));
    session.apply(Action::Reload);
    session.settle();
    assert_eq!(
        session.current_url().as_str(),
        "https://site.local/index.html"
    );
    assert_eq!(session.controller().phase().showing_step(), Some(0));
}

#[test]
fn test_skip_clears_state_file() {
    let dir = TempDir::new().unwrap();
    let mut session =
        TourSession::open(&tour(), &Config::default(), store(&dir), None).unwrap();
    session.apply(Action::Start);
    session.apply(Action::Skip);

    assert_eq!(session.controller().phase(), &Phase::Idle);
    assert_eq!(store(&dir).read(), TourState::inactive());
    assert_eq!(
        session.events().last(),
        Some(&SessionEvent::Finished { skipped: true })
    );

    // Nothing to resume on the next load
    session.apply(Action::Reload);
    session.settle();
    assert_eq!(session.controller().phase(), &Phase::Idle);
}

#[test]
fn test_demo_tour_walks_to_completion() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/site_tour.toml");
    let tour = TourFile::load(&path).unwrap();
    assert_eq!(tour.steps.len(), 5);

    let dir = TempDir::new().unwrap();
    let mut session =
        TourSession::open(&tour, &Config::default(), store(&dir), None).unwrap();
    session.apply(Action::Start);
    session.settle();
    assert_eq!(session.scene().highlighted.as_deref(), Some("input#search"));

    for _ in 0..tour.steps.len() {
        session.apply(Action::Next);
        session.settle();
    }
    assert_eq!(session.controller().phase(), &Phase::Idle);
    assert_eq!(store(&dir).read(), TourState::inactive());

    let shown: Vec<usize> = session
        .events()
        .iter()
        .filter_map(|e| match e {
            SessionEvent::StepShown { step, .. } => Some(*step),
            _ => None,
        })
        .collect();
    assert_eq!(shown, vec![0, 1, 2, 3, 4]);
}
