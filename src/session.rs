//! Simulated browsing session.
//!
//! Hosts a tour over a [`Site`]: every page load builds a fresh controller
//! (as a real page would re-run its script), sharing only the durable store
//! and the clock with the previous page. Navigations issued by the
//! controller are followed by loading the destination URL.

use std::cell::RefCell;
use std::rc::Rc;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::catalog::{StepCatalog, TourFile};
use crate::config::Config;
use crate::controller::{Completion, Phase, TourController};
use crate::error::TourError;
use crate::handoff;
use crate::layout::Size;
use crate::navigator::{Navigator, SimulatedNavigator};
use crate::render::{RecordingRenderer, Scene};
use crate::scheduler::VirtualClock;
use crate::site::{PageDocument, Site};
use crate::state::StateStore;

/// Origin every simulated page lives under
pub const SITE_ORIGIN: &str = "https://site.local/";

/// Navigations followed in one settle before giving up
const MAX_HOPS: usize = 16;

/// Upper bound on virtual time spent settling after one action
const SETTLE_LIMIT: Duration = Duration::from_secs(10);

pub type PageController<S> =
    TourController<S, SimulatedNavigator, PageDocument, RecordingRenderer>;

/// Something a visitor can do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Resume,
    Next,
    Back,
    Skip,
    Cancel,
    /// Reload the current page
    Reload,
    Wait(Duration),
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "start" => Ok(Action::Start),
            "resume" => Ok(Action::Resume),
            "next" | "n" => Ok(Action::Next),
            "back" | "b" => Ok(Action::Back),
            "skip" | "s" => Ok(Action::Skip),
            "cancel" => Ok(Action::Cancel),
            "reload" => Ok(Action::Reload),
            other => other
                .strip_prefix("wait:")
                .and_then(|ms| ms.parse::<u64>().ok())
                .map(|ms| Action::Wait(Duration::from_millis(ms)))
                .ok_or_else(|| format!("unknown action '{other}'")),
        }
    }
}

/// A line of session history
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    PageLoaded { url: String },
    StepShown { step: usize, target: Option<String> },
    Navigated { step: usize, url: String },
    Finished { skipped: bool },
}

impl std::fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionEvent::PageLoaded { url } => write!(f, "load     {url}"),
            SessionEvent::StepShown {
                step,
                target: Some(target),
            } => write!(f, "show     step {} on {target}", step + 1),
            SessionEvent::StepShown { step, target: None } => {
                write!(f, "show     step {} (no target)", step + 1)
            }
            SessionEvent::Navigated { step, url } => {
                write!(f, "navigate step {} -> {url}", step + 1)
            }
            SessionEvent::Finished { skipped: true } => write!(f, "finish   skipped"),
            SessionEvent::Finished { skipped: false } => write!(f, "finish   completed"),
        }
    }
}

pub struct TourSession<S: StateStore + Clone + 'static> {
    site: Site,
    catalog: StepCatalog,
    config: Config,
    store: S,
    clock: VirtualClock,
    viewport: Size,
    controller: PageController<S>,
    completions: Rc<RefCell<Vec<Completion>>>,
    events: Vec<SessionEvent>,
    last_shown: Option<(usize, u64)>,
}

impl<S: StateStore + Clone + 'static> TourSession<S> {
    /// Open `page` (default: the first step's page) and run its load-time boot
    pub fn open(
        tour: &TourFile,
        config: &Config,
        store: S,
        page: Option<&str>,
    ) -> Result<Self, TourError> {
        let catalog = tour.catalog();
        let start_page = page
            .map(str::to_string)
            .or_else(|| catalog.get(0).map(|s| s.page.clone()))
            .unwrap_or_else(|| handoff::INDEX_PAGE.to_string());
        let url = Url::parse(SITE_ORIGIN)?.join(&start_page)?;

        let clock = VirtualClock::new();
        let viewport = Size::new(config.preview.viewport_width, config.preview.viewport_height);
        let completions = Rc::new(RefCell::new(Vec::new()));
        let site = Site::new(tour.pages.clone());
        let controller = Self::build_controller(
            &site,
            &catalog,
            config,
            store.clone(),
            clock.clone(),
            viewport,
            &completions,
            url.clone(),
        );

        let mut session = Self {
            site,
            catalog,
            config: config.clone(),
            store,
            clock,
            viewport,
            controller,
            completions,
            events: vec![SessionEvent::PageLoaded {
                url: url.to_string(),
            }],
            last_shown: None,
        };
        session.controller.boot();
        Ok(session)
    }

    #[allow(clippy::too_many_arguments)]
    fn build_controller(
        site: &Site,
        catalog: &StepCatalog,
        config: &Config,
        store: S,
        clock: VirtualClock,
        viewport: Size,
        completions: &Rc<RefCell<Vec<Completion>>>,
        url: Url,
    ) -> PageController<S> {
        let document = site.load(&handoff::page_name(&url), clock.clone());
        let sink = Rc::clone(completions);
        TourController::new(
            catalog.clone(),
            store,
            SimulatedNavigator::new(url),
            document,
            RecordingRenderer::new(viewport),
            clock,
        )
        .with_settings(config.tour.clone(), config.layout)
        .on_complete(move |completion| {
            sink.borrow_mut().push(completion);
            Ok(())
        })
    }

    /// Full page load of `url`: a fresh controller that boots from storage
    pub fn load(&mut self, url: Url) {
        tracing::debug!(url = %url, "Loading page");
        self.controller = Self::build_controller(
            &self.site,
            &self.catalog,
            &self.config,
            self.store.clone(),
            self.clock.clone(),
            self.viewport,
            &self.completions,
            url.clone(),
        );
        self.last_shown = None;
        self.events.push(SessionEvent::PageLoaded {
            url: url.to_string(),
        });
        self.controller.boot();
    }

    /// Follow a navigation the controller issued; returns whether one happened
    pub fn follow_navigation(&mut self) -> bool {
        let Phase::AwaitingPage { step, .. } = self.controller.phase().clone() else {
            return false;
        };
        let Some(url) = self.controller.navigator().pending_navigation().cloned() else {
            return false;
        };
        self.events.push(SessionEvent::Navigated {
            step,
            url: url.to_string(),
        });
        self.load(url);
        true
    }

    pub fn apply(&mut self, action: Action) {
        tracing::debug!(?action, "Applying action");
        match action {
            Action::Start => self.controller.start(),
            Action::Resume => self.controller.resume(),
            Action::Next => self.controller.next(),
            Action::Back => self.controller.back(),
            Action::Skip => self.controller.skip(),
            Action::Cancel => self.controller.cancel(),
            Action::Reload => {
                let url = self.controller.navigator().current_url();
                self.load(url);
            }
            Action::Wait(by) => {
                self.controller.advance(by);
            }
        }
        self.observe();
    }

    /// Advance virtual time by `by`, following any navigation it triggers
    pub fn tick(&mut self, by: Duration) {
        self.controller.advance(by);
        self.observe();
        if self.follow_navigation() {
            self.observe();
        }
    }

    /// Run pending work and follow navigations until the tour is quiet
    pub fn settle(&mut self) {
        for _ in 0..MAX_HOPS {
            self.controller.settle(SETTLE_LIMIT);
            self.observe();
            if !self.follow_navigation() {
                return;
            }
        }
        tracing::warn!(hops = MAX_HOPS, "Tour kept navigating, stopped following");
    }

    fn observe(&mut self) {
        let completed: Vec<Completion> = self.completions.borrow_mut().drain(..).collect();
        for completion in completed {
            self.events.push(SessionEvent::Finished {
                skipped: completion.skipped,
            });
            self.last_shown = None;
        }

        let Some(handle) = self.controller.artifacts() else {
            return;
        };
        if !handle.popover || self.last_shown == Some((handle.step, handle.generation)) {
            return;
        }
        self.last_shown = Some((handle.step, handle.generation));
        self.events.push(SessionEvent::StepShown {
            step: handle.step,
            target: handle.target.as_ref().map(|t| t.label.clone()),
        });
    }

    pub fn controller(&self) -> &PageController<S> {
        &self.controller
    }

    pub fn scene(&self) -> &Scene {
        self.controller.renderer().scene()
    }

    pub fn document(&self) -> &PageDocument {
        self.controller.resolver()
    }

    pub fn current_url(&self) -> Url {
        self.controller.navigator().current_url()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    pub fn clock(&self) -> &VirtualClock {
        &self.clock
    }

    /// Viewport every page load renders into
    pub fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn events(&self) -> &[SessionEvent] {
        &self.events
    }
}
