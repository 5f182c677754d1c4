//! The tour state machine.
//!
//! [`TourController`] decides, for a requested step, whether to render it on
//! the current page, navigate to the page it belongs to, or end the tour.
//! All side effects go through four ports: the [`StateStore`] (durable
//! progress), the [`Navigator`] (location and handoff), the
//! [`TargetResolver`] (element lookup) and the [`Renderer`].
//!
//! Ordering guarantees:
//! - progress is persisted before any navigation is issued
//! - the renderer is cleared before anything new is shown
//! - deferred work scheduled under an older generation never runs

use std::time::Duration;

use crate::catalog::StepCatalog;
use crate::config::{LayoutConfig, TourSettings};
use crate::handoff;
use crate::layout::place_popover;
use crate::navigator::Navigator;
use crate::render::{PopoverView, RenderHandle, Renderer};
use crate::resolver::TargetResolver;
use crate::scheduler::{ScheduledTask, TaskKind, TaskQueue, VirtualClock};
use crate::state::{StateStore, TourState};

/// Passed to the completion hook when a tour ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub skipped: bool,
}

/// Caller-supplied hook run when the tour ends. Errors are logged and dropped.
pub type CompletionHook = Box<dyn FnMut(Completion) -> anyhow::Result<()>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// No tour on this page
    Idle,
    /// The step lives on another page; a navigation has been issued
    AwaitingPage { step: usize, url: String },
    /// Rendering `step`; `attempt > 0` while waiting for its target
    Showing { step: usize, attempt: u32 },
    /// Entered by `finish` while the hook runs, then replaced by `Idle`
    Finished { skipped: bool },
}

impl Phase {
    pub fn showing_step(&self) -> Option<usize> {
        match self {
            Phase::Showing { step, .. } => Some(*step),
            _ => None,
        }
    }
}

pub struct TourController<S, N, R, D> {
    catalog: StepCatalog,
    store: S,
    navigator: N,
    resolver: R,
    renderer: D,
    settings: TourSettings,
    layout: LayoutConfig,
    tasks: TaskQueue,
    generation: u64,
    phase: Phase,
    artifacts: Option<RenderHandle>,
    on_complete: Option<CompletionHook>,
}

impl<S, N, R, D> TourController<S, N, R, D>
where
    S: StateStore,
    N: Navigator,
    R: TargetResolver,
    D: Renderer,
{
    pub fn new(
        catalog: StepCatalog,
        store: S,
        navigator: N,
        resolver: R,
        renderer: D,
        clock: VirtualClock,
    ) -> Self {
        Self {
            catalog,
            store,
            navigator,
            resolver,
            renderer,
            settings: TourSettings::default(),
            layout: LayoutConfig::default(),
            tasks: TaskQueue::new(clock),
            generation: 0,
            phase: Phase::Idle,
            artifacts: None,
            on_complete: None,
        }
    }

    pub fn with_settings(mut self, settings: TourSettings, layout: LayoutConfig) -> Self {
        self.settings = settings;
        self.layout = layout;
        self
    }

    pub fn on_complete<F>(mut self, hook: F) -> Self
    where
        F: FnMut(Completion) -> anyhow::Result<()> + 'static,
    {
        self.on_complete = Some(Box::new(hook));
        self
    }

    // ─── Accessors ──────────────────────────────────────────────────────────

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn catalog(&self) -> &StepCatalog {
        &self.catalog
    }

    pub fn is_enabled(&self) -> bool {
        !self.catalog.is_empty()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn renderer(&self) -> &D {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut D {
        &mut self.renderer
    }

    pub fn artifacts(&self) -> Option<&RenderHandle> {
        self.artifacts.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn tasks(&self) -> &TaskQueue {
        &self.tasks
    }

    pub fn clock(&self) -> &VirtualClock {
        self.tasks.clock()
    }

    // ─── Page load ──────────────────────────────────────────────────────────

    /// Load-time entry point.
    ///
    /// Consumes a URL handoff (persisting it and stripping it from the
    /// location), then schedules a resume if the persisted tour is active.
    /// A handoff parameter is stripped even when its value is rejected.
    pub fn boot(&mut self) {
        if !self.is_enabled() {
            tracing::debug!("Tour has no steps, staying disabled");
            return;
        }

        let param = self.settings.handoff_param.clone();
        match self.navigator.read_handoff(&param) {
            Some(step) => {
                tracing::info!(step, page = %self.navigator.current_page(), "Consuming tour handoff");
                self.store.write(TourState::active_at(step));
            }
            None if handoff::has_handoff(&self.navigator.current_url(), &param) => {
                tracing::warn!(param = %param, "Ignoring tour handoff with a non-numeric value");
            }
            None => {}
        }
        self.navigator.clear_handoff(&param);

        if self.store.read().active {
            let delay = self.settings.resume_delay();
            self.tasks
                .schedule(delay, self.generation, TaskKind::Resume);
        }
    }

    // ─── Control surface ────────────────────────────────────────────────────

    pub fn start(&mut self) {
        if !self.is_enabled() {
            return;
        }
        tracing::info!(steps = self.catalog.len(), "Starting tour");
        self.show_step(0, 0);
    }

    /// Continue a persisted tour; no-op unless the stored record is active
    pub fn resume(&mut self) {
        if !self.is_enabled() {
            return;
        }
        let state = self.store.read();
        if !state.active {
            tracing::debug!("No active tour to resume");
            return;
        }
        let step = state.clamped_step(self.catalog.len());
        if step != state.step {
            tracing::debug!(stored = state.step, step, "Clamped stored tour step");
        }
        self.show_step(step, 0);
    }

    pub fn next(&mut self) {
        let Some(step) = self.phase.showing_step() else {
            tracing::debug!(phase = ?self.phase, "Ignoring next outside a shown step");
            return;
        };
        if self.catalog.is_last(step) {
            self.finish(false);
        } else {
            self.show_step(step + 1, 0);
        }
    }

    pub fn back(&mut self) {
        match self.phase.showing_step() {
            Some(step) if step > 0 => self.show_step(step - 1, 0),
            _ => tracing::debug!(phase = ?self.phase, "Ignoring back"),
        }
    }

    pub fn skip(&mut self) {
        if self.phase.showing_step().is_some() {
            self.finish(true);
        }
    }

    /// End the tour as skipped. Safe to call repeatedly or with no tour
    /// running; the completion hook only runs if a tour was active.
    pub fn cancel(&mut self) {
        let active = !matches!(self.phase, Phase::Idle) || self.store.read().active;
        if active {
            self.finish(true);
        } else {
            self.generation += 1;
            self.tasks.cancel_all();
            self.teardown();
            self.store.write(TourState::inactive());
        }
    }

    // ─── Transitions ────────────────────────────────────────────────────────

    /// Show step `index`, resolving its target on attempt `attempt`.
    ///
    /// An index outside the catalog finishes the tour. A step on another
    /// page persists progress and navigates there.
    pub fn show_step(&mut self, index: usize, attempt: u32) {
        self.generation += 1;

        let Some(step) = self.catalog.get(index) else {
            tracing::debug!(index, "Step past the end of the tour, finishing");
            self.finish(false);
            return;
        };
        let page = step.page.clone();
        let selector = step.selector().map(str::to_string);

        if !handoff::is_current_page(&self.navigator.current_url(), &page) {
            self.navigate_for_step(index, &page);
            return;
        }

        if attempt == 0 {
            self.tasks.cancel_all();
            self.teardown();
            self.store.write(TourState::active_at(index));
            self.renderer.show_overlay();
            self.artifacts = Some(RenderHandle::overlay_only(index, self.generation));
        }

        let target = selector
            .as_deref()
            .and_then(|selector| self.resolver.resolve(selector));

        if selector.is_some() && target.is_none() && attempt < self.settings.max_resolve_attempts
        {
            tracing::trace!(step = index, attempt, "Tour target not present yet, retrying");
            self.tasks.schedule(
                self.settings.retry_interval(),
                self.generation,
                TaskKind::RetryShow {
                    step: index,
                    attempt: attempt + 1,
                },
            );
            self.phase = Phase::Showing {
                step: index,
                attempt,
            };
            return;
        }

        if selector.is_some() && target.is_none() {
            tracing::warn!(
                step = index,
                selector = selector.as_deref().unwrap_or_default(),
                attempts = attempt,
                "Tour target never appeared, showing unanchored popover"
            );
        }

        let Some(view) = PopoverView::for_step(&self.catalog, index) else {
            return;
        };
        self.renderer.render(&view, target.as_ref());
        self.artifacts = Some(RenderHandle {
            step: index,
            generation: self.generation,
            target,
            popover: true,
            position: None,
            retries: attempt,
        });
        self.tasks.schedule(
            self.settings.position_delay(),
            self.generation,
            TaskKind::PositionPopover,
        );
        self.phase = Phase::Showing {
            step: index,
            attempt: 0,
        };
        tracing::debug!(step = index, page = %page, "Showing tour step");
    }

    fn navigate_for_step(&mut self, index: usize, page: &str) {
        let current = self.navigator.current_url();
        let Some(url) = handoff::handoff_url(&current, page, &self.settings.handoff_param, index)
        else {
            self.finish(false);
            return;
        };

        self.tasks.cancel_all();
        self.teardown();
        self.store.write(TourState::active_at(index));
        tracing::info!(step = index, to = %url, "Navigating to tour step page");
        self.phase = Phase::AwaitingPage {
            step: index,
            url: url.to_string(),
        };
        self.navigator.navigate_to(url);
    }

    /// End the tour: clear the screen, reset progress, run the hook
    pub fn finish(&mut self, skipped: bool) {
        self.generation += 1;
        self.tasks.cancel_all();
        self.teardown();
        self.store.write(TourState::inactive());
        self.phase = Phase::Finished { skipped };
        tracing::info!(skipped, "Tour finished");

        if let Some(hook) = self.on_complete.as_mut() {
            if let Err(err) = hook(Completion { skipped }) {
                tracing::warn!(error = %err, "Tour completion hook failed");
            }
        }
        self.phase = Phase::Idle;
    }

    fn teardown(&mut self) {
        self.artifacts = None;
        self.renderer.clear();
    }

    fn position_popover(&mut self) {
        let Some(handle) = self.artifacts.as_mut() else {
            return;
        };
        if !handle.popover {
            return;
        }
        let Some(size) = self.renderer.popover_size() else {
            return;
        };
        let bounds = handle
            .target
            .as_ref()
            .map(|target| self.renderer.bounds_of(target));
        let point = place_popover(self.renderer.viewport(), size, bounds, self.layout);
        self.renderer.place_popover(point);
        handle.position = Some(point);
    }

    // ─── Deferred work ──────────────────────────────────────────────────────

    fn dispatch(&mut self, task: ScheduledTask) {
        if task.generation != self.generation {
            tracing::trace!(kind = ?task.kind, "Dropping superseded tour task");
            return;
        }
        match task.kind {
            TaskKind::Resume => self.resume(),
            TaskKind::RetryShow { step, attempt } => self.show_step(step, attempt),
            TaskKind::PositionPopover => self.position_popover(),
        }
    }

    /// Run every task that is due at the current clock time
    pub fn run_due(&mut self) -> usize {
        let mut ran = 0;
        while let Some(task) = self.tasks.pop_due() {
            self.dispatch(task);
            ran += 1;
        }
        ran
    }

    /// Advance the clock by `by`, running each task at its own due time
    pub fn advance(&mut self, by: Duration) -> usize {
        let until = self.clock().now() + by;
        let mut ran = 0;
        while let Some(due) = self.tasks.next_due() {
            if due > until {
                break;
            }
            self.clock().set(due);
            ran += self.run_due();
        }
        self.clock().set(until);
        ran
    }

    /// Run until no work is pending or `limit` of virtual time has passed
    pub fn settle(&mut self, limit: Duration) -> usize {
        let deadline = self.clock().now() + limit;
        let mut ran = self.run_due();
        while let Some(due) = self.tasks.next_due() {
            if due > deadline {
                break;
            }
            self.clock().set(due);
            ran += self.run_due();
        }
        ran
    }
}
