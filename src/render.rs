//! Presentation of a tour step.
//!
//! A step renders as three artifacts: a dimming overlay, a highlight on the
//! target element, and a popover with the step text and controls. The
//! [`Renderer`] port creates and removes them; [`RecordingRenderer`] keeps
//! them as a [`Scene`] that tests inspect and the terminal preview draws.

use serde::Serialize;

use crate::catalog::StepCatalog;
use crate::layout::{Point, Rect, Size};
use crate::resolver::Target;

/// CSS-equivalent popover width cap: `min(360px, 92vw)`
const POPOVER_MAX_WIDTH: i32 = 360;
const POPOVER_PADDING: i32 = 12;
const META_HEIGHT: i32 = 22;
const TITLE_HEIGHT: i32 = 26;
const BODY_LINE_HEIGHT: i32 = 19;
const ACTIONS_HEIGHT: i32 = 42;
const AVERAGE_CHAR_WIDTH: i32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PrimaryAction {
    Next,
    Finish,
}

impl PrimaryAction {
    pub fn label(&self) -> &'static str {
        match self {
            PrimaryAction::Next => "Next",
            PrimaryAction::Finish => "Finish",
        }
    }
}

/// Everything the popover shows for one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopoverView {
    pub step: usize,
    pub total: usize,
    pub title: String,
    pub body: String,
    pub back_enabled: bool,
    pub primary: PrimaryAction,
}

impl PopoverView {
    /// View for `step`; `None` when the index is out of range
    pub fn for_step(catalog: &StepCatalog, step: usize) -> Option<Self> {
        let descriptor = catalog.get(step)?;
        Some(Self {
            step,
            total: catalog.len(),
            title: descriptor.display_title().to_string(),
            body: descriptor.body.clone(),
            back_enabled: step > 0,
            primary: if catalog.is_last(step) {
                PrimaryAction::Finish
            } else {
                PrimaryAction::Next
            },
        })
    }

    /// "Step 2 of 5"
    pub fn meta(&self) -> String {
        format!("Step {} of {}", self.step + 1, self.total)
    }
}

/// Rendered size of a popover in a viewport.
///
/// Fixed-width box; height grows with the wrapped body text.
pub fn estimate_popover_size(view: &PopoverView, viewport: Size) -> Size {
    let width = POPOVER_MAX_WIDTH.min(viewport.width * 92 / 100).max(1);
    let chars_per_line = ((width - 2 * POPOVER_PADDING) / AVERAGE_CHAR_WIDTH).max(1) as usize;
    let body_lines = view
        .body
        .lines()
        .map(|line| line.chars().count().div_ceil(chars_per_line).max(1))
        .sum::<usize>() as i32;
    let height = 2 * POPOVER_PADDING
        + META_HEIGHT
        + TITLE_HEIGHT
        + body_lines * BODY_LINE_HEIGHT
        + ACTIONS_HEIGHT;
    Size::new(width, height)
}

/// Creates and removes render artifacts.
///
/// At most one overlay, one popover and one highlight exist at a time;
/// `clear` removes all of them and is safe to call when nothing is shown.
pub trait Renderer {
    fn clear(&mut self);

    fn show_overlay(&mut self);

    /// Mark `target` as highlighted and bring it into view
    fn highlight(&mut self, target: &Target);

    fn show_popover(&mut self, view: &PopoverView);

    fn place_popover(&mut self, at: Point);

    fn viewport(&self) -> Size;

    /// Laid-out popover size; `None` when no popover is shown
    fn popover_size(&self) -> Option<Size>;

    /// Viewport-relative bounds of a target after any scrolling
    fn bounds_of(&self, target: &Target) -> Rect {
        target.rect
    }

    /// Popover plus optional highlight for one step
    fn render(&mut self, view: &PopoverView, target: Option<&Target>) {
        if let Some(target) = target {
            self.highlight(target);
        }
        self.show_popover(view);
    }
}

/// The controller's handle on what it currently has on screen.
///
/// Created when a step starts rendering on this page and dropped, after the
/// renderer has been cleared, on every transition away from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderHandle {
    pub step: usize,
    pub generation: u64,
    pub target: Option<Target>,
    pub popover: bool,
    pub position: Option<Point>,
    /// Resolution retries that happened before the popover was shown
    pub retries: u32,
}

impl RenderHandle {
    pub fn overlay_only(step: usize, generation: u64) -> Self {
        Self {
            step,
            generation,
            target: None,
            popover: false,
            position: None,
            retries: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopoverScene {
    pub view: PopoverView,
    pub size: Size,
    pub position: Option<Point>,
}

/// Artifacts currently on screen
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Scene {
    pub overlay: bool,
    pub highlighted: Option<String>,
    pub highlight_rect: Option<Rect>,
    pub popover: Option<PopoverScene>,
    /// Vertical scroll offset of the page, in pixels
    pub scroll_y: i32,
}

/// Observable render events, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderEvent {
    Clear,
    Overlay,
    Highlight(String),
    Popover(usize),
    Place(Point),
}

/// Renderer that keeps a scene model instead of touching a real display
#[derive(Debug, Clone)]
pub struct RecordingRenderer {
    viewport: Size,
    scene: Scene,
    events: Vec<RenderEvent>,
}

impl RecordingRenderer {
    pub fn new(viewport: Size) -> Self {
        Self {
            viewport,
            scene: Scene::default(),
            events: Vec::new(),
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn events(&self) -> &[RenderEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<RenderEvent> {
        std::mem::take(&mut self.events)
    }

    /// Number of overlays and popovers currently on screen
    pub fn artifact_count(&self) -> usize {
        usize::from(self.scene.overlay) + usize::from(self.scene.popover.is_some())
    }
}

impl Default for RecordingRenderer {
    fn default() -> Self {
        Self::new(Size::new(1280, 800))
    }
}

impl Renderer for RecordingRenderer {
    fn clear(&mut self) {
        self.scene.overlay = false;
        self.scene.highlighted = None;
        self.scene.highlight_rect = None;
        self.scene.popover = None;
        self.events.push(RenderEvent::Clear);
    }

    fn show_overlay(&mut self) {
        self.scene.overlay = true;
        self.events.push(RenderEvent::Overlay);
    }

    fn highlight(&mut self, target: &Target) {
        // scrollIntoView({ block: "center" })
        let center = target.rect.y + target.rect.height / 2;
        self.scene.scroll_y = (center - self.viewport.height / 2).max(0);
        self.scene.highlighted = Some(target.label.clone());
        self.scene.highlight_rect = Some(self.bounds_of(target));
        self.events.push(RenderEvent::Highlight(target.label.clone()));
    }

    fn show_popover(&mut self, view: &PopoverView) {
        self.scene.popover = Some(PopoverScene {
            view: view.clone(),
            size: estimate_popover_size(view, self.viewport),
            position: None,
        });
        self.events.push(RenderEvent::Popover(view.step));
    }

    fn place_popover(&mut self, at: Point) {
        if let Some(popover) = self.scene.popover.as_mut() {
            popover.position = Some(at);
            self.events.push(RenderEvent::Place(at));
        }
    }

    fn viewport(&self) -> Size {
        self.viewport
    }

    fn popover_size(&self) -> Option<Size> {
        self.scene.popover.as_ref().map(|p| p.size)
    }

    fn bounds_of(&self, target: &Target) -> Rect {
        Rect {
            y: target.rect.y - self.scene.scroll_y,
            ..target.rect
        }
    }
}
