//! Popover placement.
//!
//! Coordinates are viewport pixels with the origin at the top-left corner.
//! Targets may sit partly outside the viewport, so everything is signed.

use serde::{Deserialize, Serialize};

use crate::config::LayoutConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// Axis-aligned box, the analogue of a DOM bounding client rect
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn left(&self) -> i32 {
        self.x
    }

    pub fn top(&self) -> i32 {
        self.y
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn at(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }
}

/// Where the popover's top-left corner goes.
///
/// With a target: directly below it when the popover fits above the bottom
/// padding, otherwise above it (never closer than `padding` to the top).
/// Horizontally aligned with the target's left edge, kept within the
/// padded viewport. When the viewport is too narrow for the padding the
/// left edge is pinned to 0. Without a target: centered.
pub fn place_popover(
    viewport: Size,
    popover: Size,
    target: Option<Rect>,
    layout: LayoutConfig,
) -> Point {
    let pad = layout.padding;

    let Some(rect) = target else {
        return Point {
            x: pad.max((viewport.width - popover.width).div_euclid(2)),
            y: pad.max((viewport.height - popover.height).div_euclid(2)),
        };
    };

    let below = rect.bottom() + layout.margin;
    let above = rect.top() - popover.height - layout.margin;
    let y = if below + popover.height <= viewport.height - pad {
        below
    } else {
        pad.max(above)
    };
    let x = (viewport.width - popover.width - pad)
        .min(pad.max(rect.left()))
        .max(0);

    Point { x, y }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Size = Size::new(1000, 800);
    const POPOVER: Size = Size::new(360, 200);

    fn place(target: Option<Rect>) -> Point {
        place_popover(VIEWPORT, POPOVER, target, LayoutConfig::default())
    }

    #[test]
    fn test_centered_without_target() {
        assert_eq!(place(None), Point { x: 320, y: 300 });
    }

    #[test]
    fn test_centered_popover_larger_than_viewport_keeps_padding() {
        let point = place_popover(
            Size::new(300, 150),
            POPOVER,
            None,
            LayoutConfig::default(),
        );
        assert_eq!(point, Point { x: 12, y: 12 });
    }

    #[test]
    fn test_below_target_when_it_fits() {
        let point = place(Some(Rect::new(100, 50, 200, 40)));
        assert_eq!(point, Point { x: 100, y: 100 });
    }

    #[test]
    fn test_above_target_near_bottom() {
        let point = place(Some(Rect::new(100, 600, 200, 40)));
        // below would end at 850 > 788
        assert_eq!(point.y, 600 - 200 - 10);
    }

    #[test]
    fn test_fits_exactly_at_bottom_padding() {
        // below = 578, 578 + 200 = 778 <= 788
        let point = place(Some(Rect::new(0, 548, 10, 20)));
        assert_eq!(point.y, 578);
        // below = 589, 589 + 200 = 789 > 788
        let point = place(Some(Rect::new(0, 559, 10, 20)));
        assert_eq!(point.y, 559 - 210);
    }

    #[test]
    fn test_above_never_crosses_top_padding() {
        let tall = Rect::new(100, 40, 200, 700);
        assert_eq!(place(Some(tall)).y, 12);
    }

    #[test]
    fn test_horizontal_clamping() {
        assert_eq!(place(Some(Rect::new(-50, 50, 100, 20))).x, 12);
        assert_eq!(place(Some(Rect::new(900, 50, 80, 20))).x, 1000 - 360 - 12);
    }

    #[test]
    fn test_narrow_viewport_keeps_left_edge_visible() {
        let narrow = Size::new(100, 800);
        let popover = Size::new(92, 120);
        for left in [-20, 0, 5, 60] {
            let point = place_popover(
                narrow,
                popover,
                Some(Rect::new(left, 40, 30, 20)),
                LayoutConfig::default(),
            );
            assert_eq!(point.x, 0, "target at {left}");
            assert!(point.x + popover.width <= narrow.width);
        }
    }
}
