//! Draws a simulated page and the tour artifacts on top of it.
//!
//! Page geometry is in viewport pixels; [`Projection`] scales it onto the
//! terminal cells available for the page.

use ratatui::{
    layout::Rect as CellRect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::layout::{Rect, Size};
use crate::render::{PopoverScene, Scene};
use crate::site::PageDocument;

/// Cells the popover needs for its chrome regardless of projected size
const POPOVER_MIN_WIDTH: u16 = 28;

/// Maps viewport pixels onto a block of terminal cells
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    pub viewport: Size,
    pub area: CellRect,
}

impl Projection {
    pub fn new(viewport: Size, area: CellRect) -> Self {
        Self { viewport, area }
    }

    fn scale(px: i32, cells: u16, span: i32) -> i64 {
        (i64::from(px) * i64::from(cells)).div_euclid(i64::from(span.max(1)))
    }

    /// Cells covered by `rect`, clipped to the area; `None` when off-screen
    pub fn project(&self, rect: Rect) -> Option<CellRect> {
        let width = self.area.width;
        let height = self.area.height;

        let left = Self::scale(rect.left(), width, self.viewport.width);
        let mut right = Self::scale(rect.right(), width, self.viewport.width);
        let top = Self::scale(rect.top(), height, self.viewport.height);
        let mut bottom = Self::scale(rect.bottom(), height, self.viewport.height);
        if right <= left {
            right = left + 1;
        }
        if bottom <= top {
            bottom = top + 1;
        }

        let left = left.max(0);
        let top = top.max(0);
        let right = right.min(i64::from(width));
        let bottom = bottom.min(i64::from(height));
        if right <= left || bottom <= top {
            return None;
        }
        Some(CellRect::new(
            self.area.x + left as u16,
            self.area.y + top as u16,
            (right - left) as u16,
            (bottom - top) as u16,
        ))
    }
}

pub struct PageView<'a> {
    document: &'a PageDocument,
    scene: &'a Scene,
    viewport: Size,
}

impl<'a> PageView<'a> {
    pub fn new(document: &'a PageDocument, scene: &'a Scene, viewport: Size) -> Self {
        Self {
            document,
            scene,
            viewport,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: CellRect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", self.document.name()))
            .border_style(Style::default().fg(Color::Gray));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let projection = Projection::new(self.viewport, inner);
        self.render_elements(frame, &projection);

        if self.scene.overlay {
            frame
                .buffer_mut()
                .set_style(inner, Style::default().fg(Color::DarkGray));
        }
        if let (Some(rect), Some(label)) = (self.scene.highlight_rect, &self.scene.highlighted) {
            render_highlight(frame, &projection, rect, label);
        }
        if let Some(popover) = &self.scene.popover {
            render_popover(frame, &projection, popover);
        }
    }

    fn render_elements(&self, frame: &mut Frame, projection: &Projection) {
        for (_, node) in self.document.rendered() {
            let rect = Rect {
                y: node.rect.y - self.scene.scroll_y,
                ..node.rect
            };
            let Some(cells) = projection.project(rect) else {
                continue;
            };
            let label = node.label();
            let text = node.text.clone().unwrap_or_default();
            if cells.width >= 2 && cells.height >= 2 {
                let block = Block::default()
                    .borders(Borders::ALL)
                    .title(label)
                    .border_style(Style::default().fg(Color::Blue));
                let inner = block.inner(cells);
                frame.render_widget(block, cells);
                frame.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }), inner);
            } else {
                frame.render_widget(Paragraph::new(label), cells);
            }
        }
    }
}

fn render_highlight(frame: &mut Frame, projection: &Projection, rect: Rect, label: &str) {
    let Some(cells) = projection.project(rect) else {
        return;
    };
    frame
        .buffer_mut()
        .set_style(cells, Style::default().fg(Color::White));
    if cells.width >= 2 && cells.height >= 2 {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Thick)
            .border_style(Style::default().fg(Color::Yellow))
            .title(Span::styled(
                label.to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ));
        frame.render_widget(block, cells);
    }
}

/// Popover box in cells; grown to fit its text, then kept inside the area
fn popover_cells(projection: &Projection, popover: &PopoverScene) -> Option<CellRect> {
    let position = popover.position?;
    let projected = projection.project(Rect::at(position, popover.size))?;
    let area = projection.area;

    let width = projected.width.max(POPOVER_MIN_WIDTH).min(area.width);
    let body_lines = popover.view.body.lines().count().max(1) as u16;
    let height = projected.height.max(body_lines + 6).min(area.height);
    let x = projected.x.min(area.right().saturating_sub(width));
    let y = projected.y.min(area.bottom().saturating_sub(height));
    Some(CellRect::new(x, y, width, height))
}

fn render_popover(frame: &mut Frame, projection: &Projection, popover: &PopoverScene) {
    // Not drawn until the controller has positioned it
    let Some(cells) = popover_cells(projection, popover) else {
        return;
    };
    let view = &popover.view;

    let back_style = if view.back_enabled {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let mut lines = vec![
        Line::from(Span::styled(
            view.title.as_str(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    lines.extend(view.body.lines().map(Line::from));
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("[ Back ]", back_style),
        Span::raw(" "),
        Span::styled("[ Skip ]", Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("[ {} ]", view.primary.label()),
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ),
    ]));

    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!(" {} ", view.meta()),
            Style::default().fg(Color::Gray),
        ))
        .border_style(Style::default().fg(Color::Cyan));

    frame.render_widget(Clear, cells);
    frame.render_widget(
        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false }),
        cells,
    );
}
