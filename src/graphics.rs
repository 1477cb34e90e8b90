//! Drawing collaborator: the primitive operations the render pass emits.

use crate::layout::area::Rectangle;
use crate::model::{Border, BorderStyle, Color, DashStyle, Font, LineFormat};

#[derive(Clone, Debug, PartialEq)]
pub struct Pen {
    pub width: f32,
    pub color: Color,
    pub dash: DashStyle,
}

impl Pen {
    pub fn solid(width: f32, color: Color) -> Self {
        Self {
            width,
            color,
            dash: DashStyle::Solid,
        }
    }
}

impl From<&LineFormat> for Pen {
    fn from(line: &LineFormat) -> Self {
        Self {
            width: line.width,
            color: line.color,
            dash: line.dash,
        }
    }
}

impl From<&Border> for Pen {
    fn from(border: &Border) -> Self {
        let dash = match border.style {
            BorderStyle::Single => DashStyle::Solid,
            BorderStyle::Dot => DashStyle::Dot,
            BorderStyle::DashSmallGap | BorderStyle::DashLargeGap => DashStyle::Dash,
            BorderStyle::DashDot => DashStyle::DashDot,
        };
        Self {
            width: border.width,
            color: border.color,
            dash,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum LinkTarget {
    Url(String),
    Bookmark(String),
}

/// Painted primitive, in page coordinates.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    FillRect {
        rect: Rectangle,
        color: Color,
    },
    StrokeRect {
        rect: Rectangle,
        pen: Pen,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        pen: Pen,
    },
    /// Circular arc or pie wedge; angles in degrees, counter-clockwise from 3 o'clock.
    Arc {
        cx: f32,
        cy: f32,
        radius: f32,
        start_deg: f32,
        sweep_deg: f32,
        pen: Option<Pen>,
        fill: Option<Color>,
    },
    Text {
        text: String,
        font: Font,
        x: f32,
        baseline: f32,
    },
    Image {
        source: String,
        rect: Rectangle,
    },
    Link {
        rect: Rectangle,
        target: LinkTarget,
    },
}

pub trait Canvas {
    fn fill_rect(&mut self, rect: Rectangle, color: Color);
    fn stroke_rect(&mut self, rect: Rectangle, pen: &Pen);
    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, pen: &Pen);
    fn arc(
        &mut self,
        cx: f32,
        cy: f32,
        radius: f32,
        start_deg: f32,
        sweep_deg: f32,
        pen: Option<&Pen>,
        fill: Option<Color>,
    );
    fn draw_string(&mut self, text: &str, font: &Font, x: f32, baseline: f32);
    fn draw_image(&mut self, source: &str, rect: Rectangle);
    fn link(&mut self, rect: Rectangle, target: &LinkTarget);
}

/// Canvas that keeps every operation in paint order.
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    pub ops: Vec<DrawOp>,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text runs as (text, x, baseline).
    pub fn texts(&self) -> impl Iterator<Item = (&str, f32, f32)> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, x, baseline, .. } => Some((text.as_str(), *x, *baseline)),
            _ => None,
        })
    }

    pub fn text_content(&self) -> String {
        self.texts().map(|(t, _, _)| t).collect::<Vec<_>>().join(" ")
    }
}

impl Canvas for RecordingCanvas {
    fn fill_rect(&mut self, rect: Rectangle, color: Color) {
        self.ops.push(DrawOp::FillRect { rect, color });
    }

    fn stroke_rect(&mut self, rect: Rectangle, pen: &Pen) {
        self.ops.push(DrawOp::StrokeRect {
            rect,
            pen: pen.clone(),
        });
    }

    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, pen: &Pen) {
        self.ops.push(DrawOp::Line {
            x1,
            y1,
            x2,
            y2,
            pen: pen.clone(),
        });
    }

    fn arc(
        &mut self,
        cx: f32,
        cy: f32,
        radius: f32,
        start_deg: f32,
        sweep_deg: f32,
        pen: Option<&Pen>,
        fill: Option<Color>,
    ) {
        self.ops.push(DrawOp::Arc {
            cx,
            cy,
            radius,
            start_deg,
            sweep_deg,
            pen: pen.cloned(),
            fill,
        });
    }

    fn draw_string(&mut self, text: &str, font: &Font, x: f32, baseline: f32) {
        self.ops.push(DrawOp::Text {
            text: text.to_string(),
            font: font.clone(),
            x,
            baseline,
        });
    }

    fn draw_image(&mut self, source: &str, rect: Rectangle) {
        self.ops.push(DrawOp::Image {
            source: source.to_string(),
            rect,
        });
    }

    fn link(&mut self, rect: Rectangle, target: &LinkTarget) {
        self.ops.push(DrawOp::Link {
            rect,
            target: target.clone(),
        });
    }
}
