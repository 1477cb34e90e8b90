//! Paragraph formatting: line breaking on the format pass, drawing on the render pass.
//!
//! `measure` decides where lines break and `paint` draws lines that were
//! already decided. Both go through the helpers in this module so they agree
//! on widths and vertical metrics.

pub mod fields;
pub mod iter;
pub mod measure;
pub mod paint;

use std::borrow::Cow;
use std::sync::Arc;

use crate::config::LayoutConfig;
use crate::error::{Error, Result};
use crate::fonts::{FontMetrics, TextMeasurer};
use crate::images::ImageSource;
use crate::layout::area::{Rectangle, TOLERANCE};
use crate::layout::context::FormattingContext;
use crate::layout::info::{BookmarkMap, FieldInfos, FormatInfo, LayoutInfo, RenderInfo};
use crate::layout::shape::{ImageExtent, image_extent};
use crate::model::{
    Block, Border, DocumentInfo, FieldKind, Font, LineSpacingRule, ListType, Paragraph,
    ParagraphFormat, TabLeader,
};

use iter::{InlineArena, Leaf};
use measure::Measurer;

/// Vertical metrics of one line.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LineMetrics {
    pub ascent: f32,
    pub descent: f32,
    /// Natural line height of the tallest font on the line.
    pub height: f32,
}

/// Horizontal advance taken by one tab on a line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TabOffset {
    /// Leaf index of the tab.
    pub pos: usize,
    /// Pen position where the tab starts, relative to the area's left edge.
    pub x: f32,
    pub width: f32,
    pub leader: TabLeader,
}

/// One measured line: the half-open leaf range `[start, end)` and its geometry.
#[derive(Clone, Debug, PartialEq)]
pub struct LineInfo {
    pub start: usize,
    pub end: usize,
    /// Where the first leaf starts, relative to the area's left edge.
    pub start_x: f32,
    /// Where the last content ends; trailing blanks are not included.
    pub end_x: f32,
    /// Right limit the line was broken against.
    pub max_x: f32,
    /// Inter-word blanks after the last tab, excluding trailing blanks.
    pub blank_count: usize,
    pub metrics: LineMetrics,
    /// Vertical advance after applying the line-spacing rule.
    pub line_space: f32,
    /// Offset of the line's top from the fragment's top; set when placed.
    pub y: f32,
    pub tab_offsets: Vec<TabOffset>,
    pub last_tab: Option<usize>,
    /// Contains page-dependent fields whose final width differs from the measured one.
    pub reformat: bool,
    /// Ends at a soft hyphen that is drawn as "-".
    pub hyphenated: bool,
    pub is_first_line: bool,
    pub ends_with_line_break: bool,
}

impl LineInfo {
    pub fn width(&self) -> f32 {
        self.end_x - self.start_x
    }

    pub fn baseline(&self) -> f32 {
        let m = &self.metrics;
        if self.line_space < m.height && m.height > 0.0 {
            self.y + m.ascent * self.line_space / m.height
        } else {
            self.y + m.ascent
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListSymbol {
    pub text: String,
    pub font: Font,
    pub width: f32,
}

/// Pagination state of one paragraph fragment.
#[derive(Clone, Debug)]
pub struct ParagraphFormatInfo<'d> {
    pub arena: Arc<InlineArena<'d>>,
    pub lines: Vec<LineInfo>,
    pub starting: bool,
    pub widow_control: bool,
    pub widow_lines: usize,
    pub list_symbol: Option<ListSymbol>,
    pub top_padding: f32,
    pub bottom_padding: f32,
}

impl<'d> ParagraphFormatInfo<'d> {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn is_starting(&self) -> bool {
        self.starting
    }

    pub fn is_ending(&self) -> bool {
        self.lines.last().is_some_and(|l| l.end >= self.arena.len())
    }

    pub fn starting_is_complete(&self) -> bool {
        self.starting
            && !self.lines.is_empty()
            && (!self.widow_control || self.is_ending() || self.lines.len() >= self.widow_lines)
    }

    pub fn ending_is_complete(&self) -> bool {
        self.is_ending()
            && (!self.widow_control || self.starting || self.lines.len() >= self.widow_lines)
    }

    /// Whether `line` holds the paragraph's final leaf.
    pub fn is_last_line(&self, line: &LineInfo) -> bool {
        line.end >= self.arena.len()
    }

    /// Bookmark names on the lines of this fragment.
    pub fn bookmarks(&self) -> impl Iterator<Item = &'d str> + '_ {
        self.lines
            .iter()
            .flat_map(|line| line.start..line.end)
            .filter_map(|pos| match self.arena.leaf(pos) {
                Leaf::Bookmark(name) => Some(*name),
                _ => None,
            })
    }
}

/// Collaborators and document-wide values shared by measuring and painting.
#[derive(Clone, Copy)]
pub(crate) struct TextEnv<'a> {
    pub measurer: &'a dyn TextMeasurer,
    pub images: &'a dyn ImageSource,
    pub config: &'a LayoutConfig,
    pub info: &'a DocumentInfo,
    pub default_tab_stop: f32,
}

impl<'a> TextEnv<'a> {
    pub fn from_context(ctx: &FormattingContext<'a>) -> Self {
        Self {
            measurer: ctx.measurer,
            images: ctx.images,
            config: ctx.config,
            info: ctx.document_info(),
            default_tab_stop: ctx.default_tab_stop(),
        }
    }
}

/// How field leaves turn into text.
#[derive(Clone, Copy)]
pub(crate) enum FieldText<'a> {
    /// Placeholder widths during line breaking.
    Measuring,
    Resolved {
        infos: &'a FieldInfos,
        bookmarks: &'a BookmarkMap,
    },
}

/// Width and text helpers over one arena.
pub(crate) struct LeafMeasure<'a, 'd> {
    pub arena: &'a InlineArena<'d>,
    pub env: TextEnv<'a>,
}

impl<'a, 'd> LeafMeasure<'a, 'd> {
    /// Drawable text of a text-like leaf.
    pub fn text(&self, pos: usize, fields: FieldText<'_>) -> Option<Cow<'d, str>> {
        match *self.arena.leaf(pos) {
            Leaf::Word(w) => Some(Cow::Borrowed(w)),
            Leaf::Symbol { symbol, count } => Some(Cow::Owned(
                std::iter::repeat_n(symbol, count as usize).collect(),
            )),
            Leaf::Field(kind) => Some(Cow::Owned(self.field_text(kind, fields))),
            _ => None,
        }
    }

    pub fn field_text(&self, kind: &FieldKind, fields: FieldText<'_>) -> String {
        match fields {
            FieldText::Measuring => {
                fields::measuring_text(kind, self.env.info, self.env.config.print_date)
            }
            FieldText::Resolved { infos, bookmarks } => {
                fields::resolve(kind, infos, bookmarks, self.env.info)
            }
        }
    }

    pub fn image_extent(&self, pos: usize) -> Option<ImageExtent> {
        match self.arena.leaf(pos) {
            Leaf::Image(image) => Some(image_extent(image, self.env.images, self.env.config)),
            _ => None,
        }
    }

    /// Advance of a content leaf, zero for everything else.
    pub fn content_width(&self, pos: usize, fields: FieldText<'_>) -> f32 {
        if let Some(extent) = self.image_extent(pos) {
            return extent.width;
        }
        match self.text(pos, fields) {
            Some(text) => self.env.measurer.measure_string(&text, self.arena.font(pos)),
            None => 0.0,
        }
    }

    pub fn space_width(&self, pos: usize) -> f32 {
        self.env.measurer.measure_string(" ", self.arena.font(pos))
    }

    pub fn hyphen_width(&self, pos: usize) -> f32 {
        self.env.measurer.measure_string("-", self.arena.font(pos))
    }

    /// Vertical metrics over `[start, end)`, falling back to `base` for lines
    /// without text.
    pub fn metrics(&self, start: usize, end: usize, base: &Font) -> LineMetrics {
        let mut acc: Option<LineMetrics> = None;
        let mut merge = |m: LineMetrics| {
            acc = Some(match acc {
                None => m,
                Some(a) => LineMetrics {
                    ascent: a.ascent.max(m.ascent),
                    descent: a.descent.max(m.descent),
                    height: a.height.max(m.height),
                },
            });
        };
        for pos in start..end {
            match self.arena.leaf(pos) {
                Leaf::Bookmark(_) => {}
                Leaf::Image(_) => {
                    if let Some(extent) = self.image_extent(pos) {
                        merge(LineMetrics {
                            ascent: extent.height,
                            descent: 0.0,
                            height: extent.height,
                        });
                    }
                }
                _ => merge(self.font_line_metrics(self.arena.font(pos))),
            }
        }
        let m = acc.unwrap_or_else(|| self.font_line_metrics(base));
        LineMetrics {
            height: m.height.max(m.ascent + m.descent),
            ..m
        }
    }

    fn font_line_metrics(&self, font: &Font) -> LineMetrics {
        let FontMetrics {
            ascent,
            descent,
            line_height,
        } = self.env.measurer.font_metrics(font);
        let shift = font.baseline_shift();
        LineMetrics {
            ascent: (ascent - shift).max(0.0),
            descent: (descent + shift).max(0.0),
            height: line_height,
        }
    }
}

/// Vertical advance of a line under `rule`.
pub fn line_space(rule: LineSpacingRule, height: f32) -> f32 {
    match rule {
        LineSpacingRule::Single => height,
        LineSpacingRule::OnePtFive => height * 1.5,
        LineSpacingRule::Double => height * 2.0,
        LineSpacingRule::Multiple(m) => height * m,
        LineSpacingRule::AtLeast(min) => height.max(min),
        LineSpacingRule::Exactly(v) => v,
    }
}

/// Horizontal limits and border padding of a paragraph laid out in an area
/// of a given width. Offsets are relative to the area's left edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Geometry {
    pub left: f32,
    pub first_line_left: f32,
    pub max_x: f32,
    pub top_padding: f32,
    pub bottom_padding: f32,
}

impl Geometry {
    pub fn new(format: &ParagraphFormat, width: f32) -> Self {
        let b = &format.borders;
        let side = |border: Option<&Border>, distance: f32| {
            let w = Border::effective_width(border);
            if w > 0.0 { w + distance } else { 0.0 }
        };
        let left = format.left_indent + side(b.left.as_ref(), b.distance_from_left);
        let right = format.right_indent + side(b.right.as_ref(), b.distance_from_right);
        Self {
            left,
            first_line_left: left + format.first_line_indent,
            max_x: width - right,
            top_padding: side(b.top.as_ref(), b.distance_from_top),
            bottom_padding: side(b.bottom.as_ref(), b.distance_from_bottom),
        }
    }
}

fn list_symbol_text(list_type: ListType, number: u32) -> String {
    use crate::model::NumberFormat;
    match list_type {
        ListType::BulletList1 => "\u{2022}".into(),
        ListType::BulletList2 => "o".into(),
        ListType::BulletList3 => "-".into(),
        ListType::NumberList1 => format!("{number}."),
        ListType::NumberList2 => format!("{}.", fields::format_number(number, NumberFormat::AlphaLower)),
        ListType::NumberList3 => format!("{}.", fields::format_number(number, NumberFormat::RomanLower)),
    }
}

pub struct ParagraphRenderer<'d> {
    block: &'d Block,
    paragraph: &'d Paragraph,
    arena: Arc<InlineArena<'d>>,
    list_symbol: Option<ListSymbol>,
}

impl<'d> ParagraphRenderer<'d> {
    /// Builds the inline arena and draws the list number for this item.
    pub fn new(block: &'d Block, paragraph: &'d Paragraph, ctx: &mut FormattingContext<'_>) -> Result<Self> {
        let arena = Arc::new(InlineArena::build(paragraph)?);
        let list_symbol = paragraph.format.list_info.as_ref().map(|list| {
            let number = ctx.next_list_number(list);
            let text = list_symbol_text(list.list_type, number);
            let font = paragraph.format.font.clone();
            let width = ctx.measurer.measure_string(&text, &font);
            ListSymbol { text, font, width }
        });
        Ok(Self {
            block,
            paragraph,
            arena,
            list_symbol,
        })
    }

    pub fn initial_layout_info(&self) -> LayoutInfo {
        let f = &self.paragraph.format;
        LayoutInfo {
            margin_top: f.space_before,
            margin_bottom: f.space_after,
            keep_together: f.keep_together,
            keep_with_next: f.keep_with_next,
            page_break_before: f.page_break_before,
            ..LayoutInfo::default()
        }
    }

    /// Places as many of the remaining lines as fit into `area`.
    pub fn format(
        &mut self,
        area: Rectangle,
        previous: Option<&FormatInfo<'d>>,
        top_of_area: bool,
        ctx: &mut FormattingContext<'_>,
    ) -> Result<RenderInfo<'d>> {
        let format = &self.paragraph.format;
        let start = match previous {
            None => 0,
            Some(FormatInfo::Paragraph(prev)) => prev.lines.last().map_or(0, |l| l.end),
            Some(_) => {
                return Err(Error::Internal(
                    "paragraph continued from a fragment of another element".into(),
                ));
            }
        };
        let starting = previous.is_none();
        let env = TextEnv::from_context(ctx);
        let geometry = Geometry::new(format, area.width);
        let measurer = Measurer::new(
            LeafMeasure {
                arena: &self.arena,
                env,
            },
            format,
            geometry,
            self.list_symbol.as_ref(),
        );
        let mut lines = measurer.measure_lines(start);
        let total = lines.len();

        let top_padding = if starting { geometry.top_padding } else { 0.0 };
        let mut y = top_padding;
        let mut placed = 0;
        for line in &lines {
            if y + line.line_space > area.height + TOLERANCE {
                break;
            }
            y += line.line_space;
            placed += 1;
        }
        if placed == 0 && top_of_area && total > 0 {
            log::debug!("Paragraph line taller than its area, placing it anyway");
            placed = 1;
        }

        let widow_control = format.widow_control;
        let widow_lines = ctx.config.widow_lines.max(1);
        let remaining = total - placed;
        if widow_control && remaining > 0 && remaining < widow_lines {
            let shift = widow_lines - remaining;
            if placed > shift {
                log::debug!("Widow control moves {shift} line(s) to the next area");
                placed -= shift;
            }
        }
        lines.truncate(placed);

        let mut y = top_padding;
        for line in &mut lines {
            line.y = y;
            y += line.line_space;
        }
        let ending = lines.last().is_some_and(|l| l.end >= self.arena.len());
        let bottom_padding = if ending { geometry.bottom_padding } else { 0.0 };
        let height = if lines.is_empty() { 0.0 } else { y + bottom_padding };

        let mut layout = self.initial_layout_info();
        layout.content_area = Rectangle::new(area.x, area.y, area.width, height);
        if !starting {
            layout.margin_top = 0.0;
        }
        let info = RenderInfo {
            element: self.block,
            format: FormatInfo::Paragraph(ParagraphFormatInfo {
                arena: Arc::clone(&self.arena),
                lines,
                starting,
                widow_control,
                widow_lines,
                list_symbol: self.list_symbol.clone(),
                top_padding,
                bottom_padding,
            }),
            layout,
        };
        for name in info.bookmarks() {
            ctx.record_bookmark(name);
        }
        Ok(info)
    }

    /// Drops trailing lines so they move on with the following element.
    /// Fails when that would leave too little behind.
    pub fn remove_ending(&self, info: &mut RenderInfo<'d>) -> bool {
        let FormatInfo::Paragraph(p) = &mut info.format else {
            return false;
        };
        let remove = if p.widow_control { p.widow_lines } else { 1 };
        let Some(keep) = p.lines.len().checked_sub(remove) else {
            return false;
        };
        if keep == 0 || (p.starting && p.widow_control && keep < p.widow_lines) {
            return false;
        }
        p.lines.truncate(keep);
        p.bottom_padding = 0.0;
        let height = p.lines.last().map_or(0.0, |l| l.y + l.line_space);
        info.layout.content_area.height = height;
        true
    }
}
