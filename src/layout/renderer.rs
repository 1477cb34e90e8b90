//! The closed set of element formatters and the single place that picks one.

use crate::config::LayoutConfig;
use crate::error::Result;
use crate::fonts::TextMeasurer;
use crate::graphics::Canvas;
use crate::images::ImageSource;
use crate::layout::area::Rectangle;
use crate::layout::context::FormattingContext;
use crate::layout::info::{BookmarkMap, FieldInfos, FormatInfo, LayoutInfo, RenderInfo};
use crate::layout::page_break::PageBreakRenderer;
use crate::layout::paragraph::{ParagraphRenderer, TextEnv, paint::paint_paragraph};
use crate::layout::shape::{ChartRenderer, ImageRenderer, TextFrameRenderer, paint_shape};
use crate::layout::table::{TableRenderer, paint_table};
use crate::model::{Block, DocumentInfo};

pub enum Renderer<'d> {
    Paragraph(ParagraphRenderer<'d>),
    Table(TableRenderer<'d>),
    Image(ImageRenderer<'d>),
    TextFrame(TextFrameRenderer<'d>),
    Chart(ChartRenderer<'d>),
    PageBreak(PageBreakRenderer<'d>),
}

impl<'d> Renderer<'d> {
    pub fn create(block: &'d Block, ctx: &mut FormattingContext<'_>) -> Result<Self> {
        Ok(match block {
            Block::Paragraph(p) => Renderer::Paragraph(ParagraphRenderer::new(block, p, ctx)?),
            Block::Table(t) => Renderer::Table(TableRenderer::new(block, t, ctx)?),
            Block::Image(i) => Renderer::Image(ImageRenderer::new(block, i)),
            Block::TextFrame(f) => Renderer::TextFrame(TextFrameRenderer::new(block, f)),
            Block::Chart(c) => Renderer::Chart(ChartRenderer::new(block, c)),
            Block::PageBreak => Renderer::PageBreak(PageBreakRenderer::new(block)),
        })
    }

    /// Margins and break flags known before formatting.
    pub fn initial_layout_info(&self) -> LayoutInfo {
        match self {
            Renderer::Paragraph(r) => r.initial_layout_info(),
            Renderer::Table(r) => r.initial_layout_info(),
            Renderer::Image(r) => r.initial_layout_info(),
            Renderer::TextFrame(r) => r.initial_layout_info(),
            Renderer::Chart(r) => r.initial_layout_info(),
            Renderer::PageBreak(r) => r.initial_layout_info(),
        }
    }

    /// Formats the next fragment into `area`. `previous` is the fragment
    /// placed in the preceding area, `None` for the first attempt.
    pub fn format(
        &mut self,
        area: Rectangle,
        previous: Option<&FormatInfo<'d>>,
        top_of_area: bool,
        ctx: &mut FormattingContext<'_>,
    ) -> Result<RenderInfo<'d>> {
        match self {
            Renderer::Paragraph(r) => r.format(area, previous, top_of_area, ctx),
            Renderer::Table(r) => r.format(area, previous, top_of_area, ctx),
            Renderer::Image(r) => r.format(area, top_of_area, ctx),
            Renderer::TextFrame(r) => r.format(area, top_of_area, ctx),
            Renderer::Chart(r) => r.format(area, top_of_area),
            Renderer::PageBreak(r) => Ok(r.format(area)),
        }
    }

    /// Reopens the end of a finished fragment so it can move on with the
    /// next element. Only paragraphs and tables can give anything back.
    pub fn remove_ending(&self, info: &mut RenderInfo<'d>) -> bool {
        match self {
            Renderer::Paragraph(r) => r.remove_ending(info),
            Renderer::Table(r) => r.remove_ending(info),
            _ => false,
        }
    }
}

/// Read-only state for painting one page.
#[derive(Clone, Copy)]
pub struct PaintContext<'a> {
    pub measurer: &'a dyn TextMeasurer,
    pub images: &'a dyn ImageSource,
    pub config: &'a LayoutConfig,
    pub info: &'a DocumentInfo,
    pub default_tab_stop: f32,
    pub field_infos: &'a FieldInfos,
    pub bookmarks: &'a BookmarkMap,
}

impl<'a> PaintContext<'a> {
    pub(crate) fn text_env(&self) -> TextEnv<'a> {
        TextEnv {
            measurer: self.measurer,
            images: self.images,
            config: self.config,
            info: self.info,
            default_tab_stop: self.default_tab_stop,
        }
    }
}

/// Paints one fragment. Never touches layout state.
pub fn paint(info: &RenderInfo<'_>, pctx: &PaintContext<'_>, canvas: &mut dyn Canvas) {
    match &info.format {
        FormatInfo::Paragraph(p) => paint_paragraph(info, p, pctx, canvas),
        FormatInfo::Table(t) => paint_table(info, t, pctx, canvas),
        FormatInfo::Shape(s) => paint_shape(info, s, pctx, canvas),
        FormatInfo::PageBreak => {}
    }
}
