use crate::layout::area::Rectangle;
use crate::layout::info::{FormatInfo, LayoutInfo, RenderInfo};
use crate::model::Block;

/// Explicit page break. Takes no space; the flow engine asks the provider
/// for a new area when it meets one.
pub struct PageBreakRenderer<'d> {
    block: &'d Block,
}

impl<'d> PageBreakRenderer<'d> {
    pub fn new(block: &'d Block) -> Self {
        Self { block }
    }

    pub fn initial_layout_info(&self) -> LayoutInfo {
        LayoutInfo {
            page_break_before: true,
            ..LayoutInfo::default()
        }
    }

    pub fn format(&self, area: Rectangle) -> RenderInfo<'d> {
        let mut layout = self.initial_layout_info();
        layout.content_area = Rectangle::new(area.x, area.y, area.width, 0.0);
        RenderInfo {
            element: self.block,
            format: FormatInfo::PageBreak,
            layout,
        }
    }
}
