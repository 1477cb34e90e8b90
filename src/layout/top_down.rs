//! Flows a list of sibling elements through the areas an `AreaProvider` hands out.

use crate::error::Result;
use crate::layout::area::Rectangle;
use crate::layout::context::FormattingContext;
use crate::layout::info::{FormatInfo, LayoutInfo, RenderInfo};
use crate::layout::renderer::Renderer;
use crate::model::{Block, LeftPosition, RelativeVertical, TopPosition};

/// Source of areas for a `TopDownFormatter`: the pager for section bodies,
/// a single bounded rectangle for cells, frames, headers and footers.
pub trait AreaProvider<'d> {
    /// Area to continue in, or `None` when the provider is exhausted.
    fn next_area(&mut self, ctx: &mut FormattingContext<'_>) -> Result<Option<Rectangle>>;

    /// Hands over everything placed in the current area.
    fn store_render_infos(&mut self, infos: Vec<RenderInfo<'d>>);

    fn is_area_break_before(&self, layout: &LayoutInfo) -> bool;

    fn position_horizontally(&self, info: &mut RenderInfo<'d>);

    fn position_vertically(&self, info: &mut RenderInfo<'d>);
}

/// Vertical gap between two neighbours: the larger margin when both are
/// non-negative, their sum otherwise.
pub fn collapse_margins(previous_bottom: f32, next_top: f32) -> f32 {
    if previous_bottom >= 0.0 && next_top >= 0.0 {
        previous_bottom.max(next_top)
    } else {
        previous_bottom + next_top
    }
}

/// Flow position inside the current area.
struct FlowState<'d> {
    area: Rectangle,
    y: f32,
    previous_bottom: f32,
    top_of_area: bool,
    first_area: bool,
    infos: Vec<RenderInfo<'d>>,
}

impl<'d> FlowState<'d> {
    fn new(area: Rectangle) -> Self {
        Self {
            area,
            y: area.y,
            previous_bottom: 0.0,
            top_of_area: true,
            first_area: true,
            infos: Vec::new(),
        }
    }

    fn push(&mut self, info: RenderInfo<'d>) {
        self.y = info.bottom();
        self.previous_bottom = info.layout.margin_bottom;
        self.top_of_area = false;
        self.infos.push(info);
    }

    /// Free space below the flow position, or below `info` when given.
    fn remaining_below(&self, bottom: f32) -> Rectangle {
        Rectangle::new(self.area.x, bottom, self.area.width, self.area.bottom() - bottom)
    }
}

pub struct TopDownFormatter<'d> {
    elements: &'d [Block],
}

impl<'d> TopDownFormatter<'d> {
    pub fn new(elements: &'d [Block]) -> Self {
        Self { elements }
    }

    fn break_area(
        &self,
        provider: &mut dyn AreaProvider<'d>,
        ctx: &mut FormattingContext<'_>,
        state: &mut FlowState<'d>,
    ) -> Result<bool> {
        provider.store_render_infos(std::mem::take(&mut state.infos));
        match provider.next_area(ctx)? {
            Some(area) => {
                state.area = area;
                state.y = area.y;
                state.previous_bottom = 0.0;
                state.top_of_area = true;
                state.first_area = false;
                Ok(true)
            }
            None => {
                log::debug!("No further area available, remaining content is dropped");
                Ok(false)
            }
        }
    }

    /// Formats every element, asking `provider` for a new area whenever the
    /// current one is full or a break rule demands it.
    pub fn format_on_areas(
        &self,
        provider: &mut dyn AreaProvider<'d>,
        ctx: &mut FormattingContext<'_>,
    ) -> Result<()> {
        let Some(area) = provider.next_area(ctx)? else {
            return Ok(());
        };
        let mut state = FlowState::new(area);
        let mut pending: Option<(Renderer<'d>, Option<FormatInfo<'d>>)> = None;
        let mut idx = 0;

        while idx < self.elements.len() {
            ctx.config.check_cancelled()?;
            let block = &self.elements[idx];
            let (mut renderer, previous) = match pending.take() {
                Some(p) => p,
                None => (Renderer::create(block, ctx)?, None),
            };

            if let Block::PageBreak = block {
                idx += 1;
                let layout = renderer.initial_layout_info();
                if provider.is_area_break_before(&layout) && !self.break_area(provider, ctx, &mut state)? {
                    return Ok(());
                }
                continue;
            }

            let initial = renderer.initial_layout_info();
            if previous.is_none() && !state.top_of_area && provider.is_area_break_before(&initial) {
                log::debug!("Page break before {}", block.kind_name());
                if !self.break_area(provider, ctx, &mut state)? {
                    return Ok(());
                }
                pending = Some((renderer, None));
                continue;
            }

            let top_margin = if previous.is_some() { 0.0 } else { initial.margin_top };
            let gap = if state.top_of_area {
                if state.first_area { top_margin } else { 0.0 }
            } else {
                collapse_margins(state.previous_bottom, top_margin)
            };
            let top = state.y + gap;
            let format_area = Rectangle::new(
                state.area.x,
                top,
                state.area.width,
                state.area.bottom() - top,
            );
            let mut info = renderer.format(format_area, previous.as_ref(), state.top_of_area, ctx)?;

            if info.layout.is_floating() {
                provider.position_horizontally(&mut info);
                provider.position_vertically(&mut info);
                state.infos.push(info);
                idx += 1;
                continue;
            }
            provider.position_horizontally(&mut info);

            if info.format.is_empty() {
                if state.top_of_area {
                    log::warn!("{} does not fit into an empty area, skipping it", block.kind_name());
                    idx += 1;
                    continue;
                }
                if !self.break_area(provider, ctx, &mut state)? {
                    return Ok(());
                }
                pending = Some((renderer, previous));
                continue;
            }

            if !state.top_of_area && self.is_forced_area_break(idx, &info, &state, ctx)? {
                log::debug!("Forced area break before {}", block.kind_name());
                if !self.break_area(provider, ctx, &mut state)? {
                    return Ok(());
                }
                pending = Some((renderer, previous));
                continue;
            }

            if info.format.is_ending()
                && info.layout.keep_with_next
                && !info.layout.keep_together
                && idx + 1 < self.elements.len()
            {
                let rest = state.remaining_below(info.bottom());
                if self.next_elements_dont_fit(idx + 1, rest, info.layout.margin_bottom, ctx)? {
                    if renderer.remove_ending(&mut info) {
                        log::debug!("Keep-with-next moves the end of a {} on", block.kind_name());
                        let format = info.format.clone();
                        state.push(info);
                        if !self.break_area(provider, ctx, &mut state)? {
                            return Ok(());
                        }
                        pending = Some((renderer, Some(format)));
                        continue;
                    }
                    if info.format.is_starting() && !state.top_of_area {
                        log::debug!("Keep-with-next moves the whole {} on", block.kind_name());
                        if !self.break_area(provider, ctx, &mut state)? {
                            return Ok(());
                        }
                        pending = Some((renderer, None));
                        continue;
                    }
                }
            }

            let ending = info.format.is_ending();
            let format = (!ending).then(|| info.format.clone());
            state.push(info);
            if ending {
                idx += 1;
            } else {
                if !self.break_area(provider, ctx, &mut state)? {
                    return Ok(());
                }
                pending = Some((renderer, format));
            }
        }

        provider.store_render_infos(std::mem::take(&mut state.infos));
        Ok(())
    }

    fn is_forced_area_break(
        &self,
        idx: usize,
        info: &RenderInfo<'d>,
        state: &FlowState<'d>,
        ctx: &mut FormattingContext<'_>,
    ) -> Result<bool> {
        let format = &info.format;
        if format.is_starting() && !format.starting_is_complete() {
            return Ok(true);
        }
        if info.layout.keep_together && !format.is_complete() {
            return Ok(true);
        }
        if info.layout.keep_together
            && info.layout.keep_with_next
            && idx + 1 < self.elements.len()
        {
            let rest = state.remaining_below(info.bottom());
            return self.next_elements_dont_fit(idx + 1, rest, info.layout.margin_bottom, ctx);
        }
        Ok(false)
    }

    /// Formats the chain of following elements speculatively and reports
    /// whether it fails to start in `rest`. Session state is rolled back.
    fn next_elements_dont_fit(
        &self,
        start: usize,
        rest: Rectangle,
        previous_bottom: f32,
        ctx: &mut FormattingContext<'_>,
    ) -> Result<bool> {
        let checkpoint = ctx.checkpoint();
        let result = self.probe_following(start, rest, previous_bottom, ctx);
        ctx.restore(checkpoint);
        result
    }

    fn probe_following(
        &self,
        start: usize,
        mut rest: Rectangle,
        mut previous_bottom: f32,
        ctx: &mut FormattingContext<'_>,
    ) -> Result<bool> {
        let end = (start + ctx.config.keep_with_next_lookahead).min(self.elements.len());
        for block in &self.elements[start..end] {
            if let Block::PageBreak = block {
                return Ok(false);
            }
            let mut renderer = Renderer::create(block, ctx)?;
            let initial = renderer.initial_layout_info();
            let area = rest.lower(collapse_margins(previous_bottom, initial.margin_top));
            if area.height < 0.0 {
                return Ok(true);
            }
            let info = renderer.format(area, None, false, ctx)?;
            if info.layout.is_floating() {
                continue;
            }
            let format = &info.format;
            if format.is_empty() || !format.starting_is_complete() {
                return Ok(true);
            }
            if info.layout.keep_together && !format.is_complete() {
                return Ok(true);
            }
            if info.layout.keep_with_next && format.is_complete() {
                rest = Rectangle::new(rest.x, info.bottom(), rest.width, rest.bottom() - info.bottom());
                previous_bottom = info.layout.margin_bottom;
                continue;
            }
            return Ok(false);
        }
        Ok(false)
    }
}

/// Horizontal placement of shapes against a reference rectangle. Other
/// elements keep the position they were formatted at.
pub(crate) fn align_horizontally(info: &mut RenderInfo<'_>, reference: Rectangle, even_page: bool) {
    if !matches!(info.format, FormatInfo::Shape(_)) {
        return;
    }
    let width = info.layout.content_area.width;
    let left = reference.x;
    let right = reference.right() - width;
    let x = match info.layout.left {
        LeftPosition::Left => left,
        LeftPosition::Right => right,
        LeftPosition::Center => reference.x + (reference.width - width) / 2.0,
        LeftPosition::Inside => {
            if even_page { right } else { left }
        }
        LeftPosition::Outside => {
            if even_page { left } else { right }
        }
        LeftPosition::Offset(offset) => reference.x + offset,
    };
    info.shift(x - info.layout.content_area.x, 0.0);
}

/// Vertical placement of floating shapes. Shapes anchored to the flow keep
/// their position apart from an explicit offset.
pub(crate) fn align_vertically(info: &mut RenderInfo<'_>, reference: Rectangle) {
    if !matches!(info.format, FormatInfo::Shape(_)) {
        return;
    }
    let height = info.layout.content_area.height;
    let current = info.layout.content_area.y;
    let y = if info.layout.vertical_reference == RelativeVertical::Area {
        match info.layout.top {
            TopPosition::Offset(offset) => current + offset,
            _ => current,
        }
    } else {
        match info.layout.top {
            TopPosition::Top => reference.y,
            TopPosition::Center => reference.y + (reference.height - height) / 2.0,
            TopPosition::Bottom => reference.bottom() - height,
            TopPosition::Offset(offset) => reference.y + offset,
        }
    };
    info.shift(0.0, y - current);
}

/// Provider with exactly one area; content that overflows it is dropped.
pub struct SingleAreaProvider<'d> {
    area: Rectangle,
    served: bool,
    clipped: bool,
    infos: Vec<RenderInfo<'d>>,
}

impl<'d> SingleAreaProvider<'d> {
    pub fn new(area: Rectangle) -> Self {
        Self {
            area,
            served: false,
            clipped: false,
            infos: Vec::new(),
        }
    }

    /// Whether the content asked for more room than the area had.
    pub fn clipped(&self) -> bool {
        self.clipped
    }

    /// Lowest bottom edge of the flowing content, or the area top when empty.
    pub fn content_bottom(&self) -> f32 {
        self.infos
            .iter()
            .filter(|i| !i.layout.is_floating())
            .map(|i| i.bottom())
            .fold(self.area.y, f32::max)
    }

    pub fn render_infos(&self) -> &[RenderInfo<'d>] {
        &self.infos
    }

    pub fn into_render_infos(self) -> Vec<RenderInfo<'d>> {
        self.infos
    }
}

impl<'d> AreaProvider<'d> for SingleAreaProvider<'d> {
    fn next_area(&mut self, _ctx: &mut FormattingContext<'_>) -> Result<Option<Rectangle>> {
        if self.served {
            self.clipped = true;
            return Ok(None);
        }
        self.served = true;
        Ok(Some(self.area))
    }

    fn store_render_infos(&mut self, infos: Vec<RenderInfo<'d>>) {
        self.infos.extend(infos);
    }

    fn is_area_break_before(&self, _layout: &LayoutInfo) -> bool {
        false
    }

    fn position_horizontally(&self, info: &mut RenderInfo<'d>) {
        align_horizontally(info, self.area, false);
    }

    fn position_vertically(&self, info: &mut RenderInfo<'d>) {
        align_vertically(info, self.area);
    }
}
