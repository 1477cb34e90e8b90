//! Line breaking.

use crate::layout::area::TOLERANCE;
use crate::model::{ParagraphFormat, TabAlignment, TabLeader};

use super::iter::Leaf;
use super::{FieldText, Geometry, LeafMeasure, LineInfo, ListSymbol, TabOffset, fields, line_space};

/// Resolved tab stop, positions relative to the area's left edge.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Stop {
    position: f32,
    alignment: TabAlignment,
    leader: TabLeader,
}

/// Break opportunity after a run of blanks.
#[derive(Clone, Copy, Debug)]
struct Candidate {
    end: usize,
    end_x: f32,
    blanks: usize,
    tabs: usize,
}

/// Running state of the line being built.
struct LineState {
    start: usize,
    start_x: f32,
    x: f32,
    content_end_x: f32,
    has_content: bool,
    interior_blanks: usize,
    trailing_blanks: usize,
    candidate: Option<Candidate>,
    tab_offsets: Vec<TabOffset>,
}

pub(crate) struct Measurer<'a, 'd> {
    leaves: LeafMeasure<'a, 'd>,
    format: &'a ParagraphFormat,
    geometry: Geometry,
    list_symbol: Option<&'a ListSymbol>,
}

impl<'a, 'd> Measurer<'a, 'd> {
    pub fn new(
        leaves: LeafMeasure<'a, 'd>,
        format: &'a ParagraphFormat,
        geometry: Geometry,
        list_symbol: Option<&'a ListSymbol>,
    ) -> Self {
        Self {
            leaves,
            format,
            geometry,
            list_symbol,
        }
    }

    /// Breaks everything from leaf `start` to the end of the paragraph into lines.
    pub fn measure_lines(&self, start: usize) -> Vec<LineInfo> {
        let len = self.leaves.arena.len();
        let mut lines = Vec::new();
        let mut pos = start;
        loop {
            let line = self.measure_line(pos, pos == 0);
            let end = line.end;
            lines.push(line);
            if end >= len {
                break;
            }
            if end <= pos {
                log::warn!("Line breaking made no progress at leaf {pos}");
                break;
            }
            pos = end;
        }
        lines
    }

    /// Next tab stop strictly right of `x`, or `None` when it would pass the right limit.
    fn next_tab_stop(&self, x: f32, is_first_line: bool) -> Option<Stop> {
        let explicit = self
            .format
            .tab_stops
            .iter()
            .filter(|t| t.position > x + TOLERANCE)
            .min_by(|a, b| a.position.total_cmp(&b.position))
            .map(|t| Stop {
                position: t.position,
                alignment: t.alignment,
                leader: t.leader,
            });
        // A hanging first line tabs to the body indent.
        let hanging = (is_first_line && x + TOLERANCE < self.geometry.left).then_some(Stop {
            position: self.geometry.left,
            alignment: TabAlignment::Left,
            leader: TabLeader::Spaces,
        });
        let stop = match (explicit, hanging) {
            (Some(e), Some(h)) => Some(if h.position < e.position { h } else { e }),
            (e, h) => e.or(h),
        }
        .unwrap_or_else(|| {
            let interval = if self.leaves.env.default_tab_stop > 0.0 {
                self.leaves.env.default_tab_stop
            } else {
                36.0
            };
            Stop {
                position: ((x + TOLERANCE) / interval).floor() * interval + interval,
                alignment: TabAlignment::Left,
                leader: TabLeader::Spaces,
            }
        });
        (stop.position <= self.geometry.max_x + TOLERANCE).then_some(stop)
    }

    /// Width of the segment after the tab at `tab_pos`, up to the next tab or
    /// line break. For decimal tabs only the part before the separator counts.
    fn probe_segment(&self, tab_pos: usize, alignment: TabAlignment) -> f32 {
        let mut width = 0.0;
        for (pos, leaf) in self.leaves.arena.iter_at(tab_pos + 1) {
            match leaf {
                Leaf::Tab | Leaf::LineBreak => break,
                Leaf::Blank => width += self.leaves.space_width(pos),
                Leaf::Word(text) if alignment == TabAlignment::Decimal => {
                    if let Some(idx) = text.find(['.', ',']) {
                        let font = self.leaves.arena.font(pos);
                        return width + self.leaves.env.measurer.measure_string(&text[..idx], font);
                    }
                    width += self.leaves.content_width(pos, FieldText::Measuring);
                }
                _ => width += self.leaves.content_width(pos, FieldText::Measuring),
            }
        }
        width
    }

    fn finish(
        &self,
        state: &LineState,
        end: usize,
        end_x: f32,
        blanks: usize,
        tabs: usize,
        is_first_line: bool,
    ) -> LineInfo {
        let arena = self.leaves.arena;
        let metrics = self.leaves.metrics(state.start, end, &self.format.font);
        let tab_offsets: Vec<TabOffset> = state.tab_offsets[..tabs.min(state.tab_offsets.len())].to_vec();
        let reformat = (state.start..end).any(|pos| match arena.leaf(pos) {
            Leaf::Field(kind) => fields::is_page_dependent(kind),
            _ => false,
        });
        LineInfo {
            start: state.start,
            end,
            start_x: state.start_x,
            end_x,
            max_x: self.geometry.max_x,
            blank_count: blanks,
            metrics,
            line_space: line_space(self.format.line_spacing, metrics.height),
            y: 0.0,
            last_tab: tab_offsets.last().map(|t| t.pos),
            tab_offsets,
            reformat,
            hyphenated: false,
            is_first_line,
            ends_with_line_break: end > state.start
                && matches!(arena.leaf(end - 1), Leaf::LineBreak),
        }
    }

    /// Ends the line at the last break opportunity, or right before `pos`.
    fn break_before(&self, state: &LineState, pos: usize, is_first_line: bool) -> LineInfo {
        match state.candidate {
            Some(c) => self.finish(state, c.end, c.end_x, c.blanks, c.tabs, is_first_line),
            None => self.finish(
                state,
                pos,
                state.content_end_x,
                state.interior_blanks,
                state.tab_offsets.len(),
                is_first_line,
            ),
        }
    }

    fn place_content(&self, state: &mut LineState, width: f32) {
        state.x += width;
        state.content_end_x = state.x;
        state.interior_blanks += state.trailing_blanks;
        state.trailing_blanks = 0;
        state.has_content = true;
    }

    fn measure_line(&self, start: usize, is_first_line: bool) -> LineInfo {
        let arena = self.leaves.arena;
        let max_x = self.geometry.max_x;
        let mut x = if is_first_line {
            self.geometry.first_line_left
        } else {
            self.geometry.left
        };

        // The list symbol sits at the first-line position and the text
        // continues at the next tab stop.
        if is_first_line && let Some(symbol) = self.list_symbol {
            let number_position = self.format.list_info.as_ref().map_or(0.0, |l| l.number_position);
            let after_symbol = x + number_position + symbol.width;
            x = self
                .next_tab_stop(after_symbol, true)
                .map_or(after_symbol, |s| s.position.max(after_symbol));
        }

        let mut state = LineState {
            start,
            start_x: x,
            x,
            content_end_x: x,
            has_content: false,
            interior_blanks: 0,
            trailing_blanks: 0,
            candidate: None,
            tab_offsets: Vec::new(),
        };

        let mut pos = start;
        while pos < arena.len() {
            match arena.leaf(pos) {
                Leaf::Blank => {
                    state.x += self.leaves.space_width(pos);
                    state.trailing_blanks += 1;
                    if state.has_content {
                        state.candidate = Some(Candidate {
                            end: pos + 1,
                            end_x: state.content_end_x,
                            blanks: state.interior_blanks,
                            tabs: state.tab_offsets.len(),
                        });
                    }
                }
                Leaf::Word(_) | Leaf::Symbol { .. } | Leaf::Field(_) | Leaf::Image(_) => {
                    let width = self.leaves.content_width(pos, FieldText::Measuring);
                    if state.has_content && state.x + width > max_x + TOLERANCE {
                        return self.break_before(&state, pos, is_first_line);
                    }
                    self.place_content(&mut state, width);
                }
                Leaf::Tab => {
                    let Some(stop) = self.next_tab_stop(state.x, is_first_line) else {
                        if state.has_content {
                            return self.finish(
                                &state,
                                pos,
                                state.content_end_x,
                                state.interior_blanks,
                                state.tab_offsets.len(),
                                is_first_line,
                            );
                        }
                        // Nothing before it on the line: the tab collapses.
                        state.tab_offsets.push(TabOffset {
                            pos,
                            x: state.x,
                            width: 0.0,
                            leader: TabLeader::Spaces,
                        });
                        pos += 1;
                        continue;
                    };
                    let target = match stop.alignment {
                        TabAlignment::Left => stop.position,
                        TabAlignment::Right => stop.position - self.probe_segment(pos, stop.alignment),
                        TabAlignment::Center => {
                            stop.position - self.probe_segment(pos, stop.alignment) / 2.0
                        }
                        TabAlignment::Decimal => stop.position - self.probe_segment(pos, stop.alignment),
                    }
                    .max(state.x);
                    state.tab_offsets.push(TabOffset {
                        pos,
                        x: state.x,
                        width: target - state.x,
                        leader: stop.leader,
                    });
                    state.x = target;
                    state.content_end_x = target;
                    state.has_content = true;
                    // Only blanks after the last tab are stretched.
                    state.interior_blanks = 0;
                    state.trailing_blanks = 0;
                }
                Leaf::LineBreak => {
                    return self.finish(
                        &state,
                        pos + 1,
                        state.content_end_x,
                        state.interior_blanks,
                        state.tab_offsets.len(),
                        is_first_line,
                    );
                }
                Leaf::SoftHyphen => {
                    let next_width = match arena.iter_at(pos).peek_next() {
                        Some(leaf) if leaf.is_content() => {
                            self.leaves.content_width(pos + 1, FieldText::Measuring)
                        }
                        _ => 0.0,
                    };
                    if state.x + next_width > max_x + TOLERANCE {
                        let hyphen = self.leaves.hyphen_width(pos);
                        if state.x + hyphen <= max_x + TOLERANCE || state.candidate.is_none() {
                            let mut line = self.finish(
                                &state,
                                pos + 1,
                                state.x + hyphen,
                                state.interior_blanks,
                                state.tab_offsets.len(),
                                is_first_line,
                            );
                            line.hyphenated = true;
                            return line;
                        }
                        return self.break_before(&state, pos, is_first_line);
                    }
                }
                Leaf::Bookmark(_) => {}
            }
            pos += 1;
        }

        self.finish(
            &state,
            arena.len(),
            state.content_end_x,
            state.interior_blanks,
            state.tab_offsets.len(),
            is_first_line,
        )
    }
}
