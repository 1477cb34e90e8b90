//! Images, text frames and charts: atomic boxes that never split.

use crate::config::LayoutConfig;
use crate::error::Result;
use crate::graphics::{Canvas, Pen};
use crate::images::{ImageFailure, ImageSource};
use crate::layout::area::{Rectangle, TOLERANCE};
use crate::layout::context::FormattingContext;
use crate::layout::info::{FormatInfo, LayoutInfo, RenderInfo};
use crate::layout::renderer::{PaintContext, paint};
use crate::layout::top_down::{SingleAreaProvider, TopDownFormatter};
use crate::model::{
    Block, Chart, ChartKind, Color, Font, Image, LineFormat, ShapeLayout, TextFrame,
};

/// Size an image takes in the layout, and why it could not be loaded if so.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImageExtent {
    pub width: f32,
    pub height: f32,
    pub failure: Option<ImageFailure>,
}

pub fn image_extent(image: &Image, images: &dyn ImageSource, config: &LayoutConfig) -> ImageExtent {
    let fallback = |failure: ImageFailure| {
        let pick = |v: Option<f32>| v.filter(|v| *v > 0.0).unwrap_or(config.image_fallback_size);
        ImageExtent {
            width: pick(image.width),
            height: pick(image.height),
            failure: Some(failure),
        }
    };
    let info = match images.intrinsic(&image.source) {
        Ok(info) => info,
        Err(failure) => return fallback(failure),
    };
    let dpi = image
        .resolution
        .or(info.resolution)
        .filter(|r| *r > 0.0)
        .unwrap_or(config.default_image_resolution);
    let natural_w = info.width_px as f32 * 72.0 / dpi;
    let natural_h = info.height_px as f32 * 72.0 / dpi;
    let lock = image.lock_aspect_ratio && natural_w > 0.0 && natural_h > 0.0;
    let (w, h) = match (image.width, image.height) {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) if lock => (w, w * natural_h / natural_w),
        (Some(w), None) => (w, natural_h),
        (None, Some(h)) if lock => (h * natural_w / natural_h, h),
        (None, Some(h)) => (natural_w, h),
        (None, None) => (natural_w, natural_h),
    };
    let (w, h) = (w * image.scale_width, h * image.scale_height);
    if w <= 0.0 || h <= 0.0 {
        return fallback(ImageFailure::EmptySize);
    }
    ImageExtent {
        width: w,
        height: h,
        failure: None,
    }
}

/// Format state of an image, frame or chart.
#[derive(Clone, Debug)]
pub struct ShapeFormatInfo<'d> {
    pub placed: bool,
    pub failure: Option<ImageFailure>,
    /// Formatted content of a text frame.
    pub contents: Vec<RenderInfo<'d>>,
}

impl ShapeFormatInfo<'_> {
    pub fn is_empty(&self) -> bool {
        !self.placed
    }
}

fn shape_layout_info(layout: &ShapeLayout, width: f32) -> LayoutInfo {
    LayoutInfo {
        margin_top: layout.space_before,
        margin_bottom: layout.space_after,
        horizontal_reference: layout.relative_horizontal,
        vertical_reference: layout.relative_vertical,
        left: layout.left,
        top: layout.top,
        wrap: layout.wrap,
        min_width: width,
        keep_together: true,
        ..LayoutInfo::default()
    }
}

/// Common fit test and record assembly for every shape.
fn place<'d>(
    block: &'d Block,
    layout: LayoutInfo,
    area: Rectangle,
    size: (f32, f32),
    top_of_area: bool,
    failure: Option<ImageFailure>,
    contents: Vec<RenderInfo<'d>>,
) -> RenderInfo<'d> {
    let (width, height) = size;
    let fits = layout.is_floating() || height <= area.height + TOLERANCE || top_of_area;
    if !fits {
        log::debug!("{} of height {height:.1} deferred to the next area", block.kind_name());
    }
    let mut layout = layout;
    layout.content_area = Rectangle::new(area.x, area.y, width, if fits { height } else { 0.0 });
    RenderInfo {
        element: block,
        format: FormatInfo::Shape(ShapeFormatInfo {
            placed: fits,
            failure,
            contents: if fits { contents } else { Vec::new() },
        }),
        layout,
    }
}

pub struct ImageRenderer<'d> {
    block: &'d Block,
    image: &'d Image,
}

impl<'d> ImageRenderer<'d> {
    pub fn new(block: &'d Block, image: &'d Image) -> Self {
        Self { block, image }
    }

    pub fn initial_layout_info(&self) -> LayoutInfo {
        shape_layout_info(&self.image.layout, self.image.width.unwrap_or(0.0))
    }

    pub fn format(
        &mut self,
        area: Rectangle,
        top_of_area: bool,
        ctx: &mut FormattingContext<'_>,
    ) -> Result<RenderInfo<'d>> {
        let extent = image_extent(self.image, ctx.images, ctx.config);
        if let Some(failure) = extent.failure {
            log::warn!("Image '{}': {}", self.image.source, failure.message());
        }
        Ok(place(
            self.block,
            self.initial_layout_info(),
            area,
            (extent.width, extent.height),
            top_of_area,
            extent.failure,
            Vec::new(),
        ))
    }
}

pub struct TextFrameRenderer<'d> {
    block: &'d Block,
    frame: &'d TextFrame,
}

impl<'d> TextFrameRenderer<'d> {
    pub fn new(block: &'d Block, frame: &'d TextFrame) -> Self {
        Self { block, frame }
    }

    pub fn initial_layout_info(&self) -> LayoutInfo {
        shape_layout_info(&self.frame.layout, self.frame.width)
    }

    pub fn format(
        &mut self,
        area: Rectangle,
        top_of_area: bool,
        ctx: &mut FormattingContext<'_>,
    ) -> Result<RenderInfo<'d>> {
        let f = self.frame;
        let inner = Rectangle::new(
            area.x + f.margin_left,
            area.y + f.margin_top,
            f.width - f.margin_left - f.margin_right,
            f.height - f.margin_top - f.margin_bottom,
        );
        let mut provider = SingleAreaProvider::new(inner);
        TopDownFormatter::new(&f.elements).format_on_areas(&mut provider, ctx)?;
        if provider.clipped() {
            log::warn!("Text frame content does not fit into {:.1}x{:.1}, clipping", f.width, f.height);
        }
        Ok(place(
            self.block,
            self.initial_layout_info(),
            area,
            (f.width, f.height),
            top_of_area,
            None,
            provider.into_render_infos(),
        ))
    }
}

pub struct ChartRenderer<'d> {
    block: &'d Block,
    chart: &'d Chart,
}

impl<'d> ChartRenderer<'d> {
    pub fn new(block: &'d Block, chart: &'d Chart) -> Self {
        Self { block, chart }
    }

    pub fn initial_layout_info(&self) -> LayoutInfo {
        shape_layout_info(&self.chart.layout, self.chart.width)
    }

    pub fn format(&mut self, area: Rectangle, top_of_area: bool) -> Result<RenderInfo<'d>> {
        Ok(place(
            self.block,
            self.initial_layout_info(),
            area,
            (self.chart.width, self.chart.height),
            top_of_area,
            None,
            Vec::new(),
        ))
    }
}

// ---------------------------------------------------------------------------
// Painting
// ---------------------------------------------------------------------------

/// Box drawn instead of an image that could not be loaded.
pub fn paint_image_placeholder(canvas: &mut dyn Canvas, rect: Rectangle, failure: ImageFailure) {
    canvas.stroke_rect(rect, &Pen::solid(0.5, Color::GRAY));
    let font = Font {
        size: 6.0,
        color: Color::RED,
        ..Font::default()
    };
    canvas.draw_string(failure.message(), &font, rect.x + 2.0, rect.y + 8.0);
}

fn paint_frame(canvas: &mut dyn Canvas, rect: Rectangle, fill: Option<Color>, line: Option<&LineFormat>) {
    if let Some(color) = fill {
        canvas.fill_rect(rect, color);
    }
    if let Some(line) = line {
        canvas.stroke_rect(rect, &Pen::from(line));
    }
}

pub fn paint_shape(info: &RenderInfo<'_>, shape: &ShapeFormatInfo<'_>, pctx: &PaintContext<'_>, canvas: &mut dyn Canvas) {
    if !shape.placed {
        return;
    }
    let rect = info.layout.content_area;
    match info.element {
        Block::Image(image) => {
            match shape.failure {
                Some(failure) => paint_image_placeholder(canvas, rect, failure),
                None => canvas.draw_image(&image.source, rect),
            }
            if let Some(line) = &image.line {
                canvas.stroke_rect(rect, &Pen::from(line));
            }
        }
        Block::TextFrame(frame) => {
            paint_frame(canvas, rect, frame.fill, frame.line.as_ref());
            for content in &shape.contents {
                paint(content, pctx, canvas);
            }
        }
        Block::Chart(chart) => {
            paint_frame(canvas, rect, chart.fill, chart.line.as_ref());
            paint_chart(chart, rect, pctx, canvas);
        }
        _ => {}
    }
}

const PALETTE: [Color; 6] = [
    Color::rgb(79, 129, 189),
    Color::rgb(192, 80, 77),
    Color::rgb(155, 187, 89),
    Color::rgb(128, 100, 162),
    Color::rgb(75, 172, 198),
    Color::rgb(247, 150, 70),
];

fn series_color(chart: &Chart, idx: usize) -> Color {
    chart.series[idx]
        .color
        .unwrap_or(PALETTE[idx % PALETTE.len()])
}

fn paint_chart(chart: &Chart, rect: Rectangle, pctx: &PaintContext<'_>, canvas: &mut dyn Canvas) {
    const PAD: f32 = 6.0;
    let mut plot = Rectangle::new(
        rect.x + PAD,
        rect.y + PAD,
        rect.width - 2.0 * PAD,
        rect.height - 2.0 * PAD,
    );
    if let Some(title) = &chart.title {
        let font = Font {
            size: 10.0,
            bold: true,
            ..Font::default()
        };
        let metrics = pctx.measurer.font_metrics(&font);
        let w = pctx.measurer.measure_string(title, &font);
        canvas.draw_string(title, &font, rect.x + (rect.width - w) / 2.0, plot.y + metrics.ascent);
        plot = plot.lower(metrics.line_height + 2.0);
    }
    if plot.width <= 0.0 || plot.height <= 0.0 || chart.series.is_empty() {
        return;
    }

    let categories = chart.series.iter().map(|s| s.values.len()).max().unwrap_or(0);
    let max = chart
        .series
        .iter()
        .flat_map(|s| s.values.iter().copied())
        .fold(0.0f64, f64::max);
    if categories == 0 {
        return;
    }
    let axis = Pen::solid(0.5, Color::BLACK);

    match chart.kind {
        ChartKind::Column | ChartKind::Bar | ChartKind::Line if max <= 0.0 => {}
        ChartKind::Column => {
            canvas.line(plot.x, plot.bottom(), plot.right(), plot.bottom(), &axis);
            let group = plot.width / categories as f32;
            let bar = group / (chart.series.len() as f32 + 1.0);
            for (si, series) in chart.series.iter().enumerate() {
                for (ci, value) in series.values.iter().enumerate() {
                    let h = (value.max(0.0) / max) as f32 * plot.height;
                    let x = plot.x + ci as f32 * group + bar * (si as f32 + 0.5);
                    canvas.fill_rect(Rectangle::new(x, plot.bottom() - h, bar, h), series_color(chart, si));
                }
            }
        }
        ChartKind::Bar => {
            canvas.line(plot.x, plot.y, plot.x, plot.bottom(), &axis);
            let group = plot.height / categories as f32;
            let bar = group / (chart.series.len() as f32 + 1.0);
            for (si, series) in chart.series.iter().enumerate() {
                for (ci, value) in series.values.iter().enumerate() {
                    let w = (value.max(0.0) / max) as f32 * plot.width;
                    let y = plot.y + ci as f32 * group + bar * (si as f32 + 0.5);
                    canvas.fill_rect(Rectangle::new(plot.x, y, w, bar), series_color(chart, si));
                }
            }
        }
        ChartKind::Line => {
            canvas.line(plot.x, plot.bottom(), plot.right(), plot.bottom(), &axis);
            let step = if categories > 1 {
                plot.width / (categories - 1) as f32
            } else {
                0.0
            };
            for (si, series) in chart.series.iter().enumerate() {
                let pen = Pen::solid(1.5, series_color(chart, si));
                let points: Vec<(f32, f32)> = series
                    .values
                    .iter()
                    .enumerate()
                    .map(|(ci, v)| {
                        (
                            plot.x + ci as f32 * step,
                            plot.bottom() - (v.max(0.0) / max) as f32 * plot.height,
                        )
                    })
                    .collect();
                for pair in points.windows(2) {
                    canvas.line(pair[0].0, pair[0].1, pair[1].0, pair[1].1, &pen);
                }
            }
        }
        ChartKind::Pie => {
            let values = &chart.series[0].values;
            let total: f64 = values.iter().filter(|v| **v > 0.0).sum();
            if total <= 0.0 {
                return;
            }
            let radius = plot.width.min(plot.height) / 2.0;
            let (cx, cy) = (plot.x + plot.width / 2.0, plot.y + plot.height / 2.0);
            let mut start = 90.0f32;
            for (i, v) in values.iter().enumerate().filter(|(_, v)| **v > 0.0) {
                let sweep = -((v / total) as f32) * 360.0;
                let color = PALETTE[i % PALETTE.len()];
                canvas.arc(cx, cy, radius, start, sweep, Some(&Pen::solid(0.5, Color::WHITE)), Some(color));
                start += sweep;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::ImageInfo;

    struct Sized(u32, u32, Option<f32>);

    impl ImageSource for Sized {
        fn intrinsic(&self, _: &str) -> std::result::Result<ImageInfo, ImageFailure> {
            Ok(ImageInfo {
                width_px: self.0,
                height_px: self.1,
                resolution: self.2,
            })
        }
    }

    struct Broken;

    impl ImageSource for Broken {
        fn intrinsic(&self, _: &str) -> std::result::Result<ImageInfo, ImageFailure> {
            Err(ImageFailure::InvalidType)
        }
    }

    #[test]
    fn natural_size_uses_resolution() {
        let config = LayoutConfig::default();
        let image = Image::from_source("a.png");
        let e = image_extent(&image, &Sized(300, 150, Some(150.0)), &config);
        assert_eq!((e.width, e.height), (144.0, 72.0));
        let e = image_extent(&image, &Sized(300, 150, None), &config);
        assert_eq!((e.width, e.height), (300.0, 150.0));
    }

    #[test]
    fn locked_aspect_follows_given_width() {
        let config = LayoutConfig::default();
        let image = Image {
            width: Some(100.0),
            ..Image::from_source("a.png")
        };
        let e = image_extent(&image, &Sized(400, 200, None), &config);
        assert_eq!((e.width, e.height), (100.0, 50.0));
        let unlocked = Image {
            lock_aspect_ratio: false,
            ..image
        };
        let e = image_extent(&unlocked, &Sized(400, 200, None), &config);
        assert_eq!((e.width, e.height), (100.0, 200.0));
    }

    #[test]
    fn failure_falls_back_to_configured_size() {
        let config = LayoutConfig::default();
        let e = image_extent(&Image::from_source("x"), &Broken, &config);
        assert_eq!(e.failure, Some(ImageFailure::InvalidType));
        assert_eq!(e.width, config.image_fallback_size);
        assert!(e.height > 0.0);
    }

    #[test]
    fn zero_pixel_image_reports_empty_size() {
        let config = LayoutConfig::default();
        let e = image_extent(&Image::from_source("x"), &Sized(0, 10, None), &config);
        assert_eq!(e.failure, Some(ImageFailure::EmptySize));
    }
}
