//! Caller-facing façade: one format pass, then any number of page renders.

use std::time::Instant;

use crate::config::LayoutConfig;
use crate::error::{Error, Result};
use crate::fonts::TextMeasurer;
use crate::graphics::Canvas;
use crate::images::ImageSource;
use crate::layout::{
    FormattedDocument, FormattedPage, FormattingContext, PageInfo, PaintContext, RenderInfo, paint,
};
use crate::model::{Block, Document};

/// Which page bands `render_page` paints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderOptions {
    pub header: bool,
    pub content: bool,
    pub footer: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            header: true,
            content: true,
            footer: true,
        }
    }
}

impl RenderOptions {
    pub fn content_only() -> Self {
        Self {
            header: false,
            content: true,
            footer: false,
        }
    }
}

pub struct DocumentRenderer<'a> {
    document: &'a Document,
    measurer: &'a dyn TextMeasurer,
    images: &'a dyn ImageSource,
    config: LayoutConfig,
    formatted: Option<FormattedDocument<'a>>,
}

impl<'a> DocumentRenderer<'a> {
    pub fn new(
        document: &'a Document,
        measurer: &'a dyn TextMeasurer,
        images: &'a dyn ImageSource,
    ) -> Self {
        Self::with_config(document, measurer, images, LayoutConfig::default())
    }

    pub fn with_config(
        document: &'a Document,
        measurer: &'a dyn TextMeasurer,
        images: &'a dyn ImageSource,
        config: LayoutConfig,
    ) -> Self {
        Self {
            document,
            measurer,
            images,
            config,
            formatted: None,
        }
    }

    pub fn document(&self) -> &'a Document {
        self.document
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn measurer(&self) -> &'a dyn TextMeasurer {
        self.measurer
    }

    pub fn images(&self) -> &'a dyn ImageSource {
        self.images
    }

    /// Runs the format pass over the whole document. Calling it again
    /// discards the previous result and formats from scratch.
    pub fn prepare_document(&mut self) -> Result<()> {
        let t0 = Instant::now();
        self.formatted = None;
        let formatted = {
            let mut ctx =
                FormattingContext::new(self.document, self.measurer, self.images, &self.config);
            FormattedDocument::format(self.document, &mut ctx)?
        };
        log::info!(
            "Timing: format={:.1}ms ({} sections, {} pages)",
            t0.elapsed().as_secs_f64() * 1000.0,
            self.document.sections.len(),
            formatted.page_count(),
        );
        self.formatted = Some(formatted);
        Ok(())
    }

    pub fn is_prepared(&self) -> bool {
        self.formatted.is_some()
    }

    pub fn formatted(&self) -> Result<&FormattedDocument<'a>> {
        self.formatted.as_ref().ok_or(Error::NotPrepared)
    }

    pub fn page_count(&self) -> Result<usize> {
        Ok(self.formatted()?.page_count())
    }

    /// Page record by 1-based physical number.
    pub fn page(&self, page: usize) -> Result<&FormattedPage<'a>> {
        self.formatted()?
            .page(page)
            .ok_or(Error::PageOutOfRange(page))
    }

    pub fn page_info(&self, page: usize) -> Result<PageInfo> {
        Ok(self.page(page)?.info)
    }

    /// Paints the selected bands of `page` (1-based). Reads formatting
    /// results only, so pages may be rendered in any order or concurrently.
    pub fn render_page(
        &self,
        page: usize,
        canvas: &mut dyn Canvas,
        options: RenderOptions,
    ) -> Result<()> {
        let formatted = self.formatted()?;
        let fp = self.page(page)?;
        let pctx = PaintContext {
            measurer: self.measurer,
            images: self.images,
            config: &self.config,
            info: &self.document.info,
            default_tab_stop: self.document.default_tab_stop,
            field_infos: &fp.field_infos,
            bookmarks: &formatted.bookmarks,
        };
        let bands: [(bool, &[RenderInfo<'a>]); 3] = [
            (options.header, &fp.header),
            (options.footer, &fp.footer),
            (options.content, &fp.content),
        ];
        for (_, infos) in bands.into_iter().filter(|(on, _)| *on) {
            for info in infos {
                paint(info, &pctx, canvas);
            }
        }
        Ok(())
    }

    /// Distinct top-level blocks with a fragment in the body of `page`, in
    /// the order they were placed.
    pub fn document_objects_from_page(&self, page: usize) -> Result<Vec<&'a Block>> {
        let mut blocks: Vec<&'a Block> = Vec::new();
        for info in &self.page(page)?.content {
            if !blocks.iter().any(|b| std::ptr::eq(*b, info.element)) {
                blocks.push(info.element);
            }
        }
        Ok(blocks)
    }

    /// Physical page the bookmark landed on, `None` for unknown names.
    pub fn bookmark_physical_page(&self, name: &str) -> Result<Option<usize>> {
        Ok(self.formatted()?.bookmark(name).map(|p| p.physical))
    }

    /// Page number printed on the page the bookmark landed on.
    pub fn bookmark_shown_page(&self, name: &str) -> Result<Option<u32>> {
        Ok(self.formatted()?.bookmark(name).map(|p| p.shown))
    }
}
