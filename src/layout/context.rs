use std::collections::HashMap;

use crate::config::LayoutConfig;
use crate::fonts::TextMeasurer;
use crate::images::ImageSource;
use crate::layout::info::{BookmarkMap, PageNumber};
use crate::model::{Document, DocumentInfo, ListInfo, ListType};

/// Session state of one formatting pass, threaded through every format call.
pub struct FormattingContext<'a> {
    pub measurer: &'a dyn TextMeasurer,
    pub images: &'a dyn ImageSource,
    pub config: &'a LayoutConfig,
    pub document: &'a Document,
    /// Page currently being filled.
    pub current_page: PageNumber,
    pub bookmarks: BookmarkMap,
    list_numbers: HashMap<ListType, u32>,
}

/// Snapshot taken before speculative formatting.
pub struct ContextCheckpoint {
    bookmarks: BookmarkMap,
    list_numbers: HashMap<ListType, u32>,
}

impl<'a> FormattingContext<'a> {
    pub fn new(
        document: &'a Document,
        measurer: &'a dyn TextMeasurer,
        images: &'a dyn ImageSource,
        config: &'a LayoutConfig,
    ) -> Self {
        Self {
            measurer,
            images,
            config,
            document,
            current_page: PageNumber::default(),
            bookmarks: BookmarkMap::new(),
            list_numbers: HashMap::new(),
        }
    }

    pub fn default_tab_stop(&self) -> f32 {
        self.document.default_tab_stop
    }

    pub fn document_info(&self) -> &'a DocumentInfo {
        &self.document.info
    }

    /// Advances the counter for `list` and returns the number of this item.
    pub fn next_list_number(&mut self, list: &ListInfo) -> u32 {
        let counter = self.list_numbers.entry(list.list_type).or_insert(0);
        if !list.continue_previous_list {
            *counter = 0;
        }
        *counter += 1;
        *counter
    }

    pub fn record_bookmark(&mut self, name: &str) {
        self.bookmarks.insert(name.to_string(), self.current_page);
    }

    pub fn checkpoint(&self) -> ContextCheckpoint {
        ContextCheckpoint {
            bookmarks: self.bookmarks.clone(),
            list_numbers: self.list_numbers.clone(),
        }
    }

    pub fn restore(&mut self, checkpoint: ContextCheckpoint) {
        self.bookmarks = checkpoint.bookmarks;
        self.list_numbers = checkpoint.list_numbers;
    }
}
