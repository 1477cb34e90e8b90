use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDateTime;

use crate::error::{Error, Result};

/// Cooperative cancellation flag, checked before every element format step.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Engine knobs for one formatting pass.
#[derive(Clone, Debug)]
pub struct LayoutConfig {
    /// Minimum lines at either side of a paragraph split when widow control is on.
    pub widow_lines: usize,
    /// How many following elements a keep-with-next chain may pull along.
    pub keep_with_next_lookahead: usize,
    /// Edge length of the placeholder drawn for images that fail to load.
    pub image_fallback_size: f32,
    pub default_image_resolution: f32,
    /// Value of date fields; fixed for the whole pass.
    pub print_date: NaiveDateTime,
    pub cancel: Option<CancellationToken>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            widow_lines: 2,
            keep_with_next_lookahead: 10,
            // 2.5 cm
            image_fallback_size: 70.866,
            default_image_resolution: 72.0,
            print_date: chrono::Local::now().naive_local(),
            cancel: None,
        }
    }
}

impl LayoutConfig {
    pub fn with_print_date(mut self, date: NaiveDateTime) -> Self {
        self.print_date = date;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub(crate) fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(Error::Cancelled),
            _ => Ok(()),
        }
    }
}
