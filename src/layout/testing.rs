//! Deterministic collaborators for unit tests.

use crate::fonts::{FontMetrics, TextMeasurer};
use crate::images::{ImageFailure, ImageInfo, ImageSource};
use crate::model::Font;

/// Every char is a tenth of the font size wide; lines are 1.2 x size.
pub struct Fixed;

impl TextMeasurer for Fixed {
    fn measure_string(&self, text: &str, font: &Font) -> f32 {
        text.chars().count() as f32 * font.size / 10.0
    }

    fn font_metrics(&self, font: &Font) -> FontMetrics {
        FontMetrics {
            ascent: font.size * 0.8,
            descent: font.size * 0.2,
            line_height: font.size * 1.2,
        }
    }
}

pub struct NoImages;

impl ImageSource for NoImages {
    fn intrinsic(&self, _: &str) -> Result<ImageInfo, ImageFailure> {
        Err(ImageFailure::FileNotFound)
    }
}
