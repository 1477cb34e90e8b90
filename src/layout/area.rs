/// Slack used by every fit comparison.
pub const TOLERANCE: f32 = 0.001;

/// Axis-aligned region in page coordinates (origin top-left, y grows downward).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rectangle {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rectangle {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// The strip of `height` starting at absolute `y`, or `None` when it would
    /// reach past the bottom edge.
    pub fn fitting_rect(&self, y: f32, height: f32) -> Option<Rectangle> {
        if y + height > self.bottom() + TOLERANCE {
            return None;
        }
        Some(Rectangle::new(self.x, y, self.width, height))
    }

    /// Bounding box of both rectangles.
    pub fn unite(&self, other: &Rectangle) -> Rectangle {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rectangle::new(x, y, right - x, bottom - y)
    }

    /// Moves the top edge down by `offset`, keeping the bottom edge in place.
    ///
    /// An offset larger than the height yields a negative height; callers test
    /// the result before flowing content into it.
    pub fn lower(&self, offset: f32) -> Rectangle {
        Rectangle::new(self.x, self.y + offset, self.width, self.height - offset)
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Rectangle {
        Rectangle::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    pub fn is_degenerate(&self) -> bool {
        self.height < 0.0 || self.width < 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fitting_rect_respects_tolerance() {
        let area = Rectangle::new(10.0, 10.0, 50.0, 50.0);
        assert!(area.fitting_rect(58.0, 12.0).is_none());
        let fit = area.fitting_rect(48.0, 12.0005).unwrap();
        assert_eq!(fit.x, 10.0);
        assert_eq!(fit.width, 50.0);
        assert!(area.fitting_rect(48.0, 12.01).is_none());
    }

    #[test]
    fn unite_covers_both() {
        let a = Rectangle::new(0.0, 0.0, 10.0, 10.0);
        let b = Rectangle::new(5.0, 20.0, 10.0, 5.0);
        assert_eq!(a.unite(&b), Rectangle::new(0.0, 0.0, 15.0, 25.0));
    }

    #[test]
    fn lower_past_height_goes_negative() {
        let area = Rectangle::new(0.0, 0.0, 100.0, 20.0);
        let lowered = area.lower(30.0);
        assert_eq!(lowered.y, 30.0);
        assert_eq!(lowered.height, -10.0);
        assert!(lowered.is_degenerate());
        assert!(lowered.fitting_rect(30.0, 1.0).is_none());
        // A zero-height request at the lowered top still "fits" the bottom edge
        // only when it does not pass it.
        assert!(lowered.fitting_rect(20.0, 0.0).is_some());
    }
}
