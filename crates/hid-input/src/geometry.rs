//! Desktop coordinates and screen-bounds clamping.

use serde::{Deserialize, Serialize};

/// A point in global desktop coordinates (top-left origin, pixels).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Offset this point by a delta.
    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// A rectangle of the desktop, usually one display or the union of all.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the rectangle covers no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Smallest rectangle containing both `self` and `other`.
    ///
    /// Empty rectangles do not contribute.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        if other.is_empty() {
            return self;
        }
        if self.is_empty() {
            return other;
        }
        let left = self.x.min(other.x);
        let top = self.y.min(other.y);
        let right = (self.x + self.width).max(other.x + other.width);
        let bottom = (self.y + self.height).max(other.y + other.height);
        Self::new(left, top, right - left, bottom - top)
    }

    /// Centre of the rectangle.
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Restrict `point` to the last addressable pixel on each axis.
    ///
    /// An empty rectangle leaves the point unchanged.
    #[must_use]
    pub fn clamp(&self, point: Point) -> Point {
        if self.is_empty() {
            return point;
        }
        let max_x = self.x + (self.width - 1.0).max(0.0);
        let max_y = self.y + (self.height - 1.0).max(0.0);
        Point::new(point.x.clamp(self.x, max_x), point.y.clamp(self.y, max_y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: Bounds = Bounds::new(0.0, 0.0, 1920.0, 1080.0);

    #[test]
    fn clamp_inside_is_identity() {
        let p = Point::new(100.5, 200.25);
        assert_eq!(SCREEN.clamp(p), p);
    }

    #[test]
    fn clamp_negative_to_origin() {
        assert_eq!(SCREEN.clamp(Point::new(-50.0, -1.0)), Point::new(0.0, 0.0));
    }

    #[test]
    fn clamp_past_edge_to_last_pixel() {
        assert_eq!(
            SCREEN.clamp(Point::new(5000.0, 1080.0)),
            Point::new(1919.0, 1079.0)
        );
    }

    #[test]
    fn clamp_respects_offset_origin() {
        let secondary = Bounds::new(-1280.0, 0.0, 1280.0, 1024.0);
        assert_eq!(
            secondary.clamp(Point::new(-2000.0, 2000.0)),
            Point::new(-1280.0, 1023.0)
        );
    }

    #[test]
    fn clamp_empty_bounds_is_identity() {
        let p = Point::new(-10.0, 99_999.0);
        assert_eq!(Bounds::default().clamp(p), p);
    }

    #[test]
    fn union_spans_both_displays() {
        let left = Bounds::new(-1280.0, 100.0, 1280.0, 1024.0);
        let merged = SCREEN.union(left);
        assert_eq!(merged, Bounds::new(-1280.0, 0.0, 3200.0, 1124.0));
    }

    #[test]
    fn union_ignores_empty() {
        assert_eq!(SCREEN.union(Bounds::default()), SCREEN);
        assert_eq!(Bounds::default().union(SCREEN), SCREEN);
    }

    #[test]
    fn center_and_offset() {
        assert_eq!(SCREEN.center(), Point::new(960.0, 540.0));
        assert_eq!(Point::new(1.0, 2.0).offset(-3.0, 4.5), Point::new(-2.0, 6.5));
    }
}
