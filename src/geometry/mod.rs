//! Geometric primitives for character boxes and line rectangles.
//!
//! Coordinates follow the layout collaborator: origin at the top-left of the
//! page, y growing downwards, units in points.

use serde::{Deserialize, Serialize};

/// A 2D point in page space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: f32,
    /// Y coordinate
    pub y: f32,
}

impl Point {
    /// Create a new point.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_pii::geometry::Point;
    ///
    /// let point = Point::new(10.0, 20.0);
    /// assert_eq!(point.x, 10.0);
    /// assert_eq!(point.y, 20.0);
    /// ```
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A rectangle in page space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// X coordinate of top-left corner
    pub x: f32,
    /// Y coordinate of top-left corner
    pub y: f32,
    /// Width of rectangle
    pub width: f32,
    /// Height of rectangle
    pub height: f32,
}

impl Rect {
    /// Create a new rectangle from position and dimensions.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_pii::geometry::Rect;
    ///
    /// let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
    /// assert_eq!(rect.width, 100.0);
    /// assert_eq!(rect.height, 50.0);
    /// ```
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle from two corner points.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_pii::geometry::Rect;
    ///
    /// let rect = Rect::from_points(10.0, 20.0, 110.0, 70.0);
    /// assert_eq!(rect.x, 10.0);
    /// assert_eq!(rect.width, 100.0);
    /// assert_eq!(rect.height, 50.0);
    /// ```
    pub fn from_points(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        }
    }

    /// Create a rectangle from an `[x0, y0, x1, y1]` array, the shape used by
    /// legacy coordinate tables.
    pub fn from_corners(corners: [f32; 4]) -> Self {
        Self::from_points(corners[0], corners[1], corners[2], corners[3])
    }

    /// The `[x0, y0, x1, y1]` corners of this rectangle.
    pub fn corners(&self) -> [f32; 4] {
        [self.left(), self.top(), self.right(), self.bottom()]
    }

    /// Get the left edge x-coordinate.
    pub fn left(&self) -> f32 {
        self.x
    }

    /// Get the right edge x-coordinate.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Get the top edge y-coordinate.
    pub fn top(&self) -> f32 {
        self.y
    }

    /// Get the bottom edge y-coordinate.
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Get the center point of the rectangle.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_pii::geometry::Rect;
    ///
    /// let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
    /// let center = rect.center();
    /// assert_eq!(center.x, 50.0);
    /// assert_eq!(center.y, 25.0);
    /// ```
    pub fn center(&self) -> Point {
        Point {
            x: self.x + self.width / 2.0,
            y: self.y + self.height / 2.0,
        }
    }

    /// Check if this rectangle intersects with another.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && self.right() > other.left()
            && self.top() < other.bottom()
            && self.bottom() > other.top()
    }

    /// Same rectangle with non-negative width and height.
    ///
    /// Boxes taken from flipped text matrices can arrive with their corners
    /// swapped.
    pub fn normalized(&self) -> Rect {
        let (x0, x1) = (self.left().min(self.right()), self.left().max(self.right()));
        let (y0, y1) = (self.top().min(self.bottom()), self.top().max(self.bottom()));
        Rect::from_points(x0, y0, x1, y1)
    }

    /// True when every edge is a finite number.
    pub fn is_finite(&self) -> bool {
        [self.left(), self.top(), self.right(), self.bottom()]
            .iter()
            .all(|v| v.is_finite())
    }

    /// Check if this rectangle contains a point (edges included).
    pub fn contains_point(&self, p: &Point) -> bool {
        p.x >= self.left() && p.x <= self.right() && p.y >= self.top() && p.y <= self.bottom()
    }

    /// Compute the union of this rectangle with another.
    ///
    /// Returns the smallest rectangle that contains both rectangles.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_pii::geometry::Rect;
    ///
    /// let r1 = Rect::new(0.0, 0.0, 50.0, 50.0);
    /// let r2 = Rect::new(25.0, 25.0, 50.0, 50.0);
    /// let union = r1.union(&r2);
    ///
    /// assert_eq!(union.right(), 75.0);
    /// assert_eq!(union.bottom(), 75.0);
    /// ```
    pub fn union(&self, other: &Rect) -> Rect {
        let x0 = self.left().min(other.left());
        let y0 = self.top().min(other.top());
        let x1 = self.right().max(other.right());
        let y1 = self.bottom().max(other.bottom());
        Rect::from_points(x0, y0, x1, y1)
    }

    /// Compute the area of the rectangle.
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// True when every corner of `other` lies within `tolerance` points of the
    /// matching corner of this rectangle.
    pub fn corners_within(&self, other: &Rect, tolerance: f32) -> bool {
        self.corners()
            .iter()
            .zip(other.corners().iter())
            .all(|(a, b)| (a - b).abs() <= tolerance)
    }

    /// Horizontal gap between two rectangles; negative when they overlap.
    pub fn horizontal_gap(&self, other: &Rect) -> f32 {
        if self.left() <= other.left() {
            other.left() - self.right()
        } else {
            self.left() - other.right()
        }
    }

    /// Quadrilateral in text-markup QuadPoints order:
    /// `x1,y1, x2,y2, x3,y3, x4,y4` counter-clockwise from the lower left.
    pub fn to_quad(&self) -> [f64; 8] {
        let (x0, y0, x1, y1) = (
            self.left() as f64,
            self.top() as f64,
            self.right() as f64,
            self.bottom() as f64,
        );
        [x0, y1, x1, y1, x1, y0, x0, y0]
    }
}

/// Compute the Euclidean distance between two points.
///
/// # Examples
///
/// ```
/// use pdf_pii::geometry::{Point, euclidean_distance};
///
/// let p1 = Point::new(0.0, 0.0);
/// let p2 = Point::new(3.0, 4.0);
///
/// assert_eq!(euclidean_distance(&p1, &p2), 5.0);
/// ```
pub fn euclidean_distance(p1: &Point, p2: &Point) -> f32 {
    ((p2.x - p1.x).powi(2) + (p2.y - p1.y).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_edges() {
        let r = Rect::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(r.left(), 10.0);
        assert_eq!(r.right(), 110.0);
        assert_eq!(r.top(), 20.0);
        assert_eq!(r.bottom(), 70.0);
    }

    #[test]
    fn test_rect_corners_roundtrip() {
        let r = Rect::from_corners([1.0, 2.0, 11.0, 14.0]);
        assert_eq!(r.width, 10.0);
        assert_eq!(r.height, 12.0);
        assert_eq!(r.corners(), [1.0, 2.0, 11.0, 14.0]);
    }

    #[test]
    fn test_rect_intersects() {
        let r1 = Rect::new(0.0, 0.0, 100.0, 100.0);
        let r2 = Rect::new(50.0, 50.0, 100.0, 100.0);
        let r3 = Rect::new(200.0, 200.0, 100.0, 100.0);

        assert!(r1.intersects(&r2));
        assert!(!r1.intersects(&r3));
    }

    #[test]
    fn test_rect_contains_point_edges() {
        let r = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(r.contains_point(&Point::new(0.0, 0.0)));
        assert!(r.contains_point(&Point::new(100.0, 100.0)));
        assert!(!r.contains_point(&Point::new(150.0, 50.0)));
    }

    #[test]
    fn test_corners_within_tolerance() {
        let a = Rect::new(10.0, 10.0, 50.0, 12.0);
        let b = Rect::new(10.4, 9.7, 50.2, 12.1);
        assert!(a.corners_within(&b, 0.5));
        assert!(!a.corners_within(&b, 0.1));
    }

    #[test]
    fn test_horizontal_gap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(12.0, 0.0, 10.0, 10.0);
        assert_eq!(a.horizontal_gap(&b), 2.0);
        assert_eq!(b.horizontal_gap(&a), 2.0);
        assert!(a.horizontal_gap(&Rect::new(5.0, 0.0, 10.0, 10.0)) < 0.0);
    }

    #[test]
    fn test_to_quad() {
        let quad = Rect::new(72.0, 700.0, 100.0, 12.0).to_quad();
        assert_eq!(quad, [72.0, 712.0, 172.0, 712.0, 172.0, 700.0, 72.0, 700.0]);
    }

    #[test]
    fn test_euclidean_distance() {
        assert_eq!(euclidean_distance(&Point::new(0.0, 0.0), &Point::new(3.0, 4.0)), 5.0);
    }
}
