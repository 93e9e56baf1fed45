use super::point::Point;
use serde::{Deserialize, Serialize};

/// Axis-aligned integer rectangle. Zero width or height is allowed and
/// describes a segment or a point (used for edge spans).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub min: Point<i64>,
    pub max: Point<i64>,
}

impl Rect {
    pub fn new(min: Point<i64>, max: Point<i64>) -> Self {
        Self { min, max }
    }

    /// Normalizes the corners, so `a` and `b` may be given in any order.
    pub fn from_points(a: Point<i64>, b: Point<i64>) -> Self {
        Self {
            min: Point::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn from_sides(x0: i64, y0: i64, x1: i64, y1: i64) -> Self {
        Self::from_points(Point::new(x0, y0), Point::new(x1, y1))
    }

    /// Box of half-size `half` in both directions around `center`.
    pub fn centered(center: Point<i64>, half: i64) -> Self {
        Self::new(
            Point::new(center.x - half, center.y - half),
            Point::new(center.x + half, center.y + half),
        )
    }

    pub fn width(&self) -> i64 {
        self.max.x - self.min.x
    }
    pub fn height(&self) -> i64 {
        self.max.y - self.min.y
    }
    pub fn area(&self) -> i64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> Point<i64> {
        Point::new((self.min.x + self.max.x) / 2, (self.min.y + self.max.y) / 2)
    }

    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y
    }

    pub fn enlarged(&self, d: i64) -> Rect {
        Rect::new(
            Point::new(self.min.x - d, self.min.y - d),
            Point::new(self.max.x + d, self.max.y + d),
        )
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect::new(
            Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        )
    }

    /// Interiors overlap (touching edges do not count).
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    /// Closed intersection test, touching edges or corners count.
    pub fn interacts(&self, other: &Rect) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    pub fn contains(&self, p: Point<i64>) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.contains(other.min) && self.contains(other.max)
    }

    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let r = Rect::new(
            Point::new(self.min.x.max(other.min.x), self.min.y.max(other.min.y)),
            Point::new(self.max.x.min(other.max.x), self.max.y.min(other.max.y)),
        );
        r.is_valid().then_some(r)
    }

    /// Chebyshev distance from `p` to the rectangle, 0 if `p` is inside.
    pub fn distance_to(&self, p: Point<i64>) -> i64 {
        let dx = (self.min.x - p.x).max(p.x - self.max.x).max(0);
        let dy = (self.min.y - p.y).max(p.y - self.max.y).max(0);
        dx.max(dy)
    }

    /// Parts of `self` not covered by `other`. Only meaningful for
    /// rectangles with positive area.
    pub fn subtract(&self, other: &Rect) -> Vec<Rect> {
        if !self.overlaps(other) {
            return vec![*self];
        }
        let mut pieces = Vec::with_capacity(4);
        if other.min.x > self.min.x {
            pieces.push(Rect::new(self.min, Point::new(other.min.x, self.max.y)));
        }
        if other.max.x < self.max.x {
            pieces.push(Rect::new(Point::new(other.max.x, self.min.y), self.max));
        }
        let mid_x0 = self.min.x.max(other.min.x);
        let mid_x1 = self.max.x.min(other.max.x);
        if other.min.y > self.min.y {
            pieces.push(Rect::new(
                Point::new(mid_x0, self.min.y),
                Point::new(mid_x1, other.min.y),
            ));
        }
        if other.max.y < self.max.y {
            pieces.push(Rect::new(
                Point::new(mid_x0, other.max.y),
                Point::new(mid_x1, self.max.y),
            ));
        }
        pieces
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_chebyshev() {
        let r = Rect::from_sides(5, -2, 15, 2);
        assert_eq!(r.distance_to(Point::new(0, 0)), 5);
        assert_eq!(r.distance_to(Point::new(10, 0)), 0);
        assert_eq!(r.distance_to(Point::new(0, 10)), 8);
        assert_eq!(r.distance_to(Point::new(20, 5)), 5);
    }

    #[test]
    fn subtract_hole_leaves_four_pieces() {
        let outer = Rect::from_sides(0, 0, 100, 100);
        let hole = Rect::from_sides(40, 40, 60, 60);
        let pieces = outer.subtract(&hole);
        assert_eq!(pieces.len(), 4);
        let area: i64 = pieces.iter().map(|r| r.area()).sum();
        assert_eq!(area, 100 * 100 - 20 * 20);
        assert!(pieces.iter().all(|p| !p.overlaps(&hole)));
    }

    #[test]
    fn touching_rects_interact_but_do_not_overlap() {
        let a = Rect::from_sides(0, 0, 10, 10);
        let b = Rect::from_sides(10, 0, 20, 10);
        assert!(a.interacts(&b));
        assert!(!a.overlaps(&b));
        assert_eq!(a.subtract(&b), vec![a]);
    }
}
