//! Rectilinear polygon sets.
//!
//! A [`Region`] is stored as its decomposition into rectangles. The
//! rectangles may overlap; every query treats the region as their union.

use super::point::Point;
use super::rect::Rect;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Region {
    rects: Vec<Rect>,
}

impl Region {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rect(rect: Rect) -> Self {
        Self { rects: vec![rect] }
    }

    pub fn from_rects(rects: impl IntoIterator<Item = Rect>) -> Self {
        Self {
            rects: rects.into_iter().collect(),
        }
    }

    pub fn insert(&mut self, rect: Rect) {
        self.rects.push(rect);
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    pub fn bbox(&self) -> Option<Rect> {
        self.rects.iter().copied().reduce(|a, b| a.union(&b))
    }

    pub fn union(&self, other: &Region) -> Region {
        let mut rects = self.rects.clone();
        rects.extend_from_slice(&other.rects);
        Region { rects }
    }

    pub fn union_with(&mut self, other: &Region) {
        self.rects.extend_from_slice(&other.rects);
    }

    /// Inflates every rectangle by `d` (Minkowski sum with a square).
    /// Inflation distributes over the union, so this is exact for `d >= 0`.
    pub fn sized(&self, d: i64) -> Region {
        debug_assert!(d >= 0, "deflation is not supported");
        Region {
            rects: self.rects.iter().map(|r| r.enlarged(d)).collect(),
        }
    }

    pub fn subtract(&self, other: &Region) -> Region {
        let mut pieces = self.rects.clone();
        for cut in &other.rects {
            pieces = pieces.iter().flat_map(|p| p.subtract(cut)).collect();
            if pieces.is_empty() {
                break;
            }
        }
        Region { rects: pieces }
    }

    pub fn contains_point(&self, p: Point<i64>) -> bool {
        self.rects.iter().any(|r| r.contains(p))
    }

    /// Closed test: touching counts as interaction.
    pub fn interacts(&self, rect: &Rect) -> bool {
        self.rects.iter().any(|r| r.interacts(rect))
    }

    /// True if the union of the region covers `rect` completely. Degenerate
    /// rectangles (segments and points) are supported.
    pub fn contains_rect(&self, rect: &Rect) -> bool {
        if rect.width() == 0 || rect.height() == 0 {
            return self.covers_segment(rect);
        }
        let mut remaining = vec![*rect];
        for cut in &self.rects {
            remaining = remaining.iter().flat_map(|p| p.subtract(cut)).collect();
            if remaining.is_empty() {
                return true;
            }
        }
        remaining.is_empty()
    }

    fn covers_segment(&self, seg: &Rect) -> bool {
        let horizontal = seg.height() == 0;
        let (lo, hi) = if horizontal {
            (seg.min.x, seg.max.x)
        } else {
            (seg.min.y, seg.max.y)
        };
        let mut intervals: Vec<(i64, i64)> = self
            .rects
            .iter()
            .filter(|r| {
                if horizontal {
                    r.min.y <= seg.min.y && seg.min.y <= r.max.y
                } else {
                    r.min.x <= seg.min.x && seg.min.x <= r.max.x
                }
            })
            .map(|r| {
                if horizontal {
                    (r.min.x, r.max.x)
                } else {
                    (r.min.y, r.max.y)
                }
            })
            .collect();
        intervals.sort_unstable();

        let mut reach = lo;
        let mut started = false;
        for (a, b) in intervals {
            if a > reach {
                break;
            }
            if b >= reach {
                reach = b;
                started = true;
            }
            if started && reach >= hi {
                return true;
            }
        }
        started && reach >= hi
    }
}
