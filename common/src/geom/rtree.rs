use super::point::Point;
use super::rect::Rect;
use rstar::primitives::GeomWithData;
use rstar::{AABB, RTree};

fn envelope(rect: &Rect) -> AABB<[i64; 2]> {
    AABB::from_corners([rect.min.x, rect.min.y], [rect.max.x, rect.max.y])
}

/// Rectangles with an attached id, queried by closed box intersection.
pub struct SpatialIndex {
    tree: RTree<IndexedRect>,
}

struct IndexedRect {
    rect: Rect,
    id: usize,
}

impl rstar::RTreeObject for IndexedRect {
    type Envelope = AABB<[i64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        envelope(&self.rect)
    }
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    pub fn bulk_load(rects: impl IntoIterator<Item = (Rect, usize)>) -> Self {
        let items = rects
            .into_iter()
            .map(|(rect, id)| IndexedRect { rect, id })
            .collect();
        Self {
            tree: RTree::bulk_load(items),
        }
    }

    pub fn insert(&mut self, rect: Rect, id: usize) {
        self.tree.insert(IndexedRect { rect, id });
    }

    pub fn query(&self, rect: Rect) -> Vec<usize> {
        self.tree
            .locate_in_envelope_intersecting(&envelope(&rect))
            .map(|item| item.id)
            .collect()
    }

    /// True if some indexed rectangle is closer than `margin` to `p`
    /// (Chebyshev distance, strictly less).
    pub fn any_within(&self, p: Point<i64>, margin: i64) -> bool {
        self.tree
            .locate_in_envelope_intersecting(&envelope(&Rect::centered(p, margin)))
            .any(|item| item.rect.distance_to(p) < margin)
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Integer grid positions with an attached payload.
pub struct PointIndex<T> {
    tree: RTree<GeomWithData<[i64; 2], T>>,
}

impl<T> PointIndex<T> {
    pub fn bulk_load(points: impl IntoIterator<Item = (Point<i64>, T)>) -> Self {
        let items = points
            .into_iter()
            .map(|(p, data)| GeomWithData::new([p.x, p.y], data))
            .collect();
        Self {
            tree: RTree::bulk_load(items),
        }
    }

    /// All points inside the closed box `rect`.
    pub fn within(&self, rect: Rect) -> impl Iterator<Item = (Point<i64>, &T)> {
        self.tree
            .locate_in_envelope(&envelope(&rect))
            .map(|item| {
                let [x, y] = *item.geom();
                (Point::new(x, y), &item.data)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_within_is_strict() {
        let index = SpatialIndex::bulk_load([(Rect::from_sides(10, 0, 20, 10), 0)]);
        assert!(index.any_within(Point::new(5, 5), 6));
        assert!(!index.any_within(Point::new(5, 5), 5));
    }

    #[test]
    fn point_queries_are_inclusive() {
        let index = PointIndex::bulk_load([
            (Point::new(0, 0), 'a'),
            (Point::new(10, 0), 'b'),
            (Point::new(20, 0), 'c'),
        ]);
        let mut hits: Vec<char> = index
            .within(Rect::from_sides(0, -1, 10, 1))
            .map(|(_, c)| *c)
            .collect();
        hits.sort();
        assert_eq!(hits, vec!['a', 'b']);
    }
}
