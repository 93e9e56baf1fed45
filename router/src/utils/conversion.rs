use stdcell_common::db::tech::Technology;
use stdcell_common::geom::rect::Rect;

/// Grid coordinates of one cell: the pitch grid inside the abutment box plus
/// any off-grid x positions needed to reach transistor terminals.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GridAxes {
    pub xs: Vec<i64>,
    pub ys: Vec<i64>,
}

impl GridAxes {
    pub fn from_steps(cell_box: &Rect, pitch_x: i64, pitch_y: i64, off_x: i64, off_y: i64) -> Self {
        Self {
            xs: axis(cell_box.min.x, cell_box.max.x, pitch_x, off_x),
            ys: axis(cell_box.min.y, cell_box.max.y, pitch_y, off_y),
        }
    }

    pub fn for_cell(cell_box: &Rect, tech: &Technology) -> Self {
        Self::from_steps(
            cell_box,
            tech.pitch_x,
            tech.pitch_y,
            tech.offset_x,
            tech.offset_y,
        )
    }

    /// Adds x coordinates, keeping the axis sorted and unique.
    pub fn with_extra_xs(mut self, extra: impl IntoIterator<Item = i64>) -> Self {
        self.xs.extend(extra);
        self.xs.sort_unstable();
        self.xs.dedup();
        self
    }
}

fn axis(min: i64, max: i64, pitch: i64, offset: i64) -> Vec<i64> {
    if pitch <= 0 {
        return Vec::new();
    }
    let mut v = Vec::new();
    let mut c = min + offset;
    while c <= max {
        v.push(c);
        c += pitch;
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axes_include_the_far_edge() {
        let axes = GridAxes::from_steps(&Rect::from_sides(0, 0, 20, 10), 10, 10, 0, 0);
        assert_eq!(axes.xs, vec![0, 10, 20]);
        assert_eq!(axes.ys, vec![0, 10]);
    }

    #[test]
    fn extra_xs_are_merged() {
        let axes = GridAxes::from_steps(&Rect::from_sides(0, 0, 400, 400), 200, 200, 100, 100)
            .with_extra_xs([125, 300, 100]);
        assert_eq!(axes.xs, vec![100, 125, 300]);
        assert_eq!(axes.ys, vec![100, 300]);
    }
}
