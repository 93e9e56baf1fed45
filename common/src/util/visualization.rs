use crate::db::core::{CellLayout, ShapeCollection};
use crate::db::indices::LayerId;
use crate::db::tech::{LayerKind, Technology};
use crate::geom::rect::Rect;
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect as ImageRect;
use std::path::Path;

const LAYER_COLORS: [Rgba<u8>; 6] = [
    Rgba([0, 110, 255, 110]),
    Rgba([255, 20, 80, 110]),
    Rgba([0, 255, 100, 150]),
    Rgba([255, 215, 0, 150]),
    Rgba([180, 50, 255, 170]),
    Rgba([0, 240, 255, 170]),
];

/// Renders input shapes (dimmed) and routed shapes of one cell to a PNG.
pub fn draw_routed_cell(
    cell: &CellLayout,
    drawn: &ShapeCollection,
    tech: &Technology,
    filename: &str,
    width: u32,
    height: u32,
) -> image::ImageResult<()> {
    let mut img = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]));

    let mut frame = cell.abutment_box;
    for s in &cell.shapes {
        frame = frame.union(&s.rect);
    }
    for s in drawn.iter() {
        frame = frame.union(&s.geometry.bbox());
    }
    let frame = frame.enlarged((frame.width().max(frame.height()) / 20).max(1));
    if frame.width() <= 0 || frame.height() <= 0 {
        return img.save(Path::new(filename));
    }

    let scale = (width as f64 / frame.width() as f64).min(height as f64 / frame.height() as f64);
    let map = |r: &Rect| {
        let x = (r.min.x - frame.min.x) as f64 * scale;
        let y = height as f64 - (r.max.y - frame.min.y) as f64 * scale;
        let w = (r.width() as f64 * scale).max(1.0);
        let h = (r.height() as f64 * scale).max(1.0);
        ImageRect::at(x as i32, y as i32).of_size(w as u32, h as u32)
    };

    draw_hollow_rect_mut(&mut img, map(&cell.abutment_box), Rgba([90, 90, 90, 255]));

    let color = |layer: LayerId, alpha_scale: u8| {
        let base = match tech.kind(layer) {
            LayerKind::Via { .. } => Rgba([255, 255, 255, 200]),
            _ => LAYER_COLORS[layer.index() % LAYER_COLORS.len()],
        };
        let [r, g, b, a] = base.0;
        Rgba([r, g, b, a / alpha_scale])
    };

    for s in &cell.shapes {
        draw_filled_rect_mut(&mut img, map(&s.rect), color(s.layer, 2));
    }

    let mut routed: Vec<_> = drawn.iter().collect();
    routed.sort_by_key(|s| s.layer);
    for s in routed {
        for r in s.geometry.to_rects() {
            if s.label.is_some() {
                draw_hollow_rect_mut(&mut img, map(&r), Rgba([255, 255, 255, 255]));
            } else {
                draw_filled_rect_mut(&mut img, map(&r), color(s.layer, 1));
            }
        }
    }

    img.save(Path::new(filename))
}
