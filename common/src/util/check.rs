use crate::db::core::{CellLayout, ShapeCollection};
use crate::db::extract::{NetCluster, NetlistExtractor};
use crate::db::indices::NetId;
use crate::db::tech::Technology;
use rayon::prelude::*;

/// Re-extracts the cell with its routing and reports shorts and opens.
pub fn run(
    cell: &CellLayout,
    drawn: &ShapeCollection,
    tech: &Technology,
    extractor: &dyn NetlistExtractor,
    routed_nets: &[NetId],
) -> Result<(), String> {
    log::info!("Starting Routing Verification (LVS) for cell '{}'", cell.name);

    let mut shapes = cell.shapes.clone();
    shapes.extend(drawn.to_shapes());
    let clusters = extractor.extract(&shapes, tech);

    let (shorts_result, opens_result) = rayon::join(
        || check_shorts(cell, &clusters),
        || check_opens(cell, &clusters, routed_nets),
    );

    let mut msgs = Vec::new();
    match shorts_result {
        Err(e) => {
            log::error!("\x1b[31mFAIL\x1b[0m: Short Circuits Detected");
            log::error!("{}", e);
            msgs.push(e);
        }
        Ok(_) => log::info!("\x1b[32mPASS\x1b[0m: No shorts found."),
    }
    match opens_result {
        Err(e) => {
            log::error!("\x1b[31mFAIL\x1b[0m: Open Net (Disconnected) Detected");
            log::error!("{}", e);
            msgs.push(e);
        }
        Ok(_) => log::info!("\x1b[32mPASS\x1b[0m: All routed nets are connected."),
    }

    if msgs.is_empty() {
        log::info!("\x1b[32mSUCCESS\x1b[0m: cell '{}' is clean", cell.name);
        Ok(())
    } else {
        log::error!(
            "\x1b[31mFAILURE\x1b[0m: cell '{}' ({} errors)",
            cell.name,
            msgs.len()
        );
        Err(msgs.join("; "))
    }
}

fn check_shorts(cell: &CellLayout, clusters: &[NetCluster]) -> Result<(), String> {
    let shorts: Vec<String> = clusters
        .par_iter()
        .filter(|c| c.is_short())
        .map(|c| {
            let names: Vec<&str> = c.labels.iter().map(|&n| cell.net_name(n)).collect();
            format!("SHORT: {}", names.join(" vs "))
        })
        .collect();
    if shorts.is_empty() {
        Ok(())
    } else {
        Err(shorts.join("; "))
    }
}

fn check_opens(
    cell: &CellLayout,
    clusters: &[NetCluster],
    routed_nets: &[NetId],
) -> Result<(), String> {
    let opens: Vec<String> = routed_nets
        .par_iter()
        .filter_map(|&net| {
            let parts = clusters.iter().filter(|c| c.labels.contains(&net)).count();
            (parts > 1).then(|| {
                format!(
                    "Net '{}': Broken connectivity ({} disjoint parts)",
                    cell.net_name(net),
                    parts
                )
            })
        })
        .collect();
    if opens.is_empty() {
        Ok(())
    } else {
        Err(opens.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::extract::GeometricExtractor;
    use crate::geom::point::Point;
    use crate::geom::rect::Rect;
    use crate::util::config::TechConfig;

    #[test]
    fn detects_open_and_accepts_bridge() {
        let tech = Technology::from_config(&TechConfig::default()).unwrap();
        let m1 = tech.layer("metal1").unwrap();
        let mut cell = CellLayout::new("t", Rect::from_sides(0, 0, 1000, 1000));
        let a = cell.add_net("A");
        cell.add_shape(m1, Rect::from_sides(0, 0, 100, 100), Some(a));
        cell.add_shape(m1, Rect::from_sides(500, 0, 600, 100), Some(a));

        let empty = ShapeCollection::new();
        assert!(run(&cell, &empty, &tech, &GeometricExtractor, &[a]).is_err());

        let mut drawn = ShapeCollection::new();
        drawn.insert_path(m1, vec![Point::new(50, 50), Point::new(550, 50)], 100, Some(a));
        assert!(run(&cell, &drawn, &tech, &GeometricExtractor, &[a]).is_ok());
    }

    #[test]
    fn detects_short() {
        let tech = Technology::from_config(&TechConfig::default()).unwrap();
        let m1 = tech.layer("metal1").unwrap();
        let mut cell = CellLayout::new("t", Rect::from_sides(0, 0, 1000, 1000));
        let a = cell.add_net("A");
        let b = cell.add_net("B");
        cell.add_shape(m1, Rect::from_sides(0, 0, 100, 100), Some(a));
        cell.add_shape(m1, Rect::from_sides(500, 0, 600, 100), Some(b));
        let mut drawn = ShapeCollection::new();
        drawn.insert_path(m1, vec![Point::new(50, 50), Point::new(550, 50)], 100, Some(a));
        let err = run(&cell, &drawn, &tech, &GeometricExtractor, &[a]).unwrap_err();
        assert!(err.contains("SHORT"));
    }
}
