use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fs::File;
use std::io::Write;

/// Writes a random benchmark cell: `num_nets` nets, each with two or three
/// square metal1 pads placed on the routing grid, plus scattered obstacles.
pub fn generate_random_cell(
    filename: &str,
    num_nets: usize,
    num_tracks: i64,
    pitch: i64,
    seed: Option<u64>,
) -> std::io::Result<()> {
    let mut file = File::create(filename)?;
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    let tracks = num_tracks.max(4);
    let width = tracks * pitch;
    let height = (tracks / 2).max(4) * pitch;
    let pad = pitch / 4;

    log::info!(
        "Generating Benchmark Cell: {} nets, {}x{} ({} tracks)",
        num_nets,
        width,
        height,
        tracks
    );

    writeln!(file, "name = \"random_{}\"", num_nets)?;
    writeln!(file, "abutment_box = [0, 0, {}, {}]", width, height)?;
    if num_nets > 0 {
        writeln!(file, "io_pins = [\"net0\"]")?;
    }
    writeln!(file)?;

    let mut used = std::collections::HashSet::new();
    let mut place = |rng: &mut StdRng| -> Option<(i64, i64)> {
        for _ in 0..100 {
            let x = rng.gen_range(0..tracks) * pitch + pitch / 2;
            let y = rng.gen_range(0..height / pitch) * pitch + pitch / 2;
            if used.insert((x, y)) {
                return Some((x, y));
            }
        }
        None
    };

    for net in 0..num_nets {
        let terminals = rng.gen_range(2..=3);
        for _ in 0..terminals {
            let Some((x, y)) = place(&mut rng) else {
                log::warn!("Cell too small, skipping terminal of net{}", net);
                continue;
            };
            writeln!(file, "[[shapes]]")?;
            writeln!(file, "layer = \"metal1\"")?;
            writeln!(
                file,
                "rect = [{}, {}, {}, {}]",
                x - pad,
                y - pad,
                x + pad,
                y + pad
            )?;
            writeln!(file, "net = \"net{}\"", net)?;
            writeln!(file)?;
        }
    }

    let obstacles = rng.gen_range(0..=num_nets / 2);
    for _ in 0..obstacles {
        if let Some((x, y)) = place(&mut rng) {
            writeln!(file, "[[shapes]]")?;
            writeln!(file, "layer = \"metal2\"")?;
            writeln!(
                file,
                "rect = [{}, {}, {}, {}]",
                x - pad,
                y - pad,
                x + pad,
                y + pad
            )?;
            writeln!(file)?;
        }
    }
    Ok(())
}
