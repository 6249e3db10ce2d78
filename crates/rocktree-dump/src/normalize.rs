//! Recentre and rescale an OBJ model.
//!
//! Globe coordinates are millions of meters from the origin, which makes
//! most viewers jitter. The normalized copy is centred on the model's
//! bounding box with its longest side scaled to `scale` units.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use glam::DVec3;

/// File name suffix of the normalized copy: `model.obj` becomes
/// `model.sc.obj`.
pub const NORMALIZED_EXTENSION: &str = "sc.obj";

fn parse_vertex(line: &str) -> Option<DVec3> {
    let mut coords = line.strip_prefix("v ")?.split_whitespace().map(str::parse);
    match (coords.next()?, coords.next()?, coords.next()?) {
        (Ok(x), Ok(y), Ok(z)) => Some(DVec3::new(x, y, z)),
        _ => None,
    }
}

/// Path of the normalized copy of `input`.
#[must_use]
pub fn normalized_path(input: &Path) -> PathBuf {
    input.with_extension(NORMALIZED_EXTENSION)
}

/// Rewrite every `v` line of `input` as `(p - center) / extent * scale` into
/// `output`, copying all other lines.
///
/// Returns the number of vertices rewritten.
pub fn center_scale_obj(input: &Path, output: &Path, scale: f64) -> io::Result<usize> {
    let mut min = DVec3::splat(f64::INFINITY);
    let mut max = DVec3::splat(f64::NEG_INFINITY);
    for line in BufReader::new(File::open(input)?).lines() {
        if let Some(p) = parse_vertex(&line?) {
            min = min.min(p);
            max = max.max(p);
        }
    }

    let center = (min + max) / 2.0;
    let extent = (max - min).max_element();
    let extent = if extent > 0.0 { extent } else { 1.0 };

    let mut writer = BufWriter::new(File::create(output)?);
    let mut count = 0;
    for line in BufReader::new(File::open(input)?).lines() {
        let line = line?;
        match parse_vertex(&line) {
            Some(p) => {
                let q = (p - center) / extent * scale;
                writeln!(writer, "v {} {} {}", q.x, q.y, q.z)?;
                count += 1;
            }
            None => writeln!(writer, "{line}")?,
        }
    }
    writer.flush()?;

    tracing::info!("Normalized {} vertices into {}", count, output.display());
    Ok(count)
}
