//! ASCII PLY export of map snapshots and labeled clouds.
//!
//! Vertex layout:
//!
//! ```text
//! x y z red green blue class [occupancy]
//! ```
//!
//! `occupancy` is only written for map snapshots.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::core::LabeledPoint;
use crate::map::MapSnapshot;

use super::palette::class_color;

/// Errors while exporting.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// How vertex colors are chosen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorMode {
    /// Palette color of the class
    #[default]
    Semantic,
    /// Observed camera color, falling back to the class color
    Observed,
}

impl ColorMode {
    fn pick(self, class: u16, observed: Option<[u8; 3]>) -> [u8; 3] {
        match (self, observed) {
            (ColorMode::Observed, Some(color)) => color,
            _ => class_color(class),
        }
    }
}

fn write_header<W: Write>(writer: &mut W, vertices: usize, occupancy: bool) -> std::io::Result<()> {
    writeln!(writer, "ply")?;
    writeln!(writer, "format ascii 1.0")?;
    writeln!(writer, "element vertex {}", vertices)?;
    writeln!(writer, "property float x")?;
    writeln!(writer, "property float y")?;
    writeln!(writer, "property float z")?;
    writeln!(writer, "property uchar red")?;
    writeln!(writer, "property uchar green")?;
    writeln!(writer, "property uchar blue")?;
    writeln!(writer, "property ushort class")?;
    if occupancy {
        writeln!(writer, "property float occupancy")?;
    }
    writeln!(writer, "end_header")
}

/// Write voxel centers of a snapshot whose occupancy exceeds `min_occupancy`.
pub fn write_snapshot_ply<W: Write>(
    writer: &mut W,
    snapshot: &MapSnapshot,
    min_occupancy: f32,
    mode: ColorMode,
) -> Result<usize, IoError> {
    let count = snapshot.occupied(min_occupancy).count();
    write_header(writer, count, true)?;
    for voxel in snapshot.occupied(min_occupancy) {
        let [r, g, b] = mode.pick(voxel.dominant_class, voxel.color);
        writeln!(
            writer,
            "{} {} {} {} {} {} {} {:.4}",
            voxel.center.x,
            voxel.center.y,
            voxel.center.z,
            r,
            g,
            b,
            voxel.dominant_class,
            voxel.occupancy
        )?;
    }
    Ok(count)
}

/// Write labeled points.
pub fn write_cloud_ply<W: Write>(
    writer: &mut W,
    points: &[LabeledPoint],
    mode: ColorMode,
) -> Result<usize, IoError> {
    write_header(writer, points.len(), false)?;
    for point in points {
        let [r, g, b] = mode.pick(point.class, point.color);
        writeln!(
            writer,
            "{} {} {} {} {} {} {}",
            point.position.x, point.position.y, point.position.z, r, g, b, point.class
        )?;
    }
    Ok(points.len())
}

/// Save a snapshot to a PLY file. Returns the number of vertices written.
pub fn save_snapshot_ply(
    snapshot: &MapSnapshot,
    path: &Path,
    min_occupancy: f32,
    mode: ColorMode,
) -> Result<usize, IoError> {
    let mut writer = BufWriter::new(File::create(path)?);
    let count = write_snapshot_ply(&mut writer, snapshot, min_occupancy, mode)?;
    writer.flush()?;
    log::info!("Saved {} voxels to {}", count, path.display());
    Ok(count)
}
