//! Read-side types: query results, snapshots, statistics.

use std::collections::BTreeMap;

use nalgebra::Point3;

use crate::core::VoxelKey;

use super::voxel::Voxel;

/// Copy of one voxel's state, detached from the map.
#[derive(Clone, Debug, PartialEq)]
pub struct VoxelSample {
    /// Voxel key
    pub key: VoxelKey,
    /// Voxel center in the map frame
    pub center: Point3<f32>,
    /// Occupancy probability in `[0, 1]`
    pub occupancy: f32,
    /// Fixed-point log-odds (value / 100)
    pub log_odds: i16,
    /// Argmax of the class evidence, or of the histogram without evidence
    pub dominant_class: u16,
    /// Share of candidate evidence behind `dominant_class`, if any
    pub class_confidence: Option<f32>,
    /// Total labeled points observed
    pub hits: u32,
    /// Mean observed color, if any colored points landed here
    pub color: Option<[u8; 3]>,
}

impl VoxelSample {
    pub(crate) fn from_voxel(key: VoxelKey, voxel: &Voxel, resolution: f32) -> Self {
        Self {
            key,
            center: key.center(resolution),
            occupancy: voxel.probability(),
            log_odds: voxel.log_odds(),
            // Observed voxels always have at least one histogram entry
            dominant_class: voxel.dominant_class().unwrap_or_default(),
            class_confidence: voxel.class_confidence(),
            hits: voxel.hits(),
            color: voxel.mean_color(),
        }
    }
}

/// Lazy sequence of voxels intersecting a query region.
///
/// The voxels are copied under a single read lock, so the sequence reflects
/// one consistent map state. Iteration itself holds no lock.
#[derive(Debug)]
pub struct VoxelQuery {
    samples: std::vec::IntoIter<VoxelSample>,
    generation: u64,
}

impl VoxelQuery {
    pub(crate) fn new(samples: Vec<VoxelSample>, generation: u64) -> Self {
        Self {
            samples: samples.into_iter(),
            generation,
        }
    }

    /// Number of batches applied to the map when the query was taken.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Iterator for VoxelQuery {
    type Item = VoxelSample;

    fn next(&mut self) -> Option<VoxelSample> {
        self.samples.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.samples.size_hint()
    }
}

impl ExactSizeIterator for VoxelQuery {}

/// Full copy of the map at one point in time.
#[derive(Clone, Debug, Default)]
pub struct MapSnapshot {
    /// Voxel edge length in meters
    pub resolution: f32,
    /// Number of batches applied when the snapshot was taken
    pub generation: u64,
    /// All voxels, ordered by key
    pub voxels: Vec<VoxelSample>,
}

impl MapSnapshot {
    /// Number of voxels.
    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    /// True if the map was empty.
    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    /// Voxels whose occupancy exceeds `threshold`.
    pub fn occupied(&self, threshold: f32) -> impl Iterator<Item = &VoxelSample> + '_ {
        self.voxels.iter().filter(move |v| v.occupancy > threshold)
    }
}

/// Outcome of one batch insertion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InsertResult {
    /// Points applied to the map
    pub points_inserted: usize,
    /// Points rejected (non-finite position)
    pub points_rejected: usize,
    /// Voxels created by this batch
    pub voxels_created: usize,
    /// Existing voxels that received a free-space observation
    pub voxels_freed: usize,
}

impl InsertResult {
    /// Merge another result into this one
    pub fn merge(&mut self, other: &InsertResult) {
        self.points_inserted += other.points_inserted;
        self.points_rejected += other.points_rejected;
        self.voxels_created += other.voxels_created;
        self.voxels_freed += other.voxels_freed;
    }
}

/// Map statistics.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapStats {
    /// Voxels in the map
    pub voxels: usize,
    /// Voxels above the occupied threshold
    pub occupied: usize,
    /// Voxel count per dominant class
    pub class_counts: BTreeMap<u16, usize>,
    /// Batches applied since creation
    pub generation: u64,
}
