//! Incremental semantic voxel map.
//!
//! Sparse hashed voxel grid storing, per voxel, a log-odds occupancy
//! estimate and a per-class observation histogram.
//!
//! ## Architecture
//!
//! ```text
//!   fusion thread (single writer)          reader threads
//!          │                                 │      │
//!          │ insert_batch / insert_scan      │ query / snapshot / get
//!          ▼                                 ▼      ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │          RwLock<HashMap<VoxelKey, Voxel>> + generation    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! One write lock is held for a whole batch, so readers never observe a
//! partially applied batch. Readers copy what they need under a read lock
//! and iterate afterwards.
//!
//! ## Update Rule
//!
//! ```text
//! hit:  L = clamp(L + l_hit,  l_min, l_max); histogram[class] += 1
//! miss: L = clamp(L + l_miss, l_min, l_max)       (existing voxels only)
//! ```
//!
//! Voxels are created on their first hit and removed only by
//! [`SemanticVoxelMap::reset`] or [`SemanticVoxelMap::prune`].

mod config;
pub mod raycast;
mod query;
mod voxel;

pub use config::{LogOddsConfig, MAX_RAY_VOXELS, MapConfig, MapConfigError};
pub use query::{InsertResult, MapSnapshot, MapStats, VoxelQuery, VoxelSample};
pub use voxel::Voxel;

use std::collections::{HashMap, HashSet};

use nalgebra::Point3;
use parking_lot::RwLock;

use crate::core::{Aabb, LabeledPoint, VoxelKey};
use raycast::{BresenhamLine3, clip_ray};

/// Locked map state.
#[derive(Debug, Default)]
struct MapState {
    voxels: HashMap<VoxelKey, Voxel>,
    /// Batches applied (incremented once per insert, reset, or prune).
    generation: u64,
}

/// Thread-safe semantic voxel map.
///
/// Share it as `Arc<SemanticVoxelMap>` between the writer and any readers.
#[derive(Debug)]
pub struct SemanticVoxelMap {
    state: RwLock<MapState>,
    config: MapConfig,
}

impl SemanticVoxelMap {
    /// Create an empty map.
    pub fn new(config: MapConfig) -> Result<Self, MapConfigError> {
        config.validate()?;
        Ok(Self {
            state: RwLock::new(MapState::default()),
            config,
        })
    }

    /// Map configuration.
    #[inline]
    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Voxel edge length in meters.
    #[inline]
    pub fn resolution(&self) -> f32 {
        self.config.resolution
    }

    /// Key of the voxel containing `point`.
    #[inline]
    pub fn key_for(&self, point: &Point3<f32>) -> VoxelKey {
        VoxelKey::from_point(point, self.config.resolution)
    }

    // =========================================================================
    // WRITE OPERATIONS
    // =========================================================================

    /// Insert a batch of labeled points.
    ///
    /// Every point adds one hit to its voxel and one count to the voxel's
    /// histogram entry for the point's class. The whole batch is applied
    /// under one write lock.
    pub fn insert_batch(&self, points: &[LabeledPoint]) -> InsertResult {
        let (keyed, rejected) = self.key_points(points);

        let mut result = InsertResult {
            points_rejected: rejected,
            ..Default::default()
        };

        let mut state = self.state.write();
        result.voxels_created = Self::apply_hits(&mut state, &keyed, &self.config);
        result.points_inserted = keyed.len();
        state.generation += 1;
        result
    }

    /// Insert a batch and carve free space along each sensor ray.
    ///
    /// Voxels traversed between `origin` and each point (excluding voxels hit
    /// by any point of this batch) receive one miss per batch. Misses only
    /// touch voxels that already exist; they never create voxels.
    pub fn insert_scan(&self, points: &[LabeledPoint], origin: &Point3<f32>) -> InsertResult {
        let (keyed, rejected) = self.key_points(points);
        let resolution = self.config.resolution;

        let hit_keys: HashSet<VoxelKey> = keyed.iter().map(|(k, _)| *k).collect();
        let mut free_keys: HashSet<VoxelKey> = HashSet::new();
        if origin.iter().all(|v| v.is_finite()) {
            for (_, point) in &keyed {
                let end = clip_ray(origin, &point.position, self.config.max_ray_length);
                for key in BresenhamLine3::from_points(origin, &end, resolution) {
                    if !hit_keys.contains(&key) {
                        free_keys.insert(key);
                    }
                }
            }
        }

        let mut result = InsertResult {
            points_rejected: rejected,
            ..Default::default()
        };

        let mut state = self.state.write();
        for key in &free_keys {
            if let Some(voxel) = state.voxels.get_mut(key) {
                voxel.observe_free(&self.config.log_odds);
                result.voxels_freed += 1;
            }
        }
        result.voxels_created = Self::apply_hits(&mut state, &keyed, &self.config);
        result.points_inserted = keyed.len();
        state.generation += 1;
        result
    }

    /// Remove every voxel.
    pub fn reset(&self) {
        let mut state = self.state.write();
        let removed = state.voxels.len();
        state.voxels.clear();
        state.generation += 1;
        log::debug!("Voxel map reset ({} voxels removed)", removed);
    }

    /// Remove voxels that do not intersect `retain`. Returns the number removed.
    pub fn prune(&self, retain: &Aabb) -> usize {
        let resolution = self.config.resolution;
        let mut state = self.state.write();
        let before = state.voxels.len();
        state
            .voxels
            .retain(|key, _| retain.intersects_voxel(key, resolution));
        state.generation += 1;
        let removed = before - state.voxels.len();
        if removed > 0 {
            log::debug!("Pruned {} voxels outside retention region", removed);
        }
        removed
    }

    /// Compute keys outside the lock; non-finite points are rejected.
    fn key_points<'a>(
        &self,
        points: &'a [LabeledPoint],
    ) -> (Vec<(VoxelKey, &'a LabeledPoint)>, usize) {
        let mut keyed = Vec::with_capacity(points.len());
        let mut rejected = 0;
        for point in points {
            if point.is_finite() {
                keyed.push((self.key_for(&point.position), point));
            } else {
                rejected += 1;
            }
        }
        (keyed, rejected)
    }

    fn apply_hits(
        state: &mut MapState,
        keyed: &[(VoxelKey, &LabeledPoint)],
        config: &MapConfig,
    ) -> usize {
        let mut created = 0;
        for (key, point) in keyed {
            let voxel = state.voxels.entry(*key).or_insert_with(|| {
                created += 1;
                Voxel::default()
            });
            voxel.observe(point, config);
        }
        created
    }

    // =========================================================================
    // READ OPERATIONS
    // =========================================================================

    /// Voxels intersecting `region`, ordered by key.
    ///
    /// Results are copied under one read lock and yielded lazily afterwards.
    pub fn query(&self, region: &Aabb) -> VoxelQuery {
        let resolution = self.config.resolution;
        let state = self.state.read();

        let mut samples = if region.voxel_volume(resolution) < state.voxels.len() as u64 {
            // Small region: look up each key in range
            let (lo, hi) = region.key_range(resolution);
            let mut samples = Vec::new();
            for x in lo.x..=hi.x {
                for y in lo.y..=hi.y {
                    for z in lo.z..=hi.z {
                        let key = VoxelKey::new(x, y, z);
                        if let Some(voxel) = state.voxels.get(&key)
                            && region.intersects_voxel(&key, resolution)
                        {
                            samples.push(VoxelSample::from_voxel(key, voxel, resolution));
                        }
                    }
                }
            }
            samples
        } else {
            state
                .voxels
                .iter()
                .filter(|(key, _)| region.intersects_voxel(key, resolution))
                .map(|(key, voxel)| VoxelSample::from_voxel(*key, voxel, resolution))
                .collect()
        };
        let generation = state.generation;
        drop(state);

        samples.sort_unstable_by_key(|s| s.key);
        VoxelQuery::new(samples, generation)
    }

    /// Copy of the whole map.
    pub fn snapshot(&self) -> MapSnapshot {
        let resolution = self.config.resolution;
        let state = self.state.read();
        let mut voxels: Vec<VoxelSample> = state
            .voxels
            .iter()
            .map(|(key, voxel)| VoxelSample::from_voxel(*key, voxel, resolution))
            .collect();
        let generation = state.generation;
        drop(state);

        voxels.sort_unstable_by_key(|s| s.key);
        MapSnapshot {
            resolution,
            generation,
            voxels,
        }
    }

    /// State of one voxel.
    pub fn get(&self, key: &VoxelKey) -> Option<VoxelSample> {
        let state = self.state.read();
        state
            .voxels
            .get(key)
            .map(|voxel| VoxelSample::from_voxel(*key, voxel, self.config.resolution))
    }

    /// State of the voxel containing `point`.
    pub fn get_at(&self, point: &Point3<f32>) -> Option<VoxelSample> {
        self.get(&self.key_for(point))
    }

    /// Copy of one voxel's class histogram.
    pub fn class_histogram(&self, key: &VoxelKey) -> Option<Vec<u32>> {
        let state = self.state.read();
        state.voxels.get(key).map(|voxel| voxel.histogram().to_vec())
    }

    /// Copy of one voxel's accumulated candidate evidence.
    pub fn class_evidence(&self, key: &VoxelKey) -> Option<Vec<f32>> {
        let state = self.state.read();
        state.voxels.get(key).map(|voxel| voxel.evidence().to_vec())
    }

    /// Number of voxels.
    pub fn len(&self) -> usize {
        self.state.read().voxels.len()
    }

    /// True if no voxel has been observed.
    pub fn is_empty(&self) -> bool {
        self.state.read().voxels.is_empty()
    }

    /// Batches applied since creation.
    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }

    /// Voxel, occupancy and per-class statistics.
    pub fn stats(&self) -> MapStats {
        let state = self.state.read();
        let mut stats = MapStats {
            voxels: state.voxels.len(),
            generation: state.generation,
            ..Default::default()
        };
        for voxel in state.voxels.values() {
            if voxel.is_occupied(&self.config.log_odds) {
                stats.occupied += 1;
            }
            if let Some(class) = voxel.dominant_class() {
                *stats.class_counts.entry(class).or_insert(0) += 1;
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> SemanticVoxelMap {
        SemanticVoxelMap::new(MapConfig::with_resolution(0.5)).unwrap()
    }

    fn at(x: f32, y: f32, z: f32, class: u16) -> LabeledPoint {
        LabeledPoint::new(Point3::new(x, y, z), class)
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(SemanticVoxelMap::new(MapConfig::with_resolution(-1.0)).is_err());
    }

    #[test]
    fn test_insert_creates_voxels() {
        let map = map();
        assert!(map.is_empty());

        let result = map.insert_batch(&[at(0.1, 0.1, 0.1, 1), at(0.2, 0.2, 0.2, 1), at(2.0, 0.0, 0.0, 3)]);
        assert_eq!(result.points_inserted, 3);
        assert_eq!(result.voxels_created, 2);
        assert_eq!(map.len(), 2);
        assert_eq!(map.generation(), 1);

        let voxel = map.get(&VoxelKey::new(0, 0, 0)).unwrap();
        assert_eq!(voxel.hits, 2);
        assert_eq!(voxel.dominant_class, 1);
    }

    #[test]
    fn test_insert_twice_doubles_histogram() {
        let map = map();
        let batch = vec![at(0.1, 0.1, 0.1, 2), at(0.3, 0.1, 0.1, 2), at(0.1, 0.4, 0.2, 5)];
        map.insert_batch(&batch);
        let once = map.class_histogram(&VoxelKey::new(0, 0, 0)).unwrap();
        map.insert_batch(&batch);
        let twice = map.class_histogram(&VoxelKey::new(0, 0, 0)).unwrap();

        assert_eq!(once.len(), twice.len());
        for (a, b) in once.iter().zip(&twice) {
            assert_eq!(*b, 2 * *a);
        }
        assert_eq!(twice[2], 4);
        assert_eq!(twice[5], 2);
    }

    #[test]
    fn test_majority_class_example() {
        let map = map();
        let mut batch: Vec<_> = (0..10).map(|_| at(0.2, 0.2, 0.2, 2)).collect();
        batch.extend((0..3).map(|_| at(0.3, 0.3, 0.3, 4)));
        map.insert_batch(&batch);
        assert_eq!(map.get_at(&Point3::new(0.25, 0.25, 0.25)).unwrap().dominant_class, 2);
    }

    #[test]
    fn test_occupancy_increases_with_evidence() {
        let map = map();
        let key = VoxelKey::new(0, 0, 0);
        let mut last = 0.5;
        for _ in 0..4 {
            map.insert_batch(&[at(0.1, 0.1, 0.1, 7)]);
            let sample = map.get(&key).unwrap();
            assert!(sample.occupancy > last);
            assert_eq!(sample.dominant_class, 7);
            last = sample.occupancy;
        }
    }

    #[test]
    fn test_non_finite_points_rejected() {
        let map = map();
        let result = map.insert_batch(&[at(f32::NAN, 0.0, 0.0, 1), at(0.0, 0.0, 0.0, 1)]);
        assert_eq!(result.points_rejected, 1);
        assert_eq!(result.points_inserted, 1);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_empty_batch() {
        let map = map();
        let result = map.insert_batch(&[]);
        assert_eq!(result, InsertResult::default());
        assert!(map.is_empty());
    }

    #[test]
    fn test_query_region() {
        let map = map();
        map.insert_batch(&[
            at(0.1, 0.1, 0.1, 1),
            at(1.1, 0.1, 0.1, 2),
            at(5.1, 5.1, 5.1, 3),
            at(-0.4, 0.1, 0.1, 4),
        ]);
        let region = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.2, 0.4, 0.4));
        let keys: Vec<_> = map.query(&region).map(|s| s.key).collect();
        assert_eq!(keys, vec![VoxelKey::new(0, 0, 0), VoxelKey::new(2, 0, 0)]);
    }

    #[test]
    fn test_query_small_region_in_large_map() {
        let map = map();
        let batch: Vec<_> = (0..200)
            .map(|i| at(i as f32 * 0.5 + 0.1, 0.1, 0.1, 1))
            .collect();
        map.insert_batch(&batch);
        let region = Aabb::from_center(Point3::new(10.25, 0.25, 0.25), 0.2);
        let samples: Vec<_> = map.query(&region).collect();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].key, VoxelKey::new(20, 0, 0));
    }

    #[test]
    fn test_prune_and_reset() {
        let map = map();
        map.insert_batch(&[at(0.1, 0.1, 0.1, 1), at(10.1, 0.1, 0.1, 1), at(-10.1, 0.1, 0.1, 1)]);
        let removed = map.prune(&Aabb::from_center(Point3::origin(), 2.0));
        assert_eq!(removed, 2);
        assert_eq!(map.len(), 1);

        map.reset();
        assert!(map.is_empty());
        assert!(map.get(&VoxelKey::new(0, 0, 0)).is_none());
    }

    #[test]
    fn test_insert_scan_frees_existing_voxels_only() {
        let map = map();
        // Voxel at x in [1.0, 1.5) lies on the ray from origin to x=3.1
        map.insert_batch(&[at(1.1, 0.1, 0.1, 1)]);
        let before = map.get(&VoxelKey::new(2, 0, 0)).unwrap().log_odds;

        let result = map.insert_scan(&[at(3.1, 0.1, 0.1, 2)], &Point3::new(0.1, 0.1, 0.1));
        assert_eq!(result.voxels_freed, 1);
        assert_eq!(result.voxels_created, 1);

        let after = map.get(&VoxelKey::new(2, 0, 0)).unwrap();
        assert!(after.log_odds < before);
        assert_eq!(after.dominant_class, 1);
        // No voxels created along the ray
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_insert_scan_does_not_free_hit_voxels() {
        let map = map();
        let origin = Point3::new(0.1, 0.1, 0.1);
        // Both points in the same batch, the near one lies on the far one's ray
        map.insert_scan(&[at(1.1, 0.1, 0.1, 1), at(3.1, 0.1, 0.1, 2)], &origin);
        let near = map.get(&VoxelKey::new(2, 0, 0)).unwrap();
        assert_eq!(near.log_odds, map.config().log_odds.l_hit);
    }

    #[test]
    fn test_insert_scan_far_point_is_clipped() {
        let map = map();
        let origin = Point3::new(0.1, 0.1, 0.1);
        map.insert_batch(&[at(-1.1, 0.1, 0.1, 1), at(1.1, 0.1, 0.1, 1)]);

        let result = map.insert_scan(&[at(-1.0e12, 0.1, 0.1, 2)], &origin);
        assert_eq!(result.points_inserted, 1);
        assert_eq!(result.voxels_freed, 1);

        // On the ray, inside max_ray_length
        let front = map.get(&VoxelKey::new(-3, 0, 0)).unwrap();
        assert_eq!(front.log_odds, 85 - 41);
        // Behind the origin
        let behind = map.get(&VoxelKey::new(2, 0, 0)).unwrap();
        assert_eq!(behind.log_odds, 85);
    }

    #[test]
    fn test_candidate_evidence_reaches_samples() {
        use crate::core::Candidates;

        let map = map();
        let mut candidates = Candidates::default();
        candidates.push(4, 0.6);
        candidates.push(2, 0.3);
        map.insert_batch(&[at(0.1, 0.1, 0.1, 4).with_candidates(candidates)]);

        let key = VoxelKey::new(0, 0, 0);
        let evidence = map.class_evidence(&key).unwrap();
        assert_eq!(evidence.len(), 5);
        assert!((evidence[4] - 0.6).abs() < 1e-6);
        let sample = map.get(&key).unwrap();
        assert_eq!(sample.dominant_class, 4);
        assert!((sample.class_confidence.unwrap() - 0.6 / 0.9).abs() < 1e-5);

        // Without candidates there is no class confidence
        map.insert_batch(&[at(2.1, 0.1, 0.1, 1)]);
        assert_eq!(map.get(&VoxelKey::new(4, 0, 0)).unwrap().class_confidence, None);
    }

    #[test]
    fn test_stats() {
        let map = map();
        map.insert_batch(&[at(0.1, 0.1, 0.1, 1), at(1.1, 0.1, 0.1, 1), at(2.1, 0.1, 0.1, 4)]);
        let stats = map.stats();
        assert_eq!(stats.voxels, 3);
        assert_eq!(stats.occupied, 3);
        assert_eq!(stats.class_counts.get(&1), Some(&2));
        assert_eq!(stats.class_counts.get(&4), Some(&1));
    }

    #[test]
    fn test_snapshot_is_sorted_and_detached() {
        let map = map();
        map.insert_batch(&[at(2.1, 0.1, 0.1, 1), at(0.1, 0.1, 0.1, 1)]);
        let snapshot = map.snapshot();
        map.reset();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.voxels[0].key < snapshot.voxels[1].key);
        assert_eq!(snapshot.generation, 1);
    }
}
