//! Per-voxel occupancy and semantic evidence.

use crate::core::LabeledPoint;

use super::config::{LogOddsConfig, MapConfig};

/// Occupancy and class evidence accumulated in one voxel.
///
/// A voxel exists only once a labeled point has landed in it. From then on
/// every insertion touching it adds exactly one hit and one histogram count.
///
/// Points carrying class candidates also add each candidate's confidence to
/// a per-class evidence vector. The reported class is the argmax of that
/// evidence once any exists, otherwise the argmax of the histogram.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Voxel {
    log_odds: i16,
    hits: u32,
    histogram: Vec<u32>,
    evidence: Vec<f32>,
    color_sum: [u64; 3],
    color_samples: u32,
}

impl Voxel {
    /// Record a labeled point landing in this voxel.
    pub(crate) fn observe(&mut self, point: &LabeledPoint, config: &MapConfig) {
        self.log_odds = config.log_odds.apply(self.log_odds, config.log_odds.l_hit);
        self.hits = self.hits.saturating_add(1);

        let class = point.class as usize;
        if self.histogram.len() <= class {
            self.histogram.resize(class + 1, 0);
        }
        let count = &mut self.histogram[class];
        if *count < config.max_class_count {
            *count += 1;
        }

        for score in point.candidates.as_slice() {
            if !(score.confidence.is_finite() && score.confidence > 0.0) {
                continue;
            }
            let class = score.class as usize;
            if self.evidence.len() <= class {
                self.evidence.resize(class + 1, 0.0);
            }
            self.evidence[class] += score.confidence;
        }

        if let Some(color) = point.color
            && self.color_samples < u32::MAX
        {
            for (sum, c) in self.color_sum.iter_mut().zip(color) {
                *sum += c as u64;
            }
            self.color_samples += 1;
        }
    }

    /// Record a ray passing through this voxel. Class evidence is untouched.
    pub(crate) fn observe_free(&mut self, config: &LogOddsConfig) {
        self.log_odds = config.apply(self.log_odds, config.l_miss);
    }

    /// Fixed-point log-odds (value / 100).
    #[inline]
    pub fn log_odds(&self) -> i16 {
        self.log_odds
    }

    /// Occupancy probability in `[0, 1]`.
    #[inline]
    pub fn probability(&self) -> f32 {
        LogOddsConfig::log_odds_to_probability(self.log_odds)
    }

    /// True if the log-odds exceed the configured occupied threshold.
    #[inline]
    pub fn is_occupied(&self, config: &LogOddsConfig) -> bool {
        self.log_odds > config.l_occupied_threshold
    }

    /// Total labeled points observed (saturating).
    #[inline]
    pub fn hits(&self) -> u32 {
        self.hits
    }

    /// Class histogram indexed by output class.
    #[inline]
    pub fn histogram(&self) -> &[u32] {
        &self.histogram
    }

    /// Observation count for one class.
    #[inline]
    pub fn class_count(&self, class: u16) -> u32 {
        self.histogram.get(class as usize).copied().unwrap_or(0)
    }

    /// Accumulated candidate confidence indexed by output class.
    #[inline]
    pub fn evidence(&self) -> &[f32] {
        &self.evidence
    }

    /// Reported class. Ties go to the lowest class index.
    pub fn dominant_class(&self) -> Option<u16> {
        self.evidence_class().or_else(|| self.histogram_class())
    }

    /// Share of the total candidate evidence held by the reported class.
    pub fn class_confidence(&self) -> Option<f32> {
        let class = self.evidence_class()?;
        let total: f32 = self.evidence.iter().sum();
        Some(self.evidence[class as usize] / total)
    }

    fn evidence_class(&self) -> Option<u16> {
        let mut best: Option<(usize, f32)> = None;
        for (class, &weight) in self.evidence.iter().enumerate() {
            if weight <= 0.0 {
                continue;
            }
            match best {
                Some((_, best_weight)) if best_weight >= weight => {}
                _ => best = Some((class, weight)),
            }
        }
        best.map(|(class, _)| class as u16)
    }

    fn histogram_class(&self) -> Option<u16> {
        let mut best: Option<(usize, u32)> = None;
        for (class, &count) in self.histogram.iter().enumerate() {
            if count == 0 {
                continue;
            }
            match best {
                Some((_, best_count)) if best_count >= count => {}
                _ => best = Some((class, count)),
            }
        }
        best.map(|(class, _)| class as u16)
    }

    /// Mean of the colors observed in this voxel.
    pub fn mean_color(&self) -> Option<[u8; 3]> {
        if self.color_samples == 0 {
            return None;
        }
        let n = self.color_samples as u64;
        Some([
            (self.color_sum[0] / n) as u8,
            (self.color_sum[1] / n) as u8,
            (self.color_sum[2] / n) as u8,
        ])
    }
}
