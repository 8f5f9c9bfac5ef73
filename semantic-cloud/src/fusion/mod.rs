//! Semantic fusion: lidar points labeled from the camera's segmentation.
//!
//! ## Per-point pipeline
//!
//! ```text
//! point ─► finite? ─► project ─► sample class ─► confidence ─► remap ─► depth check ─► emit
//!            │          │                           │            │           │
//!            ▼          ▼                           ▼            ▼           ▼
//!         Invalid   OutOfView*                LowConfidence* UnknownClass DepthMismatch
//! ```
//!
//! `*` With background enabled, these points are emitted with the
//! background class instead of being dropped.
//!
//! ## Point types
//!
//! - [`PointType::SemanticsMax`]: class from the argmax class image
//! - [`PointType::SemanticsBayesian`]: top-k candidates from a
//!   [`TopKPrediction`](crate::frame::TopKPrediction); the point carries
//!   every remapped candidate and the map accumulates their confidence
//! - [`PointType::Color`]: no segmentation; in-view points keep their color
//!   and take the background class
//!
//! Fusion is lazy: [`SemanticFusion::fuse`] validates the frame and returns
//! an iterator that labels points as it is advanced. Per-point failures are
//! never errors, only counters in [`FusionStats`].

mod sampling;
mod stats;

pub use sampling::Sampling;
pub use stats::{DropReason, FusionStats};

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::calibration::{CalibrationModel, Projection};
use crate::frame::{ClassImage, Frame, TopKPrediction};
use crate::remap::ClassRemapTable;
use semantic_map::{Candidates, LabeledPoint, MAX_CANDIDATES};

/// Frame validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FusionError {
    /// Image the point type labels from does not match the calibrated
    /// resolution
    #[error("labeling image is {actual:?}, calibration expects {expected:?}")]
    ResolutionMismatch {
        /// Calibrated (width, height)
        expected: (u32, u32),
        /// Labeling image (width, height)
        actual: (u32, u32),
    },

    /// An auxiliary image does not match the calibrated resolution
    #[error("{image} image is {actual:?}, expected {expected:?}")]
    MalformedFrame {
        /// Which image is malformed
        image: &'static str,
        /// Calibrated (width, height)
        expected: (u32, u32),
        /// Offending image (width, height)
        actual: (u32, u32),
    },

    /// The frame lacks the image the point type labels from
    #[error("frame has no {image} image")]
    MissingImage {
        /// Which image is missing
        image: &'static str,
    },
}

impl FusionError {
    /// True if the error is a configuration problem that will repeat for
    /// every frame.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FusionError::ResolutionMismatch { .. })
    }
}

/// What each fused point carries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointType {
    /// Observed color only, labeled with the background class
    Color,
    /// Most likely class from the class image
    #[default]
    SemanticsMax,
    /// Top-k class candidates with confidences
    SemanticsBayesian,
}

/// Fusion tuning.
#[derive(Clone, Debug, PartialEq)]
pub struct FusionConfig {
    /// What each point carries and which image labels it
    pub point_type: PointType,
    /// Class image sampling strategy (`SemanticsMax` only)
    pub sampling: Sampling,
    /// Points whose sampled confidence is below this are unknown (0 disables)
    pub min_confidence: f32,
    /// Maximum lidar/registered depth disagreement in meters (None disables)
    pub depth_tolerance: Option<f64>,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            point_type: PointType::SemanticsMax,
            sampling: Sampling::Nearest,
            min_confidence: 0.0,
            depth_tolerance: Some(0.3),
        }
    }
}

/// Labels lidar points from the camera's segmentation output.
#[derive(Clone, Debug)]
pub struct SemanticFusion {
    calibration: CalibrationModel,
    remap: ClassRemapTable,
    config: FusionConfig,
}

impl SemanticFusion {
    /// Create a fusion engine.
    pub fn new(
        calibration: CalibrationModel,
        remap: ClassRemapTable,
        config: FusionConfig,
    ) -> Self {
        Self {
            calibration,
            remap,
            config,
        }
    }

    /// Calibration model.
    pub fn calibration(&self) -> &CalibrationModel {
        &self.calibration
    }

    /// Class remap table.
    pub fn remap_table(&self) -> &ClassRemapTable {
        &self.remap
    }

    /// Fusion tuning.
    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Validate a frame and return a lazy iterator of labeled points.
    pub fn fuse<'a>(&'a self, frame: &'a Frame) -> Result<FusedPoints<'a>, FusionError> {
        let source = self.validate(frame)?;
        Ok(FusedPoints {
            fusion: self,
            frame,
            source,
            index: 0,
            stats: FusionStats::default(),
            scratch: Vec::new(),
        })
    }

    /// Fuse a whole frame into a vector.
    pub fn fuse_collect(
        &self,
        frame: &Frame,
    ) -> Result<(Vec<LabeledPoint>, FusionStats), FusionError> {
        let mut fused = self.fuse(frame)?;
        let points: Vec<LabeledPoint> = fused.by_ref().collect();
        Ok((points, fused.into_stats()))
    }

    fn validate<'a>(&self, frame: &'a Frame) -> Result<Source<'a>, FusionError> {
        let expected = self.calibration.image_size();
        let (source, actual) = match self.config.point_type {
            PointType::Color => {
                let color = frame
                    .color
                    .as_ref()
                    .ok_or(FusionError::MissingImage { image: "color" })?;
                (Source::Color, color.dimensions())
            }
            PointType::SemanticsMax => {
                let classes = frame
                    .classes
                    .as_ref()
                    .ok_or(FusionError::MissingImage { image: "class" })?;
                (Source::Classes(classes), classes.dimensions())
            }
            PointType::SemanticsBayesian => {
                let top_k = frame
                    .top_k
                    .as_ref()
                    .ok_or(FusionError::MissingImage { image: "top-k" })?;
                (Source::TopK(top_k), top_k.dimensions())
            }
        };
        if actual != expected {
            return Err(FusionError::ResolutionMismatch { expected, actual });
        }

        let auxiliary = [
            ("class", frame.classes.as_ref().map(|i| i.dimensions())),
            ("top-k", frame.top_k.as_ref().map(|p| p.dimensions())),
            ("color", frame.color.as_ref().map(|i| i.dimensions())),
            ("depth", frame.depth.as_ref().map(|i| i.dimensions())),
            ("confidence", frame.confidence.as_ref().map(|i| i.dimensions())),
        ];
        for (image, size) in auxiliary {
            if let Some(size) = size
                && size != expected
            {
                return Err(FusionError::MalformedFrame {
                    image,
                    expected,
                    actual: size,
                });
            }
        }
        Ok(source)
    }
}

/// Image a frame is labeled from, resolved once per frame.
#[derive(Clone, Copy)]
enum Source<'a> {
    Color,
    Classes(&'a ClassImage),
    TopK(&'a TopKPrediction),
}

/// Lazy sequence of labeled points for one frame.
///
/// Borrows the engine and the frame. Counters are available through
/// [`FusedPoints::stats`] at any point during iteration.
pub struct FusedPoints<'a> {
    fusion: &'a SemanticFusion,
    frame: &'a Frame,
    source: Source<'a>,
    index: usize,
    stats: FusionStats,
    scratch: Vec<u16>,
}

impl FusedPoints<'_> {
    /// Counters for the points consumed so far.
    pub fn stats(&self) -> &FusionStats {
        &self.stats
    }

    /// Consume the iterator, returning its counters.
    pub fn into_stats(self) -> FusionStats {
        self.stats
    }

    /// Emit with the background class, or drop with `reason`.
    fn background_or_drop(
        &mut self,
        point: LabeledPoint,
        reason: DropReason,
    ) -> Option<LabeledPoint> {
        match self.fusion.remap.background() {
            Some(class) => {
                self.stats.background += 1;
                Some(LabeledPoint { class, ..point })
            }
            None => {
                self.stats.record_drop(reason);
                None
            }
        }
    }

    fn label(&mut self, position: Point3<f32>) -> Option<LabeledPoint> {
        let fusion = self.fusion;
        let frame = self.frame;
        let mut labeled = LabeledPoint::new(position, 0);

        if !labeled.is_finite() {
            self.stats.record_drop(DropReason::Invalid);
            return None;
        }

        let Some(projection) = fusion.calibration.project(&position) else {
            if let Source::Color = self.source {
                self.stats.record_drop(DropReason::OutOfView);
                return None;
            }
            return self.background_or_drop(labeled, DropReason::OutOfView);
        };
        let (u, v) = projection.pixel();

        if let Some(color) = &frame.color {
            labeled.color = Some(color.get_pixel(u, v).0);
        }

        let (class, background) = match self.source {
            Source::Color => (fusion.remap.background_class(), false),
            Source::Classes(classes) => self.argmax_class(&mut labeled, classes, u, v)?,
            Source::TopK(top_k) => self.top_k_class(&mut labeled, top_k, u, v)?,
        };

        if self.depth_mismatch(&projection, u, v) {
            self.stats.record_drop(DropReason::DepthMismatch);
            return None;
        }

        if background {
            self.stats.background += 1;
        }
        labeled.class = class;
        Some(labeled)
    }

    /// Background class for a low-confidence point, or drop it.
    fn low_confidence(&mut self) -> Option<(u16, bool)> {
        match self.fusion.remap.background() {
            Some(class) => Some((class, true)),
            None => {
                self.stats.record_drop(DropReason::LowConfidence);
                None
            }
        }
    }

    fn is_low_confidence(&self, confidence: Option<f32>) -> bool {
        let min_confidence = self.fusion.config.min_confidence;
        min_confidence > 0.0 && confidence.is_some_and(|c| !(c >= min_confidence))
    }

    /// Output class from the class image. The flag marks background points.
    fn argmax_class(
        &mut self,
        labeled: &mut LabeledPoint,
        classes: &ClassImage,
        u: u32,
        v: u32,
    ) -> Option<(u16, bool)> {
        let fusion = self.fusion;
        if let Some(confidence) = &self.frame.confidence {
            labeled.confidence = Some(confidence.get_pixel(u, v).0[0]);
        }
        if self.is_low_confidence(labeled.confidence) {
            return self.low_confidence();
        }

        let raw = fusion
            .config
            .sampling
            .sample(classes, u, v, &mut self.scratch);
        let known = (raw as usize) < fusion.remap.num_classes();
        match fusion.remap.remap(raw) {
            Some(class) => Some((class, !known)),
            None => {
                self.stats.record_drop(DropReason::UnknownClass);
                None
            }
        }
    }

    /// Output class from the top-k prediction, attaching every remapped
    /// candidate. The top layer's confidence gates the point.
    fn top_k_class(
        &mut self,
        labeled: &mut LabeledPoint,
        top_k: &TopKPrediction,
        u: u32,
        v: u32,
    ) -> Option<(u16, bool)> {
        let fusion = self.fusion;
        let remap = &fusion.remap;
        let mut candidates = Candidates::default();
        let mut from_table = [false; MAX_CANDIDATES];

        for (layer, (raw, confidence)) in top_k.at(u, v).enumerate() {
            if layer == 0 {
                labeled.confidence = Some(confidence);
            }
            if !(confidence.is_finite() && confidence >= 0.0) {
                continue;
            }
            let Some(class) = remap.remap(raw) else {
                continue;
            };
            if let Some(slot) = candidates.push(class, confidence) {
                from_table[slot] |= (raw as usize) < remap.num_classes();
            }
        }

        if self.is_low_confidence(labeled.confidence) {
            return self.low_confidence();
        }
        let Some(best) = candidates.best_index() else {
            self.stats.record_drop(DropReason::UnknownClass);
            return None;
        };
        let class = candidates.as_slice()[best].class;
        labeled.candidates = candidates;
        Some((class, !from_table[best]))
    }

    fn depth_mismatch(&self, projection: &Projection, u: u32, v: u32) -> bool {
        let (Some(tolerance), Some(depth)) =
            (self.fusion.config.depth_tolerance, &self.frame.depth)
        else {
            return false;
        };
        let registered = depth.get_pixel(u, v).0[0];
        if !(registered.is_finite() && registered > 0.0) {
            return false;
        }
        (projection.depth - registered as f64).abs() > tolerance
    }
}

impl Iterator for FusedPoints<'_> {
    type Item = LabeledPoint;

    fn next(&mut self) -> Option<LabeledPoint> {
        while let Some(&position) = self.frame.points.get(self.index) {
            self.index += 1;
            self.stats.input += 1;
            if let Some(point) = self.label(position) {
                self.stats.emitted += 1;
                return Some(point);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.frame.points.len() - self.index))
    }
}
