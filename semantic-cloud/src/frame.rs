//! Synchronized sensor frame consumed by the fusion engine.

use image::{ImageBuffer, Luma, RgbImage};
use nalgebra::Point3;
use semantic_map::MAX_CANDIDATES;

/// Per-pixel raw class indices from the segmentation model.
pub type ClassImage = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Registered depth in meters (0 or NaN where invalid).
pub type DepthImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Per-pixel confidence of the predicted class, in `[0, 1]`.
pub type ConfidenceImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Top-k prediction construction errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PredictionError {
    /// No layers given
    #[error("top-k prediction needs at least one layer")]
    Empty,

    /// More layers than a point can carry
    #[error("top-k prediction has {layers} layers, at most {max} are supported")]
    TooManyLayers {
        /// Layers given
        layers: usize,
        /// Supported maximum
        max: usize,
    },

    /// Class and confidence layer counts differ
    #[error("{classes} class layers but {confidences} confidence layers")]
    LayerCount {
        /// Class layers
        classes: usize,
        /// Confidence layers
        confidences: usize,
    },

    /// A layer differs in size from the first class layer
    #[error("top-k layer is {actual:?}, first layer is {expected:?}")]
    SizeMismatch {
        /// First class layer (width, height)
        expected: (u32, u32),
        /// Offending layer (width, height)
        actual: (u32, u32),
    },
}

/// Best-first per-pixel class candidates with their probabilities.
///
/// Layer `i` holds the `i`-th most likely raw class of every pixel and its
/// probability.
#[derive(Clone, Debug)]
pub struct TopKPrediction {
    classes: Vec<ClassImage>,
    confidences: Vec<ConfidenceImage>,
}

impl TopKPrediction {
    /// Create a validated prediction of `1..=MAX_CANDIDATES` layers.
    pub fn new(
        classes: Vec<ClassImage>,
        confidences: Vec<ConfidenceImage>,
    ) -> Result<Self, PredictionError> {
        let Some(first) = classes.first() else {
            return Err(PredictionError::Empty);
        };
        if classes.len() > MAX_CANDIDATES {
            return Err(PredictionError::TooManyLayers {
                layers: classes.len(),
                max: MAX_CANDIDATES,
            });
        }
        if classes.len() != confidences.len() {
            return Err(PredictionError::LayerCount {
                classes: classes.len(),
                confidences: confidences.len(),
            });
        }
        let expected = first.dimensions();
        let sizes = classes
            .iter()
            .map(|l| l.dimensions())
            .chain(confidences.iter().map(|l| l.dimensions()));
        for actual in sizes {
            if actual != expected {
                return Err(PredictionError::SizeMismatch { expected, actual });
            }
        }
        Ok(Self {
            classes,
            confidences,
        })
    }

    /// Number of layers.
    #[inline]
    pub fn k(&self) -> usize {
        self.classes.len()
    }

    /// (width, height) of every layer.
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        self.classes[0].dimensions()
    }

    /// Class layers, best first.
    pub fn classes(&self) -> &[ClassImage] {
        &self.classes
    }

    /// Confidence layers, aligned with [`TopKPrediction::classes`].
    pub fn confidences(&self) -> &[ConfidenceImage] {
        &self.confidences
    }

    /// `(raw class, confidence)` pairs of one pixel, best first.
    pub(crate) fn at(&self, u: u32, v: u32) -> impl Iterator<Item = (u16, f32)> + '_ {
        self.classes
            .iter()
            .zip(&self.confidences)
            .map(move |(c, p)| (c.get_pixel(u, v).0[0], p.get_pixel(u, v).0[0]))
    }
}

/// One synchronized camera/lidar observation.
///
/// Which image the fusion engine labels from depends on its point type:
/// the class image, the top-k prediction, or only the color image. That
/// image must match the calibrated resolution; every other image present
/// must have the same size.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Acquisition time in microseconds
    pub timestamp_us: u64,
    /// Lidar points in the lidar frame
    pub points: Vec<Point3<f32>>,
    /// Raw class image (argmax of the segmentation output)
    pub classes: Option<ClassImage>,
    /// Top-k segmentation output
    pub top_k: Option<TopKPrediction>,
    /// Rectified color image
    pub color: Option<RgbImage>,
    /// Registered depth image
    pub depth: Option<DepthImage>,
    /// Class confidence image
    pub confidence: Option<ConfidenceImage>,
}

impl Frame {
    /// Frame labeled from a class image.
    pub fn new(timestamp_us: u64, points: Vec<Point3<f32>>, classes: ClassImage) -> Self {
        Self::points_only(timestamp_us, points).with_classes(classes)
    }

    /// Frame with lidar points and no images yet.
    pub fn points_only(timestamp_us: u64, points: Vec<Point3<f32>>) -> Self {
        Self {
            timestamp_us,
            points,
            classes: None,
            top_k: None,
            color: None,
            depth: None,
            confidence: None,
        }
    }

    /// Attach a class image.
    pub fn with_classes(mut self, classes: ClassImage) -> Self {
        self.classes = Some(classes);
        self
    }

    /// Attach a top-k prediction.
    pub fn with_top_k(mut self, top_k: TopKPrediction) -> Self {
        self.top_k = Some(top_k);
        self
    }

    /// Attach a color image.
    pub fn with_color(mut self, color: RgbImage) -> Self {
        self.color = Some(color);
        self
    }

    /// Attach a registered depth image.
    pub fn with_depth(mut self, depth: DepthImage) -> Self {
        self.depth = Some(depth);
        self
    }

    /// Attach a confidence image.
    pub fn with_confidence(mut self, confidence: ConfidenceImage) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(class: u16) -> ClassImage {
        ClassImage::from_pixel(4, 3, Luma([class]))
    }

    fn probability(p: f32) -> ConfidenceImage {
        ConfidenceImage::from_pixel(4, 3, Luma([p]))
    }

    #[test]
    fn test_top_k_pixel_order() {
        let top_k =
            TopKPrediction::new(vec![layer(5), layer(2)], vec![probability(0.6), probability(0.3)])
                .unwrap();
        assert_eq!(top_k.k(), 2);
        assert_eq!(top_k.dimensions(), (4, 3));
        let pixel: Vec<_> = top_k.at(1, 2).collect();
        assert_eq!(pixel, vec![(5, 0.6), (2, 0.3)]);
    }

    #[test]
    fn test_top_k_rejects_bad_layers() {
        assert_eq!(
            TopKPrediction::new(vec![], vec![]).err(),
            Some(PredictionError::Empty)
        );
        assert_eq!(
            TopKPrediction::new(vec![layer(1); 4], vec![probability(0.1); 4]).err(),
            Some(PredictionError::TooManyLayers { layers: 4, max: 3 })
        );
        assert_eq!(
            TopKPrediction::new(vec![layer(1), layer(2)], vec![probability(0.1)]).err(),
            Some(PredictionError::LayerCount {
                classes: 2,
                confidences: 1
            })
        );
        let small = ConfidenceImage::from_pixel(2, 2, Luma([0.5]));
        assert_eq!(
            TopKPrediction::new(vec![layer(1)], vec![small]).err(),
            Some(PredictionError::SizeMismatch {
                expected: (4, 3),
                actual: (2, 2)
            })
        );
    }
}
