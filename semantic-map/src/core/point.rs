//! Labeled lidar returns.

use nalgebra::Point3;

/// Most class candidates a point can carry.
pub const MAX_CANDIDATES: usize = 3;

/// One class hypothesis with its segmentation confidence.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ClassScore {
    /// Output class
    pub class: u16,
    /// Confidence in `[0, 1]`
    pub confidence: f32,
}

/// Up to [`MAX_CANDIDATES`] class hypotheses for one point.
///
/// Pushing a class that is already present adds to its confidence, so
/// raw classes folded together by a remap table pool their evidence.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Candidates {
    scores: [ClassScore; MAX_CANDIDATES],
    len: u8,
}

impl Candidates {
    /// Add evidence for `class`. Returns the slot it landed in, or `None`
    /// if the class is new and every slot is taken.
    pub fn push(&mut self, class: u16, confidence: f32) -> Option<usize> {
        let len = self.len as usize;
        if let Some(i) = self.scores[..len].iter().position(|s| s.class == class) {
            self.scores[i].confidence += confidence;
            return Some(i);
        }
        if len == MAX_CANDIDATES {
            return None;
        }
        self.scores[len] = ClassScore { class, confidence };
        self.len += 1;
        Some(len)
    }

    /// Candidates in insertion order.
    #[inline]
    pub fn as_slice(&self) -> &[ClassScore] {
        &self.scores[..self.len as usize]
    }

    /// Number of candidates.
    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// True if no candidate was pushed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Slot of the most confident candidate. Ties go to the lowest class.
    pub fn best_index(&self) -> Option<usize> {
        let scores = self.as_slice();
        (0..scores.len()).reduce(|best, i| {
            let (a, b) = (&scores[best], &scores[i]);
            if b.confidence > a.confidence
                || (b.confidence == a.confidence && b.class < a.class)
            {
                i
            } else {
                best
            }
        })
    }

    /// Most confident candidate.
    pub fn best(&self) -> Option<ClassScore> {
        self.best_index().map(|i| self.scores[i])
    }
}

/// A lidar return carrying a semantic class.
///
/// Created once per lidar return by the fusion stage and moved into the
/// map on insertion. Never mutated after creation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LabeledPoint {
    /// Position in the map's reference frame (meters).
    pub position: Point3<f32>,
    /// Semantic class in the output (remapped) class space.
    pub class: u16,
    /// Camera color sampled at the projected pixel, if available.
    pub color: Option<[u8; 3]>,
    /// Segmentation confidence at the projected pixel, if available.
    pub confidence: Option<f32>,
    /// Top-k class hypotheses (empty unless produced by Bayesian fusion).
    pub candidates: Candidates,
}

impl LabeledPoint {
    /// Create a point with a class and no color or confidence.
    pub fn new(position: Point3<f32>, class: u16) -> Self {
        Self {
            position,
            class,
            color: None,
            confidence: None,
            candidates: Candidates::default(),
        }
    }

    /// Attach a sampled color.
    pub fn with_color(mut self, color: [u8; 3]) -> Self {
        self.color = Some(color);
        self
    }

    /// Attach a segmentation confidence.
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Attach top-k class hypotheses.
    pub fn with_candidates(mut self, candidates: Candidates) -> Self {
        self.candidates = candidates;
        self
    }

    /// True if all coordinates are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|v| v.is_finite())
    }
}

/// Labeled points produced from one synchronized frame.
#[derive(Clone, Debug, Default)]
pub struct LabeledCloud {
    /// Frame timestamp in microseconds.
    pub timestamp_us: u64,
    /// Reference frame the positions are expressed in (e.g. "lidar").
    pub frame_id: String,
    /// The labeled points.
    pub points: Vec<LabeledPoint>,
}

impl LabeledCloud {
    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if the cloud has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
