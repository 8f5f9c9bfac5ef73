//! Synthetic frame producer.
//!
//! Stands in for the camera, lidar, and segmentation model when no hardware
//! is attached. The scene is a flat wall facing the camera:
//!
//! ```text
//!   class image (columns split into bands)     lidar points
//!   ┌────────┬────────┬────────┐
//!   │ band 0 │ band 1 │ band 2 │               · · · · · · on the wall at
//!   │        │        │        │               · · · · · · `wall_distance`
//!   └────────┴────────┴────────┘
//! ```
//!
//! Each frame also carries a matching color image (palette colors) and a
//! registered depth image of the wall. A few points are placed behind the
//! camera to exercise the out-of-view path. With top-k output enabled, each
//! pixel ranks its own band first, followed by its two neighbor bands.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::SendTimeoutError;
use image::{Luma, Rgb, RgbImage};
use nalgebra::Point3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use semantic_map::class_color;

use crate::calibration::CalibrationModel;
use crate::frame::{ClassImage, ConfidenceImage, DepthImage, Frame, TopKPrediction};
use crate::pipeline::FrameSender;

/// Synthetic wall scene.
pub struct SyntheticScene {
    calibration: CalibrationModel,
    bands: Vec<u16>,
    wall_distance: f64,
    points_per_frame: usize,
    points_behind: usize,
    noise: f64,
    top_k: bool,
    rng: StdRng,
}

/// Top-k layer probabilities, best first.
const TOP_K_PROBABILITIES: [f32; 3] = [0.7, 0.2, 0.1];

impl SyntheticScene {
    /// Wall at `wall_distance` meters in front of the camera, split into
    /// vertical bands of the given raw classes.
    pub fn new(calibration: CalibrationModel, bands: Vec<u16>, wall_distance: f64) -> Self {
        Self {
            calibration,
            bands: if bands.is_empty() { vec![0] } else { bands },
            wall_distance,
            points_per_frame: 2000,
            points_behind: 0,
            noise: 0.0,
            top_k: false,
            rng: StdRng::seed_from_u64(0),
        }
    }

    /// Lidar points on the wall per frame.
    pub fn with_points(mut self, points_per_frame: usize) -> Self {
        self.points_per_frame = points_per_frame;
        self
    }

    /// Extra points behind the camera per frame.
    pub fn with_points_behind(mut self, points_behind: usize) -> Self {
        self.points_behind = points_behind;
        self
    }

    /// Uniform depth noise amplitude (meters).
    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise.abs();
        self
    }

    /// Also emit a top-3 prediction per frame.
    pub fn with_top_k(mut self, top_k: bool) -> Self {
        self.top_k = top_k;
        self
    }

    /// Reseed the point sampler.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Calibration the scene renders with.
    pub fn calibration(&self) -> &CalibrationModel {
        &self.calibration
    }

    /// Raw class of image column `u`.
    pub fn band_class(&self, u: u32) -> u16 {
        self.bands[self.band_index(u)]
    }

    fn band_index(&self, u: u32) -> usize {
        let width = self.calibration.intrinsics().width as usize;
        (u as usize * self.bands.len() / width).min(self.bands.len() - 1)
    }

    /// Band classes of column `u` ranked for top-k output.
    fn ranked_bands(&self, u: u32) -> [u16; 3] {
        let n = self.bands.len();
        let i = self.band_index(u);
        [self.bands[i], self.bands[(i + 1) % n], self.bands[(i + n - 1) % n]]
    }

    fn prediction(&self, width: u32, height: u32) -> Option<TopKPrediction> {
        let classes = (0..3)
            .map(|rank| {
                ClassImage::from_fn(width, height, |u, _| Luma([self.ranked_bands(u)[rank]]))
            })
            .collect();
        let confidences = TOP_K_PROBABILITIES
            .iter()
            .map(|&p| ConfidenceImage::from_pixel(width, height, Luma([p])))
            .collect();
        match TopKPrediction::new(classes, confidences) {
            Ok(top_k) => Some(top_k),
            Err(e) => {
                log::warn!("Synthetic top-k prediction rejected: {}", e);
                None
            }
        }
    }

    /// Render one frame.
    pub fn frame(&mut self, timestamp_us: u64) -> Frame {
        let (width, height) = self.calibration.image_size();

        let classes = ClassImage::from_fn(width, height, |u, _| Luma([self.band_class(u)]));
        let color = RgbImage::from_fn(width, height, |u, _| Rgb(class_color(self.band_class(u))));
        let depth = DepthImage::from_pixel(width, height, Luma([self.wall_distance as f32]));

        let k = *self.calibration.intrinsics();
        let mut points = Vec::with_capacity(self.points_per_frame + self.points_behind);
        for _ in 0..self.points_per_frame {
            let u = self.rng.gen_range(0.0..width as f64);
            let v = self.rng.gen_range(0.0..height as f64);
            let z = if self.noise > 0.0 {
                self.wall_distance + self.rng.gen_range(-self.noise..=self.noise)
            } else {
                self.wall_distance
            };
            let camera = Point3::new((u - k.cx) * z / k.fx, (v - k.cy) * z / k.fy, z);
            points.push(self.calibration.from_camera_frame(&camera));
        }
        for _ in 0..self.points_behind {
            let x = self.rng.gen_range(-1.0..1.0);
            let y = self.rng.gen_range(-1.0..1.0);
            let camera = Point3::new(x, y, -self.wall_distance);
            points.push(self.calibration.from_camera_frame(&camera));
        }

        let frame = Frame::new(timestamp_us, points, classes)
            .with_color(color)
            .with_depth(depth);
        let prediction = if self.top_k {
            self.prediction(width, height)
        } else {
            None
        };
        match prediction {
            Some(top_k) => frame.with_top_k(top_k),
            None => frame,
        }
    }
}

/// Send `frames` frames (or until shutdown when `None`) at `rate_hz`.
///
/// The thread returns the number of frames sent. Dropping the sender when it
/// finishes closes the channel, which ends the update loop.
pub fn spawn_producer(
    mut scene: SyntheticScene,
    tx: FrameSender,
    rate_hz: f64,
    frames: Option<u64>,
    running: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<u64>> {
    let period = if rate_hz > 0.0 {
        Duration::from_secs_f64(1.0 / rate_hz)
    } else {
        Duration::ZERO
    };

    thread::Builder::new()
        .name("synthetic-producer".into())
        .spawn(move || {
            log::info!("Synthetic producer starting ({:.1} Hz)", rate_hz);
            let mut sent = 0u64;
            'frames: while running.load(Ordering::Relaxed) && frames.is_none_or(|n| sent < n) {
                let timestamp_us = sent * period.as_micros() as u64;
                let mut frame = scene.frame(timestamp_us);
                loop {
                    match tx.send_timeout(frame, Duration::from_millis(100)) {
                        Ok(()) => break,
                        Err(SendTimeoutError::Timeout(back)) => {
                            if !running.load(Ordering::Relaxed) {
                                break 'frames;
                            }
                            frame = back;
                        }
                        Err(SendTimeoutError::Disconnected(_)) => {
                            log::debug!("Frame consumer gone, producer stopping");
                            break 'frames;
                        }
                    }
                }
                sent += 1;
                if !period.is_zero() {
                    thread::sleep(period);
                }
            }
            log::info!("Synthetic producer finished ({} frames)", sent);
            sent
        })
}
