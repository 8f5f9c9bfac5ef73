//! Test utilities for semantic-cloud integration tests.

#![allow(dead_code)]

use image::Luma;
use nalgebra::Point3;
use semantic_cloud::{
    CalibrationModel, ClassImage, ClassRemapTable, ConfidenceImage, Extrinsics, Frame,
    FusionConfig, Intrinsics, SemanticFusion, TopKPrediction,
};

/// 100x100 camera, f = 100, principal point at the center, identity extrinsics.
pub fn square_camera() -> CalibrationModel {
    let intrinsics = Intrinsics::new(100.0, 100.0, 50.0, 50.0, 100, 100).unwrap();
    CalibrationModel::new(intrinsics, Extrinsics::identity()).unwrap()
}

/// Lidar (x forward, y left, z up) to camera optical frame.
pub fn lidar_camera() -> CalibrationModel {
    let rows = vec![
        vec![0.0, -1.0, 0.0, 0.0],
        vec![0.0, 0.0, -1.0, 0.0],
        vec![1.0, 0.0, 0.0, 0.0],
        vec![0.0, 0.0, 0.0, 1.0],
    ];
    let intrinsics = Intrinsics::new(100.0, 100.0, 50.0, 50.0, 100, 100).unwrap();
    CalibrationModel::new(intrinsics, Extrinsics::from_rows(&rows).unwrap()).unwrap()
}

/// Class image of a single class.
pub fn uniform_classes(width: u32, height: u32, class: u16) -> ClassImage {
    ClassImage::from_pixel(width, height, Luma([class]))
}

/// Class image whose left half is `left` and right half is `right`.
pub fn split_classes(width: u32, height: u32, left: u16, right: u16) -> ClassImage {
    ClassImage::from_fn(width, height, |u, _| {
        if u < width / 2 {
            Luma([left])
        } else {
            Luma([right])
        }
    })
}

/// Camera-frame point that projects to pixel `(u, v)` of [`square_camera`] at `depth`.
pub fn point_at_pixel(u: f64, v: f64, depth: f64) -> Point3<f32> {
    Point3::new(
        ((u - 50.0) * depth / 100.0) as f32,
        ((v - 50.0) * depth / 100.0) as f32,
        depth as f32,
    )
}

/// Fusion over [`square_camera`] with an identity remap of `num_classes`.
pub fn fusion(num_classes: usize, include_background: bool, config: FusionConfig) -> SemanticFusion {
    let remap = ClassRemapTable::identity(num_classes, include_background, 7).unwrap();
    SemanticFusion::new(square_camera(), remap, config)
}

/// Frame over [`square_camera`] with a uniform class image.
pub fn frame_with(points: Vec<Point3<f32>>, class: u16) -> Frame {
    Frame::new(0, points, uniform_classes(100, 100, class))
}

/// Uniform 100x100 top-k prediction, best layer first.
pub fn uniform_top_k(layers: &[(u16, f32)]) -> TopKPrediction {
    let classes = layers
        .iter()
        .map(|&(class, _)| uniform_classes(100, 100, class))
        .collect();
    let confidences = layers
        .iter()
        .map(|&(_, p)| ConfidenceImage::from_pixel(100, 100, Luma([p])))
        .collect();
    TopKPrediction::new(classes, confidences).unwrap()
}

/// Frame over [`square_camera`] carrying only a uniform top-k prediction.
pub fn top_k_frame(points: Vec<Point3<f32>>, layers: &[(u16, f32)]) -> Frame {
    Frame::points_only(0, points).with_top_k(uniform_top_k(layers))
}
