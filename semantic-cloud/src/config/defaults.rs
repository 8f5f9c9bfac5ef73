//! Default value functions for serde deserialization.

pub fn image_width() -> u32 {
    640
}

pub fn image_height() -> u32 {
    480
}

pub fn focal_length() -> f64 {
    525.0
}

pub fn principal_x() -> f64 {
    319.5
}

pub fn principal_y() -> f64 {
    239.5
}

pub fn extrinsics() -> Vec<Vec<f64>> {
    (0..4)
        .map(|r| (0..4).map(|c| if r == c { 1.0 } else { 0.0 }).collect())
        .collect()
}

pub fn num_classes() -> usize {
    150
}

pub fn background_class() -> u16 {
    7
}

pub fn window_radius() -> u32 {
    1
}

pub fn frame_id() -> String {
    "lidar".to_string()
}

pub fn device() -> String {
    "cpu".to_string()
}

pub fn enabled() -> bool {
    true
}

pub fn depth_tolerance() -> f64 {
    0.3
}

pub fn queue_size() -> usize {
    4
}

pub fn frame_timeout_ms() -> u64 {
    500
}

pub fn max_missed_frames() -> u32 {
    20
}

pub fn snapshot_interval_ms() -> u64 {
    1000
}

pub fn stats_interval_s() -> u64 {
    10
}
