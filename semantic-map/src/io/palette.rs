//! Class index to display color.
//!
//! PASCAL VOC palette: the bits of the class index are interleaved into the
//! high bits of the three channels, so neighboring indices get visually
//! distinct colors and index 0 is black.

/// Display color for one class index.
pub fn class_color(class: u16) -> [u8; 3] {
    let mut rgb = [0u8; 3];
    let mut c = class as u32;
    for shift in (0..8).rev() {
        rgb[0] |= ((c & 1) as u8) << shift;
        rgb[1] |= (((c >> 1) & 1) as u8) << shift;
        rgb[2] |= (((c >> 2) & 1) as u8) << shift;
        c >>= 3;
    }
    rgb
}

/// Palette for classes `0..num_classes`.
pub fn class_palette(num_classes: usize) -> Vec<[u8; 3]> {
    (0..num_classes.min(u16::MAX as usize + 1))
        .map(|class| class_color(class as u16))
        .collect()
}
