//! Class image sampling strategies.

use crate::frame::ClassImage;

/// How the class of a projected point is read from the class image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Sampling {
    /// Class of the pixel containing the projection
    #[default]
    Nearest,
    /// Most frequent class in the `(2r+1)²` window around the pixel,
    /// clipped to the image. Ties go to the lowest raw class.
    MajorityWindow {
        /// Window radius in pixels
        window_radius: u32,
    },
}

impl Sampling {
    /// Raw class at pixel `(u, v)`. `scratch` is reused between calls.
    pub(crate) fn sample(
        &self,
        image: &ClassImage,
        u: u32,
        v: u32,
        scratch: &mut Vec<u16>,
    ) -> u16 {
        match *self {
            Sampling::Nearest => image.get_pixel(u, v).0[0],
            Sampling::MajorityWindow { window_radius } => {
                majority(image, u, v, window_radius, scratch)
            }
        }
    }
}

fn majority(image: &ClassImage, u: u32, v: u32, radius: u32, scratch: &mut Vec<u16>) -> u16 {
    let (width, height) = image.dimensions();
    let u_lo = u.saturating_sub(radius);
    let v_lo = v.saturating_sub(radius);
    let u_hi = u.saturating_add(radius).min(width - 1);
    let v_hi = v.saturating_add(radius).min(height - 1);

    scratch.clear();
    for y in v_lo..=v_hi {
        for x in u_lo..=u_hi {
            scratch.push(image.get_pixel(x, y).0[0]);
        }
    }
    scratch.sort_unstable();

    // Runs are ascending, so a strictly greater count is needed to replace
    let mut best = (scratch[0], 0usize);
    let mut run = (scratch[0], 0usize);
    for &class in scratch.iter() {
        if class == run.0 {
            run.1 += 1;
        } else {
            run = (class, 1);
        }
        if run.1 > best.1 {
            best = run;
        }
    }
    best.0
}
