//! Synthetic tiles for unit tests.

use image::{GrayImage, Luma, Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Uniform background with a filled disk of value `fg`.
///
/// Disk membership is `dx² + dy² <= r²`, matching [`crate::mask::Mask::disk`].
pub(crate) fn disk_tile(
    w: u32,
    h: u32,
    center: [f64; 2],
    radius: f64,
    bg: u8,
    fg: u8,
) -> GrayImage {
    let r2 = radius * radius;
    GrayImage::from_fn(w, h, |x, y| {
        let dx = x as f64 - center[0];
        let dy = y as f64 - center[1];
        Luma([if dx * dx + dy * dy <= r2 { fg } else { bg }])
    })
}

/// Color counterpart of [`disk_tile`].
pub(crate) fn color_disk_tile(
    w: u32,
    h: u32,
    center: [f64; 2],
    radius: f64,
    bg: [u8; 3],
    fg: [u8; 3],
) -> RgbImage {
    let r2 = radius * radius;
    RgbImage::from_fn(w, h, |x, y| {
        let dx = x as f64 - center[0];
        let dy = y as f64 - center[1];
        Rgb(if dx * dx + dy * dy <= r2 { fg } else { bg })
    })
}

/// Add uniform integer noise in `[-amplitude, amplitude]`, seeded.
pub(crate) fn add_noise(img: &mut GrayImage, amplitude: i16, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for p in img.pixels_mut() {
        let n: i16 = rng.gen_range(-amplitude..=amplitude);
        p[0] = (p[0] as i16 + n).clamp(0, 255) as u8;
    }
}

/// Scatter `count` bright single-pixel specks over a uniform tile.
pub(crate) fn speckle_tile(w: u32, h: u32, count: usize, bg: u8, fg: u8, seed: u64) -> GrayImage {
    let mut img = GrayImage::from_pixel(w, h, Luma([bg]));
    let mut rng = StdRng::seed_from_u64(seed);
    let mut placed = 0;
    while placed < count {
        // Keep specks on even coordinates so no two touch under 8-connectivity.
        let x = rng.gen_range(0..w / 2) * 2;
        let y = rng.gen_range(0..h / 2) * 2;
        if img.get_pixel(x, y)[0] != fg {
            img.put_pixel(x, y, Luma([fg]));
            placed += 1;
        }
    }
    img
}
