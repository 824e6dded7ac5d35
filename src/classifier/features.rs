//! Engineered feature blocks for region embeddings.
//!
//! The embedding is built from three histogram blocks computed over the
//! resized region crop:
//!
//! - color (64): 16-bin histograms of the R, G, B and gray channels
//! - texture (32): 8-bin histograms of LBP counts, gradient magnitude,
//!   local variance and local contrast
//! - edge (16): 8-bin gradient direction and magnitude histograms over
//!   pixels with gradient magnitude above 30
//!
//! All histograms are normalized by the number of contributing pixels.

use image::RgbaImage;

use std::f32::consts::PI;

/// Number of color features.
pub const COLOR_FEATURES: usize = 64;
/// Number of texture features.
pub const TEXTURE_FEATURES: usize = 32;
/// Number of edge features.
pub const EDGE_FEATURES: usize = 16;

/// Gradient magnitude above which a pixel contributes to the edge block.
const EDGE_MAGNITUDE_THRESHOLD: f32 = 30.0;

#[inline]
fn gray_at(image: &RgbaImage, x: u32, y: u32) -> i32 {
    let [r, g, b, _] = image.get_pixel(x, y).0;
    (i32::from(r) + i32::from(g) + i32::from(b)) / 3
}

/// 16-bin per-channel color histograms, `[r | g | b | gray]`.
pub fn color_features(image: &RgbaImage) -> [f32; COLOR_FEATURES] {
    let mut features = [0.0f32; COLOR_FEATURES];
    let total = (image.width() as usize) * (image.height() as usize);
    if total == 0 {
        return features;
    }

    let mut r_hist = [0u32; 16];
    let mut g_hist = [0u32; 16];
    let mut b_hist = [0u32; 16];
    let mut gray_hist = [0u32; 16];
    for pixel in image.pixels() {
        let [r, g, b, _] = pixel.0;
        r_hist[usize::from(r) / 16] += 1;
        g_hist[usize::from(g) / 16] += 1;
        b_hist[usize::from(b) / 16] += 1;
        let gray = (usize::from(r) + usize::from(g) + usize::from(b)) / 3;
        gray_hist[gray / 16] += 1;
    }

    for i in 0..16 {
        features[i] = r_hist[i] as f32 / total as f32;
        features[i + 16] = g_hist[i] as f32 / total as f32;
        features[i + 32] = b_hist[i] as f32 / total as f32;
        features[i + 48] = gray_hist[i] as f32 / total as f32;
    }
    features
}

/// LBP offsets, clockwise from the top-left neighbor.
const LBP_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
];

/// 8-bin LBP, gradient, variance and contrast histograms over interior
/// pixels, `[lbp | gradient | variance | contrast]`.
pub fn texture_features(image: &RgbaImage) -> [f32; TEXTURE_FEATURES] {
    let mut features = [0.0f32; TEXTURE_FEATURES];
    let (width, height) = image.dimensions();
    if width < 3 || height < 3 {
        return features;
    }

    let mut lbp = [0u32; 8];
    let mut gradient = [0u32; 8];
    let mut variance = [0u32; 8];
    let mut contrast = [0u32; 8];

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let center = gray_at(image, x, y);
            for (i, (dx, dy)) in LBP_OFFSETS.iter().enumerate() {
                let neighbor = gray_at(
                    image,
                    (x as i32 + dx) as u32,
                    (y as i32 + dy) as u32,
                );
                if neighbor > center {
                    lbp[i] += 1;
                }
            }

            let gx = gray_at(image, x + 1, y) - gray_at(image, x - 1, y);
            let gy = gray_at(image, x, y + 1) - gray_at(image, x, y - 1);
            let magnitude = ((gx * gx + gy * gy) as f32).sqrt();
            gradient[(magnitude as usize / 32) % 8] += 1;

            let local_var = window_variance(image, x, y);
            variance[(local_var as usize / 100) % 8] += 1;

            let mut max_gray = 0;
            let mut min_gray = 255;
            for dy in -1..=1i32 {
                for dx in -1..=1i32 {
                    let g = gray_at(image, (x as i32 + dx) as u32, (y as i32 + dy) as u32);
                    max_gray = max_gray.max(g);
                    min_gray = min_gray.min(g);
                }
            }
            contrast[((max_gray - min_gray) as usize / 32) % 8] += 1;
        }
    }

    let total = ((width - 2) as usize * (height - 2) as usize) as f32;
    for i in 0..8 {
        features[i] = lbp[i] as f32 / total;
        features[i + 8] = gradient[i] as f32 / total;
        features[i + 16] = variance[i] as f32 / total;
        features[i + 24] = contrast[i] as f32 / total;
    }
    features
}

fn window_variance(image: &RgbaImage, cx: u32, cy: u32) -> f32 {
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    for dy in -1..=1i32 {
        for dx in -1..=1i32 {
            let v = f64::from(gray_at(image, (cx as i32 + dx) as u32, (cy as i32 + dy) as u32));
            sum += v;
            sum_sq += v * v;
        }
    }
    let mean = sum / 9.0;
    ((sum_sq / 9.0) - mean * mean).max(0.0) as f32
}

/// 8-bin gradient direction and magnitude histograms over strong-gradient
/// interior pixels, `[direction | magnitude]`.
pub fn edge_features(image: &RgbaImage) -> [f32; EDGE_FEATURES] {
    let mut features = [0.0f32; EDGE_FEATURES];
    let (width, height) = image.dimensions();
    if width < 3 || height < 3 {
        return features;
    }

    let mut directions = [0u32; 8];
    let mut magnitudes = [0u32; 8];

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let gx = (gray_at(image, x + 1, y) - gray_at(image, x - 1, y)) as f32;
            let gy = (gray_at(image, x, y + 1) - gray_at(image, x, y - 1)) as f32;
            let magnitude = (gx * gx + gy * gy).sqrt();
            if magnitude <= EDGE_MAGNITUDE_THRESHOLD {
                continue;
            }
            let direction = gy.atan2(gx);
            let dir_index = (((direction + PI) / (2.0 * PI) * 8.0) as usize) % 8;
            directions[dir_index] += 1;
            magnitudes[(magnitude as usize / 50) % 8] += 1;
        }
    }

    let total = ((width - 2) as usize * (height - 2) as usize) as f32;
    for i in 0..8 {
        features[i] = directions[i] as f32 / total;
        features[i + 8] = magnitudes[i] as f32 / total;
    }
    features
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([rgb[0], rgb[1], rgb[2], 255]))
    }

    #[test]
    fn test_color_features_sum_per_channel() {
        let image = solid(10, 10, [200, 40, 100]);
        let features = color_features(&image);
        // Each channel histogram sums to one.
        for block in 0..4 {
            let sum: f32 = features[block * 16..(block + 1) * 16].iter().sum();
            assert!((sum - 1.0).abs() < 1e-5, "block {block} sums to {sum}");
        }
        // 200/16 = 12, so the red histogram is concentrated in bin 12.
        assert!((features[12] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_texture_features_uniform_image() {
        let features = texture_features(&solid(20, 20, [128, 128, 128]));
        // No neighbor exceeds the center, all gradient/variance/contrast
        // mass lands in bin zero.
        assert!(features[..8].iter().all(|&v| v == 0.0));
        assert!((features[8] - 1.0).abs() < 1e-5);
        assert!((features[16] - 1.0).abs() < 1e-5);
        assert!((features[24] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_edge_features_zero_on_uniform_image() {
        let features = edge_features(&solid(20, 20, [128, 128, 128]));
        assert!(features.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_edge_features_respond_to_step_edge() {
        let mut image = solid(20, 20, [255, 255, 255]);
        for y in 0..20 {
            for x in 10..20 {
                image.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
        let features = edge_features(&image);
        assert!(features.iter().any(|&v| v > 0.0));
    }

    #[test]
    fn test_tiny_image_yields_zero_blocks() {
        let image = solid(2, 2, [1, 2, 3]);
        assert!(texture_features(&image).iter().all(|&v| v == 0.0));
        assert!(edge_features(&image).iter().all(|&v| v == 0.0));
    }
}
