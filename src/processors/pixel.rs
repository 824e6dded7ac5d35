//! Low-level pixel analysis shared by the detection strategies.
//!
//! Everything here operates on plain `image` buffers: grayscale conversion,
//! Sobel magnitude, local variance, boolean masks with connected-component
//! labeling, and the per-region statistics the heuristic filters need.

use image::imageops::{self, FilterType};
use image::{GrayImage, ImageBuffer, Luma, RgbaImage};
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

use super::geometry::Rect;
use crate::core::inference::Tensor4D;

/// Per-pixel Sobel magnitude map.
pub type MagnitudeMap = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Converts to grayscale as the unweighted channel mean `(r + g + b) / 3`.
///
/// The alpha channel is ignored; detection treats transparent pixels like
/// any other.
pub fn grayscale(image: &RgbaImage) -> GrayImage {
    let mut gray = GrayImage::new(image.width(), image.height());
    for (src, dst) in image.pixels().zip(gray.pixels_mut()) {
        let [r, g, b, _] = src.0;
        dst.0 = [((u16::from(r) + u16::from(g) + u16::from(b)) / 3) as u8];
    }
    gray
}

/// Computes the per-pixel Sobel gradient magnitude `sqrt(gx^2 + gy^2)`,
/// saturated to `u16`.
pub fn sobel_magnitude(gray: &GrayImage) -> MagnitudeMap {
    let gx = horizontal_sobel(gray);
    let gy = vertical_sobel(gray);
    let mut magnitude = MagnitudeMap::new(gray.width(), gray.height());
    for ((px, py), out) in gx.pixels().zip(gy.pixels()).zip(magnitude.pixels_mut()) {
        let dx = f64::from(px.0[0]);
        let dy = f64::from(py.0[0]);
        out.0 = [(dx * dx + dy * dy).sqrt().min(f64::from(u16::MAX)) as u16];
    }
    magnitude
}

/// Per-pixel local variance of grayscale intensity over a square window.
///
/// Pixels whose window falls partly outside the image use only the in-bounds
/// samples.
pub fn local_variance_map(gray: &GrayImage, window: u32) -> Vec<f32> {
    let width = gray.width() as i64;
    let height = gray.height() as i64;
    let half = i64::from(window / 2);
    let mut map = vec![0.0f32; (width * height) as usize];

    for cy in 0..height {
        for cx in 0..width {
            let mut sum = 0.0f64;
            let mut sum_sq = 0.0f64;
            let mut count = 0u32;
            for y in (cy - half)..=(cy + half) {
                for x in (cx - half)..=(cx + half) {
                    if x >= 0 && x < width && y >= 0 && y < height {
                        let v = f64::from(gray.get_pixel(x as u32, y as u32).0[0]);
                        sum += v;
                        sum_sq += v * v;
                        count += 1;
                    }
                }
            }
            if count > 0 {
                let mean = sum / f64::from(count);
                let variance = (sum_sq / f64::from(count) - mean * mean).max(0.0);
                map[(cy * width + cx) as usize] = variance as f32;
            }
        }
    }
    map
}

/// A boolean per-pixel mask.
pub struct BoolMask {
    width: u32,
    height: u32,
    data: Vec<bool>,
}

impl BoolMask {
    /// Builds a mask by evaluating `f` at every pixel coordinate.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut data = Vec::with_capacity((width as usize) * (height as usize));
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Mask width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Mask height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Value at `(x, y)`; out-of-bounds reads are `false`.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.data[(y as usize) * (self.width as usize) + (x as usize)]
    }

    /// Fraction of set pixels inside `rect` (clipped to the mask).
    pub fn density_in(&self, rect: &Rect) -> f32 {
        let mut set = 0u64;
        let mut total = 0u64;
        let right = rect.right().min(u64::from(self.width)) as u32;
        let bottom = rect.bottom().min(u64::from(self.height)) as u32;
        for y in rect.y..bottom {
            for x in rect.x..right {
                total += 1;
                if self.get(x, y) {
                    set += 1;
                }
            }
        }
        if total == 0 { 0.0 } else { set as f32 / total as f32 }
    }
}

/// Finds bounding boxes of 4-connected components of set pixels.
///
/// `scan_step` controls how densely seed pixels are probed; the flood fill
/// itself always walks individual pixels. Components whose bounding box
/// spans at most `min_component_side` pixels in either direction are
/// discarded as noise.
pub fn connected_component_boxes(
    mask: &BoolMask,
    scan_step: u32,
    min_component_side: u32,
) -> Vec<Rect> {
    let width = mask.width();
    let height = mask.height();
    let mut visited = vec![false; (width as usize) * (height as usize)];
    let idx = |x: u32, y: u32| (y as usize) * (width as usize) + (x as usize);
    let step = scan_step.max(1);
    let mut boxes = Vec::new();
    let mut stack: Vec<(u32, u32)> = Vec::new();

    for seed_y in (0..height).step_by(step as usize) {
        for seed_x in (0..width).step_by(step as usize) {
            if visited[idx(seed_x, seed_y)] || !mask.get(seed_x, seed_y) {
                continue;
            }

            let (mut min_x, mut max_x) = (seed_x, seed_x);
            let (mut min_y, mut max_y) = (seed_y, seed_y);
            stack.clear();
            stack.push((seed_x, seed_y));

            while let Some((x, y)) = stack.pop() {
                if visited[idx(x, y)] || !mask.get(x, y) {
                    continue;
                }
                visited[idx(x, y)] = true;
                min_x = min_x.min(x);
                max_x = max_x.max(x);
                min_y = min_y.min(y);
                max_y = max_y.max(y);

                if x + 1 < width {
                    stack.push((x + 1, y));
                }
                if x > 0 {
                    stack.push((x - 1, y));
                }
                if y + 1 < height {
                    stack.push((x, y + 1));
                }
                if y > 0 {
                    stack.push((x, y - 1));
                }
            }

            let span_x = max_x - min_x;
            let span_y = max_y - min_y;
            if span_x > min_component_side && span_y > min_component_side {
                boxes.push(Rect::new(min_x, min_y, span_x + 1, span_y + 1));
            }
        }
    }
    boxes
}

/// Grayscale contrast ratio `(max - min) / max` over `rect`, zero for an
/// all-black region.
pub fn contrast_ratio(gray: &GrayImage, rect: &Rect) -> f32 {
    let mut min_gray = u8::MAX;
    let mut max_gray = u8::MIN;
    let right = rect.right().min(u64::from(gray.width())) as u32;
    let bottom = rect.bottom().min(u64::from(gray.height())) as u32;
    for y in rect.y..bottom {
        for x in rect.x..right {
            let v = gray.get_pixel(x, y).0[0];
            min_gray = min_gray.min(v);
            max_gray = max_gray.max(v);
        }
    }
    if max_gray == 0 {
        return 0.0;
    }
    f32::from(max_gray - min_gray) / f32::from(max_gray)
}

/// Variance of grayscale intensity over `rect`.
pub fn region_variance(gray: &GrayImage, rect: &Rect) -> f32 {
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    let mut count = 0u64;
    let right = rect.right().min(u64::from(gray.width())) as u32;
    let bottom = rect.bottom().min(u64::from(gray.height())) as u32;
    for y in rect.y..bottom {
        for x in rect.x..right {
            let v = f64::from(gray.get_pixel(x, y).0[0]);
            sum += v;
            sum_sq += v * v;
            count += 1;
        }
    }
    if count == 0 {
        return 0.0;
    }
    let mean = sum / count as f64;
    ((sum_sq / count as f64) - mean * mean).max(0.0) as f32
}

/// Bilinear resize to an exact target size.
pub fn resize_rgba(image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    imageops::resize(image, width, height, FilterType::Triangle)
}

/// Converts an RGBA image to a `[1, 3, H, W]` f32 tensor scaled to [0, 1].
///
/// Alpha is dropped.
pub fn to_chw_tensor(image: &RgbaImage) -> Tensor4D {
    let (width, height) = (image.width() as usize, image.height() as usize);
    let mut tensor = Tensor4D::zeros((1, 3, height, width));
    for (x, y, pixel) in image.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        tensor[[0, 0, y, x]] = f32::from(pixel.0[0]) / 255.0;
        tensor[[0, 1, y, x]] = f32::from(pixel.0[1]) / 255.0;
        tensor[[0, 2, y, x]] = f32::from(pixel.0[2]) / 255.0;
    }
    tensor
}
