use std::io::Cursor;

use image::{DynamicImage, GrayImage, Luma, RgbImage};
use ndarray::Array2;

use crate::error::Result;

pub fn rgb_to_gray(image: &RgbImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut gray = GrayImage::new(width, height);

    for (x, y, pixel) in image.enumerate_pixels() {
        let lum =
            (0.299 * pixel[0] as f64 + 0.587 * pixel[1] as f64 + 0.114 * pixel[2] as f64) as u8;
        gray.put_pixel(x, y, Luma([lum]));
    }

    gray
}

pub fn gray_to_array(image: &GrayImage) -> Array2<f64> {
    let (width, height) = image.dimensions();
    let mut arr = Array2::zeros((height as usize, width as usize));

    for (x, y, pixel) in image.enumerate_pixels() {
        arr[[y as usize, x as usize]] = pixel[0] as f64;
    }

    arr
}

pub fn array_to_gray(arr: &Array2<f64>) -> GrayImage {
    let (height, width) = arr.dim();
    let mut image = GrayImage::new(width as u32, height as u32);

    for y in 0..height {
        for x in 0..width {
            let value = arr[[y, x]].clamp(0.0, 255.0) as u8;
            image.put_pixel(x as u32, y as u32, Luma([value]));
        }
    }

    image
}

pub fn normalize_to_u8(arr: &Array2<f64>) -> Array2<f64> {
    let min = arr.fold(f64::INFINITY, |acc, &v| acc.min(v));
    let max = arr.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
    let range = max - min;

    if range < 1e-10 {
        Array2::zeros(arr.dim())
    } else {
        arr.mapv(|v| ((v - min) / range) * 255.0)
    }
}

/// Runs a full lossy round trip: encode as JPEG at `quality`, decode back.
/// The decoded result carries the quantization artifacts a second save at
/// that quality would introduce.
pub fn recompress_jpeg(image: &DynamicImage, quality: u8) -> Result<DynamicImage> {
    let mut buffer = Cursor::new(Vec::new());

    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
    image.write_with_encoder(encoder)?;

    buffer.set_position(0);
    let recompressed = image::load_from_memory(&buffer.into_inner())?;

    Ok(recompressed)
}

pub fn recompress_jpeg_gray(gray: &GrayImage, quality: u8) -> Result<GrayImage> {
    let dynamic = DynamicImage::ImageLuma8(gray.clone());
    Ok(recompress_jpeg(&dynamic, quality)?.to_luma8())
}

/// Gradient magnitude map from 3x3 Sobel kernels in both axes.
pub fn sobel_magnitude(gray: &GrayImage) -> Array2<f64> {
    let gx = imageproc::gradients::horizontal_sobel(gray);
    let gy = imageproc::gradients::vertical_sobel(gray);

    let (width, height) = gray.dimensions();
    let mut magnitude = Array2::zeros((height as usize, width as usize));

    for y in 0..height {
        for x in 0..width {
            let dx = gx.get_pixel(x, y)[0] as f64;
            let dy = gy.get_pixel(x, y)[0] as f64;
            magnitude[[y as usize, x as usize]] = dx.hypot(dy);
        }
    }

    magnitude
}

pub fn absdiff_gray(a: &GrayImage, b: &GrayImage) -> GrayImage {
    let (width, height) = a.dimensions();
    let mut diff = GrayImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let d = (a.get_pixel(x, y)[0] as i16 - b.get_pixel(x, y)[0] as i16).unsigned_abs();
            diff.put_pixel(x, y, Luma([d as u8]));
        }
    }

    diff
}

/// Summed-area tables over a grayscale array, for O(1) window sums in the
/// cloning scan.
pub struct IntegralImage {
    sum: Array2<f64>,
    sum_sq: Array2<f64>,
}

impl IntegralImage {
    pub fn new(arr: &Array2<f64>) -> Self {
        let (height, width) = arr.dim();
        let mut sum = Array2::zeros((height + 1, width + 1));
        let mut sum_sq = Array2::zeros((height + 1, width + 1));

        for y in 0..height {
            for x in 0..width {
                let v = arr[[y, x]];
                sum[[y + 1, x + 1]] = v + sum[[y, x + 1]] + sum[[y + 1, x]] - sum[[y, x]];
                sum_sq[[y + 1, x + 1]] =
                    v * v + sum_sq[[y, x + 1]] + sum_sq[[y + 1, x]] - sum_sq[[y, x]];
            }
        }

        Self { sum, sum_sq }
    }

    pub fn window_sum(&self, x: usize, y: usize, w: usize, h: usize) -> f64 {
        Self::window(&self.sum, x, y, w, h)
    }

    pub fn window_sum_sq(&self, x: usize, y: usize, w: usize, h: usize) -> f64 {
        Self::window(&self.sum_sq, x, y, w, h)
    }

    fn window(table: &Array2<f64>, x: usize, y: usize, w: usize, h: usize) -> f64 {
        table[[y + h, x + w]] - table[[y, x + w]] - table[[y + h, x]] + table[[y, x]]
    }
}

const SSIM_WINDOW: u32 = 7;
const SSIM_C1: f64 = (0.01 * 255.0) * (0.01 * 255.0);
const SSIM_C2: f64 = (0.03 * 255.0) * (0.03 * 255.0);

/// Mean structural similarity over sliding 7x7 uniform windows. Images
/// smaller than one window are compared as a single global window.
pub fn mean_ssim(a: &GrayImage, b: &GrayImage) -> f64 {
    let (width, height) = a.dimensions();

    if width < SSIM_WINDOW || height < SSIM_WINDOW {
        return ssim_window(a, b, 0, 0, width, height);
    }

    let mut total = 0.0;
    let mut count = 0u64;

    for y in 0..=(height - SSIM_WINDOW) {
        for x in 0..=(width - SSIM_WINDOW) {
            total += ssim_window(a, b, x, y, SSIM_WINDOW, SSIM_WINDOW);
            count += 1;
        }
    }

    total / count as f64
}

fn ssim_window(a: &GrayImage, b: &GrayImage, x0: u32, y0: u32, w: u32, h: u32) -> f64 {
    let n = (w * h) as f64;
    let mut sum_a = 0.0;
    let mut sum_b = 0.0;
    let mut sum_aa = 0.0;
    let mut sum_bb = 0.0;
    let mut sum_ab = 0.0;

    for y in y0..y0 + h {
        for x in x0..x0 + w {
            let va = a.get_pixel(x, y)[0] as f64;
            let vb = b.get_pixel(x, y)[0] as f64;
            sum_a += va;
            sum_b += vb;
            sum_aa += va * va;
            sum_bb += vb * vb;
            sum_ab += va * vb;
        }
    }

    let mean_a = sum_a / n;
    let mean_b = sum_b / n;
    let var_a = sum_aa / n - mean_a * mean_a;
    let var_b = sum_bb / n - mean_b * mean_b;
    let cov = sum_ab / n - mean_a * mean_b;

    let numerator = (2.0 * mean_a * mean_b + SSIM_C1) * (2.0 * cov + SSIM_C2);
    let denominator = (mean_a * mean_a + mean_b * mean_b + SSIM_C1) * (var_a + var_b + SSIM_C2);

    numerator / denominator
}
