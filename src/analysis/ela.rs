use image::{DynamicImage, Rgb, RgbImage};
use log::debug;
use ndarray::Array2;

use crate::{
    ElaReport,
    error::{KycError, Result},
    image_utils::recompress_jpeg,
    verdict::Verdict,
};

pub const DEFAULT_QUALITY: u8 = 90;

const FLAG_THRESHOLD: f64 = 50.0;
const FAIL_THRESHOLD: f64 = 150.0;

/// Error Level Analysis: a second compression pass at a known quality leaves
/// stronger residuals in regions that were not part of the image's original
/// compression history.
pub struct ElaAnalyzer {
    quality: u8,
}

impl ElaAnalyzer {
    pub fn new(quality: u8) -> Self {
        Self { quality }
    }

    pub fn analyze(&self, image: &DynamicImage) -> Result<ElaReport> {
        if self.quality == 0 || self.quality > 100 {
            return Err(KycError::InvalidParameter(format!(
                "ELA quality must be in 1..=100, got {}",
                self.quality
            )));
        }

        let original = image.to_rgb8();
        let (width, height) = original.dimensions();

        let recompressed =
            recompress_jpeg(&DynamicImage::ImageRgb8(original.clone()), self.quality)?.to_rgb8();

        let mut channel_diff = RgbImage::new(width, height);
        let mut max_map = Array2::<f64>::zeros((height as usize, width as usize));

        for y in 0..height {
            for x in 0..width {
                let orig = original.get_pixel(x, y);
                let recomp = recompressed.get_pixel(x, y);

                let dr = (orig[0] as i16 - recomp[0] as i16).unsigned_abs() as u8;
                let dg = (orig[1] as i16 - recomp[1] as i16).unsigned_abs() as u8;
                let db = (orig[2] as i16 - recomp[2] as i16).unsigned_abs() as u8;

                channel_diff.put_pixel(x, y, Rgb([dr, dg, db]));
                max_map[[y as usize, x as usize]] = dr.max(dg).max(db) as f64;
            }
        }

        let error_level = max_map.fold(0.0f64, |acc, &v| acc.max(v));

        let scale = amplification_scale(error_level);
        let mut difference = RgbImage::new(width, height);
        for (x, y, pixel) in channel_diff.enumerate_pixels() {
            difference.put_pixel(
                x,
                y,
                Rgb([
                    (pixel[0] as f64 * scale).min(255.0) as u8,
                    (pixel[1] as f64 * scale).min(255.0) as u8,
                    (pixel[2] as f64 * scale).min(255.0) as u8,
                ]),
            );
        }

        let (status, message) = classify(error_level);
        debug!(
            "ela quality={} error_level={:.2} status={}",
            self.quality,
            error_level,
            status.as_str()
        );

        Ok(ElaReport {
            status,
            message: message.to_string(),
            error_level,
            output_path: None,
            difference,
            recompressed,
        })
    }
}

impl Default for ElaAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_QUALITY)
    }
}

/// Factor that maps the maximum difference to full brightness. A uniformly
/// zero difference keeps scale 1 rather than dividing by zero.
pub(crate) fn amplification_scale(max_diff: f64) -> f64 {
    if max_diff > 0.0 { 255.0 / max_diff } else { 1.0 }
}

fn classify(error_level: f64) -> (Verdict, &'static str) {
    if error_level < FLAG_THRESHOLD {
        (Verdict::Success, "No significant manipulation detected.")
    } else if error_level < FAIL_THRESHOLD {
        (
            Verdict::FlagForReview,
            "Possible minor modifications. Requires further verification.",
        )
    } else {
        (Verdict::Fail, "High probability of manipulation detected!")
    }
}
