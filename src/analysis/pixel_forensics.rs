use image::{DynamicImage, GrayImage, Luma};
use log::debug;
use rand::{SeedableRng, distributions::Distribution, rngs::StdRng};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use statrs::distribution::Normal;
use statrs::statistics::Statistics;

use crate::{
    CloneMatch, ForensicsReport, MetricBreakdown, Region,
    config::{AnalysisConfig, FusionConfig},
    error::{KycError, Result},
    image_utils::{IntegralImage, absdiff_gray, gray_to_array, mean_ssim, recompress_jpeg_gray,
        rgb_to_gray, sobel_magnitude},
    verdict::Verdict,
};

const FAIL_THRESHOLD: f64 = 1.0;
const FLAG_THRESHOLD: f64 = 0.5;

/// Pixel-level manipulation detector: four independent sub-metrics over the
/// grayscale image, fused into one anomaly score.
pub struct PixelForensicsAnalyzer {
    config: AnalysisConfig,
}

impl PixelForensicsAnalyzer {
    pub fn new() -> Self {
        Self {
            config: AnalysisConfig::default(),
        }
    }

    pub fn with_config(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, image: &DynamicImage) -> Result<ForensicsReport> {
        let gray = rgb_to_gray(&image.to_rgb8());

        let edge_strength = edge_strength(&gray);
        let noise_level = noise_level(&gray, self.config.noise_sigma, self.config.noise_seed)?;
        let (cloning_score, clone_match) = cloning_scan(&gray, self.config.block_size);
        let artifact_score = artifact_score(&gray, self.config.artifact_quality)?;

        let details = MetricBreakdown {
            edge_strength,
            noise_level,
            cloning_score,
            artifact_score,
        };

        let score = fuse(&self.config.fusion, &details);
        let (status, message) = classify(score);

        debug!(
            "pixel forensics score={:.4} edge={:.2} noise={:.2} clone={:.2} artifact={:.2}",
            score, edge_strength, noise_level, cloning_score, artifact_score
        );

        Ok(ForensicsReport {
            status,
            score,
            details,
            message: message.to_string(),
            clone_match,
        })
    }
}

impl Default for PixelForensicsAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Mean Sobel gradient magnitude. Splice boundaries show up as unnaturally
/// strong edges.
pub(crate) fn edge_strength(gray: &GrayImage) -> f64 {
    let magnitude = sobel_magnitude(gray);
    let n = magnitude.len();
    if n == 0 {
        0.0
    } else {
        magnitude.sum() / n as f64
    }
}

/// Synthesizes an additive-Gaussian-noise copy of the image and measures the
/// mean absolute divergence from it, a proxy for the image's own noise floor.
/// The draw is seeded so the metric is reproducible for fixed configuration.
pub(crate) fn noise_difference_map(gray: &GrayImage, sigma: f64, seed: u64) -> Result<GrayImage> {
    let normal =
        Normal::new(0.0, sigma).map_err(|e| KycError::InvalidParameter(e.to_string()))?;
    let mut rng = StdRng::seed_from_u64(seed);

    let (width, height) = gray.dimensions();
    let mut noisy = GrayImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let v = gray.get_pixel(x, y)[0] as f64 / 255.0;
            let drawn = ((v + normal.sample(&mut rng)).clamp(0.0, 1.0) * 255.0) as u8;
            noisy.put_pixel(x, y, Luma([drawn]));
        }
    }

    Ok(absdiff_gray(gray, &noisy))
}

pub(crate) fn noise_level(gray: &GrayImage, sigma: f64, seed: u64) -> Result<f64> {
    let diff = noise_difference_map(gray, sigma, seed)?;
    Ok(diff.pixels().map(|p| p[0] as f64).mean())
}

/// Block-matching scan for copy-paste tampering. The image is partitioned
/// into non-overlapping blocks (partial trailing blocks skipped) and each
/// block is correlated against every sliding window in the image except its
/// own origin; the score is the best match found anywhere.
///
/// Known limitation carried over from the calibration of the thresholds:
/// only the origin cell is excluded from self-matching, not the overlapping
/// neighborhood, so strongly self-similar textures can score high.
pub(crate) fn cloning_scan(gray: &GrayImage, block_size: u32) -> (f64, Option<CloneMatch>) {
    let (width, height) = gray.dimensions();
    if width < block_size || height < block_size {
        return (0.0, None);
    }

    let arr = gray_to_array(gray);
    let integral = IntegralImage::new(&arr);
    let n = block_size as usize;

    let mut origins = Vec::new();
    for by in (0..=height - block_size).step_by(n) {
        for bx in (0..=width - block_size).step_by(n) {
            origins.push((bx as usize, by as usize));
        }
    }

    let best = origins
        .par_iter()
        .filter_map(|&(bx, by)| best_match_for_block(&arr, &integral, bx, by, n))
        .max_by(|a, b| a.similarity.total_cmp(&b.similarity));

    match best {
        Some(m) => (m.similarity, Some(m)),
        None => (0.0, None),
    }
}

fn best_match_for_block(
    arr: &ndarray::Array2<f64>,
    integral: &IntegralImage,
    bx: usize,
    by: usize,
    n: usize,
) -> Option<CloneMatch> {
    let (height, width) = arr.dim();
    let count = (n * n) as f64;

    let mut block = Vec::with_capacity(n * n);
    for dy in 0..n {
        for dx in 0..n {
            block.push(arr[[by + dy, bx + dx]]);
        }
    }
    let mean = block.iter().sum::<f64>() / count;
    for v in &mut block {
        *v -= mean;
    }
    let norm = block.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm < 1e-10 {
        // Flat block: zero variance, correlation undefined.
        return None;
    }

    let mut best_similarity = f64::NEG_INFINITY;
    let mut best_pos = None;

    for py in 0..=height - n {
        for px in 0..=width - n {
            if px == bx && py == by {
                continue;
            }

            let sum = integral.window_sum(px, py, n, n);
            let sum_sq = integral.window_sum_sq(px, py, n, n);
            let var_term = sum_sq - sum * sum / count;
            if var_term < 1e-10 {
                continue;
            }

            // The block is zero-meaned, so the plain dot product equals the
            // zero-mean cross term.
            let mut dot = 0.0;
            for dy in 0..n {
                for dx in 0..n {
                    dot += block[dy * n + dx] * arr[[py + dy, px + dx]];
                }
            }

            let similarity = dot / (norm * var_term.sqrt());
            if similarity > best_similarity {
                best_similarity = similarity;
                best_pos = Some((px, py));
            }
        }
    }

    best_pos.map(|(px, py)| CloneMatch {
        source: Region {
            x: bx as u32,
            y: by as u32,
            width: n as u32,
            height: n as u32,
        },
        target: Region {
            x: px as u32,
            y: py as u32,
            width: n as u32,
            height: n as u32,
        },
        similarity: best_similarity,
    })
}

/// Sensitivity to a further aggressive compression pass: 1 - SSIM between
/// the image and its quality-50 round trip.
pub(crate) fn artifact_score(gray: &GrayImage, quality: u8) -> Result<f64> {
    let decoded = recompress_jpeg_gray(gray, quality)?;
    Ok(1.0 - mean_ssim(gray, &decoded))
}

pub(crate) fn artifact_difference_map(gray: &GrayImage, quality: u8) -> Result<GrayImage> {
    let decoded = recompress_jpeg_gray(gray, quality)?;
    Ok(absdiff_gray(gray, &decoded))
}

/// Weighted excess-over-threshold fusion: only the amount by which a metric
/// exceeds its threshold contributes.
pub(crate) fn fuse(fusion: &FusionConfig, details: &MetricBreakdown) -> f64 {
    fusion.clone_weight * (details.cloning_score - fusion.clone_threshold).max(0.0)
        + fusion.noise_weight * (details.noise_level - fusion.noise_threshold).max(0.0)
        + fusion.edge_weight * (details.edge_strength - fusion.edge_threshold).max(0.0)
        + fusion.artifact_weight * (details.artifact_score - fusion.artifact_threshold).max(0.0)
}

fn classify(score: f64) -> (Verdict, &'static str) {
    if score >= FAIL_THRESHOLD {
        (
            Verdict::Fail,
            "Image failed the pixel level check due to high manipulation metrics.",
        )
    } else if score >= FLAG_THRESHOLD {
        (
            Verdict::FlagForReview,
            "Image flagged for further review; please check for possible manipulations.",
        )
    } else {
        (
            Verdict::Success,
            "Image successfully passed the pixel level check.",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn textured_gray(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            Luma([(((x as u64).wrapping_mul(2654435761) ^ (y as u64).wrapping_mul(40503)) >> 3)
                as u8])
        })
    }

    #[test]
    fn classify_threshold_boundaries() {
        assert_eq!(classify(0.49).0, Verdict::Success);
        assert_eq!(classify(0.5).0, Verdict::FlagForReview);
        assert_eq!(classify(0.99).0, Verdict::FlagForReview);
        assert_eq!(classify(1.0).0, Verdict::Fail);
    }

    #[test]
    fn fusion_sums_weighted_excesses() {
        let fusion = FusionConfig::default();
        let details = MetricBreakdown {
            edge_strength: 40.0,
            noise_level: 30.0,
            cloning_score: 1.0,
            artifact_score: 0.2,
        };

        // 0.2*5 + 0.3*5 + 0.4*0.1 + 0.1*0.1
        let expected = 1.0 + 1.5 + 0.04 + 0.01;
        assert!((fuse(&fusion, &details) - expected).abs() < 1e-12);
    }

    #[test]
    fn metrics_below_thresholds_contribute_nothing() {
        let fusion = FusionConfig::default();
        let details = MetricBreakdown {
            edge_strength: 35.0,
            noise_level: 25.0,
            cloning_score: 0.90,
            artifact_score: 0.10,
        };
        assert_eq!(fuse(&fusion, &details), 0.0);
    }

    #[test]
    fn flat_image_metrics() {
        let flat = GrayImage::from_pixel(64, 64, Luma([128]));

        assert_eq!(edge_strength(&flat), 0.0);
        assert!(artifact_score(&flat, 50).unwrap() < 0.1);

        let (clone_score, clone_match) = cloning_scan(&flat, 50);
        assert_eq!(clone_score, 0.0);
        assert!(clone_match.is_none());
    }

    #[test]
    fn noise_metric_is_seeded_and_reproducible() {
        let img = textured_gray(48, 48);
        let a = noise_level(&img, 0.1, 0).unwrap();
        let b = noise_level(&img, 0.1, 0).unwrap();
        assert_eq!(a, b);
        assert!(a >= 0.0);
    }

    #[test]
    fn duplicated_block_is_detected() {
        let mut img = textured_gray(100, 100);

        // Paste the top-left 50x50 block over the block at (50, 50).
        for y in 0..50 {
            for x in 0..50 {
                let p = *img.get_pixel(x, y);
                img.put_pixel(x + 50, y + 50, p);
            }
        }

        let (score, clone_match) = cloning_scan(&img, 50);
        assert!(score > 0.99, "cloning score was {score}");

        let m = clone_match.unwrap();
        let pair = ((m.source.x, m.source.y), (m.target.x, m.target.y));
        assert!(
            pair == ((0, 0), (50, 50)) || pair == ((50, 50), (0, 0)),
            "unexpected match pair {pair:?}"
        );
    }

    #[test]
    fn pasted_patch_flags_the_document() {
        let mut img = textured_gray(100, 100);
        for y in 0..50 {
            for x in 0..50 {
                let p = *img.get_pixel(x, y);
                img.put_pixel(x + 50, y + 50, p);
            }
        }

        let report = PixelForensicsAnalyzer::new()
            .analyze(&DynamicImage::ImageLuma8(img))
            .unwrap();

        assert!(report.details.cloning_score > 0.95);
        assert_ne!(report.status, Verdict::Success);

        // The aggregate reflects at least the clone metric's excess.
        let fusion = FusionConfig::default();
        let clone_excess =
            fusion.clone_weight * (report.details.cloning_score - fusion.clone_threshold);
        assert!(report.score >= clone_excess - 1e-9);
    }

    #[test]
    fn decorrelated_texture_has_low_cloning_score() {
        let img = textured_gray(100, 100);
        let (score, _) = cloning_scan(&img, 50);
        assert!(score < 0.5, "cloning score was {score}");
    }

    #[test]
    fn analysis_is_deterministic() {
        let img = DynamicImage::ImageLuma8(textured_gray(60, 60));
        let analyzer = PixelForensicsAnalyzer::new();

        let a = analyzer.analyze(&img).unwrap();
        let b = analyzer.analyze(&img).unwrap();

        assert_eq!(a.score, b.score);
        assert_eq!(a.details.edge_strength, b.details.edge_strength);
        assert_eq!(a.details.noise_level, b.details.noise_level);
        assert_eq!(a.details.cloning_score, b.details.cloning_score);
        assert_eq!(a.details.artifact_score, b.details.artifact_score);
    }
}
