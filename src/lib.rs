use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use image::{DynamicImage, RgbImage};
use serde::Serialize;

use crate::{
    analysis::{ela::ElaAnalyzer, pixel_forensics::PixelForensicsAnalyzer},
    error::{KycError, Result},
    metadata::exif::ExifExtractor,
};

pub mod analysis;
pub mod config;
pub mod error;
pub mod image_utils;
pub mod metadata;
pub mod oracle;
pub mod pipeline;
pub mod report;
pub mod verdict;

pub use config::{AnalysisConfig, FusionConfig, OutputDirs};
pub use verdict::{Decision, Verdict};

/// Facade over the local analyzers: loads the document image once and runs
/// each analysis against the same read-only raster.
#[derive(Debug)]
pub struct DocumentAnalyzer {
    original: DynamicImage,
    config: AnalysisConfig,
    path: Option<String>,
}

impl DocumentAnalyzer {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let original = image::open(&path)?;

        Ok(Self {
            original,
            config: AnalysisConfig::default(),
            path: Some(path_str),
        })
    }

    pub fn from_image(image: DynamicImage) -> Self {
        Self {
            original: image,
            config: AnalysisConfig::default(),
            path: None,
        }
    }

    pub fn with_config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    pub fn ela(&self) -> Result<ElaReport> {
        self.ela_at(self.config.ela_quality)
    }

    pub fn ela_at(&self, quality: u8) -> Result<ElaReport> {
        ElaAnalyzer::new(quality).analyze(&self.original)
    }

    pub fn pixel_forensics(&self) -> Result<ForensicsReport> {
        PixelForensicsAnalyzer::with_config(self.config.clone()).analyze(&self.original)
    }

    pub fn extract_metadata(&self) -> Result<MetadataSummary> {
        match self.path {
            Some(ref path) => ExifExtractor::extract(path),
            None => Err(KycError::Metadata(
                "no file path available for metadata extraction".into(),
            )),
        }
    }
}

/// Outcome of one ELA pass. `difference` is the rescaled visualization;
/// writing it is optional and never changes the verdict fields.
#[derive(Debug, Clone)]
pub struct ElaReport {
    pub status: Verdict,
    pub message: String,
    pub error_level: f64,
    pub output_path: Option<PathBuf>,
    pub difference: RgbImage,
    pub recompressed: RgbImage,
}

impl ElaReport {
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.difference.save(&path)?;
        self.output_path = Some(path.as_ref().to_path_buf());
        Ok(())
    }
}

/// Outcome of one pixel forensics pass.
#[derive(Debug, Clone)]
pub struct ForensicsReport {
    pub status: Verdict,
    pub score: f64,
    pub details: MetricBreakdown,
    pub message: String,
    pub clone_match: Option<CloneMatch>,
}

#[derive(Debug, Clone, Copy)]
pub struct MetricBreakdown {
    pub edge_strength: f64,
    pub noise_level: f64,
    pub cloning_score: f64,
    pub artifact_score: f64,
}

/// Best block correspondence found by the cloning scan.
#[derive(Debug, Clone, Copy)]
pub struct CloneMatch {
    pub source: Region,
    pub target: Region,
    pub similarity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// EXIF fields relevant to tampering review, plus the full tag map that is
/// forwarded to the oracle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetadataSummary {
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub software: Option<String>,
    pub date_time: Option<String>,
    pub date_time_original: Option<String>,
    pub gps_coordinates: Option<(f64, f64)>,
    pub all_tags: BTreeMap<String, String>,
    pub suspicious_indicators: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn unreadable_path_is_an_input_error() {
        let err = DocumentAnalyzer::new("/nonexistent/document.jpg").unwrap_err();
        assert!(matches!(err, KycError::ImageLoad(_)));
    }

    #[test]
    fn in_memory_image_runs_both_analyzers() {
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(64, 64, Luma([90])));
        let analyzer = DocumentAnalyzer::from_image(image);

        let ela = analyzer.ela().unwrap();
        assert!(ela.error_level >= 0.0);

        let forensics = analyzer.pixel_forensics().unwrap();
        assert!(forensics.score >= 0.0);
    }

    #[test]
    fn metadata_requires_a_path() {
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([0])));
        let analyzer = DocumentAnalyzer::from_image(image);
        assert!(matches!(
            analyzer.extract_metadata(),
            Err(KycError::Metadata(_))
        ));
    }

    #[test]
    fn saving_the_ela_artifact_records_the_path() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("ela_result.jpg");

        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(32, 32, Luma([90])));
        let mut report = DocumentAnalyzer::from_image(image).ela().unwrap();

        report.save(&target).unwrap();
        assert!(target.is_file());
        assert_eq!(report.output_path.as_deref(), Some(target.as_path()));
    }
}
