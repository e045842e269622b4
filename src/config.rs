use std::path::{Path, PathBuf};

use crate::error::Result;

/// Tuning knobs for the local analyzers. The fusion constants are hand-tuned
/// values carried over unchanged; they are configuration, not invariants.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub ela_quality: u8,
    pub artifact_quality: u8,
    pub block_size: u32,
    /// Standard deviation of the synthetic noise model, in unit range.
    pub noise_sigma: f64,
    /// Seed for the noise draw. Fixed so repeated runs are bit-identical.
    pub noise_seed: u64,
    pub fusion: FusionConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            ela_quality: 90,
            artifact_quality: 50,
            block_size: 50,
            noise_sigma: 0.1,
            noise_seed: 0,
            fusion: FusionConfig::default(),
        }
    }
}

/// Per-metric thresholds and weights for the excess-over-threshold fusion.
#[derive(Debug, Clone)]
pub struct FusionConfig {
    pub clone_threshold: f64,
    pub noise_threshold: f64,
    pub edge_threshold: f64,
    pub artifact_threshold: f64,
    pub clone_weight: f64,
    pub noise_weight: f64,
    pub edge_weight: f64,
    pub artifact_weight: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            clone_threshold: 0.90,
            noise_threshold: 25.0,
            edge_threshold: 35.0,
            artifact_threshold: 0.10,
            clone_weight: 0.4,
            noise_weight: 0.3,
            edge_weight: 0.2,
            artifact_weight: 0.1,
        }
    }
}

/// Layout of the diagnostic artifact directory. Artifacts are advisory and
/// never read back by the analyzers.
#[derive(Debug, Clone)]
pub struct OutputDirs {
    root: PathBuf,
}

impl OutputDirs {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn analysis_dir(&self) -> PathBuf {
        self.root.join("analysis")
    }

    pub fn analysis_path(&self, filename: &str) -> PathBuf {
        self.analysis_dir().join(filename)
    }

    pub fn ensure(&self) -> Result<()> {
        std::fs::create_dir_all(self.analysis_dir())?;
        Ok(())
    }
}

impl Default for OutputDirs {
    fn default() -> Self {
        Self::new("output")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_fusion_constants() {
        let fusion = FusionConfig::default();
        assert_eq!(fusion.clone_threshold, 0.90);
        assert_eq!(fusion.noise_threshold, 25.0);
        assert_eq!(fusion.edge_threshold, 35.0);
        assert_eq!(fusion.artifact_threshold, 0.10);
        let weight_sum = fusion.clone_weight
            + fusion.noise_weight
            + fusion.edge_weight
            + fusion.artifact_weight;
        assert!((weight_sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn output_paths_nest_under_analysis() {
        let dirs = OutputDirs::new("out");
        assert_eq!(
            dirs.analysis_path("ela_result.jpg"),
            PathBuf::from("out/analysis/ela_result.jpg")
        );
    }

    #[test]
    fn ensure_creates_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = OutputDirs::new(tmp.path().join("output"));
        dirs.ensure().unwrap();
        assert!(dirs.analysis_dir().is_dir());
    }
}
