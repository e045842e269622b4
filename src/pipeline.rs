use std::path::Path;

use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;

use crate::{
    ElaReport, ForensicsReport,
    analysis::{ela::ElaAnalyzer, pixel_forensics::PixelForensicsAnalyzer},
    config::{AnalysisConfig, OutputDirs},
    error::Result,
    metadata::exif::ExifExtractor,
    oracle::{JudgmentOracle, fallback_error_object, prompts::PromptSet, response::OracleResponse},
    verdict::Decision,
};

/// User-submitted identity fields compared against the document by the OCR
/// oracle.
#[derive(Debug, Clone, Default)]
pub struct FormData {
    pub full_name: String,
    pub dob: String,
    pub nationality: String,
    pub id_number: String,
}

/// Outcome of one pipeline run. Each channel fails independently: an error
/// in one never blocks computing or reporting the others.
#[derive(Debug)]
pub struct PipelineReport {
    pub ocr: Result<OracleResponse>,
    pub metadata: Result<OracleResponse>,
    pub ela: Result<ElaReport>,
    pub forensics: Result<ForensicsReport>,
    pub detected_language: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DecisionReport {
    pub decision: Decision,
    pub reason: String,
}

/// Runs the four verification channels over one document image and asks the
/// oracle for the final decision.
pub struct VerificationPipeline<O: JudgmentOracle> {
    oracle: O,
    analysis: AnalysisConfig,
    output: OutputDirs,
    prompts: PromptSet,
}

impl<O: JudgmentOracle> VerificationPipeline<O> {
    pub fn new(oracle: O) -> Self {
        Self {
            oracle,
            analysis: AnalysisConfig::default(),
            output: OutputDirs::default(),
            prompts: PromptSet::default(),
        }
    }

    pub fn with_analysis_config(mut self, config: AnalysisConfig) -> Self {
        self.analysis = config;
        self
    }

    pub fn with_output_dirs(mut self, output: OutputDirs) -> Self {
        self.output = output;
        self
    }

    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn run(&self, form: &FormData, image_path: &Path) -> PipelineReport {
        info!("running verification pipeline on {}", image_path.display());

        debug!("step 1: OCR extraction");
        let ocr = self.ocr_check(form, image_path);
        let detected_language = ocr
            .as_ref()
            .ok()
            .and_then(|r| r.detected_language().map(str::to_owned));

        debug!("step 2: metadata extraction and tampering check");
        let metadata = self.metadata_check(image_path);

        debug!("step 3: error level analysis");
        let ela = self.ela_check(image_path);

        debug!("step 4: pixel-level forensics");
        let forensics = self.forensics_check(image_path);

        PipelineReport {
            ocr,
            metadata,
            ela,
            forensics,
            detected_language,
        }
    }

    /// Asks the oracle for the final accept/deny call over the aggregated
    /// channel results. A reply without a well-formed decision degrades to
    /// FlagForReview carrying the raw text.
    pub fn decide(&self, report: &PipelineReport) -> Result<DecisionReport> {
        let aggregated = crate::report::pipeline_to_value(report)?;
        let prompt = self
            .prompts
            .decision_prompt(report.detected_language.as_deref(), &aggregated.to_string());

        let raw = self.oracle.call(&prompt, None)?;

        Ok(match OracleResponse::parse(&raw) {
            OracleResponse::Json(value) => DecisionReport {
                decision: value
                    .get("decision")
                    .and_then(Value::as_str)
                    .and_then(Decision::from_str)
                    .unwrap_or(Decision::FlagForReview),
                reason: value
                    .get("reason")
                    .and_then(Value::as_str)
                    .unwrap_or("no reason given")
                    .to_string(),
            },
            OracleResponse::Text(text) => DecisionReport {
                decision: Decision::FlagForReview,
                reason: text,
            },
        })
    }

    fn ocr_check(&self, form: &FormData, image_path: &Path) -> Result<OracleResponse> {
        let prompt = self.prompts.ocr_prompt(
            &form.full_name,
            &form.dob,
            &form.nationality,
            &form.id_number,
        );
        Ok(self.oracle_response(&prompt, Some(image_path)))
    }

    fn metadata_check(&self, image_path: &Path) -> Result<OracleResponse> {
        let summary = ExifExtractor::extract(image_path)?;
        let metadata_json = serde_json::to_string_pretty(&summary)?;
        let prompt = self.prompts.tampering_prompt(&metadata_json);
        Ok(self.oracle_response(&prompt, None))
    }

    fn ela_check(&self, image_path: &Path) -> Result<ElaReport> {
        let image = image::open(image_path)?;
        let mut report = ElaAnalyzer::new(self.analysis.ela_quality).analyze(&image)?;

        // The artifact write is optional and never affects the verdict.
        let write = self
            .output
            .ensure()
            .and_then(|_| report.save(self.output.analysis_path("ela_result.jpg")));
        if let Err(e) = write {
            warn!("could not write ELA artifact: {e}");
        }

        Ok(report)
    }

    fn forensics_check(&self, image_path: &Path) -> Result<ForensicsReport> {
        let image = image::open(image_path)?;
        PixelForensicsAnalyzer::with_config(self.analysis.clone()).analyze(&image)
    }

    /// Transport exhaustion substitutes the well-formed fallback object so
    /// the channel value is always present.
    fn oracle_response(&self, prompt: &str, image: Option<&Path>) -> OracleResponse {
        match self.oracle.call(prompt, image) {
            Ok(raw) => OracleResponse::parse(&raw),
            Err(e) => {
                warn!("oracle channel degraded to fallback: {e}");
                OracleResponse::Json(fallback_error_object(&e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::KycError, verdict::Verdict};
    use image::{DynamicImage, Rgb, RgbImage};
    use serde_json::json;

    struct StubOracle {
        reply: String,
    }

    impl StubOracle {
        fn new(reply: impl Into<String>) -> Self {
            Self {
                reply: reply.into(),
            }
        }
    }

    impl JudgmentOracle for StubOracle {
        fn call(&self, _prompt: &str, _image: Option<&Path>) -> Result<String> {
            Ok(self.reply.clone())
        }
    }

    struct FailingOracle;

    impl JudgmentOracle for FailingOracle {
        fn call(&self, _prompt: &str, _image: Option<&Path>) -> Result<String> {
            Err(KycError::Oracle("endpoint unreachable".into()))
        }
    }

    fn sample_document(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("document.png");
        let img = RgbImage::from_fn(120, 80, |x, y| {
            Rgb([(40 + x / 2) as u8, (60 + y / 2) as u8, 110])
        });
        DynamicImage::ImageRgb8(img).save(&path).unwrap();
        path
    }

    fn ocr_reply() -> String {
        json!({
            "status": "success",
            "detected_language": "English",
            "message": "all fields match"
        })
        .to_string()
    }

    #[test]
    fn all_channels_complete_on_valid_document() {
        let tmp = tempfile::tempdir().unwrap();
        let doc = sample_document(tmp.path());

        let pipeline = VerificationPipeline::new(StubOracle::new(ocr_reply()))
            .with_output_dirs(OutputDirs::new(tmp.path().join("output")));
        let report = pipeline.run(&FormData::default(), &doc);

        assert!(report.ocr.is_ok());
        assert!(report.metadata.is_ok());
        assert!(report.ela.is_ok());
        assert!(report.forensics.is_ok());
        assert_eq!(report.detected_language.as_deref(), Some("English"));

        // The diagnostic artifact lands under the analysis directory.
        assert!(tmp.path().join("output/analysis/ela_result.jpg").is_file());
        let ela = report.ela.unwrap();
        assert!(ela.output_path.is_some());
        assert_eq!(ela.status, Verdict::Success);
    }

    #[test]
    fn unreadable_image_fails_local_channels_independently() {
        let pipeline = VerificationPipeline::new(StubOracle::new(ocr_reply()));
        let report = pipeline.run(&FormData::default(), Path::new("/nonexistent/id.jpg"));

        // The oracle channel still produced a value; every local channel
        // reported its own input error.
        assert!(report.ocr.is_ok());
        assert!(matches!(report.metadata, Err(KycError::Io(_))));
        assert!(matches!(report.ela, Err(KycError::ImageLoad(_))));
        assert!(matches!(report.forensics, Err(KycError::ImageLoad(_))));
    }

    #[test]
    fn transport_failure_becomes_fallback_channel_value() {
        let tmp = tempfile::tempdir().unwrap();
        let doc = sample_document(tmp.path());

        let pipeline = VerificationPipeline::new(FailingOracle)
            .with_output_dirs(OutputDirs::new(tmp.path().join("output")));
        let report = pipeline.run(&FormData::default(), &doc);

        match report.ocr.unwrap() {
            OracleResponse::Json(v) => {
                assert_eq!(v["status"], "fail");
                assert!(v["message"].as_str().unwrap().contains("API call failed"));
            }
            OracleResponse::Text(_) => panic!("expected fallback json"),
        }
    }

    #[test]
    fn decision_parses_oracle_reply() {
        let tmp = tempfile::tempdir().unwrap();
        let doc = sample_document(tmp.path());

        let pipeline = VerificationPipeline::new(StubOracle::new(
            json!({"decision": "accept", "reason": "all checks passed"}).to_string(),
        ))
        .with_output_dirs(OutputDirs::new(tmp.path().join("output")));

        let report = pipeline.run(&FormData::default(), &doc);
        let decision = pipeline.decide(&report).unwrap();

        assert_eq!(decision.decision, Decision::Accept);
        assert_eq!(decision.reason, "all checks passed");
    }

    #[test]
    fn malformed_decision_degrades_to_flag() {
        let tmp = tempfile::tempdir().unwrap();
        let doc = sample_document(tmp.path());

        let pipeline = VerificationPipeline::new(StubOracle::new("I cannot decide"))
            .with_output_dirs(OutputDirs::new(tmp.path().join("output")));

        let report = pipeline.run(&FormData::default(), &doc);
        let decision = pipeline.decide(&report).unwrap();

        assert_eq!(decision.decision, Decision::FlagForReview);
        assert_eq!(decision.reason, "I cannot decide");
    }
}
