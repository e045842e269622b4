pub mod visualization;

use serde::Serialize;
use serde_json::{Value, json};

use crate::{
    ElaReport, ForensicsReport,
    error::Result,
    pipeline::PipelineReport,
    verdict::Verdict,
};

/// Rounding for presentation only; analyzers keep full precision.
fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[derive(Serialize)]
pub struct ElaReportJson {
    pub status: Verdict,
    pub message: String,
    pub error_level: f64,
    pub output_path: Option<String>,
}

impl From<&ElaReport> for ElaReportJson {
    fn from(report: &ElaReport) -> Self {
        Self {
            status: report.status,
            message: report.message.clone(),
            error_level: round2(report.error_level),
            output_path: report
                .output_path
                .as_ref()
                .map(|p| p.display().to_string()),
        }
    }
}

#[derive(Serialize)]
pub struct ForensicsReportJson {
    pub status: Verdict,
    pub score: f64,
    pub details: ForensicsDetailsJson,
    pub message: String,
}

#[derive(Serialize)]
pub struct ForensicsDetailsJson {
    pub edge_strength: f64,
    pub noise_level: f64,
    pub cloning_score: f64,
    pub artifact_score: f64,
}

impl From<&ForensicsReport> for ForensicsReportJson {
    fn from(report: &ForensicsReport) -> Self {
        Self {
            status: report.status,
            score: round2(report.score),
            details: ForensicsDetailsJson {
                edge_strength: round2(report.details.edge_strength),
                noise_level: round2(report.details.noise_level),
                cloning_score: round2(report.details.cloning_score),
                artifact_score: round2(report.details.artifact_score),
            },
            message: report.message.clone(),
        }
    }
}

impl ElaReportJson {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl ForensicsReportJson {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Aggregates the pipeline channels into one evidence object for the
/// decision prompt. Failed channels render as `{"error": …}` so every key is
/// always present.
pub fn pipeline_to_value(report: &PipelineReport) -> Result<Value> {
    let ocr = match &report.ocr {
        Ok(response) => response.to_value(),
        Err(e) => json!({ "error": e.to_string() }),
    };
    let metadata = match &report.metadata {
        Ok(response) => response.to_value(),
        Err(e) => json!({ "error": e.to_string() }),
    };
    let ela = match &report.ela {
        Ok(r) => serde_json::to_value(ElaReportJson::from(r))?,
        Err(e) => json!({ "error": e.to_string() }),
    };
    let forensics = match &report.forensics {
        Ok(r) => serde_json::to_value(ForensicsReportJson::from(r))?,
        Err(e) => json!({ "error": e.to_string() }),
    };

    Ok(json!({
        "OCR": ocr,
        "Metadata": metadata,
        "ELA": ela,
        "Forensics": forensics,
        "detected_language": report.detected_language,
    }))
}
