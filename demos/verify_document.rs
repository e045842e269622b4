use std::path::Path;

use kyc_engine::{
    error::Result,
    oracle::{GeminiClient, OracleConfig},
    pipeline::{FormData, VerificationPipeline},
    report,
};

fn main() -> Result<()> {
    let image_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "uploads/id_card.jpg".into());

    let form = FormData {
        full_name: "John Smith".into(),
        dob: "01-05-1985".into(),
        nationality: "United States".into(),
        id_number: "123-45-6789".into(),
    };

    // Needs GEMINI_API_KEY and GEMINI_MODEL in the environment.
    let oracle = GeminiClient::new(OracleConfig::from_env()?)?;
    let pipeline = VerificationPipeline::new(oracle);

    let outcome = pipeline.run(&form, Path::new(&image_path));
    println!(
        "{}",
        serde_json::to_string_pretty(&report::pipeline_to_value(&outcome)?)?
    );

    let decision = pipeline.decide(&outcome)?;
    println!("{}", serde_json::to_string_pretty(&decision)?);

    Ok(())
}
