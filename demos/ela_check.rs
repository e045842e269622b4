use kyc_engine::{DocumentAnalyzer, OutputDirs, error::Result, report::visualization};

fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "uploads/id_card.jpg".into());

    let analyzer = DocumentAnalyzer::new(&path)?;

    for quality in [95, 90, 85] {
        println!("Analyzing at quality {quality}...");

        let report = analyzer.ela_at(quality)?;
        println!("  Status: {}", report.status.as_str());
        println!("  Error level: {:.2}", report.error_level);
        println!("  Message: {}", report.message);
        println!();
    }

    let output = OutputDirs::default();
    output.ensure()?;

    let mut report = analyzer.ela()?;
    report.save(output.analysis_path("ela_result.jpg"))?;

    let original = image::open(&path)?.to_rgb8();
    let composite = visualization::ela_composite(&original, &report);
    composite.save(output.analysis_path("composite_ela_image.png"))?;

    println!(
        "Composite saved to {}",
        output.analysis_path("composite_ela_image.png").display()
    );

    Ok(())
}
