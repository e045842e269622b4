use image::{DynamicImage, GrayImage, Rgb, RgbImage};

use crate::{
    ElaReport, ForensicsReport, Region,
    analysis::pixel_forensics::{artifact_difference_map, noise_difference_map},
    config::AnalysisConfig,
    error::Result,
    image_utils::{array_to_gray, gray_to_array, normalize_to_u8, rgb_to_gray, sobel_magnitude},
};

const PADDING: u32 = 10;
const LABEL_HEIGHT: u32 = 20;
const CANVAS_COLOR: Rgb<u8> = Rgb([40, 40, 40]);

/// Original | recompressed | rescaled difference | summary, side by side.
pub fn ela_composite(original: &RgbImage, report: &ElaReport) -> RgbImage {
    let summary = summary_tile(
        original.dimensions(),
        &[
            format!("Status: {}", report.status.as_str()),
            format!("Error level: {:.2}", report.error_level),
            report.message.clone(),
        ],
    );

    compose(
        &[
            ("Original", original.clone()),
            ("Recompressed", report.recompressed.clone()),
            ("ELA", report.difference.clone()),
            ("Summary", summary),
        ],
        2,
    )
}

/// Six-panel overview of the pixel forensics pass. The metric maps are
/// recomputed from the source image with the same configuration that
/// produced the report.
pub fn forensics_composite(
    image: &DynamicImage,
    config: &AnalysisConfig,
    report: &ForensicsReport,
) -> Result<RgbImage> {
    let rgb = image.to_rgb8();
    let gray = rgb_to_gray(&rgb);

    let edges = gray_panel(&array_to_gray(&normalize_to_u8(&sobel_magnitude(&gray))));
    let noise = gray_panel(&noise_difference_map(
        &gray,
        config.noise_sigma,
        config.noise_seed,
    )?);
    let artifact_map = artifact_difference_map(&gray, config.artifact_quality)?;
    let artifacts = gray_panel(&array_to_gray(&normalize_to_u8(&gray_to_array(
        &artifact_map,
    ))));

    let mut cloning = rgb.clone();
    if let Some(ref m) = report.clone_match {
        draw_region_border(&mut cloning, &m.source, Rgb([255, 0, 0]));
        draw_region_border(&mut cloning, &m.target, Rgb([0, 255, 255]));
    }

    let summary = summary_tile(
        rgb.dimensions(),
        &[
            format!("Status: {}", report.status.as_str()),
            format!("Score: {:.2}", report.score),
            format!("Edge: {:.2}", report.details.edge_strength),
            format!("Noise: {:.2}", report.details.noise_level),
            format!("Clone: {:.2}", report.details.cloning_score),
            format!("Artifact: {:.2}", report.details.artifact_score),
        ],
    );

    Ok(compose(
        &[
            ("Original", rgb),
            ("Edges", edges),
            ("Noise", noise),
            ("Cloning", cloning),
            ("Artifacts", artifacts),
            ("Summary", summary),
        ],
        3,
    ))
}

fn gray_panel(gray: &GrayImage) -> RgbImage {
    let (width, height) = gray.dimensions();
    let mut rgb = RgbImage::new(width, height);
    for (x, y, pixel) in gray.enumerate_pixels() {
        let v = pixel[0];
        rgb.put_pixel(x, y, Rgb([v, v, v]));
    }
    rgb
}

/// Lays the labeled panels out on a grid over a dark canvas.
fn compose(panels: &[(&str, RgbImage)], columns: usize) -> RgbImage {
    if panels.is_empty() {
        return RgbImage::new(1, 1);
    }

    let columns = columns.max(1);
    let rows = panels.len().div_ceil(columns);

    let cell_width = panels.iter().map(|(_, img)| img.width()).max().unwrap_or(1);
    let cell_height = panels.iter().map(|(_, img)| img.height()).max().unwrap_or(1);

    let total_width = columns as u32 * cell_width + PADDING * (columns as u32 + 1);
    let total_height = rows as u32 * (cell_height + LABEL_HEIGHT) + PADDING * (rows as u32 + 1);

    let mut canvas = RgbImage::from_pixel(total_width, total_height, CANVAS_COLOR);

    for (i, (label, panel)) in panels.iter().enumerate() {
        let col = (i % columns) as u32;
        let row = (i / columns) as u32;

        let x0 = PADDING + col * (cell_width + PADDING);
        let y0 = PADDING + row * (cell_height + LABEL_HEIGHT + PADDING);

        draw_label(&mut canvas, x0, y0, label, Rgb([255, 255, 255]));
        copy_image_to(&mut canvas, panel, x0, y0 + LABEL_HEIGHT);
    }

    canvas
}

fn summary_tile((width, height): (u32, u32), lines: &[String]) -> RgbImage {
    let mut tile = RgbImage::from_pixel(width, height, Rgb([20, 20, 20]));

    for (i, line) in lines.iter().enumerate() {
        let y = 8 + i as u32 * 16;
        if y + 12 > height {
            break;
        }
        draw_label(&mut tile, 6, y, line, Rgb([220, 220, 220]));
    }

    tile
}

fn draw_region_border(image: &mut RgbImage, region: &Region, color: Rgb<u8>) {
    let (width, height) = image.dimensions();

    for x in region.x..(region.x + region.width).min(width) {
        if region.y < height {
            image.put_pixel(x, region.y, color);
        }
        let bottom = region.y + region.height - 1;
        if bottom < height {
            image.put_pixel(x, bottom, color);
        }
    }

    for y in region.y..(region.y + region.height).min(height) {
        if region.x < width {
            image.put_pixel(region.x, y, color);
        }
        let right = region.x + region.width - 1;
        if right < width {
            image.put_pixel(right, y, color);
        }
    }
}

fn draw_label(image: &mut RgbImage, x: u32, y: u32, text: &str, color: Rgb<u8>) {
    let (width, height) = image.dimensions();
    let char_width = 6u32;
    let char_height = 8u32;

    for (i, c) in text.chars().enumerate() {
        if c == ' ' {
            continue;
        }
        let cx = x + i as u32 * char_width;
        let cy = y;

        for dy in 0..char_height {
            for dx in 0..char_width - 1 {
                let px = cx + dx;
                let py = cy + dy;
                if px < width && py < height {
                    image.put_pixel(px, py, color);
                }
            }
        }
    }
}

fn copy_image_to(dest: &mut RgbImage, src: &RgbImage, offset_x: u32, offset_y: u32) {
    let (dest_w, dest_h) = dest.dimensions();

    for y in 0..src.height() {
        for x in 0..src.width() {
            let dx = offset_x + x;
            let dy = offset_y + y;
            if dx < dest_w && dy < dest_h {
                dest.put_pixel(dx, dy, *src.get_pixel(x, y));
            }
        }
    }
}
