use std::{collections::BTreeMap, fs::File, io::BufReader, path::Path};

use log::debug;

use crate::{MetadataSummary, error::Result};

/// Editing tools whose presence in the Software tag is worth surfacing to
/// the reviewer. Interpretation stays with the oracle; these are hints only.
const EDITING_SOFTWARE: &[&str] = &["photoshop", "gimp", "paint", "snapseed", "lightroom"];

pub struct ExifExtractor;

impl ExifExtractor {
    /// Reads every EXIF field the container carries. An image with no EXIF
    /// block yields an empty summary rather than an error: legitimate ID
    /// photos frequently have their metadata stripped.
    pub fn extract<P: AsRef<Path>>(path: P) -> Result<MetadataSummary> {
        let file = File::open(&path)?;
        let mut reader = BufReader::new(file);

        match exif::Reader::new().read_from_container(&mut reader) {
            Ok(exif_data) => Ok(Self::summarize(&exif_data)),
            Err(e) => {
                debug!("no exif data in {}: {}", path.as_ref().display(), e);
                Ok(MetadataSummary {
                    suspicious_indicators: vec!["No EXIF data found".into()],
                    ..MetadataSummary::default()
                })
            }
        }
    }

    fn summarize(exif: &exif::Exif) -> MetadataSummary {
        let mut all_tags = BTreeMap::new();
        for field in exif.fields() {
            all_tags.insert(field.tag.to_string(), field.display_value().to_string());
        }

        let field_value = |tag| {
            exif.get_field(tag, exif::In::PRIMARY)
                .map(|f| f.display_value().to_string())
        };

        let camera_make = field_value(exif::Tag::Make);
        let camera_model = field_value(exif::Tag::Model);
        let software = field_value(exif::Tag::Software);
        let date_time = field_value(exif::Tag::DateTime);
        let date_time_original = field_value(exif::Tag::DateTimeOriginal);
        let date_time_digitized = field_value(exif::Tag::DateTimeDigitized);
        let gps_coordinates = Self::extract_gps(exif);

        let mut suspicious_indicators = Vec::new();

        if let Some(ref sw) = software {
            let lower = sw.to_lowercase();
            if EDITING_SOFTWARE.iter().any(|tool| lower.contains(tool)) {
                suspicious_indicators.push(format!("Edited with: {}", sw.trim_matches('"')));
            }
        }

        if date_time_original.is_none() && date_time.is_some() {
            suspicious_indicators.push("Original datetime missing (may be stripped)".into());
        }

        if let (Some(orig), Some(digi)) = (&date_time_original, &date_time_digitized) {
            if orig != digi {
                suspicious_indicators.push("Inconsistent capture and digitization times".into());
            }
        }

        if camera_make.is_none() && camera_model.is_none() && !all_tags.is_empty() {
            suspicious_indicators.push("Camera make and model absent".into());
        }

        if let Some((lat, lon)) = gps_coordinates {
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                suspicious_indicators.push("GPS coordinates out of range".into());
            }
        }

        MetadataSummary {
            camera_make,
            camera_model,
            software,
            date_time,
            date_time_original,
            gps_coordinates,
            all_tags,
            suspicious_indicators,
        }
    }

    fn extract_gps(exif: &exif::Exif) -> Option<(f64, f64)> {
        let lat = exif.get_field(exif::Tag::GPSLatitude, exif::In::PRIMARY)?;
        let lat_ref = exif.get_field(exif::Tag::GPSLatitudeRef, exif::In::PRIMARY)?;
        let lon = exif.get_field(exif::Tag::GPSLongitude, exif::In::PRIMARY)?;
        let lon_ref = exif.get_field(exif::Tag::GPSLongitudeRef, exif::In::PRIMARY)?;

        let lat_val = Self::parse_gps_coordinate(&lat.display_value().to_string())?;
        let lon_val = Self::parse_gps_coordinate(&lon.display_value().to_string())?;

        let lat_sign = if lat_ref.display_value().to_string().contains('S') { -1.0 } else { 1.0 };
        let lon_sign = if lon_ref.display_value().to_string().contains('W') { -1.0 } else { 1.0 };

        Some((lat_val * lat_sign, lon_val * lon_sign))
    }

    fn parse_gps_coordinate(s: &str) -> Option<f64> {
        let parts = s.split_whitespace().collect::<Vec<_>>();

        if parts.len() >= 4 {
            let degrees = parts[0].parse::<f64>().ok()?;
            let minutes = parts[2].trim_end_matches('\'').parse::<f64>().ok()?;
            let seconds = parts[3].trim_end_matches('"').parse::<f64>().unwrap_or(0.0);

            Some(degrees + minutes / 60.0 + seconds / 3600.0)
        } else {
            None
        }
    }
}
