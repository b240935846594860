//! Day manifests: every report photographed for one day, run in one go.
//!
//! A manifest is a JSON array of entries such as
//! `{"report": "day1", "images": ["Day_Report1.jpg"]}`. Relative image paths
//! are resolved against the manifest's own directory.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{LedgerError, Result};
use crate::processor::ReportRequest;
use crate::schema::{DayIdentifier, ReportImage, ReportType};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ManifestEntry {
    pub report: ReportType,
    pub images: Vec<PathBuf>,
}

impl ManifestEntry {
    /// Reads the entry's images and builds the request for `day`.
    pub async fn into_request(self, day: DayIdentifier, dry_run: bool) -> Result<ReportRequest> {
        let mut images = Vec::with_capacity(self.images.len());
        for path in &self.images {
            images.push(ReportImage::from_path(path).await?);
        }
        Ok(ReportRequest {
            report: self.report,
            day,
            images,
            dry_run,
        })
    }
}

pub fn parse_manifest(json: &str, base_dir: &Path) -> Result<Vec<ManifestEntry>> {
    let entries: Vec<ManifestEntry> = serde_json::from_str(json)
        .map_err(|e| LedgerError::InputValidation(format!("Invalid manifest: {}", e)))?;
    if entries.is_empty() {
        return Err(LedgerError::InputValidation(
            "Manifest lists no reports".to_string(),
        ));
    }

    Ok(entries
        .into_iter()
        .map(|mut entry| {
            entry.images = entry
                .images
                .into_iter()
                .map(|p| if p.is_relative() { base_dir.join(p) } else { p })
                .collect();
            entry
        })
        .collect())
}

pub async fn load_manifest(path: &Path) -> Result<Vec<ManifestEntry>> {
    let text = tokio::fs::read_to_string(path).await.map_err(|e| {
        LedgerError::InputValidation(format!("Could not read manifest {}: {}", path.display(), e))
    })?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    parse_manifest(&text, base_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_images_resolve_against_manifest_dir() {
        let json = r#"[
            {"report": "day1", "images": ["Day_Report1.jpg"]},
            {"report": "shift", "images": ["m.jpg", "/abs/e.jpg"]}
        ]"#;
        let entries = parse_manifest(json, Path::new("/reports/day7")).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].report, ReportType::Day1);
        assert_eq!(
            entries[0].images,
            vec![PathBuf::from("/reports/day7/Day_Report1.jpg")]
        );
        assert_eq!(
            entries[1].images,
            vec![
                PathBuf::from("/reports/day7/m.jpg"),
                PathBuf::from("/abs/e.jpg")
            ]
        );
    }

    #[test]
    fn test_bad_manifests_are_input_errors() {
        let base = Path::new(".");
        assert!(matches!(
            parse_manifest("[]", base),
            Err(LedgerError::InputValidation(_))
        ));
        assert!(matches!(
            parse_manifest(r#"[{"report": "weekly", "images": []}]"#, base),
            Err(LedgerError::InputValidation(_))
        ));
        assert!(matches!(
            parse_manifest("not json", base),
            Err(LedgerError::InputValidation(_))
        ));
    }
}
