use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use image::DynamicImage;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::extractor::FeatureExtractor;
use crate::face::{BoundingBox, Signature};

/// Faces found in one frame: signatures in detection order plus the detector's count.
///
/// `face_count` can exceed `signatures.len()` when the extractor failed for some
/// regions; an empty `signatures` means nothing usable was extracted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Capture {
    pub signatures: Vec<Signature>,
    pub face_count: usize,
}

/// One face entry of a precomputed feature file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureRecord {
    pub bounding_box: BoundingBox,
    pub embedding: Vec<f64>,
}

/// Feature file written by an out-of-process extractor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureSummary {
    #[serde(default)]
    pub num_faces: Option<usize>,
    #[serde(default)]
    pub faces: Vec<FeatureRecord>,
}

impl Capture {
    pub fn new(signatures: Vec<Signature>, face_count: usize) -> Self {
        Self {
            signatures,
            face_count,
        }
    }

    /// Every detected face produced a signature
    pub fn from_signatures(signatures: Vec<Signature>) -> Self {
        let face_count = signatures.len();
        Self::new(signatures, face_count)
    }

    /// Detect then extract. Extraction is skipped when nothing was detected.
    pub fn from_extractor<E: FeatureExtractor>(
        mut extractor: E,
        image: &DynamicImage,
    ) -> Result<Self> {
        let regions = extractor.detect(image).context("detecting faces")?;
        if regions.is_empty() {
            debug!("no face regions detected");
            return Ok(Self::default());
        }

        let signatures = extractor
            .extract(image, &regions)
            .context("extracting face signatures")?;
        debug!(
            "detected {} face(s), extracted {} signature(s)",
            regions.len(),
            signatures.len()
        );

        Ok(Self::new(signatures, regions.len()))
    }

    pub fn from_summary(summary: FeatureSummary) -> Self {
        let face_count = summary.num_faces.unwrap_or(summary.faces.len());
        let signatures = summary
            .faces
            .into_iter()
            .map(|face| Signature::new(face.embedding))
            .collect();
        Self::new(signatures, face_count)
    }

    pub fn from_feature_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("opening feature file {}", path.display()))?;
        let summary: FeatureSummary = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing feature file {}", path.display()))?;
        Ok(Self::from_summary(summary))
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    pub fn first(&self) -> Option<&Signature> {
        self.signatures.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_count_defaults_to_faces() {
        let summary: FeatureSummary = serde_json::from_str(
            r#"{"faces":[{"bounding_box":{"left":0,"top":0,"right":4,"bottom":4},"embedding":[0.1,0.2]}]}"#,
        )
        .unwrap();
        let capture = Capture::from_summary(summary);
        assert_eq!(capture.face_count, 1);
        assert_eq!(capture.signatures[0].to_vec(), vec![0.1, 0.2]);
    }

    #[test]
    fn test_summary_explicit_count_wins() {
        let summary = FeatureSummary {
            num_faces: Some(3),
            faces: vec![],
        };
        let capture = Capture::from_summary(summary);
        assert_eq!(capture.face_count, 3);
        assert!(capture.is_empty());
    }
}
