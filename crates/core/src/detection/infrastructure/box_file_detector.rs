/// Reads detections produced by an external detector from a JSON file.
///
/// Accepts either a bare array of `[x1, y1, x2, y2]` boxes or an array of
/// objects carrying a `bbox` field, which is what the upstream detector
/// service emits. The file is parsed on first use and reused afterwards.
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::detection::domain::product_detector::{DetectionError, ProductDetector};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

#[derive(Deserialize)]
#[serde(untagged)]
enum DetectionRecord {
    Bare(BoundingBox),
    Tagged { bbox: BoundingBox },
}

impl From<DetectionRecord> for BoundingBox {
    fn from(record: DetectionRecord) -> Self {
        match record {
            DetectionRecord::Bare(bbox) | DetectionRecord::Tagged { bbox } => bbox,
        }
    }
}

pub struct BoxFileDetector {
    path: PathBuf,
    boxes: Option<Vec<BoundingBox>>,
}

impl BoxFileDetector {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            boxes: None,
        }
    }

    fn load(&self) -> Result<Vec<BoundingBox>, DetectionError> {
        let display = self.path.display().to_string();
        let json = fs::read_to_string(&self.path).map_err(|source| DetectionError::Read {
            path: display.clone(),
            source,
        })?;
        parse_detections(&json).map_err(|source| DetectionError::Parse {
            path: display,
            source,
        })
    }
}

impl ProductDetector for BoxFileDetector {
    fn detect(&mut self, _photo: &Frame) -> Result<Vec<BoundingBox>, DetectionError> {
        if self.boxes.is_none() {
            let boxes = self.load()?;
            log::info!("Loaded {} detections from {}", boxes.len(), self.path.display());
            self.boxes = Some(boxes);
        }
        Ok(self.boxes.clone().unwrap_or_default())
    }
}

pub fn parse_detections(json: &str) -> Result<Vec<BoundingBox>, serde_json::Error> {
    let records: Vec<DetectionRecord> = serde_json::from_str(json)?;
    Ok(records.into_iter().map(BoundingBox::from).collect())
}
