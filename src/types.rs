use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// A LabelMe shape. Only `points` is required; every shape is read as a polygon.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Shape {
    #[serde(default)]
    pub label: String,
    pub points: Vec<(f64, f64)>,
    #[serde(default)]
    pub group_id: Option<i64>,
    #[serde(default)]
    pub shape_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

// One LabelMe annotation file, describing a single image
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnnotation {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub flags: Option<HashMap<String, bool>>,
    pub shapes: Vec<Shape>,
    pub image_path: String,
    #[serde(default)]
    pub image_data: Option<String>,
    #[serde(default)]
    pub image_height: Option<u32>,
    #[serde(default)]
    pub image_width: Option<u32>,
}

/// Counters collected over one conversion run
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConversionSummary {
    pub json_files: usize,
    pub images: usize,
    pub annotations: usize,
    pub empty_masks: usize,
    pub total_area: f64,
}

impl ConversionSummary {
    pub fn print_summary(&self) {
        log::info!("=== Conversion Summary ===");
        log::info!("JSON files processed: {}", self.json_files);
        log::info!("Images written: {}", self.images);
        log::info!("Annotations written: {}", self.annotations);
        log::info!("Total mask area: {}", self.total_area);
        if self.empty_masks > 0 {
            log::warn!(
                "{} annotation(s) rasterized to an empty mask (degenerate or out-of-bounds polygons)",
                self.empty_masks
            );
        }
    }
}
