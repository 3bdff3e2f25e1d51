use clap::{Parser, ValueEnum};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::coco::Category;
use crate::error::{ConvertError, Result};

/// Command-line arguments parser for converting LabelMe JSON to a COCO annotation file.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct Args {
    /// Directory containing LabelMe JSON files and their images
    pub input_dir: PathBuf,

    /// Path of the COCO JSON file to write (overwritten if it exists)
    pub output_path: PathBuf,

    /// Ordered category names; ids are assigned from 0
    #[arg(long = "categories", value_delimiter = ',', default_values_t = default_category_names())]
    pub categories: Vec<String>,

    /// Category id given to every annotation
    #[arg(long = "category_id", default_value_t = 0, conflicts_with = "assign_by_label")]
    pub category_id: u32,

    /// Assign categories by matching each shape's label against the category names
    #[arg(long = "assign_by_label")]
    pub assign_by_label: bool,

    /// Segmentation output: 'polygon' or 'rle'
    #[arg(long = "segmentation", value_enum, default_value = "polygon")]
    pub segmentation: SegmentationMode,

    /// Read image dimensions from the embedded imageData when the image file is missing
    #[arg(long = "embedded_image_data")]
    pub embedded_image_data: bool,

    /// Pretty-print the output JSON
    #[arg(long = "pretty")]
    pub pretty: bool,
}

// How each annotation's segmentation is written
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Default)]
pub enum SegmentationMode {
    #[default]
    Polygon,
    Rle,
}

/// How a shape is mapped to a category id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryAssignment {
    /// Every annotation gets the same id.
    Fixed(u32),
    /// The shape label is looked up by category name.
    ByLabel,
}

impl Default for CategoryAssignment {
    fn default() -> Self {
        CategoryAssignment::Fixed(0)
    }
}

/// Validated settings for one conversion run
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    pub categories: Vec<Category>,
    pub assignment: CategoryAssignment,
    pub segmentation: SegmentationMode,
    pub embedded_image_data: bool,
    pub pretty: bool,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            categories: Category::table_from_names(&default_category_names()),
            assignment: CategoryAssignment::default(),
            segmentation: SegmentationMode::default(),
            embedded_image_data: false,
            pretty: false,
        }
    }
}

impl ConvertConfig {
    /// Check the category table and the assignment against each other
    pub fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            return Err(ConvertError::Config(
                "at least one category is required".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for category in &self.categories {
            if category.name.trim().is_empty() {
                return Err(ConvertError::Config(
                    "category names must not be empty".to_string(),
                ));
            }
            if !seen.insert(category.name.as_str()) {
                return Err(ConvertError::Config(format!(
                    "duplicate category name: {}",
                    category.name
                )));
            }
        }
        if let CategoryAssignment::Fixed(id) = self.assignment {
            if !self.categories.iter().any(|c| c.id == id) {
                return Err(ConvertError::Config(format!(
                    "category_id {} is not in the category table (0..{})",
                    id,
                    self.categories.len()
                )));
            }
        }
        Ok(())
    }
}

impl Args {
    /// Validate the options, producing the settings for a run.
    ///
    /// The input and output paths are checked by the converter itself.
    pub fn to_convert_config(&self) -> Result<ConvertConfig> {
        let config = ConvertConfig {
            categories: Category::table_from_names(&self.categories),
            assignment: if self.assign_by_label {
                CategoryAssignment::ByLabel
            } else {
                CategoryAssignment::Fixed(self.category_id)
            },
            segmentation: self.segmentation,
            embedded_image_data: self.embedded_image_data,
            pretty: self.pretty,
        };
        config.validate()?;
        Ok(config)
    }
}

pub fn default_category_names() -> Vec<String> {
    vec!["NX".to_string(), "M".to_string()]
}

/// Check that the input directory exists and the output file can be created
pub fn validate_paths(input_dir: &Path, output_path: &Path) -> Result<()> {
    if !input_dir.is_dir() {
        return Err(ConvertError::Config(format!(
            "input directory does not exist or is not a directory: {}",
            input_dir.display()
        )));
    }
    if output_path.is_dir() {
        return Err(ConvertError::Config(format!(
            "output path is a directory: {}",
            output_path.display()
        )));
    }
    match output_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
            Err(ConvertError::Config(format!(
                "output directory does not exist: {}",
                parent.display()
            )))
        }
        _ => Ok(()),
    }
}
