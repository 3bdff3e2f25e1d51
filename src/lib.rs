//! LabelMe to COCO format converter
//!
//! This library turns a directory of LabelMe polygon annotations into a single
//! COCO annotation file, rasterizing each polygon to derive its mask area and
//! bounding box.

pub mod coco;
pub mod config;
pub mod conversion;
pub mod error;
pub mod io;
pub mod mask;
pub mod types;
pub mod utils;

// Re-export commonly used types and functions
pub use coco::{Annotation, Category, CocoFile, CocoWriter, Image, Segmentation};
pub use config::{Args, CategoryAssignment, ConvertConfig, SegmentationMode};
pub use conversion::{convert, Converter};
pub use error::{ConvertError, Result};
pub use mask::{Mask, MaskCodec, PixelPoint, Rle, ScanlineCodec};
pub use types::{ConversionSummary, ImageAnnotation, Shape};
