//! LabelMe to COCO conversion
//!
//! Walks an input directory of LabelMe files, rasterizes every shape through a
//! [`MaskCodec`] and aggregates the results into a single COCO document.

use log::{debug, info};
use std::path::Path;

use crate::coco::{CocoFile, CocoWriter, Segmentation};
use crate::config::{validate_paths, CategoryAssignment, ConvertConfig, SegmentationMode};
use crate::error::{ConvertError, Result};
use crate::io::{list_json_files, read_and_parse_json, read_image_dimensions, write_coco_file};
use crate::mask::{flatten, round_and_clamp, MaskCodec, ScanlineCodec};
use crate::types::{ConversionSummary, ImageAnnotation, Shape};
use crate::utils::create_progress_bar;

/// Geometry derived from one shape
#[derive(Debug, Clone, PartialEq)]
struct ShapeGeometry {
    segmentation: Segmentation,
    area: f64,
    bbox: [f64; 4],
}

/// Converts a directory of LabelMe annotations into one COCO document
#[derive(Debug, Clone)]
pub struct Converter<C = ScanlineCodec> {
    config: ConvertConfig,
    codec: C,
}

impl Converter<ScanlineCodec> {
    pub fn new(config: ConvertConfig) -> Self {
        Self::with_codec(config, ScanlineCodec)
    }
}

impl<C: MaskCodec> Converter<C> {
    /// Use a custom rasterization backend
    pub fn with_codec(config: ConvertConfig, codec: C) -> Self {
        Self { config, codec }
    }

    /// Convert every `*.json` file in `input_dir` and write the COCO document
    /// to `output_path`, replacing any existing file.
    ///
    /// The first malformed annotation or unreadable image aborts the run and
    /// nothing is written.
    pub fn convert(&self, input_dir: &Path, output_path: &Path) -> Result<ConversionSummary> {
        validate_paths(input_dir, output_path)?;
        let (coco, summary) = self.build_document(input_dir)?;

        info!("Writing COCO annotations to {}", output_path.display());
        write_coco_file(output_path, &coco, self.config.pretty)?;
        Ok(summary)
    }

    /// Build the COCO document for `input_dir` in memory
    pub fn build_document(&self, input_dir: &Path) -> Result<(CocoFile, ConversionSummary)> {
        self.config.validate()?;

        let json_files = list_json_files(input_dir)?;
        info!(
            "Found {} LabelMe JSON file(s) in {}",
            json_files.len(),
            input_dir.display()
        );

        let mut writer = CocoWriter::new(self.config.categories.clone());
        let mut summary = ConversionSummary::default();
        let pb = create_progress_bar(json_files.len() as u64, "COCO");

        for json_path in &json_files {
            if let Some(name) = json_path.file_name() {
                pb.set_message(name.to_string_lossy().into_owned());
            }
            let annotation = read_and_parse_json(json_path)?;
            self.convert_annotation(&mut writer, &mut summary, json_path, input_dir, &annotation)?;
            summary.json_files += 1;
            pb.inc(1);
        }
        pb.finish_and_clear();

        summary.images = writer.image_count();
        summary.annotations = writer.annotation_count();
        Ok((writer.finish(), summary))
    }

    /// Add one LabelMe file's image and shapes to the document
    fn convert_annotation(
        &self,
        writer: &mut CocoWriter,
        summary: &mut ConversionSummary,
        json_path: &Path,
        base_dir: &Path,
        annotation: &ImageAnnotation,
    ) -> Result<()> {
        // Image paths are relative to the JSON file's directory
        let image_path = json_path
            .parent()
            .map(|parent| parent.join(&annotation.image_path))
            .unwrap_or_else(|| base_dir.join(&annotation.image_path));

        let embedded = if self.config.embedded_image_data {
            annotation.image_data.as_deref().filter(|d| !d.is_empty())
        } else {
            None
        };
        let (width, height) = read_image_dimensions(&image_path, embedded)?;

        let image_id = writer.add_image(annotation.image_path.clone(), width, height);
        debug!(
            "Image {} -> id {} ({}x{}, {} shape(s))",
            annotation.image_path,
            image_id,
            width,
            height,
            annotation.shapes.len()
        );

        for shape in &annotation.shapes {
            let category_id = self.resolve_category(writer, shape, json_path)?;
            let geometry = self.shape_geometry(shape, width, height);
            if geometry.area == 0.0 {
                summary.empty_masks += 1;
            }
            summary.total_area += geometry.area;
            writer.add_annotation(
                image_id,
                category_id,
                geometry.segmentation,
                geometry.area,
                geometry.bbox,
            );
        }
        Ok(())
    }

    fn resolve_category(&self, writer: &CocoWriter, shape: &Shape, json_path: &Path) -> Result<u32> {
        match self.config.assignment {
            CategoryAssignment::Fixed(id) => Ok(id),
            CategoryAssignment::ByLabel => {
                writer
                    .category_id(&shape.label)
                    .ok_or_else(|| ConvertError::UnknownLabel {
                        label: shape.label.clone(),
                        path: json_path.to_path_buf(),
                    })
            }
        }
    }

    /// Snap the shape to the image grid, rasterize it and derive area and bbox
    fn shape_geometry(&self, shape: &Shape, width: u32, height: u32) -> ShapeGeometry {
        let polygon = round_and_clamp(&shape.points, width, height);
        let mask = self.codec.rasterize(&polygon, width, height);
        let rle = self.codec.encode(&mask);

        let segmentation = match self.config.segmentation {
            SegmentationMode::Polygon => Segmentation::Polygons(vec![flatten(&polygon)]),
            SegmentationMode::Rle => Segmentation::Rle {
                size: [height, width],
                counts: rle.to_compressed_string(),
            },
        };

        ShapeGeometry {
            segmentation,
            area: rle.area() as f64,
            bbox: rle.to_bbox(),
        }
    }
}

/// Convert `input_dir` into a COCO file at `output_path` with the built-in
/// scan-line rasterizer
pub fn convert(
    input_dir: &Path,
    output_path: &Path,
    config: ConvertConfig,
) -> Result<ConversionSummary> {
    Converter::new(config).convert(input_dir, output_path)
}
