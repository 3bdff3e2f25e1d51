use glob::{glob, Pattern};
use log::debug;
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::coco::CocoFile;
use crate::error::{ConvertError, Result};
use crate::types::ImageAnnotation;

/// List the `*.json` files directly inside `dirname`, sorted by name
pub fn list_json_files(dirname: &Path) -> Result<Vec<PathBuf>> {
    let dir_str = dirname.to_str().ok_or_else(|| {
        ConvertError::Config(format!(
            "input directory is not valid UTF-8: {}",
            dirname.display()
        ))
    })?;
    let json_pattern = format!("{}/*.json", Pattern::escape(dir_str));
    let entries = glob(&json_pattern).map_err(|e| {
        ConvertError::Config(format!("invalid input directory pattern {json_pattern}: {e}"))
    })?;

    let mut json_files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            ConvertError::io(path, e.into_error())
        })?;
        if path.is_file() {
            json_files.push(path);
        }
    }
    Ok(json_files)
}

/// Read and parse a single LabelMe JSON file, streaming it from disk
pub fn read_and_parse_json(path: &Path) -> Result<ImageAnnotation> {
    let file = File::open(path).map_err(|e| ConvertError::io(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| ConvertError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Read `(width, height)` from an image header without decoding the pixels.
///
/// When `embedded_data` is given and the file is missing, the dimensions are
/// read from the base64 image stored in the annotation instead.
pub fn read_image_dimensions(image_path: &Path, embedded_data: Option<&str>) -> Result<(u32, u32)> {
    let dimensions = match embedded_data {
        Some(data) if !image_path.exists() => {
            debug!(
                "Image file {} not found, reading embedded image data",
                image_path.display()
            );
            decode_embedded_dimensions(image_path, data)?
        }
        _ => read_file_dimensions(image_path)?,
    };

    if dimensions.0 == 0 || dimensions.1 == 0 {
        return Err(ConvertError::EmptyImage {
            path: image_path.to_path_buf(),
        });
    }
    Ok(dimensions)
}

// The format is sniffed from the file content; the extension is only a fallback.
fn read_file_dimensions(image_path: &Path) -> Result<(u32, u32)> {
    let load_error = |source| ConvertError::ImageLoad {
        path: image_path.to_path_buf(),
        source,
    };
    image::ImageReader::open(image_path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| load_error(image::ImageError::IoError(e)))?
        .into_dimensions()
        .map_err(load_error)
}

fn decode_embedded_dimensions(image_path: &Path, data: &str) -> Result<(u32, u32)> {
    let bytes = base64::decode(data).map_err(|source| ConvertError::EmbeddedImage {
        path: image_path.to_path_buf(),
        source,
    })?;
    let load_error = |source| ConvertError::ImageLoad {
        path: image_path.to_path_buf(),
        source,
    };
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| load_error(image::ImageError::IoError(e)))?
        .into_dimensions()
        .map_err(load_error)
}

/// Serialize the COCO document to `path`.
///
/// The JSON is written to a temporary file next to `path` and then renamed
/// over it, so readers never see a partially written document.
pub fn write_coco_file(path: &Path, coco: &CocoFile, pretty: bool) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| ConvertError::io(dir, e))?;

    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        let written = if pretty {
            serde_json::to_writer_pretty(&mut writer, coco)
        } else {
            serde_json::to_writer(&mut writer, coco)
        };
        written.map_err(|e| ConvertError::io(path, e.into()))?;
        writer.flush().map_err(|e| ConvertError::io(path, e))?;
    }

    tmp.persist(path)
        .map_err(|e| ConvertError::io(path, e.error))?;
    Ok(())
}
