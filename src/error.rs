use std::path::PathBuf;

use thiserror::Error;

/// Every way a conversion run can fail. All of them abort the run.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to parse LabelMe JSON ({}): {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to load image ({}): {source}", path.display())]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to decode embedded image data ({}): {source}", path.display())]
    EmbeddedImage {
        path: PathBuf,
        #[source]
        source: base64::DecodeError,
    },

    #[error("Image has zero width or height: {}", path.display())]
    EmptyImage { path: PathBuf },

    #[error("Shape label {label:?} in {} has no matching category", path.display())]
    UnknownLabel { label: String, path: PathBuf },

    #[error("IO error ({}): {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConvertError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConvertError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
