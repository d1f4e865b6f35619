use std::path::PathBuf;
use thiserror::Error;

/// The main error type for chipview operations.
#[derive(Debug, Error)]
pub enum ChipviewError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid chip format '{0}': no encoder for this extension")]
    UnsupportedChipFormat(String),

    #[error("invalid LFS repository URL '{url}': {message}")]
    LfsUrlInvalid { url: String, message: String },

    #[error("LFS fetch of '{url}' failed: {message}")]
    LfsFetch { url: String, message: String },

    #[error("failed to parse LFS manifest for ref '{reference}': {message}")]
    LfsManifestParse { reference: String, message: String },

    #[error("invalid LFS pointer: {message}")]
    PointerParse { message: String },

    #[error("object '{name}' failed verification: expected {expected}, got {actual}")]
    ObjectVerify {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("failed to parse annotations from {path}: {source}")]
    GeojsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no annotation GeoJSON found under {0}")]
    GeojsonNotFound(PathBuf),

    #[error("image '{image_id}' is annotated but missing from the checkout tree")]
    ImageMissing { image_id: String },

    #[error("failed to read image {path}: {source}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to write image {path}: {source}")]
    ImageWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("invalid class dictionary '{source_name}': {message}")]
    DictionaryInvalid { source_name: String, message: String },

    #[error("invalid dictionary path '{0}'")]
    DictionaryNotFound(String),

    #[error("invalid class filter '{value}': {message}")]
    ClassFilterInvalid { value: String, message: String },
}
