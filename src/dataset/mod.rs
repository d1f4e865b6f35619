//! Dataset loading: locating the annotation GeoJSON and source images in
//! the checkout tree and pairing them into per-image work items.

pub mod chip;
pub mod geojson;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use log::info;
use walkdir::WalkDir;

use crate::error::ChipviewError;

pub use chip::{chip_image, clip_boxes_to_chip, Chip};
pub use geojson::{read_annotations, Annotation};

/// One source image queued for chipping.
#[derive(Clone, Debug)]
pub struct ImageTask {
    pub image_id: String,
    pub path: PathBuf,
    pub annotations: Vec<Annotation>,
}

/// Build the per-image work list for a checkout tree.
///
/// Annotations come from the tree's GeoJSON; `image_filter` (when
/// non-empty) restricts processing to the named image ids. Every selected
/// id must have its image file present somewhere under the tree.
pub fn load_tasks(
    tree: &Path,
    image_filter: &BTreeSet<String>,
) -> Result<Vec<ImageTask>, ChipviewError> {
    let geojson_path = find_geojson(tree)?;
    info!("annotations: {}", geojson_path.display());

    let mut by_image = read_annotations(&geojson_path)?;
    if !image_filter.is_empty() {
        by_image.retain(|image_id, _| image_filter.contains(image_id));
    }

    let mut tasks = Vec::with_capacity(by_image.len());
    for (image_id, annotations) in by_image {
        let path =
            find_image(tree, &image_id).ok_or_else(|| ChipviewError::ImageMissing {
                image_id: image_id.clone(),
            })?;
        tasks.push(ImageTask {
            image_id,
            path,
            annotations,
        });
    }

    info!("loaded {} annotated image(s)", tasks.len());
    Ok(tasks)
}

/// Locate the annotation GeoJSON in the tree. When several exist, the
/// lexicographically first relative path wins so runs stay deterministic.
pub fn find_geojson(tree: &Path) -> Result<PathBuf, ChipviewError> {
    let mut candidates: Vec<PathBuf> = WalkDir::new(tree)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("geojson"))
                .unwrap_or(false)
        })
        .map(|entry| entry.path().to_path_buf())
        .collect();

    candidates.sort();
    candidates
        .into_iter()
        .next()
        .ok_or_else(|| ChipviewError::GeojsonNotFound(tree.to_path_buf()))
}

/// Find a source image anywhere under the tree by exact file-name match
/// with the annotation's image id.
pub fn find_image(tree: &Path, image_id: &str) -> Option<PathBuf> {
    WalkDir::new(tree)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .find(|entry| {
            entry
                .path()
                .file_name()
                .and_then(|name| name.to_str())
                .map(|name| name == image_id)
                .unwrap_or(false)
        })
        .map(|entry| entry.path().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_geojson(dir: &Path, name: &str, image_id: &str) {
        let body = format!(
            r#"{{"type": "FeatureCollection", "features": [{{"properties": {{"image_id": "{image_id}", "bounds_imcoords": "0,0,10,10", "type_id": 73}}}}]}}"#
        );
        fs::write(dir.join(name), body).expect("write geojson");
    }

    #[test]
    fn find_geojson_prefers_first_sorted_path() {
        let temp = tempfile::tempdir().expect("create temp dir");
        write_geojson(temp.path(), "b.geojson", "1.tif");
        write_geojson(temp.path(), "a.geojson", "1.tif");

        let found = find_geojson(temp.path()).expect("geojson present");
        assert!(found.ends_with("a.geojson"));
    }

    #[test]
    fn find_geojson_errors_when_absent() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let err = find_geojson(temp.path()).unwrap_err();
        assert!(matches!(err, ChipviewError::GeojsonNotFound(_)));
    }

    #[test]
    fn find_image_matches_by_file_name() {
        let temp = tempfile::tempdir().expect("create temp dir");
        fs::create_dir_all(temp.path().join("train_images")).expect("create dir");
        fs::write(temp.path().join("train_images/104.tif"), b"img").expect("write image");

        let found = find_image(temp.path(), "104.tif").expect("image present");
        assert!(found.ends_with("train_images/104.tif"));
        assert!(find_image(temp.path(), "105.tif").is_none());
    }

    #[test]
    fn load_tasks_applies_image_filter() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let body = r#"{"type": "FeatureCollection", "features": [
            {"properties": {"image_id": "1.png", "bounds_imcoords": "0,0,5,5", "type_id": 73}},
            {"properties": {"image_id": "2.png", "bounds_imcoords": "0,0,5,5", "type_id": 18}}
        ]}"#;
        fs::write(temp.path().join("train.geojson"), body).expect("write geojson");
        fs::write(temp.path().join("1.png"), b"img").expect("write image");

        let filter = BTreeSet::from(["1.png".to_string()]);
        let tasks = load_tasks(temp.path(), &filter).expect("load tasks");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].image_id, "1.png");
        assert_eq!(tasks[0].annotations.len(), 1);
    }

    #[test]
    fn load_tasks_errors_on_missing_image_file() {
        let temp = tempfile::tempdir().expect("create temp dir");
        write_geojson(temp.path(), "train.geojson", "ghost.tif");

        let err = load_tasks(temp.path(), &BTreeSet::new()).unwrap_err();
        assert!(matches!(err, ChipviewError::ImageMissing { .. }));
    }
}
