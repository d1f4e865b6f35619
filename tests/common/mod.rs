#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};

/// Write a flat-colour PNG source image into `dir`.
pub fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    RgbImage::from_pixel(width, height, Rgb([60, 90, 120]))
        .save(&path)
        .expect("write png fixture");
    path
}

/// One `(image_id, bounds, type_id)` annotation for [`write_geojson`].
pub type FixtureBox<'a> = (&'a str, &'a str, i64);

/// Write an xView-style FeatureCollection into `dir`.
pub fn write_geojson(dir: &Path, name: &str, boxes: &[FixtureBox<'_>]) -> PathBuf {
    let features: Vec<String> = boxes
        .iter()
        .map(|(image_id, bounds, type_id)| {
            format!(
                r#"{{"properties": {{"image_id": "{image_id}", "bounds_imcoords": "{bounds}", "type_id": {type_id}}}}}"#
            )
        })
        .collect();

    let path = dir.join(name);
    let body = format!(
        r#"{{"type": "FeatureCollection", "features": [{}]}}"#,
        features.join(",")
    );
    fs::write(&path, body).expect("write geojson fixture");
    path
}
