//! xView-style GeoJSON annotation parsing.
//!
//! Source labels arrive as one FeatureCollection covering every image in
//! the dataset. Each feature carries `image_id` (the source image file
//! name), `bounds_imcoords` (an `xmin,ymin,xmax,ymax` pixel box) and
//! `type_id` (the integer class id). Upstream xView data is known to be
//! dirty, so unusable features are skipped with a warning rather than
//! failing the run.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::warn;
use serde::Deserialize;

use crate::error::ChipviewError;
use crate::geom::{BBox, Pixel};

/// One source bounding box with its class id, in source-image pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    pub bbox: BBox<Pixel>,
    pub class_id: i64,
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Option<FeatureProps>,
}

#[derive(Debug, Deserialize)]
struct FeatureProps {
    #[serde(default)]
    image_id: Option<String>,
    #[serde(default)]
    bounds_imcoords: Option<String>,
    #[serde(default)]
    type_id: Option<i64>,
}

/// Read a GeoJSON annotation file, grouping boxes by image id.
pub fn read_annotations(
    path: &Path,
) -> Result<BTreeMap<String, Vec<Annotation>>, ChipviewError> {
    let raw = fs::read_to_string(path)?;
    let collection: FeatureCollection =
        serde_json::from_str(&raw).map_err(|source| ChipviewError::GeojsonParse {
            path: path.to_path_buf(),
            source,
        })?;

    let mut by_image: BTreeMap<String, Vec<Annotation>> = BTreeMap::new();
    let mut skipped = 0usize;

    for feature in collection.features {
        let Some(props) = feature.properties else {
            skipped += 1;
            continue;
        };
        let (Some(image_id), Some(bounds), Some(type_id)) =
            (props.image_id, props.bounds_imcoords, props.type_id)
        else {
            skipped += 1;
            continue;
        };

        let Some(bbox) = parse_bounds(&bounds) else {
            skipped += 1;
            continue;
        };

        by_image.entry(image_id).or_default().push(Annotation {
            bbox,
            class_id: type_id,
        });
    }

    if skipped > 0 {
        warn!(
            "skipped {skipped} unusable feature(s) in {}",
            path.display()
        );
    }

    Ok(by_image)
}

/// Parse an `xmin,ymin,xmax,ymax` bounds string. Returns `None` for
/// malformed, non-finite or unordered bounds.
fn parse_bounds(raw: &str) -> Option<BBox<Pixel>> {
    let mut parts = raw.split(',').map(|part| part.trim().parse::<f64>());

    let xmin = parts.next()?.ok()?;
    let ymin = parts.next()?.ok()?;
    let xmax = parts.next()?.ok()?;
    let ymax = parts.next()?.ok()?;
    if parts.next().is_some() {
        return None;
    }

    let bbox = BBox::from_xyxy(xmin, ymin, xmax, ymax);
    if !bbox.is_finite() || !bbox.is_ordered() {
        return None;
    }

    Some(bbox)
}
