//! Chipview: chips remote satellite imagery into YOLO training sets.
//!
//! Chipview fetches an xView-style dataset (large images plus bounding-box
//! annotations) from a content-addressed LFS remote, tiles every annotated
//! image into fixed-size training chips, writes one YOLO label file per
//! chip, and emits the manifest artifacts downstream training tooling
//! expects (class pbtxt, label-rewrite script, label string, training
//! list).
//!
//! # Modules
//!
//! - [`lfs`]: content-addressed fetch layer (manifests, objects, cache)
//! - [`dataset`]: annotation loading, image discovery and chipping
//! - [`classes`]: class dictionary resolution and filtering
//! - [`convert`]: the per-chip processing loop
//! - [`manifest`]: the four manifest artifact writers
//! - [`error`]: error types for chipview operations

pub mod classes;
pub mod convert;
pub mod dataset;
pub mod error;
pub mod geom;
pub mod lfs;
pub mod manifest;
pub mod yolo;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use log::info;

pub use error::ChipviewError;

/// The chipview CLI application.
#[derive(Parser)]
#[command(name = "chipview")]
#[command(version, author, about)]
struct Cli {
    /// LFS repository URL hosting the source imagery.
    url: String,

    /// Data ref to resolve within the repository.
    #[arg(short = 'r', long = "ref", default_value = "master")]
    reference: String,

    /// Comma-separated image ids to include; all images when omitted.
    #[arg(short, long)]
    images: Option<String>,

    /// Class dictionary source (URI, local path, or path inside the
    /// checkout tree); the bundled xView dictionary when omitted.
    #[arg(short, long)]
    dictionary: Option<String>,

    /// Comma-separated class ids to keep; all classes when omitted.
    #[arg(short, long)]
    classes: Option<String>,

    /// Edge length of the square training chips.
    #[arg(short = 's', long, default_value_t = 544, value_parser = clap::value_parser!(u32).range(1..))]
    chip_size: u32,

    /// Image format for written chips (png, jpg, ...).
    #[arg(short = 't', long, default_value = "png")]
    chip_format: String,

    /// Skip chips that end up with no labelled boxes.
    #[arg(short, long)]
    prune_empty: bool,

    /// Working directory for manifest outputs and the data checkout;
    /// a kept temporary directory when omitted.
    #[arg(short, long)]
    workspace: Option<PathBuf>,
}

/// Run the chipview CLI.
///
/// This is the main entry point, called from `main.rs`.
pub fn run() -> Result<(), ChipviewError> {
    let cli = Cli::parse();

    // Fail fast on a chip format nothing can encode, before any network
    // traffic happens.
    if image::ImageFormat::from_extension(&cli.chip_format)
        .filter(image::ImageFormat::can_write)
        .is_none()
    {
        return Err(ChipviewError::UnsupportedChipFormat(cli.chip_format));
    }

    let class_filter = parse_class_filter(cli.classes.as_deref())?;
    let image_filter = parse_image_filter(cli.images.as_deref());
    if !image_filter.is_empty() {
        info!("using images: {image_filter:?}");
    }

    let remote = lfs::LfsRemote::parse(&cli.url, &cli.reference)?;

    let workspace = resolve_workspace(cli.workspace.as_deref())?;
    info!("workspace: {}", workspace.display());

    let client = lfs::LfsClient::new(remote, workspace.join("lfs"))?;

    info!("loading data from {} @ {}", cli.url, cli.reference);
    let data_manifest = client.manifest()?;
    let tree = client.checkout(&data_manifest, |path| {
        keep_entry(path, &image_filter, cli.dictionary.as_deref())
    })?;
    info!("lfs working directory: {}", tree.display());

    let mut dict = classes::resolve_dictionary(cli.dictionary.as_deref(), &client, &tree)?;
    if let Some(filter) = &class_filter {
        dict.retain_ids(filter);
        info!("class filter keeps {} class(es)", dict.len());
    }

    let tasks = dataset::load_tasks(&tree, &image_filter)?;
    let opts = convert::ConvertOptions {
        chip_size: cli.chip_size,
        chip_format: cli.chip_format,
        prune_empty: cli.prune_empty,
    };
    let summary = convert::convert_dataset(&tasks, &dict, &tree, &opts)?;

    info!("total boxes: {}", summary.total_boxes);
    info!("chips: {}", summary.chips_written);
    info!("skipped chips: {}", summary.chips_skipped);

    manifest::write_all(&workspace, &summary, &dict, &tree.join("labels"))?;

    Ok(())
}

/// Parse the `--classes` filter into a set of class ids.
fn parse_class_filter(raw: Option<&str>) -> Result<Option<BTreeSet<i64>>, ChipviewError> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    let mut ids = BTreeSet::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let id = part
            .parse::<i64>()
            .map_err(|_| ChipviewError::ClassFilterInvalid {
                value: raw.to_string(),
                message: format!("'{part}' is not an integer class id"),
            })?;
        ids.insert(id);
    }

    if ids.is_empty() {
        return Err(ChipviewError::ClassFilterInvalid {
            value: raw.to_string(),
            message: "filter names no class ids".to_string(),
        });
    }

    Ok(Some(ids))
}

fn parse_image_filter(raw: Option<&str>) -> BTreeSet<String> {
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Decide whether a manifest entry needs to be materialized: annotation
/// GeoJSON always, a tree-relative dictionary when one is named, and
/// otherwise every file unless an image filter narrows the set.
fn keep_entry(path: &str, image_filter: &BTreeSet<String>, dictionary: Option<&str>) -> bool {
    if path.ends_with(".geojson") {
        return true;
    }
    if dictionary == Some(path) {
        return true;
    }
    if image_filter.is_empty() {
        return true;
    }
    Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .map(|name| image_filter.contains(name))
        .unwrap_or(false)
}

fn resolve_workspace(path: Option<&Path>) -> Result<PathBuf, ChipviewError> {
    match path {
        Some(path) => {
            fs::create_dir_all(path)?;
            Ok(path.to_path_buf())
        }
        None => {
            let dir = tempfile::Builder::new().prefix("yolo-").tempdir()?;
            Ok(dir.keep())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_filter_parses_comma_separated_ids() {
        let ids = parse_class_filter(Some("73, 18,86"))
            .expect("valid filter")
            .expect("filter present");
        assert_eq!(ids, BTreeSet::from([18, 73, 86]));
    }

    #[test]
    fn class_filter_rejects_non_numeric_ids() {
        let err = parse_class_filter(Some("73,building")).unwrap_err();
        assert!(matches!(err, ChipviewError::ClassFilterInvalid { .. }));
    }

    #[test]
    fn class_filter_rejects_empty_value() {
        let err = parse_class_filter(Some(" , ")).unwrap_err();
        assert!(matches!(err, ChipviewError::ClassFilterInvalid { .. }));
    }

    #[test]
    fn image_filter_trims_and_drops_empties() {
        let filter = parse_image_filter(Some("104.tif, 5.tif ,"));
        assert_eq!(
            filter,
            BTreeSet::from(["104.tif".to_string(), "5.tif".to_string()])
        );
        assert!(parse_image_filter(None).is_empty());
    }

    #[test]
    fn keep_entry_always_takes_geojson_and_dictionary() {
        let filter = BTreeSet::from(["104.tif".to_string()]);
        assert!(keep_entry("xview_train.geojson", &filter, None));
        assert!(keep_entry("dicts/custom.txt", &filter, Some("dicts/custom.txt")));
        assert!(!keep_entry("dicts/other.txt", &filter, Some("dicts/custom.txt")));
    }

    #[test]
    fn keep_entry_honors_image_filter() {
        let filter = BTreeSet::from(["104.tif".to_string()]);
        assert!(keep_entry("train_images/104.tif", &filter, None));
        assert!(!keep_entry("train_images/105.tif", &filter, None));

        // no filter keeps everything
        assert!(keep_entry("train_images/105.tif", &BTreeSet::new(), None));
    }
}
