//! The per-chip processing loop: chip every queued image, write label and
//! image files in lockstep, and accumulate run statistics.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use log::debug;

use crate::classes::ClassDict;
use crate::dataset::{chip_image, ImageTask};
use crate::error::ChipviewError;
use crate::yolo::format_labels;

/// Knobs for one conversion run.
#[derive(Clone, Debug)]
pub struct ConvertOptions {
    pub chip_size: u32,
    /// File extension for written chips; validated against the encoder
    /// stack before the run starts.
    pub chip_format: String,
    pub prune_empty: bool,
}

/// What one run produced, input to the manifest writers.
#[derive(Clone, Debug, Default)]
pub struct ConvertSummary {
    /// Label lines actually written.
    pub total_boxes: u64,
    pub chips_written: u64,
    pub chips_skipped: u64,
    /// Boxes seen per class across all chips, including pruned chips and
    /// classes outside the dictionary. Reporting only.
    pub class_counts: BTreeMap<i64, u64>,
    /// Paths of every written chip image, in chip-id order.
    pub training_images: Vec<PathBuf>,
}

/// Chip every task and write `labels/<id>.txt` + `images/<id>.<fmt>` pairs
/// under `out_root`.
///
/// Chip ids are zero-padded six-digit decimals, sequential across the whole
/// run; pruned chips do not consume ids, so every id on disk has both
/// files.
pub fn convert_dataset(
    tasks: &[ImageTask],
    dict: &ClassDict,
    out_root: &Path,
    opts: &ConvertOptions,
) -> Result<ConvertSummary, ChipviewError> {
    let images_dir = out_root.join("images");
    let labels_dir = out_root.join("labels");
    fs::create_dir_all(&images_dir)?;
    fs::create_dir_all(&labels_dir)?;

    let bar = ProgressBar::new(tasks.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut summary = ConvertSummary::default();
    let mut next_chip: u64 = 0;

    for task in tasks {
        bar.set_message(task.image_id.clone());

        let source = image::open(&task.path)
            .map_err(|source| ChipviewError::ImageRead {
                path: task.path.clone(),
                source,
            })?
            .to_rgb8();

        let chips = chip_image(&source, &task.annotations, opts.chip_size);
        debug!("{}: {} chip(s)", task.image_id, chips.len());

        for chip in &chips {
            for class_id in &chip.classes {
                *summary.class_counts.entry(*class_id).or_insert(0) += 1;
            }

            let labels = format_labels(
                &chip.boxes,
                &chip.classes,
                dict,
                opts.chip_size,
                opts.chip_size,
            );

            if labels.is_empty() && opts.prune_empty {
                summary.chips_skipped += 1;
                continue;
            }

            let chip_id = format!("{next_chip:06}");
            let label_path = labels_dir.join(format!("{chip_id}.txt"));
            let image_path = images_dir.join(format!("{chip_id}.{}", opts.chip_format));

            fs::write(&label_path, &labels)?;
            chip.image
                .save(&image_path)
                .map_err(|source| ChipviewError::ImageWrite {
                    path: image_path.clone(),
                    source,
                })?;

            summary.total_boxes += labels.lines().count() as u64;
            summary.training_images.push(image_path);
            summary.chips_written += 1;
            next_chip += 1;
        }

        bar.inc(1);
    }

    bar.finish_and_clear();
    Ok(summary)
}
