//! Manifest artifacts derived from a conversion run.
//!
//! Four files land in the workspace after the chip loop: the protobuf-text
//! class list (`xview.pbtxt`), the label-rewrite script
//! (`rewrite_labels.sh`), the comma-joined label string
//! (`label_string.txt`) and the training file list (`training_list.txt`).
//! All four are a deterministic function of the class counter and the
//! written image paths.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::classes::ClassDict;
use crate::convert::ConvertSummary;
use crate::error::ChipviewError;

/// A class that actually occurred in the run, keyed by its original
/// dictionary id. `train_id` is the contiguous 0-based id the rewrite
/// script maps it to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinalClass {
    pub id: i64,
    pub name: String,
    pub train_id: usize,
    pub count: u64,
}

/// Classes that occurred in the run and survive the dictionary filter, in
/// ascending original-id order with contiguous training ids assigned.
pub fn final_class_map(summary: &ConvertSummary, dict: &ClassDict) -> Vec<FinalClass> {
    summary
        .class_counts
        .iter()
        .filter_map(|(id, count)| {
            dict.get(*id).map(|name| (*id, name.to_string(), *count))
        })
        .enumerate()
        .map(|(train_id, (id, name, count))| FinalClass {
            id,
            name,
            train_id,
            count,
        })
        .collect()
}

/// Write all four manifest artifacts into `workspace`.
pub fn write_all(
    workspace: &Path,
    summary: &ConvertSummary,
    dict: &ClassDict,
    labels_dir: &Path,
) -> Result<(), ChipviewError> {
    let final_map = final_class_map(summary, dict);

    write_class_pbtxt(workspace, &final_map)?;
    write_rewrite_script(workspace, &final_map, labels_dir)?;
    write_label_string(workspace, &final_map)?;
    write_training_list(workspace, &summary.training_images)?;

    Ok(())
}

/// `xview.pbtxt`: one protobuf-text item per final class, ids 1-based.
/// Also logs the per-class occurrence table.
pub fn write_class_pbtxt(
    workspace: &Path,
    final_map: &[FinalClass],
) -> Result<PathBuf, ChipviewError> {
    info!("generating xview.pbtxt");

    let mut body = String::new();
    for class in final_map {
        info!(" {:>3} {:<25} {:>5}", class.id, class.name, class.count);
        body.push_str(&format!(
            "item {{\n  id: {}\n  name: {}\n}}\n",
            class.train_id + 1,
            single_quoted(&class.name)
        ));
    }

    let path = workspace.join("xview.pbtxt");
    fs::write(&path, body)?;
    Ok(path)
}

/// `rewrite_labels.sh`: sed commands mapping each original class id at line
/// start to its contiguous training id across the written label files.
pub fn write_rewrite_script(
    workspace: &Path,
    final_map: &[FinalClass],
    labels_dir: &Path,
) -> Result<PathBuf, ChipviewError> {
    info!("generating rewrite_labels.sh");

    let mut body = String::from("#!/bin/bash\n");
    for class in final_map {
        body.push_str(&format!(
            "sed -i \"s#^{} #{} #\" {}/*.txt\n",
            class.id,
            class.train_id,
            labels_dir.display()
        ));
    }

    let path = workspace.join("rewrite_labels.sh");
    fs::write(&path, body)?;
    make_executable(&path)?;
    Ok(path)
}

/// `label_string.txt`: the final class names joined by commas.
pub fn write_label_string(
    workspace: &Path,
    final_map: &[FinalClass],
) -> Result<PathBuf, ChipviewError> {
    let label_string = final_map
        .iter()
        .map(|class| class.name.as_str())
        .collect::<Vec<_>>()
        .join(",");
    info!("your label string is: {label_string}");

    let path = workspace.join("label_string.txt");
    fs::write(&path, label_string)?;
    Ok(path)
}

/// `training_list.txt`: newline-joined paths of all written chip images.
pub fn write_training_list(
    workspace: &Path,
    training_images: &[PathBuf],
) -> Result<PathBuf, ChipviewError> {
    info!("generating training_list.txt");

    let body = training_images
        .iter()
        .map(|path| path.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("\n");

    let path = workspace.join("training_list.txt");
    fs::write(&path, body)?;
    Ok(path)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<(), ChipviewError> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<(), ChipviewError> {
    Ok(())
}

fn single_quoted(raw: &str) -> String {
    format!("'{}'", raw.replace('\\', "\\\\").replace('\'', "\\'"))
}
