//! YOLO label serialization for one chip.
//!
//! Each retained box becomes one line of `<class_id> <cx> <cy> <w> <h>`
//! with coordinates normalized by the chip dimensions. The class id is the
//! original dictionary id; `rewrite_labels.sh` maps those to contiguous
//! training ids after the fact.

use crate::classes::ClassDict;
use crate::geom::{BBox, Pixel};

/// Serialize a chip's boxes as YOLO label text. Boxes whose class is not
/// in the (already filtered) dictionary are omitted; the result is empty
/// when nothing is retained.
pub fn format_labels(
    boxes: &[BBox<Pixel>],
    classes: &[i64],
    dict: &ClassDict,
    chip_width: u32,
    chip_height: u32,
) -> String {
    let mut out = String::new();

    for (bbox, class_id) in boxes.iter().zip(classes) {
        if !dict.contains(*class_id) {
            continue;
        }

        let (cx, cy, w, h) = bbox
            .to_normalized(chip_width as f64, chip_height as f64)
            .to_cxcywh();

        out.push_str(&format!(
            "{} {:.6} {:.6} {:.6} {:.6}\n",
            class_id, cx, cy, w, h
        ));
    }

    out
}
