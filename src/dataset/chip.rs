//! Image chipping: tiling a large source image into fixed-size training
//! chips and carrying each box into the chip that overlaps it.

use image::{imageops, RgbImage};

use crate::geom::{BBox, Pixel};

use super::geojson::Annotation;

/// One fixed-size sub-image with its boxes in chip-local pixel coordinates.
/// `boxes` and `classes` are parallel.
#[derive(Clone, Debug)]
pub struct Chip {
    pub image: RgbImage,
    pub boxes: Vec<BBox<Pixel>>,
    pub classes: Vec<i64>,
}

/// Tile `image` into `chip_size`-square chips in row-major order.
///
/// Only full tiles are produced: remainder pixels at the right and bottom
/// edges are discarded, and an image smaller than the chip size yields no
/// chips. Boxes are assigned to every chip their area overlaps, clipped to
/// the chip bounds and translated into chip-local coordinates.
pub fn chip_image(image: &RgbImage, annotations: &[Annotation], chip_size: u32) -> Vec<Chip> {
    let cols = image.width() / chip_size;
    let rows = image.height() / chip_size;

    // usize arithmetic: cols * rows can exceed u32 for huge scenes at
    // small chip sizes
    let mut chips = Vec::with_capacity(cols as usize * rows as usize);
    for row in 0..rows {
        for col in 0..cols {
            let x0 = col * chip_size;
            let y0 = row * chip_size;

            let (boxes, classes) = clip_boxes_to_chip(annotations, x0, y0, chip_size);
            let chip_image = imageops::crop_imm(image, x0, y0, chip_size, chip_size).to_image();

            chips.push(Chip {
                image: chip_image,
                boxes,
                classes,
            });
        }
    }

    chips
}

/// Select the boxes overlapping the chip at `(x0, y0)`, clip them to the
/// chip and translate them into chip-local coordinates. Boxes that
/// degenerate to zero width or height are dropped by the positive-area
/// overlap test.
pub fn clip_boxes_to_chip(
    annotations: &[Annotation],
    x0: u32,
    y0: u32,
    chip_size: u32,
) -> (Vec<BBox<Pixel>>, Vec<i64>) {
    let chip_bounds: BBox<Pixel> = BBox::from_xyxy(
        x0 as f64,
        y0 as f64,
        (x0 + chip_size) as f64,
        (y0 + chip_size) as f64,
    );

    let mut boxes = Vec::new();
    let mut classes = Vec::new();

    for annotation in annotations {
        if let Some(clipped) = annotation.bbox.intersect(&chip_bounds) {
            boxes.push(clipped.translate(-(x0 as f64), -(y0 as f64)));
            classes.push(annotation.class_id);
        }
    }

    (boxes, classes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ann(xmin: f64, ymin: f64, xmax: f64, ymax: f64, class_id: i64) -> Annotation {
        Annotation {
            bbox: BBox::from_xyxy(xmin, ymin, xmax, ymax),
            class_id,
        }
    }

    fn gray(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, image::Rgb([128, 128, 128]))
    }

    #[test]
    fn tiles_are_row_major_and_full_size() {
        let image = gray(250, 130);
        let chips = chip_image(&image, &[], 100);

        // 2 columns x 1 row; the 50px and 30px remainders are discarded
        assert_eq!(chips.len(), 2);
        for chip in &chips {
            assert_eq!(chip.image.dimensions(), (100, 100));
        }
    }

    #[test]
    fn large_grids_produce_exactly_cols_times_rows_chips() {
        let image = gray(1600, 800);
        let chips = chip_image(&image, &[], 16);
        assert_eq!(chips.len(), 100 * 50);
    }

    #[test]
    fn image_smaller_than_chip_yields_nothing() {
        let image = gray(90, 200);
        assert!(chip_image(&image, &[], 100).is_empty());
    }

    #[test]
    fn box_lands_in_its_chip_with_local_coordinates() {
        let image = gray(200, 100);
        let annotations = vec![ann(130.0, 20.0, 170.0, 60.0, 73)];

        let chips = chip_image(&image, &annotations, 100);
        assert_eq!(chips.len(), 2);
        assert!(chips[0].boxes.is_empty());
        assert_eq!(chips[1].boxes.len(), 1);
        assert_eq!(chips[1].boxes[0], BBox::from_xyxy(30.0, 20.0, 70.0, 60.0));
        assert_eq!(chips[1].classes, vec![73]);
    }

    #[test]
    fn straddling_box_is_clipped_into_both_chips() {
        let annotations = vec![ann(80.0, 10.0, 120.0, 50.0, 18)];

        let (left_boxes, _) = clip_boxes_to_chip(&annotations, 0, 0, 100);
        assert_eq!(left_boxes, vec![BBox::from_xyxy(80.0, 10.0, 100.0, 50.0)]);

        let (right_boxes, _) = clip_boxes_to_chip(&annotations, 100, 0, 100);
        assert_eq!(right_boxes, vec![BBox::from_xyxy(0.0, 10.0, 20.0, 50.0)]);
    }

    #[test]
    fn box_touching_chip_edge_is_dropped() {
        // shares only the x=100 edge with the right chip
        let annotations = vec![ann(60.0, 10.0, 100.0, 50.0, 18)];

        let (right_boxes, right_classes) = clip_boxes_to_chip(&annotations, 100, 0, 100);
        assert!(right_boxes.is_empty());
        assert!(right_classes.is_empty());
    }

    #[test]
    fn box_covering_whole_chip_is_kept_and_clipped() {
        let annotations = vec![ann(-50.0, -50.0, 500.0, 500.0, 73)];

        let (boxes, _) = clip_boxes_to_chip(&annotations, 100, 100, 100);
        assert_eq!(boxes, vec![BBox::from_xyxy(0.0, 0.0, 100.0, 100.0)]);
    }

    #[test]
    fn chip_pixels_match_source_region() {
        let mut image = gray(200, 100);
        image.put_pixel(150, 40, image::Rgb([255, 0, 0]));

        let chips = chip_image(&image, &[], 100);
        assert_eq!(chips[1].image.get_pixel(50, 40), &image::Rgb([255, 0, 0]));
    }
}
