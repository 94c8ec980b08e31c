//! Document region extraction.
//!
//! Finds the photographed document by its outline and crops the color image to
//! the bounding box of that outline:
//!
//! 1. grayscale, 5x5 Gaussian blur
//! 2. Canny edge map with the crop thresholds
//! 3. external (top-level outer) contours of the edge map
//! 4. contour with the largest enclosed area; on equal areas the contour
//!    discovered first in the raster scan (top to bottom, left to right) wins
//! 5. axis-aligned bounding box, inclusive of the contour's extreme points
//!
//! The source file is never modified: [`RegionExtractor::extract_to_file`]
//! writes the crop to a separate path.

use std::path::Path;

use image::DynamicImage;
use imageproc::{
    contours::{BorderType, Contour, find_contours},
    geometry::contour_area,
};
use log::debug;

use crate::{
    EdgeThresholds, Region,
    error::{ForensicsError, Result},
    image_utils::{edge_map, gaussian_blur_5x5, open_image_with_format, save_image, to_gray},
};

pub struct RegionExtractor {
    thresholds: EdgeThresholds,
}

impl RegionExtractor {
    pub fn new(thresholds: EdgeThresholds) -> Self {
        Self { thresholds }
    }

    /// Bounding box of the document outline.
    pub fn locate(&self, image: &DynamicImage) -> Result<Region> {
        let blurred = gaussian_blur_5x5(&to_gray(image));
        let edges = edge_map(&blurred, self.thresholds);

        let contours = find_contours::<i32>(&edges);
        let largest = Self::largest_external(&contours).ok_or(ForensicsError::NoContentFound)?;

        let region = Self::bounding_box(largest).ok_or(ForensicsError::NoContentFound)?;
        debug!(
            "document region {}x{} at ({}, {}) out of {} contours",
            region.width,
            region.height,
            region.x,
            region.y,
            contours.len()
        );
        Ok(region)
    }

    pub fn extract(&self, image: &DynamicImage) -> Result<DynamicImage> {
        let region = self.locate(image)?;
        Ok(image.crop_imm(region.x, region.y, region.width, region.height))
    }

    /// Crops the image at `source` and saves the result to `destination`,
    /// encoded according to the destination's extension, or in the source's
    /// format when the destination has none. Fails with
    /// `InvalidParameter` if both paths are the same file.
    pub fn extract_to_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        source: P,
        destination: Q,
    ) -> Result<Region> {
        let (source, destination) = (source.as_ref(), destination.as_ref());
        if source == destination {
            return Err(ForensicsError::InvalidParameter(format!(
                "refusing to overwrite source image {}",
                source.display()
            )));
        }

        let (image, format) = open_image_with_format(source)?;
        let region = self.locate(&image)?;
        let cropped = image.crop_imm(region.x, region.y, region.width, region.height);
        save_image(&cropped, destination, format)?;
        Ok(region)
    }

    fn largest_external(contours: &[Contour<i32>]) -> Option<&Contour<i32>> {
        let mut best: Option<(&Contour<i32>, f64)> = None;

        for contour in contours
            .iter()
            .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        {
            let area = contour_area(&contour.points).abs();
            // Strict comparison keeps the earliest contour on ties.
            if best.is_none_or(|(_, best_area)| area > best_area) {
                best = Some((contour, area));
            }
        }

        best.map(|(contour, _)| contour)
    }

    fn bounding_box(contour: &Contour<i32>) -> Option<Region> {
        let first = contour.points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);

        for point in &contour.points {
            min_x = min_x.min(point.x);
            min_y = min_y.min(point.y);
            max_x = max_x.max(point.x);
            max_y = max_y.max(point.y);
        }

        Some(Region {
            x: min_x.max(0) as u32,
            y: min_y.max(0) as u32,
            width: (max_x - min_x + 1) as u32,
            height: (max_y - min_y + 1) as u32,
        })
    }
}

impl Default for RegionExtractor {
    fn default() -> Self {
        Self::new(EdgeThresholds::CROP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn document_on_table(width: u32, height: u32, doc: Region) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let inside = x >= doc.x && x < doc.x + doc.width && y >= doc.y && y < doc.y + doc.height;
            if inside { Rgb([235, 235, 225]) } else { Rgb([40, 30, 20]) }
        })
    }

    #[test]
    fn test_uniform_image_has_no_content() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(50, 50, Rgb([90, 90, 90])));
        let err = RegionExtractor::default().extract(&image).unwrap_err();
        assert!(matches!(err, ForensicsError::NoContentFound));
    }

    #[test]
    fn test_crop_tracks_document_bounds() {
        let doc = Region { x: 30, y: 20, width: 40, height: 40 };
        let image = DynamicImage::ImageRgb8(document_on_table(100, 80, doc));

        let region = RegionExtractor::default().locate(&image).unwrap();
        assert!(region.x.abs_diff(doc.x) <= 3, "{region:?}");
        assert!(region.y.abs_diff(doc.y) <= 3, "{region:?}");
        assert!((36..=46).contains(&region.width), "{region:?}");
        assert!((36..=46).contains(&region.height), "{region:?}");
    }

    #[test]
    fn test_cropping_twice_never_grows() {
        let doc = Region { x: 15, y: 10, width: 50, height: 35 };
        let image = DynamicImage::ImageRgb8(document_on_table(90, 60, doc));
        let extractor = RegionExtractor::default();

        let once = extractor.extract(&image).unwrap();
        assert!(once.width() <= image.width() && once.height() <= image.height());

        match extractor.extract(&once) {
            Ok(twice) => {
                assert!(twice.width() <= once.width());
                assert!(twice.height() <= once.height());
            }
            Err(ForensicsError::NoContentFound) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_largest_document_wins() {
        let mut canvas = document_on_table(160, 100, Region { x: 70, y: 10, width: 80, height: 80 });
        for y in 10..30 {
            for x in 10..30 {
                canvas.put_pixel(x, y, Rgb([235, 235, 225]));
            }
        }

        let region = RegionExtractor::default()
            .locate(&DynamicImage::ImageRgb8(canvas))
            .unwrap();
        assert!(region.x >= 60, "{region:?}");
        assert!(region.width >= 70, "{region:?}");
    }

    #[test]
    fn test_equal_areas_keep_first_found() {
        let mut canvas = RgbImage::from_pixel(120, 100, Rgb([40, 30, 20]));
        for (ox, oy) in [(70, 60), (15, 10)] {
            for y in oy..oy + 25 {
                for x in ox..ox + 25 {
                    canvas.put_pixel(x, y, Rgb([235, 235, 225]));
                }
            }
        }

        let region = RegionExtractor::default()
            .locate(&DynamicImage::ImageRgb8(canvas))
            .unwrap();
        assert!(region.y < 40, "expected the upper document, got {region:?}");
    }

    #[test]
    fn test_extract_to_file_keeps_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("receipt.png");
        let destination = dir.path().join("receipt_cropped.png");
        let doc = Region { x: 20, y: 20, width: 30, height: 30 };
        document_on_table(80, 80, doc).save(&source).unwrap();

        let extractor = RegionExtractor::default();
        let region = extractor.extract_to_file(&source, &destination).unwrap();

        let original = image::open(&source).unwrap();
        let cropped = image::open(&destination).unwrap();
        assert_eq!((original.width(), original.height()), (80, 80));
        assert_eq!((cropped.width(), cropped.height()), (region.width, region.height));

        let err = extractor.extract_to_file(&source, &source).unwrap_err();
        assert!(matches!(err, ForensicsError::InvalidParameter(_)));
    }
}
