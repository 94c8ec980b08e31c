use std::path::Path;

use image::DynamicImage;

use crate::{
    EdgeProfile, EdgeThresholds,
    error::{ForensicsError, Result},
    image_utils::{edge_map, open_image, to_gray},
};

/// Coarse edge signal: records that a Canny edge map could be computed and
/// its shape. It carries no density or location information and is never
/// used on its own to flag an image.
pub struct EdgeProfileAnalyzer {
    thresholds: EdgeThresholds,
}

pub struct EdgeStats {
    pub height: u32,
    pub width: u32,
    pub edge_pixels: u64,
}

impl EdgeProfileAnalyzer {
    pub fn new(thresholds: EdgeThresholds) -> Self {
        Self { thresholds }
    }

    pub fn compute(&self, image: &DynamicImage) -> Result<EdgeStats> {
        if image.width() == 0 || image.height() == 0 {
            return Err(ForensicsError::EdgeComputeFailure(
                "image has no pixels".into(),
            ));
        }

        let edges = edge_map(&to_gray(image), self.thresholds);
        let (width, height) = edges.dimensions();
        let edge_pixels = edges.pixels().filter(|p| p[0] > 0).count() as u64;

        Ok(EdgeStats {
            height,
            width,
            edge_pixels,
        })
    }

    pub fn analyze(&self, image: &DynamicImage) -> EdgeProfile {
        match self.compute(image) {
            Ok(stats) => EdgeProfile::Computed {
                edges_detected: true,
                shape: (stats.height, stats.width),
            },
            Err(err) => EdgeProfile::failed(err.to_string()),
        }
    }

    pub fn analyze_file<P: AsRef<Path>>(&self, path: P) -> EdgeProfile {
        match open_image(path) {
            Ok(image) => self.analyze(&image),
            Err(err) => EdgeProfile::failed(err.to_string()),
        }
    }
}

impl Default for EdgeProfileAnalyzer {
    fn default() -> Self {
        Self::new(EdgeThresholds::PROFILE)
    }
}
