use image::{Rgb, RgbImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};

use crate::{FlatPatchRecord, Region};

#[derive(Debug, Clone)]
pub struct VisualizationConfig {
    pub border_color: Rgb<u8>,
    pub border_thickness: u32,
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            border_color: Rgb([255, 0, 0]),
            border_thickness: 2,
        }
    }
}

pub struct Visualizer {
    config: VisualizationConfig,
}

impl Visualizer {
    pub fn new() -> Self {
        Self {
            config: VisualizationConfig::default(),
        }
    }

    pub fn with_config(config: VisualizationConfig) -> Self {
        Self { config }
    }

    /// Copy of `original` with an unfilled rectangle around each flat tile.
    /// The outline spans `x..=x + patch_size`, so its right and bottom strokes
    /// fall on the first pixel of the neighbouring tile.
    pub fn visualize_flat_patches(
        &self,
        original: &RgbImage,
        patches: &[FlatPatchRecord],
        patch_size: u32,
    ) -> RgbImage {
        let mut vis = original.clone();

        for patch in patches {
            let region = Region {
                x: patch.x,
                y: patch.y,
                width: patch_size + 1,
                height: patch_size + 1,
            };
            self.draw_region_border(&mut vis, &region, self.config.border_color);
        }

        vis
    }

    /// Strokes grow inward from the region's outer edge; drawing is clipped
    /// to the canvas.
    pub fn draw_region_border(&self, image: &mut RgbImage, region: &Region, color: Rgb<u8>) {
        for t in 0..self.config.border_thickness {
            if region.width <= 2 * t || region.height <= 2 * t {
                break;
            }

            let rect = Rect::at((region.x + t) as i32, (region.y + t) as i32)
                .of_size(region.width - 2 * t, region.height - 2 * t);
            draw_hollow_rect_mut(image, rect, color);
        }
    }
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new()
    }
}
