use std::path::Path;

use image::{
    DynamicImage, GrayImage, ImageFormat, ImageReader, Luma, RgbImage, imageops::FilterType,
};
use imageproc::{edges::canny, filter::separable_filter_equal};
use ndarray::Array2;

use crate::{config::EdgeThresholds, error::Result};

/// 5-tap binomial kernel; the separable form of a 5x5 Gaussian with sigma ~1.1.
const GAUSSIAN_5: [f32; 5] = [0.0625, 0.25, 0.375, 0.25, 0.0625];

/// Decodes the image at `path`, choosing the decoder from the file content
/// rather than its extension. Also returns the detected container format.
pub fn open_image_with_format<P: AsRef<Path>>(
    path: P,
) -> Result<(DynamicImage, Option<ImageFormat>)> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let format = reader.format();
    Ok((reader.decode()?, format))
}

pub fn open_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
    open_image_with_format(path).map(|(image, _)| image)
}

/// Saves `image` in the format implied by the extension of `path`. Names with
/// no usable extension are written in `detected`, or PNG when that is unknown.
pub fn save_image<P: AsRef<Path>>(
    image: &DynamicImage,
    path: P,
    detected: Option<ImageFormat>,
) -> Result<()> {
    let path = path.as_ref();
    match ImageFormat::from_path(path) {
        Ok(_) => image.save(path)?,
        Err(_) => image.save_with_format(path, detected.unwrap_or(ImageFormat::Png))?,
    }
    Ok(())
}

pub fn rgb_to_gray(image: &RgbImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut gray = GrayImage::new(width, height);

    for (x, y, pixel) in image.enumerate_pixels() {
        let lum = (0.299 * pixel[0] as f64 + 0.587 * pixel[1] as f64 + 0.114 * pixel[2] as f64)
            .round()
            .clamp(0.0, 255.0) as u8;
        gray.put_pixel(x, y, Luma([lum]));
    }

    gray
}

pub fn to_gray(image: &DynamicImage) -> GrayImage {
    match image {
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        other => rgb_to_gray(&other.to_rgb8()),
    }
}

pub fn gray_to_array(image: &GrayImage) -> Array2<f64> {
    let (width, height) = image.dimensions();
    let mut arr = Array2::zeros((height as usize, width as usize));

    for (x, y, pixel) in image.enumerate_pixels() {
        arr[[y as usize, x as usize]] = pixel[0] as f64;
    }

    arr
}

pub fn gaussian_blur_5x5(image: &GrayImage) -> GrayImage {
    separable_filter_equal(image, &GAUSSIAN_5)
}

/// Binary edge map: 255 on edge pixels, 0 elsewhere.
pub fn edge_map(gray: &GrayImage, thresholds: EdgeThresholds) -> GrayImage {
    canny(gray, thresholds.low, thresholds.high)
}

/// Shrinks `image` so its longest side is at most `max_dimension`, keeping the
/// aspect ratio. Smaller images are returned unchanged.
pub fn downscale_to_fit(image: DynamicImage, max_dimension: u32) -> DynamicImage {
    let (width, height) = (image.width(), image.height());
    if width <= max_dimension && height <= max_dimension {
        return image;
    }

    let scale = (max_dimension as f64 / width as f64).min(max_dimension as f64 / height as f64);
    let new_width = ((width as f64 * scale) as u32).max(1);
    let new_height = ((height as f64 * scale) as u32).max(1);
    image.resize_exact(new_width, new_height, FilterType::Lanczos3)
}
