//! Client-side image preparation
//!
//! Shrinks an image to fit the configured bounds and re-encodes it in the
//! configured format before it is uploaded. Images are never enlarged.

use std::io::Cursor;
use std::path::Path;

use image::DynamicImage;
use image::imageops::FilterType;
use tracing::debug;

use crate::api::ImageFile;
use crate::config::{ImageConstraints, ImageFormat};
use crate::error::{Error, Result};

/// Decode, convert to RGB, fit within bounds and re-encode
pub fn prepare_upload(file: &ImageFile, constraints: &ImageConstraints) -> Result<ImageFile> {
    let decoded = image::load_from_memory(&file.bytes).map_err(|e| {
        Error::ImageProcessing(format!("Failed to decode {}: {}", file.file_name, e))
    })?;

    let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());
    let (width, height) = (rgb.width(), rgb.height());

    let fitted = if width > constraints.max_width || height > constraints.max_height {
        rgb.resize(constraints.max_width, constraints.max_height, FilterType::Lanczos3)
    } else {
        rgb
    };

    debug!(
        from = %format!("{}x{}", width, height),
        to = %format!("{}x{}", fitted.width(), fitted.height()),
        format = %constraints.format,
        "Prepared image"
    );

    let mut output = Cursor::new(Vec::new());
    fitted
        .write_to(&mut output, encoder_format(constraints.format))
        .map_err(|e| Error::ImageProcessing(format!("Failed to encode image: {}", e)))?;

    let file_name = Path::new(&file.file_name)
        .with_extension(constraints.format.extension())
        .to_string_lossy()
        .into_owned();

    Ok(ImageFile {
        file_name,
        mime_type: constraints.format.mime_type().to_string(),
        bytes: output.into_inner(),
    })
}

fn encoder_format(format: ImageFormat) -> image::ImageFormat {
    match format {
        ImageFormat::Jpeg => image::ImageFormat::Jpeg,
        ImageFormat::Png => image::ImageFormat::Png,
        ImageFormat::WebP => image::ImageFormat::WebP,
    }
}
