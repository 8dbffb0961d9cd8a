use async_trait::async_trait;
use ::image::codecs::ico::{IcoEncoder, IcoFrame};
use ::image::codecs::jpeg::JpegEncoder;
use ::image::imageops::FilterType;
use ::image::{DynamicImage, ExtendedColorType, ImageFormat, Rgb, RgbImage, Rgba};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{ensure_input, run_blocking, Converter, StagedOutput};
use crate::category::MediaCategory;
use crate::error::{FileConError, Result};
use crate::options::ConversionOptions;

/// Square sizes embedded in every ICO output, largest first
pub const ICO_SIZES: [u32; 4] = [256, 128, 64, 32];

/// Image conversion backed by the `image` crate
#[derive(Debug, Default)]
pub struct ImageConverter;

impl ImageConverter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Converter for ImageConverter {
    fn category(&self) -> MediaCategory {
        MediaCategory::Images
    }

    async fn convert(
        &self,
        input_path: &Path,
        output_path: &Path,
        options: &ConversionOptions,
    ) -> Result<()> {
        ensure_input(input_path)?;

        let format_name = options.target_format(MediaCategory::Images);
        let format = ImageFormat::from_extension(&format_name)
            .filter(|_| MediaCategory::Images.supports_target(&format_name))
            .ok_or_else(|| FileConError::UnsupportedFormat(format_name.clone()))?;
        let quality = options.quality();

        let staged = StagedOutput::new(input_path, output_path)?;
        let input: PathBuf = input_path.to_path_buf();
        let staging: PathBuf = staged.path().to_path_buf();
        run_blocking(move || convert_image(&input, &staging, format, quality)).await?;
        staged.commit()?;

        info!("Converted image {} -> {}", input_path.display(), output_path.display());
        Ok(())
    }
}

fn convert_image(input: &Path, output: &Path, format: ImageFormat, quality: u8) -> Result<()> {
    let img = ::image::open(input)?;
    debug!(
        "Decoded {} ({}x{}, {:?})",
        input.display(),
        img.width(),
        img.height(),
        img.color()
    );

    match format {
        ImageFormat::Ico => write_ico(&img, output),
        ImageFormat::Jpeg => {
            let flattened = flatten_alpha(&img);
            let mut writer = BufWriter::new(File::create(output)?);
            flattened.write_with_encoder(JpegEncoder::new_with_quality(&mut writer, quality))?;
            writer.flush()?;
            Ok(())
        }
        ImageFormat::Bmp => {
            flatten_alpha(&img).save_with_format(output, format)?;
            Ok(())
        }
        ImageFormat::WebP => {
            // The WebP encoder only takes 8-bit RGB(A)
            let img = if img.color().has_alpha() {
                DynamicImage::ImageRgba8(img.to_rgba8())
            } else {
                DynamicImage::ImageRgb8(img.to_rgb8())
            };
            img.save_with_format(output, format)?;
            Ok(())
        }
        _ => {
            img.save_with_format(output, format)?;
            Ok(())
        }
    }
}

/// Composite any alpha channel over white, yielding an opaque RGB image
pub fn flatten_alpha(img: &DynamicImage) -> DynamicImage {
    if !img.color().has_alpha() {
        return DynamicImage::ImageRgb8(img.to_rgb8());
    }

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let flattened = RgbImage::from_fn(width, height, |x, y| {
        let Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
        let alpha = a as u16;
        let blend = |c: u8| ((c as u16 * alpha + 255 * (255 - alpha)) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    });
    DynamicImage::ImageRgb8(flattened)
}

/// Write a multi-resolution icon holding every size in [`ICO_SIZES`]
fn write_ico(img: &DynamicImage, output: &Path) -> Result<()> {
    let buffers: Vec<(u32, Vec<u8>)> = ICO_SIZES
        .iter()
        .map(|&size| {
            let resized = img.resize_exact(size, size, FilterType::Lanczos3).to_rgba8();
            (size, resized.into_raw())
        })
        .collect();

    let frames = buffers
        .iter()
        .map(|(size, raw)| IcoFrame::as_png(raw, *size, *size, ExtendedColorType::Rgba8))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut writer = BufWriter::new(File::create(output)?);
    IcoEncoder::new(&mut writer).encode_images(&frames)?;
    writer.flush()?;
    Ok(())
}
