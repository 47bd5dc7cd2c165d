//! # 解码与变换流水线模块
//!
//! ## 设计思路
//!
//! 将“字节 → 图像 → 缩放图 → 亮度图”的过程集中管理，并在关键节点增加资源上限控制。
//! 优先做尺寸检查，再进行完整解码，降低恶意输入触发高内存开销的风险。
//!
//! ## 实现思路
//!
//! 1. 猜测格式并读取 header 尺寸
//! 2. 按像素/内存上限快速拒绝
//! 3. 完整解码
//! 4. 按固定宽度等比缩放（默认 Lanczos3，经 `fast_image_resize`）
//! 5. BT.601 加权转换为 16 位亮度
//!
//! ## 亮度公式
//!
//! 通道先扩展到 16 位（`v * 257`），再按整数运算
//! `Y = (299·R + 587·G + 114·B + 500) / 1000`。
//! 权重之和恰为 1000，因此 R=G=B=v 时 Y=v，灰度化是幂等的。Alpha 通道不参与计算。

use fast_image_resize as fr;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageBuffer, Luma, Rgba};
use std::io::Cursor;

use super::source::{Gray16Image, PreparedPreview};
use super::{ImageConfig, ImageError};

const LUMA_WEIGHT_R: u64 = 299;
const LUMA_WEIGHT_G: u64 = 587;
const LUMA_WEIGHT_B: u64 = 114;
const LUMA_WEIGHT_SUM: u64 = 1000;

/// 使用默认资源上限解码图片。
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, ImageError> {
    decode_with_limits(bytes, &ImageConfig::default())
}

/// 解码图片，并在完整解码前后各做一次像素与内存上限校验。
pub fn decode_with_limits(bytes: &[u8], config: &ImageConfig) -> Result<DynamicImage, ImageError> {
    image::guess_format(bytes)
        .map_err(|e| ImageError::Decode(format!("不支持的图片格式：{}", e)))?;

    let (header_width, header_height) = inspect_dimensions_from_memory(bytes)?;
    validate_pixel_limits(config, header_width, header_height)?;
    validate_decoded_memory_limits(config, header_width, header_height)?;

    let decoded = image::load_from_memory(bytes)
        .map_err(|e| ImageError::Decode(format!("图片解码失败：{}", e)))?;

    let (width, height) = decoded.dimensions();
    validate_pixel_limits(config, width, height)?;
    validate_decoded_memory_limits(config, width, height)?;

    Ok(decoded)
}

/// 按目标宽度等比缩放（Lanczos3）。
pub fn scale(src: &DynamicImage, target_width: u32) -> Result<DynamicImage, ImageError> {
    scale_with_filter(src, target_width, FilterType::Lanczos3)
}

/// 按目标宽度等比缩放，输出 RGBA8。
///
/// 空图（宽或高为 0）直接返回空图；非空图的目标宽度为 0 时返回 `InvalidDimension`。
pub fn scale_with_filter(
    src: &DynamicImage,
    target_width: u32,
    filter: FilterType,
) -> Result<DynamicImage, ImageError> {
    let (width, height) = src.dimensions();
    if width == 0 || height == 0 {
        return Ok(DynamicImage::new_rgba8(0, 0));
    }

    let (target_width, target_height) = scaled_dimensions(width, height, target_width)?;

    log::debug!(
        "🧩 等比缩放：{}x{} -> {}x{}（filter={:?}）",
        width,
        height,
        target_width,
        target_height,
        filter
    );

    match resize_with_fast_image_resize(src, target_width, target_height, filter) {
        Ok(resized) => Ok(resized),
        Err(err) => {
            log::warn!("⚠️ fast_image_resize 缩放失败，回退 image::resize_exact：{}", err);
            Ok(DynamicImage::ImageRgba8(
                src.resize_exact(target_width, target_height, filter).to_rgba8(),
            ))
        }
    }
}

/// 计算等比缩放后的尺寸：宽度取目标值，高度为 `round(H × Tw / W)`，至少 1 像素。
pub fn scaled_dimensions(
    width: u32,
    height: u32,
    target_width: u32,
) -> Result<(u32, u32), ImageError> {
    if target_width == 0 {
        return Err(ImageError::InvalidDimension(format!(
            "目标宽度必须大于 0（源尺寸 {}x{}）",
            width, height
        )));
    }
    if width == 0 {
        return Err(ImageError::InvalidDimension("源宽度为 0，无法计算缩放比例".to_string()));
    }

    let target_height = (height as f64 * target_width as f64 / width as f64).round();
    if target_height > u32::MAX as f64 {
        return Err(ImageError::InvalidDimension(format!(
            "缩放后高度溢出：{}x{} -> 宽 {}",
            width, height, target_width
        )));
    }

    Ok((target_width, (target_height as u32).max(1)))
}

/// 将任意位图转换为 16 位亮度图，尺寸不变。
pub fn to_grayscale(src: &DynamicImage) -> Gray16Image {
    let rgba = src.to_rgba16();
    let (width, height) = rgba.dimensions();

    ImageBuffer::from_fn(width, height, |x, y| {
        let Rgba([r, g, b, _]) = *rgba.get_pixel(x, y);
        Luma([luminance16(r, g, b)])
    })
}

/// BT.601 整数亮度，输入输出均为 16 位刻度。
pub fn luminance16(r: u16, g: u16, b: u16) -> u16 {
    let weighted = LUMA_WEIGHT_R * r as u64
        + LUMA_WEIGHT_G * g as u64
        + LUMA_WEIGHT_B * b as u64
        + LUMA_WEIGHT_SUM / 2;
    (weighted / LUMA_WEIGHT_SUM).min(u16::MAX as u64) as u16
}

/// 依次执行解码、缩放、灰度化。
///
/// 不持有任何状态，可直接放入 `spawn_blocking`。
pub fn prepare(bytes: &[u8], config: &ImageConfig) -> Result<PreparedPreview, ImageError> {
    let original = decode_with_limits(bytes, config)?;
    let scaled = scale_with_filter(&original, config.render_width, config.resize_filter)?;
    let grayscale = to_grayscale(&scaled);

    let (raw_width, raw_height) = original.dimensions();
    log::info!(
        "✅ 图片解码成功 - 原始尺寸: {}x{} 输出尺寸: {}x{}",
        raw_width,
        raw_height,
        scaled.width(),
        scaled.height()
    );

    Ok(PreparedPreview {
        original,
        scaled,
        grayscale,
    })
}

/// 仅通过内存中的图片头信息读取宽高。
///
/// 用于在完整解码前做像素限制检查。
fn inspect_dimensions_from_memory(bytes: &[u8]) -> Result<(u32, u32), ImageError> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ImageError::Decode(format!("无法识别图片格式：{}", e)))?;

    reader
        .into_dimensions()
        .map_err(|e| ImageError::Decode(format!("无法读取图片尺寸：{}", e)))
}

/// 校验像素数量是否超过配置上限。
fn validate_pixel_limits(config: &ImageConfig, width: u32, height: u32) -> Result<(), ImageError> {
    let pixels = (width as u64)
        .checked_mul(height as u64)
        .ok_or_else(|| ImageError::ResourceLimit("图片像素数溢出".to_string()))?;

    if pixels > config.max_decoded_pixels {
        return Err(ImageError::ResourceLimit(format!(
            "图片像素过大：{} 像素（限制：{} 像素）",
            pixels, config.max_decoded_pixels
        )));
    }

    Ok(())
}

fn validate_decoded_memory_limits(
    config: &ImageConfig,
    width: u32,
    height: u32,
) -> Result<(), ImageError> {
    let estimated = (width as u64)
        .checked_mul(height as u64)
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or_else(|| ImageError::ResourceLimit("图片解码内存估算溢出".to_string()))?;

    if estimated > config.max_decoded_bytes {
        return Err(ImageError::ResourceLimit(format!(
            "图片解码预计内存过大：{:.2} MB（限制：{:.2} MB）",
            estimated as f64 / 1024.0 / 1024.0,
            config.max_decoded_bytes as f64 / 1024.0 / 1024.0
        )));
    }

    Ok(())
}

fn resize_with_fast_image_resize(
    image: &DynamicImage,
    target_width: u32,
    target_height: u32,
    filter: FilterType,
) -> Result<DynamicImage, ImageError> {
    let src = image.to_rgba8();
    let (src_width, src_height) = src.dimensions();

    let src_image = fr::images::Image::from_vec_u8(
        src_width,
        src_height,
        src.into_raw(),
        fr::PixelType::U8x4,
    )
    .map_err(|e| ImageError::Decode(format!("构建源图像缓冲失败：{}", e)))?;

    let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

    let mut resizer = fr::Resizer::new();
    let options = fr::ResizeOptions::new().resize_alg(to_fast_alg(filter));

    resizer
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| ImageError::Decode(format!("fast_image_resize 执行失败：{}", e)))?;

    let rgba = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(
        target_width,
        target_height,
        dst_image.into_vec(),
    )
    .ok_or_else(|| ImageError::Decode("fast_image_resize 输出缓冲长度异常".to_string()))?;

    Ok(DynamicImage::ImageRgba8(rgba))
}

fn to_fast_alg(filter: FilterType) -> fr::ResizeAlg {
    match filter {
        FilterType::Nearest => fr::ResizeAlg::Nearest,
        FilterType::Triangle => fr::ResizeAlg::Convolution(fr::FilterType::Bilinear),
        FilterType::CatmullRom => fr::ResizeAlg::Convolution(fr::FilterType::CatmullRom),
        FilterType::Gaussian => fr::ResizeAlg::Convolution(fr::FilterType::Mitchell),
        FilterType::Lanczos3 => fr::ResizeAlg::Convolution(fr::FilterType::Lanczos3),
    }
}
