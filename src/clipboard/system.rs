//! 系统剪贴板快照
//!
//! 通过 `arboard` 读取当前系统剪贴板，转换为粘贴条目：
//! - 文本 → `string` / `text/plain`
//! - 图片（RGBA）→ PNG 编码后的 `file` / `image/png`
//!
//! `arboard` 为同步接口，调用方应在阻塞线程中执行 `snapshot`。

use image::{DynamicImage, RgbaImage};

use super::ClipboardItem;
use super::memory::MemoryClipboardItem;
use crate::image_handler::{ImageError, codec};

/// 读取系统剪贴板，返回其中的文本与图片条目。
///
/// 剪贴板为空时返回空列表，由监听器按“没有可用内容”处理。
pub fn snapshot() -> Result<Vec<Box<dyn ClipboardItem>>, ImageError> {
    let mut clipboard = arboard::Clipboard::new()
        .map_err(|e| ImageError::ClipboardRead(format!("无法访问剪贴板：{}", e)))?;
    let mut items: Vec<Box<dyn ClipboardItem>> = Vec::new();

    match clipboard.get_text() {
        Ok(text) => {
            log::debug!("📋 剪贴板包含文本（{} 字符）", text.chars().count());
            items.push(Box::new(MemoryClipboardItem::text(text)));
        }
        Err(arboard::Error::ContentNotAvailable) => {}
        Err(err) => log::debug!("读取剪贴板文本失败：{}", err),
    }

    match clipboard.get_image() {
        Ok(image_data) => {
            log::debug!("📋 剪贴板包含图片 {}x{}", image_data.width, image_data.height);
            let item = match rgba_to_png_item(
                image_data.width,
                image_data.height,
                image_data.bytes.into_owned(),
            ) {
                Ok(item) => item,
                Err(err) => MemoryClipboardItem::failing_file("image/png", err.to_string()),
            };
            items.push(Box::new(item));
        }
        Err(arboard::Error::ContentNotAvailable) => {}
        Err(err) => log::debug!("读取剪贴板图片失败：{}", err),
    }

    Ok(items)
}

/// 把剪贴板给出的 RGBA 像素包装为 PNG 文件条目。
fn rgba_to_png_item(
    width: usize,
    height: usize,
    bytes: Vec<u8>,
) -> Result<MemoryClipboardItem, ImageError> {
    let width = u32::try_from(width)
        .map_err(|_| ImageError::InvalidDimension(format!("剪贴板图片宽度过大：{}", width)))?;
    let height = u32::try_from(height)
        .map_err(|_| ImageError::InvalidDimension(format!("剪贴板图片高度过大：{}", height)))?;

    let rgba = RgbaImage::from_raw(width, height, bytes)
        .ok_or_else(|| ImageError::Decode("剪贴板图片像素长度与尺寸不符".to_string()))?;
    let png = codec::encode_png(&DynamicImage::ImageRgba8(rgba))?;

    Ok(MemoryClipboardItem::file_bytes("image/png", &png))
}
