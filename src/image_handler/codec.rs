//! # 位图 ⇄ Data URL 转换
//!
//! 展示层只认识字符串形式的图片，这里负责 `位图 -> data:image/png;base64,...`
//! 以及反向解析。编码固定使用 PNG（无损，16 位灰度可保留）。

use base64::{Engine as _, engine::general_purpose};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

use super::{ImageError, ImageHandler, pipeline};

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// 将位图编码为 PNG 字节。
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, ImageError> {
    let mut cursor = Cursor::new(Vec::new());
    image
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|e| ImageError::Decode(format!("PNG 编码失败：{}", e)))?;
    Ok(cursor.into_inner())
}

/// 将任意字节包装为指定 MIME 的 Data URL。
pub fn bytes_to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        general_purpose::STANDARD.encode(bytes)
    )
}

/// 位图 → PNG Data URL。
pub fn image_to_data_url(image: &DynamicImage) -> Result<String, ImageError> {
    let png = encode_png(image)?;
    let mut url = String::with_capacity(PNG_DATA_URL_PREFIX.len() + png.len() * 4 / 3 + 4);
    url.push_str(PNG_DATA_URL_PREFIX);
    general_purpose::STANDARD.encode_string(&png, &mut url);
    Ok(url)
}

/// Data URL（或纯 Base64）→ 位图。
pub fn data_url_to_image(data: &str) -> Result<DynamicImage, ImageError> {
    let bytes = ImageHandler::parse_base64(data)?;
    pipeline::decode(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma, Rgba};

    #[test]
    fn data_url_has_png_prefix() {
        let img = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(2, 2, Rgba([1, 2, 3, 255])));
        let url = image_to_data_url(&img).expect("encode");
        assert!(url.starts_with(PNG_DATA_URL_PREFIX));
    }

    #[test]
    fn sixteen_bit_gray_survives_data_url() {
        let gray: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_fn(3, 1, |x, _| Luma([(x as u16) * 30_000]));
        let url = image_to_data_url(&DynamicImage::ImageLuma16(gray.clone())).expect("encode");
        let back = data_url_to_image(&url).expect("decode");

        assert_eq!(back.to_luma16(), gray);
    }

    #[test]
    fn garbage_data_url_is_decode_error() {
        let url = bytes_to_data_url("image/png", b"definitely not a png");
        assert!(matches!(data_url_to_image(&url), Err(ImageError::Decode(_))));
    }
}
