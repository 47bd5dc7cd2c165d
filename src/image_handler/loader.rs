//! # 加载与校验模块
//!
//! ## 设计思路
//!
//! 统一处理粘贴载荷（Data URL / 纯 Base64）的原始字节加载，并在“尽可能早”的阶段执行输入校验。
//! 本地文件与标准输入由命令行宿主先包装成内存粘贴条目，同样走这条路径。
//! 目标是尽快失败，减少不必要内存与 CPU 消耗。
//!
//! ## 实现思路
//!
//! - Data URL：`;base64,` 标记解析 + 解码前体积估算 + 解码后体积限制。
//! - 解码后的字节最后都经过 `infer` 文件签名校验，非图片签名视为解码错误。

use base64::{Engine as _, engine::general_purpose};

use super::source::{ClipboardPayload, PayloadKind, RawImageData};
use super::{ImageConfig, ImageError, ImageHandler};

const BASE64_MARKER: &str = ";base64,";

impl ImageHandler {
    /// 从文件类粘贴条目加载图片原始字节。
    pub(crate) fn load_from_payload(
        payload: &ClipboardPayload,
        config: &ImageConfig,
    ) -> Result<RawImageData, ImageError> {
        if payload.kind != PayloadKind::File {
            return Err(ImageError::InvalidFormat(format!(
                "文本条目不能作为图片处理（mime={}）",
                payload.mime_type
            )));
        }

        log::info!("📝 开始处理粘贴图片 - mime: {}", payload.mime_type);

        let bytes = Self::parse_base64_with_limit(&payload.data, config.max_file_size)?;
        Self::check_file_size(bytes.len() as u64, config.max_file_size, "粘贴内容")?;
        Self::validate_image_signature(&bytes)?;

        Ok(RawImageData {
            bytes,
            source_hint: "paste",
        })
    }

    /// 解析 Base64 输入（支持 Data URL / 纯 Base64）。
    pub(crate) fn parse_base64(data: &str) -> Result<Vec<u8>, ImageError> {
        Self::parse_base64_with_limit(data, u64::MAX)
    }

    fn check_file_size(len: u64, max_file_size: u64, what: &str) -> Result<(), ImageError> {
        if len > max_file_size {
            return Err(ImageError::ResourceLimit(format!(
                "{}过大：{:.2} MB（限制：{:.2} MB）",
                what,
                len as f64 / 1024.0 / 1024.0,
                max_file_size as f64 / 1024.0 / 1024.0
            )));
        }
        Ok(())
    }

    fn estimate_base64_decoded_upper_bound_len(base64_data: &str) -> Result<u64, ImageError> {
        let len = base64_data.trim().len() as u64;
        let groups = len
            .checked_add(3)
            .ok_or_else(|| ImageError::ResourceLimit("Base64 输入长度溢出".to_string()))?
            / 4;

        groups
            .checked_mul(3)
            .ok_or_else(|| ImageError::ResourceLimit("Base64 解码体积估算溢出".to_string()))
    }

    pub(crate) fn parse_base64_with_limit(
        data: &str,
        max_file_size: u64,
    ) -> Result<Vec<u8>, ImageError> {
        let normalized = data.trim();

        let base64_data = if normalized.starts_with("data:") {
            let marker = normalized
                .find(BASE64_MARKER)
                .ok_or_else(|| ImageError::InvalidFormat("Data URL 缺少 base64 标记".to_string()))?;
            normalized
                .get(marker + BASE64_MARKER.len()..)
                .unwrap_or_default()
        } else {
            normalized
        };

        let estimated_len = Self::estimate_base64_decoded_upper_bound_len(base64_data)?;
        if estimated_len > max_file_size {
            return Err(ImageError::ResourceLimit(format!(
                "Base64 预计解码体积过大：{:.2} MB（限制：{:.2} MB）",
                estimated_len as f64 / 1024.0 / 1024.0,
                max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        general_purpose::STANDARD
            .decode(base64_data.trim())
            .map_err(|e| ImageError::Decode(format!("Base64 解码失败：{}", e)))
    }

    /// 通过文件签名确认内容是图片。
    pub(crate) fn validate_image_signature(bytes: &[u8]) -> Result<(), ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::Decode("图片内容为空".to_string()));
        }

        let kind = infer::get(bytes)
            .ok_or_else(|| ImageError::Decode("无法识别图片类型".to_string()))?;

        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(ImageError::Decode(format!(
                "文件签名不是图片类型：{}",
                kind.mime_type()
            )));
        }

        Ok(())
    }

    /// 按文件签名推断 MIME 类型，无法识别时返回 `None`。
    pub(crate) fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
        infer::get(bytes)
            .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
            .map(|kind| kind.mime_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_1X1: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8DwHwAFBQIAX8jx0gAAAABJRU5ErkJggg==";

    #[test]
    fn load_from_payload_accepts_png_data_url() {
        let payload = ClipboardPayload::file("image/png", format!("data:image/png;base64,{}", PNG_1X1));
        let raw = ImageHandler::load_from_payload(&payload, &ImageConfig::default())
            .expect("png data url should load");

        assert_eq!(raw.source_hint, "paste");
        assert_eq!(raw.bytes.get(..4), Some(&[137_u8, 80, 78, 71][..]));
    }

    #[test]
    fn load_from_payload_rejects_text_payload() {
        let payload = ClipboardPayload::text("text/plain", "hello");
        let result = ImageHandler::load_from_payload(&payload, &ImageConfig::default());

        assert!(matches!(result, Err(ImageError::InvalidFormat(_))));
    }

    #[test]
    fn load_from_payload_rejects_non_image_bytes() {
        let payload = ClipboardPayload::file("image/png", "data:image/png;base64,SGVsbG8=");
        let result = ImageHandler::load_from_payload(&payload, &ImageConfig::default());

        assert!(matches!(result, Err(ImageError::Decode(_))));
    }

    #[test]
    fn parse_base64_requires_marker_in_data_url() {
        let result = ImageHandler::parse_base64("data:image/png,abcd");
        assert!(matches!(result, Err(ImageError::InvalidFormat(_))));
    }

    #[test]
    fn parse_base64_accepts_plain_base64() {
        let bytes = ImageHandler::parse_base64(PNG_1X1).expect("plain base64 should parse");
        assert_eq!(ImageHandler::sniff_image_mime(&bytes), Some("image/png"));
    }

    #[test]
    fn parse_base64_with_limit_rejects_large_payload_before_decode() {
        let huge = "A".repeat(1024 * 1024);
        let result = ImageHandler::parse_base64_with_limit(&huge, 32);

        assert!(matches!(result, Err(ImageError::ResourceLimit(_))));
    }

    #[test]
    fn empty_bytes_are_not_an_image() {
        assert!(matches!(
            ImageHandler::validate_image_signature(&[]),
            Err(ImageError::Decode(_))
        ));
    }
}
