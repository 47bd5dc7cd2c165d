//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入类型”和“流水线中间结果”解耦：
//! - `ClipboardPayload` 表示一次粘贴读出的条目内容（文本或 Data URL）
//! - `RawImageData` 表示已加载但未解码的字节
//! - `PreparedPreview` 表示解码、缩放、灰度化后的三张位图

use image::{DynamicImage, ImageBuffer, Luma};

/// 16 位单通道亮度位图，取值范围 0–65535。
pub type Gray16Image = ImageBuffer<Luma<u16>, Vec<u16>>;

/// 粘贴条目类别。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Text,
    File,
}

/// 粘贴监听器产出的条目内容，只消费一次，不做保留。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardPayload {
    pub kind: PayloadKind,
    /// 平台报告的 MIME 类型，例如 `text/plain`、`image/png`。
    pub mime_type: String,
    /// 文本条目为原文；文件条目为 `data:<mime>;base64,...` 形式的 Data URL。
    pub data: String,
}

impl ClipboardPayload {
    pub fn text(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            kind: PayloadKind::Text,
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn file(mime_type: impl Into<String>, data_url: impl Into<String>) -> Self {
        Self {
            kind: PayloadKind::File,
            mime_type: mime_type.into(),
            data: data_url.into(),
        }
    }
}

/// 加载阶段输出：原始字节与来源标识。
pub(crate) struct RawImageData {
    /// 原始图片字节。
    pub(crate) bytes: Vec<u8>,
    /// 来源提示（用于日志与诊断）。
    pub(crate) source_hint: &'static str,
}

/// 解码阶段输出：一次粘贴周期内的三张位图。
#[derive(Debug, Clone)]
pub struct PreparedPreview {
    /// 解码得到的原图。
    pub original: DynamicImage,
    /// 缩放到渲染宽度后的 RGBA 图。
    pub scaled: DynamicImage,
    /// 由 `scaled` 计算的 16 位亮度图。
    pub grayscale: Gray16Image,
}
