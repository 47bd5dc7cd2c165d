//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载粘贴 → 解码 → 缩放 → 预览链路中的所有错误来源，避免字符串拼接式错误处理。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。
//!
//! `UnsupportedClipboardKind` 与 `ClipboardRead` 必须区分：
//! 前者表示“没有可用内容”（静默跳过），后者表示“有内容但读取失败”（需要上报）。

/// 图片处理统一错误类型。
///
/// 该类型会在应用层被上转为 `AppError`。
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("不支持的剪贴板内容：{0}")]
    UnsupportedClipboardKind(String),

    #[error("剪贴板读取失败：{0}")]
    ClipboardRead(String),

    #[error("解码错误：{0}")]
    Decode(String),

    #[error("格式错误：{0}")]
    InvalidFormat(String),

    #[error("尺寸错误：{0}")]
    InvalidDimension(String),

    #[error("剪贴板错误：{0}")]
    Clipboard(String),

    #[error("文件错误：{0}")]
    FileSystem(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),

    #[error("预览未就绪：{0}")]
    NotReady(String),
}

impl ImageError {
    /// 稳定的错误码，供 CLI 的 JSON 输出与日志检索使用。
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedClipboardKind(_) => "unsupported_clipboard_kind",
            Self::ClipboardRead(_) => "clipboard_read_failure",
            Self::Decode(_) => "decode_error",
            Self::InvalidFormat(_) => "invalid_format",
            Self::InvalidDimension(_) => "invalid_dimension",
            Self::Clipboard(_) => "clipboard_write_failure",
            Self::FileSystem(_) => "file_system",
            Self::ResourceLimit(_) => "resource_limit",
            Self::NotReady(_) => "not_ready",
        }
    }

    /// 错误发生的处理阶段。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::UnsupportedClipboardKind(_) | Self::ClipboardRead(_) => "paste",
            Self::Decode(_) | Self::InvalidFormat(_) | Self::ResourceLimit(_) => "decode",
            Self::InvalidDimension(_) => "scale",
            Self::NotReady(_) => "preview",
            Self::Clipboard(_) => "copy",
            Self::FileSystem(_) => "load",
        }
    }
}
