//! 内存剪贴板条目
//!
//! 命令行的文件/标准输入来源与测试都通过它构造粘贴条目，
//! 与真实平台条目走同一条监听 → 分发路径。

use std::sync::Mutex;

use tokio::sync::oneshot;

use super::{ClipboardItem, KIND_FILE, KIND_STRING};
use crate::image_handler::{ImageHandler, codec};

/// 非 string/file 条目使用的类别名。
pub const KIND_PROTECTED: &str = "protected";

enum MemoryContent {
    Text(String),
    DataUrl(String),
    ReadError(String),
    /// 回调从不触发，发送端直接丢弃。
    Silent,
    /// 回调被挂起，发送端保留但永不发送。
    Stalled {
        pending_text: Mutex<Vec<oneshot::Sender<String>>>,
        pending_file: Mutex<Vec<oneshot::Sender<Result<String, String>>>>,
    },
}

/// 已在内存中就绪的剪贴板条目，回调立即触发。
pub struct MemoryClipboardItem {
    kind: String,
    mime_type: String,
    content: MemoryContent,
}

impl MemoryClipboardItem {
    fn new(kind: &str, mime_type: &str, content: MemoryContent) -> Self {
        Self {
            kind: kind.to_string(),
            mime_type: mime_type.to_string(),
            content,
        }
    }

    /// 纯文本条目。
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(KIND_STRING, "text/plain", MemoryContent::Text(text.into()))
    }

    /// 文件条目，内容为原始字节。
    pub fn file_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        Self::new(
            KIND_FILE,
            mime_type,
            MemoryContent::DataUrl(codec::bytes_to_data_url(mime_type, bytes)),
        )
    }

    /// 文件条目，内容已是 Data URL。
    pub fn file_data_url(mime_type: &str, data_url: impl Into<String>) -> Self {
        Self::new(KIND_FILE, mime_type, MemoryContent::DataUrl(data_url.into()))
    }

    /// 受保护/不支持的条目。
    pub fn other(mime_type: &str) -> Self {
        Self::new(KIND_PROTECTED, mime_type, MemoryContent::Silent)
    }

    /// 读取时报错的文件条目。
    pub fn failing_file(mime_type: &str, reason: impl Into<String>) -> Self {
        Self::new(KIND_FILE, mime_type, MemoryContent::ReadError(reason.into()))
    }

    /// 回调不触发、发送端被丢弃的条目。
    pub fn silent(kind: &str, mime_type: &str) -> Self {
        Self::new(kind, mime_type, MemoryContent::Silent)
    }

    /// 回调永远挂起的条目。
    pub fn stalled(kind: &str, mime_type: &str) -> Self {
        Self::new(
            kind,
            mime_type,
            MemoryContent::Stalled {
                pending_text: Mutex::new(Vec::new()),
                pending_file: Mutex::new(Vec::new()),
            },
        )
    }

    /// 按内容推断条目：图片签名 → 文件条目；UTF-8 → 文本条目；其他 → 受保护条目。
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if let Some(mime_type) = ImageHandler::sniff_image_mime(bytes) {
            return Self::file_bytes(mime_type, bytes);
        }

        match std::str::from_utf8(bytes) {
            Ok(text) => Self::text(text),
            Err(_) => Self::other("application/octet-stream"),
        }
    }
}

impl ClipboardItem for MemoryClipboardItem {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn get_as_string(&self, done: oneshot::Sender<String>) {
        match &self.content {
            MemoryContent::Text(text) | MemoryContent::DataUrl(text) => {
                let _ = done.send(text.clone());
            }
            MemoryContent::ReadError(_) | MemoryContent::Silent => drop(done),
            MemoryContent::Stalled { pending_text, .. } => {
                if let Ok(mut pending) = pending_text.lock() {
                    pending.push(done);
                }
            }
        }
    }

    fn read_as_data_url(&self, done: oneshot::Sender<Result<String, String>>) {
        match &self.content {
            MemoryContent::DataUrl(url) => {
                let _ = done.send(Ok(url.clone()));
            }
            MemoryContent::Text(_) => {
                let _ = done.send(Err("文本条目无法读取为文件".to_string()));
            }
            MemoryContent::ReadError(reason) => {
                let _ = done.send(Err(reason.clone()));
            }
            MemoryContent::Silent => drop(done),
            MemoryContent::Stalled { pending_file, .. } => {
                if let Ok(mut pending) = pending_file.lock() {
                    pending.push(done);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_handler::codec::encode_png;
    use image::DynamicImage;

    #[test]
    fn from_bytes_detects_png() {
        let png = encode_png(&DynamicImage::new_rgb8(2, 2)).expect("encode");
        let item = MemoryClipboardItem::from_bytes(&png);

        assert_eq!(item.kind(), KIND_FILE);
        assert_eq!(item.mime_type(), "image/png");
    }

    #[test]
    fn from_bytes_falls_back_to_text_then_protected() {
        let text = MemoryClipboardItem::from_bytes("hello".as_bytes());
        assert_eq!(text.kind(), KIND_STRING);

        let binary = MemoryClipboardItem::from_bytes(&[0xff, 0xfe, 0x00, 0x81]);
        assert_eq!(binary.kind(), KIND_PROTECTED);
    }

    #[test]
    fn failing_file_reports_reason() {
        let item = MemoryClipboardItem::failing_file("image/png", "disk gone");
        let (tx, mut rx) = oneshot::channel();
        item.read_as_data_url(tx);

        assert_eq!(rx.try_recv().ok(), Some(Err("disk gone".to_string())));
    }
}
