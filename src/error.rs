//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义应用级 `AppError` 枚举，替代分散的 `.map_err(|e| e.to_string())`、`format!(...)`、
//! `expect()` 等不一致模式。命令行入口统一返回 `Result<T, AppError>`。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `ImageError` / `std::io::Error` 提供 `From` 转换，无需手动 map。
//! - 实现 `Serialize` 将错误序列化为字符串，`--json` 输出可直接内嵌。

use serde::Serialize;

use crate::image_handler::ImageError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 剪贴板访问失败（读取快照的线程异常等）
    #[error("剪贴板操作失败: {0}")]
    Clipboard(String),

    /// 图片处理流水线错误（粘贴 / 解码 / 缩放 / 预览 / 复制）
    #[error("{0}")]
    Image(#[from] ImageError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 设置文件不可用或内容非法
    #[error("设置错误: {0}")]
    Settings(String),

    /// JSON 序列化失败
    #[error("序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    /// 稳定错误码，图片错误沿用 `ImageError::code`。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Clipboard(_) => "clipboard",
            Self::Image(err) => err.code(),
            Self::Io(_) => "io",
            Self::Settings(_) => "settings",
            Self::Serialization(_) => "serialization",
        }
    }
}

/// 将错误序列化为人类可读的字符串。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
