//! 粘贴监听模块
//!
//! # 设计思路
//!
//! 平台的粘贴事件携带一组带类型的条目，每个条目只能通过异步回调取回内容。
//! 本模块把“条目枚举 → 分类 → 异步读取 → 分发”统一收口：
//! - **string 条目**：读取文本，交给文本回调，不触碰任何位图
//! - **file 条目且 MIME 命中前缀**：读取为 Data URL，交给图片回调
//! - **其他条目**：视为受保护/不支持，仅记录日志后跳过
//!
//! # 实现思路
//!
//! - 平台接口抽象为 `ClipboardItem` trait，完成回调以 `tokio::sync::oneshot::Sender` 表达：
//!   平台保证回调恰好触发一次；发送端未发送即被丢弃视为读取失败。
//! - 等待回调使用 `tokio::time::timeout` 包裹，回调永不触发时不会无限阻塞调用方。
//! - `PasteReport` 区分“没有可用内容”（全部跳过）与“有内容但读取失败”。
//! - 子模块按来源拆分：内存条目归 `memory`，系统剪贴板快照归 `system`。

pub mod memory;
pub mod system;

use std::time::Duration;

use tokio::sync::oneshot;

use crate::image_handler::{ClipboardPayload, ImageConfig, ImageError, PayloadKind};

/// 平台条目类别：文本。
pub const KIND_STRING: &str = "string";
/// 平台条目类别：文件。
pub const KIND_FILE: &str = "file";

/// 平台剪贴板条目。
///
/// 读取接口为回调风格：实现方在内容就绪时通过 `done` 发送一次结果。
pub trait ClipboardItem: Send + Sync {
    /// 条目类别，`"string"`、`"file"` 或其他平台自定义值。
    fn kind(&self) -> &str;

    /// 条目 MIME 类型。
    fn mime_type(&self) -> &str;

    /// 请求以字符串读取条目内容。
    fn get_as_string(&self, done: oneshot::Sender<String>);

    /// 请求把文件内容读取为 Data URL；读取器错误以 `Err(描述)` 返回。
    fn read_as_data_url(&self, done: oneshot::Sender<Result<String, String>>);
}

/// 条目分类结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemClass {
    Text,
    AcceptedFile,
    Unsupported,
}

/// 一次粘贴的处理汇总。
#[derive(Debug, Default)]
pub struct PasteReport {
    /// 交给文本回调的条目数。
    pub text_items: usize,
    /// 交给图片回调的条目数。
    pub image_items: usize,
    /// 因类别/MIME 不支持而跳过的条目数。
    pub skipped: usize,
    /// 读取失败的条目（按出现顺序）。
    pub failures: Vec<ImageError>,
}

impl PasteReport {
    /// 没有任何条目被成功交付。
    pub fn delivered_nothing(&self) -> bool {
        self.text_items == 0 && self.image_items == 0
    }

    /// “什么都没粘贴上”：既无交付也无读取失败，调用方不应提示错误。
    pub fn is_empty_paste(&self) -> bool {
        self.delivered_nothing() && self.failures.is_empty()
    }
}

/// 粘贴监听器：按 MIME 前缀登记关注的文件类型。
#[derive(Debug, Clone)]
pub struct PasteListener {
    accept_prefixes: Vec<String>,
    read_timeout: Duration,
}

impl PasteListener {
    pub fn new<I, S>(accept_prefixes: I, read_timeout: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            accept_prefixes: accept_prefixes
                .into_iter()
                .map(|p| Into::<String>::into(p).trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
            read_timeout,
        }
    }

    /// 按图片配置中的前缀与超时创建。
    pub fn from_config(config: &ImageConfig) -> Self {
        Self::new(
            config.accept_mime_prefixes.iter().cloned(),
            Duration::from_millis(config.read_timeout_ms),
        )
    }

    /// MIME 是否命中登记的前缀（忽略大小写）。
    pub fn accepts(&self, mime_type: &str) -> bool {
        let mime = mime_type.trim().to_lowercase();
        self.accept_prefixes.iter().any(|prefix| mime.starts_with(prefix.as_str()))
    }

    pub fn classify(&self, item: &dyn ClipboardItem) -> ItemClass {
        match item.kind() {
            KIND_STRING => ItemClass::Text,
            KIND_FILE if self.accepts(item.mime_type()) => ItemClass::AcceptedFile,
            _ => ItemClass::Unsupported,
        }
    }

    /// 读取单个条目。
    ///
    /// 不支持的条目返回 `UnsupportedClipboardKind`；回调丢失、超时或读取器报错返回 `ClipboardRead`。
    pub async fn read_item(&self, item: &dyn ClipboardItem) -> Result<ClipboardPayload, ImageError> {
        match self.classify(item) {
            ItemClass::Text => {
                let (tx, rx) = oneshot::channel();
                item.get_as_string(tx);
                let text = self.await_completion(rx, item).await?;
                Ok(ClipboardPayload::text(item.mime_type(), text))
            }
            ItemClass::AcceptedFile => {
                let (tx, rx) = oneshot::channel();
                item.read_as_data_url(tx);
                let data_url = self
                    .await_completion(rx, item)
                    .await?
                    .map_err(|e| ImageError::ClipboardRead(format!("读取剪贴板文件失败：{}", e)))?;
                Ok(ClipboardPayload::file(item.mime_type(), data_url))
            }
            ItemClass::Unsupported => Err(ImageError::UnsupportedClipboardKind(format!(
                "kind={} mime={}",
                item.kind(),
                item.mime_type()
            ))),
        }
    }

    async fn await_completion<T>(
        &self,
        rx: oneshot::Receiver<T>,
        item: &dyn ClipboardItem,
    ) -> Result<T, ImageError> {
        match tokio::time::timeout(self.read_timeout, rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(ImageError::ClipboardRead(format!(
                "条目回调未返回结果（kind={} mime={}）",
                item.kind(),
                item.mime_type()
            ))),
            Err(_) => Err(ImageError::ClipboardRead(format!(
                "条目读取超时 {}ms（kind={} mime={}）",
                self.read_timeout.as_millis(),
                item.kind(),
                item.mime_type()
            ))),
        }
    }

    /// 处理一次粘贴：逐个读取条目并分发到文本/图片回调。
    ///
    /// 不支持的条目只记录日志；读取失败收集到 `PasteReport::failures`，不中断后续条目。
    pub async fn handle_paste<T, F>(
        &self,
        items: &[Box<dyn ClipboardItem>],
        mut on_text: T,
        mut on_image: F,
    ) -> PasteReport
    where
        T: FnMut(String),
        F: FnMut(ClipboardPayload),
    {
        let mut report = PasteReport::default();

        for (index, item) in items.iter().enumerate() {
            match self.read_item(item.as_ref()).await {
                Ok(payload) => match payload.kind {
                    PayloadKind::Text => {
                        report.text_items += 1;
                        on_text(payload.data);
                    }
                    PayloadKind::File => {
                        report.image_items += 1;
                        on_image(payload);
                    }
                },
                Err(ImageError::UnsupportedClipboardKind(detail)) => {
                    report.skipped += 1;
                    log::debug!("⏭️  跳过受保护/不支持的剪贴板条目 #{}：{}", index, detail);
                }
                Err(err) => {
                    log::warn!("读取剪贴板条目 #{} 失败：{}", index, err);
                    report.failures.push(err);
                }
            }
        }

        log::info!(
            "📋 粘贴处理完成 - 文本: {} 图片: {} 跳过: {} 失败: {}",
            report.text_items,
            report.image_items,
            report.skipped,
            report.failures.len()
        );

        report
    }
}

impl Default for PasteListener {
    fn default() -> Self {
        Self::from_config(&ImageConfig::default())
    }
}
