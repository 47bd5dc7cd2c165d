//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `ImageHandler` 只负责配置管理与单次处理流程编排，不持有任何位图状态。
//! 处理链路固定为：
//! 1. 读取配置快照
//! 2. 从粘贴载荷加载原始字节
//! 3. 解码 → 缩放 → 灰度化
//!
//! ## 实现思路
//!
//! - 配置通过 `Arc<RwLock<ImageConfig>>` 支持运行时动态切档。
//! - 单次请求内使用“同一配置快照”，避免处理中途配置漂移。
//! - 记录 `load/prepare/total` 阶段耗时，便于性能诊断。
//! - 处理函数为关联函数，只依赖入参，方便整体移入 `spawn_blocking`。

use std::sync::{Arc, RwLock};
use std::time::Instant;

use super::source::{ClipboardPayload, PreparedPreview, RawImageData};
use super::{ImageConfig, ImageError, ImagePerformanceProfile, pipeline};

/// 图片处理器。
///
/// 封装了配置状态，并编排加载与流水线各阶段。
#[derive(Debug, Clone)]
pub struct ImageHandler {
    pub(super) config: Arc<RwLock<ImageConfig>>,
}

impl ImageHandler {
    /// 根据初始配置创建处理器。
    ///
    /// # 示例
    /// ```rust
    /// use paste_preview::image_handler::{ImageConfig, ImageHandler};
    ///
    /// let handler = ImageHandler::new(ImageConfig::default())?;
    /// # Ok::<(), paste_preview::image_handler::ImageError>(())
    /// ```
    pub fn new(config: ImageConfig) -> Result<Self, ImageError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(RwLock::new(config)),
        })
    }

    /// 获取配置快照。
    ///
    /// 作用：保证单次请求链路使用一致参数。
    pub fn config_snapshot(&self) -> Result<ImageConfig, ImageError> {
        self.config
            .read()
            .map(|cfg| cfg.clone())
            .map_err(|_| ImageError::ResourceLimit("配置读取锁已中毒".to_string()))
    }

    /// 设置性能档位。
    ///
    /// # 示例
    /// ```rust
    /// use paste_preview::image_handler::{ImageConfig, ImageHandler, ImagePerformanceProfile};
    ///
    /// let handler = ImageHandler::new(ImageConfig::default())?;
    /// handler.set_performance_profile(ImagePerformanceProfile::Balanced)?;
    /// assert_eq!(handler.get_performance_profile()?, ImagePerformanceProfile::Balanced);
    /// # Ok::<(), paste_preview::image_handler::ImageError>(())
    /// ```
    pub fn set_performance_profile(&self, profile: ImagePerformanceProfile) -> Result<(), ImageError> {
        let mut config = self
            .config
            .write()
            .map_err(|_| ImageError::ResourceLimit("配置写入锁已中毒".to_string()))?;
        config.apply_performance_profile(profile);

        log::info!(
            "⚙️ 已切换图片性能档位：{:?}（filter={:?}, max_pixels={}, max_bytes={}）",
            profile,
            config.resize_filter,
            config.max_decoded_pixels,
            config.max_decoded_bytes
        );

        Ok(())
    }

    /// 获取当前生效档位。
    pub fn get_performance_profile(&self) -> Result<ImagePerformanceProfile, ImageError> {
        let config = self
            .config
            .read()
            .map_err(|_| ImageError::ResourceLimit("配置读取锁已中毒".to_string()))?;
        Ok(config.infer_performance_profile())
    }

    /// 处理一个文件类粘贴条目：加载 → 解码 → 缩放 → 灰度。
    pub fn prepare_payload(
        payload: &ClipboardPayload,
        config: &ImageConfig,
    ) -> Result<PreparedPreview, ImageError> {
        let total_start = Instant::now();

        let load_start = Instant::now();
        let raw = Self::load_from_payload(payload, config)?;
        let load_elapsed = load_start.elapsed();

        let prepared = Self::prepare_raw(raw, config)?;

        log::info!(
            "✅ 粘贴图片处理完成 - load={}ms total={}ms",
            load_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(prepared)
    }

    fn prepare_raw(raw: RawImageData, config: &ImageConfig) -> Result<PreparedPreview, ImageError> {
        let prepare_start = Instant::now();
        let prepared = pipeline::prepare(&raw.bytes, config)?;

        log::debug!(
            "🧮 解码/缩放/灰度完成 - 来源: {} 输入={}KB prepare={}ms",
            raw.source_hint,
            raw.bytes.len() / 1024,
            prepare_start.elapsed().as_millis()
        );

        Ok(prepared)
    }
}
