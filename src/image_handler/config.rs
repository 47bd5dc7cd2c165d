//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `ImageConfig`，保证运行时行为可观测、可调整、可测试。
//! 其中性能档位（quality / balanced / speed）作为高层语义，映射到底层参数组合。
//!
//! ## 实现思路
//!
//! - `Default` 提供展示用的高质量配置（Lanczos3 + 300px 渲染宽度）。
//! - `ImagePerformanceProfile` 负责档位字符串解析与反向输出。
//! - `apply_performance_profile` 将档位转换为具体滤镜与解码上限。
//! - `infer_performance_profile` 用于从当前配置反推档位。
//! - `validate` 在配置被整体替换（设置文件、命令行）前做范围校验。

use image::imageops::FilterType;

use super::ImageError;

/// 预览显示的固定渲染宽度（像素）。
pub const DEFAULT_RENDER_WIDTH: u32 = 300;

/// 默认阈值：16 位通道的中点。
pub const DEFAULT_THRESHOLD: u16 = 32_768;

/// 图片处理配置。
///
/// 字段覆盖了粘贴读取、解码、缩放、预览与剪贴板写入重试五个阶段。
#[derive(Debug, Clone)]
pub struct ImageConfig {
    /// 粘贴内容解码前允许的最大体积（字节）。
    pub max_file_size: u64,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 解码阶段允许的预计内存上限（按 RGBA 估算，字节）。
    pub max_decoded_bytes: u64,
    /// 缩放后的显示宽度，高度按原图比例计算。
    pub render_width: u32,
    /// 缩放滤镜策略。
    pub resize_filter: FilterType,
    /// 接受的文件类剪贴板条目 MIME 前缀，例如 `image/`。
    pub accept_mime_prefixes: Vec<String>,
    /// 单个剪贴板条目的异步读取超时（毫秒）。
    pub read_timeout_ms: u64,
    /// 新粘贴使用的初始阈值（16 位刻度）。
    pub threshold: u16,
    /// 新粘贴使用的初始反色标志。
    pub inverted: bool,
    /// 写入剪贴板失败时最大重试次数。
    pub clipboard_retries: u32,
    /// 重试间隔（毫秒）。
    pub clipboard_retry_delay: u64,
    /// 单次写入流程允许的总重试预算（毫秒）。
    pub clipboard_retry_max_total_ms: u64,
    /// 单次退避延迟上限（毫秒）。
    pub clipboard_retry_max_delay_ms: u64,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024,
            max_decoded_pixels: 40_000_000,
            max_decoded_bytes: 160 * 1024 * 1024,
            render_width: DEFAULT_RENDER_WIDTH,
            resize_filter: FilterType::Lanczos3,
            accept_mime_prefixes: vec!["image/".to_string()],
            read_timeout_ms: 5_000,
            threshold: DEFAULT_THRESHOLD,
            inverted: false,
            clipboard_retries: 3,
            clipboard_retry_delay: 100,
            clipboard_retry_max_total_ms: 1_800,
            clipboard_retry_max_delay_ms: 900,
        }
    }
}

/// 图片性能档位（面向用户语义）。
///
/// - `Quality`：Lanczos3，尽量保真
/// - `Balanced`：CatmullRom，质量与性能平衡
/// - `Speed`：最近邻，优先响应速度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImagePerformanceProfile {
    Quality,
    Balanced,
    Speed,
}

impl ImagePerformanceProfile {
    /// 从外部字符串解析档位。
    ///
    /// # 示例
    /// ```rust
    /// use paste_preview::image_handler::ImagePerformanceProfile;
    ///
    /// let p = ImagePerformanceProfile::parse("balanced")?;
    /// assert_eq!(p.as_str(), "balanced");
    /// # Ok::<(), paste_preview::image_handler::ImageError>(())
    /// ```
    pub fn parse(profile: &str) -> Result<Self, ImageError> {
        match profile.trim().to_lowercase().as_str() {
            "quality" => Ok(Self::Quality),
            "balanced" => Ok(Self::Balanced),
            "speed" => Ok(Self::Speed),
            other => Err(ImageError::InvalidFormat(format!(
                "未知性能档位：{}（可选：quality / balanced / speed）",
                other
            ))),
        }
    }

    /// 将档位输出为稳定字符串，供展示与持久化。
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quality => "quality",
            Self::Balanced => "balanced",
            Self::Speed => "speed",
        }
    }
}

impl ImageConfig {
    /// 基于当前滤镜反推性能档位。
    pub(crate) fn infer_performance_profile(&self) -> ImagePerformanceProfile {
        match self.resize_filter {
            FilterType::Lanczos3 => ImagePerformanceProfile::Quality,
            FilterType::CatmullRom | FilterType::Gaussian => ImagePerformanceProfile::Balanced,
            FilterType::Triangle | FilterType::Nearest => ImagePerformanceProfile::Speed,
        }
    }

    /// 应用指定性能档位到实际参数。
    pub(crate) fn apply_performance_profile(&mut self, profile: ImagePerformanceProfile) {
        match profile {
            ImagePerformanceProfile::Quality => {
                self.resize_filter = FilterType::Lanczos3;
                self.max_decoded_pixels = 40_000_000;
                self.max_decoded_bytes = 160 * 1024 * 1024;
            }
            ImagePerformanceProfile::Balanced => {
                self.resize_filter = FilterType::CatmullRom;
                self.max_decoded_pixels = 20_000_000;
                self.max_decoded_bytes = 80 * 1024 * 1024;
            }
            ImagePerformanceProfile::Speed => {
                self.resize_filter = FilterType::Nearest;
                self.max_decoded_pixels = 8_000_000;
                self.max_decoded_bytes = 32 * 1024 * 1024;
            }
        }
    }

    /// 校验配置取值范围。
    pub fn validate(&self) -> Result<(), ImageError> {
        if !(1..=8192).contains(&self.render_width) {
            return Err(ImageError::InvalidFormat(
                "render_width 必须在 1~8192 像素之间".to_string(),
            ));
        }
        if self.max_decoded_bytes < 8 * 1024 * 1024 {
            return Err(ImageError::InvalidFormat("max_decoded_bytes 不能小于 8MB".to_string()));
        }
        if self.accept_mime_prefixes.iter().all(|p| p.trim().is_empty()) {
            return Err(ImageError::InvalidFormat(
                "accept_mime_prefixes 至少需要一个非空前缀".to_string(),
            ));
        }
        if !(100..=120_000).contains(&self.read_timeout_ms) {
            return Err(ImageError::InvalidFormat(
                "read_timeout_ms 必须在 100~120000 毫秒之间".to_string(),
            ));
        }
        if !(200..=30_000).contains(&self.clipboard_retry_max_total_ms) {
            return Err(ImageError::InvalidFormat(
                "clipboard_retry_max_total_ms 必须在 200~30000 毫秒之间".to_string(),
            ));
        }
        if !(10..=5_000).contains(&self.clipboard_retry_max_delay_ms) {
            return Err(ImageError::InvalidFormat(
                "clipboard_retry_max_delay_ms 必须在 10~5000 毫秒之间".to_string(),
            ));
        }
        if self.clipboard_retry_max_delay_ms > self.clipboard_retry_max_total_ms {
            return Err(ImageError::InvalidFormat(
                "clipboard_retry_max_delay_ms 不能大于 clipboard_retry_max_total_ms".to_string(),
            ));
        }

        Ok(())
    }
}
