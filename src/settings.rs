//! 设置文件
//!
//! JSON 设置文件（camelCase 键），所有字段可选；缺失的字段保持 `ImageConfig` 默认值。
//!
//! ```json
//! {
//!   "renderWidth": 300,
//!   "threshold": 32768,
//!   "inverted": false,
//!   "performanceProfile": "balanced",
//!   "acceptMimePrefixes": ["image/"],
//!   "readTimeoutMs": 5000
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::AppError;
use crate::image_handler::{ImageConfig, ImagePerformanceProfile};

/// 预览设置。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreviewSettings {
    pub render_width: Option<u32>,
    pub threshold: Option<u16>,
    pub inverted: Option<bool>,
    pub performance_profile: Option<String>,
    pub accept_mime_prefixes: Option<Vec<String>>,
    pub read_timeout_ms: Option<u64>,
    pub max_file_size: Option<u64>,
    pub clipboard_retries: Option<u32>,
}

impl PreviewSettings {
    /// 读取设置文件。文件不存在时返回 `None`。
    pub fn load(path: &Path) -> Result<Option<Self>, AppError> {
        if !path.exists() {
            log::debug!("设置文件不存在，使用默认配置：{}", path.display());
            return Ok(None);
        }

        let content = fs::read_to_string(path)?;
        let parsed = Self::parse(&content)?;
        log::info!("⚙️ 已加载设置文件：{}", path.display());
        Ok(Some(parsed))
    }

    pub fn parse(content: &str) -> Result<Self, AppError> {
        serde_json::from_str(content)
            .map_err(|e| AppError::Settings(format!("解析设置文件失败: {}", e)))
    }

    /// 把设置叠加到配置上并校验结果。
    ///
    /// 性能档位先于单项覆盖生效，单项值优先。
    pub fn apply_to(&self, config: &mut ImageConfig) -> Result<(), AppError> {
        if let Some(profile) = &self.performance_profile {
            config.apply_performance_profile(ImagePerformanceProfile::parse(profile)?);
        }
        if let Some(width) = self.render_width {
            config.render_width = width;
        }
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if let Some(inverted) = self.inverted {
            config.inverted = inverted;
        }
        if let Some(prefixes) = &self.accept_mime_prefixes {
            config.accept_mime_prefixes = prefixes.clone();
        }
        if let Some(timeout) = self.read_timeout_ms {
            config.read_timeout_ms = timeout;
        }
        if let Some(size) = self.max_file_size {
            config.max_file_size = size;
        }
        if let Some(retries) = self.clipboard_retries {
            config.clipboard_retries = retries;
        }

        config.validate()?;
        Ok(())
    }
}
