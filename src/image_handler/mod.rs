//! # 图片处理模块（image_handler）
//!
//! ## 设计思路
//!
//! 该模块将“载荷加载校验 → 解码缩放灰度 → 阈值预览 → 写回剪贴板”
//! 按职责拆分为多个子模块，避免单文件膨胀与耦合。
//!
//! - `service`：承载可注入状态（`PreviewService`），串行化粘贴（最新一次胜出）
//! - `preview`：单个展示面的流水线状态机
//! - `handler`：配置管理 + 单次处理编排
//! - `loader`：Data URL / Base64 / 文件加载与签名校验
//! - `pipeline`：解码、像素限制、等比缩放、16 位灰度
//! - `threshold`：阈值二值化渲染
//! - `codec`：位图与 PNG / Data URL 互转
//! - `clipboard_writer`：写入剪贴板与重试
//! - `config/error/source`：配置、错误、中间数据模型
//!
//! ## 新同事快速上手
//!
//! ```text
//! clipboard::PasteListener（条目分类 + 异步读取）
//!    ↓
//! service.rs（代次检查、spawn_blocking）
//!    ↓
//! handler.rs（配置快照 + 阶段耗时日志）
//!    ├─ loader.rs（载荷解析 + 体积/签名校验）
//!    └─ pipeline.rs（解码 → 缩放 → 灰度）
//!    ↓
//! preview.rs（状态机）→ threshold.rs（二值预览）
//!    ↓
//! codec.rs（Data URL）/ clipboard_writer.rs（写剪贴板）
//! ```
//!
//! ## 分层职责建议
//!
//! - 配置与策略变更优先改 `config.rs`
//! - 粘贴串行化/代次问题优先看 `service.rs`
//! - 单阶段行为优化分别改 `loader/pipeline/threshold/clipboard_writer`

mod clipboard_writer;
pub mod codec;
mod config;
mod error;
mod handler;
mod loader;
pub mod pipeline;
mod preview;
mod service;
mod source;
pub mod threshold;

pub use config::{DEFAULT_RENDER_WIDTH, DEFAULT_THRESHOLD, ImageConfig, ImagePerformanceProfile};
pub use error::ImageError;
pub use handler::ImageHandler;
pub use preview::{PipelineState, PreviewImages, PreviewPipeline};
pub use service::{PasteOutcome, PreviewService, PreviewUpdate};
pub use source::{ClipboardPayload, Gray16Image, PayloadKind, PreparedPreview};
pub use threshold::{PreviewParameters, threshold_from_u8};
