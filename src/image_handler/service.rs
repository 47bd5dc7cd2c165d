//! # 服务层（可注入状态）
//!
//! ## 设计思路
//!
//! `PreviewService` 是展示面的宿主上下文，持有：
//! 1. `ImageHandler`（配置与单次处理编排）
//! 2. 一条 `PreviewPipeline`（本展示面的全部位图）
//! 3. 粘贴代次计数器（最新一次粘贴胜出）
//!
//! 测试可创建独立实例，互不共享状态。
//!
//! ## 实现思路
//!
//! - 含可接受图片的 `handle_paste` 先领取新代次；读取与解码完成后、写入流水线前
//!   再比对代次，过期的结果直接丢弃并报告 `PreviewUpdate::Superseded`。
//!   纯文本或不支持的粘贴只读取当前代次，不会取代进行中的图片。
//! - 解码/缩放/灰度在 `spawn_blocking` 中执行，流水线锁只在提交结果时短暂持有，
//!   从不跨 `.await`。
//! - 流水线锁中毒时恢复内部数据并记录日志，不让一次 panic 拖垮后续粘贴。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::task::JoinError;

use crate::clipboard::{ClipboardItem, ItemClass, PasteListener, PasteReport};

use super::preview::{PipelineState, PreviewImages, PreviewPipeline};
use super::source::{ClipboardPayload, PreparedPreview};
use super::threshold::PreviewParameters;
use super::{ImageConfig, ImageError, ImageHandler, ImagePerformanceProfile};

/// 一次粘贴对预览的影响。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewUpdate {
    /// 本次粘贴没有图片，预览保持原样。
    Unchanged,
    /// 新图片已进入流水线并完成渲染。
    Updated,
    /// 处理期间有更新的粘贴到达，本次结果被丢弃。
    Superseded,
}

/// `handle_paste` 的返回值。
#[derive(Debug)]
pub struct PasteOutcome {
    pub report: PasteReport,
    pub preview: PreviewUpdate,
}

/// 预览服务状态。
pub struct PreviewService {
    handler: ImageHandler,
    pipeline: Mutex<PreviewPipeline>,
    generation: AtomicU64,
}

impl PreviewService {
    /// 使用默认配置创建服务状态。
    ///
    /// # 示例
    /// ```rust
    /// use paste_preview::image_handler::{PipelineState, PreviewService};
    ///
    /// let service = PreviewService::new()?;
    /// assert_eq!(service.state(), PipelineState::Empty);
    /// # Ok::<(), paste_preview::image_handler::ImageError>(())
    /// ```
    pub fn new() -> Result<Self, ImageError> {
        Self::with_config(ImageConfig::default())
    }

    /// 使用自定义配置创建服务状态，初始预览参数取自配置。
    pub fn with_config(config: ImageConfig) -> Result<Self, ImageError> {
        let params = PreviewParameters::new(config.threshold, config.inverted);
        let handler = ImageHandler::new(config)?;
        Ok(Self {
            handler,
            pipeline: Mutex::new(PreviewPipeline::new(params)),
            generation: AtomicU64::new(0),
        })
    }

    pub fn handler(&self) -> &ImageHandler {
        &self.handler
    }

    fn lock_pipeline(&self) -> MutexGuard<'_, PreviewPipeline> {
        self.pipeline.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
            log::warn!("⚠️ 预览流水线锁已中毒，恢复内部状态继续使用");
            poisoned.into_inner()
        })
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket
    }

    /// 处理一次粘贴。
    ///
    /// 文本条目原样交给 `on_text`；同一次粘贴包含多张图片时最后一张胜出。
    /// 只有含可接受图片的粘贴才领取新代次，纯文本或不支持的粘贴不会取代
    /// 正在处理的图片。解码失败时流水线回到 `Empty` 并返回错误。
    pub async fn handle_paste<T>(
        &self,
        items: &[Box<dyn ClipboardItem>],
        on_text: T,
    ) -> Result<PasteOutcome, ImageError>
    where
        T: FnMut(String),
    {
        let config = self.handler.config_snapshot()?;
        let listener = PasteListener::from_config(&config);

        let has_image = items
            .iter()
            .any(|item| listener.classify(item.as_ref()) == ItemClass::AcceptedFile);
        let ticket = if has_image {
            self.next_ticket()
        } else {
            self.generation.load(Ordering::SeqCst)
        };

        let mut latest: Option<ClipboardPayload> = None;
        let report = listener
            .handle_paste(items, on_text, |payload| latest = Some(payload))
            .await;

        let Some(payload) = latest else {
            return Ok(PasteOutcome {
                report,
                preview: PreviewUpdate::Unchanged,
            });
        };

        if report.image_items > 1 {
            log::debug!("🖼️ 本次粘贴包含 {} 张图片，仅处理最后一张", report.image_items);
        }

        if !self.is_current(ticket) {
            log::info!("⏭️ 粘贴 #{} 已被更新的粘贴取代（读取阶段）", ticket);
            return Ok(PasteOutcome {
                report,
                preview: PreviewUpdate::Superseded,
            });
        }

        let joined = tokio::task::spawn_blocking(move || {
            ImageHandler::prepare_payload(&payload, &config)
        })
        .await;

        self.commit_prepared(ticket, report, joined)
    }

    fn next_ticket(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// 持锁提交一次处理结果。
    ///
    /// 代次过期时丢弃结果；处理失败（包括处理线程 panic）时流水线回到 `Empty`。
    fn commit_prepared(
        &self,
        ticket: u64,
        report: PasteReport,
        joined: Result<Result<PreparedPreview, ImageError>, JoinError>,
    ) -> Result<PasteOutcome, ImageError> {
        let prepared = joined.unwrap_or_else(|e| {
            Err(ImageError::Decode(format!("图片处理线程执行失败：{}", e)))
        });

        let mut pipeline = self.lock_pipeline();
        if !self.is_current(ticket) {
            log::info!("⏭️ 粘贴 #{} 已被更新的粘贴取代（解码阶段）", ticket);
            return Ok(PasteOutcome {
                report,
                preview: PreviewUpdate::Superseded,
            });
        }

        match prepared {
            Ok(prepared) => {
                pipeline.reset();
                let preview = pipeline.install(prepared);
                log::info!(
                    "🖼️ 预览已更新 #{} - {}x{}",
                    ticket,
                    preview.width(),
                    preview.height()
                );
                Ok(PasteOutcome {
                    report,
                    preview: PreviewUpdate::Updated,
                })
            }
            Err(err) => {
                pipeline.reset();
                log::warn!("❌ 粘贴图片处理失败（{}）：{}", err.stage(), err);
                Err(err)
            }
        }
    }

    /// 修改阈值（16 位刻度）。返回修改后的阶段。
    pub fn set_threshold(&self, threshold: u16) -> Result<PipelineState, ImageError> {
        let mut pipeline = self.lock_pipeline();
        pipeline.set_threshold(threshold)?;
        Ok(pipeline.state())
    }

    /// 切换反色。
    pub fn set_inverted(&self, inverted: bool) -> Result<PipelineState, ImageError> {
        let mut pipeline = self.lock_pipeline();
        pipeline.set_inverted(inverted)?;
        Ok(pipeline.state())
    }

    pub fn parameters(&self) -> PreviewParameters {
        self.lock_pipeline().parameters()
    }

    pub fn state(&self) -> PipelineState {
        self.lock_pipeline().state()
    }

    /// 展示层所需的三张 Data URL。
    pub fn display_images(&self) -> Result<PreviewImages, ImageError> {
        self.lock_pipeline().display_images()
    }

    /// 在持锁期间只读访问流水线（例如导出位图）。
    pub fn with_pipeline<R>(&self, f: impl FnOnce(&PreviewPipeline) -> R) -> R {
        f(&self.lock_pipeline())
    }

    /// 设置性能档位（`quality` / `balanced` / `speed`），对下一次粘贴生效。
    pub fn set_performance_profile(&self, profile: &str) -> Result<(), ImageError> {
        let profile = ImagePerformanceProfile::parse(profile)?;
        self.handler.set_performance_profile(profile)
    }

    pub fn get_performance_profile(&self) -> Result<String, ImageError> {
        let profile = self.handler.get_performance_profile()?;
        Ok(profile.as_str().to_string())
    }

    /// 把当前预览复制到系统剪贴板。
    pub async fn copy_preview_to_clipboard(&self) -> Result<(), ImageError> {
        let preview = self.lock_pipeline().preview().cloned().ok_or_else(|| {
            ImageError::NotReady("没有可复制的预览".to_string())
        })?;
        let config = self.handler.config_snapshot()?;
        ImageHandler::write_image_with_retry(&preview, &config).await
    }

    /// 把文本复制到系统剪贴板。
    pub async fn copy_text_to_clipboard(&self, text: String) -> Result<(), ImageError> {
        let config = self.handler.config_snapshot()?;
        ImageHandler::write_text_with_retry(text, &config).await
    }
}
