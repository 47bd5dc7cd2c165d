//! # 预览流水线状态机
//!
//! ## 设计思路
//!
//! 一个展示面对应一个 `PreviewPipeline`，独占本次粘贴周期的全部位图：
//!
//! ```text
//! Empty → Decoded → Scaled → Grayscaled → Previewed
//!   ↑                                          │
//!   └──────── 新粘贴 / 任一阶段失败 ───────────┘
//! ```
//!
//! - 新粘贴先回到 `Empty`，再依次推进；任一阶段失败停在 `Empty`，不保留半成品。
//! - 解码/缩放/灰度在阻塞线程中由 `pipeline::prepare` 完成，`install` 在持锁期间
//!   按 `Decoded → Scaled → Grayscaled → Previewed` 的顺序逐级提交，
//!   外部观察者只会看到 `Empty` 或完整的 `Previewed`。`history` 记录本周期经过的阶段。
//! - 阈值/反色变化只从 `Grayscaled` 重新进入 `Previewed`，无需重新解码。
//! - 在 `Grayscaled` 之前修改参数：参数被记录（供下次粘贴使用），返回 `NotReady`。

use image::{DynamicImage, GrayImage};

use super::codec::image_to_data_url;
use super::source::{Gray16Image, PreparedPreview};
use super::threshold::{PreviewParameters, render_preview};
use super::ImageError;

/// 流水线所处阶段。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    #[default]
    Empty,
    Decoded,
    Scaled,
    Grayscaled,
    Previewed,
}

impl PipelineState {
    /// 是否已具备重新渲染预览所需的亮度图。
    pub fn can_render(self) -> bool {
        self >= Self::Grayscaled
    }
}

/// 展示层所需的三张图（PNG Data URL）。
#[derive(Debug, Clone, serde::Serialize)]
pub struct PreviewImages {
    pub scaled: String,
    pub grayscale: String,
    pub preview: String,
    pub threshold: u16,
    pub inverted: bool,
}

/// 单个展示面的预览流水线。
#[derive(Debug, Clone, Default)]
pub struct PreviewPipeline {
    state: PipelineState,
    original: Option<DynamicImage>,
    scaled: Option<DynamicImage>,
    grayscale: Option<Gray16Image>,
    preview: Option<GrayImage>,
    params: PreviewParameters,
    history: Vec<PipelineState>,
}

impl PreviewPipeline {
    pub fn new(params: PreviewParameters) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn parameters(&self) -> PreviewParameters {
        self.params
    }

    pub fn original(&self) -> Option<&DynamicImage> {
        self.original.as_ref()
    }

    pub fn scaled(&self) -> Option<&DynamicImage> {
        self.scaled.as_ref()
    }

    pub fn grayscale(&self) -> Option<&Gray16Image> {
        self.grayscale.as_ref()
    }

    pub fn preview(&self) -> Option<&GrayImage> {
        self.preview.as_ref()
    }

    /// 本周期（自上次 `reset` 起）依次进入的阶段。
    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    fn enter(&mut self, state: PipelineState) {
        if self.state != state {
            log::trace!("流水线阶段 {:?} → {:?}", self.state, state);
            self.history.push(state);
        }
        self.state = state;
    }

    /// 丢弃全部位图，回到 `Empty`。参数保留。
    pub fn reset(&mut self) {
        self.state = PipelineState::Empty;
        self.original = None;
        self.scaled = None;
        self.grayscale = None;
        self.preview = None;
        self.history.clear();
    }

    /// 提交在阻塞线程中准备好的三张图，逐级推进阶段并渲染预览。
    pub fn install(&mut self, prepared: PreparedPreview) -> &GrayImage {
        let PreparedPreview {
            original,
            scaled,
            grayscale,
        } = prepared;

        self.reset();

        self.original = Some(original);
        self.enter(PipelineState::Decoded);

        self.scaled = Some(scaled);
        self.enter(PipelineState::Scaled);

        let preview = render_preview(&grayscale, self.params);
        self.grayscale = Some(grayscale);
        self.enter(PipelineState::Grayscaled);

        self.enter(PipelineState::Previewed);
        &*self.preview.insert(preview)
    }

    /// 更新预览参数并重新渲染。
    pub fn set_parameters(&mut self, params: PreviewParameters) -> Result<&GrayImage, ImageError> {
        self.params = params;
        self.render()
    }

    pub fn set_threshold(&mut self, threshold: u16) -> Result<&GrayImage, ImageError> {
        self.set_parameters(PreviewParameters {
            threshold,
            ..self.params
        })
    }

    pub fn set_inverted(&mut self, inverted: bool) -> Result<&GrayImage, ImageError> {
        self.set_parameters(PreviewParameters {
            inverted,
            ..self.params
        })
    }

    fn render(&mut self) -> Result<&GrayImage, ImageError> {
        let grayscale = match (&self.grayscale, self.state.can_render()) {
            (Some(grayscale), true) => grayscale,
            _ => {
                return Err(ImageError::NotReady(format!(
                    "当前阶段 {:?} 尚无亮度图，参数将在下次粘贴时生效",
                    self.state
                )));
            }
        };

        let preview = render_preview(grayscale, self.params);
        self.enter(PipelineState::Previewed);
        Ok(&*self.preview.insert(preview))
    }

    /// 输出展示层需要的 Data URL。
    pub fn display_images(&self) -> Result<PreviewImages, ImageError> {
        let (Some(scaled), Some(grayscale), Some(preview)) =
            (&self.scaled, &self.grayscale, &self.preview)
        else {
            return Err(ImageError::NotReady(format!(
                "当前阶段 {:?} 没有可展示的预览",
                self.state
            )));
        };

        Ok(PreviewImages {
            scaled: image_to_data_url(scaled)?,
            grayscale: image_to_data_url(&DynamicImage::ImageLuma16(grayscale.clone()))?,
            preview: image_to_data_url(&DynamicImage::ImageLuma8(preview.clone()))?,
            threshold: self.params.threshold,
            inverted: self.params.inverted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_handler::ImageConfig;
    use crate::image_handler::codec::encode_png;
    use crate::image_handler::pipeline::prepare;
    use image::{ImageBuffer, Rgba};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, _| {
            let v = if x < width / 2 { 0 } else { 255 };
            Rgba([v, v, v, 255])
        });
        encode_png(&DynamicImage::ImageRgba8(img)).expect("encode png")
    }

    fn prepared(width: u32, height: u32) -> PreparedPreview {
        prepare(&png(width, height), &ImageConfig::default()).expect("prepare")
    }

    #[test]
    fn install_walks_every_stage_to_previewed() {
        let mut pipeline = PreviewPipeline::default();
        assert_eq!(pipeline.state(), PipelineState::Empty);
        assert!(pipeline.history().is_empty());

        let preview = pipeline.install(prepared(60, 30));
        assert_eq!(preview.dimensions(), (300, 150));
        assert_eq!(pipeline.state(), PipelineState::Previewed);
        assert!(pipeline.state().can_render());
        assert_eq!(
            pipeline.history(),
            &[
                PipelineState::Decoded,
                PipelineState::Scaled,
                PipelineState::Grayscaled,
                PipelineState::Previewed,
            ]
        );
        assert_eq!(pipeline.original().map(|i| (i.width(), i.height())), Some((60, 30)));
        assert!(pipeline.scaled().is_some());
        assert!(pipeline.grayscale().is_some());
    }

    #[test]
    fn second_install_starts_a_fresh_cycle() {
        let mut pipeline = PreviewPipeline::default();
        pipeline.install(prepared(10, 10));
        pipeline.install(prepared(20, 10));

        assert_eq!(pipeline.history().len(), 4);
        assert_eq!(pipeline.original().map(|i| (i.width(), i.height())), Some((20, 10)));
    }

    #[test]
    fn reset_drops_previous_cycle() {
        let mut pipeline = PreviewPipeline::default();
        pipeline.install(prepared(10, 10));

        pipeline.reset();
        assert_eq!(pipeline.state(), PipelineState::Empty);
        assert!(pipeline.history().is_empty());
        assert!(pipeline.original().is_none());
        assert!(pipeline.grayscale().is_none());
        assert!(pipeline.preview().is_none());
    }

    #[test]
    fn parameter_change_before_decode_is_not_ready_but_remembered() {
        let mut pipeline = PreviewPipeline::default();
        let result = pipeline.set_threshold(1_000);
        assert!(matches!(result, Err(ImageError::NotReady(_))));
        assert_eq!(pipeline.state(), PipelineState::Empty);
        assert_eq!(pipeline.parameters().threshold, 1_000);
    }

    #[test]
    fn parameter_change_rerenders_without_redecode() {
        let mut pipeline = PreviewPipeline::default();
        pipeline.install(prepared(20, 10));
        let before = pipeline.preview().cloned().expect("preview");
        let gray_before = pipeline.grayscale().cloned();

        let after = pipeline.set_inverted(true).expect("invert").clone();
        assert_eq!(pipeline.grayscale().cloned(), gray_before);
        assert_eq!(pipeline.history().len(), 4);
        for (a, b) in before.pixels().zip(after.pixels()) {
            assert_eq!(a[0], u8::MAX - b[0]);
        }
    }

    #[test]
    fn display_images_requires_preview() {
        let pipeline = PreviewPipeline::default();
        assert!(matches!(pipeline.display_images(), Err(ImageError::NotReady(_))));
    }

    #[test]
    fn display_images_reports_parameters() {
        let mut pipeline = PreviewPipeline::new(PreviewParameters::new(123, true));
        pipeline.install(prepared(4, 4));

        let images = pipeline.display_images().expect("display images");
        assert!(images.preview.starts_with("data:image/png;base64,"));
        assert_eq!(images.threshold, 123);
        assert!(images.inverted);
    }
}
