//! # 阈值预览渲染
//!
//! 把 16 位亮度图逐像素与阈值比较，生成只有黑白两色的预览图。
//! 阈值与亮度使用同一 16 位刻度（0–65535）；来自 8 位滑块的值需先经 `threshold_from_u8` 扩展。

use image::{GrayImage, ImageBuffer, Luma};

use super::config::DEFAULT_THRESHOLD;
use super::source::Gray16Image;

/// 预览中的“亮”色。
pub const WHITE: Luma<u8> = Luma([u8::MAX]);
/// 预览中的“暗”色。
pub const BLACK: Luma<u8> = Luma([0]);

/// 预览参数，由 UI 控件驱动。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewParameters {
    /// 16 位刻度阈值，亮度严格大于该值时为“亮”。
    pub threshold: u16,
    /// 反色：交换亮/暗两种输出颜色。
    pub inverted: bool,
}

impl Default for PreviewParameters {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            inverted: false,
        }
    }
}

impl PreviewParameters {
    pub fn new(threshold: u16, inverted: bool) -> Self {
        Self { threshold, inverted }
    }

    fn colors(self) -> (Luma<u8>, Luma<u8>) {
        if self.inverted {
            (BLACK, WHITE)
        } else {
            (WHITE, BLACK)
        }
    }
}

/// 8 位阈值扩展到 16 位刻度（`v * 257`，0→0，255→65535）。
pub fn threshold_from_u8(value: u8) -> u16 {
    u16::from(value) * 257
}

/// 按参数渲染二值预览图。纯函数，空图返回空图。
pub fn render_preview(gray: &Gray16Image, params: PreviewParameters) -> GrayImage {
    let (on, off) = params.colors();
    let (width, height) = gray.dimensions();

    ImageBuffer::from_fn(width, height, |x, y| {
        if gray.get_pixel(x, y)[0] > params.threshold {
            on
        } else {
            off
        }
    })
}

/// `render_preview` 的展开参数版本。
pub fn render(gray: &Gray16Image, threshold: u16, inverted: bool) -> GrayImage {
    render_preview(gray, PreviewParameters::new(threshold, inverted))
}
