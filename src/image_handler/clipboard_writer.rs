//! # 剪贴板写入模块
//!
//! ## 设计思路
//!
//! 把预览图（或粘贴得到的文本）写回系统剪贴板。与操作系统剪贴板交互的逻辑独立在这里，
//! 便于隔离平台不稳定因素：其他进程持有剪贴板时写入会短暂失败，需要有限重试。
//!
//! ## 实现思路
//!
//! - 像素转换（Luma → RGBA）全部前置到打开剪贴板之前，持锁窗口只做 `set_image`。
//! - 写入在 `spawn_blocking` 中执行，避免阻塞 async 运行时。
//! - 重试使用“指数退避 + 抖动”，并受总预算与单次上限两个约束。
//! - 单次尝试抽象为闭包，重试策略可脱离真实剪贴板测试。

use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use image::{DynamicImage, GrayImage};

use super::{ImageConfig, ImageError, ImageHandler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClipboardFailureKind {
    Busy,
    Transient,
    Fatal,
}

#[derive(Debug, Clone)]
struct ClipboardWriteFailure {
    kind: ClipboardFailureKind,
    message: String,
}

impl ClipboardWriteFailure {
    fn busy(message: impl Into<String>) -> Self {
        Self {
            kind: ClipboardFailureKind::Busy,
            message: message.into(),
        }
    }

    fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: ClipboardFailureKind::Transient,
            message: message.into(),
        }
    }

    fn fatal(message: impl Into<String>) -> Self {
        Self {
            kind: ClipboardFailureKind::Fatal,
            message: message.into(),
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self.kind, ClipboardFailureKind::Busy | ClipboardFailureKind::Transient)
    }

    /// 按 arboard 错误语义归类。
    fn from_arboard(operation: &str, err: arboard::Error) -> Self {
        let message = format!("{}失败：{}", operation, err);
        match err {
            arboard::Error::ClipboardOccupied => Self::busy(message),
            arboard::Error::ConversionFailure | arboard::Error::ClipboardNotSupported => {
                Self::fatal(message)
            }
            _ => Self::transient(message),
        }
    }
}

/// 一次写入的重试参数，取自配置快照。
#[derive(Debug, Clone, Copy)]
struct RetryPolicy {
    retries: u32,
    delay_ms: u64,
    max_total_ms: u64,
    max_delay_ms: u64,
}

impl RetryPolicy {
    fn from_config(config: &ImageConfig) -> Self {
        Self {
            retries: config.clipboard_retries,
            delay_ms: config.clipboard_retry_delay,
            max_total_ms: config.clipboard_retry_max_total_ms,
            max_delay_ms: config.clipboard_retry_max_delay_ms,
        }
    }
}

static JITTER_STATE: AtomicU64 = AtomicU64::new(0);

fn seed_jitter_state() -> u64 {
    let time_seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let mut state = time_seed ^ ((std::process::id() as u64) << 32) ^ 0x9E37_79B9_7F4A_7C15;
    if state == 0 {
        state = 0xA5A5_5A5A_0123_4567;
    }
    state
}

/// xorshift64，状态放在原子变量里，多线程并发取值互不阻塞。
fn next_jitter_u64() -> u64 {
    let mut current = JITTER_STATE.load(Ordering::Relaxed);

    loop {
        let seeded = if current == 0 {
            seed_jitter_state()
        } else {
            current
        };

        let mut next = seeded;
        next ^= next << 13;
        next ^= next >> 7;
        next ^= next << 17;

        match JITTER_STATE.compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(observed) => current = observed,
        }
    }
}

fn compute_backoff_delay_with_jitter(base_delay_ms: u64, attempt: u32, max_delay_ms: u64) -> u64 {
    let exp = base_delay_ms.saturating_mul(1_u64 << attempt.saturating_sub(1).min(8));
    let capped = exp.min(max_delay_ms.max(base_delay_ms));
    let jitter_bound = (capped / 3).max(1);
    let jitter = next_jitter_u64() % (jitter_bound + 1);
    capped.saturating_add(jitter)
}

fn would_exceed_retry_budget(elapsed_ms: u64, wait_ms: u64, budget_ms: u64) -> bool {
    elapsed_ms.saturating_add(wait_ms) > budget_ms
}

/// 把二值预览图展开为 arboard 需要的 RGBA8 像素。
fn preview_to_rgba(preview: &GrayImage) -> (usize, usize, Vec<u8>) {
    let rgba = DynamicImage::ImageLuma8(preview.clone()).into_rgba8();
    let (width, height) = rgba.dimensions();
    (width as usize, height as usize, rgba.into_raw())
}

/// 按策略反复执行 `attempt_write`，直到成功、遇到不可重试错误或预算耗尽。
fn run_with_retry<F>(policy: RetryPolicy, mut attempt_write: F) -> Result<(), ImageError>
where
    F: FnMut() -> Result<(), ClipboardWriteFailure>,
{
    let retry_count = policy.retries.max(1);
    let started = Instant::now();
    let mut last_error = None;

    for attempt in 1..=retry_count {
        if attempt > 1 {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            if elapsed_ms >= policy.max_total_ms {
                log::warn!(
                    "⏱️ 剪贴板写入重试预算耗尽（{}ms >= {}ms）",
                    elapsed_ms,
                    policy.max_total_ms
                );
                break;
            }

            let wait_ms = compute_backoff_delay_with_jitter(
                policy.delay_ms.max(1),
                attempt - 1,
                policy.max_delay_ms,
            );

            if would_exceed_retry_budget(elapsed_ms, wait_ms, policy.max_total_ms) {
                log::warn!(
                    "⏱️ 跳过第 {} 次重试：等待 {}ms 会超过预算 {}ms",
                    attempt,
                    wait_ms,
                    policy.max_total_ms
                );
                break;
            }

            log::debug!(
                "🔄 重试 {}/{}，等待 {}ms（指数退避+抖动）",
                attempt,
                retry_count,
                wait_ms
            );
            std::thread::sleep(Duration::from_millis(wait_ms));
        }

        match attempt_write() {
            Ok(()) => {
                log::info!("✅ 复制成功 (尝试 {})", attempt);
                return Ok(());
            }
            Err(failure) => {
                let retryable = failure.is_retryable();
                log::warn!(
                    "❌ 尝试 {} 失败: {}（kind={:?}, retryable={}）",
                    attempt,
                    failure.message,
                    failure.kind,
                    retryable
                );
                last_error = Some(failure.message);

                if !retryable {
                    log::warn!("🛑 非可重试错误，提前终止重试");
                    break;
                }
            }
        }
    }

    Err(ImageError::Clipboard(
        last_error.unwrap_or_else(|| "未知错误".to_string()),
    ))
}

fn open_clipboard() -> Result<arboard::Clipboard, ClipboardWriteFailure> {
    arboard::Clipboard::new().map_err(|e| ClipboardWriteFailure::from_arboard("打开剪贴板", e))
}

impl ImageHandler {
    /// 将二值预览图写入系统剪贴板（含重试）。
    pub(crate) async fn write_image_with_retry(
        preview: &GrayImage,
        config: &ImageConfig,
    ) -> Result<(), ImageError> {
        let (width, height, bytes) = preview_to_rgba(preview);
        let policy = RetryPolicy::from_config(config);
        log::debug!("📋 准备复制预览到剪贴板 - {}x{}", width, height);

        tokio::task::spawn_blocking(move || {
            run_with_retry(policy, || {
                let mut clipboard = open_clipboard()?;
                let image_data = arboard::ImageData {
                    width,
                    height,
                    bytes: Cow::Borrowed(&bytes),
                };
                clipboard
                    .set_image(image_data)
                    .map_err(|e| ClipboardWriteFailure::from_arboard("写入图片", e))
            })
        })
        .await
        .map_err(|e| ImageError::Clipboard(format!("线程执行失败：{}", e)))?
    }

    /// 将文本写入系统剪贴板（含重试）。
    pub(crate) async fn write_text_with_retry(
        text: String,
        config: &ImageConfig,
    ) -> Result<(), ImageError> {
        let policy = RetryPolicy::from_config(config);
        log::debug!("📋 准备复制文本到剪贴板 - {} 字符", text.chars().count());

        tokio::task::spawn_blocking(move || {
            run_with_retry(policy, || {
                let mut clipboard = open_clipboard()?;
                clipboard
                    .set_text(text.as_str())
                    .map_err(|e| ClipboardWriteFailure::from_arboard("写入文本", e))
            })
        })
        .await
        .map_err(|e| ImageError::Clipboard(format!("线程执行失败：{}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn fast_policy(retries: u32) -> RetryPolicy {
        RetryPolicy {
            retries,
            delay_ms: 1,
            max_total_ms: 1_000,
            max_delay_ms: 5,
        }
    }

    #[test]
    fn backoff_delay_stays_within_expected_bounds() {
        let base = 100;
        let max_delay = 900;

        let delay = compute_backoff_delay_with_jitter(base, 4, max_delay);

        assert!(delay >= 800, "delay should be at least exponential base");
        assert!(delay <= 1200, "delay should include bounded jitter only");
    }

    #[test]
    fn backoff_delay_respects_max_cap() {
        let delay = compute_backoff_delay_with_jitter(300, 8, 500);

        assert!(delay >= 500, "delay should be capped at max_delay floor");
        assert!(delay <= 666, "delay should not exceed capped value + jitter");
    }

    #[test]
    fn retry_budget_checker_works() {
        assert!(would_exceed_retry_budget(1700, 120, 1800));
        assert!(!would_exceed_retry_budget(1600, 120, 1800));
        assert!(!would_exceed_retry_budget(0, 0, 1800));
    }

    #[test]
    fn busy_clipboard_is_retried_until_success() {
        let mut calls = 0;
        let result = run_with_retry(fast_policy(3), || {
            calls += 1;
            if calls < 3 {
                Err(ClipboardWriteFailure::busy("occupied"))
            } else {
                Ok(())
            }
        });

        assert!(result.is_ok());
        assert_eq!(calls, 3);
    }

    #[test]
    fn fatal_failure_stops_immediately() {
        let mut calls = 0;
        let result = run_with_retry(fast_policy(5), || {
            calls += 1;
            Err(ClipboardWriteFailure::fatal("unsupported"))
        });

        assert!(matches!(result, Err(ImageError::Clipboard(msg)) if msg == "unsupported"));
        assert_eq!(calls, 1);
    }

    #[test]
    fn exhausted_retries_report_last_error() {
        let mut calls = 0;
        let result = run_with_retry(fast_policy(2), || {
            calls += 1;
            Err(ClipboardWriteFailure::transient(format!("attempt {}", calls)))
        });

        assert!(matches!(result, Err(ImageError::Clipboard(msg)) if msg == "attempt 2"));
    }

    #[test]
    fn preview_expands_to_opaque_rgba() {
        let preview = GrayImage::from_fn(2, 1, |x, _| if x == 0 { Luma([0]) } else { Luma([255]) });
        let (width, height, bytes) = preview_to_rgba(&preview);

        assert_eq!((width, height), (2, 1));
        assert_eq!(bytes, vec![0, 0, 0, 255, 255, 255, 255, 255]);
    }
}
