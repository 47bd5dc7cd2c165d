//! 命令行宿主
//!
//! 把一次“粘贴”落到命令行上：图片来源可以是文件、标准输入或系统剪贴板，
//! 处理结果写成三张 PNG（缩放图 / 灰度图 / 二值预览），或以 JSON 输出 Data URL。

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::Parser;
use image::DynamicImage;
use serde::Serialize;

use crate::clipboard::memory::MemoryClipboardItem;
use crate::clipboard::{ClipboardItem, system};
use crate::error::AppError;
use crate::image_handler::codec::encode_png;
use crate::image_handler::{
    ImageConfig, ImageError, ImagePerformanceProfile, PreviewImages, PreviewService,
    PreviewUpdate, threshold_from_u8,
};
use crate::settings::PreviewSettings;

/// paste-preview - 粘贴图片并生成阈值二值预览
#[derive(Parser, Debug)]
#[command(name = "paste-preview")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Image file to paste; `-` reads stdin; omit to read the system clipboard
    #[arg(value_name = "IMAGE")]
    pub image: Option<PathBuf>,

    /// Threshold on the 16-bit luminance scale (0-65535)
    #[arg(short, long, conflicts_with = "threshold8")]
    pub threshold: Option<u16>,

    /// Threshold on the 8-bit scale (0-255), expanded to 16 bits
    #[arg(long)]
    pub threshold8: Option<u8>,

    /// Swap the on/off colors of the preview
    #[arg(short, long)]
    pub invert: bool,

    /// Render width of the scaled image
    #[arg(short, long)]
    pub width: Option<u32>,

    /// Performance profile: quality, balanced or speed
    #[arg(short, long, value_parser = parse_profile)]
    pub profile: Option<ImagePerformanceProfile>,

    /// JSON settings file
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Directory for the generated PNG files
    #[arg(short, long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Print data URLs as JSON instead of writing files
    #[arg(long)]
    pub json: bool,

    /// Copy the preview (or the pasted text) back to the clipboard
    #[arg(long)]
    pub copy: bool,
}

fn parse_profile(s: &str) -> Result<ImagePerformanceProfile, String> {
    ImagePerformanceProfile::parse(s).map_err(|e| e.to_string())
}

/// `--json` 输出文档。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport {
    texts: Vec<String>,
    skipped: usize,
    preview: Option<PreviewImages>,
}

/// 按“默认值 → 设置文件 → 命令行参数”的顺序合成配置。
pub fn build_config(args: &Args) -> Result<ImageConfig, AppError> {
    let mut config = ImageConfig::default();

    if let Some(path) = &args.settings {
        match PreviewSettings::load(path)? {
            Some(settings) => settings.apply_to(&mut config)?,
            None => {
                return Err(AppError::Settings(format!("设置文件不存在: {}", path.display())));
            }
        }
    }

    if let Some(profile) = args.profile {
        config.apply_performance_profile(profile);
    }
    if let Some(width) = args.width {
        config.render_width = width;
    }
    if let Some(threshold) = args.threshold {
        config.threshold = threshold;
    }
    if let Some(threshold8) = args.threshold8 {
        config.threshold = threshold_from_u8(threshold8);
    }
    if args.invert {
        config.inverted = true;
    }

    config.validate()?;
    Ok(config)
}

/// 在阻塞线程中读完一个输入源，不占用异步工作线程。
async fn read_all_blocking<R>(mut reader: R) -> Result<Vec<u8>, AppError>
where
    R: Read + Send + 'static,
{
    let bytes = tokio::task::spawn_blocking(move || {
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer).map(|_| buffer)
    })
    .await
    .map_err(|e| AppError::Clipboard(format!("读取线程执行失败：{}", e)))??;
    Ok(bytes)
}

/// 按参数收集本次粘贴的条目。
async fn collect_items(image: Option<&Path>) -> Result<Vec<Box<dyn ClipboardItem>>, AppError> {
    match image {
        Some(path) if path.as_os_str() == "-" => {
            let buffer = read_all_blocking(io::stdin()).await?;
            log::info!("📥 从标准输入读取 {} 字节", buffer.len());
            let item: Box<dyn ClipboardItem> = Box::new(MemoryClipboardItem::from_bytes(&buffer));
            Ok(vec![item])
        }
        Some(path) => {
            let file = File::open(path).map_err(|e| {
                ImageError::FileSystem(format!("无法读取文件 {}：{}", path.display(), e))
            })?;
            let bytes = read_all_blocking(file).await?;
            let item: Box<dyn ClipboardItem> = Box::new(MemoryClipboardItem::from_bytes(&bytes));
            Ok(vec![item])
        }
        None => {
            log::info!("📋 读取系统剪贴板");
            let items = tokio::task::spawn_blocking(system::snapshot)
                .await
                .map_err(|e| AppError::Clipboard(format!("线程执行失败：{}", e)))??;
            Ok(items)
        }
    }
}

/// 把流水线中的三张位图写入 `out_dir`，返回写出的路径。
fn write_outputs(service: &PreviewService, out_dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let images = service.with_pipeline(|pipeline| {
        match (pipeline.scaled(), pipeline.grayscale(), pipeline.preview()) {
            (Some(scaled), Some(grayscale), Some(preview)) => Some([
                ("scaled", scaled.clone()),
                ("grayscale", DynamicImage::ImageLuma16(grayscale.clone())),
                ("preview", DynamicImage::ImageLuma8(preview.clone())),
            ]),
            _ => None,
        }
    });
    let images = images.ok_or_else(|| ImageError::NotReady("没有可写出的预览".to_string()))?;

    std::fs::create_dir_all(out_dir)?;
    let stem = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();

    let mut written = Vec::with_capacity(images.len());
    for (suffix, image) in images {
        let path = out_dir.join(format!("{}_{}.png", stem, suffix));
        std::fs::write(&path, encode_png(&image)?)?;
        log::debug!("💾 已写出 {}", path.display());
        written.push(path);
    }
    Ok(written)
}

/// 执行一次粘贴 → 预览。
pub async fn run(args: Args) -> Result<(), AppError> {
    let config = build_config(&args)?;
    let service = PreviewService::with_config(config)?;

    let items = collect_items(args.image.as_deref()).await?;
    let mut texts = Vec::new();
    let mut outcome = service.handle_paste(&items, |text| texts.push(text)).await?;

    if outcome.report.delivered_nothing() && !outcome.report.failures.is_empty() {
        return Err(outcome.report.failures.remove(0).into());
    }
    if outcome.report.is_empty_paste() {
        log::info!("📭 剪贴板中没有可用内容");
    }

    let updated = outcome.preview == PreviewUpdate::Updated;

    if args.json {
        let report = JsonReport {
            texts: texts.clone(),
            skipped: outcome.report.skipped,
            preview: if updated {
                Some(service.display_images()?)
            } else {
                None
            },
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for text in &texts {
            println!("{}", text);
        }
        if updated {
            for path in write_outputs(&service, &args.out_dir)? {
                println!("{}", path.display());
            }
        }
    }

    if args.copy {
        if updated {
            service.copy_preview_to_clipboard().await?;
        } else if let Some(text) = texts.into_iter().last() {
            service.copy_text_to_clipboard(text).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::imageops::FilterType;

    #[test]
    fn threshold8_expands_and_flags_override_defaults() {
        let args = Args::parse_from(["paste-preview", "--threshold8", "255", "-i", "-w", "64"]);
        let config = build_config(&args).expect("config");

        assert_eq!(config.threshold, u16::MAX);
        assert!(config.inverted);
        assert_eq!(config.render_width, 64);
    }

    #[test]
    fn threshold_flags_conflict() {
        let result = Args::try_parse_from(["paste-preview", "-t", "10", "--threshold8", "10"]);
        assert!(result.is_err());
    }

    #[test]
    fn profile_flag_is_parsed() {
        let args = Args::parse_from(["paste-preview", "--profile", "balanced"]);
        let config = build_config(&args).expect("config");
        assert_eq!(config.resize_filter, FilterType::CatmullRom);

        assert!(Args::try_parse_from(["paste-preview", "--profile", "turbo"]).is_err());
    }

    #[test]
    fn settings_file_is_applied_before_flags() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "renderWidth": 50, "threshold": 7 }"#).expect("write settings");

        let settings = path.to_string_lossy().to_string();
        let args = Args::parse_from(["paste-preview", "--settings", settings.as_str(), "-t", "9"]);
        let config = build_config(&args).expect("config");

        assert_eq!(config.render_width, 50);
        assert_eq!(config.threshold, 9);
    }

    #[test]
    fn missing_settings_file_is_an_error() {
        let args = Args::parse_from(["paste-preview", "--settings", "/nonexistent/settings.json"]);
        assert!(matches!(build_config(&args), Err(AppError::Settings(_))));
    }

    #[tokio::test]
    async fn blocking_reader_is_drained_off_the_runtime() {
        let payload = b"pasted from a pipe".to_vec();
        let bytes = read_all_blocking(io::Cursor::new(payload.clone()))
            .await
            .expect("read");
        assert_eq!(bytes, payload);
    }

    #[tokio::test]
    async fn missing_image_file_is_a_file_system_error() {
        let result = collect_items(Some(Path::new("/definitely/not/here.png"))).await;
        assert!(matches!(result, Err(AppError::Image(ImageError::FileSystem(_)))));
    }

    #[tokio::test]
    async fn run_writes_three_pngs() {
        let dir = tempfile::tempdir().expect("temp dir");
        let input = dir.path().join("input.png");
        let png = encode_png(&DynamicImage::new_rgb8(40, 20)).expect("encode");
        std::fs::write(&input, png).expect("write input");

        let out_dir = dir.path().join("out");
        let args = Args::parse_from([
            "paste-preview".to_string(),
            input.to_string_lossy().to_string(),
            "--out-dir".to_string(),
            out_dir.to_string_lossy().to_string(),
        ]);
        run(args).await.expect("run");

        let mut names: Vec<String> = std::fs::read_dir(&out_dir)
            .expect("read out dir")
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();

        assert_eq!(names.len(), 3);
        assert!(names[0].ends_with("_grayscale.png"));
        assert!(names[1].ends_with("_preview.png"));
        assert!(names[2].ends_with("_scaled.png"));
    }
}
