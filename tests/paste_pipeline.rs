// End-to-end paste handling through the public service API
use std::time::Duration;

use image::{DynamicImage, GenericImageView, ImageBuffer, Rgba};
use paste_preview::clipboard::memory::MemoryClipboardItem;
use paste_preview::clipboard::{ClipboardItem, KIND_FILE};
use paste_preview::image_handler::codec::{bytes_to_data_url, data_url_to_image, encode_png, image_to_data_url};
use paste_preview::image_handler::{ImageError, PipelineState, PreviewService, PreviewUpdate};
use tokio::sync::oneshot;

/// A file item whose read completes only after `delay`.
struct DelayedFileItem {
    data_url: String,
    delay: Duration,
}

impl ClipboardItem for DelayedFileItem {
    fn kind(&self) -> &str {
        KIND_FILE
    }

    fn mime_type(&self) -> &str {
        "image/png"
    }

    fn get_as_string(&self, done: oneshot::Sender<String>) {
        let _ = done.send(self.data_url.clone());
    }

    fn read_as_data_url(&self, done: oneshot::Sender<Result<String, String>>) {
        let data_url = self.data_url.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = done.send(Ok(data_url));
        });
    }
}

fn gradient_png(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        let v = ((x + y) % 256) as u8;
        Rgba([v, v / 2, 255 - v, 255])
    });
    encode_png(&DynamicImage::ImageRgba8(img)).expect("encode png")
}

fn boxed(item: impl ClipboardItem + 'static) -> Vec<Box<dyn ClipboardItem>> {
    vec![Box::new(item)]
}

#[tokio::test]
async fn string_paste_reaches_text_callback_and_leaves_bitmaps_alone() {
    let service = PreviewService::new().expect("service");
    let pasted = "multi\nline 📋 text ";
    let mut texts = Vec::new();

    let outcome = service
        .handle_paste(&boxed(MemoryClipboardItem::text(pasted)), |t| texts.push(t))
        .await
        .expect("paste");

    assert_eq!(texts, vec![pasted.to_string()]);
    assert_eq!(outcome.preview, PreviewUpdate::Unchanged);
    assert_eq!(service.state(), PipelineState::Empty);
}

#[tokio::test]
async fn unsupported_item_is_skipped_without_error() {
    let service = PreviewService::new().expect("service");

    let outcome = service
        .handle_paste(&boxed(MemoryClipboardItem::other("application/x-secret")), |_| {
            panic!("text callback must not fire")
        })
        .await
        .expect("paste");

    assert!(outcome.report.is_empty_paste());
    assert_eq!(outcome.report.skipped, 1);
    assert_eq!(outcome.preview, PreviewUpdate::Unchanged);
}

#[tokio::test]
async fn image_paste_produces_display_images() {
    let service = PreviewService::new().expect("service");
    let png = gradient_png(900, 300);

    let outcome = service
        .handle_paste(&boxed(MemoryClipboardItem::file_bytes("image/png", &png)), |_| {})
        .await
        .expect("paste");
    assert_eq!(outcome.preview, PreviewUpdate::Updated);

    let images = service.display_images().expect("display images");
    let scaled = data_url_to_image(&images.scaled).expect("scaled decodes");
    let preview = data_url_to_image(&images.preview).expect("preview decodes");
    assert_eq!(scaled.dimensions(), (300, 100));
    assert_eq!(preview.dimensions(), (300, 100));
    assert!(preview.to_luma8().pixels().all(|p| p[0] == 0 || p[0] == 255));
}

#[tokio::test]
async fn slower_earlier_paste_is_superseded_by_later_paste() {
    let service = PreviewService::new().expect("service");

    let slow = boxed(DelayedFileItem {
        data_url: bytes_to_data_url("image/png", &gradient_png(40, 40)),
        delay: Duration::from_millis(150),
    });
    let fast = boxed(MemoryClipboardItem::file_bytes("image/png", &gradient_png(60, 20)));

    let (first, second) = tokio::join!(
        service.handle_paste(&slow, |_| {}),
        service.handle_paste(&fast, |_| {}),
    );

    assert_eq!(first.expect("first paste").preview, PreviewUpdate::Superseded);
    assert_eq!(second.expect("second paste").preview, PreviewUpdate::Updated);

    let original = service.with_pipeline(|p| p.original().map(|img| img.dimensions()));
    assert_eq!(original, Some((60, 20)));
}

#[tokio::test]
async fn text_paste_during_slow_image_does_not_supersede_it() {
    let service = PreviewService::new().expect("service");

    let slow = boxed(DelayedFileItem {
        data_url: bytes_to_data_url("image/png", &gradient_png(40, 40)),
        delay: Duration::from_millis(150),
    });
    let text = boxed(MemoryClipboardItem::text("typed while loading"));
    let protected = boxed(MemoryClipboardItem::other("application/x-protected"));

    let mut texts = Vec::new();
    let (image, text_paste, protected_paste) = tokio::join!(
        service.handle_paste(&slow, |_| {}),
        service.handle_paste(&text, |t| texts.push(t)),
        service.handle_paste(&protected, |_| {}),
    );

    assert_eq!(image.expect("image paste").preview, PreviewUpdate::Updated);
    assert_eq!(text_paste.expect("text paste").preview, PreviewUpdate::Unchanged);
    assert_eq!(protected_paste.expect("protected paste").preview, PreviewUpdate::Unchanged);
    assert_eq!(texts, vec!["typed while loading".to_string()]);

    assert_eq!(service.state(), PipelineState::Previewed);
    let original = service.with_pipeline(|p| p.original().map(|img| img.dimensions()));
    assert_eq!(original, Some((40, 40)));
}

#[tokio::test]
async fn threshold_and_invert_update_preview_without_new_paste() {
    let service = PreviewService::new().expect("service");
    let png = gradient_png(50, 50);
    service
        .handle_paste(&boxed(MemoryClipboardItem::file_bytes("image/png", &png)), |_| {})
        .await
        .expect("paste");

    service.set_threshold(u16::MAX).expect("threshold");
    let all_off = service.with_pipeline(|p| p.preview().map(|img| img.pixels().all(|px| px[0] == 0)));
    assert_eq!(all_off, Some(true));

    service.set_inverted(true).expect("invert");
    let all_on = service.with_pipeline(|p| p.preview().map(|img| img.pixels().all(|px| px[0] == 255)));
    assert_eq!(all_on, Some(true));
    assert_eq!(service.state(), PipelineState::Previewed);
}

#[tokio::test]
async fn non_image_file_bytes_fail_to_decode() {
    let service = PreviewService::new().expect("service");
    let result = service
        .handle_paste(
            &boxed(MemoryClipboardItem::file_bytes("image/png", b"definitely not a png")),
            |_| {},
        )
        .await;

    assert!(matches!(result, Err(ImageError::Decode(_))));
    assert_eq!(service.state(), PipelineState::Empty);
}

#[test]
fn data_url_conversion_round_trips_pixels() {
    let img = DynamicImage::ImageRgba8(ImageBuffer::from_fn(3, 2, |x, y| {
        Rgba([x as u8 * 80, y as u8 * 120, 7, 255])
    }));

    let url = image_to_data_url(&img).expect("to data url");
    assert!(url.starts_with("data:image/png;base64,"));

    let back = data_url_to_image(&url).expect("from data url");
    assert_eq!(back.to_rgba8(), img.to_rgba8());
}
