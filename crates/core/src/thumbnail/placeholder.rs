//! Deterministic placeholder thumbnails.

use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};

use super::font;
use super::ThumbnailError;

const FRAME_INSET: u32 = 10;
const FRAME_WIDTH: u32 = 5;
const CAPTION: &str = "Auto-generated thumbnail";
const MAX_NAME_CHARS: usize = 30;

/// Background color derived from the md5 of the video path.
pub fn placeholder_color(video: &Path) -> Rgb<u8> {
    let digest = md5::compute(video.to_string_lossy().as_bytes());
    Rgb([digest[0], digest[1], digest[2]])
}

/// First caption line: `Video: <first 30 chars of file name>...`.
pub fn title_line(video: &Path) -> String {
    let name = video
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let short: String = name.chars().take(MAX_NAME_CHARS).collect();
    format!("Video: {}...", short)
}

/// Render the placeholder: solid color, white frame, two centered lines.
pub fn render(video: &Path, width: u32, height: u32) -> RgbImage {
    let white = Rgb([255, 255, 255]);
    let mut image = RgbImage::from_pixel(width, height, placeholder_color(video));

    draw_frame(&mut image, white);

    let title = title_line(video);
    let title_scale = fit_scale(&title, width, 6);
    let caption_scale = fit_scale(CAPTION, width, 4);

    let gap = font::line_height(caption_scale);
    let block = font::line_height(title_scale) + gap + font::line_height(caption_scale);
    let top = height.saturating_sub(block) / 2;

    let title_x = width.saturating_sub(font::text_width(&title, title_scale)) / 2;
    font::draw_text(&mut image, &title, title_x, top, title_scale, white);

    let caption_y = top + font::line_height(title_scale) + gap;
    let caption_x = width.saturating_sub(font::text_width(CAPTION, caption_scale)) / 2;
    font::draw_text(&mut image, CAPTION, caption_x, caption_y, caption_scale, white);

    image
}

/// Encode as JPEG at the given quality.
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, ThumbnailError> {
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100))
        .encode_image(image)
        .map_err(|e| ThumbnailError::Encode(e.to_string()))?;
    Ok(bytes)
}

fn draw_frame(image: &mut RgbImage, color: Rgb<u8>) {
    let (width, height) = image.dimensions();
    if width <= 2 * (FRAME_INSET + FRAME_WIDTH) || height <= 2 * (FRAME_INSET + FRAME_WIDTH) {
        return;
    }
    let (left, top) = (FRAME_INSET, FRAME_INSET);
    let (right, bottom) = (width - FRAME_INSET - 1, height - FRAME_INSET - 1);

    for x in left..=right {
        for t in 0..FRAME_WIDTH {
            image.put_pixel(x, top + t, color);
            image.put_pixel(x, bottom - t, color);
        }
    }
    for y in top..=bottom {
        for t in 0..FRAME_WIDTH {
            image.put_pixel(left + t, y, color);
            image.put_pixel(right - t, y, color);
        }
    }
}

/// Largest scale up to `preferred` at which `text` fits inside the frame.
fn fit_scale(text: &str, width: u32, preferred: u32) -> u32 {
    let usable = width.saturating_sub(2 * (FRAME_INSET + FRAME_WIDTH + 10));
    (1..=preferred)
        .rev()
        .find(|scale| font::text_width(text, *scale) <= usable)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_is_deterministic() {
        let a = placeholder_color(Path::new("/tmp/a.mp4"));
        assert_eq!(a, placeholder_color(Path::new("/tmp/a.mp4")));
        assert_ne!(a, placeholder_color(Path::new("/tmp/b.mp4")));

        let digest = md5::compute(b"/tmp/a.mp4");
        assert_eq!(a, Rgb([digest[0], digest[1], digest[2]]));
    }

    #[test]
    fn test_title_truncates_long_names() {
        let title = title_line(Path::new("/x/abcdefghijklmnopqrstuvwxyz0123456789.mp4"));
        assert_eq!(title, "Video: abcdefghijklmnopqrstuvwxyz0123...");
    }

    #[test]
    fn test_render_layout() {
        let video = Path::new("/tmp/clip.mp4");
        let image = render(video, 1280, 720);
        assert_eq!(image.dimensions(), (1280, 720));

        let white = Rgb([255, 255, 255]);
        assert_eq!(*image.get_pixel(10, 10), white);
        assert_eq!(*image.get_pixel(1269, 709), white);
        assert_eq!(*image.get_pixel(2, 2), placeholder_color(video));
    }

    #[test]
    fn test_encode_jpeg_roundtrip_dimensions() {
        let image = render(Path::new("/tmp/clip.mp4"), 320, 180);
        let bytes = encode_jpeg(&image, 95).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (320, 180));
    }
}
