use std::path::Path;

use image::imageops::FilterType;

use crate::photo::domain::image_writer::ImageWriter;
use crate::shared::frame::Frame;

/// Writes RGB frames with the `image` crate; the format follows the file
/// extension.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(
        &self,
        path: &Path,
        frame: &Frame,
        max_edge: Option<u32>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if frame.channels() != 3 {
            return Err(format!("Cannot write {}-channel frame", frame.channels()).into());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or("Frame data does not match its dimensions")?;

        let img = match max_edge.and_then(|edge| fit_within(img.width(), img.height(), edge)) {
            Some((w, h)) => image::imageops::resize(&img, w, h, FilterType::Triangle),
            None => img,
        };

        img.save(path)?;
        Ok(())
    }
}

/// Target size that fits `width`x`height` inside a `max_edge` square, or
/// `None` when no downscale is needed.
fn fit_within(width: u32, height: u32, max_edge: u32) -> Option<(u32, u32)> {
    let longest = width.max(height);
    if max_edge == 0 || longest <= max_edge {
        return None;
    }
    let scale = max_edge as f64 / longest as f64;
    let w = ((width as f64 * scale).round() as u32).max(1);
    let h = ((height as f64 * scale).round() as u32).max(1);
    Some((w, h))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Frame {
        Frame::new(rgb.repeat((width * height) as usize), width, height, 3)
    }

    #[test]
    fn test_png_keeps_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crop.png");
        ImageFileWriter::new()
            .write(&path, &solid(12, 9, [50, 100, 200]), None)
            .unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (12, 9));
        assert_eq!(img.get_pixel(5, 5).0, [50, 100, 200]);
    }

    #[test]
    fn test_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("3").join("0.jpg");
        ImageFileWriter::new()
            .write(&path, &solid(8, 8, [10, 10, 10]), None)
            .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_downscale_keeps_aspect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("thumb.png");
        ImageFileWriter::new()
            .write(&path, &solid(400, 100, [1, 2, 3]), Some(200))
            .unwrap();
        assert_eq!(image::open(&path).unwrap().to_rgb8().dimensions(), (200, 50));
    }

    #[test]
    fn test_small_frame_not_upscaled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.png");
        ImageFileWriter::new()
            .write(&path, &solid(30, 20, [1, 2, 3]), Some(256))
            .unwrap();
        assert_eq!(image::open(&path).unwrap().to_rgb8().dimensions(), (30, 20));
    }

    #[test]
    fn test_rejects_non_rgb() {
        let dir = tempfile::tempdir().unwrap();
        let frame = Frame::new(vec![0; 16], 4, 4, 1);
        assert!(ImageFileWriter::new()
            .write(&dir.path().join("x.png"), &frame, None)
            .is_err());
    }

    #[test]
    fn test_fit_within() {
        assert_eq!(fit_within(100, 50, 100), None);
        assert_eq!(fit_within(1000, 10, 100), Some((100, 1)));
        assert_eq!(fit_within(300, 600, 200), Some((100, 200)));
        assert_eq!(fit_within(300, 600, 0), None);
    }
}
