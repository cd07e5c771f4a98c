use ndarray::ArrayView3;

use crate::shared::bounding_box::BoundingBox;

/// A decoded photo or sub-image: contiguous RGB bytes in row-major order.
///
/// Format conversion happens at I/O boundaries only; the domain layer
/// treats pixel data as opaque.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Copies the pixels inside `bbox`, clamped to the frame bounds.
    ///
    /// A box lying entirely outside the frame yields an empty (0x0) frame.
    pub fn crop(&self, bbox: &BoundingBox) -> Frame {
        let fw = self.width as i32;
        let fh = self.height as i32;

        let x1 = bbox.x1.clamp(0, fw) as usize;
        let y1 = bbox.y1.clamp(0, fh) as usize;
        let x2 = bbox.x2.clamp(0, fw) as usize;
        let y2 = bbox.y2.clamp(0, fh) as usize;

        let crop_w = x2.saturating_sub(x1);
        let crop_h = y2.saturating_sub(y1);
        let channels = self.channels as usize;
        let stride = self.width as usize * channels;

        let mut data = Vec::with_capacity(crop_w * crop_h * channels);
        for row in y1..y1 + crop_h {
            let start = row * stride + x1 * channels;
            data.extend_from_slice(&self.data[start..start + crop_w * channels]);
        }

        Frame::new(data, crop_w as u32, crop_h as u32, self.channels)
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
