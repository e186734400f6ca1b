use crate::error::FrameError;
use image::{GrayImage, RgbImage};
use std::borrow::Cow;

/// Pixel layout of a [`Frame`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Interleaved 8-bit red, green, blue
    Rgb8,
    /// Single 8-bit luminance channel
    Luma8,
}

impl PixelFormat {
    /// Bytes per pixel
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Luma8 => 1,
        }
    }
}

/// Immutable pixel buffer with known dimensions and format
///
/// Invariant: `data.len() == width * height * format.channels()`, and both
/// dimensions are non-zero. Transforms never mutate a frame; they build a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: usize,
    height: usize,
    format: PixelFormat,
    data: Vec<u8>,
}

impl Frame {
    /// Build a frame, validating the buffer length against the dimensions
    pub fn new(
        width: usize,
        height: usize,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> Result<Self, FrameError> {
        if data.is_empty() {
            return Err(FrameError::Empty);
        }
        if width == 0 || height == 0 {
            return Err(FrameError::ZeroDimension { width, height });
        }
        let expected = width * height * format.channels();
        if data.len() != expected {
            return Err(FrameError::LengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// Build an RGB8 frame
    pub fn from_rgb(width: usize, height: usize, data: Vec<u8>) -> Result<Self, FrameError> {
        Self::new(width, height, PixelFormat::Rgb8, data)
    }

    /// Build a single-channel frame
    pub fn from_luma(width: usize, height: usize, data: Vec<u8>) -> Result<Self, FrameError> {
        Self::new(width, height, PixelFormat::Luma8, data)
    }

    /// Uniform RGB8 frame of the given shade
    pub fn filled(width: usize, height: usize, shade: u8) -> Result<Self, FrameError> {
        Self::from_rgb(width, height, vec![shade; width * height * 3])
    }

    /// Frame width in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Frame height in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Pixel format
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Raw pixel bytes, row-major
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the frame and return its buffer
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Longer of the two sides
    pub fn max_side(&self) -> usize {
        self.width.max(self.height)
    }

    /// Shorter of the two sides
    pub fn min_side(&self) -> usize {
        self.width.min(self.height)
    }

    /// Luminance plane, borrowed for `Luma8` frames and computed for `Rgb8`
    pub fn luma(&self) -> Cow<'_, [u8]> {
        match self.format {
            PixelFormat::Luma8 => Cow::Borrowed(&self.data),
            PixelFormat::Rgb8 => Cow::Owned(crate::transform::grayscale::rgb_to_luma(
                &self.data,
                self.width,
                self.height,
            )),
        }
    }

    /// Copy out a sub-rectangle; it must lie fully inside the frame
    pub fn crop(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> Result<Frame, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::ZeroDimension { width, height });
        }
        if x + width > self.width || y + height > self.height {
            return Err(FrameError::OutOfBounds {
                x,
                y,
                width,
                height,
                frame_width: self.width,
                frame_height: self.height,
            });
        }

        let channels = self.format.channels();
        let row_bytes = width * channels;
        let mut data = Vec::with_capacity(row_bytes * height);
        for row in y..y + height {
            let start = (row * self.width + x) * channels;
            data.extend_from_slice(&self.data[start..start + row_bytes]);
        }
        Frame::new(width, height, self.format, data)
    }

    /// Copy the frame into an `image` buffer with three channels
    pub fn to_rgb_image(&self) -> RgbImage {
        let rgb = match self.format {
            PixelFormat::Rgb8 => self.data.clone(),
            PixelFormat::Luma8 => self.data.iter().flat_map(|&v| [v, v, v]).collect(),
        };
        // Dimensions and length were validated at construction
        RgbImage::from_raw(self.width as u32, self.height as u32, rgb)
            .unwrap_or_else(|| RgbImage::new(self.width as u32, self.height as u32))
    }

    /// Copy the luminance plane into an `image` buffer
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_raw(self.width as u32, self.height as u32, self.luma().into_owned())
            .unwrap_or_else(|| GrayImage::new(self.width as u32, self.height as u32))
    }
}

impl TryFrom<RgbImage> for Frame {
    type Error = FrameError;

    fn try_from(img: RgbImage) -> Result<Self, Self::Error> {
        let (w, h) = img.dimensions();
        Frame::from_rgb(w as usize, h as usize, img.into_raw())
    }
}

impl TryFrom<GrayImage> for Frame {
    type Error = FrameError;

    fn try_from(img: GrayImage) -> Result<Self, Self::Error> {
        let (w, h) = img.dimensions();
        Frame::from_luma(w as usize, h as usize, img.into_raw())
    }
}
