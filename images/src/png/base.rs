//! Canonical PNG images for OCR ground truth.
//!
//! Any input the `image` crate can decode is turned into an 8-bit RGB
//! buffer on a freshly allocated canvas, so palette, transparency and
//! colour-profile metadata of the source never reach the output. Output is
//! always written as an uncompressed RGB PNG.

use std::{fs::File, io::{self, BufWriter}, path::{Path, PathBuf}};

use ::png::{BitDepth, ColorType, Compression, EncodingError};
use image::{imageops, ImageReader, RgbImage};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("{path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("{path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: EncodingError,
    },
}

/// Bytes per pixel of the canonical encoding.
pub const RGB_PIXEL_SIZE: usize = 3;

// Image metadata used by this module.
#[derive(Clone, Debug, PartialEq)]
pub struct InfoPNG {
    pub width: u32,
    pub height: u32,
    pub line_size: usize,
}

// In-memory RGB image: raw bytes + dimensions.
#[derive(Clone, Debug, PartialEq)]
pub struct ImagePNG {
    pub bytes: Vec<u8>,
    pub info: InfoPNG,
}

impl ImagePNG {
    /// Wraps an RGB byte buffer of `width * height * 3` bytes.
    pub fn new(bytes: Vec<u8>, width: u32, height: u32) -> Self {
        let info = InfoPNG {
            width,
            height,
            line_size: (width as usize) * RGB_PIXEL_SIZE,
        };
        Self { bytes, info }
    }

    /// Decodes an image file of any supported format into canonical RGB.
    ///
    /// The format is guessed from content, not from the extension. Decoding
    /// completes before this function returns, so the source file handle is
    /// already closed when the pixels are copied.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, ImageError> {
        let path = path.as_ref();
        let decoded = {
            let reader = ImageReader::open(path)
                .and_then(|reader| reader.with_guessed_format())
                .map_err(|source| ImageError::Open { path: path.to_path_buf(), source })?;
            reader
                .decode()
                .map_err(|source| ImageError::Decode { path: path.to_path_buf(), source })?
        };
        debug!(path = %path.display(), width = decoded.width(), height = decoded.height(), "decoded");
        Ok(Self::from_rgb(&decoded.to_rgb8()))
    }

    /// Pastes `source` onto a new opaque canvas of the same size.
    pub fn from_rgb(source: &RgbImage) -> Self {
        let mut canvas = RgbImage::new(source.width(), source.height());
        imageops::replace(&mut canvas, source, 0, 0);
        let (width, height) = canvas.dimensions();
        Self::new(canvas.into_raw(), width, height)
    }

    /// Writes the image as an uncompressed 8-bit RGB PNG.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), ImageError> {
        let path = path.as_ref();
        let encode_err = |source: EncodingError| ImageError::Encode { path: path.to_path_buf(), source };

        let file = File::create(path).map_err(|source| ImageError::Open { path: path.to_path_buf(), source })?;
        let w = BufWriter::new(file);

        let mut encoder = ::png::Encoder::new(w, self.info.width, self.info.height);
        encoder.set_color(ColorType::Rgb);
        encoder.set_depth(BitDepth::Eight);
        encoder.set_compression(Compression::NoCompression);

        let mut writer = encoder.write_header().map_err(encode_err)?;
        writer.write_image_data(&self.bytes).map_err(encode_err)?;
        writer.finish().map_err(encode_err)
    }

    /// RGB triple at `(x, y)`, if inside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.info.width || y >= self.info.height {
            return None;
        }
        let start = (y as usize) * self.info.line_size + (x as usize) * RGB_PIXEL_SIZE;
        let px = self.bytes.get(start..start + RGB_PIXEL_SIZE)?;
        Some([px[0], px[1], px[2]])
    }
}
