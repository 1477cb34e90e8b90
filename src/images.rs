//! Image collaborator: intrinsic sizes for layout, decoded pixels for the PDF backend.

use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, ImageReader};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImageInfo {
    pub width_px: u32,
    pub height_px: u32,
    /// Resolution stored in the file, in dpi, when the decoder reports one.
    pub resolution: Option<f32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageFailure {
    FileNotFound,
    InvalidType,
    NotRead,
    EmptySize,
}

impl ImageFailure {
    /// Diagnostic shown inside the placeholder box.
    pub fn message(self) -> &'static str {
        match self {
            ImageFailure::FileNotFound => "Image not found",
            ImageFailure::InvalidType => "Image has an unsupported type",
            ImageFailure::NotRead => "Image could not be read",
            ImageFailure::EmptySize => "Image has an empty size",
        }
    }
}

pub trait ImageSource: Sync {
    fn intrinsic(&self, source: &str) -> Result<ImageInfo, ImageFailure>;

    /// Full decode, only needed by backends that embed pixels.
    fn decode(&self, source: &str) -> Result<DynamicImage, ImageFailure> {
        let _ = source;
        Err(ImageFailure::NotRead)
    }

    /// Original file bytes when the image is a JPEG, so backends can pass
    /// them through without re-encoding.
    fn jpeg_bytes(&self, source: &str) -> Option<Vec<u8>> {
        let _ = source;
        None
    }
}

/// Reads PNG and JPEG files, resolving relative names against `base_dir`.
#[derive(Clone, Debug, Default)]
pub struct FileImageSource {
    base_dir: Option<PathBuf>,
}

impl FileImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(dir.into()),
        }
    }

    fn resolve(&self, source: &str) -> PathBuf {
        let path = Path::new(source);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    fn open(&self, source: &str) -> Result<ImageReader<std::io::BufReader<std::fs::File>>, ImageFailure> {
        let path = self.resolve(source);
        if !path.is_file() {
            return Err(ImageFailure::FileNotFound);
        }
        let reader = ImageReader::open(&path).map_err(|_| ImageFailure::NotRead)?;
        let reader = reader
            .with_guessed_format()
            .map_err(|_| ImageFailure::NotRead)?;
        if reader.format().is_none() {
            return Err(ImageFailure::InvalidType);
        }
        Ok(reader)
    }
}

impl ImageSource for FileImageSource {
    fn intrinsic(&self, source: &str) -> Result<ImageInfo, ImageFailure> {
        let (width_px, height_px) = self
            .open(source)?
            .into_dimensions()
            .map_err(classify)?;
        if width_px == 0 || height_px == 0 {
            return Err(ImageFailure::EmptySize);
        }
        Ok(ImageInfo {
            width_px,
            height_px,
            resolution: None,
        })
    }

    fn decode(&self, source: &str) -> Result<DynamicImage, ImageFailure> {
        self.open(source)?.decode().map_err(classify)
    }

    fn jpeg_bytes(&self, source: &str) -> Option<Vec<u8>> {
        let reader = self.open(source).ok()?;
        if reader.format() != Some(ImageFormat::Jpeg) {
            return None;
        }
        std::fs::read(self.resolve(source)).ok()
    }
}

fn classify(err: image::ImageError) -> ImageFailure {
    match err {
        image::ImageError::Unsupported(_) => ImageFailure::InvalidType,
        _ => ImageFailure::NotRead,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_classified() {
        let src = FileImageSource::with_base_dir("/nonexistent-flowpage-dir");
        assert_eq!(src.intrinsic("logo.png"), Err(ImageFailure::FileNotFound));
    }

    #[test]
    fn reads_png_dimensions() {
        let dir = std::env::temp_dir().join(format!("flowpage-img-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("dot.png");
        image::RgbImage::from_pixel(4, 3, image::Rgb([200, 10, 10]))
            .save(&path)
            .unwrap();

        let src = FileImageSource::with_base_dir(&dir);
        let info = src.intrinsic("dot.png").unwrap();
        assert_eq!((info.width_px, info.height_px), (4, 3));
        assert_eq!(src.decode("dot.png").unwrap().width(), 4);
        assert!(src.jpeg_bytes("dot.png").is_none());

        std::fs::write(dir.join("junk.png"), b"not an image").unwrap();
        assert!(src.intrinsic("junk.png").is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
