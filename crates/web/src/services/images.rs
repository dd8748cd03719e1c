//! Image intake for store photos.
//!
//! Uploads are checked by declared content type before anything is decoded,
//! then resized to a fixed width on the blocking pool and written under a
//! generated filename.

use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, imageops::FilterType};
use thiserror::Error;
use uuid::Uuid;

/// Multipart field carrying the photo.
pub const PHOTO_FIELD: &str = "photo";

/// Default resize width in pixels.
pub const DEFAULT_WIDTH: u32 = 800;

/// A file part received from a form.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Declared MIME type, e.g. `image/jpeg`.
    pub content_type: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

/// Errors from image intake.
#[derive(Debug, Error)]
pub enum ImageError {
    /// Declared content type is not `image/*`.
    #[error("That filetype is not accepted.")]
    NotAnImage,

    /// An `image/*` type this server cannot decode.
    #[error("unsupported image type: {0}")]
    Unsupported(String),

    /// More than one file under the photo field.
    #[error("only one photo may be uploaded")]
    TooManyFiles,

    /// The bytes could not be decoded or re-encoded.
    #[error("image processing failed: {0}")]
    Decode(#[from] image::ImageError),

    /// Writing the file failed.
    #[error("failed to write upload: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking resize task panicked or was cancelled.
    #[error("resize task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ImageError {
    /// Whether the client caused the error (as opposed to the server).
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::NotAnImage | Self::Unsupported(_) | Self::TooManyFiles | Self::Decode(_)
        )
    }
}

/// Collects the single photo part of a multipart form.
#[derive(Debug, Default)]
pub struct PhotoSlot {
    upload: Option<Upload>,
    seen: bool,
}

impl PhotoSlot {
    /// Record a photo part.
    ///
    /// # Errors
    ///
    /// Returns `ImageError::TooManyFiles` on the second part.
    pub fn accept(&mut self, upload: Upload) -> Result<(), ImageError> {
        if self.seen {
            return Err(ImageError::TooManyFiles);
        }
        self.seen = true;
        // Browsers send an empty part when no file was chosen.
        if !upload.bytes.is_empty() {
            self.upload = Some(upload);
        }
        Ok(())
    }

    /// The uploaded file, if a non-empty one arrived.
    #[must_use]
    pub fn into_upload(self) -> Option<Upload> {
        self.upload
    }
}

/// Validates, resizes and stores uploaded photos.
#[derive(Debug, Clone)]
pub struct ImageIntake {
    upload_dir: PathBuf,
    width: u32,
}

impl ImageIntake {
    /// Create an intake writing `width`-pixel-wide images into `upload_dir`.
    #[must_use]
    pub fn new(upload_dir: impl Into<PathBuf>, width: u32) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            width: width.max(1),
        }
    }

    /// Directory uploads are written to.
    #[must_use]
    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Process an optional upload and return the stored filename.
    ///
    /// `None` or an empty file yields `Ok(None)` without touching the disk.
    ///
    /// # Errors
    ///
    /// Returns `ImageError::NotAnImage` for non-`image/*` content types; no
    /// decoding or writing happens in that case.
    pub async fn intake(&self, upload: Option<Upload>) -> Result<Option<String>, ImageError> {
        let Some(upload) = upload.filter(|u| !u.bytes.is_empty()) else {
            return Ok(None);
        };

        let mime = upload
            .content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        let Some(subtype) = mime.strip_prefix("image/") else {
            return Err(ImageError::NotAnImage);
        };
        let format =
            ImageFormat::from_mime_type(&mime).ok_or_else(|| ImageError::Unsupported(mime.clone()))?;

        let filename = format!("{}.{subtype}", Uuid::new_v4());
        let path = self.upload_dir.join(&filename);
        let width = self.width;

        tokio::task::spawn_blocking(move || resize_and_write(&upload.bytes, format, width, &path))
            .await??;

        tracing::debug!(%filename, "Stored uploaded photo");
        Ok(Some(filename))
    }
}

/// Height that keeps the aspect ratio at the new width.
fn proportional_height(width: u32, height: u32, new_width: u32) -> u32 {
    if width == 0 {
        return 1;
    }
    let scaled = (u64::from(height) * u64::from(new_width) + u64::from(width) / 2) / u64::from(width);
    u32::try_from(scaled).unwrap_or(u32::MAX).max(1)
}

fn resize_and_write(
    bytes: &[u8],
    format: ImageFormat,
    width: u32,
    path: &Path,
) -> Result<(), ImageError> {
    let img = image::load_from_memory_with_format(bytes, format)?;
    let height = proportional_height(img.width(), img.height(), width);
    let resized = img.resize_exact(width, height, FilterType::Lanczos3);

    // JPEG has no alpha channel.
    let resized = if format == ImageFormat::Jpeg {
        DynamicImage::ImageRgb8(resized.to_rgb8())
    } else {
        resized
    };

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    resized.save_with_format(path, format)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Cursor;

    use image::{GenericImageView, RgbImage};

    use super::*;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn files_in(dir: &Path) -> usize {
        std::fs::read_dir(dir).map_or(0, Iterator::count)
    }

    #[tokio::test]
    async fn test_text_plain_rejected_before_write() {
        let dir = tempfile::tempdir().unwrap();
        let intake = ImageIntake::new(dir.path(), DEFAULT_WIDTH);

        let err = intake
            .intake(Some(Upload {
                content_type: "text/plain".to_owned(),
                bytes: b"hello".to_vec(),
            }))
            .await
            .unwrap_err();

        assert!(matches!(err, ImageError::NotAnImage));
        assert_eq!(err.to_string(), "That filetype is not accepted.");
        assert_eq!(files_in(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_missing_or_empty_upload_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let intake = ImageIntake::new(dir.path(), DEFAULT_WIDTH);

        assert!(intake.intake(None).await.unwrap().is_none());
        let empty = Upload {
            content_type: "application/octet-stream".to_owned(),
            bytes: Vec::new(),
        };
        assert!(intake.intake(Some(empty)).await.unwrap().is_none());
        assert_eq!(files_in(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_png_resized_to_width() {
        let dir = tempfile::tempdir().unwrap();
        let intake = ImageIntake::new(dir.path(), DEFAULT_WIDTH);

        let filename = intake
            .intake(Some(Upload {
                content_type: "image/png".to_owned(),
                bytes: png(1600, 400),
            }))
            .await
            .unwrap()
            .unwrap();

        assert!(filename.ends_with(".png"));
        assert!(Uuid::parse_str(filename.trim_end_matches(".png")).is_ok());
        let stored = image::open(dir.path().join(&filename)).unwrap();
        assert_eq!(stored.dimensions(), (800, 200));
    }

    #[tokio::test]
    async fn test_undecodable_image_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let intake = ImageIntake::new(dir.path(), DEFAULT_WIDTH);

        let err = intake
            .intake(Some(Upload {
                content_type: "image/png".to_owned(),
                bytes: b"not a png".to_vec(),
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::Decode(_)));
        assert_eq!(files_in(dir.path()), 0);
    }

    #[test]
    fn test_second_photo_part_rejected() {
        let part = || Upload {
            content_type: "image/png".to_owned(),
            bytes: vec![1],
        };
        let mut slot = PhotoSlot::default();
        slot.accept(part()).unwrap();
        assert!(matches!(slot.accept(part()), Err(ImageError::TooManyFiles)));
    }

    #[test]
    fn test_proportional_height() {
        assert_eq!(proportional_height(1600, 400, 800), 200);
        assert_eq!(proportional_height(400, 300, 800), 600);
        assert_eq!(proportional_height(3000, 1, 800), 1);
    }
}
