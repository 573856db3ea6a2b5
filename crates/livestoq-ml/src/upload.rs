//! Image payloads for the analysis request.

use std::path::Path;

use livestoq_core::Breed;

/// Image formats the analysis service accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMime {
    Jpeg,
    Png,
    Webp,
}

impl ImageMime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }

    /// Guess from a file extension; anything unrecognized is sent as JPEG.
    pub fn from_extension(ext: Option<&str>) -> Self {
        match ext.map(str::to_ascii_lowercase).as_deref() {
            Some("png") => Self::Png,
            Some("webp") => Self::Webp,
            _ => Self::Jpeg,
        }
    }
}

/// One image file to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime: ImageMime,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, mime: ImageMime, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime,
            bytes,
        }
    }

    /// Read an image from disk, inferring its type from the extension.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "livestock.jpg".to_string());
        let mime = ImageMime::from_extension(path.extension().and_then(|e| e.to_str()));
        Ok(Self::new(file_name, mime, bytes))
    }
}

/// Inputs of one combined analysis call.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// Lateral view. Required.
    pub side: ImageUpload,
    /// Teeth close-up. Enables age prediction.
    pub teeth: Option<ImageUpload>,
    pub breed: Breed,
}

impl AnalysisRequest {
    pub fn new(side: ImageUpload) -> Self {
        Self {
            side,
            teeth: None,
            breed: Breed::Generic,
        }
    }

    pub fn with_teeth(mut self, teeth: ImageUpload) -> Self {
        self.teeth = Some(teeth);
        self
    }

    pub fn with_breed(mut self, breed: Breed) -> Self {
        self.breed = breed;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_from_extension() {
        assert_eq!(ImageMime::from_extension(Some("PNG")), ImageMime::Png);
        assert_eq!(ImageMime::from_extension(Some("webp")), ImageMime::Webp);
        assert_eq!(ImageMime::from_extension(Some("jpeg")), ImageMime::Jpeg);
        assert_eq!(ImageMime::from_extension(Some("heic")), ImageMime::Jpeg);
        assert_eq!(ImageMime::from_extension(None), ImageMime::Jpeg);
    }

    #[tokio::test]
    async fn from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cow_side.png");
        std::fs::write(&path, b"\x89PNG fake").unwrap();

        let upload = ImageUpload::from_path(&path).await.unwrap();
        assert_eq!(upload.file_name, "cow_side.png");
        assert_eq!(upload.mime, ImageMime::Png);
        assert_eq!(upload.bytes, b"\x89PNG fake");
    }

    #[tokio::test]
    async fn from_path_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ImageUpload::from_path(&dir.path().join("nope.jpg")).await.is_err());
    }

    #[test]
    fn request_defaults_to_generic_breed() {
        let req = AnalysisRequest::new(ImageUpload::new("a.jpg", ImageMime::Jpeg, vec![1]));
        assert_eq!(req.breed, Breed::Generic);
        assert!(req.teeth.is_none());
    }
}
