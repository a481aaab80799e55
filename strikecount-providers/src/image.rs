use anyhow::anyhow;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// A still frame ready to be inlined into a provider request.
#[derive(Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: &'static str,
    pub base64: String,
}

impl std::fmt::Debug for InlineImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InlineImage")
            .field("mime_type", &self.mime_type)
            .field("base64_len", &self.base64.len())
            .finish()
    }
}

impl InlineImage {
    /// Validates the bytes look like a still image and base64-encodes them.
    pub fn encode(bytes: &[u8]) -> anyhow::Result<Self> {
        let mime_type =
            sniff_image_mime(bytes).ok_or_else(|| anyhow!("frame is not a decodable still image"))?;
        Ok(Self {
            mime_type,
            base64: STANDARD.encode(bytes),
        })
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

pub fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_common_formats() {
        assert_eq!(sniff_image_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(sniff_image_mime(b"\x89PNG\r\n\x1a\n...."), Some("image/png"));
        assert_eq!(sniff_image_mime(b"RIFF\0\0\0\0WEBPVP8 "), Some("image/webp"));
        assert_eq!(sniff_image_mime(b"GIF89a.."), Some("image/gif"));
        assert_eq!(sniff_image_mime(b"hello"), None);
        assert_eq!(sniff_image_mime(&[]), None);
    }

    #[test]
    fn builds_data_uri() {
        let img = InlineImage::encode(&[0xFF, 0xD8, 0xFF]).unwrap();
        assert_eq!(img.data_uri(), "data:image/jpeg;base64,/9j/");
    }

    #[test]
    fn rejects_non_images() {
        assert!(InlineImage::encode(b"not an image").is_err());
    }
}
