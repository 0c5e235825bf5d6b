//! Content fingerprints and typed cache keys.

use std::fmt;

use image::DynamicImage;
use sha2::{Digest, Sha256};

/// Deterministic SHA-256 digest of image content, as lower-case hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Digest an arbitrary byte sequence.
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(format!("{:x}", Sha256::digest(bytes)))
    }

    /// Digest a decoded image.
    ///
    /// Covers the dimensions and the RGB8 pixel buffer, so two encodings of
    /// the same picture share a fingerprint while a 2x8 and a 4x4 image
    /// with identical bytes do not.
    pub fn of_image(image: &DynamicImage) -> Self {
        let rgb = image.to_rgb8();
        let mut hasher = Sha256::new();
        hasher.update(rgb.width().to_le_bytes());
        hasher.update(rgb.height().to_le_bytes());
        hasher.update(rgb.as_raw());
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key into the memo cache.
///
/// Image predictions and recommendations share one cache; the variants keep
/// the two namespaces from colliding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Classification result for an image.
    Image(Fingerprint),
    /// Recommendation text for a disease label. The label is its own key.
    Label(String),
}

impl CacheKey {
    pub fn image(fingerprint: Fingerprint) -> Self {
        Self::Image(fingerprint)
    }

    pub fn label(label: impl Into<String>) -> Self {
        Self::Label(label.into())
    }

    /// Metric label for this key's namespace.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Image(_) => "image",
            Self::Label(_) => "label",
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image(fp) => write!(f, "image:{fp}"),
            Self::Label(label) => write!(f, "label:{label}"),
        }
    }
}
