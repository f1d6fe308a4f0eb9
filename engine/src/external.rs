use async_trait::async_trait;

use crate::image::{BoundingBox, Image};
use crate::FaceError;

/// Finds faces in an image.
///
/// Implementations must be safe for concurrent use (Send + Sync).
#[async_trait]
pub trait Detector: Send + Sync {
    /// Returns the detected face boxes. An image without faces yields an
    /// empty list, not an error.
    async fn detect(&self, image: &Image) -> Result<Vec<BoundingBox>, FaceError>;
}

/// Converts a cropped face into a fixed-length embedding.
///
/// Implementations must be safe for concurrent use (Send + Sync).
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the embedding for a single face crop. Unprocessable input
    /// (e.g. below the model's minimum size) is an error.
    async fn embed(&self, face: &Image) -> Result<Vec<f32>, FaceError>;

    /// Returns the dimensionality of the output vectors.
    fn dimension(&self) -> usize;
}

/// Low-light enhancement applied before detection (contrast equalization,
/// denoising).
pub trait Enhancer: Send + Sync {
    fn enhance(&self, image: &Image) -> Result<Image, FaceError>;
}
