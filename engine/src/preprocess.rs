use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::external::Enhancer;
use crate::image::Image;

/// Decides whether an image is too dark for detection and, if so, runs the
/// configured [`Enhancer`] on it.
///
/// Stateless: the same input always gets the same treatment. An enhancer
/// failure falls back to the original image.
#[derive(Clone)]
pub struct Preprocessor {
    brightness_threshold: f64,
    enhancer: Option<Arc<dyn Enhancer>>,
}

impl fmt::Debug for Preprocessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Preprocessor")
            .field("brightness_threshold", &self.brightness_threshold)
            .field("enhancer", &self.enhancer.is_some())
            .finish()
    }
}

impl Preprocessor {
    /// Default mean-luma cutoff (0-255 scale) below which an image counts as low-light.
    pub const DEFAULT_BRIGHTNESS_THRESHOLD: f64 = 80.0;

    pub fn new(brightness_threshold: f64) -> Self {
        Self {
            brightness_threshold,
            enhancer: None,
        }
    }

    pub fn with_enhancer(mut self, enhancer: Arc<dyn Enhancer>) -> Self {
        self.enhancer = Some(enhancer);
        self
    }

    pub fn brightness_threshold(&self) -> f64 {
        self.brightness_threshold
    }

    /// True if the image's mean brightness is below the threshold.
    pub fn should_enhance(&self, image: &Image) -> bool {
        !image.is_empty() && image.mean_brightness() < self.brightness_threshold
    }

    /// Returns the image to hand to the detector.
    pub fn prepare<'a>(&self, image: &'a Image) -> Cow<'a, Image> {
        let Some(enhancer) = &self.enhancer else {
            return Cow::Borrowed(image);
        };
        if !self.should_enhance(image) {
            return Cow::Borrowed(image);
        }

        match enhancer.enhance(image) {
            Ok(enhanced) => {
                debug!(
                    before = image.mean_brightness(),
                    after = enhanced.mean_brightness(),
                    "low-light image enhanced"
                );
                Cow::Owned(enhanced)
            }
            Err(e) => {
                warn!(error = %e, "enhancement failed, using original image");
                Cow::Borrowed(image)
            }
        }
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BRIGHTNESS_THRESHOLD)
    }
}
