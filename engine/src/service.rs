use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::debug;

use faceid_store::{EmbeddingStore, IdentityRecord, Snapshot};

use crate::config::EngineConfig;
use crate::external::{Detector, Embedder, Enhancer};
use crate::image::{BoundingBox, Image};
use crate::matcher::{MatchEngine, MatchResult};
use crate::preprocess::Preprocessor;
use crate::register::{Candidate, RegistrationPipeline};
use crate::FaceError;

/// Listing entry for an enrolled identity. Leaves out the embedding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentitySummary {
    pub id: u64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub source_count: u32,
}

impl From<&IdentityRecord> for IdentitySummary {
    fn from(r: &IdentityRecord) -> Self {
        Self {
            id: r.id,
            name: r.name.clone(),
            created_at: r.created_at,
            source_count: r.source_count,
        }
    }
}

/// Outcome for one detected face in [`FaceService::recognize_image`].
#[derive(Debug, Clone)]
pub struct FaceMatch {
    pub bbox: BoundingBox,
    /// Each face succeeds or fails on its own.
    pub result: Result<MatchResult, FaceError>,
}

/// Recognition and enrollment entry points over one store.
///
/// Built once and shared; it holds no global state. Embedding-level calls
/// (`recognize`, `register`) need nothing else, image-level calls need a
/// [`Detector`] and an [`Embedder`].
#[derive(Clone)]
pub struct FaceService {
    store: Arc<EmbeddingStore>,
    engine: MatchEngine,
    pipeline: RegistrationPipeline,
    preprocessor: Preprocessor,
    detector: Option<Arc<dyn Detector>>,
    embedder: Option<Arc<dyn Embedder>>,
    parallelism: usize,
    min_face_size: u32,
    detection_confidence: f32,
}

impl std::fmt::Debug for FaceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaceService")
            .field("identities", &self.store.len())
            .field("engine", &self.engine)
            .field("pipeline", &self.pipeline)
            .field("preprocessor", &self.preprocessor)
            .field("detector", &self.detector.is_some())
            .field("embedder", &self.embedder.is_some())
            .finish()
    }
}

impl FaceService {
    pub fn new(store: Arc<EmbeddingStore>, config: &EngineConfig) -> Result<Self, FaceError> {
        config.validate()?;
        Ok(Self {
            store,
            engine: MatchEngine::new(config.metric, config.threshold),
            pipeline: RegistrationPipeline::new(config.min_valid, config.max_candidates),
            preprocessor: Preprocessor::new(config.brightness_threshold),
            detector: None,
            embedder: None,
            parallelism: config.parallelism,
            min_face_size: config.min_face_size,
            detection_confidence: config.detection_confidence,
        })
    }

    pub fn with_detector(mut self, detector: Arc<dyn Detector>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_enhancer(mut self, enhancer: Arc<dyn Enhancer>) -> Self {
        self.preprocessor = self.preprocessor.with_enhancer(enhancer);
        self
    }

    pub fn store(&self) -> &Arc<EmbeddingStore> {
        &self.store
    }

    pub fn engine(&self) -> MatchEngine {
        self.engine
    }

    /// Current snapshot, for callers matching many queries at once.
    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    /// Matches one embedding against the enrolled identities.
    pub fn recognize(&self, embedding: &[f32]) -> Result<MatchResult, FaceError> {
        self.engine.match_store(embedding, &self.store)
    }

    /// Enrolls `name` from precomputed candidate embeddings.
    pub fn register(
        &self,
        name: &str,
        candidates: Vec<Candidate>,
    ) -> Result<Arc<IdentityRecord>, FaceError> {
        self.pipeline.register(&self.store, name, candidates)
    }

    /// All identities in enrollment order.
    pub fn list_identities(&self) -> Vec<IdentitySummary> {
        self.store
            .snapshot()
            .records()
            .iter()
            .map(|r| IdentitySummary::from(r.as_ref()))
            .collect()
    }

    pub fn get_identity(&self, id: u64) -> Result<Arc<IdentityRecord>, FaceError> {
        self.store.get(id).ok_or(FaceError::NotFound(id))
    }

    pub fn remove_identity(&self, id: u64) -> Result<(), FaceError> {
        self.store.remove(id)?;
        Ok(())
    }

    /// Detects every face in `image` and matches each one.
    ///
    /// Boxes below the detection confidence are skipped. Every remaining
    /// box gets a [`FaceMatch`], in detector order, and all of them are
    /// matched against the same snapshot. A detector failure fails the
    /// whole call.
    pub async fn recognize_image(&self, image: &Image) -> Result<Vec<FaceMatch>, FaceError> {
        let (detector, embedder) = self.collaborators()?;

        let prepared = self.preprocessor.prepare(image);
        let boxes: Vec<BoundingBox> = detector
            .detect(&prepared)
            .await?
            .into_iter()
            .filter(|b| b.confidence >= self.detection_confidence)
            .collect();
        debug!(faces = boxes.len(), "detected");

        let snapshot = self.store.snapshot();
        let image: &Image = &prepared;
        let snapshot = &snapshot;
        let matches: Vec<FaceMatch> = stream::iter(boxes)
            .map(|bbox| async move {
                let result = match self.embed_face(embedder, image, &bbox).await {
                    Ok(embedding) => self.engine.find(&embedding, snapshot),
                    Err(e) => Err(e),
                };
                FaceMatch { bbox, result }
            })
            .buffered(self.parallelism)
            .collect()
            .await;
        Ok(matches)
    }

    /// Enrolls `name` from photos.
    ///
    /// Each image contributes its highest-confidence face. Images that fail
    /// (no face, face too small, collaborator error) become rejected
    /// candidates, and the registration policy decides whether enough
    /// remain. Nothing is written until every image has been processed, so
    /// dropping the future early leaves the store unchanged.
    pub async fn register_images(
        &self,
        name: &str,
        images: &[Image],
    ) -> Result<Arc<IdentityRecord>, FaceError> {
        if name.trim().is_empty() {
            return Err(FaceError::InvalidName(name.to_string()));
        }
        let (detector, embedder) = self.collaborators()?;

        let images = match self.pipeline.max_candidates() {
            Some(max) if images.len() > max => &images[..max],
            _ => images,
        };

        let candidates: Vec<Candidate> = stream::iter(images.iter().enumerate())
            .map(|(i, image)| async move {
                match self.extract(detector, embedder, image).await {
                    Ok(embedding) => Candidate::accepted(embedding),
                    Err(e) => {
                        debug!(image = i, error = %e, "image rejected");
                        Candidate::rejected()
                    }
                }
            })
            .buffered(self.parallelism)
            .collect()
            .await;

        self.pipeline.register(&self.store, name, candidates)
    }

    fn collaborators(&self) -> Result<(&dyn Detector, &dyn Embedder), FaceError> {
        let detector = self
            .detector
            .as_deref()
            .ok_or_else(|| FaceError::Config("no face detector configured".into()))?;
        let embedder = self
            .embedder
            .as_deref()
            .ok_or_else(|| FaceError::Config("no face embedder configured".into()))?;
        if let Some(dim) = self.store.dimension() {
            if embedder.dimension() != dim {
                return Err(FaceError::DimensionMismatch {
                    expected: dim,
                    got: embedder.dimension(),
                });
            }
        }
        Ok((detector, embedder))
    }

    /// Best face of one enrollment image.
    async fn extract(
        &self,
        detector: &dyn Detector,
        embedder: &dyn Embedder,
        image: &Image,
    ) -> Result<Vec<f32>, FaceError> {
        let prepared = self.preprocessor.prepare(image);
        let best = detector
            .detect(&prepared)
            .await?
            .into_iter()
            .filter(|b| b.confidence >= self.detection_confidence)
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
            .ok_or(FaceError::NoFaceDetected)?;
        self.embed_face(embedder, &prepared, &best).await
    }

    async fn embed_face(
        &self,
        embedder: &dyn Embedder,
        image: &Image,
        bbox: &BoundingBox,
    ) -> Result<Vec<f32>, FaceError> {
        let face = image.crop(bbox).ok_or(FaceError::NoFaceDetected)?;
        if face.width() < self.min_face_size || face.height() < self.min_face_size {
            return Err(FaceError::FaceTooSmall {
                width: face.width(),
                height: face.height(),
                min: self.min_face_size,
            });
        }
        embedder.embed(&face).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use faceid_store::{MemoryBackend, StoreOptions};

    /// Reports one face covering the whole frame, unless the frame is black.
    struct FullFrame;

    #[async_trait]
    impl Detector for FullFrame {
        async fn detect(&self, image: &Image) -> Result<Vec<BoundingBox>, FaceError> {
            if image.mean_brightness() == 0.0 {
                return Ok(Vec::new());
            }
            Ok(vec![BoundingBox::new(
                0,
                0,
                image.width() as i32,
                image.height() as i32,
                0.95,
            )])
        }
    }

    /// Reports the same boxes for every image.
    struct Fixed(Vec<BoundingBox>);

    #[async_trait]
    impl Detector for Fixed {
        async fn detect(&self, _image: &Image) -> Result<Vec<BoundingBox>, FaceError> {
            Ok(self.0.clone())
        }
    }

    struct Failing;

    #[async_trait]
    impl Detector for Failing {
        async fn detect(&self, _image: &Image) -> Result<Vec<BoundingBox>, FaceError> {
            Err(FaceError::External("detector: model not loaded".into()))
        }
    }

    /// Embeds a face as its mean color, scaled to [0, 1].
    struct MeanColor;

    fn mean_color(face: &Image) -> Vec<f32> {
        let mut sum = [0f64; 3];
        for px in face.pixels().chunks_exact(3) {
            for c in 0..3 {
                sum[c] += px[c] as f64;
            }
        }
        let n = (face.pixels().len() / 3) as f64;
        sum.iter().map(|s| (s / n / 255.0) as f32).collect()
    }

    #[async_trait]
    impl Embedder for MeanColor {
        async fn embed(&self, face: &Image) -> Result<Vec<f32>, FaceError> {
            Ok(mean_color(face))
        }

        fn dimension(&self) -> usize {
            3
        }
    }

    /// MeanColor with a delay, tracking how many calls overlap.
    #[derive(Default)]
    struct Slow {
        delay: Duration,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for Slow {
        async fn embed(&self, face: &Image) -> Result<Vec<f32>, FaceError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(mean_color(face))
        }

        fn dimension(&self) -> usize {
            3
        }
    }

    fn service(config: EngineConfig) -> FaceService {
        let store =
            EmbeddingStore::open(Box::new(MemoryBackend::new()), StoreOptions::default()).unwrap();
        FaceService::new(Arc::new(store), &config).unwrap()
    }

    fn full_service(config: EngineConfig) -> FaceService {
        service(config)
            .with_detector(Arc::new(FullFrame))
            .with_embedder(Arc::new(MeanColor))
    }

    #[test]
    fn rejects_invalid_config() {
        let store =
            EmbeddingStore::open(Box::new(MemoryBackend::new()), StoreOptions::default()).unwrap();
        let cfg = EngineConfig {
            parallelism: 0,
            ..Default::default()
        };
        assert!(matches!(
            FaceService::new(Arc::new(store), &cfg),
            Err(FaceError::Config(_))
        ));
    }

    #[test]
    fn embedding_level_calls() {
        let svc = service(EngineConfig::default());
        let bob = svc
            .register("Bob", vec![Candidate::accepted(vec![1.0, 0.0, 0.0])])
            .unwrap();
        let amy = svc
            .register("Amy", vec![Candidate::accepted(vec![0.0, 1.0, 0.0])])
            .unwrap();

        let r = svc.recognize(&[0.9, 0.1, 0.0]).unwrap();
        assert_eq!(r.name(), Some("Bob"));

        let list = svc.list_identities();
        assert_eq!(
            list.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            vec!["Bob", "Amy"]
        );
        assert_eq!(list[0].id, bob.id);
        assert_eq!(list[0].source_count, 1);

        assert_eq!(svc.get_identity(amy.id).unwrap().name, "Amy");
        svc.remove_identity(amy.id).unwrap();
        assert_eq!(svc.get_identity(amy.id).unwrap_err(), FaceError::NotFound(amy.id));
        assert_eq!(
            svc.remove_identity(amy.id).unwrap_err(),
            FaceError::NotFound(amy.id)
        );
        assert_eq!(svc.list_identities().len(), 1);
    }

    #[test]
    fn recognize_checks_dimension() {
        let svc = service(EngineConfig::default());
        svc.register("Bob", vec![Candidate::accepted(vec![1.0, 0.0, 0.0])])
            .unwrap();
        assert_eq!(
            svc.recognize(&[1.0, 0.0]).unwrap_err(),
            FaceError::DimensionMismatch {
                expected: 3,
                got: 2
            }
        );
    }

    #[tokio::test]
    async fn register_then_recognize_images() {
        let svc = full_service(EngineConfig {
            threshold: 0.99,
            ..Default::default()
        });
        let photos = [
            Image::filled(32, 32, [200, 10, 10]),
            Image::filled(32, 32, [190, 20, 10]),
            Image::filled(32, 32, [210, 0, 20]),
        ];
        let alice = svc.register_images("  Alice ", &photos).await.unwrap();
        assert_eq!(alice.name, "Alice");
        assert_eq!(alice.source_count, 3);

        let want: Vec<f32> = (0..3)
            .map(|c| photos.iter().map(|p| mean_color(p)[c]).sum::<f32>() / 3.0)
            .collect();
        for (got, want) in alice.embedding.iter().zip(&want) {
            assert!((got - want).abs() < 1e-6);
        }

        let faces = svc
            .recognize_image(&Image::filled(40, 40, [205, 10, 10]))
            .await
            .unwrap();
        assert_eq!(faces.len(), 1);
        let r = faces[0].result.as_ref().unwrap();
        assert_eq!(r.label(), "Alice");

        let faces = svc
            .recognize_image(&Image::filled(40, 40, [10, 200, 10]))
            .await
            .unwrap();
        assert!(!faces[0].result.as_ref().unwrap().is_known);
    }

    #[tokio::test]
    async fn failed_images_become_rejected_candidates() {
        let svc = full_service(EngineConfig {
            min_valid: 2,
            ..Default::default()
        });
        let photos = [
            Image::filled(32, 32, [200, 10, 10]),
            Image::filled(32, 32, [0, 0, 0]),  // no face
            Image::filled(10, 10, [200, 10, 10]), // below min_face_size
        ];
        let err = svc.register_images("Carol", &photos).await.unwrap_err();
        assert_eq!(
            err,
            FaceError::InsufficientValidSamples {
                required: 2,
                valid: 1,
                dropped: 2
            }
        );
        assert!(svc.store().is_empty());
    }

    #[tokio::test]
    async fn detector_failure_rejects_image() {
        let svc = service(EngineConfig::default())
            .with_detector(Arc::new(Failing))
            .with_embedder(Arc::new(MeanColor));
        let photos = [Image::filled(32, 32, [200, 10, 10])];
        assert!(matches!(
            svc.register_images("Dan", &photos).await,
            Err(FaceError::InsufficientValidSamples { valid: 0, .. })
        ));
        assert!(matches!(
            svc.recognize_image(&photos[0]).await,
            Err(FaceError::External(_))
        ));
    }

    #[tokio::test]
    async fn per_face_results() {
        let svc = service(EngineConfig::default())
            .with_detector(Arc::new(Fixed(vec![
                BoundingBox::new(0, 0, 30, 30, 0.9),
                BoundingBox::new(40, 40, 45, 45, 0.8),
                BoundingBox::new(0, 30, 30, 60, 0.2),
            ])))
            .with_embedder(Arc::new(MeanColor));
        svc.register("Eve", vec![Candidate::accepted(vec![0.5, 0.5, 0.5])])
            .unwrap();

        let faces = svc
            .recognize_image(&Image::filled(64, 64, [128, 128, 128]))
            .await
            .unwrap();
        // The low-confidence box is skipped.
        assert_eq!(faces.len(), 2);
        assert_eq!(faces[0].bbox.x1, 0);
        assert_eq!(faces[0].result.as_ref().unwrap().label(), "Eve");
        assert_eq!(
            faces[1].result.as_ref().unwrap_err(),
            &FaceError::FaceTooSmall {
                width: 5,
                height: 5,
                min: 20
            }
        );
    }

    #[tokio::test]
    async fn image_calls_need_collaborators() {
        let svc = service(EngineConfig::default());
        let img = Image::filled(32, 32, [100, 100, 100]);
        assert!(matches!(
            svc.recognize_image(&img).await,
            Err(FaceError::Config(_))
        ));
        assert!(matches!(
            svc.register_images("Fay", &[img]).await,
            Err(FaceError::Config(_))
        ));
    }

    #[tokio::test]
    async fn embedder_dimension_must_match_store() {
        let store = EmbeddingStore::open(
            Box::new(MemoryBackend::new()),
            StoreOptions {
                dimension: Some(4),
                capacity: None,
            },
        )
        .unwrap();
        let svc = FaceService::new(Arc::new(store), &EngineConfig::default())
            .unwrap()
            .with_detector(Arc::new(FullFrame))
            .with_embedder(Arc::new(MeanColor));
        let want = FaceError::DimensionMismatch {
            expected: 4,
            got: 3,
        };

        let img = Image::filled(32, 32, [200, 10, 10]);
        assert_eq!(svc.recognize_image(&img).await.unwrap_err(), want);
        assert_eq!(
            svc.register_images("Jo", &[img]).await.unwrap_err(),
            want
        );
        assert!(svc.store().is_empty());
    }

    #[tokio::test]
    async fn invalid_name_fails_first() {
        let svc = full_service(EngineConfig::default());
        let photos = [Image::filled(32, 32, [200, 10, 10])];
        assert_eq!(
            svc.register_images("   ", &photos).await.unwrap_err(),
            FaceError::InvalidName("   ".into())
        );
    }

    #[tokio::test]
    async fn max_candidates_limits_images() {
        let svc = full_service(EngineConfig {
            max_candidates: Some(2),
            ..Default::default()
        });
        let photos = [
            Image::filled(32, 32, [200, 0, 0]),
            Image::filled(32, 32, [0, 200, 0]),
            Image::filled(32, 32, [0, 0, 200]),
        ];
        let rec = svc.register_images("Gus", &photos).await.unwrap();
        assert_eq!(rec.source_count, 2);
        assert!(rec.embedding[2].abs() < 1e-6);
    }

    #[tokio::test]
    async fn extraction_respects_parallelism() {
        let slow = Arc::new(Slow {
            delay: Duration::from_millis(10),
            ..Default::default()
        });
        let svc = service(EngineConfig {
            parallelism: 2,
            ..Default::default()
        })
        .with_detector(Arc::new(FullFrame))
        .with_embedder(slow.clone());

        let photos: Vec<Image> = (0..6)
            .map(|i| Image::filled(32, 32, [100 + i * 10, 50, 50]))
            .collect();
        let rec = svc.register_images("Hana", &photos).await.unwrap();
        assert_eq!(rec.source_count, 6);
        let peak = slow.peak.load(Ordering::SeqCst);
        assert!((1..=2).contains(&peak), "peak concurrency {peak}");
    }

    #[tokio::test]
    async fn cancelled_registration_writes_nothing() {
        let slow = Arc::new(Slow {
            delay: Duration::from_secs(5),
            ..Default::default()
        });
        let svc = service(EngineConfig::default())
            .with_detector(Arc::new(FullFrame))
            .with_embedder(slow);
        let photos = [
            Image::filled(32, 32, [200, 10, 10]),
            Image::filled(32, 32, [190, 20, 10]),
        ];

        let res = tokio::time::timeout(
            Duration::from_millis(20),
            svc.register_images("Ivan", &photos),
        )
        .await;
        assert!(res.is_err(), "registration should have been cancelled");
        assert!(svc.store().is_empty());
        assert!(svc.list_identities().is_empty());
    }
}
