//! Tests for [`PlantClassifier`] with a mock model backend.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};

use leafmend::cache::MemoCache;
use leafmend::classify::{ClassIndex, ImageClassifier, PixelTensor, PlantClassifier, Preprocessor};
use leafmend::{LeafmendError, Result, display};

// ============================================================================
// Mock backends
// ============================================================================

/// Returns fixed scores and counts how often it was asked.
struct MockClassifier {
    scores: Vec<f32>,
    calls: AtomicUsize,
}

impl MockClassifier {
    fn new(scores: Vec<f32>) -> Arc<Self> {
        Arc::new(Self {
            scores,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageClassifier for MockClassifier {
    fn name(&self) -> &str {
        "mock"
    }

    async fn predict(&self, input: &PixelTensor) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(input.shape()[0], 1);
        assert_eq!(input.shape()[3], 3);
        Ok(self.scores.clone())
    }
}

/// Fails every call.
struct BrokenClassifier;

#[async_trait]
impl ImageClassifier for BrokenClassifier {
    fn name(&self) -> &str {
        "broken"
    }

    async fn predict(&self, _input: &PixelTensor) -> Result<Vec<f32>> {
        Err(LeafmendError::Inference("session crashed".into()))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn class_index() -> ClassIndex {
    ClassIndex::from_json(
        r#"{"0": "Tomato___Bacterial_spot", "1": "Tomato___Late_blight", "2": "Tomato___healthy"}"#,
    )
    .unwrap()
}

fn leaf_png(seed: u8) -> Vec<u8> {
    let img = ImageBuffer::from_fn(16, 16, |x, y| {
        Rgb([seed, (x * 8) as u8, (y * 8) as u8])
    });
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn same_image_twice_classified_once() {
    let model = MockClassifier::new(vec![0.1, 0.8, 0.1]);
    let cache = Arc::new(MemoCache::new());
    let classifier = PlantClassifier::new(model.clone(), class_index(), Arc::clone(&cache));

    let bytes = leaf_png(10);
    let first = classifier.classify(&bytes).await.unwrap();
    let second = classifier.classify(&bytes).await.unwrap();

    assert_eq!(first, "Tomato___Late_blight");
    assert_eq!(first, second);
    assert_eq!(model.calls(), 1);
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn different_images_classified_separately() {
    let model = MockClassifier::new(vec![0.9, 0.05, 0.05]);
    let classifier =
        PlantClassifier::new(model.clone(), class_index(), Arc::new(MemoCache::new()));

    classifier.classify(&leaf_png(1)).await.unwrap();
    classifier.classify(&leaf_png(2)).await.unwrap();

    assert_eq!(model.calls(), 2);
}

#[tokio::test]
async fn same_pixels_different_encoding_share_entry() {
    let model = MockClassifier::new(vec![0.0, 0.0, 1.0]);
    let classifier =
        PlantClassifier::new(model.clone(), class_index(), Arc::new(MemoCache::new()));

    let png = leaf_png(42);
    let image = image::load_from_memory(&png).unwrap();
    let mut bmp = Cursor::new(Vec::new());
    image.write_to(&mut bmp, ImageFormat::Bmp).unwrap();

    assert_eq!(classifier.classify(&png).await.unwrap(), "Tomato___healthy");
    assert_eq!(
        classifier.classify(&bmp.into_inner()).await.unwrap(),
        "Tomato___healthy"
    );
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn disabled_model_returns_sentinel_without_caching() {
    let cache = Arc::new(MemoCache::new());
    let classifier = PlantClassifier::disabled(Arc::clone(&cache));

    let result = classifier.classify(&leaf_png(3)).await;

    assert!(matches!(result, Err(LeafmendError::ModelNotLoaded)));
    assert_eq!(display::render(&result), "Model not loaded.");
    assert!(cache.is_empty());
}

#[tokio::test]
async fn empty_prediction_is_not_cached() {
    let model = MockClassifier::new(vec![]);
    let cache = Arc::new(MemoCache::new());
    let classifier = PlantClassifier::new(model.clone(), class_index(), Arc::clone(&cache));
    let bytes = leaf_png(4);

    let result = classifier.classify(&bytes).await;
    assert!(matches!(result, Err(LeafmendError::EmptyPrediction)));
    assert_eq!(display::render(&result), "No prediction.");
    assert!(cache.is_empty());

    // Not cached, so the model is asked again
    let _ = classifier.classify(&bytes).await;
    assert_eq!(model.calls(), 2);
}

#[tokio::test]
async fn unknown_index_maps_to_unknown_class() {
    let model = MockClassifier::new(vec![0.0, 0.0, 0.0, 0.9]);
    let classifier = PlantClassifier::new(model, class_index(), Arc::new(MemoCache::new()));

    let label = classifier.classify(&leaf_png(5)).await.unwrap();
    assert_eq!(label, leafmend::classify::UNKNOWN_CLASS);
}

#[tokio::test]
async fn undecodable_bytes_are_rejected() {
    let model = MockClassifier::new(vec![1.0]);
    let cache = Arc::new(MemoCache::new());
    let classifier = PlantClassifier::new(model.clone(), class_index(), Arc::clone(&cache));

    let result = classifier.classify(b"\x89PNG...").await;
    assert!(matches!(result, Err(LeafmendError::InvalidImage(_))));
    assert_eq!(model.calls(), 0);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn backend_failure_is_not_cached() {
    let cache = Arc::new(MemoCache::new());
    let classifier =
        PlantClassifier::new(Arc::new(BrokenClassifier), class_index(), Arc::clone(&cache));

    let result = classifier.classify(&leaf_png(6)).await;
    assert!(matches!(result, Err(LeafmendError::Inference(_))));
    assert!(display::render(&result).starts_with("Exception: "));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn custom_input_size_reaches_backend() {
    struct ShapeProbe;

    #[async_trait]
    impl ImageClassifier for ShapeProbe {
        fn name(&self) -> &str {
            "probe"
        }

        async fn predict(&self, input: &PixelTensor) -> Result<Vec<f32>> {
            assert_eq!(input.shape(), [1, 64, 64, 3]);
            Ok(vec![1.0])
        }
    }

    let classifier = PlantClassifier::new(
        Arc::new(ShapeProbe),
        class_index(),
        Arc::new(MemoCache::new()),
    )
    .with_preprocessor(Preprocessor::new(64));

    assert_eq!(
        classifier.classify(&leaf_png(7)).await.unwrap(),
        "Tomato___Bacterial_spot"
    );
}
