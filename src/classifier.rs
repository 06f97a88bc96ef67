//! # Breed Classifier Module
//!
//! Loads the pretrained breed classifier (an ONNX export of the CNN) together
//! with its ordered class list, and runs single-image predictions.
//!
//! The model is loaded once at startup and shared read-only between handlers
//! behind the [`BreedClassifier`] trait, which also lets tests swap in a fake.

use std::fs;
use std::path::Path;

use image::imageops::FilterType;
use tracing::{debug, info};
use tract_onnx::prelude::*;

use crate::config::ClassifierConfig;
use crate::errors::ClassifierError;

/// ImageNet channel means used when the model was trained
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet channel standard deviations
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Result of classifying one image
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Best class label, drawn from the class list
    pub label: String,
    /// Probability of the best class, in `[0, 1]`
    pub confidence: f32,
    /// One probability per class, in class list order
    pub scores: Vec<f32>,
}

impl Prediction {
    /// Build a prediction from per-class probabilities.
    ///
    /// Fails when the score vector doesn't line up with the class list.
    pub fn from_scores(classes: &[String], scores: Vec<f32>) -> Result<Self, ClassifierError> {
        if scores.len() != classes.len() {
            return Err(ClassifierError::Inference(format!(
                "model produced {} scores for {} classes",
                scores.len(),
                classes.len()
            )));
        }

        if let Some(bad) = scores.iter().find(|score| !score.is_finite()) {
            return Err(ClassifierError::Inference(format!(
                "model produced a non-finite score: {bad}"
            )));
        }

        let best = argmax(&scores).ok_or_else(|| {
            ClassifierError::Inference("model produced an empty score vector".to_string())
        })?;

        Ok(Self {
            label: classes[best].clone(),
            confidence: scores[best].clamp(0.0, 1.0),
            scores,
        })
    }
}

/// Anything that can guess a breed from an image file
pub trait BreedClassifier: Send + Sync {
    /// Ordered class labels; score vectors follow this order
    fn classes(&self) -> &[String];

    /// Classify the image stored at `image_path`
    fn predict(&self, image_path: &Path) -> Result<Prediction, ClassifierError>;
}

type BreedModel = TypedRunnableModel<TypedModel>;

/// Breed classifier backed by an ONNX checkpoint
pub struct OnnxClassifier {
    model: BreedModel,
    classes: Vec<String>,
    size: u32,
}

impl std::fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassifier")
            .field("classes", &self.classes.len())
            .field("size", &self.size)
            .finish()
    }
}

impl OnnxClassifier {
    /// Load the checkpoint and class list described by `config`
    pub fn load(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        let classes = load_classes(&config.classes_path())?;

        let checkpoint = config.checkpoint_path();
        if !checkpoint.is_file() {
            return Err(ClassifierError::Configuration(format!(
                "checkpoint not found: {}",
                checkpoint.display()
            )));
        }

        let size = config.size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(&checkpoint)
            .and_then(|model| model.with_input_fact(0, f32::fact([1, 3, size, size]).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| {
                ClassifierError::Configuration(format!(
                    "failed to prepare {}: {e}",
                    checkpoint.display()
                ))
            })?;

        info!(
            arch = %config.arch,
            model = %config.model,
            size = config.size,
            classes = classes.len(),
            "Breed classifier loaded"
        );

        Ok(Self {
            model,
            classes,
            size: config.size,
        })
    }

    fn image_tensor(&self, image_path: &Path) -> Result<Tensor, ClassifierError> {
        let image = image::open(image_path).map_err(|e| {
            ClassifierError::Inference(format!("cannot decode {}: {e}", image_path.display()))
        })?;

        let rgb = image
            .resize_exact(self.size, self.size, FilterType::Triangle)
            .to_rgb8();

        let size = self.size as usize;
        let array = tract_ndarray::Array4::from_shape_fn((1, 3, size, size), |(_, c, y, x)| {
            let value = rgb.get_pixel(x as u32, y as u32)[c] as f32 / 255.0;
            (value - IMAGENET_MEAN[c]) / IMAGENET_STD[c]
        });

        Ok(array.into())
    }
}

impl BreedClassifier for OnnxClassifier {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn predict(&self, image_path: &Path) -> Result<Prediction, ClassifierError> {
        let input = self.image_tensor(image_path)?;

        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| ClassifierError::Inference(format!("model run failed: {e}")))?;

        let logits: Vec<f32> = outputs
            .first()
            .ok_or_else(|| ClassifierError::Inference("model returned no outputs".to_string()))?
            .to_array_view::<f32>()
            .map_err(|e| ClassifierError::Inference(format!("unexpected output type: {e}")))?
            .iter()
            .copied()
            .collect();

        let prediction = Prediction::from_scores(&self.classes, softmax(&logits))?;
        debug!(
            label = %prediction.label,
            confidence = prediction.confidence,
            "Image classified"
        );

        Ok(prediction)
    }
}

/// Read the ordered class list (a JSON array of labels)
pub fn load_classes(path: &Path) -> Result<Vec<String>, ClassifierError> {
    let raw = fs::read_to_string(path).map_err(|e| {
        ClassifierError::Configuration(format!("cannot read class list {}: {e}", path.display()))
    })?;

    let classes: Vec<String> = serde_json::from_str(&raw).map_err(|e| {
        ClassifierError::Configuration(format!("invalid class list {}: {e}", path.display()))
    })?;

    if classes.is_empty() {
        return Err(ClassifierError::Configuration(format!(
            "class list {} is empty",
            path.display()
        )));
    }

    Ok(classes)
}

/// Turn raw model outputs into probabilities
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|v| v / sum).collect()
}

fn argmax(scores: &[f32]) -> Option<usize> {
    scores
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(i, _)| i)
}

/// Indices of the `count` best classes other than `top`, best first
pub fn top_alternatives(scores: &[f32], top: usize, count: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..scores.len()).filter(|&i| i != top).collect();
    indices.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    indices.truncate(count);
    indices
}

/// Human readable breed name for a class label.
///
/// `n02099601-golden_retriever` becomes `Golden retriever`.
pub fn class_to_human(label: &str) -> String {
    let name = label.rsplit('-').next().unwrap_or(label).replace('_', " ");
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
