//! The inference pipeline: upload handling, preprocessing, one forward pass
//! and mapping the winning score back to its label.

use std::path::Path;
use std::time::Instant;

use image::DynamicImage;
use tracing::{debug, info};

use crate::error::{ClassifyError, Result};
use crate::mapping::{LabelMap, Video};
use crate::model::{Classifier, check_input_dims};
use crate::postprocess::{argmax_and_max, softmax, top_k};
use crate::preprocess::{PreprocessConfig, Processor};
use crate::profile::ModelProfile;

/// Shown instead of a result when nothing was uploaded.
pub const UPLOAD_PROMPT: &str = "Please upload an image file";

/// File extensions accepted for uploads, compared case-insensitively.
pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// A single uploaded file.
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: Option<String>, bytes: Vec<u8>) -> Self {
        Self { file_name, bytes }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        Ok(Self { file_name, bytes })
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Uploads without a name are accepted; named ones must carry an
    /// accepted extension.
    pub fn check_extension(&self) -> Result<()> {
        let Some(name) = self.file_name.as_deref().filter(|n| !n.is_empty()) else {
            return Ok(());
        };
        let ext_valid = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ACCEPTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()));
        if ext_valid {
            Ok(())
        } else {
            Err(ClassifyError::UnsupportedUpload {
                name: name.to_string(),
                accepted: ACCEPTED_EXTENSIONS.join(", "),
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedClass {
    pub class_id: usize,
    pub label: String,
    pub confidence: f32,
}

/// Result of one classification.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub class_id: usize,
    pub label: String,
    /// Probability assigned to `label`, in `[0, 1]` for probability outputs.
    pub confidence: f32,
    pub description: String,
    pub video: Option<Video>,
    /// Full score vector in class order.
    pub probabilities: Vec<f32>,
    /// Every class, highest score first.
    pub ranked: Vec<RankedClass>,
}

impl Prediction {
    pub fn top(&self, k: usize) -> &[RankedClass] {
        &self.ranked[..k.min(self.ranked.len())]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Nothing was uploaded; no inference ran.
    Prompt(&'static str),
    Classified(Prediction),
}

/// Preprocessor, label set and loaded classifier for one model profile.
///
/// Built once at start-up and shared by every request.
pub struct InferencePipeline<C> {
    profile: ModelProfile,
    processor: Processor,
    labels: LabelMap,
    classifier: C,
}

impl<C: Classifier> InferencePipeline<C> {
    /// Validates the profile against the classifier's declared shapes.
    pub fn new(profile: ModelProfile, classifier: C) -> Result<Self> {
        profile.validate()?;
        let labels = profile.label_map()?;
        if let Some(width) = classifier.output_width() {
            labels.ensure_width(width)?;
        }
        if let Some(dims) = classifier.input_dims() {
            check_input_dims(&dims, &profile.input.shape())?;
        }
        let processor = Processor::new(PreprocessConfig::from_profile(&profile));

        info!(
            profile = %profile.name,
            classes = labels.len(),
            input = ?profile.input.shape(),
            normalization = profile.normalization.as_str(),
            "inference pipeline ready"
        );

        Ok(Self {
            profile,
            processor,
            labels,
            classifier,
        })
    }

    pub fn profile(&self) -> &ModelProfile {
        &self.profile
    }

    pub fn labels(&self) -> &LabelMap {
        &self.labels
    }

    /// Runs the full pipeline on a decoded image.
    pub fn classify(&self, image: &DynamicImage) -> Result<Prediction> {
        let t = Instant::now();
        let tensor = self.processor.preprocess(image)?;
        let mut scores = self.classifier.predict(tensor.view())?;
        self.labels.ensure_width(scores.len())?;
        if self.profile.output.softmax {
            scores = softmax(&scores);
        }

        let (class_id, confidence) =
            argmax_and_max(&scores).ok_or_else(|| ClassifyError::ModelOutput {
                message: "no comparable scores".to_string(),
            })?;
        let entry = self
            .labels
            .get(class_id)
            .ok_or(ClassifyError::LabelMismatch {
                labels: self.labels.len(),
                outputs: scores.len(),
            })?;

        let ranked = top_k(&scores, scores.len())
            .into_iter()
            .filter_map(|(id, confidence)| {
                self.labels.get(id).map(|e| RankedClass {
                    class_id: id,
                    label: e.name.clone(),
                    confidence,
                })
            })
            .collect();

        info!(
            label = %entry.name,
            confidence,
            elapsed = ?t.elapsed(),
            "classified image"
        );

        Ok(Prediction {
            class_id,
            label: entry.name.clone(),
            confidence,
            description: entry.description.clone(),
            video: entry.video.clone(),
            probabilities: scores.to_vec(),
            ranked,
        })
    }

    /// Decodes raw image bytes and classifies them.
    pub fn classify_bytes(&self, bytes: &[u8]) -> Result<Prediction> {
        let image = image::load_from_memory(bytes).map_err(ClassifyError::Decode)?;
        self.classify(&image)
    }

    /// Entry point for an upload control: an absent or empty upload yields
    /// the prompt without touching the model.
    pub fn classify_upload(&self, upload: Option<&Upload>) -> Result<Outcome> {
        let Some(upload) = upload.filter(|u| !u.is_empty()) else {
            debug!("no upload, prompting");
            return Ok(Outcome::Prompt(UPLOAD_PROMPT));
        };
        upload.check_extension()?;
        self.classify_bytes(&upload.bytes).map(Outcome::Classified)
    }
}
