pub mod cli;
pub mod config;
pub mod converter;
pub mod error;
pub mod grpc;
pub mod mapping;
pub mod model;
pub mod pipeline;
pub mod postprocess;
pub mod preprocess;
pub mod profile;
pub mod render;
pub mod service;

#[cfg(test)]
mod testing;

pub use crate::cli::{Args, Command};
pub use crate::error::{ClassifyError, Result};
pub use crate::mapping::{LabelEntry, LabelMap, Video, load_class_mapping};
pub use crate::model::{Classifier, OnnxClassifier, OnnxModel};
pub use crate::pipeline::{InferencePipeline, Outcome, Prediction, UPLOAD_PROMPT, Upload};
pub use crate::postprocess::{argmax_and_max, softmax, top_k};
pub use crate::preprocess::{PreprocessConfig, Processor};
pub use crate::profile::{ModelProfile, Normalization, ResizeFilter, TensorLayout};
pub use crate::service::ClassifierService;
