use std::path::Path;

use ndarray::{Array1, ArrayViewD, CowArray};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider, ExecutionProviderDispatch};
use ort::session::Session;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::value::ValueType;
use tracing::info;

use crate::error::{ClassifyError, Result};

/// A loaded, immutable image classifier.
///
/// Takes one preprocessed batch-of-one tensor and returns one score per class
/// in training order.
pub trait Classifier: Send + Sync {
    fn predict(&self, input: ArrayViewD<'_, f32>) -> Result<Array1<f32>>;

    /// Number of scores per image, when the model declares it statically.
    fn output_width(&self) -> Option<usize> {
        None
    }

    /// Declared input dimensions; negative entries are dynamic.
    fn input_dims(&self) -> Option<Vec<i64>> {
        None
    }
}

pub struct OnnxModel {
    provider: [ExecutionProviderDispatch; 1],
    intra_threads: usize,
}

impl OnnxModel {
    pub fn new(cuda: bool) -> Self {
        let provider = if cuda {
            [CUDAExecutionProvider::default().build().error_on_failure()]
        } else {
            [CPUExecutionProvider::default().build()]
        };
        Self {
            provider,
            intra_threads: 1,
        }
    }

    pub fn with_intra_threads(mut self, intra_threads: usize) -> Self {
        self.intra_threads = intra_threads.max(1);
        self
    }

    pub fn load_model<P: AsRef<Path>>(&self, model_path: P) -> Result<Session> {
        let session = SessionBuilder::new()?
            .with_execution_providers(self.provider.clone())?
            .with_intra_threads(self.intra_threads)?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model_path)?;
        Ok(session)
    }

    /// Loads the model file and wraps it as a [`Classifier`].
    pub fn load_classifier<P: AsRef<Path>>(&self, model_path: P) -> Result<OnnxClassifier> {
        let path = model_path.as_ref();
        if !path.exists() {
            return Err(ClassifyError::config(format!(
                "model file not found: {}",
                path.display()
            )));
        }
        info!(path = %path.display(), threads = self.intra_threads, "loading ONNX model");
        OnnxClassifier::new(self.load_model(path)?)
    }
}

/// ONNX Runtime backed classifier. Uses the first model input and the first
/// output whose name mentions probabilities, falling back to the last output.
pub struct OnnxClassifier {
    session: Session,
    input_name: String,
    output_name: String,
    input_dims: Option<Vec<i64>>,
    output_dims: Option<Vec<i64>>,
}

impl OnnxClassifier {
    pub fn new(session: Session) -> Result<Self> {
        let input = session
            .inputs
            .first()
            .ok_or_else(|| ClassifyError::config("model declares no inputs"))?;
        let output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob") || o.name.contains("output"))
            .or_else(|| session.outputs.last())
            .ok_or_else(|| ClassifyError::config("model declares no outputs"))?;

        let input_name = input.name.clone();
        let output_name = output.name.clone();
        let input_dims = tensor_dims(&input.input_type);
        let output_dims = tensor_dims(&output.output_type);

        info!(
            input = %input_name,
            output = %output_name,
            input_dims = ?input_dims,
            output_dims = ?output_dims,
            "model loaded"
        );

        Ok(Self {
            session,
            input_name,
            output_name,
            input_dims,
            output_dims,
        })
    }
}

fn tensor_dims(ty: &ValueType) -> Option<Vec<i64>> {
    match ty {
        ValueType::Tensor { dimensions, .. } => Some(dimensions.clone()),
        _ => None,
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, input: ArrayViewD<'_, f32>) -> Result<Array1<f32>> {
        let xs = CowArray::from(input);
        let input_data = ort::inputs![self.input_name.as_str() => xs.view()]?;
        let ys = self.session.run(input_data)?;

        let value = ys
            .get(self.output_name.as_str())
            .ok_or_else(|| ClassifyError::Shape {
                expected: format!("output `{}`", self.output_name),
                actual: "missing from session outputs".to_string(),
            })?;
        let scores = value.try_extract_tensor::<f32>()?;
        flatten_scores(scores.shape(), scores.iter().copied().collect())
    }

    fn output_width(&self) -> Option<usize> {
        self.output_dims
            .as_ref()
            .and_then(|dims| dims.last())
            .and_then(|&d| usize::try_from(d).ok())
            .filter(|&d| d > 0)
    }

    fn input_dims(&self) -> Option<Vec<i64>> {
        self.input_dims.clone()
    }
}

/// Accepts `[n]` or `[1, n]` score tensors.
pub fn flatten_scores(shape: &[usize], scores: Vec<f32>) -> Result<Array1<f32>> {
    match shape {
        [_] | [1, _] => Ok(Array1::from_vec(scores)),
        _ => Err(ClassifyError::Shape {
            expected: "[1, classes]".to_string(),
            actual: format!("{shape:?}"),
        }),
    }
}

/// Checks a model's declared input dimensions against the expected tensor
/// shape. Dynamic (negative) dimensions match anything.
pub fn check_input_dims(declared: &[i64], expected: &[usize]) -> Result<()> {
    let compatible = declared.len() == expected.len()
        && declared
            .iter()
            .zip(expected)
            .all(|(&d, &e)| d < 0 || d as usize == e);
    if compatible {
        Ok(())
    } else {
        Err(ClassifyError::Shape {
            expected: format!("{expected:?}"),
            actual: format!("{declared:?}"),
        })
    }
}
