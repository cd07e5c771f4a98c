/// CNN image embedder backed by ONNX Runtime.
///
/// Runs an ImageNet-trained ResNet-style encoder on each crop and uses its
/// pooled feature output, flattened, as the embedding. The output is chosen
/// by name, or the first graph output when none is named; a classifier
/// output (one score per ImageNet class) is refused at load time. Crops are
/// resized to the model's square input with nearest-neighbor sampling and
/// normalized with the ImageNet channel statistics.
use std::path::Path;
use std::sync::Mutex;

use crate::embedding::domain::embedding_source::{ensure_rgb, EmbeddingError, EmbeddingSource};
use crate::shared::constants::IMAGENET_CLASS_COUNT;
use crate::shared::crop::Crop;
use crate::shared::frame::Frame;
use crate::shared::math;

/// Fallback input resolution when the model declares dynamic dimensions.
pub const DEFAULT_INPUT_SIZE: usize = 224;

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

pub struct OnnxEmbedder {
    session: Mutex<ort::session::Session>,
    input_size: usize,
    output_index: usize,
    normalize: bool,
}

impl OnnxEmbedder {
    /// Loads `model_path` and reads embeddings from the output named
    /// `output_name`, or from the first output when `None`.
    pub fn new(model_path: &Path, output_name: Option<&str>) -> Result<Self, EmbeddingError> {
        let session = build_session(model_path).map_err(model_error)?;

        let outputs: Vec<(String, Vec<i64>)> = session
            .outputs()
            .iter()
            .map(|output| {
                let shape = match output.dtype() {
                    ort::value::ValueType::Tensor { shape, .. } => shape.iter().copied().collect(),
                    _ => Vec::new(),
                };
                (output.name().to_string(), shape)
            })
            .collect();
        let output_index = select_output(&outputs, output_name)?;

        // NCHW: [1, 3, H, W]
        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    if shape.len() >= 4 && shape[2] > 0 {
                        return Some(shape[2] as usize);
                    }
                }
                None
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        log::info!(
            "Loaded embedding model {} (input {input_size}x{input_size}, output '{}')",
            model_path.display(),
            outputs[output_index].0
        );

        Ok(Self {
            session: Mutex::new(session),
            input_size,
            output_index,
            normalize: false,
        })
    }

    /// L2-normalize output vectors, turning Euclidean distance into a
    /// monotone function of cosine similarity.
    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }
}

impl EmbeddingSource for OnnxEmbedder {
    fn embed(&self, crop: &Crop) -> Result<Vec<f32>, EmbeddingError> {
        ensure_rgb(crop)?;

        let tensor = preprocess(crop.image(), self.input_size);
        let input_value = ort::value::Tensor::from_array(tensor).map_err(model_error)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| EmbeddingError::LockPoisoned)?;
        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(model_error)?;
        let output = outputs[self.output_index]
            .try_extract_array::<f32>()
            .map_err(model_error)?;

        let mut embedding: Vec<f32> = output.iter().copied().collect();
        if self.normalize {
            math::l2_normalize(&mut embedding);
        }
        Ok(embedding)
    }
}

fn build_session(model_path: &Path) -> Result<ort::session::Session, Box<dyn std::error::Error>> {
    let intra_threads = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let session = ort::session::Session::builder()?
        .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
        .with_inter_threads(1)?
        .with_intra_threads(intra_threads)?
        .with_execution_providers(preferred_execution_providers())?
        .commit_from_file(model_path)?;
    Ok(session)
}

/// Index of the output to embed from, given each output's name and declared
/// shape. Dynamic dimensions are negative.
fn select_output(outputs: &[(String, Vec<i64>)], name: Option<&str>) -> Result<usize, EmbeddingError> {
    let index = match name {
        Some(name) => outputs
            .iter()
            .position(|(n, _)| n == name)
            .ok_or_else(|| model_error(format!("model has no output named '{name}'")))?,
        None if outputs.is_empty() => return Err(model_error("model declares no outputs")),
        None => 0,
    };

    let (name, shape) = &outputs[index];
    if shape.last() == Some(&IMAGENET_CLASS_COUNT) {
        return Err(model_error(format!(
            "output '{name}' has {IMAGENET_CLASS_COUNT} values per image, which are ImageNet \
             class scores; use a model exported without its classifier head"
        )));
    }
    Ok(index)
}

fn model_error(e: impl std::fmt::Display) -> EmbeddingError {
    EmbeddingError::Model(e.to_string().into())
}

fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

/// Resize to `size`x`size`, scale to [0, 1], ImageNet-normalize, NCHW layout.
fn preprocess(image: &Frame, size: usize) -> ndarray::Array4<f32> {
    let src_w = image.width() as usize;
    let src_h = image.height() as usize;
    let src = image.as_ndarray();

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, size, size));

    for y in 0..size {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / size as f64) as usize).min(src_h - 1);
        for x in 0..size {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / size as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                let value = src[[src_y, src_x, c]] as f32 / 255.0;
                tensor[[0, c, y, x]] = (value - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
            }
        }
    }

    tensor
}
