//! MobileNetV2 image embedder via ONNX Runtime.
//!
//! Turns a whole grayscale camera frame into a 1280-dimensional feature
//! vector (the global-pool activation of MobileNetV2). The frame is not
//! face-cropped: the classifier learns the full scene, hands included.

use crate::types::Embedding;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

// --- Named constants ---
const MOBILENET_INPUT_SIZE: usize = 224;
const MOBILENET_MEAN: f32 = 127.5;
const MOBILENET_STD: f32 = 127.5; // symmetric [-1, 1] normalization
const MOBILENET_EMBEDDING_DIM: usize = 1280;
const MOBILENET_MODEL_VERSION: &str = "mobilenet_v2_224";

#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("model file not found: {0} — place a MobileNetV2 feature-vector ONNX export there")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Opaque frame-to-vector transform the control loop is written against.
///
/// The production implementation is [`MobileNetEmbedder`]; tests drive the
/// loop with scripted fakes instead.
pub trait ImageEmbedder {
    /// Embed a grayscale frame of the given dimensions.
    fn embed(&mut self, gray: &[u8], width: u32, height: u32) -> Result<Embedding, EmbedderError>;

    /// Fixed output width of this embedder.
    fn dim(&self) -> usize;
}

/// MobileNetV2-based embedder.
pub struct MobileNetEmbedder {
    session: Session,
}

impl MobileNetEmbedder {
    /// Load the MobileNetV2 ONNX model from the given path.
    pub fn load(model_path: &str) -> Result<Self, EmbedderError> {
        if !Path::new(model_path).exists() {
            return Err(EmbedderError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded MobileNet model"
        );

        Ok(Self { session })
    }

    /// Preprocess a grayscale frame into a 1x3x224x224 NCHW float tensor.
    fn preprocess(gray: &[u8], width: u32, height: u32) -> Array4<f32> {
        let size = MOBILENET_INPUT_SIZE;
        let resized = resize_bilinear(gray, width, height, size as u32, size as u32);

        let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
        for y in 0..size {
            for x in 0..size {
                let pixel = resized[y * size + x] as f32;
                let normalized = (pixel - MOBILENET_MEAN) / MOBILENET_STD;
                // Grayscale → 3-channel: replicate Y → [R=Y, G=Y, B=Y]
                tensor[[0, 0, y, x]] = normalized;
                tensor[[0, 1, y, x]] = normalized;
                tensor[[0, 2, y, x]] = normalized;
            }
        }
        tensor
    }
}

impl ImageEmbedder for MobileNetEmbedder {
    fn embed(&mut self, gray: &[u8], width: u32, height: u32) -> Result<Embedding, EmbedderError> {
        let expected = (width as usize) * (height as usize);
        if gray.len() < expected {
            return Err(EmbedderError::InferenceFailed(format!(
                "frame buffer too short: expected {expected}, got {}",
                gray.len()
            )));
        }

        let input = Self::preprocess(gray, width, height);

        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw_data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| EmbedderError::InferenceFailed(format!("feature extraction: {e}")))?;

        let raw: Vec<f32> = raw_data.to_vec();

        if raw.len() != MOBILENET_EMBEDDING_DIM {
            return Err(EmbedderError::InferenceFailed(format!(
                "expected {MOBILENET_EMBEDDING_DIM}-dim embedding, got {}",
                raw.len()
            )));
        }

        // L2-normalize so cosine similarity reduces to a dot product.
        let norm: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
        let values = if norm > 0.0 {
            raw.iter().map(|x| x / norm).collect()
        } else {
            raw
        };

        Ok(Embedding {
            values,
            model_version: Some(MOBILENET_MODEL_VERSION.to_string()),
        })
    }

    fn dim(&self) -> usize {
        MOBILENET_EMBEDDING_DIM
    }
}

/// Bilinear-resize a grayscale image to `dst_w` x `dst_h`.
pub fn resize_bilinear(src: &[u8], src_w: u32, src_h: u32, dst_w: u32, dst_h: u32) -> Vec<u8> {
    let (sw, sh) = (src_w as usize, src_h as usize);
    let (dw, dh) = (dst_w as usize, dst_h as usize);
    if sw == 0 || sh == 0 || dw == 0 || dh == 0 || src.len() < sw * sh {
        return vec![0; dw * dh];
    }

    let x_ratio = sw as f32 / dw as f32;
    let y_ratio = sh as f32 / dh as f32;

    let mut dst = vec![0u8; dw * dh];
    for dy in 0..dh {
        let sy = (dy as f32 + 0.5) * y_ratio - 0.5;
        let sy = sy.clamp(0.0, (sh - 1) as f32);
        let y0 = sy as usize;
        let y1 = (y0 + 1).min(sh - 1);
        let fy = sy - y0 as f32;

        for dx in 0..dw {
            let sx = (dx as f32 + 0.5) * x_ratio - 0.5;
            let sx = sx.clamp(0.0, (sw - 1) as f32);
            let x0 = sx as usize;
            let x1 = (x0 + 1).min(sw - 1);
            let fx = sx - x0 as f32;

            let tl = src[y0 * sw + x0] as f32;
            let tr = src[y0 * sw + x1] as f32;
            let bl = src[y1 * sw + x0] as f32;
            let br = src[y1 * sw + x1] as f32;

            let top = tl * (1.0 - fx) + tr * fx;
            let bot = bl * (1.0 - fx) + br * fx;
            let val = top * (1.0 - fy) + bot * fy;

            dst[dy * dw + dx] = val.round().clamp(0.0, 255.0) as u8;
        }
    }
    dst
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preprocess_output_shape() {
        let gray = vec![128u8; 640 * 360];
        let tensor = MobileNetEmbedder::preprocess(&gray, 640, 360);
        assert_eq!(tensor.shape(), &[1, 3, MOBILENET_INPUT_SIZE, MOBILENET_INPUT_SIZE]);
    }

    #[test]
    fn test_preprocess_normalization() {
        let gray = vec![128u8; 224 * 224];
        let tensor = MobileNetEmbedder::preprocess(&gray, 224, 224);
        let val = tensor[[0, 0, 0, 0]];
        let expected = (128.0 - MOBILENET_MEAN) / MOBILENET_STD;
        assert!((val - expected).abs() < 1e-6, "got {val}, expected {expected}");
    }

    #[test]
    fn test_preprocess_channels_identical() {
        let gray: Vec<u8> = (0..224 * 224).map(|i| (i % 256) as u8).collect();
        let tensor = MobileNetEmbedder::preprocess(&gray, 224, 224);
        for y in (0..MOBILENET_INPUT_SIZE).step_by(37) {
            for x in (0..MOBILENET_INPUT_SIZE).step_by(37) {
                assert_eq!(tensor[[0, 0, y, x]], tensor[[0, 1, y, x]]);
                assert_eq!(tensor[[0, 1, y, x]], tensor[[0, 2, y, x]]);
            }
        }
    }

    #[test]
    fn test_resize_identity() {
        let src: Vec<u8> = (0..16).collect();
        let dst = resize_bilinear(&src, 4, 4, 4, 4);
        assert_eq!(dst, src);
    }

    #[test]
    fn test_resize_uniform_stays_uniform() {
        let src = vec![200u8; 8 * 8];
        let dst = resize_bilinear(&src, 8, 8, 3, 3);
        assert!(dst.iter().all(|&p| p == 200));
    }

    #[test]
    fn test_resize_downscale_dimensions() {
        let src = vec![50u8; 640 * 360];
        let dst = resize_bilinear(&src, 640, 360, 224, 224);
        assert_eq!(dst.len(), 224 * 224);
    }

    #[test]
    fn test_resize_short_buffer_yields_zeros() {
        let dst = resize_bilinear(&[1, 2, 3], 4, 4, 2, 2);
        assert_eq!(dst, vec![0; 4]);
    }
}
