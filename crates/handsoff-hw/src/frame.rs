//! Frame type and pixel-format conversion.

/// A captured grayscale camera frame. Ephemeral: consumed by a single
/// embedding pass and dropped.
#[derive(Clone)]
pub struct Frame {
    /// Grayscale pixel data (width * height bytes).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: std::time::Instant,
    pub sequence: u32,
}

impl Frame {
    /// Average pixel brightness (0.0–255.0). Used by camera diagnostics.
    pub fn avg_brightness(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().map(|&b| b as f32).sum::<f32>() / self.data.len() as f32
    }
}

/// Convert packed YUYV (4:2:2) to grayscale by extracting the Y channel.
///
/// YUYV packs two pixels per 4 bytes: [Y0, U, Y1, V].
/// Grayscale = every even-indexed byte.
pub fn yuyv_to_grayscale(yuyv: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let expected = (width * height * 2) as usize;
    if yuyv.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: yuyv.len(),
        });
    }
    Ok(yuyv[..expected].iter().step_by(2).copied().collect())
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid YUYV length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_to_grayscale() {
        // 2x1 image: [Y0=100, U=128, Y1=200, V=128]
        let yuyv = vec![100, 128, 200, 128];
        let gray = yuyv_to_grayscale(&yuyv, 2, 1).unwrap();
        assert_eq!(gray, vec![100, 200]);
    }

    #[test]
    fn test_yuyv_to_grayscale_4x2() {
        // 4x2 image = 8 pixels, 16 YUYV bytes
        let yuyv: Vec<u8> = (0..16).collect();
        let gray = yuyv_to_grayscale(&yuyv, 4, 2).unwrap();
        assert_eq!(gray.len(), 8);
        assert_eq!(gray, vec![0, 2, 4, 6, 8, 10, 12, 14]);
    }

    #[test]
    fn test_yuyv_invalid_length() {
        let yuyv = vec![100, 128]; // too short for 2x1
        let result = yuyv_to_grayscale(&yuyv, 2, 1);
        assert!(result.is_err());
    }

    #[test]
    fn test_avg_brightness() {
        let frame = Frame {
            data: vec![100, 200],
            width: 2,
            height: 1,
            timestamp: std::time::Instant::now(),
            sequence: 0,
        };
        assert!((frame.avg_brightness() - 150.0).abs() < 1e-6);
    }

    #[test]
    fn test_avg_brightness_empty() {
        let frame = Frame {
            data: vec![],
            width: 0,
            height: 0,
            timestamp: std::time::Instant::now(),
            sequence: 0,
        };
        assert_eq!(frame.avg_brightness(), 0.0);
    }
}
