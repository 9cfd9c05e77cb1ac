use std::path::PathBuf;

/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// Directory containing the MobileNet ONNX model.
    pub model_dir: PathBuf,
    /// Samples captured per training pass.
    pub train_samples: usize,
    /// Touched-confidence threshold that triggers an alert (strictly greater).
    pub touch_confidence: f32,
    /// Pause between training captures, in milliseconds.
    pub train_interval_ms: u64,
    /// Pause between classification cycles, in milliseconds.
    pub watch_interval_ms: u64,
    /// Notification cooldown in milliseconds (0 = notify every cycle).
    pub notify_cooldown_ms: u64,
    /// Number of warmup frames to discard at startup (camera AGC/AE stabilization).
    pub warmup_frames: usize,
    /// Neighbors consulted per k-NN prediction.
    pub knn_k: usize,
    /// Player command used for the audio cue.
    pub cue_command: String,
    /// Sound file passed to the cue command.
    pub cue_sound: String,
}

impl Config {
    /// Load configuration from `HANDSOFF_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let model_dir = std::env::var("HANDSOFF_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| handsoff_core::default_model_dir());

        Self {
            camera_device: std::env::var("HANDSOFF_CAMERA_DEVICE")
                .unwrap_or_else(|_| "/dev/video0".to_string()),
            model_dir,
            train_samples: env_usize("HANDSOFF_TRAIN_SAMPLES", 50),
            touch_confidence: env_f32("HANDSOFF_TOUCH_CONFIDENCE", 0.8),
            train_interval_ms: env_u64("HANDSOFF_TRAIN_INTERVAL_MS", 100),
            watch_interval_ms: env_u64("HANDSOFF_WATCH_INTERVAL_MS", 200),
            notify_cooldown_ms: env_u64("HANDSOFF_NOTIFY_COOLDOWN_MS", 3000),
            warmup_frames: env_usize("HANDSOFF_WARMUP_FRAMES", 4),
            knn_k: env_usize("HANDSOFF_KNN_K", handsoff_core::DEFAULT_K),
            cue_command: std::env::var("HANDSOFF_CUE_COMMAND")
                .unwrap_or_else(|_| "paplay".to_string()),
            cue_sound: std::env::var("HANDSOFF_CUE_SOUND").unwrap_or_else(|_| {
                "/usr/share/sounds/freedesktop/stereo/alarm-clock-elapsed.oga".to_string()
            }),
        }
    }

    /// Path to the MobileNet feature-vector model.
    pub fn mobilenet_model_path(&self) -> String {
        self.model_dir
            .join("mobilenet_v2.onnx")
            .to_string_lossy()
            .into_owned()
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
