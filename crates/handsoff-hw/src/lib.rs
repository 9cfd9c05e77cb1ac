//! handsoff-hw — Hardware abstraction for camera capture.
//!
//! Provides V4L2-based camera access and grayscale frame conversion.

pub mod camera;
pub mod frame;

pub use camera::{Camera, CameraError, DeviceInfo, FrameSource, PixelFormat};
pub use frame::Frame;
