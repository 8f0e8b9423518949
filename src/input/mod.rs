/// Camera input
///
/// - `camera`: `CameraBackend` / `FrameSource` traits and the ez-ffmpeg
///   capture (DirectShow / AVFoundation / V4L2)
/// - `probe`: port enumeration and selector labels
pub mod camera;
pub mod probe;

pub use camera::{get_camera_devices, CameraBackend, CameraError, FfmpegCamera, FrameSource};
pub use probe::{camera_label, port_from_label, scan_fixed, scan_until_misses, PortReport};
