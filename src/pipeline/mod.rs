/// Live capture pipeline
///
/// One background thread per opened camera:
/// - reads frames from a `FrameSource`
/// - runs the model while the shared inferencing flag is set
/// - pushes canvas-sized frames to the UI thread (bounded channel, newest wins)
///
/// The UI talks back through `ControlMessage` (weight hot-swap).
pub mod live;

pub use live::{ControlMessage, LiveFrame, LiveWorker};
