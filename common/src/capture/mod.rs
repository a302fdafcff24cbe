// Capture module: the timed capture loop and the devices it drives

pub mod camera;
pub mod session;

use crate::errors::CaptureError;
use crate::models::CaptureResult;
use async_trait::async_trait;

pub use camera::CommandCamera;
pub use session::run_session;

/// CaptureDevice performs one capture per call
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Take capture number `index` (zero-based) and report what was produced
    async fn capture(&self, index: usize) -> Result<CaptureResult, CaptureError>;
}
