use async_trait::async_trait;
use tracing::debug;

use crate::application::ScreenCapture;

/// Capture adapter for headless and CLI builds: never produces an image.
///
/// The session treats an absent capture as "no image", so turns proceed as
/// text-only.
pub struct NoopScreenCapture;

impl NoopScreenCapture {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NoopScreenCapture {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScreenCapture for NoopScreenCapture {
    async fn capture_full_screen(&self) -> Option<Vec<u8>> {
        debug!("Screen capture unavailable in this build");
        None
    }
}
