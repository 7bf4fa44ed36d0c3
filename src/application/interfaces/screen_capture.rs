use async_trait::async_trait;

/// Produces PNG-encoded screenshots of the user's screen.
///
/// Capture failure is reported as `None` and treated as "no image", never as
/// an error.
#[async_trait]
pub trait ScreenCapture: Send + Sync {
    async fn capture_full_screen(&self) -> Option<Vec<u8>>;
}
