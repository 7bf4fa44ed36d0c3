mod chat_streamer;
mod credential_store;
mod screen_capture;
mod settings_store;

pub use chat_streamer::*;
pub use credential_store::*;
pub use screen_capture::*;
pub use settings_store::*;
