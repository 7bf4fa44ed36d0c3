mod anthropic_client;
mod env_credential_store;
mod json_settings_store;
mod memory_settings_store;
mod noop_screen_capture;
mod openai_client;
mod provider_router;
mod sse;

pub use anthropic_client::*;
pub use env_credential_store::*;
pub use json_settings_store::*;
pub use memory_settings_store::*;
pub use noop_screen_capture::*;
pub use openai_client::*;
pub use provider_router::*;
