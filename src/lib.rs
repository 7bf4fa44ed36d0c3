pub mod application;
pub mod connector;
pub mod domain;

pub use application::{
    ChatSession, ChatStreamer, CredentialStore, EventStream, ScreenCapture, SettingsStore,
    StreamSignal, MODEL_SETTING_KEY, SCREENSHOT_SETTING_KEY,
};

pub use connector::{
    AnthropicChatClient, EnvCredentialStore, JsonSettingsStore, MemorySettingsStore,
    NoopScreenCapture, OpenAiChatClient, ProviderRouter,
};

pub use domain::{
    Attachment, ChatError, ChatModel, ContentPart, ConversationTurn, Message, Provider, Role,
    StreamEvent, TurnRole,
};
