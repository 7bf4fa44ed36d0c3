use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::{ChatStreamer, CredentialStore, ScreenCapture, SettingsStore};
use crate::domain::{
    Attachment, ChatError, ChatModel, ContentPart, ConversationTurn, Message, StreamEvent,
    TurnRole,
};

/// Settings key holding the persisted model id.
pub const MODEL_SETTING_KEY: &str = "ai_model";
/// Older installs stored the model under this key.
const LEGACY_MODEL_SETTING_KEY: &str = "gpt_model";
/// Settings key for the automatic screen capture toggle.
pub const SCREENSHOT_SETTING_KEY: &str = "screenshot_enabled";

const PNG_MIME: &str = "image/png";

const SYSTEM_PROMPT: &str = "You are a helpful assistant. The user has shared a screenshot \
of their screen for context. Answer concisely and use markdown formatting where appropriate.";

/// A discrete outcome of the background streaming task, applied to session
/// state only by [`ChatSession::pump`] on the owning context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamSignal {
    /// One incremental fragment of the assistant's answer.
    Delta(String),
    /// The stream completed normally.
    Finished,
    /// The stream failed; the payload is the user-visible description.
    Failed(String),
    /// Cancellation took effect before the stream completed.
    Cancelled,
}

/// Orchestrates one conversation: history, the in-flight turn, and the
/// partial response buffer.
///
/// At most one turn streams at a time. The background task never touches
/// session state; it forwards [`StreamSignal`]s over a channel that is
/// replaced on every submission, so a stale task cannot corrupt a later
/// turn. All mutation happens in [`ChatSession::pump`] on the caller's
/// context.
pub struct ChatSession {
    streamer: Arc<dyn ChatStreamer>,
    credentials: Arc<dyn CredentialStore>,
    settings: Arc<dyn SettingsStore>,
    capture: Arc<dyn ScreenCapture>,
    selected_model: ChatModel,
    history: Vec<ConversationTurn>,
    partial: String,
    streaming: bool,
    error: Option<String>,
    signals: mpsc::UnboundedReceiver<StreamSignal>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ChatSession {
    pub fn new(
        streamer: Arc<dyn ChatStreamer>,
        credentials: Arc<dyn CredentialStore>,
        settings: Arc<dyn SettingsStore>,
        capture: Arc<dyn ScreenCapture>,
    ) -> Self {
        let stored = settings
            .read_string(MODEL_SETTING_KEY)
            .or_else(|| settings.read_string(LEGACY_MODEL_SETTING_KEY));
        let selected_model = ChatModel::from_stored(stored.as_deref());

        // Placeholder channel; every submission installs a fresh one.
        let (_tx, signals) = mpsc::unbounded_channel();

        Self {
            streamer,
            credentials,
            settings,
            capture,
            selected_model,
            history: Vec::new(),
            partial: String::new(),
            streaming: false,
            error: None,
            signals,
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    pub fn selected_model(&self) -> ChatModel {
        self.selected_model
    }

    /// Switch models and persist the choice.
    pub fn set_selected_model(&mut self, model: ChatModel) {
        self.selected_model = model;
        self.settings.write_string(MODEL_SETTING_KEY, model.id());
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    /// The assistant text received so far for the in-flight turn.
    pub fn partial_response(&self) -> &str {
        &self.partial
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Start a new turn.
    ///
    /// Blank queries and submissions while a turn is already streaming are
    /// rejected outright; nothing is queued and no state changes. A missing
    /// credential for the selected model's vendor sets a user-visible error
    /// and leaves the session idle.
    pub async fn submit(&mut self, query: &str, attachment: Option<Attachment>) {
        let query = query.trim();
        if query.is_empty() || self.streaming {
            return;
        }

        let provider = self.selected_model.provider();
        let api_key = match self
            .credentials
            .read(provider.credential_key())
            .filter(|key| !key.is_empty())
        {
            Some(key) => key,
            None => {
                self.error = Some(ChatError::MissingCredential(provider).to_string());
                return;
            }
        };

        self.error = None;

        let attachment = match attachment {
            Some(attachment) => Some(attachment),
            None if self.settings.read_bool(SCREENSHOT_SETTING_KEY, true) => self
                .capture
                .capture_full_screen()
                .await
                .filter(|data| !data.is_empty())
                .and_then(|data| Attachment::new(data, None).ok()),
            None => None,
        };

        self.history.push(ConversationTurn::user(query, attachment));
        self.partial.clear();
        self.streaming = true;

        info!(
            "Submitting turn {} to {} ({})",
            self.history.len(),
            provider,
            self.selected_model.id()
        );

        let messages = self.wire_messages();
        let model_id = self.selected_model.id().to_string();
        let streamer = Arc::clone(&self.streamer);
        let (tx, rx) = mpsc::unbounded_channel();
        self.signals = rx;
        self.cancel = CancellationToken::new();
        let cancel = self.cancel.clone();

        self.task = Some(tokio::spawn(async move {
            let opened = tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = tx.send(StreamSignal::Cancelled);
                    return;
                }
                opened = streamer.stream(&messages, &model_id, &api_key, provider) => opened,
            };

            let mut events = match opened {
                Ok(events) => events,
                Err(e) => {
                    let _ = tx.send(StreamSignal::Failed(e.to_string()));
                    return;
                }
            };

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        let _ = tx.send(StreamSignal::Cancelled);
                        return;
                    }
                    next = events.next() => match next {
                        Some(Ok(StreamEvent::Content(text))) => {
                            let _ = tx.send(StreamSignal::Delta(text));
                        }
                        Some(Ok(StreamEvent::Ignore)) => {}
                        Some(Ok(StreamEvent::Done)) | None => {
                            let _ = tx.send(StreamSignal::Finished);
                            return;
                        }
                        Some(Err(e)) => {
                            let _ = tx.send(StreamSignal::Failed(e.to_string()));
                            return;
                        }
                    }
                }
            }
        }));
    }

    /// Apply the next signal from the in-flight turn and return it.
    ///
    /// Returns `None` once the session is idle. Deltas are applied strictly
    /// in arrival order; the channel preserves the order the adapter emitted
    /// them in, and only one stream is ever active.
    pub async fn pump(&mut self) -> Option<StreamSignal> {
        if !self.streaming {
            return None;
        }
        match self.signals.recv().await {
            Some(signal) => {
                self.apply(&signal);
                Some(signal)
            }
            None => {
                // The task ended without a terminal signal (aborted).
                self.streaming = false;
                self.task = None;
                None
            }
        }
    }

    /// Drain the in-flight turn to its terminal state.
    pub async fn run_until_idle(&mut self) {
        while self.pump().await.is_some() {}
    }

    /// Request cooperative cancellation of the in-flight turn.
    ///
    /// The transition to idle happens when the background task acknowledges
    /// with [`StreamSignal::Cancelled`]; partial output received up to that
    /// point is preserved as an assistant turn.
    pub fn cancel(&mut self) {
        if self.streaming {
            self.cancel.cancel();
        }
    }

    /// Discard the conversation and return to idle from any state.
    pub fn new_chat(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        while self.signals.try_recv().is_ok() {}
        self.history.clear();
        self.partial.clear();
        self.error = None;
        self.streaming = false;
    }

    fn apply(&mut self, signal: &StreamSignal) {
        match signal {
            StreamSignal::Delta(text) => {
                debug!("Received {} bytes of content", text.len());
                self.partial.push_str(text);
            }
            StreamSignal::Finished | StreamSignal::Cancelled => {
                if !self.partial.is_empty() {
                    let text = std::mem::take(&mut self.partial);
                    self.history.push(ConversationTurn::assistant(text));
                }
                self.streaming = false;
                self.task = None;
                info!("Turn finished ({:?})", signal);
            }
            StreamSignal::Failed(message) => {
                warn!("Turn failed: {message}");
                self.error = Some(message.clone());
                self.partial.clear();
                self.streaming = false;
                self.task = None;
            }
        }
    }

    /// Rebuild the full wire message list from the history: the fixed system
    /// instruction first, then one message per turn with image parts before
    /// text parts.
    fn wire_messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.history.len() + 1);
        messages.push(Message::system(SYSTEM_PROMPT));

        for turn in &self.history {
            messages.push(match turn.role() {
                TurnRole::User => {
                    let mut parts = Vec::new();
                    if let Some(data) = turn.screenshot() {
                        if let Ok(part) = ContentPart::image(data.to_vec(), PNG_MIME) {
                            parts.push(part);
                        }
                    }
                    parts.push(ContentPart::text(turn.text()));
                    Message::user(parts)
                }
                TurnRole::Assistant => Message::assistant(turn.text()),
            });
        }

        messages
    }
}
