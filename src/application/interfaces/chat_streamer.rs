use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use crate::domain::{ChatError, Message, Provider, StreamEvent};

/// A lazy, finite, non-restartable sequence of stream events.
///
/// `Done` (or the stream simply ending) marks normal completion; an `Err`
/// item terminates the turn with that failure. Dropping the stream tears
/// down the underlying connection.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, ChatError>> + Send>>;

/// An interface for opening one streaming conversation turn against a
/// chat-completion vendor.
///
/// Implementors encapsulate transport, serialization, and vendor-specific
/// request/response framing. Consumers (e.g. [`ChatSession`]) remain
/// decoupled from any particular provider or HTTP client library.
///
/// [`ChatSession`]: crate::application::use_cases::ChatSession
#[async_trait]
pub trait ChatStreamer: Send + Sync {
    /// Send `messages` to `provider` using the given model id and API key,
    /// returning the incremental token stream.
    ///
    /// A non-success HTTP status surfaces as [`ChatError::Api`] before any
    /// events are produced.
    async fn stream(
        &self,
        messages: &[Message],
        model_id: &str,
        api_key: &str,
        provider: Provider,
    ) -> Result<EventStream, ChatError>;
}
