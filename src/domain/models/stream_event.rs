/// One parsed frame of a vendor's streaming response.
///
/// `Ignore` classifies frames with no user-visible content: keepalive pings,
/// empty deltas, malformed JSON. It never terminates a stream and is dropped
/// before events reach consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Content(String),
    Done,
    Ignore,
}

impl StreamEvent {
    pub fn content(text: impl Into<String>) -> Self {
        Self::Content(text.into())
    }
}
