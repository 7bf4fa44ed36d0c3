use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::ChatError;

/// Role of a persisted chat entry. The system instruction is never part of
/// the visible history, so there is no system case here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Assistant,
}

/// An explicit image handed to a submission, e.g. a screenshot picked from a
/// palette or a file loaded from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    data: Vec<u8>,
    label: Option<String>,
}

impl Attachment {
    pub fn new(data: Vec<u8>, label: Option<String>) -> Result<Self, ChatError> {
        if data.is_empty() {
            return Err(ChatError::invalid_input("attachment payload is empty"));
        }
        Ok(Self { data, label })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn into_parts(self) -> (Vec<u8>, Option<String>) {
        (self.data, self.label)
    }
}

/// One entry of the visible chat history, distinct from the wire [`Message`]
/// rebuilt from it on every submission.
///
/// Turns are immutable after creation; the in-progress assistant text lives
/// in the session's partial buffer until it is finalized into a turn.
///
/// [`Message`]: crate::domain::models::Message
#[derive(Debug, Clone)]
pub struct ConversationTurn {
    id: Uuid,
    role: TurnRole,
    text: String,
    screenshot: Option<Vec<u8>>,
    screenshot_label: Option<String>,
    created_at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>, attachment: Option<Attachment>) -> Self {
        let (screenshot, screenshot_label) = match attachment {
            Some(attachment) => {
                let (data, label) = attachment.into_parts();
                (Some(data), label)
            }
            None => (None, None),
        };
        Self {
            id: Uuid::new_v4(),
            role: TurnRole::User,
            text: text.into(),
            screenshot,
            screenshot_label,
            created_at: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: TurnRole::Assistant,
            text: text.into(),
            screenshot: None,
            screenshot_label: None,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn role(&self) -> TurnRole {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn screenshot(&self) -> Option<&[u8]> {
        self.screenshot.as_deref()
    }

    pub fn screenshot_label(&self) -> Option<&str> {
        self.screenshot_label.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn has_screenshot(&self) -> bool {
        self.screenshot.is_some()
    }
}

impl PartialEq for ConversationTurn {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
