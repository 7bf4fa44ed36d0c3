use crate::domain::ChatError;

/// Role of a wire-format chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One piece of message content: plain text or an inline image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    Image { data: Vec<u8>, mime_type: String },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Build an image part. Empty payloads are rejected.
    pub fn image(data: Vec<u8>, mime_type: impl Into<String>) -> Result<Self, ChatError> {
        if data.is_empty() {
            return Err(ChatError::invalid_input("image payload is empty"));
        }
        Ok(Self::Image {
            data,
            mime_type: mime_type.into(),
        })
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::Image { .. })
    }
}

/// A vendor-neutral conversation message: a role plus ordered content parts.
///
/// Immutable once constructed; provider adapters translate it into their
/// vendor-specific wire shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    role: Role,
    parts: Vec<ContentPart>,
}

impl Message {
    pub fn new(role: Role, parts: Vec<ContentPart>) -> Self {
        Self { role, parts }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, vec![ContentPart::text(text)])
    }

    pub fn user(parts: Vec<ContentPart>) -> Self {
        Self::new(Role::User, parts)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, vec![ContentPart::text(text)])
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn parts(&self) -> &[ContentPart] {
        &self.parts
    }

    /// All text parts concatenated, for logging and system-prompt hoisting.
    pub fn text_content(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                ContentPart::Text(t) => Some(t.as_str()),
                ContentPart::Image { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
