use thiserror::Error;

use crate::domain::models::Provider;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("{provider} API error {status}: {body}")]
    Api {
        provider: Provider,
        status: u16,
        body: String,
    },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("No API key configured for {0}")]
    MissingCredential(Provider),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ChatError {
    pub fn api(provider: Provider, status: u16, body: impl Into<String>) -> Self {
        Self::Api {
            provider,
            status,
            body: body.into(),
        }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn is_api_error(&self) -> bool {
        matches!(self, Self::Api { .. })
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
