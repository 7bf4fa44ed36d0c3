use crate::application::CredentialStore;

/// Reads API keys from the process environment.
///
/// Credential keys are mapped to uppercase variable names, so
/// `openai_api_key` resolves from `OPENAI_API_KEY`. Empty values count as
/// absent.
pub struct EnvCredentialStore;

impl EnvCredentialStore {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EnvCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for EnvCredentialStore {
    fn read(&self, key: &str) -> Option<String> {
        std::env::var(key.to_ascii_uppercase())
            .ok()
            .filter(|value| !value.is_empty())
    }
}
