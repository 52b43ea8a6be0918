use std::str::FromStr;

use crate::error_handler::ConfigError;

/// Represents the provider (backend) used for embeddings and chat inference.
///
/// Adding more providers later (e.g., Voyage, Cohere) is done by extending
/// this enum and the client cache in [`crate::service_profiles`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmProvider {
    /// Local Ollama runtime.
    Ollama,
    /// OpenAI REST API (or any compatible gateway).
    OpenAI,
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    /// Parses a provider name case-insensitively (`openai`, `chatgpt`, `ollama`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(LlmProvider::Ollama),
            "openai" | "chatgpt" => Ok(LlmProvider::OpenAI),
            other => Err(ConfigError::UnsupportedProvider(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_names() {
        assert_eq!("OpenAI".parse::<LlmProvider>().unwrap(), LlmProvider::OpenAI);
        assert_eq!(" ollama ".parse::<LlmProvider>().unwrap(), LlmProvider::Ollama);
        assert!("mistral".parse::<LlmProvider>().is_err());
    }
}
