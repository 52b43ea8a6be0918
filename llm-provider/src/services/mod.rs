pub mod ollama_service;
pub mod open_ai_service;

use serde_json::Value;

/// JSON-schema description of a structured extraction ("function call").
///
/// OpenAI receives it as a forced tool; Ollama receives `parameters` as the
/// `format` constraint of a chat request.
#[derive(Debug, Clone)]
pub struct ExtractionSchema {
    /// Function name (e.g., `extract_search_criteria`).
    pub name: String,
    /// Instruction telling the model what to extract.
    pub description: String,
    /// JSON schema of the arguments object.
    pub parameters: Value,
}

/// Builds endpoint URLs from a base, dropping any trailing slash.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim().trim_end_matches('/'), path.trim_start_matches('/'))
}

/// `true` when the endpoint is non-empty and uses http/https.
pub(crate) fn is_http_endpoint(endpoint: &str) -> bool {
    let e = endpoint.trim();
    !e.is_empty() && (e.starts_with("http://") || e.starts_with("https://"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_normalizes_slashes() {
        assert_eq!(
            join_url("https://api.openai.com/", "/v1/embeddings"),
            "https://api.openai.com/v1/embeddings"
        );
        assert_eq!(
            join_url("http://localhost:11434", "api/embed"),
            "http://localhost:11434/api/embed"
        );
    }
}
