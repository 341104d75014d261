use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{PipelineStage, RagError};

#[async_trait]
pub trait Generator: Send + Sync {
    /// `context` may be empty; whether to answer from general knowledge or
    /// decline is up to the implementation.
    async fn generate(&self, query: &str, context: &str) -> Result<String, RagError>;
}

/// Stands in until a language model is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnconfiguredGenerator;

#[async_trait]
impl Generator for UnconfiguredGenerator {
    async fn generate(&self, _query: &str, _context: &str) -> Result<String, RagError> {
        Err(RagError::NotImplemented { stage: PipelineStage::Generate })
    }
}

#[derive(Debug, Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

/// Generator backed by an Ollama server's `/api/generate` endpoint.
#[derive(Clone, Debug)]
pub struct OllamaGenerator {
    client: Client,
    endpoint: String,
    model: String,
}

impl OllamaGenerator {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RagError> {
        let client = Client::builder().timeout(timeout).build().map_err(|error| {
            RagError::backend(PipelineStage::Generate, format!("http client setup failed: {error}"))
        })?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/generate", base_url.trim_end_matches('/')),
            model: model.into(),
        })
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(&self, query: &str, context: &str) -> Result<String, RagError> {
        let request = OllamaGenerateRequest {
            model: &self.model,
            prompt: build_prompt(query, context),
            stream: false,
        };

        debug!(model = %self.model, context_chars = context.len(), "requesting generation");
        let response =
            self.client.post(&self.endpoint).json(&request).send().await.map_err(|error| {
                RagError::backend(PipelineStage::Generate, format!("model server unreachable: {error}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::backend(
                PipelineStage::Generate,
                format!("model server returned {status}: {body}"),
            ));
        }

        let payload = response.json::<OllamaGenerateResponse>().await.map_err(|error| {
            RagError::backend(PipelineStage::Generate, format!("invalid model response: {error}"))
        })?;

        Ok(payload.response.trim().to_string())
    }
}

pub(crate) fn build_prompt(query: &str, context: &str) -> String {
    let context = if context.trim().is_empty() { "(no context retrieved)" } else { context };
    format!(
        "You are a retrieval-augmented assistant. Answer the question using only the context below.\n\
         If the context does not contain the answer, say that you cannot find the information.\n\n\
         Context:\n{context}\n\n\
         Question: {query}\n\
         Answer:"
    )
}

#[cfg(test)]
mod tests {
    use super::{build_prompt, Generator, UnconfiguredGenerator};
    use crate::{PipelineStage, RagError};

    #[test]
    fn prompt_marks_missing_context() {
        let prompt = build_prompt("What is RAG?", "");
        assert!(prompt.contains("(no context retrieved)"));
        assert!(prompt.contains("Question: What is RAG?"));
    }

    #[test]
    fn prompt_embeds_context() {
        let prompt = build_prompt("q", "alpha\n\nbeta");
        assert!(prompt.contains("Context:\nalpha\n\nbeta"));
    }

    #[tokio::test]
    async fn unconfigured_generator_reports_not_implemented() {
        let result = UnconfiguredGenerator.generate("q", "").await;
        assert_eq!(result, Err(RagError::NotImplemented { stage: PipelineStage::Generate }));
    }
}
