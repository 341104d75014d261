use std::sync::Arc;
use std::time::Duration;

use relay_core::config::AppConfig;
use relay_core::{RagResult, SourceRef};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::corpus;
use crate::generator::{Generator, OllamaGenerator, UnconfiguredGenerator};
use crate::retriever::{KeywordRetriever, Retriever};
use crate::{PipelineStage, RagError};

const CONTEXT_SEPARATOR: &str = "\n\n";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RagOutcome {
    Answered(RagResult),
    /// A stage is a stub. Distinct from an answer produced with empty context.
    NotImplemented { stage: PipelineStage },
}

#[derive(Clone)]
pub struct RagPipeline {
    retriever: Arc<dyn Retriever>,
    generator: Arc<dyn Generator>,
}

impl RagPipeline {
    pub fn new(retriever: Arc<dyn Retriever>, generator: Arc<dyn Generator>) -> Self {
        Self { retriever, generator }
    }

    /// Keyword retriever sized and seeded from `[rag]`, and an Ollama generator when
    /// `[llm]` names a server. The retriever is returned so callers can load
    /// documents into it.
    pub fn from_config(config: &AppConfig) -> Result<(Self, Arc<KeywordRetriever>), RagError> {
        let documents = match &config.rag.documents_dir {
            Some(dir) => {
                let documents = corpus::load_dir(dir)?;
                info!(
                    event_name = "rag.corpus.loaded",
                    documents = documents.len(),
                    dir = %dir.display(),
                    "documents loaded"
                );
                documents
            }
            None => Vec::new(),
        };
        let retriever = Arc::new(KeywordRetriever::with_documents(
            config.rag.top_k,
            config.rag.document_capacity,
            config.rag.document_ttl_secs.map(Duration::from_secs),
            documents,
        ));

        let generator: Arc<dyn Generator> = match (&config.llm.base_url, &config.llm.model) {
            (Some(base_url), Some(model)) => Arc::new(OllamaGenerator::new(
                base_url,
                model.clone(),
                Duration::from_secs(config.llm.timeout_secs),
            )?),
            _ => {
                debug!("no language model configured; generation is stubbed");
                Arc::new(UnconfiguredGenerator)
            }
        };

        Ok((Self::new(retriever.clone(), generator), retriever))
    }

    pub async fn run(&self, question: &str) -> Result<RagOutcome, RagError> {
        let started = Instant::now();

        let query = parse_query(question)?;

        let passages = match self.retriever.retrieve(&query).await {
            Ok(passages) => passages,
            Err(RagError::NotImplemented { stage }) => return Ok(RagOutcome::NotImplemented { stage }),
            Err(error) => return Err(error),
        };
        debug!(passages = passages.len(), "retrieval finished");

        let (context, sources): (Vec<String>, Vec<SourceRef>) =
            passages.into_iter().map(|passage| (passage.text, passage.source)).unzip();
        let context = context.join(CONTEXT_SEPARATOR);

        let answer = match self.generator.generate(&query, &context).await {
            Ok(answer) => answer,
            Err(RagError::NotImplemented { stage }) => return Ok(RagOutcome::NotImplemented { stage }),
            Err(error) => return Err(error),
        };

        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            event_name = "rag.pipeline.completed",
            latency_ms,
            sources = sources.len(),
            "rag pipeline run completed"
        );

        Ok(RagOutcome::Answered(RagResult { answer, sources, latency_ms: Some(latency_ms) }))
    }
}

fn parse_query(question: &str) -> Result<String, RagError> {
    let query = question.trim();
    if query.is_empty() {
        return Err(RagError::Validation(format!(
            "{} stage rejected an empty question",
            PipelineStage::Parse
        )));
    }
    Ok(query.to_string())
}
