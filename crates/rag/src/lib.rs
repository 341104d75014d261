//! Retrieval-augmented generation pipeline.
//!
//! A run is strictly sequential: **parse** the question, **retrieve** ranked
//! passages with their [`SourceRef`](relay_core::SourceRef) attribution, then
//! **generate** an answer from the concatenated context. Retrieval and
//! generation are pluggable through the [`Retriever`] and [`Generator`]
//! traits; the pipeline itself never retries.

pub mod corpus;
pub mod generator;
pub mod pipeline;
pub mod retriever;
pub mod schema;

pub use generator::{Generator, OllamaGenerator, UnconfiguredGenerator};
pub use pipeline::{RagOutcome, RagPipeline};
pub use retriever::{Document, KeywordRetriever, Passage, Retriever};

use std::fmt;

use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Parse,
    Retrieve,
    Generate,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parse => "parse",
            Self::Retrieve => "retrieve",
            Self::Generate => "generate",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RagError {
    #[error("invalid question: {0}")]
    Validation(String),
    #[error("{stage} stage is not implemented")]
    NotImplemented { stage: PipelineStage },
    #[error("{stage} backend failed: {detail}")]
    Backend { stage: PipelineStage, detail: String },
}

impl RagError {
    pub fn backend(stage: PipelineStage, detail: impl Into<String>) -> Self {
        Self::Backend { stage, detail: detail.into() }
    }
}
