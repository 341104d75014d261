use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use relay_core::{SessionArena, SessionKey, SourceRef};
use tokio::sync::RwLock;

use crate::RagError;

const SNIPPET_CHARS: usize = 200;
const MIN_TERM_CHARS: usize = 3;
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "what", "who", "why", "how", "when", "where", "which", "this",
    "that", "are", "was", "from", "into", "about",
];

/// A retrieved passage and the attribution for where it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Passage {
    pub text: String,
    pub source: SourceRef,
}

#[async_trait]
pub trait Retriever: Send + Sync {
    /// Ordered most-relevant first. An empty result is valid.
    async fn retrieve(&self, query: &str) -> Result<Vec<Passage>, RagError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    pub locator: String,
    pub text: String,
}

impl Document {
    pub fn new(
        title: impl Into<String>,
        locator: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self { title: title.into(), locator: locator.into(), text: text.into() }
    }
}

/// In-memory retriever ranking documents by how many distinct query terms
/// they contain. Ties keep insertion order.
#[derive(Debug)]
pub struct KeywordRetriever {
    documents: RwLock<SessionArena<Document>>,
    top_k: usize,
}

impl KeywordRetriever {
    pub fn new(top_k: usize, capacity: usize, ttl: Option<Duration>) -> Self {
        Self::with_documents(top_k, capacity, ttl, Vec::new())
    }

    /// Seeds the store in order. Past `capacity`, the earliest documents are
    /// evicted.
    pub fn with_documents(
        top_k: usize,
        capacity: usize,
        ttl: Option<Duration>,
        documents: Vec<Document>,
    ) -> Self {
        let mut arena = SessionArena::new(capacity, ttl);
        for document in documents {
            arena.insert(document);
        }
        Self { documents: RwLock::new(arena), top_k: top_k.max(1) }
    }

    pub async fn add_document(&self, document: Document) -> SessionKey {
        self.documents.write().await.insert(document)
    }

    pub async fn remove_document(&self, key: SessionKey) -> Option<Document> {
        self.documents.write().await.remove(key)
    }

    pub async fn document_count(&self) -> usize {
        self.documents.read().await.len()
    }
}

#[async_trait]
impl Retriever for KeywordRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<Passage>, RagError> {
        let query_terms = terms(query);
        if query_terms.is_empty() {
            return Ok(Vec::new());
        }

        let documents = self.documents.read().await;
        let mut scored = documents
            .iter()
            .filter_map(|(_, document)| {
                let document_terms = terms(&document.text);
                let score = query_terms.intersection(&document_terms).count();
                (score > 0).then_some((score, document))
            })
            .collect::<Vec<_>>();
        // stable sort keeps insertion order on equal scores
        scored.sort_by(|left, right| right.0.cmp(&left.0));

        Ok(scored
            .into_iter()
            .take(self.top_k)
            .map(|(_, document)| Passage {
                text: document.text.clone(),
                source: SourceRef::new(
                    document.title.clone(),
                    document.locator.clone(),
                    snippet(&document.text),
                ),
            })
            .collect())
    }
}

fn terms(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|term| term.chars().count() >= MIN_TERM_CHARS)
        .map(str::to_lowercase)
        .filter(|term| !STOPWORDS.contains(&term.as_str()))
        .collect()
}

fn snippet(text: &str) -> String {
    text.chars().take(SNIPPET_CHARS).collect::<String>().trim().to_string()
}
