use relay_core::config::RoutingConfig;
use relay_core::ToolDecision;

const INTERROGATIVES: &[&str] =
    &["what", "who", "why", "how", "when", "where", "define", "explain", "meaning"];

/// Operator-tunable trigger phrases, normalized to trimmed lowercase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TriggerPhrases {
    media: Vec<String>,
    cards: Vec<String>,
    ingest: Vec<String>,
}

impl TriggerPhrases {
    pub fn new(media: Vec<String>, cards: Vec<String>, ingest: Vec<String>) -> Self {
        Self { media: normalize(media), cards: normalize(cards), ingest: normalize(ingest) }
    }

    pub fn media(&self) -> &[String] {
        &self.media
    }

    pub fn cards(&self) -> &[String] {
        &self.cards
    }

    pub fn ingest(&self) -> &[String] {
        &self.ingest
    }
}

impl Default for TriggerPhrases {
    fn default() -> Self {
        Self::from(&RoutingConfig::default())
    }
}

impl From<&RoutingConfig> for TriggerPhrases {
    fn from(routing: &RoutingConfig) -> Self {
        Self::new(
            routing.media_phrases.clone(),
            routing.cards_phrases.clone(),
            routing.ingest_phrases.clone(),
        )
    }
}

fn normalize(phrases: Vec<String>) -> Vec<String> {
    phrases
        .into_iter()
        .map(|phrase| phrase.trim().to_lowercase())
        .filter(|phrase| !phrase.is_empty())
        .collect()
}

/// The rule that produced a [`ToolDecision`], kept for logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteRule {
    MediaAttached,
    MediaPhrase,
    EmptyMessage,
    CardsPhrase,
    IngestPhrase,
    Question,
    Fallback,
}

impl RouteRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MediaAttached => "media_attached",
            Self::MediaPhrase => "media_phrase",
            Self::EmptyMessage => "empty_message",
            Self::CardsPhrase => "cards_phrase",
            Self::IngestPhrase => "ingest_phrase",
            Self::Question => "question",
            Self::Fallback => "fallback",
        }
    }
}

/// Rule-based router from a message to a tool.
///
/// Rules are evaluated in a fixed order and the first match wins: media,
/// flashcards, ingestion, question shape, then the fallback. The forced-tool
/// override lives in the dispatcher and never reaches this type.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IntentClassifier {
    phrases: TriggerPhrases,
}

impl IntentClassifier {
    pub fn new(phrases: TriggerPhrases) -> Self {
        Self { phrases }
    }

    pub fn decide(&self, message: &str, has_media: bool) -> ToolDecision {
        self.classify(message, has_media).0
    }

    pub fn classify(&self, message: &str, has_media: bool) -> (ToolDecision, RouteRule) {
        let text = message.trim().to_lowercase();

        if has_media {
            return (ToolDecision::Media, RouteRule::MediaAttached);
        }
        if text.is_empty() {
            return (ToolDecision::NoTool, RouteRule::EmptyMessage);
        }
        if contains_any(&text, &self.phrases.media) {
            return (ToolDecision::Media, RouteRule::MediaPhrase);
        }
        if contains_any(&text, &self.phrases.cards) {
            return (ToolDecision::Cards, RouteRule::CardsPhrase);
        }
        if contains_any(&text, &self.phrases.ingest) {
            return (ToolDecision::Ingest, RouteRule::IngestPhrase);
        }
        if text.contains('?') || starts_with_interrogative(&text) {
            return (ToolDecision::Rag, RouteRule::Question);
        }

        (ToolDecision::Rag, RouteRule::Fallback)
    }
}

fn contains_any(text: &str, phrases: &[String]) -> bool {
    phrases.iter().any(|phrase| text.contains(phrase.as_str()))
}

fn starts_with_interrogative(text: &str) -> bool {
    INTERROGATIVES.iter().any(|word| {
        text.strip_prefix(word)
            .is_some_and(|rest| !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_'))
    })
}
