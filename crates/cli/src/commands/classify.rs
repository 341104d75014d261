use relay_agent::{IntentClassifier, TriggerPhrases};
use relay_core::config::{AppConfig, LoadOptions};
use serde_json::json;

use crate::commands::CommandResult;

const COMMAND: &str = "classify";

/// Reports which tool a message would be routed to, without dispatching it.
pub fn run(message: &str, has_media: bool) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "config_validation",
                format!("config validation failed: {error}"),
                2,
            );
        }
    };

    let (tool, rule) = match config.gateway.force_tool {
        Some(tool) => (tool, "forced"),
        None => {
            let classifier = IntentClassifier::new(TriggerPhrases::from(&config.routing));
            let (tool, rule) = classifier.classify(message, has_media);
            (tool, rule.as_str())
        }
    };

    CommandResult::success_with_data(
        COMMAND,
        format!("message routes to `{tool}`"),
        Some(json!({ "tool": tool, "rule": rule, "has_media": has_media })),
    )
}
