use relay_agent::AgentRuntime;
use relay_core::config::{AppConfig, LoadOptions};
use relay_core::{AskRequest, GatewayError};

use crate::commands::{current_thread_runtime, CommandResult};

const COMMAND: &str = "ask";

/// Dispatches one message through the configured gateway and prints the
/// response envelope.
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

    let request = AskRequest::new(message).with_media(has_media);
    if let Err(error) = request.validate() {
        return dispatch_failure(&error, None);
    }

    let runtime = match current_thread_runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let agent =
            AgentRuntime::from_config(&config).map_err(|error| (error, None::<String>))?;
        agent
            .dispatcher
            .ask(&request)
            .await
            .map_err(|traced| (traced.error, Some(traced.trace_id)))
    });

    match result {
        Ok(envelope) => match serde_json::to_value(&envelope) {
            Ok(data) => CommandResult::success_with_data(
                COMMAND,
                format!("answered by `{}`", envelope.tool_used),
                Some(data),
            ),
            Err(error) => CommandResult::failure(
                COMMAND,
                "serialization",
                format!("failed to serialize response envelope: {error}"),
                5,
            ),
        },
        Err((error, trace_id)) => dispatch_failure(&error, trace_id.as_deref()),
    }
}

fn dispatch_failure(error: &GatewayError, trace_id: Option<&str>) -> CommandResult {
    let exit_code = match error {
        GatewayError::Validation(_) => 2,
        GatewayError::Config(_) => 3,
        GatewayError::Transport { .. } => 4,
        GatewayError::Protocol { .. } => 5,
    };
    let message = match trace_id {
        Some(trace_id) => format!("{error} (trace_id: {trace_id})"),
        None => error.to_string(),
    };
    CommandResult::failure(COMMAND, error.error_class(), message, exit_code)
}
