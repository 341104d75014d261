use rand::Rng;

use crate::commands::CommandResult;

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const TOKEN_LEN: usize = 32;

/// Prints a fresh shared secret for `RELAY_INTERNAL_MCP_TOKEN`.
pub fn run() -> CommandResult {
    CommandResult::success_with_data(
        "token",
        "set this value as RELAY_INTERNAL_MCP_TOKEN on both the gateway and the RAG service",
        Some(serde_json::json!({ "token": generate_token() })),
    )
}

pub fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    (0..TOKEN_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{generate_token, TOKEN_LEN};

    #[test]
    fn tokens_are_alphanumeric_and_distinct() {
        let first = generate_token();
        let second = generate_token();

        assert_eq!(first.len(), TOKEN_LEN);
        assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(first, second);
    }
}
