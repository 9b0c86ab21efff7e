//! Small convenience constructors for common types.

use serde_json::Value;

use crate::{Message, Role, RunRequest, SessionId, StrategyKind};

pub fn system_message(content: impl Into<String>) -> Message {
    Message::system(content)
}

pub fn user_message(content: impl Into<String>) -> Message {
    Message::user(content)
}

pub fn model_message(content: impl Into<String>) -> Message {
    Message::model(content)
}

pub fn run(session_id: impl Into<SessionId>, prompt: impl Into<String>) -> RunRequest {
    RunRequest::new(session_id).with_prompt(prompt)
}

/// A run whose final answer must conform to `schema`.
pub fn structured_run(
    session_id: impl Into<SessionId>,
    prompt: impl Into<String>,
    schema: Value,
) -> RunRequest {
    run(session_id, prompt).with_output_schema(schema)
}

pub fn parse_role(value: &str) -> Option<Role> {
    match value.trim().to_ascii_lowercase().as_str() {
        "system" | "developer" => Some(Role::System),
        "user" | "human" => Some(Role::User),
        "model" | "assistant" | "ai" => Some(Role::Model),
        _ => None,
    }
}

pub fn parse_strategy_kind(value: &str) -> Option<StrategyKind> {
    match value.trim().to_ascii_lowercase().as_str() {
        "default" | "single" => Some(StrategyKind::Default),
        "dual-phase" | "dual_phase" | "dualphase" => Some(StrategyKind::DualPhase),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{Role, StrategyKind};

    use super::{parse_role, parse_strategy_kind, run, structured_run, user_message};

    #[test]
    fn parse_role_supports_aliases() {
        assert_eq!(parse_role("assistant"), Some(Role::Model));
        assert_eq!(parse_role(" Human "), Some(Role::User));
        assert_eq!(parse_role("developer"), Some(Role::System));
        assert_eq!(parse_role("tool"), None);
    }

    #[test]
    fn parse_strategy_kind_supports_aliases() {
        assert_eq!(parse_strategy_kind("Dual-Phase"), Some(StrategyKind::DualPhase));
        assert_eq!(parse_strategy_kind("single"), Some(StrategyKind::Default));
        assert_eq!(parse_strategy_kind("greedy"), None);
    }

    #[test]
    fn run_helpers_apply_expected_defaults() {
        let message = user_message("hello");
        assert_eq!(message.role, Role::User);

        let plain = run("session-1", "hello");
        let structured = structured_run("session-1", "hello", json!({"type": "object"}));

        assert!(plain.output_schema.is_none());
        assert!(plain.tools_enabled);
        assert_eq!(structured.output_schema, Some(json!({"type": "object"})));
        assert_eq!(
            structured.prompt.as_ref().map(|prompt| prompt.text()),
            Some("hello".to_string())
        );
    }
}
