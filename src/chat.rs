use crate::error::Result;
use crate::llm::ChatMessage;
use crate::outbound;
use crate::rag::user_message;
use crate::state::AppState;

const SYSTEM_PROMPT: &str =
    "You are a helpful AI assistant. Continue the conversation based on the history so far.";

/// One turn of conversation against the chat memory.
///
/// Blank input is ignored. Successful exchanges are appended to the chat
/// memory; failures come back as text and leave the memory untouched.
pub async fn chat(state: &AppState, input: &str) -> String {
    let input = input.trim();
    if input.is_empty() {
        return String::new();
    }

    match try_chat(state, input).await {
        Ok(reply) => {
            state.memories.chat.push_exchange(input, reply.clone());
            reply
        }
        Err(e) => {
            tracing::warn!(error = %e, "chat turn failed");
            user_message(&e, "Error")
        }
    }
}

async fn try_chat(state: &AppState, input: &str) -> Result<String> {
    let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT)];
    messages.extend(state.memories.chat.to_chat_messages());
    messages.push(ChatMessage::user(input));

    let model = state.providers.completion_model()?;
    let model = model.as_ref();
    let messages = messages.as_slice();
    let temperature = state.config.chat_temperature;

    let reply = outbound::call(
        &state.config.call_policy,
        Some(state.limiter.as_ref()),
        "chat",
        move || model.complete(messages, temperature),
    )
    .await?;
    Ok(reply.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Role;
    use crate::rag::QUOTA_MESSAGE;
    use crate::testing::{fast_config, test_state, FakeModel, FakeProviders};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_history_is_sent_and_recorded() {
        let providers = Arc::new(FakeProviders::new(FakeModel::replying("Nice to meet you, Sam.")));
        let (_tmp, state) = test_state(providers.clone(), fast_config());

        chat(&state, "Hi, I'm Sam").await;
        let reply = chat(&state, "What's my name?").await;
        assert_eq!(reply, "Nice to meet you, Sam.");

        let prompt = providers.model.last_prompt();
        assert_eq!(prompt[0].role, "system");
        assert_eq!(prompt[1], ChatMessage::user("Hi, I'm Sam"));
        assert_eq!(prompt[2], ChatMessage::assistant("Nice to meet you, Sam."));
        assert_eq!(prompt[3], ChatMessage::user("What's my name?"));

        let history = state.memories.chat.messages();
        assert_eq!(history.len(), 4);
        assert_eq!(history[2], (Role::Human, "What's my name?".to_string()));
        assert!(state.memories.rag.is_empty());
        assert!(state.memories.agent.is_empty());
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let providers = Arc::new(FakeProviders::new(FakeModel::replying("never")));
        let (_tmp, state) = test_state(providers.clone(), fast_config());
        assert_eq!(chat(&state, "  ").await, "");
        assert_eq!(providers.model.call_count(), 0);
        assert!(state.memories.chat.is_empty());
    }

    #[tokio::test]
    async fn test_quota_failure_not_recorded() {
        let providers = Arc::new(FakeProviders::new(FakeModel::failing(429, "quota exceeded")));
        let (_tmp, state) = test_state(providers, fast_config());
        assert_eq!(chat(&state, "hello").await, QUOTA_MESSAGE);
        assert!(state.memories.chat.is_empty());
    }

    #[tokio::test]
    async fn test_clear_starts_fresh_conversation() {
        let providers = Arc::new(FakeProviders::new(FakeModel::replying("ok")));
        let (_tmp, state) = test_state(providers.clone(), fast_config());
        chat(&state, "remember this").await;
        state.memories.chat.clear();
        chat(&state, "new topic").await;

        let prompt = providers.model.last_prompt();
        assert_eq!(prompt.len(), 2);
        assert_eq!(prompt[1], ChatMessage::user("new topic"));
    }
}
