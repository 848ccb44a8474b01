//! Single-shot task assistant.

use crate::error::Result;
use crate::llm::ChatMessage;
use crate::outbound;
use crate::rag::user_message;
use crate::state::AppState;

const SYSTEM_PROMPT: &str = "You are a precise, efficient technical assistant.

Structure every answer as:
1) Situation assessment: what is being asked and the key constraints
2) Plan: a brief strategy
3) Steps: clear, actionable bullets
4) Notes: risks or caveats, only if needed

Keep answers under 300 words. Prefer bullets, code or numbered steps.";

pub const RESPONSE_HEADER: &str = "**Task assistant**";

/// Run one task through the assistant persona and record the exchange in the
/// agent memory. Errors come back as text.
pub async fn agent_task(state: &AppState, task: &str) -> String {
    let task = task.trim();
    if task.is_empty() {
        return String::new();
    }

    let reply = match try_agent_task(state, task).await {
        Ok(content) => format!("{RESPONSE_HEADER}\n\n{content}"),
        Err(e) => {
            tracing::warn!(error = %e, "agent task failed");
            user_message(&e, "Agent error")
        }
    };
    state.memories.agent.push_exchange(task, reply.clone());
    reply
}

async fn try_agent_task(state: &AppState, task: &str) -> Result<String> {
    let model = state.providers.completion_model()?;
    let model = model.as_ref();
    let messages = [
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(format!("Please help me with this task: {task}")),
    ];
    let messages = messages.as_slice();
    let temperature = state.config.agent_temperature;

    let reply = outbound::call(
        &state.config.call_policy,
        Some(state.limiter.as_ref()),
        "agent",
        move || model.complete(messages, temperature),
    )
    .await?;
    Ok(reply.trim().to_string())
}
