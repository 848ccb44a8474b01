//! Question answering grounded in indexed documents.

use crate::db::models::{MetadataFilter, SearchHit};
use crate::error::{Error, Result};
use crate::llm::{ChatMessage, LlmError};
use crate::outbound;
use crate::state::AppState;

pub const EMPTY_QUESTION_MESSAGE: &str = "Please provide a question.";
pub const NO_CONTEXT_MESSAGE: &str =
    "No relevant context found. Try ingesting PDFs first or rephrasing your question.";
pub const QUOTA_MESSAGE: &str =
    "API quota exceeded. Please wait a moment and try again. This is due to provider rate limits.";

const INSTRUCTIONS: &str = "You are a helpful assistant. Use ONLY the provided context to answer.\n\
If the answer is not in the context, say you don't know.";

/// Answer `query` from the index, optionally restricted to one document.
///
/// Never fails: every error becomes a user-facing message. Non-empty
/// questions are recorded in the RAG memory along with the reply.
pub async fn answer(state: &AppState, query: &str, scope: Option<&str>) -> String {
    let reply = match try_answer(state, query, scope).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!(error = %e, "question answering failed");
            user_message(&e, "Error processing your question")
        }
    };
    if !query.trim().is_empty() {
        state.memories.rag.push_exchange(query, reply.clone());
    }
    reply
}

async fn try_answer(state: &AppState, query: &str, scope: Option<&str>) -> Result<String> {
    if query.trim().is_empty() {
        return Ok(EMPTY_QUESTION_MESSAGE.to_string());
    }

    let hits = retrieve(state, query, scope).await?;
    if hits.is_empty() {
        return Ok(NO_CONTEXT_MESSAGE.to_string());
    }

    let messages = vec![ChatMessage::user(build_prompt(&hits, query))];
    let messages = messages.as_slice();
    let model = state.providers.completion_model()?;
    let model = model.as_ref();
    let temperature = state.config.rag_temperature;

    let reply = outbound::call(
        &state.config.call_policy,
        Some(state.limiter.as_ref()),
        "completion",
        move || model.complete(messages, temperature),
    )
    .await?;

    tracing::info!(chunks = hits.len(), scoped = scope.is_some(), "answered question");
    Ok(reply.trim().to_string())
}

/// Top-k index entries for `query`, best first.
pub async fn retrieve(state: &AppState, query: &str, scope: Option<&str>) -> Result<Vec<SearchHit>> {
    let filter = scope
        .map(|name| {
            state
                .store
                .path_for(name)
                .map(|path| MetadataFilter::source(path.to_string_lossy()))
        })
        .transpose()?;

    let embedder = state.providers.embedder()?;
    let embedder = embedder.as_ref();
    let input = vec![query.to_string()];
    let input = input.as_slice();

    let vectors = outbound::call(&state.config.call_policy, None, "embedding", move || {
        embedder.embed(input)
    })
    .await?;
    let query_embedding = vectors
        .into_iter()
        .next()
        .ok_or_else(|| Error::from(LlmError::Parse("empty embedding response".into())))?;

    let hits = state
        .db
        .search(&query_embedding, state.config.top_k, filter.as_ref())?;
    tracing::debug!(hits = hits.len(), "retrieved context");
    Ok(hits)
}

/// Ranked context block followed by the question.
pub fn build_prompt(hits: &[SearchHit], query: &str) -> String {
    let context = hits
        .iter()
        .enumerate()
        .map(|(i, hit)| {
            format!(
                "[Chunk {}] (source: {}, page: {})\n{}",
                i + 1,
                hit.metadata.source,
                hit.metadata.page,
                hit.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("{INSTRUCTIONS}\n\nContext:\n{context}\n\nQuestion: {query}\n\nAnswer:")
}

/// The text a user sees when a feature fails.
pub fn user_message(err: &Error, context: &str) -> String {
    match err {
        Error::QuotaExceeded(_) => QUOTA_MESSAGE.to_string(),
        Error::Config(msg) => format!("Configuration error: {msg}"),
        other => format!("{context}: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::ChunkMetadata;
    use crate::knowledge;
    use crate::testing::{fast_config, test_state, FakeModel, FakeProviders};
    use std::sync::Arc;

    fn hit(source: &str, page: u32, content: &str) -> SearchHit {
        SearchHit {
            id: "id".into(),
            content: content.into(),
            metadata: ChunkMetadata {
                source: source.into(),
                page,
                start_index: 0,
            },
            score: 1.0,
        }
    }

    #[test]
    fn test_build_prompt_layout() {
        let prompt = build_prompt(
            &[hit("/data/pdfs/a.pdf", 2, "first text"), hit("/data/pdfs/b.pdf", 0, "second text")],
            "what is it?",
        );
        assert!(prompt.starts_with("You are a helpful assistant. Use ONLY the provided context"));
        assert!(prompt.contains(
            "[Chunk 1] (source: /data/pdfs/a.pdf, page: 2)\nfirst text\n\n[Chunk 2] (source: /data/pdfs/b.pdf, page: 0)\nsecond text"
        ));
        assert!(prompt.contains("say you don't know"));
        assert!(prompt.ends_with("Question: what is it?\n\nAnswer:"));
    }

    #[test]
    fn test_user_message_mapping() {
        assert_eq!(user_message(&Error::QuotaExceeded("429".into()), "x"), QUOTA_MESSAGE);
        assert_eq!(
            user_message(&Error::Config("no key".into()), "x"),
            "Configuration error: no key"
        );
        assert_eq!(
            user_message(&Error::Load("bad".into()), "Oops"),
            "Oops: Load error: bad"
        );
    }

    #[tokio::test]
    async fn test_empty_question_calls_nothing() {
        let providers = Arc::new(FakeProviders::new(FakeModel::replying("never")));
        let (_tmp, state) = test_state(providers.clone(), fast_config());

        assert_eq!(answer(&state, "   ", None).await, EMPTY_QUESTION_MESSAGE);
        assert_eq!(answer(&state, "", None).await, EMPTY_QUESTION_MESSAGE);
        assert_eq!(providers.embed_calls(), 0);
        assert_eq!(providers.model.call_count(), 0);
        assert!(state.memories.rag.is_empty());
    }

    #[tokio::test]
    async fn test_empty_index_skips_completion() {
        let providers = Arc::new(FakeProviders::new(FakeModel::replying("never")));
        let (_tmp, state) = test_state(providers.clone(), fast_config());

        assert_eq!(answer(&state, "anything?", None).await, NO_CONTEXT_MESSAGE);
        assert_eq!(providers.model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_scope_without_entries_skips_completion() {
        let providers = Arc::new(FakeProviders::new(FakeModel::replying("never")));
        let (tmp, state) = test_state(providers.clone(), fast_config());
        let src = tmp.path().join("present.txt");
        std::fs::write(&src, "indexed content about rust").unwrap();
        knowledge::upload(&state, &src).await.unwrap();

        let reply = answer(&state, "rust?", Some("absent.pdf")).await;
        assert_eq!(reply, NO_CONTEXT_MESSAGE);
        assert_eq!(providers.model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_answer_uses_scoped_context() {
        let providers = Arc::new(FakeProviders::new(FakeModel::replying("  The answer.  \n")));
        let (tmp, state) = test_state(providers.clone(), fast_config());
        let a = tmp.path().join("apples.txt");
        let b = tmp.path().join("zebras.txt");
        std::fs::write(&a, "apples are red and sweet").unwrap();
        std::fs::write(&b, "zebras have black and white stripes").unwrap();
        knowledge::upload(&state, &a).await.unwrap();
        knowledge::upload(&state, &b).await.unwrap();

        let reply = answer(&state, "what colour are apples?", Some("zebras.txt")).await;
        assert_eq!(reply, "The answer.");

        let prompt = &providers.model.last_prompt()[0].content;
        assert!(prompt.contains("zebras have black and white stripes"));
        assert!(!prompt.contains("apples are red"));
        assert!(prompt.contains("Question: what colour are apples?"));
        assert_eq!(*providers.model.temperatures.lock().unwrap(), vec![0.2]);

        assert_eq!(
            state.memories.rag.messages().last().map(|(_, m)| m.as_str()),
            Some("The answer.")
        );
        assert!(state.memories.chat.is_empty());
    }

    #[tokio::test]
    async fn test_top_k_limits_context() {
        let providers = Arc::new(FakeProviders::new(FakeModel::replying("ok")));
        let config = crate::config::RagConfig {
            top_k: 2,
            ..fast_config()
        };
        let (tmp, state) = test_state(providers.clone(), config);
        for i in 0..4 {
            let src = tmp.path().join(format!("doc{i}.txt"));
            std::fs::write(&src, format!("document number {i}")).unwrap();
            knowledge::upload(&state, &src).await.unwrap();
        }

        answer(&state, "document", None).await;
        let prompt = &providers.model.last_prompt()[0].content;
        assert!(prompt.contains("[Chunk 2]"));
        assert!(!prompt.contains("[Chunk 3]"));
    }

    #[tokio::test]
    async fn test_rate_limit_error_becomes_quota_message() {
        let providers = Arc::new(FakeProviders::new(FakeModel::failing(
            429,
            "Resource has been exhausted",
        )));
        let (tmp, state) = test_state(providers.clone(), fast_config());
        let src = tmp.path().join("doc.txt");
        std::fs::write(&src, "some context").unwrap();
        knowledge::upload(&state, &src).await.unwrap();

        assert_eq!(answer(&state, "question?", None).await, QUOTA_MESSAGE);
    }

    #[tokio::test]
    async fn test_other_provider_error_is_reported_as_text() {
        let providers = Arc::new(FakeProviders::new(FakeModel::failing(400, "invalid model")));
        let (tmp, state) = test_state(providers, fast_config());
        let src = tmp.path().join("doc.txt");
        std::fs::write(&src, "some context").unwrap();
        knowledge::upload(&state, &src).await.unwrap();

        let reply = answer(&state, "question?", None).await;
        assert!(reply.starts_with("Error processing your question:"));
        assert!(reply.contains("invalid model"));
    }

    #[tokio::test]
    async fn test_missing_credentials_reported_without_calls() {
        let mut providers = FakeProviders::new(FakeModel::replying("never"));
        providers.configured = false;
        let providers = Arc::new(providers);
        let (_tmp, state) = test_state(providers.clone(), fast_config());

        let reply = answer(&state, "question?", None).await;
        assert!(reply.starts_with("Configuration error:"));
        assert_eq!(providers.embed_calls(), 0);
    }
}
