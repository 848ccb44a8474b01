use crate::llm::openai::OpenAiConfig;
use crate::llm::LlmError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Turns text into vectors. Documents and queries go through the same call.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError>;
}

#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Embedder backed by an OpenAI-compatible `/embeddings` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    pub config: OpenAiConfig,
    pub model: String,
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        generate_embeddings(&self.config, texts, &self.model).await
    }
}

/// Generate embeddings for a list of texts using the OpenAI-compatible API
pub async fn generate_embeddings(
    config: &OpenAiConfig,
    texts: &[String],
    model: &str,
) -> Result<Vec<Vec<f32>>, LlmError> {
    let client = Client::new();

    let body = EmbeddingRequest {
        model: model.to_string(),
        input: texts.to_vec(),
    };

    let mut req = client
        .post(format!("{}/embeddings", config.base_url))
        .header("Content-Type", "application/json")
        .json(&body);

    if !config.api_key.is_empty() {
        req = req.header("Authorization", format!("Bearer {}", config.api_key));
    }

    let resp = req.send().await?;

    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let text = resp.text().await.unwrap_or_default();
        return Err(LlmError::Api {
            status,
            message: format!("Embedding API error: {}", text),
        });
    }

    let data: EmbeddingResponse = resp.json().await?;
    if data.data.len() != texts.len() {
        return Err(LlmError::Parse(format!(
            "expected {} embeddings, got {}",
            texts.len(),
            data.data.len()
        )));
    }
    Ok(data.data.into_iter().map(|d| d.embedding).collect())
}

/// Cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Rank candidate vectors against a query, best first, keeping at most `top_k`.
///
/// Returns `(position in candidates, score)`. The sort is stable, so equal
/// scores keep the order the candidates were given in.
pub fn rank_by_similarity<'a, I>(query_embedding: &[f32], candidates: I, top_k: usize) -> Vec<(usize, f32)>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let mut scored: Vec<(usize, f32)> = candidates
        .into_iter()
        .enumerate()
        .map(|(i, emb)| (i, cosine_similarity(query_embedding, emb)))
        .collect();

    scored.sort_by(|a, b| nan_last(b.1).total_cmp(&nan_last(a.1)));
    scored.truncate(top_k);
    scored
}

fn nan_last(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else {
        score
    }
}

/// Serialize embedding to bytes for SQLite BLOB storage
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding
        .iter()
        .flat_map(|f| f.to_le_bytes())
        .collect()
}

/// Deserialize embedding from SQLite BLOB bytes
pub fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
