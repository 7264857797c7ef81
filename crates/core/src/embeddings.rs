use crate::error::EmbeddingError;
use crate::traits::Embedder;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

const DEFAULT: usize = 128;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = DEFAULT;

#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl CharacterNgramEmbedder {
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return vector;
        }

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

#[async_trait]
impl Embedder for CharacterNgramEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions.max(1)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.embed_sync(text))
    }
}

#[derive(Debug, Clone)]
pub struct EmbeddingEndpointConfig {
    pub endpoint: Url,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub dimensions: usize,
}

impl EmbeddingEndpointConfig {
    pub fn new(endpoint: &str) -> Result<Self, EmbeddingError> {
        Ok(Self {
            endpoint: Url::parse(endpoint.trim())?,
            api_key: None,
            model: None,
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Option<Vec<f32>>,
    #[serde(default)]
    data: Option<Vec<EmbeddingDatum>>,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

pub struct HttpEmbedder {
    config: EmbeddingEndpointConfig,
    client: Client,
}

impl HttpEmbedder {
    pub fn new(config: EmbeddingEndpointConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let payload = EmbeddingRequest {
            input: text,
            model: self.config.model.as_deref(),
        };

        let mut request = self
            .client
            .post(self.config.endpoint.clone())
            .header("content-type", "application/json")
            .json(&payload);

        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(EmbeddingError::BackendResponse {
                backend: self.config.endpoint.to_string(),
                details: response.status().to_string(),
            });
        }

        let payload: EmbeddingResponse = response.json().await?;
        payload_to_vector(payload, self.config.dimensions)
    }
}

fn payload_to_vector(
    payload: EmbeddingResponse,
    expected_dimensions: usize,
) -> Result<Vec<f32>, EmbeddingError> {
    let vector = payload
        .embedding
        .or_else(|| {
            payload
                .data
                .and_then(|data| data.into_iter().next().map(|datum| datum.embedding))
        })
        .filter(|vector| !vector.is_empty())
        .ok_or(EmbeddingError::EmptyVector)?;

    if vector.len() != expected_dimensions {
        return Err(EmbeddingError::DimensionMismatch {
            expected: expected_dimensions,
            actual: vector.len(),
        });
    }

    Ok(vector)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embedder_is_deterministic() -> Result<(), EmbeddingError> {
        let embedder = CharacterNgramEmbedder::default();
        let first = embedder.embed("Hydraulic pressure and flow").await?;
        let second = embedder.embed("Hydraulic pressure and flow").await?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn embedder_outputs_expected_length() {
        let embedder = CharacterNgramEmbedder { dimensions: 32 };
        let vector = embedder.embed_sync("abc");
        assert_eq!(vector.len(), 32);
    }

    #[test]
    fn bare_embedding_payload_is_accepted() -> Result<(), Box<dyn std::error::Error>> {
        let payload: EmbeddingResponse = serde_json::from_str(r#"{"embedding": [0.5, 0.25]}"#)?;
        assert_eq!(payload_to_vector(payload, 2)?, vec![0.5, 0.25]);
        Ok(())
    }

    #[test]
    fn openai_style_payload_is_accepted() -> Result<(), Box<dyn std::error::Error>> {
        let payload: EmbeddingResponse =
            serde_json::from_str(r#"{"data": [{"embedding": [1.0, 0.0, 0.0]}]}"#)?;
        assert_eq!(payload_to_vector(payload, 3)?, vec![1.0, 0.0, 0.0]);
        Ok(())
    }

    #[test]
    fn empty_or_mismatched_payloads_are_errors() -> Result<(), Box<dyn std::error::Error>> {
        let empty: EmbeddingResponse = serde_json::from_str(r#"{"data": []}"#)?;
        assert!(matches!(
            payload_to_vector(empty, 2),
            Err(EmbeddingError::EmptyVector)
        ));

        let short: EmbeddingResponse = serde_json::from_str(r#"{"embedding": [1.0]}"#)?;
        assert!(matches!(
            payload_to_vector(short, 2),
            Err(EmbeddingError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
        Ok(())
    }

    #[test]
    fn endpoint_must_be_a_url() {
        assert!(EmbeddingEndpointConfig::new("not a url").is_err());
        assert!(EmbeddingEndpointConfig::new("http://localhost:8080/embed").is_ok());
    }
}
