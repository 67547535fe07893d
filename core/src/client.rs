use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use tracing::{debug, instrument};

use crate::answer::AnswerShape;
use crate::config::AskConfig;
use crate::errors::{AskError, AskResult};

/// Body of `POST /api/ask`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AskRequest {
    pub query: String,
}

/// The external collaborator that turns a query into an answer
#[async_trait]
pub trait AnswerService<A: AnswerShape>: Send + Sync {
    async fn ask(&self, query: &str) -> AskResult<A>;
}

/// Client for the Answer Service HTTP endpoint
#[derive(Debug, Clone)]
pub struct HttpAnswerClient<A> {
    client: Client,
    url: String,
    _shape: PhantomData<fn() -> A>,
}

impl<A: AnswerShape> HttpAnswerClient<A> {
    /// Create a new client from configuration
    pub fn new(config: &AskConfig) -> AskResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| AskError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: config.endpoint_url(),
            _shape: PhantomData,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl<A: AnswerShape> AnswerService<A> for HttpAnswerClient<A> {
    #[instrument(skip(self), fields(url = %self.url, kind = %A::KIND))]
    async fn ask(&self, query: &str) -> AskResult<A> {
        let request = AskRequest {
            query: query.to_string(),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AskError::Transport(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            // The body of a failed response is only kept for diagnostics
            let error_body = response.text().await.unwrap_or_default();
            return Err(AskError::Status {
                status_code: status.as_u16(),
                message: format!("Request failed: {}", error_body),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AskError::Transport(format!("Failed to read response body: {}", e)))?;
        debug!("Received {} byte answer body", body.len());

        let answer: A = serde_json::from_slice(&body).map_err(|e| {
            AskError::MalformedPayload(format!("Failed to parse {} answer: {}", A::KIND, e))
        })?;
        answer.validate().map_err(AskError::MalformedPayload)?;

        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::GenericAnswer;

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_string(&AskRequest {
            query: "What is the capital of France?".to_string(),
        })
        .unwrap();
        assert_eq!(body, r#"{"query":"What is the capital of France?"}"#);
    }

    #[test]
    fn test_client_url_from_config() {
        let config = AskConfig {
            base_url: Some("http://example.test/".to_string()),
            ..AskConfig::default()
        };
        let client = HttpAnswerClient::<GenericAnswer>::new(&config).unwrap();
        assert_eq!(client.url(), "http://example.test/api/ask");
    }
}
