use std::time::Instant;

use pulso_core::Batch;

use crate::error::ModelError;
use crate::prompt::{build_user_prompt, SYSTEM_PROMPT};

/// A single chat-completion request. Sampling settings belong to the client.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub model: String,
}

/// Sends one prompt to a model and returns its raw text. Implemented by
/// `ChatCompletionsClient` (HTTP) and `MockClient` (tests).
#[async_trait::async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ModelError>;
}

/// Build the prompt for `batch` and send it as one completion request.
/// Never retries; the caller decides what a failure means for the run.
pub async fn invoke(
    client: &dyn CompletionClient,
    batch: &Batch<'_>,
    model: &str,
) -> Result<String, ModelError> {
    let request = CompletionRequest {
        system: SYSTEM_PROMPT.to_string(),
        user: build_user_prompt(batch),
        model: model.to_string(),
    };

    let started = Instant::now();
    let result = client.complete(&request).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match &result {
        Ok(text) => tracing::debug!(
            batch = batch.index,
            records = batch.len(),
            model,
            elapsed_ms,
            response_chars = text.len(),
            "batch completion received"
        ),
        Err(e) => tracing::warn!(
            batch = batch.index,
            records = batch.len(),
            model,
            elapsed_ms,
            error = %e,
            "batch completion failed"
        ),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockClient;
    use pulso_core::Record;

    #[tokio::test]
    async fn invoke_sends_prompt_for_batch() {
        let client = MockClient::new(|req| {
            assert_eq!(req.system, SYSTEM_PROMPT);
            assert_eq!(req.model, "m-1");
            assert!(req.user.contains("(id: client-7)"));
            Ok("[]".to_string())
        });
        let records = vec![Record::new("client-7", "hola")];
        let batch = Batch {
            index: 3,
            records: &records,
        };
        let text = invoke(&client, &batch, "m-1").await.unwrap();
        assert_eq!(text, "[]");
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn invoke_propagates_errors() {
        let client = MockClient::new(|_| Err(ModelError::EmptyCompletion));
        let records = vec![Record::new("client-1", "x")];
        let batch = Batch {
            index: 0,
            records: &records,
        };
        let err = invoke(&client, &batch, "m").await.unwrap_err();
        assert!(matches!(err, ModelError::EmptyCompletion));
    }
}
