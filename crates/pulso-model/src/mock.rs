use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::client::{CompletionClient, CompletionRequest};
use crate::error::ModelError;

type Handler = dyn Fn(&CompletionRequest) -> Result<String, ModelError> + Send + Sync;
type DelayFn = dyn Fn(&CompletionRequest) -> Duration + Send + Sync;

/// Scripted completion client: answers every request with `handler`,
/// optionally after a per-request delay (uses `tokio::time`, so paused-clock
/// tests stay deterministic).
pub struct MockClient {
    handler: Box<Handler>,
    delay: Option<Box<DelayFn>>,
    calls: AtomicUsize,
}

impl MockClient {
    pub fn new(
        handler: impl Fn(&CompletionRequest) -> Result<String, ModelError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(
        mut self,
        delay: impl Fn(&CompletionRequest) -> Duration + Send + Sync + 'static,
    ) -> Self {
        self.delay = Some(Box::new(delay));
        self
    }

    /// Number of completed-or-started requests so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CompletionClient for MockClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = &self.delay {
            tokio::time::sleep(delay(request)).await;
        }
        (self.handler)(request)
    }
}

/// Ids listed in a batch prompt, in order. Lets mock handlers answer
/// whatever batch they receive.
pub fn prompt_ids(user_prompt: &str) -> Vec<String> {
    user_prompt
        .lines()
        .filter_map(|line| {
            let rest = line.strip_prefix("### Cliente ")?;
            let start = rest.find("(id: ")? + "(id: ".len();
            let end = rest.rfind(')')?;
            (start <= end).then(|| rest[start..end].to_string())
        })
        .collect()
}

/// A well-formed category object for `id`, as a model would return it.
pub fn category_json(id: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "sector": "tecnología",
        "discoveryChannel": "LinkedIn",
        "mainPainPoint": "volumen de consultas repetitivas",
        "interactionVolume": "Alto",
        "integrationNeeds": "HubSpot",
        "urgencyLevel": "Media",
        "summary": "startup que escala su soporte.",
        "sentiment": "Positivo",
        "triggerWords": ["escalar"],
        "nextSteps": "enviar propuesta"
    })
}

/// Handler that answers every batch with a valid array for its ids.
pub fn echo_categories(request: &CompletionRequest) -> Result<String, ModelError> {
    let items: Vec<_> = prompt_ids(&request.user)
        .iter()
        .map(|id| category_json(id))
        .collect();
    Ok(serde_json::Value::Array(items).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_ids_extracts_headers() {
        let prompt = "intro\n### Cliente 1 (id: client-1)\ntexto\n\n### Cliente 2 (id: client-22)\nmás";
        assert_eq!(prompt_ids(prompt), vec!["client-1", "client-22"]);
    }

    #[tokio::test]
    async fn echo_answers_with_one_item_per_id() {
        let client = MockClient::new(echo_categories);
        let req = CompletionRequest {
            system: String::new(),
            user: "### Cliente 1 (id: a)\nx\n### Cliente 2 (id: b)\ny".into(),
            model: "m".into(),
        };
        let text = client.complete(&req).await.unwrap();
        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v.as_array().unwrap().len(), 2);
        assert_eq!(v[1]["id"], "b");
    }
}
