use std::sync::Arc;

use futures_util::Stream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pulso_core::{CategoryMap, Client, Record};
use pulso_model::CompletionClient;

use crate::error::AnalysisError;
use crate::orchestrator::{analyze_all, AnalyzeOptions};

// ── Events ──

/// One frame of the analysis stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProgressEvent {
    /// A client now has its enriched form. `done` runs from 1 to `total`.
    Progress {
        done: usize,
        total: usize,
        client: Client,
    },
    /// Terminal: the whole enriched list.
    Done {
        clients: Vec<Client>,
        total: usize,
        analyzed: usize,
    },
    /// Terminal: the run failed; no `done` follows.
    Error { message: String },
}

impl ProgressEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProgressEvent::Progress { .. })
    }

    /// Render as one newline-terminated JSON line.
    pub fn to_ndjson(&self) -> String {
        let mut line = serde_json::to_string(self).unwrap_or_else(|e| {
            serde_json::json!({ "type": "error", "message": e.to_string() }).to_string()
        });
        line.push('\n');
        line
    }
}

#[derive(Error, Debug)]
pub enum StreamError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("invalid stream transition: {from:?} → {to:?}")]
    InvalidTransition { from: StreamState, to: StreamState },
}

// ── State machine ──

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StreamState {
    Idle,
    Running,
    Done,
    Failed,
}

const VALID_TRANSITIONS: &[(StreamState, &[StreamState])] = &[
    (StreamState::Idle, &[StreamState::Running]),
    (
        StreamState::Running,
        &[StreamState::Done, StreamState::Failed],
    ),
    // Done and Failed are terminal
];

fn is_valid_transition(from: StreamState, to: StreamState) -> bool {
    VALID_TRANSITIONS
        .iter()
        .any(|(f, targets)| *f == from && targets.contains(&to))
}

/// Turns one analysis run over a client list into progress events.
pub struct ProgressStreamer {
    state: StreamState,
    clients: Vec<Client>,
}

impl ProgressStreamer {
    pub fn new(clients: Vec<Client>) -> Self {
        Self {
            state: StreamState::Idle,
            clients,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    fn transition(&mut self, to: StreamState) -> Result<(), StreamError> {
        if !is_valid_transition(self.state, to) {
            return Err(StreamError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    /// Idle → Running. Returns the records to analyze, in client order.
    pub fn start(&mut self) -> Result<Vec<Record>, StreamError> {
        self.transition(StreamState::Running)?;
        Ok(self.clients.iter().map(Client::to_record).collect())
    }

    /// Running → Done. Joins `categories` onto the clients in their original
    /// order and returns one progress event per client followed by `done`.
    pub fn complete(&mut self, categories: CategoryMap) -> Result<Vec<ProgressEvent>, StreamError> {
        self.transition(StreamState::Done)?;
        let mut categories = categories;
        let enriched: Vec<Client> = std::mem::take(&mut self.clients)
            .into_iter()
            .map(|mut c| {
                if let Some(cat) = categories.remove(&c.id) {
                    c.category = Some(cat);
                }
                c
            })
            .collect();

        let total = enriched.len();
        let analyzed = enriched.iter().filter(|c| c.is_analyzed()).count();
        let mut events: Vec<ProgressEvent> = enriched
            .iter()
            .enumerate()
            .map(|(i, client)| ProgressEvent::Progress {
                done: i + 1,
                total,
                client: client.clone(),
            })
            .collect();
        events.push(ProgressEvent::Done {
            clients: enriched,
            total,
            analyzed,
        });
        Ok(events)
    }

    /// Running → Failed, producing the single terminal error event.
    pub fn fail(&mut self, error: &StreamError) -> Result<ProgressEvent, StreamError> {
        self.transition(StreamState::Failed)?;
        Ok(ProgressEvent::Error {
            message: error.to_string(),
        })
    }
}

// ── Stream ──

/// Analyze `clients` and stream the outcome. Progress frames are emitted in
/// client order once every batch has resolved; exactly one terminal frame
/// closes the stream. Dropping the stream cancels in-flight model calls.
pub fn analysis_stream(
    client: Arc<dyn CompletionClient>,
    clients: Vec<Client>,
    opts: AnalyzeOptions,
) -> impl Stream<Item = ProgressEvent> + Send {
    async_stream::stream! {
        let mut streamer = ProgressStreamer::new(clients);
        let events = match streamer.start() {
            Ok(records) => match analyze_all(client.as_ref(), &records, &opts).await {
                Ok(categories) => streamer.complete(categories),
                Err(e) => streamer.fail(&StreamError::from(e)).map(|ev| vec![ev]),
            },
            Err(e) => Err(e),
        };

        match events {
            Ok(events) => {
                for event in events {
                    yield event;
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "analysis stream aborted");
                yield ProgressEvent::Error { message: e.to_string() };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use pulso_model::mock::{echo_categories, prompt_ids};
    use pulso_model::MockClient;
    use std::num::NonZeroUsize;

    fn clients(n: usize) -> Vec<Client> {
        (1..=n)
            .map(|i| Client {
                id: format!("client-{i}"),
                name: format!("Cliente {i}"),
                seller: "Ana".into(),
                transcription: format!("transcripción {i}"),
                ..Default::default()
            })
            .collect()
    }

    fn opts(size: usize) -> AnalyzeOptions {
        AnalyzeOptions {
            batch_size: NonZeroUsize::new(size).unwrap(),
            model: "test-model".into(),
            call_timeout: None,
        }
    }

    #[tokio::test]
    async fn happy_path_emits_ordered_progress_then_done() {
        let client: Arc<dyn CompletionClient> = Arc::new(MockClient::new(echo_categories));
        let events: Vec<_> = analysis_stream(client, clients(3), opts(2)).collect().await;

        assert_eq!(events.len(), 4);
        for (i, ev) in events[..3].iter().enumerate() {
            match ev {
                ProgressEvent::Progress { done, total, client } => {
                    assert_eq!(*done, i + 1);
                    assert_eq!(*total, 3);
                    assert_eq!(client.id, format!("client-{}", i + 1));
                    assert!(client.category.is_some());
                }
                other => panic!("unexpected {other:?}"),
            }
        }
        match &events[3] {
            ProgressEvent::Done {
                clients,
                total,
                analyzed,
            } => {
                assert_eq!(*total, 3);
                assert_eq!(*analyzed, 3);
                assert_eq!(clients[2].name, "Cliente 3");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_output_emits_single_error() {
        let client: Arc<dyn CompletionClient> = Arc::new(MockClient::new(|req| {
            if prompt_ids(&req.user).contains(&"client-3".to_string()) {
                Ok("Lo siento, no puedo ayudar".into())
            } else {
                echo_categories(req)
            }
        }));
        let events: Vec<_> = analysis_stream(client, clients(3), opts(2)).collect().await;

        assert_eq!(events.len(), 1);
        match &events[0] {
            ProgressEvent::Error { message } => assert!(message.contains("malformed")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_client_list_completes_immediately() {
        let client: Arc<dyn CompletionClient> = Arc::new(MockClient::new(echo_categories));
        let events: Vec<_> = analysis_stream(client, vec![], opts(8)).collect().await;
        assert_eq!(
            events,
            vec![ProgressEvent::Done {
                clients: vec![],
                total: 0,
                analyzed: 0
            }]
        );
    }

    #[test]
    fn state_machine_rejects_invalid_transitions() {
        let mut s = ProgressStreamer::new(clients(1));
        assert_eq!(s.state(), StreamState::Idle);
        assert!(s.complete(CategoryMap::new()).is_err());

        s.start().unwrap();
        assert_eq!(s.state(), StreamState::Running);
        assert!(s.start().is_err());

        let err = StreamError::InvalidTransition {
            from: StreamState::Idle,
            to: StreamState::Done,
        };
        let ev = s.fail(&err).unwrap();
        assert!(ev.is_terminal());
        assert_eq!(s.state(), StreamState::Failed);
        assert!(s.complete(CategoryMap::new()).is_err());
        assert!(s.fail(&err).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_stream_cancels_in_flight_calls() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::time::Duration;

        let answered = Arc::new(AtomicBool::new(false));
        let flag = answered.clone();
        let mock = Arc::new(
            MockClient::new(move |req| {
                flag.store(true, Ordering::SeqCst);
                echo_categories(req)
            })
            .with_delay(|_| Duration::from_secs(60)),
        );
        let client: Arc<dyn CompletionClient> = mock.clone();

        let mut stream = Box::pin(analysis_stream(client, clients(3), opts(2)));
        let first = tokio::time::timeout(Duration::from_secs(1), stream.next()).await;
        assert!(first.is_err(), "no event before the model answers");
        assert!(mock.calls() >= 1);

        drop(stream);
        tokio::time::advance(Duration::from_secs(120)).await;
        tokio::task::yield_now().await;
        assert!(!answered.load(Ordering::SeqCst));
    }

    #[test]
    fn unmatched_clients_stay_unanalyzed() {
        let mut s = ProgressStreamer::new(clients(2));
        s.start().unwrap();
        let events = s.complete(CategoryMap::new()).unwrap();
        assert!(matches!(
            events.last(),
            Some(ProgressEvent::Done { analyzed: 0, total: 2, .. })
        ));
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let ev = ProgressEvent::Error {
            message: "boom".into(),
        };
        assert_eq!(ev.to_ndjson(), "{\"type\":\"error\",\"message\":\"boom\"}\n");

        let ev = ProgressEvent::Done {
            clients: vec![],
            total: 0,
            analyzed: 0,
        };
        let v: serde_json::Value = serde_json::from_str(ev.to_ndjson().trim()).unwrap();
        assert_eq!(v["type"], "done");
        assert_eq!(v["analyzed"], 0);
    }
}
