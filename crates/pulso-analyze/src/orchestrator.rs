use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use futures_util::future::{join_all, try_join_all};
use tracing::Instrument;

use pulso_core::{batch, parse_batch, Batch, CategoryMap, ParsedItem, Record};
use pulso_model::{invoke, CompletionClient, ModelError, DEFAULT_BATCH_SIZE, DEFAULT_MODEL};

use crate::error::AnalysisError;

// ── Options ──

#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    pub batch_size: NonZeroUsize,
    pub model: String,
    /// Upper bound for each model call, on top of any transport timeout.
    pub call_timeout: Option<Duration>,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            batch_size: NonZeroUsize::new(DEFAULT_BATCH_SIZE).unwrap_or(NonZeroUsize::MIN),
            model: DEFAULT_MODEL.to_string(),
            call_timeout: None,
        }
    }
}

/// Run id format: `run_<ulid>`
pub fn new_run_id() -> String {
    format!("run_{}", ulid::Ulid::new())
}

// ── Atomic run ──

/// Analyze every record, one concurrent model call per batch.
///
/// The first failing batch fails the whole run; the other in-flight calls are
/// dropped. On success the map holds exactly one entry per input id.
pub async fn analyze_all(
    client: &dyn CompletionClient,
    records: &[Record],
    opts: &AnalyzeOptions,
) -> Result<CategoryMap, AnalysisError> {
    let run_id = new_run_id();
    let span = tracing::info_span!("analysis", run_id = %run_id, model = %opts.model);

    async move {
        let batches = batch(records, opts.batch_size);
        tracing::info!(
            records = records.len(),
            batches = batches.len(),
            batch_size = opts.batch_size.get(),
            "analysis started"
        );
        let started = Instant::now();

        let results = try_join_all(batches.iter().map(|b| analyze_batch(client, b, opts))).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match results {
            Ok(per_batch) => {
                let map = merge(per_batch);
                tracing::info!(analyzed = map.len(), elapsed_ms, "analysis finished");
                Ok(map)
            }
            Err(e) => {
                tracing::warn!(error = %e, elapsed_ms, "analysis failed");
                Err(e)
            }
        }
    }
    .instrument(span)
    .await
}

// ── Partial run ──

/// A batch that failed during a partial run.
#[derive(Debug)]
pub struct BatchFailure {
    pub index: usize,
    pub ids: Vec<String>,
    pub error: AnalysisError,
}

/// Result of [`analyze_all_partial`]: categories from successful batches plus
/// one entry per failed batch.
#[derive(Debug, Default)]
pub struct PartialAnalysis {
    pub categories: CategoryMap,
    pub failures: Vec<BatchFailure>,
}

impl PartialAnalysis {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Like [`analyze_all`], but waits for every batch and keeps what succeeded.
pub async fn analyze_all_partial(
    client: &dyn CompletionClient,
    records: &[Record],
    opts: &AnalyzeOptions,
) -> PartialAnalysis {
    let run_id = new_run_id();
    let span = tracing::info_span!("analysis", run_id = %run_id, model = %opts.model);

    async move {
        let batches = batch(records, opts.batch_size);
        tracing::info!(
            records = records.len(),
            batches = batches.len(),
            "partial analysis started"
        );

        let results = join_all(batches.iter().map(|b| analyze_batch(client, b, opts))).await;

        let mut out = PartialAnalysis::default();
        for (b, result) in batches.iter().zip(results) {
            match result {
                Ok(items) => {
                    for item in items {
                        out.categories.insert(item.id, item.category);
                    }
                }
                Err(error) => out.failures.push(BatchFailure {
                    index: b.index,
                    ids: b.ids().into_iter().map(str::to_string).collect(),
                    error,
                }),
            }
        }
        tracing::info!(
            analyzed = out.categories.len(),
            failed_batches = out.failures.len(),
            "partial analysis finished"
        );
        out
    }
    .instrument(span)
    .await
}

// ── Per batch ──

async fn analyze_batch(
    client: &dyn CompletionClient,
    batch: &Batch<'_>,
    opts: &AnalyzeOptions,
) -> Result<Vec<ParsedItem>, AnalysisError> {
    let call = invoke(client, batch, &opts.model);
    let raw = match opts.call_timeout {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(ModelError::Timeout(limit)),
        },
        None => call.await,
    }
    .map_err(|source| AnalysisError::ModelInvocation {
        batch: batch.index,
        ids: batch.ids().into_iter().map(str::to_string).collect(),
        source,
    })?;

    parse_batch(&raw, &batch.ids()).map_err(|source| {
        tracing::warn!(batch = batch.index, error = %source, "batch response rejected");
        AnalysisError::Parse {
            batch: batch.index,
            source,
        }
    })
}

fn merge(per_batch: Vec<Vec<ParsedItem>>) -> CategoryMap {
    let mut map = CategoryMap::with_capacity(per_batch.iter().map(Vec::len).sum());
    for item in per_batch.into_iter().flatten() {
        map.insert(item.id, item.category);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulso_core::ParseError;
    use pulso_model::mock::{category_json, echo_categories, prompt_ids};
    use pulso_model::MockClient;
    use std::collections::HashSet;

    fn records(n: usize) -> Vec<Record> {
        (1..=n)
            .map(|i| Record::new(format!("client-{i}"), format!("transcripción {i}")))
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
    async fn happy_path_merges_every_id() {
        let client = MockClient::new(echo_categories);
        let input = records(3);
        let map = analyze_all(&client, &input, &opts(2)).await.unwrap();

        assert_eq!(client.calls(), 2);
        let keys: HashSet<_> = map.keys().cloned().collect();
        let ids: HashSet<_> = input.iter().map(|r| r.id.clone()).collect();
        assert_eq!(keys, ids);
        assert_eq!(map["client-1"].sector, "Tecnología");
    }

    #[tokio::test]
    async fn empty_input_makes_no_calls() {
        let client = MockClient::new(echo_categories);
        let map = analyze_all(&client, &[], &opts(8)).await.unwrap();
        assert!(map.is_empty());
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn malformed_batch_fails_the_run() {
        let client = MockClient::new(|req| {
            if prompt_ids(&req.user).contains(&"client-3".to_string()) {
                Ok("Lo siento, no puedo ayudar".into())
            } else {
                echo_categories(req)
            }
        });
        let err = analyze_all(&client, &records(3), &opts(2)).await.unwrap_err();
        match err {
            AnalysisError::Parse { batch, source } => {
                assert_eq!(batch, 1);
                assert!(matches!(source, ParseError::Malformed { .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn model_error_carries_batch_ids() {
        let client = MockClient::new(|_| Err(ModelError::EmptyCompletion));
        let err = analyze_all(&client, &records(2), &opts(5)).await.unwrap_err();
        match err {
            AnalysisError::ModelInvocation { batch, ids, .. } => {
                assert_eq!(batch, 0);
                assert_eq!(ids, vec!["client-1", "client-2"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn short_response_is_count_mismatch() {
        let client = MockClient::new(|req| {
            let first = prompt_ids(&req.user).remove(0);
            Ok(serde_json::json!([category_json(&first)]).to_string())
        });
        let err = analyze_all(&client, &records(2), &opts(2)).await.unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Parse {
                source: ParseError::CountMismatch {
                    expected: 2,
                    actual: 1
                },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn enum_drift_is_rejected() {
        let client = MockClient::new(|req| {
            let items: Vec<_> = prompt_ids(&req.user)
                .iter()
                .map(|id| {
                    let mut v = category_json(id);
                    v["urgencyLevel"] = "alta".into();
                    v
                })
                .collect();
            Ok(serde_json::Value::Array(items).to_string())
        });
        let err = analyze_all(&client, &records(1), &opts(1)).await.unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Parse {
                source: ParseError::InvalidEnumValue { field: "urgencyLevel", .. },
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn latency_is_bounded_by_slowest_batch() {
        // batch i sleeps (i + 1) seconds: sum = 10s, max = 4s
        let client = MockClient::new(echo_categories).with_delay(|req| {
            let first = prompt_ids(&req.user).remove(0);
            let n: u64 = first.trim_start_matches("client-").parse().unwrap();
            Duration::from_secs(n.div_ceil(2))
        });
        let started = tokio::time::Instant::now();
        let map = analyze_all(&client, &records(8), &opts(2)).await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(map.len(), 8);
        assert!(elapsed >= Duration::from_secs(4));
        assert!(elapsed < Duration::from_secs(5), "took {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn call_timeout_fails_slow_batch() {
        let client =
            MockClient::new(echo_categories).with_delay(|_| Duration::from_secs(30));
        let mut o = opts(4);
        o.call_timeout = Some(Duration::from_secs(5));
        let err = analyze_all(&client, &records(2), &o).await.unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::ModelInvocation {
                source: ModelError::Timeout(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn partial_run_keeps_successful_batches() {
        let client = MockClient::new(|req| {
            if prompt_ids(&req.user).contains(&"client-2".to_string()) {
                Ok("{}".into())
            } else {
                echo_categories(req)
            }
        });
        let result = analyze_all_partial(&client, &records(5), &opts(2)).await;

        assert!(!result.is_complete());
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].index, 0);
        assert_eq!(result.failures[0].ids, vec!["client-1", "client-2"]);
        let mut keys: Vec<_> = result.categories.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["client-3", "client-4", "client-5"]);
    }

    #[test]
    fn run_ids_are_prefixed_and_unique() {
        let a = new_run_id();
        let b = new_run_id();
        assert!(a.starts_with("run_"));
        assert_ne!(a, b);
    }
}
