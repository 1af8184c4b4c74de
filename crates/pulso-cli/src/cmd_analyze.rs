use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use futures_util::StreamExt;

use pulso_analyze::{analysis_stream, analyze_all_partial, analyze_one, AnalyzeOptions, ProgressEvent};
use pulso_core::{Client, Record};
use pulso_model::CompletionClient;
use pulso_store::{ClientsCache, KeyValueStore};

use crate::config::Settings;

/// `pulso analyze --csv <file> [--partial]`
pub fn execute(settings: &Settings, csv: &Path, partial: bool) -> anyhow::Result<()> {
    settings.validate()?;
    let cache = settings.open_cache(csv);
    let clients = base_clients(&cache, csv)?;
    let client = settings.model_client()?;
    let opts = settings.analyze_options()?;

    let rt = tokio::runtime::Runtime::new()?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if partial {
        rt.block_on(run_partial(client.as_ref(), clients, &opts, &cache, &mut out))
    } else {
        rt.block_on(run_stream(client, clients, opts, &cache, &mut out))
    }
}

/// Dataset for `csv`: the imported CSV when one exists, else the file itself.
/// Cached categories are keyed by row id, so analysis must run on this base.
pub(crate) fn base_clients<S: KeyValueStore>(
    cache: &ClientsCache<S>,
    csv: &Path,
) -> anyhow::Result<Vec<Client>> {
    match cache.load_custom_csv() {
        Ok(Some(custom)) => return Ok(custom),
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "imported CSV unreadable, using {}", csv.display()),
    }
    Ok(pulso_ingest::load_clients_csv(csv)?)
}

/// Write every progress event as one NDJSON line. Fails after writing the
/// error event if the run fails.
pub(crate) async fn run_stream<S: KeyValueStore>(
    client: Arc<dyn CompletionClient>,
    clients: Vec<Client>,
    opts: AnalyzeOptions,
    cache: &ClientsCache<S>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let events = analysis_stream(client, clients, opts);
    let mut events = std::pin::pin!(events);
    let mut failure = None;

    while let Some(event) = events.next().await {
        out.write_all(event.to_ndjson().as_bytes())?;
        match &event {
            ProgressEvent::Done { clients, .. } => cache.save_clients(clients)?,
            ProgressEvent::Error { message } => failure = Some(message.clone()),
            ProgressEvent::Progress { .. } => {}
        }
    }
    out.flush()?;

    match failure {
        Some(message) => anyhow::bail!("analysis failed: {message}"),
        None => Ok(()),
    }
}

/// Keep what succeeded and report the failed batches as one JSON document.
pub(crate) async fn run_partial<S: KeyValueStore>(
    client: &dyn CompletionClient,
    clients: Vec<Client>,
    opts: &AnalyzeOptions,
    cache: &ClientsCache<S>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let records: Vec<Record> = clients.iter().map(Client::to_record).collect();
    let mut result = analyze_all_partial(client, &records, opts).await;

    let enriched: Vec<Client> = clients
        .into_iter()
        .map(|mut c| {
            c.category = result.categories.remove(&c.id);
            c
        })
        .collect();
    let analyzed = enriched.iter().filter(|c| c.is_analyzed()).count();
    if analyzed > 0 {
        cache.save_clients(&enriched)?;
    }

    let failures: Vec<_> = result
        .failures
        .iter()
        .map(|f| {
            serde_json::json!({
                "batch": f.index,
                "ids": f.ids,
                "error": f.error.to_string(),
            })
        })
        .collect();
    let report = serde_json::json!({
        "complete": result.is_complete(),
        "total": enriched.len(),
        "analyzed": analyzed,
        "clients": enriched,
        "failures": failures,
    });
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;
    Ok(())
}

/// `pulso analyze-one --id <id> --transcript <text>`
pub fn execute_one(settings: &Settings, id: &str, transcript: &str) -> anyhow::Result<()> {
    if id.trim().is_empty() || transcript.trim().is_empty() {
        anyhow::bail!("--id and --transcript must not be empty");
    }
    let client = settings.model_client()?;
    let rt = tokio::runtime::Runtime::new()?;
    let category = rt.block_on(analyze_one(client.as_ref(), id, transcript, &settings.model))?;
    println!("{}", serde_json::to_string_pretty(&category)?);
    Ok(())
}
