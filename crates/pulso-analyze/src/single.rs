use pulso_core::{Category, Record};
use pulso_model::CompletionClient;

use crate::error::AnalysisError;
use crate::orchestrator::{analyze_all, AnalyzeOptions};

/// Analyze one transcript on demand (re-analysis of a single client).
pub async fn analyze_one(
    client: &dyn CompletionClient,
    client_id: &str,
    transcript: &str,
    model: &str,
) -> Result<Category, AnalysisError> {
    let records = [Record::new(client_id, transcript)];
    let opts = AnalyzeOptions {
        model: model.to_string(),
        ..Default::default()
    };
    let mut map = analyze_all(client, &records, &opts).await?;
    map.remove(client_id)
        .ok_or_else(|| AnalysisError::MissingCategory {
            id: client_id.to_string(),
        })
}
