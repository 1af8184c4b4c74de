use std::path::Path;

use pulso_serve::{AppState, ServeConfig};

use crate::config::Settings;

pub fn execute(settings: &Settings, csv: &Path, bind: &str, port: u16) -> anyhow::Result<()> {
    settings.validate()?;
    if !csv.is_file() {
        anyhow::bail!("CSV not found: {}", csv.display());
    }
    let state = AppState {
        client: settings.model_client()?,
        csv_path: csv.to_path_buf(),
        cache: settings.open_cache(csv),
        options: settings.analyze_options()?,
    };
    let config = ServeConfig {
        bind: bind.to_string(),
        port,
    };
    tokio::runtime::Runtime::new()?.block_on(pulso_serve::serve(state, config))
}
