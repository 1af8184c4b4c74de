use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use pulso_core::Client;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("the CSV contains no data rows")]
    Empty,
}

// ── Column mapping ──

/// One row of the meetings export. Columns missing from the file default to
/// empty strings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Row {
    #[serde(rename = "Nombre")]
    name: String,
    #[serde(rename = "Correo Electronico")]
    email: String,
    #[serde(rename = "Numero de Telefono")]
    phone: String,
    #[serde(rename = "Fecha de la Reunion")]
    meeting_date: String,
    #[serde(rename = "Vendedor asignado")]
    seller: String,
    closed: String,
    #[serde(rename = "Transcripcion")]
    transcription: String,
}

impl Row {
    fn into_client(self, row_number: usize) -> Client {
        Client {
            id: format!("client-{row_number}"),
            name: self.name,
            email: self.email,
            phone: self.phone,
            meeting_date: self.meeting_date,
            seller: self.seller,
            closed: self.closed.trim() == "1",
            transcription: self.transcription,
            category: None,
        }
    }
}

// ── Entry points ──

/// Parse a header CSV into clients with ids `client-1`, `client-2`, ...
/// Blank lines are skipped.
pub fn parse_clients_csv<R: Read>(reader: R) -> Result<Vec<Client>, IngestError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let mut clients = Vec::new();
    for result in rdr.deserialize::<Row>() {
        let row = result?;
        clients.push(row.into_client(clients.len() + 1));
    }

    if clients.is_empty() {
        return Err(IngestError::Empty);
    }
    Ok(clients)
}

pub fn parse_clients_str(content: &str) -> Result<Vec<Client>, IngestError> {
    parse_clients_csv(content.as_bytes())
}

pub fn load_clients_csv(path: &Path) -> Result<Vec<Client>, IngestError> {
    let file = std::fs::File::open(path).map_err(|source| IngestError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let clients = parse_clients_csv(file)?;
    tracing::debug!(path = %path.display(), clients = clients.len(), "loaded clients CSV");
    Ok(clients)
}
