use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use pulso_core::Client;

use crate::kv::KeyValueStore;

/// Analyzed clients, overlaid onto the base list by id.
pub const CLIENTS_KEY: &str = "analyzed_clients";
/// A user-imported client list that replaces the default CSV.
pub const CUSTOM_CSV_KEY: &str = "custom_csv";

#[derive(Debug, Serialize, Deserialize)]
struct Entry {
    saved_at: String,
    clients: Vec<Client>,
}

/// Client-list cache on top of any [`KeyValueStore`].
pub struct ClientsCache<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> ClientsCache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn write(&self, key: &str, clients: &[Client]) -> anyhow::Result<()> {
        let entry = Entry {
            saved_at: OffsetDateTime::now_utc().format(&Rfc3339)?,
            clients: clients.to_vec(),
        };
        self.store.save(key, &serde_json::to_string(&entry)?)
    }

    fn read(&self, key: &str) -> anyhow::Result<Option<Vec<Client>>> {
        let Some(raw) = self.store.load(key)? else {
            return Ok(None);
        };
        let entry: Entry = serde_json::from_str(&raw)?;
        Ok(Some(entry.clients))
    }

    /// Timestamp of the last analysis save, if any.
    pub fn clients_saved_at(&self) -> anyhow::Result<Option<OffsetDateTime>> {
        let Some(raw) = self.store.load(CLIENTS_KEY)? else {
            return Ok(None);
        };
        let entry: Entry = serde_json::from_str(&raw)?;
        Ok(Some(OffsetDateTime::parse(&entry.saved_at, &Rfc3339)?))
    }

    pub fn save_clients(&self, clients: &[Client]) -> anyhow::Result<()> {
        self.write(CLIENTS_KEY, clients)?;
        tracing::info!(clients = clients.len(), "analysis cache saved");
        Ok(())
    }

    /// Clients for display. Base is the imported CSV when present, else
    /// `fresh`; cached categories are re-applied by id. Any read or decode
    /// failure yields `fresh` unchanged.
    pub fn load_clients(&self, fresh: Vec<Client>) -> Vec<Client> {
        match self.try_load_clients(&fresh) {
            Ok(clients) => clients,
            Err(e) => {
                tracing::warn!(error = %e, "analysis cache unreadable, using fresh clients");
                fresh
            }
        }
    }

    fn try_load_clients(&self, fresh: &[Client]) -> anyhow::Result<Vec<Client>> {
        let base = match self.read(CUSTOM_CSV_KEY)? {
            Some(custom) => custom,
            None => fresh.to_vec(),
        };
        let Some(cached) = self.read(CLIENTS_KEY)? else {
            return Ok(base);
        };

        let mut categories: HashMap<String, _> = cached
            .into_iter()
            .filter_map(|c| c.category.map(|cat| (c.id, cat)))
            .collect();
        Ok(base
            .into_iter()
            .map(|mut c| {
                if let Some(cat) = categories.remove(&c.id) {
                    c.category = Some(cat);
                }
                c
            })
            .collect())
    }

    pub fn clear_clients(&self) -> anyhow::Result<()> {
        self.store.clear(CLIENTS_KEY)
    }

    pub fn save_custom_csv(&self, clients: &[Client]) -> anyhow::Result<()> {
        self.write(CUSTOM_CSV_KEY, clients)
    }

    pub fn load_custom_csv(&self) -> anyhow::Result<Option<Vec<Client>>> {
        self.read(CUSTOM_CSV_KEY)
    }

    pub fn clear_custom_csv(&self) -> anyhow::Result<()> {
        self.store.clear(CUSTOM_CSV_KEY)
    }
}
