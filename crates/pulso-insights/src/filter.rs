use serde::Deserialize;

use pulso_core::{Client, Sentiment, Urgency, Volume};

/// Client list filters. Unset fields match everything; enum and sector
/// filters only match analyzed clients.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientFilter {
    /// Case-insensitive substring of name, email or seller.
    pub search: Option<String>,
    pub seller: Option<String>,
    pub closed: Option<bool>,
    pub sector: Option<String>,
    pub urgency: Option<Urgency>,
    pub volume: Option<Volume>,
    pub sentiment: Option<Sentiment>,
}

impl ClientFilter {
    pub fn matches(&self, client: &Client) -> bool {
        if let Some(q) = self.search.as_deref().filter(|q| !q.is_empty()) {
            let q = q.to_lowercase();
            let hit = [&client.name, &client.email, &client.seller]
                .iter()
                .any(|field| field.to_lowercase().contains(&q));
            if !hit {
                return false;
            }
        }
        if self.seller.as_ref().is_some_and(|s| *s != client.seller) {
            return false;
        }
        if self.closed.is_some_and(|c| c != client.closed) {
            return false;
        }

        let cat = client.category.as_ref();
        if let Some(sector) = &self.sector {
            if cat.is_none_or(|c| c.sector != *sector) {
                return false;
            }
        }
        if let Some(u) = self.urgency {
            if cat.is_none_or(|c| c.urgency_level != u) {
                return false;
            }
        }
        if let Some(v) = self.volume {
            if cat.is_none_or(|c| c.interaction_volume != v) {
                return false;
            }
        }
        if let Some(s) = self.sentiment {
            if cat.is_none_or(|c| c.sentiment != s) {
                return false;
            }
        }
        true
    }
}

pub fn filter_clients<'a>(clients: &'a [Client], filter: &ClientFilter) -> Vec<&'a Client> {
    clients.iter().filter(|c| filter.matches(c)).collect()
}
