use serde::Serialize;

use pulso_core::{Client, Urgency};

use crate::metrics::seller_groups;
use crate::{percent, NONE_LABEL};

/// Seller drill-down: performance plus the seller's own clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerDetail {
    pub seller: String,
    pub total: usize,
    pub closed: usize,
    pub conversion_rate: u32,
    pub clients: Vec<Client>,
    /// Most common sector among analyzed clients, `"—"` without data.
    pub top_sector: String,
    /// Average urgency label, `"—"` without data.
    pub avg_urgency: String,
    pub analyzed_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellersSummary {
    pub total_sellers: usize,
    pub total_meetings: usize,
    pub best_seller: String,
    pub best_conversion_rate: u32,
}

/// Most frequent key; ties keep the first one seen.
fn top_key<'a>(keys: impl Iterator<Item = &'a str>) -> String {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for k in keys.filter(|k| !k.is_empty()) {
        match counts.iter_mut().find(|(key, _)| *key == k) {
            Some((_, n)) => *n += 1,
            None => counts.push((k, 1)),
        }
    }
    let mut best: Option<(&str, usize)> = None;
    for (k, n) in counts {
        if best.is_none_or(|(_, b)| n > b) {
            best = Some((k, n));
        }
    }
    best.map(|(k, _)| k.to_string())
        .unwrap_or_else(|| NONE_LABEL.to_string())
}

fn average_urgency(clients: &[&Client]) -> String {
    let scores: Vec<u32> = clients
        .iter()
        .filter_map(|c| c.category.as_ref())
        .map(|cat| cat.urgency_level.score())
        .collect();
    if scores.is_empty() {
        return NONE_LABEL.to_string();
    }
    let avg = scores.iter().sum::<u32>() as f64 / scores.len() as f64;
    Urgency::from_average(avg).as_str().to_string()
}

/// Per-seller stats, most clients first.
pub fn build_seller_details(clients: &[Client]) -> Vec<SellerDetail> {
    let mut details: Vec<SellerDetail> = seller_groups(clients)
        .into_iter()
        .map(|(seller, list)| {
            let total = list.len();
            let closed = list.iter().filter(|c| c.closed).count();
            let top_sector = top_key(
                list.iter()
                    .filter_map(|c| c.category.as_ref())
                    .map(|cat| cat.sector.as_str()),
            );
            SellerDetail {
                seller,
                total,
                closed,
                conversion_rate: percent(closed, total),
                top_sector,
                avg_urgency: average_urgency(&list),
                analyzed_count: list.iter().filter(|c| c.is_analyzed()).count(),
                clients: list.into_iter().cloned().collect(),
            }
        })
        .collect();
    details.sort_by(|a, b| b.total.cmp(&a.total));
    details
}

pub fn build_sellers_summary(details: &[SellerDetail]) -> SellersSummary {
    let mut best: Option<&SellerDetail> = None;
    for d in details {
        if best.is_none_or(|b| d.conversion_rate > b.conversion_rate) {
            best = Some(d);
        }
    }
    SellersSummary {
        total_sellers: details.len(),
        total_meetings: details.iter().map(|d| d.total).sum(),
        best_seller: best
            .map(|b| b.seller.clone())
            .unwrap_or_else(|| NONE_LABEL.to_string()),
        best_conversion_rate: best.map(|b| b.conversion_rate).unwrap_or(0),
    }
}
