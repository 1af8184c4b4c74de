use std::collections::BTreeMap;

use serde::Serialize;

use pulso_core::Client;

use crate::{percent, tally, NONE_LABEL};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerPerformance {
    pub seller: String,
    pub total: usize,
    pub closed: usize,
    /// Rounded percentage, 0–100.
    pub conversion_rate: u32,
}

/// Dashboard-level aggregates.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub total_clients: usize,
    pub closed_deals: usize,
    pub open_deals: usize,
    pub conversion_rate: u32,
    pub top_seller: String,
    pub sector_distribution: BTreeMap<String, usize>,
    pub discovery_channel_distribution: BTreeMap<String, usize>,
    pub seller_performance: Vec<SellerPerformance>,
}

/// Per-seller totals in first-appearance order.
pub(crate) fn seller_groups(clients: &[Client]) -> Vec<(String, Vec<&Client>)> {
    let mut groups: Vec<(String, Vec<&Client>)> = Vec::new();
    for c in clients {
        match groups.iter_mut().find(|(s, _)| *s == c.seller) {
            Some((_, list)) => list.push(c),
            None => groups.push((c.seller.clone(), vec![c])),
        }
    }
    groups
}

pub fn build_metrics(clients: &[Client]) -> DashboardMetrics {
    let closed = clients.iter().filter(|c| c.closed).count();

    let mut seller_performance: Vec<SellerPerformance> = seller_groups(clients)
        .into_iter()
        .map(|(seller, list)| {
            let total = list.len();
            let closed = list.iter().filter(|c| c.closed).count();
            SellerPerformance {
                seller,
                total,
                closed,
                conversion_rate: percent(closed, total),
            }
        })
        .collect();
    seller_performance.sort_by(|a, b| b.closed.cmp(&a.closed));

    let top_seller = seller_performance
        .first()
        .map(|s| s.seller.clone())
        .unwrap_or_else(|| NONE_LABEL.to_string());

    let categories = || clients.iter().filter_map(|c| c.category.as_ref());

    DashboardMetrics {
        total_clients: clients.len(),
        closed_deals: closed,
        open_deals: clients.len() - closed,
        conversion_rate: percent(closed, clients.len()),
        top_seller,
        sector_distribution: tally(categories().map(|c| c.sector.as_str())),
        discovery_channel_distribution: tally(categories().map(|c| c.discovery_channel.as_str())),
        seller_performance,
    }
}
