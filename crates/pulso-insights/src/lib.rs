//! Derived views over a client list: dashboard metrics, AI insights,
//! seller drill-downs and list filters. All functions are pure.

use std::collections::BTreeMap;

pub mod filter;
pub mod insights;
pub mod metrics;
pub mod sellers;

pub use filter::{filter_clients, ClientFilter};
pub use insights::{build_insights, ChannelConversionStat, InsightsData, PainPointCount, SentimentStat};
pub use metrics::{build_metrics, DashboardMetrics, SellerPerformance};
pub use sellers::{build_seller_details, build_sellers_summary, SellerDetail, SellersSummary};

/// Shown where a label has no data behind it.
pub const NONE_LABEL: &str = "—";

/// Rounded percentage; 0 when `total` is 0.
pub(crate) fn percent(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (part as f64 / total as f64 * 100.0).round() as u32
}

pub(crate) fn tally<'a>(keys: impl Iterator<Item = &'a str>) -> BTreeMap<String, usize> {
    let mut map = BTreeMap::new();
    for k in keys.filter(|k| !k.is_empty()) {
        *map.entry(k.to_string()).or_insert(0) += 1;
    }
    map
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_rounds() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(1, 2), 50);
    }

    #[test]
    fn tally_skips_empty_keys() {
        let map = tally(["a", "", "a", "b"].into_iter());
        assert_eq!(map["a"], 2);
        assert_eq!(map.len(), 2);
    }
}
