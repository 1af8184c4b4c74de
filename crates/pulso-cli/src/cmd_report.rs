use std::fmt::Write as _;
use std::path::Path;

use pulso_core::Client;
use pulso_insights::{build_metrics, build_seller_details, build_sellers_summary, DashboardMetrics, SellerDetail, SellersSummary};

use crate::cmd_analyze::base_clients;
use crate::config::Settings;

fn load(settings: &Settings, csv: &Path) -> anyhow::Result<Vec<Client>> {
    let cache = settings.open_cache(csv);
    let base = base_clients(&cache, csv)?;
    Ok(cache.load_clients(base))
}

/// `pulso metrics --csv <file> [--json]`
pub fn metrics(settings: &Settings, csv: &Path, json: bool) -> anyhow::Result<()> {
    let m = build_metrics(&load(settings, csv)?);
    if json {
        println!("{}", serde_json::to_string_pretty(&m)?);
    } else {
        print!("{}", render_metrics(&m));
    }
    Ok(())
}

/// `pulso sellers --csv <file> [--json]`
pub fn sellers(settings: &Settings, csv: &Path, json: bool) -> anyhow::Result<()> {
    let details = build_seller_details(&load(settings, csv)?);
    let summary = build_sellers_summary(&details);
    if json {
        let v = serde_json::json!({ "sellers": details, "summary": summary });
        println!("{}", serde_json::to_string_pretty(&v)?);
    } else {
        print!("{}", render_sellers(&details, &summary));
    }
    Ok(())
}

fn render_distribution(out: &mut String, title: &str, dist: &std::collections::BTreeMap<String, usize>) {
    if dist.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n{title}:");
    let mut entries: Vec<_> = dist.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1));
    for (k, n) in entries {
        let _ = writeln!(out, "  {k:<28} {n}");
    }
}

pub(crate) fn render_metrics(m: &DashboardMetrics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Clients:      {}", m.total_clients);
    let _ = writeln!(out, "Closed deals: {} ({}%)", m.closed_deals, m.conversion_rate);
    let _ = writeln!(out, "Open deals:   {}", m.open_deals);
    let _ = writeln!(out, "Top seller:   {}", m.top_seller);

    if !m.seller_performance.is_empty() {
        let _ = writeln!(out, "\nSellers:");
        for s in &m.seller_performance {
            let _ = writeln!(
                out,
                "  {:<20} {:>3} meetings {:>3} closed {:>4}%",
                s.seller, s.total, s.closed, s.conversion_rate
            );
        }
    }
    render_distribution(&mut out, "Sectors", &m.sector_distribution);
    render_distribution(&mut out, "Discovery channels", &m.discovery_channel_distribution);
    out
}

pub(crate) fn render_sellers(details: &[SellerDetail], summary: &SellersSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} sellers, {} meetings, best conversion: {} ({}%)\n",
        summary.total_sellers, summary.total_meetings, summary.best_seller, summary.best_conversion_rate
    );
    for d in details {
        let _ = writeln!(
            out,
            "{:<20} {:>3} meetings {:>3} closed {:>4}%  sector: {}  urgency: {}  analyzed: {}/{}",
            d.seller,
            d.total,
            d.closed,
            d.conversion_rate,
            d.top_sector,
            d.avg_urgency,
            d.analyzed_count,
            d.total
        );
    }
    out
}
