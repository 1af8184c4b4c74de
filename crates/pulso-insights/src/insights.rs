use serde::Serialize;

use pulso_core::{Client, Sentiment};

use crate::percent;

const MAX_PAIN_POINTS: usize = 8;
const LABEL_MAX_CHARS: usize = 40;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PainPointCount {
    /// Shortened chart label.
    pub label: String,
    pub full_label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelConversionStat {
    pub channel: String,
    pub total: usize,
    pub closed: usize,
    pub rate: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentStat {
    pub sentiment: Sentiment,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsData {
    pub pain_points: Vec<PainPointCount>,
    pub channel_conversion: Vec<ChannelConversionStat>,
    pub sentiment_distribution: Vec<SentimentStat>,
    pub has_ai_data: bool,
}

/// Shorten long model text to a chart label, ending in `…` when cut.
pub fn shorten(text: &str, max: usize) -> String {
    let t = text.trim();
    if t.chars().count() > max {
        let kept: String = t.chars().take(max.saturating_sub(1)).collect();
        format!("{kept}…")
    } else {
        t.to_string()
    }
}

pub fn build_insights(clients: &[Client]) -> InsightsData {
    let analyzed: Vec<(&Client, &pulso_core::Category)> = clients
        .iter()
        .filter_map(|c| c.category.as_ref().map(|cat| (c, cat)))
        .collect();

    if analyzed.is_empty() {
        return InsightsData {
            pain_points: vec![],
            channel_conversion: vec![],
            sentiment_distribution: vec![],
            has_ai_data: false,
        };
    }

    // Pain points, grouped by shortened label
    let mut pain: Vec<PainPointCount> = Vec::new();
    for (_, cat) in &analyzed {
        let full = cat.main_pain_point.trim();
        let label = shorten(full, LABEL_MAX_CHARS);
        match pain.iter_mut().find(|p| p.label == label) {
            Some(p) => p.count += 1,
            None => pain.push(PainPointCount {
                label,
                full_label: full.to_string(),
                count: 1,
            }),
        }
    }
    pain.sort_by(|a, b| b.count.cmp(&a.count));
    pain.truncate(MAX_PAIN_POINTS);

    // Discovery channel → conversion
    let mut channels: Vec<ChannelConversionStat> = Vec::new();
    for (client, cat) in &analyzed {
        let idx = match channels.iter().position(|s| s.channel == cat.discovery_channel) {
            Some(i) => i,
            None => {
                channels.push(ChannelConversionStat {
                    channel: cat.discovery_channel.clone(),
                    total: 0,
                    closed: 0,
                    rate: 0,
                });
                channels.len() - 1
            }
        };
        channels[idx].total += 1;
        if client.closed {
            channels[idx].closed += 1;
        }
    }
    for s in &mut channels {
        s.rate = percent(s.closed, s.total);
    }
    channels.sort_by(|a, b| b.rate.cmp(&a.rate));

    // Sentiment in fixed order, zero counts omitted
    let sentiment_distribution = Sentiment::ALL
        .iter()
        .map(|s| SentimentStat {
            sentiment: *s,
            count: analyzed.iter().filter(|(_, c)| c.sentiment == *s).count(),
        })
        .filter(|s| s.count > 0)
        .collect();

    InsightsData {
        pain_points: pain,
        channel_conversion: channels,
        sentiment_distribution,
        has_ai_data: true,
    }
}
