use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Client id format: `client-<n>` (1-based CSV row).
pub type ClientId = String;

/// Merged result of one analysis run, keyed by client id.
pub type CategoryMap = HashMap<ClientId, Category>;

/// One unit of work sent to the model: a client id and its meeting transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: ClientId,
    pub transcript: String,
}

impl Record {
    pub fn new(id: impl Into<String>, transcript: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            transcript: transcript.into(),
        }
    }
}

/// A sales-meeting row, optionally enriched with the extracted category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: ClientId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub meeting_date: String,
    #[serde(default)]
    pub seller: String,
    #[serde(default)]
    pub closed: bool,
    #[serde(default)]
    pub transcription: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

impl Client {
    pub fn to_record(&self) -> Record {
        Record::new(&self.id, &self.transcription)
    }

    pub fn is_analyzed(&self) -> bool {
        self.category.is_some()
    }
}

// ── Category ──

/// Structured attributes extracted from one transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub sector: String,
    pub discovery_channel: String,
    pub main_pain_point: String,
    pub interaction_volume: Volume,
    pub integration_needs: String,
    pub urgency_level: Urgency,
    pub summary: String,
    pub sentiment: Sentiment,
    pub trigger_words: Vec<String>,
    pub next_steps: String,
}

/// A parsed model output item: the embedded client id plus its category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedItem {
    pub id: ClientId,
    pub category: Category,
}

// ── Enumerations ──
//
// Wire literals are the Spanish labels the prompt asks for. Matching is exact:
// downstream filters compare these by string equality.

macro_rules! literal_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $lit:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $lit)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $lit,)+
                }
            }

            /// Exact, case-sensitive match against the wire literal.
            pub fn from_literal(s: &str) -> Option<Self> {
                match s {
                    $($lit => Some($name::$variant),)+
                    _ => None,
                }
            }

            /// All literals joined as `'A' | 'B' | 'C'`, for prompts and error messages.
            pub fn literals() -> String {
                Self::ALL
                    .iter()
                    .map(|v| format!("'{}'", v.as_str()))
                    .collect::<Vec<_>>()
                    .join(" | ")
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

literal_enum!(
    /// Weekly interaction volume: <100, 100-300, >300.
    Volume {
        Low => "Bajo",
        Medium => "Medio",
        High => "Alto",
    }
);

literal_enum!(
    /// How soon the client needs a solution.
    Urgency {
        Low => "Baja",
        Medium => "Media",
        High => "Alta",
    }
);

literal_enum!(
    /// Overall client attitude during the meeting.
    Sentiment {
        Positive => "Positivo",
        Neutral => "Neutral",
        Negative => "Negativo",
    }
);

impl Urgency {
    /// Numeric score used for averaging: Baja=1, Media=2, Alta=3.
    pub fn score(&self) -> u32 {
        match self {
            Urgency::Low => 1,
            Urgency::Medium => 2,
            Urgency::High => 3,
        }
    }

    /// Map an average score back to a label (>=2.5 Alta, >=1.5 Media, else Baja).
    pub fn from_average(avg: f64) -> Self {
        if avg >= 2.5 {
            Urgency::High
        } else if avg >= 1.5 {
            Urgency::Medium
        } else {
            Urgency::Low
        }
    }
}

// ── Batch ──

/// A contiguous slice of records sent together in one model request.
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    /// 0-based position of this batch in the run.
    pub index: usize,
    pub records: &'a [Record],
}

impl<'a> Batch<'a> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn ids(&self) -> Vec<&'a str> {
        self.records.iter().map(|r| r.id.as_str()).collect()
    }
}
