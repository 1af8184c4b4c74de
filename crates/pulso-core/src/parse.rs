use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::ParseError;
use crate::normalize::normalize;
use crate::types::{Category, ParsedItem, Sentiment, Urgency, Volume};

static LEADING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^```(?:json)?\s*").expect("static regex"));
static TRAILING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*```$").expect("static regex"));

/// Remove surrounding whitespace and an optional markdown code fence.
/// Models wrap JSON in fences despite being told not to.
pub fn strip_fences(raw: &str) -> &str {
    let text = raw.trim();
    let start = LEADING_FENCE.find(text).map_or(0, |m| m.end());
    let text = &text[start..];
    let end = TRAILING_FENCE.find(text).map_or(text.len(), |m| m.start());
    text[..end].trim()
}

/// Decode a model response into exactly `expected_count` normalized items.
pub fn parse(raw: &str, expected_count: usize) -> Result<Vec<ParsedItem>, ParseError> {
    let body = strip_fences(raw);
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ParseError::malformed(format!("not valid JSON ({e})")))?;
    let Value::Array(elements) = value else {
        return Err(ParseError::malformed(format!(
            "expected a JSON array, got {}",
            json_kind(&value)
        )));
    };

    let items = elements
        .iter()
        .enumerate()
        .map(|(pos, el)| parse_item(pos, el))
        .collect::<Result<Vec<_>, _>>()?;

    if items.len() != expected_count {
        return Err(ParseError::CountMismatch {
            expected: expected_count,
            actual: items.len(),
        });
    }
    Ok(items)
}

/// [`parse`] plus id validation against the batch that produced the response:
/// every returned id must belong to the batch and appear once.
pub fn parse_batch(raw: &str, batch_ids: &[&str]) -> Result<Vec<ParsedItem>, ParseError> {
    let items = parse(raw, batch_ids.len())?;
    validate_ids(&items, batch_ids)?;
    Ok(items)
}

pub fn validate_ids(items: &[ParsedItem], batch_ids: &[&str]) -> Result<(), ParseError> {
    let known: HashSet<&str> = batch_ids.iter().copied().collect();
    let mut seen = HashSet::new();
    for item in items {
        if !known.contains(item.id.as_str()) {
            return Err(ParseError::UnknownId {
                id: item.id.clone(),
            });
        }
        if !seen.insert(item.id.as_str()) {
            return Err(ParseError::DuplicateId {
                id: item.id.clone(),
            });
        }
    }
    Ok(())
}

// ── Item decoding ──

fn parse_item(pos: usize, el: &Value) -> Result<ParsedItem, ParseError> {
    let obj = el.as_object().ok_or_else(|| {
        ParseError::malformed(format!("item {pos} is {}, not an object", json_kind(el)))
    })?;
    let field = Fields { obj, pos };

    let id = field.string("id")?;
    let category = Category {
        sector: field.string("sector")?,
        discovery_channel: field.string("discoveryChannel")?,
        main_pain_point: field.string("mainPainPoint")?,
        interaction_volume: field.literal(&id, "interactionVolume", Volume::from_literal, Volume::literals)?,
        integration_needs: field.string("integrationNeeds")?,
        urgency_level: field.literal(&id, "urgencyLevel", Urgency::from_literal, Urgency::literals)?,
        summary: field.string("summary")?,
        sentiment: field.literal(&id, "sentiment", Sentiment::from_literal, Sentiment::literals)?,
        trigger_words: field.string_list("triggerWords")?,
        next_steps: field.string("nextSteps")?,
    };

    Ok(ParsedItem {
        id,
        category: normalize(category),
    })
}

struct Fields<'a> {
    obj: &'a Map<String, Value>,
    pos: usize,
}

impl Fields<'_> {
    fn get(&self, name: &str) -> Result<&Value, ParseError> {
        self.obj
            .get(name)
            .ok_or_else(|| ParseError::malformed(format!("item {} is missing '{name}'", self.pos)))
    }

    fn string(&self, name: &str) -> Result<String, ParseError> {
        match self.get(name)? {
            Value::String(s) => Ok(s.clone()),
            other => Err(ParseError::malformed(format!(
                "item {} field '{name}' is {}, not a string",
                self.pos,
                json_kind(other)
            ))),
        }
    }

    fn string_list(&self, name: &str) -> Result<Vec<String>, ParseError> {
        let Value::Array(values) = self.get(name)? else {
            return Err(ParseError::malformed(format!(
                "item {} field '{name}' is not an array",
                self.pos
            )));
        };
        values
            .iter()
            .map(|v| {
                v.as_str().map(str::to_string).ok_or_else(|| {
                    ParseError::malformed(format!(
                        "item {} field '{name}' contains a non-string",
                        self.pos
                    ))
                })
            })
            .collect()
    }

    fn literal<T>(
        &self,
        id: &str,
        name: &'static str,
        from_literal: fn(&str) -> Option<T>,
        literals: fn() -> String,
    ) -> Result<T, ParseError> {
        let value = self.string(name)?;
        from_literal(&value).ok_or_else(|| ParseError::InvalidEnumValue {
            id: id.to_string(),
            field: name,
            value,
            expected: literals(),
        })
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
