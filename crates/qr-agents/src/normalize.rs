//! Turn free-form agent output into a [`ResearchRecord`].
//!
//! Strategies run strictest first and the first hit wins:
//!
//! 1. **Strict**: drop everything up to the last `Final Answer:` marker, slice
//!    from the first `{` to the last `}`, and decode that span as the exact
//!    record schema.
//! 2. **BalancedObject**: scan the whole raw text for brace-balanced JSON
//!    objects carrying string `topic` and `summary` keys, skipping schema
//!    echoes, and take the last one.
//! 3. **FieldSalvage**: pull `topic` and `summary` out individually with
//!    patterns.
//! 4. **Fallback**: wrap a preview of the raw text in a zero-confidence
//!    record titled with the original query.
//!
//! Every strategy is pure and the chain always yields a record.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::record::ResearchRecord;

/// `sources` placeholder for salvaged records.
pub const SALVAGED_SOURCES: &str = "Extracted";
/// `sources` placeholder for the fallback record.
pub const FALLBACK_SOURCES: &str = "System";
/// `tools_used` placeholder for every degraded record.
pub const PLACEHOLDER_TOOL: &str = "search";
pub const SALVAGED_CONFIDENCE: f64 = 0.5;
pub const FALLBACK_CONFIDENCE: f64 = 0.0;
/// Characters of raw output kept in the fallback summary.
pub const FALLBACK_PREVIEW_CHARS: usize = 200;

/// Keys that only appear in a JSON schema, never in a record instance.
const SCHEMA_MARKERS: &[&str] = &["properties", "type", "$schema", "required"];

static FINAL_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)final\s+(?:answer|response)\s*:").expect("valid marker regex")
});

static JSON_TOPIC: LazyLock<Regex> = LazyLock::new(|| string_field_regex("topic"));
static JSON_SUMMARY: LazyLock<Regex> = LazyLock::new(|| string_field_regex("summary"));
static LABEL_TOPIC: LazyLock<Regex> = LazyLock::new(|| label_field_regex("topic"));
static LABEL_SUMMARY: LazyLock<Regex> = LazyLock::new(|| label_field_regex("summary"));

/// `"field": "value"` with JSON escapes in the value.
fn string_field_regex(field: &str) -> Regex {
    Regex::new(&format!(
        r#"["']{}["']\s*:\s*"((?:[^"\\]|\\.)*)""#,
        field
    ))
    .expect("valid field regex")
}

/// A `Field: value` label running to the end of its line, tolerating
/// markdown bullets and bold.
fn label_field_regex(field: &str) -> Regex {
    Regex::new(&format!(
        r"(?im)(?:^|\s)[\s>*#-]*\**{}\**\s*:\**\s*(.+?)\s*$",
        field
    ))
    .expect("valid label regex")
}

/// Which strategy produced the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Strict,
    BalancedObject,
    FieldSalvage,
    Fallback,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Strict => "strict",
            Stage::BalancedObject => "balanced_object",
            Stage::FieldSalvage => "field_salvage",
            Stage::Fallback => "fallback",
        }
    }
}

/// A record plus the stage that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub record: ResearchRecord,
    pub stage: Stage,
}

impl Normalized {
    /// Anything below strict parsing carries placeholder fields.
    pub fn is_degraded(&self) -> bool {
        self.stage != Stage::Strict
    }
}

/// A single salvage strategy over the raw agent text.
pub type Strategy = fn(&str) -> Option<ResearchRecord>;

/// The strategies tried before falling back, in order.
pub const STRATEGIES: &[(Stage, Strategy)] = &[
    (Stage::Strict, strict_parse),
    (Stage::BalancedObject, balanced_object),
    (Stage::FieldSalvage, field_salvage),
];

/// Normalize agent output into a record. Never fails.
pub fn normalize(raw: &str, original_query: &str) -> ResearchRecord {
    normalize_outcome(raw, original_query).record
}

/// Like [`normalize`], also reporting which stage succeeded.
pub fn normalize_outcome(raw: &str, original_query: &str) -> Normalized {
    for (stage, strategy) in STRATEGIES {
        if let Some(record) = strategy(raw) {
            return Normalized {
                record,
                stage: *stage,
            };
        }
    }
    Normalized {
        record: fallback_record(raw, original_query),
        stage: Stage::Fallback,
    }
}

// =============================================================================
// Stage 1: strict
// =============================================================================

/// Everything after the last terminal-answer marker, or the whole text.
pub fn strip_final_marker(text: &str) -> &str {
    match FINAL_MARKER.find_iter(text).last() {
        Some(m) => &text[m.end()..],
        None => text,
    }
}

/// The span from the first `{` to the last `}`, inclusive.
pub fn isolate_braces(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

pub fn strict_parse(raw: &str) -> Option<ResearchRecord> {
    let span = isolate_braces(strip_final_marker(raw))?;
    let record: ResearchRecord = serde_json::from_str(span).ok()?;
    record.is_well_formed().then_some(record)
}

// =============================================================================
// Stage 2: balanced object
// =============================================================================

/// Every brace-balanced span in `text`, ordered by start position.
///
/// One left-to-right pass over the bytes. String literals are only tracked
/// inside an open brace, so quotes in surrounding prose cannot hide an
/// object. Unmatched braces are skipped.
pub fn balanced_spans(text: &str) -> Vec<&str> {
    let mut open: Vec<usize> = Vec::new();
    let mut spans: Vec<(usize, usize)> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, byte) in text.bytes().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' if !open.is_empty() => in_string = true,
            b'{' => open.push(i),
            b'}' => {
                if let Some(start) = open.pop() {
                    spans.push((start, i));
                }
            }
            _ => {}
        }
    }

    spans.sort_unstable_by_key(|(start, _)| *start);
    spans.into_iter().map(|(start, end)| &text[start..=end]).collect()
}

fn non_blank_str<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    let items: Vec<String> = value?
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();
    (!items.is_empty()).then_some(items)
}

/// Build a record from a decoded object that looks like an instance.
fn lenient_record(map: &Map<String, Value>) -> Option<ResearchRecord> {
    if SCHEMA_MARKERS.iter().any(|key| map.contains_key(*key)) {
        return None;
    }
    let topic = non_blank_str(map, "topic")?;
    let summary = non_blank_str(map, "summary")?;

    let confidence_score = map
        .get("confidence_score")
        .and_then(Value::as_f64)
        .filter(|c| c.is_finite())
        .map(|c| c.clamp(0.0, 1.0))
        .unwrap_or(SALVAGED_CONFIDENCE);

    Some(ResearchRecord {
        topic: topic.to_string(),
        summary: summary.to_string(),
        sources: string_list(map.get("sources"))
            .unwrap_or_else(|| vec![SALVAGED_SOURCES.to_string()]),
        tools_used: string_list(map.get("tools_used"))
            .unwrap_or_else(|| vec![PLACEHOLDER_TOOL.to_string()]),
        confidence_score,
    })
}

pub fn balanced_object(raw: &str) -> Option<ResearchRecord> {
    balanced_spans(raw).into_iter().rev().find_map(|span| {
        match serde_json::from_str::<Value>(span).ok()? {
            Value::Object(map) => lenient_record(&map),
            _ => None,
        }
    })
}

// =============================================================================
// Stage 3: field salvage
// =============================================================================

fn unescape_json_string(escaped: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{}\"", escaped))
        .unwrap_or_else(|_| escaped.to_string())
}

fn last_capture<'a>(re: &Regex, text: &'a str) -> Option<&'a str> {
    re.captures_iter(text)
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn salvage_field(text: &str, json: &Regex, label: &Regex) -> Option<String> {
    let from_json = last_capture(json, text)
        .map(unescape_json_string)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    from_json.or_else(|| {
        last_capture(label, text)
            .map(|v| v.trim_matches(|c: char| matches!(c, '"' | '\'' | ',' | '*')))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    })
}

pub fn field_salvage(raw: &str) -> Option<ResearchRecord> {
    let topic = salvage_field(raw, &JSON_TOPIC, &LABEL_TOPIC)?;
    let summary = salvage_field(raw, &JSON_SUMMARY, &LABEL_SUMMARY)?;
    Some(ResearchRecord {
        topic,
        summary,
        sources: vec![SALVAGED_SOURCES.to_string()],
        tools_used: vec![PLACEHOLDER_TOOL.to_string()],
        confidence_score: SALVAGED_CONFIDENCE,
    })
}

// =============================================================================
// Stage 4: fallback
// =============================================================================

pub fn fallback_record(raw: &str, original_query: &str) -> ResearchRecord {
    let trimmed = raw.trim();
    let preview = if trimmed.is_empty() {
        "(no output)".to_string()
    } else {
        let cut: String = trimmed.chars().take(FALLBACK_PREVIEW_CHARS).collect();
        if cut.len() < trimmed.len() {
            format!("{}...", cut)
        } else {
            cut
        }
    };

    ResearchRecord {
        topic: original_query.to_string(),
        summary: format!("The agent returned irregular output: {}", preview),
        sources: vec![FALLBACK_SOURCES.to_string()],
        tools_used: vec![PLACEHOLDER_TOOL.to_string()],
        confidence_score: FALLBACK_CONFIDENCE,
    }
}
