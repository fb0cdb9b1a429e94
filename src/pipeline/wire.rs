//! Request and response bodies for the backend stage endpoints.
//!
//! Responses are parsed leniently: every field is optional, aliases are
//! accepted where the backend has renamed fields over time, and missing
//! values fall back to neutral defaults. Only a body that is not a JSON
//! object at all is treated as a parse failure.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::confidence::{normalize_confidence, raw_confidence};
use super::rehydration::{serialize_or_empty, RehydrationToken};
use super::risk::pick_score;
use super::types::{
    ContextResult, Entity, FilterResult, FinalResult, LlmResult, SanitizationResult, StageOutput,
};

// ═══════════════════════════════════════════════════════════
// Requests
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
pub struct SanitizeRequest<'a> {
    pub input: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ContextRequest<'a> {
    pub input: &'a str,
    pub sanitized: &'a str,
}

/// Context as forwarded to later stages: the backend's own values.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ContextPayload<'a> {
    pub category: Option<&'a str>,
    pub confidence: Option<f64>,
}

impl<'a> From<&'a ContextResult> for ContextPayload<'a> {
    fn from(context: &'a ContextResult) -> Self {
        Self {
            category: context.category.as_deref(),
            confidence: context.raw_confidence,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LlmRequest<'a> {
    pub sanitized: &'a str,
    pub context: ContextPayload<'a>,
    #[serde(serialize_with = "serialize_or_empty")]
    pub rehydration_map: Option<&'a RehydrationToken>,
}

#[derive(Debug, Serialize)]
pub struct FilterRequest<'a> {
    pub answer: &'a str,
    pub sanitized: &'a str,
    pub context: ContextPayload<'a>,
    #[serde(serialize_with = "serialize_or_empty")]
    pub rehydration_map: Option<&'a RehydrationToken>,
}

#[derive(Debug, Serialize)]
pub struct FinalRequest<'a> {
    pub input: &'a str,
    pub sanitized: &'a str,
    pub llm_result: &'a LlmResult,
    pub filtered_output: &'a FilterResult,
    pub entities: &'a [Entity],
    pub context: ContextPayload<'a>,
    #[serde(serialize_with = "serialize_or_empty")]
    pub rehydration_map: Option<&'a RehydrationToken>,
}

// ═══════════════════════════════════════════════════════════
// Responses
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SanitizeResponse {
    sanitized: Option<Value>,
    sanitized_text: Option<Value>,
    risk: Option<Value>,
    risk_score: Option<Value>,
    rehydration_map: Option<RehydrationToken>,
    #[serde(deserialize_with = "lenient_entities")]
    entities: Vec<Entity>,
    entities_summary: Option<Value>,
    context: Option<Value>,
}

impl SanitizeResponse {
    pub fn into_output(self) -> StageOutput<SanitizationResult> {
        StageOutput {
            result: SanitizationResult {
                sanitized: first_text(&[&self.sanitized, &self.sanitized_text]).unwrap_or_default(),
                risk: pick_score(self.risk.as_ref(), self.risk_score.as_ref()).unwrap_or(0),
                entities: self.entities,
                entities_summary: match self.entities_summary {
                    Some(Value::Array(items)) => items,
                    _ => Vec::new(),
                },
                detected_context: self.context.as_ref().and_then(label),
            },
            rehydration_map: self.rehydration_map,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ContextResponse {
    category: Option<Value>,
    confidence: Option<Value>,
}

impl ContextResponse {
    pub fn into_result(self) -> ContextResult {
        ContextResult {
            category: self.category.as_ref().and_then(label),
            confidence: normalize_confidence(self.confidence.as_ref()),
            raw_confidence: raw_confidence(self.confidence.as_ref()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LlmResponse {
    answer: Option<Value>,
    output: Option<Value>,
    confidence: Option<Value>,
    explanations: Value,
    fallback_used: Option<Value>,
    raw: Option<Value>,
    provider: Option<Value>,
    rehydration_map: Option<RehydrationToken>,
}

impl LlmResponse {
    pub fn into_output(self) -> StageOutput<LlmResult> {
        let answer = self
            .answer
            .as_ref()
            .and_then(text)
            .filter(|a| !a.is_empty())
            .or_else(|| self.output.as_ref().and_then(text))
            .unwrap_or_default();
        StageOutput {
            result: LlmResult {
                raw: self
                    .raw
                    .as_ref()
                    .and_then(text)
                    .unwrap_or_else(|| answer.clone()),
                answer,
                confidence: raw_confidence(self.confidence.as_ref()).unwrap_or(0.0),
                explanations: self.explanations,
                fallback_used: self.fallback_used.as_ref().and_then(flag).unwrap_or(false),
                provider: self.provider.as_ref().and_then(label),
            },
            rehydration_map: self.rehydration_map,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FilterResponse {
    safe_sanitized_text: Option<Value>,
    leak_detected: Option<Value>,
    notes: Option<Value>,
    rehydration_map: Option<RehydrationToken>,
}

impl FilterResponse {
    /// `original` is the answer that was submitted for filtering.
    pub fn into_output(self, original: &str) -> StageOutput<FilterResult> {
        StageOutput {
            result: FilterResult {
                original: original.to_string(),
                safe_text: self
                    .safe_sanitized_text
                    .as_ref()
                    .and_then(text)
                    .unwrap_or_default(),
                leak_detected: self.leak_detected.as_ref().and_then(flag).unwrap_or(false),
                notes: self
                    .notes
                    .as_ref()
                    .and_then(text)
                    .filter(|n| !n.trim().is_empty()),
            },
            rehydration_map: self.rehydration_map,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FinalResponse {
    final_rehydrated_text: Option<Value>,
    result: Option<Value>,
    final_output: Option<Value>,
    risk: Option<Value>,
    risk_score: Option<Value>,
}

impl FinalResponse {
    pub fn into_result(self) -> FinalResult {
        FinalResult {
            text: first_text(&[&self.final_rehydrated_text, &self.result, &self.final_output])
                .unwrap_or_default(),
            risk: pick_score(self.risk.as_ref(), self.risk_score.as_ref()),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Field coercion
// ═══════════════════════════════════════════════════════════

/// A category-like label: non-empty strings only.
fn label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Display text from whatever the backend put in a text field.
///
/// Numbers and booleans keep their JSON spelling and a list is joined
/// with `", "`. Objects and null read as absent.
pub(super) fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(text).collect();
            Some(parts.join(", "))
        }
        Value::Object(_) | Value::Null => None,
    }
}

/// The first alias that holds text.
fn first_text(candidates: &[&Option<Value>]) -> Option<String> {
    candidates
        .iter()
        .find_map(|candidate| candidate.as_ref().and_then(text))
}

/// A yes/no field: booleans, `"true"`/`"false"` style strings, or numbers
/// (non-zero is true).
fn flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|n| n != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Entity list that never fails. A non-list reads as empty; a bare scalar
/// becomes an unlabeled entity.
fn lenient_entities<'de, D>(deserializer: D) -> Result<Vec<Entity>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(fields) => Some(Entity::from(fields)),
            Value::Null => None,
            scalar => Some(Entity {
                entity: text(&scalar).unwrap_or_default(),
                ..Entity::default()
            }),
        })
        .collect())
}
