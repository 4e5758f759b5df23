//! Normalization of inbound webhook payloads into [`CanonicalEvent`].
//!
//! Two wire shapes are accepted:
//!
//! * **direct** (`POST /webhook`): `{ queue, event: { category, topic, type,
//!   body, occurredAt? }, correlationId? }`, passed through as-is.
//! * **core hub** (`POST /webhook/core-hub`): a delivery envelope
//!   `{ destination: { channel, routingKey }, messageId, timestamp, payload }`
//!   whose channel and routing key are mapped onto category, topic and type.
//!
//! Normalization never fails. Missing or mistyped fields become the
//! [`UNKNOWN`] placeholder so the event can always be stored. Labels are kept
//! verbatim, except that U+0000, which `PostgreSQL` rejects in both text and
//! `jsonb`, is replaced with U+FFFD everywhere in the event.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};
use tally_core::event::{CanonicalEvent, EventSource, UNKNOWN};
use tracing::debug;

/// Normalizes a raw payload received through `source` into a canonical event.
///
/// `now` is used whenever the payload carries no usable timestamp.
#[must_use]
pub fn normalize(source: EventSource, raw: &Value, now: DateTime<Utc>) -> CanonicalEvent {
    let event = match source {
        EventSource::DirectWebhook => normalize_direct(raw, now),
        EventSource::CoreHub => normalize_core_hub(raw, now),
    };
    storable(event)
}

fn storable(mut event: CanonicalEvent) -> CanonicalEvent {
    for label in [&mut event.category, &mut event.topic, &mut event.event_type] {
        if label.contains(NUL) {
            *label = without_nul(label);
        }
    }
    for id in [&mut event.correlation_id, &mut event.message_id]
        .into_iter()
        .flatten()
    {
        if id.contains(NUL) {
            *id = without_nul(id);
        }
    }
    scrub_nul(&mut event.body);
    event
}

const NUL: char = '\0';

fn without_nul(text: &str) -> String {
    text.replace(NUL, "\u{FFFD}")
}

fn scrub_nul(value: &mut Value) {
    match value {
        Value::String(s) if s.contains(NUL) => *s = without_nul(s),
        Value::Array(items) => items.iter_mut().for_each(scrub_nul),
        Value::Object(map) if map.keys().any(|k| k.contains(NUL)) => {
            *map = std::mem::take(map)
                .into_iter()
                .map(|(key, mut v)| {
                    scrub_nul(&mut v);
                    (without_nul(&key), v)
                })
                .collect();
        }
        Value::Object(map) => map.values_mut().for_each(scrub_nul),
        _ => {}
    }
}

fn normalize_direct(raw: &Value, now: DateTime<Utc>) -> CanonicalEvent {
    let event = &raw["event"];

    CanonicalEvent {
        category: text_or_unknown(&event["category"]),
        topic: text_or_unknown(&event["topic"]),
        event_type: text_or_unknown(&event["type"]),
        body: match &event["body"] {
            Value::Null => Value::Object(Map::new()),
            body => body.clone(),
        },
        occurred_at: timestamp_or(&event["occurredAt"], now),
        correlation_id: identifier(&raw["correlationId"]),
        message_id: None,
        source: EventSource::DirectWebhook,
    }
}

fn normalize_core_hub(raw: &Value, now: DateTime<Utc>) -> CanonicalEvent {
    let destination = &raw["destination"];
    let channel = non_empty(&destination["channel"]);

    let category = channel
        .and_then(|c| c.split('.').next())
        .filter(|segment| !segment.is_empty())
        .unwrap_or(UNKNOWN)
        .to_owned();
    let topic = channel.unwrap_or(UNKNOWN).to_owned();

    // The wrapper keeps the whole envelope so a delivery can be replayed from
    // the stored event alone.
    let body = json!({
        "messageId": raw["messageId"],
        "timestamp": raw["timestamp"],
        "payload": raw["payload"],
        "destination": destination,
        "originalEnvelope": raw,
    });

    CanonicalEvent {
        category,
        topic,
        event_type: text_or_unknown(&destination["routingKey"]),
        body,
        occurred_at: timestamp_or(&raw["timestamp"], now),
        correlation_id: identifier(&raw["correlationId"]),
        message_id: identifier(&raw["messageId"]),
        source: EventSource::CoreHub,
    }
}

/// Blank strings count as missing; anything else is returned untouched.
fn non_empty(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.trim().is_empty())
}

fn text_or_unknown(value: &Value) -> String {
    non_empty(value).unwrap_or(UNKNOWN).to_owned()
}

/// Identifiers arrive as strings or, from some producers, as numbers.
fn identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Accepts RFC 3339 strings and epoch milliseconds.
fn timestamp_or(value: &Value, now: DateTime<Utc>) -> DateTime<Utc> {
    let parsed = match value {
        Value::Null => return now,
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    };

    parsed.unwrap_or_else(|| {
        debug!(timestamp = %value, "unparseable timestamp, defaulting to ingestion time");
        now
    })
}
