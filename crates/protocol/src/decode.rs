//! Event parsing
//!
//! Reads header lines from the start of the input. Each line is split at
//! its first `:`; the first line without a colon begins the content, which
//! runs verbatim to the end of the input. Known headers populate typed
//! fields (duplicates: last write wins); unknown headers are kept as extras
//! in first-occurrence order.

use crate::error::ParseError;
use crate::event::Event;
use crate::Result;

/// Parse an event from its wire form.
///
/// Strict: missing `id`, a missing or non-numeric `timestamp`, and empty
/// input are all errors. Missing `source` defaults to the empty string and
/// missing `tags` to the empty set.
pub fn parse(input: &[u8]) -> Result<Event> {
    parse_inner(input, None)
}

/// Parse an event received over the push channel.
///
/// Identical to [`parse`] except that an absent `timestamp` header is
/// replaced by `received_at` (the collector's receive time) instead of
/// failing. A timestamp header that is present but non-numeric still fails.
pub fn parse_received(input: &[u8], received_at: f64) -> Result<Event> {
    parse_inner(input, Some(received_at))
}

fn parse_inner(input: &[u8], default_timestamp: Option<f64>) -> Result<Event> {
    if input.is_empty() {
        return Err(ParseError::Empty);
    }
    let text = std::str::from_utf8(input)?;

    let mut id: Option<String> = None;
    let mut timestamp_raw: Option<&str> = None;
    let mut source: Option<String> = None;
    let mut tags: Vec<String> = Vec::new();
    let mut extras: Vec<(String, String)> = Vec::new();
    let mut content = "";

    let mut pos = 0;
    while pos < text.len() {
        let line_end = text[pos..].find('\n').map(|i| pos + i);
        let line = match line_end {
            Some(end) => &text[pos..end],
            None => &text[pos..],
        };

        let Some(colon) = line.find(':') else {
            // First colon-free line: the remainder of the input, this line
            // included, is the content.
            content = &text[pos..];
            break;
        };

        let name = &line[..colon];
        let value = &line[colon + 1..];
        match name {
            "id" => id = Some(value.to_string()),
            "timestamp" => timestamp_raw = Some(value),
            "source" => source = Some(value.to_string()),
            "tags" => {
                tags = value
                    .split(',')
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            _ => {
                if let Some(entry) = extras.iter_mut().find(|(n, _)| n == name) {
                    entry.1 = value.to_string();
                } else {
                    extras.push((name.to_string(), value.to_string()));
                }
            }
        }

        pos = match line_end {
            Some(end) => end + 1,
            None => text.len(),
        };
    }

    let id = id.ok_or(ParseError::MissingHeader("id"))?;

    let timestamp = match timestamp_raw {
        Some(raw) => {
            // Observed producers emit "timestamp: <v>"; tolerate one
            // leading space before the decimal.
            let trimmed = raw.strip_prefix(' ').unwrap_or(raw);
            trimmed
                .parse::<f64>()
                .map_err(|_| ParseError::InvalidTimestamp(raw.to_string()))?
        }
        None => default_timestamp.ok_or(ParseError::MissingHeader("timestamp"))?,
    };

    Ok(Event {
        id,
        timestamp,
        source: source.unwrap_or_default(),
        tags,
        content: content.to_string(),
        extras,
    })
}
