//! Event serialization
//!
//! Emits the textual wire form of an event: the four leading headers in
//! fixed order, extra headers in insertion order, then the content verbatim.

use bytes::Bytes;

use crate::event::Event;

/// Serialize an event to its wire form.
pub fn serialize(event: &Event) -> Bytes {
    Bytes::from(serialize_to_string(event))
}

/// Serialize an event into an owned `String`.
///
/// The timestamp uses `f64`'s default formatting (shortest form that
/// round-trips exactly), so `parse(serialize(e))` reproduces the value
/// bit-for-bit.
pub fn serialize_to_string(event: &Event) -> String {
    let mut out = String::with_capacity(64 + event.content.len());

    out.push_str("id:");
    out.push_str(single_line(&event.id));
    out.push('\n');

    out.push_str("timestamp:");
    out.push_str(&event.timestamp.to_string());
    out.push('\n');

    out.push_str("source:");
    out.push_str(single_line(&event.source));
    out.push('\n');

    out.push_str("tags:");
    for (i, tag) in event.tags.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(single_line(tag));
    }
    out.push('\n');

    for (name, value) in &event.extras {
        out.push_str(single_line(name));
        out.push(':');
        out.push_str(single_line(value));
        out.push('\n');
    }

    // The newline after the last header is the only separator; the content
    // is emitted verbatim with no trailing newline.
    out.push_str(&event.content);
    out
}

/// Header values are single lines; truncate at the first newline.
fn single_line(value: &str) -> &str {
    match value.find('\n') {
        Some(idx) => &value[..idx],
        None => value,
    }
}
