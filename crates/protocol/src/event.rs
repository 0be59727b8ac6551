//! The event type

/// A single log event.
///
/// Events are the atomic unit of the system. Each is uniquely identified
/// by its producer-assigned `id` (treated as opaque), carries a fractional
/// Unix `timestamp`, names its origin in `source`, and may be labelled with
/// arbitrary `tags`. The `content` is free-form UTF-8 text, often one or
/// more log lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Globally unique identifier, assigned by the producer
    pub id: String,
    /// Seconds since the epoch, fractional part down to nanoseconds
    pub timestamp: f64,
    /// Origin identifier (file path, process name, ...)
    pub source: String,
    /// Arbitrary labels; order carries no meaning
    pub tags: Vec<String>,
    /// Event payload; may span multiple lines
    pub content: String,
    /// Unrecognized headers, preserved verbatim in first-occurrence order
    pub extras: Vec<(String, String)>,
}

impl Event {
    /// Create an event with the required fields
    pub fn new(
        id: impl Into<String>,
        timestamp: f64,
        source: impl Into<String>,
        tags: Vec<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp,
            source: source.into(),
            tags,
            content: content.into(),
            extras: Vec::new(),
        }
    }

    /// Attach an extra header, keeping first-occurrence order.
    ///
    /// Setting a name that is already present updates the value in place.
    pub fn set_extra(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self.extras.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = value;
        } else {
            self.extras.push((name, value));
        }
    }

    /// Look up an extra header by name
    pub fn extra(&self, name: &str) -> Option<&str> {
        self.extras
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// The integer second this event belongs to (floor of the timestamp)
    #[inline]
    pub fn second(&self) -> i64 {
        self.timestamp.floor() as i64
    }
}
