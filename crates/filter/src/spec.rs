//! Filter descriptor
//!
//! The wire form of a filter: one JSON object whose keys are all optional.
//! Unknown keys are ignored so newer clients can talk to older collectors.

use serde::{Deserialize, Serialize};

/// Result ordering for historical queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    /// Ascending by time (the default)
    #[default]
    Asc,
    /// Descending by time
    Desc,
}

impl Order {
    /// `true` for descending order
    #[inline]
    pub fn is_desc(self) -> bool {
        matches!(self, Order::Desc)
    }
}

/// A filter as received from a client.
///
/// All regex fields are unanchored patterns; `start`/`end` are integer
/// seconds. `order` only affects historical queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Pattern matched against the event id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Pattern matched against the event source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Pattern matched against the event content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Patterns matched against event tags; any pattern hitting any tag
    /// counts as a match. Absent or empty disables the check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    /// Lower time bound, inclusive (integer seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,

    /// Upper time bound, inclusive (integer seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,

    /// Result ordering for historical queries
    #[serde(default)]
    pub order: Order,
}

impl FilterSpec {
    /// A spec that matches every event
    pub fn match_all() -> Self {
        Self::default()
    }

    /// Parse a spec from its JSON wire form
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }
}
