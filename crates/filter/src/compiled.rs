//! Compiled filter predicate

use regex::Regex;

use theia_protocol::Event;

use crate::error::CompileError;
use crate::spec::{FilterSpec, Order};
use crate::Result;

/// A compiled filter: a pure predicate over events.
///
/// Compilation happens once per filter; `matches` holds no mutable state
/// and is safe to call from any number of threads.
#[derive(Debug, Clone)]
pub struct Filter {
    id: Option<Regex>,
    source: Option<Regex>,
    content: Option<Regex>,
    tags: Vec<Regex>,
    start: Option<i64>,
    end: Option<i64>,
    order: Order,
}

impl Filter {
    /// Compile a descriptor. Each present pattern is compiled exactly once.
    pub fn compile(spec: &FilterSpec) -> Result<Self> {
        Ok(Self {
            id: compile_field("id", spec.id.as_deref())?,
            source: compile_field("source", spec.source.as_deref())?,
            content: compile_field("content", spec.content.as_deref())?,
            tags: spec
                .tags
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(|p| compile_pattern("tags", p))
                .collect::<Result<_>>()?,
            start: spec.start,
            end: spec.end,
            order: spec.order,
        })
    }

    /// A predicate that matches every event
    pub fn match_all() -> Self {
        Self {
            id: None,
            source: None,
            content: None,
            tags: Vec::new(),
            start: None,
            end: None,
            order: Order::default(),
        }
    }

    /// Requested result ordering (historical queries only)
    #[inline]
    pub fn order(&self) -> Order {
        self.order
    }

    /// Lower time bound, if any
    #[inline]
    pub fn start(&self) -> Option<i64> {
        self.start
    }

    /// Upper time bound, if any
    #[inline]
    pub fn end(&self) -> Option<i64> {
        self.end
    }

    /// Check whether an event passes this filter.
    ///
    /// This is the hot path of both the store scan and the live broker.
    /// Checks run cheapest-first and short-circuit: time bounds, id,
    /// source, tags, content.
    pub fn matches(&self, event: &Event) -> bool {
        let second = event.second();
        if let Some(start) = self.start {
            if second < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if second > end {
                return false;
            }
        }

        if let Some(ref id) = self.id {
            if !id.is_match(&event.id) {
                return false;
            }
        }

        if let Some(ref source) = self.source {
            if !source.is_match(&event.source) {
                return false;
            }
        }

        if !self.tags.is_empty() {
            let hit = self
                .tags
                .iter()
                .any(|p| event.tags.iter().any(|t| p.is_match(t)));
            if !hit {
                return false;
            }
        }

        if let Some(ref content) = self.content {
            if !content.is_match(&event.content) {
                return false;
            }
        }

        true
    }
}

fn compile_field(field: &'static str, pattern: Option<&str>) -> Result<Option<Regex>> {
    pattern.map(|p| compile_pattern(field, p)).transpose()
}

fn compile_pattern(field: &'static str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| CompileError::BadPattern { field, source })
}
