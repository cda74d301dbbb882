use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

const MAX_EVENTS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventCategory {
    Lifecycle,
    Message,
    Warning,
    Error,
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EventCategory::Lifecycle => "lifecycle",
            EventCategory::Message => "message",
            EventCategory::Warning => "warning",
            EventCategory::Error => "error",
        };
        f.write_str(label)
    }
}

/// Something a node wants its operator to see.
#[derive(Debug, Clone, Serialize)]
pub struct NodeEvent {
    pub timestamp: DateTime<Utc>,
    pub category: EventCategory,
    pub message: String,
}

impl NodeEvent {
    pub fn new(category: EventCategory, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            category,
            message: message.into(),
        }
    }
}

impl fmt::Display for NodeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.timestamp.format("%H:%M:%S"),
            self.category,
            self.message
        )
    }
}

/// Receives node events and queue depth reports. Both are called from
/// whichever task produced them and must not block.
pub trait NodeObserver: Send + Sync {
    fn node_event(&self, _event: &NodeEvent) {}

    fn queue_depth(&self, _label: &str, _count: usize) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl NodeObserver for NullObserver {}

/// Keeps the most recent events and the latest depth per label.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<VecDeque<NodeEvent>>,
    depths: Mutex<HashMap<String, usize>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<NodeEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn messages(&self, category: EventCategory) -> Vec<String> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.category == category)
            .map(|e| e.message.clone())
            .collect()
    }

    pub fn depth(&self, label: &str) -> Option<usize> {
        self.depths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(label)
            .copied()
    }
}

impl NodeObserver for EventLog {
    fn node_event(&self, event: &NodeEvent) {
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        if events.len() >= MAX_EVENTS {
            events.pop_front();
        }
        events.push_back(event.clone());
    }

    fn queue_depth(&self, label: &str, count: usize) {
        self.depths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(label.to_string(), count);
    }
}
