#![allow(dead_code)]

use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use pfn_node::{DataHandler, HandlerId};
use pfn_protocol::{DataItem, Package, ProtocolError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub id: String,
    pub points: Option<i64>,
}

impl Score {
    pub fn new(id: &str, points: Option<i64>) -> Self {
        Self {
            id: id.to_string(),
            points,
        }
    }
}

impl DataItem for Score {
    fn parse_line(raw: &str, content_type: &str) -> Result<Self, ProtocolError> {
        let mut fields = raw.split('\t');
        let id = fields
            .next()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ProtocolError::InvalidRecord(raw.to_string()))?;
        let points = match content_type {
            "scores" => Some(
                fields
                    .next()
                    .and_then(|p| p.trim().parse().ok())
                    .ok_or_else(|| ProtocolError::InvalidRecord(raw.to_string()))?,
            ),
            _ => None,
        };
        Ok(Score::new(id, points))
    }

    fn from_wire(body: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(body)?)
    }

    fn to_wire_body(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn identity(&self) -> &str {
        &self.id
    }

    fn merge_from(&mut self, other: &Self) {
        if other.points.is_some() {
            self.points = other.points;
        }
    }
}

/// Reports every package it sees as wire text and optionally consumes it.
pub struct Recorder {
    name: String,
    consume: bool,
    seen: mpsc::UnboundedSender<String>,
    pub id: Mutex<Option<HandlerId>>,
}

impl Recorder {
    pub fn new(name: &str, consume: bool) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                name: name.to_string(),
                consume,
                seen: tx,
                id: Mutex::new(None),
            },
            rx,
        )
    }
}

impl DataHandler<Score> for Recorder {
    fn name(&self) -> &str {
        &self.name
    }

    fn consume(&self, package: &mut Package<Score>) -> bool {
        let _ = self.seen.send(package.to_wire());
        self.consume
    }

    fn attached(&self, id: HandlerId) {
        *self.id.lock().unwrap() = Some(id);
    }
}

pub async fn next_seen(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("handler should see a package")
        .expect("recorder dropped")
}

pub async fn nothing_seen(rx: &mut mpsc::UnboundedReceiver<String>) -> bool {
    tokio::time::timeout(Duration::from_millis(200), rx.recv())
        .await
        .is_err()
}

pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition should become true");
}
