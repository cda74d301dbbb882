use std::fmt;
use std::str::FromStr;

use crate::constants::*;
use crate::item::DataItem;
use crate::ProtocolError;

/// Whether a package carries a command or a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageKind {
    Control,
    Data,
}

impl PackageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageKind::Control => CONTROL_TAG,
            PackageKind::Data => DATA_TAG,
        }
    }

}

impl FromStr for PackageKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            CONTROL_TAG => Ok(PackageKind::Control),
            DATA_TAG => Ok(PackageKind::Data),
            other => Err(ProtocolError::UnknownKind(other.to_string())),
        }
    }
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Command keywords understood by nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlCommand {
    /// Liveness probe, forwarded along the pipeline.
    Ping,
    /// Ask handlers to (re)read their configured data file.
    ReadFile,
    /// Forward, then stop the node.
    Shutdown,
}

impl ControlCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlCommand::Ping => CMD_PING,
            ControlCommand::ReadFile => CMD_READFILE,
            ControlCommand::Shutdown => CMD_SHUTDOWN,
        }
    }

}

impl FromStr for ControlCommand {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            CMD_PING => Ok(ControlCommand::Ping),
            CMD_READFILE => Ok(ControlCommand::ReadFile),
            CMD_SHUTDOWN => Ok(ControlCommand::Shutdown),
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}

/// The envelope flowing through a node.
///
/// Wire format: `<kind>:<body>` where `<kind>` is `control` or `data`.
/// The kind is fixed at construction; payloads are replaced whole.
#[derive(Debug, Clone, PartialEq)]
pub struct Package<T> {
    kind: PackageKind,
    text: Option<String>,
    item: Option<T>,
}

impl<T> Package<T> {
    pub fn new(kind: PackageKind) -> Self {
        Self {
            kind,
            text: None,
            item: None,
        }
    }

    /// A control package carrying `command`.
    pub fn control(command: ControlCommand) -> Self {
        Self {
            kind: PackageKind::Control,
            text: Some(command.as_str().to_string()),
            item: None,
        }
    }

    /// A data package with a raw (still serialized) body.
    pub fn data_text(body: impl Into<String>) -> Self {
        Self {
            kind: PackageKind::Data,
            text: Some(body.into()),
            item: None,
        }
    }

    /// A data package holding a decoded record.
    pub fn data_item(item: T) -> Self {
        Self {
            kind: PackageKind::Data,
            text: None,
            item: Some(item),
        }
    }

    pub fn kind(&self) -> PackageKind {
        self.kind
    }

    pub fn is_control(&self) -> bool {
        self.kind == PackageKind::Control
    }

    pub fn is_data(&self) -> bool {
        self.kind == PackageKind::Data
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }

    pub fn clear_text(&mut self) {
        self.text = None;
    }

    pub fn item(&self) -> Option<&T> {
        self.item.as_ref()
    }

    pub fn item_mut(&mut self) -> Option<&mut T> {
        self.item.as_mut()
    }

    /// Replace the object payload. The previous record, if any, is dropped.
    pub fn set_item(&mut self, item: T) {
        self.item = Some(item);
    }

    /// Move the object payload out of the package.
    pub fn take_item(&mut self) -> Option<T> {
        self.item.take()
    }

    /// The command of a control package, if it names a known one.
    pub fn command(&self) -> Option<ControlCommand> {
        if self.kind != PackageKind::Control {
            return None;
        }
        self.text.as_deref().and_then(|text| text.parse().ok())
    }

    /// Parse a wire string into a text-only package.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let raw = raw.trim_end_matches('\0');
        if raw.is_empty() {
            return Err(ProtocolError::EmptyMessage);
        }
        let (tag, body) = raw
            .split_once(WIRE_DELIMITER)
            .ok_or(ProtocolError::MissingDelimiter)?;
        let kind: PackageKind = tag.parse()?;
        Ok(Self {
            kind,
            text: (!body.is_empty()).then(|| body.to_string()),
            item: None,
        })
    }
}

impl<T: DataItem> Package<T> {
    /// Serialize for the wire. A decoded record is authoritative over a
    /// stale text body, so it is serialized when present.
    pub fn to_wire(&self) -> String {
        let body = match (&self.item, &self.text) {
            (Some(item), _) => item.to_wire_body(),
            (None, Some(text)) => text.clone(),
            (None, None) => String::new(),
        };
        format!("{}{}{}", self.kind.as_str(), WIRE_DELIMITER, body)
    }
}
