use std::fmt;

use crate::ProtocolError;

/// A structured record carried as the object payload of a [`Package`](crate::Package).
///
/// Records are owned by exactly one place at a time: a package in transit or a
/// handler's pending-merge container. Moving between the two is a move, and
/// keeping a copy is an explicit `clone()`.
pub trait DataItem: Clone + fmt::Debug + Send + Sync + 'static {
    /// Parse one line of a data file. `content_type` names the kind of
    /// line (taken from the file header) so a record type can accept
    /// several partial layouts.
    fn parse_line(raw: &str, content_type: &str) -> Result<Self, ProtocolError>;

    /// Decode the serialized form produced by [`DataItem::to_wire_body`].
    fn from_wire(body: &str) -> Result<Self, ProtocolError>;

    /// Serialize for the wire.
    fn to_wire_body(&self) -> String;

    /// Natural key used for correlation.
    fn identity(&self) -> &str;

    /// Whether `other` describes the same real-world entity.
    fn matches(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }

    /// Absorb the fields `other` carries. Fields set in `other` overwrite
    /// the ones in `self`; fields `other` leaves unset are kept.
    fn merge_from(&mut self, other: &Self);
}
