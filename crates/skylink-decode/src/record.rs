use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use skylink_schema::FieldValue;

/// One decoded packet: field values keyed by name, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedRecord {
    pub name: String,
    pub board: String,
    pub address: u16,
    pub rtr: bool,
    pub data: IndexMap<String, FieldValue>,
}

impl DecodedRecord {
    /// `board_packet`.
    pub fn qualified_name(&self) -> String {
        format!("{}_{}", self.board, self.name)
    }

    pub fn get(&self, field: &str) -> Option<FieldValue> {
        self.data.get(field).copied()
    }
}
