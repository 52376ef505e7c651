use crate::value_type::{Value, ValueType};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccessMode {
    #[serde(rename = "RO")]
    ReadOnly,
    #[serde(rename = "WO")]
    WriteOnly,
    #[serde(rename = "RW")]
    ReadWrite,
}

impl AccessMode {
    pub fn writable_by_non_owner(&self) -> bool {
        matches!(self, AccessMode::WriteOnly | AccessMode::ReadWrite)
    }
}

/// `Property type: {id, name, access ∈ {RO, WO, RW}, value_type_ref}` (§3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PropertyType {
    pub id: u32,
    pub name: String,
    pub access: AccessMode,
    pub value_type_ref: u32,
}

impl PropertyType {
    /// Delegates to the referenced value type (§3).
    pub fn validate(&self, value_type: &ValueType, value: &Value) -> bool {
        value_type.validate(value)
    }
}
