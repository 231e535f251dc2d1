use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a row created in the remote database.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowId(pub String);

impl RowId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A value written into one property (column) of a remote row.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Title(String),
    RichText(String),
    Number(f64),
    Checkbox(bool),
    Url(String),
    /// A file property pointing at an external URL.
    ExternalFile(String),
    Select {
        name: String,
        /// `None` lets the remote service pick the option color.
        color: Option<String>,
    },
}

impl PropertyValue {
    pub fn select(name: impl Into<String>, color: impl Into<String>) -> Self {
        PropertyValue::Select {
            name: name.into(),
            color: Some(color.into()),
        }
    }

    /// The same value with any select color removed.
    pub fn without_color(&self) -> Self {
        match self {
            PropertyValue::Select { name, .. } => PropertyValue::Select {
                name: name.clone(),
                color: None,
            },
            other => other.clone(),
        }
    }
}

/// A single named property write.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyPatch {
    pub name: String,
    pub value: PropertyValue,
}

impl PropertyPatch {
    pub fn new(name: impl Into<String>, value: PropertyValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Result of a property patch the service answered.
///
/// Transport and server failures are errors; a validation rejection is a
/// normal outcome carrying the response text so callers can inspect it.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOutcome {
    Applied,
    Rejected { message: String },
}
