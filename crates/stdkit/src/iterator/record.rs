use std::collections::HashMap;
use std::sync::Arc;

use arcstr::ArcStr;
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use stdkit_base::{StdkitError, StdkitResult};

/// One value of a named record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Field {
    Text(String),
    /// The row ended before reaching this column.
    Absent,
}

impl Field {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Field::Text(text) => Some(text),
            Field::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Field::Absent)
    }
}

impl From<&str> for Field {
    fn from(text: &str) -> Self {
        Field::Text(text.to_string())
    }
}

/// Column names read from the first row, shared by every record of one pass.
#[derive(Debug, PartialEq, Eq)]
pub struct Header {
    names: Vec<ArcStr>,
    positions: HashMap<ArcStr, usize>,
}

impl Header {
    /// Validates names left to right: each must be non-empty and unique.
    pub fn new<I, S>(names: I) -> StdkitResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut header = Header {
            names: Vec::new(),
            positions: HashMap::new(),
        };
        for (index, name) in names.into_iter().enumerate() {
            let name = name.as_ref();
            let column = index + 1;
            if name.is_empty() {
                return Err(Box::new(StdkitError::malformed_input(format!(
                    "Empty column name at column {column}."
                ))));
            }
            if let Some(first) = header.positions.get(name) {
                return Err(Box::new(StdkitError::malformed_input(format!(
                    "Duplicate column name at columns {} and {column}.",
                    first + 1
                ))));
            }
            let name = ArcStr::from(name);
            header.positions.insert(name.clone(), index);
            header.names.push(name);
        }
        Ok(header)
    }

    pub fn names(&self) -> &[ArcStr] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Zero-based position of the column called `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }
}

/// A row paired with the header: one [`Field`] per column, in header order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedRecord {
    header: Arc<Header>,
    values: Vec<Field>,
}

impl NamedRecord {
    pub(crate) fn new(header: Arc<Header>, values: Vec<Field>) -> Self {
        debug_assert_eq!(header.len(), values.len());
        Self { header, values }
    }

    pub fn header(&self) -> &Arc<Header> {
        &self.header
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.header
            .position(name)
            .and_then(|index| self.values.get(index))
    }

    pub fn values(&self) -> &[Field] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ArcStr, &Field)> + '_ {
        self.header.names.iter().zip(self.values.iter())
    }
}

impl Serialize for NamedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name.as_str(), value)?;
        }
        map.end()
    }
}

/// What the CSV iterator yields for each non-blank line.
///
/// Serializes as an array of strings, or as an object in header order with
/// absent values as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Record {
    Row(Vec<String>),
    Named(NamedRecord),
}

impl Record {
    pub fn as_row(&self) -> Option<&[String]> {
        match self {
            Record::Row(row) => Some(row),
            Record::Named(_) => None,
        }
    }

    pub fn as_named(&self) -> Option<&NamedRecord> {
        match self {
            Record::Named(named) => Some(named),
            Record::Row(_) => None,
        }
    }
}
