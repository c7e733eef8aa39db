//! Dataset row: one library's loan list for one month

use serde::{Deserialize, Serialize};

use crate::error::DatasetError;

/// Column names of the backing dataset, in file order.
pub const COLUMNS: [&str; 6] = ["LibraryName", "Year", "Month", "Url", "ValidUrl", "SaveAt"];

/// One unit of work. Identified by its position in the dataset, not by any field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    #[serde(rename = "LibraryName")]
    pub source_name: String,
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Month")]
    pub month: u32,
    #[serde(rename = "Url")]
    pub url: String,
    #[serde(rename = "ValidUrl", with = "title_bool")]
    pub valid_url: bool,
    /// Destination relative to the dataset's directory
    #[serde(rename = "SaveAt")]
    pub save_at: String,
}

/// Addressable column of a [`Row`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    SourceName,
    Year,
    Month,
    Url,
    ValidUrl,
    SaveAt,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Self::SourceName,
        Self::Year,
        Self::Month,
        Self::Url,
        Self::ValidUrl,
        Self::SaveAt,
    ];

    /// Header name in the dataset file
    pub fn column(self) -> &'static str {
        match self {
            Self::SourceName => "LibraryName",
            Self::Year => "Year",
            Self::Month => "Month",
            Self::Url => "Url",
            Self::ValidUrl => "ValidUrl",
            Self::SaveAt => "SaveAt",
        }
    }

    pub fn from_column(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.column() == name)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}

/// Typed value assigned through [`Row::set`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Int(i64),
    Bool(bool),
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl Row {
    /// Assign one field. The value's type must match the column's type.
    pub fn set(&mut self, field: Field, value: FieldValue) -> Result<(), DatasetError> {
        let invalid = |value: &FieldValue| DatasetError::InvalidValue {
            field: field.column(),
            value: format!("{value:?}"),
        };
        match (field, value) {
            (Field::SourceName, FieldValue::Text(s)) => self.source_name = s,
            (Field::Url, FieldValue::Text(s)) => self.url = s,
            (Field::SaveAt, FieldValue::Text(s)) => self.save_at = s,
            (Field::ValidUrl, FieldValue::Bool(b)) => self.valid_url = b,
            (Field::Year, FieldValue::Int(n)) => {
                self.year = i32::try_from(n).map_err(|_| invalid(&FieldValue::Int(n)))?;
            }
            (Field::Month, FieldValue::Int(n)) => match u32::try_from(n) {
                Ok(m @ 1..=12) => self.month = m,
                _ => return Err(invalid(&FieldValue::Int(n))),
            },
            (_, other) => return Err(invalid(&other)),
        }
        Ok(())
    }

    /// Short label for log lines, e.g. `"Seoul Library 2023-04"`
    pub fn label(&self) -> String {
        format!("{} {}-{:02}", self.source_name, self.year, self.month)
    }
}

/// Parse a boolean the way dataset files spell it.
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim() {
        "True" | "true" | "TRUE" | "1" => Some(true),
        "False" | "false" | "FALSE" | "0" => Some(false),
        _ => None,
    }
}

/// `True`/`False` on write, lenient on read
mod title_bool {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(if *value { "True" } else { "False" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        let s = String::deserialize(d)?;
        super::parse_bool(&s).ok_or_else(|| D::Error::custom(format!("invalid boolean {s:?}")))
    }
}
