use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Идентификатор строки, который назначает хранилище.
///
/// PostgREST отдаёт `bigint`-ключи числами, а `uuid` строками, поэтому
/// внутри всегда держим строку.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RowId(String);

impl RowId {
    pub fn new(id: impl Into<String>) -> Self {
        RowId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Достаёт `id` из JSON-строки таблицы.
    pub fn from_row(row: &Value) -> Option<RowId> {
        match row.get("id")? {
            Value::String(s) => Some(RowId(s.clone())),
            Value::Number(n) => Some(RowId(n.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RowId {
    fn from(id: &str) -> Self {
        RowId(id.to_string())
    }
}

impl From<String> for RowId {
    fn from(id: String) -> Self {
        RowId(id)
    }
}

impl From<i64> for RowId {
    fn from(id: i64) -> Self {
        RowId(id.to_string())
    }
}

impl<'de> Deserialize<'de> for RowId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => RowId(s),
            Raw::Signed(n) => RowId(n.to_string()),
            Raw::Unsigned(n) => RowId(n.to_string()),
        })
    }
}
