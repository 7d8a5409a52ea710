//! Row sources.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::campaign::{FieldMap, SourceRow};

/// Row id of the first data row; row 1 is the header in a sheet.
pub const FIRST_ROW_ID: u32 = 2;

#[derive(Debug, Error)]
pub enum RowSourceError {
    #[error("Failed to read rows: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid row data: {0}")]
    Parse(String),
}

/// Supplies ordered `(row_id, fields)` pairs.
#[async_trait]
pub trait RowSource: Send + Sync {
    async fn rows(&self) -> Result<Vec<SourceRow>, RowSourceError>;
}

/// Rows held in memory, parsed from JSON.
///
/// Accepts an array of field objects (ids assigned from [`FIRST_ROW_ID`]) or
/// an array of `{"row": n, "fields": {..}}` objects. The two forms may be
/// mixed; implicit ids continue from the previous row. Row ids must be
/// unique.
#[derive(Debug, Clone, Default)]
pub struct JsonRowSource {
    rows: Vec<SourceRow>,
}

impl JsonRowSource {
    pub fn new(rows: Vec<SourceRow>) -> Self {
        Self { rows }
    }

    pub fn parse(json: &str) -> Result<Self, RowSourceError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| RowSourceError::Parse(e.to_string()))?;
        Self::from_value(value)
    }

    pub async fn from_path(path: &Path) -> Result<Self, RowSourceError> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::parse(&json)
    }

    pub fn from_value(value: Value) -> Result<Self, RowSourceError> {
        let Value::Array(items) = value else {
            return Err(RowSourceError::Parse("expected a JSON array of rows".to_string()));
        };

        let mut rows = Vec::with_capacity(items.len());
        let mut seen = HashSet::with_capacity(items.len());
        let mut next_id = Some(FIRST_ROW_ID);
        for (position, item) in items.into_iter().enumerate() {
            let Value::Object(mut object) = item else {
                return Err(RowSourceError::Parse(format!(
                    "row at position {} is not an object",
                    position
                )));
            };

            let explicit = match (object.get("row"), object.get("fields")) {
                (Some(row), Some(Value::Object(_))) => Some(row_id(row, position)?),
                _ => None,
            };
            let (id, fields) = match explicit {
                Some(id) => {
                    let fields = match object.remove("fields") {
                        Some(Value::Object(fields)) => fields,
                        _ => Default::default(),
                    };
                    (id, fields)
                }
                None => {
                    let id = next_id.ok_or_else(|| {
                        RowSourceError::Parse(format!("row id overflow at position {}", position))
                    })?;
                    (id, object)
                }
            };

            if !seen.insert(id) {
                return Err(RowSourceError::Parse(format!(
                    "duplicate row id {} at position {}",
                    id, position
                )));
            }
            rows.push(SourceRow::new(id, to_field_map(fields)));
            next_id = id.checked_add(1);
        }
        Ok(Self { rows })
    }
}

fn row_id(value: &Value, position: usize) -> Result<u32, RowSourceError> {
    value
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| RowSourceError::Parse(format!("invalid row id at position {}", position)))
}

fn to_field_map(object: serde_json::Map<String, Value>) -> FieldMap {
    object
        .into_iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::String(s) => s,
                Value::Null => return None,
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                other => other.to_string(),
            };
            Some((key, text))
        })
        .collect()
}

#[async_trait]
impl RowSource for JsonRowSource {
    async fn rows(&self) -> Result<Vec<SourceRow>, RowSourceError> {
        Ok(self.rows.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_implicit_row_ids() {
        let source = JsonRowSource::parse(
            r#"[{"Topic": "Solar", "Budget": 25}, {"Topic": "Wind", "Notes": null}]"#,
        )
        .unwrap();
        let rows = source.rows().await.unwrap();

        assert_eq!(rows[0].row_id, 2);
        assert_eq!(rows[1].row_id, 3);
        assert_eq!(rows[0].fields.get("Budget").map(String::as_str), Some("25"));
        assert!(!rows[1].fields.contains_key("Notes"));
    }

    #[tokio::test]
    async fn test_explicit_row_ids() {
        let source = JsonRowSource::parse(
            r#"[{"row": 7, "fields": {"Topic": "Solar"}}, {"Topic": "Wind"}]"#,
        )
        .unwrap();
        let rows = source.rows().await.unwrap();

        assert_eq!(rows[0].row_id, 7);
        assert_eq!(rows[0].fields.get("Topic").map(String::as_str), Some("Solar"));
        assert_eq!(rows[1].row_id, 8);
    }

    #[test]
    fn test_rejects_non_array() {
        assert!(matches!(
            JsonRowSource::parse(r#"{"Topic": "Solar"}"#),
            Err(RowSourceError::Parse(_))
        ));
        assert!(JsonRowSource::parse("[1]").is_err());
    }

    #[test]
    fn test_rejects_duplicate_row_ids() {
        let result = JsonRowSource::parse(
            r#"[{"Topic": "Solar"}, {"row": 2, "fields": {"Topic": "Wind"}}]"#,
        );
        match result {
            Err(RowSourceError::Parse(message)) => {
                assert!(message.contains("duplicate row id 2"), "{message}")
            }
            other => panic!("expected duplicate id error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_largest_row_id_is_accepted_once() {
        let source =
            JsonRowSource::parse(r#"[{"row": 4294967295, "fields": {"Topic": "Solar"}}]"#)
                .unwrap();
        assert_eq!(source.rows().await.unwrap()[0].row_id, u32::MAX);

        let result = JsonRowSource::parse(
            r#"[{"row": 4294967295, "fields": {"Topic": "Solar"}}, {"Topic": "Wind"}]"#,
        );
        assert!(matches!(result, Err(RowSourceError::Parse(_))));
    }
}
