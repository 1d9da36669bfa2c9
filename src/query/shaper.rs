//! Result shaping: bounded previews with true cardinality.
//!
//! The adapter always runs the statement un-paginated; truncation happens
//! here, in-process, so the true total count can still be reported alongside
//! the AI-visible preview. No I/O, no failure modes.

use crate::db::Row;
use serde::Serialize;

/// How many sample values to surface per column.
const SAMPLE_VALUES_PER_COLUMN: usize = 3;

/// A lightweight description of one result column, inferred from the
/// preview rather than from engine metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDescriptor {
    /// Column name, taken from the first preview row's key set.
    pub name: String,
    /// Runtime type of the first preview row's value for this column.
    #[serde(rename = "type")]
    pub inferred_type: &'static str,
    /// Up to three sample values drawn from the first preview rows.
    #[serde(rename = "sampleValues")]
    pub sample_values: Vec<serde_json::Value>,
}

/// The shaped fragment of a query outcome.
#[derive(Debug)]
pub struct ShapedResult {
    pub preview_rows: Vec<Row>,
    pub total_row_count: usize,
    pub returned_row_count: usize,
    pub was_truncated: bool,
    pub inferred_schema: Option<Vec<ColumnDescriptor>>,
}

/// Truncates `rows` to `preview_limit` (a non-positive limit disables
/// truncation) and infers the column schema from the preview.
///
/// Ordering is whatever the engine produced; no re-sorting happens here.
pub fn shape(rows: Vec<Row>, preview_limit: i64) -> ShapedResult {
    let total_row_count = rows.len();

    let preview_rows: Vec<Row> = if preview_limit <= 0 {
        rows
    } else {
        rows.into_iter().take(preview_limit as usize).collect()
    };

    let returned_row_count = preview_rows.len();
    let inferred_schema = if preview_rows.is_empty() {
        None
    } else {
        Some(infer_schema(&preview_rows))
    };

    ShapedResult {
        was_truncated: returned_row_count < total_row_count,
        preview_rows,
        total_row_count,
        returned_row_count,
        inferred_schema,
    }
}

/// Derives column descriptors from the first preview row's own key set,
/// sampling values from the first few preview rows.
fn infer_schema(preview: &[Row]) -> Vec<ColumnDescriptor> {
    let first = &preview[0];

    first
        .iter()
        .map(|(name, value)| ColumnDescriptor {
            name: name.clone(),
            inferred_type: value_type(value),
            sample_values: preview
                .iter()
                .take(SAMPLE_VALUES_PER_COLUMN)
                .filter_map(|row| row.get(name).cloned())
                .collect(),
        })
        .collect()
}

/// Names the runtime type of a JSON value.
fn value_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixture_row;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn numbered_rows(n: usize) -> Vec<Row> {
        (0..n)
            .map(|i| fixture_row(&[("id", json!(i))]))
            .collect()
    }

    #[test]
    fn test_truncates_to_limit_and_keeps_true_total() {
        let shaped = shape(numbered_rows(25), 10);
        assert_eq!(shaped.total_row_count, 25);
        assert_eq!(shaped.returned_row_count, 10);
        assert!(shaped.was_truncated);
        assert_eq!(shaped.preview_rows.len(), 10);
        // Engine order preserved.
        assert_eq!(shaped.preview_rows[0]["id"], json!(0));
        assert_eq!(shaped.preview_rows[9]["id"], json!(9));
    }

    #[test]
    fn test_unbounded_preview() {
        let shaped = shape(numbered_rows(25), -1);
        assert_eq!(shaped.total_row_count, 25);
        assert_eq!(shaped.returned_row_count, 25);
        assert!(!shaped.was_truncated);
    }

    #[test]
    fn test_limit_larger_than_result() {
        let shaped = shape(numbered_rows(3), 10);
        assert_eq!(shaped.returned_row_count, 3);
        assert!(!shaped.was_truncated);
    }

    #[test]
    fn test_limit_equal_to_result_is_not_truncated() {
        let shaped = shape(numbered_rows(10), 10);
        assert_eq!(shaped.returned_row_count, 10);
        assert!(!shaped.was_truncated);
    }

    #[test]
    fn test_empty_result_has_no_schema() {
        let shaped = shape(Vec::new(), 50);
        assert_eq!(shaped.total_row_count, 0);
        assert_eq!(shaped.returned_row_count, 0);
        assert!(!shaped.was_truncated);
        assert!(shaped.inferred_schema.is_none());
    }

    #[test]
    fn test_schema_is_derived_from_preview_not_full_set() {
        let rows = vec![
            fixture_row(&[("a", json!(1)), ("b", json!("x"))]),
            fixture_row(&[("a", json!(2)), ("b", json!("y"))]),
        ];
        let shaped = shape(rows, 1);

        let schema = shaped.inferred_schema.unwrap();
        assert_eq!(schema.len(), 2);

        let a = schema.iter().find(|c| c.name == "a").unwrap();
        assert_eq!(a.inferred_type, "number");
        assert_eq!(a.sample_values, vec![json!(1)]);

        let b = schema.iter().find(|c| c.name == "b").unwrap();
        assert_eq!(b.inferred_type, "string");
        assert_eq!(b.sample_values, vec![json!("x")]);
    }

    #[test]
    fn test_schema_samples_capped_at_three() {
        let shaped = shape(numbered_rows(5), 5);
        let schema = shaped.inferred_schema.unwrap();
        assert_eq!(schema[0].sample_values, vec![json!(0), json!(1), json!(2)]);
    }

    #[test]
    fn test_schema_type_from_first_row_value() {
        let rows = vec![
            fixture_row(&[("v", json!(null))]),
            fixture_row(&[("v", json!(7))]),
        ];
        let schema = shape(rows, 50).inferred_schema.unwrap();
        assert_eq!(schema[0].inferred_type, "null");
    }

    #[test]
    fn test_descriptor_serializes_wire_field_names() {
        let descriptor = ColumnDescriptor {
            name: "a".to_string(),
            inferred_type: "number",
            sample_values: vec![json!(1)],
        };
        let rendered = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(
            rendered,
            json!({"name": "a", "type": "number", "sampleValues": [1]})
        );
    }
}
