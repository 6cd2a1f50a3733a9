//! Request alignment - inbound key/value records to a schema-ordered matrix

use std::collections::HashMap;

use ndarray::Array2;
use serde_json::Value;

use super::FeatureSchema;
use crate::error::ServingError;

/// One entity to score. Keys outside the schema are ignored.
pub type InboundRecord = HashMap<String, Value>;

/// Build a `(records, schema.len())` matrix in schema column order.
///
/// Absent features (and explicit `null`) become 0.0. An empty slice yields a
/// matrix with zero rows.
pub fn align(records: &[InboundRecord], schema: &FeatureSchema) -> Result<Array2<f64>, ServingError> {
    let cols = schema.len();
    let mut data = Vec::with_capacity(records.len() * cols);

    for record in records {
        for name in schema.names() {
            let value = match record.get(name) {
                Some(v) => coerce(name, v)?,
                None => 0.0,
            };
            data.push(value);
        }
    }

    Array2::from_shape_vec((records.len(), cols), data)
        .map_err(|e| ServingError::Inference(format!("Array error: {}", e)))
}

fn coerce(feature: &str, value: &Value) -> Result<f64, ServingError> {
    let parsed = match value {
        Value::Null => Some(0.0),
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Array(_) | Value::Object(_) => None,
    };

    // f64 parsing accepts "NaN" and "inf"
    parsed.filter(|v| v.is_finite()).ok_or_else(|| ServingError::NonNumeric {
        feature: feature.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> FeatureSchema {
        FeatureSchema::parse("V1\nV2\nAmount\n")
    }

    fn record(value: Value) -> InboundRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_missing_feature_defaults_to_zero() {
        let rows = align(&[record(json!({"V1": 1.0, "Amount": 50.0}))], &schema()).unwrap();
        assert_eq!(rows.shape(), &[1, 3]);
        assert_eq!(rows.row(0).to_vec(), vec![1.0, 0.0, 50.0]);
    }

    #[test]
    fn test_extra_keys_are_dropped() {
        let with_extra = align(&[record(json!({"V1": 1.0, "Unrelated": 99.0}))], &schema()).unwrap();
        let without = align(&[record(json!({"V1": 1.0}))], &schema()).unwrap();
        assert_eq!(with_extra, without);
    }

    #[test]
    fn test_rows_follow_input_order() {
        let rows = align(
            &[record(json!({"V2": 2.0})), record(json!({"V1": -1.0, "V2": 3.5}))],
            &schema(),
        )
        .unwrap();
        assert_eq!(rows.row(0).to_vec(), vec![0.0, 2.0, 0.0]);
        assert_eq!(rows.row(1).to_vec(), vec![-1.0, 3.5, 0.0]);
    }

    #[test]
    fn test_empty_records_give_zero_rows() {
        let rows = align(&[], &schema()).unwrap();
        assert_eq!(rows.shape(), &[0, 3]);
    }

    #[test]
    fn test_coercion() {
        let rows = align(&[record(json!({"V1": "2.5", "V2": true, "Amount": null}))], &schema()).unwrap();
        assert_eq!(rows.row(0).to_vec(), vec![2.5, 1.0, 0.0]);
    }

    #[test]
    fn test_non_numeric_value_fails() {
        let err = align(&[record(json!({"V1": "abc"}))], &schema()).unwrap_err();
        assert!(matches!(err, ServingError::NonNumeric { ref feature, .. } if feature == "V1"));

        let err = align(&[record(json!({"Amount": [1, 2]}))], &schema()).unwrap_err();
        assert!(matches!(err, ServingError::NonNumeric { .. }));
    }

    #[test]
    fn test_non_finite_strings_fail() {
        for raw in ["NaN", "inf", "-inf", "infinity"] {
            let err = align(&[record(json!({ "V2": raw }))], &schema()).unwrap_err();
            assert!(
                matches!(err, ServingError::NonNumeric { ref feature, .. } if feature == "V2"),
                "{} was accepted",
                raw
            );
        }
    }
}
