//! Labeled CSV input for the training binaries

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use ndarray::{Array2, Axis};

use crate::features::FeatureSchema;

/// Which columns to read and which label marks a normal row
#[derive(Debug, Clone)]
pub struct DatasetSpec {
    pub label_column: String,
    pub normal_label: String,
    pub features: Vec<String>,
}

impl Default for DatasetSpec {
    fn default() -> Self {
        Self {
            label_column: "Class".to_string(),
            normal_label: "0".to_string(),
            features: default_feature_columns(),
        }
    }
}

/// V1..V28 + Amount, the card-transaction layout
pub fn default_feature_columns() -> Vec<String> {
    (1..=28)
        .map(|i| format!("V{}", i))
        .chain(std::iter::once("Amount".to_string()))
        .collect()
}

#[derive(Debug, Clone)]
pub struct LabeledDataset {
    pub schema: FeatureSchema,
    /// One row per CSV record, columns in schema order
    pub features: Array2<f64>,
    pub labels: Vec<String>,
}

impl LabeledDataset {
    pub fn from_csv(path: &Path, spec: &DatasetSpec) -> Result<Self> {
        let reader = csv::Reader::from_path(path)
            .with_context(|| format!("CSV file not found or unreadable: {}", path.display()))?;
        Self::from_reader(reader, spec).with_context(|| format!("while reading {}", path.display()))
    }

    pub fn from_reader<R: std::io::Read>(mut reader: csv::Reader<R>, spec: &DatasetSpec) -> Result<Self> {
        if spec.features.is_empty() {
            bail!("no feature columns selected");
        }

        let headers = reader.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| anyhow!("column '{}' not found", name))
        };

        let feature_idx = spec
            .features
            .iter()
            .map(|name| column(name.as_str()))
            .collect::<Result<Vec<_>>>()?;
        let label_idx = column(spec.label_column.as_str())?;

        let mut values = Vec::new();
        let mut labels = Vec::new();

        for (row, result) in reader.records().enumerate() {
            let record = result?;
            // +2: header line and 1-based numbering
            let line = row + 2;

            for (&idx, name) in feature_idx.iter().zip(&spec.features) {
                let raw = record.get(idx).unwrap_or("").trim();
                let value: f64 = raw
                    .parse()
                    .with_context(|| format!("line {}: column '{}' is not numeric: {:?}", line, name, raw))?;
                if !value.is_finite() {
                    bail!("line {}: column '{}' is not finite", line, name);
                }
                values.push(value);
            }

            labels.push(record.get(label_idx).unwrap_or("").trim().to_string());
        }

        let features = Array2::from_shape_vec((labels.len(), feature_idx.len()), values)?;

        Ok(Self {
            schema: FeatureSchema::new(spec.features.clone()),
            features,
            labels,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Rows whose label equals `normal_label` (numerically when both parse)
    pub fn normal_mask(&self, normal_label: &str) -> Vec<bool> {
        self.labels
            .iter()
            .map(|label| labels_equal(label, normal_label))
            .collect()
    }

    pub fn select(&self, mask: &[bool]) -> Array2<f64> {
        let indices: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(i, &keep)| keep.then_some(i))
            .collect();
        self.features.select(Axis(0), &indices)
    }

    pub fn normal_rows(&self, normal_label: &str) -> Array2<f64> {
        self.select(&self.normal_mask(normal_label))
    }
}

fn labels_equal(a: &str, b: &str) -> bool {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x == y,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "Time,V1,V2,Amount,Class\n\
                       0,1.0,2.0,10.5,0\n\
                       1,-1.0,0.5,3.0,\"1\"\n\
                       2,0.25,0.0,99.0,0.0\n";

    fn spec() -> DatasetSpec {
        DatasetSpec {
            features: vec!["V1".into(), "V2".into(), "Amount".into()],
            ..Default::default()
        }
    }

    fn load(csv: &str, spec: &DatasetSpec) -> Result<LabeledDataset> {
        LabeledDataset::from_reader(csv::Reader::from_reader(csv.as_bytes()), spec)
    }

    #[test]
    fn test_default_columns() {
        let cols = default_feature_columns();
        assert_eq!(cols.len(), 29);
        assert_eq!(cols[0], "V1");
        assert_eq!(cols[27], "V28");
        assert_eq!(cols[28], "Amount");
    }

    #[test]
    fn test_reads_selected_columns_in_order() {
        let data = load(CSV, &spec()).unwrap();
        assert_eq!(data.len(), 3);
        assert_eq!(data.features.row(0).to_vec(), vec![1.0, 2.0, 10.5]);
        assert_eq!(data.schema.names(), &["V1", "V2", "Amount"]);
        assert_eq!(data.labels, vec!["0", "1", "0.0"]);
    }

    #[test]
    fn test_normal_rows_match_numerically() {
        let data = load(CSV, &spec()).unwrap();
        assert_eq!(data.normal_mask("0"), vec![true, false, true]);

        let normal = data.normal_rows("0");
        assert_eq!(normal.nrows(), 2);
        assert_eq!(normal.row(1).to_vec(), vec![0.25, 0.0, 99.0]);
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let spec = DatasetSpec {
            features: vec!["V1".into(), "V9".into()],
            ..Default::default()
        };
        let err = load(CSV, &spec).unwrap_err();
        assert!(err.to_string().contains("V9"));
    }

    #[test]
    fn test_non_numeric_cell_is_an_error() {
        let csv = "V1,V2,Amount,Class\n1.0,abc,2.0,0\n";
        assert!(load(csv, &spec()).is_err());
    }
}
