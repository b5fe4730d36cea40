//! Column-ordered tabular features.
//!
//! The classifiers were trained against an exact column order, so the frame
//! keeps columns as an ordered list and every reordering goes through
//! [`FeatureFrame::select`], which rejects missing columns instead of silently
//! proceeding with a partial feature set.

pub mod aligner;
pub mod schema;

use std::fmt;

/// A single feature cell. Nulls are explicit because the categorical coercion
/// step must map them to the literal string `"nan"`, matching what the models
/// saw at training time.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

impl FeatureValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FeatureValue::Null)
    }

    /// String form fed to the model for categorical columns. Nulls become
    /// `"nan"`, the same token the training-time preprocessing produced.
    pub fn model_string(&self) -> String {
        match self {
            FeatureValue::Int(v) => v.to_string(),
            FeatureValue::Float(v) => v.to_string(),
            FeatureValue::Text(v) => v.clone(),
            FeatureValue::Null => "nan".to_string(),
        }
    }

    /// Numeric form for model input; non-numeric and null cells are NaN.
    pub fn as_f32(&self) -> f32 {
        match self {
            FeatureValue::Int(v) => *v as f32,
            FeatureValue::Float(v) => *v as f32,
            FeatureValue::Text(_) | FeatureValue::Null => f32::NAN,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FeatureValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.model_string())
    }
}

/// Post-indexed feature table with an explicit column order.
#[derive(Debug, Clone, Default)]
pub struct FeatureFrame {
    columns: Vec<String>,
    index: Vec<i64>,
    rows: Vec<Vec<FeatureValue>>,
}

impl FeatureFrame {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            index: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, post_id: i64, values: Vec<FeatureValue>) {
        debug_assert_eq!(values.len(), self.columns.len());
        self.index.push(post_id);
        self.rows.push(values);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Post ids, in row order.
    pub fn index(&self) -> &[i64] {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, i: usize) -> &[FeatureValue] {
        &self.rows[i]
    }

    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&FeatureValue> {
        let pos = self.column_position(column)?;
        self.rows.get(row).map(|r| &r[pos])
    }

    /// Copy of the frame without the named columns; unknown names are ignored.
    pub fn without_columns(&self, drop: &[&str]) -> FeatureFrame {
        let keep: Vec<usize> = (0..self.columns.len())
            .filter(|&i| !drop.contains(&self.columns[i].as_str()))
            .collect();
        FeatureFrame {
            columns: keep.iter().map(|&i| self.columns[i].clone()).collect(),
            index: self.index.clone(),
            rows: self
                .rows
                .iter()
                .map(|row| keep.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        }
    }

    /// Set `column` to the same value in every row, appending the column if it
    /// does not exist yet. This is how the singular user feature row is
    /// replicated across all candidate posts.
    pub fn broadcast(&mut self, column: &str, value: FeatureValue) {
        match self.column_position(column) {
            Some(pos) => {
                for row in &mut self.rows {
                    row[pos] = value.clone();
                }
            }
            None => {
                self.columns.push(column.to_string());
                for row in &mut self.rows {
                    row.push(value.clone());
                }
            }
        }
    }

    /// Reorder and restrict to exactly `ordered`. Fails with the full list of
    /// absent columns; scoring with a partially aligned frame is never allowed.
    pub fn select(&self, ordered: &[&str]) -> Result<FeatureFrame, Vec<String>> {
        let mut positions = Vec::with_capacity(ordered.len());
        let mut missing = Vec::new();
        for &name in ordered {
            match self.column_position(name) {
                Some(pos) => positions.push(pos),
                None => missing.push(name.to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(missing);
        }
        Ok(FeatureFrame {
            columns: ordered.iter().map(|c| c.to_string()).collect(),
            index: self.index.clone(),
            rows: self
                .rows
                .iter()
                .map(|row| positions.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        })
    }

    /// Coerce the named columns to their string form in place, nulls included
    /// (they become `"nan"`). Unknown names are ignored.
    pub fn stringify_columns(&mut self, columns: &[&str]) {
        for &name in columns {
            if let Some(pos) = self.column_position(name) {
                for row in &mut self.rows {
                    row[pos] = FeatureValue::Text(row[pos].model_string());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> FeatureFrame {
        let mut f = FeatureFrame::new(vec!["a".into(), "b".into(), "c".into()]);
        f.push_row(
            1,
            vec![
                FeatureValue::Int(10),
                FeatureValue::Float(0.5),
                FeatureValue::Text("x".into()),
            ],
        );
        f.push_row(
            2,
            vec![
                FeatureValue::Int(20),
                FeatureValue::Null,
                FeatureValue::Text("y".into()),
            ],
        );
        f
    }

    #[test]
    fn select_reorders_columns_exactly() {
        let out = frame().select(&["c", "a"]).unwrap();
        assert_eq!(out.columns(), &["c".to_string(), "a".to_string()]);
        assert_eq!(out.value(0, "a"), Some(&FeatureValue::Int(10)));
        assert_eq!(out.index(), &[1, 2]);
    }

    #[test]
    fn select_reports_every_missing_column() {
        let err = frame().select(&["a", "age", "os"]).unwrap_err();
        assert_eq!(err, vec!["age".to_string(), "os".to_string()]);
    }

    #[test]
    fn broadcast_replicates_one_value_per_row() {
        let mut f = frame();
        f.broadcast("city", FeatureValue::Text("riga".into()));
        assert_eq!(f.value(0, "city"), Some(&FeatureValue::Text("riga".into())));
        assert_eq!(f.value(1, "city"), Some(&FeatureValue::Text("riga".into())));

        // Broadcasting over an existing column overwrites it.
        f.broadcast("a", FeatureValue::Int(7));
        assert_eq!(f.value(1, "a"), Some(&FeatureValue::Int(7)));
        assert_eq!(f.columns().len(), 4);
    }

    #[test]
    fn stringify_maps_null_to_nan_literal() {
        let mut f = frame();
        f.stringify_columns(&["b"]);
        assert_eq!(f.value(0, "b"), Some(&FeatureValue::Text("0.5".into())));
        assert_eq!(f.value(1, "b"), Some(&FeatureValue::Text("nan".into())));
    }

    #[test]
    fn without_columns_keeps_order_of_the_rest() {
        let out = frame().without_columns(&["b", "missing"]);
        assert_eq!(out.columns(), &["a".to_string(), "c".to_string()]);
        assert_eq!(out.row(0).len(), 2);
    }
}
