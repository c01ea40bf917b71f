use std::collections::HashSet;
use std::fmt;

use serde_json::{Number, Value};

use crate::error::ShapeError;

/// A JSON object with keys in column order, ready for upsert.
pub type Record = serde_json::Map<String, Value>;

/// A single value in a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Cell::Null,
            Value::Bool(b) => Cell::Int(*b as i64),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Cell::Int(i),
                None => n.as_f64().map_or(Cell::Null, Cell::Float),
            },
            Value::String(s) => Cell::Text(s.clone()),
            other => Cell::Text(other.to_string()),
        }
    }

    /// Non-finite floats have no JSON form and become null.
    pub fn to_json(&self) -> Value {
        match self {
            Cell::Null => Value::Null,
            Cell::Int(i) => Value::from(*i),
            Cell::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            Cell::Text(s) => Value::String(s.clone()),
        }
    }

    pub fn is_nan(&self) -> bool {
        matches!(self, Cell::Float(f) if f.is_nan())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Int(i) => write!(f, "{}", i),
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<i64> for Cell {
    fn from(i: i64) -> Self {
        Cell::Int(i)
    }
}

impl From<f64> for Cell {
    fn from(f: f64) -> Self {
        Cell::Float(f)
    }
}

/// Column-ordered table of cells, the in-memory shape of a stats result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Frame {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self, ShapeError> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(ShapeError::RowWidth {
                    row: i,
                    expected: columns.len(),
                    found: row.len(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Result<usize, ShapeError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| ShapeError::MissingColumn(name.to_string()))
    }

    /// Set `name` to `value` on every row, appending the column if absent.
    pub fn with_constant(mut self, name: &str, value: Cell) -> Self {
        match self.columns.iter().position(|c| c == name) {
            Some(idx) => {
                for row in &mut self.rows {
                    row[idx] = value.clone();
                }
            }
            None => {
                self.columns.push(name.to_string());
                for row in &mut self.rows {
                    row.push(value.clone());
                }
            }
        }
        self
    }

    /// Stack frames vertically. Columns are the union in first-seen order and
    /// cells a frame does not have are filled with NaN.
    pub fn concat(frames: Vec<Frame>) -> Frame {
        let mut columns: Vec<String> = Vec::new();
        for frame in &frames {
            for col in &frame.columns {
                if !columns.contains(col) {
                    columns.push(col.clone());
                }
            }
        }

        let mut rows = Vec::with_capacity(frames.iter().map(Frame::len).sum());
        for frame in frames {
            let positions: Vec<Option<usize>> = columns
                .iter()
                .map(|c| frame.columns.iter().position(|fc| fc == c))
                .collect();
            for mut row in frame.rows {
                let out = positions
                    .iter()
                    .map(|pos| match pos {
                        Some(i) => std::mem::replace(&mut row[*i], Cell::Null),
                        None => Cell::Float(f64::NAN),
                    })
                    .collect();
                rows.push(out);
            }
        }

        Frame { columns, rows }
    }

    /// Rename columns by `(from, to)` pairs. Pairs whose source column is
    /// absent are ignored.
    pub fn rename(mut self, map: &[(&str, &str)]) -> Result<Frame, ShapeError> {
        for col in &mut self.columns {
            if let Some((_, to)) = map.iter().find(|(from, _)| *from == col.as_str()) {
                *col = (*to).to_string();
            }
        }

        let mut seen = HashSet::new();
        for col in &self.columns {
            if !seen.insert(col.as_str()) {
                return Err(ShapeError::DuplicateColumn(col.clone()));
            }
        }
        Ok(self)
    }

    /// Restrict to `columns`, in that order.
    pub fn select(&self, columns: &[&str]) -> Result<Frame, ShapeError> {
        let idx = columns
            .iter()
            .map(|c| self.column_index(c))
            .collect::<Result<Vec<_>, _>>()?;

        let rows = self
            .rows
            .iter()
            .map(|row| idx.iter().map(|&i| row[i].clone()).collect())
            .collect();

        Ok(Frame {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        })
    }

    pub fn map_column<F>(mut self, name: &str, mut f: F) -> Result<Frame, ShapeError>
    where
        F: FnMut(&Cell) -> Result<Cell, ShapeError>,
    {
        let idx = self.column_index(name)?;
        for row in &mut self.rows {
            row[idx] = f(&row[idx])?;
        }
        Ok(self)
    }

    /// Keep rows for which `keep` returns true. The closure sees the cell in
    /// column `name`.
    pub fn filter_by<F>(mut self, name: &str, mut keep: F) -> Result<Frame, ShapeError>
    where
        F: FnMut(&Cell) -> bool,
    {
        let idx = self.column_index(name)?;
        self.rows.retain(|row| keep(&row[idx]));
        Ok(self)
    }

    /// Drop rows repeating an earlier row's values in `subset`; the first wins.
    pub fn drop_duplicates(mut self, subset: &[&str]) -> Result<Frame, ShapeError> {
        let idx = subset
            .iter()
            .map(|c| self.column_index(c))
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen: HashSet<Vec<Cell>> = HashSet::new();
        self.rows.retain(|row| {
            let key: Vec<Cell> = idx.iter().map(|&i| row[i].clone()).collect();
            seen.insert(key)
        });
        Ok(self)
    }

    pub fn replace_nan_with_null(mut self) -> Frame {
        for cell in self.rows.iter_mut().flatten() {
            if cell.is_nan() {
                *cell = Cell::Null;
            }
        }
        self
    }

    pub fn to_records(&self) -> Vec<Record> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row)
                    .map(|(col, cell)| (col.clone(), cell.to_json()))
                    .collect()
            })
            .collect()
    }
}

// Hashing is only used for duplicate detection, which runs after NaN cleanup.
impl Eq for Cell {}

impl std::hash::Hash for Cell {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Cell::Null => {}
            Cell::Int(i) => i.hash(state),
            Cell::Float(f) => f.to_bits().hash(state),
            Cell::Text(s) => s.hash(state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(columns: &[&str], rows: Vec<Vec<Cell>>) -> Frame {
        Frame::new(columns.iter().map(|c| c.to_string()).collect(), rows).unwrap()
    }

    #[test]
    fn test_new_rejects_ragged_rows() {
        let err = Frame::new(
            vec!["A".into(), "B".into()],
            vec![vec![Cell::Int(1)]],
        )
        .unwrap_err();
        assert_eq!(err, ShapeError::RowWidth { row: 0, expected: 2, found: 1 });
    }

    #[test]
    fn test_concat_fills_missing_with_nan() {
        let a = frame(&["A", "B"], vec![vec![Cell::Int(1), "x".into()]]);
        let b = frame(&["B", "C"], vec![vec!["y".into(), 2.5.into()]]);

        let out = Frame::concat(vec![a, b]);
        assert_eq!(out.columns(), &["A", "B", "C"]);
        assert_eq!(out.len(), 2);
        assert!(out.rows()[0][2].is_nan());
        assert!(out.rows()[1][0].is_nan());
        assert_eq!(out.rows()[1][1], Cell::from("y"));
    }

    #[test]
    fn test_rename_ignores_absent_and_rejects_collisions() {
        let f = frame(&["A", "B"], vec![]);
        let renamed = f.clone().rename(&[("A", "a"), ("Z", "z")]).unwrap();
        assert_eq!(renamed.columns(), &["a", "B"]);

        let err = f.rename(&[("A", "B")]).unwrap_err();
        assert_eq!(err, ShapeError::DuplicateColumn("B".into()));
    }

    #[test]
    fn test_select_reorders_and_reports_missing() {
        let f = frame(&["A", "B", "C"], vec![vec![Cell::Int(1), Cell::Int(2), Cell::Int(3)]]);
        let out = f.select(&["C", "A"]).unwrap();
        assert_eq!(out.columns(), &["C", "A"]);
        assert_eq!(out.rows()[0], vec![Cell::Int(3), Cell::Int(1)]);

        assert_eq!(
            f.select(&["D"]).unwrap_err(),
            ShapeError::MissingColumn("D".into())
        );
    }

    #[test]
    fn test_drop_duplicates_keeps_first() {
        let f = frame(
            &["K1", "K2", "V"],
            vec![
                vec![Cell::Int(1), Cell::Int(10), "first".into()],
                vec![Cell::Int(1), Cell::Int(11), "other".into()],
                vec![Cell::Int(1), Cell::Int(10), "second".into()],
            ],
        );
        let out = f.drop_duplicates(&["K1", "K2"]).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out.rows()[0][2], Cell::from("first"));
        assert_eq!(out.rows()[1][2], Cell::from("other"));
    }

    #[test]
    fn test_records_keep_column_order_and_null_out_nan() {
        let f = frame(
            &["z", "a", "m"],
            vec![vec![Cell::Int(1), f64::NAN.into(), "t".into()]],
        );
        let records = f.replace_nan_with_null().to_records();
        let keys: Vec<&str> = records[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
        assert_eq!(records[0]["a"], Value::Null);
    }

    #[test]
    fn test_with_constant_overwrites_existing_column() {
        let f = frame(&["A"], vec![vec![Cell::Int(1)], vec![Cell::Int(2)]]);
        let f = f.with_constant("B", "x".into()).with_constant("A", Cell::Null);
        assert_eq!(f.columns(), &["A", "B"]);
        assert!(f.rows().iter().all(|r| r[0] == Cell::Null && r[1] == Cell::from("x")));
    }
}
