//! SignalTable: one time column plus named numeric columns, column-major.
//!
//! Missing values are stored as `NaN`. Rows are kept sorted by time by the
//! ingest engine; the table itself only sorts when asked to.

use std::cmp::Ordering;

use crate::error::MergeError;

/// Name the first column of every source is relabelled to.
pub const TIME_COLUMN: &str = "Time";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalTable {
    time: Vec<f64>,
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl SignalTable {
    /// Empty table with the given non-time columns.
    pub fn new(names: Vec<String>) -> Self {
        let columns = vec![Vec::new(); names.len()];
        Self {
            time: Vec::new(),
            names,
            columns,
        }
    }

    /// Build from column vectors. Every column must match `time` in length.
    pub fn from_columns(
        time: Vec<f64>,
        names: Vec<String>,
        columns: Vec<Vec<f64>>,
    ) -> Result<Self, MergeError> {
        if names.len() != columns.len() {
            return Err(MergeError::ColumnLengthMismatch {
                column: TIME_COLUMN.to_string(),
                expected: names.len(),
                found: columns.len(),
            });
        }
        for (name, col) in names.iter().zip(columns.iter()) {
            if col.len() != time.len() {
                return Err(MergeError::ColumnLengthMismatch {
                    column: name.clone(),
                    expected: time.len(),
                    found: col.len(),
                });
            }
        }
        Ok(Self {
            time,
            names,
            columns,
        })
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    /// Non-time column names in table order.
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    /// Column count including the time column.
    pub fn width(&self) -> usize {
        self.names.len() + 1
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.position(name).map(|i| self.columns[i].as_slice())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Append one row. Missing trailing values become `NaN`, extra values are dropped.
    pub fn push_row(&mut self, t: f64, values: &[f64]) {
        self.time.push(t);
        for (i, col) in self.columns.iter_mut().enumerate() {
            col.push(values.get(i).copied().unwrap_or(f64::NAN));
        }
    }

    /// Row `i` as `(time, values)`.
    pub fn row(&self, i: usize) -> Option<(f64, Vec<f64>)> {
        let t = *self.time.get(i)?;
        Some((t, self.columns.iter().map(|c| c[i]).collect()))
    }

    /// Add a column filled with `NaN` if it does not exist yet.
    fn ensure_column(&mut self, name: &str) -> usize {
        match self.position(name) {
            Some(i) => i,
            None => {
                self.names.push(name.to_string());
                self.columns.push(vec![f64::NAN; self.time.len()]);
                self.names.len() - 1
            }
        }
    }

    /// Same set of non-time columns, ignoring order.
    pub fn same_columns(&self, other: &SignalTable) -> bool {
        self.names.len() == other.names.len()
            && other.names.iter().all(|n| self.position(n).is_some())
    }

    pub fn is_sorted_by_time(&self) -> bool {
        self.time
            .windows(2)
            .all(|w| w[0].total_cmp(&w[1]) != Ordering::Greater)
    }

    /// Stable sort of all rows by time.
    pub fn sort_by_time(&mut self) {
        if self.is_sorted_by_time() {
            return;
        }
        let mut order: Vec<usize> = (0..self.time.len()).collect();
        order.sort_by(|&a, &b| self.time[a].total_cmp(&self.time[b]));
        self.time = order.iter().map(|&i| self.time[i]).collect();
        for col in self.columns.iter_mut() {
            *col = order.iter().map(|&i| col[i]).collect();
        }
    }

    /// Rows `start..` as a new table with the same columns.
    pub fn slice_from(&self, start: usize) -> SignalTable {
        let start = start.min(self.time.len());
        SignalTable {
            time: self.time[start..].to_vec(),
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c[start..].to_vec()).collect(),
        }
    }

    /// Append the rows of `other`, matching columns by name.
    ///
    /// Columns present on only one side are padded with `NaN`.
    pub fn append(&mut self, other: &SignalTable) {
        let before = self.time.len();
        self.time.extend_from_slice(&other.time);
        for (name, col) in other.names.iter().zip(other.columns.iter()) {
            let i = self.ensure_column(name);
            let dst = &mut self.columns[i];
            dst.truncate(before);
            dst.extend_from_slice(col);
        }
        let len = self.time.len();
        for col in self.columns.iter_mut() {
            col.resize(len, f64::NAN);
        }
    }

    /// Full outer join keyed on time.
    ///
    /// Rows with equal time are paired in order of appearance. Where both sides
    /// carry a column, `newer` wins unless its value is missing.
    pub fn outer_join(&self, newer: &SignalTable) -> Result<SignalTable, MergeError> {
        if self.time.iter().chain(newer.time.iter()).any(|t| !t.is_finite()) {
            return Err(MergeError::TimeKeyNotFinite);
        }
        let mut left = self.clone();
        left.sort_by_time();
        let mut right = newer.clone();
        right.sort_by_time();

        let mut names = left.names.clone();
        for n in &right.names {
            if !names.contains(n) {
                names.push(n.clone());
            }
        }
        let left_map: Vec<Option<usize>> = names.iter().map(|n| left.position(n)).collect();
        let right_map: Vec<Option<usize>> = names.iter().map(|n| right.position(n)).collect();

        let mut out = SignalTable::new(names);
        let mut values = vec![f64::NAN; out.names.len()];
        let (mut i, mut j) = (0, 0);
        while i < left.len() || j < right.len() {
            let take = match (left.time.get(i), right.time.get(j)) {
                (Some(a), Some(b)) => a.total_cmp(b),
                (Some(_), None) => Ordering::Less,
                (None, _) => Ordering::Greater,
            };
            values.fill(f64::NAN);
            let t = match take {
                Ordering::Less => {
                    fill(&mut values, &left, &left_map, i);
                    i += 1;
                    left.time[i - 1]
                }
                Ordering::Greater => {
                    fill(&mut values, &right, &right_map, j);
                    j += 1;
                    right.time[j - 1]
                }
                Ordering::Equal => {
                    fill(&mut values, &left, &left_map, i);
                    fill(&mut values, &right, &right_map, j);
                    i += 1;
                    j += 1;
                    right.time[j - 1]
                }
            };
            out.push_row(t, &values);
        }
        Ok(out)
    }

    pub fn first_time(&self) -> Option<f64> {
        self.time.first().copied()
    }

    pub fn last_time(&self) -> Option<f64> {
        self.time.last().copied()
    }

    /// Rows per unit of time: `(rows - 1) / (last - first)`, `0.0` for a zero span.
    pub fn rate(&self) -> f64 {
        match (self.first_time(), self.last_time()) {
            (Some(first), Some(last)) if last > first && self.len() > 1 => {
                (self.len() - 1) as f64 / (last - first)
            }
            _ => 0.0,
        }
    }

    /// Drop rows whose time is not finite.
    pub fn retain_finite_time(&mut self) {
        if self.time.iter().all(|t| t.is_finite()) {
            return;
        }
        let keep: Vec<bool> = self.time.iter().map(|t| t.is_finite()).collect();
        let filter = |v: &mut Vec<f64>| {
            let mut k = keep.iter();
            v.retain(|_| *k.next().unwrap_or(&false));
        };
        filter(&mut self.time);
        for col in self.columns.iter_mut() {
            filter(col);
        }
    }
}

/// Copy row `row` of `src` into `values` through the column map, skipping missing cells.
fn fill(values: &mut [f64], src: &SignalTable, map: &[Option<usize>], row: usize) {
    for (slot, idx) in values.iter_mut().zip(map.iter()) {
        if let Some(c) = idx {
            let v = src.columns[*c][row];
            if !v.is_nan() {
                *slot = v;
            }
        }
    }
}
