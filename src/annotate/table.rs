use crate::core::paths::write_atomic;
use crate::{AnnotError, Result};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;
use std::path::Path;

/// How a column join treats columns present on both sides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnCollision {
    /// Refuse with a usage error naming the columns
    Refuse,
    /// The right-hand table's cells win for the rows it carries
    Overwrite,
}

/// Row-indexed, column-ordered table of annotation text.
///
/// Rows are keyed by their global gene id (`<batch>_<gene>`). Every row has a
/// cell for every column; absent values are `None` and serialize as empty TSV
/// fields. Row and column order are insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationTable {
    columns: IndexSet<String>,
    rows: IndexMap<String, Vec<Option<String>>>,
}

impl AnnotationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for column in columns {
            table.add_column(&column.into());
        }
        table
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    pub fn row_ids(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    pub fn contains_row(&self, row: &str) -> bool {
        self.rows.contains_key(row)
    }

    /// Add a column if it is not present yet. Existing rows get `None`.
    pub fn add_column(&mut self, column: &str) -> usize {
        if let Some(idx) = self.columns.get_index_of(column) {
            return idx;
        }
        let (idx, _) = self.columns.insert_full(column.to_string());
        for cells in self.rows.values_mut() {
            cells.push(None);
        }
        idx
    }

    /// Add a row if it is not present yet, with every cell empty.
    pub fn add_row(&mut self, row: &str) {
        if !self.rows.contains_key(row) {
            self.rows.insert(row.to_string(), vec![None; self.columns.len()]);
        }
    }

    /// Set a cell, creating the row and column as needed.
    pub fn set(&mut self, row: &str, column: &str, value: impl Into<String>) {
        self.set_cell(row, column, Some(value.into()));
    }

    /// Set or clear a cell. Empty text is stored as `None`.
    pub fn set_cell(&mut self, row: &str, column: &str, value: Option<String>) {
        let idx = self.add_column(column);
        self.add_row(row);
        if let Some(cells) = self.rows.get_mut(row) {
            cells[idx] = value.filter(|v| !v.is_empty());
        }
    }

    pub fn get(&self, row: &str, column: &str) -> Option<&str> {
        let idx = self.columns.get_index_of(column)?;
        self.rows.get(row)?[idx].as_deref()
    }

    /// Cells of one row in column order
    pub fn row(&self, row: &str) -> Option<Vec<(&str, Option<&str>)>> {
        let cells = self.rows.get(row)?;
        Some(
            self.columns
                .iter()
                .zip(cells)
                .map(|(c, v)| (c.as_str(), v.as_deref()))
                .collect(),
        )
    }

    /// Rows with a value in `column`, as `(row id, value)` pairs
    pub fn values(&self, column: &str) -> Vec<(&str, &str)> {
        let Some(idx) = self.columns.get_index_of(column) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .filter_map(|(row, cells)| cells[idx].as_deref().map(|v| (row.as_str(), v)))
            .collect()
    }

    /// Set `column` to `value` on every row
    pub fn fill_column(&mut self, column: &str, value: &str) {
        let idx = self.add_column(column);
        for cells in self.rows.values_mut() {
            cells[idx] = Some(value.to_string()).filter(|v| !v.is_empty());
        }
    }

    pub fn drop_columns<S: AsRef<str>>(&mut self, columns: &[S]) {
        let drop: HashSet<&str> = columns.iter().map(AsRef::as_ref).collect();
        let keep: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !drop.contains(c.as_str()))
            .map(|(i, _)| i)
            .collect();
        if keep.len() == self.columns.len() {
            return;
        }
        let columns: IndexSet<String> = keep
            .iter()
            .filter_map(|&i| self.columns.get_index(i).cloned())
            .collect();
        self.columns = columns;
        for cells in self.rows.values_mut() {
            let kept: Vec<Option<String>> = keep.iter().map(|&i| cells[i].take()).collect();
            *cells = kept;
        }
    }

    pub fn rename_column(&mut self, from: &str, to: &str) -> Result<()> {
        if from == to || !self.columns.contains(from) {
            return Ok(());
        }
        if self.columns.contains(to) {
            return Err(AnnotError::Usage(format!(
                "cannot rename column {} to {}: column already exists",
                from, to
            )));
        }
        let columns: IndexSet<String> = self
            .columns
            .iter()
            .map(|c| if c == from { to.to_string() } else { c.clone() })
            .collect();
        self.columns = columns;
        Ok(())
    }

    /// Columns present in both tables, in this table's order
    pub fn shared_columns(&self, other: &AnnotationTable) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| other.columns.contains(c.as_str()))
            .cloned()
            .collect()
    }

    /// Row ids present in both tables, in this table's order
    pub fn shared_rows(&self, other: &AnnotationTable) -> Vec<String> {
        self.rows
            .keys()
            .filter(|r| other.rows.contains_key(r.as_str()))
            .cloned()
            .collect()
    }

    /// Prefix every row id with `<prefix>_`
    pub fn prefix_rows(self, prefix: &str) -> Self {
        let rows = self
            .rows
            .into_iter()
            .map(|(row, cells)| (format!("{}_{}", prefix, row), cells))
            .collect();
        Self {
            columns: self.columns,
            rows,
        }
    }

    /// Split into (rows named in `ids`, every other row), keeping order
    pub fn partition_rows<S: AsRef<str>>(self, ids: &[S]) -> (Self, Self) {
        let wanted: HashSet<&str> = ids.iter().map(AsRef::as_ref).collect();
        let mut inside = Self {
            columns: self.columns.clone(),
            rows: IndexMap::new(),
        };
        let mut outside = Self {
            columns: self.columns,
            rows: IndexMap::new(),
        };
        for (row, cells) in self.rows {
            if wanted.contains(row.as_str()) {
                inside.rows.insert(row, cells);
            } else {
                outside.rows.insert(row, cells);
            }
        }
        (inside, outside)
    }

    /// Full outer join on row id.
    ///
    /// Rows keep this table's order, followed by rows only `other` has. Columns
    /// are this table's followed by `other`'s new ones.
    pub fn join(mut self, other: AnnotationTable, collision: ColumnCollision) -> Result<Self> {
        let shared = self.shared_columns(&other);
        if !shared.is_empty() && collision == ColumnCollision::Refuse {
            return Err(AnnotError::Usage(format!(
                "columns {} would be produced twice",
                shared.join(", ")
            )));
        }

        let mapping: Vec<usize> = other.columns.iter().map(|c| self.add_column(c)).collect();
        let width = self.columns.len();
        for (row, cells) in other.rows {
            let target = self.rows.entry(row).or_insert_with(|| vec![None; width]);
            for (value, &idx) in cells.into_iter().zip(&mapping) {
                if value.is_some() || collision == ColumnCollision::Overwrite {
                    target[idx] = value;
                }
            }
        }
        Ok(self)
    }

    /// Stack `other`'s rows under this table's. Row ids must be disjoint.
    pub fn concat(mut self, other: AnnotationTable) -> Result<Self> {
        if let Some(dup) = other.rows.keys().find(|r| self.rows.contains_key(r.as_str())) {
            return Err(AnnotError::Other(format!(
                "row {} appears in both tables being stacked",
                dup
            )));
        }
        let mapping: Vec<usize> = other.columns.iter().map(|c| self.add_column(c)).collect();
        let width = self.columns.len();
        for (row, cells) in other.rows {
            let mut target = vec![None; width];
            for (value, &idx) in cells.into_iter().zip(&mapping) {
                target[idx] = value;
            }
            self.rows.insert(row, target);
        }
        Ok(self)
    }

    /// Read a tab-separated table whose first column is the row id
    pub fn read_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .from_path(path)
            .map_err(|e| AnnotError::Parse(format!("{}: {}", path.display(), e)))?;

        let headers = reader.headers()?.clone();
        let mut table = Self::new();
        for column in headers.iter().skip(1) {
            if table.columns.contains(column) {
                return Err(AnnotError::Parse(format!(
                    "{}: duplicate column {}",
                    path.display(),
                    column
                )));
            }
            table.add_column(column);
        }

        for record in reader.records() {
            let record = record.map_err(|e| AnnotError::Parse(format!("{}: {}", path.display(), e)))?;
            let mut fields = record.iter();
            let row = fields.next().unwrap_or_default().to_string();
            if table.rows.contains_key(&row) {
                return Err(AnnotError::Parse(format!(
                    "{}: duplicate row id {}",
                    path.display(),
                    row
                )));
            }
            let cells: Vec<Option<String>> = fields
                .map(|f| Some(f.to_string()).filter(|v| !v.is_empty()))
                .collect();
            table.rows.insert(row, cells);
        }

        Ok(table)
    }

    /// Write as TSV with the row id first. The file is replaced atomically.
    pub fn write_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(Vec::new());

        let mut header = vec![""];
        header.extend(self.columns());
        writer.write_record(&header)?;
        for (row, cells) in &self.rows {
            let mut record = vec![row.as_str()];
            record.extend(cells.iter().map(|c| c.as_deref().unwrap_or("")));
            writer.write_record(&record)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| AnnotError::Other(format!("Failed to buffer table: {}", e)))?;
        write_atomic(path.as_ref(), &bytes)
    }
}
