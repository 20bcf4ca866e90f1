// Categorical table: one row per item (no time axis, no units). Used by bubble charts.

use std::fmt;

use serde::Serialize;

use super::TableError;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Number(f64),
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

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Number(v)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoricalTable {
    column_names: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl CategoricalTable {
    pub fn new(column_names: Vec<String>) -> Result<Self, TableError> {
        if column_names.is_empty() {
            return Err(TableError::Shape(
                "a categorical table needs at least one column".into(),
            ));
        }
        Ok(Self {
            column_names,
            rows: Vec::new(),
        })
    }

    pub fn add_row(&mut self, row: Vec<Cell>) -> Result<(), TableError> {
        if row.len() != self.column_names.len() {
            return Err(TableError::Shape(format!(
                "row has {} cells, table has {} columns",
                row.len(),
                self.column_names.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
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
}

impl fmt::Display for CategoricalTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            write!(f, "[")?;
            for (i, cell) in row.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                match cell {
                    Cell::Text(s) => write!(f, "'{}'", s)?,
                    Cell::Number(v) => write!(f, "{}", v)?,
                }
            }
            writeln!(f, "],")?;
        }
        Ok(())
    }
}
