use std::collections::{BTreeSet, HashMap};

use thiserror::Error;

use crate::draft::Role;
use crate::team_row::{Category, FeatureRow, champion_column};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown category: {value} is not recognized for {column_name} (column {column})")]
pub struct UnknownCategory {
    pub column: usize,
    pub column_name: String,
    pub value: Category,
}

/// Encoded row: one integer code per feature column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedRow(Vec<u32>);

impl EncodedRow {
    pub fn new(codes: Vec<u32>) -> Self {
        Self(codes)
    }

    pub fn codes(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Label encoder for a single column: the code is the value's position in `classes`.
#[derive(Debug, Clone)]
pub struct ColumnEncoder {
    name: String,
    classes: Vec<Category>,
    codes: HashMap<Category, u32>,
}

impl ColumnEncoder {
    pub fn new(name: impl Into<String>, classes: Vec<Category>) -> Self {
        let codes = classes
            .iter()
            .enumerate()
            .map(|(idx, class)| (class.clone(), idx as u32))
            .collect();
        Self {
            name: name.into(),
            classes,
            codes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn classes(&self) -> &[Category] {
        &self.classes
    }

    pub fn code(&self, value: &Category) -> Option<u32> {
        self.codes.get(value).copied()
    }
}

/// One encoder per feature column, positional.
#[derive(Debug, Clone)]
pub struct EncoderRegistry {
    columns: Vec<ColumnEncoder>,
}

impl EncoderRegistry {
    pub fn new(columns: Vec<ColumnEncoder>) -> Self {
        Self { columns }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[ColumnEncoder] {
        &self.columns
    }

    pub fn column(&self, column: usize) -> Option<&ColumnEncoder> {
        self.columns.get(column)
    }

    pub fn encode(&self, column: usize, value: &Category) -> Result<u32, UnknownCategory> {
        let unknown = |column_name: String| UnknownCategory {
            column,
            column_name,
            value: value.clone(),
        };
        let Some(encoder) = self.columns.get(column) else {
            return Err(unknown(format!("column {column}")));
        };
        encoder
            .code(value)
            .ok_or_else(|| unknown(encoder.name.clone()))
    }

    /// Encodes left to right and reports the first column that fails.
    pub fn encode_row(&self, row: &FeatureRow) -> Result<EncodedRow, UnknownCategory> {
        let codes = row
            .values()
            .iter()
            .enumerate()
            .map(|(column, value)| self.encode(column, value))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(EncodedRow(codes))
    }

    /// Champions the model knows for a role.
    pub fn champions_for(&self, role: Role) -> Vec<&str> {
        self.column(champion_column(role))
            .map(|encoder| encoder.classes.iter().filter_map(Category::as_text).collect())
            .unwrap_or_default()
    }

    /// Sorted, distinct champions across every role column.
    pub fn champions(&self) -> Vec<String> {
        let names: BTreeSet<&str> = Role::ALL
            .into_iter()
            .flat_map(|role| self.champions_for(role))
            .collect();
        names.into_iter().map(str::to_string).collect()
    }
}
