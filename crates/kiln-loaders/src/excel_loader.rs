//! Excel dataset loader, backed by `calamine`. The first row of the named
//! sheet is always treated as the header row — kiln's Excel entries, unlike
//! its CSV ones, do not offer column-name overrides (§3).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow_array::ArrayRef;
use arrow_schema::{Field, Schema};
use calamine::{open_workbook_auto, Data, Reader};
use kiln_core::catalog::{CatalogEntry, ExcelEntry};
use kiln_core::error::LoadError;
use kiln_core::TabularValue;

use crate::csv_loader::widen;

pub fn load_excel(entry: &ExcelEntry) -> Result<TabularValue, LoadError> {
    let path = PathBuf::from(&entry.path);

    let mut workbook = open_workbook_auto(&path).map_err(|e| excel_error(&path, &entry.sheet, e.to_string()))?;
    let range = workbook
        .worksheet_range(&entry.sheet)
        .map_err(|e| excel_error(&path, &entry.sheet, e.to_string()))?;

    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| excel_error(&path, &entry.sheet, "sheet has no rows".to_string()))?;
    let column_names: Vec<String> = header.iter().map(cell_to_string).collect();

    let mut columns: Vec<Vec<Option<String>>> = vec![Vec::new(); column_names.len()];
    for row in rows {
        for (idx, column) in columns.iter_mut().enumerate() {
            let value = row.get(idx).map(cell_to_string).filter(|s| !s.is_empty());
            column.push(value);
        }
    }

    let mut fields = Vec::with_capacity(column_names.len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(column_names.len());
    for (name, col) in column_names.iter().zip(columns) {
        let (data_type, array) = widen(&col);
        fields.push(Field::new(name, data_type, true));
        arrays.push(array);
    }

    let schema = Arc::new(Schema::new(fields));
    TabularValue::try_new(schema, arrays).map_err(LoadError::Arrow)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn excel_error(path: &Path, sheet: &str, details: String) -> LoadError {
    LoadError::Excel {
        path: path.to_path_buf(),
        sheet: sheet.to_string(),
        details,
    }
}

pub fn load(entry: &CatalogEntry) -> Result<TabularValue, LoadError> {
    match entry {
        CatalogEntry::Excel(excel) => load_excel(excel),
        _ => unreachable!("load_excel dispatched against a non-Excel entry"),
    }
}
