//! CSV dataset loader, backed by the `csv` crate rather than Arrow's own CSV
//! reader: kiln's CSV entries expose a richer field set (per-column
//! overrides, NA tokens, trimming) than the Arrow reader supports directly,
//! so we parse records ourselves and build the `RecordBatch` by hand.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow_array::{Array, ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow_schema::{DataType, Field, Schema};
use kiln_core::catalog::{CatalogEntry, ColumnNames, CsvEntry};
use kiln_core::error::csv_error::CsvError;
use kiln_core::error::LoadError;
use kiln_core::TabularValue;
use tracing::debug;

/// Read `entry` into a single in-memory [`TabularValue`].
pub fn load_csv(entry: &CsvEntry) -> Result<TabularValue, LoadError> {
    let path = PathBuf::from(&entry.path);

    let has_header = matches!(entry.column_names, ColumnNames::Inferred(true));
    let delimiter = entry.separator.as_bytes().first().copied().unwrap_or(b',');
    let quote = entry.quote.as_bytes().first().copied().unwrap_or(b'"');

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .quote(quote)
        .has_headers(has_header)
        .trim(if entry.trim_whitespace {
            csv::Trim::All
        } else {
            csv::Trim::None
        })
        .from_path(&path)
        .map_err(|e| wrap_csv_error(&path, e))?;

    let header_names: Vec<String> = if has_header {
        reader
            .headers()
            .map_err(|e| wrap_csv_error(&path, e))?
            .iter()
            .map(|s| s.to_string())
            .collect()
    } else {
        Vec::new()
    };

    let mut rows: Vec<Vec<String>> = Vec::new();
    for (i, record) in reader.records().enumerate() {
        if i < entry.skip_rows {
            continue;
        }
        if let Some(max) = entry.max_rows {
            if rows.len() >= max {
                break;
            }
        }
        let record = record.map_err(|e| wrap_csv_error(&path, e))?;
        rows.push(record.iter().map(|s| s.to_string()).collect());
    }

    let column_count = header_names
        .len()
        .max(rows.first().map(|r| r.len()).unwrap_or(0));

    let column_names: Vec<String> = match &entry.column_names {
        ColumnNames::Explicit(names) => names.clone(),
        ColumnNames::Inferred(true) => header_names,
        ColumnNames::Inferred(false) => (0..column_count).map(|i| format!("column_{i}")).collect(),
    };

    debug!(path = %path.display(), rows = rows.len(), columns = column_names.len(), "parsed csv source");

    build_record_batch(&path, &column_names, &rows, entry)
}

fn wrap_csv_error(path: &Path, source: csv::Error) -> LoadError {
    LoadError::Csv {
        path: path.to_path_buf(),
        source: CsvError(Box::new(source)),
    }
}

fn build_record_batch(
    path: &Path,
    column_names: &[String],
    rows: &[Vec<String>],
    entry: &CsvEntry,
) -> Result<TabularValue, LoadError> {
    let mut fields = Vec::with_capacity(column_names.len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(column_names.len());

    for (col_idx, name) in column_names.iter().enumerate() {
        let declared = entry
            .column_types
            .as_ref()
            .and_then(|types| types.get(name.as_str()))
            .map(|s| s.as_str());

        let raw_values: Vec<Option<String>> = rows
            .iter()
            .map(|row| row.get(col_idx).cloned())
            .map(|v| v.filter(|s| !entry.na_tokens.iter().any(|na| na == s)))
            .collect();

        let (data_type, array) = build_column(declared, &raw_values)
            .map_err(|details| LoadError::Csv {
                path: path.to_path_buf(),
                source: CsvError(Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, details))),
            })?;

        fields.push(Field::new(name, data_type, true));
        arrays.push(array);
    }

    let schema = Arc::new(Schema::new(fields));
    TabularValue::try_new(schema, arrays).map_err(LoadError::Arrow)
}

fn build_column(declared: Option<&str>, values: &[Option<String>]) -> Result<(DataType, ArrayRef), String> {
    match declared {
        Some("Int64") | Some("int64") | Some("Integer") => {
            let parsed: Result<Vec<Option<i64>>, _> = values
                .iter()
                .map(|v| v.as_ref().map(|s| s.parse::<i64>()).transpose())
                .collect();
            let parsed = parsed.map_err(|e| format!("column declared Int64: {e}"))?;
            Ok((DataType::Int64, Arc::new(Int64Array::from(parsed))))
        }
        Some("Float64") | Some("float64") | Some("Float") => {
            let parsed: Result<Vec<Option<f64>>, _> = values
                .iter()
                .map(|v| v.as_ref().map(|s| s.parse::<f64>()).transpose())
                .collect();
            let parsed = parsed.map_err(|e| format!("column declared Float64: {e}"))?;
            Ok((DataType::Float64, Arc::new(Float64Array::from(parsed))))
        }
        Some("Boolean") | Some("boolean") | Some("Bool") => {
            let parsed: Result<Vec<Option<bool>>, _> = values
                .iter()
                .map(|v| v.as_ref().map(|s| s.parse::<bool>()).transpose())
                .collect();
            let parsed = parsed.map_err(|e| format!("column declared Boolean: {e}"))?;
            Ok((DataType::Boolean, Arc::new(BooleanArray::from(parsed))))
        }
        _ => Ok(widen(values)),
    }
}

/// No declared type: widen int → float → string over the non-null values,
/// the simplest scan that still keeps numeric columns numeric. Shared with
/// [`crate::excel_loader`], which infers column types the same way.
pub(crate) fn widen(values: &[Option<String>]) -> (DataType, ArrayRef) {
    if values.iter().all(|v| v.as_deref().map_or(true, |s| s.parse::<i64>().is_ok())) {
        let parsed: Vec<Option<i64>> = values.iter().map(|v| v.as_ref().map(|s| s.parse().unwrap())).collect();
        return (DataType::Int64, Arc::new(Int64Array::from(parsed)));
    }
    if values.iter().all(|v| v.as_deref().map_or(true, |s| s.parse::<f64>().is_ok())) {
        let parsed: Vec<Option<f64>> = values.iter().map(|v| v.as_ref().map(|s| s.parse().unwrap())).collect();
        return (DataType::Float64, Arc::new(Float64Array::from(parsed)));
    }
    (DataType::Utf8, Arc::new(StringArray::from(values.to_vec())))
}

/// Dispatch entry point used by [`crate::CsvLoader`] once the catalog entry
/// is known to be a CSV dataset.
pub fn load(entry: &CatalogEntry) -> Result<TabularValue, LoadError> {
    match entry {
        CatalogEntry::Csv(csv) => load_csv(csv),
        _ => unreachable!("load_csv dispatched against a non-CSV entry"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn tempdir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "kiln-loaders-csv-test-{}-{:?}",
            std::process::id(),
            std::thread::current().id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn entry(path: &Path) -> CsvEntry {
        CsvEntry {
            path: path.to_string_lossy().to_string(),
            separator: ",".to_string(),
            quote: "\"".to_string(),
            column_names: ColumnNames::Inferred(true),
            column_types: None,
            skip_rows: 0,
            max_rows: None,
            na_tokens: vec!["".to_string(), "NA".to_string()],
            trim_whitespace: false,
        }
    }

    #[test]
    fn parses_header_and_widens_undeclared_columns() {
        let dir = tempdir();
        let path = dir.join("data.csv");
        std::fs::write(&path, "name,age\nalice,30\nbob,NA\n").unwrap();

        let batch = load_csv(&entry(&path)).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema().field(0).name(), "name");
        assert_eq!(batch.column(0).data_type(), &DataType::Utf8);
        assert_eq!(batch.column(1).data_type(), &DataType::Int64);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn widening_falls_back_to_float_then_string() {
        let dir = tempdir();
        let path = dir.join("data.csv");
        std::fs::write(&path, "price,label\n1,1.5\n2.5,two\n").unwrap();

        let batch = load_csv(&entry(&path)).unwrap();
        assert_eq!(batch.column(0).data_type(), &DataType::Float64);
        assert_eq!(batch.column(1).data_type(), &DataType::Utf8);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn declared_int64_column_parses_numerically() {
        let dir = tempdir();
        let path = dir.join("data.csv");
        std::fs::write(&path, "name,age\nalice,30\nbob,40\n").unwrap();

        let mut e = entry(&path);
        let mut types = IndexMap::new();
        types.insert("age".to_string(), "Int64".to_string());
        e.column_types = Some(types);

        let batch = load_csv(&e).unwrap();
        let age_col = batch.column(1);
        assert_eq!(age_col.data_type(), &DataType::Int64);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn na_tokens_become_nulls() {
        let dir = tempdir();
        let path = dir.join("data.csv");
        std::fs::write(&path, "name\nalice\nNA\n").unwrap();

        let batch = load_csv(&entry(&path)).unwrap();
        let name_col = batch.column(0).as_any().downcast_ref::<StringArray>().unwrap();
        assert!(name_col.is_null(1));
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn missing_file_is_csv_error() {
        let err = load_csv(&entry(Path::new("/nonexistent/data.csv"))).unwrap_err();
        assert!(matches!(err, LoadError::Csv { .. }));
    }
}
